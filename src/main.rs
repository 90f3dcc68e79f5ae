use clap::Parser;
use crm_assistant::utils::error::{CrmError, ErrorSeverity};
use crm_assistant::utils::{logger, validation::Validate};
use crm_assistant::{CliConfig, CrmPipeline, EtlEngine, LocalStorage, TomlConfig};

fn exit_with(e: &CrmError) -> ! {
    tracing::error!(
        "❌ Run failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

    // 依錯誤嚴重程度決定結束碼
    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}

fn load_profile(config: &CliConfig) -> Result<TomlConfig, CrmError> {
    let profile = match &config.config {
        Some(path) => {
            tracing::info!("📁 Loading profile from: {}", path);
            TomlConfig::from_file(path)?
        }
        None => TomlConfig::default(),
    };
    profile.validate()?;
    Ok(profile)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    if config.log_json {
        logger::init_json_logger(config.verbose);
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting crm-assistant");
    tracing::debug!("CLI config: {:?}", config);

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        exit_with(&e);
    }

    let profile = match load_profile(&config) {
        Ok(profile) => profile,
        Err(e) => exit_with(&e),
    };

    let monitor_enabled = config.monitor;
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let storage = LocalStorage::new(config.output_path.clone());
    let pipeline = match CrmPipeline::new(storage, config, profile) {
        Ok(pipeline) => pipeline,
        Err(e) => exit_with(&e),
    };
    let engine = EtlEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ CRM assistant run completed");
            println!("✅ CRM assistant run completed");
            println!("📁 Output saved to: {}", output_path);
            Ok(())
        }
        Err(e) => exit_with(&e),
    }
}
