#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
mod cli_args {
    use crate::core::charts::DEFAULT_COLOR;
    use crate::core::loader::SUPPORTED_EXTENSIONS;
    use crate::domain::model::{ChartKind, Tool};
    use crate::domain::ports::ConfigProvider;
    use crate::utils::error::Result;
    use crate::utils::validation::{validate_file_extension, validate_hex_color, validate_path, Validate};
    use clap::Parser;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize, Parser)]
    #[command(name = "crm-assistant")]
    #[command(about = "Clean, tag and report on CRM exports")]
    pub struct CliConfig {
        #[arg(help = "CRM export to analyse (.csv, .tsv, .txt, .xlsx, .xls, .ods)")]
        pub input: String,

        #[arg(long, value_enum, default_value_t = Tool::All)]
        pub tool: Tool,

        #[arg(long, default_value = "./output")]
        pub output_path: String,

        #[arg(long, help = "TOML profile with classifier rules, narratives and report text")]
        pub config: Option<String>,

        #[arg(long, help = "Also render a report for this account")]
        pub account: Option<String>,

        #[arg(long, value_enum, default_value_t = ChartKind::Line)]
        pub chart: ChartKind,

        #[arg(long, default_value = DEFAULT_COLOR)]
        pub color: String,

        #[arg(long, help = "Write every output into a single ZIP archive")]
        pub bundle: bool,

        #[arg(long, help = "Enable verbose output")]
        pub verbose: bool,

        #[arg(long, help = "Log CPU and memory usage per stage")]
        pub monitor: bool,

        #[arg(long, help = "Emit logs as JSON lines")]
        pub log_json: bool,
    }

    impl ConfigProvider for CliConfig {
        fn input_path(&self) -> &str {
            &self.input
        }

        fn output_path(&self) -> &str {
            &self.output_path
        }

        fn tool(&self) -> Tool {
            self.tool
        }

        fn account(&self) -> Option<&str> {
            self.account.as_deref()
        }

        fn chart_kind(&self) -> ChartKind {
            self.chart
        }

        fn chart_color(&self) -> &str {
            &self.color
        }

        fn bundle(&self) -> bool {
            self.bundle
        }
    }

    impl Validate for CliConfig {
        fn validate(&self) -> Result<()> {
            validate_path("input", &self.input)?;
            validate_file_extension("input", &self.input, &SUPPORTED_EXTENSIONS)?;
            validate_path("output_path", &self.output_path)?;
            if let Some(config) = &self.config {
                validate_path("config", config)?;
            }
            validate_hex_color("color", &self.color)?;
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_parse_cli_defaults() {
            let config = CliConfig::parse_from(["crm-assistant", "crm.csv"]);
            assert_eq!(config.tool(), Tool::All);
            assert_eq!(config.chart_kind(), ChartKind::Line);
            assert_eq!(config.chart_color(), "#1f77b4");
            assert_eq!(config.output_path(), "./output");
            assert!(!config.bundle());
            assert!(config.validate().is_ok());
        }

        #[test]
        fn test_parse_cli_flags() {
            let config = CliConfig::parse_from([
                "crm-assistant",
                "crm.xlsx",
                "--tool",
                "visualize",
                "--chart",
                "funnel",
                "--color",
                "#ff8800",
                "--account",
                "Acme",
                "--bundle",
            ]);
            assert_eq!(config.tool(), Tool::Visualize);
            assert_eq!(config.chart_kind(), ChartKind::Funnel);
            assert_eq!(config.account(), Some("Acme"));
            assert!(config.bundle());
            assert!(config.validate().is_ok());
        }

        #[test]
        fn test_validate_rejects_bad_input() {
            let mut config = CliConfig::parse_from(["crm-assistant", "crm.pdf"]);
            assert!(config.validate().is_err());

            config.input = "crm.csv".to_string();
            config.color = "blue".to_string();
            assert!(config.validate().is_err());
        }
    }
}

#[cfg(feature = "cli")]
pub use cli_args::CliConfig;
