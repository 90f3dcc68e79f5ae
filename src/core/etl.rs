use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;
use tokio::sync::Mutex;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: Mutex<SystemMonitor>,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: Mutex::new(SystemMonitor::new(monitor_enabled)),
        }
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("Starting CRM assistant run");
        self.monitor.lock().await.log_phase("Start");

        let table = self.pipeline.extract().await?;
        tracing::info!("Extracted {} records", table.row_count());
        self.monitor.lock().await.log_phase("Extract");

        let result = self.pipeline.transform(table).await?;
        tracing::info!(
            "Transformed {} records ({} warning(s))",
            result.table.row_count(),
            result.warnings.len()
        );
        self.monitor.lock().await.log_phase("Transform");

        let output_path = self.pipeline.load(result).await?;
        tracing::info!("Output saved to: {}", output_path);

        let mut monitor = self.monitor.lock().await;
        monitor.log_phase("Load");
        monitor.log_final();

        Ok(output_path)
    }
}
