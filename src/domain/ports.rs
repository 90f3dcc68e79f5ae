use crate::domain::model::{AnalysisResult, ChartKind, Table, Tool};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn input_path(&self) -> &str;
    fn output_path(&self) -> &str;
    fn tool(&self) -> Tool;
    fn account(&self) -> Option<&str>;
    fn chart_kind(&self) -> ChartKind;
    fn chart_color(&self) -> &str;
    fn bundle(&self) -> bool;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Table>;
    async fn transform(&self, table: Table) -> Result<AnalysisResult>;
    async fn load(&self, result: AnalysisResult) -> Result<String>;
}
