pub mod charts;
pub mod classifier;
pub mod etl;
pub mod export;
pub mod hygiene;
pub mod loader;
pub mod report;
pub mod timeline;

pub use crate::domain::model::{AnalysisResult, Table};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
