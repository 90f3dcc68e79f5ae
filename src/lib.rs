pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{cli::LocalStorage, CliConfig};

pub use app::pipelines::CrmPipeline;
pub use config::toml_config::TomlConfig;
pub use core::etl::EtlEngine;
pub use utils::error::{CrmError, Result};
