pub mod crm_pipeline;

pub use crm_pipeline::CrmPipeline;
