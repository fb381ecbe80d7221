pub mod capture_model;
pub mod error;
pub mod orchestrator;
pub mod page_context;
pub mod page_info;
