pub mod export_model;
pub mod validate;
