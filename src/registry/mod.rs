pub mod identity;
pub mod registry_model;
