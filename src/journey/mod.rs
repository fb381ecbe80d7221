pub mod error;
pub mod journey_model;
pub mod runner;
