pub mod background;
pub mod capture;
pub mod cli;
pub mod dom;
pub mod export;
pub mod journey;
pub mod navigation;
pub mod registry;
pub mod store;
pub mod trace;
