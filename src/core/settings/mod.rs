pub mod settings_models;
pub mod settings_service;

pub use settings_models::*;
pub use settings_service::*;
