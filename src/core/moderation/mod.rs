// Core moderation module - ban/timeout validation, warnings, temp-ban bookkeeping.

pub mod moderation_models;
pub mod moderation_service;

pub use moderation_models::*;
pub use moderation_service::*;
