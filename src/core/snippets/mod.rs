// Core snippets module - text macros posted on request or on trigger phrases.

pub mod paste;
pub mod snippet_models;
pub mod snippet_service;

pub use paste::*;
pub use snippet_models::*;
pub use snippet_service::*;
