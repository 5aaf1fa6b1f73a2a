//! HTTP request handlers for the Delve web server

pub mod chat;
pub mod frontend;
pub mod health;
pub mod models;
pub mod research;
pub mod types;

pub use chat::*;
pub use frontend::*;
pub use health::*;
pub use models::*;
pub use research::*;

// Re-export all types for convenience
pub use types::*;
