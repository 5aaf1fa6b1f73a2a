//! Request and response types used by the handlers

pub mod chat;
pub mod common;
pub mod models;
pub mod research;

pub use chat::*;
pub use common::*;
pub use models::*;
pub use research::*;
