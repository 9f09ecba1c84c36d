pub mod auth;
pub mod client;
pub mod dto;

pub use client::{SheetLogger, SheetsClient};
pub use dto::LogRow;
