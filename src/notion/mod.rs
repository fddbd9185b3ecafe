// Notion API client and document schema

mod client;
mod error;
pub mod models;

pub use client::NotionClient;
pub use error::NotionError;
