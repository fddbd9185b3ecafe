// Notion Timesheet - library root for the binary and integration tests

pub mod auth;
pub mod config;
pub mod error;
pub mod http_client;
pub mod middleware;
pub mod notion;
pub mod resolver;
pub mod routes;
pub mod server;
pub mod services;
