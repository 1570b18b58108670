//! Ember - Embeddable HTTP/1.1 server
//!
//! Core library for connection handling, request assembly, response
//! building and handler dispatch.

pub mod config;
pub mod dispatch;
pub mod http;
pub mod query;
pub mod server;

pub use config::{Config, ServerSettings};
pub use dispatch::DispatchChain;
pub use http::request::{Method, Request};
pub use http::response::{Response, StatusCode};
pub use server::Server;
