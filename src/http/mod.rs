//! HTTP protocol implementation.
//!
//! This module turns inbound bytes into requests and handler output back
//! into HTTP/1.1 responses, for connections that stay open across messages.
//!
//! # Architecture
//!
//! The HTTP layer is organized into several submodules:
//!
//! - **`connection`**: The per-connection lifecycle state machine and the `Stream` it drives
//! - **`parser`**: Incremental tokenizer emitting ordered message events
//! - **`assembler`**: Stitches tokenizer fragments into a `Request`
//! - **`request`**: HTTP request representation
//! - **`url`**: Request-target offset parsing
//! - **`response`**: Response record and the builder handlers mutate
//! - **`writer`**: Serializes the response head
//! - **`mime`**: MIME type detection based on file extensions
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │    Open     │ ← Messages are read, dispatched and answered
//!        └──────┬──────┘
//!               │ end() flushed, drain after end(), or idle timeout
//!               ▼
//!        ┌──────────────────┐
//!        │   HalfClosed     │ ← FIN sent; 10 s grace for the peer
//!        └──────┬───────────┘
//!               │ peer FIN, grace timeout, or error
//!               ▼
//!        ┌──────────────────┐
//!        │     Closed       │ ← All buffers released
//!        └──────────────────┘
//! ```
//!
//! Malformed input and upgrade requests skip straight to `Closed`.
//!
//! # Example
//!
//! ```ignore
//! use ember::dispatch::DispatchChain;
//! use ember::http::request::Method;
//!
//! let mut chain = DispatchChain::new();
//! chain.add_router(Method::GET, "/health", |_req, res, _next| {
//!     let _ = res.set_status(200u16, None);
//!     let _ = res.set_body(b"ok", Some("text/plain"));
//!     let _ = res.end();
//! });
//! chain.add_static("./www");
//! ```

pub mod assembler;
pub mod connection;
pub mod mime;
pub mod parser;
pub mod request;
pub mod response;
pub mod url;
pub mod writer;
