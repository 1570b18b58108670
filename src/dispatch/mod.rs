//! Handler dispatch.
//!
//! This module holds the ordered handler chain every completed request is
//! run through, and the static directory resolver it delegates to.

pub mod chain;
pub mod static_files;

pub use chain::{Dispatch, DispatchChain, Handler, HandlerEntry};
pub use static_files::{FileLoad, StaticFetch};
