//! Utility modules
//!
//! HTTP plumbing and the private scheduler used by the blocking API.

pub mod http;
pub mod runtime;

pub use http::*;
pub use runtime::*;
