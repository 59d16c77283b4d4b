//! HTTP request building and sending.
//!
//! This module provides:
//! - Resolution of the step parameters into a [`RequestSpec`]
//! - The [`Transport`] seam and its `reqwest` implementation
//! - Response and exchange types handed to the classifier

mod exchange;
mod request;
mod transport;

pub use exchange::{Exchange, ResponseSpec};
pub use request::{build_request, parse_header_block, RequestSpec};
pub use transport::{ReqwestTransport, Transport};
