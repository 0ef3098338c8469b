//! HTTP transport implementations.

mod http;

pub use http::ReqwestTransport;
