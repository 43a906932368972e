//! Network layer: HTTP client abstraction with byte-range support.

pub mod http;

pub use http::{AsyncHttpClient, NetError, RangeResponse, ReqwestClient, PARTIAL_CONTENT};
