//! Outbound side of the gateway: the HTTP transport abstraction and the
//! shared retrying client

pub mod client;
pub mod http;

pub use client::UpstreamClient;
pub use http::{HttpClient, MockHttpClient, RawResponse, ReqwestHttpClient, UpstreamRequest};
