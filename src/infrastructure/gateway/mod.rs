//! Backend gateway adapters

mod http;

pub use http::HttpGateway;
