pub mod http;
pub mod trait_def;

pub use http::HttpGateway;
pub use trait_def::{GatewayError, GatewayResult, LinkGateway};
