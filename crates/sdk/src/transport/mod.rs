//! Transport layer for the mcpdemo SDK.

pub mod http;

pub use http::{HttpTransport, Reply, SessionHeaders};
