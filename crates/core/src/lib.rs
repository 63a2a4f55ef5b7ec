// Wire types shared by the mcpdemo server and client

pub mod error;
pub mod protocol;

pub use error::{ProtocolError, ProtocolResult};
pub use protocol::*;
