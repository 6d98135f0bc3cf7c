mod client;
mod handler;
mod rpc;

pub use client::{RibClient, RibControl};
pub use handler::{serve_rpc_api, stop_rpc_api, RibService};
pub use rpc::{
    AsSegment, Destination, Global, Path, PathAttrs, PathEntry, PathResult, RibApiClient,
    RibApiServer, AS_SEQUENCE, AS_SET,
};

use std::error;
use std::fmt;
use std::io;
use std::time::Duration;

#[derive(Debug)]
pub enum RibError {
    /// Couldn't reach the RIB or the call failed in transport. [reason]
    Transport(String),
    /// A call didn't complete before its deadline. [deadline]
    DeadlineExceeded(Duration),
    /// The RIB refused the request. [reason]
    Rejected(String),
}

impl fmt::Display for RibError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("RIB Error: ")?;
        use RibError::*;
        match self {
            Transport(r) => write!(f, "Transport error [{}]", r)?,
            DeadlineExceeded(d) => write!(f, "Deadline of {}ms exceeded", d.as_millis())?,
            Rejected(r) => write!(f, "Rejected [{}]", r)?,
        }
        Ok(())
    }
}

impl error::Error for RibError {}

impl From<jsonrpsee::core::Error> for RibError {
    fn from(error: jsonrpsee::core::Error) -> Self {
        use jsonrpsee::core::Error;
        match error {
            Error::Call(err) => RibError::Rejected(err.to_string()),
            Error::RequestTimeout => RibError::Transport("request timed out".to_string()),
            err => RibError::Transport(err.to_string()),
        }
    }
}

impl From<RibError> for io::Error {
    fn from(error: RibError) -> Self {
        io::Error::new(io::ErrorKind::Other, error.to_string())
    }
}
