use thiserror::Error;

use crate::net::{FrameDecodeError, FrameEncodeError, FrameType};

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame decode error: {0}")]
    FrameDecode(#[from] FrameDecodeError),

    #[error("frame encode error: {0}")]
    FrameEncode(#[from] FrameEncodeError),

    #[error("no middleware servers configured")]
    NoServers,

    #[error("none of the {attempted} middleware servers could be reached, last error: {last}")]
    NoServerReachable { attempted: usize, last: String },

    #[error("timed out connecting to {0}")]
    Timeout(String),

    #[error("broker rejected request ({code}): {message}")]
    Rejected { code: u16, message: String },

    #[error("unexpected {0:?} frame")]
    UnexpectedFrame(FrameType),

    #[error("connection closed")]
    Closed,

    #[error("{0}")]
    Other(String),
}
