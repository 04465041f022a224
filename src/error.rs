use std::io;
use thiserror::Error;

use crate::segment::Address;

/// Every fatal condition the interpreter can hit, from a malformed CLI
/// invocation down to a program that runs off the end of its own code.
///
/// A `UmError` is always terminal: nothing in this crate retries or
/// recovers from one. `main` prints its `Display` text to stderr and
/// exits with a non-zero status.
#[derive(Error, Debug)]
pub enum UmError {
    #[error("no such file: {path}: {source}")]
    OpenFailed {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("improper file size: {size} byte(s) is not a multiple of 4")]
    TruncatedImage { size: u64 },

    #[error("address {0} is not currently allocated")]
    InvalidAddress(Address),

    #[error("offset {offset} is out of bounds for segment {address} (length {length})")]
    OutOfBounds {
        address: Address,
        offset: u32,
        length: u32,
    },

    #[error("terminated without halt")]
    FellOffProgram,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type UmResult<T> = Result<T, UmError>;
