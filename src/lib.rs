//! A 32-bit word-oriented Universal Machine: segmented memory, a
//! fetch-decode-execute loop over fourteen opcodes, and the loader that
//! turns a raw `.um` image into a running machine.

pub mod codec;
pub mod engine;
pub mod error;
pub mod loader;
pub mod segment;

pub use engine::Engine;
pub use error::{UmError, UmResult};
pub use segment::{Address, SegmentStore};
