//! MRC core types: the 1024-byte main header, data modes, and byte order.
//!
//! Shared by the reader/writer in `mrc-io` and by tools that only need to
//! inspect headers.

pub mod header;
pub mod mode;

pub use header::*;
pub use mode::*;
