//! MRC I/O utilities: sample decoding, volume reading and volume writing.

pub mod reader;
pub mod samples;
pub mod writer;

pub use reader::*;
pub use samples::*;
pub use writer::*;
