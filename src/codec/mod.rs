//! LC3 container handling
//!
//! Decodes the binary container header and walks its length-prefixed
//! frames with a wrapping per-stream cursor.

pub mod container;
pub mod cursor;

pub use container::{parse_header, ContainerHeader};
pub use cursor::{CursorCheckpoint, StreamCursor};
