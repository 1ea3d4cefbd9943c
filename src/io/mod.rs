//! I/O operations module
//!
//! Cache-bypassing file handles and the aligned buffers direct I/O
//! requires.

pub mod buffer;
pub mod disk;

pub use buffer::AlignedBuffer;
pub use disk::{create_disk_io, DirectFile, DiskIO, PlatformDiskIO};
