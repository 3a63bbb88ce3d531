//! File system abstractions
//!
//! Every byte the pipeline reads from or writes to the project tree goes through the
//! [`FileSystem`] port, so the ledger and the build steps can be exercised against
//! [`MockFileSystem`] as well as the real disk.

pub mod filesystem;
pub mod real;

pub use filesystem::{FileSystem, FileSystemError};
#[cfg(any(test, feature = "with_mocks"))]
pub use filesystem::MockFileSystem;
pub use real::RealFileSystem;
