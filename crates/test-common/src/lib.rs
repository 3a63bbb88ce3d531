//! Common test utilities shared across all quickpack crates.
//!
//! Project trees on disk, a recording progress reporter and in-memory fakes for the
//! version source, package index and host toolchain ports.

pub mod config;
pub mod constants;
pub mod fakes;
pub mod fixtures;
pub mod reporter;

pub use config::{test_config, test_config_verbose, test_config_with_colors, test_config_with_setup_file};
pub use constants::*;
pub use fakes::{FakeHost, FakeIndex, HostCall, fake_collaborators};
pub use fixtures::{ProjectFixture, example_setup, snapshot_tree};
pub use reporter::RecordingReporter;

pub use quickpack::config::AppConfigBuilder;
pub use tempfile::TempDir;
