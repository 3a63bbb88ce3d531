//! Quickpack - build-time packaging orchestration for Python libraries
//!
//! The `quickpack` library turns a declarative setup document into an ordered pipeline of
//! build steps that prepare a project tree for the host packaging toolchain. Every file a step
//! generates or rewrites is registered in a [`ledger::VirtualFileLedger`], which guarantees the
//! tree is restored once the run ends, whether it succeeded or not.
//!
//! # Architecture
//!
//! External concerns sit behind ports so the core can be tested in isolation:
//!
//! - [`fs::FileSystem`] for every read and write of the project tree
//! - [`commands::CommandRunner`] for subprocesses
//! - [`version::VersionSource`] for version-control-derived versions
//! - [`requirements::PackageIndex`] for freezing requirements
//! - [`host::HostToolchain`] for the packaging toolchain itself
//!
//! # Main Components
//!
//! - [`setup`] - The setup document and its typed options
//! - [`pipeline`] - Assembling the step list and running it with guaranteed teardown
//! - [`steps`] - The individual build steps
//! - [`ledger`] - Virtual file bookkeeping
//! - [`manifest`] - The `MANIFEST.in` rewriter
//! - [`lock`] - Companion libraries pinning a release and its dependency tree
//! - [`config`] - Tool configuration
//!
//! # Examples
//!
//! ```no_run
//! use std::{path::Path, sync::Arc};
//!
//! use quickpack::fs::RealFileSystem;
//! use quickpack::setup::SetupDocument;
//!
//! let fs = Arc::new(RealFileSystem);
//! let document = SetupDocument::load(fs.as_ref(), Path::new("quickpack.yml")).unwrap();
//! let options = document.options().unwrap();
//! println!("{:?}", options.name);
//! ```

pub mod commands;
pub mod config;
pub mod context;
pub mod fs;
pub mod host;
pub mod ledger;
pub mod lock;
pub mod manifest;
pub mod pipeline;
pub mod progress_reporter;
pub mod requirements;
pub mod scaffold;
pub mod setup;
pub mod steps;
pub mod validation;
pub mod version;
