//! # cinc - Incremental C Build Daemon
//!
//! cinc ("c-inc") watches a set of C sources, recompiles what changed,
//! relinks the executables it affects and reruns stale regression tests,
//! all from one background loop that shares its file set with an
//! interactive command surface.
//!
//! ## How it decides what to do
//!
//! - Every tracked path is one [`registry::File`] in a sorted registry.
//! - Objects mirror their source paths under the build root; an object is
//!   rebuilt when it is missing, older than its source, or older than any
//!   transitively included header (discovered via `cc -MM -MG`).
//! - Objects defining a `main` function symbol each seed one executable,
//!   linked against all the objects that do not.
//! - Test executables rerun when their `.output` is older than the
//!   executable or its `.input`/`.data` companions.
//!
//! ## Quick Start
//!
//! ```bash
//! # One-shot incremental build of src/
//! cinc build
//!
//! # The daemon: rebuild + retest on every change, prompt on stdin
//! cinc watch
//! ```
//!
//! ## Module Organization
//!
//! - [`engine`] - Shared state, command-surface API, background scheduler
//! - [`build`] - Compile/link/test passes
//! - [`registry`] - The sorted file registry and its flags
//! - [`config`] - Configuration parsing (`cinc.toml`)

/// Compile, link and test passes plus header dependency discovery.
pub mod build;

/// Directory collection: expanding folder entries into files.
pub mod collect;

/// Configuration file parsing (`cinc.toml`).
pub mod config;

/// Shared engine state, command-surface API and the scheduler thread.
pub mod engine;

/// Error taxonomy.
pub mod error;

/// Main-symbol detection on compiled objects.
pub mod inspect;

/// Path canonicalization.
pub mod path;

/// The sorted file registry.
pub mod registry;

/// Terminal UI utilities (tables).
pub mod ui;
