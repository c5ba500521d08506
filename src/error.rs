//! Error taxonomy for the build engine.
//!
//! Most plumbing uses `anyhow::Result`, but callers need to distinguish a few
//! conditions (a refused path, a failed stage of a pass), so those get
//! dedicated types here.

use std::io;

/// Error type for engine operations.
#[derive(Debug)]
pub enum EngineError {
    /// Canonicalization refused a path that leaves the working directory.
    PathEscapesRoot(String),
    /// A watched folder could not be listed.
    DirectoryUnreadable(String),
    /// The compiler returned a nonzero exit status for this source.
    CompileFailed(String),
    /// The linker returned a nonzero exit status for this executable.
    LinkFailed(String),
    /// The object inspector could not parse an artifact.
    ObjectFormatInvalid(String),
    /// A test executable returned a nonzero exit status.
    TestExecutionFailed(String),
    /// The child process could not be spawned at all.
    ProcessSpawnFailed(String, io::Error),
    /// The configuration cannot drive the daemon (e.g. a zero poll interval).
    InvalidConfig(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::PathEscapesRoot(p) => {
                write!(f, "'{}': path is not allowed to be in a parent directory", p)
            }
            EngineError::DirectoryUnreadable(p) => write!(f, "could not read directory '{}'", p),
            EngineError::CompileFailed(p) => write!(f, "compilation of '{}' failed", p),
            EngineError::LinkFailed(p) => write!(f, "linking of '{}' failed", p),
            EngineError::ObjectFormatInvalid(p) => write!(f, "'{}' is not an object file", p),
            EngineError::TestExecutionFailed(p) => write!(f, "test '{}' failed", p),
            EngineError::ProcessSpawnFailed(cmd, e) => write!(f, "could not spawn '{}': {}", cmd, e),
            EngineError::InvalidConfig(msg) => write!(f, "invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for EngineError {}

/// The stage at which a build pass gave up.
///
/// A pass runs collect, compile, link and test in order; the scheduler logs
/// the failed stage and retries on the next tick instead of exiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassError {
    Collect,
    Compile,
    Link,
    Test,
}

impl std::fmt::Display for PassError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PassError::Collect => write!(f, "directory collection failed"),
            PassError::Compile => write!(f, "compilation failed"),
            PassError::Link => write!(f, "linking failed"),
            PassError::Test => write!(f, "test run failed"),
        }
    }
}

impl std::error::Error for PassError {}
