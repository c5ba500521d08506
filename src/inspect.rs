//! Main-symbol detection on compiled objects.
//!
//! Whether an object file defines `main` decides if it becomes the seed of an
//! executable or just another library object at link time. The check reads
//! the symbol table of the artifact itself, so it works no matter how the
//! entry point was produced (macros, includes, generated code).

use crate::error::EngineError;
use colored::*;
use object::{Object, ObjectSymbol, SymbolKind};
use std::path::Path;

/// A pluggable "does this artifact define `main`" capability.
///
/// The build orchestrator holds one of these behind a trait object, so a
/// target ecosystem without a parseable object format can substitute its own
/// probe (e.g. shelling out to `nm`).
pub trait ObjectInspector: Send + Sync {
    /// True iff the artifact defines a function symbol named exactly `main`.
    ///
    /// Must never panic on malformed input: an unreadable or unparsable file
    /// is reported and counts as "no main".
    fn defines_main(&self, path: &Path) -> bool;
}

/// Default inspector backed by the `object` crate (ELF, Mach-O, COFF, ...).
pub struct NativeInspector;

impl ObjectInspector for NativeInspector {
    fn defines_main(&self, path: &Path) -> bool {
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                eprintln!("{} could not read '{}': {}", "x".red(), path.display(), e);
                return false;
            }
        };
        let file = match object::File::parse(&*data) {
            Ok(file) => file,
            Err(e) => {
                eprintln!(
                    "{} {}: {}",
                    "x".red(),
                    EngineError::ObjectFormatInvalid(path.display().to_string()),
                    e
                );
                return false;
            }
        };
        file.symbols().any(|sym| {
            sym.kind() == SymbolKind::Text && sym.is_definition() && sym.name() == Ok("main")
        })
    }
}
