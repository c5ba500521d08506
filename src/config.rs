//! Configuration file parsing (`cinc.toml`).
//!
//! The daemon is driven by a small TOML file in the project root. Every field
//! has a default, so a missing file means "build the `src/` tree with gcc and
//! run the tests under `tests/`".

use crate::error::EngineError;
use crate::registry::FileKind;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Deserialize, Debug, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct CincConfig {
    /// Compiler, also used as the linker driver.
    pub cc: String,
    /// Tool invoked as `<diff> <expected> <actual>` after a test run.
    pub diff: String,
    /// Flags passed to every compile and link invocation, in order.
    pub flags: Vec<String>,
    /// Libraries appended to every link invocation, in order.
    pub libs: Vec<String>,
    /// Root directory that mirrors the source tree for derived artifacts.
    pub build: String,
    /// Milliseconds the scheduler sleeps between passes.
    pub interval: u64,
    /// Permit registering paths above the working directory.
    pub allow_parent_paths: bool,
    /// Folders registered (recursively) at startup.
    pub sources: Vec<String>,
    /// Folders registered at startup whose files count as tests.
    pub tests: Vec<String>,
    /// Extension-to-kind mapping.
    pub extensions: ExtensionTable,
}

impl Default for CincConfig {
    fn default() -> Self {
        CincConfig {
            cc: "gcc".to_string(),
            diff: "diff".to_string(),
            flags: ["-g", "-fsanitize=address", "-Wall", "-Wextra", "-Werror"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            libs: Vec::new(),
            build: "build".to_string(),
            interval: 100,
            allow_parent_paths: false,
            sources: vec!["src".to_string()],
            tests: vec!["tests".to_string()],
            extensions: ExtensionTable::default(),
        }
    }
}

impl CincConfig {
    /// Reject values the daemon cannot run with.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.interval == 0 {
            return Err(EngineError::InvalidConfig(
                "interval must be at least 1 millisecond".to_string(),
            ));
        }
        if self.cc.is_empty() {
            return Err(EngineError::InvalidConfig("cc must not be empty".to_string()));
        }
        if self.build.is_empty() {
            return Err(EngineError::InvalidConfig(
                "build directory must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// One alternation pattern per file kind, `ext1|ext2|...`.
///
/// A leading dot on an alternative is accepted and ignored; an empty
/// alternative matches files without an extension. Classification tries the
/// kinds in declaration order and the first match wins.
#[derive(Deserialize, Debug, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct ExtensionTable {
    pub other: String,
    pub source: String,
    pub header: String,
    pub object: String,
    pub executable: String,
    pub folder: String,
}

impl Default for ExtensionTable {
    fn default() -> Self {
        ExtensionTable {
            other: String::new(),
            source: ".c".to_string(),
            header: ".h".to_string(),
            object: ".o".to_string(),
            executable: String::new(),
            folder: String::new(),
        }
    }
}

impl ExtensionTable {
    fn pattern(&self, kind: FileKind) -> &str {
        match kind {
            FileKind::Other => &self.other,
            FileKind::Source => &self.source,
            FileKind::Header => &self.header,
            FileKind::Object => &self.object,
            FileKind::Executable => &self.executable,
            FileKind::Folder => &self.folder,
        }
    }

    /// Map a bare extension (no dot) to the first matching kind.
    pub fn classify(&self, ext: &str) -> FileKind {
        for kind in FileKind::ALL {
            for alt in self.pattern(kind).split('|') {
                if alt.trim_start_matches('.') == ext {
                    return kind;
                }
            }
        }
        FileKind::Other
    }

    /// The first alternative for a kind, used when deriving artifact paths.
    /// Empty means "no extension" (the usual case for executables).
    pub fn primary(&self, kind: FileKind) -> &str {
        self.pattern(kind)
            .split('|')
            .next()
            .unwrap_or("")
            .trim_start_matches('.')
    }
}

/// Load the configuration.
///
/// An explicitly given path must exist; the default `cinc.toml` is optional
/// and its absence falls back to [`CincConfig::default`].
pub fn load_config(path: Option<&Path>) -> Result<CincConfig> {
    let path = match path {
        Some(p) => p,
        None => {
            let default = Path::new("cinc.toml");
            if !default.exists() {
                return Ok(CincConfig::default());
            }
            default
        }
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config: CincConfig = toml::from_str(&text)
        .with_context(|| format!("Failed to parse {} - check for syntax errors", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_classifies_c_files() {
        let t = ExtensionTable::default();
        assert_eq!(t.classify("c"), FileKind::Source);
        assert_eq!(t.classify("h"), FileKind::Header);
        assert_eq!(t.classify("o"), FileKind::Object);
        assert_eq!(t.classify("txt"), FileKind::Other);
        // No extension hits the empty "other" alternative first.
        assert_eq!(t.classify(""), FileKind::Other);
    }

    #[test]
    fn alternation_and_first_match_wins() {
        let t = ExtensionTable {
            source: ".c|.cc|cpp".to_string(),
            header: "h|hpp".to_string(),
            other: "cpp".to_string(),
            ..ExtensionTable::default()
        };
        assert_eq!(t.classify("cc"), FileKind::Source);
        assert_eq!(t.classify("hpp"), FileKind::Header);
        // "other" is tried before "source".
        assert_eq!(t.classify("cpp"), FileKind::Other);
    }

    #[test]
    fn primary_strips_dot_and_takes_first() {
        let t = ExtensionTable {
            object: ".obj|.o".to_string(),
            ..ExtensionTable::default()
        };
        assert_eq!(t.primary(FileKind::Object), "obj");
        assert_eq!(t.primary(FileKind::Executable), "");
    }

    #[test]
    fn parses_toml_and_keeps_defaults() {
        let config: CincConfig = toml::from_str(
            r#"
cc = "clang"
interval = 250
flags = ["-O2"]

[extensions]
source = ".c|.i"
"#,
        )
        .unwrap();
        assert_eq!(config.cc, "clang");
        assert_eq!(config.interval, 250);
        assert_eq!(config.flags, vec!["-O2"]);
        assert_eq!(config.diff, "diff");
        assert_eq!(config.extensions.classify("i"), FileKind::Source);
        assert_eq!(config.extensions.classify("h"), FileKind::Header);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let config = CincConfig {
            interval: 0,
            ..CincConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(CincConfig::default().validate().is_ok());
    }
}
