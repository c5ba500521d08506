//! The file registry: everything the engine knows about the watched tree.
//!
//! One sorted, duplicate-free vector of [`File`] records keyed by canonical
//! path. All lookups are binary searches; insertion keeps the order. The
//! registry itself is not synchronized - the engine wraps it in a mutex and
//! every consumer goes through that.

use crate::config::CincConfig;
use crate::error::EngineError;
use crate::path;
use anyhow::Result;
use bitflags::bitflags;
use regex::Regex;
use std::fs;
use std::time::SystemTime;

/// Semantic kind of a tracked file, fixed at creation except for the
/// stat-time folder override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Other,
    Source,
    Header,
    Object,
    Executable,
    Folder,
}

impl FileKind {
    /// Classification order; the classifier tries these in sequence.
    pub const ALL: [FileKind; 6] = [
        FileKind::Other,
        FileKind::Source,
        FileKind::Header,
        FileKind::Object,
        FileKind::Executable,
        FileKind::Folder,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FileKind::Other => "other",
            FileKind::Source => "source",
            FileKind::Header => "header",
            FileKind::Object => "object",
            FileKind::Executable => "executable",
            FileKind::Folder => "folder",
        }
    }
}

bitflags! {
    /// Per-file state bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FileFlags: u8 {
        /// The path resolves to something on disk (for executables, something
        /// with the user execute bit).
        const EXISTS = 1 << 0;
        /// Only meaningful for existing objects: the symbol table defines a
        /// function named `main`.
        const HAS_MAIN = 1 << 1;
        /// Participates in the test pipeline.
        const IS_TEST = 1 << 2;
        /// State changed on the last registration; cleared once the engine
        /// has reacted.
        const IS_FRESH = 1 << 3;
        /// Folders only: collection descends into subdirectories.
        const IS_RECURSIVE = 1 << 4;
    }
}

impl FileFlags {
    /// Compact rendering for listings: `e`xists, has `m`ain, `t`est,
    /// `f`resh, `r`ecursive.
    pub fn letters(&self) -> String {
        let mut s = String::new();
        for (flag, letter) in [
            (FileFlags::EXISTS, 'e'),
            (FileFlags::HAS_MAIN, 'm'),
            (FileFlags::IS_TEST, 't'),
            (FileFlags::IS_FRESH, 'f'),
            (FileFlags::IS_RECURSIVE, 'r'),
        ] {
            if self.contains(flag) {
                s.push(letter);
            }
        }
        s
    }
}

/// Flags that describe what a file *is* rather than what was observed about
/// it; these survive re-registration unchanged.
const IDENTITY_FLAGS: FileFlags = FileFlags::IS_TEST.union(FileFlags::IS_RECURSIVE);

/// The extension of the last path segment: the part after the final `.`,
/// empty when there is none.
pub fn extension_of(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(i) => &name[i + 1..],
        None => "",
    }
}

/// One tracked file.
#[derive(Debug, Clone)]
pub struct File {
    /// Canonical path, the registry key.
    pub path: String,
    pub kind: FileKind,
    pub flags: FileFlags,
    /// Last observed modification time; `None` while the file is missing.
    pub mtime: Option<SystemTime>,
}

impl File {
    pub fn extension(&self) -> &str {
        extension_of(&self.path)
    }

    /// Path without its extension (and without the dot).
    pub fn base(&self) -> &str {
        let ext = self.extension();
        if ext.is_empty() {
            &self.path
        } else {
            &self.path[..self.path.len() - ext.len() - 1]
        }
    }

    /// Re-read metadata and update `EXISTS`, `mtime` and the folder override.
    ///
    /// Executables must carry the user execute bit to count as existing,
    /// otherwise a half-written link result would look usable.
    pub fn stat(&mut self) {
        match fs::metadata(&self.path) {
            Ok(meta) => {
                if meta.is_dir() {
                    self.kind = FileKind::Folder;
                }
                let usable = self.kind != FileKind::Executable || is_executable(&meta);
                if usable {
                    self.flags.insert(FileFlags::EXISTS);
                    self.mtime = meta.modified().ok();
                } else {
                    self.flags.remove(FileFlags::EXISTS);
                    self.mtime = None;
                }
            }
            Err(_) => {
                self.flags.remove(FileFlags::EXISTS);
                self.mtime = None;
            }
        }
    }

}

#[cfg(unix)]
fn is_executable(meta: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o100 != 0
}

#[cfg(not(unix))]
fn is_executable(_meta: &fs::Metadata) -> bool {
    true
}

/// Sorted, deduplicated collection of [`File`] records.
#[derive(Debug, Default)]
pub struct Registry {
    files: Vec<File>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &File> {
        self.files.iter()
    }

    pub fn get(&self, index: usize) -> Option<&File> {
        self.files.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut File> {
        self.files.get_mut(index)
    }

    fn position(&self, canonical: &str) -> std::result::Result<usize, usize> {
        self.files.binary_search_by(|f| f.path.as_str().cmp(canonical))
    }

    /// Look up a file by its exact (pre-canonicalized) path.
    pub fn find(&self, canonical: &str) -> Option<&File> {
        self.position(canonical).ok().map(|i| &self.files[i])
    }

    pub fn find_mut(&mut self, canonical: &str) -> Option<&mut File> {
        match self.position(canonical) {
            Ok(i) => Some(&mut self.files[i]),
            Err(_) => None,
        }
    }

    /// Register a path, idempotently, and return its index.
    ///
    /// The path is canonicalized first. Re-registering merges: observed state
    /// (`EXISTS`, `HAS_MAIN`) is carried over from the previous record,
    /// identity hints (`IS_TEST`, `IS_RECURSIVE`) accumulate, and the file is
    /// re-stat'ed. `IS_FRESH` is set whenever the resulting flags differ from
    /// what was recorded before. New entries take `kind_hint` or fall back to
    /// extension classification, then get the stat-time folder override.
    pub fn insert_or_update(
        &mut self,
        raw: &str,
        kind_hint: Option<FileKind>,
        flags: FileFlags,
        config: &CincConfig,
    ) -> std::result::Result<usize, EngineError> {
        let canonical = path::canonicalize(raw, config.allow_parent_paths)?;
        match self.position(&canonical) {
            Ok(i) => {
                let file = &mut self.files[i];
                let before = file.flags;
                file.flags = before | (flags & IDENTITY_FLAGS);
                file.stat();
                if file.flags != before {
                    file.flags.insert(FileFlags::IS_FRESH);
                }
                Ok(i)
            }
            Err(i) => {
                let kind = kind_hint
                    .unwrap_or_else(|| config.extensions.classify(extension_of(&canonical)));
                let mut file = File {
                    path: canonical,
                    kind,
                    flags: (flags & IDENTITY_FLAGS) | FileFlags::IS_FRESH,
                    mtime: None,
                };
                file.stat();
                self.files.insert(i, file);
                Ok(i)
            }
        }
    }

    /// Indexes of all files whose path matches a glob pattern.
    pub fn find_matching(&self, pattern: &str) -> Result<Vec<usize>> {
        let re = glob_regex(pattern)?;
        Ok(self
            .files
            .iter()
            .enumerate()
            .filter(|(_, f)| re.is_match(&f.path))
            .map(|(i, _)| i)
            .collect())
    }

    /// Remove every file whose path matches a glob pattern; returns how many
    /// were dropped. Only the command surface calls this, never a pass.
    pub fn delete_matching(&mut self, pattern: &str) -> Result<usize> {
        let re = glob_regex(pattern)?;
        let before = self.files.len();
        self.files.retain(|f| !re.is_match(&f.path));
        Ok(before - self.files.len())
    }
}

/// Compile an `fnmatch`-style glob (`*`, `?`, `[...]`) into an anchored regex.
pub fn glob_regex(pattern: &str) -> Result<Regex> {
    let mut re = String::from("^");
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            '[' => {
                re.push('[');
                if chars.peek() == Some(&'!') {
                    chars.next();
                    re.push('^');
                }
                for c in chars.by_ref() {
                    if c == ']' {
                        break;
                    }
                    re.push(c);
                }
                re.push(']');
            }
            _ => re.push_str(&regex::escape(&c.to_string())),
        }
    }
    re.push('$');
    Ok(Regex::new(&re)?)
}
