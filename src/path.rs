//! Path canonicalization.
//!
//! Every path the engine tracks is stored in one canonical form: relative to
//! the working directory, with `.` segments elided, `..` segments collapsed
//! and repeated separators squashed. Keeping a single spelling per file is
//! what lets the registry stay sorted and duplicate-free.

use crate::error::EngineError;

/// Canonicalize `path` relative to the process working directory.
///
/// Fails with [`EngineError::PathEscapesRoot`] when the result would point
/// above the working directory and `allow_parent` is not set.
pub fn canonicalize(path: &str, allow_parent: bool) -> Result<String, EngineError> {
    let cwd = std::env::current_dir()
        .map_err(|_| EngineError::DirectoryUnreadable(".".to_string()))?;
    canonicalize_from(path, &cwd.to_string_lossy(), allow_parent)
}

/// Canonicalize `path` against an explicit working directory.
///
/// Absolute inputs are first made relative to `cwd` by finding the longest
/// common segment prefix (on separator boundaries, not character ones) and
/// emitting one `..` per leftover `cwd` segment.
pub fn canonicalize_from(
    path: &str,
    cwd: &str,
    allow_parent: bool,
) -> Result<String, EngineError> {
    let mut ups = 0usize;
    let remaining: Vec<&str>;

    if path.starts_with('/') {
        let path_segs: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let cwd_segs: Vec<&str> = cwd.split('/').filter(|s| !s.is_empty()).collect();
        let common = path_segs
            .iter()
            .zip(cwd_segs.iter())
            .take_while(|(a, b)| a == b)
            .count();
        ups = cwd_segs.len() - common;
        remaining = path_segs[common..].to_vec();
    } else {
        remaining = path.split('/').filter(|s| !s.is_empty()).collect();
    }

    let mut out: Vec<&str> = Vec::new();
    for seg in remaining {
        match seg {
            "." => {}
            ".." => {
                if out.pop().is_none() {
                    ups += 1;
                }
            }
            _ => out.push(seg),
        }
    }

    if ups > 0 && !allow_parent {
        return Err(EngineError::PathEscapesRoot(path.to_string()));
    }

    let mut result = String::new();
    for _ in 0..ups {
        if !result.is_empty() {
            result.push('/');
        }
        result.push_str("..");
    }
    for seg in out {
        if !result.is_empty() {
            result.push('/');
        }
        result.push_str(seg);
    }
    if result.is_empty() {
        result.push('.');
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canon(path: &str, cwd: &str) -> String {
        canonicalize_from(path, cwd, true).unwrap()
    }

    #[test]
    fn collapses_dots_and_separators() {
        assert_eq!(canon("a/./b//c", "/w"), "a/b/c");
        assert_eq!(canon("a/../b", "/w"), "b");
        assert_eq!(canon("./", "/w"), ".");
        assert_eq!(canon("a/b/../../", "/w"), ".");
    }

    #[test]
    fn absolute_paths_become_relative() {
        assert_eq!(canon("/home/u/proj/src/a.c", "/home/u/proj"), "src/a.c");
        assert_eq!(canon("/home/u/proj", "/home/u/proj"), ".");
        assert_eq!(canon("/home/u/other", "/home/u/proj"), "../other");
        assert_eq!(canon("/etc/passwd", "/home/u/proj"), "../../../etc/passwd");
    }

    #[test]
    fn separator_boundary_not_character_prefix() {
        // "/home/ux" shares the character prefix "/home/u" with the cwd but
        // not the segment "u", so it must not collapse into it.
        assert_eq!(canon("/home/ux", "/home/u"), "../ux");
    }

    #[test]
    fn parent_paths_refused_by_default() {
        assert!(matches!(
            canonicalize_from("../../etc/passwd", "/home/u/proj", false),
            Err(EngineError::PathEscapesRoot(_))
        ));
        assert_eq!(
            canon("../../etc/passwd", "/home/u/proj"),
            "../../etc/passwd"
        );
    }

    #[test]
    fn escapes_inside_path_count_too() {
        assert!(canonicalize_from("a/../../x", "/w", false).is_err());
        assert_eq!(canon("a/../../x", "/w"), "../x");
    }

    #[test]
    fn idempotent() {
        for p in ["src/a.c", "a/./b//c", "../../etc/passwd", "/home/u/proj/x", "."] {
            let once = canon(p, "/home/u/proj");
            let twice = canon(&once, "/home/u/proj");
            assert_eq!(once, twice, "canonicalizing {:?} twice diverged", p);
        }
    }
}
