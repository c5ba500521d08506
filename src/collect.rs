//! Directory collection: expanding registered folders into their files.

use crate::config::CincConfig;
use crate::error::EngineError;
use crate::registry::{FileFlags, FileKind, Registry};
use colored::*;
use walkdir::WalkDir;

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

/// Walk every existing folder entry and register the regular files found.
///
/// Subdirectories are only descended into for folders flagged recursive;
/// hidden entries are always skipped. Discovered files inherit the folder's
/// test flag, which is how a registered `tests/` folder feeds the test
/// pipeline. An unreadable folder is reported and the rest keep collecting.
pub fn collect(registry: &mut Registry, config: &CincConfig) -> bool {
    let folders: Vec<(String, FileFlags)> = registry
        .iter()
        .filter(|f| f.kind == FileKind::Folder && f.flags.contains(FileFlags::EXISTS))
        .map(|f| (f.path.clone(), f.flags))
        .collect();

    let mut ok = true;
    for (folder, flags) in folders {
        let inherited = flags & FileFlags::IS_TEST;
        let depth = if flags.contains(FileFlags::IS_RECURSIVE) {
            usize::MAX
        } else {
            1
        };
        let walker = WalkDir::new(&folder)
            .max_depth(depth)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e));
        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    eprintln!(
                        "{} {}: {}",
                        "x".red(),
                        EngineError::DirectoryUnreadable(folder.clone()),
                        err
                    );
                    ok = false;
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let discovered = entry.path().to_string_lossy();
            if let Err(err) = registry.insert_or_update(&discovered, None, inherited, config) {
                eprintln!("{} {}", "x".red(), err);
                ok = false;
            }
        }
    }
    ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn test_config() -> CincConfig {
        CincConfig {
            allow_parent_paths: true,
            ..CincConfig::default()
        }
    }

    fn register_folder(reg: &mut Registry, config: &CincConfig, path: &std::path::Path, flags: FileFlags) {
        reg.insert_or_update(&path.to_string_lossy(), None, flags, config)
            .unwrap();
    }

    #[test]
    fn collects_top_level_files_only_without_recursion() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.c"), "").unwrap();
        fs::write(dir.path().join("b.h"), "").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/deep.c"), "").unwrap();

        let config = test_config();
        let mut reg = Registry::new();
        register_folder(&mut reg, &config, dir.path(), FileFlags::empty());
        assert!(collect(&mut reg, &config));

        let sources = reg.iter().filter(|f| f.kind == FileKind::Source).count();
        let headers = reg.iter().filter(|f| f.kind == FileKind::Header).count();
        assert_eq!(sources, 1);
        assert_eq!(headers, 1);
    }

    #[test]
    fn recursion_descends_and_skips_hidden() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.c"), "").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/deep.c"), "").unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join(".git/ignored.c"), "").unwrap();
        fs::write(dir.path().join(".hidden.c"), "").unwrap();

        let config = test_config();
        let mut reg = Registry::new();
        register_folder(&mut reg, &config, dir.path(), FileFlags::IS_RECURSIVE);
        assert!(collect(&mut reg, &config));

        let sources = reg.iter().filter(|f| f.kind == FileKind::Source).count();
        assert_eq!(sources, 2);
    }

    #[test]
    fn discovered_files_inherit_the_test_flag() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("t.c"), "").unwrap();

        let config = test_config();
        let mut reg = Registry::new();
        register_folder(&mut reg, &config, dir.path(), FileFlags::IS_TEST);
        assert!(collect(&mut reg, &config));

        let test_sources = reg
            .iter()
            .filter(|f| f.kind == FileKind::Source && f.flags.contains(FileFlags::IS_TEST))
            .count();
        assert_eq!(test_sources, 1);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_folder_is_reported() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::read_dir(&locked).is_ok() {
            // Permission bits are not enforced for this user.
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let config = test_config();
        let mut reg = Registry::new();
        register_folder(&mut reg, &config, &locked, FileFlags::empty());
        assert!(!collect(&mut reg, &config));

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn missing_folder_is_skipped_silently() {
        let config = test_config();
        let mut reg = Registry::new();
        reg.insert_or_update("/no/such/folder", Some(FileKind::Folder), FileFlags::empty(), &config)
            .unwrap();
        // Not EXISTS, so collection does not even try to walk it.
        assert!(collect(&mut reg, &config));
        assert_eq!(reg.len(), 1);
    }
}
