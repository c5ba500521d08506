//! The compile and link state machines.
//!
//! One orchestration pass walks every known source, derives its object under
//! the build root (mirroring the source path), recompiles what is stale, then
//! partitions the objects by main-symbol and relinks the executables whose
//! inputs moved. Compilation and linking are issued serially; a failed file
//! is reported and skipped without rolling back work already done this pass.

use super::headers;
use crate::config::CincConfig;
use crate::error::EngineError;
use crate::inspect::ObjectInspector;
use crate::registry::{FileFlags, FileKind, Registry};
use anyhow::Result;
use colored::*;
use serde_json::json;
use std::fs;
use std::path::Path;
use std::process::Command;
use std::time::SystemTime;

/// Echo an argv to stderr before spawning it, the way the daemon logs every
/// external command.
pub fn log_command(args: &[String]) {
    eprintln!("{} {}", ">".cyan(), args.join(" "));
}

fn run_logged(args: &[String]) -> Result<bool, EngineError> {
    log_command(args);
    let output = Command::new(&args[0])
        .args(&args[1..])
        .output()
        .map_err(|e| EngineError::ProcessSpawnFailed(args[0].clone(), e))?;
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !output.status.success() {
        if !stderr.is_empty() {
            eprintln!("{}", stderr);
        }
        return Ok(false);
    }
    // Warnings still come through even on success.
    if !stderr.is_empty() {
        eprintln!("{}", stderr);
    }
    Ok(true)
}

/// Derived object path: build root + source path with the extension swapped.
fn object_path_for(config: &CincConfig, source_base: &str) -> String {
    let obj_ext = config.extensions.primary(FileKind::Object);
    if obj_ext.is_empty() {
        format!("{}/{}", config.build, source_base)
    } else {
        format!("{}/{}.{}", config.build, source_base, obj_ext)
    }
}

fn ensure_parent_dir(path: &str) -> std::io::Result<()> {
    match Path::new(path).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

struct SourceWork {
    path: String,
    base: String,
    mtime: Option<SystemTime>,
    is_test: bool,
}

/// Compile every stale source into its derived object.
///
/// Returns false when at least one source failed; successfully rebuilt
/// objects from the same pass stay in place.
pub fn compile_pass(
    registry: &mut Registry,
    config: &CincConfig,
    inspector: &dyn ObjectInspector,
) -> bool {
    let sources: Vec<SourceWork> = registry
        .iter()
        .filter(|f| f.kind == FileKind::Source && f.flags.contains(FileFlags::EXISTS))
        .map(|f| SourceWork {
            path: f.path.clone(),
            base: f.base().to_string(),
            mtime: f.mtime,
            is_test: f.flags.contains(FileFlags::IS_TEST),
        })
        .collect();

    let mut ok = true;
    let mut compiled_any = false;
    let mut commands = Vec::new();

    for src in &sources {
        let obj_raw = object_path_for(config, &src.base);
        let hint = if src.is_test {
            FileFlags::IS_TEST
        } else {
            FileFlags::empty()
        };
        let obj_index = match registry.insert_or_update(&obj_raw, Some(FileKind::Object), hint, config)
        {
            Ok(i) => i,
            Err(e) => {
                eprintln!("{} {}", "x".red(), e);
                ok = false;
                continue;
            }
        };

        let (obj_path, obj_exists, obj_mtime, obj_fresh) = {
            let obj = registry.get(obj_index).expect("object was just inserted");
            (
                obj.path.clone(),
                obj.flags.contains(FileFlags::EXISTS),
                obj.mtime,
                obj.flags.contains(FileFlags::IS_FRESH),
            )
        };

        let mut args: Vec<String> = Vec::with_capacity(config.flags.len() + 5);
        args.push(config.cc.clone());
        args.extend(config.flags.iter().cloned());
        args.push("-c".to_string());
        args.push(src.path.clone());
        args.push("-o".to_string());
        args.push(obj_path.clone());
        commands.push(json!({
            "directory": std::env::current_dir()
                .map(|d| d.to_string_lossy().into_owned())
                .unwrap_or_default(),
            "command": args.join(" "),
            "file": src.path,
        }));

        let mut stale = !obj_exists || src.mtime > obj_mtime;
        if !stale && let Some(threshold) = obj_mtime {
            stale = match headers::dependency_newer_than(registry, config, &src.path, threshold) {
                Ok(newer) => newer,
                Err(e) => {
                    eprintln!("{} {}", "x".red(), e);
                    false
                }
            };
        }

        if stale {
            if let Err(e) = ensure_parent_dir(&obj_path) {
                eprintln!("{} could not create directory for '{}': {}", "x".red(), obj_path, e);
                ok = false;
                continue;
            }
            compiled_any = true;
            let success = match run_logged(&args) {
                Ok(success) => success,
                Err(e) => {
                    eprintln!("{} {}", "x".red(), e);
                    false
                }
            };
            // The header scan may have grown the registry, so every update
            // below goes back through the path, not the insertion index.
            if success {
                if let Some(obj) = registry.find_mut(&obj_path) {
                    obj.stat();
                }
                set_main_flag(&obj_path, registry, inspector);
            } else {
                eprintln!("{} {}", "x".red(), EngineError::CompileFailed(src.path.clone()));
                if let Some(obj) = registry.find_mut(&obj_path) {
                    obj.flags.remove(FileFlags::EXISTS);
                    obj.mtime = None;
                }
                ok = false;
            }
        } else if obj_fresh && obj_exists {
            // Freshly registered but up to date (e.g. first run over an
            // existing build tree): probe for main without recompiling.
            set_main_flag(&obj_path, registry, inspector);
        }

        if let Some(obj) = registry.find_mut(&obj_path) {
            obj.flags.remove(FileFlags::IS_FRESH);
        }
        if let Some(source) = registry.find_mut(&src.path) {
            source.flags.remove(FileFlags::IS_FRESH);
        }
    }

    if compiled_any
        && let Ok(text) = serde_json::to_string_pretty(&commands)
        && let Err(e) = fs::write("compile_commands.json", text)
    {
        eprintln!("{} could not write compile_commands.json: {}", "!".yellow(), e);
    }

    ok
}

fn set_main_flag(obj_path: &str, registry: &mut Registry, inspector: &dyn ObjectInspector) {
    let defines = inspector.defines_main(Path::new(obj_path));
    if let Some(obj) = registry.find_mut(obj_path) {
        if defines {
            obj.flags.insert(FileFlags::HAS_MAIN);
        } else {
            obj.flags.remove(FileFlags::HAS_MAIN);
        }
    }
}

/// Relink every executable whose main object or any library object is newer.
///
/// Library objects are the existing objects without a main symbol; each main
/// object seeds one executable next to it in the build tree. One failing link
/// does not stop the others.
pub fn link_pass(registry: &mut Registry, config: &CincConfig) -> bool {
    let mut lib_objects: Vec<String> = Vec::new();
    let mut latest_lib: Option<SystemTime> = None;
    let mut main_objects: Vec<(String, String, Option<SystemTime>, bool)> = Vec::new();

    for file in registry.iter() {
        if file.kind != FileKind::Object || !file.flags.contains(FileFlags::EXISTS) {
            continue;
        }
        if file.flags.contains(FileFlags::HAS_MAIN) {
            main_objects.push((
                file.path.clone(),
                file.base().to_string(),
                file.mtime,
                file.flags.contains(FileFlags::IS_TEST),
            ));
        } else {
            if file.mtime > latest_lib {
                latest_lib = file.mtime;
            }
            lib_objects.push(file.path.clone());
        }
    }

    let mut ok = true;
    for (main_path, main_base, main_mtime, is_test) in main_objects {
        let exe_ext = config.extensions.primary(FileKind::Executable);
        let exe_raw = if exe_ext.is_empty() {
            main_base
        } else {
            format!("{}.{}", main_base, exe_ext)
        };
        let hint = if is_test {
            FileFlags::IS_TEST
        } else {
            FileFlags::empty()
        };
        let exe_index =
            match registry.insert_or_update(&exe_raw, Some(FileKind::Executable), hint, config) {
                Ok(i) => i,
                Err(e) => {
                    eprintln!("{} {}", "x".red(), e);
                    ok = false;
                    continue;
                }
            };

        let (exe_path, exe_exists, exe_mtime) = {
            let exe = registry.get(exe_index).expect("executable was just inserted");
            (
                exe.path.clone(),
                exe.flags.contains(FileFlags::EXISTS),
                exe.mtime,
            )
        };

        let newest_input = latest_lib.max(main_mtime);
        if exe_exists && newest_input <= exe_mtime {
            continue;
        }

        if let Err(e) = ensure_parent_dir(&exe_path) {
            eprintln!("{} could not create directory for '{}': {}", "x".red(), exe_path, e);
            ok = false;
            continue;
        }

        let mut args: Vec<String> =
            Vec::with_capacity(config.flags.len() + lib_objects.len() + config.libs.len() + 4);
        args.push(config.cc.clone());
        args.extend(config.flags.iter().cloned());
        args.extend(lib_objects.iter().cloned());
        args.push(main_path.clone());
        args.push("-o".to_string());
        args.push(exe_path.clone());
        args.extend(config.libs.iter().cloned());

        let success = match run_logged(&args) {
            Ok(success) => success,
            Err(e) => {
                eprintln!("{} {}", "x".red(), e);
                false
            }
        };
        let exe = registry.get_mut(exe_index).expect("executable index is stable");
        if success {
            exe.stat();
            exe.flags.remove(FileFlags::IS_FRESH);
        } else {
            eprintln!("{} {}", "x".red(), EngineError::LinkFailed(exe_path.clone()));
            exe.flags.remove(FileFlags::EXISTS);
            exe.mtime = None;
            ok = false;
        }
    }
    ok
}
