//! The engine: one shared file set, one background build loop.
//!
//! Everything mutable lives behind a single mutex around the [`Registry`].
//! The scheduler thread takes the lock for a whole pass (collect, compile,
//! link, test as one atomic unit) and the command surface takes it for every
//! query or mutation, so the two execution contexts can never observe a torn
//! registry. Pausing is checked between passes only - an in-flight pass
//! always completes, and the only shutdown granularity is "stop scheduling
//! more passes".

use crate::build;
use crate::collect;
use crate::config::CincConfig;
use crate::error::{EngineError, PassError};
use crate::inspect::{NativeInspector, ObjectInspector};
use crate::registry::{FileFlags, FileKind, Registry};
use anyhow::{Result, anyhow};
use colored::*;
use std::process::{Command, ExitStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

/// Snapshot of one registry entry, handed to the command surface.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub path: String,
    pub kind: FileKind,
    pub flags: FileFlags,
}

struct EngineInner {
    config: CincConfig,
    registry: Mutex<Registry>,
    paused: AtomicBool,
    inspector: Box<dyn ObjectInspector>,
}

/// Cloneable handle to the shared engine state.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl Engine {
    pub fn new(config: CincConfig) -> Result<Self, EngineError> {
        Engine::with_inspector(config, Box::new(NativeInspector))
    }

    pub fn with_inspector(
        config: CincConfig,
        inspector: Box<dyn ObjectInspector>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Engine {
            inner: Arc::new(EngineInner {
                config,
                registry: Mutex::new(Registry::new()),
                paused: AtomicBool::new(false),
                inspector,
            }),
        })
    }

    pub fn config(&self) -> &CincConfig {
        &self.inner.config
    }

    fn registry(&self) -> std::sync::MutexGuard<'_, Registry> {
        self.inner
            .registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register the configured source and test folders.
    ///
    /// Folders that do not exist yet are registered anyway; collection skips
    /// them until they appear.
    pub fn register_roots(&self) -> Result<()> {
        for folder in &self.inner.config.sources {
            self.register(folder, Some(FileKind::Folder), false, true)?;
        }
        for folder in &self.inner.config.tests {
            self.register(folder, Some(FileKind::Folder), true, true)?;
        }
        Ok(())
    }

    /// Register one path and return its canonical form.
    pub fn register(
        &self,
        path: &str,
        kind_hint: Option<FileKind>,
        is_test: bool,
        recursive: bool,
    ) -> Result<String> {
        let mut flags = FileFlags::empty();
        if is_test {
            flags.insert(FileFlags::IS_TEST);
        }
        if recursive {
            flags.insert(FileFlags::IS_RECURSIVE);
        }
        let mut registry = self.registry();
        let index = registry.insert_or_update(path, kind_hint, flags, &self.inner.config)?;
        Ok(registry.get(index).expect("entry was just inserted").path.clone())
    }

    /// Entries matching a glob pattern.
    pub fn find(&self, pattern: &str) -> Result<Vec<FileEntry>> {
        let registry = self.registry();
        let indexes = registry.find_matching(pattern)?;
        Ok(indexes
            .into_iter()
            .filter_map(|i| registry.get(i))
            .map(|f| FileEntry {
                path: f.path.clone(),
                kind: f.kind,
                flags: f.flags,
            })
            .collect())
    }

    /// Drop every entry matching a glob pattern; returns how many went away.
    pub fn delete(&self, pattern: &str) -> Result<usize> {
        self.registry().delete_matching(pattern)
    }

    /// Snapshot of the whole registry, in path order.
    pub fn list(&self) -> Vec<FileEntry> {
        self.registry()
            .iter()
            .map(|f| FileEntry {
                path: f.path.clone(),
                kind: f.kind,
                flags: f.flags,
            })
            .collect()
    }

    pub fn set_paused(&self, paused: bool) {
        self.inner.paused.store(paused, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.inner.paused.load(Ordering::SeqCst)
    }

    /// Run directory collection only, without building anything.
    pub fn refresh(&self) -> bool {
        let mut registry = self.registry();
        collect::collect(&mut registry, &self.inner.config)
    }

    /// One full pass: collect, compile, link, test, atomically under the
    /// registry lock. A collection failure aborts the pass; a failing file
    /// in any later stage only poisons its own chain, the other stages still
    /// run for everything else and the first failed stage is reported. The
    /// caller (usually the scheduler) simply retries on the next tick.
    pub fn run_build_pass(&self) -> Result<(), PassError> {
        let mut registry = self.registry();
        let config = &self.inner.config;
        if !collect::collect(&mut registry, config) {
            return Err(PassError::Collect);
        }
        let compiled = build::compile_pass(&mut registry, config, self.inner.inspector.as_ref());
        let linked = build::link_pass(&mut registry, config);
        let tested = build::test_pass(&mut registry, config);
        if !compiled {
            Err(PassError::Compile)
        } else if !linked {
            Err(PassError::Link)
        } else if !tested {
            Err(PassError::Test)
        } else {
            Ok(())
        }
    }

    /// Paths of all known executables, in registry order.
    pub fn executables(&self) -> Vec<String> {
        self.registry()
            .iter()
            .filter(|f| f.kind == FileKind::Executable)
            .map(|f| f.path.clone())
            .collect()
    }

    /// Run an executable picked by 1-based listing index, canonical path or
    /// file name, with inherited stdio.
    ///
    /// The registry lock is held for the duration of the run, as every
    /// command-surface operation must be.
    pub fn run_executable(&self, target: &str, args: &[String]) -> Result<ExitStatus> {
        let registry = self.registry();
        let executables: Vec<&str> = registry
            .iter()
            .filter(|f| f.kind == FileKind::Executable)
            .map(|f| f.path.as_str())
            .collect();

        let path = if let Ok(index) = target.parse::<usize>() {
            *executables
                .get(index.wrapping_sub(1))
                .ok_or_else(|| anyhow!("invalid index {}", target))?
        } else {
            *executables
                .iter()
                .find(|p| **p == target || p.rsplit('/').next() == Some(target))
                .ok_or_else(|| anyhow!("no executable named '{}'", target))?
        };

        let mut argv = vec![path.to_string()];
        argv.extend(args.iter().cloned());
        build::log_command(&argv);
        let status = Command::new(path)
            .args(args)
            .status()
            .map_err(|e| EngineError::ProcessSpawnFailed(path.to_string(), e))?;
        Ok(status)
    }

    /// Start the background scheduler thread.
    pub fn start_scheduler(&self) -> Scheduler {
        let engine = self.clone();
        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();
        let interval = Duration::from_millis(self.inner.config.interval);
        let handle = std::thread::spawn(move || {
            while flag.load(Ordering::SeqCst) {
                if !engine.is_paused()
                    && let Err(e) = engine.run_build_pass()
                {
                    eprintln!("{} {}", "x".red(), e);
                }
                std::thread::sleep(interval);
            }
        });
        Scheduler {
            running,
            handle: Some(handle),
        }
    }
}

/// Handle to the background loop; dropping or [`Scheduler::stop`]ing it lets
/// the current pass finish and then stops scheduling more.
pub struct Scheduler {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Scheduler {
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
