//! # cinc CLI Entry Point
//!
//! Parses CLI arguments using clap and routes commands to the engine.
//!
//! ## Command Structure
//!
//! - `watch` - the daemon: background rebuild loop plus a stdin prompt
//! - `build` - one build pass and exit
//! - `list`  - collect the watched folders and show the registry
//! - `run`   - build, then run an executable by index, name or path

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use colored::*;
use std::io::{BufRead, Write};
use std::path::PathBuf;

use cinc::config;
use cinc::engine::Engine;
use cinc::ui;

#[derive(Parser)]
#[command(name = "cinc")]
#[command(about = "The incremental C build daemon", version = env!("CARGO_PKG_VERSION"))]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the configuration file [default: cinc.toml]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the registered folders, rebuilding and retesting on change
    Watch {
        /// Start with the build loop paused
        #[arg(long)]
        paused: bool,
    },
    /// Run a single build pass and exit
    Build,
    /// Collect the watched folders and list the registry
    List,
    /// Build, then run an executable (1-based index, file name or path)
    Run {
        /// Executable to run; omit to get a numbered list
        target: Option<String>,
        /// Arguments passed to the executable
        #[arg(num_args = 0.., allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let engine = setup(cli.config.as_deref())?;

    match cli.command {
        Commands::Watch { paused } => cmd_watch(&engine, paused),
        Commands::Build => cmd_build(&engine),
        Commands::List => cmd_list(&engine),
        Commands::Run { target, args } => cmd_run(&engine, target, &args),
    }
}

fn setup(config_path: Option<&std::path::Path>) -> Result<Engine> {
    let config = config::load_config(config_path)?;
    let engine = Engine::new(config).context("configuration rejected")?;
    engine.register_roots()?;
    Ok(engine)
}

fn cmd_build(engine: &Engine) -> Result<()> {
    engine
        .run_build_pass()
        .map_err(|e| anyhow!("{}", e))
        .context("build pass failed")?;
    println!("{} Build pass finished", "✓".green());
    Ok(())
}

fn cmd_list(engine: &Engine) -> Result<()> {
    engine.refresh();
    let mut table = ui::Table::new(&["#", "Path", "Kind", "Flags"]);
    for (i, entry) in engine.list().iter().enumerate() {
        table.add_row(vec![
            (i + 1).to_string(),
            entry.path.clone(),
            entry.kind.label().to_string(),
            entry.flags.letters(),
        ]);
    }
    table.print();
    Ok(())
}

fn cmd_run(engine: &Engine, target: Option<String>, args: &[String]) -> Result<()> {
    engine
        .run_build_pass()
        .map_err(|e| anyhow!("{}", e))
        .context("build pass failed")?;

    let Some(target) = target else {
        println!("choose an executable:");
        for (i, path) in engine.executables().iter().enumerate() {
            println!("({}) {}", i + 1, path);
        }
        return Ok(());
    };

    let status = engine.run_executable(&target, args)?;
    if !status.success() {
        return Err(anyhow!("'{}' returned {}", target, status));
    }
    Ok(())
}

fn cmd_watch(engine: &Engine, paused: bool) -> Result<()> {
    engine.set_paused(paused);
    println!(
        "{} Watching {} (interval {} ms), type 'help' for commands",
        "👀".cyan(),
        engine.config().sources.join(", "),
        engine.config().interval
    );

    let scheduler = engine.start_scheduler();
    let stdin = std::io::stdin();
    let mut line = String::new();
    loop {
        print!("cinc> ");
        std::io::stdout().flush().ok();
        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        if !dispatch(engine, &line) {
            break;
        }
    }
    scheduler.stop();
    Ok(())
}

/// Handle one prompt line; false means quit.
fn dispatch(engine: &Engine, line: &str) -> bool {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((&command, args)) = words.split_first() else {
        return true;
    };

    match command {
        "add" => {
            let is_test = args.contains(&"-t");
            let recursive = args.contains(&"-r");
            for path in args.iter().filter(|a| !a.starts_with('-')) {
                match engine.register(path, None, is_test, recursive) {
                    Ok(canonical) => println!("added {}", canonical),
                    Err(e) => eprintln!("{} {}", "x".red(), e),
                }
            }
        }
        "delete" => {
            for pattern in args {
                match engine.delete(pattern) {
                    Ok(n) => println!("deleted {} file(s)", n),
                    Err(e) => eprintln!("{} {}", "x".red(), e),
                }
            }
        }
        "list" => {
            for (i, entry) in engine.list().iter().enumerate() {
                println!(
                    "({}) {} [{}] {}",
                    i + 1,
                    entry.path,
                    entry.kind.label(),
                    entry.flags.letters()
                );
            }
        }
        "build" => match engine.run_build_pass() {
            Ok(()) => println!("{} Build pass finished", "✓".green()),
            Err(e) => eprintln!("{} {}", "x".red(), e),
        },
        "pause" => {
            let paused = !engine.is_paused();
            engine.set_paused(paused);
            println!("builder {}", if paused { "paused" } else { "resumed" });
        }
        "run" => {
            let Some((target, rest)) = args.split_first() else {
                println!("choose an executable:");
                for (i, path) in engine.executables().iter().enumerate() {
                    println!("({}) {}", i + 1, path);
                }
                return true;
            };
            let rest: Vec<String> = rest.iter().map(|s| s.to_string()).collect();
            match engine.run_executable(target, &rest) {
                Ok(status) if !status.success() => {
                    eprintln!("{} '{}' returned {}", "!".yellow(), target, status);
                }
                Ok(_) => {}
                Err(e) => eprintln!("{} {}", "x".red(), e),
            }
        }
        "help" => {
            println!(
                "available commands:\n\
                 note: a file refers to a regular file or directory,\n\
                 \x20     patterns accept globs\n\
                 \x20 add [-t] [-r] <files> - add files to the registry\n\
                 \x20 build - run a build pass now\n\
                 \x20 delete <patterns> - remove files from the registry\n\
                 \x20 help - show this help\n\
                 \x20 list - list the registry\n\
                 \x20 pause - un-/pause the builder\n\
                 \x20 run [target [args]] - run an executable\n\
                 \x20 quit - quit"
            );
        }
        "quit" | "exit" => return false,
        _ => eprintln!("command '{}' not found", command),
    }
    true
}
