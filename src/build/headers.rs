//! Header dependency discovery via the compiler's make-rule output.
//!
//! `cc -MM -MG <source>` prints a rule like
//! `foo.o: src/foo.c include/foo.h \` with backslash-escaped spaces and
//! `\<newline>` continuations. The escaping rules are load-bearing: a header
//! path containing a space must survive the round trip, and a continuation
//! must act as a token separator, so this parser handles both explicitly
//! instead of splitting on whitespace.

use crate::config::CincConfig;
use crate::error::EngineError;
use crate::registry::{FileFlags, Registry};
use colored::*;
use std::process::Command;
use std::time::SystemTime;

/// Extract the prerequisite paths from one make rule.
///
/// Everything up to the first unescaped `:` is the target and is discarded;
/// the rest is tokenized with `\x` taken literally and `\<newline>` treated
/// as a separator. The first prerequisite is the source file itself, which
/// callers register like any other dependency.
pub fn parse_make_rule(rule: &str) -> Vec<String> {
    let mut chars = rule.chars().peekable();

    // Skip the target, honoring escapes so `weird\:name.o` does not end it.
    while let Some(c) = chars.next() {
        if c == '\\' {
            chars.next();
        } else if c == ':' {
            break;
        }
    }

    let mut tokens = Vec::new();
    let mut token = String::new();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                // Line continuation, acts as a separator.
                Some('\n') => flush(&mut tokens, &mut token),
                Some('\r') => {
                    if chars.peek() == Some(&'\n') {
                        chars.next();
                    }
                    flush(&mut tokens, &mut token);
                }
                Some(esc) => token.push(esc),
                None => {}
            },
            ' ' | '\t' | '\n' | '\r' => flush(&mut tokens, &mut token),
            _ => token.push(c),
        }
    }
    flush(&mut tokens, &mut token);
    tokens
}

fn flush(tokens: &mut Vec<String>, token: &mut String) {
    if !token.is_empty() {
        tokens.push(std::mem::take(token));
    }
}

/// Ask the compiler for the transitive include closure of `source`.
///
/// A listing failure is not fatal: the compile step that follows will surface
/// the real error, so this reports and returns an empty list.
pub fn list_dependencies(config: &CincConfig, source: &str) -> Result<Vec<String>, EngineError> {
    let output = Command::new(&config.cc)
        .args(["-MM", "-MG", source])
        .output()
        .map_err(|e| EngineError::ProcessSpawnFailed(config.cc.clone(), e))?;
    if !output.status.success() {
        eprintln!(
            "{} dependency listing for '{}' failed:\n{}",
            "!".yellow(),
            source,
            String::from_utf8_lossy(&output.stderr)
        );
        return Ok(Vec::new());
    }
    Ok(parse_make_rule(&String::from_utf8_lossy(&output.stdout)))
}

/// True when any header the compiler reports for `source` is newer than
/// `threshold`. Every reported path is registered and stat'ed on the way, so
/// later passes keep watching headers discovered here.
pub fn dependency_newer_than(
    registry: &mut Registry,
    config: &CincConfig,
    source: &str,
    threshold: SystemTime,
) -> Result<bool, EngineError> {
    let mut newer = false;
    for dep in list_dependencies(config, source)? {
        let index = match registry.insert_or_update(&dep, None, FileFlags::empty(), config) {
            Ok(i) => i,
            Err(e) => {
                // Typically a header outside the permitted root; it still
                // cannot be watched, so it cannot trigger rebuilds either.
                eprintln!("{} {}", "!".yellow(), e);
                continue;
            }
        };
        if let Some(file) = registry.get(index)
            && let Some(mtime) = file.mtime
            && mtime > threshold
        {
            newer = true;
        }
    }
    Ok(newer)
}
