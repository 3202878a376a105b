//! Project-local compiler flags.
//!
//! A project may drop a `.ccode` file next to its sources (or in any parent
//! directory) holding the compiler flags the engine should parse with, e.g.
//! `-Iinclude -DDEBUG -std=c11`. The contents are expanded like shell words.
//! A missing or unreadable file simply means "no extra flags".

use std::path::{Path, PathBuf};

/// Name of the per-project flag file.
pub const PROJECT_FILE: &str = ".ccode";

/// Find the nearest `.ccode` at or above the directory containing `source_file`.
pub fn find_project_file(source_file: &Path) -> Option<PathBuf> {
    let mut current = source_file.parent()?;

    loop {
        let candidate = current.join(PROJECT_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }

        current = current.parent()?;
    }
}

/// Load the flag list for `source_file`. Never fails.
pub fn load_flags(source_file: &Path) -> Vec<String> {
    let Some(project_file) = find_project_file(source_file) else {
        return Vec::new();
    };

    let contents = match std::fs::read_to_string(&project_file) {
        Ok(contents) => contents,
        Err(err) => {
            tracing::debug!("Ignoring unreadable {}: {err}", project_file.display());
            return Vec::new();
        }
    };

    let words = expand_words(contents.trim());
    let base = project_file.parent().unwrap_or_else(|| Path::new("/"));
    let flags = absolutize_include_dirs(words, base);
    tracing::debug!("Loaded {} flag(s) from {}", flags.len(), project_file.display());
    flags
}

/// Split `input` into words the way a POSIX shell would, expanding
/// variables and a leading `~`.
///
/// Supported: whitespace separation, single quotes (literal), double quotes
/// (with `\` escapes and variable expansion), backslash escapes, `$NAME`,
/// `${NAME}`. Unset variables expand to nothing.
pub fn expand_words(input: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            '\'' => {
                in_word = true;
                for c in chars.by_ref() {
                    if c == '\'' {
                        break;
                    }
                    current.push(c);
                }
            }
            '"' => {
                in_word = true;
                while let Some(c) = chars.next() {
                    match c {
                        '"' => break,
                        '\\' => {
                            if let Some(next) = chars.next() {
                                current.push(next);
                            }
                        }
                        '$' => expand_variable(&mut chars, &mut current),
                        _ => current.push(c),
                    }
                }
            }
            '\\' => {
                in_word = true;
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            '$' => {
                in_word = true;
                expand_variable(&mut chars, &mut current);
            }
            '~' if !in_word => {
                in_word = true;
                match std::env::var("HOME") {
                    Ok(home) => current.push_str(&home),
                    Err(_) => current.push('~'),
                }
            }
            _ => {
                in_word = true;
                current.push(ch);
            }
        }
    }

    if in_word {
        words.push(current);
    }
    words
}

fn expand_variable(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, out: &mut String) {
    let mut name = String::new();

    if chars.peek() == Some(&'{') {
        chars.next();
        for c in chars.by_ref() {
            if c == '}' {
                break;
            }
            name.push(c);
        }
    } else {
        while let Some(&c) = chars.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                name.push(c);
                chars.next();
            } else {
                break;
            }
        }
    }

    if name.is_empty() {
        out.push('$');
    } else if let Ok(value) = std::env::var(&name) {
        out.push_str(&value);
    }
}

/// Rewrite relative `-I`/`-isystem` directories so they no longer depend on
/// the daemon's working directory.
fn absolutize_include_dirs(words: Vec<String>, base: &Path) -> Vec<String> {
    let mut flags = Vec::with_capacity(words.len());
    let mut words = words.into_iter();

    while let Some(word) = words.next() {
        match word.as_str() {
            "-I" | "-isystem" => {
                let dir = words.next();
                flags.push(word);
                if let Some(dir) = dir {
                    flags.push(absolutize(base, &dir));
                }
            }
            _ => {
                if let Some(dir) = word.strip_prefix("-I") {
                    flags.push(format!("-I{}", absolutize(base, dir)));
                } else {
                    flags.push(word);
                }
            }
        }
    }
    flags
}

fn absolutize(base: &Path, dir: &str) -> String {
    let path = Path::new(dir);
    if path.is_absolute() {
        dir.to_string()
    } else {
        base.join(path).to_string_lossy().into_owned()
    }
}
