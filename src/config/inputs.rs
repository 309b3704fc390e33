//! Credential, target and template inputs.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::{InputPaths, MAX_MESSAGE_LENGTH};
use crate::telegram::Credential;

/// Errors that can occur while loading broadcast inputs.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("{kind} file not found: {}", path.display())]
    Missing { kind: InputKind, path: PathBuf },

    #[error("Failed to read {kind} file {}: {source}", path.display())]
    Unreadable {
        kind: InputKind,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{kind} file {} contains no entries", path.display())]
    Empty { kind: InputKind, path: PathBuf },
}

/// Which input an error or entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Credentials,
    Targets,
    Templates,
}

impl std::fmt::Display for InputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Credentials => "Credentials",
            Self::Targets => "Targets",
            Self::Templates => "Templates",
        };
        f.write_str(name)
    }
}

/// Everything a broadcast round needs, loaded once at startup.
#[derive(Debug, Clone)]
pub struct BroadcastInputs {
    /// Bot tokens, in file order.
    pub credentials: Vec<Credential>,

    /// Raw destination tokens, in file order.
    pub targets: Vec<String>,

    /// Message templates; one is picked at random per send.
    pub templates: Vec<String>,
}

impl BroadcastInputs {
    /// Creates inputs from already-loaded values.
    #[must_use]
    pub const fn new(credentials: Vec<Credential>, targets: Vec<String>, templates: Vec<String>) -> Self {
        Self {
            credentials,
            targets,
            templates,
        }
    }

    /// Loads all three input files.
    ///
    /// When `split_templates` is false the template file is used verbatim as
    /// a single template.
    ///
    /// # Errors
    ///
    /// Returns an error if any file is missing, unreadable or has no entries.
    pub fn load(paths: &InputPaths, split_templates: bool) -> Result<Self, InputError> {
        let credentials = read_lines(&paths.credentials, InputKind::Credentials)?
            .into_iter()
            .map(Credential::new)
            .collect();
        let targets = read_lines(&paths.targets, InputKind::Targets)?;

        let raw = read_input(&paths.templates, InputKind::Templates)?;
        let templates = if split_templates {
            split_templates_text(&raw)
        } else if raw.trim().is_empty() {
            Vec::new()
        } else {
            vec![raw]
        };

        if templates.is_empty() {
            return Err(InputError::Empty {
                kind: InputKind::Templates,
                path: paths.templates.clone(),
            });
        }

        Ok(Self::new(credentials, targets, templates))
    }

    /// Returns the indexes of templates longer than the Bot API allows.
    #[must_use]
    pub fn oversized_templates(&self) -> Vec<usize> {
        self.templates
            .iter()
            .enumerate()
            .filter(|(_, text)| text.chars().count() > MAX_MESSAGE_LENGTH)
            .map(|(index, _)| index)
            .collect()
    }
}

/// Reads a file as UTF-8, mapping a missing file to [`InputError::Missing`].
fn read_input(path: &Path, kind: InputKind) -> Result<String, InputError> {
    std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == ErrorKind::NotFound {
            InputError::Missing {
                kind,
                path: path.to_path_buf(),
            }
        } else {
            InputError::Unreadable {
                kind,
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

/// Reads non-blank, trimmed lines from a file.
///
/// # Errors
///
/// Returns an error if the file is missing, unreadable or has no non-blank lines.
pub fn read_lines(path: &Path, kind: InputKind) -> Result<Vec<String>, InputError> {
    let lines = parse_lines(&read_input(path, kind)?);
    if lines.is_empty() {
        return Err(InputError::Empty {
            kind,
            path: path.to_path_buf(),
        });
    }
    Ok(lines)
}

/// Splits text into trimmed, non-blank lines.
#[must_use]
pub fn parse_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Splits a template file into blocks separated by blank lines.
///
/// Each block is trimmed; empty blocks are discarded. A line holding only
/// whitespace counts as blank.
#[must_use]
pub fn split_templates_text(text: &str) -> Vec<String> {
    let mut templates = Vec::new();
    let mut block: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            push_block(&mut templates, &block);
            block.clear();
        } else {
            block.push(line);
        }
    }
    push_block(&mut templates, &block);

    templates
}

fn push_block(templates: &mut Vec<String>, block: &[&str]) {
    let joined = block.join("\n");
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        templates.push(trimmed.to_owned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lines_skips_blank() {
        let lines = parse_lines("  a \n\n\t\nb\r\n  \nc");
        assert_eq!(lines, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_split_two_templates() {
        assert_eq!(split_templates_text("Hello\n\nWorld"), vec!["Hello", "World"]);
    }

    #[test]
    fn test_split_keeps_multiline_blocks() {
        let text = "\n\nLine one\nLine two\n\n\n   \nSecond\r\n\r\nThird\n";
        assert_eq!(
            split_templates_text(text),
            vec!["Line one\nLine two", "Second", "Third"]
        );
    }

    #[test]
    fn test_split_empty_text() {
        assert!(split_templates_text(" \n\n \n").is_empty());
    }

    #[test]
    fn test_oversized_templates() {
        let inputs = BroadcastInputs::new(
            vec![Credential::new("123:abc")],
            vec!["1".to_owned()],
            vec!["short".to_owned(), "x".repeat(MAX_MESSAGE_LENGTH + 1)],
        );
        assert_eq!(inputs.oversized_templates(), vec![1]);
    }

    #[test]
    fn test_missing_file() {
        let err = read_lines(Path::new("/definitely/not/here.txt"), InputKind::Targets)
            .unwrap_err();
        assert!(matches!(
            err,
            InputError::Missing {
                kind: InputKind::Targets,
                ..
            }
        ));
    }
}
