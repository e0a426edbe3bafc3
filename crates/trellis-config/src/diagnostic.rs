// SPDX-FileCopyrightText: 2026 Trellis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration diagnostics: figment errors mapped onto miette reports.
//!
//! Unknown keys are located in the TOML text that produced them so the
//! report can underline the key, and a close valid key is offered when one
//! exists.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use figment::error::Kind;
use miette::{Diagnostic, GraphicalReportHandler, NamedSource, SourceSpan};
use thiserror::Error;

/// Jaro-Winkler score a valid key must reach to be offered as a correction.
const SUGGESTION_THRESHOLD: f64 = 0.8;

/// A configuration problem found while loading or validating `trellis.toml`.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown key `{key}` in {}", section_label(.section.as_deref()))]
    #[diagnostic(
        code(trellis::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        /// Enclosing table, `None` at the top level.
        section: Option<String>,
        suggestion: Option<String>,
        valid_keys: Vec<&'static str>,
        #[label("not a recognized key")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("`{key}` has the wrong type: found {found}")]
    #[diagnostic(code(trellis::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        found: String,
        expected: String,
    },

    /// A value that deserialized but makes no sense for the host.
    #[error("`{key}`: {message}")]
    #[diagnostic(code(trellis::config::invalid_value))]
    Validation { key: &'static str, message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(trellis::config::other))]
    Other(String),
}

fn section_label(section: Option<&str>) -> String {
    match section {
        Some(section) => format!("[{section}]"),
        None => "the top level".to_string(),
    }
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &[&'static str]) -> String {
    let valid = valid_keys.join(", ");
    match suggestion {
        Some(key) => format!("did you mean `{key}`? expected one of: {valid}"),
        None => format!("expected one of: {valid}"),
    }
}

/// Map every error carried by a `figment::Error` to a [`ConfigError`].
///
/// `toml_sources` holds `(name, contents)` pairs for the files that fed the
/// figment; they are only used to attach source spans.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| {
            let path: Vec<String> = error.path.clone();
            match &error.kind {
                Kind::UnknownField(key, expected) => {
                    let section = path.first().filter(|s| *s != key).cloned();
                    let (span, src) = toml_source_for(&error, toml_sources)
                        .and_then(|(name, text)| {
                            let offset = locate_key(text, section.as_deref(), key)?;
                            Some((
                                SourceSpan::new(offset.into(), key.len()),
                                NamedSource::new(name, text.clone()),
                            ))
                        })
                        .unzip();

                    ConfigError::UnknownKey {
                        suggestion: suggest_key(key, expected),
                        key: key.clone(),
                        section,
                        valid_keys: expected.to_vec(),
                        span,
                        src,
                    }
                }
                Kind::InvalidType(found, expected) => ConfigError::InvalidType {
                    key: path.join("."),
                    found: found.to_string(),
                    expected: expected.clone(),
                },
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

/// Pick the TOML text the error came from: the matching file, or the only
/// source when the error carries no file metadata (inline strings).
fn toml_source_for<'a>(
    error: &figment::Error,
    toml_sources: &'a [(String, String)],
) -> Option<&'a (String, String)> {
    let file = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|source| match source {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });

    match file {
        Some(file) => toml_sources.iter().find(|(name, _)| *name == file),
        None if toml_sources.len() == 1 => toml_sources.first(),
        None => None,
    }
}

/// Byte offset of `key` inside `[section]` (or before any header when
/// `section` is `None`).
pub fn locate_key(content: &str, section: Option<&str>, key: &str) -> Option<usize> {
    let mut current: Option<&str> = None;
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let trimmed = line.trim_start();
        let indent = line.len() - trimmed.len();

        if let Some(header) = trimmed.strip_prefix('[') {
            current = header.split(']').next().map(str::trim);
        } else if current == section
            && let Some(rest) = trimmed.strip_prefix(key)
            && rest.trim_start().starts_with('=')
        {
            return Some(offset + indent);
        }
        offset += line.len();
    }

    None
}

/// The closest valid key to `unknown`, if it is close enough to be a typo.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (*key, strsim::jaro_winkler(unknown, key)))
        .filter(|(_, score)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(key, _)| key.to_string())
}

/// Render diagnostics as graphical miette reports, one after another.
pub fn render_errors(errors: &[ConfigError]) -> String {
    let handler = GraphicalReportHandler::new();
    let mut out = String::new();

    for error in errors {
        if handler.render_report(&mut out, error).is_err() {
            out.push_str(&format!("error: {error}\n"));
        }
    }
    out
}
