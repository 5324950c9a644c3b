//! Path classification.
//!
//! # Responsibilities
//! - Bring request paths into one canonical form before any matching
//! - Decide whether the gatekeeper runs for a path at all
//! - Sort a path into a protected role tree, an auth-entry page, or public
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - A tree or page matches itself and anything nested under it
//! - No regex; prefix checks only
//! - Requests are forwarded with the canonical path, so the upstream sees
//!   exactly what was matched

use std::fmt;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use thiserror::Error;

use crate::auth::Role;
use crate::config::RoutingConfig;
use crate::security::sensitive::is_within;

/// Bytes escaped when a canonical segment goes back into a URI.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b';')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// A request path that cannot be brought into canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("path is not UTF-8 once percent-decoded")]
    InvalidUtf8,

    #[error("path contains a control character or backslash")]
    DisallowedCharacter,
}

/// Decoded request path: percent-escapes resolved, empty and `.` segments
/// dropped, `..` applied, `;` parameters removed, no trailing slash.
///
/// Decoding happens exactly once, in [`CanonicalPath::parse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalPath(String);

impl CanonicalPath {
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let decoded = percent_decode_str(raw)
            .decode_utf8()
            .map_err(|_| PathError::InvalidUtf8)?;
        if decoded.chars().any(|c| c.is_control() || c == '\\') {
            return Err(PathError::DisallowedCharacter);
        }

        let mut segments: Vec<&str> = Vec::new();
        for segment in decoded.split('/') {
            let segment = segment.split(';').next().unwrap_or_default();
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                segment => segments.push(segment),
            }
        }

        if segments.is_empty() {
            return Ok(Self("/".to_string()));
        }
        let mut path = String::with_capacity(decoded.len());
        for segment in segments {
            path.push('/');
            path.push_str(segment);
        }
        Ok(Self(path))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Percent-encoded form for the forwarded request URI.
    pub fn to_uri_path(&self) -> String {
        if self.0 == "/" {
            return "/".to_string();
        }
        let mut encoded = String::with_capacity(self.0.len());
        for segment in self.0.split('/').skip(1) {
            encoded.push('/');
            encoded.extend(utf8_percent_encode(segment, SEGMENT));
        }
        encoded
    }
}

impl fmt::Display for CanonicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical form of a configured path; values that do not parse are kept verbatim.
pub(crate) fn canonical_config_path(path: &str) -> String {
    CanonicalPath::parse(path)
        .map(|p| p.0)
        .unwrap_or_else(|_| path.to_string())
}

/// What kind of page a path is, from the access router's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathClass {
    /// Inside a role's protected tree.
    Protected(Role),
    /// Login or signup page.
    AuthEntry,
    Public,
}

impl PathClass {
    /// Whether the decision for this class depends on who is asking.
    pub fn needs_identity(&self) -> bool {
        !matches!(self, PathClass::Public)
    }
}

/// Compiled path rules. Immutable after construction.
#[derive(Debug, Clone)]
pub struct PathRules {
    auth_entry_paths: Vec<String>,
    login_path: String,
    excluded_prefixes: Vec<String>,
    excluded_extensions: Vec<String>,
}

impl PathRules {
    pub fn from_config(config: &RoutingConfig) -> Self {
        Self {
            auth_entry_paths: config
                .auth_entry_paths
                .iter()
                .map(|p| canonical_config_path(p))
                .collect(),
            login_path: canonical_config_path(&config.login_path),
            excluded_prefixes: config.excluded_prefixes.clone(),
            excluded_extensions: config
                .excluded_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// Static assets and build internals bypass the gatekeeper entirely.
    pub fn is_excluded(&self, path: &CanonicalPath) -> bool {
        let path = path.as_str();
        if self.excluded_prefixes.iter().any(|p| path.starts_with(p.as_str())) {
            return true;
        }
        let file = path.rsplit('/').next().unwrap_or_default();
        match file.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => {
                let ext = ext.to_ascii_lowercase();
                self.excluded_extensions.iter().any(|e| *e == ext)
            }
            _ => false,
        }
    }

    pub fn classify(&self, path: &CanonicalPath) -> PathClass {
        let path = path.as_str();
        if let Some(role) = Role::ALL.into_iter().find(|r| is_within(path, r.tree_prefix())) {
            return PathClass::Protected(role);
        }
        if self.auth_entry_paths.iter().any(|p| is_within(path, p)) {
            return PathClass::AuthEntry;
        }
        PathClass::Public
    }
}
