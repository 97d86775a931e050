// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Snapshot naming.

use std::path::Path;

use crate::ConfigError;

/// Prefix that nested example descriptions carry for the outermost group.
pub const ROOT_EXAMPLE_GROUP_PREFIX: &str = "root example group, ";

/// Turns a snapshot name or example description into a file-name-safe
/// identifier.
///
/// `name` wins over `example`. Every occurrence of
/// [`ROOT_EXAMPLE_GROUP_PREFIX`] is removed, then each UTF-16 code unit of a
/// character outside `[A-Za-z0-9_]` becomes `_`, so characters outside the
/// Basic Multilingual Plane turn into two underscores. Runs of disallowed
/// characters are not collapsed: `"Foo Bar!!"` becomes `"Foo_Bar__"`.
///
/// Returns [`ConfigError::NoCurrentExample`] when both inputs are `None`.
pub fn sanitize_name(name: Option<&str>, example: Option<&str>) -> Result<String, ConfigError> {
    let raw = name.or(example).ok_or(ConfigError::NoCurrentExample)?;
    let stripped = raw.replace(ROOT_EXAMPLE_GROUP_PREFIX, "");
    let mut sanitized = String::with_capacity(stripped.len());
    for c in stripped.chars() {
        if is_allowed(c) {
            sanitized.push(c);
        } else {
            sanitized.extend(std::iter::repeat_n('_', c.len_utf16()));
        }
    }
    Ok(sanitized)
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Returns the test group name for a source file: its file name without the
/// extension.
///
/// Reference images for a check are grouped under this name.
pub fn test_file_name(source_file: &Path) -> String {
    source_file
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}
