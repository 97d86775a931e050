// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Configuration errors.
//!
//! These describe a misconfigured harness rather than a broken view. The
//! [`Snapshotter`](crate::Snapshotter) treats the resolution errors as fatal
//! and panics with their `Display` text.

use std::fmt;
use std::path::PathBuf;

/// Error returned when the snapshot harness is not configured well enough to
/// run a check.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// No reference directory override is set and no component of the source
    /// path ends with one of the configured test folder suffixes.
    NoReferenceDirectory {
        /// The source file whose path was searched.
        source_file: PathBuf,
        /// The suffixes that were searched for.
        suffixes: Vec<String>,
    },
    /// No snapshot name was given and there is no current test example to
    /// derive one from.
    NoCurrentExample,
    /// A tolerance that is negative, NaN, or could not be parsed.
    InvalidTolerance {
        /// The rejected input.
        value: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoReferenceDirectory {
                source_file,
                suffixes,
            } => write!(
                f,
                "Could not infer reference image folder for `{}` (no path component ends with any of {suffixes:?}). \
                 Provide one with `SnapshotConfig::set_reference_images_directory`",
                source_file.display()
            ),
            Self::NoCurrentExample => f.write_str(
                "No snapshot name was given and there is no current test example to name it after. \
                 Pass a name or use `CheckContext::with_example`",
            ),
            Self::InvalidTolerance { value } => write!(
                f,
                "invalid snapshot tolerance `{value}`: expected a finite, non-negative number"
            ),
        }
    }
}

impl core::error::Error for ConfigError {}
