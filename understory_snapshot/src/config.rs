// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Run configuration: record/verify mode, default tolerance, and where
//! reference images live.
//!
//! A [`SnapshotConfig`] is an ordinary value. It is usually built once at
//! suite setup, handed to a [`Snapshotter`](crate::Snapshotter), and only read
//! afterwards. Nothing here is process-global, so independent suites can run
//! on parallel test threads with different settings.

use std::path::{Path, PathBuf};

use crate::ConfigError;

/// Environment variable that switches a run into record mode when set to
/// `record` (case-insensitive).
pub const MODE_ENV: &str = "UNDERSTORY_SNAPSHOT_TEST";

/// Environment variable that overrides the reference image directory.
pub const REFERENCE_DIR_ENV: &str = "UNDERSTORY_SNAPSHOT_REFERENCE_DIR";

/// Environment variable that sets the default comparison tolerance.
pub const TOLERANCE_ENV: &str = "UNDERSTORY_SNAPSHOT_TOLERANCE";

/// Test folder suffixes searched when no folder has been configured.
///
/// These must be lowercase.
pub const DEFAULT_TEST_FOLDER_SUFFIXES: &[&str] = &["tests", "specs"];

/// Whether checks compare against references or overwrite them.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum SnapshotMode {
    /// Compare rendered output against existing reference images.
    #[default]
    Verify,
    /// Write reference images. Every check fails so the mode is not left on.
    Record,
}

/// Configuration shared by every check of a run.
#[derive(Clone, Debug, PartialEq)]
pub struct SnapshotConfig {
    reference_images_directory: Option<PathBuf>,
    tolerance: f64,
    mode: SnapshotMode,
    test_folder_suffixes: Vec<String>,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            reference_images_directory: None,
            tolerance: 0.0,
            mode: SnapshotMode::Verify,
            test_folder_suffixes: DEFAULT_TEST_FOLDER_SUFFIXES
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
        }
    }
}

impl SnapshotConfig {
    /// Creates the default configuration: verify mode, exact matching, and
    /// reference directories inferred from `tests`/`specs` folders.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the default configuration with overrides from the environment.
    ///
    /// See [`MODE_ENV`], [`REFERENCE_DIR_ENV`], and [`TOLERANCE_ENV`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if var(MODE_ENV).is_some_and(|v| v.eq_ignore_ascii_case("record")) {
            config.set_record_mode(true);
        }
        if let Some(dir) = var(REFERENCE_DIR_ENV).filter(|v| !v.is_empty()) {
            config.set_reference_images_directory(Some(PathBuf::from(dir)));
        }
        if let Some(raw) = var(TOLERANCE_ENV) {
            let tolerance = raw
                .trim()
                .parse::<f64>()
                .map_err(|_| ConfigError::InvalidTolerance { value: raw.clone() })?;
            config.try_set_tolerance(tolerance)?;
        }
        Ok(config)
    }

    /// Sets a fixed directory for reference images.
    ///
    /// When set, per-check inference from the calling source file is skipped
    /// entirely. `None` restores inference.
    pub fn set_reference_images_directory(&mut self, directory: Option<PathBuf>) -> &mut Self {
        self.reference_images_directory = directory;
        self
    }

    /// Sets the tolerance used by checks that do not specify their own.
    ///
    /// # Panics
    ///
    /// Panics if `tolerance` is negative or not finite.
    pub fn set_tolerance(&mut self, tolerance: f64) -> &mut Self {
        if let Err(err) = self.try_set_tolerance(tolerance) {
            panic!("{err}");
        }
        self
    }

    /// Sets the default tolerance, rejecting negative and non-finite values.
    pub fn try_set_tolerance(&mut self, tolerance: f64) -> Result<&mut Self, ConfigError> {
        self.tolerance = validate_tolerance(tolerance)?;
        Ok(self)
    }

    /// Replaces the test folder suffixes with the single, lowercased `folder`.
    ///
    /// The defaults are not kept: after `set_test_folder("CustomFolder")`
    /// a path through `AppSpecs` no longer resolves.
    pub fn set_test_folder(&mut self, folder: &str) -> &mut Self {
        self.test_folder_suffixes = vec![folder.to_lowercase()];
        self
    }

    /// Switches between [`SnapshotMode::Record`] and [`SnapshotMode::Verify`].
    pub fn set_record_mode(&mut self, record: bool) -> &mut Self {
        self.mode = if record {
            SnapshotMode::Record
        } else {
            SnapshotMode::Verify
        };
        self
    }

    /// Returns the reference directory override, if any.
    #[must_use]
    pub fn reference_images_directory(&self) -> Option<&Path> {
        self.reference_images_directory.as_deref()
    }

    /// Returns the default tolerance.
    #[must_use]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Returns the current mode.
    #[must_use]
    pub fn mode(&self) -> SnapshotMode {
        self.mode
    }

    /// Returns `true` in record mode.
    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.mode == SnapshotMode::Record
    }

    /// Returns the lowercase test folder suffixes.
    #[must_use]
    pub fn test_folder_suffixes(&self) -> &[String] {
        &self.test_folder_suffixes
    }
}

/// Accepts finite, non-negative tolerances.
pub(crate) fn validate_tolerance(tolerance: f64) -> Result<f64, ConfigError> {
    if !tolerance.is_finite() || tolerance < 0.0 {
        return Err(ConfigError::InvalidTolerance {
            value: tolerance.to_string(),
        });
    }
    Ok(tolerance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_verify_exactly() {
        let config = SnapshotConfig::new();
        assert_eq!(config.mode(), SnapshotMode::Verify);
        assert_eq!(config.tolerance(), 0.0);
        assert_eq!(config.reference_images_directory(), None);
        assert_eq!(config.test_folder_suffixes(), &["tests", "specs"]);
    }

    #[test]
    fn set_test_folder_replaces_and_lowercases() {
        let mut config = SnapshotConfig::new();
        config.set_test_folder("CustomFolder");
        assert_eq!(config.test_folder_suffixes(), &["customfolder"]);
    }

    #[test]
    fn setters_are_independent() {
        let mut config = SnapshotConfig::new();
        config
            .set_record_mode(true)
            .set_tolerance(0.25)
            .set_reference_images_directory(Some("/refs".into()));
        assert!(config.is_recording());
        assert_eq!(config.tolerance(), 0.25);
        assert_eq!(config.reference_images_directory(), Some(Path::new("/refs")));

        config.set_record_mode(false);
        assert_eq!(config.mode(), SnapshotMode::Verify);
        assert_eq!(config.tolerance(), 0.25);
    }

    #[test]
    fn rejects_negative_tolerance() {
        let mut config = SnapshotConfig::new();
        assert!(config.try_set_tolerance(-0.5).is_err());
        assert!(config.try_set_tolerance(f64::NAN).is_err());
        assert_eq!(config.tolerance(), 0.0);
    }

    #[test]
    #[should_panic(expected = "invalid snapshot tolerance")]
    fn set_tolerance_panics_on_infinity() {
        SnapshotConfig::new().set_tolerance(f64::INFINITY);
    }

    #[test]
    fn env_overrides() {
        let config = SnapshotConfig::from_vars(|key| match key {
            MODE_ENV => Some("Record".into()),
            REFERENCE_DIR_ENV => Some("/tmp/refs".into()),
            TOLERANCE_ENV => Some(" 0.1 ".into()),
            _ => None,
        })
        .unwrap();
        assert!(config.is_recording());
        assert_eq!(
            config.reference_images_directory(),
            Some(Path::new("/tmp/refs"))
        );
        assert_eq!(config.tolerance(), 0.1);
    }

    #[test]
    fn env_without_overrides_is_default() {
        let config = SnapshotConfig::from_vars(|_| None).unwrap();
        assert_eq!(config, SnapshotConfig::default());
    }

    #[test]
    fn env_rejects_garbage_tolerance() {
        let err = SnapshotConfig::from_vars(|key| (key == TOLERANCE_ENV).then(|| "lots".into()))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidTolerance {
                value: "lots".into()
            }
        );
    }
}
