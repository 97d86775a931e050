// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reference directory resolution.

use std::path::{Path, PathBuf};

use crate::{ConfigError, SnapshotConfig};

/// Folder appended to the inferred test directory.
pub const REFERENCE_IMAGES_FOLDER: &str = "ReferenceImages";

/// Resolves the directory holding reference images for checks made from
/// `source_file`.
///
/// A configured override is returned as-is. Otherwise the first component of
/// `source_file` whose lowercase form ends with one of the configured test
/// folder suffixes is located, the path is truncated after it, and
/// [`REFERENCE_IMAGES_FOLDER`] is appended:
///
/// ```rust
/// use std::path::Path;
/// use understory_snapshot::{SnapshotConfig, resolve_reference_directory};
///
/// let config = SnapshotConfig::new();
/// let dir = resolve_reference_directory(Path::new("/src/MyAppTests/Sub/view.rs"), &config);
/// assert_eq!(dir.unwrap(), Path::new("/src/MyAppTests/ReferenceImages"));
/// ```
pub fn resolve_reference_directory(
    source_file: &Path,
    config: &SnapshotConfig,
) -> Result<PathBuf, ConfigError> {
    if let Some(directory) = config.reference_images_directory() {
        return Ok(directory.to_path_buf());
    }

    let suffixes = config.test_folder_suffixes();
    let components: Vec<_> = source_file.components().collect();
    let test_folder = components.iter().position(|component| {
        let name = component.as_os_str().to_string_lossy().to_lowercase();
        suffixes.iter().any(|suffix| name.ends_with(suffix.as_str()))
    });

    let Some(index) = test_folder else {
        return Err(ConfigError::NoReferenceDirectory {
            source_file: source_file.to_path_buf(),
            suffixes: suffixes.to_vec(),
        });
    };

    let mut directory: PathBuf = components[..=index].iter().collect();
    directory.push(REFERENCE_IMAGES_FOLDER);
    Ok(directory)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(path: &str, config: &SnapshotConfig) -> Result<PathBuf, ConfigError> {
        resolve_reference_directory(Path::new(path), config)
    }

    #[test]
    fn truncates_after_test_folder() {
        let config = SnapshotConfig::new();
        assert_eq!(
            resolve("/work/MyAppTests/Sub/File.swift", &config).unwrap(),
            Path::new("/work/MyAppTests/ReferenceImages")
        );
    }

    #[test]
    fn suffix_match_is_case_insensitive() {
        let config = SnapshotConfig::new();
        assert_eq!(
            resolve("/work/AppSPECS/view.rs", &config).unwrap(),
            Path::new("/work/AppSPECS/ReferenceImages")
        );
    }

    #[test]
    fn first_matching_component_wins() {
        let config = SnapshotConfig::new();
        assert_eq!(
            resolve("/work/unit_tests/integration_tests/view.rs", &config).unwrap(),
            Path::new("/work/unit_tests/ReferenceImages")
        );
    }

    #[test]
    fn relative_paths_stay_relative() {
        let config = SnapshotConfig::new();
        assert_eq!(
            resolve("understory_snapshot/tests/matchers.rs", &config).unwrap(),
            Path::new("understory_snapshot/tests/ReferenceImages")
        );
    }

    #[test]
    fn override_skips_inference() {
        let mut config = SnapshotConfig::new();
        config.set_reference_images_directory(Some("/refs".into()));
        assert_eq!(resolve("/nowhere/view.rs", &config).unwrap(), Path::new("/refs"));
        assert_eq!(
            resolve("/work/MyAppTests/view.rs", &config).unwrap(),
            Path::new("/refs")
        );
    }

    #[test]
    fn missing_test_folder_is_an_error() {
        let config = SnapshotConfig::new();
        let err = resolve("/work/app/src/view.rs", &config).unwrap_err();
        assert_eq!(
            err,
            ConfigError::NoReferenceDirectory {
                source_file: PathBuf::from("/work/app/src/view.rs"),
                suffixes: vec!["tests".into(), "specs".into()],
            }
        );
    }

    #[test]
    fn custom_folder_replaces_defaults() {
        let mut config = SnapshotConfig::new();
        config.set_test_folder("CustomFolder");

        assert_eq!(
            resolve("/work/Tests/ACustomFolder/view.rs", &config).unwrap(),
            Path::new("/work/Tests/ACustomFolder/ReferenceImages")
        );
        assert!(resolve("/work/AppSpecs/view.rs", &config).is_err());
        assert!(resolve("/work/AppTests/view.rs", &config).is_err());
    }
}
