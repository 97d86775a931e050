// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! PNG reference images for `understory_snapshot`, compared with Kompari.
//!
//! [`KompariComparator`] implements [`ImageComparator`]. References are laid
//! out as:
//!
//! ```text
//! <reference dir>/<test file stem>/<name>[_<device>][@<scale>x].png
//! ```
//!
//! - `<device>` is only present for device-agnostic checks and describes the
//!   configured [`DeviceProfile`] (`model_os_WxH`, sanitized).
//! - `@<scale>x` is present when the profile's scale is above 1.
//!
//! Tolerance is the fraction of pixels allowed to differ: `0.0` demands an
//! exact match, `0.01` lets one pixel in a hundred differ. Images of different
//! sizes never match.
//!
//! When a failure directory is set, every failed verification writes the
//! rendered image there, mirroring the reference layout, so that
//! `cargo xtask snapshots report` can diff the two trees.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use kompari::{
    Image, ImageDifference, SizeOptimizationLevel, compare_images, image_to_png, load_image,
};
use tracing::{debug, warn};
use understory_snapshot::{
    Bitmap, CompareError, ComparisonRequest, ImageComparator, SnapshotIdentity, sanitize_name,
};

/// The device a run renders for.
///
/// Device-agnostic references embed this description in their file name so
/// that different devices keep separate references.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceProfile {
    /// Device model, e.g. `iPhone 6`.
    pub model: String,
    /// Operating system version, e.g. `10.0`.
    pub os_version: String,
    /// Screen width in points.
    pub screen_width: u32,
    /// Screen height in points.
    pub screen_height: u32,
    /// Pixels per point.
    pub scale: u32,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            model: "headless".into(),
            os_version: std::env::consts::OS.into(),
            screen_width: 0,
            screen_height: 0,
            scale: 1,
        }
    }
}

impl DeviceProfile {
    /// The device part of a device-agnostic file name.
    #[must_use]
    pub fn file_name_suffix(&self) -> String {
        let raw = format!(
            "{}_{}_{}x{}",
            self.model, self.os_version, self.screen_width, self.screen_height
        );
        sanitize_name(Some(&raw), None).unwrap_or(raw)
    }
}

/// Environment variable naming a directory for rendered images of failed
/// checks. Read by [`KompariComparator::from_env`].
pub const FAILURE_DIR_ENV: &str = "UNDERSTORY_SNAPSHOT_FAILURE_DIR";

/// Reads, writes, and compares PNG reference images.
#[derive(Clone, Debug, Default)]
pub struct KompariComparator {
    device: DeviceProfile,
    failure_directory: Option<PathBuf>,
}

impl KompariComparator {
    /// Creates a comparator for the default headless device.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a comparator for the default headless device, writing failed
    /// images to [`FAILURE_DIR_ENV`] when it is set.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var_os(key))
    }

    fn from_vars(var: impl Fn(&str) -> Option<OsString>) -> Self {
        match var(FAILURE_DIR_ENV).filter(|dir| !dir.is_empty()) {
            Some(dir) => Self::new().with_failure_directory(dir),
            None => Self::new(),
        }
    }

    /// Sets the device profile used for file names.
    #[must_use]
    pub fn with_device(mut self, device: DeviceProfile) -> Self {
        self.device = device;
        self
    }

    /// Sets where rendered images of failed checks are written.
    #[must_use]
    pub fn with_failure_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.failure_directory = Some(directory.into());
        self
    }

    /// The device profile.
    #[must_use]
    pub fn device(&self) -> &DeviceProfile {
        &self.device
    }

    /// The failure directory, if set.
    #[must_use]
    pub fn failure_directory(&self) -> Option<&Path> {
        self.failure_directory.as_deref()
    }

    /// File name of the reference image for `identity`.
    #[must_use]
    pub fn file_name(&self, identity: &SnapshotIdentity, device_agnostic: bool) -> String {
        let mut name = identity.sanitized_name.clone();
        if device_agnostic {
            name.push('_');
            name.push_str(&self.device.file_name_suffix());
        }
        if self.device.scale > 1 {
            name.push_str(&format!("@{}x", self.device.scale));
        }
        name.push_str(".png");
        name
    }

    /// Full path of the reference image a request refers to.
    #[must_use]
    pub fn reference_path(&self, request: &ComparisonRequest<'_>) -> PathBuf {
        request
            .reference_directory
            .join(&request.identity.test_name)
            .join(self.file_name(request.identity, request.device_agnostic))
    }

    fn write_failure(&self, request: &ComparisonRequest<'_>, image: &Image) {
        let Some(directory) = &self.failure_directory else {
            return;
        };
        let path = directory
            .join(&request.identity.test_name)
            .join(self.file_name(request.identity, request.device_agnostic));
        match write_png(&path, image, SizeOptimizationLevel::Fast) {
            Ok(()) => debug!(path = %path.display(), "wrote failed snapshot"),
            Err(err) => warn!(error = %err, "could not write failed snapshot"),
        }
    }
}

impl ImageComparator for KompariComparator {
    fn compare(&mut self, request: &ComparisonRequest<'_>) -> Result<(), CompareError> {
        let bitmap = request.view.render(request.render_path)?;
        let path = self.reference_path(request);
        let image = to_image(bitmap).ok_or_else(|| CompareError::Codec {
            path: path.clone(),
            detail: "rendered bitmap has an invalid size".into(),
        })?;

        if request.record {
            write_png(&path, &image, SizeOptimizationLevel::High)?;
            debug!(path = %path.display(), "wrote reference snapshot");
            return Ok(());
        }

        if !path.exists() {
            self.write_failure(request, &image);
            return Err(CompareError::MissingReference { path });
        }

        let expected = load_image(&path).map_err(|err| CompareError::Codec {
            path: path.clone(),
            detail: err.to_string(),
        })?;
        let total_pixels = u64::from(image.width()) * u64::from(image.height());

        match compare_images(&expected, &image) {
            ImageDifference::None => Ok(()),
            ImageDifference::Content {
                n_different_pixels, ..
            } if within_tolerance(n_different_pixels, total_pixels, request.tolerance) => {
                debug!(
                    path = %path.display(),
                    n_different_pixels,
                    tolerance = request.tolerance,
                    "snapshot differs within tolerance"
                );
                Ok(())
            }
            diff => {
                self.write_failure(request, &image);
                Err(CompareError::Mismatch {
                    path,
                    detail: format!("{diff:?}"),
                })
            }
        }
    }
}

/// Whether `different` out of `total` pixels is within `tolerance`, a
/// fraction of the image.
fn within_tolerance(different: u64, total: u64, tolerance: f64) -> bool {
    if different == 0 {
        return true;
    }
    if total == 0 {
        return false;
    }
    let fraction = different as f64 / total as f64;
    fraction <= tolerance
}

/// Converts a rendered bitmap into a Kompari image.
pub fn to_image(bitmap: Bitmap) -> Option<Image> {
    let (width, height) = (bitmap.width(), bitmap.height());
    kompari::image::ImageBuffer::from_raw(width, height, bitmap.into_rgba8())
}

fn write_png(path: &Path, image: &Image, level: SizeOptimizationLevel) -> Result<(), CompareError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| CompareError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, image_to_png(image, level)).map_err(|source| CompareError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(name: &str) -> SnapshotIdentity {
        SnapshotIdentity {
            sanitized_name: name.into(),
            raw_name: None,
            test_name: "BootstrapTests".into(),
        }
    }

    fn phone() -> DeviceProfile {
        DeviceProfile {
            model: "iPhone 6".into(),
            os_version: "10.0".into(),
            screen_width: 375,
            screen_height: 667,
            scale: 2,
        }
    }

    #[test]
    fn plain_file_name() {
        let comparator = KompariComparator::new();
        assert_eq!(comparator.file_name(&identity("a_view"), false), "a_view.png");
    }

    #[test]
    fn scaled_file_name() {
        let comparator = KompariComparator::new().with_device(phone());
        assert_eq!(comparator.file_name(&identity("a_view"), false), "a_view@2x.png");
    }

    #[test]
    fn device_agnostic_file_name() {
        let comparator = KompariComparator::new().with_device(phone());
        assert_eq!(
            comparator.file_name(&identity("a_view"), true),
            "a_view_iPhone_6_10_0_375x667@2x.png"
        );
    }

    #[test]
    fn failure_directory_from_env() {
        let comparator = KompariComparator::from_vars(|key| {
            (key == FAILURE_DIR_ENV).then(|| OsString::from("/tmp/FailureImages"))
        });
        assert_eq!(
            comparator.failure_directory(),
            Some(Path::new("/tmp/FailureImages"))
        );
        assert_eq!(comparator.device(), &DeviceProfile::default());
    }

    #[test]
    fn empty_or_unset_failure_directory_is_ignored() {
        let unset = KompariComparator::from_vars(|_| None);
        assert_eq!(unset.failure_directory(), None);

        let empty = KompariComparator::from_vars(|_| Some(OsString::new()));
        assert_eq!(empty.failure_directory(), None);
    }

    #[test]
    fn tolerance_is_a_fraction_of_pixels() {
        assert!(within_tolerance(0, 100, 0.0));
        assert!(!within_tolerance(1, 100, 0.0));
        assert!(within_tolerance(1, 100, 0.01));
        assert!(!within_tolerance(2, 100, 0.01));
        assert!(within_tolerance(100, 100, 1.0));
        assert!(!within_tolerance(1, 0, 1.0));
    }

    #[test]
    fn bitmap_converts_to_image() {
        let image = to_image(Bitmap::solid(3, 2, [10, 20, 30, 255])).unwrap();
        assert_eq!((image.width(), image.height()), (3, 2));
        assert_eq!(image.get_pixel(2, 1).0, [10, 20, 30, 255]);
    }
}
