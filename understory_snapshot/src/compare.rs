// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The image-diff capability.
//!
//! The pixel comparison itself, along with reading and writing reference
//! files, lives behind [`ImageComparator`]. `understory_snapshot_kompari`
//! provides a PNG implementation.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::view::{RenderError, RenderPath, View};

/// The stable identity of one snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SnapshotIdentity {
    /// File-name-safe snapshot name.
    pub sanitized_name: String,
    /// The name the caller passed, before sanitizing.
    pub raw_name: Option<String>,
    /// Name of the test group, taken from the calling source file.
    pub test_name: String,
}

/// Everything a comparator needs for a single check.
#[derive(Clone, Copy)]
pub struct ComparisonRequest<'a> {
    /// The view to render.
    pub view: &'a dyn View,
    /// Which snapshot this is.
    pub identity: &'a SnapshotIdentity,
    /// Root directory for reference images.
    pub reference_directory: &'a Path,
    /// Maximum allowed difference, in comparator-defined units.
    pub tolerance: f64,
    /// Ignore device-specific properties such as screen scale.
    pub device_agnostic: bool,
    /// How to render the view.
    pub render_path: RenderPath,
    /// Write the reference instead of comparing against it.
    pub record: bool,
}

impl fmt::Debug for ComparisonRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComparisonRequest")
            .field("identity", self.identity)
            .field("reference_directory", &self.reference_directory)
            .field("tolerance", &self.tolerance)
            .field("device_agnostic", &self.device_agnostic)
            .field("render_path", &self.render_path)
            .field("record", &self.record)
            .finish_non_exhaustive()
    }
}

/// Why a comparison or recording did not succeed.
#[derive(Debug)]
pub enum CompareError {
    /// The view could not be rendered.
    Render(RenderError),
    /// No reference image exists at `path`.
    MissingReference {
        /// Where the reference was expected.
        path: PathBuf,
    },
    /// The rendered image differs from the reference by more than the
    /// tolerance allows.
    Mismatch {
        /// Reference image path.
        path: PathBuf,
        /// Human-readable description of the difference.
        detail: String,
    },
    /// Reading or writing a file failed.
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// A reference file exists but could not be decoded or encoded.
    Codec {
        /// File being decoded or encoded.
        path: PathBuf,
        /// Description of the failure.
        detail: String,
    },
}

impl fmt::Display for CompareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Render(err) => err.fmt(f),
            Self::MissingReference { path } => {
                write!(f, "missing reference image `{}`", path.display())
            }
            Self::Mismatch { path, detail } => {
                write!(f, "snapshot differs from `{}`: {detail}", path.display())
            }
            Self::Io { path, source } => write!(f, "i/o error on `{}`: {source}", path.display()),
            Self::Codec { path, detail } => {
                write!(f, "cannot decode or encode `{}`: {detail}", path.display())
            }
        }
    }
}

impl core::error::Error for CompareError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Render(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<RenderError> for CompareError {
    fn from(err: RenderError) -> Self {
        Self::Render(err)
    }
}

/// Compares rendered views against reference images, or records them.
pub trait ImageComparator {
    /// Compares (or, when `request.record` is set, records) one snapshot.
    ///
    /// `Ok(())` means the rendered view matched within tolerance, or that
    /// the reference was written.
    fn compare(&mut self, request: &ComparisonRequest<'_>) -> Result<(), CompareError>;
}

impl<T: ImageComparator + ?Sized> ImageComparator for &mut T {
    fn compare(&mut self, request: &ComparisonRequest<'_>) -> Result<(), CompareError> {
        (**self).compare(request)
    }
}

impl<T: ImageComparator + ?Sized> ImageComparator for Box<T> {
    fn compare(&mut self, request: &ComparisonRequest<'_>) -> Result<(), CompareError> {
        (**self).compare(request)
    }
}
