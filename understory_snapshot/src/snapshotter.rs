// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Running a single snapshot check.

use std::panic::Location;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::compare::{ComparisonRequest, ImageComparator, SnapshotIdentity};
use crate::config::validate_tolerance;
use crate::name::{sanitize_name, test_file_name};
use crate::path::resolve_reference_directory;
use crate::view::{HasVisualRoot, RenderPath};
use crate::{ConfigError, SnapshotConfig};

/// Per-check options. All fields are optional refinements of the run
/// configuration.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CheckOptions {
    /// Snapshot name. Defaults to the current example's description.
    pub name: Option<String>,
    /// Ignore device-specific rendering differences.
    pub device_agnostic: bool,
    /// Render with [`RenderPath::ViewHierarchy`] instead of the default.
    pub uses_alternate_render_path: bool,
    /// Tolerance for this check. Defaults to [`SnapshotConfig::tolerance`].
    pub tolerance: Option<f64>,
}

/// Where a check comes from: the calling source file and the test example
/// it runs in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckContext {
    source_file: PathBuf,
    example: Option<String>,
}

impl CheckContext {
    /// Creates a context for a check made from `source_file`, with the
    /// current example taken from the test thread's name.
    pub fn new(source_file: impl Into<PathBuf>) -> Self {
        Self {
            source_file: source_file.into(),
            example: current_example(),
        }
    }

    /// Creates a context for the caller's source location.
    #[track_caller]
    pub fn here() -> Self {
        Self::from_location(Location::caller())
    }

    /// Creates a context for a source location captured with
    /// `#[track_caller]`.
    ///
    /// `file!()` paths are relative to the workspace root, while tests run
    /// from the package directory. Relative paths are anchored at the first
    /// ancestor of `CARGO_MANIFEST_DIR` that contains them.
    pub fn from_location(location: &Location<'_>) -> Self {
        Self::new(locate_source(Path::new(location.file())))
    }

    /// Replaces the current example description.
    #[must_use]
    pub fn with_example(mut self, example: Option<String>) -> Self {
        self.example = example;
        self
    }

    /// The calling source file.
    #[must_use]
    pub fn source_file(&self) -> &Path {
        &self.source_file
    }

    /// The current example description, if known.
    #[must_use]
    pub fn example(&self) -> Option<&str> {
        self.example.as_deref()
    }
}

/// Returns the description of the running test, if any.
///
/// libtest names each test's thread after the test path.
fn current_example() -> Option<String> {
    std::thread::current()
        .name()
        .filter(|name| *name != "main")
        .map(str::to_owned)
}

fn locate_source(file: &Path) -> PathBuf {
    if file.is_absolute() {
        return file.to_path_buf();
    }
    let Some(manifest_dir) = std::env::var_os("CARGO_MANIFEST_DIR") else {
        return file.to_path_buf();
    };
    Path::new(&manifest_dir)
        .ancestors()
        .map(|ancestor| ancestor.join(file))
        .find(|candidate| candidate.exists())
        .unwrap_or_else(|| file.to_path_buf())
}

/// Outcome of one check.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ComparisonResult {
    /// Whether the check passed.
    pub passed: bool,
    /// Explanation, empty when the check passed.
    pub message: String,
}

impl ComparisonResult {
    fn pass() -> Self {
        Self {
            passed: true,
            message: String::new(),
        }
    }

    fn fail(message: String) -> Self {
        Self {
            passed: false,
            message,
        }
    }
}

/// Runs snapshot checks with a fixed configuration and image comparator.
#[derive(Debug)]
pub struct Snapshotter<C> {
    config: SnapshotConfig,
    comparator: C,
}

impl<C: ImageComparator> Snapshotter<C> {
    /// Creates a snapshotter.
    pub fn new(config: SnapshotConfig, comparator: C) -> Self {
        Self { config, comparator }
    }

    /// The run configuration.
    #[must_use]
    pub fn config(&self) -> &SnapshotConfig {
        &self.config
    }

    /// Mutable access to the run configuration, for suite setup.
    pub fn config_mut(&mut self) -> &mut SnapshotConfig {
        &mut self.config
    }

    /// The image comparator.
    #[must_use]
    pub fn comparator(&self) -> &C {
        &self.comparator
    }

    /// Mutable access to the image comparator.
    pub fn comparator_mut(&mut self) -> &mut C {
        &mut self.comparator
    }

    /// Checks `subject` against its reference image.
    ///
    /// In record mode this records instead and fails, see
    /// [`record`](Self::record).
    ///
    /// # Panics
    ///
    /// Panics when the harness is misconfigured: no reference directory can
    /// be inferred, no name is available for the snapshot, or the per-check
    /// tolerance is negative or not finite.
    pub fn check(
        &mut self,
        subject: &mut dyn HasVisualRoot,
        options: &CheckOptions,
        context: &CheckContext,
    ) -> ComparisonResult {
        let record = self.config.is_recording();
        self.run(subject, options, context, record)
    }

    /// Records `subject` as the new reference image, regardless of mode.
    ///
    /// Always fails, with a message saying whether the reference was
    /// written, so a recording call cannot be left in a passing suite.
    ///
    /// # Panics
    ///
    /// Panics under the same conditions as [`check`](Self::check).
    pub fn record(
        &mut self,
        subject: &mut dyn HasVisualRoot,
        options: &CheckOptions,
        context: &CheckContext,
    ) -> ComparisonResult {
        self.run(subject, options, context, true)
    }

    fn run(
        &mut self,
        subject: &mut dyn HasVisualRoot,
        options: &CheckOptions,
        context: &CheckContext,
        record: bool,
    ) -> ComparisonResult {
        let view = subject.visual_root();
        let identity = fatal(identity(options, context));
        let directory = fatal(resolve_reference_directory(
            context.source_file(),
            &self.config,
        ));
        let tolerance = match options.tolerance {
            Some(tolerance) => fatal(validate_tolerance(tolerance)),
            None => self.config.tolerance(),
        };

        debug!(
            name = %identity.sanitized_name,
            test = %identity.test_name,
            directory = %directory.display(),
            tolerance,
            record,
            "snapshot check"
        );

        let request = ComparisonRequest {
            view,
            identity: &identity,
            reference_directory: &directory,
            tolerance,
            device_agnostic: options.device_agnostic,
            render_path: RenderPath::from_alternate(options.uses_alternate_render_path),
            record,
        };
        let outcome = self.comparator.compare(&request);

        if record {
            let shown = identity
                .raw_name
                .as_deref()
                .unwrap_or(&identity.sanitized_name);
            return match outcome {
                Ok(()) => {
                    info!(name = %identity.sanitized_name, "recorded reference snapshot");
                    ComparisonResult::fail(format!(
                        "snapshot {shown} successfully recorded, replace recordSnapshot with a check"
                    ))
                }
                Err(err) => {
                    warn!(
                        name = %identity.sanitized_name,
                        error = %err,
                        "recording snapshot failed"
                    );
                    ComparisonResult::fail(format!(
                        "expected to record a snapshot in {}",
                        identity.sanitized_name
                    ))
                }
            };
        }

        match outcome {
            Ok(()) => ComparisonResult::pass(),
            Err(err) => {
                warn!(name = %identity.sanitized_name, error = %err, "snapshot check failed");
                ComparisonResult::fail(format!(
                    "expected a matching snapshot in {}",
                    identity.sanitized_name
                ))
            }
        }
    }
}

fn identity(
    options: &CheckOptions,
    context: &CheckContext,
) -> Result<SnapshotIdentity, ConfigError> {
    Ok(SnapshotIdentity {
        sanitized_name: sanitize_name(options.name.as_deref(), context.example())?,
        raw_name: options.name.clone(),
        test_name: test_file_name(context.source_file()),
    })
}

/// Configuration errors stop the run; they are never test failures.
fn fatal<T>(result: Result<T, ConfigError>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => panic!("{err}"),
    }
}
