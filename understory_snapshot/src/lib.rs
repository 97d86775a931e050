// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Snapshot: reference-image checks for views.
//!
//! This crate decides *which* reference image a check is about and *what* to
//! do with it. It renders nothing and decodes nothing itself. Those jobs
//! belong to the [`View`] being checked and the [`ImageComparator`] doing the
//! pixel work (see `understory_snapshot_kompari` for a PNG implementation).
//!
//! ## Core Concepts
//!
//! - **Naming.** A snapshot is named explicitly, or after the running test.
//!   Names are sanitized to `[A-Za-z0-9_]` by [`sanitize_name`].
//! - **Reference directory.** Either configured, or inferred from the calling
//!   source file by [`resolve_reference_directory`]: the first folder ending
//!   in `tests` or `specs`, plus `ReferenceImages`.
//! - **Mode.** [`SnapshotConfig`] holds the record/verify switch, the default
//!   tolerance, and the test folder suffixes. Record mode writes references
//!   and fails every check so that it is never left on by accident.
//! - **Subjects.** Anything implementing [`HasVisualRoot`]: every [`View`],
//!   and every [`ViewController`] wrapped in [`Presented`].
//!
//! ## Quick Start
//!
//! ```rust
//! use understory_snapshot::{
//!     Bitmap, CompareError, ComparisonRequest, ImageComparator, RenderError, RenderPath,
//!     SnapshotConfig, Snapshotter, View, have_valid_snapshot,
//! };
//!
//! struct Swatch;
//!
//! impl View for Swatch {
//!     fn render(&self, _path: RenderPath) -> Result<Bitmap, RenderError> {
//!         Ok(Bitmap::solid(4, 4, [0, 0, 255, 255]))
//!     }
//! }
//!
//! // A comparator that accepts everything.
//! struct AcceptAll;
//!
//! impl ImageComparator for AcceptAll {
//!     fn compare(&mut self, request: &ComparisonRequest<'_>) -> Result<(), CompareError> {
//!         request.view.render(request.render_path)?;
//!         Ok(())
//!     }
//! }
//!
//! let mut config = SnapshotConfig::new();
//! config.set_reference_images_directory(Some("/tmp/ReferenceImages".into()));
//! let mut snapshotter = Snapshotter::new(config, AcceptAll);
//!
//! snapshotter
//!     .expect(&mut Swatch)
//!     .to(have_valid_snapshot().named("blue swatch"));
//! ```
//!
//! ## Configuration
//!
//! [`SnapshotConfig::from_env`] reads:
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `UNDERSTORY_SNAPSHOT_TEST=record` | record mode |
//! | `UNDERSTORY_SNAPSHOT_REFERENCE_DIR` | fixed reference directory |
//! | `UNDERSTORY_SNAPSHOT_TOLERANCE` | default tolerance |
//!
//! ## Failures
//!
//! A mismatch, or any error from the comparator, fails the check with
//! "expected a matching snapshot in NAME" and logs the cause through
//! `tracing`. A harness that cannot name a snapshot or find its reference
//! directory panics instead: that is a setup bug, not a test failure.

mod compare;
mod config;
mod error;
mod matcher;
mod name;
mod path;
mod snapshotter;
mod view;

pub use compare::{CompareError, ComparisonRequest, ImageComparator, SnapshotIdentity};
pub use config::{
    DEFAULT_TEST_FOLDER_SUFFIXES, MODE_ENV, REFERENCE_DIR_ENV, SnapshotConfig, SnapshotMode,
    TOLERANCE_ENV,
};
pub use error::ConfigError;
pub use matcher::{
    Expectation, FailureMessage, SnapshotMatcher, have_valid_device_agnostic_snapshot,
    have_valid_snapshot, record_device_agnostic_snapshot, record_snapshot,
};
pub use name::{ROOT_EXAMPLE_GROUP_PREFIX, sanitize_name, test_file_name};
pub use path::{REFERENCE_IMAGES_FOLDER, resolve_reference_directory};
pub use snapshotter::{CheckContext, CheckOptions, ComparisonResult, Snapshotter};
pub use view::{Bitmap, HasVisualRoot, Presented, RenderError, RenderPath, View, ViewController};
