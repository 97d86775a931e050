// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Matchers and expectations.
//!
//! The four matcher constructors mirror the usual snapshot assertions:
//!
//! - [`have_valid_snapshot`]
//! - [`have_valid_device_agnostic_snapshot`]
//! - [`record_snapshot`]
//! - [`record_device_agnostic_snapshot`]
//!
//! A matcher fills in a [`FailureMessage`] and returns whether it matched.
//! [`Expectation`] wires that into `#[test]` functions by panicking with the
//! message when an expectation does not hold.

use std::fmt;
use std::panic::Location;

use crate::compare::ImageComparator;
use crate::snapshotter::{CheckContext, CheckOptions, Snapshotter};
use crate::view::HasVisualRoot;

/// The message slots a failed expectation is reported through.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FailureMessage {
    /// Leading word, usually `expected`.
    pub expected: String,
    /// Polarity, `to` or `to not`.
    pub to: String,
    /// What the subject was expected to do.
    pub postfix_message: String,
    /// What actually happened.
    pub actual_value: String,
}

impl FailureMessage {
    /// Empties every slot.
    pub fn clear(&mut self) {
        self.expected.clear();
        self.to.clear();
        self.postfix_message.clear();
        self.actual_value.clear();
    }
}

impl fmt::Display for FailureMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = [
            &self.expected,
            &self.to,
            &self.postfix_message,
            &self.actual_value,
        ];
        let mut first = true;
        for part in parts.into_iter().filter(|p| !p.is_empty()) {
            if !first {
                f.write_str(" ")?;
            }
            f.write_str(part)?;
            first = false;
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum MatcherKind {
    Check,
    Record,
}

/// A configured snapshot assertion.
#[derive(Clone, Debug, PartialEq)]
pub struct SnapshotMatcher {
    kind: MatcherKind,
    options: CheckOptions,
}

/// Matches when the subject renders like its reference image.
///
/// In record mode this records the reference instead and does not match.
#[must_use]
pub fn have_valid_snapshot() -> SnapshotMatcher {
    SnapshotMatcher::new(MatcherKind::Check, false)
}

/// Like [`have_valid_snapshot`], ignoring device-specific differences.
#[must_use]
pub fn have_valid_device_agnostic_snapshot() -> SnapshotMatcher {
    SnapshotMatcher::new(MatcherKind::Check, true)
}

/// Records the subject as the reference image. Never matches.
#[must_use]
pub fn record_snapshot() -> SnapshotMatcher {
    SnapshotMatcher::new(MatcherKind::Record, false)
}

/// Like [`record_snapshot`], ignoring device-specific differences.
#[must_use]
pub fn record_device_agnostic_snapshot() -> SnapshotMatcher {
    SnapshotMatcher::new(MatcherKind::Record, true)
}

impl SnapshotMatcher {
    fn new(kind: MatcherKind, device_agnostic: bool) -> Self {
        Self {
            kind,
            options: CheckOptions {
                device_agnostic,
                ..CheckOptions::default()
            },
        }
    }

    /// Names the snapshot instead of deriving the name from the test.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.options.name = Some(name.into());
        self
    }

    /// Renders through the full view hierarchy.
    #[must_use]
    pub fn uses_alternate_render_path(mut self, alternate: bool) -> Self {
        self.options.uses_alternate_render_path = alternate;
        self
    }

    /// Overrides the run's default tolerance for this check.
    ///
    /// Like [`SnapshotConfig::set_tolerance`](crate::SnapshotConfig::set_tolerance),
    /// a negative or non-finite value is a configuration error: evaluating
    /// the matcher panics.
    #[must_use]
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.options.tolerance = Some(tolerance);
        self
    }

    /// The options this matcher checks with.
    #[must_use]
    pub fn options(&self) -> &CheckOptions {
        &self.options
    }

    /// Evaluates the matcher, writing the explanation into `failure` when it
    /// does not match.
    pub fn matches<C: ImageComparator>(
        &self,
        snapshotter: &mut Snapshotter<C>,
        subject: &mut dyn HasVisualRoot,
        context: &CheckContext,
        failure: &mut FailureMessage,
    ) -> bool {
        let result = match self.kind {
            MatcherKind::Check => snapshotter.check(subject, &self.options, context),
            MatcherKind::Record => snapshotter.record(subject, &self.options, context),
        };
        if !result.passed {
            failure.clear();
            failure.actual_value = result.message;
        }
        result.passed
    }
}

impl<C: ImageComparator> Snapshotter<C> {
    /// Starts an expectation about `subject`, made from the caller's source
    /// file.
    #[track_caller]
    pub fn expect<'a, S: HasVisualRoot>(&'a mut self, subject: &'a mut S) -> Expectation<'a, C, S> {
        Expectation {
            snapshotter: self,
            subject,
            context: CheckContext::from_location(Location::caller()),
        }
    }
}

/// A pending assertion about a subject.
#[derive(Debug)]
pub struct Expectation<'a, C, S> {
    snapshotter: &'a mut Snapshotter<C>,
    subject: &'a mut S,
    context: CheckContext,
}

impl<C: ImageComparator, S: HasVisualRoot> Expectation<'_, C, S> {
    /// Replaces the context the expectation was created with.
    #[must_use]
    pub fn with_context(mut self, context: CheckContext) -> Self {
        self.context = context;
        self
    }

    /// Asserts that `matcher` matches.
    ///
    /// # Panics
    ///
    /// Panics with the failure message if it does not.
    pub fn to(self, matcher: SnapshotMatcher) {
        self.assert(matcher, true);
    }

    /// Asserts that `matcher` does not match.
    ///
    /// # Panics
    ///
    /// Panics with the failure message if it does.
    pub fn not_to(self, matcher: SnapshotMatcher) {
        self.assert(matcher, false);
    }

    fn assert(self, matcher: SnapshotMatcher, expect_match: bool) {
        let mut failure = FailureMessage {
            expected: "expected".into(),
            to: if expect_match { "to" } else { "to not" }.into(),
            postfix_message: "match a snapshot".into(),
            actual_value: String::new(),
        };
        let matched = matcher.matches(self.snapshotter, self.subject, &self.context, &mut failure);
        if matched != expect_match {
            panic!("{failure}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_message_skips_empty_slots() {
        let mut failure = FailureMessage {
            expected: "expected".into(),
            to: "to".into(),
            postfix_message: "match a snapshot".into(),
            actual_value: String::new(),
        };
        assert_eq!(failure.to_string(), "expected to match a snapshot");

        failure.clear();
        assert_eq!(failure, FailureMessage::default());
        failure.actual_value = "expected a matching snapshot in x".into();
        assert_eq!(failure.to_string(), "expected a matching snapshot in x");
    }

    #[test]
    fn constructors_set_kind_and_device_agnostic() {
        assert_eq!(have_valid_snapshot().kind, MatcherKind::Check);
        assert!(!have_valid_snapshot().options().device_agnostic);
        assert!(have_valid_device_agnostic_snapshot().options().device_agnostic);
        assert_eq!(record_snapshot().kind, MatcherKind::Record);
        assert!(record_device_agnostic_snapshot().options().device_agnostic);
    }

    #[test]
    fn builder_fills_options() {
        let matcher = have_valid_snapshot()
            .named("something custom")
            .uses_alternate_render_path(true)
            .tolerance(0.02);
        assert_eq!(
            matcher.options(),
            &CheckOptions {
                name: Some("something custom".into()),
                device_agnostic: false,
                uses_alternate_render_path: true,
                tolerance: Some(0.02),
            }
        );
    }
}
