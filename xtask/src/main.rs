// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Xtask utilities for Understory snapshot suites, built on Kompari.
//!
//! - `cargo xtask snapshots test [--record] [-- <cargo test args...>]` runs a
//!   suite in verify mode, or in record mode to rewrite its references.
//! - `cargo xtask snapshots report|review` reruns the suite, collects the
//!   rendered images of failed checks, and diffs them against the references.
//!
//! Suite selection flags go before the subcommand:
//! `--package <name>`, `--reference <dir>`, `--current <dir>`, and
//! `--group <test file stem>`. References are nested one folder per test file
//! and Kompari works on one folder at a time, so commands run once per group:
//! the `--group` one, or every group holding images (for `report`/`review`,
//! every group with a failed check).

use clap::Parser;
use kompari::DirDiffConfig;
use kompari_tasks::args::Command as KompariCommand;
use kompari_tasks::{Actions, Args, Task};
use std::path::{Path, PathBuf};
use std::process::Command;
use understory_snapshot::{MODE_ENV, REFERENCE_IMAGES_FOLDER};
use understory_snapshot_kompari::FAILURE_DIR_ENV;

const DEFAULT_PACKAGE: &str = "understory_snapshot_kompari";
const FAILURE_IMAGES_FOLDER: &str = "FailureImages";

struct ActionsImpl {
    suite: Suite,
}

/// A package whose tests make snapshot checks, and where its images live.
///
/// `reference` and `current` are tree roots. References are nested one
/// folder per test file, and Kompari diffs one folder at a time, so every
/// command runs per group.
#[derive(Clone, Debug)]
struct Suite {
    package: String,
    reference: PathBuf,
    current: PathBuf,
    group: Option<String>,
}

impl Suite {
    fn new(
        package: String,
        reference: Option<PathBuf>,
        current: Option<PathBuf>,
        group: Option<String>,
    ) -> Self {
        let tests = workspace_root().join(&package).join("tests");
        Self {
            reference: reference.unwrap_or_else(|| tests.join(REFERENCE_IMAGES_FOLDER)),
            current: current.unwrap_or_else(|| tests.join(FAILURE_IMAGES_FOLDER)),
            package,
            group,
        }
    }

    fn tests_dir(&self) -> PathBuf {
        workspace_root().join(&self.package).join("tests")
    }

    /// The groups a command covers: the selected one, or every folder that
    /// holds images.
    fn groups(&self, collects_failures: bool) -> kompari::Result<Vec<String>> {
        if let Some(group) = &self.group {
            return Ok(vec![group.clone()]);
        }
        if collects_failures {
            return image_groups(&self.current);
        }
        let mut groups = image_groups(&self.reference)?;
        groups.extend(image_groups(&self.current)?);
        groups.sort();
        groups.dedup();
        Ok(groups)
    }
}

#[derive(Copy, Clone, Debug)]
enum SnapshotTestMode {
    Verify,
    Record,
    CollectFailures,
}

impl Actions for ActionsImpl {
    fn generate_all_tests(&self) -> kompari::Result<()> {
        run_snapshot_tests(&self.suite, SnapshotTestMode::CollectFailures, Vec::new())
    }
}

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..")
}

/// Removes every image under `dir`, including those in group folders.
fn clean_dir(dir: &Path) -> kompari::Result<()> {
    std::fs::create_dir_all(dir)?;
    for path in kompari::list_image_dir(dir)? {
        std::fs::remove_file(path)?;
    }
    for folder in subfolders(dir)? {
        clean_dir(&folder)?;
    }
    Ok(())
}

fn subfolders(dir: &Path) -> kompari::Result<Vec<PathBuf>> {
    let mut folders = Vec::new();
    if !dir.is_dir() {
        return Ok(folders);
    }
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            folders.push(path);
        }
    }
    folders.sort();
    Ok(folders)
}

/// Names of the folders directly under `root` that contain images.
fn image_groups(root: &Path) -> kompari::Result<Vec<String>> {
    let mut groups = Vec::new();
    for folder in subfolders(root)? {
        if kompari::list_image_dir(&folder)?.into_iter().next().is_none() {
            continue;
        }
        if let Some(name) = folder.file_name() {
            groups.push(name.to_string_lossy().into_owned());
        }
    }
    Ok(groups)
}

fn kompari_args_first(arg: &str) -> bool {
    matches!(
        arg,
        "report" | "review" | "clean" | "dead-snapshots" | "size-check"
    )
}

/// Removes `--name <value>` / `-s <value>` / `--name=<value>` from `args`,
/// returning the last value seen.
fn take_flag(args: Vec<String>, name: &str, short: &str) -> (Option<String>, Vec<String>) {
    let mut value = None;
    let mut remaining = Vec::with_capacity(args.len());
    let prefix = format!("{name}=");

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        if arg == "--" {
            remaining.push(arg);
            remaining.extend(iter);
            break;
        }
        if arg == name || arg == short {
            if let Some(v) = iter.next() {
                value = Some(v);
                continue;
            }
        } else if let Some(v) = arg.strip_prefix(&prefix) {
            value = Some(v.to_string());
            continue;
        }
        remaining.push(arg);
    }

    (value, remaining)
}

fn parse_suite(args: Vec<String>) -> (Suite, Vec<String>) {
    let (package, args) = take_flag(args, "--package", "-p");
    let (reference, args) = take_flag(args, "--reference", "-r");
    let (current, args) = take_flag(args, "--current", "-c");
    let (group, args) = take_flag(args, "--group", "-g");
    let suite = Suite::new(
        package.unwrap_or_else(|| DEFAULT_PACKAGE.to_string()),
        reference.map(PathBuf::from),
        current.map(PathBuf::from),
        group,
    );
    (suite, args)
}

fn run_kompari_for_suite(suite: Suite, raw_kompari_args: Vec<String>) -> kompari::Result<()> {
    // Kompari expects its own argv; we pass through the kompari args after removing
    // any xtask-only flags like `--package`.
    let mut argv = Vec::with_capacity(raw_kompari_args.len() + 1);
    argv.push("xtask".to_string());
    argv.extend(raw_kompari_args);
    let args = Args::parse_from(argv);
    snapshots_command(suite, args)
}

fn run_snapshot_tests(
    suite: &Suite,
    mode: SnapshotTestMode,
    extra_args: Vec<String>,
) -> kompari::Result<()> {
    let cargo = std::env::var("CARGO").unwrap_or_else(|_| "cargo".to_string());
    let mut cmd = Command::new(cargo);
    cmd.args(["test", "-p", &suite.package]);

    match mode {
        SnapshotTestMode::Verify => {}
        SnapshotTestMode::Record => {
            cmd.env(MODE_ENV, "record");
        }
        SnapshotTestMode::CollectFailures => {
            // The comparator adds the group folder itself.
            cmd.env(FAILURE_DIR_ENV, &suite.current);
        }
    }

    cmd.args(extra_args);
    let status = cmd.status()?;
    if matches!(mode, SnapshotTestMode::Record) {
        println!(
            "References recorded; record mode fails every check, so failures above are expected."
        );
    } else if !status.success() {
        println!(
            "Snapshot tests failed; run `cargo xtask snapshots report` to review the differences."
        );
    }
    Ok(())
}

fn snapshots_command(suite: Suite, args: Args) -> kompari::Result<()> {
    std::fs::create_dir_all(&suite.reference)?;
    std::fs::create_dir_all(&suite.current)?;

    let collects_failures = match &args.command {
        KompariCommand::Report(_) | KompariCommand::Review(_) => {
            clean_dir(&suite.current)?;
            run_snapshot_tests(&suite, SnapshotTestMode::CollectFailures, Vec::new())?;
            true
        }
        KompariCommand::Clean | KompariCommand::DeadSnapshots(_) | KompariCommand::SizeCheck(_) => {
            false
        }
    };

    let groups = suite.groups(collects_failures)?;
    if groups.is_empty() {
        if collects_failures {
            println!("No snapshot differences found.");
        } else {
            println!("No snapshot folders found under `{}`.", suite.reference.display());
        }
        return Ok(());
    }

    for group in groups {
        let reference = suite.reference.join(&group);
        let current = suite.current.join(&group);
        std::fs::create_dir_all(&reference)?;
        std::fs::create_dir_all(&current)?;

        let mut diff_config = DirDiffConfig::new(reference, current);
        diff_config.set_ignore_right_missing(true);
        if collects_failures && diff_config.create_diff()?.results().is_empty() {
            println!("No snapshot differences found in `{group}`.");
        }

        let report_path = suite
            .tests_dir()
            .join(format!("report-{}-{group}.html", suite.package));
        let mut task = Task::new(
            diff_config,
            Box::new(ActionsImpl {
                suite: suite.clone(),
            }),
        );
        task.set_report_output_path(report_path);
        task.run(&args)?;
    }
    Ok(())
}

const USAGE: &str = "Usage: cargo xtask snapshots [--package <name>] [--group <test>] [--reference <dir>] [--current <dir>] <kompari-subcommand> [args...]
       cargo xtask snapshots [--package <name>] test [--record] [-- <cargo test args...>]";

fn main() -> kompari::Result<()> {
    let raw = std::env::args().collect::<Vec<_>>();
    let first = raw.get(1).map(String::as_str);

    match first {
        Some("snapshots") => {
            let (suite, remaining) = parse_suite(raw[2..].to_vec());
            if remaining.is_empty() {
                eprintln!("{USAGE}");
                return Ok(());
            }

            if remaining[0] == "test" {
                let mut mode = SnapshotTestMode::Verify;
                let mut extra_args = Vec::<String>::new();
                for (i, arg) in remaining.iter().enumerate().skip(1) {
                    if arg == "--" {
                        extra_args.extend_from_slice(&remaining[i + 1..]);
                        break;
                    }
                    if arg == "--record" {
                        mode = SnapshotTestMode::Record;
                        continue;
                    }
                    extra_args.push(arg.clone());
                }
                return run_snapshot_tests(&suite, mode, extra_args);
            }

            run_kompari_for_suite(suite, remaining)
        }
        // `cargo xtask report|review|...` works on the default suite.
        Some(arg1) if kompari_args_first(arg1) => {
            let (suite, remaining) = parse_suite(raw[1..].to_vec());
            run_kompari_for_suite(suite, remaining)
        }
        _ => {
            eprintln!("{USAGE}");
            Ok(())
        }
    }
}
