//! `zaphod watch` command - re-run the sync on local changes

use chrono::Local;
use console::style;
use miette::Result;
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebouncedEvent};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use crate::cli::helpers::{connect, load_config};
use crate::cli::GlobalOpts;
use crate::core::config::CourseLayout;
use crate::core::loader::{ChangeSet, BODY_FILES, META_FILE};
use crate::core::pipeline::{Pipeline, SyncPlan};
use crate::core::report::RunReport;
use crate::remote::RemoteCourse;

/// Default debounce delay in milliseconds
const DEFAULT_DEBOUNCE_MS: u64 = 500;

const OUTCOME_MAP_FILE: &str = "outcome_map.json";

type EventBatch = Result<Vec<DebouncedEvent>, notify::Error>;

#[derive(clap::Args, Debug)]
pub struct WatchArgs {
    /// Debounce delay in milliseconds
    #[arg(long, default_value_t = DEFAULT_DEBOUNCE_MS)]
    pub debounce_ms: u64,
}

/// Whether a changed file can affect a sync run
fn is_relevant(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name == META_FILE
        || name == OUTCOME_MAP_FILE
        || BODY_FILES.contains(&name)
        || name.starts_with("rubric.")
}

/// What one coalesced batch of events asks for
#[derive(Debug, Default, PartialEq, Eq)]
struct Trigger {
    paths: Vec<PathBuf>,
    /// A metadata file changed, so every folder is in scope
    full: bool,
}

impl Trigger {
    fn add(&mut self, path: PathBuf, metadata_dir: &Path) {
        if !is_relevant(&path) || self.paths.contains(&path) {
            return;
        }
        if path.starts_with(metadata_dir) {
            self.full = true;
        }
        self.paths.push(path);
    }

    fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    fn change_set(&self) -> Option<ChangeSet> {
        (!self.full).then(|| ChangeSet::new(self.paths.clone()))
    }
}

pub fn run(args: WatchArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    let client = connect(&config)?;
    let plan = SyncPlan::from_settings(&config.settings);

    if let Err(e) = run_once(&config.layout, &client, &plan, None, global) {
        eprintln!("{} {}", style("✗").red(), e);
    }

    let (tx, rx) = mpsc::channel();
    let mut debouncer = new_debouncer(Duration::from_millis(args.debounce_ms), tx)
        .map_err(|e| miette::miette!("Failed to create file watcher: {}", e))?;

    // Events come back under the watched path, so watch absolute paths
    let pages_dir = absolute(config.layout.pages_dir());
    let metadata_dir = absolute(config.layout.metadata_dir());
    debouncer
        .watcher()
        .watch(&pages_dir, RecursiveMode::Recursive)
        .map_err(|e| miette::miette!("Failed to watch {}: {}", pages_dir.display(), e))?;
    if metadata_dir.is_dir() {
        debouncer
            .watcher()
            .watch(&metadata_dir, RecursiveMode::Recursive)
            .map_err(|e| miette::miette!("Failed to watch {}: {}", metadata_dir.display(), e))?;
    }

    println!(
        "{} Watching {} for changes...",
        style("→").blue(),
        config.layout.root().display()
    );
    println!("Press Ctrl+C to stop.");
    println!();

    watch_loop(&config.layout, &client, &plan, &rx, &metadata_dir, global)
}

fn absolute(path: PathBuf) -> PathBuf {
    path.canonicalize().unwrap_or(path)
}

fn watch_loop(
    layout: &CourseLayout,
    course: &dyn RemoteCourse,
    plan: &SyncPlan,
    rx: &mpsc::Receiver<EventBatch>,
    metadata_dir: &Path,
    global: &GlobalOpts,
) -> Result<()> {
    loop {
        let first = rx
            .recv()
            .map_err(|_| miette::miette!("File watcher disconnected"))?;

        let mut trigger = Trigger::default();
        collect(first, &mut trigger, metadata_dir);
        // Events that piled up during the last run join this one
        while let Ok(batch) = rx.try_recv() {
            collect(batch, &mut trigger, metadata_dir);
        }
        if trigger.is_empty() {
            continue;
        }

        tracing::info!(paths = trigger.paths.len(), full = trigger.full, "change detected");
        println!(
            "{} [{}] Change detected, syncing...",
            style("→").blue(),
            Local::now().format("%H:%M:%S")
        );
        let changes = trigger.change_set();
        if let Err(e) = run_once(layout, course, plan, changes.as_ref(), global) {
            eprintln!("{} {}", style("✗").red(), e);
        }
        println!("Watching for more changes...");
        println!();
    }
}

fn collect(batch: EventBatch, trigger: &mut Trigger, metadata_dir: &Path) {
    match batch {
        Ok(events) => {
            for event in events {
                trigger.add(event.path, metadata_dir);
            }
        }
        Err(e) => eprintln!("Watch error: {}", e),
    }
}

fn run_once(
    layout: &CourseLayout,
    course: &dyn RemoteCourse,
    plan: &SyncPlan,
    changes: Option<&ChangeSet>,
    global: &GlobalOpts,
) -> Result<RunReport> {
    let report = Pipeline::new(layout, course)
        .sync(plan, changes)
        .map_err(|e| miette::miette!("{}", e))?;
    if !global.quiet {
        report.print_summary("Sync Summary", global.verbose);
    }
    Ok(report)
}
