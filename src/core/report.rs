//! Per-run report
//!
//! Every component appends one entry per thing it touched (or chose not to
//! touch). The CLI prints the entries and counters at the end of a run and
//! exits non-zero when anything failed.

use console::style;
use serde::Serialize;
use std::fmt;
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// What happened to one subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Outcome {
    Created,
    Updated,
    Unchanged,
    Pruned,
    WouldPrune,
    Warned,
    Failed,
}

impl Outcome {
    pub const ALL: [Outcome; 7] = [
        Outcome::Created,
        Outcome::Updated,
        Outcome::Unchanged,
        Outcome::Pruned,
        Outcome::WouldPrune,
        Outcome::Warned,
        Outcome::Failed,
    ];

    fn styled(self) -> String {
        let label = self.to_string();
        match self {
            Outcome::Created | Outcome::Pruned => style(label).green().to_string(),
            Outcome::Updated => style(label).cyan().to_string(),
            Outcome::Unchanged => style(label).dim().to_string(),
            Outcome::WouldPrune | Outcome::Warned => style(label).yellow().to_string(),
            Outcome::Failed => style(label).red().bold().to_string(),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Outcome::Created => "created",
            Outcome::Updated => "updated",
            Outcome::Unchanged => "unchanged",
            Outcome::Pruned => "pruned",
            Outcome::WouldPrune => "would prune",
            Outcome::Warned => "warned",
            Outcome::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// One line of the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    pub outcome: Outcome,
    /// Folder, module or remote object name
    pub subject: String,
    pub detail: String,
}

#[derive(Tabled)]
struct EntryRow {
    #[tabled(rename = "Outcome")]
    outcome: String,
    #[tabled(rename = "Subject")]
    subject: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

/// Ordered entries of one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    entries: Vec<ReportEntry>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: Outcome, subject: impl Into<String>, detail: impl Into<String>) {
        self.entries.push(ReportEntry {
            outcome,
            subject: subject.into(),
            detail: detail.into(),
        });
    }

    pub fn created(&mut self, subject: impl Into<String>, detail: impl Into<String>) {
        self.record(Outcome::Created, subject, detail);
    }

    pub fn updated(&mut self, subject: impl Into<String>, detail: impl Into<String>) {
        self.record(Outcome::Updated, subject, detail);
    }

    pub fn unchanged(&mut self, subject: impl Into<String>, detail: impl Into<String>) {
        self.record(Outcome::Unchanged, subject, detail);
    }

    pub fn warned(&mut self, subject: impl Into<String>, detail: impl Into<String>) {
        self.record(Outcome::Warned, subject, detail);
    }

    pub fn failed(&mut self, subject: impl Into<String>, detail: impl Into<String>) {
        self.record(Outcome::Failed, subject, detail);
    }

    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    pub fn with_outcome(&self, outcome: Outcome) -> impl Iterator<Item = &ReportEntry> {
        self.entries.iter().filter(move |e| e.outcome == outcome)
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.with_outcome(outcome).count()
    }

    pub fn has_failures(&self) -> bool {
        self.count(Outcome::Failed) > 0
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries as a table; unchanged entries only when `verbose`
    pub fn render_table(&self, verbose: bool) -> Option<String> {
        let rows: Vec<EntryRow> = self
            .entries
            .iter()
            .filter(|e| verbose || e.outcome != Outcome::Unchanged)
            .map(|e| EntryRow {
                outcome: e.outcome.styled(),
                subject: e.subject.clone(),
                detail: e.detail.clone(),
            })
            .collect();
        if rows.is_empty() {
            return None;
        }
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        Some(table.to_string())
    }

    /// Print the entry table and the counters
    pub fn print_summary(&self, title: &str, verbose: bool) {
        if let Some(table) = self.render_table(verbose) {
            println!("{}", table);
        }

        println!();
        println!("{}", style("─".repeat(60)).dim());
        println!("{}", style(title).bold());
        println!("{}", style("─".repeat(60)).dim());
        for outcome in Outcome::ALL {
            let count = self.count(outcome);
            if count == 0 && matches!(outcome, Outcome::Pruned | Outcome::WouldPrune) {
                continue;
            }
            let label = format!("{}:", capitalize(&outcome.to_string()));
            println!("  {:<14}{}", label, outcome_count(outcome, count));
        }
        println!();
    }
}

fn outcome_count(outcome: Outcome, count: usize) -> String {
    match outcome {
        Outcome::Failed if count > 0 => style(count).red().bold().to_string(),
        Outcome::Warned if count > 0 => style(count).yellow().to_string(),
        Outcome::Created | Outcome::Pruned => style(count).green().to_string(),
        _ => style(count).cyan().to_string(),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
