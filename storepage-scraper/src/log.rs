use std::path::Path;

use storepage_catalog::AppKind;

use crate::error::AbortReason;

/// A single entry in the scrape log.
#[derive(Debug, Clone)]
pub enum LogEntry {
    Updated {
        id: u32,
        name: String,
        kind: AppKind,
        /// Id the store redirected to, attached as the entry's parent.
        alias: Option<u32>,
    },
    Aborted {
        id: u32,
        reason: AbortReason,
    },
    Failed {
        id: u32,
        message: String,
    },
}

impl LogEntry {
    pub fn id(&self) -> u32 {
        match self {
            Self::Updated { id, .. } | Self::Aborted { id, .. } | Self::Failed { id, .. } => *id,
        }
    }
}

/// Collects scrape results and writes a log file.
#[derive(Debug, Default)]
pub struct ScrapeLog {
    entries: Vec<LogEntry>,
}

impl ScrapeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn summary(&self) -> LogSummary {
        let mut summary = LogSummary::default();
        for entry in &self.entries {
            match entry {
                LogEntry::Updated { alias, .. } => {
                    summary.total_updated += 1;
                    if alias.is_some() {
                        summary.redirected += 1;
                    }
                }
                LogEntry::Aborted { .. } => summary.total_aborted += 1,
                LogEntry::Failed { .. } => summary.total_failed += 1,
            }
        }
        summary
    }

    /// Write the log to a file.
    pub fn write_to_file(&self, path: &Path) -> std::io::Result<()> {
        use std::io::Write;

        let mut file = std::fs::File::create(path)?;
        let summary = self.summary();

        writeln!(file, "=== Scrape Log ===")?;
        writeln!(
            file,
            "Date: {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        )?;
        writeln!(file)?;
        writeln!(file, "--- Summary ---")?;
        writeln!(
            file,
            "Updated: {} (redirected: {})",
            summary.total_updated, summary.redirected
        )?;
        writeln!(file, "Aborted: {}", summary.total_aborted)?;
        writeln!(file, "Failed: {}", summary.total_failed)?;
        writeln!(file)?;
        writeln!(file, "--- Details ---")?;
        writeln!(file)?;

        let mut entries: Vec<&LogEntry> = self.entries.iter().collect();
        entries.sort_by_key(|e| e.id());

        for entry in entries {
            match entry {
                LogEntry::Updated {
                    id,
                    name,
                    kind,
                    alias,
                } => {
                    writeln!(file, "[OK] {} -> \"{}\" ({})", id, name, kind)?;
                    if let Some(alias) = alias {
                        writeln!(file, "     Redirected to: {}", alias)?;
                    }
                }
                LogEntry::Aborted { id, reason } => {
                    writeln!(file, "[ABORTED] {}: {}", id, reason)?;
                }
                LogEntry::Failed { id, message } => {
                    writeln!(file, "[ERROR] {}: {}", id, message)?;
                }
            }
        }

        Ok(())
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct LogSummary {
    pub total_updated: usize,
    pub total_aborted: usize,
    pub total_failed: usize,
    pub redirected: usize,
}
