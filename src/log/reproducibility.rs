/// Reproducibility logging
///
/// Every step of a conversion session is recorded with its timestamp, a
/// description, and the `mrc2tiff` command line that reproduces it. Files
/// converted on worker threads keep their own log, which is appended to the
/// session log in input order once the batch finishes.
///
/// A log renders as human-readable text, JSON, or an executable shell script
/// that replays every recorded command.

use std::fmt::Write as _;
use std::io;
use std::path::Path;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

const STAMP: &str = "%Y-%m-%d %H:%M:%S";
const RULE: &str = "════════════════════════════════════════════════════════════════";

/// One recorded step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// 1-based position in the session
    pub sequence: usize,
    pub timestamp: DateTime<Local>,
    pub operation: String,
    pub description: String,
    /// Equivalent command line, empty when the step has none
    pub command: String,
}

impl LogEntry {
    fn write_text(&self, out: &mut String) {
        let _ = writeln!(
            out,
            "#{:<4} {}  {:<10} {}",
            self.sequence,
            self.timestamp.format(STAMP),
            self.operation,
            self.description
        );
        if !self.command.is_empty() {
            let _ = writeln!(out, "      $ {}", self.command);
        }
    }

    fn write_shell(&self, out: &mut String) {
        let _ = writeln!(
            out,
            "# [{}] {}: {}",
            self.sequence,
            self.operation,
            self.description.replace('\n', " ")
        );
        if !self.command.is_empty() {
            let _ = writeln!(out, "{}", self.command);
        }
    }
}

/// Export rendering, chosen from a file extension by `save`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
    Script,
}

impl LogFormat {
    /// `.json` → JSON, `.sh` → script, anything else → text.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("json") => LogFormat::Json,
            Some("sh") => LogFormat::Script,
            _ => LogFormat::Text,
        }
    }
}

/// Ordered record of a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReproLog {
    pub session_id: String,
    pub session_start: DateTime<Local>,
    /// What the session operates on: an input file or a batch description
    pub source: String,
    pub software_version: String,
    pub entries: Vec<LogEntry>,
}

impl ReproLog {
    pub fn new() -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            session_start: Local::now(),
            source: String::new(),
            software_version: env!("CARGO_PKG_VERSION").to_string(),
            entries: Vec::new(),
        }
    }

    pub fn set_source(&mut self, source: &str) {
        self.source = source.to_string();
    }

    pub fn add_entry(&mut self, operation: &str, description: &str, command: &str) {
        let entry = LogEntry {
            sequence: self.entries.len() + 1,
            timestamp: Local::now(),
            operation: operation.into(),
            description: description.into(),
            command: command.into(),
        };
        log::debug!("[LOG {:03}] {}: {}", entry.sequence, operation, description);
        self.entries.push(entry);
    }

    /// Move all entries of `other` to the end of this log, renumbering them.
    pub fn append(&mut self, other: ReproLog) {
        let offset = self.entries.len();
        self.entries
            .extend(other.entries.into_iter().enumerate().map(|(i, mut e)| {
                e.sequence = offset + i + 1;
                e
            }));
    }

    pub fn render(&self, format: LogFormat) -> String {
        match format {
            LogFormat::Text => self.to_text(),
            LogFormat::Json => self.to_json(),
            LogFormat::Script => self.to_shell_script(),
        }
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{RULE}");
        let _ = writeln!(out, "  mrc2tiff v{} session {}", self.software_version, self.session_id);
        let _ = writeln!(out, "  started {}", self.session_start.format(STAMP));
        let _ = writeln!(out, "  source  {}", self.source);
        let _ = writeln!(out, "  steps   {}", self.entries.len());
        let _ = writeln!(out, "{RULE}");
        for entry in &self.entries {
            entry.write_text(&mut out);
        }
        let _ = writeln!(out, "{RULE}");
        let _ = writeln!(out, "  exported {}", Local::now().format(STAMP));
        out
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("JSON error: {}", e))
    }

    /// Bash script replaying every entry that carries a command.
    pub fn to_shell_script(&self) -> String {
        let mut out = String::from("#!/bin/bash\n");
        let _ = writeln!(out, "# mrc2tiff v{} session {}", self.software_version, self.session_id);
        let _ = writeln!(out, "# started {}", self.session_start.format(STAMP));
        let _ = writeln!(out, "# source: {}", self.source);
        out.push_str("set -euo pipefail\n\n");
        for entry in &self.entries {
            entry.write_shell(&mut out);
        }
        out
    }

    /// Write the log to `path` in the format its extension names.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        let format = LogFormat::from_path(path);
        std::fs::write(path, self.render(format))?;
        #[cfg(unix)]
        if format == LogFormat::Script {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
        }
        Ok(())
    }
}

impl Default for ReproLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_are_numbered() {
        let mut log = ReproLog::new();
        assert!(log.entries.is_empty());

        log.add_entry("Load", "3 frames of 100x100", "");
        log.add_entry("Write", "3 pages", "mrc2tiff convert a.mrc -o out");
        assert_eq!(log.entries.len(), 2);
        let seq: Vec<usize> = log.entries.iter().map(|e| e.sequence).collect();
        assert_eq!(seq, vec![1, 2]);
        assert_eq!(log.entries[0].operation, "Load");
    }

    #[test]
    fn test_append_renumbers() {
        let mut session = ReproLog::new();
        session.add_entry("Batch", "2 files", "");

        let mut file_log = ReproLog::new();
        file_log.add_entry("Load", "a.mrc", "");
        file_log.add_entry("Write", "a.tiff", "cmd");
        session.append(file_log);

        let seq: Vec<usize> = session.entries.iter().map(|e| e.sequence).collect();
        assert_eq!(seq, vec![1, 2, 3]);
        assert_eq!(session.entries[2].operation, "Write");
    }

    #[test]
    fn test_text_rendering() {
        let mut log = ReproLog::new();
        log.set_source("stack.mrc");
        log.add_entry("Denoise", "Gaussian sigma 1", "");
        log.add_entry("Write", "stack.tiff", "mrc2tiff convert stack.mrc -o out");
        let text = log.to_text();
        assert!(text.contains("Gaussian sigma 1"));
        assert!(text.contains("source  stack.mrc"));
        assert!(text.contains("      $ mrc2tiff convert stack.mrc -o out"));
    }

    #[test]
    fn test_json_is_lossless() {
        let mut log = ReproLog::new();
        log.add_entry("Write", "a.tiff", "mrc2tiff convert a.mrc -o out");
        let parsed: ReproLog = serde_json::from_str(&log.to_json()).unwrap();
        assert_eq!(parsed.session_id, log.session_id);
        assert_eq!(parsed.entries.len(), 1);
        assert_eq!(parsed.entries[0].command, "mrc2tiff convert a.mrc -o out");
    }

    #[test]
    fn test_script_replays_commands() {
        let mut log = ReproLog::new();
        log.add_entry("Write", "a.tiff", "mrc2tiff convert a.mrc -o out");
        log.add_entry("Note", "no command", "");
        let script = log.to_shell_script();
        assert!(script.starts_with("#!/bin/bash\n"));
        assert!(script.contains("\nmrc2tiff convert a.mrc -o out\n"));
        assert!(script.contains("# [2] Note: no command\n"));
    }

    #[test]
    fn test_save_picks_format_from_extension() {
        assert_eq!(LogFormat::from_path(Path::new("a.JSON")), LogFormat::Json);
        assert_eq!(LogFormat::from_path(Path::new("a.sh")), LogFormat::Script);
        assert_eq!(LogFormat::from_path(Path::new("a")), LogFormat::Text);

        let dir = crate::data::test_support::scratch_dir();
        let mut log = ReproLog::new();
        log.add_entry("Write", "a.tiff", "mrc2tiff convert a.mrc -o out");
        for name in ["log.json", "log.sh", "log.txt"] {
            log.save(&dir.join(name)).unwrap();
        }

        let json = std::fs::read_to_string(dir.join("log.json")).unwrap();
        assert!(serde_json::from_str::<ReproLog>(&json).is_ok());
        let script = std::fs::read_to_string(dir.join("log.sh")).unwrap();
        assert!(script.starts_with("#!/bin/bash"));
        let text = std::fs::read_to_string(dir.join("log.txt")).unwrap();
        assert!(text.contains("mrc2tiff v"));
    }
}
