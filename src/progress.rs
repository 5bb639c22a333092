//! Index build progress reporting.
//!
//! Reports observable progress during `sales index` (and the implicit build
//! in `sales chat`/`sales ask`) so users see how many documents have been
//! embedded. Progress is emitted on **stderr** so stdout remains parseable.

use std::io::Write;

use crate::stats::format_number;

/// A single progress event for an index build.
#[derive(Clone, Debug, PartialEq)]
pub enum IndexProgressEvent {
    /// `n` of `total` documents have been embedded.
    Embedding { n: u64, total: u64 },
    /// Vectors and documents are being written to the index directory.
    Saving { path: String },
}

/// Reports build progress. Implementations write to stderr (human or JSON).
pub trait IndexProgressReporter: Send + Sync {
    fn report(&self, event: IndexProgressEvent);
}

/// Human-friendly progress on stderr: "index  embedding  1,234 / 5,000 documents".
pub struct StderrProgress;

impl IndexProgressReporter for StderrProgress {
    fn report(&self, event: IndexProgressEvent) {
        let line = match &event {
            IndexProgressEvent::Embedding { n, total } => format!(
                "index  embedding  {} / {} documents\n",
                format_number(*n),
                format_number(*total)
            ),
            IndexProgressEvent::Saving { path } => format!("index  saving to {}\n", path),
        };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl IndexProgressReporter for JsonProgress {
    fn report(&self, event: IndexProgressEvent) {
        if let Ok(line) = serde_json::to_string(&event_json(&event)) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

fn event_json(event: &IndexProgressEvent) -> serde_json::Value {
    match event {
        IndexProgressEvent::Embedding { n, total } => serde_json::json!({
            "event": "progress",
            "phase": "embedding",
            "n": n,
            "total": total
        }),
        IndexProgressEvent::Saving { path } => serde_json::json!({
            "event": "progress",
            "phase": "saving",
            "path": path
        }),
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl IndexProgressReporter for NoProgress {
    fn report(&self, _event: IndexProgressEvent) {}
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl std::str::FromStr for ProgressMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" => Ok(ProgressMode::Off),
            "human" => Ok(ProgressMode::Human),
            "json" => Ok(ProgressMode::Json),
            other => Err(format!(
                "unknown progress mode '{}'. Use off, human, or json.",
                other
            )),
        }
    }
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn IndexProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_event_json_shape() {
        let json = event_json(&IndexProgressEvent::Embedding { n: 64, total: 1000 });
        assert_eq!(json["phase"], "embedding");
        assert_eq!(json["n"], 64);
        assert_eq!(json["total"], 1000);
    }

    #[test]
    fn parses_progress_modes() {
        assert_eq!("json".parse::<ProgressMode>().unwrap(), ProgressMode::Json);
        assert_eq!("off".parse::<ProgressMode>().unwrap(), ProgressMode::Off);
        assert!("loud".parse::<ProgressMode>().is_err());
    }

    #[test]
    fn saving_event_json_shape() {
        let json = event_json(&IndexProgressEvent::Saving {
            path: "data/sales_index".to_string(),
        });
        assert_eq!(json["phase"], "saving");
        assert_eq!(json["path"], "data/sales_index");
    }
}
