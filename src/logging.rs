//! Exchange log: one record per handled request, kept in a bounded ring buffer
//! and mirrored to a JSONL file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

const MAX_LOG_ENTRIES: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Claude,
    Gemini,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeRecord {
    pub timestamp: DateTime<Utc>,
    pub protocol: Protocol,
    pub requested_model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub served_model: Option<String>,
    pub status: u16,
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExchangeRecord {
    pub fn new(protocol: Protocol, requested_model: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            protocol,
            requested_model: requested_model.into(),
            served_model: None,
            status: 200,
            input_tokens: 0,
            output_tokens: 0,
            error: None,
        }
    }

    #[must_use]
    pub fn served(mut self, model: impl Into<String>, input_tokens: u64, output_tokens: u64) -> Self {
        self.served_model = Some(model.into());
        self.input_tokens = input_tokens;
        self.output_tokens = output_tokens;
        self
    }

    #[must_use]
    pub fn failed(mut self, status: u16, error: impl Into<String>) -> Self {
        self.status = status;
        self.error = Some(error.into());
        self
    }
}

pub struct ExchangeLog {
    entries: VecDeque<ExchangeRecord>,
    writer: BufWriter<File>,
}

impl ExchangeLog {
    /// Open (or create) the JSONL file, reloading the newest existing records.
    pub fn new(file_path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file_path = file_path.as_ref();

        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut entries = VecDeque::with_capacity(MAX_LOG_ENTRIES);

        if file_path.exists() {
            let reader = BufReader::new(File::open(file_path)?);
            for line in reader.lines().map_while(std::result::Result::ok) {
                if let Ok(entry) = serde_json::from_str::<ExchangeRecord>(&line) {
                    if entries.len() >= MAX_LOG_ENTRIES {
                        entries.pop_front();
                    }
                    entries.push_back(entry);
                }
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)?;

        Ok(Self {
            entries,
            writer: BufWriter::new(file),
        })
    }

    pub fn record(&mut self, entry: ExchangeRecord) {
        if let Ok(json) = serde_json::to_string(&entry) {
            let _ = writeln!(self.writer, "{json}");
            let _ = self.writer.flush();
        }
        if self.entries.len() >= MAX_LOG_ENTRIES {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Newest first.
    pub fn recent(&self, limit: usize) -> Vec<ExchangeRecord> {
        self.entries.iter().rev().take(limit).cloned().collect()
    }
}

#[derive(Clone)]
pub struct SharedExchangeLog(Arc<Mutex<ExchangeLog>>);

impl SharedExchangeLog {
    pub fn new(file_path: impl AsRef<Path>) -> std::io::Result<Self> {
        Ok(Self(Arc::new(Mutex::new(ExchangeLog::new(file_path)?))))
    }

    pub fn record(&self, entry: ExchangeRecord) {
        if let Ok(mut log) = self.0.lock() {
            log.record(entry);
        }
    }

    pub fn recent(&self, limit: usize) -> Vec<ExchangeRecord> {
        self.0.lock().map(|l| l.recent(limit)).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_records_persist_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("exchanges.jsonl");

        {
            let log = SharedExchangeLog::new(&path).unwrap();
            log.record(ExchangeRecord::new(Protocol::Claude, "claude-sonnet").served("groq/kimi", 3, 4));
            log.record(ExchangeRecord::new(Protocol::Gemini, "gemini-pro").failed(401, "Missing API key"));
        }

        let reopened = SharedExchangeLog::new(&path).unwrap();
        let recent = reopened.recent(10);

        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].protocol, Protocol::Gemini);
        assert_eq!(recent[0].status, 401);
        assert_eq!(recent[1].served_model.as_deref(), Some("groq/kimi"));
        assert_eq!(recent[1].output_tokens, 4);
    }

    #[test]
    fn test_recent_respects_limit() {
        let dir = tempdir().unwrap();
        let log = SharedExchangeLog::new(dir.path().join("x.jsonl")).unwrap();
        for i in 0..5 {
            log.record(ExchangeRecord::new(Protocol::Claude, format!("m{i}")));
        }
        let recent = log.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].requested_model, "m4");
    }
}
