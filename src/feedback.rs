//! Append-only user feedback log.
//!
//! One JSON object per line. Writes are serialized through a mutex so
//! concurrent requests never interleave partial lines.

use crate::error::{LawDecoderError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

/// Whether the user found the answer helpful.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Positive,
    Negative,
}

impl std::str::FromStr for Polarity {
    type Err = LawDecoderError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "positive" => Ok(Polarity::Positive),
            "negative" => Ok(Polarity::Negative),
            _ => Err(LawDecoderError::Validation(format!(
                "feedback must be \"positive\" or \"negative\", got \"{}\"",
                s
            ))),
        }
    }
}

/// One recorded feedback event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedbackEntry {
    pub timestamp: DateTime<Utc>,
    pub query: String,
    pub answer: String,
    pub feedback: Polarity,
    pub comment: String,
}

impl FeedbackEntry {
    /// Validate raw fields into an entry stamped with the current time.
    pub fn new(
        query: Option<String>,
        answer: Option<String>,
        feedback: Option<String>,
        comment: Option<String>,
    ) -> Result<Self> {
        let required = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        let (Some(query), Some(answer), Some(feedback)) =
            (required(query), required(answer), required(feedback))
        else {
            return Err(LawDecoderError::Validation(
                "Missing required fields.".to_string(),
            ));
        };

        Ok(Self {
            timestamp: Utc::now(),
            query,
            answer,
            feedback: feedback.parse()?,
            comment: comment.unwrap_or_default(),
        })
    }
}

/// File-backed feedback store.
pub struct FeedbackLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FeedbackLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an entry as a single line.
    #[instrument(skip_all, fields(feedback = ?entry.feedback))]
    pub async fn append(&self, entry: &FeedbackEntry) -> Result<()> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let _guard = self.lock.lock().await;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                LawDecoderError::Feedback(format!("cannot open {}: {}", self.path.display(), e))
            })?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        debug!("Recorded feedback");
        Ok(())
    }

    /// Read every recorded entry, oldest first.
    pub async fn read_all(&self) -> Result<Vec<FeedbackEntry>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(LawDecoderError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn some(s: &str) -> Option<String> {
        Some(s.to_string())
    }

    #[test]
    fn test_missing_fields_rejected() {
        let err = FeedbackEntry::new(some("q"), None, some("positive"), None).unwrap_err();
        assert!(err.is_validation());

        let err = FeedbackEntry::new(some("q"), some("a"), some("   "), None).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_unknown_polarity_rejected() {
        let err = FeedbackEntry::new(some("q"), some("a"), some("meh"), None).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_comment_defaults_to_empty() {
        let entry = FeedbackEntry::new(some("q"), some("a"), some("Negative"), None).unwrap();
        assert_eq!(entry.feedback, Polarity::Negative);
        assert_eq!(entry.comment, "");
    }

    #[tokio::test]
    async fn test_append_only() {
        let dir = tempfile::tempdir().unwrap();
        let log = FeedbackLog::new(dir.path().join("data").join("feedback.jsonl"));

        let first = FeedbackEntry::new(some("q1"), some("a1"), some("positive"), None).unwrap();
        let second =
            FeedbackEntry::new(some("q2"), some("a2"), some("negative"), some("too long")).unwrap();
        log.append(&first).await.unwrap();
        log.append(&second).await.unwrap();

        let entries = log.read_all().await.unwrap();
        assert_eq!(entries, vec![first, second]);
    }

    #[tokio::test]
    async fn test_concurrent_appends_keep_whole_lines() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(FeedbackLog::new(dir.path().join("feedback.jsonl")));

        let handles: Vec<_> = (0..20)
            .map(|i| {
                let log = log.clone();
                tokio::spawn(async move {
                    let entry = FeedbackEntry::new(
                        Some(format!("query {}", i)),
                        some("answer"),
                        some("positive"),
                        None,
                    )
                    .unwrap();
                    log.append(&entry).await.unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(log.read_all().await.unwrap().len(), 20);
    }

    #[tokio::test]
    async fn test_read_missing_file_is_empty() {
        let log = FeedbackLog::new("/nonexistent/dir/feedback.jsonl");
        assert!(log.read_all().await.unwrap().is_empty());
    }
}
