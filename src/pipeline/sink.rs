//! Result sinks — where parsed transactions are reported.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::error::PipelineError;
use crate::parser::PixTransaction;

/// Receives every transaction the pipeline parses.
#[async_trait]
pub trait TransactionSink: Send + Sync {
    /// Sink name for logging.
    fn name(&self) -> &str;

    /// Record one parsed transaction for message `id`.
    async fn record(&self, id: &str, tx: &PixTransaction) -> Result<(), PipelineError>;
}

/// A transaction tagged with its source message, as emitted by the sinks.
#[derive(Debug, Clone, Serialize)]
pub struct RecordedTransaction<'a> {
    pub id: &'a str,
    pub recorded_at: DateTime<Utc>,
    /// Numeric form of `amount`, serialized as a string (`"1234.56"`).
    pub amount_value: Option<Decimal>,
    #[serde(flatten)]
    pub transaction: &'a PixTransaction,
}

impl<'a> RecordedTransaction<'a> {
    pub fn new(id: &'a str, transaction: &'a PixTransaction) -> Self {
        Self {
            id,
            recorded_at: Utc::now(),
            amount_value: transaction.amount_value(),
            transaction,
        }
    }
}

/// Emits each transaction as a structured `info` event.
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl TransactionSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn record(&self, id: &str, tx: &PixTransaction) -> Result<(), PipelineError> {
        let entry = RecordedTransaction::new(id, tx);
        let json = serde_json::to_string(&entry).map_err(|e| PipelineError::Sink {
            sink: self.name().into(),
            reason: e.to_string(),
        })?;
        let value = entry
            .amount_value
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-".into());
        info!(
            id = %id,
            amount = tx.amount.as_deref().unwrap_or("-"),
            amount_value = %value,
            timestamp = tx.timestamp.as_deref().unwrap_or("-"),
            sender = tx.sender.as_deref().unwrap_or("-"),
            "Pix received: {json}"
        );
        Ok(())
    }
}

/// Appends each transaction as one JSON line to a file.
#[derive(Debug, Clone)]
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn sink_error(&self, reason: impl std::fmt::Display) -> PipelineError {
        PipelineError::Sink {
            sink: format!("jsonl:{}", self.path.display()),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl TransactionSink for JsonlSink {
    fn name(&self) -> &str {
        "jsonl"
    }

    async fn record(&self, id: &str, tx: &PixTransaction) -> Result<(), PipelineError> {
        let entry = RecordedTransaction::new(id, tx);
        let mut line = serde_json::to_string(&entry).map_err(|e| self.sink_error(e))?;
        line.push('\n');

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.sink_error(e))?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.sink_error(e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| self.sink_error(e))?;
        file.flush().await.map_err(|e| self.sink_error(e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::parser::parse_notification;

    #[tokio::test]
    async fn log_sink_accepts_partial_records() {
        let tx = parse_notification("formato desconhecido");
        LogSink.record("m1", &tx).await.unwrap();
    }

    #[test]
    fn recorded_transaction_carries_decimal_amount() {
        let tx = parse_notification("Valor recebido\nR$ 1.234,56");
        let entry = RecordedTransaction::new("m2", &tx);
        assert_eq!(entry.amount_value, Some(dec!(1234.56)));

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["amount_value"], "1234.56");
        assert_eq!(json["amount"], "1.234,56");
        assert_eq!(json["id"], "m2");
    }

    #[tokio::test]
    async fn jsonl_sink_appends_one_line_per_record() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = JsonlSink::new(tmp.path().join("out").join("pix.jsonl"));

        let first = parse_notification("R$ 852,00\nPix de GOBBI PAVAN EDUCACAO LTDA");
        let second = parse_notification("sem campos");
        sink.record("a", &first).await.unwrap();
        sink.record("b", &second).await.unwrap();

        let content = std::fs::read_to_string(sink.path()).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["id"], "a");
        assert_eq!(lines[0]["amount"], "852,00");
        assert_eq!(lines[0]["amount_value"], "852.00");
        assert_eq!(lines[0]["sender"], "GOBBI PAVAN EDUCACAO LTDA");
        assert_eq!(lines[1]["id"], "b");
        assert!(lines[1]["amount"].is_null());
        assert!(lines[1]["amount_value"].is_null());
        assert!(lines[1]["recorded_at"].is_string());
    }
}
