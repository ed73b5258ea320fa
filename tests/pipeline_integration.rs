//! End-to-end pipeline runs against stub mail providers.
//!
//! Each test wires a real `LiveMailbox` or `FixtureMailbox` to a ledger and
//! a collecting sink, then checks the run summary and side effects.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use pix_watch::error::{PipelineError, TransportError};
use pix_watch::ledger::{Ledger, LibSqlLedger, MemoryLedger};
use pix_watch::mailbox::fixture::SAMPLE_MESSAGE_ID;
use pix_watch::mailbox::{
    FixtureMailbox, LiveMailbox, MailFilter, MailProvider, Message, MessagePart, MessageRef,
    Payload,
};
use pix_watch::parser::PixTransaction;
use pix_watch::pipeline::{PixPipeline, TransactionSink};

/// In-memory stand-in for the Gmail API.
#[derive(Default)]
struct StubProvider {
    order: Vec<String>,
    messages: HashMap<String, Message>,
    unreachable: bool,
    gets: Mutex<Vec<String>>,
    read: Mutex<Vec<String>>,
}

impl StubProvider {
    fn with_message(mut self, id: &str, payload: Payload) -> Self {
        self.order.push(id.to_string());
        self.messages.insert(
            id.to_string(),
            Message {
                id: id.to_string(),
                payload,
            },
        );
        self
    }
}

#[async_trait]
impl MailProvider for StubProvider {
    fn name(&self) -> &str {
        "stub"
    }

    async fn search(
        &self,
        _query: &str,
        max_results: usize,
    ) -> Result<Vec<MessageRef>, TransportError> {
        if self.unreachable {
            return Err(TransportError::AuthFailed {
                provider: "stub".into(),
            });
        }
        let unread = self.read.lock().unwrap();
        Ok(self
            .order
            .iter()
            .filter(|id| !unread.contains(*id))
            .take(max_results)
            .map(MessageRef::new)
            .collect())
    }

    async fn get(&self, id: &str) -> Result<Message, TransportError> {
        self.gets.lock().unwrap().push(id.to_string());
        self.messages
            .get(id)
            .cloned()
            .ok_or_else(|| TransportError::Status {
                provider: "stub".into(),
                status: 404,
                body: "not found".into(),
            })
    }

    async fn mark_as_read(&self, id: &str) -> Result<(), TransportError> {
        self.read.lock().unwrap().push(id.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct CollectingSink {
    records: Mutex<Vec<(String, PixTransaction)>>,
}

#[async_trait]
impl TransactionSink for CollectingSink {
    fn name(&self) -> &str {
        "collect"
    }

    async fn record(&self, id: &str, tx: &PixTransaction) -> Result<(), PipelineError> {
        self.records
            .lock()
            .unwrap()
            .push((id.to_string(), tx.clone()));
        Ok(())
    }
}

fn filter() -> MailFilter {
    MailFilter {
        sender: "todomundo@nubank.com.br".into(),
        unread_only: true,
        limit: 5,
    }
}

fn gmail_payload(plain: Option<&str>, html: Option<&str>) -> Payload {
    let mut alternative = Vec::new();
    if let Some(text) = plain {
        alternative.push(MessagePart::leaf("text/plain", URL_SAFE_NO_PAD.encode(text)));
    }
    if let Some(text) = html {
        alternative.push(MessagePart::leaf("text/html", URL_SAFE_NO_PAD.encode(text)));
    }
    Payload::Structured(MessagePart::multipart(
        "multipart/mixed",
        vec![MessagePart::multipart("multipart/alternative", alternative)],
    ))
}

const NOTIFICATION: &str = "Transferência recebida\r\n\r\nVocê recebeu uma transferência pelo Pix de GOBBI PAVAN EDUCACAO LTDA\r\n\r\nValor recebido\r\nR$ 852,00\r\n\r\n26 DEZ às 17:02\r\n";

#[tokio::test]
async fn live_notification_is_parsed_and_marked_read() {
    let provider = Arc::new(StubProvider::default().with_message(
        "18c2f",
        gmail_payload(Some(NOTIFICATION), Some("<p>ignored</p>")),
    ));
    let sink = Arc::new(CollectingSink::default());
    let ledger = Arc::new(MemoryLedger::new());
    let pipeline = PixPipeline::new(
        Arc::new(LiveMailbox::new(provider.clone())),
        ledger.clone(),
        filter(),
    )
    .with_sink(sink.clone());

    let summary = pipeline.run().await.unwrap();
    assert_eq!(summary.processed, 1);

    let records = sink.records.lock().unwrap();
    let (id, tx) = &records[0];
    assert_eq!(id, "18c2f");
    assert_eq!(tx.amount.as_deref(), Some("852,00"));
    assert_eq!(tx.timestamp.as_deref(), Some("26 DEZ às 17:02"));
    assert_eq!(tx.sender.as_deref(), Some("GOBBI PAVAN EDUCACAO LTDA"));
    assert!(!tx.preview.contains('\r'));

    assert!(ledger.has("18c2f").await.unwrap());
    assert_eq!(provider.read.lock().unwrap().as_slice(), &["18c2f".to_string()]);
}

#[tokio::test]
async fn html_only_notification_still_yields_fields() {
    let html = "<p>Pix de MARIA SILVA</p>\n<p>R$ 10,50</p>\n<p>3 JAN às 08:00</p>";
    let provider =
        Arc::new(StubProvider::default().with_message("h1", gmail_payload(None, Some(html))));
    let sink = Arc::new(CollectingSink::default());
    let pipeline = PixPipeline::new(
        Arc::new(LiveMailbox::new(provider)),
        Arc::new(MemoryLedger::new()),
        filter(),
    )
    .with_sink(sink.clone());

    assert_eq!(pipeline.run().await.unwrap().processed, 1);
    let records = sink.records.lock().unwrap();
    assert_eq!(records[0].1.amount.as_deref(), Some("10,50"));
    assert_eq!(records[0].1.timestamp.as_deref(), Some("3 JAN às 08:00"));
    // Markup is not stripped; the sender runs to end of line.
    assert!(records[0].1.sender.as_deref().unwrap().starts_with("MARIA SILVA"));
}

#[tokio::test]
async fn empty_body_is_retried_on_next_run() {
    let provider = Arc::new(
        StubProvider::default().with_message("e1", Payload::Structured(MessagePart::default())),
    );
    let ledger = Arc::new(MemoryLedger::new());
    let pipeline = PixPipeline::new(
        Arc::new(LiveMailbox::new(provider.clone())),
        ledger.clone(),
        filter(),
    );

    for _ in 0..2 {
        let summary = pipeline.run().await.unwrap();
        assert_eq!(summary.processed, 0);
        assert_eq!(summary.empty, 1);
    }
    assert!(!ledger.has("e1").await.unwrap());
    assert!(provider.read.lock().unwrap().is_empty());
    assert_eq!(provider.gets.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn previously_marked_message_is_not_fetched() {
    let provider = Arc::new(
        StubProvider::default()
            .with_message("old", gmail_payload(Some(NOTIFICATION), None))
            .with_message("new", gmail_payload(Some("R$ 1,00"), None)),
    );
    let ledger = Arc::new(MemoryLedger::new());
    ledger.mark("old").await.unwrap();

    let pipeline = PixPipeline::new(
        Arc::new(LiveMailbox::new(provider.clone())),
        ledger,
        filter(),
    );
    let summary = pipeline.run().await.unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(provider.gets.lock().unwrap().as_slice(), &["new".to_string()]);
}

#[tokio::test]
async fn unreachable_mailbox_fails_the_run() {
    let provider = Arc::new(StubProvider {
        unreachable: true,
        ..Default::default()
    });
    let pipeline = PixPipeline::new(
        Arc::new(LiveMailbox::new(provider)),
        Arc::new(MemoryLedger::new()),
        filter(),
    );

    let err = pipeline.run().await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Transport(TransportError::AuthFailed { .. })
    ));
}

#[tokio::test]
async fn batch_cap_bounds_work_per_run() {
    let mut provider = StubProvider::default();
    for i in 0..7 {
        provider = provider.with_message(&format!("m{i}"), gmail_payload(Some("R$ 1,00"), None));
    }
    let provider = Arc::new(provider);
    let pipeline = PixPipeline::new(
        Arc::new(LiveMailbox::new(provider.clone())),
        Arc::new(MemoryLedger::new()),
        filter(),
    );

    assert_eq!(pipeline.run().await.unwrap().processed, 5);
    // Handled messages are now read, so the next run picks up the rest.
    assert_eq!(pipeline.run().await.unwrap().processed, 2);
    assert_eq!(pipeline.run().await.unwrap().processed, 0);
}

#[tokio::test]
async fn fixture_is_processed_once_across_ledger_reopen() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("pix-ledger.db");

    let first = {
        let ledger = Arc::new(LibSqlLedger::new_local(&path).await.unwrap());
        PixPipeline::new(Arc::new(FixtureMailbox::sample()), ledger, filter())
            .run()
            .await
            .unwrap()
    };
    assert_eq!(first.processed, 1);

    let ledger = Arc::new(LibSqlLedger::new_local(&path).await.unwrap());
    assert!(ledger.has(SAMPLE_MESSAGE_ID).await.unwrap());
    let second = PixPipeline::new(Arc::new(FixtureMailbox::sample()), ledger, filter())
        .run()
        .await
        .unwrap();
    assert_eq!(second.processed, 0);
    assert_eq!(second.skipped, 1);
}
