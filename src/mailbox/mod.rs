//! Mailbox sources — where candidate notification emails come from.
//!
//! The pipeline only sees [`MailboxSource`]. Two variants exist:
//! - [`FixtureMailbox`]: a fixed in-memory set of messages, no side effects.
//! - [`LiveMailbox`]: queries a real provider through [`MailProvider`]
//!   and marks handled messages as read.

pub mod fixture;
pub mod gmail;
pub mod live;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;

pub use fixture::FixtureMailbox;
pub use gmail::GmailClient;
pub use live::LiveMailbox;

// ── Messages ────────────────────────────────────────────────────────

/// Reference to a message returned by listing, before the full fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

impl MessageRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            thread_id: None,
        }
    }
}

/// A fully fetched message. Never mutated after the source produces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub payload: Payload,
}

/// Transport payload of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Plain text blob, used as the body as-is.
    Raw(String),
    /// MIME tree as reported by the provider.
    Structured(MessagePart),
}

/// One node of a MIME tree. Field names follow the Gmail API shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    #[serde(default)]
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<PartBody>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<MessagePart>,
}

impl MessagePart {
    /// Leaf part carrying base64 content.
    pub fn leaf(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            body: Some(PartBody {
                data: Some(data.into()),
                size: 0,
            }),
            parts: Vec::new(),
        }
    }

    /// Container part holding sub-parts.
    pub fn multipart(mime_type: impl Into<String>, parts: Vec<MessagePart>) -> Self {
        Self {
            mime_type: mime_type.into(),
            body: None,
            parts,
        }
    }

    /// Base64 content of this part, if any.
    pub fn data(&self) -> Option<&str> {
        self.body
            .as_ref()
            .and_then(|b| b.data.as_deref())
            .filter(|d| !d.is_empty())
    }
}

/// Encoded body of a MIME part.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default)]
    pub size: u64,
}

// ── Filter ──────────────────────────────────────────────────────────

/// Which messages a source should list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailFilter {
    /// Sender address to match.
    pub sender: String,
    /// Restrict to unread messages.
    pub unread_only: bool,
    /// Upper bound on candidates returned per listing.
    pub limit: usize,
}

impl MailFilter {
    /// Provider search expression, e.g. `from:bank@example.com is:unread`.
    pub fn to_query(&self) -> String {
        if self.unread_only {
            format!("from:{} is:unread", self.sender)
        } else {
            format!("from:{}", self.sender)
        }
    }
}

// ── Traits ──────────────────────────────────────────────────────────

/// Source of candidate messages for the pipeline.
#[async_trait]
pub trait MailboxSource: Send + Sync {
    /// Source name for logging.
    fn name(&self) -> &str;

    /// List messages that may need processing.
    async fn list_candidates(
        &self,
        filter: &MailFilter,
    ) -> Result<Vec<MessageRef>, TransportError>;

    /// Fetch the full message behind a reference.
    async fn fetch_full(&self, msg: &MessageRef) -> Result<Message, TransportError>;

    /// Record on the source side that a message was handled.
    async fn mark_processed(&self, msg: &MessageRef) -> Result<(), TransportError>;
}

/// Mail provider client used by [`LiveMailbox`].
///
/// Query semantics are provider-specific; results only need to be a
/// finite, ordered sequence.
#[async_trait]
pub trait MailProvider: Send + Sync {
    /// Provider name (e.g. "gmail").
    fn name(&self) -> &str;

    /// Search messages matching `query`, returning at most `max_results`.
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<MessageRef>, TransportError>;

    /// Fetch a full message by ID.
    async fn get(&self, id: &str) -> Result<Message, TransportError>;

    /// Clear the unread flag on a message.
    async fn mark_as_read(&self, id: &str) -> Result<(), TransportError>;
}
