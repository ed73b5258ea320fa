//! Fixture mailbox — fixed in-memory messages for dry runs and tests.

use async_trait::async_trait;

use crate::error::TransportError;
use crate::mailbox::{MailFilter, MailboxSource, Message, MessageRef, Payload};

/// ID of the built-in sample notification.
pub const SAMPLE_MESSAGE_ID: &str = "mock-email-1";

/// Raw sample of the bank's Pix credit notification.
pub const SAMPLE_NOTIFICATION: &str = "
Subject: Você recebeu uma transferência pelo Pix
From: Nubank <todomundo@nubank.com.br>

Transferência recebida

Você recebeu uma transferência pelo Pix de GOBBI PAVAN EDUCACAO LTDA

Valor recebido
R$ 852,00

26 DEZ às 17:02
";

/// Mailbox backed by a fixed list of messages.
///
/// Listing ignores the filter and returns every message in order.
/// Marking is a no-op.
pub struct FixtureMailbox {
    messages: Vec<Message>,
}

impl FixtureMailbox {
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    /// Single-message mailbox holding [`SAMPLE_NOTIFICATION`].
    pub fn sample() -> Self {
        Self::new(vec![Message {
            id: SAMPLE_MESSAGE_ID.to_string(),
            payload: Payload::Raw(SAMPLE_NOTIFICATION.to_string()),
        }])
    }
}

#[async_trait]
impl MailboxSource for FixtureMailbox {
    fn name(&self) -> &str {
        "fixture"
    }

    async fn list_candidates(
        &self,
        _filter: &MailFilter,
    ) -> Result<Vec<MessageRef>, TransportError> {
        Ok(self
            .messages
            .iter()
            .map(|m| MessageRef::new(m.id.clone()))
            .collect())
    }

    async fn fetch_full(&self, msg: &MessageRef) -> Result<Message, TransportError> {
        self.messages
            .iter()
            .find(|m| m.id == msg.id)
            .cloned()
            .ok_or_else(|| TransportError::InvalidResponse {
                provider: "fixture".into(),
                reason: format!("no fixture message with id {}", msg.id),
            })
    }

    async fn mark_processed(&self, _msg: &MessageRef) -> Result<(), TransportError> {
        Ok(())
    }
}
