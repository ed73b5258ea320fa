//! Live mailbox — wraps a [`MailProvider`] and bounds per-run work.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::TransportError;
use crate::mailbox::{MailFilter, MailProvider, MailboxSource, Message, MessageRef};

/// Mailbox that queries a real provider.
///
/// Listing is capped to `filter.limit`; marking clears the unread flag.
/// Transport errors propagate unchanged.
pub struct LiveMailbox {
    provider: Arc<dyn MailProvider>,
}

impl LiveMailbox {
    pub fn new(provider: Arc<dyn MailProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl MailboxSource for LiveMailbox {
    fn name(&self) -> &str {
        self.provider.name()
    }

    async fn list_candidates(
        &self,
        filter: &MailFilter,
    ) -> Result<Vec<MessageRef>, TransportError> {
        let query = filter.to_query();
        let mut refs = self.provider.search(&query, filter.limit).await?;
        let found = refs.len();
        // Providers treat max_results as a hint.
        refs.truncate(filter.limit);
        debug!(query = %query, found, kept = refs.len(), "Listed candidates");
        Ok(refs)
    }

    async fn fetch_full(&self, msg: &MessageRef) -> Result<Message, TransportError> {
        self.provider.get(&msg.id).await
    }

    async fn mark_processed(&self, msg: &MessageRef) -> Result<(), TransportError> {
        self.provider.mark_as_read(&msg.id).await
    }
}
