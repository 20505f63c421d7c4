//! Paged batches of transactions.

use crate::{Checkpoint, Transaction};

/// A bounded batch of transactions answering one cursor.
///
/// `previous_checkpoint` is the caller-supplied cursor the page answers; when
/// the page is non-empty, the first transaction is the direct successor of
/// that cursor and the transactions appear in store order.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    previous_checkpoint: Checkpoint,
    transactions: Vec<Transaction>,
}

impl Page {
    /// Creates a page answering `previous_checkpoint`.
    pub fn new(previous_checkpoint: Checkpoint, transactions: Vec<Transaction>) -> Self {
        Self {
            previous_checkpoint,
            transactions,
        }
    }

    /// Creates an empty page answering `previous_checkpoint`.
    pub fn empty(previous_checkpoint: Checkpoint) -> Self {
        Self::new(previous_checkpoint, Vec::new())
    }

    /// The cursor this page answers.
    #[inline]
    pub fn previous_checkpoint(&self) -> &Checkpoint {
        &self.previous_checkpoint
    }

    /// The transactions of the page, in store order.
    #[inline]
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Consumes the page and returns its transactions.
    pub fn into_transactions(self) -> Vec<Transaction> {
        self.transactions
    }

    /// Checkpoint of the last transaction, or `None` when empty.
    pub fn last_checkpoint(&self) -> Option<&Checkpoint> {
        self.transactions.last().map(|tx| &tx.checkpoint)
    }

    /// Number of transactions in the page.
    #[inline]
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Returns `true` when the page carries no transactions.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Returns `true` when this page is a non-empty answer to `cursor`.
    pub fn answers(&self, cursor: &Checkpoint) -> bool {
        !self.is_empty() && self.previous_checkpoint == *cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn tx(checkpoint: &str) -> Transaction {
        Transaction {
            id: format!("commit-{checkpoint}").into(),
            stream_id: "stream-1".into(),
            checkpoint: Checkpoint::new(checkpoint),
            timestamp_utc: Utc::now(),
            events: vec![crate::EventEnvelope::new(json!({"n": checkpoint}))],
        }
    }

    #[test]
    fn test_empty_page() {
        let page = Page::empty(Checkpoint::new("5"));
        assert!(page.is_empty());
        assert_eq!(page.len(), 0);
        assert_eq!(page.last_checkpoint(), None);
        assert!(!page.answers(&Checkpoint::new("5")));
    }

    #[test]
    fn test_last_checkpoint_and_answers() {
        let page = Page::new(Checkpoint::origin(), vec![tx("1"), tx("2"), tx("3")]);
        assert_eq!(page.last_checkpoint(), Some(&Checkpoint::new("3")));
        assert!(page.answers(&Checkpoint::origin()));
        assert!(!page.answers(&Checkpoint::new("1")));
    }
}
