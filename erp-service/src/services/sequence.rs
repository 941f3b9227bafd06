//! Sequence numbers behind generated document numbers.

use crate::models::DocumentKind;
use async_trait::async_trait;
use service_core::error::AppError;

/// How the next sequence number for a document kind is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequenceStrategy {
    /// Atomic per-kind counter; numbers are never reissued.
    #[default]
    Counter,
    /// Number of stored documents plus one. Reissues numbers after deletes and
    /// races under concurrent saves; the unique index turns both into
    /// `AppError::DuplicateKey`.
    Count,
}

impl SequenceStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SequenceStrategy::Counter => "counter",
            SequenceStrategy::Count => "count",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "count" => SequenceStrategy::Count,
            _ => SequenceStrategy::Counter,
        }
    }
}

/// Source of the next sequence number for a document kind.
#[async_trait]
pub trait SequenceSource: Send + Sync {
    async fn next_sequence(&self, kind: DocumentKind) -> Result<u64, AppError>;
}
