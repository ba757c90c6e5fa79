//! Per-kind request id generation.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::kind::{KIND_COUNT, OperationKind, RequestId};

/// Hands out strictly increasing ids, one counter per [`OperationKind`].
///
/// Counters start at zero and are never reset, so ids keep increasing across
/// reconnects of the same client.
#[derive(Debug, Default)]
pub struct RequestIdAllocator {
    counters: [AtomicU64; KIND_COUNT],
}

impl RequestIdAllocator {
    /// Creates an allocator with every counter at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes and returns the next id for `kind`.
    ///
    /// Concurrent callers for the same kind always receive distinct values.
    pub fn next(&self, kind: OperationKind) -> RequestId {
        RequestId::new(self.counter(kind).fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the id the next call to [`Self::next`] would produce.
    #[must_use]
    pub fn peek(&self, kind: OperationKind) -> RequestId {
        RequestId::new(self.counter(kind).load(Ordering::Relaxed))
    }

    const fn counter(&self, kind: OperationKind) -> &AtomicU64 {
        let [tokenize, tag, chunk, lemmatize, detect] = &self.counters;
        match kind {
            OperationKind::WordTokenize => tokenize,
            OperationKind::PartOfSpeechTag => tag,
            OperationKind::NamedEntityChunk => chunk,
            OperationKind::Lemmatize => lemmatize,
            OperationKind::LanguageDetect => detect,
        }
    }
}
