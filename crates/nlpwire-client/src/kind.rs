//! Operation kinds and their per-kind request identifiers.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Number of [`OperationKind`] variants.
pub(crate) const KIND_COUNT: usize = 5;

/// Category of a remote call. Each kind owns an independent request id
/// namespace and a distinct result shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OperationKind {
    /// Split text into word tokens.
    WordTokenize,
    /// Part-of-speech tagging.
    PartOfSpeechTag,
    /// Named entity chunking.
    NamedEntityChunk,
    /// Reduce a word to its lemma.
    Lemmatize,
    /// Detect the language of a text.
    LanguageDetect,
}

impl OperationKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; KIND_COUNT] = [
        Self::WordTokenize,
        Self::PartOfSpeechTag,
        Self::NamedEntityChunk,
        Self::Lemmatize,
        Self::LanguageDetect,
    ];

    /// Label carried in the `command` field on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WordTokenize => "word_tokenize",
            Self::PartOfSpeechTag => "pos_tag",
            Self::NamedEntityChunk => "ne_chunk",
            Self::Lemmatize => "lemmatize",
            Self::LanguageDetect => "detect_language",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Raised when a `command` label names no known operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown operation kind '{0}'")]
pub struct OperationKindParseError(String);

impl OperationKindParseError {
    /// Returns the label that failed to parse.
    #[must_use]
    pub fn input(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for OperationKind {
    type Err = OperationKindParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalised = input.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalised)
            .ok_or(OperationKindParseError(normalised))
    }
}

/// Sequence number correlating a call with its response. Unique only within
/// one [`OperationKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
    /// Wraps a raw identifier.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for RequestId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}
