//! Typed results materialized from response messages.
//!
//! Field extraction is lenient: a missing or mistyped field leaves the
//! corresponding part of the result empty instead of failing the call.

use crate::kind::OperationKind;
use crate::message::{Message, wire};

/// Builds a typed result from the labeled fields of a response.
pub trait Materialize: Sized {
    /// Kind whose responses this type is built from.
    const KIND: OperationKind;

    /// Extracts the result from `message`.
    fn materialize(message: &Message) -> Self;
}

/// Result of [`OperationKind::WordTokenize`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tokens {
    /// Tokens in input order.
    pub tokens: Vec<String>,
}

/// Result of [`OperationKind::PartOfSpeechTag`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaggedTokens {
    /// Tokens in input order.
    pub tokens: Vec<String>,
    /// Part-of-speech tag for each token.
    pub tags: Vec<String>,
}

/// Result of [`OperationKind::NamedEntityChunk`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityChunks {
    /// Tokens in input order.
    pub tokens: Vec<String>,
    /// Entity tag for each token.
    pub tags: Vec<String>,
}

/// Result of [`OperationKind::Lemmatize`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lemma {
    /// Lemma form, absent when the service returned no tokens.
    pub lemma: Option<String>,
}

/// Result of [`OperationKind::LanguageDetect`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectedLanguage {
    /// Language code, absent when the service returned no tokens.
    pub code: Option<String>,
}

macro_rules! parallel_pairs {
    ($ty:ty) => {
        impl $ty {
            /// Pairs each token with its tag, stopping at the shorter list.
            #[must_use]
            pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
                self.tokens
                    .iter()
                    .map(String::as_str)
                    .zip(self.tags.iter().map(String::as_str))
            }
        }
    };
}

parallel_pairs!(TaggedTokens);
parallel_pairs!(EntityChunks);

fn first_token(message: &Message) -> Option<String> {
    message.text_list(wire::RETURN_TOKEN).into_iter().next()
}

impl Materialize for Tokens {
    const KIND: OperationKind = OperationKind::WordTokenize;

    fn materialize(message: &Message) -> Self {
        Self {
            tokens: message.text_list(wire::RETURN_TOKEN),
        }
    }
}

impl Materialize for TaggedTokens {
    const KIND: OperationKind = OperationKind::PartOfSpeechTag;

    fn materialize(message: &Message) -> Self {
        Self {
            tokens: message.text_list(wire::RETURN_TOKEN),
            tags: message.text_list(wire::RETURN_TAG),
        }
    }
}

impl Materialize for EntityChunks {
    const KIND: OperationKind = OperationKind::NamedEntityChunk;

    fn materialize(message: &Message) -> Self {
        Self {
            tokens: message.text_list(wire::RETURN_TOKEN),
            tags: message.text_list(wire::RETURN_TAG),
        }
    }
}

impl Materialize for Lemma {
    const KIND: OperationKind = OperationKind::Lemmatize;

    fn materialize(message: &Message) -> Self {
        Self {
            lemma: first_token(message),
        }
    }
}

impl Materialize for DetectedLanguage {
    const KIND: OperationKind = OperationKind::LanguageDetect;

    fn materialize(message: &Message) -> Self {
        Self {
            code: first_token(message),
        }
    }
}

/// Any typed result, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationResult {
    /// See [`Tokens`].
    Tokens(Tokens),
    /// See [`TaggedTokens`].
    TaggedTokens(TaggedTokens),
    /// See [`EntityChunks`].
    EntityChunks(EntityChunks),
    /// See [`Lemma`].
    Lemma(Lemma),
    /// See [`DetectedLanguage`].
    DetectedLanguage(DetectedLanguage),
}

impl OperationResult {
    /// Kind the result belongs to.
    #[must_use]
    pub const fn kind(&self) -> OperationKind {
        match self {
            Self::Tokens(_) => Tokens::KIND,
            Self::TaggedTokens(_) => TaggedTokens::KIND,
            Self::EntityChunks(_) => EntityChunks::KIND,
            Self::Lemma(_) => Lemma::KIND,
            Self::DetectedLanguage(_) => DetectedLanguage::KIND,
        }
    }
}

macro_rules! into_operation_result {
    ($($ty:ident),+ $(,)?) => {
        $(
            impl From<$ty> for OperationResult {
                fn from(result: $ty) -> Self {
                    Self::$ty(result)
                }
            }
        )+
    };
}

into_operation_result!(Tokens, TaggedTokens, EntityChunks, Lemma, DetectedLanguage);

/// Materializes `message` as the result shape of `kind`.
#[must_use]
pub fn materialize(kind: OperationKind, message: &Message) -> OperationResult {
    match kind {
        OperationKind::WordTokenize => OperationResult::Tokens(Tokens::materialize(message)),
        OperationKind::PartOfSpeechTag => {
            OperationResult::TaggedTokens(TaggedTokens::materialize(message))
        }
        OperationKind::NamedEntityChunk => {
            OperationResult::EntityChunks(EntityChunks::materialize(message))
        }
        OperationKind::Lemmatize => OperationResult::Lemma(Lemma::materialize(message)),
        OperationKind::LanguageDetect => {
            OperationResult::DetectedLanguage(DetectedLanguage::materialize(message))
        }
    }
}
