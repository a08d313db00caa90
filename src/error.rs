//! Error type shared by every fallible operation of the crate.

use crate::id::MessageId;

/// Result type that is being returned from methods that can fail and thus have [`IndexError`]s.
pub type IndexResult<T> = Result<T, IndexError>;

/// Errors that can result from building, querying or mutating the index.
// [`Error`] is public, but opaque and easy to keep compatible.
#[derive(thiserror::Error, Debug)]
#[error(transparent)]
pub struct IndexError(#[from] IndexErrorKind);

// Accessors for anything we do want to expose publicly.
impl IndexError {
    /// Expose the inner error kind.
    ///
    /// This is useful for matching on the error kind.
    pub fn into_inner(self) -> IndexErrorKind {
        self.0
    }

    /// Borrow the inner error kind.
    pub fn kind(&self) -> &IndexErrorKind {
        &self.0
    }

    /// Whether the error reports a broken internal invariant rather than bad input.
    ///
    /// An index that produced such an error should be considered inconsistent.
    pub fn is_corruption(&self) -> bool {
        matches!(self.0, IndexErrorKind::IndexCorrupted(_))
    }

    pub(crate) fn corrupted(what: impl Into<String>) -> Self {
        let what = what.into();
        log::error!("index corrupted: {what}");
        Self(IndexErrorKind::IndexCorrupted(what))
    }

    pub(crate) fn malformed(what: impl Into<String>) -> Self {
        Self(IndexErrorKind::Malformed(what.into()))
    }
}

impl From<std::io::Error> for IndexError {
    fn from(value: std::io::Error) -> Self {
        Self(IndexErrorKind::Io(value))
    }
}

impl From<serde_json::Error> for IndexError {
    fn from(value: serde_json::Error) -> Self {
        Self(IndexErrorKind::Config(value))
    }
}

/// [`IndexErrorKind`] describes the errors that can happen while working with messages and the index.
///
/// This is a non-exhaustive enum, so additional variants may be added in future. It is
/// recommended to match against the wildcard `_` instead of listing all possible variants,
/// to avoid problems when new variants are added.
#[non_exhaustive]
#[derive(thiserror::Error, Debug, displaydoc::Display)]
pub enum IndexErrorKind {
    /// An error occurred while reading or writing a serialized message
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Failed to parse the index configuration
    #[error(transparent)]
    Config(#[from] serde_json::Error),
    /// Invalid message id {0}
    InvalidMessageId(MessageId),
    /// Can't parse `{0}` as a message id
    InvalidMessageIdFormat(String),
    /// Category `{category}` of message {id} does not start with '/'
    InvalidCategory {
        /// The offending category name.
        category: String,
        /// The message carrying it.
        id: MessageId,
    },
    /// Unknown language code `{0}`
    InvalidLanguage(String),
    /// Unknown country code `{0}`
    InvalidCountry(String),
    /// Message has no content block
    NoContent,
    /// Image index {index} is out of range, message has {count} images
    ImageOutOfRange {
        /// Requested image.
        index: usize,
        /// Number of images the message carries.
        count: usize,
    },
    /// Message text produces more word positions than a position can address
    PositionLimitExceeded,
    /// No free message numbers left
    NumbersExhausted,
    /// Unsupported serialization version {0}
    UnsupportedVersion(u16),
    /// Malformed serialized data: {0}
    Malformed(String),
    /// Message {0} is not in the index
    MessageNotFound(MessageId),
    /// Index corrupted: {0}
    IndexCorrupted(String),
}
