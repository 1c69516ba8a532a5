//! Error types for the indexer and its repository collaborator.

use thiserror::Error;

use crate::repository::{DocumentId, TermId};

/// Errors reported by a `CorpusRepository` implementation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RepositoryError {
    /// The store could not be reached or refused the operation.
    #[error("repository unavailable: {0}")]
    Unavailable(String),

    /// A write would break a uniqueness or reference constraint.
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// A record addressed by key does not exist.
    #[error("record not found: {0}")]
    NotFound(String),
}

/// Errors surfaced by the indexing pipeline.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The document has no tokens after whitespace splitting.
    #[error("document {document} has no tokens")]
    EmptyDocument {
        /// Offending document.
        document: DocumentId,
    },

    /// A repository call failed and retries were exhausted.
    #[error("repository failure{}{}: {}", fmt_document(.document), fmt_term(.term), .source)]
    Repository {
        /// Document being ingested, if the failure happened inside one.
        document: Option<DocumentId>,
        /// Term being written, if known.
        term: Option<TermId>,
        /// Underlying repository error.
        #[source]
        source: RepositoryError,
    },

    /// The vocabulary does not match the repository it is assembled against.
    #[error("vocabulary is inconsistent with the repository: {reason}")]
    InconsistentVocabulary {
        /// What did not line up.
        reason: String,
    },

    /// A document-term was read before the finalizer assigned its tf-idf.
    #[error("document {document} term {term:?} has no tf-idf; run the finalizer first")]
    NotFinalized {
        /// Row document.
        document: DocumentId,
        /// Column term.
        term: TermId,
    },

    /// A tf-idf value has no finite counterpart in the matrix element type.
    #[error("document {document} term {term:?} tf-idf {value} does not fit the matrix type")]
    Unrepresentable {
        /// Row document.
        document: DocumentId,
        /// Column term.
        term: TermId,
        /// Stored value.
        value: f64,
    },

    /// A loaded artifact is not rectangular or its parts disagree.
    #[error("malformed training set: {0}")]
    ArtifactShape(String),

    /// CBOR encode/decode failure.
    #[error("artifact serialization failed: {0}")]
    Artifact(#[from] serde_cbor::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be parsed or is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl IndexError {
    /// Wraps a repository error raised outside any single document.
    pub(crate) fn repository(source: RepositoryError) -> Self {
        Self::Repository {
            document: None,
            term: None,
            source,
        }
    }
}

impl From<RepositoryError> for IndexError {
    fn from(source: RepositoryError) -> Self {
        Self::repository(source)
    }
}

fn fmt_document(document: &Option<DocumentId>) -> String {
    document.map_or_else(String::new, |id| format!(" in document {id}"))
}

fn fmt_term(term: &Option<TermId>) -> String {
    term.as_ref()
        .map_or_else(String::new, |term| format!(" at term {:?}", term.as_str()))
}
