//! Corpus repository collaborator.
//!
//! The indexer never owns storage. It reads documents and reads/writes
//! `Term` and `DocumentTerm` records through [`CorpusRepository`], and wraps
//! every multi-record write in a [`Session`] so a failure rolls back cleanly.

pub mod memory;

use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::str::SplitWhitespace;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::RepositoryError;

/// Stable document identifier assigned by the ingestion side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub u64);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Term identifier. The term text is its own key, so ordering by
/// identifier is lexicographic and does not depend on ingestion order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TermId(Arc<str>);

impl TermId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TermId {
    fn from(text: &str) -> Self {
        Self(Arc::from(text))
    }
}

impl Borrow<str> for TermId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TermId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One ingested article. Read-only for the indexer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    /// Cleaned, whitespace-delimited token string.
    pub processed_text: String,
    /// Categorical source label, e.g. the site the article came from.
    pub source: String,
}

impl Document {
    pub fn new(id: u64, processed_text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: DocumentId(id),
            processed_text: processed_text.into(),
            source: source.into(),
        }
    }

    /// Tokens of the document. Only whitespace splitting, no normalization.
    pub fn tokens(&self) -> SplitWhitespace<'_> {
        self.processed_text.split_whitespace()
    }
}

/// A distinct term with its corpus-wide document frequency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    pub id: TermId,
    /// Number of documents containing the term at least once.
    pub document_count: u64,
    pub inverse_document_frequency: f64,
}

impl Term {
    pub fn text(&self) -> &str {
        self.id.as_str()
    }
}

/// One (document, term) occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentTerm {
    pub document_id: DocumentId,
    pub term_id: TermId,
    /// Augmented term frequency, fixed when the record is created.
    pub term_frequency: f64,
    /// Set once by the finalizer.
    pub tf_idf: Option<f64>,
}

/// Storage operations the indexer depends on.
///
/// Writes issued between [`begin`](Self::begin) and [`commit`](Self::commit)
/// must become visible together or, after [`rollback`](Self::rollback), not at all.
/// Use [`Session`] rather than calling the transaction hooks directly.
pub trait CorpusRepository {
    /// All documents, in a stable order.
    fn list_documents(&self) -> Result<Vec<Document>, RepositoryError>;

    fn find_term_by_text(&self, text: &str) -> Result<Option<Term>, RepositoryError>;

    fn create_term(
        &mut self,
        text: &str,
        document_count: u64,
        inverse_document_frequency: f64,
    ) -> Result<Term, RepositoryError>;

    fn update_term(&mut self, term: &Term) -> Result<(), RepositoryError>;

    fn create_document_term(
        &mut self,
        document_id: DocumentId,
        term_id: &TermId,
        term_frequency: f64,
    ) -> Result<DocumentTerm, RepositoryError>;

    /// Every document-term joined with its term.
    fn list_document_terms(&self) -> Result<Vec<(Term, DocumentTerm)>, RepositoryError>;

    fn update_document_term(&mut self, document_term: &DocumentTerm) -> Result<(), RepositoryError>;

    /// Identifiers of terms with `document_count > threshold`.
    fn list_term_ids_with_document_count_above(
        &self,
        threshold: u64,
    ) -> Result<BTreeSet<TermId>, RepositoryError>;

    /// Document-terms of one document restricted to `term_ids`.
    fn list_document_terms_for_document(
        &self,
        document_id: DocumentId,
        term_ids: &BTreeSet<TermId>,
    ) -> Result<Vec<DocumentTerm>, RepositoryError>;

    fn begin(&mut self) -> Result<(), RepositoryError>;

    fn commit(&mut self) -> Result<(), RepositoryError>;

    fn rollback(&mut self);
}

/// Scoped transaction over a repository.
///
/// Opening begins a transaction. [`commit`](Self::commit) makes the writes
/// durable; dropping the session without committing rolls them back.
pub struct Session<'r, R>
where
    R: CorpusRepository + ?Sized,
{
    repo: &'r mut R,
    open: bool,
}

impl<'r, R> Session<'r, R>
where
    R: CorpusRepository + ?Sized,
{
    pub fn open(repo: &'r mut R) -> Result<Self, RepositoryError> {
        repo.begin()?;
        Ok(Self { repo, open: true })
    }

    pub fn commit(mut self) -> Result<(), RepositoryError> {
        self.open = false;
        let result = self.repo.commit();
        if result.is_err() {
            self.repo.rollback();
        }
        result
    }
}

impl<R> Deref for Session<'_, R>
where
    R: CorpusRepository + ?Sized,
{
    type Target = R;

    fn deref(&self) -> &R {
        &*self.repo
    }
}

impl<R> DerefMut for Session<'_, R>
where
    R: CorpusRepository + ?Sized,
{
    fn deref_mut(&mut self) -> &mut R {
        &mut *self.repo
    }
}

impl<R> Drop for Session<'_, R>
where
    R: CorpusRepository + ?Sized,
{
    fn drop(&mut self) {
        if self.open {
            self.repo.rollback();
        }
    }
}
