use std::marker::PhantomData;

use crate::error::RepositoryError;
use crate::indexer::tfidf::{DefaultTFIDFEngine, TFIDFEngine};
use crate::repository::{CorpusRepository, Term};

/// Result of [`DocumentFrequencyLedger::observe`].
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    /// First document containing the term.
    Created(Term),
    /// The term was already known; its count and idf were bumped.
    Existing(Term),
}

impl Observation {
    /// Term as stored after the observation.
    pub fn term(&self) -> &Term {
        match self {
            Self::Created(term) | Self::Existing(term) => term,
        }
    }

    /// Owned [`Observation::term`].
    pub fn into_term(self) -> Term {
        match self {
            Self::Created(term) | Self::Existing(term) => term,
        }
    }

    /// Whether this observation inserted the term.
    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Corpus-wide document frequency table.
///
/// The table itself lives in the repository; the ledger owns the rules for
/// changing it. `total_documents` is fixed for the run, so after the last
/// document is observed every term holds
/// `idf = E::idf(total_documents, document_count)` whatever order documents
/// arrived in.
///
/// Calls must be serialized: two documents observing the same term
/// concurrently would both read a stale count.
#[derive(Debug, Clone, Copy)]
pub struct DocumentFrequencyLedger<E = DefaultTFIDFEngine> {
    total_documents: u64,
    _marker: PhantomData<E>,
}

impl<E> DocumentFrequencyLedger<E>
where
    E: TFIDFEngine,
{
    pub fn new(total_documents: u64) -> Self {
        Self {
            total_documents,
            _marker: PhantomData,
        }
    }

    pub fn total_documents(&self) -> u64 {
        self.total_documents
    }

    /// IDF for a term found in `document_count` documents.
    #[inline]
    pub fn idf(&self, document_count: u64) -> f64 {
        E::idf(self.total_documents, document_count)
    }

    /// Upsert `text` for one document: create it with a count of one, or
    /// increment its count and recompute its idf.
    ///
    /// Call once per distinct term per document, never per occurrence.
    pub fn observe<R>(&self, repo: &mut R, text: &str) -> Result<Observation, RepositoryError>
    where
        R: CorpusRepository + ?Sized,
    {
        match repo.find_term_by_text(text)? {
            None => {
                let term = repo.create_term(text, 1, self.idf(1))?;
                Ok(Observation::Created(term))
            }
            Some(mut term) => {
                term.document_count += 1;
                term.inverse_document_frequency = self.idf(term.document_count);
                repo.update_term(&term)?;
                Ok(Observation::Existing(term))
            }
        }
    }
}
