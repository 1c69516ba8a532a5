use std::collections::BTreeSet;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::IndexError;
use crate::repository::{CorpusRepository, TermId};

/// Feature columns: the terms found in more than `min_document_count`
/// documents, in ascending identifier order.
///
/// Deserialization goes through [`Vocabulary::from_term_ids`], so stored
/// columns are re-sorted on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "VocabularyData")]
pub struct Vocabulary {
    min_document_count: u64,
    terms: IndexSet<TermId>,
}

/// Wire form of [`Vocabulary`], ordering not trusted.
#[derive(Deserialize)]
struct VocabularyData {
    min_document_count: u64,
    terms: Vec<TermId>,
}

impl From<VocabularyData> for Vocabulary {
    fn from(data: VocabularyData) -> Self {
        Self::from_term_ids(data.min_document_count, data.terms)
    }
}

impl Vocabulary {
    /// Read the qualifying terms from the repository and fix their order.
    pub fn select<R>(repo: &R, min_document_count: u64) -> Result<Self, IndexError>
    where
        R: CorpusRepository + ?Sized,
    {
        let ids = repo.list_term_ids_with_document_count_above(min_document_count)?;
        let vocabulary = Self::from_term_ids(min_document_count, ids);
        info!(min_document_count, terms = vocabulary.len(), "selected vocabulary");
        Ok(vocabulary)
    }

    /// Build from any id collection; sorts and drops duplicates.
    pub fn from_term_ids<I>(min_document_count: u64, ids: I) -> Self
    where
        I: IntoIterator<Item = TermId>,
    {
        let mut terms: Vec<TermId> = ids.into_iter().collect();
        terms.sort_unstable();
        terms.dedup();
        Self {
            min_document_count,
            terms: terms.into_iter().collect(),
        }
    }

    /// Threshold the vocabulary was selected with.
    pub fn min_document_count(&self) -> u64 {
        self.min_document_count
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Column of a term, by identifier equality.
    pub fn column(&self, term: &str) -> Option<usize> {
        self.terms.get_index_of(term)
    }

    /// Term of a column.
    pub fn term(&self, column: usize) -> Option<&TermId> {
        self.terms.get_index(column)
    }

    /// Terms in column order.
    pub fn terms(&self) -> impl Iterator<Item = &TermId> {
        self.terms.iter()
    }

    /// Whether `ids` is exactly this vocabulary's term set.
    pub fn matches(&self, ids: &BTreeSet<TermId>) -> bool {
        ids.len() == self.terms.len() && ids.iter().all(|id| self.terms.contains(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::memory::MemoryRepository;

    fn ids(texts: &[&str]) -> Vec<TermId> {
        texts.iter().map(|t| TermId::from(*t)).collect()
    }

    #[test]
    fn columns_are_sorted_by_identifier() {
        let vocab = Vocabulary::from_term_ids(0, ids(&["dog", "bird", "cat", "bird"]));
        let cols: Vec<&str> = vocab.terms().map(TermId::as_str).collect();
        assert_eq!(cols, vec!["bird", "cat", "dog"]);
        assert_eq!(vocab.column("cat"), Some(1));
        assert_eq!(vocab.column("owl"), None);
        assert_eq!(vocab.term(2).map(TermId::as_str), Some("dog"));
    }

    #[test]
    fn select_keeps_only_counts_above_threshold() {
        let mut repo = MemoryRepository::new();
        repo.create_term("rare", 2, 0.0).unwrap();
        repo.create_term("edge", 3, 0.0).unwrap();
        repo.create_term("common", 4, 0.0).unwrap();
        let vocab = Vocabulary::select(&repo, 3).unwrap();
        assert_eq!(vocab.len(), 1);
        assert_eq!(vocab.column("common"), Some(0));
        assert_eq!(vocab.min_document_count(), 3);
    }

    #[test]
    fn matches_requires_identical_sets() {
        let vocab = Vocabulary::from_term_ids(0, ids(&["a", "b"]));
        let same: BTreeSet<TermId> = ids(&["b", "a"]).into_iter().collect();
        let more: BTreeSet<TermId> = ids(&["a", "b", "c"]).into_iter().collect();
        let other: BTreeSet<TermId> = ids(&["a", "c"]).into_iter().collect();
        assert!(vocab.matches(&same));
        assert!(!vocab.matches(&more));
        assert!(!vocab.matches(&other));
    }

    #[test]
    fn deserialized_columns_are_resorted() {
        #[derive(Serialize)]
        struct Stored<'a> {
            min_document_count: u64,
            terms: &'a [&'a str],
        }
        let bytes = serde_cbor::to_vec(&Stored {
            min_document_count: 0,
            terms: &["dog", "cat", "bird", "cat"],
        })
        .unwrap();
        let vocab: Vocabulary = serde_cbor::from_slice(&bytes).unwrap();
        let cols: Vec<&str> = vocab.terms().map(TermId::as_str).collect();
        assert_eq!(cols, vec!["bird", "cat", "dog"]);
        assert_eq!(vocab, Vocabulary::from_term_ids(0, ids(&["bird", "cat", "dog"])));
    }

    #[test]
    fn serialized_vocabulary_loads_back_equal() {
        let vocab = Vocabulary::from_term_ids(3, ids(&["b", "a"]));
        let bytes = serde_cbor::to_vec(&vocab).unwrap();
        let loaded: Vocabulary = serde_cbor::from_slice(&bytes).unwrap();
        assert_eq!(loaded.min_document_count(), 3);
        assert_eq!(loaded.column("a"), Some(0));
    }
}
