use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::IndexError;
use crate::indexer::tfidf::TFIDFEngine;
use crate::repository::Document;

/// Term occurrence counts of a single document.
///
/// Distinct terms keep first-occurrence order.
///
/// # Examples
/// ```
/// use tf_idf_indexer::{DefaultTFIDFEngine, TermFrequency};
///
/// let freq = TermFrequency::from_text("cat dog cat");
/// let tf = freq.tf_vector::<DefaultTFIDFEngine>();
/// assert_eq!(tf, vec![("cat", 1.0), ("dog", 0.75)]);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct TermFrequency {
    #[serde(with = "indexmap::map::serde_seq")]
    term_count: IndexMap<Box<str>, u32>,
    total_term_count: u64,
}

/// Adding terms
impl TermFrequency {
    /// Empty counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count the whitespace-separated tokens of `text`.
    pub fn from_text(text: &str) -> Self {
        let mut freq = Self::new();
        for token in text.split_whitespace() {
            freq.add_term(token);
        }
        freq
    }

    /// Count a document's tokens. A document without tokens has no
    /// most-frequent term, so it is reported as [`IndexError::EmptyDocument`].
    pub fn from_document(document: &Document) -> Result<Self, IndexError> {
        let freq = Self::from_text(&document.processed_text);
        if freq.is_empty() {
            return Err(IndexError::EmptyDocument { document: document.id });
        }
        Ok(freq)
    }

    /// Count one occurrence of `term`.
    #[inline]
    pub fn add_term(&mut self, term: &str) -> &mut Self {
        if let Some(count) = self.term_count.get_mut(term) {
            *count += 1;
        } else {
            self.term_count.insert(term.into(), 1);
        }
        self.total_term_count += 1;
        self
    }

    /// Count every item of `terms`, in order.
    #[inline]
    pub fn add_terms<T>(&mut self, terms: &[T]) -> &mut Self
    where
        T: AsRef<str>,
    {
        for term in terms {
            self.add_term(term.as_ref());
        }
        self
    }
}

/// TF calculation
impl TermFrequency {
    /// Weight of every distinct term, in first-occurrence order.
    /// Empty for a document without terms.
    pub fn tf_vector<E: TFIDFEngine>(&self) -> Vec<(&str, f64)> {
        let max_count = self.most_frequent_term_count();
        self.term_count
            .iter()
            .map(|(term, &count)| (&**term, E::tf(count, max_count)))
            .collect()
    }

    /// Weight of one term, `None` if it does not occur.
    pub fn tf_term<E: TFIDFEngine>(&self, term: &str) -> Option<f64> {
        let count = *self.term_count.get(term)?;
        Some(E::tf(count, self.most_frequent_term_count()))
    }
}

/// Statistics
impl TermFrequency {
    /// Occurrences of `term`, `0` if absent.
    #[inline]
    pub fn term_count(&self, term: &str) -> u32 {
        self.term_count.get(term).copied().unwrap_or(0)
    }

    /// Count of the most frequent term, `0` when empty.
    #[inline]
    pub fn most_frequent_term_count(&self) -> u32 {
        self.term_count.values().copied().max().unwrap_or(0)
    }

    /// Every term tied for the highest count.
    pub fn most_frequent_terms(&self) -> Vec<&str> {
        let max_count = self.most_frequent_term_count();
        self.term_count
            .iter()
            .filter(|&(_, &count)| count == max_count)
            .map(|(term, _)| &**term)
            .collect()
    }

    /// Total tokens counted, duplicates included.
    #[inline]
    pub fn term_sum(&self) -> u64 {
        self.total_term_count
    }

    /// Number of distinct terms.
    #[inline]
    pub fn term_num(&self) -> usize {
        self.term_count.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.term_count.is_empty()
    }

    /// Distinct terms in first-occurrence order.
    pub fn term_set_ref_str(&self) -> Vec<&str> {
        self.term_count.keys().map(|term| &**term).collect()
    }
}
