use num::Float;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::IndexError;
use crate::indexer::vocabulary::Vocabulary;
use crate::repository::{CorpusRepository, DocumentId};

/// Dense row-major matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix<N> {
    rows: usize,
    cols: usize,
    data: Vec<N>,
}

impl<N> FeatureMatrix<N>
where
    N: Float,
{
    /// All-zero matrix of the given shape.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![N::zero(); rows * cols],
        }
    }
}

impl<N> FeatureMatrix<N> {
    /// Number of rows (documents).
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns (vocabulary terms).
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Cell at `(row, col)`, `None` when out of range.
    pub fn get(&self, row: usize, col: usize) -> Option<&N> {
        if row < self.rows && col < self.cols {
            self.data.get(row.checked_mul(self.cols)?.checked_add(col)?)
        } else {
            None
        }
    }

    /// One row, `None` when out of range or the storage is short.
    pub fn row(&self, row: usize) -> Option<&[N]> {
        if row >= self.rows {
            return None;
        }
        let start = row.checked_mul(self.cols)?;
        self.data.get(start..start.checked_add(self.cols)?)
    }

    /// Rows in order. Stops early if the storage holds fewer cells than
    /// the shape claims.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[N]> {
        (0..self.rows).map_while(move |row| self.row(row))
    }

    /// Row-major cells.
    pub fn as_slice(&self) -> &[N] {
        &self.data
    }

    fn set(&mut self, row: usize, col: usize, value: N) {
        self.data[row * self.cols + col] = value;
    }
}

/// Feature matrix plus aligned labels, the artifact handed to training.
///
/// Row `i` of `features`, `documents[i]` and `labels[i]` describe the same
/// document; column `j` is `vocabulary[j]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSet<N> {
    /// Column term texts.
    pub vocabulary: Vec<String>,
    /// Row document ids.
    pub documents: Vec<DocumentId>,
    pub features: FeatureMatrix<N>,
    /// `1` for the positive class, else `0`.
    pub labels: Vec<u8>,
}

impl<N> TrainingSet<N> {
    /// Number of rows labelled `1`.
    pub fn positive_num(&self) -> usize {
        self.labels.iter().filter(|&&label| label == 1).count()
    }
}

/// Build the dense matrix over every document in repository order.
///
/// The vocabulary must describe the repository's current terms above its
/// threshold, and the finalizer must already have run.
pub fn assemble<N, R>(
    repo: &R,
    vocabulary: &Vocabulary,
    positive_label: &str,
) -> Result<TrainingSet<N>, IndexError>
where
    N: Float,
    R: CorpusRepository + ?Sized,
{
    let current = repo.list_term_ids_with_document_count_above(vocabulary.min_document_count())?;
    if !vocabulary.matches(&current) {
        return Err(IndexError::InconsistentVocabulary {
            reason: format!(
                "vocabulary has {} terms but the repository has {} above {}",
                vocabulary.len(),
                current.len(),
                vocabulary.min_document_count()
            ),
        });
    }

    let documents = repo.list_documents()?;
    let mut features = FeatureMatrix::zeros(documents.len(), vocabulary.len());
    let mut labels = Vec::with_capacity(documents.len());

    for (row, document) in documents.iter().enumerate() {
        for document_term in repo.list_document_terms_for_document(document.id, &current)? {
            let col = vocabulary.column(document_term.term_id.as_str()).ok_or_else(|| {
                IndexError::InconsistentVocabulary {
                    reason: format!(
                        "term {:?} of document {} has no column",
                        document_term.term_id.as_str(),
                        document.id
                    ),
                }
            })?;
            let tf_idf = document_term.tf_idf.ok_or_else(|| IndexError::NotFinalized {
                document: document.id,
                term: document_term.term_id.clone(),
            })?;
            let value = num::cast::<f64, N>(tf_idf)
                .filter(|value| value.is_finite())
                .ok_or_else(|| IndexError::Unrepresentable {
                    document: document.id,
                    term: document_term.term_id.clone(),
                    value: tf_idf,
                })?;
            features.set(row, col, value);
        }
        labels.push(u8::from(document.source == positive_label));
    }

    info!(
        rows = features.rows(),
        cols = features.cols(),
        positive = labels.iter().filter(|&&label| label == 1).count(),
        "assembled feature matrix"
    );

    Ok(TrainingSet {
        vocabulary: vocabulary.terms().map(|term| term.as_str().to_string()).collect(),
        documents: documents.iter().map(|document| document.id).collect(),
        features,
        labels,
    })
}
