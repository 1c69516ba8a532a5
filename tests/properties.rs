//! Property-based tests for the indexing pipeline.
//!
//! Uses proptest over small random corpora drawn from a tiny alphabet so
//! that terms are shared between documents.

use std::collections::BTreeMap;

use proptest::prelude::*;
use tf_idf_indexer::{
    CorpusRepository, DefaultTFIDFEngine, Document, DocumentFrequencyLedger, Indexer, IndexerConfig,
    MemoryRepository, TFIDFEngine, TermFrequency,
};

const ALPHABET: &[&str] = &["ant", "bee", "cat", "dog", "eel", "fox"];

fn text() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(ALPHABET), 0..12).prop_map(|tokens| tokens.join(" "))
}

fn corpus() -> impl Strategy<Value = Vec<Document>> {
    prop::collection::vec(text(), 1..12).prop_map(|texts| {
        texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| {
                let source = if i % 2 == 0 { "huffpo" } else { "fox" };
                Document::new(i as u64, text, source)
            })
            .collect()
    })
}

fn select_all() -> IndexerConfig {
    IndexerConfig {
        min_document_count: 0,
        batch_size: 3,
        ..IndexerConfig::default()
    }
}

/// Index and finalize, then snapshot terms and tf-idf cells keyed by id.
#[allow(clippy::type_complexity)]
fn indexed_state(
    documents: Vec<Document>,
) -> (BTreeMap<String, (u64, f64)>, BTreeMap<(u64, String), (f64, Option<f64>)>) {
    let mut repo = MemoryRepository::with_documents(documents).unwrap();
    let indexer: Indexer = Indexer::new(select_all()).unwrap();
    indexer.index(&mut repo).unwrap();
    indexer.finalize(&mut repo).unwrap();

    let mut terms = BTreeMap::new();
    let mut cells = BTreeMap::new();
    for (term, dt) in repo.list_document_terms().unwrap() {
        terms.insert(
            term.text().to_string(),
            (term.document_count, term.inverse_document_frequency),
        );
        cells.insert(
            (dt.document_id.0, term.text().to_string()),
            (dt.term_frequency, dt.tf_idf),
        );
    }
    (terms, cells)
}

// =============================================================================
// Order Independence
// =============================================================================

proptest! {
    /// Any ingestion order yields the same counts, idf and tf-idf values.
    #[test]
    fn prop_ingestion_order_does_not_matter(
        (documents, shuffled) in corpus().prop_flat_map(|docs| {
            let original = docs.clone();
            (Just(original), Just(docs).prop_shuffle())
        })
    ) {
        let baseline = indexed_state(documents);
        let permuted = indexed_state(shuffled);
        prop_assert_eq!(baseline, permuted);
    }

    /// Matrix rows follow document order, but each document's row is the same.
    #[test]
    fn prop_matrix_rows_are_order_independent(
        (documents, shuffled) in corpus().prop_flat_map(|docs| {
            let original = docs.clone();
            (Just(original), Just(docs).prop_shuffle())
        })
    ) {
        let indexer: Indexer = Indexer::new(select_all()).unwrap();
        let mut first = MemoryRepository::with_documents(documents).unwrap();
        let mut second = MemoryRepository::with_documents(shuffled).unwrap();
        let (_, a) = indexer.run::<f64, _>(&mut first).unwrap();
        let (_, b) = indexer.run::<f64, _>(&mut second).unwrap();

        prop_assert_eq!(&a.vocabulary, &b.vocabulary);
        for (row, id) in a.documents.iter().enumerate() {
            let other = b.documents.iter().position(|d| d == id).unwrap();
            prop_assert_eq!(a.features.row(row), b.features.row(other));
            prop_assert_eq!(a.labels[row], b.labels[other]);
        }
    }
}

// =============================================================================
// TF and IDF Properties
// =============================================================================

proptest! {
    /// Augmented tf lies in (0.5, 1.0] and exactly the modal terms reach 1.0.
    #[test]
    fn prop_tf_bounded_and_modal_terms_reach_one(
        tokens in prop::collection::vec(prop::sample::select(ALPHABET), 1..40)
    ) {
        let mut freq = TermFrequency::new();
        freq.add_terms(&tokens);
        let modal = freq.most_frequent_terms();
        prop_assert!(!modal.is_empty());
        for (term, tf) in freq.tf_vector::<DefaultTFIDFEngine>() {
            prop_assert!(tf > 0.5 && tf <= 1.0, "tf {} for {}", tf, term);
            prop_assert_eq!(tf == 1.0, modal.contains(&term), "term {}", term);
        }
    }

    /// Raising a term's document count never raises its idf.
    #[test]
    fn prop_idf_monotone_in_document_count(
        (total, low, high) in (1u64..5_000).prop_flat_map(|total| {
            (Just(total), 1..=total)
                .prop_flat_map(|(total, low)| (Just(total), Just(low), low..=total))
        })
    ) {
        let ledger = DocumentFrequencyLedger::<DefaultTFIDFEngine>::new(total);
        prop_assert!(ledger.idf(high) <= ledger.idf(low));
        prop_assert!(DefaultTFIDFEngine::idf(total, total) == 0.0);
    }
}

// =============================================================================
// Vocabulary, Matrix and Finalizer Properties
// =============================================================================

proptest! {
    /// Selected terms are exactly those with document_count > threshold.
    #[test]
    fn prop_vocabulary_filter_is_exact(documents in corpus(), threshold in 0u64..6) {
        let mut repo = MemoryRepository::with_documents(documents).unwrap();
        let indexer: Indexer = Indexer::new(IndexerConfig {
            min_document_count: threshold,
            ..select_all()
        }).unwrap();
        indexer.index(&mut repo).unwrap();
        let vocabulary = indexer.select_vocabulary(&repo).unwrap();

        for id in repo.list_term_ids_with_document_count_above(0).unwrap() {
            let count = repo.term(id.as_str()).unwrap().document_count;
            prop_assert_eq!(vocabulary.column(id.as_str()).is_some(), count > threshold);
        }
        let columns: Vec<_> = vocabulary.terms().cloned().collect();
        let mut sorted = columns.clone();
        sorted.sort();
        prop_assert_eq!(columns, sorted);
    }

    /// One row per document, one column per vocabulary term, one label per row.
    #[test]
    fn prop_matrix_shape(documents in corpus(), threshold in 0u64..4) {
        let document_num = documents.len();
        let mut repo = MemoryRepository::with_documents(documents).unwrap();
        let indexer: Indexer = Indexer::new(IndexerConfig {
            min_document_count: threshold,
            ..select_all()
        }).unwrap();
        let (_, set) = indexer.run::<f32, _>(&mut repo).unwrap();

        prop_assert_eq!(set.features.rows(), document_num);
        prop_assert_eq!(set.features.cols(), set.vocabulary.len());
        prop_assert_eq!(set.labels.len(), document_num);
        prop_assert!(set.labels.iter().all(|&label| label <= 1));
        prop_assert!(set.validate().is_ok());
    }

    /// A second finalizer pass leaves every tf-idf unchanged.
    #[test]
    fn prop_finalize_is_idempotent(documents in corpus()) {
        let mut repo = MemoryRepository::with_documents(documents).unwrap();
        let indexer: Indexer = Indexer::new(select_all()).unwrap();
        indexer.index(&mut repo).unwrap();
        indexer.finalize(&mut repo).unwrap();
        let once = repo.list_document_terms().unwrap();
        indexer.finalize(&mut repo).unwrap();
        prop_assert_eq!(once, repo.list_document_terms().unwrap());
    }
}
