/// This crate is an incremental TF-IDF indexer that turns a corpus of
/// pre-tokenized articles into a dense feature matrix and a label vector.
pub mod indexer;
pub mod repository;
pub mod config;
pub mod error;

/// Indexer
/// The top-level struct of this crate, driving the whole pipeline:
/// tokens -> per-document TF -> ledger update -> finalize TF-IDF
/// -> select vocabulary -> assemble matrix.
///
/// Each stage is a barrier for the next one. Term counting runs in parallel
/// on a rayon pool, ledger updates are serialized through the repository.
///
/// `Indexer<E>` has one generic parameter:
/// - `E`: TF-IDF calculation engine type (e.g., DefaultTFIDFEngine)
///
/// The indexer holds no corpus state itself; everything is read from and
/// written to a `CorpusRepository` passed to each stage.
pub use indexer::{Indexer, IndexReport};

/// Indexer configuration
/// Threshold, positive label, empty-document policy, retry limit and batch
/// size. Loadable from TOML; every key is optional.
pub use config::IndexerConfig;

/// Term Frequency structure
/// Counts the occurrences of each distinct term in one document.
/// Used as base data for the augmented TF calculation.
pub use indexer::token::TermFrequency;

/// Document Frequency Ledger
/// Owns the rules for creating terms and bumping their document counts.
/// The table itself lives in the repository.
///
/// `observe` is an upsert: it reports whether the term was created or
/// already existed. After a full pass every term's IDF equals
/// `log10(total_documents / document_count)` regardless of document order.
pub use indexer::ledger::{DocumentFrequencyLedger, Observation};

/// TF IDF Calculation Engine Trait
/// A trait that defines the behavior of a TF-IDF calculation engine.
///
/// By implementing this trait, you can plug different weighting strategies
/// into `Indexer<E>`.
/// The default implementation, `DefaultTFIDFEngine`, uses augmented TF
/// (`0.5 + 0.5 * count / max_count`) and base-10 IDF.
pub use indexer::tfidf::{DefaultTFIDFEngine, TFIDFEngine};

/// Vocabulary
/// The sorted set of term identifiers whose document count exceeds a
/// threshold. Fixes the column order of the feature matrix.
pub use indexer::vocabulary::Vocabulary;

/// Feature Matrix and Training Set
/// - `FeatureMatrix`: dense row-major matrix, one row per document
/// - `TrainingSet`: the matrix together with its vocabulary, row document ids
///   and 0/1 labels
///
/// # Serialization
/// `TrainingSet` is stored as CBOR and validated on load.
pub use indexer::matrix::{FeatureMatrix, TrainingSet};

/// Corpus Repository
/// Storage collaborator for documents, terms and document-terms.
/// - `CorpusRepository`: the operations the indexer needs
/// - `Session`: scoped transaction, rolled back unless committed
/// - `MemoryRepository`: in-memory implementation
pub use repository::{
    memory::MemoryRepository, CorpusRepository, Document, DocumentId, DocumentTerm, Session, Term,
    TermId,
};

pub use error::{IndexError, RepositoryError};
