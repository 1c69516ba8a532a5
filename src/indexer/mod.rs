pub mod finalize;
pub mod ledger;
pub mod matrix;
pub mod serde;
pub mod tfidf;
pub mod token;
pub mod vocabulary;

use std::marker::PhantomData;

use ::serde::Serialize;
use num::Float;
use rayon::prelude::*;
use tracing::{debug, error, info, warn};

use crate::config::IndexerConfig;
use crate::error::{IndexError, RepositoryError};
use crate::indexer::{
    ledger::DocumentFrequencyLedger,
    matrix::TrainingSet,
    tfidf::{DefaultTFIDFEngine, TFIDFEngine},
    token::TermFrequency,
    vocabulary::Vocabulary,
};
use crate::repository::{CorpusRepository, Document, DocumentId, Session, TermId};

/// Counters from one ingestion pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndexReport {
    /// Denominator used for every idf in this run.
    pub total_documents: u64,
    pub documents_indexed: usize,
    /// Documents without tokens, skipped for TF.
    pub skipped_empty: Vec<DocumentId>,
    pub terms_created: usize,
    pub terms_updated: usize,
    pub document_terms_created: usize,
    /// Write batches that failed once and were retried.
    pub retries: usize,
}

/// Writes made for one document.
#[derive(Debug, Default)]
struct Written {
    terms_created: usize,
    terms_updated: usize,
    document_terms: usize,
}

/// Failure inside a document's write batch, with the term being written.
type BatchFailure = (Option<TermId>, RepositoryError);

/// Pipeline driver.
///
/// Stages run strictly in order, each a barrier for the next:
/// 1. [`index`](Self::index): per-document TF (parallel per batch) and
///    ledger updates (serial, one session per document)
/// 2. [`finalize`](Self::finalize): tf-idf for every document-term
/// 3. [`select_vocabulary`](Self::select_vocabulary)
/// 4. [`assemble`](Self::assemble): dense matrix and labels
///
/// [`run`](Self::run) does all four.
#[derive(Debug, Clone)]
pub struct Indexer<E = DefaultTFIDFEngine> {
    config: IndexerConfig,
    _marker: PhantomData<E>,
}

impl<E> Indexer<E>
where
    E: TFIDFEngine,
{
    /// Validate `config` and build the driver.
    pub fn new(config: IndexerConfig) -> Result<Self, IndexError> {
        config.validate()?;
        Ok(Self {
            config,
            _marker: PhantomData,
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    /// Run every stage and return the ingestion report and the artifact.
    pub fn run<N, R>(&self, repo: &mut R) -> Result<(IndexReport, TrainingSet<N>), IndexError>
    where
        N: Float,
        R: CorpusRepository + ?Sized,
    {
        let report = self.index(repo)?;
        self.finalize(repo)?;
        let vocabulary = self.select_vocabulary(&*repo)?;
        let training_set = self.assemble(&*repo, &vocabulary)?;
        Ok((report, training_set))
    }

    /// First pass: count terms and update document frequencies.
    ///
    /// Empty documents are logged and skipped. A document whose writes fail
    /// is rolled back and retried up to `retry_limit` times; after that the
    /// whole run aborts.
    pub fn index<R>(&self, repo: &mut R) -> Result<IndexReport, IndexError>
    where
        R: CorpusRepository + ?Sized,
    {
        let documents = repo.list_documents()?;
        let total_documents = self.total_documents(&documents);
        let ledger = DocumentFrequencyLedger::<E>::new(total_documents);
        info!(documents = documents.len(), total_documents, "indexing corpus");

        let mut report = IndexReport {
            total_documents,
            ..IndexReport::default()
        };
        let mut position = 0usize;
        for batch in documents.chunks(self.config.batch_size) {
            // TF is per-document and read-only; only the ledger needs ordering.
            let counted: Vec<Result<TermFrequency, IndexError>> =
                batch.par_iter().map(TermFrequency::from_document).collect();

            for (document, freq) in batch.iter().zip(counted) {
                position += 1;
                let freq = match freq {
                    Ok(freq) => freq,
                    Err(IndexError::EmptyDocument { document: id }) => {
                        warn!(document = %id, "skipping document without tokens");
                        report.skipped_empty.push(id);
                        continue;
                    }
                    Err(e) => return Err(e),
                };
                debug!(
                    position,
                    document = %document.id,
                    terms = freq.term_num(),
                    "processing document"
                );
                self.ingest(repo, &ledger, document, &freq, &mut report)?;
            }
        }

        info!(
            indexed = report.documents_indexed,
            skipped = report.skipped_empty.len(),
            terms_created = report.terms_created,
            document_terms = report.document_terms_created,
            "ingestion finished"
        );
        Ok(report)
    }

    /// Second pass in `batch_size` document batches, see [`finalize::finalize`].
    pub fn finalize<R>(&self, repo: &mut R) -> Result<usize, IndexError>
    where
        R: CorpusRepository + ?Sized,
    {
        finalize::finalize::<E, R>(repo, self.config.batch_size)
    }

    /// Columns: terms seen in more than `min_document_count` documents.
    pub fn select_vocabulary<R>(&self, repo: &R) -> Result<Vocabulary, IndexError>
    where
        R: CorpusRepository + ?Sized,
    {
        Vocabulary::select(repo, self.config.min_document_count)
    }

    /// Dense matrix over every document, labelled by `positive_label`.
    pub fn assemble<N, R>(
        &self,
        repo: &R,
        vocabulary: &Vocabulary,
    ) -> Result<TrainingSet<N>, IndexError>
    where
        N: Float,
        R: CorpusRepository + ?Sized,
    {
        matrix::assemble(repo, vocabulary, &self.config.positive_label)
    }

    fn total_documents(&self, documents: &[Document]) -> u64 {
        if self.config.count_empty_documents {
            documents.len() as u64
        } else {
            documents
                .iter()
                .filter(|document| document.tokens().next().is_some())
                .count() as u64
        }
    }

    fn ingest<R>(
        &self,
        repo: &mut R,
        ledger: &DocumentFrequencyLedger<E>,
        document: &Document,
        freq: &TermFrequency,
        report: &mut IndexReport,
    ) -> Result<(), IndexError>
    where
        R: CorpusRepository + ?Sized,
    {
        let mut attempt = 0;
        loop {
            match Self::write_document(repo, ledger, document.id, freq) {
                Ok(written) => {
                    report.documents_indexed += 1;
                    report.terms_created += written.terms_created;
                    report.terms_updated += written.terms_updated;
                    report.document_terms_created += written.document_terms;
                    return Ok(());
                }
                Err((term, source)) if attempt < self.config.retry_limit => {
                    attempt += 1;
                    report.retries += 1;
                    warn!(
                        document = %document.id,
                        term = term.as_ref().map(TermId::as_str),
                        error = %source,
                        attempt,
                        "document write batch failed, retrying"
                    );
                }
                Err((term, source)) => {
                    error!(
                        document = %document.id,
                        term = term.as_ref().map(TermId::as_str),
                        error = %source,
                        "document write batch failed, aborting run"
                    );
                    return Err(IndexError::Repository {
                        document: Some(document.id),
                        term,
                        source,
                    });
                }
            }
        }
    }

    /// All writes for one document in one session; dropped on failure.
    fn write_document<R>(
        repo: &mut R,
        ledger: &DocumentFrequencyLedger<E>,
        document_id: DocumentId,
        freq: &TermFrequency,
    ) -> Result<Written, BatchFailure>
    where
        R: CorpusRepository + ?Sized,
    {
        let mut session = Session::open(repo).map_err(|source| (None, source))?;
        let mut written = Written::default();
        for (text, tf) in freq.tf_vector::<E>() {
            let at_term = |source: RepositoryError| (Some(TermId::from(text)), source);
            let observation = ledger.observe(&mut *session, text).map_err(at_term)?;
            if observation.is_created() {
                written.terms_created += 1;
            } else {
                written.terms_updated += 1;
            }
            session
                .create_document_term(document_id, &observation.term().id, tf)
                .map_err(at_term)?;
            written.document_terms += 1;
        }
        session.commit().map_err(|source| (None, source))?;
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::memory::MemoryRepository;

    fn corpus() -> MemoryRepository {
        MemoryRepository::with_documents([
            Document::new(1, "cat dog cat", "siteA"),
            Document::new(2, "dog bird", "siteB"),
            Document::new(3, "cat cat cat bird", "siteA"),
        ])
        .unwrap()
    }

    fn indexer(config: IndexerConfig) -> Indexer {
        Indexer::new(config).unwrap()
    }

    #[test]
    fn index_reports_counts() {
        let mut repo = corpus();
        let report = indexer(IndexerConfig::default()).index(&mut repo).unwrap();
        assert_eq!(report.total_documents, 3);
        assert_eq!(report.documents_indexed, 3);
        assert_eq!(report.terms_created, 3);
        assert_eq!(report.terms_updated, 3);
        assert_eq!(report.document_terms_created, 6);
        assert_eq!(report.retries, 0);
        assert!(report.skipped_empty.is_empty());
        assert_eq!(repo.term("cat").unwrap().document_count, 2);
        let bird = repo.document_term(DocumentId(3), "bird").unwrap();
        assert!((bird.term_frequency - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(bird.tf_idf, None);
    }

    #[test]
    fn small_batches_give_the_same_ledger() {
        let mut one = corpus();
        let mut many = corpus();
        indexer(IndexerConfig { batch_size: 1, ..IndexerConfig::default() })
            .index(&mut one)
            .unwrap();
        indexer(IndexerConfig::default()).index(&mut many).unwrap();
        assert_eq!(one.list_document_terms().unwrap(), many.list_document_terms().unwrap());
    }

    #[test]
    fn empty_documents_count_toward_total_by_default() {
        let mut repo = corpus();
        repo.add_document(Document::new(4, "   ", "siteB")).unwrap();
        let report = indexer(IndexerConfig::default()).index(&mut repo).unwrap();
        assert_eq!(report.total_documents, 4);
        assert_eq!(report.skipped_empty, vec![DocumentId(4)]);
        assert_eq!(report.documents_indexed, 3);
        let idf = repo.term("cat").unwrap().inverse_document_frequency;
        assert!((idf - 2f64.log10()).abs() < 1e-12);
    }

    #[test]
    fn empty_documents_can_be_excluded_from_total() {
        let mut repo = corpus();
        repo.add_document(Document::new(4, "", "siteB")).unwrap();
        let config = IndexerConfig {
            count_empty_documents: false,
            ..IndexerConfig::default()
        };
        let report = indexer(config).index(&mut repo).unwrap();
        assert_eq!(report.total_documents, 3);
        let idf = repo.term("cat").unwrap().inverse_document_frequency;
        assert!((idf - 1.5f64.log10()).abs() < 1e-12);
    }

    #[test]
    fn failed_document_is_rolled_back_and_retried_once() {
        let mut repo = corpus();
        // Document 1 writes 4 records; the 6th write falls inside document 2.
        repo.fail_writes(5, 1);
        let report = indexer(IndexerConfig::default()).index(&mut repo).unwrap();
        assert_eq!(report.retries, 1);
        assert_eq!(report.documents_indexed, 3);
        assert_eq!(repo.term("dog").unwrap().document_count, 2);
        assert_eq!(repo.term("bird").unwrap().document_count, 2);
        assert_eq!(repo.document_term_num(), 6);
    }

    #[test]
    fn persistent_failure_aborts_with_context() {
        let mut repo = corpus();
        repo.fail_writes(4, 2);
        let err = indexer(IndexerConfig::default()).index(&mut repo).unwrap_err();
        match err {
            IndexError::Repository { document, term, source } => {
                assert_eq!(document, Some(DocumentId(2)));
                assert_eq!(term.as_ref().map(TermId::as_str), Some("dog"));
                assert!(matches!(source, RepositoryError::Unavailable(_)));
            }
            other => panic!("unexpected {other:?}"),
        }
        // Document 1 stays committed, nothing of document 2 is left behind.
        assert_eq!(repo.term("dog").unwrap().document_count, 1);
        assert!(repo.term("bird").is_none());
        assert_eq!(repo.document_term_num(), 2);
    }

    #[test]
    fn retry_limit_zero_aborts_on_first_failure() {
        let mut repo = corpus();
        repo.fail_writes(0, 1);
        let config = IndexerConfig {
            retry_limit: 0,
            ..IndexerConfig::default()
        };
        assert!(indexer(config).index(&mut repo).is_err());
        assert_eq!(repo.term_num(), 0);
    }

    #[test]
    fn run_produces_matrix_over_all_documents() {
        let mut repo = corpus();
        let config = IndexerConfig {
            min_document_count: 0,
            positive_label: "siteA".into(),
            ..IndexerConfig::default()
        };
        let (report, set) = indexer(config).run::<f64, _>(&mut repo).unwrap();
        assert_eq!(report.documents_indexed, 3);
        assert_eq!(set.features.shape(), (3, 3));
        assert_eq!(set.vocabulary, vec!["bird", "cat", "dog"]);
        assert_eq!(set.labels, vec![1, 0, 1]);
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let config = IndexerConfig {
            batch_size: 0,
            ..IndexerConfig::default()
        };
        assert!(matches!(Indexer::<DefaultTFIDFEngine>::new(config), Err(IndexError::Config(_))));
    }
}
