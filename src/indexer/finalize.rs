use std::collections::HashMap;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::IndexError;
use crate::indexer::tfidf::TFIDFEngine;
use crate::repository::{CorpusRepository, DocumentId, DocumentTerm, Session, TermId};

/// Second pass: `tf_idf = E::tf_idf(term_frequency, idf)` for every
/// document-term.
///
/// Must run after every document went through the ledger. Documents are
/// finalized `batch_size` at a time, one session per batch, so only the
/// idf table and one batch of records are held at once. A failed batch is
/// rolled back while earlier batches stay committed; reading only stored
/// values makes a rerun idempotent. Returns the number of records updated.
pub fn finalize<E, R>(repo: &mut R, batch_size: usize) -> Result<usize, IndexError>
where
    E: TFIDFEngine,
    R: CorpusRepository + ?Sized,
{
    let term_ids = repo.list_term_ids_with_document_count_above(0)?;
    let mut idf: HashMap<TermId, f64> = HashMap::with_capacity(term_ids.len());
    for id in &term_ids {
        let term = repo
            .find_term_by_text(id.as_str())
            .map_err(|source| IndexError::Repository {
                document: None,
                term: Some(id.clone()),
                source,
            })?
            .ok_or_else(|| IndexError::InconsistentVocabulary {
                reason: format!("term {:?} was listed but cannot be found", id.as_str()),
            })?;
        idf.insert(term.id, term.inverse_document_frequency);
    }

    let documents: Vec<DocumentId> = repo.list_documents()?.iter().map(|d| d.id).collect();
    let mut updated = 0usize;
    for batch in documents.chunks(batch_size.max(1)) {
        let mut pending: Vec<DocumentTerm> = Vec::new();
        for &document in batch {
            let document_terms = repo
                .list_document_terms_for_document(document, &term_ids)
                .map_err(|source| IndexError::Repository {
                    document: Some(document),
                    term: None,
                    source,
                })?;
            pending.extend(document_terms);
        }
        pending.par_iter_mut().for_each(|document_term| {
            // every listed record belongs to a term in `term_ids`
            let idf = idf.get(&document_term.term_id).copied().unwrap_or_default();
            document_term.tf_idf = Some(E::tf_idf(document_term.term_frequency, idf));
        });

        let mut session = Session::open(repo)?;
        for document_term in &pending {
            session
                .update_document_term(document_term)
                .map_err(|source| IndexError::Repository {
                    document: Some(document_term.document_id),
                    term: Some(document_term.term_id.clone()),
                    source,
                })?;
        }
        session.commit()?;
        debug!(documents = batch.len(), document_terms = pending.len(), "finalized batch");
        updated += pending.len();
    }

    info!(document_terms = updated, "finalized tf-idf");
    Ok(updated)
}
