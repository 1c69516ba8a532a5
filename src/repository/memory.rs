use std::collections::BTreeSet;

use indexmap::IndexMap;

use crate::error::RepositoryError;
use crate::repository::{CorpusRepository, Document, DocumentId, DocumentTerm, Term, TermId};

/// Undo record for one write inside an open transaction.
#[derive(Debug)]
enum Undo {
    TermCreated(TermId),
    TermUpdated(Term),
    DocumentTermCreated(DocumentId, TermId),
    DocumentTermUpdated(DocumentTerm),
}

/// In-memory corpus repository.
///
/// Documents keep insertion order. Terms are keyed by text and
/// document-terms are grouped per document, at most one per term.
/// Transactions keep an undo journal instead of copying the store.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    documents: IndexMap<DocumentId, Document>,
    terms: IndexMap<TermId, Term>,
    document_terms: IndexMap<DocumentId, IndexMap<TermId, DocumentTerm>>,
    journal: Option<Vec<Undo>>,
    #[cfg(test)]
    fault: Option<Fault>,
}

/// Injected write failures: let `skip` writes through, then fail `remaining`.
#[cfg(test)]
#[derive(Debug)]
struct Fault {
    skip: usize,
    remaining: usize,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a repository holding `documents` in the given order.
    pub fn with_documents<I>(documents: I) -> Result<Self, RepositoryError>
    where
        I: IntoIterator<Item = Document>,
    {
        let mut repo = Self::new();
        for doc in documents {
            repo.add_document(doc)?;
        }
        Ok(repo)
    }

    /// Ingestion-side insert. Document ids must be unique.
    pub fn add_document(&mut self, document: Document) -> Result<(), RepositoryError> {
        if self.documents.contains_key(&document.id) {
            return Err(RepositoryError::Constraint(format!(
                "document {} already exists",
                document.id
            )));
        }
        self.documents.insert(document.id, document);
        Ok(())
    }

    /// Stored term by text.
    pub fn term(&self, text: &str) -> Option<&Term> {
        self.terms.get(text)
    }

    /// Stored record for `text` in one document.
    pub fn document_term(&self, document_id: DocumentId, text: &str) -> Option<&DocumentTerm> {
        self.document_terms.get(&document_id)?.get(text)
    }

    pub fn term_num(&self) -> usize {
        self.terms.len()
    }

    pub fn document_term_num(&self) -> usize {
        self.document_terms.values().map(IndexMap::len).sum()
    }

    /// Make writes fail: after `skip` successful writes, the next `count` fail.
    #[cfg(test)]
    pub(crate) fn fail_writes(&mut self, skip: usize, count: usize) {
        self.fault = Some(Fault { skip, remaining: count });
    }

    #[cfg(test)]
    fn check_write(&mut self, op: &str) -> Result<(), RepositoryError> {
        if let Some(fault) = self.fault.as_mut() {
            if fault.skip > 0 {
                fault.skip -= 1;
            } else if fault.remaining > 0 {
                fault.remaining -= 1;
                return Err(RepositoryError::Unavailable(format!("injected failure in {op}")));
            }
        }
        Ok(())
    }

    #[cfg(not(test))]
    #[inline]
    fn check_write(&mut self, _op: &str) -> Result<(), RepositoryError> {
        Ok(())
    }

    fn record(&mut self, undo: Undo) {
        if let Some(journal) = self.journal.as_mut() {
            journal.push(undo);
        }
    }
}

impl CorpusRepository for MemoryRepository {
    fn list_documents(&self) -> Result<Vec<Document>, RepositoryError> {
        Ok(self.documents.values().cloned().collect())
    }

    fn find_term_by_text(&self, text: &str) -> Result<Option<Term>, RepositoryError> {
        Ok(self.terms.get(text).cloned())
    }

    fn create_term(
        &mut self,
        text: &str,
        document_count: u64,
        inverse_document_frequency: f64,
    ) -> Result<Term, RepositoryError> {
        self.check_write("create_term")?;
        if self.terms.contains_key(text) {
            return Err(RepositoryError::Constraint(format!("term {text:?} already exists")));
        }
        let term = Term {
            id: TermId::from(text),
            document_count,
            inverse_document_frequency,
        };
        self.terms.insert(term.id.clone(), term.clone());
        self.record(Undo::TermCreated(term.id.clone()));
        Ok(term)
    }

    fn update_term(&mut self, term: &Term) -> Result<(), RepositoryError> {
        self.check_write("update_term")?;
        let slot = self
            .terms
            .get_mut(&term.id)
            .ok_or_else(|| RepositoryError::NotFound(format!("term {:?}", term.text())))?;
        let previous = std::mem::replace(slot, term.clone());
        self.record(Undo::TermUpdated(previous));
        Ok(())
    }

    fn create_document_term(
        &mut self,
        document_id: DocumentId,
        term_id: &TermId,
        term_frequency: f64,
    ) -> Result<DocumentTerm, RepositoryError> {
        self.check_write("create_document_term")?;
        if !self.documents.contains_key(&document_id) {
            return Err(RepositoryError::NotFound(format!("document {document_id}")));
        }
        if !self.terms.contains_key(term_id) {
            return Err(RepositoryError::NotFound(format!("term {:?}", term_id.as_str())));
        }
        let row = self.document_terms.entry(document_id).or_default();
        if row.contains_key(term_id) {
            return Err(RepositoryError::Constraint(format!(
                "document {document_id} already has term {:?}",
                term_id.as_str()
            )));
        }
        let document_term = DocumentTerm {
            document_id,
            term_id: term_id.clone(),
            term_frequency,
            tf_idf: None,
        };
        row.insert(term_id.clone(), document_term.clone());
        self.record(Undo::DocumentTermCreated(document_id, term_id.clone()));
        Ok(document_term)
    }

    fn list_document_terms(&self) -> Result<Vec<(Term, DocumentTerm)>, RepositoryError> {
        self.document_terms
            .values()
            .flat_map(IndexMap::values)
            .map(|dt| {
                let term = self.terms.get(&dt.term_id).ok_or_else(|| {
                    RepositoryError::NotFound(format!("term {:?}", dt.term_id.as_str()))
                })?;
                Ok((term.clone(), dt.clone()))
            })
            .collect()
    }

    fn update_document_term(
        &mut self,
        document_term: &DocumentTerm,
    ) -> Result<(), RepositoryError> {
        self.check_write("update_document_term")?;
        let slot = self
            .document_terms
            .get_mut(&document_term.document_id)
            .and_then(|row| row.get_mut(&document_term.term_id))
            .ok_or_else(|| {
                RepositoryError::NotFound(format!(
                    "document {} term {:?}",
                    document_term.document_id,
                    document_term.term_id.as_str()
                ))
            })?;
        let previous = std::mem::replace(slot, document_term.clone());
        self.record(Undo::DocumentTermUpdated(previous));
        Ok(())
    }

    fn list_term_ids_with_document_count_above(
        &self,
        threshold: u64,
    ) -> Result<BTreeSet<TermId>, RepositoryError> {
        Ok(self
            .terms
            .values()
            .filter(|term| term.document_count > threshold)
            .map(|term| term.id.clone())
            .collect())
    }

    fn list_document_terms_for_document(
        &self,
        document_id: DocumentId,
        term_ids: &BTreeSet<TermId>,
    ) -> Result<Vec<DocumentTerm>, RepositoryError> {
        Ok(self
            .document_terms
            .get(&document_id)
            .map(|row| {
                row.values()
                    .filter(|dt| term_ids.contains(&dt.term_id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn begin(&mut self) -> Result<(), RepositoryError> {
        if self.journal.is_some() {
            return Err(RepositoryError::Constraint("transaction already open".into()));
        }
        self.journal = Some(Vec::new());
        Ok(())
    }

    fn commit(&mut self) -> Result<(), RepositoryError> {
        match self.journal.take() {
            Some(_) => Ok(()),
            None => Err(RepositoryError::Constraint("no open transaction".into())),
        }
    }

    fn rollback(&mut self) {
        let Some(journal) = self.journal.take() else {
            return;
        };
        for undo in journal.into_iter().rev() {
            match undo {
                Undo::TermCreated(id) => {
                    self.terms.shift_remove(&id);
                }
                Undo::TermUpdated(term) => {
                    if let Some(slot) = self.terms.get_mut(&term.id) {
                        *slot = term;
                    }
                }
                Undo::DocumentTermCreated(document_id, term_id) => {
                    if let Some(row) = self.document_terms.get_mut(&document_id) {
                        row.shift_remove(&term_id);
                        if row.is_empty() {
                            self.document_terms.shift_remove(&document_id);
                        }
                    }
                }
                Undo::DocumentTermUpdated(dt) => {
                    if let Some(slot) = self
                        .document_terms
                        .get_mut(&dt.document_id)
                        .and_then(|row| row.get_mut(&dt.term_id))
                    {
                        *slot = dt;
                    }
                }
            }
        }
    }
}
