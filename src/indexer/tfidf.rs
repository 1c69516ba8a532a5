/// TF-IDF weighting scheme.
///
/// The counter, the ledger and the finalizer all take the engine as a type
/// parameter, so one implementation fixes the formulas for a whole run.
pub trait TFIDFEngine {
    /// Per-document weight of a term seen `count` times, where the document's
    /// most frequent term is seen `max_count` times.
    fn tf(count: u32, max_count: u32) -> f64;

    /// Corpus weight of a term found in `document_count` of `total_documents`.
    fn idf(total_documents: u64, document_count: u64) -> f64;

    /// Final feature weight.
    #[inline]
    fn tf_idf(tf: f64, idf: f64) -> f64 {
        tf * idf
    }
}

/// Augmented term frequency with base-10 inverse document frequency.
///
/// - `tf = a + a * count / max_count` with `a = 0.5`, so tf lies in `(0.5, 1.0]`
///   and the document's most frequent term always scores `1.0`
/// - `idf = log10(total_documents / document_count)`
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTFIDFEngine;

impl DefaultTFIDFEngine {
    /// Augmentation constant `a`.
    pub const AUGMENT: f64 = 0.5;
}

impl TFIDFEngine for DefaultTFIDFEngine {
    #[inline]
    fn tf(count: u32, max_count: u32) -> f64 {
        Self::AUGMENT + Self::AUGMENT * (count as f64 / max_count as f64)
    }

    #[inline]
    fn idf(total_documents: u64, document_count: u64) -> f64 {
        (total_documents as f64 / document_count as f64).log10()
    }
}
