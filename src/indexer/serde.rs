use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use num::Float;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::IndexError;
use crate::indexer::matrix::TrainingSet;

/// CBOR persistence for the training artifact.
///
/// Everything read back goes through [`TrainingSet::validate`], so a
/// loaded set is always rectangular with aligned labels.
impl<N> TrainingSet<N>
where
    N: Float + Serialize + DeserializeOwned,
{
    /// Encode as CBOR into `writer`.
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<(), IndexError> {
        serde_cbor::to_writer(writer, self)?;
        Ok(())
    }

    /// Decode CBOR from `reader` and validate.
    pub fn from_reader<Rd: Read>(reader: Rd) -> Result<Self, IndexError> {
        let set: Self = serde_cbor::from_reader(reader)?;
        set.validate()?;
        Ok(set)
    }

    /// Encode as CBOR bytes.
    pub fn to_vec(&self) -> Result<Vec<u8>, IndexError> {
        Ok(serde_cbor::to_vec(self)?)
    }

    /// Decode CBOR bytes and validate.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, IndexError> {
        let set: Self = serde_cbor::from_slice(bytes)?;
        set.validate()?;
        Ok(set)
    }

    /// Write to a file, replacing it.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), IndexError> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.to_writer(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Read a file written by [`TrainingSet::save`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, IndexError> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }
}

impl<N> TrainingSet<N> {
    /// Check that the parts agree on the matrix shape.
    pub fn validate(&self) -> Result<(), IndexError> {
        let (rows, cols) = self.features.shape();
        let cells = rows.checked_mul(cols).ok_or_else(|| {
            IndexError::ArtifactShape(format!("a {rows}x{cols} matrix overflows usize"))
        })?;
        if self.features.as_slice().len() != cells {
            return Err(IndexError::ArtifactShape(format!(
                "{} cells for a {rows}x{cols} matrix",
                self.features.as_slice().len()
            )));
        }
        if self.vocabulary.len() != cols {
            return Err(IndexError::ArtifactShape(format!(
                "{} vocabulary terms for {cols} columns",
                self.vocabulary.len()
            )));
        }
        if self.documents.len() != rows || self.labels.len() != rows {
            return Err(IndexError::ArtifactShape(format!(
                "{} documents and {} labels for {rows} rows",
                self.documents.len(),
                self.labels.len()
            )));
        }
        if let Some(bad) = self.labels.iter().find(|&&label| label > 1) {
            return Err(IndexError::ArtifactShape(format!("label {bad} is not 0 or 1")));
        }
        Ok(())
    }
}
