use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::DomainError;

/// A file the visitor has selected but not yet submitted. Owned exclusively by
/// the workflow that collected it and discarded when that workflow closes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StagedFile {
    pub name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("file `{name}` produced an empty payload")]
    EmptyPayload { name: String },
}

/// Transport-safe encoded payload: base64 data plus the declared media type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedDocument {
    pub data: String,
    pub media_type: String,
}

impl StagedFile {
    pub fn new(
        name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self { name: name.into(), media_type: media_type.into(), bytes }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn encode(&self) -> Result<EncodedDocument, EncodeError> {
        if self.bytes.is_empty() {
            return Err(EncodeError::EmptyPayload { name: self.name.clone() });
        }
        Ok(EncodedDocument {
            data: BASE64.encode(&self.bytes),
            media_type: self.media_type.clone(),
        })
    }
}

/// Encode a batch with all-or-nothing semantics: the first failure discards
/// every encoded payload and fails the whole batch.
pub fn encode_all(files: &[StagedFile]) -> Result<Vec<EncodedDocument>, EncodeError> {
    files.iter().map(StagedFile::encode).collect()
}

/// Ordered, visitor-curated list of staged files. Selection appends, removal is
/// positional and shifts later entries down.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileList {
    files: Vec<StagedFile>,
}

impl FileList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_files(&mut self, selection: impl IntoIterator<Item = StagedFile>) {
        self.files.extend(selection);
    }

    pub fn remove(&mut self, index: usize) -> Result<StagedFile, DomainError> {
        if index >= self.files.len() {
            return Err(DomainError::StagedFileIndex { index, len: self.files.len() });
        }
        Ok(self.files.remove(index))
    }

    pub fn files(&self) -> &[StagedFile] {
        &self.files
    }

    pub fn names(&self) -> Vec<&str> {
        self.files.iter().map(|file| file.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }
}
