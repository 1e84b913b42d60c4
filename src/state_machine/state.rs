//! Upload state types

use crate::backend::PdfUpload;
use std::path::{Path, PathBuf};

pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// Where a file choice came from. Validation is identical for both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSource {
    Picker,
    Drop,
}

/// A file the user pointed at, before validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    pub path: PathBuf,
    pub name: String,
    /// Media type guessed from the file name
    pub media_type: Option<String>,
}

impl FileCandidate {
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        let media_type = mime_guess::from_path(path)
            .first()
            .map(|m| m.essence_str().to_string());

        Self {
            path: path.to_path_buf(),
            name,
            media_type,
        }
    }

    pub fn is_pdf(&self) -> bool {
        self.media_type.as_deref() == Some(PDF_MEDIA_TYPE)
    }
}

/// A validated PDF selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub path: PathBuf,
    pub name: String,
}

impl SelectedFile {
    pub fn to_upload(&self) -> PdfUpload {
        PdfUpload {
            path: self.path.clone(),
            name: self.name.clone(),
        }
    }
}

impl From<FileCandidate> for SelectedFile {
    fn from(candidate: FileCandidate) -> Self {
        Self {
            path: candidate.path,
            name: candidate.name,
        }
    }
}

/// Upload state. Transient, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UploadState {
    /// Nothing selected
    #[default]
    Idle,

    /// A PDF is selected and waiting for the user to upload it
    FileSelected { file: SelectedFile },

    /// Bytes are on the wire
    Transmitting { file: SelectedFile, progress: u8 },

    /// The backend accepted the file and is indexing it
    ServerProcessing {
        file: SelectedFile,
        /// Set when the backend reports completion asynchronously
        job_id: Option<String>,
    },
}

impl UploadState {
    /// An upload attempt is in flight
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            UploadState::Transmitting { .. } | UploadState::ServerProcessing { .. }
        )
    }

    /// Progress bar value: transfer percentage, then full while processing
    pub fn progress(&self) -> Option<u8> {
        match self {
            UploadState::Transmitting { progress, .. } => Some(*progress),
            UploadState::ServerProcessing { .. } => Some(100),
            _ => None,
        }
    }
}
