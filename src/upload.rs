//! Model execution input and upload staging.
//!
//! Arrays are written to a temporary `.npy` file before upload. The file is
//! written and its write handle closed, then reopened for reading when the
//! request body is built, and removed once the request finishes, whether it
//! succeeded, failed, or the staging itself failed halfway.

use crate::error::{Error, Result};
use crate::npy::{NpyArray, NpyElement};
use ndarray::{ArrayBase, Data, Dimension};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::{debug, warn};

/// Input data for a model execution.
#[derive(Debug, Clone)]
pub enum ExecuteData {
    /// File on disk, uploaded as-is.
    Path(PathBuf),
    /// File content already in memory.
    Bytes {
        /// File name reported to the server.
        file_name: String,
        /// File content.
        data: Vec<u8>,
    },
    /// Numeric array, converted to a `.npy` file for upload.
    Array(NpyArray),
}

impl ExecuteData {
    /// In-memory file content.
    #[must_use]
    pub fn bytes(file_name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self::Bytes {
            file_name: file_name.into(),
            data: data.into(),
        }
    }
}

impl From<PathBuf> for ExecuteData {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for ExecuteData {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<NpyArray> for ExecuteData {
    fn from(array: NpyArray) -> Self {
        Self::Array(array)
    }
}

impl<A, S, D> From<&ArrayBase<S, D>> for ExecuteData
where
    A: NpyElement,
    S: Data<Elem = A>,
    D: Dimension,
{
    fn from(array: &ArrayBase<S, D>) -> Self {
        Self::Array(NpyArray::from_ndarray(array))
    }
}

/// Arguments of a model execution.
#[derive(Debug, Clone)]
pub struct ExecuteRequest {
    /// Identifier of the model to run.
    pub model: String,
    /// Input data.
    pub data: ExecuteData,
    /// Ask the server to render a plot of the output.
    pub plot: Option<bool>,
    /// Render the plot with a dark theme.
    pub dark_mode: Option<bool>,
}

impl ExecuteRequest {
    /// Run `model` on `data`.
    #[must_use]
    pub fn new(model: impl Into<String>, data: impl Into<ExecuteData>) -> Self {
        Self {
            model: model.into(),
            data: data.into(),
            plot: None,
            dark_mode: None,
        }
    }

    /// Set the `plot` flag.
    #[must_use]
    pub fn with_plot(mut self, plot: bool) -> Self {
        self.plot = Some(plot);
        self
    }

    /// Set the `dark_mode` flag.
    #[must_use]
    pub fn with_dark_mode(mut self, dark_mode: bool) -> Self {
        self.dark_mode = Some(dark_mode);
        self
    }

    /// Text fields of the multipart form; unset flags are omitted.
    pub(crate) fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![("model", self.model.clone())];
        if let Some(plot) = self.plot {
            fields.push(("plot", plot.to_string()));
        }
        if let Some(dark_mode) = self.dark_mode {
            fields.push(("dark_mode", dark_mode.to_string()));
        }
        fields
    }
}

/// Name of the multipart part carrying the input file.
pub(crate) const FILE_FIELD: &str = "file";

pub(crate) const UPLOAD_MIME: &str = "application/octet-stream";

enum Source {
    File(PathBuf),
    Memory(Vec<u8>),
    Temp(TempPath),
}

/// Upload ready to be attached to a request.
///
/// Dropping it removes any temporary file it owns.
pub(crate) struct StagedUpload {
    file_name: String,
    source: Source,
}

/// Request body for a staged upload.
pub(crate) enum UploadBody {
    File { file: File, len: u64 },
    Memory(Vec<u8>),
}

impl StagedUpload {
    /// Prepare `data` for upload, writing arrays under `temp_dir` (or the
    /// system temp dir).
    pub(crate) fn stage(data: ExecuteData, temp_dir: Option<&Path>) -> Result<Self> {
        match data {
            ExecuteData::Path(path) => {
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .ok_or_else(|| {
                        Error::Io(std::io::Error::new(
                            std::io::ErrorKind::InvalidInput,
                            format!("{} has no file name", path.display()),
                        ))
                    })?;
                Ok(Self {
                    file_name,
                    source: Source::File(path),
                })
            }
            ExecuteData::Bytes { file_name, data } => Ok(Self {
                file_name,
                source: Source::Memory(data),
            }),
            ExecuteData::Array(array) => Self::stage_array(&array, temp_dir),
        }
    }

    fn stage_array(array: &NpyArray, temp_dir: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("conductorquantum-").suffix(".npy");
        let temp = match temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };

        // On error `temp` is dropped here, which removes the partial file.
        array.write_to(BufWriter::new(temp.as_file()))?;

        // Closes the write handle; the path is deleted when dropped.
        let path = temp.into_temp_path();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "data.npy".to_string());
        debug!(path = %path.display(), shape = ?array.shape(), "staged array upload");

        Ok(Self {
            file_name,
            source: Source::Temp(path),
        })
    }

    /// File name reported to the server.
    #[must_use]
    pub(crate) fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Path of the file on disk, if the upload is file-backed.
    #[must_use]
    pub(crate) fn path(&self) -> Option<&Path> {
        match &self.source {
            Source::File(path) => Some(path.as_path()),
            Source::Temp(path) => Some(&**path),
            Source::Memory(_) => None,
        }
    }

    /// Whether the upload owns a temporary file.
    #[must_use]
    pub(crate) fn is_temporary(&self) -> bool {
        matches!(self.source, Source::Temp(_))
    }

    /// Open a fresh read handle, or take the in-memory content.
    pub(crate) fn open(&mut self) -> Result<UploadBody> {
        match &mut self.source {
            Source::File(path) => open_file(path),
            Source::Temp(path) => open_file(path),
            Source::Memory(data) => Ok(UploadBody::Memory(std::mem::take(data))),
        }
    }

    /// Remove the temporary file now, logging instead of failing if it
    /// cannot be removed.
    pub(crate) fn finish(self) {
        if let Source::Temp(path) = self.source {
            let shown = path.display().to_string();
            if let Err(err) = path.close() {
                warn!(path = %shown, error = %err, "failed to remove temporary upload");
            }
        }
    }
}

impl std::fmt::Debug for StagedUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagedUpload")
            .field("file_name", &self.file_name)
            .field("path", &self.path())
            .finish()
    }
}

fn open_file(path: &Path) -> Result<UploadBody> {
    let file = File::open(path)?;
    let len = file.metadata()?.len();
    Ok(UploadBody::File { file, len })
}
