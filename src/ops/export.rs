//! Downloads of annotations, features, predictions, and trained models.
//!
//! | Request | Endpoint | Saved as |
//! |---------|----------|----------|
//! | [`ExportRequest::Annotations`] | `GET /export/data` | `annotations.<format>` |
//! | [`ExportRequest::Features`] | `GET /export/features` | `features.<format>` |
//! | [`ExportRequest::Predictions`] | `GET /export/prediction` | `predictions.<format>` |
//! | [`ExportRequest::BertModel`] | `GET /export/bert` | `<model>.tar.gz` |
//!
//! The response body is written only after a successful download; an error
//! response leaves the target directory untouched.

use std::path::{Path, PathBuf};

use super::{Selection, Session, SELECT_PROJECT, SELECT_SCHEME};
use crate::client::RequestOptions;
use crate::error::ApiError;
use crate::notify::Severity;
use crate::routes::{ExportRoute, Route};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportRequest {
    /// Annotations of the selected scheme. `dataset` defaults to `train`.
    Annotations {
        format: String,
        dataset: Option<String>,
    },
    Features {
        features: Vec<String>,
        format: String,
    },
    Predictions {
        model: String,
        format: String,
    },
    BertModel {
        model: String,
    },
}

impl ExportRequest {
    pub fn route(&self) -> Route {
        Route::Export(match self {
            ExportRequest::Annotations { .. } => ExportRoute::Data,
            ExportRequest::Features { .. } => ExportRoute::Features,
            ExportRequest::Predictions { .. } => ExportRoute::Prediction,
            ExportRequest::BertModel { .. } => ExportRoute::Bert,
        })
    }

    /// Name of the saved file.
    pub fn file_name(&self) -> String {
        match self {
            ExportRequest::Annotations { format, .. } => format!("annotations.{}", format),
            ExportRequest::Features { format, .. } => format!("features.{}", format),
            ExportRequest::Predictions { format, .. } => format!("predictions.{}", format),
            ExportRequest::BertModel { model } => format!("{}.tar.gz", model.trim()),
        }
    }

    fn format(&self) -> Option<&str> {
        match self {
            ExportRequest::Annotations { format, .. }
            | ExportRequest::Features { format, .. }
            | ExportRequest::Predictions { format, .. } => Some(format),
            ExportRequest::BertModel { .. } => None,
        }
    }
}

impl Session {
    /// Downloads an export and saves it under `dir`. Returns the saved path.
    pub async fn export(&self, selection: &Selection, request: &ExportRequest, dir: &Path) -> Option<PathBuf> {
        let options = self.export_options(selection, request)?;
        let bytes = match self.client.get_blob(&request.route(), options).await {
            Ok(bytes) => bytes,
            Err(err) => {
                self.notify(Severity::Error, err.to_string());
                return None;
            }
        };
        match save_blob(dir, &request.file_name(), &bytes) {
            Ok(path) => {
                self.notify(Severity::Success, format!("Saved {}", path.display()));
                Some(path)
            }
            Err(err) => {
                self.notify(Severity::Error, err.to_string());
                None
            }
        }
    }

    /// Validates `request` against the selection and builds its query.
    fn export_options(&self, selection: &Selection, request: &ExportRequest) -> Option<RequestOptions> {
        let project = self.require(selection.project(), SELECT_PROJECT)?;
        if let Some(format) = request.format() {
            if !self.ensure(is_safe_format(format), "Select a valid export format") {
                return None;
            }
        }
        let options = Self::scoped(project);
        let options = match request {
            ExportRequest::Annotations { format, dataset } => {
                let scheme = self.require(selection.scheme(), SELECT_SCHEME)?;
                options
                    .query("scheme", scheme)
                    .query("format", format)
                    .query("dataset", dataset.as_deref().unwrap_or("train"))
            }
            ExportRequest::Features { features, format } => {
                if !self.ensure(!features.is_empty(), "Select at least one feature") {
                    return None;
                }
                features
                    .iter()
                    .fold(options, |options, feature| options.query("features", feature))
                    .query("format", format)
            }
            ExportRequest::Predictions { model, format } => {
                let model = self.require(Some(model.as_str()), "Select a model first")?;
                options.query("format", format).query("name", model)
            }
            ExportRequest::BertModel { model } => {
                let model = self.require(Some(model.as_str()), "Select a model first")?;
                if !self.ensure(is_safe_file_stem(model), "Model name cannot be used as a file name") {
                    return None;
                }
                options.query("name", model)
            }
        };
        Some(options)
    }
}

fn is_safe_format(format: &str) -> bool {
    !format.is_empty() && format.chars().all(|c| c.is_ascii_alphanumeric())
}

fn is_safe_file_stem(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

/// Writes `bytes` to `dir/name`, creating `dir` when needed.
pub fn save_blob(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf, ApiError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| ApiError::Io(format!("{}: {}", dir.display(), e)))?;
    let path = dir.join(name);
    std::fs::write(&path, bytes).map_err(|e| ApiError::Io(format!("{}: {}", path.display(), e)))?;
    tracing::debug!(path = %path.display(), size = bytes.len(), "export saved");
    Ok(path)
}
