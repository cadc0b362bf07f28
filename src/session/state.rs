use std::path::PathBuf;
use serde::Serialize;
use tracing::{debug, warn};
use crate::config::AuditConfig;
use crate::error::Result;
use crate::gateway::DatasetUpload;
use crate::report::{AuditReport, StoredReportMetadata};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusMessage {
    pub level: StatusLevel,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub path: PathBuf,
    pub upload: DatasetUpload,
    pub generation: u64,
}

#[derive(Debug, Clone)]
pub struct InferenceRequest {
    pub generation: u64,
    pub upload: DatasetUpload,
}

/// Everything one operator session owns. Each field is replaced wholesale
/// after a successful fetch and left untouched on failure.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub config: AuditConfig,
    pub report: Option<AuditReport>,
    pub history: Vec<StoredReportMetadata>,
    pub selected_file: Option<SelectedFile>,
    pub inferred_columns: Vec<String>,
    pub status: Option<StatusMessage>,
    file_generation: u64,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AuditConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn set_status(&mut self, level: StatusLevel, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            level,
            text: text.into(),
        });
    }

    pub fn file_generation(&self) -> u64 {
        self.file_generation
    }

    pub fn select_file(&mut self, path: PathBuf, upload: DatasetUpload) -> InferenceRequest {
        self.file_generation += 1;
        self.inferred_columns.clear();
        self.selected_file = Some(SelectedFile {
            path,
            upload: upload.clone(),
            generation: self.file_generation,
        });
        InferenceRequest {
            generation: self.file_generation,
            upload,
        }
    }

    pub fn begin_inference(&self) -> Option<InferenceRequest> {
        self.selected_file.as_ref().map(|selected| InferenceRequest {
            generation: selected.generation,
            upload: selected.upload.clone(),
        })
    }

    /// Apply an inference response if it still belongs to the current
    /// selection. Stale responses are dropped and failures only logged.
    /// Returns whether the columns were applied.
    pub fn complete_inference(&mut self, generation: u64, result: Result<Vec<String>>) -> bool {
        if generation != self.file_generation {
            debug!(
                "Discarding column inference for selection {} (current is {})",
                generation, self.file_generation
            );
            return false;
        }

        match result {
            Ok(columns) => {
                self.inferred_columns = columns;
                true
            }
            Err(e) => {
                warn!("Column inference failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuditDeskError;

    fn upload(name: &str) -> DatasetUpload {
        DatasetUpload::new(name, Vec::new())
    }

    #[test]
    fn test_select_file_bumps_generation() {
        let mut state = SessionState::new();
        let first = state.select_file(PathBuf::from("a.csv"), upload("a.csv"));
        let second = state.select_file(PathBuf::from("b.csv"), upload("b.csv"));
        assert_eq!(first.generation, 1);
        assert_eq!(second.generation, 2);
        assert_eq!(state.selected_file.as_ref().unwrap().upload.file_name, "b.csv");
    }

    #[test]
    fn test_stale_inference_discarded() {
        let mut state = SessionState::new();
        let stale = state.select_file(PathBuf::from("a.csv"), upload("a.csv"));
        let current = state.select_file(PathBuf::from("b.csv"), upload("b.csv"));

        assert!(state.complete_inference(current.generation, Ok(vec!["b1".to_string()])));
        assert!(!state.complete_inference(stale.generation, Ok(vec!["a1".to_string()])));
        assert_eq!(state.inferred_columns, vec!["b1".to_string()]);
    }

    #[test]
    fn test_failed_inference_is_silent() {
        let mut state = SessionState::new();
        let request = state.select_file(PathBuf::from("a.csv"), upload("a.csv"));
        let applied = state.complete_inference(request.generation, Err(AuditDeskError::transport(None, "down")));
        assert!(!applied);
        assert!(state.inferred_columns.is_empty());
        assert!(state.status.is_none());
    }

    #[test]
    fn test_begin_inference_tracks_selection() {
        let mut state = SessionState::new();
        assert!(state.begin_inference().is_none());

        state.select_file(PathBuf::from("a.csv"), upload("a.csv"));
        let request = state.begin_inference().unwrap();
        assert_eq!(request.generation, state.file_generation());
        assert_eq!(request.upload.file_name, "a.csv");
    }

    #[test]
    fn test_new_selection_clears_columns() {
        let mut state = SessionState::new();
        let request = state.select_file(PathBuf::from("a.csv"), upload("a.csv"));
        state.complete_inference(request.generation, Ok(vec!["x".to_string()]));
        state.select_file(PathBuf::from("b.csv"), upload("b.csv"));
        assert!(state.inferred_columns.is_empty());
    }
}
