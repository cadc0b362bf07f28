use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use crate::config::{AuditConfig, ConfigValidator};
use crate::error::{AuditDeskError, Result};
use crate::gateway::{DatasetUpload, Gateway};
use crate::report::{
    self, derive_indicators, derive_issue_log, AuditReport, DerivedIssue, Indicator,
    ReportComparison, StoredReportMetadata,
};
use super::state::{InferenceRequest, SessionState, StatusLevel};

/// One operator session over a gateway.
pub struct Console<G: Gateway> {
    gateway: G,
    state: SessionState,
}

impl<G: Gateway> Console<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            state: SessionState::new(),
        }
    }

    pub fn with_config(mut self, config: AuditConfig) -> Self {
        self.state.config = config;
        self
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn config(&self) -> &AuditConfig {
        &self.state.config
    }

    pub fn config_mut(&mut self) -> &mut AuditConfig {
        &mut self.state.config
    }

    pub fn replace_config(&mut self, config: AuditConfig) {
        self.state.config = config;
    }

    pub fn report(&self) -> Option<&AuditReport> {
        self.state.report.as_ref()
    }

    pub fn history(&self) -> &[StoredReportMetadata] {
        &self.state.history
    }

    pub fn inferred_columns(&self) -> &[String] {
        &self.state.inferred_columns
    }

    fn fail(&mut self, context: &str, err: AuditDeskError) -> AuditDeskError {
        warn!("{} failed: {}", context, err);
        self.state.set_status(StatusLevel::Error, err.user_message());
        err
    }

    pub async fn load_template(&mut self) -> Result<&AuditConfig> {
        match self.gateway.fetch_template().await {
            Ok(template) => {
                info!("Loaded template for '{}'", template.dataset_name);
                self.state.config = template;
                self.state.set_status(StatusLevel::Success, "Template loaded");
                Ok(&self.state.config)
            }
            Err(e) => Err(self.fail("Template fetch", e)),
        }
    }

    pub async fn refresh_history(&mut self) -> Result<&[StoredReportMetadata]> {
        match self.gateway.list_reports().await {
            Ok(history) => {
                debug!("History has {} reports", history.len());
                self.state.history = history;
                Ok(&self.state.history)
            }
            Err(e) => Err(self.fail("History refresh", e)),
        }
    }

    pub async fn open_report(&mut self, id: &str) -> Result<&AuditReport> {
        match self.gateway.get_report(id).await {
            Ok(report) => {
                self.state
                    .set_status(StatusLevel::Info, format!("Viewing report {}", report.id));
                Ok(self.state.report.insert(report))
            }
            Err(e) => Err(self.fail("Report fetch", e)),
        }
    }

    pub async fn select_file(&mut self, path: impl AsRef<Path>) -> Result<InferenceRequest> {
        let path = path.as_ref();
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => return Err(self.fail("Dataset read", e.into())),
        };

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        info!("Selected {} ({} bytes)", file_name, bytes.len());
        let request = self
            .state
            .select_file(PathBuf::from(path), DatasetUpload::new(file_name.clone(), bytes));
        self.state
            .set_status(StatusLevel::Info, format!("Selected {}", file_name));
        Ok(request)
    }

    pub async fn infer_columns(&mut self, request: InferenceRequest) -> bool {
        let result = self.gateway.infer_columns(&request.upload).await;
        self.state.complete_inference(request.generation, result)
    }

    pub fn apply_inferred_columns(&mut self) -> usize {
        let columns = self.state.inferred_columns.clone();
        let added = self.state.config.seed_schema_from_columns(&columns);
        if added > 0 {
            self.state
                .set_status(StatusLevel::Info, format!("Added {} fields from dataset columns", added));
        }
        added
    }

    pub async fn run_audit(&mut self) -> Result<&AuditReport> {
        let upload = match self.state.selected_file.as_ref().map(|s| s.upload.clone()) {
            Some(upload) => upload,
            None => {
                let err = AuditDeskError::Validation("select a dataset file first".to_string());
                return Err(self.fail("Audit", err));
            }
        };

        let validation = ConfigValidator::validate(&self.state.config);
        for warning in &validation.warnings {
            warn!("[{}] {}", warning.code, warning.message);
        }
        if !validation.is_valid() {
            let err = AuditDeskError::Validation(validation.summary());
            return Err(self.fail("Audit", err));
        }

        let report = match self.gateway.run_audit(&upload, &self.state.config).await {
            Ok(report) => report,
            Err(e) => return Err(self.fail("Audit", e)),
        };

        info!(
            "Audit {} finished: {} issues found",
            report.id,
            report.issues_found()
        );
        let message = format!("Audit complete: {} issues found", report.issues_found());
        self.state.report = Some(report);

        match self.gateway.list_reports().await {
            Ok(history) => self.state.history = history,
            Err(e) => warn!("History refresh after audit failed: {}", e),
        }
        self.state.set_status(StatusLevel::Success, message);

        self.state
            .report
            .as_ref()
            .ok_or_else(|| AuditDeskError::Console("report missing after audit".to_string()))
    }

    pub async fn delete_report(&mut self, id: &str) -> Result<()> {
        if let Err(e) = self.gateway.delete_report(id).await {
            return Err(self.fail("Report delete", e));
        }

        info!("Deleted report {}", id);
        if self.state.report.as_ref().is_some_and(|r| r.id == id) {
            self.state.report = None;
        }

        match self.gateway.list_reports().await {
            Ok(history) => self.state.history = history,
            Err(e) => warn!("History refresh after delete failed: {}", e),
        }
        self.state
            .set_status(StatusLevel::Success, format!("Deleted report {}", id));
        Ok(())
    }

    pub async fn download_report(&mut self, id: &str, dest: impl AsRef<Path>) -> Result<usize> {
        let dest = dest.as_ref();
        let bytes = match self.gateway.download_report(id).await {
            Ok(bytes) => bytes,
            Err(e) => return Err(self.fail("Report download", e)),
        };

        if let Err(e) = tokio::fs::write(dest, &bytes).await {
            return Err(self.fail("Report download", e.into()));
        }

        info!("Wrote report {} to {}", id, dest.display());
        self.state
            .set_status(StatusLevel::Success, format!("Saved report to {}", dest.display()));
        Ok(bytes.len())
    }

    pub async fn compare(&mut self, id_a: Option<&str>, id_b: Option<&str>) -> Result<ReportComparison> {
        let (id_a, id_b) = match (id_a, id_b) {
            (Some(a), Some(b)) if a != b => (a, b),
            (Some(a), Some(_)) => {
                let err = AuditDeskError::Validation(format!("cannot compare report '{}' with itself", a));
                return Err(self.fail("Comparison", err));
            }
            _ => {
                let err = AuditDeskError::Validation("select two reports to compare".to_string());
                return Err(self.fail("Comparison", err));
            }
        };

        let fetched = tokio::try_join!(self.gateway.get_report(id_a), self.gateway.get_report(id_b));
        let (report_a, report_b) = match fetched {
            Ok(pair) => pair,
            Err(e) => return Err(self.fail("Comparison", e)),
        };

        match report::compare(Some(&report_a), Some(&report_b)) {
            Ok(comparison) => {
                self.state.set_status(
                    StatusLevel::Info,
                    format!("Compared {} with {}", comparison.report_a, comparison.report_b),
                );
                Ok(comparison)
            }
            Err(e) => Err(self.fail("Comparison", e)),
        }
    }

    pub fn issue_log(&self) -> Option<Vec<DerivedIssue>> {
        self.state.report.as_ref().map(derive_issue_log)
    }

    pub fn indicators(&self) -> Option<Vec<Indicator>> {
        self.state.report.as_ref().map(derive_indicators)
    }
}
