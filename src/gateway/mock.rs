use std::collections::{HashMap, VecDeque};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::debug;
use crate::config::AuditConfig;
use crate::error::{AuditDeskError, Result};
use crate::report::{AuditReport, StoredReportMetadata};
use super::{DatasetUpload, Gateway};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    FetchTemplate,
    ListReports,
    GetReport(String),
    RunAudit { file_name: String, dataset_name: String },
    DeleteReport(String),
    DownloadReport(String),
    InferColumns(String),
}

#[derive(Default)]
struct MockState {
    template: AuditConfig,
    reports: Vec<(StoredReportMetadata, AuditReport)>,
    audit_results: VecDeque<AuditReport>,
    columns: HashMap<String, Vec<String>>,
    failures: HashMap<&'static str, String>,
    calls: Vec<GatewayCall>,
}

/// In-memory engine and report store.
#[derive(Default)]
pub struct MockGateway {
    state: Mutex<MockState>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(mut self, template: AuditConfig) -> Self {
        self.state.get_mut().template = template;
        self
    }

    pub fn with_report(mut self, report: AuditReport) -> Self {
        let meta = StoredReportMetadata {
            id: report.id.clone(),
            dataset_name: report.dataset_name().unwrap_or_default().to_string(),
            created_at: Utc::now().to_rfc3339(),
            issues_found: report.issues_found(),
        };
        self.state.get_mut().reports.push((meta, report));
        self
    }

    pub fn with_audit_result(mut self, report: AuditReport) -> Self {
        self.state.get_mut().audit_results.push_back(report);
        self
    }

    pub fn with_columns<I, S>(mut self, file_name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state
            .get_mut()
            .columns
            .insert(file_name.into(), columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_failure(mut self, operation: &'static str, message: impl Into<String>) -> Self {
        self.state.get_mut().failures.insert(operation, message.into());
        self
    }

    pub async fn set_failure(&self, operation: &'static str, message: impl Into<String>) {
        self.state.lock().await.failures.insert(operation, message.into());
    }

    pub async fn clear_failures(&self) {
        self.state.lock().await.failures.clear();
    }

    pub async fn calls(&self) -> Vec<GatewayCall> {
        self.state.lock().await.calls.clone()
    }

    pub async fn report_ids(&self) -> Vec<String> {
        self.state.lock().await.reports.iter().map(|(m, _)| m.id.clone()).collect()
    }

    fn record(state: &mut MockState, operation: &'static str, call: GatewayCall) -> Result<()> {
        debug!("mock gateway: {:?}", call);
        state.calls.push(call);
        match state.failures.get(operation) {
            Some(message) => Err(AuditDeskError::transport(Some(500), message.clone())),
            None => Ok(()),
        }
    }

    fn find<'a>(state: &'a MockState, id: &str) -> Result<&'a AuditReport> {
        state
            .reports
            .iter()
            .find(|(m, _)| m.id == id)
            .map(|(_, r)| r)
            .ok_or_else(|| AuditDeskError::NotFound(format!("report '{}'", id)))
    }
}

#[async_trait]
impl Gateway for MockGateway {
    async fn fetch_template(&self) -> Result<AuditConfig> {
        let mut state = self.state.lock().await;
        Self::record(&mut state, "fetch_template", GatewayCall::FetchTemplate)?;
        Ok(state.template.clone())
    }

    async fn list_reports(&self) -> Result<Vec<StoredReportMetadata>> {
        let mut state = self.state.lock().await;
        Self::record(&mut state, "list_reports", GatewayCall::ListReports)?;
        Ok(state.reports.iter().map(|(m, _)| m.clone()).collect())
    }

    async fn get_report(&self, id: &str) -> Result<AuditReport> {
        let mut state = self.state.lock().await;
        Self::record(&mut state, "get_report", GatewayCall::GetReport(id.to_string()))?;
        Self::find(&state, id).cloned()
    }

    async fn run_audit(&self, dataset: &DatasetUpload, config: &AuditConfig) -> Result<AuditReport> {
        let mut state = self.state.lock().await;
        Self::record(
            &mut state,
            "run_audit",
            GatewayCall::RunAudit {
                file_name: dataset.file_name.clone(),
                dataset_name: config.dataset_name.clone(),
            },
        )?;

        let mut report = state
            .audit_results
            .pop_front()
            .ok_or_else(|| AuditDeskError::transport(Some(503), "no audit result queued"))?;
        report.config = Some(config.clone());
        report.source_file = Some(dataset.file_name.clone());

        let meta = StoredReportMetadata {
            id: report.id.clone(),
            dataset_name: config.dataset_name.clone(),
            created_at: Utc::now().to_rfc3339(),
            issues_found: report.issues_found(),
        };
        state.reports.push((meta, report.clone()));
        Ok(report)
    }

    async fn delete_report(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        Self::record(&mut state, "delete_report", GatewayCall::DeleteReport(id.to_string()))?;
        let before = state.reports.len();
        state.reports.retain(|(m, _)| m.id != id);
        if state.reports.len() == before {
            return Err(AuditDeskError::NotFound(format!("report '{}'", id)));
        }
        Ok(())
    }

    async fn download_report(&self, id: &str) -> Result<Vec<u8>> {
        let mut state = self.state.lock().await;
        Self::record(&mut state, "download_report", GatewayCall::DownloadReport(id.to_string()))?;
        let report = Self::find(&state, id)?;
        Ok(serde_json::to_vec_pretty(report)?)
    }

    async fn infer_columns(&self, dataset: &DatasetUpload) -> Result<Vec<String>> {
        let mut state = self.state.lock().await;
        Self::record(&mut state, "infer_columns", GatewayCall::InferColumns(dataset.file_name.clone()))?;
        Ok(state.columns.get(&dataset.file_name).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ReportSummary;

    fn report(id: &str, issues: i64) -> AuditReport {
        AuditReport {
            id: id.to_string(),
            summary: ReportSummary { issues_found: issues, ..Default::default() },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_get_unknown_report() {
        let gateway = MockGateway::new().with_report(report("a", 1));
        assert!(gateway.get_report("a").await.is_ok());
        let err = gateway.get_report("zz").await.unwrap_err();
        assert!(matches!(err, AuditDeskError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_run_audit_records_history() {
        let gateway = MockGateway::new().with_audit_result(report("new", 4));
        let dataset = DatasetUpload::new("data.csv", b"id\n1\n".to_vec());
        let config = AuditConfig::new("customers");

        let result = gateway.run_audit(&dataset, &config).await.unwrap();
        assert_eq!(result.config.as_ref().unwrap().dataset_name, "customers");
        assert_eq!(result.source_file.as_deref(), Some("data.csv"));

        let history = gateway.list_reports().await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].issues_found, 4);
        assert_eq!(history[0].dataset_name, "customers");
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let gateway = MockGateway::new().with_failure("list_reports", "store offline");
        let err = gateway.list_reports().await.unwrap_err();
        assert_eq!(err.user_message(), "store offline");
        assert_eq!(gateway.calls().await, vec![GatewayCall::ListReports]);

        gateway.clear_failures().await;
        assert!(gateway.list_reports().await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_and_download() {
        let gateway = MockGateway::new().with_report(report("a", 1)).with_report(report("b", 2));
        let bytes = gateway.download_report("b").await.unwrap();
        let parsed: AuditReport = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed.id, "b");

        gateway.delete_report("a").await.unwrap();
        assert_eq!(gateway.report_ids().await, vec!["b".to_string()]);
        assert!(gateway.delete_report("a").await.is_err());
    }
}
