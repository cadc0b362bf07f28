mod http;
mod mock;

use async_trait::async_trait;
use crate::config::AuditConfig;
use crate::error::Result;
use crate::report::{AuditReport, StoredReportMetadata};

pub use http::{GatewayConfig, HttpGateway};
pub use mock::{GatewayCall, MockGateway};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl DatasetUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}

/// Boundary to the audit engine and its report store.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn fetch_template(&self) -> Result<AuditConfig>;

    async fn list_reports(&self) -> Result<Vec<StoredReportMetadata>>;

    /// Fails with `NotFound` for an unknown id.
    async fn get_report(&self, id: &str) -> Result<AuditReport>;

    async fn run_audit(&self, dataset: &DatasetUpload, config: &AuditConfig) -> Result<AuditReport>;

    async fn delete_report(&self, id: &str) -> Result<()>;

    async fn download_report(&self, id: &str) -> Result<Vec<u8>>;

    /// Best-effort column names; callers treat failure as "no suggestion".
    async fn infer_columns(&self, dataset: &DatasetUpload) -> Result<Vec<String>>;
}
