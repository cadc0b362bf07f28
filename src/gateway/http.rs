use std::time::Duration;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, info};
use crate::config::AuditConfig;
use crate::error::{AuditDeskError, Result};
use crate::report::{AuditReport, StoredReportMetadata};
use super::{DatasetUpload, Gateway};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl GatewayConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs: 60,
            user_agent: format!("auditdesk/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// Column inference responses come either bare or wrapped.
#[derive(Deserialize)]
#[serde(untagged)]
enum ColumnsResponse {
    Bare(Vec<String>),
    Wrapped { columns: Vec<String> },
}

impl ColumnsResponse {
    fn into_columns(self) -> Vec<String> {
        match self {
            ColumnsResponse::Bare(columns) | ColumnsResponse::Wrapped { columns } => columns,
        }
    }
}

pub struct HttpGateway {
    client: Client,
    base_url: Url,
}

impl HttpGateway {
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| AuditDeskError::Config(format!("invalid engine URL '{}': {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(AuditDeskError::Config(format!("engine URL '{}' cannot be a base", config.base_url)));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        info!("Audit engine at {}", base_url);
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url_for(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Passes 2xx through. A 404 becomes `NotFound` when `what` names the
    /// resource; any other failure carries the response body verbatim.
    async fn check(response: Response, what: Option<&str>) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            if let Some(what) = what {
                return Err(AuditDeskError::NotFound(what.to_string()));
            }
        }

        let body = response.text().await.unwrap_or_default();
        let message = if body.trim().is_empty() {
            format!("engine responded with {}", status)
        } else {
            body
        };
        Err(AuditDeskError::transport(Some(status.as_u16()), message))
    }

    fn dataset_part(dataset: &DatasetUpload) -> Part {
        Part::bytes(dataset.bytes.clone()).file_name(dataset.file_name.clone())
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn fetch_template(&self) -> Result<AuditConfig> {
        let url = self.url_for(&["config", "template"]);
        debug!("GET {}", url);
        let response = Self::check(self.client.get(url).send().await?, None).await?;
        Ok(response.json().await?)
    }

    async fn list_reports(&self) -> Result<Vec<StoredReportMetadata>> {
        let url = self.url_for(&["reports"]);
        debug!("GET {}", url);
        let response = Self::check(self.client.get(url).send().await?, None).await?;
        Ok(response.json().await?)
    }

    async fn get_report(&self, id: &str) -> Result<AuditReport> {
        let url = self.url_for(&["reports", id]);
        debug!("GET {}", url);
        let what = format!("report '{}'", id);
        let response = Self::check(self.client.get(url).send().await?, Some(&what)).await?;
        Ok(response.json().await?)
    }

    async fn run_audit(&self, dataset: &DatasetUpload, config: &AuditConfig) -> Result<AuditReport> {
        let url = self.url_for(&["audit"]);
        let form = Form::new()
            .part("file", Self::dataset_part(dataset))
            .text("config", config.to_json()?);

        info!("Submitting {} ({} bytes) for audit", dataset.file_name, dataset.bytes.len());
        let response = Self::check(self.client.post(url).multipart(form).send().await?, None).await?;
        Ok(response.json().await?)
    }

    async fn delete_report(&self, id: &str) -> Result<()> {
        let url = self.url_for(&["reports", id]);
        debug!("DELETE {}", url);
        let what = format!("report '{}'", id);
        Self::check(self.client.delete(url).send().await?, Some(&what)).await?;
        Ok(())
    }

    async fn download_report(&self, id: &str) -> Result<Vec<u8>> {
        let url = self.url_for(&["reports", id, "download"]);
        debug!("GET {}", url);
        let what = format!("report '{}'", id);
        let response = Self::check(self.client.get(url).send().await?, Some(&what)).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn infer_columns(&self, dataset: &DatasetUpload) -> Result<Vec<String>> {
        let url = self.url_for(&["columns"]);
        let form = Form::new().part("file", Self::dataset_part(dataset));
        let response = Self::check(self.client.post(url).multipart(form).send().await?, None).await?;
        let columns: ColumnsResponse = response.json().await?;
        Ok(columns.into_columns())
    }
}
