//! Azure ML job run statuses and compute health

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use super::azure::{fetch_token, MANAGEMENT_SCOPE};
use super::{ensure_success, Collector};
use crate::config::{AzureCredentials, AzureMlConfig};
use crate::domain::{SourceId, SourceResult, Status};
use crate::error::{Result, VigilError};

const API_VERSION: &str = "2023-10-01";
const MAX_PAGES: usize = 10;
/// Completed jobs kept in the result
const COMPLETED_KEEP: usize = 10;

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
    #[serde(rename = "nextLink", default)]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JobResource {
    name: String,
    #[serde(default)]
    properties: JobProperties,
    #[serde(rename = "systemData", default)]
    system_data: Option<SystemData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobProperties {
    display_name: Option<String>,
    status: Option<String>,
    job_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SystemData {
    created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct ComputeResource {
    name: String,
    #[serde(default)]
    properties: ComputeProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ComputeProperties {
    compute_type: Option<String>,
    provisioning_state: Option<String>,
}

/// Job entry as it appears in the source details
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobEntry {
    pub name: String,
    pub display_name: String,
    pub status: String,
    #[serde(rename = "type")]
    pub job_type: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComputeEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub compute_type: String,
    pub state: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobBucket {
    Completed,
    Failed,
    Running,
    Other,
}

pub fn bucket_for(status: &str) -> JobBucket {
    match status {
        "Completed" => JobBucket::Completed,
        "Failed" => JobBucket::Failed,
        "Running" | "Starting" | "Queued" | "Preparing" | "Provisioning" => JobBucket::Running,
        _ => JobBucket::Other,
    }
}

/// Healthy with no failures, critical above three, warning otherwise
pub fn status_for_failures(failed: usize) -> Status {
    match failed {
        0 => Status::Healthy,
        1..=3 => Status::Warning,
        _ => Status::Critical,
    }
}

#[derive(Debug, Default)]
struct Buckets {
    completed: Vec<JobEntry>,
    failed: Vec<JobEntry>,
    running: Vec<JobEntry>,
    other: Vec<JobEntry>,
}

impl Buckets {
    fn total(&self) -> usize {
        self.completed.len() + self.failed.len() + self.running.len() + self.other.len()
    }
}

fn sort_jobs(jobs: Vec<JobEntry>, cutoff: DateTime<Utc>) -> Buckets {
    let mut buckets = Buckets::default();
    for job in jobs {
        // Jobs without a creation time are kept
        if matches!(job.created_at, Some(created) if created < cutoff) {
            continue;
        }
        match bucket_for(&job.status) {
            JobBucket::Completed => buckets.completed.push(job),
            JobBucket::Failed => buckets.failed.push(job),
            JobBucket::Running => buckets.running.push(job),
            JobBucket::Other => buckets.other.push(job),
        }
    }
    buckets
}

/// Start of the lookback window, or an error when it is not representable
fn lookback_cutoff(now: DateTime<Utc>, lookback_hours: u64) -> Result<DateTime<Utc>> {
    i64::try_from(lookback_hours)
        .ok()
        .and_then(Duration::try_hours)
        .and_then(|window| now.checked_sub_signed(window))
        .ok_or_else(|| {
            VigilError::InvalidConfig(format!(
                "sources.lookback_hours {} is out of range",
                lookback_hours
            ))
        })
}

/// Condense jobs and compute targets into a source result
fn build_result(
    jobs: Vec<JobEntry>,
    compute: Vec<ComputeEntry>,
    cutoff: DateTime<Utc>,
    lookback_hours: u64,
) -> SourceResult {
    let mut buckets = sort_jobs(jobs, cutoff);
    let total = buckets.total();
    let completed = buckets.completed.len();
    buckets.completed.truncate(COMPLETED_KEEP);

    SourceResult::new(SourceId::AzureMl, status_for_failures(buckets.failed.len()))
        .with_fact("total", total)
        .with_fact("completed", completed)
        .with_fact("failed", buckets.failed.len())
        .with_fact("running", buckets.running.len())
        .with_fact("other", buckets.other.len())
        .with_fact("lookback_hours", lookback_hours as i64)
        .with_detail("failed_jobs", json!(buckets.failed))
        .with_detail("running_jobs", json!(buckets.running))
        .with_detail("completed_jobs", json!(buckets.completed))
        .with_detail("compute", json!(compute))
}

/// Collects Azure ML job runs within the lookback window
pub struct AzureMlCollector {
    credentials: Option<AzureCredentials>,
    workspace: Option<AzureMlConfig>,
    lookback_hours: u64,
    http: Client,
}

impl AzureMlCollector {
    pub fn new(
        credentials: Option<AzureCredentials>,
        workspace: Option<AzureMlConfig>,
        lookback_hours: u64,
        http: Client,
    ) -> Self {
        Self {
            credentials,
            workspace,
            lookback_hours,
            http,
        }
    }

    fn workspace_url(&self, creds: &AzureCredentials, ws: &AzureMlConfig) -> String {
        format!(
            "{}/subscriptions/{}/resourceGroups/{}/providers/Microsoft.MachineLearningServices/workspaces/{}",
            ws.management_url.trim_end_matches('/'),
            creds.subscription_id,
            ws.resource_group,
            ws.workspace
        )
    }

    async fn list_jobs(&self, base: &str, token: &str) -> Result<Vec<JobEntry>> {
        let mut url = Some(format!("{}/jobs?api-version={}", base, API_VERSION));
        let mut jobs = Vec::new();
        let mut pages = 0;

        while let Some(next) = url.take() {
            pages += 1;
            let response = self.http.get(&next).bearer_auth(token).send().await?;
            let page: Page<JobResource> = ensure_success(response).await?.json().await?;

            jobs.extend(page.value.into_iter().map(|job| {
                let display_name = job.properties.display_name.unwrap_or_else(|| job.name.clone());
                JobEntry {
                    name: job.name,
                    display_name,
                    status: job.properties.status.unwrap_or_else(|| "Unknown".to_string()),
                    job_type: job.properties.job_type.unwrap_or_else(|| "Unknown".to_string()),
                    created_at: job.system_data.and_then(|d| d.created_at),
                }
            }));

            if pages >= MAX_PAGES {
                warn!("Azure ML job listing stopped after {} pages", MAX_PAGES);
                break;
            }
            url = page.next_link;
        }

        Ok(jobs)
    }

    async fn list_compute(&self, base: &str, token: &str) -> Result<Vec<ComputeEntry>> {
        let url = format!("{}/computes?api-version={}", base, API_VERSION);
        let response = self.http.get(&url).bearer_auth(token).send().await?;
        let page: Page<ComputeResource> = ensure_success(response).await?.json().await?;

        Ok(page
            .value
            .into_iter()
            .map(|c| ComputeEntry {
                name: c.name,
                compute_type: c.properties.compute_type.unwrap_or_else(|| "Unknown".to_string()),
                state: c
                    .properties
                    .provisioning_state
                    .unwrap_or_else(|| "Unknown".to_string()),
            })
            .collect())
    }
}

#[async_trait]
impl Collector for AzureMlCollector {
    fn source(&self) -> SourceId {
        SourceId::AzureMl
    }

    async fn fetch(&self) -> Result<SourceResult> {
        let (creds, ws) = match (&self.credentials, &self.workspace) {
            (Some(c), Some(w)) => (c, w),
            _ => return Err(VigilError::NotConfigured(SourceId::AzureMl)),
        };

        let cutoff = lookback_cutoff(Utc::now(), self.lookback_hours)?;

        info!("Collecting Azure ML job data...");
        let token = fetch_token(&self.http, creds, MANAGEMENT_SCOPE).await?;
        let base = self.workspace_url(creds, ws);

        let jobs = self.list_jobs(&base, &token).await?;

        let compute = match self.list_compute(&base, &token).await {
            Ok(compute) => compute,
            Err(e) => {
                warn!("Could not fetch compute list: {}", e);
                Vec::new()
            }
        };

        let result = build_result(jobs, compute, cutoff, self.lookback_hours);
        info!("Azure ML: {:?} ({:?})", result.status, result.summary);
        Ok(result)
    }
}
