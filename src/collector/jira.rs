//! Jira platform tickets: open high-priority issues, recent resolutions and
//! ticket velocity

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::info;

use super::{ensure_success, Collector};
use crate::config::JiraConfig;
use crate::domain::{SourceId, SourceResult, Status};
use crate::error::{Result, VigilError};

const OPEN_LIMIT: u32 = 50;
const RESOLVED_LIMIT: u32 = 20;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    total: u64,
    #[serde(default)]
    issues: Vec<Issue>,
}

#[derive(Debug, Deserialize)]
struct Issue {
    key: String,
    #[serde(default)]
    fields: IssueFields,
}

#[derive(Debug, Default, Deserialize)]
struct IssueFields {
    summary: Option<String>,
    priority: Option<Named>,
    status: Option<Named>,
    assignee: Option<Assignee>,
    created: Option<String>,
    updated: Option<String>,
    resolutiondate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Assignee {
    display_name: String,
}

/// Open ticket as it appears in the source details
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenTicket {
    pub key: String,
    pub summary: String,
    pub priority: String,
    pub status: String,
    pub assignee: String,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedTicket {
    pub key: String,
    pub summary: String,
    pub priority: String,
    pub resolved_at: Option<String>,
    pub url: String,
}

fn name_or_unknown(named: Option<Named>) -> String {
    named.map(|n| n.name).unwrap_or_else(|| "Unknown".to_string())
}

fn browse_url(base: &str, key: &str) -> String {
    format!("{}/browse/{}", base.trim_end_matches('/'), key)
}

fn open_ticket(base: &str, issue: Issue) -> OpenTicket {
    let f = issue.fields;
    OpenTicket {
        url: browse_url(base, &issue.key),
        key: issue.key,
        summary: f.summary.unwrap_or_default(),
        priority: name_or_unknown(f.priority),
        status: name_or_unknown(f.status),
        assignee: f
            .assignee
            .map(|a| a.display_name)
            .unwrap_or_else(|| "Unassigned".to_string()),
        created: f.created,
        updated: f.updated,
    }
}

fn resolved_ticket(base: &str, issue: Issue) -> ResolvedTicket {
    let f = issue.fields;
    ResolvedTicket {
        url: browse_url(base, &issue.key),
        key: issue.key,
        summary: f.summary.unwrap_or_default(),
        priority: name_or_unknown(f.priority),
        resolved_at: f.resolutiondate,
    }
}

pub fn count_by_priority(tickets: &[OpenTicket]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for ticket in tickets {
        *counts.entry(ticket.priority.clone()).or_insert(0) += 1;
    }
    counts
}

/// Any P1/Critical ticket is critical; more than two P2/High is a warning
pub fn status_for_priorities(counts: &BTreeMap<String, usize>) -> Status {
    let count = |names: &[&str]| -> usize {
        names.iter().map(|n| counts.get(*n).copied().unwrap_or(0)).sum()
    };
    if count(&["P1", "Critical"]) > 0 {
        Status::Critical
    } else if count(&["P2", "High"]) > 2 {
        Status::Warning
    } else {
        Status::Healthy
    }
}

fn quoted_list(items: &[String]) -> String {
    items
        .iter()
        .map(|p| format!("\"{}\"", p.replace('"', "")))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Collects ticket data for the configured project
pub struct JiraCollector {
    config: Option<JiraConfig>,
    http: Client,
}

impl JiraCollector {
    pub fn new(config: Option<JiraConfig>, http: Client) -> Self {
        Self { config, http }
    }

    async fn search(&self, config: &JiraConfig, jql: &str, max_results: u32, fields: &str) -> Result<SearchResponse> {
        let url = format!("{}/rest/api/2/search", config.url.trim_end_matches('/'));
        let max_results = max_results.to_string();
        let response = self
            .http
            .get(&url)
            .basic_auth(&config.email, Some(&config.api_token))
            .query(&[("jql", jql), ("maxResults", max_results.as_str()), ("fields", fields)])
            .send()
            .await?;

        Ok(ensure_success(response).await?.json().await?)
    }
}

#[async_trait]
impl Collector for JiraCollector {
    fn source(&self) -> SourceId {
        SourceId::Jira
    }

    async fn fetch(&self) -> Result<SourceResult> {
        let config = self
            .config
            .as_ref()
            .ok_or(VigilError::NotConfigured(SourceId::Jira))?;

        info!("Collecting Jira ticket data...");
        let project = &config.project_key;

        let open_jql = format!(
            "project = \"{}\" AND status != Done AND priority in ({}) ORDER BY priority ASC, created DESC",
            project,
            quoted_list(&config.priorities)
        );
        let resolved_jql = format!(
            "project = \"{}\" AND status = Done AND resolved >= -24h ORDER BY resolved DESC",
            project
        );
        let velocity_jql = format!("project = \"{}\" AND created >= -7d ORDER BY created DESC", project);

        let (open, resolved, velocity) = tokio::try_join!(
            self.search(config, &open_jql, OPEN_LIMIT, "summary,status,priority,assignee,created,updated"),
            self.search(config, &resolved_jql, RESOLVED_LIMIT, "summary,priority,resolutiondate"),
            self.search(config, &velocity_jql, 0, "created"),
        )?;

        let open_tickets: Vec<OpenTicket> = open
            .issues
            .into_iter()
            .map(|i| open_ticket(&config.url, i))
            .collect();
        let resolved_tickets: Vec<ResolvedTicket> = resolved
            .issues
            .into_iter()
            .map(|i| resolved_ticket(&config.url, i))
            .collect();

        let by_priority = count_by_priority(&open_tickets);
        let status = status_for_priorities(&by_priority);

        let result = SourceResult::new(SourceId::Jira, status)
            .with_fact("open_high_priority", open_tickets.len())
            .with_fact("resolved_last_24h", resolved_tickets.len())
            .with_fact("created_last_7d", velocity.total as i64)
            .with_detail("by_priority", json!(by_priority))
            .with_detail("open_tickets", json!(open_tickets))
            .with_detail("resolved_last_24h", json!(resolved_tickets));

        info!("Jira: {:?} ({:?})", result.status, result.summary);
        Ok(result)
    }
}
