//! CRM pipeline client and the kanban board built from it.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::{info, warn};
use ts_rs::TS;

const DEFAULT_BASE_URL: &str = "https://api.crm.example/v1";

#[derive(Debug, Clone, Error)]
pub enum CrmError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("rate limited")]
    RateLimited,
    #[error("invalid api token")]
    InvalidToken,
    #[error("not found at CRM: {0}")]
    NotFound(String),
    #[error("json error: {0}")]
    Serde(String),
    #[error("missing api token: CRM_API_TOKEN environment variable not set")]
    MissingToken,
}

impl CrmError {
    pub fn should_retry(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout | Self::RateLimited => true,
            Self::Http { status, .. } => (500..=599).contains(status),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Pipeline {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Stage {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub position: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Opportunity {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub value: f64,
    pub stage_id: String,
    pub contact_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct KanbanColumn {
    pub stage: Stage,
    pub opportunities: Vec<Opportunity>,
    pub total_value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct KanbanBoard {
    pub pipeline_id: String,
    pub columns: Vec<KanbanColumn>,
}

/// One column per stage in `position` order; opportunities whose stage is
/// unknown are left out.
pub fn build_board(
    pipeline_id: &str,
    mut stages: Vec<Stage>,
    opportunities: Vec<Opportunity>,
) -> KanbanBoard {
    stages.sort_by_key(|s| s.position);
    let mut columns: Vec<KanbanColumn> = stages
        .into_iter()
        .map(|stage| KanbanColumn {
            stage,
            opportunities: Vec::new(),
            total_value: 0.0,
        })
        .collect();

    for opportunity in opportunities {
        match columns
            .iter_mut()
            .find(|c| c.stage.id == opportunity.stage_id)
        {
            Some(column) => {
                column.total_value += opportunity.value;
                column.opportunities.push(opportunity);
            }
            None => warn!(
                opportunity_id = %opportunity.id,
                stage_id = %opportunity.stage_id,
                "Opportunity references an unknown stage"
            ),
        }
    }
    for column in &mut columns {
        column.total_value = utils::date::round_cents(column.total_value);
    }

    KanbanBoard {
        pipeline_id: pipeline_id.to_string(),
        columns,
    }
}

#[async_trait]
pub trait CrmProvider: Send + Sync {
    async fn pipelines(&self) -> Result<Vec<Pipeline>, CrmError>;

    async fn stages(&self, pipeline_id: &str) -> Result<Vec<Stage>, CrmError>;

    async fn opportunities(&self, pipeline_id: &str) -> Result<Vec<Opportunity>, CrmError>;

    async fn move_opportunity(
        &self,
        opportunity_id: &str,
        stage_id: &str,
    ) -> Result<Opportunity, CrmError>;
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    data: Vec<T>,
}

#[derive(Debug, Serialize)]
struct StageUpdate<'a> {
    stage_id: &'a str,
}

#[derive(Debug, Clone)]
pub struct CrmClient {
    http: Client,
    api_token: SecretString,
    base_url: String,
}

impl CrmClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// Create a client from `CRM_API_TOKEN` and optional `CRM_API_URL`
    pub fn from_env() -> Result<Self, CrmError> {
        let token = std::env::var("CRM_API_TOKEN")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or(CrmError::MissingToken)?;
        Self::new(SecretString::from(token), std::env::var("CRM_API_URL").ok())
    }

    pub fn new(api_token: SecretString, base_url: Option<String>) -> Result<Self, CrmError> {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("creche-manager/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CrmError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            api_token,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }

    async fn list_once<T: DeserializeOwned + Send>(&self, path: &str) -> Result<Vec<T>, CrmError> {
        let res = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(self.api_token.expose_secret())
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let list: ListResponse<T> = handle_response(res, path).await?;
        Ok(list.data)
    }

    async fn list<T: DeserializeOwned + Send>(&self, path: &str) -> Result<Vec<T>, CrmError> {
        (|| async { self.list_once(path).await })
            .retry(
                ExponentialBuilder::default()
                    .with_min_delay(Duration::from_millis(500))
                    .with_max_delay(Duration::from_secs(10))
                    .with_max_times(3)
                    .with_jitter(),
            )
            .when(|e: &CrmError| e.should_retry())
            .notify(|e, dur| {
                warn!(
                    "CRM call failed, retrying after {:.2}s: {}",
                    dur.as_secs_f64(),
                    e
                )
            })
            .await
    }
}

#[async_trait]
impl CrmProvider for CrmClient {
    async fn pipelines(&self) -> Result<Vec<Pipeline>, CrmError> {
        self.list("/pipelines").await
    }

    async fn stages(&self, pipeline_id: &str) -> Result<Vec<Stage>, CrmError> {
        self.list(&format!("/pipelines/{pipeline_id}/stages")).await
    }

    async fn opportunities(&self, pipeline_id: &str) -> Result<Vec<Opportunity>, CrmError> {
        self.list(&format!("/opportunities?pipeline_id={pipeline_id}"))
            .await
    }

    async fn move_opportunity(
        &self,
        opportunity_id: &str,
        stage_id: &str,
    ) -> Result<Opportunity, CrmError> {
        let path = format!("/opportunities/{opportunity_id}");
        let res = self
            .http
            .patch(format!("{}{}", self.base_url, path))
            .bearer_auth(self.api_token.expose_secret())
            .json(&StageUpdate { stage_id })
            .send()
            .await
            .map_err(map_reqwest_error)?;
        handle_response(res, &path).await
    }
}

async fn handle_response<T: DeserializeOwned>(
    res: reqwest::Response,
    path: &str,
) -> Result<T, CrmError> {
    match res.status() {
        s if s.is_success() => res
            .json::<T>()
            .await
            .map_err(|e| CrmError::Serde(e.to_string())),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(CrmError::InvalidToken),
        StatusCode::NOT_FOUND => Err(CrmError::NotFound(path.to_string())),
        StatusCode::TOO_MANY_REQUESTS => Err(CrmError::RateLimited),
        s => Err(CrmError::Http {
            status: s.as_u16(),
            body: res.text().await.unwrap_or_default(),
        }),
    }
}

fn map_reqwest_error(e: reqwest::Error) -> CrmError {
    if e.is_timeout() {
        CrmError::Timeout
    } else {
        CrmError::Transport(e.to_string())
    }
}

pub struct PipelineService {
    provider: Arc<dyn CrmProvider>,
}

impl PipelineService {
    pub fn new(provider: Arc<dyn CrmProvider>) -> Self {
        Self { provider }
    }

    pub async fn pipelines(&self) -> Result<Vec<Pipeline>, CrmError> {
        self.provider.pipelines().await
    }

    pub async fn board(&self, pipeline_id: &str) -> Result<KanbanBoard, CrmError> {
        let stages = self.provider.stages(pipeline_id).await?;
        let opportunities = self.provider.opportunities(pipeline_id).await?;
        Ok(build_board(pipeline_id, stages, opportunities))
    }

    pub async fn move_opportunity(
        &self,
        opportunity_id: &str,
        stage_id: &str,
    ) -> Result<Opportunity, CrmError> {
        let moved = self
            .provider
            .move_opportunity(opportunity_id, stage_id)
            .await?;
        info!(opportunity_id, stage_id, "Opportunity moved");
        Ok(moved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(id: &str, position: i64) -> Stage {
        Stage {
            id: id.into(),
            name: id.to_uppercase(),
            position,
        }
    }

    fn opportunity(id: &str, stage_id: &str, value: f64) -> Opportunity {
        Opportunity {
            id: id.into(),
            title: format!("Família {id}"),
            value,
            stage_id: stage_id.into(),
            contact_name: None,
        }
    }

    #[test]
    fn test_board_groups_by_stage_with_totals() {
        let board = build_board(
            "p1",
            vec![stage("visita", 2), stage("contato", 1), stage("matricula", 3)],
            vec![
                opportunity("a", "contato", 1200.0),
                opportunity("b", "visita", 950.5),
                opportunity("c", "contato", 800.25),
                opportunity("d", "arquivado", 10.0),
            ],
        );

        let names: Vec<_> = board.columns.iter().map(|c| c.stage.id.as_str()).collect();
        assert_eq!(names, vec!["contato", "visita", "matricula"]);
        assert_eq!(board.columns[0].opportunities.len(), 2);
        assert_eq!(board.columns[0].total_value, 2000.25);
        assert_eq!(board.columns[1].total_value, 950.5);
        assert!(board.columns[2].opportunities.is_empty());
        assert_eq!(board.columns[2].total_value, 0.0);
    }

    #[test]
    fn test_list_response_parsing() {
        let list: ListResponse<Opportunity> = serde_json::from_str(
            r#"{"data":[{"id":"o1","title":"Família Souza","stage_id":"s1","contact_name":"Ana"}]}"#,
        )
        .unwrap();
        assert_eq!(list.data[0].value, 0.0);
        assert_eq!(list.data[0].contact_name.as_deref(), Some("Ana"));
    }
}
