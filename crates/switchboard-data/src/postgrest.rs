use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use url::Url;

use crate::{
    DataError, ModelCatalog, ModelConfig, ModelFilter, ModelUsageStats, TimeWindow, TopUser, UsageRecord,
    UsageRepository, UsageStats, UserDirectory, UserProfile,
};

const USERS: &str = "users";
const MODELS: &str = "llm_models";
const USAGE: &str = "llm_usage";

/// Client for a PostgREST-compatible database API
///
/// Implements every data collaborator. Aggregations run server-side
/// through RPC functions so only sums cross the wire.
#[derive(Clone)]
pub struct PostgrestClient {
    http: reqwest::Client,
    base_url: Url,
    service_key: SecretString,
}

impl PostgrestClient {
    /// Create a client for `base_url`, e.g. `https://db.example.com/rest/v1/`
    pub fn new(base_url: Url, service_key: SecretString, timeout: Duration) -> Result<Self, DataError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        // Url::join drops the last segment unless the base ends with a slash
        let base_url = if base_url.path().ends_with('/') {
            base_url
        } else {
            Url::parse(&format!("{base_url}/"))?
        };

        Ok(Self {
            http,
            base_url,
            service_key,
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let key = self.service_key.expose_secret();
        request.header("apikey", key).bearer_auth(key)
    }

    async fn select<T: DeserializeOwned>(&self, table: &str, query: &[(&str, String)]) -> Result<Vec<T>, DataError> {
        let url = self.base_url.join(table)?;
        let response = self.authorized(self.http.get(url).query(query)).send().await?;

        Ok(check(response).await?.json().await?)
    }

    async fn rpc<T: DeserializeOwned>(&self, function: &str, args: &impl Serialize) -> Result<Vec<T>, DataError> {
        let url = self.base_url.join(&format!("rpc/{function}"))?;
        let response = self.authorized(self.http.post(url).json(args)).send().await?;

        Ok(check(response).await?.json().await?)
    }
}

impl std::fmt::Debug for PostgrestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgrestClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

async fn check(response: Response) -> Result<Response, DataError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        Err(DataError::Api { status, message })
    }
}

fn eq(value: &str) -> String {
    format!("eq.{value}")
}

#[derive(Serialize)]
struct WindowArgs<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    p_user_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    p_model_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    p_limit: Option<usize>,
    p_start: String,
    p_end: String,
}

impl WindowArgs<'_> {
    fn new(window: TimeWindow) -> Self {
        Self {
            p_user_id: None,
            p_model_id: None,
            p_limit: None,
            p_start: window.start.to_string(),
            p_end: window.end.to_string(),
        }
    }
}

/// Aggregate row; SQL sums over no rows come back as null
#[derive(Debug, Default, Deserialize)]
struct StatsRow {
    #[serde(default)]
    user_id: Option<String>,
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
    total_tokens: Option<u64>,
    total_cost: Option<f64>,
    request_count: Option<u64>,
    #[serde(default)]
    unique_users: Option<u64>,
}

impl From<&StatsRow> for UsageStats {
    fn from(row: &StatsRow) -> Self {
        Self {
            prompt_tokens: row.prompt_tokens.unwrap_or_default(),
            completion_tokens: row.completion_tokens.unwrap_or_default(),
            total_tokens: row.total_tokens.unwrap_or_default(),
            total_cost: row.total_cost.unwrap_or_default(),
            request_count: row.request_count.unwrap_or_default(),
        }
    }
}

#[async_trait]
impl UserDirectory for PostgrestClient {
    async fn get_user(&self, user_id: &str) -> Result<UserProfile, DataError> {
        let query = [("id", eq(user_id)), ("select", "id,email,membership_level".to_owned())];

        self.select::<UserProfile>(USERS, &query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DataError::NotFound {
                entity: "user",
                id: user_id.to_owned(),
            })
    }
}

#[async_trait]
impl ModelCatalog for PostgrestClient {
    async fn find_enabled_model(&self, provider: &str, model_id: &str) -> Result<Option<ModelConfig>, DataError> {
        let query = [
            ("provider", eq(provider)),
            ("model_id", eq(model_id)),
            ("status", eq("enabled")),
            ("limit", "1".to_owned()),
        ];

        Ok(self.select(MODELS, &query).await?.into_iter().next())
    }

    async fn list_enabled_models(&self, filter: &ModelFilter) -> Result<Vec<ModelConfig>, DataError> {
        let mut query = vec![("status", eq("enabled")), ("order", "name.asc".to_owned())];
        if let Some(ref provider) = filter.provider {
            query.push(("provider", eq(provider)));
        }
        if let Some(ref model_type) = filter.model_type {
            query.push(("type", eq(model_type)));
        }

        self.select(MODELS, &query).await
    }

    async fn get_model(&self, id: &str) -> Result<Option<ModelConfig>, DataError> {
        Ok(self.select(MODELS, &[("id", eq(id))]).await?.into_iter().next())
    }
}

#[async_trait]
impl UsageRepository for PostgrestClient {
    async fn insert(&self, record: &UsageRecord) -> Result<(), DataError> {
        let url = self.base_url.join(USAGE)?;

        let response = self
            .authorized(self.http.post(url))
            .header("Prefer", "return=minimal")
            .json(record)
            .send()
            .await?;

        check(response).await?;
        Ok(())
    }

    async fn user_stats(&self, user_id: &str, window: TimeWindow) -> Result<UsageStats, DataError> {
        let args = WindowArgs {
            p_user_id: Some(user_id),
            ..WindowArgs::new(window)
        };

        let rows: Vec<StatsRow> = self.rpc("usage_stats_for_user", &args).await?;
        Ok(rows.first().map(UsageStats::from).unwrap_or_default())
    }

    async fn model_stats(&self, model_id: &str, window: TimeWindow) -> Result<ModelUsageStats, DataError> {
        let args = WindowArgs {
            p_model_id: Some(model_id),
            ..WindowArgs::new(window)
        };

        let rows: Vec<StatsRow> = self.rpc("usage_stats_for_model", &args).await?;
        Ok(rows
            .first()
            .map(|row| ModelUsageStats {
                usage: row.into(),
                unique_users: row.unique_users.unwrap_or_default(),
            })
            .unwrap_or_default())
    }

    async fn top_users(&self, window: TimeWindow, limit: usize) -> Result<Vec<TopUser>, DataError> {
        let args = WindowArgs {
            p_limit: Some(limit),
            ..WindowArgs::new(window)
        };

        let rows: Vec<StatsRow> = self.rpc("top_users", &args).await?;
        Ok(rows
            .iter()
            .filter_map(|row| {
                row.user_id.clone().map(|user_id| TopUser {
                    user_id,
                    usage: row.into(),
                })
            })
            .collect())
    }
}
