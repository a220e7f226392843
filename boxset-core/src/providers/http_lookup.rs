//! `reqwest` adapter for the remote metadata source.
//!
//! Wire format:
//!
//! - `GET {base}/v1/lookup/{namespace}?ids=a,b,c` answers
//!   `{"matches": [{"source_id": "tt0111161", "primary_id": 326}]}`
//! - `GET {base}/v1/groups/{group}` answers
//!   `{"items": [{"name": "...", "ids": {...}}]}` where `ids` maps a
//!   namespace to a value, e.g. `{"primary": 326, "imdb": "tt0111161"}`
//!
//! Ids may be sent as strings or numbers. A 404 on a group means the group
//! does not exist and yields an empty list.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use boxset_model::{
    ExternalGroupId, ExternalItem, IdentifierKey, IdentifierNamespace,
    IdentifierSet,
};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::config::LookupConfig;
use crate::error::LookupError;
use crate::matching::MAX_BATCH_SIZE;
use crate::ports::ExternalLookupClient;

const API_KEY_HEADER: &str = "X-Api-Key";

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum IdValue {
    Text(String),
    Number(u64),
}

impl IdValue {
    fn into_string(self) -> String {
        match self {
            IdValue::Text(text) => text,
            IdValue::Number(number) => number.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    matches: Vec<LookupMatch>,
}

#[derive(Debug, Deserialize)]
struct LookupMatch {
    source_id: IdValue,
    primary_id: Option<IdValue>,
}

#[derive(Debug, Deserialize)]
struct GroupResponse {
    #[serde(default)]
    items: Vec<GroupItem>,
}

#[derive(Debug, Deserialize)]
struct GroupItem {
    name: String,
    #[serde(default)]
    ids: HashMap<String, IdValue>,
}

impl GroupItem {
    fn into_external(self) -> ExternalItem {
        let mut identifiers = IdentifierSet::new();
        for (raw_namespace, value) in self.ids {
            let Ok(namespace) = raw_namespace.parse::<IdentifierNamespace>()
            else {
                debug!(
                    target: "boxset::lookup",
                    namespace = %raw_namespace,
                    item = %self.name,
                    "ignoring unknown identifier namespace"
                );
                continue;
            };
            if let Ok(key) = IdentifierKey::new(namespace, value.into_string())
            {
                identifiers.insert(key);
            }
        }
        ExternalItem {
            name: self.name,
            identifiers,
        }
    }
}

/// HTTP client for the lookup API.
#[derive(Debug, Clone)]
pub struct HttpLookupClient {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl HttpLookupClient {
    pub fn new(config: &LookupConfig) -> Result<Self, LookupError> {
        let base_url = Url::parse(config.base_url.trim())
            .map_err(|err| {
                LookupError::Api(format!("invalid base url: {err}"))
            })?;
        if base_url.cannot_be_a_base() {
            return Err(LookupError::Api(format!(
                "base url {base_url} cannot carry a path"
            )));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            base_url,
            api_key: config
                .api_key
                .clone()
                .filter(|key| !key.trim().is_empty()),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header(API_KEY_HEADER, key),
            None => request,
        }
    }

    /// Send and map error statuses. `Ok(None)` means 404.
    async fn send(
        &self,
        request: RequestBuilder,
    ) -> Result<Option<Response>, LookupError> {
        let response = self.authorized(request).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(LookupError::InvalidApiKey)
            }
            StatusCode::TOO_MANY_REQUESTS => Err(LookupError::RateLimited),
            status if !status.is_success() => {
                Err(LookupError::Api(format!("unexpected status {status}")))
            }
            _ => Ok(Some(response)),
        }
    }
}

#[async_trait]
impl ExternalLookupClient for HttpLookupClient {
    async fn resolve_primary_ids(
        &self,
        namespace: IdentifierNamespace,
        values: &[String],
    ) -> Result<HashMap<String, String>, LookupError> {
        if values.is_empty() {
            return Ok(HashMap::new());
        }
        if values.len() > MAX_BATCH_SIZE {
            return Err(LookupError::BatchTooLarge {
                namespace,
                size: values.len(),
                max: MAX_BATCH_SIZE,
            });
        }

        let url = self.endpoint(&["v1", "lookup", namespace.as_str()]);
        let request = self.client.get(url).query(&[("ids", values.join(","))]);
        let Some(response) = self.send(request).await? else {
            return Ok(HashMap::new());
        };
        let body: LookupResponse = response
            .json()
            .await
            .map_err(|err| LookupError::Parse(err.to_string()))?;

        Ok(body
            .matches
            .into_iter()
            .filter_map(|found| {
                let primary = found.primary_id?.into_string();
                Some((found.source_id.into_string(), primary))
            })
            .collect())
    }

    async fn fetch_named_group(
        &self,
        group: &ExternalGroupId,
    ) -> Result<Vec<ExternalItem>, LookupError> {
        let url = self.endpoint(&["v1", "groups", group.as_str()]);
        let Some(response) = self.send(self.client.get(url)).await? else {
            debug!(target: "boxset::lookup", %group, "group not found");
            return Ok(Vec::new());
        };
        let body: GroupResponse = response
            .json()
            .await
            .map_err(|err| LookupError::Parse(err.to_string()))?;
        Ok(body
            .items
            .into_iter()
            .map(GroupItem::into_external)
            .collect())
    }
}
