//! Live HTTP client for the membership directory (reqwest-based).

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::error::{DirectoryError, DirectoryResult};
use crate::models::{parse_lists_payload, parse_member_payload, Member, MemberList};
use crate::source::{DirectorySource, DumpRecorder};

/// HTTP client for the membership directory.
///
/// Authenticates with HTTP basic auth using the API id/key pair issued for
/// the group.  All fetches are plain GETs returning JSON payloads; an
/// optional [`DumpRecorder`] captures the raw payloads for later replay.
#[derive(Clone)]
pub struct DirectoryClient {
    base_url: String,
    api_id: String,
    api_key: String,
    http_client: Client,
    dump: Option<Arc<DumpRecorder>>,
}

impl DirectoryClient {
    /// Create a new directory client.
    pub fn new(
        base_url: String,
        api_id: String,
        api_key: String,
        timeout: Duration,
    ) -> DirectoryResult<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent("keysync/0.3")
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_id,
            api_key,
            http_client,
            dump: None,
        })
    }

    /// Capture every fetched payload into the given recorder.
    #[must_use]
    pub fn with_dump(mut self, recorder: Arc<DumpRecorder>) -> Self {
        self.dump = Some(recorder);
        self
    }

    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> DirectoryResult<Value> {
        debug!("directory GET {}", url);
        let mut builder = self
            .http_client
            .get(url)
            .basic_auth(&self.api_id, Some(&self.api_key));
        if !query.is_empty() {
            builder = builder.query(query);
        }
        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_else(|_| "<no body>".into());
            return Err(DirectoryError::Status {
                status: status.as_u16(),
                detail,
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl DirectorySource for DirectoryClient {
    async fn all_members(&self) -> DirectoryResult<HashMap<i64, Member>> {
        let url = format!("{}/group/memberlist", self.base_url);
        let payload = self.get_json(&url, &[]).await?;
        if let Some(dump) = &self.dump {
            dump.record_memberlist(&payload)?;
        }
        let members = parse_member_payload(&payload)?;
        debug!(count = members.len(), "fetched member list");
        Ok(members)
    }

    async fn all_lists(
        &self,
        fetch_members: bool,
        list_ids: Option<&BTreeSet<i64>>,
    ) -> DirectoryResult<HashMap<i64, MemberList>> {
        let url = format!("{}/group/customlists", self.base_url);
        let mut query: Vec<(&str, String)> = Vec::new();
        if fetch_members {
            query.push(("members", "1".to_string()));
        }
        let payload = self.get_json(&url, &query).await?;
        if let Some(dump) = &self.dump {
            dump.record_customlists(&payload)?;
        }

        let mut lists = parse_lists_payload(&payload)?;
        if let Some(wanted) = list_ids {
            lists.retain(|id, _| wanted.contains(id));
        }
        debug!(count = lists.len(), "fetched custom lists");
        Ok(lists)
    }
}
