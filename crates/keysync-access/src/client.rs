//! Access-control HTTP client (reqwest-based).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::api::AccessApi;
use crate::error::{AccessError, AccessResult};
use crate::models::{AccessPerson, AreaAuthorization, PersonRequest, PhoneMedium, PhoneRequest};

/// HTTP client for the access-control provisioning service.
///
/// Authenticates every request with an `X-API-Key` header.
#[derive(Debug, Clone)]
pub struct AccessClient {
    base_url: String,
    api_key: String,
    http_client: Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AssignmentRequest {
    person_id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthorizationRequest {
    person_id: i64,
    area_id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthorizationDeletionRequest<'a> {
    authorization_ids: &'a [i64],
}

impl AccessClient {
    /// Create a new access-control client.
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> AccessResult<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent("keysync/0.3")
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            http_client,
        })
    }

    async fn list_page<T: DeserializeOwned>(
        &self,
        resource: &str,
        offset: usize,
        limit: usize,
    ) -> AccessResult<Vec<T>> {
        let url = format!("{}/{}", self.base_url, resource);
        debug!("access GET {} offset={} limit={}", url, offset, limit);
        let response = self
            .http_client
            .get(&url)
            .header("X-API-Key", &self.api_key)
            .query(&[("offset", offset.to_string()), ("limit", limit.to_string())])
            .send()
            .await?;
        self.handle_response(response).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(&self, url: &str, body: &B) -> AccessResult<T> {
        debug!("access POST {}", url);
        let response = self
            .http_client
            .post(url)
            .header("X-API-Key", &self.api_key)
            .json(body)
            .send()
            .await?;
        self.handle_response(response).await
    }

    async fn post_no_content<B: Serialize>(&self, url: &str, body: &B) -> AccessResult<()> {
        debug!("access POST {}", url);
        let response = self
            .http_client
            .post(url)
            .header("X-API-Key", &self.api_key)
            .json(body)
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            self.handle_error_response(response).await
        }
    }

    async fn put<T: DeserializeOwned, B: Serialize>(&self, url: &str, body: &B) -> AccessResult<T> {
        debug!("access PUT {}", url);
        let response = self
            .http_client
            .put(url)
            .header("X-API-Key", &self.api_key)
            .json(body)
            .send()
            .await?;
        self.handle_response(response).await
    }

    async fn delete(&self, url: &str) -> AccessResult<()> {
        debug!("access DELETE {}", url);
        let response = self
            .http_client
            .delete(url)
            .header("X-API-Key", &self.api_key)
            .send()
            .await?;
        let status = response.status();
        if status == StatusCode::NO_CONTENT || status.is_success() {
            Ok(())
        } else {
            self.handle_error_response(response).await
        }
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> AccessResult<T> {
        let status = response.status();
        if status.is_success() {
            let body = response.text().await?;
            serde_json::from_str(&body)
                .map_err(|e| AccessError::Parse(format!("failed to parse response: {e}")))
        } else {
            self.handle_error_response(response).await
        }
    }

    async fn handle_error_response<T>(&self, response: reqwest::Response) -> AccessResult<T> {
        let status = response.status();
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());

        match status {
            StatusCode::NOT_FOUND => Err(AccessError::NotFound(body)),
            StatusCode::CONFLICT => Err(AccessError::Conflict(body)),
            StatusCode::TOO_MANY_REQUESTS => {
                warn!("access-control service rate limited, retry after {:?}s", retry_after);
                Err(AccessError::RateLimited {
                    retry_after_secs: retry_after,
                })
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AccessError::Auth(format!(
                "HTTP {status}: {body}"
            ))),
            _ => {
                let detail = if body.is_empty() {
                    format!("HTTP {status}")
                } else {
                    body
                };
                Err(AccessError::Api {
                    status: status.as_u16(),
                    detail,
                })
            }
        }
    }
}

#[async_trait]
impl AccessApi for AccessClient {
    async fn list_persons(&self, offset: usize, limit: usize) -> AccessResult<Vec<AccessPerson>> {
        self.list_page("persons", offset, limit).await
    }

    async fn create_person(&self, request: &PersonRequest) -> AccessResult<AccessPerson> {
        let url = format!("{}/persons", self.base_url);
        self.post(&url, request).await
    }

    async fn update_person(&self, id: i64, request: &PersonRequest) -> AccessResult<AccessPerson> {
        let url = format!("{}/persons/{}", self.base_url, id);
        self.put(&url, request).await
    }

    async fn delete_person(&self, id: i64) -> AccessResult<()> {
        let url = format!("{}/persons/{}", self.base_url, id);
        self.delete(&url).await
    }

    async fn list_phones(&self, offset: usize, limit: usize) -> AccessResult<Vec<PhoneMedium>> {
        self.list_page("media/phones", offset, limit).await
    }

    async fn create_phone(&self, request: &PhoneRequest) -> AccessResult<PhoneMedium> {
        let url = format!("{}/media/phones", self.base_url);
        self.post(&url, request).await
    }

    async fn update_phone(&self, id: i64, request: &PhoneRequest) -> AccessResult<PhoneMedium> {
        let url = format!("{}/media/phones/{}", self.base_url, id);
        self.put(&url, request).await
    }

    async fn delete_phone(&self, id: i64) -> AccessResult<()> {
        let url = format!("{}/media/phones/{}", self.base_url, id);
        self.delete(&url).await
    }

    async fn assign_phone(&self, phone_id: i64, person_id: i64) -> AccessResult<()> {
        let url = format!("{}/media/phones/{}/assignment", self.base_url, phone_id);
        self.post_no_content(&url, &AssignmentRequest { person_id })
            .await
    }

    async fn list_authorizations(
        &self,
        offset: usize,
        limit: usize,
    ) -> AccessResult<Vec<AreaAuthorization>> {
        self.list_page("authorizations", offset, limit).await
    }

    async fn create_authorization(
        &self,
        person_id: i64,
        area_id: i64,
    ) -> AccessResult<AreaAuthorization> {
        let url = format!("{}/authorizations", self.base_url);
        self.post(&url, &AuthorizationRequest { person_id, area_id })
            .await
    }

    async fn request_authorization_deletion(&self, authorization_ids: &[i64]) -> AccessResult<()> {
        let url = format!("{}/authorizations/deletion-requests", self.base_url);
        self.post_no_content(&url, &AuthorizationDeletionRequest { authorization_ids })
            .await
    }

    async fn generate_pairing_code(&self, phone_id: i64) -> AccessResult<PhoneMedium> {
        let url = format!("{}/media/phones/{}/pairing", self.base_url, phone_id);
        self.post(&url, &serde_json::json!({})).await
    }

    async fn send_registration_code(&self, phone_id: i64) -> AccessResult<()> {
        let url = format!("{}/media/phones/{}/registration-code", self.base_url, phone_id);
        self.post_no_content(&url, &serde_json::json!({})).await
    }
}
