/// Pipoqueiro REST API provider
///
/// Endpoints, per list kind (`favorites` or `watchlist`):
/// - `GET    {api_url}/api/{kind}`           → every entry of the list
/// - `POST   {api_url}/api/{kind}`           → add `{ "tmdb_id": <id> }`
/// - `DELETE {api_url}/api/{kind}/{item_id}` → remove one movie
///
/// Every request carries the session's bearer token and a fresh
/// `x-request-id` so backend logs can be matched with ours.
use reqwest::{Client as HttpClient, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    config::Config,
    error::{AppError, AppResult},
    models::{ItemId, ListEntry, ListKind},
    services::remote::RemoteListService,
    session::{AuthToken, SessionState},
};

/// HTTP header name for request ID
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// List payloads come either bare or wrapped in the backend's envelope
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListResponse {
    Bare(Vec<ListEntry>),
    Envelope {
        #[serde(default)]
        success: Option<bool>,
        #[serde(default)]
        data: Vec<ListEntry>,
        #[serde(default)]
        message: Option<String>,
    },
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Clone)]
pub struct PipoqueiroListService {
    http_client: HttpClient,
    api_url: String,
    session: SessionState,
}

impl PipoqueiroListService {
    pub fn new(
        api_url: impl Into<String>,
        session: SessionState,
        timeout: Duration,
    ) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;
        let api_url = api_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            http_client,
            api_url,
            session,
        })
    }

    pub fn from_config(config: &Config, session: SessionState) -> AppResult<Self> {
        Self::new(config.api_url.clone(), session, config.request_timeout())
    }

    fn list_url(&self, list: ListKind) -> String {
        format!("{}/api/{}", self.api_url, list)
    }

    fn bearer(&self) -> AppResult<AuthToken> {
        self.session.token().ok_or(AppError::Unauthenticated)
    }

    /// Sends an authenticated request and maps non-success statuses to errors
    async fn send(
        &self,
        request: RequestBuilder,
        list: ListKind,
        operation: &'static str,
    ) -> AppResult<Response> {
        let token = self.bearer()?;
        let request_id = Uuid::new_v4();

        let response = request
            .bearer_auth(token.expose())
            .header(REQUEST_ID_HEADER, request_id.to_string())
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(
                request_id = %request_id,
                list = %list,
                operation,
                status = %status,
                "Remote list request succeeded"
            );
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::error!(
            request_id = %request_id,
            list = %list,
            operation,
            status = %status,
            body = %body,
            "Remote list request failed"
        );

        Err(status_error(status, &body))
    }
}

/// Maps a failed response to an error, preferring the backend's own message
fn status_error(status: StatusCode, body: &str) -> AppError {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return AppError::Unauthenticated;
    }

    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .message
        .or(parsed.error)
        .unwrap_or_else(|| match status {
            StatusCode::CONFLICT => "already present".to_string(),
            StatusCode::NOT_FOUND => "not present".to_string(),
            _ => status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string(),
        });

    AppError::remote(status, message)
}

fn into_entries(response: ListResponse) -> AppResult<Vec<ListEntry>> {
    match response {
        ListResponse::Bare(entries) => Ok(entries),
        ListResponse::Envelope {
            success: Some(false),
            message,
            ..
        } => Err(AppError::remote(
            StatusCode::OK,
            message.unwrap_or_else(|| "request reported failure".to_string()),
        )),
        ListResponse::Envelope { data, .. } => Ok(data),
    }
}

#[async_trait::async_trait]
impl RemoteListService for PipoqueiroListService {
    #[instrument(skip(self), fields(provider = "pipoqueiro"))]
    async fn fetch_all(&self, list: ListKind) -> AppResult<Vec<ListEntry>> {
        let request = self.http_client.get(self.list_url(list));
        let response = self.send(request, list, "fetch_all").await?;

        let payload: ListResponse = response.json().await?;
        let entries = into_entries(payload)?;

        tracing::info!(entries = entries.len(), "List fetched");

        Ok(entries)
    }

    #[instrument(skip(self), fields(provider = "pipoqueiro"))]
    async fn add(&self, list: ListKind, item: ItemId) -> AppResult<()> {
        let request = self
            .http_client
            .post(self.list_url(list))
            .json(&json!({ "tmdb_id": item.get() }));
        self.send(request, list, "add").await?;

        tracing::info!("Item added");
        Ok(())
    }

    #[instrument(skip(self), fields(provider = "pipoqueiro"))]
    async fn remove(&self, list: ListKind, item: ItemId) -> AppResult<()> {
        let url = format!("{}/{}", self.list_url(list), item);
        let request = self.http_client.delete(url);
        self.send(request, list, "remove").await?;

        tracing::info!("Item removed");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "pipoqueiro"
    }
}
