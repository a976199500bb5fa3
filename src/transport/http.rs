//! HTTP request transport for the chat integration API
//!
//! Wraps reqwest::Client with API-key injection and status mapping.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use super::RequestTransport;
use crate::error::{Result, ServerError, SessionError};
use crate::models::{Attachment, InitResponse, Message};

const API_KEY_HEADER: &str = "X-API-Key";
const UPLOAD_CAPABILITY: &str = "attachment upload";

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MessagesResponse {
    Wrapped { messages: Vec<serde_json::Value> },
    Bare(Vec<serde_json::Value>),
}

impl MessagesResponse {
    fn into_entries(self) -> Vec<serde_json::Value> {
        match self {
            MessagesResponse::Wrapped { messages } => messages,
            MessagesResponse::Bare(messages) => messages,
        }
    }
}

/// Request transport speaking JSON over HTTPS.
pub struct HttpTransport {
    http: reqwest::Client,
    base: String,
    credential: String,
}

impl HttpTransport {
    pub fn new(endpoint: &str, credential: &str) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint, credential)
    }

    pub fn with_client(http: reqwest::Client, endpoint: &str, credential: &str) -> Self {
        Self {
            http,
            base: endpoint.trim_end_matches('/').to_string(),
            credential: credential.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/integration/{}", self.base, path)
    }

    async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
        capability: Option<&str>,
    ) -> Result<reqwest::Response> {
        let url = self.url(path);
        tracing::debug!("POST {}", url);

        let resp = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, &self.credential)
            .json(body)
            .send()
            .await
            .map_err(|e| SessionError::transport(format!("POST {} failed", url), e))?;

        check_response(resp, capability).await
    }
}

#[async_trait]
impl RequestTransport for HttpTransport {
    async fn init(&self, identity: Option<&str>, display_name: &str) -> Result<InitResponse> {
        let body = serde_json::json!({
            "session_id": identity,
            "display_name": display_name,
        });
        let resp = self.post_json("init", &body, None).await?;
        let init: InitResponse = resp
            .json()
            .await
            .map_err(|e| SessionError::InvalidResponse(format!("init response: {}", e)))?;

        if init.identity.is_empty() {
            return Err(SessionError::InvalidResponse(
                "init response carried an empty session id".to_string(),
            ));
        }
        Ok(init)
    }

    async fn fetch_messages(
        &self,
        identity: &str,
        limit: usize,
        cursor: Option<&str>,
    ) -> Result<Vec<Message>> {
        let url = self.url("messages");
        tracing::debug!("GET {} (limit={}, cursor={:?})", url, limit, cursor);

        let limit = limit.to_string();
        let mut query = vec![("session_id", identity), ("limit", limit.as_str())];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor));
        }

        let resp = self
            .http
            .get(&url)
            .header(API_KEY_HEADER, &self.credential)
            .query(&query)
            .send()
            .await
            .map_err(|e| SessionError::transport(format!("GET {} failed", url), e))?;
        let resp = check_response(resp, None).await?;

        let body: MessagesResponse = resp
            .json()
            .await
            .map_err(|e| SessionError::InvalidResponse(format!("messages response: {}", e)))?;

        Ok(decode_messages(body.into_entries()))
    }

    async fn send_message(
        &self,
        identity: &str,
        content: &str,
        attachments: &[Attachment],
    ) -> Result<()> {
        let body = serde_json::json!({
            "session_id": identity,
            "content": content,
            "attachments": attachments,
        });
        self.post_json("messages", &body, None).await?;
        Ok(())
    }

    async fn upload_attachment(
        &self,
        identity: &str,
        bytes: Vec<u8>,
        name: &str,
        mime_type: &str,
    ) -> Result<Attachment> {
        let url = self.url("upload");
        tracing::debug!("Uploading {} ({} bytes, {}) to {}", name, bytes.len(), mime_type, url);

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(name.to_string())
            .mime_str(mime_type)
            .map_err(|e| SessionError::transport(format!("invalid MIME type {}", mime_type), e))?;
        let form = reqwest::multipart::Form::new()
            .text("session_id", identity.to_string())
            .part("file", part);

        let resp = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, &self.credential)
            .multipart(form)
            .send()
            .await
            .map_err(|e| SessionError::transport(format!("POST {} failed", url), e))?;
        let resp = check_response(resp, Some(UPLOAD_CAPABILITY)).await?;

        resp.json()
            .await
            .map_err(|e| SessionError::InvalidResponse(format!("upload response: {}", e)))
    }
}

/// Decode history entries one by one; a bad entry is dropped, not fatal.
fn decode_messages(entries: Vec<serde_json::Value>) -> Vec<Message> {
    let total = entries.len();
    let messages: Vec<Message> = entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<Message>(entry) {
            Ok(msg) => Some(msg),
            Err(e) => {
                tracing::warn!("Skipping undecodable history message: {}", e);
                None
            }
        })
        .collect();
    if messages.len() < total {
        tracing::debug!("Decoded {}/{} history messages", messages.len(), total);
    }
    messages
}

/// Check HTTP response status code and return a clear error on failure.
async fn check_response(
    resp: reqwest::Response,
    capability: Option<&str>,
) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(status_error(status, &body, capability).into())
}

/// Map a non-2xx status to a server error.
///
/// `capability` names an optional endpoint; 404/405 there means the server
/// build does not ship it, rather than a missing resource.
fn status_error(status: StatusCode, body: &str, capability: Option<&str>) -> ServerError {
    match (status, capability) {
        (StatusCode::UNAUTHORIZED, _) => ServerError::Unauthorized,
        (StatusCode::NOT_FOUND | StatusCode::METHOD_NOT_ALLOWED, Some(capability)) => {
            ServerError::CapabilityNotDeployed {
                capability: capability.to_string(),
                status: status.as_u16(),
            }
        }
        (StatusCode::PAYLOAD_TOO_LARGE, _) => ServerError::PayloadTooLarge {
            detail: server_detail(body),
        },
        _ => ServerError::Status {
            status: status.as_u16(),
            detail: server_detail(body),
        },
    }
}

/// Server-supplied error detail: a JSON `detail`/`message`/`error` string,
/// else the raw body.
fn server_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            ["detail", "message", "error"]
                .iter()
                .find_map(|key| v.get(*key).and_then(|d| d.as_str()).map(String::from))
        })
        .unwrap_or_else(|| body.trim().to_string())
}
