use super::{Upstream, UpstreamFailure};
use crate::config::AccessConfig;
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Method;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Which remote service an [`HttpUpstream`] talks to; decides routing and auth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceKind {
    /// Note/document service (`/v1/notes`, `/v1/search-notes`), bearer auth.
    Notes,
    /// Generative language model service, `x-goog-api-key` auth.
    LanguageModel { model: String },
}

#[derive(Debug, Clone, PartialEq)]
struct Route {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
}

impl Route {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    fn query(mut self, name: &str, value: impl Into<String>) -> Self {
        self.query.push((name.to_string(), value.into()));
        self
    }

    fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// reqwest-backed [`Upstream`] that maps operation names onto HTTP routes.
pub struct HttpUpstream {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    service: ServiceKind,
}

impl HttpUpstream {
    pub fn new(
        service: ServiceKind,
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .build()
            .map_err(|e| {
                Error::from(TransportError::Http(e))
                    .with_context(ErrorContext::new().with_source("http_upstream"))
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            service,
        })
    }

    /// Upstream for the note service described by `config`.
    pub fn note_service(config: &AccessConfig) -> Result<Self> {
        Self::new(
            ServiceKind::Notes,
            &config.notes_base_url,
            config.notes_api_key.clone(),
            config.http_timeout,
        )
    }

    /// Upstream for the language-model service described by `config`.
    pub fn language_model(config: &AccessConfig) -> Result<Self> {
        Self::new(
            ServiceKind::LanguageModel {
                model: config.llm_model.clone(),
            },
            &config.llm_base_url,
            config.llm_api_key.clone(),
            config.http_timeout,
        )
    }

    fn resolve(&self, operation: &str, payload: &Value) -> std::result::Result<Route, UpstreamFailure> {
        match &self.service {
            ServiceKind::Notes => Self::resolve_notes(operation, payload),
            ServiceKind::LanguageModel { model } => Self::resolve_model(model, operation, payload),
        }
    }

    fn resolve_notes(operation: &str, payload: &Value) -> std::result::Result<Route, UpstreamFailure> {
        let route = match operation {
            "get_note" => Route::new(Method::GET, format!("/v1/notes/{}", required_id(payload)?)),
            "list_notes" => Route::new(Method::GET, "/v1/search-notes").query("type", "note"),
            "search_notes" => {
                let hits = payload
                    .get("hits_per_page")
                    .and_then(Value::as_u64)
                    .unwrap_or(10);
                Route::new(Method::GET, "/v1/search-notes")
                    .query("query", required_str(payload, "query")?)
                    .query("type", "note")
                    .query("hitsPerPage", hits.to_string())
            }
            "list_folders" => Route::new(Method::GET, "/v1/search-notes").query("type", "folder"),
            "search_folder" => Route::new(Method::GET, "/v1/search-notes")
                .query("q", required_str(payload, "name")?)
                .query("type", "folder"),
            "create_note" | "create_folder" => {
                Route::new(Method::POST, "/v1/notes").body(payload.clone())
            }
            "update_note" | "rename_folder" => {
                let id = required_id(payload)?;
                Route::new(Method::PUT, format!("/v1/notes/{}", id)).body(without(payload, "id"))
            }
            "delete_note" | "delete_folder" => {
                Route::new(Method::DELETE, format!("/v1/notes/{}", required_id(payload)?))
            }
            other => {
                return Err(UpstreamFailure::invalid(format!(
                    "note service has no route for operation '{}'",
                    other
                )))
            }
        };
        Ok(route)
    }

    fn resolve_model(
        default_model: &str,
        operation: &str,
        payload: &Value,
    ) -> std::result::Result<Route, UpstreamFailure> {
        match operation {
            "generate" => {
                let model = payload
                    .get("model")
                    .and_then(Value::as_str)
                    .filter(|m| !m.is_empty())
                    .unwrap_or(default_model);
                Ok(
                    Route::new(Method::POST, format!("/v1beta/models/{}:generateContent", model))
                        .body(without(payload, "model")),
                )
            }
            other => Err(UpstreamFailure::invalid(format!(
                "language model service has no route for operation '{}'",
                other
            ))),
        }
    }

    fn network_failure(err: reqwest::Error) -> UpstreamFailure {
        let failure = UpstreamFailure::network(err.to_string());
        if err.is_timeout() {
            failure.with_code("timeout")
        } else {
            failure
        }
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn call(
        &self,
        operation: &str,
        payload: &Value,
    ) -> std::result::Result<Value, UpstreamFailure> {
        let route = self.resolve(operation, payload)?;
        let request_id = Uuid::new_v4().to_string();
        let url = format!("{}{}", self.base_url, route.path);

        let mut req = self
            .client
            .request(route.method.clone(), &url)
            .header("accept", "application/json")
            .header("x-request-id", request_id.as_str());

        if let Some(key) = &self.api_key {
            req = match self.service {
                ServiceKind::Notes => req.bearer_auth(key),
                ServiceKind::LanguageModel { .. } => req.header("x-goog-api-key", key),
            };
        }
        if !route.query.is_empty() {
            req = req.query(&route.query);
        }
        if let Some(body) = &route.body {
            req = req.json(body);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| Self::network_failure(e).with_request_id(request_id.as_str()))?;
        let status = resp.status().as_u16();

        if !resp.status().is_success() {
            let retry_after = retry_after(resp.headers());
            let body = resp.text().await.unwrap_or_default();
            let mut failure =
                UpstreamFailure::http(status, error_message(&body)).with_request_id(request_id);
            if let Some(code) = error_code(&body) {
                failure = failure.with_code(code);
            }
            if let Some(after) = retry_after {
                failure = failure.with_retry_after(after);
            }
            debug!(
                operation,
                http_status = status,
                method = %route.method,
                path = route.path.as_str(),
                "upstream returned an error status"
            );
            return Err(failure);
        }

        if status == 204 {
            return Ok(json!({}));
        }
        let text = resp
            .text()
            .await
            .map_err(|e| Self::network_failure(e).with_request_id(request_id.as_str()))?;
        if text.trim().is_empty() {
            return Ok(json!({}));
        }
        serde_json::from_str(&text).map_err(|e| {
            UpstreamFailure::http(status, format!("invalid JSON in response: {}", e))
                .with_request_id(request_id)
        })
    }

    fn name(&self) -> &'static str {
        match self.service {
            ServiceKind::Notes => "notes_http",
            ServiceKind::LanguageModel { .. } => "language_model_http",
        }
    }
}

fn required_str<'a>(payload: &'a Value, field: &str) -> std::result::Result<&'a str, UpstreamFailure> {
    payload
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| UpstreamFailure::invalid(format!("payload field '{}' is required", field)))
}

fn required_id(payload: &Value) -> std::result::Result<&str, UpstreamFailure> {
    let id = required_str(payload, "id")?;
    if id.contains('/') || id.contains('?') || id.contains('#') {
        return Err(UpstreamFailure::invalid(format!("'{}' is not a valid note id", id)));
    }
    Ok(id)
}

fn without(payload: &Value, field: &str) -> Value {
    match payload {
        Value::Object(map) => {
            let mut map = map.clone();
            map.remove(field);
            Value::Object(map)
        }
        other => other.clone(),
    }
}

fn header_first(headers: &HeaderMap, names: &[&str]) -> Option<String> {
    for name in names {
        if let Some(v) = headers.get(*name) {
            if let Ok(s) = v.to_str() {
                let s = s.trim();
                if !s.is_empty() {
                    return Some(s.to_string());
                }
            }
        }
    }
    None
}

/// Only the `Retry-After: <seconds>` form is supported.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let raw = header_first(headers, &["retry-after", "x-ratelimit-reset"])?;
    let secs: u64 = raw.parse().ok()?;
    Some(Duration::from_secs(secs))
}

fn error_code(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    let error = json.get("error");
    error
        .and_then(|e| e.get("code"))
        .and_then(Value::as_str)
        .or_else(|| error.and_then(|e| e.get("status")).and_then(Value::as_str))
        .or_else(|| json.get("code").and_then(Value::as_str))
        .map(|s| s.to_lowercase())
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| {
            json.get("error")
                .and_then(|e| e.get("message"))
                .or_else(|| json.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
