//! CANAGROSA REST client.
//!
//! Thin async wrapper over `reqwest` that attaches the bearer token, maps
//! HTTP failures to [`ApiError`] and prefers the server's own error message
//! over generic text. There are no retries: a failed request is reported
//! once and the caller decides whether to try again.

use std::time::Duration;

use reqwest::{header, Client, Method, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::auth::{BearerAuth, TokenStore};
use super::error::{ApiError, Result};
use super::types::{CatalogItem, Lookup, Page};
use crate::catalog::Entity;
use crate::config::Profile;
use crate::table::Row;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// The REST client. Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    auth: BearerAuth,
}

impl ApiClient {
    /// Create a client for `profile`, reading its token from `tokens`.
    #[instrument(skip(profile, tokens), fields(profile_name = %profile.name))]
    pub fn new(profile: &Profile, tokens: &dyn TokenStore) -> Result<Self> {
        let auth = BearerAuth::from_store(tokens, &profile.name)?;
        let client = Self::with_auth(&profile.url, auth)?;
        info!(base_url = %client.base_url, "Created API client");
        Ok(client)
    }

    /// Create a client with an explicit token.
    pub fn with_token(base_url: &str, token: &str) -> Result<Self> {
        Self::with_auth(base_url, BearerAuth::new(token))
    }

    fn with_auth(base_url: &str, auth: BearerAuth) -> Result<Self> {
        let base_url = normalize_base_url(base_url)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(ApiError::Network)?;
        Ok(Self {
            client,
            base_url,
            auth,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /<group>/list?page=&pageSize=`
    #[instrument(skip(self), fields(group = entity.path()))]
    pub async fn list_page(&self, entity: Entity, page: u32, page_size: u32) -> Result<Page> {
        let url = format!(
            "{}/{}/list?page={}&pageSize={}",
            self.base_url,
            entity.path(),
            page,
            page_size
        );
        let value = self.request(Method::GET, &url, None).await?;
        let page = Page::from_value(value, page, page_size)?;
        debug!(rows = page.rows.len(), has_more = page.has_more, "Fetched page");
        Ok(page)
    }

    /// `GET /<group>/<id>`
    #[instrument(skip(self), fields(group = entity.path()))]
    pub async fn get_record(&self, entity: Entity, id: &str) -> Result<Row> {
        let url = self.record_url(entity, id);
        let value = self.request(Method::GET, &url, None).await?;
        into_record(value)
    }

    /// `POST /<group>`
    #[instrument(skip(self, record), fields(group = entity.path()))]
    pub async fn create_record(&self, entity: Entity, record: &Row) -> Result<Row> {
        let url = format!("{}/{}", self.base_url, entity.path());
        let value = self
            .request(Method::POST, &url, Some(Value::Object(record.clone())))
            .await?;
        into_record(value)
    }

    /// `PUT /<group>/<id>`
    #[instrument(skip(self, record), fields(group = entity.path()))]
    pub async fn update_record(&self, entity: Entity, id: &str, record: &Row) -> Result<Row> {
        let url = self.record_url(entity, id);
        let value = self
            .request(Method::PUT, &url, Some(Value::Object(record.clone())))
            .await?;
        into_record(value)
    }

    /// `DELETE /<group>/<id>`
    #[instrument(skip(self), fields(group = entity.path()))]
    pub async fn delete_record(&self, entity: Entity, id: &str) -> Result<()> {
        let url = self.record_url(entity, id);
        self.request(Method::DELETE, &url, None).await?;
        Ok(())
    }

    /// `GET /paises/list`, `GET /provincias/list`, ...
    #[instrument(skip(self))]
    pub async fn list_lookup(&self, lookup: Lookup) -> Result<Vec<CatalogItem>> {
        let url = format!("{}/{}/list", self.base_url, lookup.path());
        let value = self.request(Method::GET, &url, None).await?;
        let items = match value {
            Value::Object(mut object) => object.remove("data").unwrap_or(Value::Null),
            other => other,
        };
        serde_json::from_value(items)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse lookup: {}", e)))
    }

    fn record_url(&self, entity: Entity, id: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            entity.path(),
            urlencoding::encode(id)
        )
    }

    /// Send one request and decode its JSON body. Empty bodies decode as
    /// `null`.
    async fn request(&self, method: Method, url: &str, body: Option<Value>) -> Result<Value> {
        debug!(%method, url, "Sending request");
        let mut request = self
            .client
            .request(method, url)
            .header(header::AUTHORIZATION, self.auth.header_value())
            .header(header::ACCEPT, "application/json");
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;
        Self::handle_response(response).await
    }

    async fn handle_response(response: Response) -> Result<Value> {
        let status = response.status();
        let url = response.url().to_string();
        let body = response.text().await?;

        if status.is_success() {
            if body.trim().is_empty() {
                return Ok(Value::Null);
            }
            serde_json::from_str(&body)
                .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse response: {}", e)))
        } else {
            debug!(%status, body = %body, "Error response");
            if status == StatusCode::UNAUTHORIZED {
                warn!(url = %url, "Request rejected as unauthorized");
            }
            Err(error_from_response(status, &url, &body))
        }
    }
}

/// Build an error from a failed response, preferring the server's message.
///
/// The body is checked for `message`, then `error`, then `errors` (either a
/// list of strings or a field → message map). The URL is the fallback.
pub fn error_from_response(status: StatusCode, url: &str, body: &str) -> ApiError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| server_message(&json))
        .unwrap_or_else(|| url.to_string());
    ApiError::from_status(status, &message)
}

fn server_message(json: &Value) -> Option<String> {
    for field in ["message", "error"] {
        if let Some(text) = json.get(field).and_then(Value::as_str) {
            if !text.trim().is_empty() {
                return Some(text.to_string());
            }
        }
    }
    let parts: Vec<String> = match json.get("errors")? {
        Value::Array(items) => items
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| other.to_string()),
            })
            .collect(),
        Value::Object(fields) => fields
            .iter()
            .map(|(k, v)| match v {
                Value::String(s) => format!("{}: {}", k, s),
                other => format!("{}: {}", k, other),
            })
            .collect(),
        Value::String(s) => vec![s.clone()],
        _ => Vec::new(),
    };
    (!parts.is_empty()).then(|| parts.join(", "))
}

/// Unwrap `{ "data": {...} }` envelopes around single records.
fn into_record(value: Value) -> Result<Row> {
    match value {
        Value::Object(mut object) => match object.remove("data") {
            Some(Value::Object(record)) => Ok(record),
            Some(other) => {
                object.insert("data".to_string(), other);
                Ok(object)
            }
            None => Ok(object),
        },
        Value::Null => Ok(Row::new()),
        _ => Err(ApiError::InvalidResponse(
            "expected a record object".to_string(),
        )),
    }
}

/// Remove trailing slashes and check the scheme.
fn normalize_base_url(url: &str) -> Result<String> {
    let url = url.trim().trim_end_matches('/');
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ApiError::InvalidUrl(url.to_string()));
    }
    if url.starts_with("http://") && !url.contains("localhost") && !url.contains("127.0.0.1") {
        warn!("URL does not use HTTPS: {}. This is insecure for production use.", url);
    }
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_server::serve_once;

    #[test]
    fn test_normalize_base_url_removes_trailing_slash() {
        assert_eq!(
            normalize_base_url("https://api.canagrosa.es/").unwrap(),
            "https://api.canagrosa.es"
        );
        assert_eq!(
            normalize_base_url("https://api.canagrosa.es/v1///").unwrap(),
            "https://api.canagrosa.es/v1"
        );
    }

    #[test]
    fn test_normalize_base_url_rejects_missing_scheme() {
        assert!(matches!(
            normalize_base_url("api.canagrosa.es"),
            Err(ApiError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_error_prefers_server_message() {
        let err = error_from_response(
            StatusCode::CONFLICT,
            "http://x/clientes/1",
            r#"{"message": "El cliente tiene muestras asociadas"}"#,
        );
        assert_eq!(err.to_string(), "Conflict: El cliente tiene muestras asociadas");

        let err = error_from_response(StatusCode::BAD_REQUEST, "u", r#"{"error": "CIF duplicado"}"#);
        assert_eq!(err.to_string(), "Invalid request: CIF duplicado");
    }

    #[test]
    fn test_error_joins_field_errors() {
        let err = error_from_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "u",
            r#"{"errors": {"EMAIL": "formato inválido"}}"#,
        );
        assert_eq!(err.to_string(), "Invalid request: EMAIL: formato inválido");

        let err = error_from_response(StatusCode::BAD_REQUEST, "u", r#"{"errors": ["a", "b"]}"#);
        assert_eq!(err.to_string(), "Invalid request: a, b");
    }

    #[test]
    fn test_error_falls_back_to_url() {
        let err = error_from_response(StatusCode::NOT_FOUND, "http://x/muestras/9", "<html>");
        assert_eq!(err.to_string(), "Not found: http://x/muestras/9");
    }

    #[test]
    fn test_into_record_unwraps_data() {
        let mut inner = Row::new();
        inner.insert("ID".to_string(), Value::from(3));
        let wrapped = serde_json::json!({"data": inner.clone()});
        assert_eq!(into_record(wrapped).unwrap(), inner);
        assert_eq!(into_record(Value::Object(inner.clone())).unwrap(), inner);
        assert!(into_record(Value::from(3)).is_err());
    }

    #[tokio::test]
    async fn test_list_page_sends_bearer_and_paging() {
        let (url, request) = serve_once("200 OK", r#"{"data":[{"ID":1},{"ID":2}],"total":2}"#).await;
        let client = ApiClient::with_token(&url, "tok").unwrap();

        let page = client.list_page(Entity::Clients, 1, 50).await.unwrap();
        assert_eq!(page.rows.len(), 2);
        assert!(!page.has_more);

        let raw = request.await.unwrap().to_lowercase();
        assert!(raw.starts_with("get /clientes/list?page=1&pagesize=50 "));
        assert!(raw.contains("authorization: bearer tok"));
    }

    #[tokio::test]
    async fn test_unauthorized_response() {
        let (url, _request) = serve_once("401 Unauthorized", r#"{"message":"Token expirado"}"#).await;
        let client = ApiClient::with_token(&url, "old").unwrap();
        let err = client.list_page(Entity::Samples, 1, 50).await.unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_delete_accepts_empty_body() {
        let (url, request) = serve_once("204 No Content", "").await;
        let client = ApiClient::with_token(&url, "tok").unwrap();
        client.delete_record(Entity::Users, "u 1").await.unwrap();
        assert!(request.await.unwrap().starts_with("DELETE /usuarios/u%201 "));
    }
}
