//! HTTP client bound to the ActiveTigger API.
//!
//! [`ApiClient`] wraps a single `reqwest::Client`, a base URL, and the
//! credential store. It exposes [`get`](ApiClient::get) and
//! [`post`](ApiClient::post) typed against the [`Route`] contract, plus
//! [`get_blob`](ApiClient::get_blob) for file downloads.
//!
//! # Auth interception
//!
//! Before each request the client asks [`auth_headers`] for the current
//! credential headers and inserts each one only when the caller has not set
//! it already. Without a stored credential the request goes out
//! unauthenticated and the server's 401 comes back as an ordinary
//! [`ApiError::Http`].
//!
//! # Results
//!
//! Every call resolves to `Result<T, ApiError>`. Non-2xx statuses become
//! [`ApiError::Http`] carrying the status and the server's `detail`
//! message. Empty and `null` bodies decode into `()`; mutations whose
//! reply is irrelevant use [`post_unit`](ApiClient::post_unit).

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ApiConfig;
use crate::credential::{auth_headers, CredentialStore};
use crate::error::ApiError;
use crate::routes::Route;

/// Request body variants accepted by the API.
#[derive(Debug, Clone, Default)]
pub enum Body {
    #[default]
    Empty,
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
    /// A JSON body that failed to encode; sending it yields [`ApiError::Request`].
    Unencodable(String),
}

/// Per-call options: query string, body, and extra headers.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub query: Vec<(String, String)>,
    pub body: Body,
    pub headers: HeaderMap,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Adds a query parameter only when a value is present.
    pub fn query_opt(self, key: &str, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    pub fn json<B: Serialize>(mut self, body: &B) -> Self {
        self.body = match serde_json::to_value(body) {
            Ok(value) => Body::Json(value),
            Err(e) => Body::Unencodable(e.to_string()),
        };
        self
    }

    pub fn form(mut self, fields: Vec<(String, String)>) -> Self {
        self.body = Body::Form(fields);
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// Inserts credential headers into `headers` without overwriting any header
/// the caller already set.
pub fn apply_auth(headers: &mut HeaderMap, store: &dyn CredentialStore) {
    if let Some(auth) = auth_headers(store) {
        for (name, value) in auth.iter() {
            if !headers.contains_key(name) {
                headers.insert(name.clone(), value.clone());
            }
        }
    }
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn CredentialStore>,
}

impl ApiClient {
    /// Creates a client with the transport's default timeout behavior.
    pub fn new(base_url: &str, credentials: Arc<dyn CredentialStore>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self::with_http(http, base_url, credentials))
    }

    /// Creates a client from the `[api]` config section.
    ///
    /// A timeout is applied only when `timeout_secs` is set.
    pub fn from_config(
        config: &ApiConfig,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self::with_http(builder.build()?, &config.base_url, credentials))
    }

    fn with_http(
        http: reqwest::Client,
        base_url: &str,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            credentials,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    /// Sends a GET route and decodes the JSON response.
    pub async fn get<T: DeserializeOwned>(
        &self,
        route: &Route,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let response = self.send(Method::GET, route, options).await?;
        decode_json(response).await
    }

    /// Sends a POST route and decodes the JSON response.
    pub async fn post<T: DeserializeOwned>(
        &self,
        route: &Route,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let response = self.send(Method::POST, route, options).await?;
        decode_json(response).await
    }

    /// Sends a POST route and ignores the response body.
    pub async fn post_unit(&self, route: &Route, options: RequestOptions) -> Result<(), ApiError> {
        self.send(Method::POST, route, options).await?;
        Ok(())
    }

    /// Sends a POST route and returns the success status code.
    pub async fn post_status(&self, route: &Route, options: RequestOptions) -> Result<u16, ApiError> {
        let response = self.send(Method::POST, route, options).await?;
        Ok(response.status().as_u16())
    }

    /// Sends a GET route and returns the raw response bytes.
    pub async fn get_blob(&self, route: &Route, options: RequestOptions) -> Result<Vec<u8>, ApiError> {
        let response = self.send(Method::GET, route, options).await?;
        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }

    fn url(&self, route: &Route) -> String {
        format!("{}{}", self.base_url, route.path())
    }

    async fn send(
        &self,
        expected: Method,
        route: &Route,
        options: RequestOptions,
    ) -> Result<reqwest::Response, ApiError> {
        if route.method() != expected {
            return Err(ApiError::Request(format!(
                "{} cannot be sent as {}",
                route, expected
            )));
        }

        let RequestOptions {
            query,
            body,
            mut headers,
        } = options;
        apply_auth(&mut headers, self.credentials.as_ref());

        let mut builder = self.http.request(expected, self.url(route));
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        builder = match body {
            Body::Empty => builder,
            Body::Json(value) => builder.json(&value),
            Body::Form(fields) => builder.form(&fields),
            Body::Unencodable(message) => return Err(ApiError::Request(message)),
        };
        builder = builder.headers(headers);

        tracing::debug!(route = %route, "sending request");
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = ApiError::from_response(status.as_u16(), &body);
        tracing::warn!(route = %route, status = status.as_u16(), error = %err, "request failed");
        Err(err)
    }
}

async fn decode_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let text = response.text().await?;
    let text = if text.trim().is_empty() { "null" } else { text.as_str() };
    serde_json::from_str(text).map_err(ApiError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::{Credential, MemoryCredentialStore};
    use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};

    fn logged_in() -> MemoryCredentialStore {
        MemoryCredentialStore::with_credential(Credential {
            username: "ada".to_string(),
            token: "tok".to_string(),
        })
    }

    #[test]
    fn auth_is_added_when_absent() {
        let mut headers = HeaderMap::new();
        apply_auth(&mut headers, &logged_in());
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer tok");
        assert_eq!(headers.get("username").unwrap(), "ada");
    }

    #[test]
    fn caller_headers_are_not_overwritten() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer other"));
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        apply_auth(&mut headers, &logged_in());
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer other");
        assert_eq!(
            headers.get(CONTENT_TYPE).unwrap(),
            "application/x-www-form-urlencoded"
        );
        assert_eq!(headers.get("username").unwrap(), "ada");
    }

    #[test]
    fn nothing_added_when_logged_out() {
        let mut headers = HeaderMap::new();
        apply_auth(&mut headers, &MemoryCredentialStore::new());
        assert!(headers.is_empty());
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client =
            ApiClient::new(" http://localhost:5000/ ", Arc::new(MemoryCredentialStore::new()))
                .unwrap();
        assert_eq!(client.base_url(), "http://localhost:5000");
        assert_eq!(client.url(&Route::Queue), "http://localhost:5000/queue");
    }

    #[test]
    fn options_builder_collects_query() {
        let options = RequestOptions::new()
            .query("project_slug", "p1")
            .query_opt("scheme", Some("default"))
            .query_opt("label", None::<&str>);
        assert_eq!(
            options.query,
            vec![
                ("project_slug".to_string(), "p1".to_string()),
                ("scheme".to_string(), "default".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn wrong_method_is_a_request_error() {
        let client =
            ApiClient::new("http://127.0.0.1:9", Arc::new(MemoryCredentialStore::new())).unwrap();
        let err = client
            .get::<serde_json::Value>(&Route::ProjectNew, RequestOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Request(_)));
    }
}
