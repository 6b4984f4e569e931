use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use serde_json::Value;

use super::error::{ClientError, ClientResult};

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    /// 相对 API 根路径，例如 `supervision/overdue`
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub bearer: Option<String>,
}

impl HttpRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            bearer: None,
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> ClientResult<HttpResponse>;
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: Client,
    base_url: Url,
}

impl ReqwestTransport {
    pub fn new(base_url: &str, timeout: Duration) -> ClientResult<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        // join 以最后一个 `/` 为基准，根路径必须以 `/` 结尾
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        Ok(Self {
            http,
            base_url: Url::parse(&normalized)?,
        })
    }

    pub fn url_for(&self, path: &str, query: &[(String, String)]) -> ClientResult<Url> {
        let mut url = self.base_url.join(path.trim_start_matches('/'))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> ClientResult<HttpResponse> {
        let url = self.url_for(&request.path, &request.query)?;
        let mut builder = self.http.request(request.method.clone(), url);
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        tracing::debug!(method = %request.method, path = %request.path, status, "API request finished");
        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_keep_the_api_prefix() {
        let transport = ReqwestTransport::new("http://127.0.0.1:8000/api/v1", Duration::from_secs(5)).unwrap();
        let url = transport
            .url_for(
                "/supervision",
                &[("page".to_string(), "2".to_string()), ("status".to_string(), "in_progress".to_string())],
            )
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:8000/api/v1/supervision?page=2&status=in_progress"
        );
    }

    #[test]
    fn trailing_slash_in_base_is_tolerated() {
        let transport = ReqwestTransport::new("http://localhost/api/v1/", Duration::from_secs(5)).unwrap();
        let url = transport.url_for("workflow/my-tasks", &[]).unwrap();
        assert_eq!(url.as_str(), "http://localhost/api/v1/workflow/my-tasks");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(matches!(
            ReqwestTransport::new("not a url", Duration::from_secs(5)),
            Err(ClientError::InvalidUrl(_))
        ));
    }
}
