//! Typed client for the `/api/v1` REST surface.
//!
//! The client keeps the token pair in a [`SessionStore`]. A `401` on an
//! authenticated call triggers exactly one refresh; if that succeeds the
//! original request is sent once more, otherwise the session is cleared and
//! [`ClientError::SessionExpired`] is returned.

pub mod error;
pub mod resources;
pub mod session;
pub mod transport;

use std::sync::Arc;

use reqwest::Method;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};

pub use error::{ClientError, ClientResult};
pub use session::{FileSessionStore, MemorySessionStore, Session, SessionStore};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};

use crate::db::models::auth::{LoginResponse, UserInfo};

/// 响应外层 `{success, code, message, data}`，客户端只关心 message 与 data
#[derive(Deserialize, Debug)]
struct Envelope<T> {
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

/// 列表查询参数构造器
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pairs: Vec<(String, String)>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(self, page: i64, size: i64) -> Self {
        self.param("page", page).param("size", size)
    }

    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.pairs.push((key.to_string(), value.to_string()));
        self
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }
}

pub struct ApiClient<T: Transport = ReqwestTransport> {
    transport: T,
    sessions: Arc<dyn SessionStore>,
}

impl<T: Transport> ApiClient<T> {
    pub fn new(transport: T, sessions: Arc<dyn SessionStore>) -> Self {
        Self { transport, sessions }
    }

    pub fn session(&self) -> Option<Session> {
        self.sessions.load()
    }

    pub fn is_authenticated(&self) -> bool {
        self.sessions.load().is_some()
    }

    /// 登录成功后保存会话；失败不写入任何会话
    pub async fn login(&self, username: &str, password: &str) -> ClientResult<UserInfo> {
        let request = HttpRequest::new(Method::POST, "auth/login")
            .with_body(json!({ "username": username, "password": password }));
        let response = self.transport.send(request).await?;
        let tokens: LoginResponse = decode(response)?;
        self.store(&tokens)?;
        Ok(tokens.user)
    }

    /// 服务端注销失败也会清除本地会话
    pub async fn logout(&self) -> ClientResult<()> {
        let result = self.send_unit(HttpRequest::new(Method::POST, "auth/logout")).await;
        self.sessions.clear()?;
        match result {
            Ok(()) | Err(ClientError::SessionExpired) | Err(ClientError::NotAuthenticated) => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn store(&self, tokens: &LoginResponse) -> ClientResult<Session> {
        let session = Session {
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone(),
            user: Some(tokens.user.clone()),
        };
        self.sessions.save(&session)?;
        Ok(session)
    }

    async fn refresh(&self, session: &Session) -> ClientResult<Session> {
        let request = HttpRequest::new(Method::POST, "auth/refresh")
            .with_body(json!({ "refresh_token": session.refresh_token }));
        let response = self.transport.send(request).await?;
        let tokens: LoginResponse = decode(response)?;
        self.store(&tokens)
    }

    /// 发送需认证的请求，处理一次刷新与重试
    pub(crate) async fn execute(&self, mut request: HttpRequest) -> ClientResult<HttpResponse> {
        let session = self.sessions.load().ok_or(ClientError::NotAuthenticated)?;
        request.bearer = Some(session.access_token.clone());

        let response = self.transport.send(request.clone()).await?;
        if response.status != 401 {
            return Ok(response);
        }

        let refreshed = match self.refresh(&session).await {
            Ok(refreshed) => refreshed,
            Err(e) => {
                tracing::debug!(error = %e, "Token refresh failed");
                self.sessions.clear()?;
                return Err(ClientError::SessionExpired);
            }
        };

        request.bearer = Some(refreshed.access_token);
        let retried = self.transport.send(request).await?;
        if retried.status == 401 {
            self.sessions.clear()?;
            return Err(ClientError::SessionExpired);
        }
        Ok(retried)
    }

    pub(crate) async fn send_json<R: DeserializeOwned>(&self, request: HttpRequest) -> ClientResult<R> {
        decode(self.execute(request).await?)
    }

    pub(crate) async fn send_unit(&self, request: HttpRequest) -> ClientResult<()> {
        let response = self.execute(request).await?;
        if response.is_success() {
            Ok(())
        } else {
            Err(status_error(&response))
        }
    }

    pub(crate) async fn send_bytes(&self, request: HttpRequest) -> ClientResult<Vec<u8>> {
        let response = self.execute(request).await?;
        if response.is_success() {
            Ok(response.body)
        } else {
            Err(status_error(&response))
        }
    }

    pub(crate) async fn get<R: DeserializeOwned>(&self, path: &str, query: &ListQuery) -> ClientResult<R> {
        self.send_json(HttpRequest::new(Method::GET, path).with_query(query.pairs.clone()))
            .await
    }

    pub(crate) async fn post<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> ClientResult<R> {
        self.send_json(HttpRequest::new(Method::POST, path).with_body(serde_json::to_value(body)?))
            .await
    }

    pub(crate) async fn put<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> ClientResult<R> {
        self.send_json(HttpRequest::new(Method::PUT, path).with_body(serde_json::to_value(body)?))
            .await
    }
}

fn status_error(response: &HttpResponse) -> ClientError {
    let message = serde_json::from_slice::<Envelope<Value>>(&response.body)
        .ok()
        .and_then(|e| e.message);
    ClientError::Status {
        status: response.status,
        message,
    }
}

fn decode<R: DeserializeOwned>(response: HttpResponse) -> ClientResult<R> {
    if !response.is_success() {
        return Err(status_error(&response));
    }
    let envelope: Envelope<R> = serde_json::from_slice(&response.body)?;
    envelope
        .data
        .ok_or_else(|| ClientError::Decode("response has no data".to_string()))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::{Value, json};

    use super::*;

    /// 按顺序返回预设响应，并记录收到的请求
    #[derive(Default)]
    pub struct ScriptedTransport {
        responses: Mutex<VecDeque<HttpResponse>>,
        pub requests: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedTransport {
        pub fn new(responses: Vec<HttpResponse>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn sent(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, request: HttpRequest) -> ClientResult<HttpResponse> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| ClientError::Network("no scripted response".to_string()))
        }
    }

    pub fn respond(status: u16, body: Value) -> HttpResponse {
        HttpResponse {
            status,
            body: serde_json::to_vec(&body).unwrap(),
        }
    }

    pub fn ok(data: Value) -> HttpResponse {
        respond(200, json!({ "success": true, "code": 200, "message": "ok", "data": data }))
    }

    pub fn failure(status: u16, message: &str) -> HttpResponse {
        respond(status, json!({ "success": false, "code": status, "message": message }))
    }

    pub fn tokens(access: &str) -> HttpResponse {
        ok(json!({
            "access_token": access,
            "refresh_token": format!("{}-refresh", access),
            "token_type": "Bearer",
            "expires_in": 1800,
            "user": {
                "id": "6f1c2b9e-8d3a-4a61-9e0f-0d8f5b3c2a11",
                "username": "zhangsan",
                "real_name": "张三",
                "department_id": null,
                "is_active": true,
                "is_superuser": false,
                "roles": [],
                "permissions": ["supervision:read"]
            }
        }))
    }

    pub fn client_with(responses: Vec<HttpResponse>, session: Option<&str>) -> (ApiClient<ScriptedTransport>, Arc<MemorySessionStore>) {
        let store = Arc::new(MemorySessionStore::new());
        if let Some(access) = session {
            store
                .save(&Session {
                    access_token: access.to_string(),
                    refresh_token: format!("{}-refresh", access),
                    user: None,
                })
                .unwrap();
        }
        (ApiClient::new(ScriptedTransport::new(responses), store.clone()), store)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[tokio::test]
    async fn login_stores_exactly_one_session() {
        let (client, store) = client_with(vec![tokens("first")], None);

        let user = client.login("zhangsan", "Secret123").await.unwrap();
        assert_eq!(user.username, "zhangsan");

        let session = store.load().unwrap();
        assert_eq!(session.access_token, "first");
        assert_eq!(session.refresh_token, "first-refresh");
        assert_eq!(client.transport.sent().len(), 1);
        assert!(client.transport.sent()[0].bearer.is_none());
    }

    #[tokio::test]
    async fn failed_login_leaves_no_session() {
        let (client, store) = client_with(vec![failure(401, "Invalid username or password")], None);

        let err = client.login("zhangsan", "wrong").await.unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.user_message(), "Invalid username or password");
        assert!(store.load().is_none());
    }

    #[tokio::test]
    async fn unauthorized_refreshes_once_and_retries_with_new_token() {
        let (client, store) = client_with(
            vec![
                failure(401, "Token expired"),
                tokens("second"),
                ok(json!({ "updated": 3 })),
            ],
            Some("first"),
        );

        let body: Value = client.get("monitoring/stats", &ListQuery::new()).await.unwrap();
        assert_eq!(body["updated"], 3);

        let sent = client.transport.sent();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0].bearer.as_deref(), Some("first"));
        assert_eq!(sent[1].path, "auth/refresh");
        assert_eq!(sent[1].body.as_ref().unwrap()["refresh_token"], "first-refresh");
        assert_eq!(sent[2].path, "monitoring/stats");
        assert_eq!(sent[2].bearer.as_deref(), Some("second"));
        assert_eq!(store.load().unwrap().access_token, "second");
    }

    #[tokio::test]
    async fn failed_refresh_clears_session_without_retry() {
        let (client, store) = client_with(
            vec![failure(401, "Token expired"), failure(401, "Refresh token has been revoked")],
            Some("first"),
        );

        let err = client
            .get::<Value>("supervision/overdue", &ListQuery::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::SessionExpired));
        assert_eq!(client.transport.sent().len(), 2);
        assert!(store.load().is_none());
    }

    #[tokio::test]
    async fn second_unauthorized_does_not_loop() {
        let (client, store) = client_with(
            vec![failure(401, "expired"), tokens("second"), failure(401, "still expired")],
            Some("first"),
        );

        let err = client.get::<Value>("auth/me", &ListQuery::new()).await.unwrap_err();
        assert!(matches!(err, ClientError::SessionExpired));
        assert_eq!(client.transport.sent().len(), 3);
        assert!(store.load().is_none());
    }

    #[tokio::test]
    async fn missing_session_sends_nothing() {
        let (client, _) = client_with(vec![], None);
        let err = client.get::<Value>("users", &ListQuery::new()).await.unwrap_err();
        assert!(matches!(err, ClientError::NotAuthenticated));
        assert!(client.transport.sent().is_empty());
    }

    #[tokio::test]
    async fn error_payload_message_is_surfaced() {
        let (client, store) = client_with(vec![failure(403, "Missing permission: workflow:manage")], Some("first"));
        let err = client
            .post::<_, Value>("workflow/templates", &json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(403));
        assert_eq!(err.user_message(), "Missing permission: workflow:manage");
        // 403 不触发刷新，也不清除会话
        assert_eq!(client.transport.sent().len(), 1);
        assert!(store.load().is_some());
    }

    #[tokio::test]
    async fn logout_clears_local_session() {
        let (client, store) = client_with(vec![ok(Value::Null)], Some("first"));
        client.logout().await.unwrap();
        assert!(store.load().is_none());
        assert_eq!(client.transport.sent()[0].path, "auth/logout");
    }

    #[test]
    fn list_query_keeps_insertion_order() {
        let query = ListQuery::new().page(2, 10).param("status", "overdue");
        assert_eq!(
            query.pairs(),
            &[
                ("page".to_string(), "2".to_string()),
                ("size".to_string(), "10".to_string()),
                ("status".to_string(), "overdue".to_string()),
            ]
        );
    }
}
