use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use supervision_backend::client::{ApiClient, ClientError, ListQuery, MemorySessionStore, ReqwestTransport};
use supervision_backend::db::enums::{SupervisionStatus, Urgency};
use supervision_backend::db::models::supervision::CreateSupervisionRequest;

mod unit;

// 端到端用例需要已启动的服务和一个可登录的账号
fn base_url() -> String {
    std::env::var("E2E_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:8000/api/v1".to_string())
}

fn credentials() -> (String, String) {
    (
        std::env::var("E2E_USERNAME").unwrap_or_else(|_| "admin".to_string()),
        std::env::var("E2E_PASSWORD").unwrap_or_else(|_| "Admin@123".to_string()),
    )
}

fn client() -> ApiClient {
    let transport = ReqwestTransport::new(&base_url(), Duration::from_secs(10)).unwrap();
    ApiClient::new(transport, Arc::new(MemorySessionStore::new()))
}

async fn logged_in() -> ApiClient {
    let client = client();
    let (username, password) = credentials();
    client.login(&username, &password).await.unwrap();
    client
}

fn item_request(title: &str, deadline_offset_days: i64) -> CreateSupervisionRequest {
    CreateSupervisionRequest {
        title: title.to_string(),
        content: "端到端测试事项".to_string(),
        item_type: None,
        urgency: Some(Urgency::High),
        responsible_department_id: None,
        cooperating_departments: Vec::new(),
        source: Some("e2e".to_string()),
        start_date: None,
        deadline: Some(Utc::now() + chrono::Duration::days(deadline_offset_days)),
        expected_result: None,
        is_public: false,
        is_key: false,
        tags: vec!["e2e".to_string()],
    }
}

#[tokio::test]
#[ignore = "requires running server"]
async fn test_login_and_me() {
    let client = logged_in().await;
    assert!(client.is_authenticated());

    let me = client.me().await.unwrap();
    assert_eq!(me.username, credentials().0);

    client.logout().await.unwrap();
    assert!(!client.is_authenticated());
    assert!(matches!(client.me().await, Err(ClientError::NotAuthenticated)));
}

#[tokio::test]
#[ignore = "requires running server"]
async fn test_wrong_password_is_rejected() {
    let client = client();
    let err = client.login(&credentials().0, "definitely-wrong").await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert!(!client.is_authenticated());
}

#[tokio::test]
#[ignore = "requires running server"]
async fn test_past_deadline_item_is_listed_as_overdue() {
    let client = logged_in().await;
    let created = client.create_item(&item_request("逾期事项", -2)).await.unwrap();
    assert_eq!(created.status, SupervisionStatus::Draft);
    assert!(created.number.starts_with("DB"));

    let overdue = client.overdue_items().await.unwrap();
    assert!(overdue.iter().any(|i| i.id == created.id));

    client.delete_item(created.id).await.unwrap();
}

#[tokio::test]
#[ignore = "requires running server"]
async fn test_listing_beyond_last_page_is_empty() {
    let client = logged_in().await;
    let page = client.list_items(&ListQuery::new().page(10_000, 10)).await.unwrap();
    assert!(page.items.is_empty());
}

#[tokio::test]
#[ignore = "requires running server"]
async fn test_export_is_csv() {
    let client = logged_in().await;
    let bytes = client.export_items(&ListQuery::new()).await.unwrap();
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.starts_with('\u{feff}'));
    assert!(text.contains("\r\n"));
}
