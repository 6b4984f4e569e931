use serde_json::json;
use supervision_backend::db::enums::NotificationStatus;
use supervision_backend::db::models::notification::SendBulkRequest;
use supervision_backend::services::notifications_service::{compose_bulk, read_status, render_template};
use uuid::Uuid;
use validator::Validate;

fn bulk(recipients: usize) -> SendBulkRequest {
    SendBulkRequest {
        title: Some("防汛值班安排".into()),
        content: Some("请各部门于周五前报送值班表".into()),
        recipient_ids: (0..recipients).map(|_| Uuid::new_v4()).collect(),
        ..Default::default()
    }
}

#[test]
fn bulk_request_validation() {
    assert!(bulk(3).validate().is_ok());
    assert!(bulk(0).validate().is_err());

    let req = SendBulkRequest { priority: Some(9), ..bulk(1) };
    assert!(req.validate().is_err());

    let req = SendBulkRequest { title: Some(String::new()), ..bulk(1) };
    assert!(req.validate().is_err());
}

#[test]
fn bulk_send_delivers_in_app_immediately() {
    let sender = Uuid::new_v4();
    let now = chrono::Utc::now();
    let rows = compose_bulk(&bulk(2), None, sender, now).unwrap();
    assert_eq!(rows.len(), 2);
    for row in &rows {
        assert_eq!(row.status, NotificationStatus::Sent);
        assert_eq!(row.sender_id, Some(sender));
        assert_eq!(row.channels, json!(["system"]));
        assert_eq!(read_status(row.status), NotificationStatus::Read);
    }
}

#[test]
fn template_placeholders() {
    let vars = json!({"number": "DB20240601", "days": 2});
    assert_eq!(
        render_template("事项 {number} 已逾期 {days} 天", &vars),
        "事项 DB20240601 已逾期 2 天"
    );
}
