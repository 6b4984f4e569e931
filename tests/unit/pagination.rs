use supervision_backend::db::models::api::{MAX_PAGE_SIZE, Page, PageQuery, total_pages};

fn query(page: Option<i64>, size: Option<i64>, skip: Option<i64>, limit: Option<i64>) -> PageQuery {
    PageQuery { page, size, skip, limit }
}

#[test]
fn page_and_size_map_to_offset() {
    let params = query(Some(3), Some(10), None, None).normalize();
    assert_eq!(params.page, 3);
    assert_eq!(params.size, 10);
    assert_eq!(params.offset, 20);
}

#[test]
fn skip_and_limit_take_precedence() {
    let params = query(Some(9), Some(50), Some(40), Some(20)).normalize();
    assert_eq!(params.offset, 40);
    assert_eq!(params.size, 20);
    assert_eq!(params.page, 3);
}

#[test]
fn out_of_range_values_are_clamped() {
    let params = query(Some(0), Some(10_000), None, None).normalize();
    assert_eq!(params.page, 1);
    assert_eq!(params.size, MAX_PAGE_SIZE);

    let params = query(None, None, Some(-5), Some(0)).normalize();
    assert_eq!(params.offset, 0);
    assert_eq!(params.size, 1);
}

#[test]
fn last_page_and_beyond() {
    // 41 条，每页 10 条：第 5 页只有 1 条，第 6 页为空但 total 不变
    let params = query(Some(5), Some(10), None, None).normalize();
    let last = Page::new(vec![41], 41, params);
    assert_eq!(last.pages, 5);
    assert_eq!(last.items.len(), 1);

    let params = query(Some(6), Some(10), None, None).normalize();
    let beyond: Page<i32> = Page::new(vec![], 41, params);
    assert!(beyond.items.is_empty());
    assert_eq!(beyond.total, 41);
    assert_eq!(beyond.page, 6);
}

#[test]
fn total_pages_rounds_up() {
    assert_eq!(total_pages(0, 20), 0);
    assert_eq!(total_pages(20, 20), 1);
    assert_eq!(total_pages(21, 20), 2);
}
