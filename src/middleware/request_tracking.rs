use axum::{
    http::{HeaderMap, HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

/// 请求ID头部名称
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const SLOW_REQUEST_MS: u128 = 1000;

/// 为每个请求生成或沿用请求ID，回写到响应头并记录耗时；
/// 处理器内的日志都挂在带 request_id 的 span 下
pub async fn request_tracking_middleware<B>(mut request: Request<B>, next: Next<B>) -> Response {
    let start_time = Instant::now();
    let request_id = get_or_generate_request_id(request.headers());
    let header_value =
        HeaderValue::from_str(&request_id).unwrap_or_else(|_| HeaderValue::from_static("invalid"));

    request
        .headers_mut()
        .insert(HeaderName::from_static(REQUEST_ID_HEADER), header_value.clone());

    let method = request.method().clone();
    let uri = request.uri().path().to_string();

    let span = info_span!("request", request_id = %request_id);
    let mut response = next.run(request).instrument(span).await;

    let duration_ms = start_time.elapsed().as_millis();
    response
        .headers_mut()
        .insert(HeaderName::from_static(REQUEST_ID_HEADER), header_value);

    let status = response.status();
    if status.is_server_error() || status.is_client_error() {
        warn!(
            request_id = %request_id,
            method = %method,
            uri = %uri,
            status = status.as_u16(),
            duration_ms = %duration_ms,
            "Request completed with error"
        );
    } else {
        info!(
            request_id = %request_id,
            method = %method,
            uri = %uri,
            status = status.as_u16(),
            duration_ms = %duration_ms,
            "Request completed"
        );
    }

    if duration_ms > SLOW_REQUEST_MS {
        warn!(
            request_id = %request_id,
            method = %method,
            uri = %uri,
            duration_ms = %duration_ms,
            "Slow request detected"
        );
    }

    response
}

fn get_or_generate_request_id(headers: &HeaderMap) -> String {
    extract_request_id(headers).unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// 从请求头中提取请求ID
pub fn extract_request_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_incoming_request_id() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("req-42"));
        assert_eq!(get_or_generate_request_id(&headers), "req-42");
    }

    #[test]
    fn test_generates_when_missing() {
        let id = get_or_generate_request_id(&HeaderMap::new());
        assert!(Uuid::parse_str(&id).is_ok());
    }
}
