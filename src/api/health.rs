use axum::http::StatusCode;
use tracing::trace;

pub async fn health_check() -> (StatusCode, &'static str) {
    trace!("Health check");
    (StatusCode::OK, "ok")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check() {
        let (status, body) = health_check().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }
}
