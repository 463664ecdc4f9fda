use std::net::SocketAddr;
use std::sync::Arc;

use log::debug;
use uuid::Uuid;
use warp::{http::StatusCode, reply, Filter, Rejection, Reply};

use super::types::{
    AcceptedResponse, ApiError, CreateScanRequest, CreateScanResponse, EmailDeliveryRequest,
};
use crate::error_handling::types::ControllerError;
use crate::session_management::controller::LifecycleController;
use crate::session_management::session::Provenance;

fn error_response(err: &ControllerError) -> warp::reply::Response {
    let (status, message) = match err {
        ControllerError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        ControllerError::NotFound => (StatusCode::NOT_FOUND, "Session not found".to_string()),
        ControllerError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
        ControllerError::Expired => (StatusCode::GONE, "Session expired".to_string()),
        ControllerError::ArtifactMissing => {
            (StatusCode::NOT_FOUND, "Report not available".to_string())
        }
        ControllerError::Store(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal storage error".to_string(),
        ),
    };
    reply::with_status(reply::json(&ApiError { message }), status).into_response()
}

fn bad_session_id() -> warp::reply::Response {
    reply::with_status(
        reply::json(&ApiError {
            message: "Invalid session id".to_string(),
        }),
        StatusCode::BAD_REQUEST,
    )
    .into_response()
}

/// GET /
pub fn dashboard_route() -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path::end().and(warp::get()).and_then(|| async move {
        let html = r#"<html><head><title>Vigie</title></head>
                <body><h1>Vigie is running</h1><p>POST /scans to submit a URL.</p></body></html>"#;
        Ok::<_, Rejection>(reply::html(html))
    })
}

/// POST /scans
pub fn create_scan_route(
    controller: Arc<LifecycleController>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("scans")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(16 * 1024))
        .and(warp::body::json())
        .and(warp::addr::remote())
        .and(warp::header::optional::<String>("user-agent"))
        .and(warp::header::optional::<String>("cf-ipcountry"))
        .and_then(
            move |body: CreateScanRequest,
                  remote: Option<SocketAddr>,
                  user_agent: Option<String>,
                  country: Option<String>| {
                let controller = controller.clone();
                async move {
                    let provenance = Provenance {
                        ip_address: remote.map(|addr| addr.ip().to_string()),
                        user_agent,
                        country,
                    };
                    match controller
                        .create_session(&body.url, body.email, provenance)
                        .await
                    {
                        Ok(session_id) => {
                            // Kick the pipeline immediately instead of
                            // waiting for the next scheduler tick.
                            let driver = controller.clone();
                            tokio::spawn(async move {
                                if let Err(e) = driver.advance(session_id).await {
                                    debug!("first advance for {} failed: {}", session_id, e);
                                }
                            });
                            let res = reply::with_status(
                                reply::json(&CreateScanResponse { session_id }),
                                StatusCode::OK,
                            )
                            .into_response();
                            Ok::<_, Rejection>(res)
                        }
                        Err(e) => Ok::<_, Rejection>(error_response(&e)),
                    }
                }
            },
        )
}

/// GET /scans/:id
pub fn get_status_route(
    controller: Arc<LifecycleController>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("scans" / String)
        .and(warp::get())
        .and_then(move |id_str: String| {
            let controller = controller.clone();
            async move {
                let id = match Uuid::parse_str(&id_str) {
                    Ok(id) => id,
                    Err(_) => return Ok::<_, Rejection>(bad_session_id()),
                };
                match controller.get_status(id).await {
                    Ok(view) => {
                        let res = reply::with_status(reply::json(&view), StatusCode::OK)
                            .into_response();
                        Ok::<_, Rejection>(res)
                    }
                    Err(e) => Ok::<_, Rejection>(error_response(&e)),
                }
            }
        })
}

/// GET /scans/:id/report
pub fn download_report_route(
    controller: Arc<LifecycleController>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("scans" / String / "report")
        .and(warp::get())
        .and_then(move |id_str: String| {
            let controller = controller.clone();
            async move {
                let id = match Uuid::parse_str(&id_str) {
                    Ok(id) => id,
                    Err(_) => return Ok::<_, Rejection>(bad_session_id()),
                };
                match controller.get_report(id).await {
                    Ok(bytes) => {
                        let res = reply::with_status(
                            reply::with_header(
                                reply::with_header(bytes, "Content-Type", "application/pdf"),
                                "Content-Disposition",
                                "attachment; filename=\"scan-report.pdf\"",
                            ),
                            StatusCode::OK,
                        )
                        .into_response();
                        Ok::<_, Rejection>(res)
                    }
                    Err(e) => Ok::<_, Rejection>(error_response(&e)),
                }
            }
        })
}

/// POST /scans/:id/email
pub fn request_email_route(
    controller: Arc<LifecycleController>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("scans" / String / "email")
        .and(warp::post())
        .and(warp::body::content_length_limit(16 * 1024))
        .and(warp::body::json())
        .and_then(move |id_str: String, body: EmailDeliveryRequest| {
            let controller = controller.clone();
            async move {
                let id = match Uuid::parse_str(&id_str) {
                    Ok(id) => id,
                    Err(_) => return Ok::<_, Rejection>(bad_session_id()),
                };
                match controller.record_email_request(id, &body.email).await {
                    Ok(()) => {
                        let res = reply::with_status(
                            reply::json(&AcceptedResponse {
                                message: "Report delivery queued".to_string(),
                            }),
                            StatusCode::ACCEPTED,
                        )
                        .into_response();
                        Ok::<_, Rejection>(res)
                    }
                    Err(e) => Ok::<_, Rejection>(error_response(&e)),
                }
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::types::RetryConfig;
    use crate::error_handling::types::{ProviderError, RenderError, StoreError};
    use crate::notify::NoopNotifier;
    use crate::report::ReportRenderer;
    use crate::scan_provider::types::{ScanPoll, ScanReport, ScanSubmission};
    use crate::scan_provider::ScanProvider;
    use crate::session_management::SessionStatus;
    use crate::storage::{MemorySessionStore, ReportStore, SessionStore};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    struct StuckProvider;

    #[async_trait]
    impl ScanProvider for StuckProvider {
        async fn submit(&self, _url: &str) -> Result<ScanSubmission, ProviderError> {
            Ok(ScanSubmission {
                uuid: "job-1".to_string(),
                result: None,
                visibility: None,
            })
        }

        async fn fetch_result(&self, _job_id: &str) -> Result<ScanPoll, ProviderError> {
            Ok(ScanPoll::Pending)
        }
    }

    struct MemoryReports(Mutex<HashMap<String, Vec<u8>>>);

    #[async_trait]
    impl ReportStore for MemoryReports {
        async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
            self.0.lock().unwrap().insert(key.to_string(), bytes.to_vec());
            Ok(())
        }

        async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
            self.0
                .lock()
                .unwrap()
                .get(key)
                .cloned()
                .ok_or(StoreError::NotFound)
        }
    }

    struct TinyRenderer;

    impl ReportRenderer for TinyRenderer {
        fn render(&self, _report: &ScanReport, _url: &str) -> Result<Vec<u8>, RenderError> {
            Ok(b"%PDF-tiny".to_vec())
        }
    }

    fn controller() -> (Arc<LifecycleController>, Arc<MemorySessionStore>) {
        let sessions = Arc::new(MemorySessionStore::new());
        let controller = Arc::new(LifecycleController::new(
            sessions.clone(),
            Arc::new(MemoryReports(Mutex::new(HashMap::new()))),
            Arc::new(StuckProvider),
            Arc::new(TinyRenderer),
            Arc::new(NoopNotifier),
            RetryConfig {
                max_attempts: 3,
                base_delay_ms: 1,
            },
            24,
            Duration::from_secs(1),
        ));
        (controller, sessions)
    }

    #[tokio::test]
    async fn test_create_scan_accepts_valid_url() {
        let (controller, sessions) = controller();
        let route = create_scan_route(controller);
        let response = warp::test::request()
            .method("POST")
            .path("/scans")
            .json(&serde_json::json!({ "url": "https://example.com" }))
            .reply(&route)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: CreateScanResponse = serde_json::from_slice(response.body()).unwrap();
        assert!(sessions.get(body.session_id).await.is_ok());
    }

    #[tokio::test]
    async fn test_create_scan_rejects_bad_url() {
        let (controller, _) = controller();
        let route = create_scan_route(controller);
        let response = warp::test::request()
            .method("POST")
            .path("/scans")
            .json(&serde_json::json!({ "url": "ftp://example.com" }))
            .reply(&route)
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_status_handles_unknown_and_invalid_ids() {
        let (controller, _) = controller();
        let route = get_status_route(controller);
        let response = warp::test::request()
            .method("GET")
            .path(&format!("/scans/{}", Uuid::new_v4()))
            .reply(&route)
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = warp::test::request()
            .method("GET")
            .path("/scans/not-a-uuid")
            .reply(&route)
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_report_not_available_before_completion() {
        let (controller, _) = controller();
        let id = controller
            .create_session("https://example.com", None, Provenance::default())
            .await
            .unwrap();
        let route = download_report_route(controller);
        let response = warp::test::request()
            .method("GET")
            .path(&format!("/scans/{}/report", id))
            .reply(&route)
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_email_request_conflicts_before_completion() {
        let (controller, sessions) = controller();
        let id = controller
            .create_session("https://example.com", None, Provenance::default())
            .await
            .unwrap();
        let route = request_email_route(controller);
        let response = warp::test::request()
            .method("POST")
            .path(&format!("/scans/{}/email", id))
            .json(&serde_json::json!({ "email": "user@example.com" }))
            .reply(&route)
            .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(
            sessions.get(id).await.unwrap().status,
            SessionStatus::Queued
        );
    }

    #[tokio::test]
    async fn test_create_scan_records_provenance_headers() {
        let (controller, sessions) = controller();
        let route = create_scan_route(controller);
        let response = warp::test::request()
            .method("POST")
            .path("/scans")
            .header("user-agent", "route-test/1.0")
            .header("cf-ipcountry", "CH")
            .json(&serde_json::json!({ "url": "https://example.com" }))
            .reply(&route)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: CreateScanResponse = serde_json::from_slice(response.body()).unwrap();
        let session = sessions.get(body.session_id).await.unwrap();
        assert_eq!(session.user_agent.as_deref(), Some("route-test/1.0"));
        assert_eq!(session.country.as_deref(), Some("CH"));
    }
}
