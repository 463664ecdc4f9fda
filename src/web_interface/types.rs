use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// API error payload
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateScanRequest {
    pub url: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateScanResponse {
    pub session_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct EmailDeliveryRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    pub message: String,
}
