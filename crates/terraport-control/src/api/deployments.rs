//! Deployment endpoints.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use bytes::Bytes;
use serde::Serialize;
use terraport_core::{CredentialFields, ProvisioningResult};
use tracing::{info, warn};

use crate::error::{ControlError, ErrorKind};
use crate::orchestrator::StatusReport;

use super::AppState;

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Response for a successful upload.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// Human-readable confirmation.
    pub message: &'static str,
    /// Identifier to pass to `/deploy` and `/status`.
    pub deployment_id: String,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message.
    pub error: String,
    /// Exit code of the remote command, when one ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// Raw runner stdout, for unparseable results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    /// Raw remote stderr.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
}

impl From<&ControlError> for ErrorResponse {
    fn from(error: &ControlError) -> Self {
        let mut response = Self {
            error: error.to_string(),
            exit_code: None,
            stdout: None,
            stderr: None,
        };
        match error {
            ControlError::ResultUnparseable {
                exit_code,
                stdout,
                stderr,
                ..
            } => {
                response.exit_code = *exit_code;
                response.stdout = Some(stdout.clone());
                response.stderr = Some(stderr.clone());
            }
            ControlError::RemoteExecution {
                exit_code, stderr, ..
            } => {
                response.exit_code = *exit_code;
                response.stderr = Some(stderr.clone());
            }
            _ => {}
        }
        response
    }
}

/// Accept a template archive and provider credentials.
///
/// Multipart fields: `file`, `provider`, and the provider's credential
/// fields (`access_key_id`, `secret_access_key`, `client_id`,
/// `client_secret`, `tenant_id`, `subscription_id`).
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut template: Option<Bytes> = None;
    let mut provider: Option<String> = None;
    let mut fields = CredentialFields::default();

    while let Some(field) = multipart.next_field().await.map_err(invalid_upload)? {
        let name = field.name().unwrap_or_default().to_owned();
        match name.as_str() {
            "file" => template = Some(field.bytes().await.map_err(invalid_upload)?),
            "provider" => provider = Some(field.text().await.map_err(invalid_upload)?),
            "access_key_id" => {
                fields.access_key_id = Some(field.text().await.map_err(invalid_upload)?);
            }
            "secret_access_key" => {
                fields.secret_access_key = Some(field.text().await.map_err(invalid_upload)?);
            }
            "client_id" => fields.client_id = Some(field.text().await.map_err(invalid_upload)?),
            "client_secret" => {
                fields.client_secret = Some(field.text().await.map_err(invalid_upload)?);
            }
            "tenant_id" => fields.tenant_id = Some(field.text().await.map_err(invalid_upload)?),
            "subscription_id" => {
                fields.subscription_id = Some(field.text().await.map_err(invalid_upload)?);
            }
            other => warn!(field = other, "ignoring unknown upload field"),
        }
    }

    let template = template.ok_or_else(|| {
        error_response(&ControlError::InvalidUpload("missing file field".to_owned()))
    })?;
    let provider = provider.ok_or_else(|| {
        error_response(&ControlError::InvalidUpload("missing provider field".to_owned()))
    })?;

    let id = state
        .orchestrator
        .submit(template, provider.trim(), fields)
        .await
        .map_err(|e| error_response(&e))?;

    info!(deployment_id = %id, "template uploaded");
    Ok(Json(UploadResponse {
        message: "Template uploaded successfully",
        deployment_id: id.to_string(),
    }))
}

/// Run a submitted deployment and return its result.
pub async fn deploy(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProvisioningResult>, ApiError> {
    state
        .orchestrator
        .deploy(&id)
        .await
        .map(Json)
        .map_err(|e| error_response(&e))
}

/// Report the published outputs for a deployment.
pub async fn status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StatusReport>, ApiError> {
    state
        .orchestrator
        .status(&id)
        .await
        .map(Json)
        .map_err(|e| error_response(&e))
}

fn invalid_upload(e: axum::extract::multipart::MultipartError) -> ApiError {
    error_response(&ControlError::InvalidUpload(e.body_text()))
}

fn error_response(error: &ControlError) -> ApiError {
    let status = error_to_status(error);
    if status.is_server_error() {
        warn!(error = %error, "request failed");
    }
    (status, Json(ErrorResponse::from(error)))
}

const fn error_to_status(error: &ControlError) -> StatusCode {
    match error.kind() {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Transport | ErrorKind::Protocol => StatusCode::BAD_GATEWAY,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn status_mapping() {
        assert_eq!(
            error_to_status(&ControlError::InvalidDeploymentId("..".to_owned())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            error_to_status(&ControlError::CredentialsMissing("abc".to_owned())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            error_to_status(&ControlError::DeploymentInProgress("abc".to_owned())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            error_to_status(&ControlError::Timeout {
                limit: Duration::from_secs(1)
            }),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn unparseable_result_exposes_raw_output() {
        let err = ControlError::ResultUnparseable {
            reason: "runner produced no output".to_owned(),
            exit_code: Some(137),
            stdout: "Apply complete!".to_owned(),
            stderr: "Killed".to_owned(),
        };
        let body = serde_json::to_value(ErrorResponse::from(&err)).unwrap_or_default();

        assert_eq!(body["exit_code"], 137);
        assert_eq!(body["stdout"], "Apply complete!");
        assert_eq!(body["stderr"], "Killed");
    }
}
