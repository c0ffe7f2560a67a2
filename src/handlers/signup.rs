use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::{error, instrument, warn};

use crate::models::{RepositoryError, ServiceError, SignupRecord};
use crate::observability::get_current_trace_id;
use crate::services::SignupService;

const URLENCODED_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const MULTIPART_CONTENT_TYPE: &str = "multipart/form-data";

/// The two HTML form encodings a signup may arrive in
#[derive(Debug, Clone, PartialEq, Eq)]
enum FormEncoding {
    UrlEncoded,
    Multipart,
}

/// State for the signup route
#[derive(Clone)]
pub struct SignupState {
    pub signup_service: Arc<SignupService>,
}

/// Accept a form submission and register it as a new signup.
///
/// Every submitted field is kept, from either form encoding. A body that is
/// not a form yields an empty record rather than a rejection; a malformed
/// multipart body is a 400.
#[instrument(name = "signup", skip(state, headers, body), fields(body_len = body.len()))]
pub async fn signup(
    State(state): State<SignupState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let record = match form_encoding(&headers) {
        Some(FormEncoding::UrlEncoded) => SignupRecord::from_form(&body),
        Some(FormEncoding::Multipart) => match read_multipart(&headers, body).await {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Rejecting malformed multipart signup");
                return empty_json(StatusCode::BAD_REQUEST);
            }
        },
        None => SignupRecord::new(),
    };

    match state.signup_service.register(record).await {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(ServiceError::AlreadyRegistered { attribute, .. }) => {
            warn!(attribute = %attribute, "Duplicate signup");
            empty_json(StatusCode::CONFLICT)
        }
        Err(ServiceError::Repository {
            source: RepositoryError::RateLimitExceeded,
        }) => {
            error!("Signup store is throttling writes");
            empty_json(StatusCode::SERVICE_UNAVAILABLE)
        }
        Err(e) => {
            error!(
                error = %e,
                trace_id = get_current_trace_id().as_deref().unwrap_or("none"),
                "Signup failed"
            );
            empty_json(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

fn content_type(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
}

fn form_encoding(headers: &HeaderMap) -> Option<FormEncoding> {
    let media_type = content_type(headers)?.split(';').next()?.trim();

    if media_type.eq_ignore_ascii_case(URLENCODED_CONTENT_TYPE) {
        Some(FormEncoding::UrlEncoded)
    } else if media_type.eq_ignore_ascii_case(MULTIPART_CONTENT_TYPE) {
        Some(FormEncoding::Multipart)
    } else {
        None
    }
}

async fn read_multipart(headers: &HeaderMap, body: Bytes) -> Result<SignupRecord, multer::Error> {
    let boundary = multer::parse_boundary(content_type(headers).unwrap_or_default())?;
    SignupRecord::from_multipart(body, boundary).await
}

fn empty_json(status: StatusCode) -> Response {
    (status, [(header::CONTENT_TYPE, "application/json")]).into_response()
}
