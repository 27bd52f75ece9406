//! Contact form handler.
//!
//! Responses use the `{ success, message, ... }` envelope the contact page
//! expects instead of the API's usual error body.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{error, info};

use jobsphere_models::{ContactRecord, ContactSubmission, ModelError};

use crate::metrics;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<ContactRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ContactResponse {
    fn failure(message: &str) -> Self {
        Self {
            success: false,
            message: message.to_string(),
            contact: None,
            error: None,
        }
    }
}

fn reply(status: StatusCode, body: ContactResponse) -> Response {
    (status, Json(body)).into_response()
}

/// POST /api/contact
pub async fn submit_contact(
    State(state): State<AppState>,
    payload: Result<Json<ContactSubmission>, JsonRejection>,
) -> Response {
    let Json(submission) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            metrics::record_contact_submission("invalid");
            info!("Rejected contact submission: {}", rejection.body_text());
            return reply(
                StatusCode::BAD_REQUEST,
                ContactResponse::failure("Invalid request body"),
            );
        }
    };

    let contact = match submission.validate() {
        Ok(contact) => contact,
        Err(e) => {
            metrics::record_contact_submission("invalid");
            let message = match e {
                ModelError::UnknownSubject(_) => "Invalid subject",
                _ => "Missing required fields",
            };
            return reply(StatusCode::BAD_REQUEST, ContactResponse::failure(message));
        }
    };

    match state.contacts.create(contact).await {
        Ok(record) => {
            metrics::record_contact_submission("stored");
            reply(
                StatusCode::CREATED,
                ContactResponse {
                    success: true,
                    message: "Contact form submitted successfully".to_string(),
                    contact: Some(record),
                    error: None,
                },
            )
        }
        Err(e) => {
            metrics::record_contact_submission("error");
            error!("Failed to store contact submission: {}", e);
            let detail = if state.config.is_production() {
                "An internal error occurred".to_string()
            } else {
                e.to_string()
            };
            reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                ContactResponse {
                    error: Some(detail),
                    ..ContactResponse::failure("Server error")
                },
            )
        }
    }
}
