//! Contact form models.

use std::fmt;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Subjects offered by the contact form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
pub enum ContactSubject {
    #[default]
    #[serde(rename = "General Inquiry")]
    GeneralInquiry,
    #[serde(rename = "Technical Support")]
    TechnicalSupport,
    #[serde(rename = "Job Posting Issue")]
    JobPostingIssue,
    #[serde(rename = "Account Problem")]
    AccountProblem,
    #[serde(rename = "Other")]
    Other,
}

impl ContactSubject {
    pub const ALL: [ContactSubject; 5] = [
        ContactSubject::GeneralInquiry,
        ContactSubject::TechnicalSupport,
        ContactSubject::JobPostingIssue,
        ContactSubject::AccountProblem,
        ContactSubject::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContactSubject::GeneralInquiry => "General Inquiry",
            ContactSubject::TechnicalSupport => "Technical Support",
            ContactSubject::JobPostingIssue => "Job Posting Issue",
            ContactSubject::AccountProblem => "Account Problem",
            ContactSubject::Other => "Other",
        }
    }

    pub fn parse(s: &str) -> ModelResult<Self> {
        Self::ALL
            .into_iter()
            .find(|subject| subject.as_str() == s.trim())
            .ok_or_else(|| ModelError::UnknownSubject(s.to_string()))
    }
}

impl fmt::Display for ContactSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Handling status of a contact request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
pub enum ContactStatus {
    #[default]
    New,
    #[serde(rename = "In Progress")]
    InProgress,
    Resolved,
}

impl ContactStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactStatus::New => "New",
            ContactStatus::InProgress => "In Progress",
            ContactStatus::Resolved => "Resolved",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "In Progress" => ContactStatus::InProgress,
            "Resolved" => ContactStatus::Resolved,
            _ => ContactStatus::New,
        }
    }
}

/// Raw contact form body.
///
/// Every field is optional at the wire level so that a missing field turns
/// into a validation error instead of a deserialization rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactSubmission {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl ContactSubmission {
    /// Validate presence of the required fields and the subject value.
    pub fn validate(&self) -> ModelResult<ValidContact> {
        let name = required("name", &self.name)?;
        let email = required("email", &self.email)?;
        let subject = required("subject", &self.subject)?;
        let message = required("message", &self.message)?;
        let subject = ContactSubject::parse(subject)?;

        Ok(ValidContact {
            name: name.to_string(),
            email: email.to_string(),
            phone: self
                .phone
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .to_string(),
            subject,
            message: message.to_string(),
            user_id: self
                .user_id
                .as_deref()
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(str::to_string),
        })
    }
}

/// A contact submission that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidContact {
    pub name: String,
    pub email: String,
    /// Empty when not provided.
    pub phone: String,
    pub subject: ContactSubject,
    pub message: String,
    pub user_id: Option<String>,
}

/// Stored contact record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub subject: ContactSubject,
    pub message: String,
    pub user_id: Option<String>,
    #[serde(default)]
    pub status: ContactStatus,
    pub created_at: DateTime<Utc>,
}

impl ContactRecord {
    /// Build a new record with the default status.
    pub fn new(id: impl Into<String>, contact: ValidContact, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            name: contact.name,
            email: contact.email,
            phone: contact.phone,
            subject: contact.subject,
            message: contact.message,
            user_id: contact.user_id,
            status: ContactStatus::default(),
            created_at,
        }
    }
}

fn required<'a>(field: &'static str, value: &'a Option<String>) -> ModelResult<&'a str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(ModelError::MissingField(field))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission() -> ContactSubmission {
        ContactSubmission {
            name: Some("Ali Khan".to_string()),
            email: Some("ali@example.com".to_string()),
            phone: None,
            subject: Some("Technical Support".to_string()),
            message: Some("The post form hangs".to_string()),
            user_id: None,
        }
    }

    #[test]
    fn valid_submission_defaults_optional_fields() {
        let contact = submission().validate().unwrap();
        assert_eq!(contact.phone, "");
        assert!(contact.user_id.is_none());
        assert_eq!(contact.subject, ContactSubject::TechnicalSupport);
    }

    #[test]
    fn missing_message_is_rejected() {
        let mut s = submission();
        s.message = Some("  ".to_string());
        assert_eq!(s.validate(), Err(ModelError::MissingField("message")));
    }

    #[test]
    fn unknown_subject_is_rejected() {
        let mut s = submission();
        s.subject = Some("Sales".to_string());
        assert!(matches!(s.validate(), Err(ModelError::UnknownSubject(_))));
    }

    #[test]
    fn new_record_starts_as_new() {
        let record = ContactRecord::new("c1", submission().validate().unwrap(), Utc::now());
        assert_eq!(record.status, ContactStatus::New);
    }

    #[test]
    fn subject_serializes_with_display_text() {
        let json = serde_json::to_string(&ContactSubject::JobPostingIssue).unwrap();
        assert_eq!(json, "\"Job Posting Issue\"");
        let status = serde_json::to_string(&ContactStatus::InProgress).unwrap();
        assert_eq!(status, "\"In Progress\"");
    }
}
