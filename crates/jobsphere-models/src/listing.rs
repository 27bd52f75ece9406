//! Job listing models.
//!
//! A [`Listing`] is a sparse record: apart from its id every field may be
//! missing, because documents in the `jobs` collection are written both by
//! this backend and directly by the browser client. Consumers never reach
//! into the optional fields for display; they go through [`Listing::card`],
//! which resolves every absent field to placeholder text.

use std::fmt;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{ModelError, ModelResult};

/// Maximum description length accepted from the post form.
pub const MAX_DESCRIPTION_CHARS: usize = 150;

/// Number of description characters shown on a card before truncation.
pub const DESCRIPTION_PREVIEW_CHARS: usize = 100;

/// Opaque listing identifier assigned by Firestore at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ListingId(pub String);

impl ListingId {
    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ListingId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ListingId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Kind of media attached to a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Image,
    Video,
    /// No media attached.
    None,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::None => "none",
        }
    }

    pub fn parse(s: &str) -> ModelResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "image" => Ok(MediaKind::Image),
            "video" => Ok(MediaKind::Video),
            "none" | "" => Ok(MediaKind::None),
            other => Err(ModelError::UnknownMediaKind(other.to_string())),
        }
    }

    /// Whether a listing with this media kind must carry a media URL.
    pub fn requires_url(&self) -> bool {
        !matches!(self, MediaKind::None)
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A job posting as stored in the `jobs` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: ListingId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(default, rename = "jobTitle", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, rename = "companyName", skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Free-text compensation, e.g. "PKR 150k - 200k".
    #[serde(default, rename = "salaryPackage", skip_serializing_if = "Option::is_none")]
    pub salary: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,

    #[serde(default, rename = "mediaType", skip_serializing_if = "Option::is_none")]
    pub media_kind: Option<MediaKind>,

    #[serde(default, rename = "userId", skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,

    /// Display name of the creator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

impl Listing {
    /// Create an empty listing carrying only its identity.
    pub fn new(id: impl Into<ListingId>) -> Self {
        Self {
            id: id.into(),
            created_at: None,
            updated_at: None,
            title: None,
            company: None,
            description: None,
            salary: None,
            email: None,
            address: None,
            media_url: None,
            media_kind: None,
            owner_id: None,
            created_by: None,
        }
    }

    /// Build a freshly created listing from a validated draft.
    pub fn from_draft(
        id: impl Into<ListingId>,
        draft: &ListingDraft,
        owner_id: impl Into<String>,
        created_by: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let mut listing = Self::new(id);
        listing.apply_draft(draft);
        listing.owner_id = Some(owner_id.into());
        listing.created_by = Some(created_by.into());
        listing.created_at = Some(created_at);
        listing
    }

    /// Replace the authored payload, keeping identity, owner and timestamps.
    pub fn apply_draft(&mut self, draft: &ListingDraft) {
        let draft = draft.normalized();
        self.title = Some(draft.job_title);
        self.company = Some(draft.company_name);
        self.description = Some(draft.description);
        self.salary = Some(draft.salary_package);
        self.email = Some(draft.email);
        self.address = Some(draft.address);
        self.media_kind = Some(draft.media_type);
        self.media_url = draft.media_url;
    }

    /// True if `uid` owns this listing.
    pub fn is_owned_by(&self, uid: &str) -> bool {
        self.owner_id.as_deref() == Some(uid)
    }

    /// Resolve the listing into render-ready text with placeholders.
    pub fn card(&self) -> ListingCard {
        let title = non_blank(self.title.as_deref()).unwrap_or("Untitled position");
        let company = non_blank(self.company.as_deref());
        let creator = non_blank(self.created_by.as_deref());

        ListingCard {
            id: self.id.clone(),
            title: title.to_string(),
            company: company.unwrap_or("Unknown company").to_string(),
            company_initial: initial(company).unwrap_or('U'),
            creator_name: creator.unwrap_or("Anonymous").to_string(),
            creator_initial: initial(creator).unwrap_or('?'),
            description_preview: description_preview(self.description.as_deref()),
            salary: non_blank(self.salary.as_deref())
                .unwrap_or("Not specified")
                .to_string(),
            email: non_blank(self.email.as_deref())
                .unwrap_or("Not provided")
                .to_string(),
            address: non_blank(self.address.as_deref()).map(str::to_string),
            media_url: non_blank(self.media_url.as_deref()).map(str::to_string),
            media_kind: self.media_kind.unwrap_or(MediaKind::None),
            owner_id: self.owner_id.clone(),
            created_at: self.created_at,
        }
    }
}

/// Render-ready projection of a [`Listing`]; every field is populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ListingCard {
    pub id: ListingId,
    pub title: String,
    pub company: String,
    pub company_initial: char,
    pub creator_name: String,
    pub creator_initial: char,
    pub description_preview: String,
    pub salary: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    pub media_kind: MediaKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Authoring payload submitted by the post/edit form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ListingDraft {
    #[serde(default)]
    pub job_title: String,

    #[serde(default)]
    pub company_name: String,

    #[serde(default)]
    #[validate(length(max = 150))]
    pub description: String,

    #[serde(default)]
    #[validate(email)]
    pub email: String,

    #[serde(default)]
    pub address: String,

    #[serde(default)]
    pub salary_package: String,

    #[serde(default)]
    pub media_type: MediaKind,

    #[serde(default)]
    pub media_url: Option<String>,
}

impl ListingDraft {
    /// Validate the draft the same way the post form does.
    ///
    /// Rules apply to the trimmed values, which are what gets stored.
    pub fn check(&self) -> ModelResult<()> {
        let draft = self.normalized();
        let required = [
            ("jobTitle", &draft.job_title),
            ("companyName", &draft.company_name),
            ("description", &draft.description),
            ("email", &draft.email),
            ("address", &draft.address),
            ("salaryPackage", &draft.salary_package),
        ];
        for (field, value) in required {
            if value.is_empty() {
                return Err(ModelError::MissingField(field));
            }
        }

        if let Err(errors) = draft.validate() {
            let fields = errors.field_errors();
            if fields.contains_key("description") {
                return Err(ModelError::TooLong {
                    field: "description",
                    max: MAX_DESCRIPTION_CHARS,
                });
            }
            if fields.contains_key("email") {
                return Err(ModelError::InvalidEmail);
            }
        }

        if draft.media_type.requires_url() {
            let raw = draft
                .media_url
                .as_deref()
                .ok_or(ModelError::MissingField("mediaUrl"))?;
            let parsed = url::Url::parse(raw)
                .map_err(|e| ModelError::InvalidMediaUrl(e.to_string()))?;
            if parsed.scheme() != "https" {
                return Err(ModelError::InvalidMediaUrl(format!(
                    "unsupported scheme {}",
                    parsed.scheme()
                )));
            }
        }

        Ok(())
    }

    /// Trimmed copy; the media URL is dropped when no media is attached.
    pub fn normalized(&self) -> Self {
        let media_url = if self.media_type.requires_url() {
            self.media_url
                .as_deref()
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(str::to_string)
        } else {
            None
        };

        Self {
            job_title: self.job_title.trim().to_string(),
            company_name: self.company_name.trim().to_string(),
            description: self.description.trim().to_string(),
            email: self.email.trim().to_string(),
            address: self.address.trim().to_string(),
            salary_package: self.salary_package.trim().to_string(),
            media_type: self.media_type,
            media_url,
        }
    }
}

/// Display name stored as `createdBy`: the account name, else the email prefix.
pub fn creator_display_name(name: Option<&str>, email: Option<&str>) -> String {
    if let Some(name) = non_blank(name) {
        return name.to_string();
    }
    email
        .and_then(|e| e.split('@').next())
        .and_then(|prefix| non_blank(Some(prefix)))
        .unwrap_or("Anonymous")
        .to_string()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn initial(value: Option<&str>) -> Option<char> {
    value.and_then(|v| v.chars().next()).map(|c| c.to_ascii_uppercase())
}

fn description_preview(description: Option<&str>) -> String {
    let Some(text) = description else {
        return String::new();
    };
    if text.chars().count() > DESCRIPTION_PREVIEW_CHARS {
        let head: String = text.chars().take(DESCRIPTION_PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_draft() -> ListingDraft {
        ListingDraft {
            job_title: "Backend Engineer".to_string(),
            company_name: "Innovatech".to_string(),
            description: "Build scalable APIs".to_string(),
            email: "sara@example.com".to_string(),
            address: "Karachi, Pakistan".to_string(),
            salary_package: "150k".to_string(),
            media_type: MediaKind::Image,
            media_url: Some("https://res.cloudinary.com/demo/image/upload/a.jpg".to_string()),
        }
    }

    #[test]
    fn empty_listing_card_uses_placeholders() {
        let card = Listing::new("abc").card();
        assert_eq!(card.title, "Untitled position");
        assert_eq!(card.company, "Unknown company");
        assert_eq!(card.company_initial, 'U');
        assert_eq!(card.creator_initial, '?');
        assert_eq!(card.description_preview, "");
        assert_eq!(card.email, "Not provided");
        assert!(card.address.is_none());
        assert_eq!(card.media_kind, MediaKind::None);
    }

    #[test]
    fn card_truncates_long_description() {
        let mut listing = Listing::new("abc");
        listing.description = Some("x".repeat(120));
        let card = listing.card();
        assert_eq!(card.description_preview.len(), 103);
        assert!(card.description_preview.ends_with("..."));
    }

    #[test]
    fn card_initials_come_from_company_and_creator() {
        let mut listing = Listing::new("abc");
        listing.company = Some("innovatech".to_string());
        listing.created_by = Some("sara".to_string());
        let card = listing.card();
        assert_eq!(card.company_initial, 'I');
        assert_eq!(card.creator_initial, 'S');
    }

    #[test]
    fn listing_deserializes_with_missing_fields() {
        let listing: Listing = serde_json::from_str(r#"{"id":"j1","jobTitle":"Dev"}"#).unwrap();
        assert_eq!(listing.title.as_deref(), Some("Dev"));
        assert!(listing.description.is_none());
        assert!(listing.created_at.is_none());
    }

    #[test]
    fn valid_draft_passes() {
        assert_eq!(sample_draft().check(), Ok(()));
    }

    #[test]
    fn padding_is_ignored_by_validation() {
        let mut draft = sample_draft();
        draft.email = "  sara@example.com ".to_string();
        draft.description = format!("  {}  ", "d".repeat(MAX_DESCRIPTION_CHARS));
        assert_eq!(draft.check(), Ok(()));

        draft.description = "d".repeat(MAX_DESCRIPTION_CHARS + 1);
        assert!(matches!(draft.check(), Err(ModelError::TooLong { .. })));
    }

    #[test]
    fn blank_required_field_is_rejected() {
        let mut draft = sample_draft();
        draft.salary_package = "   ".to_string();
        assert_eq!(draft.check(), Err(ModelError::MissingField("salaryPackage")));
    }

    #[test]
    fn long_description_is_rejected() {
        let mut draft = sample_draft();
        draft.description = "d".repeat(MAX_DESCRIPTION_CHARS + 1);
        assert!(matches!(draft.check(), Err(ModelError::TooLong { .. })));
    }

    #[test]
    fn invalid_email_is_rejected() {
        let mut draft = sample_draft();
        draft.email = "not-an-email".to_string();
        assert_eq!(draft.check(), Err(ModelError::InvalidEmail));
    }

    #[test]
    fn media_url_required_unless_none() {
        let mut draft = sample_draft();
        draft.media_url = None;
        assert_eq!(draft.check(), Err(ModelError::MissingField("mediaUrl")));

        draft.media_type = MediaKind::None;
        assert_eq!(draft.check(), Ok(()));
    }

    #[test]
    fn plain_http_media_url_is_rejected() {
        let mut draft = sample_draft();
        draft.media_url = Some("http://example.com/a.jpg".to_string());
        assert!(matches!(draft.check(), Err(ModelError::InvalidMediaUrl(_))));
    }

    #[test]
    fn normalized_drops_media_url_for_none() {
        let mut draft = sample_draft();
        draft.media_type = MediaKind::None;
        draft.job_title = "  Backend Engineer ".to_string();
        let normalized = draft.normalized();
        assert!(normalized.media_url.is_none());
        assert_eq!(normalized.job_title, "Backend Engineer");
    }

    #[test]
    fn apply_draft_preserves_identity_and_owner() {
        let now = Utc::now();
        let mut listing = Listing::from_draft("j1", &sample_draft(), "uid-1", "sara", now);
        let mut edit = sample_draft();
        edit.job_title = "Staff Engineer".to_string();
        listing.apply_draft(&edit);

        assert_eq!(listing.id.as_str(), "j1");
        assert_eq!(listing.title.as_deref(), Some("Staff Engineer"));
        assert!(listing.is_owned_by("uid-1"));
        assert_eq!(listing.created_at, Some(now));
    }

    #[test]
    fn creator_name_falls_back_to_email_prefix() {
        assert_eq!(creator_display_name(Some("Ali Khan"), None), "Ali Khan");
        assert_eq!(creator_display_name(None, Some("ali@example.com")), "ali");
        assert_eq!(creator_display_name(Some("  "), None), "Anonymous");
    }

    #[test]
    fn media_kind_parse() {
        assert_eq!(MediaKind::parse("Video").unwrap(), MediaKind::Video);
        assert_eq!(MediaKind::parse("").unwrap(), MediaKind::None);
        assert!(MediaKind::parse("audio").is_err());
    }
}
