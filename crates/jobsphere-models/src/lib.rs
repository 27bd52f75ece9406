//! Shared data models for the JobSphere backend.
//!
//! This crate provides Serde-serializable types for:
//! - Job listings and their authoring payloads
//! - Render-ready listing cards with placeholder fallbacks
//! - Contact form submissions and stored contact records

pub mod contact;
pub mod error;
pub mod listing;

// Re-export common types
pub use contact::{ContactRecord, ContactStatus, ContactSubject, ContactSubmission, ValidContact};
pub use error::{ModelError, ModelResult};
pub use listing::{creator_display_name, Listing, ListingCard, ListingDraft, ListingId, MediaKind};
