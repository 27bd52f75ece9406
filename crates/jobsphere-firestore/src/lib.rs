//! Firestore REST API client.
//!
//! This crate provides:
//! - A REST client with token caching, retries and request metrics
//! - Emulator support for local development and tests
//! - Typed repositories for job listings and contact submissions
//! - Query builders for the newest-first listing feed

pub mod client;
pub mod contacts_repo;
pub mod error;
pub mod listings_repo;
pub mod metrics;
pub mod query;
pub mod retry;
pub mod token_cache;
pub mod types;

#[cfg(test)]
mod client_tests;

pub use client::{FirestoreClient, FirestoreConfig};
pub use contacts_repo::{ContactRepository, CONTACTS_COLLECTION};
pub use error::{FirestoreError, FirestoreResult};
pub use listings_repo::{ListingRepository, LISTINGS_COLLECTION};
pub use retry::RetryConfig;
pub use types::{Document, FromFirestoreValue, ToFirestoreValue, Value};
