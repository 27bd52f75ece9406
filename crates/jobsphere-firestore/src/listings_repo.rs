//! Repository for job listings in the top-level `jobs` collection.

use std::collections::HashMap;

use chrono::Utc;
use tracing::{info, warn};

use jobsphere_models::{Listing, ListingDraft, ListingId, MediaKind};

use crate::client::FirestoreClient;
use crate::error::{FirestoreError, FirestoreResult};
use crate::query::{
    build_listings_page_query, build_owner_listings_page_query, build_recent_listings_query,
    cursor_after, normalize_page_size,
};
use crate::types::{Cursor, Document, StructuredQuery, ToFirestoreValue, Value};

pub const LISTINGS_COLLECTION: &str = "jobs";

const OWNER_PAGE_SIZE: u32 = 200;

/// Firestore field names. These are shared with the browser client, which
/// writes the same documents.
pub mod fields {
    pub const JOB_TITLE: &str = "jobTitle";
    pub const COMPANY_NAME: &str = "companyName";
    pub const DESCRIPTION: &str = "description";
    pub const SALARY_PACKAGE: &str = "salaryPackage";
    pub const EMAIL: &str = "email";
    pub const ADDRESS: &str = "address";
    pub const MEDIA_URL: &str = "mediaUrl";
    pub const MEDIA_TYPE: &str = "mediaType";
    pub const USER_ID: &str = "userId";
    pub const CREATED_BY: &str = "createdBy";
    pub const CREATED_AT: &str = "createdAt";
    pub const UPDATED_AT: &str = "updatedAt";

    /// Fields written by an edit.
    pub const DRAFT_FIELDS: [&str; 8] = [
        JOB_TITLE,
        COMPANY_NAME,
        DESCRIPTION,
        SALARY_PACKAGE,
        EMAIL,
        ADDRESS,
        MEDIA_URL,
        MEDIA_TYPE,
    ];
}

#[derive(Clone)]
pub struct ListingRepository {
    client: FirestoreClient,
}

impl ListingRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    pub async fn get(&self, id: &ListingId) -> FirestoreResult<Option<Listing>> {
        match self
            .client
            .get_document(LISTINGS_COLLECTION, id.as_str())
            .await?
        {
            Some(doc) => Ok(Some(document_to_listing(&doc)?)),
            None => Ok(None),
        }
    }

    /// Store a new listing owned by `owner_id`. The id is assigned by Firestore.
    pub async fn create(
        &self,
        draft: &ListingDraft,
        owner_id: &str,
        created_by: &str,
    ) -> FirestoreResult<Listing> {
        let now = Utc::now();
        let mut doc_fields = draft_to_fields(draft);
        doc_fields.insert(fields::USER_ID.to_string(), owner_id.to_firestore_value());
        doc_fields.insert(fields::CREATED_BY.to_string(), created_by.to_firestore_value());
        doc_fields.insert(fields::CREATED_AT.to_string(), now.to_firestore_value());

        let doc = self.client.add_document(LISTINGS_COLLECTION, doc_fields).await?;
        let listing = document_to_listing(&doc)?;

        info!(listing_id = %listing.id, owner = %owner_id, "Created listing");
        Ok(listing)
    }

    /// Overwrite the authored fields of an existing listing.
    ///
    /// Owner, creator and `createdAt` are left untouched.
    pub async fn update(&self, id: &ListingId, draft: &ListingDraft) -> FirestoreResult<Listing> {
        let mut doc_fields = draft_to_fields(draft);
        doc_fields.insert(fields::UPDATED_AT.to_string(), Utc::now().to_firestore_value());

        let mut mask: Vec<String> = fields::DRAFT_FIELDS.iter().map(|f| f.to_string()).collect();
        mask.push(fields::UPDATED_AT.to_string());

        let doc = self
            .client
            .update_document(LISTINGS_COLLECTION, id.as_str(), doc_fields, Some(mask))
            .await?;

        info!(listing_id = %id, "Updated listing");
        document_to_listing(&doc)
    }

    pub async fn delete(&self, id: &ListingId) -> FirestoreResult<()> {
        self.client
            .delete_document(LISTINGS_COLLECTION, id.as_str())
            .await?;
        info!(listing_id = %id, "Deleted listing");
        Ok(())
    }

    /// Up to `limit` listings, newest first.
    pub async fn list_recent(&self, limit: u32) -> FirestoreResult<Vec<Listing>> {
        let docs = self
            .client
            .with_retry("list_recent_listings", || {
                self.client
                    .run_query("", build_recent_listings_query(Some(limit)))
            })
            .await?;
        Ok(documents_to_listings(&docs))
    }

    /// Every listing with a creation time, newest first, read `page_size`
    /// documents at a time.
    ///
    /// Pages are separate reads, so a write that lands mid-scan may be missed
    /// until the next call.
    pub async fn list_all(&self, page_size: u32) -> FirestoreResult<Vec<Listing>> {
        let docs = self
            .run_paged("list_all_listings", page_size, |cursor| {
                build_listings_page_query(page_size, cursor)
            })
            .await?;
        Ok(documents_to_listings(&docs))
    }

    /// Up to `limit` listings owned by `owner_id`, newest first. Listings
    /// without a creation time sort last.
    pub async fn list_by_owner(&self, owner_id: &str, limit: u32) -> FirestoreResult<Vec<Listing>> {
        let docs = self
            .run_paged("list_owner_listings", OWNER_PAGE_SIZE, |cursor| {
                build_owner_listings_page_query(owner_id, OWNER_PAGE_SIZE, cursor)
            })
            .await?;

        let mut listings = documents_to_listings(&docs);
        listings.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        listings.truncate(limit as usize);
        Ok(listings)
    }

    /// Run `build` page by page until a short page comes back.
    async fn run_paged<F>(
        &self,
        operation: &str,
        page_size: u32,
        build: F,
    ) -> FirestoreResult<Vec<Document>>
    where
        F: Fn(Option<Cursor>) -> StructuredQuery,
    {
        let page_size = normalize_page_size(Some(page_size)) as usize;
        let mut docs = Vec::new();
        let mut cursor = None;

        loop {
            let query = build(cursor.take());
            let order_by = query.order_by.clone().unwrap_or_default();
            let page = self
                .client
                .with_retry(operation, || self.client.run_query("", query.clone()))
                .await?;

            if page.len() >= page_size {
                let last = page
                    .last()
                    .and_then(|doc| cursor_after(doc, &order_by))
                    .ok_or_else(|| {
                        FirestoreError::invalid_response("page ended on a document without cursor fields")
                    })?;
                cursor = Some(last);
            }

            let pages_remain = cursor.is_some();
            docs.extend(page);
            if !pages_remain {
                return Ok(docs);
            }
        }
    }
}

// ============================================================================
// Field Conversion Helpers
// ============================================================================

fn draft_to_fields(draft: &ListingDraft) -> HashMap<String, Value> {
    let draft = draft.normalized();
    let mut map = HashMap::new();
    map.insert(fields::JOB_TITLE.to_string(), draft.job_title.to_firestore_value());
    map.insert(fields::COMPANY_NAME.to_string(), draft.company_name.to_firestore_value());
    map.insert(fields::DESCRIPTION.to_string(), draft.description.to_firestore_value());
    map.insert(fields::SALARY_PACKAGE.to_string(), draft.salary_package.to_firestore_value());
    map.insert(fields::EMAIL.to_string(), draft.email.to_firestore_value());
    map.insert(fields::ADDRESS.to_string(), draft.address.to_firestore_value());
    map.insert(fields::MEDIA_TYPE.to_string(), draft.media_type.as_str().to_firestore_value());
    // Written as null for `none` so an edit clears a previous URL.
    map.insert(fields::MEDIA_URL.to_string(), draft.media_url.to_firestore_value());
    map
}

/// Convert a stored document. Fields that are missing or hold a value of the
/// wrong type are read as absent.
pub(crate) fn document_to_listing(doc: &Document) -> FirestoreResult<Listing> {
    let id = doc
        .id()
        .ok_or_else(|| FirestoreError::invalid_response("listing document has no name"))?;

    let mut listing = Listing::new(id);
    listing.title = doc.get(fields::JOB_TITLE);
    listing.company = doc.get(fields::COMPANY_NAME);
    listing.description = doc.get(fields::DESCRIPTION);
    listing.salary = doc.get(fields::SALARY_PACKAGE);
    listing.email = doc.get(fields::EMAIL);
    listing.address = doc.get(fields::ADDRESS);
    listing.media_url = doc.get(fields::MEDIA_URL);
    listing.media_kind = doc
        .get::<String>(fields::MEDIA_TYPE)
        .and_then(|kind| MediaKind::parse(&kind).ok());
    listing.owner_id = doc.get(fields::USER_ID);
    listing.created_by = doc.get(fields::CREATED_BY);
    listing.created_at = doc.get(fields::CREATED_AT);
    listing.updated_at = doc.get(fields::UPDATED_AT);
    Ok(listing)
}

fn documents_to_listings(docs: &[Document]) -> Vec<Listing> {
    docs.iter()
        .filter_map(|doc| match document_to_listing(doc) {
            Ok(listing) => Some(listing),
            Err(e) => {
                warn!("Skipping listing document: {}", e);
                None
            }
        })
        .collect()
}
