//! Job listing handlers.
//!
//! Reads are public. Writes require a Firebase ID token, and edits and
//! deletes are limited to the listing's owner.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::{info, warn};

use jobsphere_feed::filter_listings;
use jobsphere_firestore::query::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use jobsphere_models::{Listing, ListingCard, ListingDraft, ListingId};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ListJobsQuery {
    /// Case-insensitive substring filter.
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
}

impl ListJobsQuery {
    fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }
}

// ============================================================================
// Public reads
// ============================================================================

/// GET /api/jobs
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListJobsQuery>,
) -> ApiResult<Json<Vec<ListingCard>>> {
    let limit = query.limit();
    let listings = state.listings.list_recent(limit).await?;

    let visible = filter_listings(&listings, query.q.as_deref().unwrap_or_default());
    Ok(Json(visible.iter().map(Listing::card).collect()))
}

/// GET /api/jobs/:id
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ListingCard>> {
    let listing = load_listing(&state, &ListingId::from(id)).await?;
    Ok(Json(listing.card()))
}

// ============================================================================
// Authenticated writes
// ============================================================================

/// POST /api/jobs
pub async fn create_job(
    State(state): State<AppState>,
    user: AuthUser,
    Json(draft): Json<ListingDraft>,
) -> ApiResult<(StatusCode, Json<Listing>)> {
    draft.check()?;

    let listing = state
        .listings
        .create(&draft, &user.uid, &user.display_name())
        .await?;
    metrics::record_listing_write("create");

    Ok((StatusCode::CREATED, Json(listing)))
}

/// PATCH /api/jobs/:id
pub async fn update_job(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(draft): Json<ListingDraft>,
) -> ApiResult<Json<Listing>> {
    let id = ListingId::from(id);
    let existing = load_listing(&state, &id).await?;
    ensure_owner(&existing, &user)?;
    draft.check()?;

    let listing = state.listings.update(&id, &draft).await?;
    metrics::record_listing_write("update");

    Ok(Json(listing))
}

/// DELETE /api/jobs/:id
pub async fn delete_job(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = ListingId::from(id);
    let existing = load_listing(&state, &id).await?;
    ensure_owner(&existing, &user)?;

    state.listings.delete(&id).await?;
    metrics::record_listing_write("delete");
    info!(listing_id = %id, user = %user.uid, "Listing deleted by owner");

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/user/jobs
pub async fn list_user_jobs(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ListJobsQuery>,
) -> ApiResult<Json<Vec<Listing>>> {
    let limit = query.limit();
    let listings = state.listings.list_by_owner(&user.uid, limit).await?;
    Ok(Json(listings))
}

// ============================================================================
// Helpers
// ============================================================================

async fn load_listing(state: &AppState, id: &ListingId) -> ApiResult<Listing> {
    state
        .listings
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Listing {} not found", id)))
}

fn ensure_owner(listing: &Listing, user: &AuthUser) -> ApiResult<()> {
    if listing.is_owned_by(&user.uid) {
        Ok(())
    } else {
        warn!(listing_id = %listing.id, user = %user.uid, "Rejected write by non-owner");
        Err(ApiError::forbidden("Only the owner can modify this listing"))
    }
}
