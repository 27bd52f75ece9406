//! Free-text filtering of listings.

use jobsphere_models::Listing;

/// Whether `listing` matches `query`.
///
/// A blank query matches everything. Otherwise the lowercased query must be
/// a substring of the lowercased title, company, description or salary.
/// Absent fields never match.
pub fn matches(listing: &Listing, query: &str) -> bool {
    if query.trim().is_empty() {
        return true;
    }
    let needle = query.to_lowercase();

    [
        &listing.title,
        &listing.company,
        &listing.description,
        &listing.salary,
    ]
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(&needle))
}

/// Matching listings, in their original order.
pub fn filter_listings(items: &[Listing], query: &str) -> Vec<Listing> {
    if query.trim().is_empty() {
        return items.to_vec();
    }
    items
        .iter()
        .filter(|listing| matches(listing, query))
        .cloned()
        .collect()
}
