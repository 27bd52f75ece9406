//! Structured queries over the listings collection.

use crate::listings_repo::{fields, LISTINGS_COLLECTION};
use crate::types::{
    CollectionSelector, Cursor, Document, FieldReference, Filter, Order, StructuredQuery,
    ToFirestoreValue, Value,
};

/// Pseudo-field naming the document itself.
pub const DOCUMENT_NAME: &str = "__name__";

// ============================================================================
// Page Size
// ============================================================================

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MIN_PAGE_SIZE: u32 = 1;
pub const MAX_PAGE_SIZE: u32 = 500;

/// Clamp a requested result count into the supported range.
pub fn normalize_page_size(limit: Option<u32>) -> i32 {
    limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE) as i32
}

// ============================================================================
// Query Builders
// ============================================================================

fn listings_from() -> Vec<CollectionSelector> {
    vec![CollectionSelector {
        collection_id: LISTINGS_COLLECTION.to_string(),
        all_descendants: None,
    }]
}

fn order(field_path: &str, direction: &str) -> Order {
    Order {
        field: FieldReference {
            field_path: field_path.to_string(),
        },
        direction: direction.to_string(),
    }
}

fn newest_first() -> Vec<Order> {
    vec![
        order(fields::CREATED_AT, "DESCENDING"),
        order(DOCUMENT_NAME, "DESCENDING"),
    ]
}

/// Newest listings first.
///
/// Ties on `createdAt` are broken by document name so that consecutive polls
/// return the same order. Documents without `createdAt` are excluded by
/// Firestore's ordering semantics.
pub fn build_recent_listings_query(limit: Option<u32>) -> StructuredQuery {
    StructuredQuery {
        from: listings_from(),
        r#where: None,
        order_by: Some(newest_first()),
        start_at: None,
        limit: Some(normalize_page_size(limit)),
    }
}

/// One page of the newest-first listing order, resuming after `start_after`.
pub fn build_listings_page_query(page_size: u32, start_after: Option<Cursor>) -> StructuredQuery {
    StructuredQuery {
        start_at: start_after,
        ..build_recent_listings_query(Some(page_size))
    }
}

/// One page of the listings posted by `owner_id`, in document-name order.
///
/// Ordering on the name alone needs no composite index; callers collect every
/// page and sort by creation time themselves.
pub fn build_owner_listings_page_query(
    owner_id: &str,
    page_size: u32,
    start_after: Option<Cursor>,
) -> StructuredQuery {
    StructuredQuery {
        from: listings_from(),
        r#where: Some(Filter::equal(fields::USER_ID, owner_id.to_firestore_value())),
        order_by: Some(vec![order(DOCUMENT_NAME, "ASCENDING")]),
        start_at: start_after,
        limit: Some(normalize_page_size(Some(page_size))),
    }
}

/// Cursor positioned just after `doc` in a query ordered by `order_by`.
///
/// `None` when the document lacks one of the ordered fields.
pub fn cursor_after(doc: &Document, order_by: &[Order]) -> Option<Cursor> {
    let values = order_by
        .iter()
        .map(|o| match o.field.field_path.as_str() {
            DOCUMENT_NAME => doc.name.clone().map(Value::ReferenceValue),
            field => doc.fields.as_ref().and_then(|f| f.get(field)).cloned(),
        })
        .collect::<Option<Vec<_>>>()?;

    Some(Cursor {
        values,
        before: Some(false),
    })
}
