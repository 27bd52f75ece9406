//! Repository for contact form submissions.

use std::collections::HashMap;

use chrono::Utc;
use tracing::info;

use jobsphere_models::{ContactRecord, ContactStatus, ContactSubject, ValidContact};

use crate::client::FirestoreClient;
use crate::error::{FirestoreError, FirestoreResult};
use crate::types::{Document, ToFirestoreValue, Value};

pub const CONTACTS_COLLECTION: &str = "contacts";

#[derive(Clone)]
pub struct ContactRepository {
    client: FirestoreClient,
}

impl ContactRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    /// Persist a validated submission with status `New`.
    pub async fn create(&self, contact: ValidContact) -> FirestoreResult<ContactRecord> {
        let now = Utc::now();
        let doc = self
            .client
            .add_document(CONTACTS_COLLECTION, contact_to_fields(&contact, now))
            .await?;
        let id = doc
            .id()
            .ok_or_else(|| FirestoreError::invalid_response("contact document has no name"))?;

        info!(contact_id = %id, subject = %contact.subject, "Stored contact submission");
        Ok(ContactRecord::new(id, contact, now))
    }

    pub async fn get(&self, id: &str) -> FirestoreResult<Option<ContactRecord>> {
        match self.client.get_document(CONTACTS_COLLECTION, id).await? {
            Some(doc) => Ok(Some(document_to_contact(&doc)?)),
            None => Ok(None),
        }
    }
}

fn contact_to_fields(contact: &ValidContact, created_at: chrono::DateTime<Utc>) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    fields.insert("name".to_string(), contact.name.to_firestore_value());
    fields.insert("email".to_string(), contact.email.to_firestore_value());
    fields.insert("phone".to_string(), contact.phone.to_firestore_value());
    fields.insert("subject".to_string(), contact.subject.as_str().to_firestore_value());
    fields.insert("message".to_string(), contact.message.to_firestore_value());
    fields.insert("userId".to_string(), contact.user_id.to_firestore_value());
    fields.insert("status".to_string(), ContactStatus::New.as_str().to_firestore_value());
    fields.insert("createdAt".to_string(), created_at.to_firestore_value());
    fields
}

fn document_to_contact(doc: &Document) -> FirestoreResult<ContactRecord> {
    let id = doc
        .id()
        .ok_or_else(|| FirestoreError::invalid_response("contact document has no name"))?;
    let text = |key: &str| doc.get::<String>(key).unwrap_or_default();

    let subject = ContactSubject::parse(&text("subject"))
        .map_err(|e| FirestoreError::invalid_response(format!("contact {}: {}", id, e)))?;
    let created_at = doc
        .get("createdAt")
        .ok_or_else(|| FirestoreError::invalid_response(format!("contact {} has no createdAt", id)))?;

    Ok(ContactRecord {
        id: id.to_string(),
        name: text("name"),
        email: text("email"),
        phone: text("phone"),
        subject,
        message: text("message"),
        user_id: doc.get("userId"),
        status: ContactStatus::from_str(&text("status")),
        created_at,
    })
}
