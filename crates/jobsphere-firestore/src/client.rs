//! Firestore REST API client.
//!
//! Every call goes through [`FirestoreClient::execute_request`], which wraps
//! it in a `firestore_request` span and records request metrics. Calls that
//! come back with an expired access token are retried once with a fresh one.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use gcp_auth::{CustomServiceAccount, TokenProvider};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::{debug, info, info_span, Instrument};

use crate::error::{FirestoreError, FirestoreResult};
use crate::metrics::{record_documents_returned, record_request};
use crate::retry::RetryConfig;
use crate::token_cache::TokenCache;
use crate::types::{
    Document, ListDocumentsResponse, RunQueryRequest, RunQueryResponse, StructuredQuery, Value,
};

/// Bearer token the Firestore emulator accepts as an admin credential.
const EMULATOR_TOKEN: &str = "owner";

// =============================================================================
// Configuration
// =============================================================================

#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    pub project_id: String,
    /// Usually `(default)`.
    pub database_id: String,
    /// `host:port` of a Firestore emulator. When set, requests go over plain
    /// HTTP and no service account is needed.
    pub emulator_host: Option<String>,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub retry: RetryConfig,
}

impl FirestoreConfig {
    /// Build the config from the environment.
    ///
    /// `GCP_PROJECT_ID` (or `FIREBASE_PROJECT_ID`) is required.
    pub fn from_env() -> FirestoreResult<Self> {
        let project_id = std::env::var("GCP_PROJECT_ID")
            .or_else(|_| std::env::var("FIREBASE_PROJECT_ID"))
            .map_err(|_| {
                FirestoreError::auth_error(
                    "GCP_PROJECT_ID or FIREBASE_PROJECT_ID must be set to access Firestore",
                )
            })?;

        if project_id.trim().is_empty() {
            return Err(FirestoreError::auth_error(
                "GCP_PROJECT_ID or FIREBASE_PROJECT_ID cannot be empty",
            ));
        }

        let secs = |key: &str, default: u64| {
            std::env::var(key)
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(default))
        };

        Ok(Self {
            project_id,
            database_id: std::env::var("FIRESTORE_DATABASE_ID")
                .unwrap_or_else(|_| "(default)".to_string()),
            emulator_host: std::env::var("FIRESTORE_EMULATOR_HOST")
                .ok()
                .filter(|h| !h.trim().is_empty()),
            timeout: secs("FIRESTORE_TIMEOUT_SECS", 30),
            connect_timeout: secs("FIRESTORE_CONNECT_TIMEOUT_SECS", 5),
            retry: RetryConfig::from_env(),
        })
    }

    /// Config pointed at an emulator, with default timeouts.
    pub fn emulator(project_id: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            database_id: "(default)".to_string(),
            emulator_host: Some(host.into()),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            retry: RetryConfig::default(),
        }
    }

    fn base_url(&self) -> String {
        match &self.emulator_host {
            Some(host) => format!(
                "http://{}/v1/projects/{}/databases/{}/documents",
                host.trim_end_matches('/'),
                self.project_id,
                self.database_id
            ),
            None => format!(
                "https://firestore.googleapis.com/v1/projects/{}/databases/{}/documents",
                self.project_id, self.database_id
            ),
        }
    }
}

// =============================================================================
// Client
// =============================================================================

#[derive(Clone)]
enum Auth {
    ServiceAccount(Arc<TokenCache>),
    Emulator,
}

/// Firestore REST API client. Cheap to clone.
#[derive(Clone)]
pub struct FirestoreClient {
    http: Client,
    config: FirestoreConfig,
    base_url: String,
    auth: Auth,
}

impl FirestoreClient {
    pub async fn new(config: FirestoreConfig) -> FirestoreResult<Self> {
        let auth = match &config.emulator_host {
            Some(host) => {
                info!(host = %host, "Using Firestore emulator");
                Auth::Emulator
            }
            None => Auth::ServiceAccount(Arc::new(TokenCache::new(Self::service_account()?))),
        };

        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("jobsphere-firestore/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FirestoreError::Network)?;

        Ok(Self {
            base_url: config.base_url(),
            http,
            config,
            auth,
        })
    }

    pub async fn from_env() -> FirestoreResult<Self> {
        Self::new(FirestoreConfig::from_env()?).await
    }

    fn service_account() -> FirestoreResult<Arc<dyn TokenProvider>> {
        match CustomServiceAccount::from_env() {
            Ok(Some(sa)) => Ok(Arc::new(sa)),
            Ok(None) => Err(FirestoreError::auth_error(
                "GOOGLE_APPLICATION_CREDENTIALS not set. \
                 Set it to the path of your service account JSON file, \
                 or set FIRESTORE_EMULATOR_HOST.",
            )),
            Err(e) => Err(FirestoreError::auth_error(format!(
                "Failed to load service account: {}",
                e
            ))),
        }
    }

    pub fn config(&self) -> &FirestoreConfig {
        &self.config
    }

    /// `projects/{p}/databases/{d}/documents/{collection}/{id}`
    pub fn full_document_name(&self, collection: &str, doc_id: &str) -> String {
        format!(
            "projects/{}/databases/{}/documents/{}/{}",
            self.config.project_id, self.config.database_id, collection, doc_id
        )
    }

    fn document_url(&self, collection: &str, doc_id: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            collection,
            urlencoding::encode(doc_id)
        )
    }

    // =========================================================================
    // CRUD Operations
    // =========================================================================

    /// Fetch a document. A missing document is `Ok(None)`.
    pub async fn get_document(
        &self,
        collection: &str,
        doc_id: &str,
    ) -> FirestoreResult<Option<Document>> {
        let url = self.document_url(collection, doc_id);

        self.execute_request("get_document", collection, Some(doc_id), async {
            let response = self.send(|token| self.http.get(&url).bearer_auth(token)).await?;
            match response.status() {
                StatusCode::OK => Ok(Some(response.json().await?)),
                StatusCode::NOT_FOUND => Ok(None),
                status => Err(Self::error_from_response(status, &url, response).await),
            }
        })
        .await
    }

    /// Create a document with a caller-chosen id.
    pub async fn create_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
    ) -> FirestoreResult<Document> {
        let url = format!(
            "{}/{}?documentId={}",
            self.base_url,
            collection,
            urlencoding::encode(doc_id)
        );
        let body = Document::new(fields);

        self.execute_request("create_document", collection, Some(doc_id), async {
            let response = self
                .send(|token| self.http.post(&url).bearer_auth(token).json(&body))
                .await?;
            match response.status() {
                StatusCode::OK | StatusCode::CREATED => Ok(response.json().await?),
                StatusCode::CONFLICT => Err(FirestoreError::AlreadyExists(format!(
                    "{}/{}",
                    collection, doc_id
                ))),
                status => Err(Self::error_from_response(status, &url, response).await),
            }
        })
        .await
    }

    /// Create a document and let Firestore assign its id.
    pub async fn add_document(
        &self,
        collection: &str,
        fields: HashMap<String, Value>,
    ) -> FirestoreResult<Document> {
        let url = format!("{}/{}", self.base_url, collection);
        let body = Document::new(fields);

        self.execute_request("add_document", collection, None, async {
            let response = self
                .send(|token| self.http.post(&url).bearer_auth(token).json(&body))
                .await?;
            match response.status() {
                StatusCode::OK | StatusCode::CREATED => {
                    let doc: Document = response.json().await?;
                    if doc.id().is_none() {
                        return Err(FirestoreError::invalid_response(
                            "created document has no name",
                        ));
                    }
                    Ok(doc)
                }
                status => Err(Self::error_from_response(status, &url, response).await),
            }
        })
        .await
    }

    /// Patch a document. With a mask, only the listed fields are written and
    /// the document must already exist.
    pub async fn update_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
        update_mask: Option<Vec<String>>,
    ) -> FirestoreResult<Document> {
        let mut params: Vec<String> = Vec::new();
        if let Some(mask) = &update_mask {
            params.extend(
                mask.iter()
                    .map(|f| format!("updateMask.fieldPaths={}", urlencoding::encode(f))),
            );
            params.push("currentDocument.exists=true".to_string());
        }
        let mut url = self.document_url(collection, doc_id);
        if !params.is_empty() {
            url = format!("{}?{}", url, params.join("&"));
        }
        let body = Document::new(fields);

        self.execute_request("update_document", collection, Some(doc_id), async {
            let response = self
                .send(|token| self.http.patch(&url).bearer_auth(token).json(&body))
                .await?;
            match response.status() {
                StatusCode::OK => Ok(response.json().await?),
                StatusCode::NOT_FOUND => {
                    Err(FirestoreError::not_found(format!("{}/{}", collection, doc_id)))
                }
                status => Err(Self::error_from_response(status, &url, response).await),
            }
        })
        .await
    }

    /// Delete a document. Deleting a missing document succeeds.
    pub async fn delete_document(&self, collection: &str, doc_id: &str) -> FirestoreResult<()> {
        let url = self.document_url(collection, doc_id);

        self.execute_request("delete_document", collection, Some(doc_id), async {
            let response = self
                .send(|token| self.http.delete(&url).bearer_auth(token))
                .await?;
            match response.status() {
                StatusCode::OK | StatusCode::NO_CONTENT => Ok(()),
                StatusCode::NOT_FOUND => {
                    debug!("Document {}/{} already deleted", collection, doc_id);
                    Ok(())
                }
                status => Err(Self::error_from_response(status, &url, response).await),
            }
        })
        .await
    }

    /// List one page of a collection.
    pub async fn list_documents(
        &self,
        collection: &str,
        page_size: Option<u32>,
        page_token: Option<&str>,
    ) -> FirestoreResult<ListDocumentsResponse> {
        let mut params = Vec::new();
        if let Some(size) = page_size {
            params.push(format!("pageSize={}", size));
        }
        if let Some(token) = page_token {
            params.push(format!("pageToken={}", urlencoding::encode(token)));
        }
        let mut url = format!("{}/{}", self.base_url, collection);
        if !params.is_empty() {
            url = format!("{}?{}", url, params.join("&"));
        }

        self.execute_request("list_documents", collection, None, async {
            let response = self.send(|token| self.http.get(&url).bearer_auth(token)).await?;
            match response.status() {
                StatusCode::OK => {
                    let list: ListDocumentsResponse = response.json().await?;
                    record_documents_returned(
                        collection,
                        list.documents.as_ref().map_or(0, Vec::len),
                    );
                    Ok(list)
                }
                status => Err(Self::error_from_response(status, &url, response).await),
            }
        })
        .await
    }

    // =========================================================================
    // Query Operations
    // =========================================================================

    /// Run a structured query.
    ///
    /// `parent_path` is the document containing the queried collection; an
    /// empty path queries top-level collections.
    pub async fn run_query(
        &self,
        parent_path: &str,
        query: StructuredQuery,
    ) -> FirestoreResult<Vec<Document>> {
        let url = if parent_path.is_empty() {
            format!("{}:runQuery", self.base_url)
        } else {
            format!("{}/{}:runQuery", self.base_url, parent_path)
        };
        let collection = query
            .from
            .first()
            .map(|c| c.collection_id.clone())
            .unwrap_or_default();
        let request = RunQueryRequest {
            structured_query: query,
        };

        self.execute_request("run_query", &collection, None, async {
            let response = self
                .send(|token| self.http.post(&url).bearer_auth(token).json(&request))
                .await?;
            match response.status() {
                StatusCode::OK => {
                    let body = response.text().await?;
                    // The response is a JSON array; entries without a
                    // document only carry a read time.
                    let entries: Vec<RunQueryResponse> =
                        serde_json::from_str(&body).map_err(|e| {
                            FirestoreError::invalid_response(format!(
                                "runQuery response: {} (body prefix: {})",
                                e,
                                body.chars().take(200).collect::<String>()
                            ))
                        })?;
                    let docs: Vec<Document> =
                        entries.into_iter().filter_map(|r| r.document).collect();
                    record_documents_returned(&collection, docs.len());
                    Ok(docs)
                }
                status => Err(Self::error_from_response(status, &url, response).await),
            }
        })
        .await
    }

    /// Run `op` under this client's retry policy.
    pub async fn with_retry<T, F, Fut>(&self, operation: &str, op: F) -> FirestoreResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = FirestoreResult<T>>,
    {
        crate::retry::with_retry(&self.config.retry, operation, op).await
    }

    // =========================================================================
    // Internal Helpers
    // =========================================================================

    async fn token(&self) -> FirestoreResult<String> {
        match &self.auth {
            Auth::ServiceAccount(cache) => cache.get_token().await,
            Auth::Emulator => Ok(EMULATOR_TOKEN.to_string()),
        }
    }

    fn is_access_token_expired(body: &str) -> bool {
        body.contains("ACCESS_TOKEN_EXPIRED") || body.contains("\"UNAUTHENTICATED\"")
    }

    /// Send a request built by `build`. A 401 caused by an expired token is
    /// retried once with a freshly fetched token; any other 401 is an error.
    async fn send<F>(&self, build: F) -> FirestoreResult<Response>
    where
        F: Fn(&str) -> RequestBuilder,
    {
        let token = self.token().await?;
        let response = build(&token).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let url = response.url().to_string();
        let body = response.text().await.unwrap_or_default();
        match &self.auth {
            Auth::ServiceAccount(cache) if Self::is_access_token_expired(&body) => {
                debug!("Access token rejected as expired, refreshing");
                cache.invalidate().await;
                let token = cache.get_token().await?;
                Ok(build(&token).send().await?)
            }
            _ => Err(FirestoreError::from_http_status(
                StatusCode::UNAUTHORIZED.as_u16(),
                format!("{} failed: {}", url, body),
            )),
        }
    }

    async fn execute_request<T, F>(
        &self,
        operation: &str,
        collection: &str,
        doc_id: Option<&str>,
        fut: F,
    ) -> FirestoreResult<T>
    where
        F: std::future::Future<Output = FirestoreResult<T>>,
    {
        let span = match doc_id {
            Some(id) => info_span!(
                "firestore_request",
                operation = %operation,
                collection = %collection,
                doc_id = %id
            ),
            None => info_span!("firestore_request", operation = %operation, collection = %collection),
        };

        let start = Instant::now();
        let result = fut.instrument(span).await;
        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.http_status().unwrap_or(500),
        };
        record_request(operation, status, start.elapsed().as_millis() as f64);

        result
    }

    async fn error_from_response(status: StatusCode, url: &str, response: Response) -> FirestoreError {
        let body = response.text().await.unwrap_or_default();
        FirestoreError::from_http_status(status.as_u16(), format!("{} failed: {}", url, body))
    }
}
