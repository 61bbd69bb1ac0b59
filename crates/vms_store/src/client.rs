//! PocketBase HTTP client
//!
//! Talks to the admin API with raw JSON requests. The admin token is acquired on
//! the first privileged call and cached on the client instance; a `401` drops the
//! cached token so the next call authenticates again. Calls are never retried in
//! place.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::sync::RwLock;
use vms_ids::{CollectionId, TenantId};

use crate::error::StoreError;
use crate::store::CollectionStore;
use crate::wire::{
    AdminCredentials, ApiErrorBody, AuthResponse, CollectionRecord, ListPage, NewCollection,
    NewTenant, SchemaUpdate, Session, TenantRecord,
};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8090";
pub const DEFAULT_TENANTS_COLLECTION: &str = "vms_tenants";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const AUTH_PATH: &str = "/api/admins/auth-with-password";
const COLLECTIONS_PATH: &str = "/api/collections";
const LIST_PAGE_SIZE: u32 = 200;
const UNIQUE_VIOLATION: &str = "validation_not_unique";

/// Connection settings for [`PocketBaseClient`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub base_url: String,
    pub admin_email: String,
    pub admin_password: String,
    pub tenants_collection: String,
    /// Skip TLS certificate verification (self-signed development stores).
    pub accept_invalid_certs: bool,
    pub timeout: Duration,
}

impl StoreConfig {
    pub fn new(
        base_url: impl Into<String>,
        admin_email: impl Into<String>,
        admin_password: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            admin_email: admin_email.into(),
            admin_password: admin_password.into(),
            tenants_collection: DEFAULT_TENANTS_COLLECTION.to_string(),
            accept_invalid_certs: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_tenants_collection(mut self, collection: impl Into<String>) -> Self {
        self.tenants_collection = collection.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }
}

/// [`CollectionStore`] backed by a PocketBase server.
pub struct PocketBaseClient {
    config: StoreConfig,
    http_client: reqwest::Client,
    session: RwLock<Option<Session>>,
}

impl PocketBaseClient {
    pub fn new(config: StoreConfig) -> Result<Self, StoreError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;
        Ok(Self {
            config,
            http_client,
            session: RwLock::new(None),
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Whether an admin token is currently cached.
    pub async fn has_session(&self) -> bool {
        self.session.read().await.is_some()
    }

    pub async fn clear_session(&self) {
        self.session.write().await.take();
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn records_path(&self) -> String {
        format!(
            "{}/{}/records",
            COLLECTIONS_PATH, self.config.tenants_collection
        )
    }

    /// Cached session, authenticating first if there is none.
    async fn session(&self) -> Result<Session, StoreError> {
        if let Some(session) = self.session.read().await.as_ref() {
            return Ok(session.clone());
        }
        self.authenticate().await
    }

    /// Send a privileged request and decode a successful JSON body.
    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, StoreError> {
        let session = self.session().await?;
        let response = request.bearer_auth(session.token()).send().await?;
        let response = self.check(response).await?;
        Ok(response.json().await?)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http_client.request(method, self.url(path))
    }

    async fn check(&self, response: Response) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let body: ApiErrorBody = serde_json::from_str(&text).unwrap_or_else(|_| ApiErrorBody {
            message: text.clone(),
            ..ApiErrorBody::default()
        });

        match status {
            StatusCode::UNAUTHORIZED => {
                tracing::warn!("Store rejected admin token, dropping cached session");
                self.clear_session().await;
                Err(StoreError::Auth(body.describe()))
            }
            StatusCode::FORBIDDEN => Err(StoreError::Auth(body.describe())),
            StatusCode::NOT_FOUND => Err(StoreError::NotFound(body.describe())),
            _ if body.has_violation(UNIQUE_VIOLATION) => Err(StoreError::Conflict(body.describe())),
            _ => Err(StoreError::Api {
                status: status.as_u16(),
                message: body.describe(),
            }),
        }
    }

    async fn first_tenant(&self, tenant_id: &TenantId) -> Result<Option<TenantRecord>, StoreError> {
        // TenantId is restricted to [a-z0-9], safe to embed in a filter literal.
        let filter = format!("tenant_id='{}'", tenant_id);
        let request = self
            .request(Method::GET, &self.records_path())
            .query(&[("filter", filter.as_str()), ("perPage", "1")]);
        let page: ListPage<TenantRecord> = self.send_json(request).await?;
        Ok(page.items.into_iter().next())
    }
}

#[async_trait]
impl CollectionStore for PocketBaseClient {
    fn name(&self) -> &str {
        "pocketbase"
    }

    async fn authenticate(&self) -> Result<Session, StoreError> {
        if self.config.admin_email.is_empty() || self.config.admin_password.is_empty() {
            return Err(StoreError::Auth("admin credentials are not configured".into()));
        }

        tracing::info!("Authenticating against store at {}", self.config.base_url);

        let response = self
            .request(Method::POST, AUTH_PATH)
            .json(&AdminCredentials {
                identity: &self.config.admin_email,
                password: &self.config.admin_password,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .map(|body| body.describe())
                .unwrap_or(text);
            return Err(StoreError::Auth(format!("{} ({})", message, status)));
        }

        let auth: AuthResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Auth(format!("unreadable auth response: {}", e)))?;
        let session = Session::new(auth.token);
        *self.session.write().await = Some(session.clone());
        tracing::debug!("Admin session established");
        Ok(session)
    }

    async fn create_collection(&self, spec: &NewCollection) -> Result<CollectionRecord, StoreError> {
        tracing::debug!("Creating collection {}", spec.name);
        let request = self.request(Method::POST, COLLECTIONS_PATH).json(spec);
        self.send_json(request).await
    }

    async fn update_collection(
        &self,
        id: &CollectionId,
        update: &SchemaUpdate,
    ) -> Result<CollectionRecord, StoreError> {
        tracing::debug!("Updating collection {}", id);
        let request = self
            .request(Method::PATCH, &format!("{}/{}", COLLECTIONS_PATH, id))
            .json(update);
        self.send_json(request).await
    }

    async fn create_tenant_record(
        &self,
        name: &str,
        tenant_id: &TenantId,
    ) -> Result<TenantRecord, StoreError> {
        let request = self
            .request(Method::POST, &self.records_path())
            .json(&NewTenant { name, tenant_id });
        self.send_json(request).await
    }

    async fn identifier_in_use(&self, tenant_id: &TenantId) -> Result<bool, StoreError> {
        Ok(self.first_tenant(tenant_id).await?.is_some())
    }

    async fn find_tenant(&self, tenant_id: &TenantId) -> Result<Option<TenantRecord>, StoreError> {
        self.first_tenant(tenant_id).await
    }

    async fn list_collections(&self, name_prefix: &str) -> Result<Vec<CollectionRecord>, StoreError> {
        let filter = format!("name~'{}%'", name_prefix.replace('\'', "\\'"));
        let page_size = LIST_PAGE_SIZE.to_string();
        let mut collections = Vec::new();
        let mut page_number: u32 = 1;

        loop {
            let page_param = page_number.to_string();
            let request = self.request(Method::GET, COLLECTIONS_PATH).query(&[
                ("filter", filter.as_str()),
                ("perPage", page_size.as_str()),
                ("page", page_param.as_str()),
            ]);
            let page: ListPage<CollectionRecord> = self.send_json(request).await?;
            let fetched = page.items.len();
            collections.extend(page.items);
            if fetched == 0 || page.page >= page.total_pages {
                break;
            }
            page_number += 1;
        }

        // `~` is a LIKE match where `_` is a wildcard; keep true prefix matches only.
        collections.retain(|c| c.name.starts_with(name_prefix));
        Ok(collections)
    }
}
