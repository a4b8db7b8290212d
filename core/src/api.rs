//! Executing API client: builder + token lookup + transport + parser.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::client::FinanceClient;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::storage::{Storage, TOKEN_KEY};
use crate::transport::Transport;
use crate::types::Resource;

/// Runs requests built by `FinanceClient` through a `Transport`, injecting
/// the bearer token currently held in storage.
pub struct ApiClient<T> {
    client: FinanceClient,
    transport: T,
    storage: Arc<dyn Storage>,
}

impl<T: Transport> ApiClient<T> {
    pub fn new(client: FinanceClient, transport: T, storage: Arc<dyn Storage>) -> Self {
        Self {
            client,
            transport,
            storage,
        }
    }

    pub fn client(&self) -> &FinanceClient {
        &self.client
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// One-shot request: JSON body in, JSON body out. No retries.
    pub fn request<B, R>(&self, method: HttpMethod, path: &str, body: Option<&B>) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let request = self.client.build(method, path, body)?;
        self.send_json(request)
    }

    /// Bodiless counterpart of `request`.
    pub fn request_empty<R: DeserializeOwned>(&self, method: HttpMethod, path: &str) -> Result<R, ApiError> {
        self.request::<(), R>(method, path, None)
    }

    /// Authorize and execute a prebuilt request, parsing a JSON body.
    pub fn send_json<R: DeserializeOwned>(&self, request: HttpRequest) -> Result<R, ApiError> {
        let response = self.execute(request)?;
        self.client.parse_json(response)
    }

    /// Authorize and execute a prebuilt request, ignoring the body.
    pub fn send_empty(&self, request: HttpRequest) -> Result<(), ApiError> {
        let response = self.execute(request)?;
        self.client.parse_empty(response)
    }

    fn execute(&self, mut request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let token = self.storage.get(TOKEN_KEY)?;
        self.client.authorize(&mut request, token.as_deref());
        let response = self.transport.execute(&request)?;
        tracing::debug!(
            method = %request.method,
            url = %request.path,
            status = response.status,
            "response received"
        );
        Ok(response)
    }

    pub fn list<R: Resource>(&self) -> Result<Vec<R>, ApiError> {
        self.send_json(self.client.build_list::<R>())
    }

    pub fn get<R: Resource>(&self, id: i64) -> Result<R, ApiError> {
        self.send_json(self.client.build_get::<R>(id))
    }

    pub fn create<R: Resource>(&self, input: &R::New) -> Result<R, ApiError> {
        self.send_json(self.client.build_create::<R>(input)?)
    }

    pub fn update<R: Resource>(&self, id: i64, input: &R::Update) -> Result<R, ApiError> {
        self.send_json(self.client.build_update::<R>(id, input)?)
    }

    pub fn delete<R: Resource>(&self, id: i64) -> Result<(), ApiError> {
        self.send_empty(self.client.build_delete::<R>(id))
    }
}
