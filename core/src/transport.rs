//! Executes `HttpRequest` values over the network.
//!
//! # Design
//! The `Transport` seam is where the host-does-IO split meets real I/O.
//! `UreqTransport` is the blocking production implementation; tests plug in
//! scripted transports. 4xx/5xx responses are data, not transport errors:
//! only failures that produced no response at all surface as
//! `TransportError`.

use std::sync::Arc;

use ureq::http::Response;
use ureq::{Agent, Body, RequestBuilder};

use crate::config::DEFAULT_REQUEST_TIMEOUT;
use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request)
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request)
    }
}

/// Blocking HTTP transport built on a shared `ureq::Agent`.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl UreqTransport {
    /// Agent that returns 4xx/5xx as responses so the client can read the
    /// server's error message. Requests without their own timeout fall back
    /// to the general request timeout.
    pub fn new() -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(DEFAULT_REQUEST_TIMEOUT))
            .build()
            .new_agent();
        Self { agent }
    }

    fn prepare<B>(builder: RequestBuilder<B>, request: &HttpRequest) -> RequestBuilder<B> {
        let builder = match request.timeout {
            Some(timeout) => builder.config().timeout_global(Some(timeout)).build(),
            None => builder,
        };
        request
            .headers
            .iter()
            .fold(builder, |b, (k, v)| b.header(k.as_str(), v.as_str()))
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.path.as_str();
        tracing::debug!(method = %request.method, url, "sending request");

        let body = request.body.as_deref();
        let result = match request.method {
            HttpMethod::Get => Self::prepare(self.agent.get(url), request).call(),
            HttpMethod::Delete => Self::prepare(self.agent.delete(url), request).call(),
            HttpMethod::Post => send(Self::prepare(self.agent.post(url), request), body),
            HttpMethod::Put => send(Self::prepare(self.agent.put(url), request), body),
        };

        let response = result.map_err(|err| {
            tracing::debug!(method = %request.method, url, error = %err, "transport failure");
            map_error(err)
        })?;
        into_response(response)
    }
}

fn send(
    builder: RequestBuilder<ureq::typestate::WithBody>,
    body: Option<&str>,
) -> Result<Response<Body>, ureq::Error> {
    match body {
        Some(body) => builder.send(body.as_bytes()),
        None => builder.send_empty(),
    }
}

fn into_response(mut response: Response<Body>) -> Result<HttpResponse, TransportError> {
    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
        .collect();
    let body = response
        .body_mut()
        .read_to_string()
        .map_err(map_error)?;
    Ok(HttpResponse {
        status,
        headers,
        body,
    })
}

fn map_error(err: ureq::Error) -> TransportError {
    match err {
        ureq::Error::Timeout(_) => TransportError::Timeout,
        other => TransportError::Connection(other.to_string()),
    }
}
