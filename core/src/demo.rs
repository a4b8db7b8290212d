//! Demo-mode fallback for an unreachable backend.
//!
//! # Design
//! `DemoFallback` decorates any `Transport`. A transport failure on any call
//! flips the shared `DemoMode` flag on; only a successful
//! `check_backend_health` flips it off again. Views that want to keep
//! rendering while offline wrap their calls in `or_sample`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{ApiError, TransportError};
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::Transport;

/// Cloneable handle to the demo-mode flag.
#[derive(Debug, Clone, Default)]
pub struct DemoMode(Arc<AtomicBool>);

impl DemoMode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Returns the previous value.
    fn set(&self, active: bool) -> bool {
        self.0.swap(active, Ordering::SeqCst)
    }
}

/// Transport decorator that tracks backend availability.
#[derive(Debug)]
pub struct DemoFallback<T> {
    inner: T,
    health_check: HttpRequest,
    mode: DemoMode,
}

impl<T: Transport> DemoFallback<T> {
    /// `health_check` is usually `FinanceClient::build_health_check()`.
    pub fn new(inner: T, health_check: HttpRequest) -> Self {
        Self {
            inner,
            health_check,
            mode: DemoMode::new(),
        }
    }

    pub fn mode(&self) -> DemoMode {
        self.mode.clone()
    }

    pub fn is_in_demo_mode(&self) -> bool {
        self.mode.is_active()
    }

    /// Probe the health endpoint within its timeout. Any failure, including
    /// a non-2xx answer, turns demo mode on; a 2xx answer turns it off.
    pub fn check_backend_health(&self) -> bool {
        let healthy = match self.inner.execute(&self.health_check) {
            Ok(response) if response.is_success() => true,
            Ok(response) => {
                tracing::warn!(status = response.status, "health check returned an error status");
                false
            }
            Err(err) => {
                tracing::warn!(error = %err, "health check failed");
                false
            }
        };
        let was_active = self.mode.set(!healthy);
        if was_active && healthy {
            tracing::info!("backend reachable again, leaving demo mode");
        } else if !was_active && !healthy {
            tracing::warn!("backend unreachable, entering demo mode");
        }
        healthy
    }
}

impl<T: Transport> Transport for DemoFallback<T> {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.inner.execute(request).inspect_err(|err| {
            if !self.mode.set(true) {
                tracing::warn!(url = %request.path, error = %err, "backend unreachable, entering demo mode");
            }
        })
    }
}

/// Substitute sample data when the backend is unavailable; every other
/// outcome passes through untouched.
pub fn or_sample<V, F>(result: Result<V, ApiError>, sample: F) -> Result<V, ApiError>
where
    F: FnOnce() -> V,
{
    match result {
        Err(ApiError::BackendUnavailable(reason)) => {
            tracing::debug!(%reason, "serving sample data");
            Ok(sample())
        }
        other => other,
    }
}
