//! The proxy abstraction and the expression gate that decorates it
//!
//! A [`Proxy`] is anything that turns a [`Request`] into a [`Response`]. The gate wraps
//! another proxy and only lets calls through while the route's expressions hold.

mod factory;
mod gate;
mod model;

pub use factory::{BackendFactory, CelBackendFactory, CelProxyFactory, ProxyFactory};
pub use gate::{Gate, gate_proxy};
pub use model::{Metadata, Request, Response};

use crate::expr::{Phase, Rejection};
use async_trait::async_trait;
use core::fmt::{self, Debug};
use std::sync::Arc;

/// A handler in the gateway pipeline.
#[async_trait]
pub trait Proxy: Send + Sync + Debug {
    async fn call(&self, request: Request) -> Result<Response, ProxyError>;
}

/// Errors surfaced by a proxy.
#[derive(Debug)]
pub enum ProxyError {
    /// An expression did not let the call through
    Aborted {
        name: String,
        phase: Phase,
        expression: Arc<str>,
        reason: Rejection,
    },

    /// The wrapped handler failed
    Backend(ohno::AppError),
}

impl ProxyError {
    #[must_use]
    pub const fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }
}

impl fmt::Display for ProxyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aborted {
                name,
                phase,
                expression,
                reason,
            } => write!(f, "request aborted by {name}-{phase}: expression '{expression}' {reason}"),
            Self::Backend(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ProxyError {}

impl From<ohno::AppError> for ProxyError {
    fn from(e: ohno::AppError) -> Self {
        Self::Backend(e)
    }
}

/// A proxy that answers every call with the same response.
#[derive(Debug, Clone)]
pub struct StaticProxy {
    response: Response,
}

impl StaticProxy {
    #[must_use]
    pub const fn new(response: Response) -> Self {
        Self { response }
    }
}

#[async_trait]
impl Proxy for StaticProxy {
    async fn call(&self, _request: Request) -> Result<Response, ProxyError> {
        Ok(self.response.clone())
    }
}
