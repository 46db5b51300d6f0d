//! Factory decorators that install the gate while a gateway builds its routes

use super::{Proxy, gate_proxy};
use crate::Result;
use crate::config::{BackendConfig, EndpointConfig};
use std::sync::Arc;

/// Builds the proxy serving an endpoint.
pub trait ProxyFactory: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the endpoint's proxy cannot be built
    fn new_proxy(&self, endpoint: &EndpointConfig) -> Result<Arc<dyn Proxy>>;
}

impl<T> ProxyFactory for T
where
    T: Fn(&EndpointConfig) -> Result<Arc<dyn Proxy>> + Send + Sync,
{
    fn new_proxy(&self, endpoint: &EndpointConfig) -> Result<Arc<dyn Proxy>> {
        self(endpoint)
    }
}

/// Builds the proxy calling one backend.
pub trait BackendFactory: Send + Sync {
    fn new_backend(&self, backend: &BackendConfig) -> Arc<dyn Proxy>;
}

impl<T> BackendFactory for T
where
    T: Fn(&BackendConfig) -> Arc<dyn Proxy> + Send + Sync,
{
    fn new_backend(&self, backend: &BackendConfig) -> Arc<dyn Proxy> {
        self(backend)
    }
}

/// Wraps every endpoint proxy built by `F` with the endpoint's gate.
#[derive(Debug, Clone)]
pub struct CelProxyFactory<F> {
    inner: F,
}

impl<F: ProxyFactory> CelProxyFactory<F> {
    #[must_use]
    pub const fn new(inner: F) -> Self {
        Self { inner }
    }
}

impl<F: ProxyFactory> ProxyFactory for CelProxyFactory<F> {
    fn new_proxy(&self, endpoint: &EndpointConfig) -> Result<Arc<dyn Proxy>> {
        let next = self.inner.new_proxy(endpoint)?;
        Ok(gate_proxy(&format!("endpoint {}", endpoint.endpoint), &endpoint.extra_config, next))
    }
}

/// Wraps every backend proxy built by `F` with the backend's gate.
#[derive(Debug, Clone)]
pub struct CelBackendFactory<F> {
    inner: F,
}

impl<F: BackendFactory> CelBackendFactory<F> {
    #[must_use]
    pub const fn new(inner: F) -> Self {
        Self { inner }
    }
}

impl<F: BackendFactory> BackendFactory for CelBackendFactory<F> {
    fn new_backend(&self, backend: &BackendConfig) -> Arc<dyn Proxy> {
        let next = self.inner.new_backend(backend);
        gate_proxy(&format!("backend {}", backend.url_pattern), &backend.extra_config, next)
    }
}
