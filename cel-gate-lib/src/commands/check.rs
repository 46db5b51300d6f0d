use super::Host;
use super::common::{EndpointArgs, read_json};
use crate::Result;
use crate::config::{BackendConfig, EndpointConfig};
use crate::proxy::{
    BackendFactory, CelBackendFactory, CelProxyFactory, Proxy, ProxyError, ProxyFactory, Request, Response, StaticProxy,
};
use camino::Utf8PathBuf;
use clap::Parser;
use ohno::IntoAppError;
use std::io::Write;
use std::sync::Arc;

#[derive(Parser, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub target: EndpointArgs,

    /// JSON file holding the request (method, path, params, headers, querystring)
    #[arg(long, value_name = "PATH")]
    pub request: Utf8PathBuf,

    /// JSON file holding the response the backend answers with (default is a completed `200` with an empty body)
    #[arg(long, value_name = "PATH")]
    pub response: Option<Utf8PathBuf>,
}

/// Build the endpoint's pipeline the way a gateway would: a gated endpoint proxy in front of
/// the endpoint's first gated backend, which answers with `response`.
fn build_pipeline(endpoint: &EndpointConfig, response: Response) -> Result<Arc<dyn Proxy>> {
    let upstream: Arc<dyn Proxy> = Arc::new(StaticProxy::new(response));

    let backends = {
        let upstream = Arc::clone(&upstream);
        CelBackendFactory::new(move |_: &BackendConfig| Arc::clone(&upstream))
    };

    let proxies = CelProxyFactory::new(move |endpoint: &EndpointConfig| -> Result<Arc<dyn Proxy>> {
        Ok(endpoint
            .backends
            .first()
            .map_or_else(|| Arc::clone(&upstream), |first| backends.new_backend(first)))
    });

    proxies.new_proxy(endpoint)
}

/// Runs a request through an endpoint's gate and reports whether it got through
pub async fn check_request<H: Host>(host: &mut H, args: &CheckArgs) -> Result<()> {
    let endpoint = args.target.load()?;
    let request: Request = read_json(&args.request, "request")?;
    let response = match &args.response {
        Some(path) => read_json(path, "response")?,
        None => Response::new(serde_json::Map::new()),
    };

    let proxy = build_pipeline(&endpoint, response)?;

    match proxy.call(request).await {
        Ok(response) => {
            let body = serde_json::to_string_pretty(&response.data).into_app_err("serializing the response body")?;
            let _ = writeln!(host.output(), "accepted");
            let _ = writeln!(host.output(), "{body}");
            Ok(())
        }
        Err(e @ ProxyError::Aborted { .. }) => {
            let _ = writeln!(host.output(), "rejected: {e}");
            host.exit(1);
            Ok(())
        }
        Err(ProxyError::Backend(e)) => Err(e),
    }
}
