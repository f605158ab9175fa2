//! Resource fetching seam.
//!
//! The browser build answers these requests with `window.fetch`; the
//! `native` feature provides a reqwest-backed fetcher so an export
//! bundle can be loaded and checked from outside a page.

use crate::error::HostError;

/// A completed request: status line plus the body as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        FetchResponse { status, body: body.into() }
    }

    /// `true` for statuses in `[200, 300)`.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Something that can resolve a relative resource path to a response.
///
/// `Err` means no response at all (network failure, CORS, ...); HTTP
/// error statuses come back as `Ok` with the status set.
#[allow(async_fn_in_trait)]
pub trait ResourceFetcher {
    async fn fetch(&self, path: &str) -> Result<FetchResponse, HostError>;
}

#[cfg(feature = "native")]
pub use native::HttpFetcher;

#[cfg(feature = "native")]
mod native {
    use super::{FetchResponse, ResourceFetcher};
    use crate::error::HostError;
    use reqwest::Url;

    /// Fetches resources relative to a base URL (the page's directory).
    pub struct HttpFetcher {
        client: reqwest::Client,
        base: Url,
    }

    impl HttpFetcher {
        pub fn new(base: &str) -> Result<Self, HostError> {
            let base = Url::parse(base).map_err(|e| HostError(format!("invalid base URL {base}: {e}")))?;
            Ok(HttpFetcher {
                client: reqwest::Client::new(),
                base,
            })
        }

        /// Resolve `path` the way a page would resolve a relative href.
        pub fn resolve(&self, path: &str) -> Result<Url, HostError> {
            self.base
                .join(path)
                .map_err(|e| HostError(format!("cannot resolve {path}: {e}")))
        }
    }

    impl ResourceFetcher for HttpFetcher {
        async fn fetch(&self, path: &str) -> Result<FetchResponse, HostError> {
            let url = self.resolve(path)?;
            log::debug!("GET {url}");
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| HostError(e.to_string()))?;
            let status = response.status().as_u16();
            let body = response.text().await.map_err(|e| HostError(e.to_string()))?;
            Ok(FetchResponse { status, body })
        }
    }

}
