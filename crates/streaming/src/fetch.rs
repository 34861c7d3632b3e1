use std::future::Future;
use std::pin::Pin;

/// Type alias for a boxed future that can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A failed artifact load. Cloneable so one in-flight failure can be
/// handed to every coalesced waiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadError {
    pub message: String,
}

impl LoadError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for LoadError {}

/// Transport used by the session cache to pull artifact bytes.
///
/// Implementations must be `Send + Sync` for use across async tasks.
/// Methods return boxed futures for dyn-compatibility.
pub trait Fetch: Send + Sync {
    fn fetch(&self, path: &str) -> BoxFuture<'static, Result<Vec<u8>, LoadError>>;
}

/// HTTP transport over reqwest, for consumers loading artifacts from the
/// serving endpoint.
#[cfg(feature = "http")]
pub struct HttpFetch {
    client: reqwest::Client,
    base_url: String,
}

#[cfg(feature = "http")]
impl HttpFetch {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[cfg(feature = "http")]
impl Fetch for HttpFetch {
    fn fetch(&self, path: &str) -> BoxFuture<'static, Result<Vec<u8>, LoadError>> {
        let client = self.client.clone();
        let url = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );

        Box::pin(async move {
            let resp = client
                .get(&url)
                .send()
                .await
                .map_err(|e| LoadError::new(format!("fetch {url}: {e}")))?;

            let status = resp.status();
            if !status.is_success() {
                return Err(LoadError::new(format!(
                    "fetch {url}: HTTP {}",
                    status.as_u16()
                )));
            }

            let bytes = resp
                .bytes()
                .await
                .map_err(|e| LoadError::new(format!("read {url}: {e}")))?;
            Ok(bytes.to_vec())
        })
    }
}
