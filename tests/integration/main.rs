//! Integration tests driving the HTTP transport against mock servers

mod extract_tests;
mod transport_tests;

/// Runs blocking extraction code off the async test runtime
pub async fn blocking<T, F>(f: F) -> T
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .expect("blocking task panicked")
}

/// Resolves `path` against a mock server URI
pub fn url(base: &str, path: &str) -> url::Url {
    url::Url::parse(base).unwrap().join(path).unwrap()
}
