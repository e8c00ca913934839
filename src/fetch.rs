//! Feed retrieval.
//!
//! Downloads the feed with a blocking HTTP client, or reads it from disk when
//! the configuration points at a local file. The body is returned as raw
//! bytes; decoding is left to [`crate::feed`].

use anyhow::{Context, Result};
use std::time::Duration;

use crate::config::{FeedConfig, FeedSource};

/// Fetch the raw feed bytes from the configured source.
pub fn fetch_feed(config: &FeedConfig) -> Result<Vec<u8>> {
    match config.source()? {
        FeedSource::Url(url) => fetch_url(&url, config.timeout_secs),
        FeedSource::Path(path) => std::fs::read(&path)
            .with_context(|| format!("Failed to read feed file: {}", path.display())),
    }
}

fn fetch_url(url: &str, timeout_secs: u64) -> Result<Vec<u8>> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .redirect(reqwest::redirect::Policy::limited(10))
        .user_agent(concat!("feed-enrich/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    let resp = client
        .get(url)
        .send()
        .with_context(|| format!("Failed to download feed from {}", url))?
        .error_for_status()
        .with_context(|| format!("Feed request to {} failed", url))?;

    let bytes = resp
        .bytes()
        .with_context(|| format!("Failed to read feed body from {}", url))?;
    Ok(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_local_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"<rss/>").unwrap();
        let cfg = FeedConfig {
            url: None,
            path: Some(file.path().to_path_buf()),
            namespace_prefix: "g".to_string(),
            item_element: "item".to_string(),
            timeout_secs: 5,
        };
        assert_eq!(fetch_feed(&cfg).unwrap(), b"<rss/>");
    }

    #[test]
    fn missing_local_file_is_an_error() {
        let cfg = FeedConfig {
            url: None,
            path: Some("/nonexistent/feed.xml".into()),
            namespace_prefix: "g".to_string(),
            item_element: "item".to_string(),
            timeout_secs: 5,
        };
        let err = fetch_feed(&cfg).unwrap_err();
        assert!(err.to_string().contains("Failed to read feed file"));
    }
}
