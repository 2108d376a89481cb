//! Resource fetching for file-field import.
//!
//! A file-field cell names a resource by URL or local path. The fetcher is
//! an injected collaborator so tests and embedded callers can stub it.

use crate::error::{FetchError, FetchResult};

/// Fetch the bytes behind a URL-like string.
pub trait ResourceFetcher {
    fn fetch(&self, location: &str) -> FetchResult<Vec<u8>>;
}

/// Blocking HTTP fetcher with a local-filesystem fallback.
///
/// `http://` and `https://` locations go over the wire; anything else is
/// read as a local path. The client is built with its timeout disabled:
/// fetches block until the resource answers, so a hung remote stalls the
/// run. The row-count ceiling is the only resource guard.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> FetchResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(None)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

impl ResourceFetcher for HttpFetcher {
    fn fetch(&self, location: &str) -> FetchResult<Vec<u8>> {
        if location.starts_with("http://") || location.starts_with("https://") {
            let response = self
                .client
                .get(location)
                .send()
                .map_err(|e| FetchError::Request(e.to_string()))?;

            if !response.status().is_success() {
                return Err(FetchError::Status {
                    status: response.status().as_u16(),
                    url: location.to_string(),
                });
            }

            let bytes = response
                .bytes()
                .map_err(|e| FetchError::Request(e.to_string()))?;
            Ok(bytes.to_vec())
        } else {
            Ok(std::fs::read(location)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_local_file_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.png");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"not really a png").unwrap();

        let fetcher = HttpFetcher::new().unwrap();
        let bytes = fetcher.fetch(path.to_str().unwrap()).unwrap();
        assert_eq!(bytes, b"not really a png");
    }

    #[test]
    fn test_missing_local_file_fails() {
        let fetcher = HttpFetcher::new().unwrap();
        let err = fetcher.fetch("/no/such/file.png").unwrap_err();
        assert!(matches!(err, FetchError::Io(_)));
    }
}
