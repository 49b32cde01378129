//! Intercepted requests and cache key normalization.

use bridge_traits::{CacheKey, CacheMode, HttpMethod, HttpRequest};
use std::collections::HashMap;
use url::Url;

use crate::error::Result;

/// A request as seen by the proxy before it reaches the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptedRequest {
    pub method: HttpMethod,
    pub url: Url,
    /// Full-page load (top-level navigation).
    pub navigate: bool,
    pub headers: HashMap<String, String>,
}

impl InterceptedRequest {
    pub fn new(method: HttpMethod, url: Url) -> Self {
        Self {
            method,
            url,
            navigate: false,
            headers: HashMap::new(),
        }
    }

    /// Parse `url` into a plain GET request.
    pub fn get(url: &str) -> Result<Self> {
        Ok(Self::new(HttpMethod::Get, Url::parse(url)?))
    }

    /// Parse `url` into a navigation GET request.
    pub fn navigation(url: &str) -> Result<Self> {
        Ok(Self::get(url)?.navigate(true))
    }

    pub fn navigate(mut self, navigate: bool) -> Self {
        self.navigate = navigate;
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Only http(s) requests are intercepted.
    pub fn is_http(&self) -> bool {
        matches!(self.url.scheme(), "http" | "https")
    }

    /// Responses are only written to storage for GET requests.
    pub fn is_storable(&self) -> bool {
        self.method == HttpMethod::Get
    }

    /// Storage identity: method plus URL without fragment.
    pub fn cache_key(&self) -> CacheKey {
        CacheKey::new(self.method, normalize_url(&self.url).as_str())
    }

    /// Outbound network request for this interception.
    pub fn to_http_request(&self, mode: CacheMode) -> HttpRequest {
        let mut request =
            HttpRequest::new(self.method, normalize_url(&self.url).as_str()).cache_mode(mode);
        for (key, value) in &self.headers {
            request = request.header(key.clone(), value.clone());
        }
        request
    }

    /// Last path segment (`music.json` for `/app/music.json?v=2`).
    pub fn file_name(&self) -> &str {
        file_name(&self.url)
    }
}

/// Drop the fragment; keep everything else.
pub fn normalize_url(url: &Url) -> Url {
    let mut normalized = url.clone();
    normalized.set_fragment(None);
    normalized
}

pub fn file_name(url: &Url) -> &str {
    url.path().rsplit('/').next().unwrap_or_default()
}

/// Lower-cased extension of the last path segment, without the dot.
pub fn extension(url: &Url) -> Option<String> {
    let name = file_name(url);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() && ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Key under which a navigation response is stored: directory-style paths
/// resolve to their `index.html`.
pub fn navigation_key(url: &Url) -> CacheKey {
    let mut page = normalize_url(url);
    page.set_query(None);
    if page.path().ends_with('/') {
        let path = format!("{}index.html", page.path());
        page.set_path(&path);
    }
    CacheKey::get(page.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_drops_fragment_keeps_query() {
        let request = InterceptedRequest::get("https://example.com/app/a.js?v=2#top").unwrap();
        let key = request.cache_key();

        assert_eq!(key.method, HttpMethod::Get);
        assert_eq!(key.url, "https://example.com/app/a.js?v=2");
    }

    #[test]
    fn test_file_name_and_extension() {
        let url = Url::parse("https://example.com/app/Music/Track.MP3?x=1").unwrap();
        assert_eq!(file_name(&url), "Track.MP3");
        assert_eq!(extension(&url).as_deref(), Some("mp3"));

        let dir = Url::parse("https://example.com/app/").unwrap();
        assert_eq!(file_name(&dir), "");
        assert_eq!(extension(&dir), None);

        let bare = Url::parse("https://example.com/LICENSE").unwrap();
        assert_eq!(extension(&bare), None);
    }

    #[test]
    fn test_navigation_key() {
        let root = Url::parse("https://example.com/app/?utm=x").unwrap();
        assert_eq!(
            navigation_key(&root).url,
            "https://example.com/app/index.html"
        );

        let page = Url::parse("https://example.com/app/about.html#team").unwrap();
        assert_eq!(
            navigation_key(&page).url,
            "https://example.com/app/about.html"
        );
    }

    #[test]
    fn test_http_scheme_and_outbound_request() {
        let request = InterceptedRequest::get("https://example.com/a.css#x")
            .unwrap()
            .with_header("Accept", "text/css");
        let outbound = request.to_http_request(CacheMode::Reload);

        assert!(request.is_http());
        assert!(request.is_storable());
        assert_eq!(outbound.url, "https://example.com/a.css");
        assert_eq!(outbound.cache_mode, CacheMode::Reload);
        assert_eq!(outbound.headers.get("Accept").map(String::as_str), Some("text/css"));

        let ext = InterceptedRequest::get("chrome-extension://abc/script.js").unwrap();
        assert!(!ext.is_http());
    }
}
