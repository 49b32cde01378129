//! Protected records and tracked pages derived from the static manifests.

use bridge_traits::CacheKey;
use core_runtime::config::AssetManifest;
use parking_lot::Mutex;
use std::collections::HashSet;
use url::Url;

use crate::error::Result;

/// Entries the eviction manager never removes.
///
/// Each required path is resolved against the scope; stored keys match when
/// their URL path (query ignored) equals one of the resolved paths on the
/// same origin.
#[derive(Debug, Clone, Default)]
pub struct ProtectedFileSet {
    entries: HashSet<String>,
}

impl ProtectedFileSet {
    pub fn from_manifest(scope: &Url, manifest: &AssetManifest) -> Result<Self> {
        let mut entries = HashSet::with_capacity(manifest.required_files.len());
        for path in &manifest.required_files {
            let resolved = scope.join(path)?;
            entries.insert(identity(&resolved));
        }
        Ok(Self { entries })
    }

    pub fn contains_url(&self, url: &Url) -> bool {
        self.entries.contains(&identity(url))
    }

    /// Unparsable key URLs are never protected.
    pub fn contains_key(&self, key: &CacheKey) -> bool {
        Url::parse(&key.url).is_ok_and(|url| self.contains_url(&url))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn identity(url: &Url) -> String {
    format!("{}{}", url.origin().ascii_serialization(), url.path())
}

/// Pages already pre-warmed into the shell partition, seeded with the app shell.
#[derive(Debug, Default)]
pub struct PageRegistry {
    pages: Mutex<HashSet<String>>,
}

impl PageRegistry {
    pub fn from_manifest(manifest: &AssetManifest) -> Self {
        Self {
            pages: Mutex::new(manifest.app_shell.iter().cloned().collect()),
        }
    }

    /// Returns `true` when `path` was not tracked yet.
    pub fn register(&self, path: &str) -> bool {
        self.pages.lock().insert(path.to_string())
    }

    /// Stop tracking `path` so a later registration tries again.
    pub fn forget(&self, path: &str) -> bool {
        self.pages.lock().remove(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.pages.lock().contains(path)
    }

    pub fn len(&self) -> usize {
        self.pages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> Url {
        Url::parse("https://example.com/app/").unwrap()
    }

    fn manifest() -> AssetManifest {
        AssetManifest::new(
            vec!["./".into(), "./index.html".into()],
            vec!["./music.json".into(), "./js/app.js".into()],
        )
    }

    #[test]
    fn test_protected_match_is_exact_path() {
        let protected = ProtectedFileSet::from_manifest(&scope(), &manifest()).unwrap();

        assert_eq!(protected.len(), 2);
        assert!(protected.contains_key(&CacheKey::get("https://example.com/app/music.json")));
        assert!(protected.contains_key(&CacheKey::get("https://example.com/app/music.json?v=3")));
        assert!(protected.contains_key(&CacheKey::get("https://example.com/app/js/app.js")));

        // Same file name, different directory
        assert!(!protected.contains_key(&CacheKey::get("https://example.com/app/old/music.json")));
        // Different origin
        assert!(!protected.contains_key(&CacheKey::get("https://cdn.example.com/app/music.json")));
        assert!(!protected.contains_key(&CacheKey::get("::garbage::")));
    }

    #[test]
    fn test_empty_manifest() {
        let protected = ProtectedFileSet::from_manifest(&scope(), &AssetManifest::empty()).unwrap();
        assert!(protected.is_empty());
    }

    #[test]
    fn test_page_registry_tracks_once() {
        let registry = PageRegistry::from_manifest(&manifest());

        assert!(registry.contains("./index.html"));
        assert!(!registry.register("./index.html"));
        assert!(registry.register("./about.html"));
        assert!(!registry.register("./about.html"));
        assert_eq!(registry.len(), 3);

        assert!(registry.forget("./about.html"));
        assert!(!registry.contains("./about.html"));
        assert!(registry.register("./about.html"));
    }
}
