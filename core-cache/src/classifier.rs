//! # Request Classifier
//!
//! Maps an intercepted request to exactly one [`RequestCategory`]. Rules are
//! checked in a fixed order and the first match wins:
//!
//! 1. Navigation (full-page load)
//! 2. Mutable data file (exact file name)
//! 3. Large static data file (exact file name)
//! 4. Audio (extension)
//! 5. Static asset (extension allow-list)
//! 6. Other
//!
//! Only the URL path is inspected; query strings and fragments never change
//! the category.

use core_runtime::config::ClassifierRules;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use url::Url;

use crate::request::{extension, file_name, InterceptedRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestCategory {
    Navigation,
    MutableData,
    LargeStaticData,
    Audio,
    StaticAsset,
    Other,
}

impl RequestCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestCategory::Navigation => "navigation",
            RequestCategory::MutableData => "mutable-data",
            RequestCategory::LargeStaticData => "large-static-data",
            RequestCategory::Audio => "audio",
            RequestCategory::StaticAsset => "static-asset",
            RequestCategory::Other => "other",
        }
    }
}

impl fmt::Display for RequestCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "svg"];

/// Pure, total classifier built from [`ClassifierRules`].
#[derive(Debug, Clone)]
pub struct RequestClassifier {
    mutable_data_files: HashSet<String>,
    large_static_files: HashSet<String>,
    audio_extensions: HashSet<String>,
    static_extensions: HashSet<String>,
}

impl RequestClassifier {
    pub fn new(rules: &ClassifierRules) -> Self {
        fn extensions(list: &[String]) -> HashSet<String> {
            list.iter()
                .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                .collect()
        }

        Self {
            mutable_data_files: rules.mutable_data_files.iter().cloned().collect(),
            large_static_files: rules.large_static_files.iter().cloned().collect(),
            audio_extensions: extensions(&rules.audio_extensions),
            static_extensions: extensions(&rules.static_extensions),
        }
    }

    pub fn classify(&self, request: &InterceptedRequest) -> RequestCategory {
        self.classify_url(&request.url, request.navigate)
    }

    pub fn classify_url(&self, url: &Url, navigate: bool) -> RequestCategory {
        if navigate {
            return RequestCategory::Navigation;
        }

        let name = file_name(url);
        if self.mutable_data_files.contains(name) {
            return RequestCategory::MutableData;
        }
        if self.large_static_files.contains(name) {
            return RequestCategory::LargeStaticData;
        }

        match extension(url) {
            Some(ext) if self.audio_extensions.contains(&ext) => RequestCategory::Audio,
            Some(ext) if self.static_extensions.contains(&ext) => RequestCategory::StaticAsset,
            _ => RequestCategory::Other,
        }
    }

    pub fn is_audio(&self, url: &Url) -> bool {
        extension(url).is_some_and(|ext| self.audio_extensions.contains(&ext))
    }

    /// Audio check on a stored key URL; unparsable keys are not audio.
    pub fn is_audio_key(&self, key_url: &str) -> bool {
        Url::parse(key_url).is_ok_and(|url| self.is_audio(&url))
    }

    /// Requests that get the transparent GIF when every source fails.
    pub fn is_image(&self, url: &Url) -> bool {
        extension(url).is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
    }
}

impl Default for RequestClassifier {
    fn default() -> Self {
        Self::new(&ClassifierRules::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(url: &str) -> RequestCategory {
        RequestClassifier::default().classify(&InterceptedRequest::get(url).unwrap())
    }

    #[test]
    fn test_navigation_wins_over_everything() {
        let classifier = RequestClassifier::default();
        let request = InterceptedRequest::navigation("https://example.com/app/music.json").unwrap();
        assert_eq!(classifier.classify(&request), RequestCategory::Navigation);
    }

    #[test]
    fn test_data_files() {
        assert_eq!(classify("https://example.com/app/music.json"), RequestCategory::MutableData);
        assert_eq!(classify("https://example.com/app/changelog.txt?v=9"), RequestCategory::MutableData);
        assert_eq!(classify("https://example.com/app/data.json"), RequestCategory::LargeStaticData);
        // Exact file name, not suffix
        assert_eq!(classify("https://example.com/app/metadata.json"), RequestCategory::Other);
    }

    #[test]
    fn test_audio_is_case_insensitive() {
        assert_eq!(classify("https://cdn.example.com/a/b.mp3"), RequestCategory::Audio);
        assert_eq!(classify("https://cdn.example.com/a/B.MP3?sig=1"), RequestCategory::Audio);
        assert_eq!(classify("https://cdn.example.com/a/b.mp3.txt"), RequestCategory::Other);
    }

    #[test]
    fn test_static_assets() {
        for url in [
            "https://example.com/app/js/lib/jquery.min.js",
            "https://example.com/app/style.css?v=3",
            "https://example.com/app/fonts/icons.woff2",
            "https://example.com/app/image/hero.GIF",
            "https://example.com/app/favicon.ico",
            "https://example.com/app/pic.avif",
        ] {
            assert_eq!(classify(url), RequestCategory::StaticAsset, "{url}");
        }
    }

    #[test]
    fn test_query_never_changes_category() {
        assert_eq!(classify("https://example.com/api/list?file=a.mp3"), RequestCategory::Other);
        assert_eq!(classify("https://example.com/app/#/music.json"), RequestCategory::Other);
    }

    #[test]
    fn test_classification_is_stable() {
        let classifier = RequestClassifier::default();
        let request = InterceptedRequest::get("https://example.com/app/song.mp3").unwrap();
        let first = classifier.classify(&request);
        for _ in 0..10 {
            assert_eq!(classifier.classify(&request), first);
        }
    }

    #[test]
    fn test_custom_rules() {
        let rules = ClassifierRules {
            audio_extensions: vec![".OGG".into()],
            ..ClassifierRules::default()
        };
        let classifier = RequestClassifier::new(&rules);
        let ogg = Url::parse("https://example.com/x.ogg").unwrap();
        let mp3 = Url::parse("https://example.com/x.mp3").unwrap();

        assert!(classifier.is_audio(&ogg));
        assert!(!classifier.is_audio(&mp3));
    }

    #[test]
    fn test_key_helpers() {
        let classifier = RequestClassifier::default();
        assert!(classifier.is_audio_key("https://example.com/a.mp3?x=1"));
        assert!(!classifier.is_audio_key("not a url"));

        let png = Url::parse("https://example.com/a.png").unwrap();
        let woff = Url::parse("https://example.com/a.woff").unwrap();
        assert!(classifier.is_image(&png));
        assert!(!classifier.is_image(&woff));
    }
}
