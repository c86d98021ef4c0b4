//! Scrape-based audio listing
//!
//! Legacy/alternate track source: pull a public HTML page, pattern-match
//! preview MP3 URLs out of it, and shape them into track descriptors.
//! Best-effort by design; upstream trouble yields a static known-good
//! list instead of an error.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::server::AudioTrack;

/// Cap on the number of tracks returned from one scrape
pub const MAX_SCRAPED_TRACKS: usize = 20;

/// Known-good preview URLs served when the upstream page is unreachable
const FALLBACK_PREVIEW_URLS: &[&str] = &[
    "https://assets.mixkit.co/music/preview/mixkit-tech-house-vibes-130.mp3",
    "https://assets.mixkit.co/music/preview/mixkit-hip-hop-02-738.mp3",
    "https://assets.mixkit.co/music/preview/mixkit-driving-ambition-32.mp3",
    "https://assets.mixkit.co/music/preview/mixkit-raising-me-higher-34.mp3",
    "https://assets.mixkit.co/music/preview/mixkit-serene-view-443.mp3",
];

fn preview_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"https://assets\.mixkit\.co/music/preview/[^"]+\.mp3"#)
            .expect("preview URL pattern is valid")
    })
}

/// Extract track descriptors from a scraped HTML page
///
/// URLs are deduplicated preserving first-seen order and capped at
/// [`MAX_SCRAPED_TRACKS`].
pub fn extract_tracks(html: &str) -> Vec<AudioTrack> {
    let mut seen = HashSet::new();
    preview_url_pattern()
        .find_iter(html)
        .map(|m| m.as_str().to_string())
        .filter(|url| seen.insert(url.clone()))
        .take(MAX_SCRAPED_TRACKS)
        .enumerate()
        .map(|(i, url)| AudioTrack::scraped(i, url))
        .collect()
}

/// Static fallback list used when the upstream page cannot be fetched
pub fn fallback_tracks() -> Vec<AudioTrack> {
    FALLBACK_PREVIEW_URLS
        .iter()
        .enumerate()
        .map(|(i, url)| AudioTrack::scraped(i, url.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_dedupes_preserving_order() {
        let html = r#"
            <a href="https://assets.mixkit.co/music/preview/mixkit-one-1.mp3">one</a>
            <a href="https://assets.mixkit.co/music/preview/mixkit-two-2.mp3">two</a>
            <a href="https://assets.mixkit.co/music/preview/mixkit-one-1.mp3">one again</a>
        "#;
        let tracks = extract_tracks(html);
        assert_eq!(tracks.len(), 2);
        assert_eq!(
            tracks[0].url,
            "https://assets.mixkit.co/music/preview/mixkit-one-1.mp3"
        );
        assert_eq!(
            tracks[1].url,
            "https://assets.mixkit.co/music/preview/mixkit-two-2.mp3"
        );
        assert_eq!(tracks[0].id, 0);
        assert_eq!(tracks[0].name, "Mixkit Track 1");
    }

    #[test]
    fn test_extract_caps_result_count() {
        let html: String = (0..50)
            .map(|i| {
                format!(
                    "\"https://assets.mixkit.co/music/preview/mixkit-track-{}.mp3\"",
                    i
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        let tracks = extract_tracks(&html);
        assert_eq!(tracks.len(), MAX_SCRAPED_TRACKS);
    }

    #[test]
    fn test_extract_ignores_non_matching_urls() {
        let html = r#"
            <a href="https://assets.mixkit.co/videos/preview/clip.mp4">video</a>
            <a href="https://example.com/track.mp3">elsewhere</a>
        "#;
        assert!(extract_tracks(html).is_empty());
    }

    #[test]
    fn test_fallback_is_non_empty() {
        let tracks = fallback_tracks();
        assert!(!tracks.is_empty());
        assert!(tracks.len() <= MAX_SCRAPED_TRACKS);
    }
}
