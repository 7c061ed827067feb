use super::types::LinkKind;
use url::Url;

/// Decides from the URL alone whether it is supported and what it points at.
#[derive(Debug, Clone)]
pub struct UrlClassifier {
    hosts: Vec<String>,
}

impl UrlClassifier {
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            hosts: hosts
                .into_iter()
                .map(|h| h.as_ref().trim().to_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
        }
    }

    pub fn classify(&self, url: &str) -> LinkKind {
        let Some(parsed) = parse_lenient(url) else {
            return LinkKind::NotSupported;
        };

        let host = match parsed.host_str() {
            Some(host) => host.to_lowercase(),
            None => return LinkKind::NotSupported,
        };
        if !self.hosts.iter().any(|h| host.contains(h.as_str())) {
            return LinkKind::NotSupported;
        }

        let has_list = query_has(&parsed, "list");
        if !has_list {
            return LinkKind::SingleItem;
        }

        let segments = path_segments(&parsed);
        if segments.last().map(String::as_str) == Some("playlist") {
            return LinkKind::Playlist;
        }

        if query_has(&parsed, "v") || path_pins_item(&segments) {
            LinkKind::ItemInPlaylist
        } else {
            LinkKind::Playlist
        }
    }
}

/// Path segments that name pages rather than items.
const PAGE_SEGMENTS: &[&str] = &["watch", "playlist", "embed", "shorts", "live", "v", "e"];

/// Prefixes followed by an item id: `/embed/<id>`, `/shorts/<id>`, ...
const ITEM_PREFIXES: &[&str] = &["embed", "shorts", "live", "v", "e"];

/// True when the path itself carries an item id, as in `youtu.be/<id>` or `/shorts/<id>`.
/// A bare `/watch`, `/playlist` or `/` does not.
fn path_pins_item(segments: &[String]) -> bool {
    match segments {
        [id] => !PAGE_SEGMENTS.contains(&id.as_str()),
        [prefix, _id, ..] => ITEM_PREFIXES.contains(&prefix.as_str()),
        [] => false,
    }
}

fn path_segments(url: &Url) -> Vec<String> {
    url.path_segments()
        .map(|parts| {
            parts
                .filter(|part| !part.is_empty())
                .map(str::to_lowercase)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_lenient(url: &str) -> Option<Url> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }

    match Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Some(parsed),
        Ok(_) => None,
        Err(_) => Url::parse(&format!("https://{}", url)).ok(),
    }
}

fn query_has(url: &Url, key: &str) -> bool {
    url.query_pairs()
        .any(|(k, v)| k.eq_ignore_ascii_case(key) && !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn youtube() -> UrlClassifier {
        UrlClassifier::new(["youtube.com", "youtu.be", "m.youtube.com"])
    }

    #[test]
    fn test_unsupported_hosts() {
        let classifier = youtube();
        assert_eq!(
            classifier.classify("https://notsupported.test/video"),
            LinkKind::NotSupported
        );
        assert_eq!(classifier.classify(""), LinkKind::NotSupported);
        assert_eq!(classifier.classify("not a url at all"), LinkKind::NotSupported);
        assert_eq!(
            classifier.classify("ftp://youtube.com/watch?v=abc"),
            LinkKind::NotSupported
        );
        // host match only, not anywhere in the URL
        assert_eq!(
            classifier.classify("https://evil.test/?next=youtube.com"),
            LinkKind::NotSupported
        );
    }

    #[test]
    fn test_single_item() {
        let classifier = youtube();
        assert_eq!(
            classifier.classify("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            LinkKind::SingleItem
        );
        assert_eq!(
            classifier.classify("https://youtu.be/dQw4w9WgXcQ"),
            LinkKind::SingleItem
        );
        assert_eq!(
            classifier.classify("youtu.be/dQw4w9WgXcQ"),
            LinkKind::SingleItem
        );
    }

    #[test]
    fn test_playlist() {
        let classifier = youtube();
        assert_eq!(
            classifier.classify("https://www.youtube.com/playlist?list=PL123"),
            LinkKind::Playlist
        );
        assert_eq!(
            classifier.classify("HTTPS://WWW.YOUTUBE.COM/PLAYLIST?LIST=PL123"),
            LinkKind::Playlist
        );
        // a list without a pinned item
        assert_eq!(
            classifier.classify("https://www.youtube.com/watch?list=PL123"),
            LinkKind::Playlist
        );
        assert_eq!(
            classifier.classify("https://www.youtube.com/?list=PL123"),
            LinkKind::Playlist
        );
        assert_eq!(
            classifier.classify("https://www.youtube.com/watch?v=&list=PL123"),
            LinkKind::Playlist
        );
    }

    #[test]
    fn test_item_in_playlist() {
        let classifier = youtube();
        assert_eq!(
            classifier.classify("https://www.youtube.com/watch?v=abc&list=PL123"),
            LinkKind::ItemInPlaylist
        );
        assert_eq!(
            classifier.classify("https://youtu.be/abc?list=PL123"),
            LinkKind::ItemInPlaylist
        );
        assert_eq!(
            classifier.classify("https://www.youtube.com/embed/abc?list=PL123"),
            LinkKind::ItemInPlaylist
        );
        assert_eq!(
            classifier.classify("https://www.youtube.com/shorts/abc/?list=PL123"),
            LinkKind::ItemInPlaylist
        );
    }

    #[test]
    fn test_custom_allow_list() {
        let classifier = UrlClassifier::new(["Example.com"]);
        assert_eq!(
            classifier.classify("https://example.com/watch?v=abc123"),
            LinkKind::SingleItem
        );
        assert_eq!(
            classifier.classify("https://example.com/playlist?list=XYZ"),
            LinkKind::Playlist
        );
        assert_eq!(
            classifier.classify("https://www.youtube.com/watch?v=abc"),
            LinkKind::NotSupported
        );
    }

    #[test]
    fn test_classify_is_deterministic() {
        let classifier = youtube();
        let url = "https://m.youtube.com/watch?v=abc&list=PL1";
        let first = classifier.classify(url);
        for _ in 0..10 {
            assert_eq!(classifier.classify(url), first);
        }
    }
}
