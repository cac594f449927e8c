//! Content sniffing over raw HTML.
//!
//! This is a substring/regex heuristic, not an HTML parse. A `<title>` with
//! attributes, a heading split across lines, or a marker rendered client-side
//! will not be seen. Extraction never fails: a body that matches nothing
//! yields an empty title/heading and false flags.

use regex::Regex;

use deploywatch_core::{ContentMarkers, ContentSignature};

pub struct ContentExtractor {
    title_re: Regex,
    heading_re: Regex,
    tag_re: Regex,
    markers: ContentMarkers,
}

impl ContentExtractor {
    pub fn new(markers: ContentMarkers) -> Result<Self, regex::Error> {
        Ok(Self {
            title_re: Regex::new(r"<title>(.*?)</title>")?,
            heading_re: Regex::new(r"<h1[^>]*>(.*?)</h1>")?,
            tag_re: Regex::new(r"<[^>]*>")?,
            markers,
        })
    }

    pub fn extract(&self, body: &str) -> ContentSignature {
        let has_book_content = self.has_book_content(body);
        let has_old_design = self.has_old_design(body);

        ContentSignature {
            title: self.first_text(&self.title_re, body),
            heading: self.first_text(&self.heading_re, body),
            has_book_content,
            is_modern_design: has_book_content && !has_old_design,
        }
    }

    /// Any content marker appears in `body`.
    pub fn has_book_content(&self, body: &str) -> bool {
        contains_any(body, &self.markers.content)
    }

    /// Any legacy marker appears in `body`.
    pub fn has_old_design(&self, body: &str) -> bool {
        contains_any(body, &self.markers.legacy)
    }

    /// Inner text of the first match of `re`, tags stripped and trimmed.
    fn first_text(&self, re: &Regex, body: &str) -> String {
        re.captures(body)
            .and_then(|caps| caps.get(1))
            .map(|inner| self.tag_re.replace_all(inner.as_str(), "").trim().to_string())
            .unwrap_or_default()
    }
}

fn contains_any(body: &str, markers: &[String]) -> bool {
    markers.iter().any(|m| !m.is_empty() && body.contains(m.as_str()))
}
