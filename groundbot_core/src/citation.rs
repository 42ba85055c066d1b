//! Citation marker normalization and citation cards.

use std::fmt::Write as _;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

use crate::Citation;

/// Longest snippet shown per citation, in characters.
pub const SNIPPET_MAX_CHARS: usize = 200;

/// Marker the grounding service embeds in answers: `[doc1]`, `[doc2]`, ...
static DOC_MARKER: OnceLock<regex::Regex> = OnceLock::new();

#[expect(
    clippy::expect_used,
    reason = "Static regex pattern validated at compile time"
)]
fn doc_marker() -> &'static regex::Regex {
    DOC_MARKER.get_or_init(|| {
        regex::Regex::new(r"\[doc(\d+)\]").expect("Static regex pattern is guaranteed to be valid")
    })
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CitationError {
    #[error("cannot build a citation card without citations")]
    Empty,
}

/// Rewrite `[docN]` markers as `[N]`.
///
/// `N` is already the 1-based position of the citation in the returned list,
/// so the rewritten marker lines up with the card entry of the same number.
/// Text without `[docN]` markers is returned unchanged, which makes the
/// function idempotent.
#[must_use]
pub fn normalize(text: &str) -> String {
    doc_marker().replace_all(text, "[$1]").into_owned()
}

/// One row of a citation card.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CitationEntry {
    pub index: usize,
    pub title: String,
    pub snippet: String,
    pub url: Option<String>,
}

/// Renderable list of the sources behind an answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CitationCard {
    pub entries: Vec<CitationEntry>,
}

/// Build a card listing every citation in the order given.
pub fn build_card(citations: &[Citation]) -> Result<CitationCard, CitationError> {
    if citations.is_empty() {
        return Err(CitationError::Empty);
    }

    let entries = citations
        .iter()
        .enumerate()
        .map(|(i, citation)| {
            let index = i + 1;
            CitationEntry {
                index,
                title: display_title(citation, index),
                snippet: snippet(&citation.content),
                url: non_blank(citation.url.as_deref()).map(str::to_string),
            }
        })
        .collect();

    Ok(CitationCard { entries })
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn display_title(citation: &Citation, index: usize) -> String {
    non_blank(citation.title.as_deref())
        .or_else(|| non_blank(citation.filepath.as_deref()))
        .map_or_else(|| format!("Citation {index}"), str::to_string)
}

fn snippet(content: &str) -> String {
    let collapsed = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= SNIPPET_MAX_CHARS {
        return collapsed;
    }
    let mut cut: String = collapsed.chars().take(SNIPPET_MAX_CHARS).collect();
    cut.truncate(cut.trim_end().len());
    cut.push('…');
    cut
}

impl CitationCard {
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Adaptive Card 1.5 payload for channels that render cards.
    #[must_use]
    pub fn to_adaptive_card(&self) -> Value {
        let mut body = vec![json!({
            "type": "TextBlock",
            "text": "Citations",
            "weight": "Bolder",
            "size": "Medium",
        })];

        for entry in &self.entries {
            let mut container = json!({
                "type": "Container",
                "separator": true,
                "items": [
                    {
                        "type": "TextBlock",
                        "text": format!("[{}] {}", entry.index, entry.title),
                        "weight": "Bolder",
                        "wrap": true,
                    },
                    {
                        "type": "TextBlock",
                        "text": entry.snippet,
                        "isSubtle": true,
                        "size": "Small",
                        "wrap": true,
                    }
                ],
            });
            if let Some(url) = &entry.url {
                container["selectAction"] = json!({"type": "Action.OpenUrl", "url": url});
            }
            body.push(container);
        }

        json!({
            "type": "AdaptiveCard",
            "$schema": "http://adaptivecards.io/schemas/adaptive-card.json",
            "version": "1.5",
            "body": body,
        })
    }

    /// Plain-text rendering for text-only channels.
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::from("Citations:");
        for entry in &self.entries {
            let _ = write!(out, "\n[{}] {}", entry.index, entry.title);
            if !entry.snippet.is_empty() {
                let _ = write!(out, "\n    {}", entry.snippet);
            }
            if let Some(url) = &entry.url {
                let _ = write!(out, "\n    {url}");
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn citation(title: &str, content: &str) -> Citation {
        Citation {
            content: content.to_string(),
            title: Some(title.to_string()),
            ..Citation::default()
        }
    }

    #[test]
    fn normalize_rewrites_doc_markers() {
        assert_eq!(
            normalize("Rust is fast [doc1] and safe [doc2][doc3]."),
            "Rust is fast [1] and safe [2][3]."
        );
    }

    #[test]
    fn normalize_leaves_other_brackets_alone() {
        let text = "See [1], [docs] and [doc] or [DOC1].";
        assert_eq!(normalize(text), text);
    }

    #[test]
    fn normalize_is_idempotent() {
        let samples = [
            "",
            "no markers here",
            "one [doc1]",
            "[doc12] leading and trailing [doc3]",
            "nested [[doc2]] brackets",
            "[1] already normalized [2]",
        ];
        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "sample: {sample:?}");
        }
    }

    #[test]
    fn build_card_rejects_empty_input() {
        assert_eq!(build_card(&[]), Err(CitationError::Empty));
    }

    #[test]
    #[expect(clippy::unwrap_used, reason = "Test failure should panic")]
    fn build_card_preserves_order() {
        let citations = vec![
            citation("Second guide", "b"),
            citation("First guide", "a"),
            citation("Third guide", "c"),
        ];

        let card = build_card(&citations).unwrap();

        assert_eq!(card.len(), 3);
        let titles: Vec<&str> = card.entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, ["Second guide", "First guide", "Third guide"]);
        let indices: Vec<usize> = card.entries.iter().map(|e| e.index).collect();
        assert_eq!(indices, [1, 2, 3]);
    }

    #[test]
    #[expect(clippy::unwrap_used, reason = "Test failure should panic")]
    fn title_falls_back_to_filepath_then_index() {
        let citations = vec![
            Citation {
                title: Some("  ".to_string()),
                filepath: Some("handbook.pdf".to_string()),
                ..Citation::default()
            },
            Citation::default(),
        ];

        let card = build_card(&citations).unwrap();
        assert_eq!(card.entries[0].title, "handbook.pdf");
        assert_eq!(card.entries[1].title, "Citation 2");
    }

    #[test]
    #[expect(clippy::unwrap_used, reason = "Test failure should panic")]
    fn long_snippets_are_collapsed_and_truncated() {
        let content = format!("line one\n\n   line   two {}", "x".repeat(400));
        let card = build_card(&[citation("t", &content)]).unwrap();

        let snippet = &card.entries[0].snippet;
        assert!(snippet.starts_with("line one line two "));
        assert!(snippet.ends_with('…'));
        assert_eq!(snippet.chars().count(), SNIPPET_MAX_CHARS + 1);
    }

    #[test]
    #[expect(clippy::unwrap_used, reason = "Test failure should panic")]
    fn adaptive_card_lists_every_entry() {
        let mut with_url = citation("Guide", "body");
        with_url.url = Some("https://example.com/guide".to_string());
        let card = build_card(&[with_url, citation("Notes", "more")]).unwrap();

        let value = card.to_adaptive_card();
        assert_eq!(value["type"], "AdaptiveCard");
        let body = value["body"].as_array().unwrap();
        assert_eq!(body.len(), 3);
        assert_eq!(body[1]["items"][0]["text"], "[1] Guide");
        assert_eq!(body[1]["selectAction"]["url"], "https://example.com/guide");
        assert_eq!(body[2]["items"][0]["text"], "[2] Notes");
        assert!(body[2].get("selectAction").is_none());
    }

    #[test]
    #[expect(clippy::unwrap_used, reason = "Test failure should panic")]
    fn text_rendering_numbers_entries() {
        let mut first = citation("Guide", "body text");
        first.url = Some("https://example.com".to_string());
        let card = build_card(&[first, citation("Notes", "")]).unwrap();

        assert_eq!(
            card.render_text(),
            "Citations:\n[1] Guide\n    body text\n    https://example.com\n[2] Notes"
        );
    }
}
