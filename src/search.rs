use crate::chapterizer::Chapter;
use crate::message::Message;
use crate::text_utils::escape_html;
use log::debug;

/// Displayed results are capped; the total hit count is still reported.
pub const MAX_RESULTS: usize = 50;

/// Characters of context kept on each side of a match.
const CONTEXT_RADIUS: usize = 40;

#[derive(Debug, Clone)]
pub struct SearchHit {
    pub chapter_index: usize,
    pub sequence_index: usize,
    /// Escaped context window with the match wrapped in a highlight span.
    pub context_html: String,
    /// Plain-text context window for non-HTML surfaces.
    pub context_text: String,
}

#[derive(Debug, Clone)]
pub struct SearchResults {
    pub total: usize,
    pub hits: Vec<SearchHit>,
}

/// Linear case-insensitive substring scan over raw message text.
///
/// Matches are counted left to right, non-overlapping, per message. The
/// scan works on raw text rather than rendered HTML so markup never
/// produces phantom hits.
pub fn search_chapters(
    chapters: &[Chapter],
    messages: &[Message],
    query: &str,
) -> SearchResults {
    let query_chars = fold_case(query);
    if query_chars.is_empty() {
        return SearchResults {
            total: 0,
            hits: Vec::new(),
        };
    }

    let mut total = 0;
    let mut hits = Vec::new();

    for chapter in chapters {
        for message in chapter.messages(messages) {
            let text_chars: Vec<char> = message.text.chars().collect();
            let folded = fold_case(&message.text);

            let mut start = 0;
            while start + query_chars.len() <= folded.len() {
                if folded[start..start + query_chars.len()] == query_chars[..] {
                    total += 1;
                    if hits.len() < MAX_RESULTS {
                        hits.push(build_hit(
                            chapter.index,
                            message.sequence_index,
                            &text_chars,
                            start,
                            query_chars.len(),
                        ));
                    }
                    start += query_chars.len();
                } else {
                    start += 1;
                }
            }
        }
    }

    debug!("Search found {total} hits, displaying {}", hits.len());
    SearchResults { total, hits }
}

/// Case folding that keeps a 1:1 character mapping so match positions line
/// up with the original text.
fn fold_case(text: &str) -> Vec<char> {
    text.chars()
        .map(|c| c.to_lowercase().next().unwrap_or(c))
        .collect()
}

fn build_hit(
    chapter_index: usize,
    sequence_index: usize,
    text_chars: &[char],
    match_start: usize,
    match_len: usize,
) -> SearchHit {
    let window_start = match_start.saturating_sub(CONTEXT_RADIUS);
    let window_end = (match_start + match_len + CONTEXT_RADIUS).min(text_chars.len());

    let before: String = text_chars[window_start..match_start].iter().collect();
    let matched: String = text_chars[match_start..match_start + match_len].iter().collect();
    let after: String = text_chars[match_start + match_len..window_end].iter().collect();

    let prefix = if window_start > 0 { "…" } else { "" };
    let suffix = if window_end < text_chars.len() { "…" } else { "" };

    SearchHit {
        chapter_index,
        sequence_index,
        context_html: format!(
            "{prefix}{}<span class=\"search-highlight\">{}</span>{}{suffix}",
            escape_html(&before),
            escape_html(&matched),
            escape_html(&after)
        ),
        context_text: format!("{prefix}{before}{matched}{after}{suffix}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chapterizer::{ChapterSettings, chapterize};
    use crate::timestamp::normalize_timestamp;

    fn msg(seq: usize, text: &str) -> Message {
        Message {
            name: "Bob".to_string(),
            is_user: false,
            is_system: false,
            text: text.to_string(),
            send_timestamp: normalize_timestamp("1700000000"),
            sequence_index: seq,
            extra_images: Vec::new(),
            images_replace_text: false,
        }
    }

    fn corpus(texts: &[&str]) -> (Vec<Chapter>, Vec<Message>) {
        let messages: Vec<Message> = texts
            .iter()
            .enumerate()
            .map(|(i, t)| msg(i, t))
            .collect();
        let chapters = chapterize(&messages, &ChapterSettings::default());
        (chapters, messages)
    }

    #[test]
    fn test_case_insensitive_match() {
        let (chapters, messages) = corpus(&["Hello World", "nothing here"]);
        let results = search_chapters(&chapters, &messages, "hello");
        assert_eq!(results.total, 1);
        assert_eq!(results.hits[0].sequence_index, 0);
    }

    #[test]
    fn test_non_overlapping_left_to_right_count() {
        let (chapters, messages) = corpus(&["aaaa"]);
        let results = search_chapters(&chapters, &messages, "aa");
        assert_eq!(results.total, 2);
    }

    #[test]
    fn test_context_contains_query_and_is_escaped() {
        let (chapters, messages) = corpus(&["before <b>bold</b> needle after"]);
        let results = search_chapters(&chapters, &messages, "needle");
        let hit = &results.hits[0];
        assert!(hit.context_html.contains("<span class=\"search-highlight\">needle</span>"));
        assert!(hit.context_html.contains("&lt;b&gt;"));
        assert!(hit.context_text.contains("needle"));
    }

    #[test]
    fn test_display_cap_and_total() {
        let texts: Vec<String> = (0..60).map(|i| format!("needle number {i}")).collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let (chapters, messages) = corpus(&refs);
        let results = search_chapters(&chapters, &messages, "needle");
        assert_eq!(results.total, 60);
        assert_eq!(results.hits.len(), MAX_RESULTS);
    }

    #[test]
    fn test_empty_query_no_hits() {
        let (chapters, messages) = corpus(&["anything"]);
        let results = search_chapters(&chapters, &messages, "");
        assert_eq!(results.total, 0);
        assert!(results.hits.is_empty());
    }

    #[test]
    fn test_window_ellipsis_on_long_text() {
        let long = format!("{}needle{}", "x".repeat(100), "y".repeat(100));
        let (chapters, messages) = corpus(&[long.as_str()]);
        let results = search_chapters(&chapters, &messages, "needle");
        let hit = &results.hits[0];
        assert!(hit.context_text.starts_with('…'));
        assert!(hit.context_text.ends_with('…'));
    }
}
