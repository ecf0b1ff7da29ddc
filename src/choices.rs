use crate::text_utils::escape_html;
use regex::Regex;

/// Converts `<choices>` blocks into a styled, read-only card list.
///
/// Lines of the form `N. text` become the choices; when no numbered lines
/// are present every non-blank line inside the block counts as one choice in
/// order. Must run on text whose embedded-document regions are already
/// tokenized, so a choices tag belonging to a document's own internal UI is
/// never touched.
pub struct ChoiceBlockProcessor {
    block_re: Regex,
    numbered_re: Regex,
}

impl ChoiceBlockProcessor {
    pub fn new() -> Self {
        Self {
            block_re: Regex::new(r"(?is)<choices>(.*?)</choices>")
                .expect("Failed to compile choices block regex"),
            numbered_re: Regex::new(r"^\s*\d+[.)]\s*(.*)$")
                .expect("Failed to compile numbered choice regex"),
        }
    }

    pub fn process(&self, text: &str) -> String {
        self.block_re
            .replace_all(text, |caps: &regex::Captures| self.render_block(&caps[1]))
            .into_owned()
    }

    fn render_block(&self, body: &str) -> String {
        let numbered: Vec<String> = body
            .lines()
            .filter_map(|line| {
                self.numbered_re
                    .captures(line)
                    .map(|caps| caps[1].trim().to_string())
            })
            .filter(|choice| !choice.is_empty())
            .collect();

        let choices = if numbered.is_empty() {
            body.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect()
        } else {
            numbered
        };

        let mut html = String::from("<div class=\"choices-block\">\n");
        html.push_str("<div class=\"choices-header\">Choices</div>\n");
        for (idx, choice) in choices.iter().enumerate() {
            html.push_str(&format!(
                "<div class=\"choice-card\"><span class=\"choice-num\">{}</span><span class=\"choice-text\">{}</span></div>\n",
                idx + 1,
                escape_html(choice)
            ));
        }
        html.push_str("</div>");
        html
    }
}

impl Default for ChoiceBlockProcessor {
    fn default() -> Self {
        Self::new()
    }
}
