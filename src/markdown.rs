use crate::text_utils::escape_html;
use regex::Regex;

pub const KIND_CODE_BLOCK: &str = "CODE_BLOCK";
pub const KIND_EMBEDDED_DOC: &str = "EMBEDDED_DOC";
pub const KIND_INLINE_CODE: &str = "INLINE_CODE";
pub const KIND_PROTECTED_BLOCK: &str = "PROTECTED_BLOCK";

/// Block-level elements the line pass tracks with a nesting depth counter.
/// While the counter is above zero every line passes through verbatim.
const BLOCK_TAGS: &str =
    "div|details|summary|section|article|aside|nav|header|footer|form|fieldset|figure|main|iframe|pre|dl";

struct Slot {
    kind: &'static str,
    token: String,
    content: String,
}

/// Store for regions protected from line-oriented processing.
///
/// Each protected region is swapped for an opaque, markdown-inert text token
/// and restored after the markdown pass. Restoration strips a paragraph or
/// line-break wrapper the markdown pass may have put around a token that
/// ended up alone on a line.
#[derive(Default)]
pub struct ProtectedRegions {
    slots: Vec<Slot>,
}

impl ProtectedRegions {
    pub fn new() -> Self {
        ProtectedRegions { slots: Vec::new() }
    }

    /// Stores `content` and returns the unique token that stands in for it.
    pub fn protect(&mut self, kind: &'static str, content: String) -> String {
        let token = format!("__{}_{}__", kind, self.slots.len());
        self.slots.push(Slot {
            kind,
            token: token.clone(),
            content,
        });
        token
    }

    /// Restores every slot of `kind` verbatim.
    pub fn restore(&self, kind: &str, mut html: String) -> String {
        for slot in self.slots.iter().filter(|s| s.kind == kind) {
            html = replace_token(&html, &slot.token, &slot.content);
        }
        html
    }

    /// Restores every slot of `kind` through a mapping of the stored content.
    /// Used for embedded documents, which become inline frames only after the
    /// full markdown pass.
    pub fn restore_with<F>(&self, kind: &str, mut html: String, mut map: F) -> String
    where
        F: FnMut(&str, usize) -> String,
    {
        for (ordinal, slot) in self.slots.iter().filter(|s| s.kind == kind).enumerate() {
            let replacement = map(&slot.content, ordinal);
            html = replace_token(&html, &slot.token, &replacement);
        }
        html
    }

    pub fn count(&self, kind: &str) -> usize {
        self.slots.iter().filter(|s| s.kind == kind).count()
    }
}

/// Substitutes a token, stripping an immediately-surrounding wrapper the
/// markdown pass may have introduced.
fn replace_token(html: &str, token: &str, replacement: &str) -> String {
    let paragraph_wrapped = format!("<p>{token}</p>");
    if html.contains(&paragraph_wrapped) {
        return html.replace(&paragraph_wrapped, replacement);
    }
    let break_trailed = format!("{token}<br>");
    if html.contains(&break_trailed) {
        return html.replace(&break_trailed, replacement);
    }
    html.replace(token, replacement)
}

#[derive(PartialEq, Clone, Copy)]
enum ListKind {
    Unordered,
    Ordered,
}

/// Markdown-subset renderer.
///
/// The subset is intentionally small (headings, rules, blockquotes, lists,
/// emphasis, strikethrough, links, code) and the pipeline ordering exists to
/// keep line-based rules away from multi-line HTML mixed into chat text:
/// fenced code first, embedded documents second, inline code third, opaque
/// block regions fourth, then the depth-tracked line pass, then restoration.
pub struct MarkdownRenderer {
    fence_re: Regex,
    inline_code_re: Regex,
    style_re: Regex,
    script_re: Regex,
    svg_re: Regex,
    table_re: Regex,
    block_open_re: Regex,
    block_close_re: Regex,
    token_line_re: Regex,
    heading_re: Regex,
    hr_re: Regex,
    blockquote_re: Regex,
    ul_item_re: Regex,
    ol_item_re: Regex,
    bold_italic_re: Regex,
    bold_re: Regex,
    italic_re: Regex,
    strike_re: Regex,
    link_re: Regex,
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self {
            fence_re: Regex::new(r"(?s)```([a-zA-Z0-9_+\-]*)[ \t]*\r?\n?(.*?)```")
                .expect("Failed to compile code fence regex"),
            inline_code_re: Regex::new(r"`([^`\n]+)`")
                .expect("Failed to compile inline code regex"),
            style_re: Regex::new(r"(?is)<style[^>]*>.*?</style>")
                .expect("Failed to compile style block regex"),
            script_re: Regex::new(r"(?is)<script[^>]*>.*?</script>")
                .expect("Failed to compile script block regex"),
            svg_re: Regex::new(r"(?is)<svg[^>]*>.*?</svg>")
                .expect("Failed to compile svg block regex"),
            table_re: Regex::new(r"(?is)<table[^>]*>.*?</table>")
                .expect("Failed to compile table block regex"),
            block_open_re: Regex::new(&format!(r"(?i)<({BLOCK_TAGS})(\s[^>]*)?>"))
                .expect("Failed to compile block open tag regex"),
            block_close_re: Regex::new(&format!(r"(?i)</({BLOCK_TAGS})\s*>"))
                .expect("Failed to compile block close tag regex"),
            token_line_re: Regex::new(r"^__[A-Z0-9_]+_\d+__$")
                .expect("Failed to compile token line regex"),
            heading_re: Regex::new(r"^(#{1,6})\s+(.*)$")
                .expect("Failed to compile heading regex"),
            hr_re: Regex::new(r"^\s*(?:-{3,}|\*{3,}|_{3,})\s*$")
                .expect("Failed to compile horizontal rule regex"),
            blockquote_re: Regex::new(r"^>\s?(.*)$")
                .expect("Failed to compile blockquote regex"),
            ul_item_re: Regex::new(r"^\s*[-*+]\s+(.*)$")
                .expect("Failed to compile unordered list item regex"),
            ol_item_re: Regex::new(r"^\s*\d+[.)]\s+(.*)$")
                .expect("Failed to compile ordered list item regex"),
            bold_italic_re: Regex::new(r"\*\*\*([^*]+)\*\*\*")
                .expect("Failed to compile bold italic regex"),
            bold_re: Regex::new(r"\*\*([^*]+)\*\*").expect("Failed to compile bold regex"),
            italic_re: Regex::new(r"\*([^*\n]+)\*").expect("Failed to compile italic regex"),
            strike_re: Regex::new(r"~~([^~]+)~~").expect("Failed to compile strikethrough regex"),
            link_re: Regex::new(r"\[([^\]]+)\]\(([^)\s]+)\)")
                .expect("Failed to compile link regex"),
        }
    }

    /// Swaps fenced code blocks for tokens. Runs before embedded-document
    /// extraction so a stale document envelope quoted inside a fence is never
    /// mistaken for a live document.
    pub fn protect_fences(&self, text: &str, regions: &mut ProtectedRegions) -> String {
        self.fence_re
            .replace_all(text, |caps: &regex::Captures| {
                let lang = &caps[1];
                let code = caps[2].trim_end_matches('\n');
                let class_attr = if lang.is_empty() {
                    String::new()
                } else {
                    format!(" class=\"language-{lang}\"")
                };
                let rendered = format!(
                    "<pre class=\"code-block\"><code{class_attr}>{}</code></pre>",
                    escape_html(code)
                );
                regions.protect(KIND_CODE_BLOCK, rendered)
            })
            .into_owned()
    }

    /// Renders text whose fences and embedded documents are already
    /// tokenized. Restores everything except embedded documents, which the
    /// extractor turns into frames after the markdown pass.
    pub fn render(&self, text: &str, regions: &mut ProtectedRegions) -> String {
        let text = self
            .inline_code_re
            .replace_all(text, |caps: &regex::Captures| {
                let rendered = format!("<code>{}</code>", escape_html(&caps[1]));
                regions.protect(KIND_INLINE_CODE, rendered)
            })
            .into_owned();

        let mut text = text;
        for re in [&self.style_re, &self.script_re, &self.svg_re, &self.table_re] {
            text = re
                .replace_all(&text, |caps: &regex::Captures| {
                    regions.protect(KIND_PROTECTED_BLOCK, caps[0].to_string())
                })
                .into_owned();
        }

        let mut html = self.line_pass(&text);

        // Restoration order: code blocks, inline code, protected blocks.
        // A region extracted inside another (a fence quoted in a table, a
        // style block in a table) surfaces its token only once the outer
        // region is restored, so the ordered sequence repeats until it
        // settles.
        loop {
            let restored = regions.restore(KIND_CODE_BLOCK, html.clone());
            let restored = regions.restore(KIND_INLINE_CODE, restored);
            let restored = regions.restore(KIND_PROTECTED_BLOCK, restored);
            if restored == html {
                return html;
            }
            html = restored;
        }
    }

    fn line_pass(&self, text: &str) -> String {
        let mut html = String::new();
        let mut depth: usize = 0;
        let mut open_list: Option<ListKind> = None;

        for line in text.lines() {
            let opens = self
                .block_open_re
                .find_iter(line)
                .filter(|m| !m.as_str().ends_with("/>"))
                .count();
            let closes = self.block_close_re.find_iter(line).count();

            if depth > 0 || opens > 0 || closes > 0 {
                self.close_list(&mut html, &mut open_list);
                html.push_str(line);
                html.push('\n');
                // Unmatched closing tags must not drive the counter negative.
                depth = (depth + opens).saturating_sub(closes);
                continue;
            }

            let trimmed = line.trim();

            if self.token_line_re.is_match(trimmed) {
                self.close_list(&mut html, &mut open_list);
                html.push_str(trimmed);
                html.push('\n');
                continue;
            }

            if trimmed.is_empty() {
                self.close_list(&mut html, &mut open_list);
                html.push_str("<br>\n");
                continue;
            }

            if let Some(caps) = self.heading_re.captures(trimmed) {
                self.close_list(&mut html, &mut open_list);
                let level = caps[1].len();
                let content = self.render_inline(&caps[2]);
                html.push_str(&format!("<h{level}>{content}</h{level}>\n"));
                continue;
            }

            if self.hr_re.is_match(trimmed) {
                self.close_list(&mut html, &mut open_list);
                html.push_str("<hr>\n");
                continue;
            }

            if let Some(caps) = self.blockquote_re.captures(trimmed) {
                self.close_list(&mut html, &mut open_list);
                let content = self.render_inline(&caps[1]);
                html.push_str(&format!("<blockquote>{content}</blockquote>\n"));
                continue;
            }

            if let Some(caps) = self.ol_item_re.captures(line) {
                self.switch_list(&mut html, &mut open_list, ListKind::Ordered);
                let content = self.render_inline(&caps[1]);
                html.push_str(&format!("<li>{content}</li>\n"));
                continue;
            }

            if let Some(caps) = self.ul_item_re.captures(line) {
                self.switch_list(&mut html, &mut open_list, ListKind::Unordered);
                let content = self.render_inline(&caps[1]);
                html.push_str(&format!("<li>{content}</li>\n"));
                continue;
            }

            self.close_list(&mut html, &mut open_list);
            let content = self.render_inline(trimmed);
            html.push_str(&format!("<p>{content}</p>\n"));
        }

        self.close_list(&mut html, &mut open_list);
        html
    }

    fn switch_list(&self, html: &mut String, open_list: &mut Option<ListKind>, kind: ListKind) {
        if *open_list == Some(kind) {
            return;
        }
        self.close_list(html, open_list);
        html.push_str(match kind {
            ListKind::Unordered => "<ul>\n",
            ListKind::Ordered => "<ol>\n",
        });
        *open_list = Some(kind);
    }

    fn close_list(&self, html: &mut String, open_list: &mut Option<ListKind>) {
        if let Some(kind) = open_list.take() {
            html.push_str(match kind {
                ListKind::Unordered => "</ul>\n",
                ListKind::Ordered => "</ol>\n",
            });
        }
    }

    /// Inline markdown, applied only to paragraph/heading/blockquote/list
    /// content. Triple emphasis must run before double before single to avoid
    /// partial matches.
    fn render_inline(&self, text: &str) -> String {
        let text = self
            .bold_italic_re
            .replace_all(text, "<strong><em>$1</em></strong>");
        let text = self.bold_re.replace_all(&text, "<strong>$1</strong>");
        let text = self.italic_re.replace_all(&text, "<em>$1</em>");
        let text = self.strike_re.replace_all(&text, "<del>$1</del>");
        self.link_re
            .replace_all(
                &text,
                "<a href=\"$2\" target=\"_blank\" rel=\"noopener noreferrer\">$1</a>",
            )
            .into_owned()
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(text: &str) -> String {
        let renderer = MarkdownRenderer::new();
        let mut regions = ProtectedRegions::new();
        let text = renderer.protect_fences(text, &mut regions);
        renderer.render(&text, &mut regions)
    }

    #[test]
    fn test_heading_levels() {
        assert_eq!(render("# Title"), "<h1>Title</h1>\n");
        assert_eq!(render("### Deep"), "<h3>Deep</h3>\n");
        assert_eq!(render("###### Max"), "<h6>Max</h6>\n");
    }

    #[test]
    fn test_paragraph_and_breaks() {
        assert_eq!(render("one\n\ntwo"), "<p>one</p>\n<br>\n<p>two</p>\n");
    }

    #[test]
    fn test_inline_emphasis_ordering() {
        assert_eq!(
            render("***both*** **bold** *ital*"),
            "<p><strong><em>both</em></strong> <strong>bold</strong> <em>ital</em></p>\n"
        );
    }

    #[test]
    fn test_strikethrough_and_link() {
        assert_eq!(render("~~gone~~"), "<p><del>gone</del></p>\n");
        assert_eq!(
            render("[site](https://example.com)"),
            "<p><a href=\"https://example.com\" target=\"_blank\" rel=\"noopener noreferrer\">site</a></p>\n"
        );
    }

    #[test]
    fn test_unordered_list_accumulation() {
        assert_eq!(
            render("- a\n- b\nafter"),
            "<ul>\n<li>a</li>\n<li>b</li>\n</ul>\n<p>after</p>\n"
        );
    }

    #[test]
    fn test_list_type_switch_closes_and_reopens() {
        assert_eq!(
            render("- a\n1. b"),
            "<ul>\n<li>a</li>\n</ul>\n<ol>\n<li>b</li>\n</ol>\n"
        );
    }

    #[test]
    fn test_horizontal_rule_not_list() {
        assert_eq!(render("---"), "<hr>\n");
        assert_eq!(render("***"), "<hr>\n");
    }

    #[test]
    fn test_blockquote() {
        assert_eq!(render("> quoted"), "<blockquote>quoted</blockquote>\n");
    }

    #[test]
    fn test_code_fence_isolated_from_line_rules() {
        let out = render("```\n# not a heading\n- not a list\n```");
        assert!(out.contains("# not a heading"));
        assert!(out.contains("- not a list"));
        assert!(!out.contains("<h1>"));
        assert!(!out.contains("<li>"));
    }

    #[test]
    fn test_code_fence_content_escaped() {
        let out = render("```html\n<p>x</p>\n```");
        assert!(out.contains("&lt;p&gt;x&lt;/p&gt;"));
        assert!(out.contains("class=\"language-html\""));
        assert!(!out.contains("<p>x</p>"));
    }

    #[test]
    fn test_inline_code_escaped() {
        let out = render("use `<b>` here");
        assert!(out.contains("<code>&lt;b&gt;</code>"));
    }

    #[test]
    fn test_html_block_passes_verbatim() {
        let out = render("<div class=\"card\">\n# raw\n</div>\nafter");
        assert!(out.contains("<div class=\"card\">\n# raw\n</div>\n"));
        assert!(out.contains("<p>after</p>"));
        assert!(!out.contains("<h1>"));
    }

    #[test]
    fn test_nested_blocks_tracked_by_depth() {
        let text = "<div>\n<details>\n* verbatim\n</details>\nstill inside\n</div>\ntail";
        let out = render(text);
        assert!(out.contains("* verbatim\n"));
        assert!(out.contains("still inside\n"));
        assert!(out.contains("<p>tail</p>"));
        assert!(!out.contains("<ul>"));
    }

    #[test]
    fn test_unmatched_close_clamps_depth() {
        let out = render("</div>\n# heading");
        assert!(out.contains("<h1>heading</h1>"));
    }

    #[test]
    fn test_table_block_untouched() {
        let table = "<table>\n<tr><td>*x*</td></tr>\n</table>";
        let out = render(table);
        assert!(out.contains(table));
        assert!(!out.contains("<em>"));
    }

    #[test]
    fn test_style_and_script_blocks_untouched() {
        let text = "<style>\np { color: red }\n</style>\n<script>\nlet a = 1 * 2;\n</script>";
        let out = render(text);
        assert!(out.contains("p { color: red }"));
        assert!(out.contains("let a = 1 * 2;"));
        assert!(!out.contains("<em>"));
    }

    #[test]
    fn test_token_only_line_passes_through_and_restores() {
        let renderer = MarkdownRenderer::new();
        let mut regions = ProtectedRegions::new();
        let token = regions.protect(KIND_CODE_BLOCK, "<pre>X</pre>".to_string());
        let html = renderer.render(&token, &mut regions);
        assert_eq!(html.trim(), "<pre>X</pre>");
    }

    #[test]
    fn test_inline_code_nested_in_table_restores_fully() {
        let out = render("<table>\n<tr><td>`cell code`</td></tr>\n</table>");
        assert!(out.contains("<code>cell code</code>"));
        assert!(!out.contains("__INLINE_CODE_"));
        assert!(!out.contains("__PROTECTED_BLOCK_"));
    }

    #[test]
    fn test_restoration_tolerates_paragraph_wrapper() {
        let mut regions = ProtectedRegions::new();
        let token = regions.protect(KIND_EMBEDDED_DOC, "DOC".to_string());
        let wrapped = format!("<p>{token}</p>");
        let restored = regions.restore(KIND_EMBEDDED_DOC, wrapped);
        assert_eq!(restored, "DOC");
    }
}
