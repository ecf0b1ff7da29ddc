/// One quotation bracket pair. Symmetric pairs (straight quotes) use the
/// same character for both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotePair {
    pub open: char,
    pub close: char,
}

impl QuotePair {
    pub const fn new(open: char, close: char) -> Self {
        QuotePair { open, close }
    }
}

/// Default bracket set: straight/smart doubles, CJK corner and double-angle
/// brackets, guillemets, smart singles. Straight single quotes are available
/// via [`DialogueStyler::with_pairs`] but excluded here because they collide
/// with apostrophes.
pub fn default_pairs() -> Vec<QuotePair> {
    vec![
        QuotePair::new('"', '"'),
        QuotePair::new('\u{201C}', '\u{201D}'),
        QuotePair::new('「', '」'),
        QuotePair::new('『', '』'),
        QuotePair::new('《', '》'),
        QuotePair::new('«', '»'),
        QuotePair::new('\u{2018}', '\u{2019}'),
    ]
}

/// Wraps quoted-speech runs in already-rendered HTML with a styling span.
///
/// Operates only on text outside tags: quote characters inside tag names or
/// attribute values are never touched. A quoted run is styled once; the
/// single left-to-right pass cannot double-wrap.
pub struct DialogueStyler {
    pairs: Vec<QuotePair>,
}

impl DialogueStyler {
    pub fn new() -> Self {
        Self {
            pairs: default_pairs(),
        }
    }

    pub fn with_pairs(pairs: Vec<QuotePair>) -> Self {
        Self { pairs }
    }

    /// Styles quoted spans when enabled; identity when disabled.
    pub fn style(&self, html: &str, enabled: bool) -> String {
        if !enabled {
            return html.to_string();
        }

        let mut out = String::with_capacity(html.len());
        let mut text_run = String::new();
        let mut in_tag = false;

        for ch in html.chars() {
            match ch {
                '<' if !in_tag => {
                    out.push_str(&self.style_text(&text_run));
                    text_run.clear();
                    in_tag = true;
                    out.push(ch);
                }
                '>' if in_tag => {
                    in_tag = false;
                    out.push(ch);
                }
                _ if in_tag => out.push(ch),
                _ => text_run.push(ch),
            }
        }
        out.push_str(&self.style_text(&text_run));
        out
    }

    fn style_text(&self, text: &str) -> String {
        let chars: Vec<char> = text.chars().collect();
        let mut out = String::with_capacity(text.len());
        let mut i = 0;

        while i < chars.len() {
            let ch = chars[i];
            if let Some(pair) = self.pairs.iter().find(|p| p.open == ch) {
                if let Some(close_offset) =
                    chars[i + 1..].iter().position(|&c| c == pair.close)
                {
                    let end = i + 1 + close_offset;
                    out.push_str("<span class=\"dialogue\">");
                    for &c in &chars[i..=end] {
                        out.push(c);
                    }
                    out.push_str("</span>");
                    i = end + 1;
                    continue;
                }
            }
            out.push(ch);
            i += 1;
        }
        out
    }
}

impl Default for DialogueStyler {
    fn default() -> Self {
        Self::new()
    }
}
