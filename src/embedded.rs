use crate::markdown::{KIND_EMBEDDED_DOC, ProtectedRegions};
use crate::text_utils::escape_attr;
use regex::Regex;

/// Structured sandbox configuration for restored inline frames.
///
/// All attribute escaping happens through [`SandboxPolicy::frame_html`]
/// instead of being scattered through the pipeline.
#[derive(Debug, Clone)]
pub struct SandboxPolicy {
    pub allow_scripts: bool,
    /// Trusted content additionally gets same-origin privileges.
    pub trusted: bool,
    pub extra_permissions: Vec<String>,
    /// Message type the embedded document uses to announce its content
    /// height; the export script resizes the frame on receipt.
    pub height_channel: String,
}

impl Default for SandboxPolicy {
    fn default() -> Self {
        SandboxPolicy {
            allow_scripts: true,
            trusted: false,
            extra_permissions: Vec::new(),
            height_channel: "chatokrat-frame-height".to_string(),
        }
    }
}

impl SandboxPolicy {
    pub fn sandbox_attr(&self) -> String {
        let mut grants = Vec::new();
        if self.allow_scripts {
            grants.push("allow-scripts".to_string());
        }
        if self.trusted {
            grants.push("allow-same-origin".to_string());
        }
        grants.extend(self.extra_permissions.iter().cloned());
        grants.join(" ")
    }

    /// Builds the sandboxed inline frame for one extracted document.
    ///
    /// The document gets a style override (collapse default margins, keep
    /// the background transparent) and the height-report script injected
    /// before its closing tags; the original markup is otherwise untouched.
    pub fn frame_html(&self, doc: &str, ordinal: usize) -> String {
        let instrumented = self.instrument(doc, ordinal);
        format!(
            "<iframe class=\"embedded-doc\" id=\"embedded-doc-{ordinal}\" sandbox=\"{}\" scrolling=\"no\" srcdoc=\"{}\"></iframe>",
            self.sandbox_attr(),
            escape_attr(&instrumented)
        )
    }

    fn instrument(&self, doc: &str, ordinal: usize) -> String {
        let style = "<style>html,body{margin:0;background:transparent}</style>";
        let script = format!(
            "<script>(function(){{var post=function(){{parent.postMessage({{type:'{channel}',frame:{ordinal},height:document.documentElement.scrollHeight}},'*');}};window.addEventListener('load',post);window.addEventListener('resize',post);}})();</script>",
            channel = self.height_channel,
        );
        let injection = format!("{style}{script}");
        if let Some(pos) = find_case_insensitive(doc, "</body>") {
            let mut out = String::with_capacity(doc.len() + injection.len());
            out.push_str(&doc[..pos]);
            out.push_str(&injection);
            out.push_str(&doc[pos..]);
            out
        } else {
            format!("{doc}{injection}")
        }
    }
}

fn find_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    haystack.to_lowercase().find(&needle.to_lowercase())
}

/// Finds complete embedded HTML documents (full document envelope, doctype
/// through closing root tag) and swaps them for opaque tokens.
///
/// Runs after fence protection and before inline-code extraction: literal
/// backticks inside the document's own script or template content must not
/// be misread as inline code.
pub struct EmbeddedDocExtractor {
    doc_re: Regex,
}

impl EmbeddedDocExtractor {
    pub fn new() -> Self {
        Self {
            doc_re: Regex::new(r"(?is)<!DOCTYPE\s+html.*?</html\s*>")
                .expect("Failed to compile embedded document regex"),
        }
    }

    pub fn extract(&self, text: &str, regions: &mut ProtectedRegions) -> String {
        self.doc_re
            .replace_all(text, |caps: &regex::Captures| {
                regions.protect(KIND_EMBEDDED_DOC, caps[0].to_string())
            })
            .into_owned()
    }

    /// Replaces embedded-document tokens with sandboxed inline frames. Runs
    /// last, after the markdown pass and every other restoration, so the
    /// markdown rules never see raw frame markup.
    pub fn restore_frames(
        &self,
        html: String,
        regions: &ProtectedRegions,
        policy: &SandboxPolicy,
    ) -> String {
        regions.restore_with(KIND_EMBEDDED_DOC, html, |doc, ordinal| {
            policy.frame_html(doc, ordinal)
        })
    }
}

impl Default for EmbeddedDocExtractor {
    fn default() -> Self {
        Self::new()
    }
}
