use crate::chapterizer::Chapter;
use crate::choices::ChoiceBlockProcessor;
use crate::dialogue::DialogueStyler;
use crate::embedded::{EmbeddedDocExtractor, SandboxPolicy};
use crate::macros::MacroExpander;
use crate::markdown::{MarkdownRenderer, ProtectedRegions};
use crate::message::Message;
use crate::text_utils::{escape_attr, escape_html};
use crate::transform::{TextTransform, TransformContext};
use log::warn;
use regex::Regex;

/// Immutable per-render configuration.
pub struct RenderOptions<'a> {
    pub user_name: &'a str,
    pub character_name: &'a str,
    pub character_key: &'a str,
    pub show_sender_name: bool,
    pub dialogue_enabled: bool,
    pub show_images: bool,
    pub transform: &'a dyn TextTransform,
}

/// Drives the full per-message pipeline and assembles chapter HTML.
///
/// Stage order is fixed: macro substitution, external transform hook,
/// previous-state unwrap, fence protection, embedded-document extraction,
/// choice blocks, markdown, restoration, dialogue styling, image append.
/// Each message renders independently; a failure in one never blocks the
/// rest of the chapter.
pub struct ChatRenderer {
    markdown: MarkdownRenderer,
    embedded: EmbeddedDocExtractor,
    choices: ChoiceBlockProcessor,
    dialogue: DialogueStyler,
    sandbox: SandboxPolicy,
    prev_state_re: Regex,
}

impl ChatRenderer {
    pub fn new() -> Self {
        Self::with_sandbox(SandboxPolicy::default())
    }

    pub fn with_sandbox(sandbox: SandboxPolicy) -> Self {
        Self {
            markdown: MarkdownRenderer::new(),
            embedded: EmbeddedDocExtractor::new(),
            choices: ChoiceBlockProcessor::new(),
            dialogue: DialogueStyler::new(),
            sandbox,
            prev_state_re: Regex::new(r"(?is)</?prev_state>")
                .expect("Failed to compile previous state wrapper regex"),
        }
    }

    /// Renders one message's text body to HTML.
    pub fn render_message(&self, message: &Message, opts: &RenderOptions) -> String {
        let expander = MacroExpander::new(opts.user_name, opts.character_name);
        let text = expander.expand(&message.text);

        let ctx = TransformContext {
            is_user: message.is_user,
            user_name: opts.user_name,
            character_name: opts.character_name,
            character_key: opts.character_key,
        };
        let text = match opts.transform.apply(&text, &ctx) {
            Ok(transformed) => transformed,
            Err(e) => {
                warn!(
                    "Transform hook failed on message {}: {e}; using original text",
                    message.sequence_index
                );
                text
            }
        };

        // Stale-snapshot wrappers are unwrapped, not stripped: a current
        // embedded document nested beside stale ones must survive.
        let text = self.unwrap_prev_state(&text);

        let mut regions = ProtectedRegions::new();
        let text = self.markdown.protect_fences(&text, &mut regions);
        let text = self.embedded.extract(&text, &mut regions);
        let text = self.choices.process(&text);
        let html = self.markdown.render(&text, &mut regions);
        let html = self
            .embedded
            .restore_frames(html, &regions, &self.sandbox);
        let html = self.dialogue.style(&html, opts.dialogue_enabled);

        self.append_images(html, message, opts)
    }

    fn unwrap_prev_state(&self, text: &str) -> String {
        self.prev_state_re.replace_all(text, "").into_owned()
    }

    fn append_images(&self, body: String, message: &Message, opts: &RenderOptions) -> String {
        if !opts.show_images || message.extra_images.is_empty() {
            return body;
        }

        let mut block = String::from("<div class=\"message-images\">\n");
        for image in &message.extra_images {
            block.push_str(&format!(
                "<img src=\"{}\" alt=\"{}\">\n",
                escape_attr(&image.url),
                escape_attr(&image.alt)
            ));
        }
        block.push_str("</div>");

        if message.images_replace_text {
            block
        } else {
            format!("{body}\n{block}")
        }
    }

    /// Renders one full message container: role class, stable sequence
    /// index as a data attribute, optional sender-name line.
    pub fn render_message_container(&self, message: &Message, opts: &RenderOptions) -> String {
        let role = if message.is_system {
            "system"
        } else if message.is_user {
            "user"
        } else {
            "character"
        };

        let mut html = format!(
            "<div class=\"message {role}\" data-seq=\"{}\">\n",
            message.sequence_index
        );
        if opts.show_sender_name && !message.is_system {
            html.push_str(&format!(
                "<div class=\"sender-name\">{}</div>\n",
                escape_html(&message.name)
            ));
        }
        html.push_str("<div class=\"message-body\">\n");
        html.push_str(&self.render_message(message, opts));
        html.push_str("\n</div>\n</div>");
        html
    }

    /// Assembles a chapter: titled container, formatted start date when
    /// available, then every message container.
    pub fn render_chapter(
        &self,
        chapter: &Chapter,
        messages: &[Message],
        opts: &RenderOptions,
    ) -> String {
        let mut html = format!(
            "<section class=\"chapter\" data-chapter=\"{}\">\n<h2 class=\"chapter-title\">{}</h2>\n",
            chapter.index,
            escape_html(&chapter.title)
        );
        if let Some(start) = chapter.start_time {
            html.push_str(&format!(
                "<div class=\"chapter-date\">{}</div>\n",
                start.format("%B %e, %Y")
            ));
        }
        for message in chapter.messages(messages) {
            html.push_str(&self.render_message_container(message, opts));
            html.push('\n');
        }
        html.push_str("</section>");
        html
    }

    /// Visible inline error state for structural failures; never a silent
    /// failure, never a crash of the surrounding document.
    pub fn render_error_block(&self, description: &str) -> String {
        format!(
            "<div class=\"reader-error\">{}</div>",
            escape_html(description)
        )
    }
}

impl Default for ChatRenderer {
    fn default() -> Self {
        Self::new()
    }
}
