use crate::renderer::ChatRenderer;
use crate::session::ReaderSession;
use crate::settings::ImageMode;
use crate::text_utils::escape_html;
use crate::theme::palette_by_name;
use anyhow::{Context, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use log::{debug, info, warn};
use regex::Regex;
use std::fs;
use std::path::Path;

/// Produces one self-contained HTML document: theme/typography CSS inlined,
/// outline sidebar, all chapter markup, and the reader script (navigation,
/// reading modes, progress tracking, position restore, client-side search,
/// frame height channel). No external asset references unless image mode is
/// `Url`.
pub struct HtmlExporter {
    img_src_re: Regex,
}

pub struct ExportInput<'a> {
    pub session: &'a ReaderSession,
    pub chapter_html: &'a [String],
    pub outline_html: &'a str,
    pub height_channel: &'a str,
    /// Directory local image references resolve against in `Embed` mode.
    pub base_dir: Option<&'a Path>,
}

impl HtmlExporter {
    pub fn new() -> Self {
        Self {
            img_src_re: Regex::new(r#"<img([^>]*?)\ssrc="([^"]+)""#)
                .expect("Failed to compile image source regex"),
        }
    }

    pub fn export(&self, input: &ExportInput) -> Result<String> {
        let settings = input.session.settings();
        let palette = palette_by_name(&settings.theme);
        let transcript = input.session.transcript();

        let title = format!(
            "{} — {}",
            transcript.character_name, transcript.user_name
        );

        let body = if input.chapter_html.is_empty() {
            ChatRenderer::new().render_error_block("This chat has no messages to display.")
        } else {
            input.chapter_html.join("\n")
        };

        let body = match settings.image_mode {
            ImageMode::Embed => self.inline_images(&body, input.base_dir),
            ImageMode::Url => body,
        };

        let script = READER_SCRIPT
            .replace("{{session_id}}", input.session.session_id())
            .replace("{{height_channel}}", input.height_channel);

        let document = DOCUMENT_TEMPLATE
            .replace("{{title}}", &escape_html(&title))
            .replace("{{css_variables}}", &palette.css_variables(settings))
            .replace("{{css}}", READER_CSS)
            .replace("{{reading_mode}}", settings.reading_mode.as_str())
            .replace("{{outline}}", input.outline_html)
            .replace("{{content}}", &body)
            .replace("{{script}}", &script);

        info!(
            "Exported {} chapters for session {}",
            input.chapter_html.len(),
            input.session.session_id()
        );
        Ok(document)
    }

    pub fn export_to_file(&self, input: &ExportInput, path: &Path) -> Result<()> {
        let document = self.export(input)?;
        fs::write(path, document)
            .with_context(|| format!("Failed to write export to {}", path.display()))?;
        info!("Wrote export to {}", path.display());
        Ok(())
    }

    /// Converts local image references into data URLs. A file that cannot
    /// be read keeps its original reference and the export continues.
    fn inline_images(&self, html: &str, base_dir: Option<&Path>) -> String {
        self.img_src_re
            .replace_all(html, |caps: &regex::Captures| {
                let attrs = &caps[1];
                let src = &caps[2];
                match self.to_data_url(src, base_dir) {
                    Some(data_url) => format!("<img{attrs} src=\"{data_url}\""),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }

    fn to_data_url(&self, src: &str, base_dir: Option<&Path>) -> Option<String> {
        if src.starts_with("http://") || src.starts_with("https://") || src.starts_with("data:") {
            debug!("Leaving non-local image reference as-is: {src}");
            return None;
        }

        let path = match base_dir {
            Some(dir) => dir.join(src),
            None => Path::new(src).to_path_buf(),
        };

        match fs::read(&path) {
            Ok(bytes) => {
                let mime = mime_for_extension(&path);
                Some(format!("data:{mime};base64,{}", BASE64.encode(bytes)))
            }
            Err(e) => {
                warn!(
                    "Failed to read image {} ({e}); keeping original reference",
                    path.display()
                );
                None
            }
        }
    }
}

impl Default for HtmlExporter {
    fn default() -> Self {
        Self::new()
    }
}

fn mime_for_extension(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

const DOCUMENT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{{title}}</title>
<style>
{{css_variables}}
{{css}}
</style>
</head>
<body data-reading-mode="{{reading_mode}}">
<div class="reader">
<aside class="sidebar">
<input type="search" id="search-box" placeholder="Search…">
<div id="search-results"></div>
{{outline}}
</aside>
<main id="content">
{{content}}
</main>
</div>
<div class="pager">
<button id="prev-chapter">&#8592;</button>
<span id="pager-label"></span>
<button id="next-chapter">&#8594;</button>
</div>
<div class="progress-track"><div id="progress"></div></div>
<script>
{{script}}
</script>
</body>
</html>
"#;

const READER_CSS: &str = r#"* { box-sizing: border-box; }
body { margin: 0; background: var(--bg); color: var(--text); font-family: var(--font-family); font-size: var(--font-size); line-height: var(--line-height); }
.reader { display: flex; min-height: 100vh; }
.sidebar { width: 260px; flex-shrink: 0; padding: 16px; background: var(--surface); border-right: 1px solid var(--border); position: sticky; top: 0; height: 100vh; overflow-y: auto; }
.sidebar ul { list-style: none; padding-left: 0; margin: 8px 0; }
.outline-bookmarks { padding-left: 16px !important; font-size: 0.85em; }
.sidebar a { color: var(--text); text-decoration: none; display: block; padding: 3px 6px; border-radius: 4px; }
.sidebar a:hover { background: var(--border); }
#search-box { width: 100%; padding: 6px; background: var(--bg); color: var(--text); border: 1px solid var(--border); border-radius: 4px; }
#search-results { font-size: 0.8em; margin-top: 8px; }
#search-results .hit { padding: 4px; border-bottom: 1px solid var(--border); cursor: pointer; }
.search-highlight { background: var(--highlight); color: var(--bg); }
main { flex-grow: 1; max-width: var(--content-width); margin: 0 auto; padding: 24px; }
.chapter-title { color: var(--character-accent); border-bottom: 1px solid var(--border); padding-bottom: 6px; }
.chapter-date { color: var(--muted); font-size: 0.85em; margin-bottom: 16px; }
.message { margin: 16px 0; padding: 12px 16px; border-radius: 8px; background: var(--surface); }
.message.user { border-left: 3px solid var(--user-accent); }
.message.character { border-left: 3px solid var(--character-accent); }
.message.system { border-left: 3px solid var(--muted); color: var(--muted); font-style: italic; }
.sender-name { font-weight: bold; margin-bottom: 6px; color: var(--muted); }
.dialogue { color: var(--dialogue); }
a { color: var(--link); }
.code-block { background: var(--code-bg); padding: 10px; border-radius: 6px; overflow-x: auto; }
code { background: var(--code-bg); padding: 1px 4px; border-radius: 3px; }
blockquote { border-left: 3px solid var(--border); margin-left: 0; padding-left: 12px; color: var(--muted); }
.choices-block { border: 1px solid var(--border); border-radius: 8px; padding: 10px; margin: 10px 0; }
.choices-header { font-weight: bold; color: var(--muted); margin-bottom: 6px; }
.choice-card { display: flex; gap: 10px; padding: 6px 10px; margin: 4px 0; background: var(--bg); border-radius: 6px; }
.choice-num { color: var(--character-accent); font-weight: bold; }
.message-images img { max-width: 100%; border-radius: 6px; margin-top: 8px; }
.embedded-doc { width: 100%; border: 1px solid var(--border); border-radius: 6px; }
.reader-error { padding: 24px; border: 1px solid var(--dialogue); border-radius: 8px; color: var(--dialogue); }
.progress-track { position: fixed; bottom: 0; left: 0; right: 0; height: 4px; background: var(--surface); }
#progress { height: 100%; width: 0; background: var(--character-accent); }
.pager { display: none; position: fixed; bottom: 12px; right: 16px; gap: 8px; align-items: center; color: var(--muted); }
.pager button { background: var(--surface); color: var(--text); border: 1px solid var(--border); border-radius: 4px; padding: 4px 10px; cursor: pointer; }
body[data-reading-mode="paginated"] .pager { display: flex; }
body[data-reading-mode="paginated"] .chapter { display: none; }
body[data-reading-mode="paginated"] .chapter.current { display: block; }
"#;

const READER_SCRIPT: &str = r#"(function () {
  'use strict';
  var sessionId = '{{session_id}}';
  var storageKey = 'chatokrat-' + sessionId;
  var paginated = document.body.dataset.readingMode === 'paginated';
  var chapters = Array.prototype.slice.call(document.querySelectorAll('.chapter'));
  var currentChapter = 0;

  function showChapter(index) {
    if (!chapters.length) return;
    currentChapter = Math.max(0, Math.min(index, chapters.length - 1));
    if (paginated) {
      chapters.forEach(function (c, i) {
        c.classList.toggle('current', i === currentChapter);
      });
      window.scrollTo(0, 0);
      var label = document.getElementById('pager-label');
      if (label) label.textContent = (currentChapter + 1) + ' / ' + chapters.length;
    } else {
      chapters[currentChapter].scrollIntoView();
    }
    savePosition();
  }

  function jumpToMessage(seq) {
    var target = document.querySelector('.message[data-seq="' + seq + '"]');
    if (!target) return;
    var chapter = target.closest('.chapter');
    if (paginated && chapter) showChapter(chapters.indexOf(chapter));
    target.scrollIntoView();
  }

  function progressPercent() {
    var doc = document.documentElement;
    var max = doc.scrollHeight - doc.clientHeight;
    return max > 0 ? Math.round((window.scrollY / max) * 100) : 0;
  }

  function savePosition() {
    try {
      localStorage.setItem(storageKey, JSON.stringify({
        chapterIndex: currentChapter,
        scrollOffset: window.scrollY,
        progressPercent: progressPercent()
      }));
    } catch (e) { /* storage unavailable */ }
  }

  function restorePosition() {
    try {
      var saved = JSON.parse(localStorage.getItem(storageKey));
      if (!saved) return;
      if (paginated) showChapter(saved.chapterIndex || 0);
      window.scrollTo(0, saved.scrollOffset || 0);
    } catch (e) { /* corrupt record, start from the top */ }
  }

  document.querySelectorAll('.outline a[data-chapter]').forEach(function (link) {
    link.addEventListener('click', function (e) {
      e.preventDefault();
      showChapter(parseInt(link.dataset.chapter, 10));
    });
  });
  document.querySelectorAll('.outline a[data-seq]').forEach(function (link) {
    link.addEventListener('click', function (e) {
      e.preventDefault();
      jumpToMessage(link.dataset.seq);
    });
  });

  var prev = document.getElementById('prev-chapter');
  var next = document.getElementById('next-chapter');
  if (prev) prev.addEventListener('click', function () { showChapter(currentChapter - 1); });
  if (next) next.addEventListener('click', function () { showChapter(currentChapter + 1); });

  var progressTimer = null;
  window.addEventListener('scroll', function () {
    var bar = document.getElementById('progress');
    if (bar) bar.style.width = progressPercent() + '%';
    if (progressTimer) clearTimeout(progressTimer);
    progressTimer = setTimeout(savePosition, 400);
  });

  window.addEventListener('message', function (event) {
    var data = event.data;
    if (!data || data.type !== '{{height_channel}}') return;
    var frame = document.getElementById('embedded-doc-' + data.frame);
    if (frame && data.height > 0) frame.style.height = data.height + 'px';
  });

  var searchBox = document.getElementById('search-box');
  var searchResults = document.getElementById('search-results');
  var MAX_RESULTS = 50;
  if (searchBox && searchResults) {
    searchBox.addEventListener('input', function () {
      var query = searchBox.value.trim().toLowerCase();
      searchResults.innerHTML = '';
      if (!query) return;
      var total = 0;
      var shown = 0;
      document.querySelectorAll('.message').forEach(function (message) {
        var body = message.querySelector('.message-body');
        var text = body ? body.textContent : '';
        var haystack = text.toLowerCase();
        var from = 0;
        var at;
        while ((at = haystack.indexOf(query, from)) !== -1) {
          total += 1;
          if (shown < MAX_RESULTS) {
            shown += 1;
            var hit = document.createElement('div');
            hit.className = 'hit';
            hit.textContent = text.substring(Math.max(0, at - 30), at + query.length + 30);
            hit.addEventListener('click', function () {
              jumpToMessage(message.dataset.seq);
            });
            searchResults.appendChild(hit);
          }
          from = at + query.length;
        }
      });
      var summary = document.createElement('div');
      summary.textContent = total + ' match(es)';
      searchResults.insertBefore(summary, searchResults.firstChild);
    });
  }

  if (paginated) showChapter(0);
  restorePosition();
})();
"#;
