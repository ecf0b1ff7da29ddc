use chatokrat::chapterizer::{ChapterMode, ChapterSettings, chapterize};
use chatokrat::message::Transcript;
use chatokrat::renderer::{ChatRenderer, RenderOptions};
use chatokrat::search::search_chapters;
use chatokrat::session::ReaderSession;
use chatokrat::settings::Settings;
use chatokrat::text_utils::unescape_attr;
use chatokrat::transform::NoopTransform;

const HEADER: &str = r#"{"user_name":"Alice","character_name":"Bob","session_id":"test"}"#;

fn transcript_from(texts: &[&str]) -> Transcript {
    let mut lines = vec![HEADER.to_string()];
    for (i, text) in texts.iter().enumerate() {
        let record = serde_json::json!({
            "name": if i % 2 == 0 { "Bob" } else { "Alice" },
            "is_user": i % 2 == 1,
            "text": text,
            "sent": 1_700_000_000 + i as i64 * 60,
        });
        lines.push(record.to_string());
    }
    Transcript::parse(&lines.join("\n")).unwrap()
}

fn options(transform: &NoopTransform, dialogue: bool) -> RenderOptions<'_> {
    RenderOptions {
        user_name: "Alice",
        character_name: "Bob",
        character_key: "bob",
        show_sender_name: true,
        dialogue_enabled: dialogue,
        show_images: true,
        transform,
    }
}

#[test]
fn chapterization_covers_input_in_every_mode() {
    let transcript = transcript_from(&["a", "b", "c", "d", "e", "f", "g"]);
    for mode in [
        ChapterMode::None,
        ChapterMode::Count,
        ChapterMode::Time,
        ChapterMode::Both,
    ] {
        let chapters = chapterize(
            &transcript.messages,
            &ChapterSettings {
                mode,
                messages_per_chapter: 3,
                time_gap_hours: 6.0,
            },
        );
        let flattened: Vec<usize> = chapters.iter().flat_map(|c| c.range.clone()).collect();
        let expected: Vec<usize> = (0..transcript.messages.len()).collect();
        assert_eq!(flattened, expected, "mode {mode:?} lost or reordered messages");
    }
}

#[test]
fn count_mode_produces_ceil_n_over_k_chapters() {
    let transcript = transcript_from(&["a"; 10]);
    for k in 1..=10 {
        let chapters = chapterize(
            &transcript.messages,
            &ChapterSettings {
                mode: ChapterMode::Count,
                messages_per_chapter: k,
                time_gap_hours: 6.0,
            },
        );
        assert_eq!(chapters.len(), 10usize.div_ceil(k));
        for chapter in chapters.iter().take(chapters.len() - 1) {
            assert_eq!(chapter.range.len(), k);
        }
    }
}

#[test]
fn time_mode_six_hour_gap_splits_between_messages() {
    // T, T+1h, T+8h → two chapters: [T, T+1h], [T+8h].
    let t = 1_700_000_000i64;
    let mut lines = vec![HEADER.to_string()];
    for offset in [0, 3600, 8 * 3600] {
        lines.push(format!(
            r#"{{"name":"Bob","text":"at {offset}","sent":{}}}"#,
            t + offset
        ));
    }
    let transcript = Transcript::parse(&lines.join("\n")).unwrap();
    let chapters = chapterize(
        &transcript.messages,
        &ChapterSettings {
            mode: ChapterMode::Time,
            messages_per_chapter: 100,
            time_gap_hours: 6.0,
        },
    );
    assert_eq!(chapters.len(), 2);
    assert_eq!(chapters[0].range, 0..2);
    assert_eq!(chapters[1].range, 2..3);
}

#[test]
fn dialogue_styling_and_code_fence_render_together() {
    // Messages: greeting, quoted speech, fenced html. Count mode, size 2.
    let transcript = transcript_from(&[
        "Hello",
        "\"Good day\" he said",
        "```html\n<p>x</p>\n```",
    ]);
    let chapters = chapterize(
        &transcript.messages,
        &ChapterSettings {
            mode: ChapterMode::Count,
            messages_per_chapter: 2,
            time_gap_hours: 6.0,
        },
    );
    assert_eq!(chapters.len(), 2);

    let renderer = ChatRenderer::new();
    let noop = NoopTransform;
    let opts = options(&noop, true);

    let first = renderer.render_chapter(&chapters[0], &transcript.messages, &opts);
    assert!(first.contains("Hello"));
    assert!(first.contains("<span class=\"dialogue\">\"Good day\"</span>"));

    let second = renderer.render_chapter(&chapters[1], &transcript.messages, &opts);
    // The fenced block renders as a literal escaped code block, not live markup.
    assert!(second.contains("&lt;p&gt;x&lt;/p&gt;"));
    assert!(!second.contains("<p>x</p>"));
}

#[test]
fn dialogue_disabled_render_is_byte_identical_to_markdown_only() {
    let transcript = transcript_from(&["\"Quoted\" and *styled* text"]);
    let renderer = ChatRenderer::new();
    let noop = NoopTransform;

    let disabled = renderer.render_message(&transcript.messages[0], &options(&noop, false));
    let enabled = renderer.render_message(&transcript.messages[0], &options(&noop, true));

    assert!(!disabled.contains("dialogue"));
    assert_eq!(
        enabled.matches("<span class=\"dialogue\">").count(),
        1,
        "each quoted span is wrapped exactly once"
    );
    // Removing the dialogue wrapper recovers the markdown-only render.
    let unwrapped = enabled
        .replace("<span class=\"dialogue\">", "")
        .replace("</span>", "");
    assert_eq!(unwrapped, disabled);
}

#[test]
fn embedded_document_round_trips_byte_for_byte() {
    // Backticks and markdown-special characters inside the document's own
    // script content must survive untouched.
    let doc = "<!DOCTYPE html>\n<html>\n<head><title>*not markdown*</title></head>\n<body>\n<script>\nlet tpl = `# not a heading`;\nlet stars = \"**bold?**\";\n</script>\n</body>\n</html>";
    let text = format!("Intro line\n{doc}\nOutro line");

    let mut lines = vec![HEADER.to_string()];
    lines.push(serde_json::json!({"name": "Bob", "text": text, "sent": 1_700_000_000}).to_string());
    let transcript = Transcript::parse(&lines.join("\n")).unwrap();

    let renderer = ChatRenderer::new();
    let noop = NoopTransform;
    let html = renderer.render_message(&transcript.messages[0], &options(&noop, true));

    // Pull the frame content back out of the srcdoc attribute.
    let start = html.find("srcdoc=\"").expect("frame present") + "srcdoc=\"".len();
    let end = html[start..].find('"').unwrap() + start;
    let content = unescape_attr(&html[start..end]);

    // Ignore the injected style override and height-report script.
    let style_start = content.find("<style>html,body").unwrap();
    let script_end = content.rfind("})();</script>").unwrap() + "})();</script>".len();
    let stripped = format!("{}{}", &content[..style_start], &content[script_end..]);

    assert_eq!(stripped, doc);
    assert!(html.contains("Intro line"));
    assert!(html.contains("Outro line"));
}

#[test]
fn fake_document_envelope_inside_fence_stays_inert() {
    let text = "```\n<!DOCTYPE html><html><body>stale</body></html>\n```";
    let transcript = transcript_from(&[text]);
    let renderer = ChatRenderer::new();
    let noop = NoopTransform;
    let html = renderer.render_message(&transcript.messages[0], &options(&noop, true));
    assert!(!html.contains("<iframe"));
    assert!(html.contains("&lt;!DOCTYPE html&gt;"));
}

#[test]
fn search_counts_and_contexts_are_correct() {
    let transcript = transcript_from(&[
        "the needle is here",
        "no match",
        "needle and needle again",
    ]);
    let chapters = chapterize(&transcript.messages, &ChapterSettings::default());
    let results = search_chapters(&chapters, &transcript.messages, "NEEDLE");

    assert_eq!(results.total, 3);
    assert_eq!(results.hits.len(), 3);
    for hit in &results.hits {
        assert!(hit.context_text.to_lowercase().contains("needle"));
        assert!(hit.context_html.contains("<span class=\"search-highlight\">"));
    }
    assert_eq!(results.hits[0].sequence_index, 0);
    assert_eq!(results.hits[1].sequence_index, 2);
}

#[test]
fn session_rechapterization_preserves_sequence_identity() {
    let transcript = transcript_from(&["a", "b", "c", "d", "e", "f"]);
    let settings = Settings {
        chapter_mode: ChapterMode::Count,
        messages_per_chapter: 2,
        ..Settings::default()
    };
    let mut session = ReaderSession::new(transcript, settings);
    assert_eq!(session.chapter_of_sequence_index(5), Some(2));

    session.update_chapter_settings(ChapterSettings {
        mode: ChapterMode::Count,
        messages_per_chapter: 3,
        time_gap_hours: 6.0,
    });
    // Chapter indices shift, the message identity does not.
    assert_eq!(session.chapter_of_sequence_index(5), Some(1));
    assert_eq!(session.messages()[5].sequence_index, 5);
}

#[test]
fn mixed_message_survives_full_pipeline() {
    let text = "# Scene\n\n<div class=\"stage\">\n*raw inside block*\n</div>\n\n- item one\n- item two\n\n`inline` and **bold**\n\n<choices>\n1. Fight\n2. Flee\n</choices>";
    let transcript = transcript_from(&[text]);
    let renderer = ChatRenderer::new();
    let noop = NoopTransform;
    let html = renderer.render_message(&transcript.messages[0], &options(&noop, true));

    assert!(html.contains("<h1>Scene</h1>"));
    assert!(html.contains("*raw inside block*"));
    assert!(html.contains("<li>item one</li>"));
    assert!(html.contains("<code>inline</code>"));
    assert!(html.contains("<strong>bold</strong>"));
    assert!(html.contains("choice-card"));
    assert!(html.contains("Fight"));
}
