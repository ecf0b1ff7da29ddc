use crate::bookmark::Bookmark;
use crate::chapterizer::Chapter;
use crate::text_utils::escape_html;

/// Renders the navigation tree: one entry per chapter, with bookmarks
/// nested under the chapter containing their message. A bookmark whose
/// sequence index matches no chapter (a stale store entry) is dropped.
pub fn render_outline(chapters: &[Chapter], bookmarks: &[Bookmark]) -> String {
    let mut html = String::from("<nav class=\"outline\">\n<ul>\n");

    for chapter in chapters {
        html.push_str(&format!(
            "<li class=\"outline-chapter\"><a href=\"#\" data-chapter=\"{}\">{}</a>",
            chapter.index,
            escape_html(&chapter.title)
        ));

        let nested: Vec<&Bookmark> = bookmarks
            .iter()
            .filter(|b| chapter.contains_sequence_index(b.message_sequence_index))
            .collect();

        if !nested.is_empty() {
            html.push_str("\n<ul class=\"outline-bookmarks\">\n");
            for bookmark in nested {
                html.push_str(&format!(
                    "<li class=\"outline-bookmark\"><a href=\"#\" data-seq=\"{}\">{}</a></li>\n",
                    bookmark.message_sequence_index,
                    escape_html(&bookmark.label)
                ));
            }
            html.push_str("</ul>\n");
        }
        html.push_str("</li>\n");
    }

    html.push_str("</ul>\n</nav>");
    html
}
