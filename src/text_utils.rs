/// Escapes text for safe inclusion in HTML element content.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Escapes text for inclusion inside a double-quoted HTML attribute value.
///
/// Newlines are preserved as entities so multi-line documents survive the
/// round trip through `srcdoc` attributes.
pub fn escape_attr(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\n', "&#10;")
}

/// Reverses `escape_attr`. Used when inspecting frame contents in tests.
pub fn unescape_attr(text: &str) -> String {
    text.replace("&#10;", "\n")
        .replace("&gt;", ">")
        .replace("&lt;", "<")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

/// Escapes a user-supplied literal so it can be embedded in a regex pattern.
pub fn escape_regex(text: &str) -> String {
    regex::escape(text)
}
