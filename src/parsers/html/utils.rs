/// ASCII whitespace
pub const WHITESPACES: &[char] = &[' ', '\t', '\n', '\x0c', '\r'];

/// `rel` values designating a favicon
pub const FAVICON_VALUES: &[&str] = &["icon", "shortcut icon"];

pub fn is_favicon(attr_value: &str) -> bool {
    FAVICON_VALUES.contains(&attr_value.trim().to_lowercase().as_str())
}

/// Escapes text for use in an HTML attribute value or text node.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
