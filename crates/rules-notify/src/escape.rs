//! MarkdownV2 escaping for the messaging channel

/// Characters the channel reserves in MarkdownV2 parse mode
const RESERVED: [char; 18] = [
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

/// Escape text for MarkdownV2
///
/// Backslashes are doubled first, then every reserved character gets a
/// leading backslash. Escaping an already escaped string escapes it again.
pub fn escape_markdown_v2(text: &str) -> String {
    let mut result = String::with_capacity(text.len() * 2);
    for ch in text.chars() {
        if ch == '\\' || RESERVED.contains(&ch) {
            result.push('\\');
        }
        result.push(ch);
    }
    result
}
