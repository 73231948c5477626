use std::borrow::Cow;
use std::collections::HashSet;

/// Reduces feed-supplied HTML to plain text for chat messages.
///
/// Strict policy: every tag is dropped (the text of `<script>` and `<style>`
/// elements included) and the remaining text stays HTML-escaped, so escaped
/// markup in a feed is never turned back into markup. Control characters are
/// stripped first and whitespace runs inside a line collapse to one space.
///
/// # Examples
///
/// ```
/// use feedhook::util::sanitize;
///
/// assert_eq!(sanitize("<p>Fish &amp; <b>chips</b></p>"), "Fish &amp; chips");
/// assert_eq!(sanitize("[Title](https://example.com)"), "[Title](https://example.com)");
/// ```
pub fn sanitize(html: &str) -> String {
    let text = strip_control_chars(html);

    let mut builder = ammonia::Builder::empty();
    builder.clean_content_tags(HashSet::from(["script", "style"]));
    let cleaned = builder.clean(&text).to_string();

    collapse_whitespace(&cleaned)
}

/// Strip terminal control characters and ANSI escape sequences.
///
/// Removes ASCII control characters other than tab, newline and carriage
/// return, CSI sequences (`ESC [` up to a final byte 0x40-0x7E), OSC
/// sequences (`ESC ]` up to BEL or `ESC \`) and bare ESC bytes.
///
/// Returns `Cow::Borrowed` when there is nothing to strip.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    let bytes = s.as_bytes();
    let len = bytes.len();

    if !bytes.iter().any(|&b| is_stripped(b)) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(len);
    let mut i = 0;

    while i < len {
        let b = bytes[i];

        if b == 0x1b {
            match bytes.get(i + 1) {
                Some(b'[') => {
                    i += 2;
                    while i < len {
                        let c = bytes[i];
                        i += 1;
                        if (0x40..=0x7e).contains(&c) {
                            break;
                        }
                    }
                }
                Some(b']') => {
                    i += 2;
                    while i < len {
                        if bytes[i] == 0x07 {
                            i += 1;
                            break;
                        }
                        if bytes[i] == 0x1b && bytes.get(i + 1) == Some(&b'\\') {
                            i += 2;
                            break;
                        }
                        i += 1;
                    }
                }
                _ => i += 1,
            }
        } else if is_stripped(b) {
            i += 1;
        } else {
            let start = i;
            i += 1;
            while i < len && !is_stripped(bytes[i]) {
                i += 1;
            }
            // Only ASCII bytes end a run, so the slice is on char boundaries
            out.push_str(&s[start..i]);
        }
    }

    Cow::Owned(out)
}

fn is_stripped(b: u8) -> bool {
    b == 0x1b || b == 0x7f || (b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r'))
}

/// Collapses whitespace within lines and drops blank lines.
fn collapse_whitespace(text: &str) -> String {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_unchanged() {
        assert_eq!(sanitize("Hello world"), "Hello world");
    }

    #[test]
    fn test_tags_removed() {
        assert_eq!(sanitize("<p>Hello <b>world</b></p>"), "Hello world");
        assert_eq!(
            sanitize(r#"<a href="https://example.com" onclick="x()">link</a>"#),
            "link"
        );
        assert_eq!(sanitize(r#"<img src="x.png">caption"#), "caption");
    }

    #[test]
    fn test_script_and_style_content_dropped() {
        assert_eq!(
            sanitize("before<script>alert('x')</script>after"),
            "beforeafter"
        );
        assert_eq!(sanitize("<style>p { color: red }</style>text"), "text");
    }

    #[test]
    fn test_escaped_markup_stays_escaped() {
        let out = sanitize(
            "&lt;img src=x onerror=alert(1)&gt; &lt;script&gt;alert(1)&lt;/script&gt;",
        );
        assert!(!out.contains('<'), "{out}");
        assert!(!out.contains('>'), "{out}");
        assert_eq!(
            out,
            "&lt;img src=x onerror=alert(1)&gt; &lt;script&gt;alert(1)&lt;/script&gt;"
        );
    }

    #[test]
    fn test_text_is_html_escaped() {
        assert_eq!(sanitize("Fish & chips"), "Fish &amp; chips");
        assert_eq!(sanitize("1 < 2"), "1 &lt; 2");
    }

    #[test]
    fn test_control_characters_stripped() {
        assert_eq!(sanitize("bell\u{7}ed \u{1b}[31mred"), "belled red");
        assert_eq!(
            strip_control_chars("title\u{1b}]0;pwned\u{7} end"),
            "title end"
        );
    }

    #[test]
    fn test_clean_input_is_borrowed() {
        assert!(matches!(strip_control_chars("plain\ttext\n"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_whitespace_collapsed() {
        assert_eq!(sanitize("  a \t  b  \n\n  c "), "a b\nc");
    }

    #[test]
    fn test_markdown_link_survives() {
        assert_eq!(
            sanitize("[Title](https://example.com/a)\nhttps://example.com/i.png"),
            "[Title](https://example.com/a)\nhttps://example.com/i.png"
        );
    }

    #[test]
    fn test_multibyte_text_preserved() {
        assert_eq!(sanitize("<em>café</em> 日本語"), "café 日本語");
    }
}
