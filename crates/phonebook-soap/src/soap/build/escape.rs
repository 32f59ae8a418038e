//! Character escaping of response text.
//!
//! Endpoints expect an ASCII-only body: markup characters become entity
//! references and every non-ASCII character a decimal character reference.

use std::borrow::Cow;

/// Escapes `text` for use as element content of an ASCII response body.
pub(crate) fn escape_ascii(text: &str) -> Cow<'_, str> {
    if text
        .chars()
        .all(|c| c.is_ascii() && !matches!(c, '&' | '<' | '>'))
    {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len() + 16);
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c if c.is_ascii() => out.push(c),
            c => out.push_str(&format!("&#{};", u32::from(c))),
        }
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_ascii_is_borrowed() {
        assert!(matches!(escape_ascii("Room 42"), Cow::Borrowed("Room 42")));
    }

    #[test]
    fn markup_and_non_ascii_are_escaped() {
        assert_eq!(
            escape_ascii("R&D <Malm\u{f6}> \"x\""),
            "R&amp;D &lt;Malm&#246;&gt; \"x\""
        );
        assert_eq!(escape_ascii("\u{1f4de}"), "&#128222;");
    }
}
