//! Small HTML helpers for Telegram messages.

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Bound `s` to roughly `max_len` characters, appending an ellipsis when cut.
pub fn truncate_text(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut out = s.chars().take(max_len).collect::<String>();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_html_handles_all_specials() {
        assert_eq!(
            escape_html(r#"<b>R19 & "R20"</b>"#),
            "&lt;b&gt;R19 &amp; &quot;R20&quot;&lt;/b&gt;"
        );
    }

    #[test]
    fn truncate_text_adds_ellipsis() {
        let s = "a".repeat(50);
        let t = truncate_text(&s, 40);
        assert!(t.ends_with("..."));
        assert_eq!(t.len(), 43);
        assert_eq!(truncate_text("short", 40), "short");
    }
}
