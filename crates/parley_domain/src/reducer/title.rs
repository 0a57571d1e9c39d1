use crate::CONVERSATION_TITLE_MAX_CHARS;

pub fn derive_conversation_title(text: &str) -> Option<String> {
    let line = text.lines().map(str::trim).find(|line| !line.is_empty())?;

    let mut collapsed = String::with_capacity(line.len());
    for word in line.split_whitespace() {
        if !collapsed.is_empty() {
            collapsed.push(' ');
        }
        collapsed.push_str(word);
    }

    if collapsed.chars().count() <= CONVERSATION_TITLE_MAX_CHARS {
        return Some(collapsed);
    }

    let mut truncated = collapsed
        .chars()
        .take(CONVERSATION_TITLE_MAX_CHARS.saturating_sub(1))
        .collect::<String>();
    while truncated.ends_with(' ') {
        truncated.pop();
    }
    truncated.push('…');
    Some(truncated)
}

#[cfg(test)]
mod tests {
    use super::derive_conversation_title;
    use crate::CONVERSATION_TITLE_MAX_CHARS;

    #[test]
    fn derive_conversation_title_uses_first_non_empty_line() {
        assert_eq!(
            derive_conversation_title("\n\n  fix   the\tbuild  \nsecond line"),
            Some("fix the build".to_owned())
        );
    }

    #[test]
    fn derive_conversation_title_truncates_long_text() {
        let text = "a".repeat(100);
        let title = derive_conversation_title(&text).unwrap();
        assert_eq!(title.chars().count(), CONVERSATION_TITLE_MAX_CHARS);
        assert!(title.ends_with('…'));
    }

    #[test]
    fn derive_conversation_title_counts_chars_not_bytes() {
        let text = "é".repeat(CONVERSATION_TITLE_MAX_CHARS);
        assert_eq!(derive_conversation_title(&text), Some(text.clone()));
    }

    #[test]
    fn derive_conversation_title_returns_none_for_blank_input() {
        assert_eq!(derive_conversation_title(""), None);
        assert_eq!(derive_conversation_title("   \n\t"), None);
    }
}
