/// Drops every non-ASCII character and trims surrounding whitespace,
/// including the ASCII file/group/record/unit separators.
///
/// Recognizers occasionally emit stray glyphs next to digits; nothing beyond
/// that is normalized here.
pub fn sanitize(text: &str) -> String {
    let ascii = text.chars().filter(char::is_ascii).collect::<String>();
    ascii.trim_matches(is_space).to_string()
}

fn is_space(c: char) -> bool {
    c.is_whitespace() || ('\u{1c}'..='\u{1f}').contains(&c)
}

#[cfg(test)]
mod tests {
    use super::sanitize;

    #[test]
    fn strips_non_ascii() {
        assert_eq!(sanitize("12:3é"), "12:3");
        assert_eq!(sanitize("５9"), "9");
    }

    #[test]
    fn trims_whitespace() {
        assert_eq!(sanitize("  07\t\n"), "07");
        assert_eq!(sanitize(" é 4 "), "4");
    }

    #[test]
    fn trims_ascii_separators() {
        assert_eq!(sanitize("\u{1f}5"), "5");
        assert_eq!(sanitize("\u{1c}\u{1d} 12\u{1e}"), "12");
        assert_eq!(sanitize("1\u{1f}2"), "1\u{1f}2");
    }

    #[test]
    fn empty_stays_empty() {
        assert_eq!(sanitize(""), "");
        assert_eq!(sanitize("ééé"), "");
    }

    #[test]
    fn output_is_ascii_trimmed_and_idempotent() {
        let samples = [
            "", " ", "12", " 1 2 ", "é1", "1é ", "\u{a0}3\u{a0}", "°59'", "日本 42 ", "\t\r\n",
            "a\u{2003}b", "\u{1f}7\u{1c}",
        ];
        for s in samples {
            let once = sanitize(s);
            assert!(once.chars().all(|c| (c as u32) < 128), "{s:?}");
            assert_eq!(once, once.trim_matches(super::is_space), "{s:?}");
            assert_eq!(sanitize(&once), once, "{s:?}");
        }
    }
}
