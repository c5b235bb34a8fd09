//! Data-stream envelope expected by the terminal UI
//!
//! Every unit is `<code>:<json>\n`. Code `0` carries text, code `3` an error.

use std::borrow::Cow;

pub fn text_part(text: &str) -> String {
    format!("0:{}\n", serde_json::Value::from(text))
}

pub fn error_part(message: &str) -> String {
    format!("3:{}\n", serde_json::Value::from(message))
}

/// Prefix `chunk` with `label` unless it already opens with a bracketed tag
pub fn label_chunk<'a>(chunk: &'a str, label: &str) -> Cow<'a, str> {
    if label.is_empty() || chunk.starts_with('[') {
        Cow::Borrowed(chunk)
    } else {
        Cow::Owned(format!("{label} {chunk}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_part_escapes() {
        assert_eq!(text_part("Hello"), "0:\"Hello\"\n");
        assert_eq!(text_part("line\n\"quoted\""), "0:\"line\\n\\\"quoted\\\"\"\n");
    }

    #[test]
    fn test_error_part() {
        assert_eq!(error_part("quota exceeded"), "3:\"quota exceeded\"\n");
    }

    #[test]
    fn test_label_chunk() {
        assert_eq!(label_chunk("Hello", "[ARI]"), "[ARI] Hello");
        assert_eq!(label_chunk("[WARN] core unstable", "[ARI]"), "[WARN] core unstable");
        assert_eq!(label_chunk("Hello", ""), "Hello");
    }
}
