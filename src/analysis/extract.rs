//! Removal of incidental Markdown code fences around a reply

const FENCE: &str = "```";

fn is_language_tag(line: &str) -> bool {
    line.trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Strip Markdown code fences and surrounding whitespace.
///
/// Text that already starts with `{` is only trimmed. Otherwise the content
/// of the first fenced block is returned, with an optional language tag
/// (```` ```json ````) dropped; an unterminated fence runs to the end of the
/// text. Applying this twice gives the same result as applying it once.
pub fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    if trimmed.starts_with('{') {
        return trimmed;
    }

    let Some(start) = trimmed.find(FENCE) else {
        return trimmed;
    };
    let after = &trimmed[start + FENCE.len()..];

    let body = match after.split_once('\n') {
        Some((tag, rest)) if is_language_tag(tag) => rest,
        _ => after.strip_prefix("json").unwrap_or(after),
    };

    match body.find(FENCE) {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_clean_input_is_untouched() {
        let raw = "  {\"headline\": \"ok\"}\n";
        assert_eq!(strip_fences(raw), "{\"headline\": \"ok\"}");
    }

    #[test]
    fn test_json_fence() {
        let raw = "```json\n{\"a\": 1}\n```";
        assert_eq!(strip_fences(raw), "{\"a\": 1}");
    }

    #[test]
    fn test_bare_fence() {
        let raw = "```\n{\"a\": 1}\n```\n";
        assert_eq!(strip_fences(raw), "{\"a\": 1}");
    }

    #[test]
    fn test_fence_after_prose() {
        let raw = "Here is the report:\n\n```json\n{\"a\": 1}\n```\nLet me know if you need more.";
        assert_eq!(strip_fences(raw), "{\"a\": 1}");
    }

    #[test]
    fn test_inline_and_unterminated_fences() {
        assert_eq!(strip_fences("```json{\"a\": 1}```"), "{\"a\": 1}");
        assert_eq!(strip_fences("```json\n{\"a\": 1}"), "{\"a\": 1}");
    }

    #[test]
    fn test_uppercase_language_tag() {
        assert_eq!(strip_fences("```JSON\n{\"a\": 1}\n```"), "{\"a\": 1}");
    }

    #[test]
    fn test_non_json_passes_through_trimmed() {
        assert_eq!(strip_fences("  I cannot help with that.  "), "I cannot help with that.");
    }

    proptest! {
        #[test]
        fn prop_strip_is_idempotent(text in "[ a-z{}\":,\n`]{0,64}") {
            let once = strip_fences(&text);
            prop_assert_eq!(strip_fences(once), once);
        }
    }
}
