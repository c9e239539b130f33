//! Terminal control sequence stripping.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

/// 7-bit C1 escapes and CSI sequences (colours, cursor movement).
static CONTROL_SEQUENCE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\x1B(?:[@-Z\\-_]|\[[0-?]*[ -/]*[@-~])").ok());

/// Remove terminal control sequences from captured tool output.
#[must_use]
pub fn strip_control_sequences(text: &str) -> Cow<'_, str> {
    match CONTROL_SEQUENCE.as_ref() {
        Some(pattern) => pattern.replace_all(text, ""),
        None => Cow::Borrowed(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("\x1b[0m\x1b[1m\x1b[32mApply complete!\x1b[0m", "Apply complete!")]
    #[case("\x1b[31mError:\x1b[0m quota", "Error: quota")]
    #[case("\x1b[2K\x1b[1Gline", "line")]
    #[case("\x1bMreverse", "reverse")]
    #[case("plain text\nsecond line", "plain text\nsecond line")]
    fn strips_sequences(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(strip_control_sequences(input), expected);
    }

    #[test]
    fn plain_text_is_borrowed() {
        assert!(matches!(
            strip_control_sequences("nothing to do"),
            Cow::Borrowed(_)
        ));
    }
}
