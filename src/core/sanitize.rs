use regex_lite::Regex;
use std::sync::LazyLock;

static UNICODE_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\u[0-9A-Fa-f]{4}|\\U[0-9A-Fa-f]{8}").unwrap());
static WHITESPACE_ESCAPE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\\[ntr]").unwrap());

/// Clean a raw comment as returned by the comments API.
///
/// Escaped unicode sequences are dropped, escaped whitespace markers become
/// spaces, escaped and literal double quotes are removed, and whitespace runs
/// collapse to a single space. The result contains no backslash and no `"`,
/// which makes the function idempotent.
pub fn sanitize_comment(raw: &str) -> String {
    let text = UNICODE_ESCAPE.replace_all(raw, "");
    let text = WHITESPACE_ESCAPE.replace_all(&text, " ");
    let text = text
        .replace("\\\"", "")
        .replace("\\'", "'")
        .replace("\\$", "$")
        .replace(['\\', '"'], "");

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
