use regex::Regex;
use std::sync::LazyLock;

static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s<>"'`]+"#).expect("valid URL regex"));

/// Extracts http(s) URLs from free text, in order of appearance.
///
/// Trailing sentence punctuation and unbalanced closing brackets are not
/// considered part of the URL.
pub fn extract_urls(text: &str) -> Vec<String> {
    URL_PATTERN
        .find_iter(text)
        .map(|m| trim_trailing(m.as_str()).to_string())
        .filter(|url| url.split_once("://").is_some_and(|(_, rest)| !rest.is_empty()))
        .collect()
}

fn trim_trailing(url: &str) -> &str {
    let mut url = url;
    loop {
        let Some(last) = url.chars().last() else {
            return url;
        };
        let unbalanced = match last {
            ')' => url.matches('(').count() < url.matches(')').count(),
            ']' => url.matches('[').count() < url.matches(']').count(),
            '.' | ',' | ';' | ':' | '!' | '?' => true,
            _ => false,
        };
        if !unbalanced {
            return url;
        }
        url = &url[..url.len() - last.len_utf8()];
    }
}
