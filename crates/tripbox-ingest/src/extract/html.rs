//! Reduce an email body to plain text the oracle can read cheaply.

use std::sync::LazyLock;

use regex::Regex;

/// Hard cap on the text handed to the oracle, in characters.
pub const MAX_TEXT_CHARS: usize = 15_000;

static COMMENTS: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("invalid regex"));
static SCRIPT_STYLE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>|<head\b.*?</head\s*>")
    .expect("invalid regex")
});
static TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("invalid regex"));
static NUMERIC_ENTITY: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").expect("invalid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("invalid regex"));

const NAMED_ENTITIES: &[(&str, &str)] = &[
  ("&nbsp;", " "),
  ("&lt;", "<"),
  ("&gt;", ">"),
  ("&quot;", "\""),
  ("&apos;", "'"),
  ("&ndash;", "–"),
  ("&mdash;", "—"),
  ("&euro;", "€"),
  ("&pound;", "£"),
  ("&copy;", "©"),
  // Must come last so that "&amp;lt;" decodes to "&lt;" and not "<".
  ("&amp;", "&"),
];

/// Strip markup from an HTML body, decode entities, collapse whitespace and
/// truncate.
pub fn clean_html(html: &str) -> String {
  let text = COMMENTS.replace_all(html, " ");
  let text = SCRIPT_STYLE.replace_all(&text, " ");
  let text = TAGS.replace_all(&text, " ");
  let text = decode_entities(&text);
  clean_text(&text)
}

/// Collapse whitespace and truncate a plain-text body.
pub fn clean_text(text: &str) -> String {
  let collapsed = WHITESPACE.replace_all(text.trim(), " ");
  truncate_chars(&collapsed, MAX_TEXT_CHARS).to_owned()
}

fn decode_entities(text: &str) -> String {
  let decoded = NUMERIC_ENTITY.replace_all(text, |caps: &regex::Captures<'_>| {
    let raw = &caps[1];
    let code = match raw.strip_prefix('x').or_else(|| raw.strip_prefix('X')) {
      Some(hex) => u32::from_str_radix(hex, 16).ok(),
      None => raw.parse().ok(),
    };
    code.and_then(char::from_u32).map(String::from).unwrap_or_default()
  });

  NAMED_ENTITIES
    .iter()
    .fold(decoded.into_owned(), |acc, (entity, replacement)| acc.replace(entity, replacement))
}

fn truncate_chars(s: &str, max: usize) -> &str {
  match s.char_indices().nth(max) {
    Some((idx, _)) => &s[..idx],
    None => s,
  }
}
