//! Content keys for grouping values by their display title.

use deunicode::deunicode;

/// Maximum length, in characters, of a content key.
pub const CONTENT_KEY_LEN: usize = 40;

/// Lower-cased, URL-safe slug of `title`, truncated to [`CONTENT_KEY_LEN`].
///
/// The title is transliterated to ASCII first (`"Éco"` → `"eco"`,
/// `"Κόκκινο"` → `"kokkino"`), then every run of non-alphanumeric characters
/// becomes a single `-` and leading/trailing dashes are dropped before
/// truncation. Distinct titles may share a key.
pub fn content_key(title: &str) -> String {
  let mut slug = String::with_capacity(title.len());
  let mut last_dash = true;

  for ch in deunicode(title).chars() {
    if ch.is_ascii_alphanumeric() {
      slug.push(ch.to_ascii_lowercase());
      last_dash = false;
    } else if !last_dash {
      slug.push('-');
      last_dash = true;
    }
  }

  let trimmed = slug.trim_end_matches('-');
  trimmed.chars().take(CONTENT_KEY_LEN).collect()
}
