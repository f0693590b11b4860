//! Identifier slugs derived from free text (institution and location names).

/// Longest identifier the host accepts for a group.
pub const MAX_IDNUMBER_LEN: usize = 100;

/// Returned for input that leaves nothing behind.
pub const EMPTY_SLUG: &str = "n-a";

/// Lowercase, ASCII-only, hyphen-joined form of `text`.
///
/// Runs of anything that is not a letter or digit become a single `-`, the
/// result is transliterated to ASCII, leftovers outside `[-A-Za-z0-9_]` are
/// dropped, and leading/trailing hyphens are trimmed.
pub fn slugify(text: &str) -> String {
    let mut hyphenated = String::with_capacity(text.len());
    let mut in_gap = false;
    for c in text.chars() {
        if c.is_alphanumeric() {
            hyphenated.push(c);
            in_gap = false;
        } else if !in_gap {
            hyphenated.push('-');
            in_gap = true;
        }
    }

    let ascii = deunicode::deunicode(&hyphenated);

    let mut slug = String::with_capacity(ascii.len());
    for c in ascii.chars() {
        if !(c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            continue;
        }
        if c == '-' && slug.ends_with('-') {
            continue;
        }
        slug.push(c.to_ascii_lowercase());
    }

    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        EMPTY_SLUG.to_string()
    } else {
        slug.to_string()
    }
}

/// Build `prefix + slugify(name) + suffix`, shortening only the slug so the
/// whole identifier fits in [`MAX_IDNUMBER_LEN`].
pub fn bounded_idnumber(prefix: &str, name: &str, suffix: &str) -> String {
    let room = MAX_IDNUMBER_LEN.saturating_sub(prefix.len() + suffix.len());
    let mut slug = slugify(name);
    // slugify output is pure ASCII, so byte truncation is char-safe.
    slug.truncate(room);
    format!("{prefix}{slug}{suffix}")
}
