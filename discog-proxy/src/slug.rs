//! Title to URL slug conversion.

/// Lowercase `title`, collapse every run of characters outside `[a-z0-9]`
/// into a single `-`, and trim hyphens from both ends.
///
/// `encode(encode(x)) == encode(x)` for every input.
pub fn encode(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for c in title.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

/// Split a camelCase tag into space-separated words.
///
/// `whereIsTheMoodRobot` becomes `where Is The Mood Robot`. Runs of capitals
/// stay together until the last capital that starts a new word, so `DJSet`
/// becomes `DJ Set`.
pub fn humanize_tag(tag: &str) -> String {
    let chars: Vec<char> = tag.trim().chars().collect();
    let mut out = String::with_capacity(chars.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if i > 0 && c.is_uppercase() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let starts_word = prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower);
            if starts_word && !out.ends_with(' ') {
                out.push(' ');
            }
        }
        out.push(c);
    }

    out
}
