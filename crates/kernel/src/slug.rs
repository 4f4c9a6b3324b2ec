//! URL slug generation.
//!
//! Slugs are derived from display names. A slug that is already taken gets a
//! time-based suffix so that generation never has to retry.

/// Maximum slug length before the uniqueness suffix.
const MAX_SLUG_LEN: usize = 128;

/// Convert text into a URL-safe slug.
///
/// Transforms to lowercase, replaces non-alphanumeric characters with hyphens,
/// collapses consecutive hyphens, and trims leading/trailing hyphens.
pub fn slugify(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut prev_was_hyphen = true; // skip leading hyphens
    for c in text.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            result.push(c);
            prev_was_hyphen = false;
        } else if !prev_was_hyphen {
            result.push('-');
            prev_was_hyphen = true;
        }
    }

    while result.ends_with('-') {
        result.pop();
    }

    if result.len() > MAX_SLUG_LEN {
        // result is pure ASCII, any index is a char boundary
        let truncated = &result[..MAX_SLUG_LEN];
        return match truncated.rfind('-') {
            Some(last_hyphen) => truncated[..last_hyphen].to_string(),
            None => truncated.to_string(),
        };
    }

    result
}

/// Slugify `text`, falling back to `fallback` when nothing URL-safe remains.
pub fn slug_or(text: &str, fallback: &str) -> String {
    let slug = slugify(text);
    if slug.is_empty() {
        fallback.to_string()
    } else {
        slug
    }
}

/// Append a base-36 millisecond timestamp to a slug.
pub fn with_time_suffix(slug: &str, now_millis: i64) -> String {
    format!("{slug}-{}", to_base36(now_millis.unsigned_abs()))
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// Current time in milliseconds, for slug suffixes.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_basic() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("  Rust & WebAssembly!  "), "rust-webassembly");
        assert_eq!(slugify("a---b"), "a-b");
    }

    #[test]
    fn slugify_non_ascii_is_empty() {
        assert_eq!(slugify("日本語"), "");
        assert_eq!(slug_or("日本語", "tag"), "tag");
        assert_eq!(slug_or("Café au lait", "tag"), "caf-au-lait");
    }

    #[test]
    fn slugify_truncates_at_word_boundary() {
        let long = "word ".repeat(40);
        let slug = slugify(&long);
        assert!(slug.len() <= MAX_SLUG_LEN);
        assert!(!slug.ends_with('-'));
        assert!(slug.starts_with("word-word"));
    }

    #[test]
    fn time_suffix_is_base36() {
        assert_eq!(with_time_suffix("rust", 0), "rust-0");
        assert_eq!(with_time_suffix("rust", 35), "rust-z");
        assert_eq!(with_time_suffix("rust", 36), "rust-10");
    }

    #[test]
    fn different_times_give_different_slugs() {
        assert_ne!(
            with_time_suffix("post", 1_700_000_000_000),
            with_time_suffix("post", 1_700_000_000_001)
        );
    }
}
