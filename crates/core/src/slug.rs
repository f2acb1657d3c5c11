//! Name normalization and slug generation.
//!
//! Category, sub-category, brand, and product names all go through the same
//! pipeline: the display name is title-cased, and a URL slug is derived from
//! it. When a slug collides with an existing row, a numeric suffix is
//! appended (`blue-shirt`, `blue-shirt-1`, `blue-shirt-2`, ...). The
//! uniqueness check itself needs storage, so this module only produces the
//! candidate sequence; the repositories drive it against their tables.

/// Normalize a display name: trim, then capitalize the first letter of each
/// whitespace-separated word, lowercasing the rest.
///
/// ```
/// use mercata_core::slug::normalize_name;
///
/// assert_eq!(normalize_name("  gaming   LAPTOPS "), "Gaming   Laptops");
/// ```
#[must_use]
pub fn normalize_name(name: &str) -> String {
    let trimmed = name.trim();
    let mut out = String::with_capacity(trimmed.len());
    let mut at_word_start = true;

    for ch in trimmed.chars() {
        if ch.is_whitespace() {
            at_word_start = true;
            out.push(ch);
        } else if at_word_start {
            out.extend(ch.to_uppercase());
            at_word_start = false;
        } else {
            out.extend(ch.to_lowercase());
        }
    }

    out
}

/// Derive a URL slug: lowercase alphanumerics, runs of anything else become
/// a single hyphen, no leading or trailing hyphens.
///
/// ```
/// use mercata_core::slug::slugify;
///
/// assert_eq!(slugify("Gaming Laptops"), "gaming-laptops");
/// assert_eq!(slugify("  50% off!  "), "50-off");
/// ```
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(ch.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    out
}

/// The collision-suffix candidate sequence for a base slug: the base itself,
/// then `base-1`, `base-2`, ...
///
/// Callers take candidates until one is free in their table.
pub fn slug_candidates(base: &str) -> impl Iterator<Item = String> + '_ {
    let mut counter = 0u32;
    std::iter::from_fn(move || {
        let candidate = if counter == 0 {
            base.to_owned()
        } else {
            format!("{base}-{counter}")
        };
        counter += 1;
        Some(candidate)
    })
}

/// Derive a slug for `name` that is free according to `exists`, walking the
/// collision-suffix sequence until a candidate is unused.
///
/// Generic over the lookup's error type so each repository can plug in its
/// own existence query.
///
/// # Errors
///
/// Propagates the first error returned by `exists`.
pub async fn unique_slug<F, Fut, E>(name: &str, mut exists: F) -> Result<String, E>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    let base = slugify(name);
    for candidate in slug_candidates(&base) {
        if !exists(candidate.clone()).await? {
            return Ok(candidate);
        }
    }
    // The candidate sequence never ends.
    Ok(base)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name_title_cases_words() {
        assert_eq!(normalize_name("electronics"), "Electronics");
        assert_eq!(normalize_name("home AND garden"), "Home And Garden");
        assert_eq!(normalize_name("  spaced  out  "), "Spaced  Out");
    }

    #[test]
    fn test_normalize_name_handles_empty() {
        assert_eq!(normalize_name(""), "");
        assert_eq!(normalize_name("   "), "");
    }

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Gaming Laptops"), "gaming-laptops");
        assert_eq!(slugify("Tea & Coffee"), "tea-coffee");
        assert_eq!(slugify("--Weird--Input--"), "weird-input");
    }

    #[test]
    fn test_slugify_collapses_runs() {
        assert_eq!(slugify("a   b///c"), "a-b-c");
    }

    #[test]
    fn test_slug_candidates_sequence() {
        let mut candidates = slug_candidates("shirt");
        assert_eq!(candidates.next().unwrap(), "shirt");
        assert_eq!(candidates.next().unwrap(), "shirt-1");
        assert_eq!(candidates.next().unwrap(), "shirt-2");
    }

    #[test]
    fn test_collision_loop_against_taken_set() {
        let taken: std::collections::HashSet<&str> =
            ["shirt", "shirt-1"].into_iter().collect();
        let free = slug_candidates("shirt")
            .find(|c| !taken.contains(c.as_str()))
            .unwrap();
        assert_eq!(free, "shirt-2");
    }
}
