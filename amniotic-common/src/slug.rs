//! URL-safe identifiers derived from display names

/// Convert a display name into a URL-safe identifier.
///
/// ASCII alphanumerics are lowercased and kept; every other run of characters
/// collapses into a single `-`. Leading and trailing separators are trimmed, so
/// a name with no alphanumerics at all yields an empty string.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_separator = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_simple() {
        assert_eq!(slugify("Default"), "default");
        assert_eq!(slugify("Rain and Thunder"), "rain-and-thunder");
    }

    #[test]
    fn test_slugify_collapses_and_trims() {
        assert_eq!(slugify("  Night -- Forest!! "), "night-forest");
        assert_eq!(slugify("__a__b__"), "a-b");
    }

    #[test]
    fn test_slugify_non_ascii() {
        assert_eq!(slugify("Café Ambience"), "caf-ambience");
        assert_eq!(slugify("???"), "");
    }
}
