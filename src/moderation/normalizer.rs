/// Canonicalize text for lexicon matching.
///
/// Lowercases, maps common leet substitutions back to letters, drops every
/// remaining character outside `[a-z\s]` and collapses whitespace. Idempotent:
/// `normalize(normalize(s)) == normalize(s)`.
pub fn normalize(text: &str) -> String {
    let mapped: String = text
        .chars()
        .flat_map(|c| c.to_lowercase())
        .map(|c| match c {
            '@' | '4' => 'a',
            '3' => 'e',
            '1' | '!' => 'i',
            '0' => 'o',
            '$' | '5' => 's',
            '7' => 't',
            '8' => 'b',
            other => other,
        })
        .filter(|c| c.is_ascii_lowercase() || c.is_whitespace())
        .collect();

    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercase_and_trim() {
        assert_eq!(normalize("  Hello   World  "), "hello world");
    }

    #[test]
    fn test_leet_substitutions() {
        assert_eq!(normalize("sh1t"), "shit");
        assert_eq!(normalize("@ss"), "ass");
        assert_eq!(normalize("fvck"), "fvck");
        assert_eq!(normalize("l33t $p34k"), "leet speak");
    }

    #[test]
    fn test_strips_remaining_symbols() {
        assert_eq!(normalize("he%l^l*o, there."), "hello there");
        // Digits without a mapping disappear entirely
        assert_eq!(normalize("year 2999"), "year");
    }

    #[test]
    fn test_idempotent() {
        let samples = ["Sh1t h@ppens!", "  pl@in   TEXT  ", "f**k", "2000", ""];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", s);
        }
    }
}
