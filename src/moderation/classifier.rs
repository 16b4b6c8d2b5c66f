use regex::Regex;

use super::normalizer::normalize;

/// Disallowed terms and phrases. Matching happens on normalized text, so
/// entries are plain lowercase words; multi-word phrases are matched as their
/// literal normalized sequence.
pub const LEXICON: &[&str] = &[
    // Profanity (strong language)
    "shit",
    "fuck",
    "bitch",
    "bastard",
    "piss",
    "cock",
    "dick",
    "pussy",
    "cunt",
    "twat",
    "bollocks",
    "wanker",
    "asshole",
    "motherfucker",
    "fuckface",
    "shithead",
    "dickhead",
    "dumbass",
    "jackass",
    "bullshit",
    "horseshit",
    "bitchass",
    "dipshit",
    "shitty",
    "fucking",
    "fucked",
    "fucker",
    "fucks",
    "arse",
    "arsehole",
    "son of a bitch",
    "piece of shit",
    "full of shit",
    "eat shit",
    "holy shit",
    // Slurs and hate speech (racial/ethnic)
    "nigger",
    "nigga",
    "chink",
    "gook",
    "spic",
    "kike",
    "wetback",
    "beaner",
    "towelhead",
    "raghead",
    "cracker",
    "honky",
    "paki",
    "jap",
    "injun",
    // Sexual/inappropriate
    "porn",
    "hentai",
    "rape",
    "whore",
    "slut",
    "hoe",
    "milf",
    "dildo",
    "boobs",
    "tits",
    "titties",
    "penis",
    "vagina",
    // Homophobic/transphobic
    "fag",
    "faggot",
    "dyke",
    "tranny",
    "shemale",
    // Ableist
    "retard",
    "retarded",
    "downy",
    "spaz",
    "cripple",
    "midget",
    // Other offensive or harmful
    "nazi",
    "hitler",
    "pedo",
    "pedophile",
    "kill yourself",
    "kys",
    "nsfw",
];

/// Recall/precision tradeoff for the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClassifierMode {
    /// Whole-word matching on normalized text only. Deliberately does not
    /// catch per-character self-censoring like `f**k`.
    #[default]
    Standard,
    /// Additionally tries per-letter symbol substitutions when the raw text
    /// contains non-alphabetic characters. Higher recall, materially higher
    /// false-positive risk.
    Strict,
}

/// Decides whether a message body violates content policy.
pub struct ViolationClassifier {
    mode: ClassifierMode,
    word_patterns: Vec<Regex>,
    fuzzy_patterns: Vec<Regex>,
}

// Symbols a letter may be swapped for in strict mode.
const FUZZY_SYMBOLS: &str = r"\*#@\$%&!\?\+";

impl ViolationClassifier {
    pub fn new(mode: ClassifierMode) -> Self {
        let word_patterns = LEXICON
            .iter()
            .filter_map(|entry| {
                let canonical = normalize(entry);
                if canonical.is_empty() {
                    return None;
                }
                Regex::new(&format!(r"\b{}\b", regex::escape(&canonical))).ok()
            })
            .collect();

        let fuzzy_patterns = if mode == ClassifierMode::Strict {
            LEXICON
                .iter()
                .filter(|entry| entry.len() >= 3 && !entry.contains(' '))
                .filter_map(|entry| Regex::new(&fuzzy_pattern(entry)).ok())
                .collect()
        } else {
            Vec::new()
        };

        Self {
            mode,
            word_patterns,
            fuzzy_patterns,
        }
    }

    /// True if the text contains a lexicon entry as a whole word after
    /// normalization (or, in strict mode, as a one-off symbol substitution).
    pub fn is_violation(&self, text: &str) -> bool {
        let canonical = normalize(text);
        if self
            .word_patterns
            .iter()
            .any(|pattern| pattern.is_match(&canonical))
        {
            return true;
        }

        if self.mode == ClassifierMode::Strict
            && text.chars().any(|c| !c.is_alphabetic() && !c.is_whitespace())
        {
            let lowered = text.to_lowercase();
            return self
                .fuzzy_patterns
                .iter()
                .any(|pattern| pattern.is_match(&lowered));
        }

        false
    }
}

/// Per-letter fuzzy pattern: first and last letters stay literal (keeps `\b`
/// meaningful), interior letters may each be one symbol instead.
fn fuzzy_pattern(word: &str) -> String {
    let chars: Vec<char> = word.chars().collect();
    let mut pattern = String::from(r"\b");
    for (i, c) in chars.iter().enumerate() {
        if i == 0 || i == chars.len() - 1 {
            pattern.push_str(&regex::escape(&c.to_string()));
        } else {
            pattern.push_str(&format!("[{}{}]", regex::escape(&c.to_string()), FUZZY_SYMBOLS));
        }
    }
    pattern.push_str(r"\b");
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standard() -> ViolationClassifier {
        ViolationClassifier::new(ClassifierMode::Standard)
    }

    #[test]
    fn test_detects_every_lexicon_entry() {
        let classifier = standard();
        for word in LEXICON {
            assert!(
                classifier.is_violation(&format!("you are a {}", word)),
                "missed lexicon entry {:?}",
                word
            );
        }
    }

    #[test]
    fn test_no_substring_leaks() {
        let classifier = standard();
        // "ass"/"arse" style entries must not fire inside longer words
        assert!(!classifier.is_violation("classic"));
        assert!(!classifier.is_violation("my assistant passed the class"));
        assert!(!classifier.is_violation("scraper"));
        assert!(!classifier.is_violation("a normal message about the year 2000"));
    }

    #[test]
    fn test_leet_equivalence() {
        let classifier = standard();
        assert!(classifier.is_violation("sh1t"));
        assert!(classifier.is_violation("@sshole"));
        assert_eq!(
            classifier.is_violation("sh1t"),
            classifier.is_violation("shit")
        );
        // Normalized forms outside the lexicon stay clean either way
        assert_eq!(classifier.is_violation("@ss"), classifier.is_violation("ass"));
        assert!(classifier.is_violation("$lut"));
    }

    #[test]
    fn test_multi_word_phrases() {
        let classifier = standard();
        assert!(classifier.is_violation("you are full of shit, mate"));
        assert!(classifier.is_violation("kill yourself"));
        assert!(!classifier.is_violation("kill the process yourself"));
    }

    #[test]
    fn test_standard_mode_skips_self_censoring() {
        let classifier = standard();
        assert!(!classifier.is_violation("f**k"));
    }

    #[test]
    fn test_strict_mode_catches_symbol_substitutions() {
        let classifier = ViolationClassifier::new(ClassifierMode::Strict);
        assert!(classifier.is_violation("f**k"));
        assert!(classifier.is_violation("sh*t happens"));
        // Plain text must not trigger the fuzzy pass
        assert!(!classifier.is_violation("fork"));
    }
}
