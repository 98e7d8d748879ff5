//! Valence-lexicon sentiment back-end.
//!
//! A compact lexicon scorer in the spirit of VADER: sum the valence of known
//! words, flip under nearby negation, amplify or dampen under boosters, then
//! normalize the total into [-1, 1].

use super::{BackendScore, SentimentBackend, SentimentError};

/// (word, valence) pairs on a roughly [-4, 4] scale.
const VALENCES: &[(&str, f64)] = &[
    ("amazing", 3.0),
    ("awesome", 3.1),
    ("awful", -2.9),
    ("bad", -2.5),
    ("best", 3.2),
    ("bland", -1.8),
    ("broken", -2.2),
    ("clean", 1.7),
    ("cold", -1.2),
    ("delicious", 3.0),
    ("delightful", 2.8),
    ("dirty", -2.4),
    ("disappointing", -2.4),
    ("disgusting", -3.3),
    ("excellent", 3.2),
    ("fantastic", 3.1),
    ("fast", 1.5),
    ("favorite", 2.2),
    ("friendly", 2.2),
    ("fresh", 2.0),
    ("good", 1.9),
    ("great", 2.7),
    ("happy", 2.4),
    ("helpful", 1.9),
    ("horrible", -3.1),
    ("late", -1.5),
    ("love", 3.0),
    ("loved", 3.0),
    ("mediocre", -1.4),
    ("nice", 1.8),
    ("perfect", 3.2),
    ("pleasant", 2.0),
    ("poor", -2.1),
    ("problem", -1.6),
    ("quick", 1.4),
    ("recommend", 2.0),
    ("rude", -2.6),
    ("slow", -1.3),
    ("spoiled", -2.8),
    ("stale", -2.2),
    ("tasty", 2.4),
    ("terrible", -3.0),
    ("unhappy", -2.3),
    ("worst", -3.3),
    ("wrong", -1.9),
];

const NEGATORS: &[&str] = &[
    "not", "no", "never", "hardly", "barely", "isnt", "wasnt", "dont", "doesnt", "didnt", "cant",
    "wont", "couldnt", "without",
];

/// Boosters scale the valence of the word that follows.
const BOOSTERS: &[(&str, f64)] = &[
    ("very", 1.3),
    ("really", 1.3),
    ("extremely", 1.5),
    ("absolutely", 1.4),
    ("so", 1.2),
    ("slightly", 0.6),
    ("somewhat", 0.7),
];

/// Tokens a negator may look back across before giving up.
const NEGATION_WINDOW: usize = 2;

/// Normalization constant; larger values flatten the curve.
const NORMALIZATION_ALPHA: f64 = 15.0;

#[derive(Debug, Default, Clone, Copy)]
pub struct LexiconBackend;

impl LexiconBackend {
    pub fn new() -> Self {
        Self
    }

    fn score(&self, text: &str) -> f64 {
        let tokens = tokenize(text);
        let mut total = 0.0;

        for (index, token) in tokens.iter().enumerate() {
            let Some(mut valence) = lookup(VALENCES, token) else {
                continue;
            };

            let window = &tokens[index.saturating_sub(NEGATION_WINDOW)..index];
            if let Some(previous) = window.last() {
                if let Some(boost) = lookup(BOOSTERS, previous) {
                    valence *= boost;
                }
            }
            if window.iter().any(|earlier| NEGATORS.contains(&earlier.as_str())) {
                valence = -valence * 0.74;
            }

            total += valence;
        }

        total / (total * total + NORMALIZATION_ALPHA).sqrt()
    }
}

fn lookup(table: &[(&str, f64)], token: &str) -> Option<f64> {
    table
        .iter()
        .find(|(word, _)| *word == token)
        .map(|(_, value)| *value)
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_lowercase())
        .collect()
}

impl SentimentBackend for LexiconBackend {
    fn name(&self) -> &str {
        "lexicon"
    }

    fn analyze_text(&self, text: &str) -> Result<BackendScore, SentimentError> {
        Ok(BackendScore {
            polarity: self.score(text),
            confidence: None,
            label: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn favorable_text_scores_positive() {
        let backend = LexiconBackend::new();
        let score = backend
            .analyze_text("the chicken was fresh and delicious, staff very friendly")
            .expect("lexicon never fails");
        assert!(score.polarity > 0.3, "got {}", score.polarity);
        assert!(score.polarity <= 1.0);
    }

    #[test]
    fn unfavorable_text_scores_negative() {
        let backend = LexiconBackend::new();
        let score = backend
            .analyze_text("terrible service, the food was cold and stale")
            .expect("lexicon never fails");
        assert!(score.polarity < -0.3, "got {}", score.polarity);
        assert!(score.polarity >= -1.0);
    }

    #[test]
    fn negation_flips_valence() {
        let backend = LexiconBackend::new();
        let plain = backend.analyze_text("the food was good").expect("ok");
        let negated = backend.analyze_text("the food was not good").expect("ok");
        assert!(plain.polarity > 0.0);
        assert!(negated.polarity < 0.0);
    }

    #[test]
    fn unknown_words_score_zero() {
        let backend = LexiconBackend::new();
        let score = backend.analyze_text("lorem ipsum dolor sit amet").expect("ok");
        assert_eq!(score.polarity, 0.0);
    }
}
