use lexdb_core::config::KeywordMatch;
use lexdb_core::traits::Scorer;
use lexdb_core::types::{IndexEntry, Strategy};

/// Scores chunks by how often the query's terms occur in them.
///
/// The query is lowercased and split on whitespace; each term's occurrences
/// in the lowercased chunk text are counted and summed over terms. Repeated
/// query terms count once per repetition.
#[derive(Debug, Clone)]
pub struct KeywordScorer {
    terms: Vec<String>,
    mode: KeywordMatch,
}

impl KeywordScorer {
    pub fn new(query: &str, mode: KeywordMatch) -> Self {
        let terms = query.to_lowercase().split_whitespace().map(str::to_string).collect();
        Self { terms, mode }
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn score_text(&self, text: &str) -> usize {
        let haystack = text.to_lowercase();
        self.terms
            .iter()
            .map(|term| match self.mode {
                KeywordMatch::Substring => count_occurrences(&haystack, term),
                KeywordMatch::Word => count_word_occurrences(&haystack, term),
            })
            .sum()
    }
}

impl Scorer for KeywordScorer {
    fn strategy(&self) -> Strategy {
        Strategy::Keyword
    }

    #[allow(clippy::cast_precision_loss)]
    fn score(&self, entry: &IndexEntry) -> anyhow::Result<f64> {
        Ok(self.score_text(&entry.chunk.text) as f64)
    }

    fn is_relevant(&self, score: f64) -> bool {
        score > 0.0
    }
}

/// Counts possibly overlapping occurrences of `needle` ("aa" occurs 3 times in "aaaa").
pub fn count_occurrences(haystack: &str, needle: &str) -> usize {
    match_starts(haystack, needle).count()
}

/// Like [`count_occurrences`], but only counts matches not embedded in a
/// longer alphanumeric run ("act" does not match inside "contract").
pub fn count_word_occurrences(haystack: &str, needle: &str) -> usize {
    match_starts(haystack, needle)
        .filter(|&at| {
            let before = haystack[..at].chars().next_back();
            let after = haystack[at + needle.len()..].chars().next();
            !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
        })
        .count()
}

fn match_starts<'a>(haystack: &'a str, needle: &'a str) -> impl Iterator<Item = usize> + 'a {
    let step = needle.chars().next().map_or(0, char::len_utf8);
    let mut from = 0;
    std::iter::from_fn(move || {
        if step == 0 || from > haystack.len() {
            return None;
        }
        let at = from + haystack[from..].find(needle)?;
        from = at + step;
        Some(at)
    })
}
