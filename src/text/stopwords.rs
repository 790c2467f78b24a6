//! English stop words excluded from every TF-IDF vocabulary.
//!
//! The list is the common core of the NLTK and scikit-learn English lists,
//! grouped by category. Food and ambiance vocabulary ("light", "fresh", "hot")
//! is deliberately absent.

use std::collections::HashSet;

/// Case-insensitive stop word set.
#[derive(Debug, Clone)]
pub struct StopWordsFilter {
    stop_words: HashSet<String>,
}

impl StopWordsFilter {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let stop_words = words
            .into_iter()
            .map(|s| s.as_ref().to_lowercase())
            .collect();

        Self { stop_words }
    }

    #[must_use]
    pub fn english() -> Self {
        Self::new(ENGLISH_STOP_WORDS)
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(&word.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.stop_words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stop_words.is_empty()
    }
}

impl Default for StopWordsFilter {
    fn default() -> Self {
        Self::english()
    }
}

const ENGLISH_STOP_WORDS: &[&str] = &[
    // Articles and determiners
    "a", "an", "the", "this", "that", "these", "those", "each", "every", "either",
    "neither", "some", "any", "all", "both", "few", "more", "most", "other",
    "another", "such", "no", "nor", "not", "only", "own", "same", "several",
    // Pronouns
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "your",
    "yours", "yourself", "yourselves", "he", "him", "his", "himself", "she", "her",
    "hers", "herself", "it", "its", "itself", "they", "them", "their", "theirs",
    "themselves", "what", "which", "who", "whom", "whose", "whoever", "whatever",
    "anyone", "anything", "everyone", "everything", "someone", "something",
    "nobody", "nothing", "none",
    // Auxiliaries and common verbs
    "am", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had",
    "having", "do", "does", "did", "doing", "done", "can", "could", "will",
    "would", "shall", "should", "may", "might", "must", "get", "got", "go",
    "goes", "make", "made", "put", "see", "seem", "seemed", "seems", "become",
    "becomes", "keep", "give",
    // Prepositions
    "about", "above", "across", "after", "against", "along", "among", "around",
    "at", "before", "behind", "below", "beneath", "beside", "besides", "between",
    "beyond", "by", "down", "during", "except", "for", "from", "in", "inside",
    "into", "near", "of", "off", "on", "onto", "out", "outside", "over", "per",
    "since", "through", "throughout", "to", "toward", "towards", "under", "until",
    "up", "upon", "via", "with", "within", "without",
    // Conjunctions
    "and", "but", "or", "so", "yet", "if", "because", "although", "though",
    "unless", "whereas", "whether", "while", "as", "than", "then", "thus",
    "therefore", "hence", "however", "moreover", "otherwise",
    // Adverbs
    "again", "also", "already", "always", "anyway", "anywhere", "else",
    "elsewhere", "enough", "ever", "everywhere", "further", "here", "how",
    "indeed", "just", "less", "much", "never", "nevertheless", "now", "often",
    "once", "perhaps", "quite", "rather", "really", "still", "there", "too",
    "very", "well", "when", "whence", "where", "wherever", "why", "sometime",
    "sometimes", "somewhere",
    // Contractions without apostrophes
    "don", "doesn", "didn", "isn", "aren", "wasn", "weren", "hasn", "haven",
    "hadn", "won", "wouldn", "shouldn", "couldn", "ll", "re", "ve",
];
