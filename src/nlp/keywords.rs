// Keyword extraction with YAKE scoring.
//
// YAKE is unsupervised and works on a single document: every term gets a weight from casing,
// position, frequency, context relatedness and sentence spread, and candidate phrases of up to
// `ngram_size` words combine the weights of their terms. Lower scores are more relevant.
use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use super::chunking::split_sentences;
use crate::error::{DigestError, Result};

/// Co-occurrence window, in words.
const WINDOW: usize = 1;

static TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\p{L}\p{N}]+(?:['’.\-][\p{L}\p{N}]+)*|[^\s\p{L}\p{N}]").unwrap()
});

static PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").unwrap());

static ENGLISH_STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "about", "above", "across", "after", "afterwards", "again", "against", "all",
        "almost", "alone", "along", "already", "also", "although", "always", "am", "among",
        "an", "and", "another", "any", "anyhow", "anyone", "anything", "anyway", "anywhere",
        "are", "around", "as", "at", "be", "became", "because", "become", "becomes", "been",
        "before", "behind", "being", "below", "beside", "besides", "between", "beyond", "both",
        "but", "by", "can", "cannot", "could", "did", "do", "does", "doing", "done", "down",
        "due", "during", "each", "either", "else", "elsewhere", "enough", "etc", "even",
        "ever", "every", "everyone", "everything", "everywhere", "except", "few", "for",
        "former", "from", "further", "had", "has", "have", "having", "he", "hence", "her",
        "here", "hers", "herself", "him", "himself", "his", "how", "however", "i", "if", "in",
        "indeed", "into", "is", "it", "its", "itself", "just", "last", "latter", "least",
        "less", "many", "may", "me", "meanwhile", "might", "more", "moreover", "most",
        "mostly", "much", "must", "my", "myself", "neither", "never", "nevertheless", "next",
        "no", "nobody", "none", "nor", "not", "nothing", "now", "nowhere", "of", "off",
        "often", "on", "once", "one", "only", "onto", "or", "other", "others", "otherwise",
        "our", "ours", "ourselves", "out", "over", "own", "per", "perhaps", "quite", "rather",
        "really", "same", "see", "seem", "seemed", "seems", "several", "she", "should",
        "since", "so", "some", "somehow", "someone", "something", "sometimes", "somewhere",
        "still", "such", "than", "that", "the", "their", "theirs", "them", "themselves",
        "then", "thence", "there", "thereafter", "thereby", "therefore", "therein", "these",
        "they", "this", "those", "though", "through", "throughout", "thus", "to", "together",
        "too", "toward", "towards", "under", "until", "up", "upon", "us", "very", "via", "was",
        "we", "well", "were", "what", "whatever", "when", "whence", "whenever", "where",
        "whereas", "whereby", "wherein", "whether", "which", "while", "who", "whoever",
        "whole", "whom", "whose", "why", "will", "with", "within", "without", "would", "yet",
        "you", "your", "yours", "yourself", "yourselves",
    ]
    .iter()
    .copied()
    .collect()
});

fn stopwords_for(language: &str) -> Option<&'static HashSet<&'static str>> {
    match language.to_lowercase().as_str() {
        "en" | "english" => Some(&*ENGLISH_STOPWORDS),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Keyword {
    pub phrase: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeywordSettings {
    pub language: String,
    pub ngram_size: usize,
    pub dedup_threshold: f64,
}

impl Default for KeywordSettings {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            ngram_size: 3,
            dedup_threshold: 0.9,
        }
    }
}

pub struct KeywordExtractor {
    settings: KeywordSettings,
}

impl KeywordExtractor {
    pub fn new(settings: KeywordSettings) -> Self {
        Self { settings }
    }

    /// Up to `max_keywords` phrases, most relevant (lowest score) first.
    ///
    /// Empty text yields no keywords. A language without a stopword list is an error.
    pub fn extract(&self, text: &str, max_keywords: usize) -> Result<Vec<Keyword>> {
        if max_keywords == 0 || text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let stopwords = stopwords_for(&self.settings.language).ok_or_else(|| {
            DigestError::KeywordExtraction(format!(
                "no stopword list for language '{}'",
                self.settings.language
            ))
        })?;

        let mut model = TextModel::build(text, stopwords, self.settings.ngram_size.max(1));
        if !model.score_terms() {
            return Ok(Vec::new());
        }

        let mut ranked: Vec<(f64, &Candidate)> = model
            .candidates
            .iter()
            .filter(|c| model.is_valid(c))
            .map(|c| (model.candidate_score(c), c))
            .collect();
        // stable sort keeps first-seen order on ties
        ranked.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        debug!(candidates = ranked.len(), "Scored keyword candidates");

        let mut selected: Vec<(&Candidate, f64)> = Vec::with_capacity(max_keywords);
        for (score, candidate) in ranked {
            let duplicate = selected
                .iter()
                .any(|(kept, _)| similarity(&kept.key, &candidate.key) >= self.settings.dedup_threshold);
            if duplicate {
                continue;
            }
            selected.push((candidate, score));
            if selected.len() == max_keywords {
                break;
            }
        }

        Ok(selected
            .into_iter()
            .map(|(candidate, score)| Keyword {
                phrase: candidate.surface.clone(),
                score,
            })
            .collect())
    }
}

/// Similarity ratio in `[0, 1]`: twice the longest common subsequence over the total length.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    let mut prev = vec![0usize; b.len() + 1];
    let mut row = vec![0usize; b.len() + 1];
    for ca in &a {
        for (j, cb) in b.iter().enumerate() {
            row[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                row[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut row);
    }
    2.0 * prev[b.len()] as f64 / total as f64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Digit,
    Unusual,
    Acronym,
    Proper,
    Plain,
}

impl Tag {
    fn excluded(self) -> bool {
        matches!(self, Tag::Digit | Tag::Unusual)
    }
}

fn tag_word(word: &str, position: usize) -> Tag {
    if word.replace(',', "").parse::<f64>().is_ok() {
        return Tag::Digit;
    }
    let digits = word.chars().filter(|c| c.is_numeric()).count();
    let alpha = word.chars().filter(|c| c.is_alphabetic()).count();
    let punct = word.chars().filter(|c| c.is_ascii_punctuation()).count();
    if (digits > 0 && alpha > 0) || (digits == 0 && alpha == 0) || punct > 1 {
        return Tag::Unusual;
    }
    let upper = word.chars().filter(|c| c.is_uppercase()).count();
    if upper == word.chars().count() {
        return Tag::Acronym;
    }
    let starts_upper = word.chars().next().is_some_and(char::is_uppercase);
    if upper == 1 && starts_upper && word.chars().count() > 1 && position > 0 {
        return Tag::Proper;
    }
    Tag::Plain
}

#[derive(Debug, Default)]
struct Term {
    tf: f64,
    tf_acronym: f64,
    tf_proper: f64,
    // distinct sentence ids, ascending
    sentences: Vec<usize>,
    stopword: bool,
    weight: f64,
}

impl Term {
    fn add_occurrence(&mut self, tag: Tag, sentence: usize) {
        self.tf += 1.0;
        match tag {
            Tag::Acronym => self.tf_acronym += 1.0,
            Tag::Proper => self.tf_proper += 1.0,
            _ => {}
        }
        if self.sentences.last() != Some(&sentence) {
            self.sentences.push(sentence);
        }
    }
}

#[derive(Debug)]
struct Candidate {
    key: String,
    surface: String,
    terms: Vec<usize>,
    tags: Vec<Tag>,
    tf: f64,
}

struct Occurrence<'t> {
    word: &'t str,
    tag: Tag,
    term: usize,
}

struct TextModel {
    terms: Vec<Term>,
    term_index: HashMap<String, usize>,
    cooccurrence: HashMap<(usize, usize), f64>,
    candidates: Vec<Candidate>,
    candidate_index: HashMap<String, usize>,
    sentence_count: usize,
}

fn sentences(text: &str) -> Vec<&str> {
    PARAGRAPH_BREAK
        .split(text)
        .flat_map(split_sentences)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

impl TextModel {
    fn build(text: &str, stopwords: &HashSet<&str>, ngram_size: usize) -> Self {
        let mut model = Self {
            terms: Vec::new(),
            term_index: HashMap::new(),
            cooccurrence: HashMap::new(),
            candidates: Vec::new(),
            candidate_index: HashMap::new(),
            sentence_count: 0,
        };

        for (sentence_id, sentence) in sentences(text).into_iter().enumerate() {
            model.sentence_count += 1;
            // candidates never cross punctuation
            let mut block: Vec<Occurrence> = Vec::new();

            for (position, m) in TOKEN_PATTERN.find_iter(sentence).enumerate() {
                let word = m.as_str();
                if !word.chars().any(char::is_alphanumeric) {
                    block.clear();
                    continue;
                }

                let tag = tag_word(word, position);
                let term = model.term_id(word, stopwords);
                model.terms[term].add_occurrence(tag, sentence_id);

                if !tag.excluded() {
                    let start = block.len().saturating_sub(WINDOW);
                    for prev in block[start..].iter().filter(|o| !o.tag.excluded()) {
                        *model.cooccurrence.entry((prev.term, term)).or_insert(0.0) += 1.0;
                    }
                }

                block.push(Occurrence { word, tag, term });
                let longest = ngram_size.min(block.len());
                for n in 1..=longest {
                    model.add_candidate(&block[block.len() - n..]);
                }
            }
        }
        model
    }

    fn term_id(&mut self, word: &str, stopwords: &HashSet<&str>) -> usize {
        let lower = word.to_lowercase();
        let plain_stopword = stopwords.contains(lower.as_str());
        let mut key = lower;
        if key.ends_with('s') && key.chars().count() > 3 {
            key.pop();
        }
        if let Some(&id) = self.term_index.get(&key) {
            return id;
        }

        let letters: String = key.chars().filter(|c| !c.is_ascii_punctuation()).collect();
        let stopword =
            plain_stopword || stopwords.contains(key.as_str()) || letters.chars().count() < 3;
        let id = self.terms.len();
        self.terms.push(Term {
            stopword,
            ..Term::default()
        });
        self.term_index.insert(key, id);
        id
    }

    fn add_candidate(&mut self, words: &[Occurrence]) {
        let key = words
            .iter()
            .map(|o| o.word.to_lowercase())
            .collect::<Vec<_>>()
            .join(" ");
        if let Some(&idx) = self.candidate_index.get(&key) {
            self.candidates[idx].tf += 1.0;
            return;
        }

        let surface = words.iter().map(|o| o.word).collect::<Vec<_>>().join(" ");
        self.candidate_index.insert(key.clone(), self.candidates.len());
        self.candidates.push(Candidate {
            key,
            surface,
            terms: words.iter().map(|o| o.term).collect(),
            tags: words.iter().map(|o| o.tag).collect(),
            tf: 1.0,
        });
    }

    /// Compute every term's weight. Returns false when no term can anchor a keyword.
    fn score_terms(&mut self) -> bool {
        let valid_tfs: Vec<f64> = self
            .terms
            .iter()
            .filter(|t| !t.stopword)
            .map(|t| t.tf)
            .collect();
        if valid_tfs.is_empty() || self.sentence_count == 0 {
            return false;
        }

        let mean = valid_tfs.iter().sum::<f64>() / valid_tfs.len() as f64;
        let variance =
            valid_tfs.iter().map(|tf| (tf - mean).powi(2)).sum::<f64>() / valid_tfs.len() as f64;
        let std_dev = variance.sqrt();
        let max_tf = self.terms.iter().map(|t| t.tf).fold(0.0, f64::max);

        // (distinct neighbours, total co-occurrences)
        let mut outgoing = vec![(0usize, 0.0f64); self.terms.len()];
        let mut incoming = vec![(0usize, 0.0f64); self.terms.len()];
        for (&(from, to), &count) in &self.cooccurrence {
            outgoing[from].0 += 1;
            outgoing[from].1 += count;
            incoming[to].0 += 1;
            incoming[to].1 += count;
        }
        let dispersion = |(neighbours, total): (usize, f64)| {
            if total == 0.0 {
                0.0
            } else {
                neighbours as f64 / total
            }
        };

        let sentence_count = self.sentence_count as f64;
        for (id, term) in self.terms.iter_mut().enumerate() {
            let tf_ratio = term.tf / max_tf;
            let relatedness = (0.5 + dispersion(incoming[id]) * tf_ratio)
                + (0.5 + dispersion(outgoing[id]) * tf_ratio);
            let frequency = term.tf / (mean + std_dev);
            let spread = term.sentences.len() as f64 / sentence_count;
            let casing = term.tf_acronym.max(term.tf_proper) / (1.0 + term.tf.ln());
            let position = (3.0 + median(&term.sentences)).ln().ln();

            term.weight = (position * relatedness)
                / (casing + frequency / relatedness + spread / relatedness);
        }
        true
    }

    fn is_valid(&self, candidate: &Candidate) -> bool {
        let (Some(&first), Some(&last)) = (candidate.terms.first(), candidate.terms.last()) else {
            return false;
        };
        !candidate.tags.iter().any(|t| t.excluded())
            && !self.terms[first].stopword
            && !self.terms[last].stopword
    }

    fn edge(&self, from: usize, to: usize) -> f64 {
        self.cooccurrence.get(&(from, to)).copied().unwrap_or(0.0)
    }

    fn candidate_score(&self, candidate: &Candidate) -> f64 {
        let mut sum = 0.0;
        let mut product = 1.0;
        let terms = &candidate.terms;

        for (i, &id) in terms.iter().enumerate() {
            let term = &self.terms[id];
            if !term.stopword {
                sum += term.weight;
                product *= term.weight;
                continue;
            }
            // interior stopwords weigh in through how strongly they bind their neighbours
            let before = match i.checked_sub(1).map(|p| terms[p]) {
                Some(prev) => self.edge(prev, id) / self.terms[prev].tf,
                None => 0.0,
            };
            let after = match terms.get(i + 1) {
                Some(&next) => self.edge(id, next) / self.terms[next].tf,
                None => 0.0,
            };
            let probability = before * after;
            product *= 1.0 + (1.0 - probability);
            sum -= 1.0 - probability;
        }

        product / ((sum + 1.0) * candidate.tf)
    }
}

fn median(values: &[usize]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) as f64 / 2.0
    } else {
        values[mid] as f64
    }
}
