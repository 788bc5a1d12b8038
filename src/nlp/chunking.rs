// Sentence-aligned text chunking with a character overlap between neighbouring chunks.
//
// Sentence boundaries are a punctuation heuristic: a split happens right after `.`, `!` or `?`
// when whitespace follows. Abbreviations ("Dr. Smith") split too early and a decimal followed by
// a space ("costs 3. Then") splits as well. Callers depend on this exact behaviour.
use once_cell::sync::Lazy;
use regex::Regex;

static SENTENCE_BOUNDARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]\s+").unwrap());

/// Split text after every `.`, `!` or `?` that is followed by whitespace.
///
/// The whitespace run itself is dropped. The trailing piece is always returned, even when it is
/// empty, so `split_sentences("")` yields `[""]`.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for m in SENTENCE_BOUNDARY.find_iter(text) {
        // the punctuation mark is a single ASCII byte
        sentences.push(&text[start..m.start() + 1]);
        start = m.end();
    }
    sentences.push(&text[start..]);
    sentences
}

/// Number of chars (not bytes) in `s`.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Last `n` chars of `text`, or all of it when shorter.
fn tail_chars(text: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match text.char_indices().rev().nth(n - 1) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}

/// One segment of a chunked document.
///
/// Except for the first chunk, the text starts with a verbatim copy of the previous chunk's tail
/// and a single space, followed by the chunk's own sentences (the body).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    text: String,
    body_start: usize,
}

impl Chunk {
    fn plain(body: String) -> Self {
        Self {
            text: body,
            body_start: 0,
        }
    }

    fn with_overlap(overlap: &str, body: &str) -> Self {
        let mut text = String::with_capacity(overlap.len() + body.len() + 1);
        text.push_str(overlap);
        text.push(' ');
        let body_start = text.len();
        text.push_str(body);
        Self { text, body_start }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Prefix copied from the previous chunk, without the separating space.
    pub fn overlap(&self) -> &str {
        &self.text[..self.body_start.saturating_sub(1)]
    }

    /// The sentences that belong to this chunk alone.
    pub fn body(&self) -> &str {
        &self.text[self.body_start..]
    }

    pub fn char_len(&self) -> usize {
        char_len(&self.text)
    }
}

/// Greedy sentence packer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunker {
    pub max_chars: usize,
    pub overlap_chars: usize,
}

impl TextChunker {
    pub fn new(max_chars: usize, overlap_chars: usize) -> Self {
        Self {
            max_chars,
            overlap_chars,
        }
    }

    /// Pack sentences into chunks of at most `max_chars` chars, then add the overlap prefixes.
    ///
    /// A sentence longer than `max_chars` becomes a chunk of its own and is never cut.
    pub fn chunk(&self, text: &str) -> Vec<Chunk> {
        let bodies = self.pack_sentences(text);
        if self.overlap_chars == 0 || bodies.len() < 2 {
            return bodies.into_iter().map(Chunk::plain).collect();
        }

        let mut chunks: Vec<Chunk> = Vec::with_capacity(bodies.len());
        for body in bodies {
            let next = match chunks.last() {
                None => Chunk::plain(body),
                Some(prev) => Chunk::with_overlap(tail_chars(prev.as_str(), self.overlap_chars), &body),
            };
            chunks.push(next);
        }
        chunks
    }

    fn pack_sentences(&self, text: &str) -> Vec<String> {
        let mut bodies = Vec::new();
        let mut current = String::new();

        for sentence in split_sentences(text) {
            // the +1 accounts for the joining space, even when the buffer is still empty
            if char_len(&current) + char_len(sentence) + 1 <= self.max_chars {
                current = format!("{} {}", current, sentence).trim().to_string();
            } else {
                push_trimmed(&mut bodies, &current);
                current = sentence.to_string();
            }
        }
        push_trimmed(&mut bodies, &current);
        bodies
    }
}

fn push_trimmed(bodies: &mut Vec<String>, buffer: &str) {
    let trimmed = buffer.trim();
    if !trimmed.is_empty() {
        bodies.push(trimmed.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_text(sentences: usize) -> String {
        (0..sentences)
            .map(|i| format!("Sentence number {} talks about topic {} in some detail.", i, i % 7))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn non_empty(sentences: Vec<&str>) -> Vec<String> {
        sentences
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    #[test]
    fn test_split_sentences_basic() {
        let sentences = split_sentences("Hello world. How are you? Fine!");
        assert_eq!(sentences, vec!["Hello world.", "How are you?", "Fine!"]);
    }

    #[test]
    fn test_split_sentences_empty_keeps_trailing_piece() {
        assert_eq!(split_sentences(""), vec![""]);
        assert_eq!(split_sentences("Done. "), vec!["Done.", ""]);
    }

    #[test]
    fn test_split_requires_whitespace_after_punctuation() {
        let sentences = split_sentences("Version 3.14 is out.Next line");
        assert_eq!(sentences, vec!["Version 3.14 is out.Next line"]);
    }

    #[test]
    fn test_split_on_abbreviation_is_heuristic() {
        // Abbreviations are split like sentence ends; this is the accepted behaviour.
        let sentences = split_sentences("Dr. Smith arrived. He sat down.");
        assert_eq!(sentences, vec!["Dr.", "Smith arrived.", "He sat down."]);
    }

    #[test]
    fn test_split_on_newlines_after_punctuation() {
        let sentences = split_sentences("First line.\n\nSecond line!\tThird");
        assert_eq!(sentences, vec!["First line.", "Second line!", "Third"]);
    }

    #[test]
    fn test_chunk_empty_text() {
        let chunker = TextChunker::new(100, 20);
        assert!(chunker.chunk("").is_empty());
        assert!(chunker.chunk("   \n\t ").is_empty());
    }

    #[test]
    fn test_chunk_single_short_sentence() {
        let chunker = TextChunker::new(100, 0);
        let chunks = chunker.chunk("A short sentence.");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_str(), "A short sentence.");
        assert_eq!(chunks[0].overlap(), "");
        assert_eq!(chunks[0].body(), "A short sentence.");
    }

    #[test]
    fn test_single_chunk_gets_no_overlap() {
        let chunker = TextChunker::new(1000, 200);
        let chunks = chunker.chunk("One. Two. Three.");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_str(), "One. Two. Three.");
    }

    #[test]
    fn test_greedy_packing_boundary() {
        // "Aaaa." + " " + "Bbbb." is 11 chars; 0 + 5 + 1 and 5 + 5 + 1 both fit in 11.
        let chunker = TextChunker::new(11, 0);
        let chunks = chunker.chunk("Aaaa. Bbbb. Cccc.");
        let texts: Vec<&str> = chunks.iter().map(|c| c.as_str()).collect();
        assert_eq!(texts, vec!["Aaaa. Bbbb.", "Cccc."]);
    }

    #[test]
    fn test_sentence_of_exactly_max_chars_stands_alone() {
        let chunker = TextChunker::new(5, 0);
        let chunks = chunker.chunk("Abcd. Ef.");
        let texts: Vec<&str> = chunks.iter().map(|c| c.as_str()).collect();
        assert_eq!(texts, vec!["Abcd.", "Ef."]);
    }

    #[test]
    fn test_long_sentence_is_kept_whole() {
        let long = format!("{}.", "word ".repeat(60).trim());
        let text = format!("Short one. {} Another short one.", long);
        let chunker = TextChunker::new(50, 0);
        let chunks = chunker.chunk(&text);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].as_str(), "Short one.");
        assert_eq!(chunks[1].as_str(), long);
        assert!(chunks[1].char_len() > 50);
        assert_eq!(chunks[2].as_str(), "Another short one.");
    }

    #[test]
    fn test_bodies_respect_max_chars() {
        let text = sample_text(80);
        let chunker = TextChunker::new(300, 60);
        let chunks = chunker.chunk(&text);
        assert!(chunks.len() > 1);

        for chunk in &chunks {
            assert!(char_len(chunk.body()) <= 300, "body too long: {}", chunk.body());
            assert!(chunk.char_len() <= 300 + 60 + 1);
        }
    }

    #[test]
    fn test_overlap_prefix_is_tail_of_previous_chunk() {
        let text = sample_text(40);
        let chunker = TextChunker::new(200, 50);
        let chunks = chunker.chunk(&text);
        assert!(chunks.len() > 2);

        for pair in chunks.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            let tail = tail_chars(prev.as_str(), 50);
            assert_eq!(char_len(tail), 50.min(prev.char_len()));
            assert!(next.as_str().starts_with(&format!("{} ", tail)));
            assert_eq!(next.overlap(), tail);
        }
    }

    #[test]
    fn test_overlap_longer_than_previous_chunk_copies_it_whole() {
        let chunker = TextChunker::new(12, 500);
        let chunks = chunker.chunk("Alpha beta. Gamma delta.");
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].as_str(), "Alpha beta.");
        assert_eq!(chunks[1].as_str(), "Alpha beta. Gamma delta.");
        assert_eq!(chunks[1].body(), "Gamma delta.");
    }

    #[test]
    fn test_overlap_chains_through_previous_overlapped_chunk() {
        let chunker = TextChunker::new(6, 100);
        let chunks = chunker.chunk("Aa. Bb. Cc.");
        let texts: Vec<&str> = chunks.iter().map(|c| c.as_str()).collect();
        assert_eq!(texts, vec!["Aa.", "Aa. Bb.", "Aa. Bb. Cc."]);
    }

    #[test]
    fn test_zero_overlap_disables_prefix() {
        let text = sample_text(30);
        let chunks = TextChunker::new(200, 0).chunk(&text);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.overlap().is_empty() && c.body() == c.as_str()));
    }

    #[test]
    fn test_bodies_reconstruct_sentence_sequence() {
        let text = sample_text(50);
        let chunks = TextChunker::new(250, 80).chunk(&text);

        let rebuilt: Vec<String> = chunks
            .iter()
            .flat_map(|c| non_empty(split_sentences(c.body())))
            .collect();
        assert_eq!(rebuilt, non_empty(split_sentences(&text)));
    }

    #[test]
    fn test_whitespace_is_normalized_between_sentences() {
        let chunks = TextChunker::new(1000, 0).chunk("  First.\n\n  Second.   Third.  ");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_str(), "First. Second. Third.");
    }

    #[test]
    fn test_multibyte_text_is_measured_in_chars() {
        let text = "Café crème brûlée. Naïve façade déjà vu. Ünïcödé everywhere.";
        let chunks = TextChunker::new(20, 7).chunk(text);
        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            assert_eq!(char_len(pair[1].overlap()), 7.min(pair[0].char_len()));
        }
    }

    #[test]
    fn test_chunking_is_deterministic() {
        let text = sample_text(25);
        let chunker = TextChunker::new(180, 40);
        assert_eq!(chunker.chunk(&text), chunker.chunk(&text));
    }
}
