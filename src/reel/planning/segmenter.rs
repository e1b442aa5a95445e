//! Script segmentation.
//!
//! A script is cut into at most `N` text segments, each long enough to anchor
//! one visual. Three strategies are tried in order and the first one that
//! yields more than one segment wins:
//!
//! 1. paragraphs, grouped into `N` balanced buckets when there are too many
//! 2. sentences, merged into buckets around the average length (at most 1.5x)
//! 3. fixed-length chunks that back off to a sentence end or word boundary
//!
//! If all of them yield fewer than two segments, the text is chunked without
//! looking at boundaries at all.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

lazy_static! {
    static ref PARAGRAPH_BREAK: Regex =
        Regex::new(r"\r?\n[ \t]*\r?\n\s*").expect("valid paragraph regex");
    static ref SENTENCE: Regex = Regex::new(r"[^.!?]+[.!?]+").expect("valid sentence regex");
}

/// Which strategy produced a segmentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitStrategy {
    Paragraphs,
    Sentences,
    Length,
    RawChunks,
    WholeText,
}

impl std::fmt::Display for SplitStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SplitStrategy::Paragraphs => "paragraphs",
            SplitStrategy::Sentences => "sentences",
            SplitStrategy::Length => "length",
            SplitStrategy::RawChunks => "raw chunks",
            SplitStrategy::WholeText => "whole text",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct Segmentation {
    pub segments: Vec<String>,
    pub strategy: SplitStrategy,
}

type Strategy = fn(&Segmenter, &str) -> Vec<String>;

#[derive(Debug, Clone, Copy)]
pub struct Segmenter {
    max_segments: usize,
    min_chars: usize,
}

impl Segmenter {
    pub fn new(max_segments: usize, min_chars: usize) -> Self {
        Self {
            max_segments: max_segments.max(1),
            min_chars,
        }
    }

    /// Split `script` into ordered segments.
    ///
    /// Empty or whitespace-only input yields no segments; deciding whether
    /// that is fatal is up to the caller.
    pub fn split(&self, script: &str) -> Segmentation {
        let normalized = normalize_whitespace(script);
        if normalized.is_empty() {
            return Segmentation {
                segments: Vec::new(),
                strategy: SplitStrategy::WholeText,
            };
        }

        let strategies: [(SplitStrategy, Strategy); 3] = [
            (SplitStrategy::Paragraphs, Self::by_paragraphs),
            (SplitStrategy::Sentences, Self::by_sentences),
            (SplitStrategy::Length, Self::by_length),
        ];

        for (strategy, split) in strategies {
            let segments: Vec<String> = split(self, script)
                .into_iter()
                .filter(|segment| self.long_enough(segment))
                .take(self.max_segments)
                .collect();
            if segments.len() > 1 {
                return Segmentation { segments, strategy };
            }
        }

        // Last resort: even chunks, kept regardless of length
        let segments = self.raw_chunks(&normalized);
        let strategy = if segments.len() > 1 {
            SplitStrategy::RawChunks
        } else {
            SplitStrategy::WholeText
        };
        if segments.is_empty() {
            return Segmentation {
                segments: vec![normalized],
                strategy,
            };
        }
        Segmentation { segments, strategy }
    }

    /// Number of chunks a text of `len` characters can be cut into while
    /// every chunk keeps the minimum length, capped at the segment limit.
    fn chunk_count(&self, len: usize) -> usize {
        self.max_segments.min(len / self.min_chars.max(1)).max(1)
    }

    fn long_enough(&self, text: &str) -> bool {
        char_len(text) >= self.min_chars
    }

    fn by_paragraphs(&self, script: &str) -> Vec<String> {
        let paragraphs: Vec<String> = PARAGRAPH_BREAK
            .split(script.trim())
            .map(normalize_whitespace)
            .filter(|p| !p.is_empty())
            .collect();
        let paragraphs = self.merge_short(paragraphs);

        if paragraphs.len() <= self.max_segments {
            return paragraphs;
        }
        balanced_buckets(paragraphs, self.max_segments)
    }

    fn by_sentences(&self, script: &str) -> Vec<String> {
        let text = normalize_whitespace(script);
        let sentences = self.merge_short(split_sentences(&text));

        if sentences.len() <= self.max_segments {
            return sentences;
        }

        let average = char_len(&text).div_ceil(self.max_segments) as f64;
        let limit = average * 1.5;

        let mut buckets: Vec<String> = Vec::new();
        let mut current = String::new();
        for sentence in sentences {
            let candidate = char_len(&current) + 1 + char_len(&sentence);
            if !current.is_empty()
                && candidate as f64 > limit
                && buckets.len() < self.max_segments - 1
            {
                buckets.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&sentence);
        }
        if !current.is_empty() {
            buckets.push(current);
        }
        buckets
    }

    fn by_length(&self, script: &str) -> Vec<String> {
        let text = normalize_whitespace(script);
        let chars: Vec<char> = text.chars().collect();
        let size = chars.len().div_ceil(self.chunk_count(chars.len())).max(1);

        let mut chunks: Vec<String> = Vec::new();
        let mut start = 0;
        while start < chars.len() {
            let end = (start + size).min(chars.len());
            let cut = if end == chars.len() {
                end - start
            } else {
                self.backoff(&chars[start..end], size).unwrap_or_else(|| {
                    // No boundary inside the window: run on to the next word end
                    chars[end..]
                        .iter()
                        .position(|c| c.is_whitespace())
                        .map_or(chars.len(), |offset| end + offset)
                        - start
                })
            };

            let chunk: String = chars[start..start + cut]
                .iter()
                .collect::<String>()
                .trim()
                .to_string();
            if !chunk.is_empty() {
                chunks.push(chunk);
            }

            start += cut;
            while start < chars.len() && chars[start].is_whitespace() {
                start += 1;
            }
        }

        // A short tail belongs to the chunk before it
        if chunks.len() > 1
            && let Some(tail) = chunks.last()
            && !self.long_enough(tail)
        {
            let tail = chunks.pop().unwrap_or_default();
            if let Some(last) = chunks.last_mut() {
                last.push(' ');
                last.push_str(&tail);
            }
        }

        if chunks.len() > self.max_segments {
            let overflow = chunks.split_off(self.max_segments);
            if let Some(last) = chunks.last_mut() {
                for chunk in overflow {
                    last.push(' ');
                    last.push_str(&chunk);
                }
            }
        }

        chunks
            .into_iter()
            .filter(|chunk| self.long_enough(chunk))
            .collect()
    }

    /// Length of the prefix of `window` to keep: up to the last sentence end in
    /// the second half of the window, else up to the last word boundary. Never
    /// shorter than the minimum segment length; `None` when no such cut exists.
    fn backoff(&self, window: &[char], size: usize) -> Option<usize> {
        let floor = self.min_chars.max(1);

        if let Some(pos) = window.iter().rposition(|c| *c == '.') {
            let cut = pos + 1;
            if pos > size / 2 && cut >= floor {
                return Some(cut);
            }
        }
        if let Some(pos) = window.iter().rposition(|c| c.is_whitespace())
            && pos >= floor
        {
            return Some(pos);
        }
        None
    }

    /// Even character chunks without regard for word boundaries. At least two
    /// chunks whenever the limit and the text allow it.
    fn raw_chunks(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let count = self
            .chunk_count(chars.len())
            .max(2)
            .min(self.max_segments)
            .min(chars.len())
            .max(1);

        let base = chars.len() / count;
        let extra = chars.len() % count;
        let mut start = 0;
        (0..count)
            .map(|i| {
                let end = start + base + usize::from(i < extra);
                let chunk: String = chars[start..end].iter().collect();
                start = end;
                chunk.trim().to_string()
            })
            .filter(|chunk| !chunk.is_empty())
            .collect()
    }

    /// Join pieces shorter than the minimum onto the following piece so short
    /// headings and sentences are kept instead of dropped.
    fn merge_short(&self, items: Vec<String>) -> Vec<String> {
        let mut merged: Vec<String> = Vec::new();
        let mut carry = String::new();

        for item in items {
            let joined = if carry.is_empty() {
                item
            } else {
                format!("{} {}", std::mem::take(&mut carry), item)
            };
            if self.long_enough(&joined) {
                merged.push(joined);
            } else {
                carry = joined;
            }
        }

        if !carry.is_empty() {
            match merged.last_mut() {
                Some(last) => {
                    last.push(' ');
                    last.push_str(&carry);
                }
                None => merged.push(carry),
            }
        }
        merged
    }
}

fn balanced_buckets(items: Vec<String>, buckets: usize) -> Vec<String> {
    let base = items.len() / buckets;
    let extra = items.len() % buckets;
    let mut iter = items.into_iter();

    (0..buckets)
        .map(|i| {
            let take = base + usize::from(i < extra);
            iter.by_ref().take(take).collect::<Vec<_>>().join(" ")
        })
        .filter(|bucket| !bucket.is_empty())
        .collect()
}

fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut last_end = 0;
    for m in SENTENCE.find_iter(text) {
        let sentence = m.as_str().trim();
        if !sentence.is_empty() {
            sentences.push(sentence.to_string());
        }
        last_end = m.end();
    }
    let rest = text[last_end..].trim();
    if !rest.is_empty() {
        sentences.push(rest.to_string());
    }
    sentences
}

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORDS: &[&str] = &[
        "mountain", "river", "quiet", "morning", "light", "falls", "across", "the", "valley",
        "where", "old", "stones", "remember", "every", "storm", "and", "patient", "roots",
        "hold", "ground", "über", "café", "naïve",
    ];

    /// Deterministic text generator (linear congruential) so the property
    /// checks below are reproducible.
    struct TextGen(u64);

    impl TextGen {
        fn next(&mut self) -> u64 {
            self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            self.0 >> 33
        }

        fn text(&mut self, min_len: usize) -> String {
            let mut out = String::new();
            while out.chars().count() < min_len {
                let words = 3 + self.next() % 14;
                for i in 0..words {
                    if i > 0 {
                        out.push(' ');
                    }
                    out.push_str(WORDS[(self.next() as usize) % WORDS.len()]);
                }
                out.push_str(match self.next() % 4 {
                    0 => ".\n\n",
                    1 => "! ",
                    2 => "? ",
                    _ => ". ",
                });
            }
            out
        }

        /// Words without any punctuation or paragraph breaks
        fn plain(&mut self, min_len: usize) -> String {
            let mut out = String::new();
            while out.chars().count() < min_len {
                if !out.is_empty() {
                    out.push(' ');
                }
                out.push_str(WORDS[(self.next() as usize) % WORDS.len()]);
            }
            out
        }
    }

    fn assert_in_order(script: &str, segments: &[String]) {
        let normalized = normalize_whitespace(script);
        let mut cursor = 0;
        for segment in segments {
            let probe: String = segment.chars().take(12).collect();
            let found = normalized[cursor..]
                .find(&probe)
                .unwrap_or_else(|| panic!("segment '{probe}' not found in order"));
            cursor += found + probe.len();
        }
    }

    #[test]
    fn empty_script_yields_no_segments() {
        let segmenter = Segmenter::new(5, 50);
        assert!(segmenter.split("").segments.is_empty());
        assert!(segmenter.split("   \n\n \t").segments.is_empty());
    }

    #[test]
    fn paragraphs_win_when_there_are_several() {
        let script = "The first paragraph talks about mountains and the long road to the summit.\n\n\
                      The second paragraph describes the river that winds through the valley below.\n\n\
                      A third paragraph closes with the quiet of evening settling over the fields.";
        let result = Segmenter::new(5, 50).split(script);

        assert_eq!(result.strategy, SplitStrategy::Paragraphs);
        assert_eq!(result.segments.len(), 3);
        assert!(result.segments[0].starts_with("The first paragraph"));
        assert!(result.segments[2].starts_with("A third paragraph"));
    }

    #[test]
    fn many_paragraphs_are_grouped_into_balanced_buckets() {
        let script = (0..7)
            .map(|i| format!("Paragraph number {i} carries enough words to pass the minimum length."))
            .collect::<Vec<_>>()
            .join("\n\n");
        let result = Segmenter::new(3, 50).split(&script);

        assert_eq!(result.strategy, SplitStrategy::Paragraphs);
        assert_eq!(result.segments.len(), 3);
        // 7 paragraphs over 3 buckets: 3, 2, 2
        assert!(result.segments[0].contains("number 2"));
        assert!(result.segments[1].starts_with("Paragraph number 3"));
        assert!(result.segments[2].ends_with("number 6 carries enough words to pass the minimum length."));
    }

    #[test]
    fn short_heading_is_merged_into_following_paragraph() {
        let script = "Chapter one\n\n\
                      The opening paragraph is long enough to stand on its own as a segment.\n\n\
                      And the closing paragraph is also long enough to be its own segment.";
        let result = Segmenter::new(5, 50).split(script);

        assert_eq!(result.segments.len(), 2);
        assert!(result.segments[0].starts_with("Chapter one The opening"));
    }

    #[test]
    fn single_paragraph_falls_back_to_sentences() {
        let script = "The sun rises slowly over the eastern ridge and warms the frozen grass. \
                      Birds begin to call from the hedges while the mist lifts off the pond. \
                      By noon the valley is loud with insects and the smell of cut hay. \
                      Evening brings long shadows and a cool wind from the northern hills. \
                      Night falls and the stars appear one by one above the sleeping farm.";
        let result = Segmenter::new(3, 50).split(script);

        assert_eq!(result.strategy, SplitStrategy::Sentences);
        assert!(result.segments.len() >= 2 && result.segments.len() <= 3);
        let average = normalize_whitespace(script).chars().count().div_ceil(3) as f64;
        for segment in &result.segments[..result.segments.len() - 1] {
            assert!(segment.chars().count() as f64 <= average * 1.5);
        }
        assert_in_order(script, &result.segments);
    }

    #[test]
    fn unpunctuated_text_is_chunked_on_word_boundaries() {
        let words: Vec<String> = (0..120).map(|i| format!("word{i}")).collect();
        let script = words.join(" ");
        let result = Segmenter::new(4, 50).split(&script);

        assert_eq!(result.strategy, SplitStrategy::Length);
        assert!(result.segments.len() >= 2 && result.segments.len() <= 4);
        for segment in &result.segments {
            for token in segment.split(' ') {
                assert!(words.iter().any(|w| w == token), "mid-word cut: {token}");
            }
        }
        assert_eq!(result.segments.join(" "), script);
    }

    #[test]
    fn short_script_is_cut_into_raw_chunks() {
        let result = Segmenter::new(4, 50).split("Just a short line.");
        assert_eq!(result.strategy, SplitStrategy::RawChunks);
        assert_eq!(result.segments, vec!["Just a sh".to_string(), "ort line.".to_string()]);
    }

    #[test]
    fn single_segment_limit_keeps_text_whole() {
        let result = Segmenter::new(1, 50).split("Just a short line.");
        assert_eq!(result.strategy, SplitStrategy::WholeText);
        assert_eq!(result.segments, vec!["Just a short line.".to_string()]);
    }

    #[test]
    fn text_long_enough_for_two_segments_is_never_kept_whole() {
        let script = (0..20).map(|i| format!("wd{i:03}")).collect::<Vec<_>>().join(" ");
        assert_eq!(script.chars().count(), 119);

        let result = Segmenter::new(3, 50).split(&script);

        assert_eq!(result.strategy, SplitStrategy::Length);
        assert_eq!(result.segments.len(), 2);
        assert!(result.segments.iter().all(|s| s.chars().count() >= 50));
        assert_eq!(result.segments.join(" "), script);
    }

    #[test]
    fn multibyte_text_does_not_panic() {
        let script = "ñandú ".repeat(80);
        let result = Segmenter::new(3, 50).split(&script);
        assert!(result.segments.len() >= 2);
        assert!(result.segments.iter().all(|s| s.chars().count() >= 50));
    }

    #[test]
    fn generated_scripts_respect_bounds_and_order() {
        let mut generator = TextGen(42);
        for round in 0..200 {
            let max_segments = 2 + (round % 11);
            let script = generator.text(200 + (round * 37) % 3000);
            let result = Segmenter::new(max_segments, 50).split(&script);

            assert!(
                result.segments.len() >= 2 && result.segments.len() <= max_segments,
                "round {round}: {} segments for N={max_segments} via {:?}",
                result.segments.len(),
                result.strategy
            );
            for segment in &result.segments {
                assert!(segment.chars().count() >= 50, "round {round}: short segment");
                assert!(!segment.trim().is_empty());
            }
            assert_in_order(&script, &result.segments);
        }

        for round in 0..200 {
            let max_segments = 2 + (round % 5);
            let script = generator.plain(60 + (round * 7) % 141);
            let len = script.chars().count();
            let result = Segmenter::new(max_segments, 50).split(&script);

            assert!(
                result.segments.len() >= 2 && result.segments.len() <= max_segments,
                "plain round {round}: {} segments for {len} chars via {:?}",
                result.segments.len(),
                result.strategy
            );
            if len >= 100 {
                // Even raw chunks may lose an edge space to trimming
                let floor = if result.strategy == SplitStrategy::RawChunks { 48 } else { 50 };
                for segment in &result.segments {
                    assert!(
                        segment.chars().count() >= floor,
                        "plain round {round}: short segment in {len} chars"
                    );
                }
            }
            assert_in_order(&script, &result.segments);
        }
    }
}
