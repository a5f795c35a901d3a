use crate::error::IngestError;
use crate::models::{Chunk, Document};
use regex::Regex;

pub const DEFAULT_CHUNK_MAX_CHARS: usize = 1_000;
pub const DEFAULT_CHUNK_OVERLAP_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub max_chars: usize,
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_CHUNK_MAX_CHARS,
            overlap_chars: DEFAULT_CHUNK_OVERLAP_CHARS,
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.max_chars == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "max_chars must be greater than zero".to_string(),
            ));
        }
        if self.overlap_chars >= self.max_chars {
            return Err(IngestError::InvalidChunkConfig(format!(
                "overlap_chars {} must be smaller than max_chars {}",
                self.overlap_chars, self.max_chars
            )));
        }
        Ok(())
    }

    fn body_budget(&self) -> usize {
        self.max_chars - self.overlap_chars
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Paragraph,
    Line,
    Sentence,
    Whitespace,
    Character,
}

pub const DEFAULT_DELIMITERS: [Delimiter; 5] = [
    Delimiter::Paragraph,
    Delimiter::Line,
    Delimiter::Sentence,
    Delimiter::Whitespace,
    Delimiter::Character,
];

impl Delimiter {
    fn pattern(self) -> Option<&'static str> {
        match self {
            Delimiter::Paragraph => Some(r"\n[^\S\n]*\n\s*"),
            Delimiter::Line => Some(r"\n"),
            Delimiter::Sentence => Some(r"[.!?]+\s+"),
            Delimiter::Whitespace => Some(r"\s+"),
            Delimiter::Character => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkText {
    pub text: String,
    pub overlap: usize,
}

enum Level {
    Pattern(Regex),
    Character,
}

/// Splits `text` into chunks of at most `config.max_chars` characters.
pub fn split_text(
    text: &str,
    config: ChunkingConfig,
    delimiters: &[Delimiter],
) -> Result<Vec<ChunkText>, IngestError> {
    config.validate()?;

    let levels = delimiters
        .iter()
        .map(|delimiter| match delimiter.pattern() {
            Some(pattern) => Regex::new(pattern).map(Level::Pattern),
            None => Ok(Level::Character),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let budget = config.body_budget();
    let mut segments = Vec::new();
    split_recursive(text, budget, &levels, &mut segments);

    let bodies = merge_segments(&segments, budget);

    let mut chunks: Vec<ChunkText> = Vec::with_capacity(bodies.len());
    for body in bodies {
        let prefix = match chunks.last() {
            Some(previous) => last_chars(&previous.text, config.overlap_chars),
            None => "",
        };
        let overlap = prefix.chars().count();
        let mut text = String::with_capacity(prefix.len() + body.len());
        text.push_str(prefix);
        text.push_str(&body);
        chunks.push(ChunkText { text, overlap });
    }

    Ok(chunks)
}

pub fn chunk_document(
    document: &Document,
    config: ChunkingConfig,
) -> Result<Vec<Chunk>, IngestError> {
    let pieces = split_text(&document.text, config, &DEFAULT_DELIMITERS)?;

    Ok(pieces
        .into_iter()
        .enumerate()
        .map(|(ordinal, piece)| Chunk {
            text: piece.text,
            source_id: document.source_id.clone(),
            ordinal,
            overlap: piece.overlap,
        })
        .collect())
}

fn split_recursive<'a>(piece: &'a str, budget: usize, levels: &[Level], out: &mut Vec<&'a str>) {
    if piece.chars().count() <= budget {
        out.push(piece);
        return;
    }

    let Some((level, finer)) = levels.split_first() else {
        out.push(piece);
        return;
    };

    match level {
        Level::Character => split_fixed(piece, budget, out),
        Level::Pattern(regex) => {
            let segments = split_keeping_delimiter(piece, regex);
            if segments.len() <= 1 {
                split_recursive(piece, budget, finer, out);
                return;
            }
            for segment in segments {
                split_recursive(segment, budget, finer, out);
            }
        }
    }
}

fn split_keeping_delimiter<'a>(piece: &'a str, regex: &Regex) -> Vec<&'a str> {
    let mut segments = Vec::new();
    let mut start = 0;

    for found in regex.find_iter(piece) {
        if found.end() > start {
            segments.push(&piece[start..found.end()]);
            start = found.end();
        }
    }

    if start < piece.len() {
        segments.push(&piece[start..]);
    }

    segments
}

fn split_fixed<'a>(piece: &'a str, budget: usize, out: &mut Vec<&'a str>) {
    let mut start = 0;
    let mut count = 0;

    for (offset, _) in piece.char_indices() {
        if count == budget {
            out.push(&piece[start..offset]);
            start = offset;
            count = 0;
        }
        count += 1;
    }

    if start < piece.len() {
        out.push(&piece[start..]);
    }
}

fn merge_segments(segments: &[&str], budget: usize) -> Vec<String> {
    let mut bodies = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0;

    for segment in segments.iter().filter(|segment| !segment.is_empty()) {
        let segment_chars = segment.chars().count();
        if current_chars > 0 && current_chars + segment_chars > budget {
            bodies.push(std::mem::take(&mut current));
            current_chars = 0;
        }
        current.push_str(segment);
        current_chars += segment_chars;
    }

    if !current.is_empty() {
        bodies.push(current);
    }

    bodies
}

fn last_chars(text: &str, count: usize) -> &str {
    let total = text.chars().count();
    match text.char_indices().nth(total.saturating_sub(count)) {
        Some((offset, _)) => &text[offset..],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_chars: usize, overlap_chars: usize) -> ChunkingConfig {
        ChunkingConfig {
            max_chars,
            overlap_chars,
        }
    }

    fn sample_text() -> String {
        let mut text = String::new();
        for paragraph in 0..6 {
            for sentence in 0..5 {
                text.push_str(&format!(
                    "Paragraph {paragraph} sentence {sentence} talks about rivers and hills. "
                ));
            }
            text.push_str("\n\n");
        }
        text.push_str("A closing line without punctuation\nand one more line");
        text
    }

    fn bodies(chunks: &[ChunkText]) -> String {
        chunks
            .iter()
            .map(|chunk| chunk.text.chars().skip(chunk.overlap).collect::<String>())
            .collect()
    }

    #[test]
    fn chunks_never_exceed_max_chars() -> Result<(), IngestError> {
        let text = sample_text();
        for (max_chars, overlap) in [(50, 10), (120, 30), (400, 0), (1_000, 200)] {
            let chunks = split_text(&text, config(max_chars, overlap), &DEFAULT_DELIMITERS)?;
            assert!(!chunks.is_empty());
            for chunk in &chunks {
                assert!(
                    chunk.text.chars().count() <= max_chars,
                    "chunk of {} chars exceeds {max_chars}",
                    chunk.text.chars().count()
                );
            }
        }
        Ok(())
    }

    #[test]
    fn bodies_reconstruct_the_original_text() -> Result<(), IngestError> {
        let text = sample_text();
        for (max_chars, overlap) in [(17, 5), (64, 16), (300, 100), (10_000, 200)] {
            let chunks = split_text(&text, config(max_chars, overlap), &DEFAULT_DELIMITERS)?;
            assert_eq!(bodies(&chunks), text);
        }
        Ok(())
    }

    #[test]
    fn chunking_is_deterministic() -> Result<(), IngestError> {
        let text = sample_text();
        let first = split_text(&text, config(90, 20), &DEFAULT_DELIMITERS)?;
        let second = split_text(&text, config(90, 20), &DEFAULT_DELIMITERS)?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn paragraph_breaks_are_preferred() -> Result<(), IngestError> {
        let chunks = split_text("aaaa\n\nbbbb", config(8, 0), &DEFAULT_DELIMITERS)?;
        let texts: Vec<_> = chunks.iter().map(|chunk| chunk.text.as_str()).collect();
        assert_eq!(texts, vec!["aaaa\n\n", "bbbb"]);
        Ok(())
    }

    #[test]
    fn overlap_repeats_tail_of_previous_chunk() -> Result<(), IngestError> {
        let chunks = split_text("one two three four five", config(10, 4), &DEFAULT_DELIMITERS)?;
        assert_eq!(chunks[0].text, "one ");
        assert_eq!(chunks[0].overlap, 0);
        assert_eq!(chunks[1].text, "one two ");
        assert_eq!(chunks[1].overlap, 4);
        assert_eq!(chunks[2].text, "two three ");
        assert!(chunks.iter().all(|chunk| chunk.text.chars().count() <= 10));
        Ok(())
    }

    #[test]
    fn atomic_unit_is_kept_when_no_delimiter_applies() -> Result<(), IngestError> {
        let delimiters = [Delimiter::Paragraph, Delimiter::Whitespace];
        let chunks = split_text("short averyveryverylongword", config(8, 0), &delimiters)?;
        let texts: Vec<_> = chunks.iter().map(|chunk| chunk.text.as_str()).collect();
        assert_eq!(texts, vec!["short ", "averyveryverylongword"]);
        Ok(())
    }

    #[test]
    fn character_level_splits_multibyte_text() -> Result<(), IngestError> {
        let text = "धर्मक्षेत्रे कुरुक्षेत्रे समवेता युयुत्सवः";
        let chunks = split_text(text, config(6, 2), &DEFAULT_DELIMITERS)?;
        assert!(chunks.iter().all(|chunk| chunk.text.chars().count() <= 6));
        assert_eq!(bodies(&chunks), text);
        Ok(())
    }

    #[test]
    fn empty_text_produces_no_chunks() -> Result<(), IngestError> {
        assert!(split_text("", ChunkingConfig::default(), &DEFAULT_DELIMITERS)?.is_empty());
        Ok(())
    }

    #[test]
    fn overlap_must_be_smaller_than_max() {
        let result = split_text("text", config(10, 10), &DEFAULT_DELIMITERS);
        assert!(matches!(result, Err(IngestError::InvalidChunkConfig(_))));
        let result = split_text("text", config(0, 0), &DEFAULT_DELIMITERS);
        assert!(matches!(result, Err(IngestError::InvalidChunkConfig(_))));
    }

    #[test]
    fn chunk_document_stamps_source_and_ordinals() -> Result<(), IngestError> {
        let document = Document {
            text: sample_text(),
            source_id: "Corpus/gita/chapter1.txt".to_string(),
        };
        let chunks = chunk_document(&document, config(200, 40))?;
        assert!(chunks.len() > 1);
        for (position, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.ordinal, position);
            assert_eq!(chunk.source_id, document.source_id);
        }
        let rebuilt: String = chunks.iter().map(Chunk::body).collect();
        assert_eq!(rebuilt, document.text);
        Ok(())
    }
}
