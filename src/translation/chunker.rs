/*!
 * Document chunking.
 *
 * Splits a document into token-bounded chunks while keeping fenced code
 * blocks out of the translatable stream. Chunks are non-overlapping and
 * offset-addressed (byte offsets into the input), so concatenating them in
 * offset order reproduces the input exactly.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::logging::LogContext;
use super::tokens::estimate_tokens;

static HEADER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(#{1,6})[ \t]+(.+)$").expect("header regex"));

static CODE_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```[\s\S]*?```").expect("code block regex"));

static PARAGRAPH_BREAK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\n+").expect("paragraph regex"));

/// Characters of the previous chunk carried forward as context
const CONTEXT_CHARS: usize = 200;

/// Whether a chunk goes to the translator or is copied through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    Translatable,
    Preserve,
}

/// A contiguous span of a document
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    pub id: String,
    pub content: String,
    pub kind: ChunkKind,
    pub start_offset: usize,
    pub end_offset: usize,
    /// Heading lines active at this chunk, outermost first
    pub header_hierarchy: Vec<String>,
    /// Tail of the preceding translatable chunk
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_context: Option<String>,
}

impl Chunk {
    pub fn is_translatable(&self) -> bool {
        self.kind == ChunkKind::Translatable
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkerOptions {
    pub max_tokens: usize,
    /// Carried for configuration parity; chunks never overlap
    pub overlap_tokens: usize,
    pub preserve_code_blocks: bool,
}

impl Default for ChunkerOptions {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            overlap_tokens: 150,
            preserve_code_blocks: true,
        }
    }
}

/// Summary numbers for a chunk list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkStats {
    pub total_chunks: usize,
    pub translatable_chunks: usize,
    pub preserved_chunks: usize,
    pub total_tokens: usize,
    pub average_tokens: usize,
}

#[derive(Debug, Clone)]
struct Header {
    level: usize,
    text: String,
    offset: usize,
}

#[derive(Debug)]
struct Segment<'a> {
    content: &'a str,
    kind: ChunkKind,
    start_offset: usize,
}

/// Splits documents into chunks
#[derive(Debug, Clone, Default)]
pub struct Chunker {
    options: ChunkerOptions,
    log: LogContext,
}

impl Chunker {
    pub fn new(options: ChunkerOptions) -> Self {
        Self {
            options,
            log: LogContext::default(),
        }
    }

    pub fn with_log(mut self, log: LogContext) -> Self {
        self.log = log.scoped("chunker");
        self
    }

    pub fn options(&self) -> &ChunkerOptions {
        &self.options
    }

    /// Split `content` into ordered chunks
    pub fn chunk(&self, content: &str) -> Vec<Chunk> {
        if content.trim().is_empty() {
            return Vec::new();
        }

        let headers = extract_headers(content);
        let segments = self.extract_segments(content);

        let mut chunks: Vec<Chunk> = Vec::new();
        let mut previous_context: Option<String> = None;

        for segment in segments {
            let segment_headers = headers_for_position(&headers, segment.start_offset);

            if segment.kind == ChunkKind::Preserve {
                chunks.push(Chunk {
                    id: format!("chunk-{}", chunks.len()),
                    content: segment.content.to_string(),
                    kind: ChunkKind::Preserve,
                    start_offset: segment.start_offset,
                    end_offset: segment.start_offset + segment.content.len(),
                    header_hierarchy: segment_headers,
                    previous_context: None,
                });
                continue;
            }

            for (start, text) in self.split_segment(segment.content, segment.start_offset) {
                let chunk_headers = headers_for_position(&headers, start);
                let tokens = estimate_tokens(text);
                if tokens > self.options.max_tokens {
                    self.log.warn(format!(
                        "Paragraph at offset {} has {} tokens (limit {}), keeping it whole",
                        start, tokens, self.options.max_tokens
                    ));
                }

                chunks.push(Chunk {
                    id: format!("chunk-{}", chunks.len()),
                    content: text.to_string(),
                    kind: ChunkKind::Translatable,
                    start_offset: start,
                    end_offset: start + text.len(),
                    header_hierarchy: if chunk_headers.is_empty() {
                        segment_headers.clone()
                    } else {
                        chunk_headers
                    },
                    previous_context: previous_context.take(),
                });
                previous_context = Some(truncate_for_context(text, CONTEXT_CHARS));
            }
        }

        let stats = chunk_stats(&chunks);
        self.log.debug(format!(
            "Created {} chunks ({} translatable, {} preserved, ~{} tokens)",
            stats.total_chunks, stats.translatable_chunks, stats.preserved_chunks, stats.total_tokens
        ));

        chunks
    }

    fn extract_segments<'a>(&self, content: &'a str) -> Vec<Segment<'a>> {
        let preserved: Vec<(usize, usize)> = if self.options.preserve_code_blocks {
            CODE_BLOCK_RE
                .find_iter(content)
                .map(|m| (m.start(), m.end()))
                .collect()
        } else {
            Vec::new()
        };

        let mut segments = Vec::new();
        let mut last_end = 0;

        let push_gap = |segments: &mut Vec<Segment<'a>>, start: usize, end: usize| {
            if end > start {
                let gap = &content[start..end];
                segments.push(Segment {
                    content: gap,
                    kind: if gap.trim().is_empty() {
                        ChunkKind::Preserve
                    } else {
                        ChunkKind::Translatable
                    },
                    start_offset: start,
                });
            }
        };

        for (start, end) in preserved {
            push_gap(&mut segments, last_end, start);
            segments.push(Segment {
                content: &content[start..end],
                kind: ChunkKind::Preserve,
                start_offset: start,
            });
            last_end = end;
        }
        push_gap(&mut segments, last_end, content.len());

        segments
    }

    /// Paragraph-level split of one translatable segment, returned as
    /// `(absolute_offset, text)` pairs
    fn split_segment<'a>(&self, text: &'a str, base_offset: usize) -> Vec<(usize, &'a str)> {
        if estimate_tokens(text) <= self.options.max_tokens {
            return vec![(base_offset, text)];
        }

        // Paragraphs and their separators, in order, covering the whole text
        let mut parts: Vec<&str> = Vec::new();
        let mut cursor = 0;
        for m in PARAGRAPH_BREAK_RE.find_iter(text) {
            parts.push(&text[cursor..m.start()]);
            parts.push(m.as_str());
            cursor = m.end();
        }
        parts.push(&text[cursor..]);

        let mut pieces = Vec::new();
        let mut chunk_start = 0;
        let mut offset = 0;

        for part in parts {
            let current = &text[chunk_start..offset];
            let candidate = &text[chunk_start..offset + part.len()];
            if !current.is_empty() && estimate_tokens(candidate) > self.options.max_tokens {
                pieces.push((base_offset + chunk_start, current));
                chunk_start = offset;
            }
            offset += part.len();
        }

        if chunk_start < text.len() {
            pieces.push((base_offset + chunk_start, &text[chunk_start..]));
        }

        pieces
    }
}

/// One-shot chunking without a logger
pub fn chunk_content(content: &str, options: ChunkerOptions) -> Vec<Chunk> {
    Chunker::new(options).chunk(content)
}

/// Concatenate chunks in offset order
pub fn reassemble_chunks(chunks: &[Chunk]) -> String {
    let mut sorted: Vec<&Chunk> = chunks.iter().collect();
    sorted.sort_by_key(|c| c.start_offset);
    sorted.iter().map(|c| c.content.as_str()).collect()
}

pub fn chunk_stats(chunks: &[Chunk]) -> ChunkStats {
    let translatable = chunks.iter().filter(|c| c.is_translatable()).count();
    let total_tokens: usize = chunks.iter().map(|c| estimate_tokens(&c.content)).sum();
    let average_tokens = if chunks.is_empty() {
        0
    } else {
        (total_tokens as f64 / chunks.len() as f64).round() as usize
    };

    ChunkStats {
        total_chunks: chunks.len(),
        translatable_chunks: translatable,
        preserved_chunks: chunks.len() - translatable,
        total_tokens,
        average_tokens,
    }
}

fn extract_headers(content: &str) -> Vec<Header> {
    HEADER_RE
        .captures_iter(content)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let marks = caps.get(1)?;
            Some(Header {
                level: marks.as_str().len(),
                text: whole.as_str().to_string(),
                offset: whole.start(),
            })
        })
        .collect()
}

/// Heading stack in effect at `position`
fn headers_for_position(headers: &[Header], position: usize) -> Vec<String> {
    let mut levels: [Option<&str>; 7] = [None; 7];

    for header in headers {
        if header.offset > position {
            break;
        }
        for slot in levels.iter_mut().skip(header.level) {
            *slot = None;
        }
        levels[header.level] = Some(&header.text);
    }

    levels[1..].iter().flatten().map(|s| s.to_string()).collect()
}

/// Tail of `content` no longer than `max_chars`, cut at a word boundary
/// when one is near the start of the tail
fn truncate_for_context(content: &str, max_chars: usize) -> String {
    let total = content.chars().count();
    if total <= max_chars {
        return content.to_string();
    }

    let tail: String = content.chars().skip(total - max_chars).collect();
    match tail.char_indices().find(|(_, c)| *c == ' ') {
        Some((idx, _)) if idx > 0 && tail[..idx].chars().count() < 50 => {
            format!("...{}", &tail[idx + 1..])
        }
        _ => format!("...{}", tail),
    }
}
