/*!
 * Tests for document chunking
 */

use llm_translate::translation::chunker::{chunk_content, chunk_stats, reassemble_chunks, ChunkKind, ChunkerOptions};
use llm_translate::translation::tokens::estimate_tokens;

fn sample_documents() -> Vec<String> {
    let long_section: String = (0..40)
        .map(|i| format!("Paragraph {} explains one more detail of the deployment process.\n\n", i))
        .collect();

    vec![
        String::new(),
        "Just one line".to_string(),
        "# Title\n\nIntro text.\n\n## Setup\n\nRun the installer.\n".to_string(),
        "Before\n\n```bash\nnpm install\n```\n\nAfter\n\n```\nplain\n```".to_string(),
        format!("# Guide\n\n{}```rust\nfn main() {{}}\n```\n\n{}", long_section, long_section),
        "\n\n  leading and trailing whitespace  \n\n".to_string(),
    ]
}

#[test]
fn test_reassemble_anyDocument_shouldRoundTripExactly() {
    let options = ChunkerOptions {
        max_tokens: 100,
        ..ChunkerOptions::default()
    };

    for doc in sample_documents() {
        let chunks = chunk_content(&doc, options);
        if doc.trim().is_empty() {
            continue;
        }
        assert_eq!(reassemble_chunks(&chunks), doc, "round trip failed for {:?}", doc);
    }
}

#[test]
fn test_chunk_codeBlocks_shouldStayOutOfTranslatableChunks() {
    let doc = &sample_documents()[3];
    let chunks = chunk_content(doc, ChunkerOptions::default());

    for chunk in &chunks {
        if chunk.kind == ChunkKind::Translatable {
            assert!(!chunk.content.contains("npm install"));
            assert!(!chunk.content.contains("```"));
        }
    }
    assert!(chunks
        .iter()
        .any(|c| c.kind == ChunkKind::Preserve && c.content == "```bash\nnpm install\n```"));
}

#[test]
fn test_chunk_largeDocument_shouldRespectTokenLimit() {
    let doc = &sample_documents()[4];
    let options = ChunkerOptions {
        max_tokens: 120,
        ..ChunkerOptions::default()
    };
    let chunks = chunk_content(doc, options);

    assert!(chunks.len() > 2);
    for chunk in chunks.iter().filter(|c| c.kind == ChunkKind::Translatable) {
        assert!(
            estimate_tokens(&chunk.content) <= options.max_tokens,
            "chunk {} has {} tokens",
            chunk.id,
            estimate_tokens(&chunk.content)
        );
    }
}

#[test]
fn test_chunk_offsets_shouldBeContiguous() {
    let doc = &sample_documents()[4];
    let chunks = chunk_content(doc, ChunkerOptions { max_tokens: 120, ..ChunkerOptions::default() });

    let mut expected_start = 0;
    for chunk in &chunks {
        assert_eq!(chunk.start_offset, expected_start);
        assert_eq!(&doc[chunk.start_offset..chunk.end_offset], chunk.content);
        expected_start = chunk.end_offset;
    }
    assert_eq!(expected_start, doc.len());
}

#[test]
fn test_chunkStats_shouldMatchChunkList() {
    let doc = &sample_documents()[3];
    let chunks = chunk_content(doc, ChunkerOptions::default());
    let stats = chunk_stats(&chunks);

    assert_eq!(stats.total_chunks, chunks.len());
    assert_eq!(stats.preserved_chunks, 2);
    assert_eq!(stats.translatable_chunks + stats.preserved_chunks, stats.total_chunks);
}
