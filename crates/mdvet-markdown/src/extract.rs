//! Fenced code-block extraction
//!
//! A line-by-line scan over markdown text. A line opening with three
//! backticks begins block accumulation (optionally carrying a language
//! tag and a filename annotation); a bare closing fence ends it.

use mdvet_core::{CodeBlock, Language};
use tracing::debug;

/// Skip markers recognized inside block bodies, one per comment syntax
/// (shell, TypeScript/JavaScript, HTML).
const SKIP_MARKERS: &[&str] = &[
    "# skip-validation",
    "// skip-validation",
    "<!-- skip-validation",
];

const FENCE: &str = "```";

/// Extract all fenced code blocks from markdown text, in document order
///
/// Skipped blocks are still returned (so reporting can count them);
/// a block left unclosed at end-of-input is dropped, never an error.
pub fn extract_blocks(markdown: &str) -> Vec<CodeBlock> {
    let mut blocks = Vec::new();
    let mut current: Option<(String, usize, Vec<&str>)> = None;

    for (index, line) in markdown.lines().enumerate() {
        match current.take() {
            None => {
                if let Some(info) = line.trim_start().strip_prefix(FENCE) {
                    // 1-based line of the opening fence
                    current = Some((info.trim().to_string(), index + 1, Vec::new()));
                }
            }
            Some((info, start_line, mut body)) => {
                if line.trim() == FENCE {
                    blocks.push(build_block(&info, start_line, &body));
                } else {
                    body.push(line);
                    current = Some((info, start_line, body));
                }
            }
        }
    }

    if let Some((_, start_line, _)) = current {
        debug!("Dropping unterminated fence opened at line {}", start_line);
    }

    blocks
}

fn build_block(info: &str, start_line: usize, body: &[&str]) -> CodeBlock {
    let mut parts = info.split_whitespace();
    let tag = parts.next().unwrap_or("").to_string();
    let filename = parts.next().map(|s| s.to_string());

    let code = body.join("\n");
    let skip = SKIP_MARKERS.iter().any(|marker| code.contains(marker));

    CodeBlock {
        language: Language::from_tag(&tag),
        tag,
        start_line,
        filename,
        skip,
        skip_reason: skip.then(|| "skip-validation marker present".to_string()),
        code,
    }
}
