use std::sync::OnceLock;

use regex::Regex;

use super::document::Block;

/// Control marker recognised in a block's normalised text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    If { condition: String },
    EndIf,
    ForEach { variable: String, source: String },
    EndForEach,
}

impl Directive {
    pub fn is_opening(&self) -> bool {
        matches!(self, Directive::If { .. } | Directive::ForEach { .. })
    }
}

fn if_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^IF\s+(.+)$").expect("valid IF pattern"))
}

fn foreach_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^FOREACH\s+([A-Za-z_][A-Za-z0-9_]*)\s+(?i:in)\s+([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*)$")
            .expect("valid FOREACH pattern")
    })
}

/// Parse a block's whitespace-normalised text as a directive marker.
pub fn parse(normalized: &str) -> Option<Directive> {
    match normalized {
        "ENDIF" => return Some(Directive::EndIf),
        "ENDFOREACH" => return Some(Directive::EndForEach),
        _ => {}
    }

    if let Some(captures) = foreach_pattern().captures(normalized) {
        return Some(Directive::ForEach {
            variable: captures[1].to_string(),
            source: captures[2].to_string(),
        });
    }

    if let Some(captures) = if_pattern().captures(normalized) {
        return Some(Directive::If {
            condition: captures[1].trim().to_string(),
        });
    }

    None
}

pub fn of_block(block: &Block) -> Option<Directive> {
    parse(&block.normalized_text())
}

/// Index of the terminator matching the opener at `open`, honouring nesting
/// of the same directive kind.
pub fn find_terminator(blocks: &[Block], open: usize, opener: &Directive) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, block) in blocks.iter().enumerate().skip(open + 1) {
        match (opener, of_block(block)) {
            (Directive::If { .. }, Some(Directive::If { .. }))
            | (Directive::ForEach { .. }, Some(Directive::ForEach { .. })) => depth += 1,
            (Directive::If { .. }, Some(Directive::EndIf))
            | (Directive::ForEach { .. }, Some(Directive::EndForEach)) => {
                if depth == 0 {
                    return Some(offset);
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    None
}

/// Number of blocks that read as any directive marker.
pub fn count_markers(blocks: &[Block]) -> usize {
    blocks
        .iter()
        .filter(|block| of_block(block).is_some())
        .count()
}
