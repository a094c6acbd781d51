use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, warn};

use super::document::{Block, Leaf};
use super::scope::{Resolution, Scope};

/// Reserved placeholder expanding to a literal tab.
const TAB_KEY: &str = "TAB";

fn key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*$")
            .expect("valid placeholder key pattern")
    })
}

pub fn is_valid_key(key: &str) -> bool {
    key_pattern().is_match(key)
}

/// Byte position inside a block: which leaf, and where in its text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Position {
    leaf: usize,
    offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Token {
    start: Position,
    /// One past the closing brace.
    end: Position,
    key: String,
}

/// Counts from substituting one block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Substitution {
    pub replaced: usize,
    pub missing: usize,
    pub unqualified: usize,
    pub unterminated: bool,
}

impl Substitution {
    pub fn absorb(&mut self, other: Substitution) {
        self.replaced += other.replaced;
        self.missing += other.missing;
        self.unqualified += other.unqualified;
        self.unterminated |= other.unterminated;
    }
}

/// Replace every `{Key}` in the block, even when its braces and key are spread
/// over several leaves. Each touched leaf keeps its formatting; the value lands
/// in the leaf holding the opening brace.
pub fn substitute(block: &mut Block, scope: &Scope<'_>) -> Substitution {
    let (tokens, unterminated) = scan(&block.leaves);
    let mut outcome = Substitution {
        unterminated,
        ..Substitution::default()
    };

    if unterminated {
        debug!("unterminated placeholder brace, later text left as-is");
    }

    for token in tokens.iter().rev() {
        let replacement = if token.key == TAB_KEY {
            "\t".to_string()
        } else if !is_valid_key(&token.key) {
            continue;
        } else {
            match scope.resolve(&token.key) {
                Resolution::Found(value) => value.render(),
                Resolution::Missing => {
                    warn!(placeholder = %token.key, "placeholder path did not resolve");
                    outcome.missing += 1;
                    String::new()
                }
                Resolution::Unqualified => {
                    warn!(
                        placeholder = %token.key,
                        scope = ?scope.names(),
                        "placeholder not qualified by root or loop variable"
                    );
                    outcome.unqualified += 1;
                    continue;
                }
            }
        };

        replace_span(&mut block.leaves, token.start, token.end, &replacement);
        outcome.replaced += 1;
    }

    outcome
}

/// Keys of all syntactically valid placeholders in the block, in order.
pub fn keys(block: &Block) -> Vec<String> {
    scan(&block.leaves)
        .0
        .into_iter()
        .map(|token| token.key)
        .filter(|key| key == TAB_KEY || is_valid_key(key))
        .collect()
}

fn scan(leaves: &[Leaf]) -> (Vec<Token>, bool) {
    let mut tokens = Vec::new();
    let mut open: Option<(Position, String)> = None;

    for (leaf_index, leaf) in leaves.iter().enumerate() {
        for (offset, ch) in leaf.text.char_indices() {
            match ch {
                '{' => {
                    open = Some((
                        Position {
                            leaf: leaf_index,
                            offset,
                        },
                        String::new(),
                    ));
                }
                '}' => {
                    if let Some((start, key)) = open.take() {
                        tokens.push(Token {
                            start,
                            end: Position {
                                leaf: leaf_index,
                                offset: offset + ch.len_utf8(),
                            },
                            key,
                        });
                    }
                }
                other => {
                    if let Some((_, key)) = open.as_mut() {
                        key.push(other);
                    }
                }
            }
        }
    }

    (tokens, open.is_some())
}

fn replace_span(leaves: &mut [Leaf], start: Position, end: Position, replacement: &str) {
    if start.leaf == end.leaf {
        leaves[start.leaf]
            .text
            .replace_range(start.offset..end.offset, replacement);
        return;
    }

    let first = &mut leaves[start.leaf].text;
    first.truncate(start.offset);
    first.push_str(replacement);

    for leaf in &mut leaves[start.leaf + 1..end.leaf] {
        leaf.text.clear();
    }

    leaves[end.leaf].text.replace_range(..end.offset, "");
}
