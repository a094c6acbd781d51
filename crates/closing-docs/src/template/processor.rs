use serde::Serialize;
use tracing::{debug, warn};

use super::directive::{self, Directive};
use super::document::{Block, Container, TemplateDocument};
use super::expression;
use super::placeholder::{self, Substitution};
use super::scope::Scope;
use super::value::Value;

pub const DEFAULT_ROOT_NAME: &str = "Loan";
pub const DEFAULT_MAX_EXTRA_PASSES: usize = 2;

/// What happened to one container during processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerReport {
    pub name: String,
    pub extra_passes: usize,
    /// A directive without terminator stopped the main pass early.
    pub aborted: bool,
    pub markers_remaining: usize,
    /// Qualified placeholders whose path did not resolve (rendered empty).
    pub unresolved: usize,
    /// Placeholders still present in the output, left verbatim.
    pub unqualified: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessReport {
    pub containers: Vec<ContainerReport>,
}

impl ProcessReport {
    pub fn container(&self, name: &str) -> Option<&ContainerReport> {
        self.containers.iter().find(|report| report.name == name)
    }

    /// No container aborted and no directive text survived.
    pub fn is_clean(&self) -> bool {
        self.containers
            .iter()
            .all(|report| !report.aborted && report.markers_remaining == 0)
    }
}

struct Expansion {
    blocks: Vec<Block>,
    aborted: bool,
}

/// Expands `IF`/`FOREACH` directives and substitutes placeholders in every
/// container of a template, each container independently.
#[derive(Debug, Clone)]
pub struct TemplateProcessor {
    root_name: String,
    max_extra_passes: usize,
}

impl Default for TemplateProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_ROOT_NAME)
    }
}

impl TemplateProcessor {
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            root_name: root_name.into(),
            max_extra_passes: DEFAULT_MAX_EXTRA_PASSES,
        }
    }

    pub fn with_max_extra_passes(mut self, passes: usize) -> Self {
        self.max_extra_passes = passes;
        self
    }

    pub fn root_name(&self) -> &str {
        &self.root_name
    }

    pub fn max_extra_passes(&self) -> usize {
        self.max_extra_passes
    }

    pub fn process(&self, containers: &mut [Container], model: &Value) -> ProcessReport {
        let scope = Scope::new(&self.root_name, model);
        ProcessReport {
            containers: containers
                .iter_mut()
                .map(|container| self.process_container(container, &scope))
                .collect(),
        }
    }

    pub fn process_document(&self, document: &mut TemplateDocument, model: &Value) -> ProcessReport {
        debug!(document = %document.name, root = %self.root_name, "processing template");
        self.process(&mut document.containers, model)
    }

    fn process_container(&self, container: &mut Container, scope: &Scope<'_>) -> ContainerReport {
        let mut tally = Substitution::default();
        let main = self.expand(&container.blocks, scope, &mut tally, &container.name, true);
        container.blocks = main.blocks;

        let mut extra_passes = 0;
        while extra_passes < self.max_extra_passes
            && directive::count_markers(&container.blocks) > 0
        {
            // Plain blocks already hold merged data; only directives are rescanned.
            let pass = self.expand(&container.blocks, scope, &mut tally, &container.name, false);
            extra_passes += 1;
            if pass.blocks == container.blocks {
                break;
            }
            container.blocks = pass.blocks;
        }

        let markers_remaining = directive::count_markers(&container.blocks);
        if markers_remaining > 0 {
            warn!(
                container = %container.name,
                markers = markers_remaining,
                "directive markers left in output"
            );
        }

        let unqualified = container
            .blocks
            .iter()
            .map(|block| placeholder::keys(block).len())
            .sum();

        ContainerReport {
            name: container.name.clone(),
            extra_passes,
            aborted: main.aborted,
            markers_remaining,
            unresolved: tally.missing,
            unqualified,
        }
    }

    /// One cursor pass over `blocks`. On a missing terminator, at any depth,
    /// the outermost open directive and everything after it are returned as
    /// authored. Placeholders in plain blocks are substituted only when
    /// `substitute_plain` is set.
    fn expand(
        &self,
        blocks: &[Block],
        scope: &Scope<'_>,
        tally: &mut Substitution,
        container: &str,
        substitute_plain: bool,
    ) -> Expansion {
        let mut output = Vec::with_capacity(blocks.len());
        let mut cursor = 0;

        while cursor < blocks.len() {
            let marker = directive::of_block(&blocks[cursor]);
            let opener = match marker {
                Some(opener) if opener.is_opening() => opener,
                Some(stray) => {
                    warn!(container, block = cursor, directive = ?stray, "terminator without opener");
                    output.push(blocks[cursor].clone());
                    cursor += 1;
                    continue;
                }
                None => {
                    let mut block = blocks[cursor].clone();
                    if substitute_plain {
                        tally.absorb(placeholder::substitute(&mut block, scope));
                    }
                    output.push(block);
                    cursor += 1;
                    continue;
                }
            };

            let Some(end) = directive::find_terminator(blocks, cursor, &opener) else {
                warn!(
                    container,
                    block = cursor,
                    directive = ?opener,
                    "directive has no terminator; rest of container left unprocessed"
                );
                output.extend_from_slice(&blocks[cursor..]);
                return Expansion {
                    blocks: output,
                    aborted: true,
                };
            };
            let inner = &blocks[cursor + 1..end];
            let mark = output.len();

            let aborted = match opener {
                Directive::If { condition } => {
                    let holds = expression::evaluate_condition(&condition, scope);
                    debug!(container, condition = %condition, holds, "IF evaluated");
                    if holds {
                        let nested = self.expand(inner, scope, tally, container, substitute_plain);
                        output.extend(nested.blocks);
                        nested.aborted
                    } else {
                        false
                    }
                }
                Directive::ForEach { variable, source } => {
                    let items = scope.resolve_items(&source);
                    debug!(container, variable = %variable, source = %source, items = items.len(), "FOREACH expanded");
                    let mut aborted = false;
                    for item in items {
                        let frame = scope.with_item(&variable, item);
                        let nested = self.expand(inner, &frame, tally, container, substitute_plain);
                        output.extend(nested.blocks);
                        if nested.aborted {
                            aborted = true;
                            break;
                        }
                    }
                    aborted
                }
                Directive::EndIf | Directive::EndForEach => false,
            };

            if aborted {
                output.truncate(mark);
                output.extend_from_slice(&blocks[cursor..]);
                return Expansion {
                    blocks: output,
                    aborted: true,
                };
            }
            cursor = end + 1;
        }

        Expansion {
            blocks: output,
            aborted: false,
        }
    }
}

/// Process `containers` against `model` with the default pass limit.
pub fn process_template(containers: &mut [Container], root_name: &str, model: &Value) -> ProcessReport {
    TemplateProcessor::new(root_name).process(containers, model)
}
