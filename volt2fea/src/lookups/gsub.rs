//! Substitution lookups

use log::warn;
use volt_rs::ast::{Substitution, SubstitutionKind, SubstitutionMapping};

use crate::{error::Error, fea::GlyphOrClass, fea::Rule};

use super::{Context, Translator};

impl Translator<'_> {
    /// The rules for every mapping of `sub`, in one context.
    pub(super) fn substitution_rules(
        &self,
        sub: &Substitution,
        context: &Context,
    ) -> Result<Vec<Rule>, Error> {
        let mut rules = Vec::with_capacity(sub.mappings.len());
        for mapping in &sub.mappings {
            if mapping.input.is_empty() || mapping.output.is_empty() {
                warn!("{}: Ignoring empty substitution", mapping.location);
                continue;
            }
            let input = self
                .table
                .resolve_coverage(&mapping.input, mapping.location)?;
            if context.ignore {
                rules.push(Rule::IgnoreSub {
                    context: context.chain.clone(),
                    input,
                });
                continue;
            }
            let output = self
                .table
                .resolve_coverage(&mapping.output, mapping.location)?;
            rules.push(substitution(sub.kind, mapping, context, input, output)?);
        }
        Ok(rules)
    }
}

fn substitution(
    kind: SubstitutionKind,
    mapping: &SubstitutionMapping,
    context: &Context,
    mut input: Vec<GlyphOrClass>,
    mut output: Vec<GlyphOrClass>,
) -> Result<Rule, Error> {
    let arity_error = |input: &[GlyphOrClass], output: &[GlyphOrClass]| Error::SubstitutionArity {
        kind,
        input: input.len(),
        output: output.len(),
        location: mapping.location,
    };
    let context = context.chain.clone();
    match kind {
        SubstitutionKind::Single | SubstitutionKind::ReverseChainingSingle => {
            if input.len() != 1 || output.len() != 1 {
                return Err(arity_error(&input, &output));
            }
            let target = input.remove(0);
            let replacement = output.remove(0);
            Ok(if kind == SubstitutionKind::Single {
                Rule::SingleSub {
                    context,
                    target,
                    replacement,
                }
            } else {
                Rule::ReverseSub {
                    context,
                    target,
                    replacement,
                }
            })
        }
        SubstitutionKind::Multiple => {
            if input.len() != 1 {
                return Err(arity_error(&input, &output));
            }
            Ok(Rule::MultipleSub {
                context,
                target: input.remove(0),
                replacement: output,
            })
        }
        SubstitutionKind::Ligature => {
            if output.len() != 1 {
                return Err(arity_error(&input, &output));
            }
            Ok(Rule::LigatureSub {
                context,
                components: input,
                replacement: output.remove(0),
            })
        }
    }
}
