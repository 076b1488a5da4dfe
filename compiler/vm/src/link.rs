//! Resolves labels and call targets once, before execution.
//!
//! Statements are kept as compiled. The result of linking is a parallel
//! table with one resolved target per statement.

use std::collections::HashMap;

use log::trace;
use stplc_ir::{CompiledArgument, CompiledPou, LocalVarOffset, PouId, Statement, POINTER_SIZE};

use crate::builtin::Builtin;
use crate::error::LinkError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Callee {
    Pou(usize),
    Builtin(Builtin),
}

/// What a statement refers to after linking.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    None,
    Jump(usize),
    Call(Callee),
}

pub struct LinkedPou {
    pub pou: CompiledPou,
    pub targets: Vec<Target>,
}

/// Every procedure of a program image with its resolved targets.
pub struct Program {
    pous: Vec<LinkedPou>,
    index: HashMap<PouId, usize>,
}

impl Program {
    /// Links procedures. When two procedures share a name, calls resolve to
    /// the first one. A compiled procedure hides a built-in of the same name.
    pub fn link(pous: Vec<CompiledPou>) -> Result<Self, LinkError> {
        let mut index = HashMap::new();
        for (i, pou) in pous.iter().enumerate() {
            index.entry(pou.id.clone()).or_insert(i);
        }

        let mut linked = Vec::with_capacity(pous.len());
        for pou in &pous {
            let targets = resolve(pou, &pous, &index)?;
            check_frame(pou, &pous, &targets)?;
            trace!("Linked {} with {} statements", pou.id, pou.statements.len());
            linked.push(targets);
        }

        Ok(Program {
            pous: pous
                .into_iter()
                .zip(linked)
                .map(|(pou, targets)| LinkedPou { pou, targets })
                .collect(),
            index,
        })
    }

    pub fn find(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn get(&self, index: usize) -> &LinkedPou {
        &self.pous[index]
    }
}

fn resolve(
    pou: &CompiledPou,
    pous: &[CompiledPou],
    index: &HashMap<PouId, usize>,
) -> Result<Vec<Target>, LinkError> {
    let mut labels: HashMap<&str, usize> = HashMap::new();
    for (position, statement) in pou.statements.iter().enumerate() {
        if let Statement::Label { name } = statement {
            if labels.insert(name.as_str(), position).is_some() {
                return Err(LinkError::DuplicateLabel {
                    pou: pou.id.clone(),
                    label: name.clone(),
                });
            }
        }
    }

    pou.statements
        .iter()
        .map(|statement| match statement {
            Statement::Jump { label } | Statement::JumpIfNot { label, .. } => labels
                .get(label.as_str())
                .map(|&position| Target::Jump(position))
                .ok_or_else(|| LinkError::UnresolvedLabel {
                    pou: pou.id.clone(),
                    label: label.clone(),
                }),
            Statement::StaticCall {
                callee,
                inputs,
                outputs,
            } => {
                let resolved = match index.get(callee) {
                    Some(&i) => Callee::Pou(i),
                    None => Builtin::lookup(callee.as_str())
                        .map(Callee::Builtin)
                        .ok_or_else(|| LinkError::UnknownProcedure {
                            pou: pou.id.clone(),
                            callee: callee.clone(),
                        })?,
                };
                let (declared_inputs, declared_outputs) = arguments(resolved, pous);
                check_count(pou, callee, "input", declared_inputs.len(), inputs.len())?;
                check_count(pou, callee, "output", declared_outputs.len(), outputs.len())?;
                Ok(Target::Call(resolved))
            }
            _ => Ok(Target::None),
        })
        .collect()
}

/// The input and output arguments a callee declares.
fn arguments(callee: Callee, pous: &[CompiledPou]) -> (Vec<CompiledArgument>, Vec<CompiledArgument>) {
    match callee {
        Callee::Pou(i) => (pous[i].inputs.clone(), pous[i].outputs.clone()),
        Callee::Builtin(builtin) => (builtin.inputs(), builtin.outputs()),
    }
}

fn check_count(
    pou: &CompiledPou,
    callee: &PouId,
    kind: &'static str,
    expected: usize,
    actual: usize,
) -> Result<(), LinkError> {
    if expected == actual {
        return Ok(());
    }
    Err(LinkError::ArgumentCountMismatch {
        pou: pou.id.clone(),
        callee: callee.clone(),
        kind,
        expected,
        actual,
    })
}

/// Checks that every statically sized frame access stays inside the frame.
fn check_frame(pou: &CompiledPou, pous: &[CompiledPou], targets: &[Target]) -> Result<(), LinkError> {
    let mut accesses: Vec<(LocalVarOffset, usize)> = Vec::new();
    accesses.extend(
        pou.inputs
            .iter()
            .chain(&pou.outputs)
            .map(|a| (LocalVarOffset(a.offset), a.size)),
    );

    for (statement, target) in pou.statements.iter().zip(targets) {
        match statement {
            Statement::JumpIfNot { control, .. } => accesses.push((*control, 1)),
            Statement::StaticCall {
                inputs, outputs, ..
            } => {
                if let Target::Call(callee) = target {
                    let (declared_inputs, declared_outputs) = arguments(*callee, pous);
                    let sized = |slots: &[LocalVarOffset], declared: &[CompiledArgument]| {
                        slots
                            .iter()
                            .zip(declared)
                            .map(|(slot, arg)| (*slot, arg.size))
                            .collect::<Vec<_>>()
                    };
                    accesses.extend(sized(inputs, &declared_inputs));
                    accesses.extend(sized(outputs, &declared_outputs));
                }
            }
            Statement::WriteValue {
                size,
                value,
                target,
            } => {
                accesses.push((*target, *size));
                accesses.extend(value.frame_reads(*size));
            }
            Statement::WriteDerefValue {
                size,
                value,
                target,
            } => {
                accesses.push((*target, POINTER_SIZE));
                accesses.extend(value.frame_reads(*size));
            }
            Statement::Comment { .. }
            | Statement::Label { .. }
            | Statement::Jump { .. }
            | Statement::Return => {}
        }
    }

    match accesses
        .into_iter()
        .find(|(offset, size)| {
            (offset.0 as usize)
                .checked_add(*size)
                .map_or(true, |end| end > pou.stack_usage)
        })
    {
        Some((offset, size)) => Err(LinkError::FrameOffsetOutOfRange {
            pou: pou.id.clone(),
            offset: offset.0,
            size,
            stack_usage: pou.stack_usage,
        }),
        None => Ok(()),
    }
}
