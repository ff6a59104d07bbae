//! Instruction stream, label table, and jump patching (spec §4.7).
//! Opcode shape grounded in `other_examples/d8b149b3_emdash-udashboard`'s
//! `Opcode`/`Program` pair, generalized from a stack machine to this
//! spec's register machine.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Opcode {
    // Arithmetic, one opcode per numeric type (spec §4.7).
    AddInt,
    SubInt,
    MulInt,
    DivInt,
    ModInt,
    AddFloat,
    SubFloat,
    MulFloat,
    DivFloat,
    AddDouble,
    SubDouble,
    MulDouble,
    DivDouble,

    LoadConst,
    Move,
    Jump,
    JumpIfFalse,
    Call,
    Return,

    GetField,
    SetField,
    GetStatic,
    SetStatic,

    NewArray,
    NewMap,
    NewSet,

    Halt,
}

/// Up to three operand slots per instruction, matching a fixed-width
/// encoding (spec §4.7 "fixed-width instructions").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Operands {
    pub a: i32,
    pub b: i32,
    pub c: i32,
}

impl Operands {
    pub fn none() -> Self {
        Self::default()
    }
    pub fn one(a: i32) -> Self {
        Self { a, b: 0, c: 0 }
    }
    pub fn two(a: i32, b: i32) -> Self {
        Self { a, b, c: 0 }
    }
    pub fn three(a: i32, b: i32, c: i32) -> Self {
        Self { a, b, c }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operands: Operands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabelId(pub u32);

#[derive(Debug, Default)]
pub struct InstructionBuilder {
    pub instructions: Vec<Instruction>,
    labels: HashMap<LabelId, usize>,
    pending_jumps: Vec<(usize, LabelId)>,
    next_label: u32,
}

impl InstructionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, opcode: Opcode, operands: Operands) -> usize {
        self.instructions.push(Instruction { opcode, operands });
        self.instructions.len() - 1
    }

    pub fn fresh_label(&mut self) -> LabelId {
        let id = LabelId(self.next_label);
        self.next_label += 1;
        id
    }

    /// Bind a label to the *next* instruction index to be emitted.
    pub fn bind_label(&mut self, label: LabelId) {
        self.labels.insert(label, self.instructions.len());
    }

    /// Emit a jump to a label, recording a pending patch if the label
    /// isn't bound yet (forward reference).
    pub fn emit_jump(&mut self, opcode: Opcode, label: LabelId) -> usize {
        let idx = self.emit(opcode, Operands::one(0));
        match self.labels.get(&label) {
            Some(&target) => self.instructions[idx].operands.a = target as i32,
            None => self.pending_jumps.push((idx, label)),
        }
        idx
    }

    /// Resolve every pending forward jump against its now-bound
    /// label. Must be called once all labels in the function have
    /// been bound (spec §4.7 "patched when the target label is
    /// finalized").
    pub fn patch_pending_jumps(&mut self) -> Result<(), String> {
        for (idx, label) in self.pending_jumps.drain(..) {
            let target = self
                .labels
                .get(&label)
                .ok_or_else(|| format!("label {:?} was never bound", label))?;
            self.instructions[idx].operands.a = *target as i32;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_jump_is_patched_after_label_binds() {
        let mut b = InstructionBuilder::new();
        let label = b.fresh_label();
        let jump_idx = b.emit_jump(Opcode::Jump, label);
        b.emit(Opcode::Halt, Operands::none());
        b.bind_label(label);
        let target_idx = b.instructions.len();
        b.patch_pending_jumps().unwrap();
        assert_eq!(b.instructions[jump_idx].operands.a, target_idx as i32);
    }

    #[test]
    fn backward_jump_resolves_immediately() {
        let mut b = InstructionBuilder::new();
        let label = b.fresh_label();
        b.bind_label(label);
        let jump_idx = b.emit_jump(Opcode::Jump, label);
        assert_eq!(b.instructions[jump_idx].operands.a, 0);
    }
}
