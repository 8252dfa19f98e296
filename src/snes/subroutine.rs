//! Subroutines discovered by the symbolic execution engine.

use std::collections::{HashMap, HashSet};

use crate::snes::instruction::{Instruction, InstructionID};
use crate::snes::state::{State, StateChange, UnknownReason};

/// A contiguously-entered code region reached by `JSR`/`JSL`, or an entry
/// vector. Keyed by its entry pc.
#[derive(Debug)]
pub struct Subroutine {
    pc: usize,

    /// Instructions belonging to this subroutine, in discovery order.
    instructions: Vec<Instruction>,
    instruction_index: HashMap<InstructionID, usize>,

    /// Every `(return_pc, StateChange)` pair observed leaving this
    /// subroutine, across every clone that ever walked it to completion.
    pub state_changes: HashSet<(usize, StateChange)>,

    /// The call-site stack trace that first discovered this subroutine
    /// (innermost call last), used purely for diagnostics.
    stack_trace: Vec<usize>,

    /// Set once a return observed stack content it didn't produce.
    pub has_stack_manipulation: bool,

    /// An optional human label (set via assertion or renamed interactively
    /// in a fuller build; kept here so the data model has somewhere to put
    /// it).
    label: Option<String>,
}

impl Subroutine {
    pub fn new(pc: usize) -> Self {
        Self {
            pc,
            instructions: Vec::new(),
            instruction_index: HashMap::new(),
            state_changes: HashSet::new(),
            stack_trace: Vec::new(),
            has_stack_manipulation: false,
            label: None,
        }
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn set_label(&mut self, label: String) {
        self.label = Some(label);
    }

    pub fn set_stack_trace(&mut self, stack_trace: Vec<usize>) {
        if self.stack_trace.is_empty() {
            self.stack_trace = stack_trace;
        }
    }

    pub fn stack_trace(&self) -> &[usize] {
        &self.stack_trace
    }

    pub fn add_instruction(&mut self, instruction: Instruction) {
        if self.instruction_index.contains_key(&instruction.id()) {
            return;
        }
        self.instruction_index.insert(instruction.id(), self.instructions.len());
        self.instructions.push(instruction);
    }

    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.instructions.iter()
    }

    pub fn instruction_count(&self) -> usize {
        self.instructions.len()
    }

    pub fn add_state_change(&mut self, return_pc: usize, change: StateChange) {
        self.state_changes.insert((return_pc, change));
    }

    /// Apply M/X inference to the observed return states and collapse the
    /// set to its simplified form, reporting whether any member is
    /// `UNKNOWN`.
    ///
    /// Inference lets a delta like "M cleared" collapse to "unchanged" once
    /// we know the subroutine's entry state already had M cleared — the
    /// caller only cares about genuine deltas, not restatements of the
    /// entry condition.
    pub fn simplify_return_states(&self, state: State) -> (HashSet<StateChange>, bool) {
        let mut simplified = HashSet::new();
        let mut has_unknown = false;

        for (_, change) in &self.state_changes {
            if change.unknown() {
                has_unknown = true;
                simplified.insert(*change);
            } else {
                simplified.insert(change.simplify(state));
            }
        }

        (simplified, has_unknown)
    }

    /// The single non-`UNKNOWN` change agreed on by every return path, if
    /// there is one. Multiple distinct non-unknown changes collapse to
    /// `UNKNOWN(MultipleReturnStates)`; any observed `UNKNOWN` return makes
    /// the whole subroutine's outgoing state `UNKNOWN`.
    pub fn resolved_return_state(&self, state: State) -> StateChange {
        let (simplified, has_unknown) = self.simplify_return_states(state);
        if has_unknown {
            return StateChange::new_unknown(UnknownReason::Unknown);
        }
        let mut iter = simplified.into_iter();
        match (iter.next(), iter.next()) {
            (None, _) => StateChange::new_empty(),
            (Some(only), None) => only,
            _ => StateChange::new_unknown(UnknownReason::MultipleReturnStates),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snes::instruction::Instruction;

    #[test]
    fn test_add_instruction_is_insertion_ordered() {
        let mut sub = Subroutine::new(0x8000);
        sub.add_instruction(Instruction::new(0x8000, 0x8000, 0, 0xEA, 0));
        sub.add_instruction(Instruction::new(0x8001, 0x8000, 0, 0xEA, 0));

        let pcs: Vec<usize> = sub.instructions().map(|i| i.pc()).collect();
        assert_eq!(pcs, vec![0x8000, 0x8001]);
    }

    #[test]
    fn test_add_instruction_keeps_same_pc_under_distinct_states() {
        let mut sub = Subroutine::new(0x8000);
        sub.add_instruction(Instruction::new(0x8000, 0x8000, 0, 0xEA, 0));
        sub.add_instruction(Instruction::new(0x8000, 0x8000, 0b0011_0000, 0xEA, 0));

        assert_eq!(sub.instruction_count(), 2);
    }

    #[test]
    fn test_single_agreeing_return_state_resolves() {
        let mut sub = Subroutine::new(0x800E);
        let state = State::from_mx(true, true);
        sub.add_state_change(0x8010, StateChange::new(Some(false), Some(false)));

        assert_eq!(sub.state_changes.len(), 1);
        assert_eq!(
            sub.resolved_return_state(state),
            StateChange::new(Some(false), Some(false))
        );
    }

    #[test]
    fn test_conflicting_return_states_become_unknown() {
        let mut sub = Subroutine::new(0x8000);
        let state = State::from_mx(true, true);
        sub.add_state_change(0x8010, StateChange::new(Some(false), None));
        sub.add_state_change(0x8020, StateChange::new(None, Some(false)));

        let resolved = sub.resolved_return_state(state);
        assert!(resolved.unknown());
        assert_eq!(resolved.unknown_reason(), Some(UnknownReason::MultipleReturnStates));
    }

    #[test]
    fn test_unknown_return_state_propagates() {
        let mut sub = Subroutine::new(0x8000);
        let state = State::from_mx(true, true);
        sub.add_state_change(0x8010, StateChange::new_unknown(UnknownReason::StackManipulation));

        let resolved = sub.resolved_return_state(state);
        assert!(resolved.unknown());
    }

    #[test]
    fn test_inference_collapses_matching_entry_state() {
        let mut sub = Subroutine::new(0x8000);
        let state = State::from_mx(false, true);
        sub.add_state_change(0x8010, StateChange::new(Some(false), Some(false)));

        assert_eq!(sub.resolved_return_state(state), StateChange::new(None, Some(false)));
    }
}
