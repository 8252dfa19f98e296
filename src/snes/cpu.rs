//! The symbolic execution engine: walks every reachable instruction under
//! every reachable processor-mode configuration, forking at every control-
//! flow fork, and converging its findings into a shared [`Log`].

use std::collections::HashSet;
use std::rc::Rc;

use crate::snes::instruction::{Instruction, InstructionID, InstructionType, StackManipulation};
use crate::snes::log::Log;
use crate::snes::opcodes::{AddressMode, Op};
use crate::snes::registers::Registers;
use crate::snes::rom::ROM;
use crate::snes::stack::{Payload, Stack};
use crate::snes::state::{State, StateChange, UnknownReason};

/// One symbolic execution thread. Cloned at every control-flow fork; every
/// clone shares the same [`Log`] handle and folds its findings into it.
#[derive(Clone)]
pub struct CPU {
    log: Rc<Log>,

    stop: bool,

    pc: usize,
    subroutine: usize,

    state: State,
    state_change: StateChange,
    state_inference: StateChange,

    registers: Registers,
    stack: Stack,

    /// Call sites that led here, innermost last. Diagnostic only.
    stack_trace: Vec<usize>,
}

impl CPU {
    pub fn new(log: &Rc<Log>, pc: usize, subroutine: usize, p: u8) -> Self {
        Self {
            log: Rc::clone(log),
            stop: false,
            pc,
            subroutine,
            state: State::new(p),
            state_change: StateChange::new_empty(),
            state_inference: StateChange::new_empty(),
            registers: Registers::new(),
            stack: Stack::new(),
            stack_trace: Vec::new(),
        }
    }

    pub fn run(&mut self) {
        while !self.stop {
            self.step();
        }
    }

    fn step(&mut self) {
        if ROM::is_ram(self.pc) {
            self.stop = true;
            return;
        }

        let probe = InstructionID::new(self.pc, self.state.p(), self.subroutine);
        if self.log.is_visited(probe) {
            self.stop = true;
            return;
        }

        let opcode = self.log.rom().read_byte(self.pc);
        let argument = self.log.rom().read_address(self.pc + 1);
        let instruction = Instruction::with_context(
            self.pc,
            self.subroutine,
            self.state.p(),
            opcode,
            argument,
            self.registers,
            self.state_change,
        );

        log::debug!(
            "{:#08x} (M={}, X={}, sub={:#08x}) {}",
            self.pc,
            self.state.m() as u8,
            self.state.x() as u8,
            self.subroutine,
            instruction.name()
        );

        self.log.add_instruction(instruction);
        self.execute(instruction);

        let change_after = match self.log.instruction_assertion(instruction.pc()) {
            Some(asserted) => {
                Self::apply_state_change(&mut self.state, &mut self.state_change, asserted);
                asserted
            }
            None => self.state_change,
        };
        self.log.set_state_change_after(instruction.id(), change_after);
    }

    fn execute(&mut self, instruction: Instruction) {
        self.pc += instruction.size();
        self.derive_state_inference(instruction);

        match instruction.typ() {
            InstructionType::Return => self.ret(instruction),
            InstructionType::Interrupt => self.interrupt(instruction),
            InstructionType::Call => self.call(instruction),
            InstructionType::Jump => self.jump(instruction),
            InstructionType::Branch => self.branch(instruction),
            InstructionType::SepRep => self.sep_rep(instruction),
            InstructionType::ChangesStack => self.change_stack(instruction),
            InstructionType::ChangesA => self.change_a(instruction),
            InstructionType::Pop => self.pop(instruction),
            InstructionType::Push => self.push(instruction),
            InstructionType::Other => {}
        }
    }

    /// Run the not-taken path to completion in a clone; the original keeps
    /// going down the taken path.
    fn branch(&mut self, instruction: Instruction) {
        let mut fall_through = self.clone();
        fall_through.run();

        let target = instruction.absolute_argument().unwrap();
        self.log.add_reference(instruction.pc(), target, self.subroutine);
        self.pc = target;
    }

    /// Resolve a call's target(s); for each, run it as its own subroutine to
    /// completion and immediately fold its return state back into `self`
    /// before moving on to the next target.
    fn call(&mut self, instruction: Instruction) {
        match self.jump_targets(instruction) {
            Some(targets) => {
                for target in targets {
                    let mut callee = self.clone();
                    callee.state_change = StateChange::new_empty();
                    callee.subroutine = target;
                    callee.pc = target;
                    callee.stack_trace.push(instruction.pc());

                    let ret_size = if instruction.operation() == Op::JSL { 3 } else { 2 };
                    callee.stack.push(instruction, Payload::None, ret_size);

                    self.log.add_subroutine(target, callee.stack_trace.clone());
                    self.log.add_reference(instruction.pc(), target, self.subroutine);
                    callee.run();

                    self.propagate_subroutine_state(instruction.pc(), target);
                }
            }
            None => self.unknown_state_change(instruction.pc(), UnknownReason::IndirectJump),
        }
    }

    /// Resolve a jump's target(s) and continue each as a clone of the
    /// current subroutine; the original always stops here.
    fn jump(&mut self, instruction: Instruction) {
        match self.jump_targets(instruction) {
            Some(targets) => {
                for target in targets {
                    self.log.add_reference(instruction.pc(), target, self.subroutine);
                    let mut clone = self.clone();
                    clone.pc = target;
                    clone.run();
                }
                self.stop = true;
            }
            None => self.unknown_state_change(instruction.pc(), UnknownReason::IndirectJump),
        }
    }

    /// A return instruction that has been asserted to actually dispatch
    /// through a table of targets rather than pop a real return address.
    fn jump_table(&mut self, instruction: Instruction) {
        let targets: Vec<usize> = self
            .log
            .assertions()
            .jump_assertion(instruction.pc())
            .unwrap_or_else(|| {
                panic!("jump table at {:#x} has no jump assertion to resolve it", instruction.pc())
            })
            .iter()
            .map(|t| t.target)
            .collect();

        for target in targets {
            self.log.add_reference(instruction.pc(), target, self.subroutine);
            let mut clone = self.clone();
            clone.pc = target;
            clone.run();
        }
        self.stop = true;
    }

    fn ret(&mut self, instruction: Instruction) {
        let expected_producer = match instruction.operation() {
            Op::RTS => Some((2, Op::JSR)),
            Op::RTL => Some((3, Op::JSL)),
            Op::RTI => None,
            _ => unreachable!("ret() dispatched for a non-return instruction"),
        };

        // Pop unconditionally, even when this return turns out to be a
        // disguised jump table: real 65816 execution still consumes the
        // return-address bytes, and downstream stack-relative analysis needs
        // the pointer to reflect that.
        let popped = expected_producer.map(|(size, _)| self.stack.pop(size));

        if self.log.assertions().is_jump_table(instruction.pc()) {
            return self.jump_table(instruction);
        }

        if let (Some((_, expected_op)), Some(popped)) = (expected_producer, &popped) {
            let manipulator = popped
                .iter()
                .find_map(|entry| entry.instruction.filter(|i| i.operation() != expected_op));

            if let Some(manipulator) = manipulator {
                self.log.set_stack_manipulation(manipulator.id(), StackManipulation::CausesUnknownState);
                self.log.mark_stack_manipulation(self.subroutine);

                let change = match self.log.instruction_assertion(instruction.pc()) {
                    Some(asserted) => {
                        Self::apply_state_change(&mut self.state, &mut self.state_change, asserted);
                        self.state_change
                    }
                    None => StateChange::new_unknown(UnknownReason::StackManipulation),
                };
                self.log.add_state_change(self.subroutine, instruction.pc(), change);
                self.stop = true;
                return;
            }
        }

        self.stop = true;
        self.log.add_state_change(self.subroutine, instruction.pc(), self.state_change);
    }

    fn interrupt(&mut self, instruction: Instruction) {
        self.unknown_state_change(instruction.pc(), UnknownReason::SuspectInstruction);
    }

    fn sep_rep(&mut self, instruction: Instruction) {
        let arg = instruction.absolute_argument().unwrap() as u8;
        match instruction.operation() {
            Op::SEP => {
                self.state.set(arg);
                self.state_change.set(arg);
            }
            Op::REP => {
                self.state.reset(arg);
                self.state_change.reset(arg);
            }
            _ => unreachable!("sep_rep() dispatched for neither SEP nor REP"),
        }
        // Collapse any delta already implied by the state we've inferred
        // this subroutine must have been entered with.
        self.state_change.apply_inference(self.state_inference);
    }

    fn change_a(&mut self, instruction: Instruction) {
        let state = self.state;
        match instruction.address_mode() {
            AddressMode::ImmediateM => {
                let a = self.registers.a.get(state);
                let arg = instruction.argument().unwrap() as u16;
                match instruction.operation() {
                    Op::LDA => self.registers.a.set(state, Some(arg)),
                    Op::ADC => self.registers.a.set(state, a.map(|a| a.wrapping_add(arg))),
                    Op::SBC => self.registers.a.set(state, a.map(|a| a.wrapping_sub(arg))),
                    _ => unreachable!("only LDA/ADC/SBC reach change_a under ImmediateM"),
                }
            }
            _ => match instruction.operation() {
                Op::TSC => self.registers.a.set_whole(Some(self.stack.pointer() as u16)),
                Op::PLA => {
                    self.stack.pop(state.a_size());
                    self.registers.a.set(state, None);
                }
                _ => unreachable!("only TSC/PLA reach change_a outside ImmediateM"),
            },
        }
    }

    fn change_stack(&mut self, instruction: Instruction) {
        match instruction.operation() {
            Op::TCS => match self.registers.a.get_whole() {
                Some(a) => self.stack.set_pointer(instruction, Some(a as isize)),
                None => {
                    self.log.set_stack_manipulation(instruction.id(), StackManipulation::Harmless);
                    self.stack.set_pointer(instruction, None);
                }
            },
            _ => unreachable!("only TCS reaches change_stack"),
        }
    }

    fn push(&mut self, instruction: Instruction) {
        match instruction.operation() {
            Op::PHP => self.stack.push_one(instruction, Payload::State(self.state, self.state_change)),
            Op::PHA => self.stack.push(instruction, Payload::None, self.state.a_size()),
            Op::PHX | Op::PHY => self.stack.push(instruction, Payload::None, self.state.x_size()),
            Op::PHB | Op::PHK => self.stack.push_one(instruction, Payload::None),
            Op::PHD | Op::PEA | Op::PER | Op::PEI => self.stack.push(instruction, Payload::None, 2),
            _ => unreachable!("unexpected push opcode"),
        }
    }

    fn pop(&mut self, instruction: Instruction) {
        match instruction.operation() {
            Op::PLP => {
                let entry = self.stack.pop_one();
                match entry.instruction {
                    Some(producer) if producer.operation() == Op::PHP => {
                        if let Payload::State(state, state_change) = entry.data {
                            self.state = state;
                            self.state_change = state_change;
                        }
                    }
                    maybe_producer => {
                        if let Some(producer) = maybe_producer {
                            self.log.set_stack_manipulation(producer.id(), StackManipulation::CausesUnknownState);
                        }
                        self.log.mark_stack_manipulation(self.subroutine);
                        self.unknown_state_change(instruction.pc(), UnknownReason::StackManipulation);
                    }
                }
            }
            Op::PLB => {
                self.stack.pop(1);
            }
            Op::PLD => {
                self.stack.pop(2);
            }
            Op::PLX | Op::PLY => {
                self.stack.pop(self.state.x_size());
            }
            _ => unreachable!("unexpected pop opcode"),
        }
    }

    /// Fold the resolved return state of a single called subroutine into
    /// `self`, or fall back to the unknown-state escape hatch if that
    /// callee's own return states disagree (or it is itself unknown).
    /// Called once per call target, immediately after that target's clone
    /// finishes running — not after aggregating across every target of a
    /// multi-target (indirect) call.
    fn propagate_subroutine_state(&mut self, call_pc: usize, target: usize) {
        let (simplified, has_unknown) = {
            let subroutines = self.log.subroutines().borrow();
            match subroutines.get(&target) {
                Some(callee) => callee.simplify_return_states(self.state),
                None => return,
            }
        };

        if has_unknown {
            return self.unknown_state_change(call_pc, UnknownReason::Unknown);
        }
        if simplified.len() != 1 {
            return self.unknown_state_change(call_pc, UnknownReason::MultipleReturnStates);
        }

        let change = *simplified.iter().next().unwrap();
        Self::apply_state_change(&mut self.state, &mut self.state_change, change);
    }

    /// The shared escape hatch for every anomaly that can be asserted
    /// through: apply an instruction-level override and keep going, or fall
    /// back to declaring the current subroutine's outgoing state unknown.
    fn unknown_state_change(&mut self, pc: usize, reason: UnknownReason) {
        match self.log.instruction_assertion(pc) {
            Some(change) => Self::apply_state_change(&mut self.state, &mut self.state_change, change),
            None => {
                log::warn!(
                    "subroutine {:#08x} outgoing state is UNKNOWN at {:#08x} ({:?})",
                    self.subroutine,
                    pc,
                    reason
                );
                self.log.add_state_change(self.subroutine, pc, StateChange::new_unknown(reason));
                self.stop = true;
            }
        }
    }

    fn apply_state_change(state: &mut State, state_change: &mut StateChange, new_change: StateChange) {
        if let Some(m) = new_change.m() {
            state.set_m(m);
            state_change.set_m(m);
        }
        if let Some(x) = new_change.x() {
            state.set_x(x);
            state_change.set_x(x);
        }
    }

    /// An operand-width-dependent instruction executing with no delta yet
    /// observed on that field tells us what M/X must have been at
    /// subroutine entry.
    fn derive_state_inference(&mut self, instruction: Instruction) {
        if instruction.address_mode() == AddressMode::ImmediateM && self.state_change.m().is_none() {
            self.state_inference.set_m(self.state.m());
        }
        if instruction.address_mode() == AddressMode::ImmediateX && self.state_change.x().is_none() {
            self.state_inference.set_x(self.state.x());
        }
    }

    /// The target(s) of a call/jump, in assertion-list order, or `None` if
    /// unresolvable.
    fn jump_targets(&self, instruction: Instruction) -> Option<Vec<usize>> {
        match instruction.absolute_argument() {
            Some(target) => Some(vec![target]),
            None => self
                .log
                .assertions()
                .jump_assertion(instruction.pc())
                .map(|targets| targets.iter().map(|t| t.target).collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snes::assertions::AssertionStore;

    fn setup_cpu(p: u8) -> CPU {
        setup_cpu_with_assertions(p, AssertionStore::new())
    }

    fn setup_cpu_with_assertions_and_rom(p: u8, assertions: AssertionStore, data: Vec<u8>) -> CPU {
        let rom = ROM::from_bytes("synthetic".to_owned(), data).unwrap();
        let log = Log::new(rom, assertions);
        log.add_subroutine(0x8000, Vec::new());
        CPU::new(&log, 0x8000, 0x8000, p)
    }

    fn setup_cpu_with_assertions(p: u8, assertions: AssertionStore) -> CPU {
        let rom = ROM::from_bytes("synthetic".to_owned(), vec![0u8; 0x8000]).unwrap();
        let log = Log::new(rom, assertions);
        log.add_subroutine(0x8000, Vec::new());
        CPU::new(&log, 0x8000, 0x8000, p)
    }

    fn decode(cpu: &CPU, opcode: u8, argument: usize) -> Instruction {
        Instruction::with_context(cpu.pc, cpu.subroutine, cpu.state.p(), opcode, argument, cpu.registers, cpu.state_change)
    }

    #[test]
    fn test_branch_forks_and_advances() {
        let mut cpu = setup_cpu(0);

        let bcc = decode(&cpu, 0x90, 0x10); // BCC +16
        cpu.execute(bcc);
        assert_eq!(cpu.pc, 0x8012);
    }

    #[test]
    fn test_call_registers_subroutine() {
        let mut cpu = setup_cpu(0);

        let jsr = decode(&cpu, 0x20, 0x9000); // JSR $9000
        cpu.execute(jsr);

        assert_eq!(cpu.pc, 0x8003);
        assert!(cpu.log.is_subroutine(0x9000));
    }

    #[test]
    fn test_jump_stops_the_original_clone() {
        let mut cpu = setup_cpu(0);

        let jmp = decode(&cpu, 0x4C, 0x9000); // JMP $9000
        cpu.execute(jmp);

        let references = cpu.log.references().borrow();
        assert!(references[&0x8000].iter().any(|r| r.target == 0x9000));
    }

    #[test]
    fn test_rts_stops_and_records_return_state() {
        let mut cpu = setup_cpu(0);
        let rts = decode(&cpu, 0x60, 0); // RTS
        cpu.execute(rts);
        assert!(cpu.stop);

        let subroutines = cpu.log.subroutines().borrow();
        assert_eq!(subroutines[&0x8000].state_changes.len(), 1);
    }

    #[test]
    fn test_rti_does_not_pop_the_stack() {
        let mut cpu = setup_cpu(0);
        let php = decode(&cpu, 0x08, 0);
        cpu.stack.push_one(php, Payload::None);
        let pointer_before = cpu.stack.pointer();

        let rti = decode(&cpu, 0x40, 0); // RTI
        cpu.execute(rti);

        assert!(cpu.stop);
        assert_eq!(cpu.stack.pointer(), pointer_before);
    }

    #[test]
    fn test_sep_rep_update_state() {
        let mut cpu = setup_cpu(0);

        let sep = decode(&cpu, 0xE2, 0x30); // SEP #$30
        cpu.execute(sep);
        assert_eq!(cpu.pc, 0x8002);
        assert_eq!(cpu.state.p(), 0b0011_0000);

        let rep = decode(&cpu, 0xC2, 0x30); // REP #$30
        cpu.execute(rep);
        assert_eq!(cpu.pc, 0x8004);
        assert_eq!(cpu.state.p(), 0b0000_0000);
    }

    #[test]
    fn test_php_plp_restores_state_transparently() {
        let mut cpu = setup_cpu(0);

        let php = decode(&cpu, 0x08, 0); // PHP
        cpu.execute(php);

        cpu.state.set(0b0011_0000);
        cpu.state_change.set(0b0011_0000);

        let plp = decode(&cpu, 0x28, 0); // PLP
        cpu.execute(plp);

        assert_eq!(cpu.state.p(), 0);
        assert!(!cpu.stop);
    }

    #[test]
    fn test_plp_over_non_php_slot_is_stack_manipulation() {
        let mut cpu = setup_cpu(0);
        let pha = decode(&cpu, 0x48, 0); // PHA
        cpu.execute(pha);

        let plp = decode(&cpu, 0x28, 0); // PLP
        cpu.execute(plp);

        let subroutines = cpu.log.subroutines().borrow();
        assert!(subroutines[&0x8000].has_stack_manipulation);
    }

    #[test]
    fn test_rts_marked_as_jump_table_dispatches_via_assertion() {
        let mut assertions = AssertionStore::new();
        assertions.mark_jump_table(0x8000);
        assertions.add_jump_assertion(0x8000, Some("case_a".to_owned()), 0x9000);
        assertions.add_jump_assertion(0x8000, Some("case_b".to_owned()), 0x9010);

        let mut cpu = setup_cpu_with_assertions(0, assertions);
        let rts = decode(&cpu, 0x60, 0); // RTS, but asserted as a jump table
        cpu.execute(rts);

        assert!(cpu.stop);
        let references = cpu.log.references().borrow();
        let targets: HashSet<usize> = references[&0x8000].iter().map(|r| r.target).collect();
        assert_eq!(targets, HashSet::from([0x9000, 0x9010]));
    }

    #[test]
    #[should_panic(expected = "jump table")]
    fn test_rts_marked_as_jump_table_without_assertion_panics() {
        let mut assertions = AssertionStore::new();
        assertions.mark_jump_table(0x8000);

        let mut cpu = setup_cpu_with_assertions(0, assertions);
        let rts = decode(&cpu, 0x60, 0);
        cpu.execute(rts);
    }

    #[test]
    fn test_tcs_sets_pointer_from_known_a() {
        let mut cpu = setup_cpu(0);
        cpu.registers.a.set_whole(Some(0x01FF));

        let tcs = decode(&cpu, 0x1B, 0); // TCS
        cpu.execute(tcs);

        assert_eq!(cpu.stack.pointer(), 0x01FF);
    }

    #[test]
    fn test_instruction_assertion_on_ordinary_instruction_mutates_live_state() {
        let mut assertions = AssertionStore::new();
        assertions.add_instruction_assertion(0x8000, StateChange::new(Some(true), Some(true)));

        let mut data = vec![0u8; 0x8000];
        data[0] = 0xEA; // NOP at $8000
        let mut cpu = setup_cpu_with_assertions_and_rom(0, assertions, data);

        cpu.step();

        // The assertion must not just be recorded as this instruction's
        // after-state; it must also mutate the live state the engine keeps
        // decoding subsequent instructions under.
        assert_eq!(cpu.state.p(), 0b0011_0000);
        assert_eq!(cpu.state_change.m(), Some(true));
        assert_eq!(cpu.state_change.x(), Some(true));
    }
}
