//! The analysis database: the single source of truth shared by every live
//! CPU clone during a run, and the thing the rest of the world reads once
//! `analyze()` returns.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::snes::assertions::AssertionStore;
use crate::snes::cpu::CPU;
use crate::snes::instruction::{Instruction, InstructionID, StackManipulation};
use crate::snes::rom::ROM;
use crate::snes::state::StateChange;
use crate::snes::subroutine::Subroutine;

/// A single observed control-flow edge.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Reference {
    pub target: usize,
    pub subroutine: usize,
}

/// One of the ROM's canonical entry vectors, or a user-added one.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct EntryPoint {
    pub pc: usize,
    pub p: u8,
    pub subroutine: usize,
    pub label: String,
}

pub struct Log {
    rom: ROM,
    assertions: AssertionStore,

    subroutines: RefCell<HashMap<usize, Subroutine>>,
    subroutines_by_label: RefCell<HashMap<String, usize>>,
    instructions: RefCell<HashMap<InstructionID, Instruction>>,
    references: RefCell<HashMap<usize, HashSet<Reference>>>,
    visited: RefCell<HashSet<InstructionID>>,
    entry_points: RefCell<HashSet<EntryPoint>>,

    /// The two pieces of per-instruction data only known after execution:
    /// `state_change_after` and `stack_manipulation`. Kept out of
    /// `Instruction` itself (see its module docs) so a `Copy` instruction
    /// handed out to many owners doesn't need interior mutability.
    instruction_meta: RefCell<HashMap<InstructionID, (StateChange, StackManipulation)>>,
}

impl Log {
    pub fn new(rom: ROM, assertions: AssertionStore) -> Rc<Self> {
        Rc::new(Self {
            rom,
            assertions,
            subroutines: RefCell::new(HashMap::new()),
            subroutines_by_label: RefCell::new(HashMap::new()),
            instructions: RefCell::new(HashMap::new()),
            references: RefCell::new(HashMap::new()),
            visited: RefCell::new(HashSet::new()),
            entry_points: RefCell::new(HashSet::new()),
            instruction_meta: RefCell::new(HashMap::new()),
        })
    }

    pub fn rom(&self) -> &ROM {
        &self.rom
    }

    pub fn assertions(&self) -> &AssertionStore {
        &self.assertions
    }

    pub fn subroutines(&self) -> &RefCell<HashMap<usize, Subroutine>> {
        &self.subroutines
    }

    pub fn instructions(&self) -> &RefCell<HashMap<InstructionID, Instruction>> {
        &self.instructions
    }

    pub fn references(&self) -> &RefCell<HashMap<usize, HashSet<Reference>>> {
        &self.references
    }

    pub fn entry_points(&self) -> &RefCell<HashSet<EntryPoint>> {
        &self.entry_points
    }

    pub fn visited(&self) -> &RefCell<HashSet<InstructionID>> {
        &self.visited
    }

    pub fn is_visited(&self, id: InstructionID) -> bool {
        self.visited.borrow().contains(&id)
    }

    /// Register `instruction` in the visited set, the flat index, and its
    /// owning subroutine's instruction map. Idempotent.
    pub fn add_instruction(&self, instruction: Instruction) {
        self.visited.borrow_mut().insert(instruction.id());
        self.instructions.borrow_mut().insert(instruction.id(), instruction);
        self.subroutines
            .borrow_mut()
            .entry(instruction.subroutine())
            .or_insert_with(|| Subroutine::new(instruction.subroutine()))
            .add_instruction(instruction);
    }

    pub fn add_reference(&self, src: usize, target: usize, subroutine: usize) {
        self.references.borrow_mut().entry(src).or_default().insert(Reference { target, subroutine });
    }

    /// Ensure a subroutine exists at `pc`, recording the call-site stack
    /// trace that first discovered it.
    pub fn add_subroutine(&self, pc: usize, stack_trace: Vec<usize>) {
        let mut subroutines = self.subroutines.borrow_mut();
        let is_new = !subroutines.contains_key(&pc);
        let sub = subroutines.entry(pc).or_insert_with(|| Subroutine::new(pc));
        sub.set_stack_trace(stack_trace);
        if is_new {
            log::info!("discovered subroutine at {:#08x}", pc);
        }
    }

    pub fn is_subroutine(&self, pc: usize) -> bool {
        self.subroutines.borrow().contains_key(&pc)
    }

    pub fn add_state_change(&self, subroutine_pc: usize, return_pc: usize, change: StateChange) {
        if let Some(sub) = self.subroutines.borrow_mut().get_mut(&subroutine_pc) {
            sub.add_state_change(return_pc, change);
        }
    }

    pub fn mark_stack_manipulation(&self, subroutine_pc: usize) {
        if let Some(sub) = self.subroutines.borrow_mut().get_mut(&subroutine_pc) {
            sub.has_stack_manipulation = true;
        }
        log::warn!("subroutine {:#08x} has stack manipulation across a return", subroutine_pc);
    }

    pub fn add_entry_point(&self, pc: usize, p: u8, subroutine: usize, label: &str) {
        self.entry_points.borrow_mut().insert(EntryPoint { pc, p, subroutine, label: label.to_owned() });
        self.subroutines_by_label.borrow_mut().insert(label.to_owned(), subroutine);
        self.add_subroutine(subroutine, Vec::new());
    }

    pub fn instruction_assertion(&self, pc: usize) -> Option<StateChange> {
        self.assertions.instruction_assertion(pc)
    }

    pub fn set_state_change_after(&self, id: InstructionID, change: StateChange) {
        self.instruction_meta.borrow_mut().entry(id).or_insert((StateChange::new_empty(), StackManipulation::None)).0 = change;
    }

    pub fn state_change_after(&self, id: InstructionID) -> Option<StateChange> {
        self.instruction_meta.borrow().get(&id).map(|(change, _)| *change)
    }

    pub fn set_stack_manipulation(&self, id: InstructionID, kind: StackManipulation) {
        self.instruction_meta.borrow_mut().entry(id).or_insert((StateChange::new_empty(), StackManipulation::None)).1 = kind;
    }

    pub fn stack_manipulation(&self, id: InstructionID) -> StackManipulation {
        self.instruction_meta.borrow().get(&id).map(|(_, kind)| *kind).unwrap_or(StackManipulation::None)
    }

    /// Seed a CPU at the ROM's canonical entry vectors and run each to
    /// completion.
    ///
    /// The reset and NMI handlers are independent subroutines — seeding
    /// both, rather than only `reset`, matters because most SNES programs
    /// spend most of their running time in the NMI (VBLANK) handler.
    pub fn analyze(self: &Rc<Self>) {
        let reset = self.rom.reset_vector();
        self.run_entry_point(reset, "reset");

        let nmi = self.rom.nmi_vector();
        self.run_entry_point(nmi, "nmi");
    }

    fn run_entry_point(self: &Rc<Self>, pc: usize, label: &str) {
        const ENTRY_STATE: u8 = 0b0011_0000; // M=1, X=1

        self.add_entry_point(pc, ENTRY_STATE, pc, label);
        let mut cpu = CPU::new(self, pc, pc, ENTRY_STATE);
        cpu.run();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic_log(data: Vec<u8>) -> Rc<Log> {
        let rom = ROM::from_bytes("synthetic".to_owned(), data).unwrap();
        Log::new(rom, AssertionStore::new())
    }

    fn base_image() -> Vec<u8> {
        let mut data = vec![0u8; 0x8000];
        data[0xFFFC - 0x8000] = 0x00;
        data[0xFFFD - 0x8000] = 0x80;
        data[0xFFEA - 0x8000] = 0x00;
        data[0xFFEB - 0x8000] = 0x00;
        data
    }

    #[test]
    fn test_entry_point_seeding() {
        let log = synthetic_log(base_image());
        log.analyze();

        let entry_points = log.entry_points().borrow();
        assert!(entry_points.contains(&EntryPoint {
            pc: 0x8000,
            p: 0b0011_0000,
            subroutine: 0x8000,
            label: "reset".to_owned(),
        }));
        assert!(entry_points.contains(&EntryPoint {
            pc: 0x0000,
            p: 0b0011_0000,
            subroutine: 0x0000,
            label: "nmi".to_owned(),
        }));
    }
}
