//! The user-supplied override store: forced state-changes and resolved
//! jump/call targets, loaded from a small line-oriented assertion file.
//!
//! Grammar (one directive per line, `#` starts a comment, blank lines
//! ignored):
//!
//! ```text
//! instr    <pc-hex> <state-expr>        # e.g. `instr 8e21 M=0, X=1`
//! jump     <pc-hex> -> <target-hex> [label]
//! jumptable <pc-hex>
//! ```

use std::collections::{HashMap, HashSet};
use std::fs;

use crate::error::Error;
use crate::snes::state::StateChange;

/// One candidate target of an indirect call/jump, with an optional label.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JumpTarget {
    pub label: Option<String>,
    pub target: usize,
}

#[derive(Default)]
pub struct AssertionStore {
    instruction_assertions: HashMap<usize, StateChange>,
    jump_assertions: HashMap<usize, Vec<JumpTarget>>,
    /// Return instructions that are actually disguised jump tables (see
    /// `Instruction::is_jump_table`). Not a field of `Instruction` itself —
    /// membership here is what `is_jump_table` queries — because it's
    /// asserted data, not something derivable from the opcode table.
    jump_table_marks: HashSet<usize>,
}

impl AssertionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instruction_assertion(&self, pc: usize) -> Option<StateChange> {
        self.instruction_assertions.get(&pc).copied()
    }

    pub fn add_instruction_assertion(&mut self, pc: usize, change: StateChange) {
        self.instruction_assertions.insert(pc, change);
    }

    pub fn jump_assertion(&self, pc: usize) -> Option<&[JumpTarget]> {
        self.jump_assertions.get(&pc).map(Vec::as_slice)
    }

    pub fn add_jump_assertion(&mut self, pc: usize, label: Option<String>, target: usize) {
        self.jump_assertions.entry(pc).or_default().push(JumpTarget { label, target });
    }

    pub fn is_jump_table(&self, pc: usize) -> bool {
        self.jump_table_marks.contains(&pc)
    }

    pub fn mark_jump_table(&mut self, pc: usize) {
        self.jump_table_marks.insert(pc);
    }

    /// Load a store from the textual assertion-file format.
    pub fn from_file(path: &str) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, Error> {
        let mut store = Self::new();

        for (n, raw_line) in contents.lines().enumerate() {
            let line = match raw_line.find('#') {
                Some(i) => &raw_line[..i],
                None => raw_line,
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let invalid = |message: &str| Error::InvalidAssertion { line: n + 1, message: message.to_owned() };

            let mut words = line.splitn(2, char::is_whitespace);
            let keyword = words.next().unwrap();
            let rest = words.next().unwrap_or("").trim();

            match keyword {
                "instr" => {
                    let mut parts = rest.splitn(2, char::is_whitespace);
                    let pc = parts.next().ok_or_else(|| invalid("missing pc"))?;
                    let expr = parts.next().ok_or_else(|| invalid("missing state expression"))?;
                    let pc = usize::from_str_radix(pc.trim_start_matches("0x"), 16)
                        .map_err(|_| invalid("malformed pc"))?;
                    let change = StateChange::from_state_expr(expr)
                        .ok_or_else(|| invalid("malformed state expression"))?;
                    store.add_instruction_assertion(pc, change);
                }
                "jump" => {
                    let mut halves = rest.splitn(2, "->");
                    let pc = halves.next().ok_or_else(|| invalid("missing pc"))?.trim();
                    let remainder = halves.next().ok_or_else(|| invalid("missing `-> target`"))?.trim();

                    let mut remainder_words = remainder.splitn(2, char::is_whitespace);
                    let target = remainder_words.next().unwrap_or("").trim();
                    let label = remainder_words.next().map(|l| l.trim().to_owned()).filter(|l| !l.is_empty());

                    let pc = usize::from_str_radix(pc.trim_start_matches("0x"), 16)
                        .map_err(|_| invalid("malformed pc"))?;
                    let target = usize::from_str_radix(target.trim_start_matches("0x"), 16)
                        .map_err(|_| invalid("malformed target"))?;
                    store.add_jump_assertion(pc, label, target);
                }
                "jumptable" => {
                    let pc = usize::from_str_radix(rest.trim_start_matches("0x"), 16)
                        .map_err(|_| invalid("malformed pc"))?;
                    store.mark_jump_table(pc);
                }
                other => return Err(invalid(&format!("unknown directive `{}`", other))),
            }
        }

        Ok(store)
    }
}
