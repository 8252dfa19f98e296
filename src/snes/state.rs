//! Processor mode state (the M/X bits of the 65816 status register) and the
//! symbolic deltas the CPU engine tracks as it walks a subroutine.

use std::fmt;

const M_BIT: u8 = 1 << 5;
const X_BIT: u8 = 1 << 4;

/// The processor's M/X mode bits, packed the same way they live in the real P
/// register. `M=1`/`X=1` mean 8-bit accumulator/index registers.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct State {
    p: u8,
}

impl State {
    /// Build a state from a raw P byte (only bits 4 and 5 are kept).
    pub fn new(p: u8) -> Self {
        Self { p: p & (M_BIT | X_BIT) }
    }

    /// Build a state from explicit M/X values.
    pub fn from_mx(m: bool, x: bool) -> Self {
        let mut p = 0;
        if m {
            p |= M_BIT;
        }
        if x {
            p |= X_BIT;
        }
        Self { p }
    }

    /// The raw P byte, with only bits 4 and 5 ever set.
    pub fn p(&self) -> u8 {
        self.p
    }

    pub fn m(&self) -> bool {
        self.p & M_BIT != 0
    }

    pub fn x(&self) -> bool {
        self.p & X_BIT != 0
    }

    pub fn set_m(&mut self, m: bool) {
        self.set_bit(M_BIT, m);
    }

    pub fn set_x(&mut self, x: bool) {
        self.set_bit(X_BIT, x);
    }

    /// OR the M/X bits of `p` into this state (other bits of `p` are ignored).
    pub fn set(&mut self, p: u8) {
        self.p |= p & (M_BIT | X_BIT);
    }

    /// AND-clear the M/X bits of `p` out of this state.
    pub fn reset(&mut self, p: u8) {
        self.p &= !(p & (M_BIT | X_BIT));
    }

    fn set_bit(&mut self, bit: u8, value: bool) {
        if value {
            self.p |= bit;
        } else {
            self.p &= !bit;
        }
    }

    /// Size in bytes of the accumulator under this state.
    pub fn a_size(&self) -> usize {
        if self.m() {
            1
        } else {
            2
        }
    }

    /// Size in bytes of the index registers under this state.
    pub fn x_size(&self) -> usize {
        if self.x() {
            1
        } else {
            2
        }
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "State(M={}, X={})", self.m() as u8, self.x() as u8)
    }
}

/// Why a [`StateChange`] collapsed to [`StateChange::Unknown`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum UnknownReason {
    /// Propagated straight from an unknown callee, with no local cause.
    Unknown,
    /// A call/jump target could not be resolved, even via assertion.
    IndirectJump,
    /// A PLP/return observed stack content it didn't produce.
    StackManipulation,
    /// An interrupt-class instruction (BRK) was executed.
    SuspectInstruction,
    /// A call site's candidate subroutines disagree on their return state.
    MultipleReturnStates,
}

/// One of the three values a mode bit's delta can take relative to
/// subroutine entry.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Tri {
    Unchanged,
    Set,
    Cleared,
}

impl Tri {
    fn as_option(self) -> Option<bool> {
        match self {
            Tri::Unchanged => None,
            Tri::Set => Some(true),
            Tri::Cleared => Some(false),
        }
    }

    fn from_option(value: Option<bool>) -> Self {
        match value {
            None => Tri::Unchanged,
            Some(true) => Tri::Set,
            Some(false) => Tri::Cleared,
        }
    }
}

/// The net change to M/X observed between a subroutine's entry and some
/// point in its execution (or in its callee's execution, propagated back).
///
/// Modelled as a tagged sum rather than two `Option<bool>` fields plus a
/// disjoint "unknown" flag: this keeps `Unknown` variants with distinct
/// causes from colliding under `Eq`/`Hash`, which the return-state set relies
/// on to retain diagnostic distinctions (see DESIGN.md).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum StateChange {
    Delta { m: Tri, x: Tri },
    Unknown(UnknownReason),
}

impl Default for StateChange {
    fn default() -> Self {
        StateChange::new_empty()
    }
}

impl StateChange {
    /// No change at all (both fields unchanged from subroutine entry).
    pub fn new_empty() -> Self {
        StateChange::Delta { m: Tri::Unchanged, x: Tri::Unchanged }
    }

    pub fn new(m: Option<bool>, x: Option<bool>) -> Self {
        StateChange::Delta { m: Tri::from_option(m), x: Tri::from_option(x) }
    }

    pub fn new_unknown(reason: UnknownReason) -> Self {
        StateChange::Unknown(reason)
    }

    pub fn unknown(&self) -> bool {
        matches!(self, StateChange::Unknown(_))
    }

    pub fn unknown_reason(&self) -> Option<UnknownReason> {
        match self {
            StateChange::Unknown(reason) => Some(*reason),
            _ => None,
        }
    }

    pub fn m(&self) -> Option<bool> {
        match self {
            StateChange::Delta { m, .. } => m.as_option(),
            StateChange::Unknown(_) => None,
        }
    }

    pub fn x(&self) -> Option<bool> {
        match self {
            StateChange::Delta { x, .. } => x.as_option(),
            StateChange::Unknown(_) => None,
        }
    }

    pub fn set_m(&mut self, m: bool) {
        self.set_field_m(Tri::from_option(Some(m)));
    }

    pub fn set_x(&mut self, x: bool) {
        self.set_field_x(Tri::from_option(Some(x)));
    }

    /// Set bits changed to 1, per a raw SEP-style mask. Only touches fields
    /// whose mask bit is actually set; leaves the rest alone.
    pub fn set(&mut self, p_change: u8) {
        let change = State::new(p_change);
        if change.m() {
            self.set_field_m(Tri::Set);
        }
        if change.x() {
            self.set_field_x(Tri::Set);
        }
    }

    /// Clear bits changed to 0, per a raw REP-style mask.
    pub fn reset(&mut self, p_change: u8) {
        let change = State::new(p_change);
        if change.m() {
            self.set_field_m(Tri::Cleared);
        }
        if change.x() {
            self.set_field_x(Tri::Cleared);
        }
    }

    fn set_field_m(&mut self, new_m: Tri) {
        if let StateChange::Delta { m, .. } = self {
            *m = new_m;
        }
    }

    fn set_field_x(&mut self, new_x: Tri) {
        if let StateChange::Delta { x, .. } = self {
            *x = new_x;
        }
    }

    /// Collapse fields that are rendered redundant by a known entry-state
    /// inference: if we now know the subroutine *must* have been entered
    /// with a given M/X, and our delta sets that same field to that same
    /// value, the net change is actually "unchanged".
    pub fn apply_inference(&mut self, inference: StateChange) {
        if let StateChange::Delta { m, x } = self {
            if let (Tri::Set, Some(true)) | (Tri::Cleared, Some(false)) = (*m, inference.m()) {
                *m = Tri::Unchanged;
            }
            if let (Tri::Set, Some(true)) | (Tri::Cleared, Some(false)) = (*x, inference.x()) {
                *x = Tri::Unchanged;
            }
        }
    }

    /// Return a change where any field matching `state`'s current value is
    /// collapsed to "unchanged". `Unknown` changes are returned verbatim.
    pub fn simplify(&self, state: State) -> StateChange {
        match self {
            StateChange::Unknown(_) => *self,
            StateChange::Delta { m, x } => {
                let m = if m.as_option() == Some(state.m()) { Tri::Unchanged } else { *m };
                let x = if x.as_option() == Some(state.x()) { Tri::Unchanged } else { *x };
                StateChange::Delta { m, x }
            }
        }
    }

    /// Parse the small textual form used by instruction/subroutine
    /// assertions: `"none"`, `"M=0"`, `"X=1"`, `"M=0,X=1"`, or `"UNKNOWN"`
    /// (whitespace and case insensitive). `"UNKNOWN"` round-trips to the
    /// generic [`UnknownReason::Unknown`] — the specific reason a change
    /// went unknown is diagnostic-only and isn't recoverable from its
    /// textual form.
    pub fn from_state_expr(expr: &str) -> Option<StateChange> {
        let trimmed = expr.trim();
        if trimmed.eq_ignore_ascii_case("none") {
            return Some(StateChange::new_empty());
        }
        if trimmed.eq_ignore_ascii_case("unknown") {
            return Some(StateChange::new_unknown(UnknownReason::Unknown));
        }
        let mut m = None;
        let mut x = None;
        for part in trimmed.split(',') {
            let part = part.trim();
            let mut kv = part.splitn(2, '=');
            let key = kv.next()?.trim().to_ascii_uppercase();
            let value = kv.next()?.trim();
            let bit = match value {
                "0" => false,
                "1" => true,
                _ => return None,
            };
            match key.as_str() {
                "M" => m = Some(bit),
                "X" => x = Some(bit),
                _ => return None,
            }
        }
        Some(StateChange::new(m, x))
    }

    /// Render the textual form consumed by [`StateChange::from_state_expr`].
    pub fn state_expr(&self) -> String {
        if self.unknown() {
            return "UNKNOWN".to_string();
        }
        let mut parts = Vec::new();
        if let Some(m) = self.m() {
            parts.push(format!("M={}", m as u8));
        }
        if let Some(x) = self.x() {
            parts.push(format!("X={}", x as u8));
        }
        if parts.is_empty() {
            "None".to_string()
        } else {
            parts.join(", ")
        }
    }
}

impl fmt::Display for StateChange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.state_expr())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_defaults_and_sizes() {
        let state = State::from_mx(true, true);
        assert_eq!(state.p(), 0b0011_0000);
        assert_eq!(state.a_size(), 1);
        assert_eq!(state.x_size(), 1);

        let state = State::from_mx(false, true);
        assert_eq!(state.a_size(), 2);
        assert_eq!(state.x_size(), 1);
    }

    #[test]
    fn test_state_set_reset() {
        let mut state = State::new(0);
        state.set(0b0011_0000);
        assert!(state.m());
        assert!(state.x());

        state.reset(0b0011_0000);
        assert!(!state.m());
        assert!(!state.x());
    }

    #[test]
    fn test_state_change_default_is_no_change() {
        let change = StateChange::new_empty();
        assert_eq!(change.m(), None);
        assert_eq!(change.x(), None);
        assert!(!change.unknown());
    }

    #[test]
    fn test_state_change_from_state_expr_round_trip() {
        for expr in ["None", "M=0", "X=1", "M=0, X=1", "M=1, X=0", "UNKNOWN"] {
            let change = StateChange::from_state_expr(expr).unwrap();
            assert_eq!(StateChange::from_state_expr(&change.state_expr()).unwrap(), change);
        }
    }

    #[test]
    fn test_state_change_eq_hash_distinguishes_unknown_reasons() {
        use std::collections::HashSet;
        let mut changes = HashSet::new();
        changes.insert(StateChange::new_unknown(UnknownReason::IndirectJump));
        changes.insert(StateChange::new_unknown(UnknownReason::StackManipulation));
        changes.insert(StateChange::new(Some(true), Some(true)));
        changes.insert(StateChange::new(Some(true), Some(true)));
        assert_eq!(changes.len(), 3);
    }

    #[test]
    fn test_apply_inference() {
        let mut change = StateChange::new(Some(true), Some(true));
        let inference = StateChange::new(Some(true), None);
        change.apply_inference(inference);
        assert_eq!(change.m(), None);
        assert_eq!(change.x(), Some(true));
    }

    #[test]
    fn test_simplify() {
        let state = State::from_mx(false, true);

        assert_eq!(StateChange::new_empty().simplify(state), StateChange::new_empty());
        assert_eq!(StateChange::new(Some(false), None).simplify(state), StateChange::new_empty());
        assert_eq!(
            StateChange::new(Some(false), Some(true)).simplify(state),
            StateChange::new_empty()
        );
        assert_eq!(
            StateChange::new(Some(false), Some(false)).simplify(state),
            StateChange::new(None, Some(false))
        );

        let unknown = StateChange::new_unknown(UnknownReason::Unknown);
        assert_eq!(unknown.simplify(state), unknown);
    }
}
