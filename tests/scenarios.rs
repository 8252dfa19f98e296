//! Integration tests for the engine's six canonical control-flow/state-
//! tracking scenarios, run against small hand-built in-memory LoROM images
//! (reset vector at `$8000`, NMI vector at `$0000`).

use symex816::snes::assertions::AssertionStore;
use symex816::snes::log::Log;
use symex816::snes::rom::ROM;
use symex816::snes::state::{State, StateChange};

const REP: u8 = 0xC2;
const SEP: u8 = 0xE2;
const LDA: u8 = 0xA9;
const LDX: u8 = 0xA2;
const JSR: u8 = 0x20;
const JMP: u8 = 0x4C;
const RTS: u8 = 0x60;
const PHP: u8 = 0x08;
const PLP: u8 = 0x28;

fn rom_with_program(program: &[u8]) -> ROM {
    let mut data = vec![0u8; 0x8000];
    data[..program.len()].copy_from_slice(program);

    data[0x7FD6] = 0x20; // LoROM marker byte
    data[0x7FFC] = 0x00; // reset vector lo
    data[0x7FFD] = 0x80; // reset vector hi -> $8000
    data[0x7FEA] = 0x00; // nmi vector lo
    data[0x7FEB] = 0x00; // nmi vector hi -> $0000

    ROM::from_bytes("scenario".to_owned(), data).unwrap()
}

fn le16(addr: usize) -> [u8; 2] {
    [(addr & 0xFF) as u8, ((addr >> 8) & 0xFF) as u8]
}

#[test]
fn scenario_1_entry_point_seeding() {
    let rom = rom_with_program(&[]);
    let log = Log::new(rom, AssertionStore::new());
    log.analyze();

    let entry_points = log.entry_points().borrow();
    assert!(entry_points.iter().any(|e| e.pc == 0x8000 && e.p == 0b0011_0000 && e.subroutine == 0x8000 && e.label == "reset"));
    assert!(entry_points.iter().any(|e| e.pc == 0x0000 && e.p == 0b0011_0000 && e.subroutine == 0x0000 && e.label == "nmi"));
}

#[test]
fn scenario_2_infinite_loop() {
    // jmp $8000
    let mut program = vec![JMP];
    program.extend(le16(0x8000));

    let rom = rom_with_program(&program);
    let log = Log::new(rom, AssertionStore::new());
    log.analyze();

    assert_eq!(log.instructions().borrow().len(), 1);

    let subroutines = log.subroutines().borrow();
    let reset = &subroutines[&0x8000];
    assert_eq!(reset.instruction_count(), 1);
    let jmp = reset.instructions().next().unwrap();
    assert_eq!(jmp.name(), "jmp");
    assert_eq!(jmp.absolute_argument(), Some(0x8000));
}

#[test]
fn scenario_3_state_change_across_call() {
    // reset: rep #$30; lda #$1234; ldx #$5678; jsr $800E
    // $800E: rep #$30; rts
    let mut program = vec![REP, 0x30, LDA, 0x34, 0x12, LDX, 0x78, 0x56, JSR];
    program.extend(le16(0x800E));
    program.resize(0x800E - 0x8000, 0); // pad up to the callee
    program.extend([REP, 0x30, RTS]);

    let rom = rom_with_program(&program);
    let log = Log::new(rom, AssertionStore::new());
    log.analyze();

    assert_eq!(log.instructions().borrow().len(), 7);

    let subroutines = log.subroutines().borrow();
    let callee = &subroutines[&0x800E];
    assert_eq!(callee.state_changes.len(), 1);
    let (_, change) = callee.state_changes.iter().next().unwrap();
    assert_eq!(*change, StateChange::new(Some(false), Some(false)));

    let instructions = log.instructions().borrow();
    let lda = instructions.values().find(|i| i.pc() == 0x8002 && i.name() == "lda").unwrap();
    assert_eq!(lda.argument_size(), 2);
    let ldx = instructions.values().find(|i| i.pc() == 0x8005 && i.name() == "ldx").unwrap();
    assert_eq!(ldx.argument_size(), 2);
}

#[test]
fn scenario_4_elidable_state_change() {
    // reset (entry M=1,X=1): jsr $800E; rts
    // $800E (inherits M=1,X=1): rep #$20 (M -> 0); sep #$20 (M -> 1, back to entry); rts
    let mut program = vec![JSR];
    program.extend(le16(0x800E));
    program.push(RTS);
    program.resize(0x800E - 0x8000, 0);
    program.extend([REP, 0x20, SEP, 0x20, RTS]);

    let rom = rom_with_program(&program);
    let log = Log::new(rom, AssertionStore::new());
    log.analyze();

    let entry_state = State::from_mx(true, true);
    let subroutines = log.subroutines().borrow();

    let reset = &subroutines[&0x8000];
    assert_eq!(reset.resolved_return_state(entry_state), StateChange::new_empty());

    let callee = &subroutines[&0x800E];
    assert_eq!(callee.resolved_return_state(entry_state), StateChange::new_empty());
}

#[test]
fn scenario_5_php_plp_fence() {
    // reset: jsr $800E; rts
    // $800E: php; sep #$20; plp; rts
    let mut program = vec![JSR];
    program.extend(le16(0x800E));
    program.push(RTS);
    program.resize(0x800E - 0x8000, 0);
    program.extend([PHP, SEP, 0x20, PLP, RTS]);

    let rom = rom_with_program(&program);
    let log = Log::new(rom, AssertionStore::new());
    log.analyze();

    let subroutines = log.subroutines().borrow();
    let callee = &subroutines[&0x800E];
    assert_eq!(callee.state_changes.len(), 1);
    let (_, change) = callee.state_changes.iter().next().unwrap();
    assert_eq!(change.m(), None);
    assert_eq!(change.x(), None);
}

#[test]
fn scenario_6_jump_inside_subroutine() {
    // $8000: jmp $8005; (gap, unreached); $8005: rep #$20; rts
    let mut program = vec![JMP];
    program.extend(le16(0x8005));
    program.resize(0x8005 - 0x8000, 0);
    program.extend([REP, 0x20, RTS]);

    let rom = rom_with_program(&program);
    let log = Log::new(rom, AssertionStore::new());
    log.analyze();

    let subroutines = log.subroutines().borrow();
    let reset = &subroutines[&0x8000];
    assert_eq!(reset.state_changes.len(), 1);
    let (_, change) = reset.state_changes.iter().next().unwrap();
    assert_eq!(change.m(), Some(false));
}
