//! Instruction-level tests driving the core through its public API.

use copro_core::{Coprocessor, Observable, SimpleBus, Value};
use intel_8086::{
    BOUND_RANGE, CF, DIVIDE_ERROR, HardwareProfile, I86, IF, INVALID_OPCODE, NO_FPU, OF, SF,
    SINGLE_STEP, Segment, TF, ZF,
};

/// Code runs from 0100:0000 (linear 0x1000).
const CODE_SEG: u16 = 0x0100;
/// Stack at 2000:0100 (linear 0x20100), growing down.
const STACK_SEG: u16 = 0x2000;
const STACK_TOP: u16 = 0x0100;
/// Handlers live in segment 0x0300 (linear 0x3000).
const HANDLER_SEG: u16 = 0x0300;

fn load(cpu: &mut I86, bus: &mut SimpleBus, address: u32, bytes: &[u8]) {
    for (i, &byte) in bytes.iter().enumerate() {
        cpu.write_byte(bus, address + i as u32, byte);
    }
}

fn load_word(cpu: &mut I86, bus: &mut SimpleBus, address: u32, value: u16) {
    load(cpu, bus, address, &value.to_le_bytes());
}

fn peek_word(cpu: &mut I86, bus: &mut SimpleBus, address: u32) -> u16 {
    u16::from_le_bytes([cpu.read_byte(bus, address), cpu.read_byte(bus, address + 1)])
}

/// Point an interrupt vector at `HANDLER_SEG:offset`.
fn set_vector(cpu: &mut I86, bus: &mut SimpleBus, vector: u8, offset: u16) {
    let entry = u32::from(vector) * 4;
    load_word(cpu, bus, entry, offset);
    load_word(cpu, bus, entry + 2, HANDLER_SEG);
}

/// Reset, drop the boot overlay, and load a program at 0100:0000.
fn setup_program(profile: HardwareProfile, program: &[u8]) -> (I86, SimpleBus) {
    let mut cpu = I86::new(profile).expect("valid profile");
    let mut bus = SimpleBus::new();
    cpu.reset();
    cpu.read_byte(&mut bus, profile.rom_base());
    assert!(!cpu.memory().boot_flag(), "ROM access should clear the overlay");
    load(&mut cpu, &mut bus, 0x1000, program);
    cpu.regs.set_seg(Segment::Cs, CODE_SEG);
    cpu.regs.ip = 0;
    cpu.regs.set_seg(Segment::Ss, STACK_SEG);
    cpu.regs.set_sp(STACK_TOP);
    (cpu, bus)
}

fn run_instructions(cpu: &mut I86, bus: &mut SimpleBus, count: usize) {
    for _ in 0..count {
        cpu.step_instruction(bus);
    }
}

#[test]
fn reset_state_8086_family() {
    let mut cpu = I86::new(HardwareProfile::ACORN_186).expect("valid profile");
    cpu.regs.set_ax(0x1234);
    cpu.reset();
    assert_eq!(cpu.regs.cs(), 0xFFFF);
    assert_eq!(cpu.regs.ip, 0x0000);
    assert_eq!(cpu.regs.ax(), 0);
    assert_eq!(cpu.regs.flags.0, 0x0002);
    assert_eq!(cpu.pc(), 0xF_FFF0);
    assert!(cpu.memory().boot_flag());
    assert!(!cpu.is_halted());
    assert_eq!(cpu.pending_interrupt(), None);
}

#[test]
fn reset_state_80286() {
    let mut cpu = I86::new(HardwareProfile::ACORN_286).expect("valid profile");
    cpu.reset();
    assert_eq!(cpu.regs.cs(), 0xF000);
    assert_eq!(cpu.regs.ip, 0xFFF0);
    assert_eq!(cpu.regs.msw, 0xFFF0);
    assert!(!cpu.protected_mode());
}

#[test]
fn boot_overlay_then_ram() {
    let mut cpu = I86::new(HardwareProfile::ACORN_186).expect("valid profile");
    let mut bus = SimpleBus::new();
    let rom: Vec<u8> = (0..0x4000u32).map(|i| (i as u8).wrapping_mul(3) | 1).collect();
    cpu.load_rom(&rom);
    cpu.reset();

    // Low address reads ROM while the overlay is active.
    assert_eq!(cpu.read_byte(&mut bus, 0x0_0010), rom[0x10]);
    assert!(cpu.memory().boot_flag());

    // First access at the ROM base clears it.
    assert_eq!(cpu.read_byte(&mut bus, 0xF_0000), rom[0]);
    assert!(!cpu.memory().boot_flag());

    // Now the same low address is zeroed RAM.
    assert_eq!(cpu.read_byte(&mut bus, 0x0_0010), 0);
}

#[test]
fn first_fetch_comes_from_rom() {
    let mut cpu = I86::new(HardwareProfile::ACORN_186).expect("valid profile");
    let mut bus = SimpleBus::new();
    let mut rom = vec![0x90; 0x4000];
    // FFFF:0000 is linear 0xFFFF0, ROM offset 0x3FF0: JMP 0100:0000
    rom[0x3FF0..0x3FF5].copy_from_slice(&[0xEA, 0x00, 0x00, 0x00, 0x01]);
    cpu.load_rom(&rom);
    cpu.reset();

    cpu.step_instruction(&mut bus);

    assert_eq!(cpu.regs.cs(), 0x0100);
    assert_eq!(cpu.regs.ip, 0x0000);
    assert!(!cpu.memory().boot_flag(), "fetch from ROM region drops overlay");
}

/// Boot from ROM alone: the reset vector jumps to F000:0000, which touches
/// DS=FFFF:FFFF, stores 42h at 0000:0100 and halts.
fn boot_from_rom(profile: HardwareProfile) {
    let mut cpu = I86::new(profile).expect("valid profile");
    let mut bus = SimpleBus::new();
    let mut rom = vec![0x90; 0x4000];
    rom[..19].copy_from_slice(&[
        0xB8, 0xFF, 0xFF, // MOV AX,FFFFh
        0x8E, 0xD8, // MOV DS,AX
        0xA0, 0xFF, 0xFF, // MOV AL,[FFFFh]
        0xB8, 0x00, 0x00, // MOV AX,0
        0x8E, 0xD8, // MOV DS,AX
        0xC6, 0x06, 0x00, 0x01, 0x42, // MOV BYTE [0100h],42h
        0xF4, // HLT
    ]);
    // Both reset vectors (FFFF:0000 and F000:FFF0) land on ROM offset 3FF0.
    rom[0x3FF0..0x3FF5].copy_from_slice(&[0xEA, 0x00, 0x00, 0x00, 0xF0]);
    cpu.load_rom(&rom);
    cpu.reset();
    assert!(cpu.memory().boot_flag());

    cpu.exec(&mut bus, 10_000);

    let name = profile.model.name();
    assert!(!cpu.memory().boot_flag(), "{name}: overlay cleared by the CPU");
    assert!(cpu.is_halted(), "{name}: reached HLT");
    assert_eq!(cpu.regs.cs(), 0xF000, "{name}");
    assert_eq!(cpu.regs.ip, 19, "{name}");
    assert_eq!(cpu.memory().ram()[0x100], 0x42, "{name}: RAM write landed");
}

#[test]
fn torch_graduate_boots_from_rom() {
    boot_from_rom(HardwareProfile::TORCH_GRADUATE);
}

#[test]
fn master_512_boots_from_rom() {
    boot_from_rom(HardwareProfile::ACORN_186);
}

#[test]
fn abc_300_boots_from_rom() {
    boot_from_rom(HardwareProfile::ACORN_286);
}

#[test]
fn rom_writes_are_ignored_after_boot() {
    let mut cpu = I86::new(HardwareProfile::ACORN_186).expect("valid profile");
    let mut bus = SimpleBus::new();
    cpu.load_rom(&[0xC3; 0x4000]);
    cpu.reset();
    cpu.read_byte(&mut bus, 0xF_0000);
    cpu.write_byte(&mut bus, 0xF_1234, 0x00);
    assert_eq!(cpu.read_byte(&mut bus, 0xF_1234), 0xC3);
}

#[test]
fn add_byte_overflow_to_negative() {
    // MOV AL,7Fh; ADD AL,1
    let (mut cpu, mut bus) = setup_program(HardwareProfile::ACORN_186, &[0xB0, 0x7F, 0x04, 0x01]);
    run_instructions(&mut cpu, &mut bus, 2);
    assert_eq!(cpu.regs.al(), 0x80);
    assert!(cpu.regs.flags.is_set(OF), "OF should be set");
    assert!(cpu.regs.flags.is_set(SF), "SF should be set");
    assert!(!cpu.regs.flags.is_set(ZF), "ZF should be clear");
    assert!(!cpu.regs.flags.is_set(CF), "CF should be clear");
}

#[test]
fn byte_register_writes_alias_word_register() {
    // MOV AX,1234h; MOV AH,0ABh
    let (mut cpu, mut bus) =
        setup_program(HardwareProfile::ACORN_186, &[0xB8, 0x34, 0x12, 0xB4, 0xAB]);
    run_instructions(&mut cpu, &mut bus, 2);
    assert_eq!(cpu.regs.ax(), 0xAB34);
    assert_eq!(cpu.regs.al(), 0x34);
}

#[test]
fn nmi_transfer_stack_layout() {
    let (mut cpu, mut bus) = setup_program(HardwareProfile::ACORN_186, &[0x90]);
    set_vector(&mut cpu, &mut bus, 2, 0x0010);
    load(&mut cpu, &mut bus, 0x3010, &[0x90]);
    cpu.regs.flags.set(IF | CF);

    cpu.set_nmi(true);
    cpu.step_instruction(&mut bus);

    assert_eq!(cpu.regs.cs(), HANDLER_SEG);
    assert_eq!(cpu.regs.ip, 0x0011, "handler's first instruction ran");
    assert_eq!(cpu.regs.sp(), STACK_TOP - 6);
    assert!(!cpu.regs.flags.is_set(IF), "IF cleared by the transfer");
    assert!(!cpu.regs.flags.is_set(TF), "TF cleared by the transfer");

    let base = 0x2_0000 + u32::from(cpu.regs.sp());
    assert_eq!(peek_word(&mut cpu, &mut bus, base), 0x0000, "IP pushed last");
    assert_eq!(peek_word(&mut cpu, &mut bus, base + 2), CODE_SEG, "CS pushed second");
    assert_eq!(
        peek_word(&mut cpu, &mut bus, base + 4),
        0xF000 | 0x0002 | IF | CF,
        "FLAGS pushed first"
    );
}

#[test]
fn nmi_ignores_interrupt_enable() {
    let (mut cpu, mut bus) = setup_program(HardwareProfile::ACORN_186, &[0x90]);
    set_vector(&mut cpu, &mut bus, 2, 0x0000);
    load(&mut cpu, &mut bus, 0x3000, &[0x90]);
    assert!(!cpu.regs.flags.is_set(IF));
    cpu.set_nmi(true);
    cpu.step_instruction(&mut bus);
    assert_eq!(cpu.regs.cs(), HANDLER_SEG);
}

#[test]
fn maskable_interrupt_waits_for_sti() {
    // NOP; STI; NOP
    let (mut cpu, mut bus) = setup_program(HardwareProfile::ACORN_186, &[0x90, 0xFB, 0x90]);
    set_vector(&mut cpu, &mut bus, 0x20, 0x0000);
    load(&mut cpu, &mut bus, 0x3000, &[0x90]);
    cpu.set_irq_vector(0x20);
    cpu.set_irq(true);

    run_instructions(&mut cpu, &mut bus, 2);
    assert_eq!(cpu.regs.cs(), CODE_SEG, "IF clear: no transfer yet");
    assert_eq!(cpu.regs.ip, 2);

    cpu.step_instruction(&mut bus);
    assert_eq!(cpu.regs.cs(), HANDLER_SEG);
    assert_eq!(cpu.regs.ip, 1);
    let base = 0x2_0000 + u32::from(cpu.regs.sp());
    assert_eq!(peek_word(&mut cpu, &mut bus, base), 2, "return to the instruction after STI");
}

#[test]
fn loadall_on_8088_raises_invalid_opcode() {
    let (mut cpu, mut bus) = setup_program(HardwareProfile::TORCH_GRADUATE, &[0x0F, 0x05]);
    let before = cpu.registers();

    cpu.step_instruction(&mut bus);

    assert_eq!(cpu.pending_interrupt(), Some(INVALID_OPCODE));
    assert_eq!(cpu.registers(), before, "no register touched by LOADALL body");
}

#[test]
fn loadall_on_80286_reloads_registers() {
    let (mut cpu, mut bus) = setup_program(HardwareProfile::ACORN_286, &[0x0F, 0x05]);
    load_word(&mut cpu, &mut bus, 0x806, 0xFFF0);
    load_word(&mut cpu, &mut bus, 0x818, 0x0003);
    load_word(&mut cpu, &mut bus, 0x81A, 0x0040);
    load_word(&mut cpu, &mut bus, 0x822, 0x0100);
    load_word(&mut cpu, &mut bus, 0x82C, 0x0FF0);
    load_word(&mut cpu, &mut bus, 0x832, 0x2222);
    load_word(&mut cpu, &mut bus, 0x834, 0x1111);
    // GDTR cache: base 0x001000, limit 0x00FF
    load(&mut cpu, &mut bus, 0x84E, &[0x00, 0x10, 0x00, 0x00, 0xFF, 0x00]);

    cpu.step_instruction(&mut bus);

    assert_eq!(cpu.pending_interrupt(), None);
    assert_eq!(cpu.regs.ax(), 0x1111);
    assert_eq!(cpu.regs.cx(), 0x2222);
    assert_eq!(cpu.regs.sp(), 0x0FF0);
    assert_eq!(cpu.regs.ip, 0x0040);
    assert_eq!(cpu.regs.cs(), 0x0100);
    assert_eq!(cpu.regs.ds(), 0x0000);
    assert_eq!(cpu.regs.flags.0, 0x0003);
    assert_eq!(cpu.regs.gdtr.base, 0x1000);
    assert_eq!(cpu.regs.gdtr.limit, 0x00FF);
}

#[test]
fn exec_consumes_exact_budget() {
    let (mut cpu, mut bus) = setup_program(HardwareProfile::ACORN_186, &[0x90; 8]);

    // NOP costs 3; three of them exactly spend 9.
    cpu.exec(&mut bus, 9);

    assert_eq!(cpu.regs.ip, 3, "no fourth instruction");
    assert_eq!(cpu.budget(), 0);
    assert_eq!(cpu.total_cycles(), 9);

    cpu.exec(&mut bus, 3);
    assert_eq!(cpu.regs.ip, 4);
}

#[test]
fn exec_overrun_carries_into_next_call() {
    // MOV AL,imm costs 4
    let (mut cpu, mut bus) = setup_program(HardwareProfile::ACORN_186, &[0xB0, 0x01, 0xB0, 0x02]);
    cpu.exec(&mut bus, 1);
    assert_eq!(cpu.regs.ip, 2);
    assert_eq!(cpu.budget(), -3);
    cpu.exec(&mut bus, 3);
    assert_eq!(cpu.regs.ip, 2, "budget still not positive");
    cpu.exec(&mut bus, 1);
    assert_eq!(cpu.regs.al(), 0x02);
}

#[test]
fn rep_movsb_copies_block() {
    let (mut cpu, mut bus) = setup_program(HardwareProfile::ACORN_186, &[0xF3, 0xA4]);
    load(&mut cpu, &mut bus, 0x2000, &[1, 2, 3, 4]);
    cpu.regs.set_si(0x2000);
    cpu.regs.set_di(0x3000);
    cpu.regs.set_cx(4);

    let cycles = cpu.step_instruction(&mut bus);

    for i in 0..4 {
        assert_eq!(cpu.read_byte(&mut bus, 0x3000 + i), i as u8 + 1);
    }
    assert_eq!(cpu.regs.cx(), 0);
    assert_eq!(cpu.regs.si(), 0x2004);
    assert_eq!(cpu.regs.di(), 0x3004);
    assert_eq!(cpu.regs.ip, 2);
    assert_eq!(cycles, 2 + 18 + 4 * 18);
}

#[test]
fn movsw_backwards_with_direction_flag() {
    // STD; MOVSW
    let (mut cpu, mut bus) = setup_program(HardwareProfile::ACORN_186, &[0xFD, 0xA5]);
    load(&mut cpu, &mut bus, 0x2000, &[0xCD, 0xAB]);
    cpu.regs.set_si(0x2000);
    cpu.regs.set_di(0x3000);
    run_instructions(&mut cpu, &mut bus, 2);
    assert_eq!(peek_word(&mut cpu, &mut bus, 0x3000), 0xABCD);
    assert_eq!(cpu.regs.si(), 0x1FFE);
    assert_eq!(cpu.regs.di(), 0x2FFE);
}

#[test]
fn repne_scasb_stops_on_match() {
    let (mut cpu, mut bus) = setup_program(HardwareProfile::ACORN_186, &[0xF2, 0xAE]);
    load(&mut cpu, &mut bus, 0x3000, &[0x11, 0x22, 0x33, 0x44]);
    cpu.regs.set_di(0x3000);
    cpu.regs.set_al(0x33);
    cpu.regs.set_cx(10);

    cpu.step_instruction(&mut bus);

    assert!(cpu.regs.flags.is_set(ZF));
    assert_eq!(cpu.regs.cx(), 7);
    assert_eq!(cpu.regs.di(), 0x3003);
}

#[test]
fn segment_override_applies_to_next_opcode() {
    // ES: MOV AL,[BX]
    let (mut cpu, mut bus) = setup_program(HardwareProfile::ACORN_186, &[0x26, 0x8A, 0x07]);
    load(&mut cpu, &mut bus, 0x4010, &[0xAB]);
    load(&mut cpu, &mut bus, 0x0010, &[0xCD]);
    cpu.regs.set_seg(Segment::Es, 0x0400);
    cpu.regs.set_reg16(3, 0x0010);

    cpu.step_instruction(&mut bus);

    assert_eq!(cpu.regs.al(), 0xAB);
    assert_eq!(cpu.regs.ip, 3);
}

#[test]
fn divide_by_zero_restarts_on_80186() {
    // MOV BL,0; DIV BL
    let program = [0xB3, 0x00, 0xF6, 0xF3];
    let (mut cpu, mut bus) = setup_program(HardwareProfile::ACORN_186, &program);
    run_instructions(&mut cpu, &mut bus, 2);
    assert_eq!(cpu.pending_interrupt(), Some(DIVIDE_ERROR));
    assert_eq!(cpu.regs.ip, 2, "80186 reports the faulting instruction");

    let (mut cpu, mut bus) = setup_program(HardwareProfile::TORCH_GRADUATE, &program);
    run_instructions(&mut cpu, &mut bus, 2);
    assert_eq!(cpu.pending_interrupt(), Some(DIVIDE_ERROR));
    assert_eq!(cpu.regs.ip, 4, "8088 reports the next instruction");
}

#[test]
fn divide_overflow_faults() {
    // MOV AX,1000h; MOV BL,2; DIV BL  (quotient 800h does not fit AL)
    let (mut cpu, mut bus) = setup_program(
        HardwareProfile::ACORN_186,
        &[0xB8, 0x00, 0x10, 0xB3, 0x02, 0xF6, 0xF3],
    );
    run_instructions(&mut cpu, &mut bus, 3);
    assert_eq!(cpu.pending_interrupt(), Some(DIVIDE_ERROR));
    assert_eq!(cpu.regs.ax(), 0x1000, "AX unchanged");
}

#[test]
fn multiply_and_divide_word() {
    // MOV AX,1234h; MOV BX,0100h; MUL BX; DIV BX
    let (mut cpu, mut bus) = setup_program(
        HardwareProfile::ACORN_186,
        &[0xB8, 0x34, 0x12, 0xBB, 0x00, 0x01, 0xF7, 0xE3, 0xF7, 0xF3],
    );
    run_instructions(&mut cpu, &mut bus, 3);
    assert_eq!(cpu.regs.ax(), 0x3400);
    assert_eq!(cpu.regs.dx(), 0x0012);
    assert!(cpu.regs.flags.is_set(CF) && cpu.regs.flags.is_set(OF));

    cpu.step_instruction(&mut bus);
    assert_eq!(cpu.regs.ax(), 0x1234);
    assert_eq!(cpu.regs.dx(), 0x0000);
}

#[test]
fn signed_divide_truncates_toward_zero() {
    // MOV AX,-7; CWD; MOV BX,2; IDIV BX
    let (mut cpu, mut bus) = setup_program(
        HardwareProfile::ACORN_186,
        &[0xB8, 0xF9, 0xFF, 0x99, 0xBB, 0x02, 0x00, 0xF7, 0xFB],
    );
    run_instructions(&mut cpu, &mut bus, 4);
    assert_eq!(cpu.regs.ax(), (-3i16) as u16);
    assert_eq!(cpu.regs.dx(), (-1i16) as u16);
}

#[test]
fn shifts_and_rotates() {
    // MOV AL,81h; MOV CL,2; SHL AL,CL
    let (mut cpu, mut bus) =
        setup_program(HardwareProfile::ACORN_186, &[0xB0, 0x81, 0xB1, 0x02, 0xD2, 0xE0]);
    run_instructions(&mut cpu, &mut bus, 3);
    assert_eq!(cpu.regs.al(), 0x04);
    assert!(!cpu.regs.flags.is_set(CF));

    // MOV AL,80h; SAR AL,1; ROL AL,4
    let (mut cpu, mut bus) = setup_program(
        HardwareProfile::ACORN_186,
        &[0xB0, 0x80, 0xD0, 0xF8, 0xC0, 0xC0, 0x04],
    );
    run_instructions(&mut cpu, &mut bus, 2);
    assert_eq!(cpu.regs.al(), 0xC0);
    cpu.step_instruction(&mut bus);
    assert_eq!(cpu.regs.al(), 0x0C);
}

#[test]
fn immediate_shift_needs_80186() {
    let (mut cpu, mut bus) = setup_program(HardwareProfile::TORCH_GRADUATE, &[0xC0, 0xC0, 0x04]);
    cpu.step_instruction(&mut bus);
    assert_eq!(cpu.pending_interrupt(), Some(INVALID_OPCODE));
    assert_eq!(cpu.regs.ip, 0);
}

#[test]
fn int_and_iret_round_trip() {
    // INT 21h; NOP
    let (mut cpu, mut bus) = setup_program(HardwareProfile::ACORN_186, &[0xCD, 0x21, 0x90]);
    set_vector(&mut cpu, &mut bus, 0x21, 0x0000);
    load(&mut cpu, &mut bus, 0x3000, &[0xCF]);
    cpu.regs.flags.set(CF);

    cpu.step_instruction(&mut bus);
    assert_eq!(cpu.pending_interrupt(), Some(0x21));
    assert_eq!(cpu.regs.ip, 2);

    // Transfer plus IRET.
    cpu.step_instruction(&mut bus);
    assert_eq!(cpu.regs.cs(), CODE_SEG);
    assert_eq!(cpu.regs.ip, 2);
    assert_eq!(cpu.regs.sp(), STACK_TOP);
    assert!(cpu.regs.flags.is_set(CF), "IRET restores FLAGS");
}

#[test]
fn trap_flag_single_steps() {
    let (mut cpu, mut bus) = setup_program(HardwareProfile::ACORN_186, &[0x90, 0x90]);
    set_vector(&mut cpu, &mut bus, SINGLE_STEP, 0x0000);
    load(&mut cpu, &mut bus, 0x3000, &[0x90]);
    cpu.regs.flags.set(TF);

    cpu.step_instruction(&mut bus);
    assert_eq!(cpu.regs.ip, 1);
    assert_eq!(cpu.pending_interrupt(), Some(SINGLE_STEP));

    cpu.step_instruction(&mut bus);
    assert_eq!(cpu.regs.cs(), HANDLER_SEG);
    assert!(!cpu.regs.flags.is_set(TF), "handler runs untraced");
    assert_eq!(cpu.pending_interrupt(), None);
    let base = 0x2_0000 + u32::from(cpu.regs.sp());
    assert_eq!(peek_word(&mut cpu, &mut bus, base), 1);
    assert_ne!(peek_word(&mut cpu, &mut bus, base + 4) & TF, 0);
}

#[test]
fn pusha_popa_round_trip() {
    // MOV AX,1; MOV CX,2; PUSHA; MOV AX,0; MOV CX,0; POPA
    let program = [
        0xB8, 0x01, 0x00, 0xB9, 0x02, 0x00, 0x60, 0xB8, 0x00, 0x00, 0xB9, 0x00, 0x00, 0x61,
    ];
    let (mut cpu, mut bus) = setup_program(HardwareProfile::ACORN_186, &program);
    run_instructions(&mut cpu, &mut bus, 3);
    assert_eq!(cpu.regs.sp(), STACK_TOP - 16);
    assert_eq!(
        peek_word(&mut cpu, &mut bus, 0x2_0000 + u32::from(STACK_TOP) - 2),
        1,
        "AX pushed first"
    );
    run_instructions(&mut cpu, &mut bus, 3);
    assert_eq!(cpu.regs.ax(), 1);
    assert_eq!(cpu.regs.cx(), 2);
    assert_eq!(cpu.regs.sp(), STACK_TOP);
}

#[test]
fn pusha_is_invalid_on_8088() {
    let (mut cpu, mut bus) = setup_program(HardwareProfile::TORCH_GRADUATE, &[0x60]);
    cpu.step_instruction(&mut bus);
    assert_eq!(cpu.pending_interrupt(), Some(INVALID_OPCODE));
    assert_eq!(cpu.regs.sp(), STACK_TOP);
}

#[test]
fn enter_and_leave() {
    // MOV BP,1234h; ENTER 8,0; LEAVE; ENTER 4,1
    let program = [
        0xBD, 0x34, 0x12, 0xC8, 0x08, 0x00, 0x00, 0xC9, 0xC8, 0x04, 0x00, 0x01,
    ];
    let (mut cpu, mut bus) = setup_program(HardwareProfile::ACORN_186, &program);
    run_instructions(&mut cpu, &mut bus, 2);
    assert_eq!(cpu.regs.bp(), STACK_TOP - 2);
    assert_eq!(cpu.regs.sp(), STACK_TOP - 10);

    cpu.step_instruction(&mut bus);
    assert_eq!(cpu.regs.bp(), 0x1234);
    assert_eq!(cpu.regs.sp(), STACK_TOP);

    cpu.step_instruction(&mut bus);
    assert_eq!(cpu.regs.bp(), STACK_TOP - 2);
    assert_eq!(cpu.regs.sp(), STACK_TOP - 8);
    let frame_link = peek_word(&mut cpu, &mut bus, 0x2_0000 + u32::from(STACK_TOP) - 4);
    assert_eq!(frame_link, STACK_TOP - 2);
}

#[test]
fn bound_out_of_range_faults() {
    // MOV AX,5; BOUND AX,[0500h]
    let program = [0xB8, 0x05, 0x00, 0x62, 0x06, 0x00, 0x05];
    let (mut cpu, mut bus) = setup_program(HardwareProfile::ACORN_186, &program);
    load_word(&mut cpu, &mut bus, 0x500, 0);
    load_word(&mut cpu, &mut bus, 0x502, 4);
    run_instructions(&mut cpu, &mut bus, 2);
    assert_eq!(cpu.pending_interrupt(), Some(BOUND_RANGE));
    assert_eq!(cpu.regs.ip, 3);
}

#[test]
fn esc_traps_without_coprocessor() {
    let (mut cpu, mut bus) = setup_program(HardwareProfile::ACORN_186, &[0xD8, 0xC0]);
    cpu.step_instruction(&mut bus);
    assert_eq!(cpu.pending_interrupt(), Some(NO_FPU));
    assert_eq!(cpu.regs.ip, 0);

    let (mut cpu, mut bus) =
        setup_program(HardwareProfile::ACORN_186.with_fpu(true), &[0xD8, 0xC0]);
    cpu.step_instruction(&mut bus);
    assert_eq!(cpu.pending_interrupt(), None);
    assert_eq!(cpu.regs.ip, 2);
}

#[test]
fn tube_window_accesses_reach_host() {
    // MOV AX,E000h; MOV DS,AX; MOV AL,5Ah; MOV [0010h],AL; MOV AL,[0020h]
    let program = [
        0xB8, 0x00, 0xE0, 0x8E, 0xD8, 0xB0, 0x5A, 0xA2, 0x10, 0x00, 0xA0, 0x20, 0x00,
    ];
    let (mut cpu, mut bus) = setup_program(HardwareProfile::ACORN_186, &program);
    bus.poke(0xE_0020, 0x77);
    run_instructions(&mut cpu, &mut bus, 5);
    assert_eq!(bus.peek(0xE_0010), Some(0x5A));
    assert_eq!(cpu.regs.al(), 0x77);
}

#[test]
fn tube_wait_states_are_charged() {
    // MOV AL,[0020h] with DS=E000h
    let (mut cpu, _) = setup_program(HardwareProfile::ACORN_186, &[0xA0, 0x20, 0x00]);
    let mut bus = SimpleBus::new().with_wait(5);
    cpu.regs.set_seg(Segment::Ds, 0xE000);
    let cycles = cpu.step_instruction(&mut bus);
    assert_eq!(cycles, 10 + 5);
}

#[test]
fn tube_registers_via_io_ports() {
    // MOV AL,42h; OUT 82h,AL; IN AL,84h
    let program = [0xB0, 0x42, 0xE6, 0x82, 0xE4, 0x84];
    let (mut cpu, mut bus) = setup_program(HardwareProfile::ACORN_186, &program);
    bus.set_register(2, 0x99);
    run_instructions(&mut cpu, &mut bus, 3);
    assert_eq!(bus.register(1), 0x42);
    assert_eq!(cpu.regs.al(), 0x99);
}

#[test]
fn descriptor_table_registers_on_80286() {
    // LGDT [0500h]; SGDT [0600h]; SMSW AX
    let program = [
        0x0F, 0x01, 0x16, 0x00, 0x05, 0x0F, 0x01, 0x06, 0x00, 0x06, 0x0F, 0x01, 0xE0,
    ];
    let (mut cpu, mut bus) = setup_program(HardwareProfile::ACORN_286, &program);
    load(&mut cpu, &mut bus, 0x500, &[0x27, 0x00, 0x45, 0x23, 0x01, 0x00]);

    run_instructions(&mut cpu, &mut bus, 3);

    assert_eq!(cpu.regs.gdtr.base, 0x01_2345);
    assert_eq!(cpu.regs.gdtr.limit, 0x0027);
    let stored: Vec<u8> = (0..6).map(|i| cpu.read_byte(&mut bus, 0x600 + i)).collect();
    assert_eq!(stored, [0x27, 0x00, 0x45, 0x23, 0x01, 0xFF]);
    assert_eq!(cpu.regs.ax(), 0xFFF0);
}

#[test]
fn lmsw_enters_protected_mode() {
    // MOV AX,1; LMSW AX
    let (mut cpu, mut bus) =
        setup_program(HardwareProfile::ACORN_286, &[0xB8, 0x01, 0x00, 0x0F, 0x01, 0xF0]);
    run_instructions(&mut cpu, &mut bus, 2);
    assert!(cpu.protected_mode());
    assert_eq!(cpu.regs.msw, 0xFFF1);
}

#[test]
fn real_mode_rejects_protected_only_opcodes() {
    // SLDT AX
    let (mut cpu, mut bus) = setup_program(HardwareProfile::ACORN_286, &[0x0F, 0x00, 0xC0]);
    cpu.step_instruction(&mut bus);
    assert_eq!(cpu.pending_interrupt(), Some(INVALID_OPCODE));
}

#[test]
fn halt_waits_for_external_interrupt() {
    // STI; HLT; NOP
    let (mut cpu, mut bus) = setup_program(HardwareProfile::ACORN_186, &[0xFB, 0xF4, 0x90]);
    set_vector(&mut cpu, &mut bus, 0x30, 0x0000);
    load(&mut cpu, &mut bus, 0x3000, &[0x90]);

    run_instructions(&mut cpu, &mut bus, 2);
    assert!(cpu.is_halted());

    cpu.exec(&mut bus, 100);
    assert!(cpu.is_halted());
    assert_eq!(cpu.budget(), 0, "idle time is not banked");
    assert_eq!(cpu.regs.ip, 2);

    cpu.set_irq_vector(0x30);
    cpu.set_irq(true);
    cpu.step_instruction(&mut bus);
    assert!(!cpu.is_halted());
    assert_eq!(cpu.regs.cs(), HANDLER_SEG);
    let base = 0x2_0000 + u32::from(cpu.regs.sp());
    assert_eq!(peek_word(&mut cpu, &mut bus, base), 2, "returns after HLT");
}

#[test]
fn observable_paths() {
    let (mut cpu, mut bus) = setup_program(HardwareProfile::ACORN_186, &[0xB8, 0xEF, 0xBE, 0xF9]);
    run_instructions(&mut cpu, &mut bus, 2);
    assert_eq!(cpu.query("ax"), Some(Value::U16(0xBEEF)));
    assert_eq!(cpu.query("flags.cf"), Some(Value::Bool(true)));
    assert_eq!(cpu.query("boot_flag"), Some(Value::Bool(false)));
    assert_eq!(cpu.query("bogus"), None);
    let snapshot = cpu.snapshot();
    assert!(snapshot.starts_with("ip=0004 ax=BEEF"), "{snapshot}");
    assert!(snapshot.ends_with("flags=0003"), "{snapshot}");
}

#[test]
fn snapshot_includes_msw_on_80286() {
    let (cpu, _) = setup_program(HardwareProfile::ACORN_286, &[0x90]);
    let snapshot = cpu.snapshot();
    assert!(snapshot.ends_with("flags=0002 msw=FFF0"), "{snapshot}");
}
