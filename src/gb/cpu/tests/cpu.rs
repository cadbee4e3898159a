use crate::gb::bus::InterruptRegister;
use crate::gb::cpu::registers::FlagsRegister;
use crate::gb::cpu::tests::setup;
use crate::gb::cpu::{CPU, ImeState};
use crate::gb::tests::MockBus;
use crate::gb::{Bus, SubSystem};

fn flags(zero: bool, negative: bool, half_carry: bool, carry: bool) -> FlagsRegister {
    let mut f = FlagsRegister::empty();
    f.update(zero, negative, half_carry, carry);
    f
}

#[test]
fn test_add() {
    let (mut cpu, mut bus) = setup(&[0x80]); // ADD A, B
    cpu.r.a = 0x3A;
    cpu.r.b = 0xC6;
    cpu.step(&mut bus);
    assert_eq!(cpu.r.a, 0x00);
    assert_eq!(cpu.r.f, flags(true, false, true, true));
    assert_eq!(bus.cycles, 1);
}

#[test]
fn test_add_half_carry_only() {
    let (mut cpu, mut bus) = setup(&[0xC6, 0x0F]); // ADD A, 0x0F
    cpu.r.a = 0x01;
    cpu.step(&mut bus);
    assert_eq!(cpu.r.a, 0x10);
    assert_eq!(cpu.r.f, flags(false, false, true, false));
    assert_eq!(bus.cycles, 2);
}

#[test]
fn test_adc_carry_chain() {
    let (mut cpu, mut bus) = setup(&[0xCE, 0x00]); // ADC A, 0x00
    cpu.r.a = 0xFF;
    cpu.r.f = flags(false, false, false, true);
    cpu.step(&mut bus);
    assert_eq!(cpu.r.a, 0x00);
    assert_eq!(cpu.r.f, flags(true, false, true, true));
}

#[test]
fn test_sub() {
    let (mut cpu, mut bus) = setup(&[0x90]); // SUB A, B
    cpu.r.a = 0x3E;
    cpu.r.b = 0x3E;
    cpu.step(&mut bus);
    assert_eq!(cpu.r.a, 0x00);
    assert_eq!(cpu.r.f, flags(true, true, false, false));
}

#[test]
fn test_sub_borrow() {
    let (mut cpu, mut bus) = setup(&[0xD6, 0x0F]); // SUB A, 0x0F
    cpu.r.a = 0x10;
    cpu.step(&mut bus);
    assert_eq!(cpu.r.a, 0x01);
    assert_eq!(cpu.r.f, flags(false, true, true, false));
}

#[test]
fn test_sbc_with_borrow_in() {
    let (mut cpu, mut bus) = setup(&[0xDE, 0xFF]); // SBC A, 0xFF
    cpu.r.a = 0x00;
    cpu.r.f = flags(false, false, false, true);
    cpu.step(&mut bus);
    assert_eq!(cpu.r.a, 0x00);
    assert_eq!(cpu.r.f, flags(true, true, true, true));
}

#[test]
fn test_cp_is_a_flag_only_sub() {
    let (mut cpu, mut bus) = setup(&[0xFE, 0x40]); // CP A, 0x40
    cpu.r.a = 0x3F;
    cpu.step(&mut bus);
    assert_eq!(cpu.r.a, 0x3F, "A is untouched");
    assert_eq!(cpu.r.f, flags(false, true, true, true));
}

#[test]
fn test_and_or_xor() {
    let (mut cpu, mut bus) = setup(&[0xA0, 0xB1, 0xA9]);
    cpu.r.a = 0b1100;
    cpu.r.b = 0b1010;
    cpu.r.c = 0b0011;
    cpu.step(&mut bus); // AND A, B
    assert_eq!(cpu.r.a, 0b1000);
    assert_eq!(cpu.r.f, flags(false, false, true, false));

    cpu.step(&mut bus); // OR A, C
    assert_eq!(cpu.r.a, 0b1011);
    assert_eq!(cpu.r.f, flags(false, false, false, false));

    cpu.step(&mut bus); // XOR A, C
    assert_eq!(cpu.r.a, 0b1000);
}

#[test]
fn test_inc_dec_preserve_carry() {
    let (mut cpu, mut bus) = setup(&[0x3C, 0x05]);
    cpu.r.a = 0x0F;
    cpu.r.b = 0x01;
    cpu.r.f = flags(false, false, false, true);

    cpu.step(&mut bus); // INC A
    assert_eq!(cpu.r.a, 0x10);
    assert_eq!(cpu.r.f, flags(false, false, true, true));

    cpu.step(&mut bus); // DEC B
    assert_eq!(cpu.r.b, 0x00);
    assert_eq!(cpu.r.f, flags(true, true, false, true));
}

#[test]
fn test_inc_indirect_hl() {
    let (mut cpu, mut bus) = setup(&[0x34]); // INC (HL)
    cpu.r.set_hl(0xC000);
    bus.write(0xC000, 0xFF);
    bus.cycles = 0;
    cpu.step(&mut bus);
    assert_eq!(bus.read(0xC000), 0x00);
    assert!(cpu.r.f.contains(FlagsRegister::ZERO));
    assert_eq!(bus.cycles, 3 + 1, "fetch, read, write plus the assert read");
}

#[test]
fn test_inc2_dec2_touch_no_flags() {
    let (mut cpu, mut bus) = setup(&[0x03, 0x0B]);
    cpu.r.set_bc(0xFFFF);
    cpu.step(&mut bus); // INC BC
    assert_eq!(cpu.r.get_bc(), 0x0000);
    assert_eq!(cpu.r.f, FlagsRegister::empty());
    assert_eq!(bus.cycles, 2);

    cpu.step(&mut bus); // DEC BC
    assert_eq!(cpu.r.get_bc(), 0xFFFF);
    assert_eq!(bus.cycles, 4);
}

#[test]
fn test_add_hl() {
    let (mut cpu, mut bus) = setup(&[0x09]); // ADD HL, BC
    cpu.r.set_hl(0x8A23);
    cpu.r.set_bc(0x0605);
    cpu.r.f = flags(true, true, false, false);
    cpu.step(&mut bus);
    assert_eq!(cpu.r.get_hl(), 0x9028);
    assert_eq!(
        cpu.r.f,
        flags(true, false, true, false),
        "Z is preserved, H comes from bit 11"
    );
    assert_eq!(bus.cycles, 2);
}

#[test]
fn test_add_sp() {
    let (mut cpu, mut bus) = setup(&[0xE8, 0x08, 0xE8, 0xFE]);
    cpu.sp = 0xFFF8;
    cpu.step(&mut bus); // ADD SP, +8
    assert_eq!(cpu.sp, 0x0000);
    // Both flags come from unsigned arithmetic on the low byte
    assert_eq!(cpu.r.f, flags(false, false, true, true));
    assert_eq!(bus.cycles, 4);

    cpu.step(&mut bus); // ADD SP, -2
    assert_eq!(cpu.sp, 0xFFFE);
    assert_eq!(cpu.r.f, flags(false, false, false, false));
}

#[test]
fn test_ld_hl_sp_offset() {
    let (mut cpu, mut bus) = setup(&[0xF8, 0x03]); // LD HL, SP+3
    cpu.sp = 0xC0FF;
    cpu.step(&mut bus);
    assert_eq!(cpu.r.get_hl(), 0xC102);
    assert_eq!(cpu.sp, 0xC0FF, "SP itself is untouched");
    assert_eq!(cpu.r.f, flags(false, false, true, true));
    assert_eq!(bus.cycles, 3);
}

#[test]
fn test_daa_after_addition() {
    // (input A, expected A, expected carry)
    let vectors = [
        (0x3C, 0x42, false),
        (0x9A, 0x00, true),
        (0x0A, 0x10, false),
        (0xA0, 0x00, true),
    ];
    for (input, expected, carry) in vectors {
        let (mut cpu, mut bus) = setup(&[0x27]); // DAA
        cpu.r.a = input;
        cpu.step(&mut bus);
        assert_eq!(cpu.r.a, expected, "DAA({input:#04x})");
        assert_eq!(cpu.r.f.carry(), carry, "DAA({input:#04x}) carry");
        assert_eq!(
            cpu.r.f.contains(FlagsRegister::ZERO),
            expected == 0,
            "DAA({input:#04x}) zero"
        );
        assert!(!cpu.r.f.contains(FlagsRegister::HALF_CARRY));
    }
}

#[test]
fn test_daa_after_subtraction() {
    // 0x15 - 0x27 leaves 0xEE with N, H and C set
    let (mut cpu, mut bus) = setup(&[0x27]);
    cpu.r.a = 0xEE;
    cpu.r.f = flags(false, true, true, true);
    cpu.step(&mut bus);
    assert_eq!(cpu.r.a, 0x88);
    assert_eq!(cpu.r.f, flags(false, true, false, true));
}

#[test]
fn test_rotate_a_variants_clear_zero() {
    let (mut cpu, mut bus) = setup(&[0x07, 0x17, 0x0F, 0x1F]);
    cpu.r.a = 0x80;
    cpu.step(&mut bus); // RLCA
    assert_eq!(cpu.r.a, 0x01);
    assert_eq!(cpu.r.f, flags(false, false, false, true));

    cpu.r.a = 0x80;
    cpu.step(&mut bus); // RLA, carry rotates in
    assert_eq!(cpu.r.a, 0x01);
    assert!(cpu.r.f.carry());

    cpu.r.a = 0x01;
    cpu.step(&mut bus); // RRCA
    assert_eq!(cpu.r.a, 0x80);
    assert!(cpu.r.f.carry());

    cpu.r.a = 0x00;
    cpu.step(&mut bus); // RRA, carry rotates in
    assert_eq!(cpu.r.a, 0x80);
    assert_eq!(cpu.r.f, flags(false, false, false, false));
}

#[test]
fn test_prefixed_rotates_and_shifts() {
    let (mut cpu, mut bus) = setup(&[
        0xCB, 0x00, // RLC B
        0xCB, 0x2A, // SRA D
        0xCB, 0x31, // SWAP C
        0xCB, 0x3B, // SRL E
    ]);
    cpu.r.b = 0x85;
    cpu.r.d = 0x81;
    cpu.r.c = 0xF0;
    cpu.r.e = 0x01;

    cpu.step(&mut bus);
    assert_eq!(cpu.r.b, 0x0B);
    assert_eq!(cpu.r.f, flags(false, false, false, true));
    assert_eq!(bus.cycles, 2);

    cpu.step(&mut bus);
    assert_eq!(cpu.r.d, 0xC0, "SRA keeps the sign bit");
    assert!(cpu.r.f.carry());

    cpu.step(&mut bus);
    assert_eq!(cpu.r.c, 0x0F);
    assert_eq!(cpu.r.f, flags(false, false, false, false));

    cpu.step(&mut bus);
    assert_eq!(cpu.r.e, 0x00);
    assert_eq!(cpu.r.f, flags(true, false, false, true));
}

#[test]
fn test_prefixed_bit_preserves_carry() {
    let (mut cpu, mut bus) = setup(&[0xCB, 0x7C]); // BIT 7, H
    cpu.r.h = 0x7F;
    cpu.r.f = flags(false, true, false, true);
    cpu.step(&mut bus);
    assert_eq!(cpu.r.f, flags(true, false, true, true));
}

#[test]
fn test_prefixed_set_res_touch_no_flags() {
    let (mut cpu, mut bus) = setup(&[0xCB, 0xC7, 0xCB, 0x87]); // SET 0, A; RES 0, A
    cpu.step(&mut bus);
    assert_eq!(cpu.r.a, 0x01);
    cpu.step(&mut bus);
    assert_eq!(cpu.r.a, 0x00);
    assert_eq!(cpu.r.f, FlagsRegister::empty());
}

#[test]
fn test_prefixed_indirect_hl() {
    let (mut cpu, mut bus) = setup(&[0xCB, 0x16, 0xCB, 0x46]); // RL (HL); BIT 0, (HL)
    cpu.r.set_hl(0xC000);
    bus.write(0xC000, 0x80);
    bus.cycles = 0;

    cpu.step(&mut bus);
    assert_eq!(bus.data[0xC000], 0x00);
    assert!(cpu.r.f.carry());
    assert_eq!(bus.cycles, 4);

    cpu.step(&mut bus);
    assert!(cpu.r.f.contains(FlagsRegister::ZERO));
    assert_eq!(bus.cycles, 4 + 3);
}

#[test]
fn test_jp() {
    let (mut cpu, mut bus) = setup(&[0xC3, 0x34, 0x12]); // JP 0x1234
    cpu.step(&mut bus);
    assert_eq!(cpu.pc, 0x1234);
    assert_eq!(bus.cycles, 4);
}

#[test]
fn test_jp_conditional() {
    let (mut cpu, mut bus) = setup(&[0xC2, 0x34, 0x12]); // JP NZ, 0x1234
    cpu.r.f = flags(true, false, false, false);
    cpu.step(&mut bus);
    assert_eq!(cpu.pc, 0x0003, "not taken");
    assert_eq!(bus.cycles, 3);
}

#[test]
fn test_jp_hl_has_no_delay() {
    let (mut cpu, mut bus) = setup(&[0xE9]); // JP HL
    cpu.r.set_hl(0x4000);
    cpu.step(&mut bus);
    assert_eq!(cpu.pc, 0x4000);
    assert_eq!(bus.cycles, 1);
}

#[test]
fn test_jr() {
    let (mut cpu, mut bus) = setup(&[0x18, 0x05]); // JR +5
    cpu.step(&mut bus);
    assert_eq!(cpu.pc, 0x0007);
    assert_eq!(bus.cycles, 3);

    let (mut cpu, mut bus) = setup(&[0x00, 0x00, 0x18, 0xFC]); // JR -4
    cpu.pc = 0x0002;
    cpu.step(&mut bus);
    assert_eq!(cpu.pc, 0x0000);
}

#[test]
fn test_jr_not_taken() {
    let (mut cpu, mut bus) = setup(&[0x28, 0x05]); // JR Z, +5
    cpu.step(&mut bus);
    assert_eq!(cpu.pc, 0x0002);
    assert_eq!(bus.cycles, 2);
}

#[test]
fn test_call_and_ret() {
    let (mut cpu, mut bus) = setup(&[0xCD, 0x00, 0x40]); // CALL 0x4000
    cpu.sp = 0xFFFE;
    bus.data[0x4000] = 0xC9; // RET
    cpu.step(&mut bus);
    assert_eq!(cpu.pc, 0x4000);
    assert_eq!(cpu.sp, 0xFFFC);
    assert_eq!(bus.data[0xFFFD], 0x00);
    assert_eq!(bus.data[0xFFFC], 0x03, "return address points after CALL");
    assert_eq!(bus.cycles, 6);

    bus.cycles = 0;
    cpu.step(&mut bus);
    assert_eq!(cpu.pc, 0x0003);
    assert_eq!(cpu.sp, 0xFFFE);
    assert_eq!(bus.cycles, 4);
}

#[test]
fn test_call_not_taken() {
    let (mut cpu, mut bus) = setup(&[0xC4, 0x00, 0x40]); // CALL NZ, 0x4000
    cpu.r.f = flags(true, false, false, false);
    cpu.sp = 0xFFFE;
    cpu.step(&mut bus);
    assert_eq!(cpu.pc, 0x0003);
    assert_eq!(cpu.sp, 0xFFFE);
    assert_eq!(bus.cycles, 3);
}

#[test]
fn test_conditional_ret_timing() {
    let (mut cpu, mut bus) = setup(&[0xC8]); // RET Z, taken
    cpu.r.f = flags(true, false, false, false);
    cpu.sp = 0xFFFC;
    bus.data[0xFFFC] = 0x34;
    bus.data[0xFFFD] = 0x12;
    cpu.step(&mut bus);
    assert_eq!(cpu.pc, 0x1234);
    assert_eq!(bus.cycles, 5);

    let (mut cpu, mut bus) = setup(&[0xC8]); // RET Z, not taken
    cpu.step(&mut bus);
    assert_eq!(cpu.pc, 0x0001);
    assert_eq!(bus.cycles, 2);
}

#[test]
fn test_reti_enables_ime_immediately() {
    let (mut cpu, mut bus) = setup(&[0xD9]);
    cpu.sp = 0xFFFC;
    cpu.step(&mut bus);
    assert_eq!(cpu.ime, ImeState::Enabled);
    assert_eq!(bus.cycles, 4);
}

#[test]
fn test_rst() {
    let (mut cpu, mut bus) = setup(&[0xEF]); // RST 0x28
    cpu.sp = 0xFFFE;
    cpu.step(&mut bus);
    assert_eq!(cpu.pc, 0x0028);
    assert_eq!(bus.data[0xFFFC], 0x01);
    assert_eq!(bus.cycles, 4);
}

#[test]
fn test_push_pop() {
    let (mut cpu, mut bus) = setup(&[0xC5, 0xF1]); // PUSH BC; POP AF
    cpu.sp = 0xFFFE;
    cpu.r.set_bc(0x12FF);
    cpu.step(&mut bus);
    assert_eq!(cpu.sp, 0xFFFC);
    assert_eq!(bus.cycles, 4);

    cpu.step(&mut bus);
    assert_eq!(cpu.sp, 0xFFFE);
    assert_eq!(
        cpu.r.get_af(),
        0x12F0,
        "the low nibble of F does not exist"
    );
    assert_eq!(bus.cycles, 4 + 3);
}

#[test]
fn test_ld_high_page() {
    let (mut cpu, mut bus) = setup(&[0xE0, 0x80, 0xF0, 0x80, 0xE2]);
    cpu.r.a = 0x42;
    cpu.step(&mut bus); // LDH (0x80), A
    assert_eq!(bus.data[0xFF80], 0x42);
    assert_eq!(bus.cycles, 3);

    cpu.r.a = 0x00;
    cpu.step(&mut bus); // LDH A, (0x80)
    assert_eq!(cpu.r.a, 0x42);

    cpu.r.c = 0x81;
    cpu.step(&mut bus); // LD (C), A
    assert_eq!(bus.data[0xFF81], 0x42);
}

#[test]
fn test_ld_indirect_sp() {
    let (mut cpu, mut bus) = setup(&[0x08, 0x00, 0xC0]); // LD (0xC000), SP
    cpu.sp = 0xFFF8;
    cpu.step(&mut bus);
    assert_eq!(bus.data[0xC000], 0xF8);
    assert_eq!(bus.data[0xC001], 0xFF);
    assert_eq!(bus.cycles, 5);
}

#[test]
fn test_ld_hl_increments_and_decrements() {
    let (mut cpu, mut bus) = setup(&[0x22, 0x3A]); // LD (HL+), A; LD A, (HL-)
    cpu.r.a = 0x55;
    cpu.r.set_hl(0xC000);
    cpu.step(&mut bus);
    assert_eq!(bus.data[0xC000], 0x55);
    assert_eq!(cpu.r.get_hl(), 0xC001);

    bus.data[0xC001] = 0x66;
    cpu.step(&mut bus);
    assert_eq!(cpu.r.a, 0x66);
    assert_eq!(cpu.r.get_hl(), 0xC000);
}

#[test]
fn test_ld_sp_hl_timing() {
    let (mut cpu, mut bus) = setup(&[0xF9]); // LD SP, HL
    cpu.r.set_hl(0xBEEF);
    cpu.step(&mut bus);
    assert_eq!(cpu.sp, 0xBEEF);
    assert_eq!(bus.cycles, 2);
}

#[test]
fn test_ei_is_delayed_by_one_instruction() {
    let (mut cpu, mut bus) = setup(&[0xFB, 0x00, 0x00]); // EI; NOP; NOP
    cpu.step(&mut bus);
    assert_eq!(cpu.ime, ImeState::Pending, "not yet enabled after EI");
    cpu.step(&mut bus);
    assert_eq!(cpu.ime, ImeState::Enabled, "enabled after the next retire");
}

#[test]
fn test_di_is_immediate() {
    let (mut cpu, mut bus) = setup(&[0xF3]);
    cpu.ime = ImeState::Enabled;
    cpu.step(&mut bus);
    assert_eq!(cpu.ime, ImeState::Disabled);
}

#[test]
fn test_ei_then_di_never_enables() {
    let (mut cpu, mut bus) = setup(&[0xFB, 0xF3, 0x00]); // EI; DI; NOP
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.ime, ImeState::Disabled);
    cpu.step(&mut bus);
    assert_eq!(cpu.ime, ImeState::Disabled);
}

#[test]
fn test_halt() {
    let (mut cpu, mut bus) = setup(&[0x76]);
    cpu.ime = ImeState::Enabled;
    cpu.step(&mut bus);
    assert!(cpu.is_halted);
    assert_eq!(cpu.pc, 0x0001);
}

#[test]
fn test_halt_bug_duplicates_the_next_byte() {
    // HALT with IME disabled and a pending interrupt does not halt,
    // instead the next opcode byte is fetched without advancing PC.
    let (mut cpu, mut bus) = setup(&[0x76, 0x3E, 0x12]); // HALT; LD A, d8
    bus.set_ie(InterruptRegister::VBLANK);
    bus.set_if(InterruptRegister::VBLANK);

    cpu.step(&mut bus);
    assert!(!cpu.is_halted);

    cpu.step(&mut bus);
    assert_eq!(cpu.r.a, 0x3E, "the opcode byte doubles as its own operand");
    assert_eq!(cpu.pc, 0x0002);
}

#[test]
fn test_illegal_opcode_freezes_the_cpu() {
    for opcode in [0xD3u8, 0xDB, 0xDD, 0xE3, 0xE4, 0xEB, 0xEC, 0xED, 0xF4, 0xFC, 0xFD] {
        let (mut cpu, mut bus) = setup(&[opcode]);
        cpu.step(&mut bus);
        assert!(cpu.is_frozen, "opcode {opcode:#04x}");
        assert_eq!(cpu.pc, 0x0000, "PC stays on the illegal opcode");
    }
}

#[test]
fn test_regular_ld_block() {
    let (mut cpu, mut bus) = setup(&[0x41, 0x62, 0x7D]); // LD B, C; LD H, D; LD A, L
    cpu.r.c = 0x11;
    cpu.r.d = 0x22;
    cpu.r.l = 0x33;
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.r.b, 0x11);
    assert_eq!(cpu.r.h, 0x22);
    assert_eq!(cpu.r.a, 0x33);
    assert_eq!(bus.cycles, 3);
}

#[test]
fn test_misc_flag_instructions() {
    let (mut cpu, mut bus) = setup(&[0x37, 0x3F, 0x2F]); // SCF; CCF; CPL
    cpu.step(&mut bus);
    assert_eq!(cpu.r.f, flags(false, false, false, true));

    cpu.step(&mut bus);
    assert_eq!(cpu.r.f, flags(false, false, false, false));

    cpu.r.a = 0b1010_0101;
    cpu.step(&mut bus);
    assert_eq!(cpu.r.a, 0b0101_1010);
    assert_eq!(cpu.r.f, flags(false, true, true, false));
}

/// The MockBus mirrors the real bus contract: one cycle per access.
#[test]
fn test_mock_bus_counts_cycles() {
    let mut bus = MockBus::new(vec![]);
    bus.read(0x0000);
    bus.write(0x0000, 1);
    bus.cycle();
    assert_eq!(bus.cycles, 3);
}

/// Every non-CB opcode either decodes or freezes, the table has no holes.
#[test]
fn test_decode_table_is_total() {
    for opcode in 0x00u16..=0xFF {
        if opcode == 0xCB {
            continue;
        }
        let (mut cpu, mut bus) = setup(&[opcode as u8, 0x00, 0x00]);
        cpu.sp = 0xFFF0;
        cpu.step(&mut bus);
    }
    for opcode in 0x00u16..=0xFF {
        let (mut cpu, mut bus) = setup(&[0xCB, opcode as u8]);
        cpu.step(&mut bus);
        assert!(!cpu.is_frozen, "CB {opcode:#04x} must decode");
    }
}

#[test]
fn test_stop_skips_its_padding_byte() {
    let (mut cpu, mut bus) = setup(&[0x10, 0x00, 0x04]); // STOP; (pad); INC B
    cpu.step(&mut bus);
    assert!(cpu.is_stopped);
    assert_eq!(cpu.pc, 0x0002);
}

fn run_program(program: &[u8], steps: usize) -> (CPU, MockBus) {
    let (mut cpu, mut bus) = setup(program);
    for _ in 0..steps {
        cpu.step(&mut bus);
    }
    (cpu, bus)
}

/// A small end-to-end BCD addition: 0x19 + 0x28 = 0x47 in decimal.
#[test]
fn test_bcd_addition_program() {
    let (cpu, _) = run_program(
        &[
            0x3E, 0x19, // LD A, 0x19
            0x06, 0x28, // LD B, 0x28
            0x80, // ADD A, B
            0x27, // DAA
        ],
        4,
    );
    assert_eq!(cpu.r.a, 0x47);
    assert!(!cpu.r.f.carry());
}
