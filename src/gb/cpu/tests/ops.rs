use crate::gb::cpu::CPU;
use crate::gb::cpu::instruction::Instruction;
use crate::gb::cpu::ops::*;
use crate::gb::tests::MockBus;

/// Decodes a single instruction from the start of the given bytes.
fn decode(bytes: &[u8]) -> Instruction {
    let mut bus = MockBus::new(bytes.to_vec());
    let (instruction, _) = Instruction::decode(bytes[0], 1, &mut bus);
    instruction.expect("opcode must decode")
}

/// Decodes the second byte as a CB-prefixed instruction.
fn decode_prefixed(bytes: &[u8]) -> Instruction {
    let mut bus = MockBus::new(bytes.to_vec());
    let (instruction, _) = Instruction::decode(0xCB, 1, &mut bus);
    instruction.expect("prefixed opcodes always decode")
}

#[test]
fn test_register_accessors() {
    let mut cpu = CPU::default();
    Register::B.write(&mut cpu, 0x42);
    assert_eq!(Register::B.read(&cpu), 0x42);
    assert_eq!(cpu.r.b, 0x42);

    WordRegister::HL.write(&mut cpu, 0xBEEF);
    assert_eq!(WordRegister::HL.read(&cpu), 0xBEEF);

    WordRegister::AF.write(&mut cpu, 0xABCD);
    assert_eq!(WordRegister::AF.read(&cpu), 0xABC0, "F masks its low nibble");
}

#[test]
fn test_byte_ref_resolution() {
    let mut cpu = CPU::default();
    cpu.r.c = 0x42;
    cpu.r.set_hl(0xC123);

    assert_eq!(ByteRef::C.resolve(&cpu), 0xFF42);
    assert_eq!(ByteRef::D8(0x80).resolve(&cpu), 0xFF80);
    assert_eq!(ByteRef::D16(0x1234).resolve(&cpu), 0x1234);
    assert_eq!(ByteRef::R(WordRegister::HL).resolve(&cpu), 0xC123);
}

#[test]
fn test_byte_target_round_trip() {
    let mut cpu = CPU::default();
    let mut bus = MockBus::new(vec![]);
    cpu.r.set_hl(0xC000);

    let target = ByteTarget::I(ByteRef::R(WordRegister::HL));
    target.write(&mut cpu, &mut bus, 0x99);
    assert_eq!(target.read(&cpu, &mut bus), 0x99);
    assert_eq!(bus.cycles, 2, "each memory access costs one cycle");
}

#[test]
fn test_jump_condition_resolution() {
    let mut cpu = CPU::default();
    assert!(JumpCondition::Always.resolve(&cpu));
    assert!(JumpCondition::NotZero.resolve(&cpu));
    assert!(!JumpCondition::Zero.resolve(&cpu));

    cpu.r.f.update(true, false, false, true);
    assert!(JumpCondition::Zero.resolve(&cpu));
    assert!(JumpCondition::Carry.resolve(&cpu));
    assert!(!JumpCondition::NotCarry.resolve(&cpu));
}

#[test]
fn test_mnemonics() {
    assert_eq!(decode(&[0x00]).to_string(), "NOP");
    assert_eq!(decode(&[0x3E, 0x42]).to_string(), "LD A, 0x42");
    assert_eq!(decode(&[0x36, 0x10]).to_string(), "LD (HL), 0x10");
    assert_eq!(decode(&[0x80]).to_string(), "ADD A, B");
    assert_eq!(decode(&[0xC6, 0x05]).to_string(), "ADD A, 0x05");
    assert_eq!(decode(&[0xC3, 0x34, 0x12]).to_string(), "JP  0x1234");
    assert_eq!(decode(&[0xCA, 0x34, 0x12]).to_string(), "JP Z 0x1234");
    assert_eq!(decode(&[0x18, 0xFE]).to_string(), "JR , -0x02");
    assert_eq!(decode(&[0xCD, 0x00, 0x40]).to_string(), "CALL , 0x4000");
    assert_eq!(decode(&[0xC9]).to_string(), "RET ");
    assert_eq!(decode(&[0xEF]).to_string(), "RST 0x28");
    assert_eq!(decode(&[0xE0, 0x80]).to_string(), "LD (0xff80), A");
    assert_eq!(decode(&[0x22]).to_string(), "LD (HL+), A");
    assert_eq!(decode(&[0xF8, 0x01]).to_string(), "LD HL, SP+0x01");
    assert_eq!(decode(&[0xE8, 0xFF]).to_string(), "ADD SP, -0x01");
}

#[test]
fn test_prefixed_mnemonics() {
    assert_eq!(decode_prefixed(&[0xCB, 0x00]).to_string(), "RLC B");
    assert_eq!(decode_prefixed(&[0xCB, 0x16]).to_string(), "RL (HL)");
    assert_eq!(decode_prefixed(&[0xCB, 0x7C]).to_string(), "BIT 7, H");
    assert_eq!(decode_prefixed(&[0xCB, 0x87]).to_string(), "RES 0, A");
    assert_eq!(decode_prefixed(&[0xCB, 0xFF]).to_string(), "SET 7, A");
    assert_eq!(decode_prefixed(&[0xCB, 0x37]).to_string(), "SWAP A");
}

#[test]
fn test_decode_reports_instruction_width() {
    let mut bus = MockBus::new(vec![0x3E, 0x42, 0x00]);
    let (_, next) = Instruction::decode(0x3E, 1, &mut bus);
    assert_eq!(next, 2, "one operand byte");

    let mut bus = MockBus::new(vec![0xC3, 0x34, 0x12]);
    let (_, next) = Instruction::decode(0xC3, 1, &mut bus);
    assert_eq!(next, 3, "two operand bytes");

    let mut bus = MockBus::new(vec![0xD3]);
    let (instruction, next) = Instruction::decode(0xD3, 1, &mut bus);
    assert!(instruction.is_none(), "0xD3 is unassigned");
    assert_eq!(next, 1);
}
