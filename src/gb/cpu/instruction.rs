use crate::gb::Bus;
use crate::gb::cpu::instruction::Instruction::*;
use crate::gb::cpu::ops::JumpCondition::{Always, Carry, NotCarry, NotZero, Zero};
use crate::gb::cpu::ops::Register::{A, B, C, D, E, H, L};
use crate::gb::cpu::ops::WordRegister::{AF, BC, DE, HL, SP};
use crate::gb::cpu::ops::*;
use std::fmt;
use std::fmt::Formatter;

pub const OPCODE_PREFIX: u8 = 0xCB;

/// One decoded SM83 instruction with all immediate operands resolved.
/// The `Display` implementation yields the usual mnemonics.
#[derive(Copy, Clone)]
pub enum Instruction {
    ADD(ByteSource),               // Add n to A
    ADDHL(WordSource),             // Add nn to HL
    ADDSP(i8),                     // Add signed immediate 8 bit value to Stack Pointer
    ADC(ByteSource),               // Add n + Carry flag to A
    AND(ByteSource),               // Logically AND n with A, result in A
    BIT(u8, ByteTarget),           // Test bit b in register r
    INC(ByteTarget),               // Increment single byte register n
    INC2(WordRegister),            // Increment word register n
    CALL(JumpCondition, u16),      // Push address of next instruction, then jump to nn
    CCF,                           // Complement carry flag
    CP(ByteSource),                // Compare A with source
    CPL,                           // Flips all bits in A register, sets N and H flags
    DAA,                           // Decimal adjust A after BCD arithmetic
    DI,                            // Disables interrupt handling
    DEC(ByteTarget),               // Decrement single byte register n
    DEC2(WordRegister),            // Decrement word register n
    EI,                            // Enables interrupt handling after the next instruction
    HALT,                          // Halts and wait for interrupt
    JR(JumpCondition, i8),         // Relative jump with signed offset
    JP(JumpCondition, JumpTarget), // Jump to address nn
    LD(Load),                      // Put value into n
    NOP,                           // No operation
    OR(ByteSource),                // Logical OR n with register A, result in A
    PUSH(WordRegister),            // Push the 16-bit register onto the stack
    POP(WordRegister),             // Pops two bytes into the 16-bit register
    RES(u8, ByteTarget),           // Reset bit b in register r
    RET(JumpCondition),            // Pop two bytes from stack & jump to that address
    RETI,                          // Unconditional return which also enables interrupts
    RL(ByteTarget),                // Rotate n left through Carry flag
    RLA,                           // Rotate `A` left through carry
    RLC(ByteTarget),               // Rotate target left
    RLCA,                          // Rotate A left. Old bit 7 to Carry flag
    RR(ByteTarget),                // Rotate n right through Carry flag
    RRA,                           // Rotate A right through Carry flag
    RRC(ByteTarget),               // Rotate n right. Old bit 0 to Carry flag
    RRCA,                          // Rotate A right. Old bit 0 to Carry flag
    RST(ResetCode),                // Push present address onto stack, jump to 0x0000 + n
    SBC(ByteSource),               // Subtract n + Carry flag from A
    SCF,                           // Set carry flag
    SET(u8, ByteTarget),           // Set bit b in register r
    SLA(ByteTarget),               // Shift n left into Carry. LSB of n set to 0
    SRA(ByteTarget),               // Shift n right into Carry. MSB doesn't change
    SRL(ByteTarget),               // Shift right into Carry, MSB set to 0
    SUB(ByteSource),               // Subtract n from A
    STOP,                          // Halt CPU & LCD display until button pressed
    SWAP(ByteTarget),              // Swap upper & lower nibbles of n
    XOR(ByteSource),               // Logical exclusive OR n with register A, result in A
}

impl Instruction {
    /// Decodes the given opcode, consuming immediate operands through the
    /// bus starting at `address`. Returns the decoded instruction together
    /// with the address of the following instruction, or `None` for one of
    /// the unassigned opcodes which wedge the CPU on real hardware.
    #[inline]
    pub fn decode<T: Bus>(opcode: u8, address: u16, bus: &mut T) -> (Option<Instruction>, u16) {
        match opcode == OPCODE_PREFIX {
            true => (Some(Self::prefixed(bus.read(address))), address.wrapping_add(1)),
            false => Self::not_prefixed(opcode, address, bus),
        }
    }

    /// Decodes a CB-prefixed opcode, none of the 256 entries are unassigned.
    fn prefixed(opcode: u8) -> Instruction {
        // The prefixed table is perfectly regular: the low 3 bits select the
        // operand, the upper 5 bits the operation.
        let target = match opcode & 0b111 {
            0x0 => ByteTarget::R(B),
            0x1 => ByteTarget::R(C),
            0x2 => ByteTarget::R(D),
            0x3 => ByteTarget::R(E),
            0x4 => ByteTarget::R(H),
            0x5 => ByteTarget::R(L),
            0x6 => ByteTarget::I(ByteRef::R(HL)),
            _ => ByteTarget::R(A),
        };
        let bit = (opcode >> 3) & 0b111;
        match opcode {
            0x00..=0x07 => RLC(target),
            0x08..=0x0F => RRC(target),
            0x10..=0x17 => RL(target),
            0x18..=0x1F => RR(target),
            0x20..=0x27 => SLA(target),
            0x28..=0x2F => SRA(target),
            0x30..=0x37 => SWAP(target),
            0x38..=0x3F => SRL(target),
            0x40..=0x7F => BIT(bit, target),
            0x80..=0xBF => RES(bit, target),
            0xC0..=0xFF => SET(bit, target),
        }
    }

    /// Decodes a base table opcode, the passed address is the location of
    /// the first operand byte. Returns the parsed `Instruction` and the
    /// address of the next instruction.
    fn not_prefixed<T: Bus>(opcode: u8, address: u16, bus: &mut T) -> (Option<Instruction>, u16) {
        let mut address = address;
        let instruction = match opcode {
            0x00 => NOP,
            0x01 => LD(Load::Word(BC, WordSource::D16(read_word(&mut address, bus)))),
            0x02 => LD(Load::IndirectFrom(ByteRef::R(BC), ByteSource::R(A))),
            0x03 => INC2(BC),
            0x04 => INC(ByteTarget::R(B)),
            0x05 => DEC(ByteTarget::R(B)),
            0x06 => LD(Load::Byte(
                ByteTarget::R(B),
                ByteSource::D8(read_byte(&mut address, bus)),
            )),
            0x07 => RLCA,
            0x08 => LD(Load::IndirectFromSP(ByteRef::D16(read_word(
                &mut address,
                bus,
            )))),
            0x09 => ADDHL(WordSource::R(BC)),
            0x0A => LD(Load::Byte(ByteTarget::R(A), ByteSource::I(ByteRef::R(BC)))),
            0x0B => DEC2(BC),
            0x0C => INC(ByteTarget::R(C)),
            0x0D => DEC(ByteTarget::R(C)),
            0x0E => LD(Load::Byte(
                ByteTarget::R(C),
                ByteSource::D8(read_byte(&mut address, bus)),
            )),
            0x0F => RRCA,

            0x10 => STOP,
            0x11 => LD(Load::Word(DE, WordSource::D16(read_word(&mut address, bus)))),
            0x12 => LD(Load::IndirectFrom(ByteRef::R(DE), ByteSource::R(A))),
            0x13 => INC2(DE),
            0x14 => INC(ByteTarget::R(D)),
            0x15 => DEC(ByteTarget::R(D)),
            0x16 => LD(Load::Byte(
                ByteTarget::R(D),
                ByteSource::D8(read_byte(&mut address, bus)),
            )),
            0x17 => RLA,
            0x18 => JR(Always, read_byte(&mut address, bus) as i8),
            0x19 => ADDHL(WordSource::R(DE)),
            0x1A => LD(Load::Byte(ByteTarget::R(A), ByteSource::I(ByteRef::R(DE)))),
            0x1B => DEC2(DE),
            0x1C => INC(ByteTarget::R(E)),
            0x1D => DEC(ByteTarget::R(E)),
            0x1E => LD(Load::Byte(
                ByteTarget::R(E),
                ByteSource::D8(read_byte(&mut address, bus)),
            )),
            0x1F => RRA,

            0x20 => JR(NotZero, read_byte(&mut address, bus) as i8),
            0x21 => LD(Load::Word(HL, WordSource::D16(read_word(&mut address, bus)))),
            0x22 => LD(Load::HLIFromAInc),
            0x23 => INC2(HL),
            0x24 => INC(ByteTarget::R(H)),
            0x25 => DEC(ByteTarget::R(H)),
            0x26 => LD(Load::Byte(
                ByteTarget::R(H),
                ByteSource::D8(read_byte(&mut address, bus)),
            )),
            0x27 => DAA,
            0x28 => JR(Zero, read_byte(&mut address, bus) as i8),
            0x29 => ADDHL(WordSource::R(HL)),
            0x2A => LD(Load::HLIToAInc),
            0x2B => DEC2(HL),
            0x2C => INC(ByteTarget::R(L)),
            0x2D => DEC(ByteTarget::R(L)),
            0x2E => LD(Load::Byte(
                ByteTarget::R(L),
                ByteSource::D8(read_byte(&mut address, bus)),
            )),
            0x2F => CPL,

            0x30 => JR(NotCarry, read_byte(&mut address, bus) as i8),
            0x31 => LD(Load::Word(SP, WordSource::D16(read_word(&mut address, bus)))),
            0x32 => LD(Load::HLIFromADec),
            0x33 => INC2(SP),
            0x34 => INC(ByteTarget::I(ByteRef::R(HL))),
            0x35 => DEC(ByteTarget::I(ByteRef::R(HL))),
            0x36 => LD(Load::Byte(
                ByteTarget::I(ByteRef::R(HL)),
                ByteSource::D8(read_byte(&mut address, bus)),
            )),
            0x37 => SCF,
            0x38 => JR(Carry, read_byte(&mut address, bus) as i8),
            0x39 => ADDHL(WordSource::R(SP)),
            0x3A => LD(Load::HLIToADec),
            0x3B => DEC2(SP),
            0x3C => INC(ByteTarget::R(A)),
            0x3D => DEC(ByteTarget::R(A)),
            0x3E => LD(Load::Byte(
                ByteTarget::R(A),
                ByteSource::D8(read_byte(&mut address, bus)),
            )),
            0x3F => CCF,

            // The regular LD block, 0x76 (LD (HL), (HL)) is HALT instead.
            0x40..=0x75 | 0x77..=0x7F => {
                let source = match opcode & 0b111 {
                    0x0 => ByteSource::R(B),
                    0x1 => ByteSource::R(C),
                    0x2 => ByteSource::R(D),
                    0x3 => ByteSource::R(E),
                    0x4 => ByteSource::R(H),
                    0x5 => ByteSource::R(L),
                    0x6 => ByteSource::I(ByteRef::R(HL)),
                    _ => ByteSource::R(A),
                };
                let target = match (opcode >> 3) & 0b111 {
                    0x0 => ByteTarget::R(B),
                    0x1 => ByteTarget::R(C),
                    0x2 => ByteTarget::R(D),
                    0x3 => ByteTarget::R(E),
                    0x4 => ByteTarget::R(H),
                    0x5 => ByteTarget::R(L),
                    0x6 => ByteTarget::I(ByteRef::R(HL)),
                    _ => ByteTarget::R(A),
                };
                LD(Load::Byte(target, source))
            }
            0x76 => HALT,

            // The ALU block shares the operand layout of the LD block.
            0x80..=0xBF => {
                let source = match opcode & 0b111 {
                    0x0 => ByteSource::R(B),
                    0x1 => ByteSource::R(C),
                    0x2 => ByteSource::R(D),
                    0x3 => ByteSource::R(E),
                    0x4 => ByteSource::R(H),
                    0x5 => ByteSource::R(L),
                    0x6 => ByteSource::I(ByteRef::R(HL)),
                    _ => ByteSource::R(A),
                };
                match (opcode >> 3) & 0b111 {
                    0x0 => ADD(source),
                    0x1 => ADC(source),
                    0x2 => SUB(source),
                    0x3 => SBC(source),
                    0x4 => AND(source),
                    0x5 => XOR(source),
                    0x6 => OR(source),
                    _ => CP(source),
                }
            }

            0xC0 => RET(NotZero),
            0xC1 => POP(BC),
            0xC2 => JP(NotZero, JumpTarget::D16(read_word(&mut address, bus))),
            0xC3 => JP(Always, JumpTarget::D16(read_word(&mut address, bus))),
            0xC4 => CALL(NotZero, read_word(&mut address, bus)),
            0xC5 => PUSH(BC),
            0xC6 => ADD(ByteSource::D8(read_byte(&mut address, bus))),
            0xC7 => RST(ResetCode::RST00),
            0xC8 => RET(Zero),
            0xC9 => RET(Always),
            0xCA => JP(Zero, JumpTarget::D16(read_word(&mut address, bus))),
            0xCB => unreachable!("CB Prefix"),
            0xCC => CALL(Zero, read_word(&mut address, bus)),
            0xCD => CALL(Always, read_word(&mut address, bus)),
            0xCE => ADC(ByteSource::D8(read_byte(&mut address, bus))),
            0xCF => RST(ResetCode::RST08),

            0xD0 => RET(NotCarry),
            0xD1 => POP(DE),
            0xD2 => JP(NotCarry, JumpTarget::D16(read_word(&mut address, bus))),
            0xD3 => return (None, address),
            0xD4 => CALL(NotCarry, read_word(&mut address, bus)),
            0xD5 => PUSH(DE),
            0xD6 => SUB(ByteSource::D8(read_byte(&mut address, bus))),
            0xD7 => RST(ResetCode::RST10),
            0xD8 => RET(Carry),
            0xD9 => RETI,
            0xDA => JP(Carry, JumpTarget::D16(read_word(&mut address, bus))),
            0xDB => return (None, address),
            0xDC => CALL(Carry, read_word(&mut address, bus)),
            0xDD => return (None, address),
            0xDE => SBC(ByteSource::D8(read_byte(&mut address, bus))),
            0xDF => RST(ResetCode::RST18),

            0xE0 => LD(Load::IndirectFrom(
                ByteRef::D8(read_byte(&mut address, bus)),
                ByteSource::R(A),
            )),
            0xE1 => POP(HL),
            0xE2 => LD(Load::IndirectFrom(ByteRef::C, ByteSource::R(A))),
            0xE3 => return (None, address),
            0xE4 => return (None, address),
            0xE5 => PUSH(HL),
            0xE6 => AND(ByteSource::D8(read_byte(&mut address, bus))),
            0xE7 => RST(ResetCode::RST20),
            0xE8 => ADDSP(read_byte(&mut address, bus) as i8),
            0xE9 => JP(Always, JumpTarget::HL),
            0xEA => LD(Load::IndirectFrom(
                ByteRef::D16(read_word(&mut address, bus)),
                ByteSource::R(A),
            )),
            0xEB => return (None, address),
            0xEC => return (None, address),
            0xED => return (None, address),
            0xEE => XOR(ByteSource::D8(read_byte(&mut address, bus))),
            0xEF => RST(ResetCode::RST28),

            0xF0 => LD(Load::Byte(
                ByteTarget::R(A),
                ByteSource::I(ByteRef::D8(read_byte(&mut address, bus))),
            )),
            0xF1 => POP(AF),
            0xF2 => LD(Load::Byte(ByteTarget::R(A), ByteSource::I(ByteRef::C))),
            0xF3 => DI,
            0xF4 => return (None, address),
            0xF5 => PUSH(AF),
            0xF6 => OR(ByteSource::D8(read_byte(&mut address, bus))),
            0xF7 => RST(ResetCode::RST30),
            0xF8 => LD(Load::HLFromSPi8(read_byte(&mut address, bus) as i8)),
            0xF9 => LD(Load::Word(SP, WordSource::R(HL))),
            0xFA => LD(Load::Byte(
                ByteTarget::R(A),
                ByteSource::I(ByteRef::D16(read_word(&mut address, bus))),
            )),
            0xFB => EI,
            0xFC => return (None, address),
            0xFD => return (None, address),
            0xFE => CP(ByteSource::D8(read_byte(&mut address, bus))),
            0xFF => RST(ResetCode::RST38),
        };
        (Some(instruction), address)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            NOP => write!(f, "NOP"),
            HALT => write!(f, "HALT"),
            STOP => write!(f, "STOP"),
            DAA => write!(f, "DAA"),
            CPL => write!(f, "CPL"),
            CCF => write!(f, "CCF"),
            SCF => write!(f, "SCF"),
            RLA => write!(f, "RLA"),
            RRA => write!(f, "RRA"),
            EI => write!(f, "EI"),
            DI => write!(f, "DI"),
            RST(code) => write!(f, "RST {code}"),
            RET(test) => write!(f, "RET {test}"),
            RETI => write!(f, "RETI"),
            JP(test, target) => write!(f, "JP {test} {target}"),
            JR(test, offset) => write!(f, "JR {test}, {:+#04x}", ReallySigned(*offset)),
            CALL(test, address) => write!(f, "CALL {test}, {address:#06x}"),
            ADDHL(source) => write!(f, "ADD HL, {source}"),
            ADDSP(value) => write!(f, "ADD SP, {:+#04x}", ReallySigned(*value)),
            ADD(source) => write!(f, "ADD A, {source}"),
            ADC(source) => write!(f, "ADC A, {source}"),
            SUB(source) => write!(f, "SUB A, {source}"),
            SBC(source) => write!(f, "SBC A, {source}"),
            AND(source) => write!(f, "AND A, {source}"),
            OR(source) => write!(f, "OR A, {source}"),
            XOR(source) => write!(f, "XOR A, {source}"),
            CP(source) => write!(f, "CP A, {source}"),
            INC(target) => write!(f, "INC {target}"),
            INC2(target) => write!(f, "INC {target}"),
            DEC(target) => write!(f, "DEC {target}"),
            DEC2(target) => write!(f, "DEC {target}"),
            LD(load) => write!(f, "LD {load}"),
            BIT(bit, source) => write!(f, "BIT {bit}, {source}"),
            PUSH(target) => write!(f, "PUSH {target}"),
            POP(target) => write!(f, "POP {target}"),
            RES(bit, source) => write!(f, "RES {bit}, {source}"),
            RL(source) => write!(f, "RL {source}"),
            RLC(source) => write!(f, "RLC {source}"),
            RLCA => write!(f, "RLCA"),
            RR(source) => write!(f, "RR {source}"),
            RRC(source) => write!(f, "RRC {source}"),
            RRCA => write!(f, "RRCA"),
            SET(bit, source) => write!(f, "SET {bit}, {source}"),
            SLA(source) => write!(f, "SLA {source}"),
            SRA(source) => write!(f, "SRA {source}"),
            SRL(source) => write!(f, "SRL {source}"),
            SWAP(source) => write!(f, "SWAP {source}"),
        }
    }
}

/// Displays an i8 as a signed hex literal, `{:x}` alone would print the
/// two's complement representation.
pub(crate) struct ReallySigned(pub i8);

impl fmt::LowerHex for ReallySigned {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let bare = format!("{:02x}", self.0.unsigned_abs());
        f.pad_integral(self.0 >= 0, "0x", &bare)
    }
}

/// Reads a byte from the bus at the given address,
/// increments the passed address and returns the read value.
#[inline]
fn read_byte<T: Bus>(address: &mut u16, bus: &mut T) -> u8 {
    let value = bus.read(*address);
    *address = address.wrapping_add(1);
    value
}

/// Reads a word from the bus at the given address,
/// increments the passed address and returns the read value.
#[inline]
fn read_word<T: Bus>(address: &mut u16, bus: &mut T) -> u16 {
    let lsb = read_byte(address, bus);
    let msb = read_byte(address, bus);
    u16::from(lsb) | (u16::from(msb) << 8)
}
