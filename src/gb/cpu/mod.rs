use crate::gb::cpu::instruction::Instruction;
use crate::gb::cpu::ops::{
    ByteSource, ByteTarget, JumpCondition, JumpTarget, Load, ResetCode, WordRegister, WordSource,
};
use crate::gb::cpu::registers::{FlagsRegister, Registers};
use crate::gb::{Bus, HardwareMode, utils};

pub mod instruction;
pub mod interrupt;
pub mod ops;
pub mod registers;
#[cfg(test)]
mod tests;

/// Tracks the delayed effect of the EI instruction: interrupts are only
/// enabled after the instruction following EI has retired.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum ImeState {
    #[default]
    Disabled,
    Pending,
    Enabled,
}

/// Implements the SM83 core found in the DMG and CGB.
/// All timing falls out of the memory accesses: every bus read or write
/// costs one machine cycle, internal delays call `Bus::cycle` directly.
#[derive(Clone, Debug, Default)]
pub struct CPU {
    pub r: Registers, // CPU registers
    pub pc: u16,      // Program counter
    pub sp: u16,      // Stack Pointer
    pub ime: ImeState,
    pub is_halted: bool,
    pub is_stopped: bool,
    /// Set after executing one of the unassigned opcodes,
    /// the CPU never leaves this state.
    pub is_frozen: bool,
    /// Set by the HALT bug: the next opcode fetch does not increment PC.
    halt_bug: bool,
}

impl CPU {
    /// Puts the registers into the documented state after the boot ROM
    /// has finished, used when the machine starts without one.
    pub fn set_post_boot_state(&mut self, mode: HardwareMode) {
        match mode {
            HardwareMode::DMG => {
                self.r.set_af(0x01B0);
                self.r.set_bc(0x0013);
                self.r.set_de(0x00D8);
                self.r.set_hl(0x014D);
            }
            HardwareMode::CGB => {
                self.r.set_af(0x1180);
                self.r.set_bc(0x0000);
                self.r.set_de(0xFF56);
                self.r.set_hl(0x000D);
            }
        }
        self.sp = 0xFFFE;
        self.pc = 0x0100;
        self.ime = ImeState::Disabled;
    }

    /// Fetches, decodes and executes one instruction.
    pub fn step<T: Bus>(&mut self, bus: &mut T) {
        let ime_was_pending = self.ime == ImeState::Pending;

        let opcode = bus.read(self.pc);
        bus.before_instruction(self.pc, opcode);
        // The HALT bug makes the CPU skip the PC increment of this fetch,
        // the opcode byte is decoded again as its own first operand.
        let operand_address = match self.halt_bug {
            true => self.pc,
            false => self.pc.wrapping_add(1),
        };
        self.halt_bug = false;

        match Instruction::decode(opcode, operand_address, bus) {
            (Some(instruction), next_address) => {
                self.pc = next_address;
                self.execute(instruction, bus);
            }
            // Unassigned opcode: the CPU wedges with PC stuck on it
            (None, _) => self.is_frozen = true,
        }

        // EI takes effect once the instruction after it has retired
        if ime_was_pending && self.ime == ImeState::Pending {
            self.ime = ImeState::Enabled;
        }
        bus.after_step();
    }

    /// Executes the given instruction.
    fn execute<T: Bus>(&mut self, instruction: Instruction, bus: &mut T) {
        match instruction {
            Instruction::ADD(source) => self.handle_add(source, bus),
            Instruction::ADDHL(source) => self.handle_add_hl(source, bus),
            Instruction::ADDSP(value) => self.handle_add_sp(value, bus),
            Instruction::ADC(source) => self.handle_adc(source, bus),
            Instruction::AND(source) => self.handle_and(source, bus),
            Instruction::BIT(bit, target) => self.handle_bit(bit, target, bus),
            Instruction::CALL(test, address) => self.handle_call(test, address, bus),
            Instruction::CCF => self.handle_ccf(),
            Instruction::CP(source) => self.handle_cp(source, bus),
            Instruction::CPL => self.handle_cpl(),
            Instruction::DAA => self.handle_daa(),
            Instruction::DI => self.handle_di(),
            Instruction::DEC(target) => self.handle_dec_byte(target, bus),
            Instruction::DEC2(target) => self.handle_dec_word(target, bus),
            Instruction::EI => self.handle_ei(),
            Instruction::HALT => self.handle_halt(bus),
            Instruction::INC(target) => self.handle_inc_byte(target, bus),
            Instruction::INC2(target) => self.handle_inc_word(target, bus),
            Instruction::JR(test, offset) => self.handle_jr(test, offset, bus),
            Instruction::JP(test, target) => self.handle_jp(test, target, bus),
            Instruction::LD(load) => self.handle_ld(load, bus),
            Instruction::NOP => {}
            Instruction::OR(source) => self.handle_or(source, bus),
            Instruction::RES(bit, target) => self.handle_res(bit, target, bus),
            Instruction::RET(test) => self.handle_ret(test, bus),
            Instruction::RETI => self.handle_reti(bus),
            Instruction::RL(target) => self.handle_rl(target, bus),
            Instruction::RLA => self.handle_rla(),
            Instruction::RLC(target) => self.handle_rlc(target, bus),
            Instruction::RLCA => self.handle_rlca(),
            Instruction::RR(target) => self.handle_rr(target, bus),
            Instruction::RRA => self.handle_rra(),
            Instruction::RRC(target) => self.handle_rrc(target, bus),
            Instruction::RRCA => self.handle_rrca(),
            Instruction::RST(code) => self.handle_rst(code, bus),
            Instruction::SBC(source) => self.handle_sbc(source, bus),
            Instruction::SCF => self.handle_scf(),
            Instruction::SET(bit, target) => self.handle_set(bit, target, bus),
            Instruction::SLA(target) => self.handle_sla(target, bus),
            Instruction::SRA(target) => self.handle_sra(target, bus),
            Instruction::SRL(target) => self.handle_srl(target, bus),
            Instruction::STOP => self.handle_stop(bus),
            Instruction::SUB(source) => self.handle_sub(source, bus),
            Instruction::SWAP(target) => self.handle_swap(target, bus),
            Instruction::PUSH(target) => self.handle_push(target, bus),
            Instruction::POP(target) => self.handle_pop(target, bus),
            Instruction::XOR(source) => self.handle_xor(source, bus),
        }
    }

    /// Push a u16 value onto the stack
    pub fn push<T: Bus>(&mut self, value: u16, bus: &mut T) {
        self.sp = self.sp.wrapping_sub(1);
        // Write the most significant byte
        bus.write(self.sp, (value >> 8) as u8);

        self.sp = self.sp.wrapping_sub(1);
        // Write the least significant byte
        bus.write(self.sp, value as u8);
    }

    /// Pop a u16 value from the stack
    fn pop<T: Bus>(&mut self, bus: &mut T) -> u16 {
        let lsb = bus.read(self.sp) as u16;
        self.sp = self.sp.wrapping_add(1);

        let msb = bus.read(self.sp) as u16;
        self.sp = self.sp.wrapping_add(1);

        (msb << 8) | lsb
    }

    /// Handles ADD instructions
    fn handle_add<T: Bus>(&mut self, source: ByteSource, bus: &mut T) {
        let value = source.read(self, bus);
        let (result, overflow) = self.r.a.overflowing_add(value);
        self.r.f.update(
            result == 0,
            false,
            utils::half_carry_u8(self.r.a, value, false),
            overflow,
        );
        self.r.a = result;
    }

    /// Handles ADD HL, nn instructions.
    /// The half carry is taken from bit 11, the carry from bit 15,
    /// the zero flag is left untouched.
    fn handle_add_hl<T: Bus>(&mut self, source: WordSource, bus: &mut T) {
        let value = source.read(self);
        let hl = self.r.get_hl();
        let (result, overflow) = hl.overflowing_add(value);

        self.r.f.set(FlagsRegister::SUBTRACTION, false);
        self.r
            .f
            .set(FlagsRegister::HALF_CARRY, (hl ^ value ^ result) & 0x1000 != 0);
        self.r.f.set(FlagsRegister::CARRY, overflow);
        self.r.set_hl(result);
        bus.cycle();
    }

    /// Handles ADD SP, i8. Both flags come from unsigned arithmetic
    /// on the low byte of SP, Z and N are always cleared.
    fn handle_add_sp<T: Bus>(&mut self, value: i8, bus: &mut T) {
        self.sp = self.add_sp_i8(value);
        bus.cycle();
        bus.cycle();
    }

    /// Computes `SP + value` and updates the flags, shared between
    /// ADD SP, i8 and LD HL, SP+i8.
    fn add_sp_i8(&mut self, value: i8) -> u16 {
        let byte = value as u8;
        let half_carry = utils::half_carry_u8(self.sp as u8, byte, false);
        let carry = (self.sp & 0xFF) + u16::from(byte) > 0xFF;
        self.r.f.update(false, false, half_carry, carry);
        self.sp.wrapping_add(value as u16)
    }

    /// Handles ADC instructions
    fn handle_adc<T: Bus>(&mut self, source: ByteSource, bus: &mut T) {
        let value = source.read(self, bus);
        let carry_in = self.r.f.carry();
        let half_carry = utils::half_carry_u8(self.r.a, value, carry_in);

        let (result, overflow) = self.r.a.overflowing_add(value);
        let (result, overflow2) = result.overflowing_add(carry_in as u8);
        self.r
            .f
            .update(result == 0, false, half_carry, overflow | overflow2);
        self.r.a = result;
    }

    /// Handles AND instructions
    fn handle_and<T: Bus>(&mut self, source: ByteSource, bus: &mut T) {
        let value = source.read(self, bus);
        self.r.a &= value;
        self.r.f.update(self.r.a == 0, false, true, false);
    }

    /// Handles BIT instructions, the carry flag stays untouched.
    fn handle_bit<T: Bus>(&mut self, bit: u8, target: ByteTarget, bus: &mut T) {
        let value = target.read(self, bus);
        self.r
            .f
            .set(FlagsRegister::ZERO, !utils::bit_at(value, bit));
        self.r.f.set(FlagsRegister::SUBTRACTION, false);
        self.r.f.set(FlagsRegister::HALF_CARRY, true);
    }

    /// Handle CALL instructions
    fn handle_call<T: Bus>(&mut self, test: JumpCondition, address: u16, bus: &mut T) {
        if test.resolve(self) {
            bus.cycle();
            self.push(self.pc, bus);
            self.pc = address;
        }
    }

    /// Handle CCF instruction
    fn handle_ccf(&mut self) {
        let carry = self.r.f.carry();
        self.r.f.set(FlagsRegister::SUBTRACTION, false);
        self.r.f.set(FlagsRegister::HALF_CARRY, false);
        self.r.f.set(FlagsRegister::CARRY, !carry);
    }

    /// Handles CP instructions, a SUB which throws away the result.
    fn handle_cp<T: Bus>(&mut self, source: ByteSource, bus: &mut T) {
        let value = source.read(self, bus);
        self.r.f.update(
            self.r.a == value,
            true,
            utils::half_borrow_u8(self.r.a, value, false),
            self.r.a < value,
        );
    }

    /// Handles CPL instruction
    fn handle_cpl(&mut self) {
        self.r.a = !self.r.a;
        self.r.f.set(FlagsRegister::SUBTRACTION, true);
        self.r.f.set(FlagsRegister::HALF_CARRY, true);
    }

    /// Handles the DAA instruction, which adjusts A back into binary
    /// coded decimal after an addition or subtraction.
    fn handle_daa(&mut self) {
        let mut carry = self.r.f.carry();
        if self.r.f.contains(FlagsRegister::SUBTRACTION) {
            if carry {
                self.r.a = self.r.a.wrapping_sub(0x60);
            }
            if self.r.f.contains(FlagsRegister::HALF_CARRY) {
                self.r.a = self.r.a.wrapping_sub(0x06);
            }
        } else {
            if carry || self.r.a > 0x99 {
                self.r.a = self.r.a.wrapping_add(0x60);
                carry = true;
            }
            if self.r.f.contains(FlagsRegister::HALF_CARRY) || (self.r.a & 0x0F) > 0x09 {
                self.r.a = self.r.a.wrapping_add(0x06);
            }
        }
        self.r.f.set(FlagsRegister::ZERO, self.r.a == 0);
        self.r.f.set(FlagsRegister::HALF_CARRY, false);
        self.r.f.set(FlagsRegister::CARRY, carry);
    }

    /// Handles DI, interrupts are disabled immediately.
    fn handle_di(&mut self) {
        self.ime = ImeState::Disabled;
    }

    /// Handles EI, interrupts are enabled after the following instruction.
    fn handle_ei(&mut self) {
        if self.ime == ImeState::Disabled {
            self.ime = ImeState::Pending;
        }
    }

    /// Handles DEC instructions for bytes, the carry flag stays untouched.
    fn handle_dec_byte<T: Bus>(&mut self, target: ByteTarget, bus: &mut T) {
        let value = target.read(self, bus);
        let result = value.wrapping_sub(1);
        target.write(self, bus, result);
        self.r.f.set(FlagsRegister::ZERO, result == 0);
        self.r.f.set(FlagsRegister::SUBTRACTION, true);
        self.r.f.set(FlagsRegister::HALF_CARRY, value & 0x0F == 0);
    }

    /// Handles DEC instructions for words, no flags are modified.
    fn handle_dec_word<T: Bus>(&mut self, target: WordRegister, bus: &mut T) {
        let value = target.read(self);
        target.write(self, value.wrapping_sub(1));
        bus.cycle();
    }

    /// Handles HALT instruction
    fn handle_halt<T: Bus>(&mut self, bus: &mut T) {
        if self.ime == ImeState::Disabled && bus.has_irq() {
            // The HALT bug: the CPU does not halt, instead the PC increment
            // of the following fetch is lost.
            self.halt_bug = true;
        } else {
            self.is_halted = true;
        }
    }

    /// Handles INC instructions for bytes, the carry flag stays untouched.
    fn handle_inc_byte<T: Bus>(&mut self, target: ByteTarget, bus: &mut T) {
        let value = target.read(self, bus);
        let result = value.wrapping_add(1);
        target.write(self, bus, result);
        self.r.f.set(FlagsRegister::ZERO, result == 0);
        self.r.f.set(FlagsRegister::SUBTRACTION, false);
        self.r.f.set(FlagsRegister::HALF_CARRY, value & 0x0F == 0x0F);
    }

    /// Handles INC instructions for words, no flags are modified.
    fn handle_inc_word<T: Bus>(&mut self, target: WordRegister, bus: &mut T) {
        let value = target.read(self);
        target.write(self, value.wrapping_add(1));
        bus.cycle();
    }

    /// Handles JR instructions, the offset is relative to the address
    /// of the following instruction.
    fn handle_jr<T: Bus>(&mut self, test: JumpCondition, offset: i8, bus: &mut T) {
        if test.resolve(self) {
            self.pc = self.pc.wrapping_add(offset as u16);
            bus.cycle();
        }
    }

    /// Handles JP instructions. JP HL is the only variant without the
    /// internal delay cycle.
    fn handle_jp<T: Bus>(&mut self, test: JumpCondition, target: JumpTarget, bus: &mut T) {
        if test.resolve(self) {
            self.pc = target.read(self);
            if let JumpTarget::D16(_) = target {
                bus.cycle();
            }
        }
    }

    /// Handles LD instructions
    fn handle_ld<T: Bus>(&mut self, load: Load, bus: &mut T) {
        match load {
            Load::Byte(target, source) => {
                let value = source.read(self, bus);
                target.write(self, bus, value);
            }
            Load::Word(target, source) => {
                let value = source.read(self);
                target.write(self, value);
                // LD SP, HL spends an internal cycle on the transfer
                if let (WordRegister::SP, WordSource::R(_)) = (target, source) {
                    bus.cycle();
                }
            }
            Load::IndirectFrom(target, source) => {
                let value = source.read(self, bus);
                bus.write(target.resolve(self), value);
            }
            Load::HLIFromAInc => {
                let address = self.r.get_hl();
                bus.write(address, self.r.a);
                self.r.set_hl(address.wrapping_add(1));
            }
            Load::HLIFromADec => {
                let address = self.r.get_hl();
                bus.write(address, self.r.a);
                self.r.set_hl(address.wrapping_sub(1));
            }
            Load::HLIToAInc => {
                let address = self.r.get_hl();
                self.r.a = bus.read(address);
                self.r.set_hl(address.wrapping_add(1));
            }
            Load::HLIToADec => {
                let address = self.r.get_hl();
                self.r.a = bus.read(address);
                self.r.set_hl(address.wrapping_sub(1));
            }
            Load::IndirectFromSP(target) => {
                let address = target.resolve(self);
                bus.write(address, self.sp as u8);
                bus.write(address.wrapping_add(1), (self.sp >> 8) as u8);
            }
            Load::HLFromSPi8(value) => {
                let result = self.add_sp_i8(value);
                self.r.set_hl(result);
                bus.cycle();
            }
        }
    }

    /// Handles OR instructions
    fn handle_or<T: Bus>(&mut self, source: ByteSource, bus: &mut T) {
        let value = source.read(self, bus);
        self.r.a |= value;
        self.r.f.update(self.r.a == 0, false, false, false);
    }

    /// Handles POP instruction
    fn handle_pop<T: Bus>(&mut self, target: WordRegister, bus: &mut T) {
        let result = self.pop(bus);
        target.write(self, result);
    }

    /// Handles PUSH instruction
    fn handle_push<T: Bus>(&mut self, target: WordRegister, bus: &mut T) {
        let value = target.read(self);
        bus.cycle();
        self.push(value, bus);
    }

    /// Handles RES instructions, no flags are modified.
    fn handle_res<T: Bus>(&mut self, bit: u8, target: ByteTarget, bus: &mut T) {
        let value = target.read(self, bus);
        target.write(self, bus, utils::set_bit(value, bit, false));
    }

    /// Handles RET instruction
    fn handle_ret<T: Bus>(&mut self, test: JumpCondition, bus: &mut T) {
        // Evaluating the condition takes an extra cycle
        if test != JumpCondition::Always {
            bus.cycle();
        }
        if test.resolve(self) {
            self.pc = self.pop(bus);
            bus.cycle();
        }
    }

    /// Handles RETI instruction, interrupts are enabled immediately.
    fn handle_reti<T: Bus>(&mut self, bus: &mut T) {
        self.pc = self.pop(bus);
        bus.cycle();
        self.ime = ImeState::Enabled;
    }

    /// Handles RL instructions
    /// Rotate n left through Carry flag.
    fn handle_rl<T: Bus>(&mut self, target: ByteTarget, bus: &mut T) {
        let value = target.read(self, bus);
        let carry = value & 0x80 != 0;
        let result = (value << 1) | self.r.f.carry() as u8;
        self.r.f.update(result == 0, false, false, carry);
        target.write(self, bus, result);
    }

    /// Handles RLA instruction
    /// Rotate A left through carry
    fn handle_rla(&mut self) {
        let carry = self.r.a & 0x80 != 0;
        self.r.a = (self.r.a << 1) | self.r.f.carry() as u8;
        self.r.f.update(false, false, false, carry);
    }

    /// Handles RLC instructions
    /// Rotates register to the left and updates CPU flags
    fn handle_rlc<T: Bus>(&mut self, target: ByteTarget, bus: &mut T) {
        let value = target.read(self, bus);
        let result = value.rotate_left(1);
        self.r.f.update(result == 0, false, false, value & 0x80 != 0);
        target.write(self, bus, result);
    }

    /// Handles RLCA instruction
    fn handle_rlca(&mut self) {
        let carry = self.r.a & 0x80 != 0;
        self.r.a = self.r.a.rotate_left(1);
        self.r.f.update(false, false, false, carry);
    }

    /// Handles RR instructions
    fn handle_rr<T: Bus>(&mut self, target: ByteTarget, bus: &mut T) {
        let value = target.read(self, bus);
        let carry = value & 0x01 != 0;
        let result = (value >> 1) | (u8::from(self.r.f.carry()) << 7);
        self.r.f.update(result == 0, false, false, carry);
        target.write(self, bus, result);
    }

    /// Handles RRA instruction
    fn handle_rra(&mut self) {
        let carry = self.r.a & 0x01 != 0;
        self.r.a = (self.r.a >> 1) | (u8::from(self.r.f.carry()) << 7);
        self.r.f.update(false, false, false, carry);
    }

    /// Handles RRC instructions
    fn handle_rrc<T: Bus>(&mut self, target: ByteTarget, bus: &mut T) {
        let value = target.read(self, bus);
        let result = value.rotate_right(1);
        self.r.f.update(result == 0, false, false, value & 0x01 != 0);
        target.write(self, bus, result);
    }

    /// Handles RRCA instruction
    fn handle_rrca(&mut self) {
        let carry = self.r.a & 0x01 != 0;
        self.r.a = self.r.a.rotate_right(1);
        self.r.f.update(false, false, false, carry);
    }

    /// Handles RST instructions
    fn handle_rst<T: Bus>(&mut self, code: ResetCode, bus: &mut T) {
        bus.cycle();
        self.push(self.pc, bus);
        self.pc = code as u16;
    }

    /// Handles SBC instructions
    fn handle_sbc<T: Bus>(&mut self, source: ByteSource, bus: &mut T) {
        let value = source.read(self, bus);
        let borrow_in = self.r.f.carry();
        let half_carry = utils::half_borrow_u8(self.r.a, value, borrow_in);
        let carry = u16::from(self.r.a) < u16::from(value) + u16::from(borrow_in as u8);

        let result = self
            .r
            .a
            .wrapping_sub(value)
            .wrapping_sub(borrow_in as u8);
        self.r.f.update(result == 0, true, half_carry, carry);
        self.r.a = result;
    }

    /// Handles SCF instruction
    fn handle_scf(&mut self) {
        self.r.f.set(FlagsRegister::SUBTRACTION, false);
        self.r.f.set(FlagsRegister::HALF_CARRY, false);
        self.r.f.set(FlagsRegister::CARRY, true);
    }

    /// Handles SET instructions, no flags are modified.
    fn handle_set<T: Bus>(&mut self, bit: u8, target: ByteTarget, bus: &mut T) {
        let value = target.read(self, bus);
        target.write(self, bus, utils::set_bit(value, bit, true));
    }

    /// Handles SLA instructions
    fn handle_sla<T: Bus>(&mut self, target: ByteTarget, bus: &mut T) {
        let value = target.read(self, bus);
        let result = value << 1;
        self.r.f.update(result == 0, false, false, value & 0x80 != 0);
        target.write(self, bus, result);
    }

    /// Handles SRA instructions, the sign bit is kept.
    fn handle_sra<T: Bus>(&mut self, target: ByteTarget, bus: &mut T) {
        let value = target.read(self, bus);
        let result = (value >> 1) | (value & 0x80);
        self.r.f.update(result == 0, false, false, value & 0x01 != 0);
        target.write(self, bus, result);
    }

    /// Handles SRL instructions
    fn handle_srl<T: Bus>(&mut self, target: ByteTarget, bus: &mut T) {
        let value = target.read(self, bus);
        let result = value >> 1;
        self.r.f.update(result == 0, false, false, value & 0x01 != 0);
        target.write(self, bus, result);
    }

    /// Handles the STOP instruction. On CGB a prepared speed switch is
    /// performed instead of entering stop mode. The padding byte after
    /// the opcode is skipped either way.
    fn handle_stop<T: Bus>(&mut self, bus: &mut T) {
        self.pc = self.pc.wrapping_add(1);
        if !bus.take_speed_switch_request() {
            self.is_stopped = true;
        }
    }

    /// Handles SUB instructions
    fn handle_sub<T: Bus>(&mut self, source: ByteSource, bus: &mut T) {
        let value = source.read(self, bus);
        let result = self.r.a.wrapping_sub(value);
        self.r.f.update(
            result == 0,
            true,
            utils::half_borrow_u8(self.r.a, value, false),
            self.r.a < value,
        );
        self.r.a = result;
    }

    /// Handles SWAP instructions
    fn handle_swap<T: Bus>(&mut self, target: ByteTarget, bus: &mut T) {
        let value = target.read(self, bus);
        self.r.f.update(value == 0, false, false, false);
        target.write(self, bus, value.rotate_right(4));
    }

    /// Handles XOR instructions
    fn handle_xor<T: Bus>(&mut self, source: ByteSource, bus: &mut T) {
        let value = source.read(self, bus);
        self.r.a ^= value;
        self.r.f.update(self.r.a == 0, false, false, false);
    }
}
