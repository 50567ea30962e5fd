//! Instruction execution: operand fetch, register/memory/flag updates, and
//! the per-instruction PC delta and cycle cost.

use crate::cpu::decode::{
    AccumAddr, Condition, Instruction, LoadDst8, LoadSrc8, Operand8, Reg16, Reg8, StackReg16,
    Target8,
};
use crate::cpu::math::test_add_carry_bit;
use crate::cpu::regs::Flag;
use crate::cpu::Cpu;
use crate::error::CoreError;
use crate::memory::{read16, read_signed, write16, Memory};

/// The outcome of one executed instruction: where PC lands, what the
/// instruction cost, and whether it was HALT.
#[derive(Clone, Copy, Debug)]
pub struct Step {
    pub pc: u16,
    pub cycles: u32,
    pub halted: bool,
}

impl Step {
    fn new(pc: u16, cycles: u32) -> Step {
        Step {
            pc,
            cycles,
            halted: false,
        }
    }
}

impl Cpu {
    #[inline]
    fn reg8(&self, reg: Reg8) -> u8 {
        match reg {
            Reg8::A => self.regs.a,
            Reg8::B => self.regs.b,
            Reg8::C => self.regs.c,
            Reg8::D => self.regs.d,
            Reg8::E => self.regs.e,
            Reg8::H => self.regs.h,
            Reg8::L => self.regs.l,
        }
    }

    #[inline]
    fn set_reg8(&mut self, reg: Reg8, value: u8) {
        match reg {
            Reg8::A => self.regs.a = value,
            Reg8::B => self.regs.b = value,
            Reg8::C => self.regs.c = value,
            Reg8::D => self.regs.d = value,
            Reg8::E => self.regs.e = value,
            Reg8::H => self.regs.h = value,
            Reg8::L => self.regs.l = value,
        }
    }

    #[inline]
    fn reg16(&self, reg: Reg16) -> u16 {
        match reg {
            Reg16::Bc => self.regs.bc(),
            Reg16::De => self.regs.de(),
            Reg16::Hl => self.regs.hl(),
            Reg16::Sp => self.regs.sp,
        }
    }

    #[inline]
    fn set_reg16(&mut self, reg: Reg16, value: u16) {
        match reg {
            Reg16::Bc => self.regs.set_bc(value),
            Reg16::De => self.regs.set_de(value),
            Reg16::Hl => self.regs.set_hl(value),
            Reg16::Sp => self.regs.sp = value,
        }
    }

    #[inline]
    fn stack_reg16(&self, reg: StackReg16) -> u16 {
        match reg {
            StackReg16::Af => self.regs.af(),
            StackReg16::Bc => self.regs.bc(),
            StackReg16::De => self.regs.de(),
            StackReg16::Hl => self.regs.hl(),
        }
    }

    #[inline]
    fn set_stack_reg16(&mut self, reg: StackReg16, value: u16) {
        match reg {
            StackReg16::Af => self.regs.set_af(value),
            StackReg16::Bc => self.regs.set_bc(value),
            StackReg16::De => self.regs.set_de(value),
            StackReg16::Hl => self.regs.set_hl(value),
        }
    }

    /// Fetch an ALU operand; the immediate lives right after the opcode.
    fn read_operand8<M: Memory>(&self, bus: &M, operand: Operand8) -> Result<u8, CoreError> {
        match operand {
            Operand8::Reg(reg) => Ok(self.reg8(reg)),
            Operand8::HlIndirect => bus.read(self.regs.hl()),
            Operand8::Immediate => bus.read(self.regs.pc.wrapping_add(1)),
        }
    }

    fn read_load_src<M: Memory>(&self, bus: &M, src: LoadSrc8) -> Result<u8, CoreError> {
        match src {
            LoadSrc8::Reg(reg) => Ok(self.reg8(reg)),
            LoadSrc8::HlIndirect => bus.read(self.regs.hl()),
            LoadSrc8::Immediate => bus.read(self.regs.pc.wrapping_add(1)),
            LoadSrc8::ImmediateIndirect => {
                let address = read16(bus, self.regs.pc.wrapping_add(1))?;
                bus.read(address)
            }
        }
    }

    fn read_target8<M: Memory>(&self, bus: &M, target: Target8) -> Result<u8, CoreError> {
        match target {
            Target8::Reg(reg) => Ok(self.reg8(reg)),
            Target8::HlIndirect => bus.read(self.regs.hl()),
        }
    }

    fn write_target8<M: Memory>(
        &mut self,
        bus: &mut M,
        target: Target8,
        value: u8,
    ) -> Result<(), CoreError> {
        match target {
            Target8::Reg(reg) => {
                self.set_reg8(reg, value);
                Ok(())
            }
            Target8::HlIndirect => bus.write(self.regs.hl(), value),
        }
    }

    #[inline]
    fn condition_met(&self, condition: Condition) -> bool {
        match condition {
            Condition::Always => true,
            Condition::Zero => self.regs.flag(Flag::Z),
            Condition::NotZero => !self.regs.flag(Flag::Z),
            Condition::Carry => self.regs.flag(Flag::C),
            Condition::NotCarry => !self.regs.flag(Flag::C),
        }
    }

    /// Push a 16-bit value: SP drops by two around a little-endian write.
    pub(crate) fn push16<M: Memory>(&mut self, bus: &mut M, value: u16) -> Result<(), CoreError> {
        self.regs.sp = self.regs.sp.wrapping_sub(2);
        write16(bus, self.regs.sp, value)
    }

    fn pop16<M: Memory>(&mut self, bus: &mut M) -> Result<u16, CoreError> {
        let value = read16(bus, self.regs.sp)?;
        self.regs.sp = self.regs.sp.wrapping_add(2);
        Ok(value)
    }

    /// PC delta and cost shared by the 8-bit ALU family.
    fn arithmetic_step(&self, operand: Operand8) -> Step {
        let (delta, cycles) = match operand {
            Operand8::Immediate => (2, 8),
            Operand8::HlIndirect => (1, 8),
            Operand8::Reg(_) => (1, 4),
        };
        Step::new(self.regs.pc.wrapping_add(delta), cycles)
    }

    /// PC delta and cost shared by the prefixed rotate/shift/bit family:
    /// two bytes long, doubled cost when routed through (HL).
    fn prefixed_step(&self, target: Target8) -> Step {
        let cycles = match target {
            Target8::HlIndirect => 16,
            Target8::Reg(_) => 8,
        };
        Step::new(self.regs.pc.wrapping_add(2), cycles)
    }

    /// Execute one decoded instruction against registers and the bus.
    pub(crate) fn execute<M: Memory>(
        &mut self,
        instruction: Instruction,
        bus: &mut M,
    ) -> Result<Step, CoreError> {
        let pc = self.regs.pc;

        let step = match instruction {
            Instruction::Nop => Step::new(pc.wrapping_add(1), 4),

            Instruction::Load8 { dst, src } => {
                let value = self.read_load_src(bus, src)?;
                match dst {
                    LoadDst8::Reg(reg) => self.set_reg8(reg, value),
                    LoadDst8::HlIndirect => bus.write(self.regs.hl(), value)?,
                    LoadDst8::ImmediateIndirect => {
                        let address = read16(bus, pc.wrapping_add(1))?;
                        bus.write(address, value)?;
                    }
                }

                let through_immediate_address = matches!(src, LoadSrc8::ImmediateIndirect)
                    || matches!(dst, LoadDst8::ImmediateIndirect);
                let delta = if through_immediate_address {
                    3
                } else if matches!(src, LoadSrc8::Immediate) {
                    2
                } else {
                    1
                };
                let cycles = if matches!(src, LoadSrc8::HlIndirect | LoadSrc8::Immediate)
                    || matches!(dst, LoadDst8::HlIndirect)
                {
                    8
                } else if through_immediate_address {
                    12
                } else {
                    4
                };
                Step::new(pc.wrapping_add(delta), cycles)
            }

            Instruction::Load16Immediate(reg) => {
                let value = read16(bus, pc.wrapping_add(1))?;
                self.set_reg16(reg, value);
                Step::new(pc.wrapping_add(3), 12)
            }

            Instruction::LoadSpHl => {
                self.regs.sp = self.regs.hl();
                Step::new(pc.wrapping_add(1), 8)
            }

            Instruction::LoadHlSpOffset => {
                let offset = read_signed(bus, pc.wrapping_add(1))? as i16 as u16;
                let sp = self.regs.sp;
                self.regs.set_flag(Flag::Z, false);
                self.regs.set_flag(Flag::N, false);
                self.regs.set_flag(Flag::H, test_add_carry_bit(3, sp, offset));
                self.regs.set_flag(Flag::C, test_add_carry_bit(7, sp, offset));
                self.regs.set_hl(sp.wrapping_add(offset));
                Step::new(pc.wrapping_add(2), 12)
            }

            Instruction::AddSpImmediate => {
                let offset = read_signed(bus, pc.wrapping_add(1))? as i16 as u16;
                let sp = self.regs.sp;
                self.regs.set_flag(Flag::Z, false);
                self.regs.set_flag(Flag::N, false);
                self.regs.set_flag(Flag::H, test_add_carry_bit(3, sp, offset));
                self.regs.set_flag(Flag::C, test_add_carry_bit(7, sp, offset));
                self.regs.sp = sp.wrapping_add(offset);
                Step::new(pc.wrapping_add(2), 16)
            }

            Instruction::StoreSpImmediate => {
                let address = read16(bus, pc.wrapping_add(1))?;
                write16(bus, address, self.regs.sp)?;
                Step::new(pc.wrapping_add(3), 20)
            }

            Instruction::LoadAccumIndirect(addr) => {
                let address = self.accum_address(addr);
                self.regs.a = bus.read(address)?;
                Step::new(pc.wrapping_add(1), 8)
            }

            Instruction::StoreAccumIndirect(addr) => {
                let address = self.accum_address(addr);
                bus.write(address, self.regs.a)?;
                Step::new(pc.wrapping_add(1), 8)
            }

            Instruction::LoadAccumHigh => {
                let offset = bus.read(pc.wrapping_add(1))?;
                self.regs.a = bus.read(0xFF00 + offset as u16)?;
                Step::new(pc.wrapping_add(2), 12)
            }

            Instruction::StoreAccumHigh => {
                let offset = bus.read(pc.wrapping_add(1))?;
                bus.write(0xFF00 + offset as u16, self.regs.a)?;
                Step::new(pc.wrapping_add(2), 12)
            }

            Instruction::LoadAccumHighC => {
                self.regs.a = bus.read(0xFF00 + self.regs.c as u16)?;
                Step::new(pc.wrapping_add(1), 8)
            }

            Instruction::StoreAccumHighC => {
                bus.write(0xFF00 + self.regs.c as u16, self.regs.a)?;
                Step::new(pc.wrapping_add(1), 8)
            }

            Instruction::Add(operand) => {
                let value = self.read_operand8(bus, operand)?;
                let a = self.regs.a;
                let (result, carry) = a.overflowing_add(value);
                self.regs.set_flag(Flag::Z, result == 0);
                self.regs.set_flag(Flag::N, false);
                self.regs
                    .set_flag(Flag::H, (a & 0x0F) + (value & 0x0F) > 0x0F);
                self.regs.set_flag(Flag::C, carry);
                self.regs.a = result;
                self.arithmetic_step(operand)
            }

            Instruction::AddCarry(operand) => {
                let value = self.read_operand8(bus, operand)?;
                let carry = self.regs.flag(Flag::C) as u8;
                let a = self.regs.a;
                let result = a.wrapping_add(value).wrapping_add(carry);
                self.regs.set_flag(Flag::Z, result == 0);
                self.regs.set_flag(Flag::N, false);
                self.regs
                    .set_flag(Flag::H, (a & 0x0F) + (value & 0x0F) + carry > 0x0F);
                self.regs.set_flag(
                    Flag::C,
                    a as u16 + value as u16 + carry as u16 > 0xFF,
                );
                self.regs.a = result;
                self.arithmetic_step(operand)
            }

            Instruction::Subtract(operand) => {
                let value = self.read_operand8(bus, operand)?;
                let a = self.regs.a;
                let (result, borrow) = a.overflowing_sub(value);
                self.regs.set_flag(Flag::Z, result == 0);
                self.regs.set_flag(Flag::N, true);
                // Half borrow out of the low nibble.
                self.regs
                    .set_flag(Flag::H, (a & 0x0F).wrapping_sub(value & 0x0F) & 0x10 != 0);
                self.regs.set_flag(Flag::C, borrow);
                self.regs.a = result;
                self.arithmetic_step(operand)
            }

            Instruction::SubtractCarry(operand) => {
                let value = self.read_operand8(bus, operand)?;
                let carry = self.regs.flag(Flag::C) as u8;
                let a = self.regs.a;
                let result = a.wrapping_sub(value).wrapping_sub(carry);
                self.regs.set_flag(Flag::Z, result == 0);
                self.regs.set_flag(Flag::N, true);
                self.regs.set_flag(
                    Flag::H,
                    (a & 0x0F).wrapping_sub(value & 0x0F).wrapping_sub(carry) & 0x10 != 0,
                );
                self.regs
                    .set_flag(Flag::C, (a as u16) < value as u16 + carry as u16);
                self.regs.a = result;
                self.arithmetic_step(operand)
            }

            Instruction::And(operand) => {
                let value = self.read_operand8(bus, operand)?;
                let result = self.regs.a & value;
                self.regs.clear_flags();
                self.regs.set_flag(Flag::Z, result == 0);
                self.regs.set_flag(Flag::H, true);
                self.regs.a = result;
                self.arithmetic_step(operand)
            }

            Instruction::Xor(operand) => {
                let value = self.read_operand8(bus, operand)?;
                let result = self.regs.a ^ value;
                self.regs.clear_flags();
                self.regs.set_flag(Flag::Z, result == 0);
                self.regs.a = result;
                self.arithmetic_step(operand)
            }

            Instruction::Or(operand) => {
                let value = self.read_operand8(bus, operand)?;
                let result = self.regs.a | value;
                self.regs.clear_flags();
                self.regs.set_flag(Flag::Z, result == 0);
                self.regs.a = result;
                self.arithmetic_step(operand)
            }

            Instruction::Compare(operand) => {
                let value = self.read_operand8(bus, operand)?;
                let a = self.regs.a;
                self.regs.set_flag(Flag::Z, a == value);
                self.regs.set_flag(Flag::N, true);
                self.regs
                    .set_flag(Flag::H, (a & 0x0F).wrapping_sub(value & 0x0F) & 0x10 != 0);
                self.regs.set_flag(Flag::C, a < value);
                self.arithmetic_step(operand)
            }

            Instruction::AddHl(reg) => {
                let value = self.reg16(reg);
                let hl = self.regs.hl();
                self.regs.set_flag(Flag::N, false);
                // Half carry at bit 11, full carry at bit 15; Z untouched.
                self.regs
                    .set_flag(Flag::H, test_add_carry_bit(11, hl, value));
                self.regs
                    .set_flag(Flag::C, test_add_carry_bit(15, hl, value));
                self.regs.set_hl(hl.wrapping_add(value));
                Step::new(pc.wrapping_add(1), 8)
            }

            Instruction::Increment(target) => {
                let value = self.read_target8(bus, target)?;
                let result = value.wrapping_add(1);
                // Carry is never touched by INC.
                self.regs.set_flag(Flag::Z, result == 0);
                self.regs.set_flag(Flag::N, false);
                self.regs.set_flag(Flag::H, value & 0x0F == 0x0F);
                self.write_target8(bus, target, result)?;
                let cycles = if target == Target8::HlIndirect { 8 } else { 4 };
                Step::new(pc.wrapping_add(1), cycles)
            }

            Instruction::Decrement(target) => {
                let value = self.read_target8(bus, target)?;
                let result = value.wrapping_sub(1);
                // Carry is never touched by DEC.
                self.regs.set_flag(Flag::Z, result == 0);
                self.regs.set_flag(Flag::N, true);
                self.regs.set_flag(Flag::H, value & 0x0F == 0);
                self.write_target8(bus, target, result)?;
                let cycles = if target == Target8::HlIndirect { 8 } else { 4 };
                Step::new(pc.wrapping_add(1), cycles)
            }

            Instruction::Increment16(reg) => {
                self.set_reg16(reg, self.reg16(reg).wrapping_add(1));
                Step::new(pc.wrapping_add(1), 8)
            }

            Instruction::Decrement16(reg) => {
                self.set_reg16(reg, self.reg16(reg).wrapping_sub(1));
                Step::new(pc.wrapping_add(1), 8)
            }

            Instruction::Rlca => {
                let a = self.regs.a;
                self.regs.a = a.rotate_left(1);
                self.regs.clear_flags();
                self.regs.set_flag(Flag::C, a & 0x80 != 0);
                Step::new(pc.wrapping_add(1), 4)
            }

            Instruction::Rla => {
                let a = self.regs.a;
                let carry_in = self.regs.flag(Flag::C) as u8;
                self.regs.a = (a << 1) | carry_in;
                self.regs.clear_flags();
                self.regs.set_flag(Flag::C, a & 0x80 != 0);
                Step::new(pc.wrapping_add(1), 4)
            }

            Instruction::Rrca => {
                let a = self.regs.a;
                self.regs.a = a.rotate_right(1);
                self.regs.clear_flags();
                self.regs.set_flag(Flag::C, a & 0x01 != 0);
                Step::new(pc.wrapping_add(1), 4)
            }

            Instruction::Rra => {
                let a = self.regs.a;
                let carry_in = (self.regs.flag(Flag::C) as u8) << 7;
                self.regs.a = (a >> 1) | carry_in;
                self.regs.clear_flags();
                self.regs.set_flag(Flag::C, a & 0x01 != 0);
                Step::new(pc.wrapping_add(1), 4)
            }

            Instruction::DecimalAdjust => {
                let mut a = self.regs.a;
                if self.regs.flag(Flag::N) {
                    if self.regs.flag(Flag::C) {
                        a = a.wrapping_sub(0x60);
                    }
                    if self.regs.flag(Flag::H) {
                        a = a.wrapping_sub(0x06);
                    }
                } else {
                    if self.regs.flag(Flag::C) || a > 0x99 {
                        a = a.wrapping_add(0x60);
                        self.regs.set_flag(Flag::C, true);
                    }
                    if self.regs.flag(Flag::H) || a & 0x0F > 0x09 {
                        a = a.wrapping_add(0x06);
                    }
                }
                self.regs.set_flag(Flag::Z, a == 0);
                self.regs.set_flag(Flag::H, false);
                self.regs.a = a;
                Step::new(pc.wrapping_add(1), 4)
            }

            Instruction::Complement => {
                self.regs.a = !self.regs.a;
                self.regs.set_flag(Flag::N, true);
                self.regs.set_flag(Flag::H, true);
                Step::new(pc.wrapping_add(1), 4)
            }

            Instruction::SetCarryFlag => {
                self.regs.set_flag(Flag::N, false);
                self.regs.set_flag(Flag::H, false);
                self.regs.set_flag(Flag::C, true);
                Step::new(pc.wrapping_add(1), 4)
            }

            Instruction::ComplementCarryFlag => {
                let carry = self.regs.flag(Flag::C);
                self.regs.set_flag(Flag::N, false);
                self.regs.set_flag(Flag::H, false);
                self.regs.set_flag(Flag::C, !carry);
                Step::new(pc.wrapping_add(1), 4)
            }

            Instruction::Jump(condition) => {
                if self.condition_met(condition) {
                    let address = read16(bus, pc.wrapping_add(1))?;
                    Step::new(address, 16)
                } else {
                    Step::new(pc.wrapping_add(3), 12)
                }
            }

            Instruction::JumpHl => Step::new(self.regs.hl(), 4),

            Instruction::JumpRelative(condition) => {
                if self.condition_met(condition) {
                    let offset = read_signed(bus, pc.wrapping_add(1))? as i16 as u16;
                    Step::new(pc.wrapping_add(2).wrapping_add(offset), 12)
                } else {
                    Step::new(pc.wrapping_add(2), 8)
                }
            }

            Instruction::Push(reg) => {
                let value = self.stack_reg16(reg);
                self.push16(bus, value)?;
                Step::new(pc.wrapping_add(1), 16)
            }

            Instruction::Pop(reg) => {
                let value = self.pop16(bus)?;
                self.set_stack_reg16(reg, value);
                Step::new(pc.wrapping_add(1), 12)
            }

            Instruction::Call(condition) => {
                if self.condition_met(condition) {
                    self.push16(bus, pc.wrapping_add(3))?;
                    let address = read16(bus, pc.wrapping_add(1))?;
                    Step::new(address, 24)
                } else {
                    Step::new(pc.wrapping_add(3), 12)
                }
            }

            Instruction::Return(condition) => {
                if self.condition_met(condition) {
                    let address = self.pop16(bus)?;
                    Step::new(address, 16)
                } else {
                    Step::new(pc.wrapping_add(1), 8)
                }
            }

            Instruction::ReturnEnableInterrupts => {
                self.ime = true;
                let address = self.pop16(bus)?;
                Step::new(address, 16)
            }

            Instruction::Restart(target) => {
                self.push16(bus, pc.wrapping_add(1))?;
                Step::new(target as u16, 16)
            }

            Instruction::DisableInterrupts => {
                self.ime = false;
                Step::new(pc.wrapping_add(1), 4)
            }

            Instruction::EnableInterrupts => {
                self.ime = true;
                Step::new(pc.wrapping_add(1), 4)
            }

            Instruction::Halt => Step {
                pc: pc.wrapping_add(1),
                cycles: 4,
                halted: true,
            },

            Instruction::Stop => return Err(CoreError::StopUnsupported),

            Instruction::Rlc(target) => {
                let value = self.read_target8(bus, target)?;
                let result = value.rotate_left(1);
                self.write_target8(bus, target, result)?;
                self.regs.clear_flags();
                self.regs.set_flag(Flag::Z, result == 0);
                self.regs.set_flag(Flag::C, value & 0x80 != 0);
                self.prefixed_step(target)
            }

            Instruction::Rrc(target) => {
                let value = self.read_target8(bus, target)?;
                let result = value.rotate_right(1);
                self.write_target8(bus, target, result)?;
                self.regs.clear_flags();
                self.regs.set_flag(Flag::Z, result == 0);
                self.regs.set_flag(Flag::C, value & 0x01 != 0);
                self.prefixed_step(target)
            }

            Instruction::Rl(target) => {
                let value = self.read_target8(bus, target)?;
                let carry_in = self.regs.flag(Flag::C) as u8;
                let result = (value << 1) | carry_in;
                self.write_target8(bus, target, result)?;
                self.regs.clear_flags();
                self.regs.set_flag(Flag::Z, result == 0);
                self.regs.set_flag(Flag::C, value & 0x80 != 0);
                self.prefixed_step(target)
            }

            Instruction::Rr(target) => {
                let value = self.read_target8(bus, target)?;
                let carry_in = (self.regs.flag(Flag::C) as u8) << 7;
                let result = (value >> 1) | carry_in;
                self.write_target8(bus, target, result)?;
                self.regs.clear_flags();
                self.regs.set_flag(Flag::Z, result == 0);
                self.regs.set_flag(Flag::C, value & 0x01 != 0);
                self.prefixed_step(target)
            }

            Instruction::Sla(target) => {
                let value = self.read_target8(bus, target)?;
                let result = value << 1;
                self.write_target8(bus, target, result)?;
                self.regs.clear_flags();
                self.regs.set_flag(Flag::Z, result == 0);
                self.regs.set_flag(Flag::C, value & 0x80 != 0);
                self.prefixed_step(target)
            }

            Instruction::Sra(target) => {
                let value = self.read_target8(bus, target)?;
                let result = (value >> 1) | (value & 0x80);
                self.write_target8(bus, target, result)?;
                self.regs.clear_flags();
                self.regs.set_flag(Flag::Z, result == 0);
                self.regs.set_flag(Flag::C, value & 0x01 != 0);
                self.prefixed_step(target)
            }

            Instruction::Swap(target) => {
                let value = self.read_target8(bus, target)?;
                let result = value.rotate_left(4);
                self.write_target8(bus, target, result)?;
                self.regs.clear_flags();
                self.regs.set_flag(Flag::Z, result == 0);
                self.prefixed_step(target)
            }

            Instruction::Srl(target) => {
                let value = self.read_target8(bus, target)?;
                let result = value >> 1;
                self.write_target8(bus, target, result)?;
                self.regs.clear_flags();
                self.regs.set_flag(Flag::Z, result == 0);
                self.regs.set_flag(Flag::C, value & 0x01 != 0);
                self.prefixed_step(target)
            }

            Instruction::Bit { bit, target } => {
                let value = self.read_target8(bus, target)?;
                // C is preserved; only Z/N/H change.
                self.regs.set_flag(Flag::Z, value & (1 << bit) == 0);
                self.regs.set_flag(Flag::N, false);
                self.regs.set_flag(Flag::H, true);
                self.prefixed_step(target)
            }

            Instruction::Res { bit, target } => {
                let value = self.read_target8(bus, target)?;
                self.write_target8(bus, target, value & !(1 << bit))?;
                self.prefixed_step(target)
            }

            Instruction::Set { bit, target } => {
                let value = self.read_target8(bus, target)?;
                self.write_target8(bus, target, value | (1 << bit))?;
                self.prefixed_step(target)
            }
        };

        Ok(step)
    }

    /// Resolve the address for `LD A,(..)`/`LD (..),A`, applying the HL
    /// post-increment/decrement variants as a side effect.
    fn accum_address(&mut self, addr: AccumAddr) -> u16 {
        match addr {
            AccumAddr::Bc => self.regs.bc(),
            AccumAddr::De => self.regs.de(),
            AccumAddr::HlIncrement => {
                let hl = self.regs.hl();
                self.regs.set_hl(hl.wrapping_add(1));
                hl
            }
            AccumAddr::HlDecrement => {
                let hl = self.regs.hl();
                self.regs.set_hl(hl.wrapping_sub(1));
                hl
            }
        }
    }
}
