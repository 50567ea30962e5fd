//! Opcode decoding: a pure function from a raw opcode byte (plus the 0xCB
//! prefix flag) to an immutable instruction description.
//!
//! Decoding never touches memory beyond the opcode byte itself; operand
//! fetching happens during execution. The base table rejects the reserved
//! opcodes; the extended table is total.

use crate::error::CoreError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reg8 {
    A,
    B,
    C,
    D,
    E,
    H,
    L,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reg16 {
    Bc,
    De,
    Hl,
    Sp,
}

/// The 16-bit registers PUSH/POP can address; AF replaces SP here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StackReg16 {
    Af,
    Bc,
    De,
    Hl,
}

/// Source of an 8-bit ALU operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operand8 {
    Reg(Reg8),
    HlIndirect,
    Immediate,
}

/// A writable 8-bit location: a register or the byte HL points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target8 {
    Reg(Reg8),
    HlIndirect,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadSrc8 {
    Reg(Reg8),
    HlIndirect,
    Immediate,
    ImmediateIndirect,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadDst8 {
    Reg(Reg8),
    HlIndirect,
    ImmediateIndirect,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Condition {
    Always,
    Zero,
    NotZero,
    Carry,
    NotCarry,
}

/// Indirect addressing through a register pair for `LD A,(..)`/`LD (..),A`,
/// including the post-increment/decrement HL forms.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccumAddr {
    Bc,
    De,
    HlIncrement,
    HlDecrement,
}

/// A decoded instruction: operation kind plus operand descriptors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Instruction {
    Nop,
    Load8 { dst: LoadDst8, src: LoadSrc8 },
    Load16Immediate(Reg16),
    LoadSpHl,
    LoadHlSpOffset,
    AddSpImmediate,
    StoreSpImmediate,
    LoadAccumIndirect(AccumAddr),
    StoreAccumIndirect(AccumAddr),
    LoadAccumHigh,
    StoreAccumHigh,
    LoadAccumHighC,
    StoreAccumHighC,
    Add(Operand8),
    AddCarry(Operand8),
    Subtract(Operand8),
    SubtractCarry(Operand8),
    And(Operand8),
    Xor(Operand8),
    Or(Operand8),
    Compare(Operand8),
    AddHl(Reg16),
    Increment(Target8),
    Decrement(Target8),
    Increment16(Reg16),
    Decrement16(Reg16),
    Rlca,
    Rla,
    Rrca,
    Rra,
    DecimalAdjust,
    Complement,
    SetCarryFlag,
    ComplementCarryFlag,
    Jump(Condition),
    JumpHl,
    JumpRelative(Condition),
    Push(StackReg16),
    Pop(StackReg16),
    Call(Condition),
    Return(Condition),
    ReturnEnableInterrupts,
    Restart(u8),
    DisableInterrupts,
    EnableInterrupts,
    Halt,
    Stop,
    // 0xCB-prefixed rotate/shift/bit page.
    Rlc(Target8),
    Rrc(Target8),
    Rl(Target8),
    Rr(Target8),
    Sla(Target8),
    Sra(Target8),
    Swap(Target8),
    Srl(Target8),
    Bit { bit: u8, target: Target8 },
    Res { bit: u8, target: Target8 },
    Set { bit: u8, target: Target8 },
}

/// Result of decoding a base-table byte: either a complete instruction or
/// the 0xCB marker telling the CPU to redecode the next byte through the
/// extended table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decoded {
    Extended,
    Instruction(Instruction),
}

/// Standard register order used by the opcode tables:
/// 0=B, 1=C, 2=D, 3=E, 4=H, 5=L, 6=(HL), 7=A.
fn target8_from_index(index: u8) -> Target8 {
    match index & 0x07 {
        0 => Target8::Reg(Reg8::B),
        1 => Target8::Reg(Reg8::C),
        2 => Target8::Reg(Reg8::D),
        3 => Target8::Reg(Reg8::E),
        4 => Target8::Reg(Reg8::H),
        5 => Target8::Reg(Reg8::L),
        6 => Target8::HlIndirect,
        _ => Target8::Reg(Reg8::A),
    }
}

fn operand8_from_index(index: u8) -> Operand8 {
    match target8_from_index(index) {
        Target8::Reg(reg) => Operand8::Reg(reg),
        Target8::HlIndirect => Operand8::HlIndirect,
    }
}

fn load_src_from_index(index: u8) -> LoadSrc8 {
    match target8_from_index(index) {
        Target8::Reg(reg) => LoadSrc8::Reg(reg),
        Target8::HlIndirect => LoadSrc8::HlIndirect,
    }
}

fn load_dst_from_index(index: u8) -> LoadDst8 {
    match target8_from_index(index) {
        Target8::Reg(reg) => LoadDst8::Reg(reg),
        Target8::HlIndirect => LoadDst8::HlIndirect,
    }
}

/// Register pair order in the 0x00-0x3F block: BC, DE, HL, SP.
fn reg16_from_index(index: u8) -> Reg16 {
    match index & 0x03 {
        0 => Reg16::Bc,
        1 => Reg16::De,
        2 => Reg16::Hl,
        _ => Reg16::Sp,
    }
}

/// PUSH/POP pair order: BC, DE, HL, AF.
fn stack_reg_from_index(index: u8) -> StackReg16 {
    match index & 0x03 {
        0 => StackReg16::Bc,
        1 => StackReg16::De,
        2 => StackReg16::Hl,
        _ => StackReg16::Af,
    }
}

/// Condition order in the opcode tables: NZ, Z, NC, C.
fn condition_from_index(index: u8) -> Condition {
    match index & 0x03 {
        0 => Condition::NotZero,
        1 => Condition::Zero,
        2 => Condition::NotCarry,
        _ => Condition::Carry,
    }
}

fn accum_addr_from_index(index: u8) -> AccumAddr {
    match index & 0x03 {
        0 => AccumAddr::Bc,
        1 => AccumAddr::De,
        2 => AccumAddr::HlIncrement,
        _ => AccumAddr::HlDecrement,
    }
}

/// ALU operation order: ADD, ADC, SUB, SBC, AND, XOR, OR, CP.
fn alu_from_index(index: u8, operand: Operand8) -> Instruction {
    match index & 0x07 {
        0 => Instruction::Add(operand),
        1 => Instruction::AddCarry(operand),
        2 => Instruction::Subtract(operand),
        3 => Instruction::SubtractCarry(operand),
        4 => Instruction::And(operand),
        5 => Instruction::Xor(operand),
        6 => Instruction::Or(operand),
        _ => Instruction::Compare(operand),
    }
}

/// Decode a base-table opcode byte.
///
/// Total over the legal subset; the reserved opcodes fail with
/// `InvalidOpcode`.
pub fn decode(opcode: u8) -> Result<Decoded, CoreError> {
    if opcode == 0xCB {
        return Ok(Decoded::Extended);
    }

    let instruction = match opcode {
        0x00 => Instruction::Nop,
        0x10 => Instruction::Stop,
        0x76 => Instruction::Halt,

        0x07 => Instruction::Rlca,
        0x0F => Instruction::Rrca,
        0x17 => Instruction::Rla,
        0x1F => Instruction::Rra,
        0x27 => Instruction::DecimalAdjust,
        0x2F => Instruction::Complement,
        0x37 => Instruction::SetCarryFlag,
        0x3F => Instruction::ComplementCarryFlag,

        0x08 => Instruction::StoreSpImmediate,
        0x18 => Instruction::JumpRelative(Condition::Always),
        0x20 | 0x28 | 0x30 | 0x38 => {
            Instruction::JumpRelative(condition_from_index((opcode >> 3) & 0x03))
        }

        0x01 | 0x11 | 0x21 | 0x31 => Instruction::Load16Immediate(reg16_from_index(opcode >> 4)),
        0x03 | 0x13 | 0x23 | 0x33 => Instruction::Increment16(reg16_from_index(opcode >> 4)),
        0x0B | 0x1B | 0x2B | 0x3B => Instruction::Decrement16(reg16_from_index(opcode >> 4)),
        0x09 | 0x19 | 0x29 | 0x39 => Instruction::AddHl(reg16_from_index(opcode >> 4)),

        0x02 | 0x12 | 0x22 | 0x32 => {
            Instruction::StoreAccumIndirect(accum_addr_from_index(opcode >> 4))
        }
        0x0A | 0x1A | 0x2A | 0x3A => {
            Instruction::LoadAccumIndirect(accum_addr_from_index(opcode >> 4))
        }

        op if op & 0xC7 == 0x04 => Instruction::Increment(target8_from_index(op >> 3)),
        op if op & 0xC7 == 0x05 => Instruction::Decrement(target8_from_index(op >> 3)),
        op if op & 0xC7 == 0x06 => Instruction::Load8 {
            dst: load_dst_from_index(op >> 3),
            src: LoadSrc8::Immediate,
        },

        0x40..=0x7F => Instruction::Load8 {
            dst: load_dst_from_index(opcode >> 3),
            src: load_src_from_index(opcode),
        },
        0x80..=0xBF => alu_from_index(opcode >> 3, operand8_from_index(opcode)),

        0xC0 | 0xC8 | 0xD0 | 0xD8 => {
            Instruction::Return(condition_from_index((opcode >> 3) & 0x03))
        }
        0xC9 => Instruction::Return(Condition::Always),
        0xD9 => Instruction::ReturnEnableInterrupts,

        0xC1 | 0xD1 | 0xE1 | 0xF1 => Instruction::Pop(stack_reg_from_index(opcode >> 4)),
        0xC5 | 0xD5 | 0xE5 | 0xF5 => Instruction::Push(stack_reg_from_index(opcode >> 4)),

        0xC2 | 0xCA | 0xD2 | 0xDA => Instruction::Jump(condition_from_index((opcode >> 3) & 0x03)),
        0xC3 => Instruction::Jump(Condition::Always),
        0xE9 => Instruction::JumpHl,

        0xC4 | 0xCC | 0xD4 | 0xDC => Instruction::Call(condition_from_index((opcode >> 3) & 0x03)),
        0xCD => Instruction::Call(Condition::Always),

        op if op & 0xC7 == 0xC6 => alu_from_index(op >> 3, Operand8::Immediate),
        op if op & 0xC7 == 0xC7 => Instruction::Restart(op & 0x38),

        0xE0 => Instruction::StoreAccumHigh,
        0xF0 => Instruction::LoadAccumHigh,
        0xE2 => Instruction::StoreAccumHighC,
        0xF2 => Instruction::LoadAccumHighC,
        0xE8 => Instruction::AddSpImmediate,
        0xF8 => Instruction::LoadHlSpOffset,
        0xF9 => Instruction::LoadSpHl,
        0xEA => Instruction::Load8 {
            dst: LoadDst8::ImmediateIndirect,
            src: LoadSrc8::Reg(Reg8::A),
        },
        0xFA => Instruction::Load8 {
            dst: LoadDst8::Reg(Reg8::A),
            src: LoadSrc8::ImmediateIndirect,
        },
        0xF3 => Instruction::DisableInterrupts,
        0xFB => Instruction::EnableInterrupts,

        _ => {
            return Err(CoreError::InvalidOpcode {
                opcode,
                extended: false,
            })
        }
    };

    Ok(Decoded::Instruction(instruction))
}

/// Decode a byte from the 0xCB-prefixed page. Total: every byte is a valid
/// rotate/shift/bit operation.
pub fn decode_extended(opcode: u8) -> Instruction {
    let bit = (opcode >> 3) & 0x07;
    let target = target8_from_index(opcode);

    match opcode >> 6 {
        0 => match bit {
            0 => Instruction::Rlc(target),
            1 => Instruction::Rrc(target),
            2 => Instruction::Rl(target),
            3 => Instruction::Rr(target),
            4 => Instruction::Sla(target),
            5 => Instruction::Sra(target),
            6 => Instruction::Swap(target),
            _ => Instruction::Srl(target),
        },
        1 => Instruction::Bit { bit, target },
        2 => Instruction::Res { bit, target },
        _ => Instruction::Set { bit, target },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESERVED: [u8; 11] = [
        0xD3, 0xDB, 0xDD, 0xE3, 0xE4, 0xEB, 0xEC, 0xED, 0xF4, 0xFC, 0xFD,
    ];

    #[test]
    fn base_table_is_total_over_the_legal_subset() {
        for opcode in 0..=0xFFu8 {
            let decoded = decode(opcode);
            if RESERVED.contains(&opcode) {
                assert_eq!(
                    decoded,
                    Err(CoreError::InvalidOpcode {
                        opcode,
                        extended: false
                    }),
                    "0x{opcode:02X} should be reserved"
                );
            } else {
                assert!(decoded.is_ok(), "0x{opcode:02X} should decode");
            }
        }
    }

    #[test]
    fn extended_table_is_total() {
        for opcode in 0..=0xFFu8 {
            // Every byte decodes; the match itself is the assertion.
            let _ = decode_extended(opcode);
        }
    }

    #[test]
    fn prefix_byte_routes_to_the_extended_table() {
        assert_eq!(decode(0xCB), Ok(Decoded::Extended));
    }

    #[test]
    fn spot_checks_against_the_opcode_table() {
        assert_eq!(decode(0x00), Ok(Decoded::Instruction(Instruction::Nop)));
        assert_eq!(
            decode(0x41),
            Ok(Decoded::Instruction(Instruction::Load8 {
                dst: LoadDst8::Reg(Reg8::B),
                src: LoadSrc8::Reg(Reg8::C),
            }))
        );
        assert_eq!(
            decode(0x86),
            Ok(Decoded::Instruction(Instruction::Add(Operand8::HlIndirect)))
        );
        assert_eq!(
            decode(0xFE),
            Ok(Decoded::Instruction(Instruction::Compare(
                Operand8::Immediate
            )))
        );
        assert_eq!(
            decode(0x31),
            Ok(Decoded::Instruction(Instruction::Load16Immediate(
                Reg16::Sp
            )))
        );
        assert_eq!(
            decode(0x20),
            Ok(Decoded::Instruction(Instruction::JumpRelative(
                Condition::NotZero
            )))
        );
        assert_eq!(
            decode(0xF1),
            Ok(Decoded::Instruction(Instruction::Pop(StackReg16::Af)))
        );
        assert_eq!(
            decode(0xEF),
            Ok(Decoded::Instruction(Instruction::Restart(0x28)))
        );
        assert_eq!(decode(0x76), Ok(Decoded::Instruction(Instruction::Halt)));
        assert_eq!(
            decode(0x3A),
            Ok(Decoded::Instruction(Instruction::LoadAccumIndirect(
                AccumAddr::HlDecrement
            )))
        );
    }

    #[test]
    fn extended_spot_checks() {
        assert_eq!(decode_extended(0x00), Instruction::Rlc(Target8::Reg(Reg8::B)));
        assert_eq!(decode_extended(0x37), Instruction::Swap(Target8::Reg(Reg8::A)));
        assert_eq!(
            decode_extended(0x7E),
            Instruction::Bit {
                bit: 7,
                target: Target8::HlIndirect
            }
        );
        assert_eq!(
            decode_extended(0x87),
            Instruction::Res {
                bit: 0,
                target: Target8::Reg(Reg8::A)
            }
        );
        assert_eq!(
            decode_extended(0xFF),
            Instruction::Set {
                bit: 7,
                target: Target8::Reg(Reg8::A)
            }
        );
    }
}
