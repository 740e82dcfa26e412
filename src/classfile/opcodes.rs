//! Bytecode instruction walking
//!
//! The extractor only cares about method-invocation instructions, but
//! locating them requires stepping over every instruction in a method
//! body. The walk drives a [`ClassReader`] over the Code array: the
//! cursor's position is the pc, and its 4-byte alignment handles the
//! padded operands of the three variable-length instructions
//! (tableswitch, lookupswitch, wide).

use crate::error::ClassParseError;

use super::reader::ClassReader;

pub const INVOKEVIRTUAL: u8 = 0xb6;
pub const INVOKESPECIAL: u8 = 0xb7;
pub const INVOKESTATIC: u8 = 0xb8;
pub const INVOKEINTERFACE: u8 = 0xb9;
pub const INVOKEDYNAMIC: u8 = 0xba;

const TABLESWITCH: u8 = 0xaa;
const LOOKUPSWITCH: u8 = 0xab;
const WIDE: u8 = 0xc4;
const IINC: u8 = 0x84;

/// A method-invocation site found in a Code array.
///
/// `invokedynamic` is not reported: its call target is a bootstrap-method
/// artifact with no stable owner FQN.
#[derive(Debug, Clone, Copy)]
pub struct InvocationSite {
    /// Byte offset of the instruction within the Code array.
    pub pc: u32,
    pub opcode: u8,
    /// Constant-pool index of the Methodref/InterfaceMethodref operand.
    pub cp_index: u16,
}

/// Walk a Code array and collect all invocation sites in bytecode order.
pub fn scan_invocations(code: &[u8]) -> Result<Vec<InvocationSite>, ClassParseError> {
    // Running off the end of the array means the Code attribute lied
    // about its length; report that as a truncated body, not plain EOF.
    walk_code(code).map_err(|e| match e {
        ClassParseError::UnexpectedEof => ClassParseError::TruncatedCode,
        other => other,
    })
}

fn walk_code(code: &[u8]) -> Result<Vec<InvocationSite>, ClassParseError> {
    let mut reader = ClassReader::new(code);
    let mut sites = Vec::new();

    while let Some(opcode) = reader.peek_u1() {
        let pc = reader.position() as u32;
        match opcode {
            INVOKEVIRTUAL | INVOKESPECIAL | INVOKESTATIC | INVOKEINTERFACE => {
                reader.skip(1)?;
                let cp_index = reader.read_u2()?;
                if opcode == INVOKEINTERFACE {
                    reader.skip(2)?; // count + reserved zero
                }
                sites.push(InvocationSite {
                    pc,
                    opcode,
                    cp_index,
                });
            }
            TABLESWITCH => {
                reader.skip(1)?;
                reader.align_to_u4()?;
                let _default = reader.read_i32()?;
                let low = reader.read_i32()?;
                let high = reader.read_i32()?;
                if high < low {
                    return Err(ClassParseError::TruncatedCode);
                }
                let entries = (high as i64) - (low as i64) + 1;
                reader.skip(entries as usize * 4)?;
            }
            LOOKUPSWITCH => {
                reader.skip(1)?;
                reader.align_to_u4()?;
                let _default = reader.read_i32()?;
                let npairs = reader.read_i32()?;
                if npairs < 0 {
                    return Err(ClassParseError::TruncatedCode);
                }
                reader.skip(npairs as usize * 8)?;
            }
            WIDE => {
                reader.skip(1)?;
                let modified = reader.read_u1()?;
                reader.skip(if modified == IINC { 4 } else { 2 })?;
            }
            other => {
                reader.skip(fixed_length(other)?)?;
            }
        }
    }

    Ok(sites)
}

/// Length of a fixed-size instruction, per the JVM instruction set tables.
fn fixed_length(opcode: u8) -> Result<usize, ClassParseError> {
    let len = match opcode {
        // nop .. dconst_1, array loads/stores, arithmetic, conversions,
        // comparisons, returns, arraylength, athrow, monitor ops
        0x00..=0x0f | 0x1a..=0x35 | 0x3b..=0x83 | 0x85..=0x98 | 0xac..=0xb1 | 0xbe | 0xbf
        | 0xc2 | 0xc3 => 1,
        // bipush, ldc, loads/stores with index, newarray, ret
        0x10 | 0x12 | 0x15..=0x19 | 0x36..=0x3a | 0xa9 | 0xbc => 2,
        // sipush, ldc_w, ldc2_w, iinc, branches, field access, invokes,
        // new, anewarray, checkcast, instanceof
        0x11 | 0x13 | 0x14 | 0x84 | 0x99..=0xa8 | 0xb2..=0xb8 | 0xbb | 0xbd | 0xc0 | 0xc1
        | 0xc6 | 0xc7 => 3,
        // multianewarray
        0xc5 => 4,
        // invokeinterface, invokedynamic, goto_w, jsr_w
        INVOKEINTERFACE | INVOKEDYNAMIC | 0xc8 | 0xc9 => 5,
        other => return Err(ClassParseError::UnknownOpcode { opcode: other }),
    };
    Ok(len)
}
