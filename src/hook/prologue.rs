// Mon Oct 19 2026 - Alex

//! Length table for the x86-64 instructions that commonly open a function.
//!
//! This is not a disassembler. It only answers whether the first N bytes of
//! a target split on an instruction boundary and can run unchanged from a
//! trampoline; anything it does not recognise is reported as unknown.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub len: usize,
    /// Operand depends on the instruction's address (rel8/rel32, RIP-relative
    /// memory, indirect branches).
    pub relative: bool,
    /// Ends the function (`ret`, `int3` padding).
    pub terminator: bool,
}

struct ModRm {
    len: usize,
    rip_relative: bool,
    reg: u8,
}

fn modrm(code: &[u8], at: usize) -> Option<ModRm> {
    let byte = *code.get(at)?;
    let mode = byte >> 6;
    let reg = (byte >> 3) & 7;
    let rm = byte & 7;

    let mut len = 1;
    if mode != 3 && rm == 4 {
        let sib = *code.get(at + 1)?;
        len += 1;
        if mode == 0 && sib & 7 == 5 {
            len += 4;
        }
    }
    len += match mode {
        0 if rm == 5 => 4,
        1 => 1,
        2 => 4,
        _ => 0,
    };

    Some(ModRm {
        len,
        rip_relative: mode == 0 && rm == 5,
        reg,
    })
}

pub fn decode(code: &[u8]) -> Option<Instruction> {
    let mut i = 0;
    let mut operand_16 = false;
    let mut rep = false;
    while let Some(&prefix) = code.get(i) {
        match prefix {
            0x66 => operand_16 = true,
            0xF3 => rep = true,
            0x67 | 0xF2 | 0x26 | 0x2E | 0x36 | 0x3E | 0x64 | 0x65 => {}
            _ => break,
        }
        i += 1;
        if i > 4 {
            return None;
        }
    }

    let mut rex_w = false;
    if let Some(&rex @ 0x40..=0x4F) = code.get(i) {
        rex_w = rex & 8 != 0;
        i += 1;
    }

    let opcode = *code.get(i)?;
    i += 1;
    let imm_z = if operand_16 { 2 } else { 4 };

    // (has modrm, immediate bytes, relative, terminator)
    let (has_modrm, mut imm, mut relative, terminator) = match opcode {
        0x50..=0x5F | 0x90 | 0x98 | 0x99 => (false, 0, false, false),
        0xC3 | 0xCB | 0xCC => (false, 0, false, true),
        0xC2 => (false, 2, false, true),
        0xB0..=0xB7 => (false, 1, false, false),
        0xB8..=0xBF => (false, if rex_w { 8 } else { imm_z }, false, false),
        0x6A => (false, 1, false, false),
        0x68 => (false, imm_z, false, false),
        0x04 | 0x0C | 0x14 | 0x1C | 0x24 | 0x2C | 0x34 | 0x3C | 0xA8 => (false, 1, false, false),
        0x05 | 0x0D | 0x15 | 0x1D | 0x25 | 0x2D | 0x35 | 0x3D | 0xA9 => (false, imm_z, false, false),
        0x00..=0x03
        | 0x08..=0x0B
        | 0x10..=0x13
        | 0x18..=0x1B
        | 0x20..=0x23
        | 0x28..=0x2B
        | 0x30..=0x33
        | 0x38..=0x3B
        | 0x63
        | 0x84..=0x8B
        | 0x8D
        | 0xD0..=0xD3
        | 0xFE => (true, 0, false, false),
        0x80 | 0x82 | 0x83 | 0xC0 | 0xC1 | 0xC6 | 0x6B => (true, 1, false, false),
        0x81 | 0xC7 | 0x69 => (true, imm_z, false, false),
        0xF6 | 0xF7 | 0xFF => (true, 0, false, false),
        0xE8 | 0xE9 => (false, 4, true, false),
        0xEB | 0x70..=0x7F | 0xE0..=0xE3 => (false, 1, true, false),
        0x0F => {
            let second = *code.get(i)?;
            i += 1;
            match second {
                0x1E if rep && matches!(code.get(i), Some(0xFA) | Some(0xFB)) => {
                    return Some(Instruction {
                        len: i + 1,
                        relative: false,
                        terminator: false,
                    });
                }
                0x05 | 0x0B => (false, 0, false, second == 0x0B),
                0x80..=0x8F => (false, 4, true, false),
                0x1F | 0x10 | 0x11 | 0x28 | 0x29 | 0x40..=0x4F | 0x90..=0x9F | 0xAF | 0xB6 | 0xB7
                | 0xBE | 0xBF => (true, 0, false, false),
                _ => return None,
            }
        }
        _ => return None,
    };

    let mut len = i;
    if has_modrm {
        let m = modrm(code, i)?;
        len += m.len;
        relative |= m.rip_relative;
        match opcode {
            0xF6 if m.reg < 2 => imm = 1,
            0xF7 if m.reg < 2 => imm = imm_z,
            // indirect call/jmp
            0xFF if (2..=5).contains(&m.reg) => relative = true,
            _ => {}
        }
    }
    len += imm;

    if len > code.len() {
        return None;
    }
    Some(Instruction {
        len,
        relative,
        terminator,
    })
}

/// Checks that the first `width` bytes of `code` hold whole instructions
/// that can be relocated into a trampoline byte for byte.
pub fn check_displaced(code: &[u8], width: usize) -> Result<(), String> {
    let mut offset = 0;
    while offset < width {
        let insn = decode(&code[offset..])
            .ok_or_else(|| format!("unrecognised instruction at +{}", offset))?;
        if insn.relative {
            return Err(format!("position-dependent instruction at +{}", offset));
        }
        if insn.terminator {
            return Err(format!("function ends at +{} inside the patch", offset));
        }
        offset += insn.len;
    }
    if offset != width {
        return Err(format!(
            "instruction boundary at +{} does not match patch width {}",
            offset, width
        ));
    }
    Ok(())
}
