//! Two-pass resolution of the finished instruction stream: first every
//! label gets its byte offset (label definitions occupy no bytes), then
//! every branch/call/address field is patched into the encoded bytes.
//! Nothing is ever removed or reordered; a branch to a label that was
//! never defined aborts the whole link with no partial image.

use std::collections::HashMap;

use thiserror::Error;

use lir::{Instruction, Label, RelocKind};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LinkError {
    #[error("branch to undefined label '{0}'")]
    UnresolvedLabel(String),
    #[error("label '{0}' defined more than once")]
    DuplicateLabel(String),
    #[error("displacement to '{0}' does not fit in 32 bits")]
    DisplacementOverflow(String),
}

/// Pass one: byte offset of every label, in final program order.
#[derive(Debug)]
pub struct Layout {
    offsets: HashMap<Label, usize>,
    pub code_len: usize,
}

impl Layout {
    pub fn of(instructions: &[Instruction]) -> Result<Layout, LinkError> {
        let mut offsets = HashMap::new();
        let mut pc = 0;

        for inst in instructions {
            if let Some(label) = inst.label_def() {
                if offsets.insert(label.clone(), pc).is_some() {
                    return Err(LinkError::DuplicateLabel(label.to_string()));
                }
            }
            pc += inst.len();
        }

        Ok(Layout {
            offsets,
            code_len: pc,
        })
    }

    pub fn offset_of(&self, label: &Label) -> Option<usize> {
        self.offsets.get(label).copied()
    }
}

/// Pass two: encode the stream into a flat buffer, patching every
/// `Rel32` field with `target - (offset + len)` and every `Abs64` field
/// with `load_addr + target`.
pub fn link(instructions: &[Instruction], load_addr: u64) -> Result<Vec<u8>, LinkError> {
    let layout = Layout::of(instructions)?;

    let mut image = Vec::with_capacity(layout.code_len);
    let mut pc = 0usize;

    for inst in instructions {
        let mut bytes = inst.encode();

        if let Some(reloc) = inst.reloc() {
            let target = layout
                .offset_of(reloc.target)
                .ok_or_else(|| LinkError::UnresolvedLabel(reloc.target.to_string()))?;

            match reloc.kind {
                RelocKind::Rel32 => {
                    let disp = target as i64 - (pc + bytes.len()) as i64;
                    let disp = i32::try_from(disp)
                        .map_err(|_| LinkError::DisplacementOverflow(reloc.target.to_string()))?;
                    bytes[reloc.field..reloc.field + 4].copy_from_slice(&disp.to_le_bytes());
                }
                RelocKind::Abs64 => {
                    let addr = load_addr + target as u64;
                    bytes[reloc.field..reloc.field + 8].copy_from_slice(&addr.to_le_bytes());
                }
            }
        }

        pc += bytes.len();
        image.extend_from_slice(&bytes);
    }

    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lir::{Cond, Reg};

    #[test]
    fn labels_occupy_no_bytes() {
        let stream = vec![
            Instruction::Section(".text"),
            Instruction::LabelDef(Label::named("_start")),
            Instruction::MovRI {
                dst: Reg::Rax,
                imm: 60,
            },
            Instruction::LabelDef(Label::Block(0)),
            Instruction::Syscall,
        ];

        let layout = Layout::of(&stream).unwrap();

        assert_eq!(layout.offset_of(&Label::named("_start")), Some(0));
        assert_eq!(layout.offset_of(&Label::Block(0)), Some(10));
        assert_eq!(layout.code_len, 12);
    }

    #[test]
    fn backward_jump_gets_a_negative_displacement() {
        let stream = vec![
            Instruction::LabelDef(Label::Block(0)),
            Instruction::Jmp(Label::Block(0)),
        ];

        let image = link(&stream, 0).unwrap();

        assert_eq!(image, vec![0xE9, 0xFB, 0xFF, 0xFF, 0xFF]); // -5
    }

    #[test]
    fn forward_conditional_jump_skips_the_gap() {
        let stream = vec![
            Instruction::JmpCond {
                cond: Cond::Eq,
                target: Label::Block(1),
            },
            Instruction::Syscall,
            Instruction::LabelDef(Label::Block(1)),
            Instruction::Ret,
        ];

        let image = link(&stream, 0).unwrap();

        // 6-byte jcc, then 2 bytes of syscall to hop over
        assert_eq!(&image[..6], &[0x0F, 0x84, 0x02, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn patched_displacements_decode_back_to_their_targets() {
        let stream = vec![
            Instruction::LabelDef(Label::named("_start")),
            Instruction::CmpImm {
                lhs: Reg::R10,
                imm: 0,
            },
            Instruction::JmpCond {
                cond: Cond::Lt,
                target: Label::Block(0),
            },
            Instruction::Call(Label::named("f")),
            Instruction::Jmp(Label::Block(1)),
            Instruction::LabelDef(Label::Block(0)),
            Instruction::MovRI {
                dst: Reg::Rax,
                imm: 0,
            },
            Instruction::LabelDef(Label::Block(1)),
            Instruction::LabelDef(Label::named("f")),
            Instruction::Ret,
        ];

        let layout = Layout::of(&stream).unwrap();
        let image = link(&stream, 0).unwrap();

        let mut pc = 0usize;
        let mut branches = 0;
        for inst in &stream {
            let len = inst.len();
            if let Some(reloc) = inst.reloc() {
                let field = pc + reloc.field;
                let disp =
                    i32::from_le_bytes(image[field..field + 4].try_into().unwrap()) as i64;
                let decoded = (pc + len) as i64 + disp;

                assert_eq!(
                    decoded as usize,
                    layout.offset_of(reloc.target).unwrap(),
                    "{}",
                    inst.text()
                );
                branches += 1;
            }
            pc += len;
        }

        assert_eq!(branches, 3);
    }

    #[test]
    fn absolute_fields_get_the_load_address_added() {
        let stream = vec![
            Instruction::MovRA {
                dst: Reg::Rsi,
                label: Label::named("newline"),
            },
            Instruction::Ret,
            Instruction::LabelDef(Label::named("newline")),
            Instruction::Db(vec![b'\n']),
        ];

        let image = link(&stream, 0x400078).unwrap();

        let addr = u64::from_le_bytes(image[2..10].try_into().unwrap());
        assert_eq!(addr, 0x400078 + 11);
        assert_eq!(image[11], b'\n');
    }

    #[test]
    fn undefined_branch_target_is_fatal() {
        let stream = vec![Instruction::Jmp(Label::Block(9))];

        assert_eq!(
            link(&stream, 0).unwrap_err(),
            LinkError::UnresolvedLabel("L9".to_string())
        );
    }

    #[test]
    fn doubly_defined_label_is_fatal() {
        let stream = vec![
            Instruction::LabelDef(Label::Block(0)),
            Instruction::LabelDef(Label::Block(0)),
        ];

        assert_eq!(
            Layout::of(&stream).unwrap_err(),
            LinkError::DuplicateLabel("L0".to_string())
        );
    }
}
