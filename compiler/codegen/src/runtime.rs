//! Built-in I/O routines, emitted after the user's code from the same
//! instruction set and the same label counter, so they flow through the
//! relocation pass like everything else. Characters travel one at a time
//! through a stack slot and a `write`/`read` syscall; the image stays a
//! single self-contained segment with no libc.

use lir::{Cond, Instruction, Label, Reg};

use crate::LabelAlloc;

pub(crate) const PRINT_INT: &str = "print_int";
pub(crate) const PRINT_DIGITS: &str = "print_digits";
pub(crate) const READ_INT: &str = "read_int";
pub(crate) const NEWLINE: &str = "newline";

const SYS_READ: i64 = 0;
const SYS_WRITE: i64 = 1;
const STDIN: i64 = 0;
const STDOUT: i64 = 1;

/// `print_int`: prints the signed value in RDI in decimal, followed by a
/// newline. A `-` sign is written up front, then `print_digits` expands
/// the magnitude recursively. Frame slots: [rbp-8] one-byte character
/// buffer, [rbp-16] the value.
pub(crate) fn emit_print_int(out: &mut Vec<Instruction>, labels: &mut LabelAlloc) {
    let nonneg = labels.fresh();

    out.push(Instruction::LabelDef(Label::named(PRINT_INT)));
    prologue(out);
    out.push(Instruction::Store {
        base: Reg::Rbp,
        offset: -16,
        src: Reg::Rdi,
    });
    out.push(Instruction::CmpImm {
        lhs: Reg::Rdi,
        imm: 0,
    });
    out.push(Instruction::JmpCond {
        cond: Cond::Ge,
        target: nonneg.clone(),
    });

    // negative: write the sign, then negate the stored value
    out.push(Instruction::MovRI {
        dst: Reg::R11,
        imm: b'-' as i64,
    });
    out.push(Instruction::Store {
        base: Reg::Rbp,
        offset: -8,
        src: Reg::R11,
    });
    write_char(out);
    out.push(Instruction::Load {
        dst: Reg::R11,
        base: Reg::Rbp,
        offset: -16,
    });
    out.push(Instruction::MovRI {
        dst: Reg::R10,
        imm: 0,
    });
    out.push(Instruction::Sub {
        dst: Reg::R10,
        src: Reg::R11,
    });
    out.push(Instruction::Store {
        base: Reg::Rbp,
        offset: -16,
        src: Reg::R10,
    });

    out.push(Instruction::LabelDef(nonneg));
    out.push(Instruction::Load {
        dst: Reg::Rdi,
        base: Reg::Rbp,
        offset: -16,
    });
    out.push(Instruction::Call(Label::named(PRINT_DIGITS)));

    // trailing newline, from the static data byte
    out.push(Instruction::MovRI {
        dst: Reg::Rax,
        imm: SYS_WRITE,
    });
    out.push(Instruction::MovRI {
        dst: Reg::Rdi,
        imm: STDOUT,
    });
    out.push(Instruction::MovRA {
        dst: Reg::Rsi,
        label: Label::named(NEWLINE),
    });
    out.push(Instruction::MovRI {
        dst: Reg::Rdx,
        imm: 1,
    });
    out.push(Instruction::Syscall);

    epilogue(out);

    emit_print_digits(out, labels);
}

/// `print_digits`: prints the non-negative value in RDI most significant
/// digit first, by recursing on the quotient before printing this digit.
fn emit_print_digits(out: &mut Vec<Instruction>, labels: &mut LabelAlloc) {
    let leaf = labels.fresh();

    out.push(Instruction::LabelDef(Label::named(PRINT_DIGITS)));
    prologue(out);

    out.push(Instruction::MovRR {
        dst: Reg::Rax,
        src: Reg::Rdi,
    });
    out.push(Instruction::Cqo);
    out.push(Instruction::MovRI {
        dst: Reg::R11,
        imm: 10,
    });
    out.push(Instruction::Idiv { src: Reg::R11 });
    out.push(Instruction::Store {
        base: Reg::Rbp,
        offset: -16,
        src: Reg::Rdx,
    });
    out.push(Instruction::CmpImm {
        lhs: Reg::Rax,
        imm: 0,
    });
    out.push(Instruction::JmpCond {
        cond: Cond::Eq,
        target: leaf.clone(),
    });
    out.push(Instruction::MovRR {
        dst: Reg::Rdi,
        src: Reg::Rax,
    });
    out.push(Instruction::Call(Label::named(PRINT_DIGITS)));

    out.push(Instruction::LabelDef(leaf));
    out.push(Instruction::Load {
        dst: Reg::R11,
        base: Reg::Rbp,
        offset: -16,
    });
    out.push(Instruction::AddImm {
        dst: Reg::R11,
        imm: b'0' as i32,
    });
    out.push(Instruction::Store {
        base: Reg::Rbp,
        offset: -8,
        src: Reg::R11,
    });
    write_char(out);

    epilogue(out);
}

/// `read_int`: reads decimal digits from stdin one byte at a time until a
/// non-digit or EOF, returning the accumulated value in RAX.
pub(crate) fn emit_read_int(out: &mut Vec<Instruction>, labels: &mut LabelAlloc) {
    let next = labels.fresh();
    let done = labels.fresh();

    out.push(Instruction::LabelDef(Label::named(READ_INT)));
    prologue(out);
    out.push(Instruction::MovRI {
        dst: Reg::R10,
        imm: 0,
    });

    out.push(Instruction::LabelDef(next.clone()));
    // clear the slot so the 64-bit reload sees just the read byte
    out.push(Instruction::MovRI {
        dst: Reg::R11,
        imm: 0,
    });
    out.push(Instruction::Store {
        base: Reg::Rbp,
        offset: -8,
        src: Reg::R11,
    });
    out.push(Instruction::MovRI {
        dst: Reg::Rax,
        imm: SYS_READ,
    });
    out.push(Instruction::MovRI {
        dst: Reg::Rdi,
        imm: STDIN,
    });
    out.push(Instruction::MovRR {
        dst: Reg::Rsi,
        src: Reg::Rbp,
    });
    out.push(Instruction::SubImm {
        dst: Reg::Rsi,
        imm: 8,
    });
    out.push(Instruction::MovRI {
        dst: Reg::Rdx,
        imm: 1,
    });
    out.push(Instruction::Syscall);

    out.push(Instruction::CmpImm {
        lhs: Reg::Rax,
        imm: 1,
    });
    out.push(Instruction::JmpCond {
        cond: Cond::Ne,
        target: done.clone(),
    });
    out.push(Instruction::Load {
        dst: Reg::R11,
        base: Reg::Rbp,
        offset: -8,
    });
    out.push(Instruction::CmpImm {
        lhs: Reg::R11,
        imm: b'0' as i32,
    });
    out.push(Instruction::JmpCond {
        cond: Cond::Lt,
        target: done.clone(),
    });
    out.push(Instruction::CmpImm {
        lhs: Reg::R11,
        imm: b'9' as i32,
    });
    out.push(Instruction::JmpCond {
        cond: Cond::Gt,
        target: done.clone(),
    });

    out.push(Instruction::SubImm {
        dst: Reg::R11,
        imm: b'0' as i32,
    });
    out.push(Instruction::MovRI {
        dst: Reg::Rax,
        imm: 10,
    });
    out.push(Instruction::Imul {
        dst: Reg::R10,
        src: Reg::Rax,
    });
    out.push(Instruction::Add {
        dst: Reg::R10,
        src: Reg::R11,
    });
    out.push(Instruction::Jmp(next));

    out.push(Instruction::LabelDef(done));
    out.push(Instruction::MovRR {
        dst: Reg::Rax,
        src: Reg::R10,
    });
    epilogue(out);
}

/// The one byte of static data in the image.
pub(crate) fn emit_newline_data(out: &mut Vec<Instruction>) {
    out.push(Instruction::LabelDef(Label::named(NEWLINE)));
    out.push(Instruction::Db(vec![b'\n']));
}

fn prologue(out: &mut Vec<Instruction>) {
    out.push(Instruction::Push(Reg::Rbp));
    out.push(Instruction::MovRR {
        dst: Reg::Rbp,
        src: Reg::Rsp,
    });
    out.push(Instruction::SubImm {
        dst: Reg::Rsp,
        imm: 16,
    });
}

fn epilogue(out: &mut Vec<Instruction>) {
    out.push(Instruction::MovRR {
        dst: Reg::Rsp,
        src: Reg::Rbp,
    });
    out.push(Instruction::Pop(Reg::Rbp));
    out.push(Instruction::Ret);
}

/// write(stdout, rbp-8, 1) — prints the character staged in the buffer
/// slot. The kernel only clobbers RAX, RCX and R11 across a syscall.
fn write_char(out: &mut Vec<Instruction>) {
    out.push(Instruction::MovRI {
        dst: Reg::Rax,
        imm: SYS_WRITE,
    });
    out.push(Instruction::MovRI {
        dst: Reg::Rdi,
        imm: STDOUT,
    });
    out.push(Instruction::MovRR {
        dst: Reg::Rsi,
        src: Reg::Rbp,
    });
    out.push(Instruction::SubImm {
        dst: Reg::Rsi,
        imm: 8,
    });
    out.push(Instruction::MovRI {
        dst: Reg::Rdx,
        imm: 1,
    });
    out.push(Instruction::Syscall);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn print_routines_define_every_label_they_branch_to() {
        let mut out = Vec::new();
        let mut labels = LabelAlloc::new();

        emit_print_int(&mut out, &mut labels);
        emit_newline_data(&mut out);

        let defined: HashSet<_> = out.iter().filter_map(|i| i.label_def()).collect();

        for inst in &out {
            if let Some(reloc) = inst.reloc() {
                assert!(
                    defined.contains(reloc.target),
                    "undefined target {}",
                    reloc.target
                );
            }
        }
    }

    #[test]
    fn read_routine_balances_its_frame() {
        let mut out = Vec::new();
        let mut labels = LabelAlloc::new();

        emit_read_int(&mut out, &mut labels);

        let pushes = out
            .iter()
            .filter(|i| matches!(i, Instruction::Push(_)))
            .count();
        let pops = out
            .iter()
            .filter(|i| matches!(i, Instruction::Pop(_)))
            .count();

        assert_eq!(pushes, pops);
        assert_eq!(out.last(), Some(&Instruction::Ret));
    }

    #[test]
    fn negative_sign_is_written_before_the_digits() {
        let mut out = Vec::new();
        let mut labels = LabelAlloc::new();

        emit_print_int(&mut out, &mut labels);

        let sign = out
            .iter()
            .position(|i| {
                matches!(
                    i,
                    Instruction::MovRI { imm, .. } if *imm == b'-' as i64
                )
            })
            .unwrap();
        let digits = out
            .iter()
            .position(|i| *i == Instruction::Call(Label::named(PRINT_DIGITS)))
            .unwrap();

        assert!(sign < digits);
    }
}
