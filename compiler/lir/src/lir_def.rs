use std::fmt::{Display, Formatter};

/// Defines the target instruction set: every variant knows its NASM text
/// form, its exact encoded byte length, and its encoding. Branch targets
/// are encoded as zero-filled placeholder fields and patched later by the
/// linker pass.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg {
    Rax,
    Rbx,
    Rcx,
    Rdx,
    Rsp,
    Rbp,
    Rsi,
    Rdi,
    R8,
    R9,
    R10,
    R11,
}

impl Reg {
    /// Hardware register number, including the REX extension bit.
    pub fn number(self) -> u8 {
        match self {
            Reg::Rax => 0,
            Reg::Rcx => 1,
            Reg::Rdx => 2,
            Reg::Rbx => 3,
            Reg::Rsp => 4,
            Reg::Rbp => 5,
            Reg::Rsi => 6,
            Reg::Rdi => 7,
            Reg::R8 => 8,
            Reg::R9 => 9,
            Reg::R10 => 10,
            Reg::R11 => 11,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Reg::Rax => "rax",
            Reg::Rbx => "rbx",
            Reg::Rcx => "rcx",
            Reg::Rdx => "rdx",
            Reg::Rsp => "rsp",
            Reg::Rbp => "rbp",
            Reg::Rsi => "rsi",
            Reg::Rdi => "rdi",
            Reg::R8 => "r8",
            Reg::R9 => "r9",
            Reg::R10 => "r10",
            Reg::R11 => "r11",
        }
    }

    fn low(self) -> u8 {
        self.number() & 0b111
    }

    fn ext(self) -> bool {
        self.number() >= 8
    }
}

impl Display for Reg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The six conditional-jump kinds, matching the six relational operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cond {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Cond {
    fn mnemonic(self) -> &'static str {
        match self {
            Cond::Eq => "e",
            Cond::Ne => "ne",
            Cond::Lt => "l",
            Cond::Le => "le",
            Cond::Gt => "g",
            Cond::Ge => "ge",
        }
    }

    /// Second opcode byte of the `0F 8x` rel32 jump.
    fn opcode(self) -> u8 {
        match self {
            Cond::Eq => 0x84,
            Cond::Ne => 0x85,
            Cond::Lt => 0x8C,
            Cond::Le => 0x8E,
            Cond::Gt => 0x8F,
            Cond::Ge => 0x8D,
        }
    }
}

/// Numbered basic-block marker or named entry point. Block numbers come
/// from one program-wide counter; every branch target must be defined
/// exactly once in the final stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Label {
    Block(u32),
    Named(String),
}

impl Label {
    pub fn named(name: &str) -> Self {
        Label::Named(name.to_string())
    }
}

impl Display for Label {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Label::Block(n) => write!(f, "L{}", n),
            Label::Named(name) => write!(f, "{}", name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelocKind {
    /// 32-bit displacement relative to the end of the instruction.
    Rel32,
    /// 64-bit absolute virtual address.
    Abs64,
}

/// A patch site inside one instruction's encoding.
#[derive(Debug, PartialEq, Eq)]
pub struct Reloc<'a> {
    pub target: &'a Label,
    pub kind: RelocKind,
    /// Byte offset of the field within the encoding.
    pub field: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// mov dst, src
    MovRR { dst: Reg, src: Reg },
    /// mov dst, imm64
    MovRI { dst: Reg, imm: i64 },
    /// mov dst, <address of label> (imm64, patched by the linker)
    MovRA { dst: Reg, label: Label },
    /// mov dst, [base + offset]
    Load { dst: Reg, base: Reg, offset: i32 },
    /// mov [base + offset], src
    Store { base: Reg, offset: i32, src: Reg },

    Add { dst: Reg, src: Reg },
    Sub { dst: Reg, src: Reg },
    Imul { dst: Reg, src: Reg },
    AddImm { dst: Reg, imm: i32 },
    SubImm { dst: Reg, imm: i32 },
    /// Sign-extend RAX into RDX:RAX ahead of Idiv.
    Cqo,
    /// Signed divide of RDX:RAX; quotient in RAX, remainder in RDX.
    Idiv { src: Reg },
    Cmp { lhs: Reg, rhs: Reg },
    CmpImm { lhs: Reg, imm: i32 },

    Push(Reg),
    Pop(Reg),

    Call(Label),
    Ret,
    Jmp(Label),
    JmpCond { cond: Cond, target: Label },
    LabelDef(Label),
    Syscall,

    /// Raw data bytes emitted verbatim into the image.
    Db(Vec<u8>),
    /// Listing-only section directive; zero bytes in the image.
    Section(&'static str),
    /// Listing-only symbol-visibility directive; zero bytes in the image.
    Global(&'static str),
}

impl Instruction {
    /// NASM/Intel rendering, without indentation. Every call returns an
    /// owned string; nothing is shared between renders.
    pub fn text(&self) -> String {
        match self {
            Instruction::MovRR { dst, src } => format!("mov {}, {}", dst, src),
            Instruction::MovRI { dst, imm } => format!("mov {}, {}", dst, imm),
            Instruction::MovRA { dst, label } => format!("mov {}, {}", dst, label),
            Instruction::Load { dst, base, offset } => {
                format!("mov {}, {}", dst, memory_operand(*base, *offset))
            }
            Instruction::Store { base, offset, src } => {
                format!("mov {}, {}", memory_operand(*base, *offset), src)
            }
            Instruction::Add { dst, src } => format!("add {}, {}", dst, src),
            Instruction::Sub { dst, src } => format!("sub {}, {}", dst, src),
            Instruction::Imul { dst, src } => format!("imul {}, {}", dst, src),
            Instruction::AddImm { dst, imm } => format!("add {}, {}", dst, imm),
            Instruction::SubImm { dst, imm } => format!("sub {}, {}", dst, imm),
            Instruction::Cqo => "cqo".to_string(),
            Instruction::Idiv { src } => format!("idiv {}", src),
            Instruction::Cmp { lhs, rhs } => format!("cmp {}, {}", lhs, rhs),
            Instruction::CmpImm { lhs, imm } => format!("cmp {}, {}", lhs, imm),
            Instruction::Push(reg) => format!("push {}", reg),
            Instruction::Pop(reg) => format!("pop {}", reg),
            Instruction::Call(label) => format!("call {}", label),
            Instruction::Ret => "ret".to_string(),
            Instruction::Jmp(label) => format!("jmp {}", label),
            Instruction::JmpCond { cond, target } => {
                format!("j{} {}", cond.mnemonic(), target)
            }
            Instruction::LabelDef(label) => format!("{}:", label),
            Instruction::Syscall => "syscall".to_string(),
            Instruction::Db(bytes) => {
                let bytes: Vec<String> = bytes.iter().map(|b| b.to_string()).collect();
                format!("db {}", bytes.join(", "))
            }
            Instruction::Section(name) => format!("section {}", name),
            Instruction::Global(name) => format!("global {}", name),
        }
    }

    /// Exact encoded length in bytes. Label definitions and listing-only
    /// directives contribute nothing to the image.
    pub fn len(&self) -> usize {
        match self {
            Instruction::MovRR { .. } => 3,
            Instruction::MovRI { .. } | Instruction::MovRA { .. } => 10,
            Instruction::Load { base, .. } | Instruction::Store { base, .. } => {
                if base.low() == 0b100 {
                    8 // an RSP base forces a SIB byte
                } else {
                    7
                }
            }
            Instruction::Add { .. } | Instruction::Sub { .. } | Instruction::Cmp { .. } => 3,
            Instruction::Imul { .. } => 4,
            Instruction::AddImm { .. }
            | Instruction::SubImm { .. }
            | Instruction::CmpImm { .. } => 7,
            Instruction::Cqo => 2,
            Instruction::Idiv { .. } => 3,
            Instruction::Push(reg) | Instruction::Pop(reg) => {
                if reg.ext() {
                    2
                } else {
                    1
                }
            }
            Instruction::Call(_) | Instruction::Jmp(_) => 5,
            Instruction::JmpCond { .. } => 6,
            Instruction::Ret => 1,
            Instruction::Syscall => 2,
            Instruction::LabelDef(_) | Instruction::Section(_) | Instruction::Global(_) => 0,
            Instruction::Db(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Encoded bytes. Branch displacements and label addresses are
    /// zero-filled; `reloc()` says where to patch them.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Instruction::MovRR { dst, src } => encode_rr(0x89, *src, *dst),
            Instruction::MovRI { dst, imm } => encode_mov_imm64(*dst, *imm),
            Instruction::MovRA { dst, .. } => encode_mov_imm64(*dst, 0),
            Instruction::Load { dst, base, offset } => encode_rm(0x8B, *dst, *base, *offset),
            Instruction::Store { base, offset, src } => encode_rm(0x89, *src, *base, *offset),
            Instruction::Add { dst, src } => encode_rr(0x01, *src, *dst),
            Instruction::Sub { dst, src } => encode_rr(0x29, *src, *dst),
            Instruction::Cmp { lhs, rhs } => encode_rr(0x39, *rhs, *lhs),
            Instruction::Imul { dst, src } => {
                vec![
                    rex(dst.ext(), src.ext()),
                    0x0F,
                    0xAF,
                    modrm(0b11, dst.low(), src.low()),
                ]
            }
            Instruction::AddImm { dst, imm } => encode_imm32(0, *dst, *imm),
            Instruction::SubImm { dst, imm } => encode_imm32(5, *dst, *imm),
            Instruction::CmpImm { lhs, imm } => encode_imm32(7, *lhs, *imm),
            Instruction::Cqo => vec![0x48, 0x99],
            Instruction::Idiv { src } => {
                vec![rex(false, src.ext()), 0xF7, modrm(0b11, 7, src.low())]
            }
            Instruction::Push(reg) => encode_stack_op(0x50, *reg),
            Instruction::Pop(reg) => encode_stack_op(0x58, *reg),
            Instruction::Call(_) => vec![0xE8, 0, 0, 0, 0],
            Instruction::Jmp(_) => vec![0xE9, 0, 0, 0, 0],
            Instruction::JmpCond { cond, .. } => vec![0x0F, cond.opcode(), 0, 0, 0, 0],
            Instruction::Ret => vec![0xC3],
            Instruction::Syscall => vec![0x0F, 0x05],
            Instruction::LabelDef(_) | Instruction::Section(_) | Instruction::Global(_) => {
                vec![]
            }
            Instruction::Db(bytes) => bytes.clone(),
        }
    }

    /// The label this instruction defines, if it is a label definition.
    pub fn label_def(&self) -> Option<&Label> {
        match self {
            Instruction::LabelDef(label) => Some(label),
            _ => None,
        }
    }

    /// The patch this instruction needs from the linker, if any.
    pub fn reloc(&self) -> Option<Reloc<'_>> {
        match self {
            Instruction::Call(target) | Instruction::Jmp(target) => Some(Reloc {
                target,
                kind: RelocKind::Rel32,
                field: 1,
            }),
            Instruction::JmpCond { target, .. } => Some(Reloc {
                target,
                kind: RelocKind::Rel32,
                field: 2,
            }),
            Instruction::MovRA { label, .. } => Some(Reloc {
                target: label,
                kind: RelocKind::Abs64,
                field: 2,
            }),
            _ => None,
        }
    }
}

fn memory_operand(base: Reg, offset: i32) -> String {
    if offset < 0 {
        format!("[{} - {}]", base, -i64::from(offset))
    } else {
        format!("[{} + {}]", base, offset)
    }
}

/// REX.W prefix with the R (reg field) and B (r/m or opcode field)
/// extension bits.
fn rex(r: bool, b: bool) -> u8 {
    0x48 | (r as u8) << 2 | b as u8
}

fn modrm(md: u8, reg: u8, rm: u8) -> u8 {
    md << 6 | (reg & 0b111) << 3 | (rm & 0b111)
}

/// `op r/m64, r64` with both operands in registers.
fn encode_rr(op: u8, reg: Reg, rm: Reg) -> Vec<u8> {
    vec![
        rex(reg.ext(), rm.ext()),
        op,
        modrm(0b11, reg.low(), rm.low()),
    ]
}

/// `op reg, [base + disp32]` (or the store direction, per opcode).
fn encode_rm(op: u8, reg: Reg, base: Reg, offset: i32) -> Vec<u8> {
    let mut bytes = vec![
        rex(reg.ext(), base.ext()),
        op,
        modrm(0b10, reg.low(), base.low()),
    ];

    if base.low() == 0b100 {
        bytes.push(0x24); // SIB: no index, base as encoded
    }

    bytes.extend_from_slice(&offset.to_le_bytes());
    bytes
}

/// `81 /ext r/m64, imm32` group (add/sub/cmp with immediate).
fn encode_imm32(ext: u8, rm: Reg, imm: i32) -> Vec<u8> {
    let mut bytes = vec![rex(false, rm.ext()), 0x81, modrm(0b11, ext, rm.low())];
    bytes.extend_from_slice(&imm.to_le_bytes());
    bytes
}

/// `B8+rd imm64` — the full 64-bit immediate load.
fn encode_mov_imm64(dst: Reg, imm: i64) -> Vec<u8> {
    let mut bytes = vec![rex(false, dst.ext()), 0xB8 + dst.low()];
    bytes.extend_from_slice(&imm.to_le_bytes());
    bytes
}

/// `50+rd` / `58+rd` with an optional REX.B prefix for r8..r11.
fn encode_stack_op(op: u8, reg: Reg) -> Vec<u8> {
    if reg.ext() {
        vec![0x41, op + reg.low()]
    } else {
        vec![op + reg.low()]
    }
}
