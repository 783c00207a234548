use thiserror::Error;

use ast::{BinOp, Expr, FuncDecl, Program, Stmt};
use lir::*;

use crate::runtime::{PRINT_INT, READ_INT};

mod runtime;

/// Expression accumulator and secondary operand register. Expression
/// lowering keeps the invariant that a lowered subtree leaves its value
/// in ACC and clobbers nothing the caller still needs (intermediate
/// values are preserved on the machine stack across recursion).
const ACC: Reg = Reg::R10;
const SECOND: Reg = Reg::R11;

const SYS_EXIT: i64 = 60;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CodegenError {
    #[error(transparent)]
    Undefined(#[from] UndefinedSymbol),
    #[error("malformed node: {0}")]
    MalformedNode(String),
}

/// Monotone block-label counter, threaded explicitly through lowering so
/// runs are reproducible and testable in isolation.
#[derive(Debug, Default)]
pub struct LabelAlloc {
    next: u32,
}

impl LabelAlloc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh(&mut self) -> Label {
        let label = Label::Block(self.next);
        self.next += 1;
        label
    }
}

/// The finished instruction stream plus any unsupported-operator
/// diagnostics. A non-empty diagnostic list marks the run as failed: the
/// stream may still be rendered for inspection, but no executable must be
/// produced from it.
#[derive(Debug)]
pub struct Lowered {
    pub instructions: Vec<Instruction>,
    pub diagnostics: Vec<String>,
}

#[derive(Debug, Default)]
struct RuntimeNeeds {
    print: bool,
    read: bool,
}

/// Lowers the whole program: section preamble, the `_start` entry frame
/// holding the top-level script, every function declaration in source
/// order, then whichever runtime routines the program referenced.
pub fn lower_program(program: &Program) -> Result<Lowered, CodegenError> {
    let mut out = Vec::new();
    let mut labels = LabelAlloc::new();
    let mut diagnostics = Vec::new();
    let mut needs = RuntimeNeeds::default();

    let mut script = Vec::new();
    let mut funcs = Vec::new();

    for item in &program.items {
        match item {
            Stmt::Func(decl) => funcs.push(decl),
            stmt => script.push(stmt),
        }
    }

    out.push(Instruction::Section(".text"));
    out.push(Instruction::Global("_start"));

    lower_entry(&script, &mut out, &mut labels, &mut diagnostics, &mut needs)?;

    for decl in funcs {
        lower_function(decl, &mut out, &mut labels, &mut diagnostics, &mut needs)?;
    }

    if needs.print {
        runtime::emit_print_int(&mut out, &mut labels);
    }
    if needs.read {
        runtime::emit_read_int(&mut out, &mut labels);
    }
    if needs.print {
        runtime::emit_newline_data(&mut out);
    }

    log::debug!(
        "lowered {} instructions, {} diagnostics",
        out.len(),
        diagnostics.len()
    );

    Ok(Lowered {
        instructions: out,
        diagnostics,
    })
}

fn lower_entry(
    script: &[&Stmt],
    out: &mut Vec<Instruction>,
    labels: &mut LabelAlloc,
    diagnostics: &mut Vec<String>,
    needs: &mut RuntimeNeeds,
) -> Result<(), CodegenError> {
    let mut lowerer = Lowerer {
        frame: Frame::new(),
        out,
        labels,
        diagnostics,
        needs,
        in_entry: true,
    };

    for stmt in script {
        lowerer.discover_locals(stmt);
    }

    lowerer.out.push(Instruction::LabelDef(Label::named("_start")));
    lowerer.prologue();

    for stmt in script {
        lowerer.stmt(stmt)?;
    }

    // fall-off-the-end termination
    if !matches!(
        script.last().copied(),
        Some(Stmt::Exit) | Some(Stmt::Return { .. })
    ) {
        lowerer.exit_with(0);
    }

    Ok(())
}

fn lower_function(
    decl: &FuncDecl,
    out: &mut Vec<Instruction>,
    labels: &mut LabelAlloc,
    diagnostics: &mut Vec<String>,
    needs: &mut RuntimeNeeds,
) -> Result<(), CodegenError> {
    let mut lowerer = Lowerer {
        frame: Frame::new(),
        out,
        labels,
        diagnostics,
        needs,
        in_entry: false,
    };

    for param in &decl.params {
        lowerer.frame.define(param, SlotKind::Arg);
    }
    for stmt in &decl.body {
        lowerer.discover_locals(stmt);
    }

    lowerer
        .out
        .push(Instruction::LabelDef(Label::Named(decl.name.clone())));
    lowerer.prologue();

    for stmt in &decl.body {
        lowerer.stmt(stmt)?;
    }

    // functions falling off the end return 0
    if !matches!(decl.body.last(), Some(Stmt::Return { .. })) {
        lowerer.out.push(Instruction::MovRI {
            dst: Reg::Rax,
            imm: 0,
        });
        lowerer.epilogue();
        lowerer.out.push(Instruction::Ret);
    }

    Ok(())
}

struct Lowerer<'a> {
    frame: Frame,
    out: &'a mut Vec<Instruction>,
    labels: &'a mut LabelAlloc,
    diagnostics: &'a mut Vec<String>,
    needs: &'a mut RuntimeNeeds,
    in_entry: bool,
}

impl Lowerer<'_> {
    /// Pre-pass reserving a frame slot for every declaration in the body,
    /// including ones buried in conditional branches, so that lowering
    /// can resolve a name before its declaration statement is reached.
    fn discover_locals(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::VarDecl { name } => {
                self.frame.define(name, SlotKind::Local);
            }
            Stmt::If {
                then, otherwise, ..
            } => {
                for stmt in then.iter().chain(otherwise) {
                    self.discover_locals(stmt);
                }
            }
            _ => {}
        }
    }

    fn prologue(&mut self) {
        self.out.push(Instruction::Push(Reg::Rbp));
        self.out.push(Instruction::MovRR {
            dst: Reg::Rbp,
            src: Reg::Rsp,
        });

        let bytes = self.frame.local_bytes();
        if bytes > 0 {
            self.out.push(Instruction::SubImm {
                dst: Reg::Rsp,
                imm: bytes,
            });
        }
    }

    fn epilogue(&mut self) {
        self.out.push(Instruction::MovRR {
            dst: Reg::Rsp,
            src: Reg::Rbp,
        });
        self.out.push(Instruction::Pop(Reg::Rbp));
    }

    fn exit_with(&mut self, status: i64) {
        self.out.push(Instruction::MovRI {
            dst: Reg::Rax,
            imm: SYS_EXIT,
        });
        self.out.push(Instruction::MovRI {
            dst: Reg::Rdi,
            imm: status,
        });
        self.out.push(Instruction::Syscall);
    }

    fn stmt(&mut self, stmt: &Stmt) -> Result<(), CodegenError> {
        match stmt {
            // space was reserved by the discovery pre-pass
            Stmt::VarDecl { .. } => Ok(()),
            Stmt::Assign { name, value } => {
                self.expr(value)?;
                let offset = self.frame.lookup(name)?;
                self.out.push(Instruction::Store {
                    base: Reg::Rbp,
                    offset,
                    src: ACC,
                });
                Ok(())
            }
            Stmt::If {
                condition,
                then,
                otherwise,
            } => self.conditional(condition, then, otherwise),
            Stmt::Return { expr } => {
                self.expr(expr)?;
                if self.in_entry {
                    // a return from the entry frame has nowhere to return
                    // to; the value becomes the process exit status
                    self.out.push(Instruction::MovRR {
                        dst: Reg::Rdi,
                        src: ACC,
                    });
                    self.out.push(Instruction::MovRI {
                        dst: Reg::Rax,
                        imm: SYS_EXIT,
                    });
                    self.out.push(Instruction::Syscall);
                } else {
                    self.out.push(Instruction::MovRR {
                        dst: Reg::Rax,
                        src: ACC,
                    });
                    self.epilogue();
                    self.out.push(Instruction::Ret);
                }
                Ok(())
            }
            Stmt::Write { expr } => {
                self.expr(expr)?;
                self.needs.print = true;
                self.out.push(Instruction::MovRR {
                    dst: Reg::Rdi,
                    src: ACC,
                });
                self.out.push(Instruction::Call(Label::named(PRINT_INT)));
                Ok(())
            }
            Stmt::Read { name } => {
                let offset = self.frame.lookup(name)?;
                self.needs.read = true;
                self.out.push(Instruction::Call(Label::named(READ_INT)));
                self.out.push(Instruction::MovRR {
                    dst: ACC,
                    src: Reg::Rax,
                });
                self.out.push(Instruction::Store {
                    base: Reg::Rbp,
                    offset,
                    src: ACC,
                });
                Ok(())
            }
            Stmt::Sqrt { .. } => {
                self.diagnostics
                    .push("unsupported operator 'root', lowered as a no-op".to_string());
                Ok(())
            }
            Stmt::Exit => {
                self.exit_with(0);
                Ok(())
            }
            Stmt::Call { func, args } => self.call(func, args),
            Stmt::Func(decl) => Err(CodegenError::MalformedNode(format!(
                "function declaration '{}' inside another body",
                decl.name
            ))),
        }
    }

    /// `Criterion` lowering: evaluate both operands, compare, then a
    /// conditional jump into the "then" block with a fall-back jump into
    /// the "else" block. Both branch labels are allocated before either
    /// body is lowered. A join label is only needed when the else body
    /// is non-empty; otherwise the then block falls through the empty
    /// else block, which already is the join point.
    fn conditional(
        &mut self,
        condition: &Expr,
        then: &[Stmt],
        otherwise: &[Stmt],
    ) -> Result<(), CodegenError> {
        let (op, left, right) = match condition {
            Expr::Binary { op, left, right } if op.is_relational() => (*op, left, right),
            other => {
                return Err(CodegenError::MalformedNode(format!(
                    "Criterion condition must be a comparison, got {:?}",
                    other
                )))
            }
        };

        self.expr(left)?;
        self.out.push(Instruction::Push(ACC));
        self.expr(right)?;
        self.out.push(Instruction::Pop(SECOND));
        self.out.push(Instruction::Cmp {
            lhs: SECOND,
            rhs: ACC,
        });

        let then_label = self.labels.fresh();
        let else_label = self.labels.fresh();

        self.out.push(Instruction::JmpCond {
            cond: jump_kind(op),
            target: then_label.clone(),
        });
        self.out.push(Instruction::Jmp(else_label.clone()));

        self.out.push(Instruction::LabelDef(then_label));
        for stmt in then {
            self.stmt(stmt)?;
        }

        if otherwise.is_empty() {
            self.out.push(Instruction::LabelDef(else_label));
        } else {
            let end_label = self.labels.fresh();
            self.out.push(Instruction::Jmp(end_label.clone()));
            self.out.push(Instruction::LabelDef(else_label));
            for stmt in otherwise {
                self.stmt(stmt)?;
            }
            self.out.push(Instruction::LabelDef(end_label));
        }

        Ok(())
    }

    /// Post-order expression lowering. The right subtree is lowered
    /// first; its result rides the machine stack across the left
    /// subtree's lowering, so operand-stack depth equals recursion depth
    /// and arbitrarily deep expressions stay correct.
    fn expr(&mut self, expr: &Expr) -> Result<(), CodegenError> {
        match expr {
            Expr::Number(val) => {
                self.out.push(Instruction::MovRI {
                    dst: ACC,
                    imm: *val,
                });
                Ok(())
            }
            Expr::Var(name) => {
                let offset = self.frame.lookup(name)?;
                self.out.push(Instruction::Load {
                    dst: ACC,
                    base: Reg::Rbp,
                    offset,
                });
                Ok(())
            }
            Expr::Call { func, args } => {
                self.call(func, args)?;
                self.out.push(Instruction::MovRR {
                    dst: ACC,
                    src: Reg::Rax,
                });
                Ok(())
            }
            Expr::Binary { op, left, right } => {
                if op.is_relational() {
                    self.diagnostics.push(format!(
                        "unsupported operator '{}' in value position, lowered as a no-op",
                        op
                    ));
                    return Ok(());
                }

                self.expr(right)?;
                self.out.push(Instruction::Push(ACC));
                self.expr(left)?;
                self.out.push(Instruction::Pop(SECOND));

                match op {
                    BinOp::Add => self.out.push(Instruction::Add {
                        dst: ACC,
                        src: SECOND,
                    }),
                    BinOp::Sub => self.out.push(Instruction::Sub {
                        dst: ACC,
                        src: SECOND,
                    }),
                    BinOp::Mul => self.out.push(Instruction::Imul {
                        dst: ACC,
                        src: SECOND,
                    }),
                    BinOp::Div => {
                        // signed divide has fixed operands: RDX:RAX / src
                        self.out.push(Instruction::MovRR {
                            dst: Reg::Rax,
                            src: ACC,
                        });
                        self.out.push(Instruction::Cqo);
                        self.out.push(Instruction::Idiv { src: SECOND });
                        self.out.push(Instruction::MovRR {
                            dst: ACC,
                            src: Reg::Rax,
                        });
                    }
                    _ => unreachable!("Internal Error: relational operator reached arithmetic lowering"),
                }

                Ok(())
            }
        }
    }

    /// Arguments are pushed right-to-left; the caller restores exactly
    /// the pushed byte count after the call. The callee's result stays
    /// in RAX for the caller to consume.
    fn call(&mut self, func: &str, args: &[Expr]) -> Result<(), CodegenError> {
        for arg in args.iter().rev() {
            self.expr(arg)?;
            self.out.push(Instruction::Push(ACC));
        }

        self.out.push(Instruction::Call(Label::named(func)));

        if !args.is_empty() {
            self.out.push(Instruction::AddImm {
                dst: Reg::Rsp,
                imm: 8 * args.len() as i32,
            });
        }

        Ok(())
    }
}

fn jump_kind(op: BinOp) -> Cond {
    match op {
        BinOp::Equal => Cond::Eq,
        BinOp::NotEqual => Cond::Ne,
        BinOp::Less => Cond::Lt,
        BinOp::LessEqual => Cond::Le,
        BinOp::Greater => Cond::Gt,
        BinOp::GreaterEqual => Cond::Ge,
        _ => unreachable!("Internal Error: not a relational operator: {:?}", op),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::NEWLINE;

    fn var(name: &str) -> Expr {
        Expr::Var(name.to_string())
    }

    fn decl(name: &str) -> Stmt {
        Stmt::VarDecl {
            name: name.to_string(),
        }
    }

    fn assign(name: &str, value: Expr) -> Stmt {
        Stmt::Assign {
            name: name.to_string(),
            value,
        }
    }

    fn lower(items: Vec<Stmt>) -> Lowered {
        lower_program(&Program { items }).unwrap()
    }

    /// Position of the first instruction of a window, or panic.
    fn find(instructions: &[Instruction], window: &[Instruction]) -> usize {
        instructions
            .windows(window.len())
            .position(|w| w == window)
            .unwrap_or_else(|| panic!("window not found:\n{:#?}", window))
    }

    #[test]
    fn declare_then_assign_literal() {
        let lowered = lower(vec![decl("x"), assign("x", Expr::Number(5))]);

        assert_eq!(
            &lowered.instructions[..11],
            &[
                Instruction::Section(".text"),
                Instruction::Global("_start"),
                Instruction::LabelDef(Label::named("_start")),
                Instruction::Push(Reg::Rbp),
                Instruction::MovRR {
                    dst: Reg::Rbp,
                    src: Reg::Rsp,
                },
                Instruction::SubImm {
                    dst: Reg::Rsp,
                    imm: 8,
                },
                Instruction::MovRI {
                    dst: Reg::R10,
                    imm: 5,
                },
                Instruction::Store {
                    base: Reg::Rbp,
                    offset: -8,
                    src: Reg::R10,
                },
                Instruction::MovRI {
                    dst: Reg::Rax,
                    imm: 60,
                },
                Instruction::MovRI {
                    dst: Reg::Rdi,
                    imm: 0,
                },
                Instruction::Syscall,
            ]
        );
    }

    #[test]
    fn write_loads_and_calls_the_print_routine() {
        let lowered = lower(vec![
            decl("x"),
            assign("x", Expr::Number(5)),
            Stmt::Write { expr: var("x") },
        ]);

        find(
            &lowered.instructions,
            &[
                Instruction::Load {
                    dst: Reg::R10,
                    base: Reg::Rbp,
                    offset: -8,
                },
                Instruction::MovRR {
                    dst: Reg::Rdi,
                    src: Reg::R10,
                },
                Instruction::Call(Label::named(PRINT_INT)),
            ],
        );

        // the routine itself (and its data byte) must be in the image
        assert!(lowered
            .instructions
            .contains(&Instruction::LabelDef(Label::named(PRINT_INT))));
        assert!(lowered
            .instructions
            .contains(&Instruction::LabelDef(Label::named(NEWLINE))));
    }

    #[test]
    fn conditional_with_empty_bodies_is_two_labeled_blocks() {
        let lowered = lower(vec![
            decl("a"),
            decl("b"),
            Stmt::If {
                condition: Expr::Binary {
                    op: BinOp::Equal,
                    left: Box::new(var("a")),
                    right: Box::new(var("b")),
                },
                then: vec![],
                otherwise: vec![],
            },
        ]);

        find(
            &lowered.instructions,
            &[
                Instruction::Cmp {
                    lhs: Reg::R11,
                    rhs: Reg::R10,
                },
                Instruction::JmpCond {
                    cond: Cond::Eq,
                    target: Label::Block(0),
                },
                Instruction::Jmp(Label::Block(1)),
                Instruction::LabelDef(Label::Block(0)),
                Instruction::LabelDef(Label::Block(1)),
            ],
        );
    }

    #[test]
    fn conditional_with_else_body_gets_a_join_label() {
        let lowered = lower(vec![
            decl("a"),
            Stmt::If {
                condition: Expr::Binary {
                    op: BinOp::Less,
                    left: Box::new(var("a")),
                    right: Box::new(Expr::Number(3)),
                },
                then: vec![assign("a", Expr::Number(1))],
                otherwise: vec![assign("a", Expr::Number(2))],
            },
        ]);

        // then block jumps over the else block to the join label
        find(
            &lowered.instructions,
            &[
                Instruction::Store {
                    base: Reg::Rbp,
                    offset: -8,
                    src: Reg::R10,
                },
                Instruction::Jmp(Label::Block(2)),
                Instruction::LabelDef(Label::Block(1)),
            ],
        );
        assert!(lowered
            .instructions
            .contains(&Instruction::LabelDef(Label::Block(2))));
    }

    #[test]
    fn two_argument_call_pushes_twice_and_restores_sixteen_bytes() {
        let lowered = lower(vec![
            Stmt::Func(FuncDecl {
                name: "sum".to_string(),
                params: vec!["a".to_string(), "b".to_string()],
                body: vec![Stmt::Return {
                    expr: Expr::Binary {
                        op: BinOp::Add,
                        left: Box::new(var("a")),
                        right: Box::new(var("b")),
                    },
                }],
            }),
            Stmt::Call {
                func: "sum".to_string(),
                args: vec![Expr::Number(1), Expr::Number(2)],
            },
        ]);

        // right-to-left: the second argument is pushed first
        find(
            &lowered.instructions,
            &[
                Instruction::MovRI {
                    dst: Reg::R10,
                    imm: 2,
                },
                Instruction::Push(Reg::R10),
                Instruction::MovRI {
                    dst: Reg::R10,
                    imm: 1,
                },
                Instruction::Push(Reg::R10),
                Instruction::Call(Label::named("sum")),
                Instruction::AddImm {
                    dst: Reg::Rsp,
                    imm: 16,
                },
            ],
        );
    }

    #[test]
    fn parameters_read_from_positive_offsets() {
        let lowered = lower(vec![Stmt::Func(FuncDecl {
            name: "second".to_string(),
            params: vec!["a".to_string(), "b".to_string()],
            body: vec![Stmt::Return { expr: var("b") }],
        })]);

        find(
            &lowered.instructions,
            &[
                Instruction::Load {
                    dst: Reg::R10,
                    base: Reg::Rbp,
                    offset: 24,
                },
                Instruction::MovRR {
                    dst: Reg::Rax,
                    src: Reg::R10,
                },
                Instruction::MovRR {
                    dst: Reg::Rsp,
                    src: Reg::Rbp,
                },
                Instruction::Pop(Reg::Rbp),
                Instruction::Ret,
            ],
        );
    }

    #[test]
    fn subtraction_keeps_operand_order() {
        let lowered = lower(vec![
            decl("a"),
            decl("b"),
            decl("c"),
            assign(
                "c",
                Expr::Binary {
                    op: BinOp::Sub,
                    left: Box::new(var("a")),
                    right: Box::new(var("b")),
                },
            ),
        ]);

        // right operand first, saved across the left operand's lowering
        find(
            &lowered.instructions,
            &[
                Instruction::Load {
                    dst: Reg::R10,
                    base: Reg::Rbp,
                    offset: -16,
                },
                Instruction::Push(Reg::R10),
                Instruction::Load {
                    dst: Reg::R10,
                    base: Reg::Rbp,
                    offset: -8,
                },
                Instruction::Pop(Reg::R11),
                Instruction::Sub {
                    dst: Reg::R10,
                    src: Reg::R11,
                },
            ],
        );
    }

    #[test]
    fn division_routes_through_rax() {
        let lowered = lower(vec![
            decl("a"),
            assign(
                "a",
                Expr::Binary {
                    op: BinOp::Div,
                    left: Box::new(Expr::Number(7)),
                    right: Box::new(Expr::Number(2)),
                },
            ),
        ]);

        find(
            &lowered.instructions,
            &[
                Instruction::Pop(Reg::R11),
                Instruction::MovRR {
                    dst: Reg::Rax,
                    src: Reg::R10,
                },
                Instruction::Cqo,
                Instruction::Idiv { src: Reg::R11 },
                Instruction::MovRR {
                    dst: Reg::R10,
                    src: Reg::Rax,
                },
            ],
        );
    }

    #[test]
    fn forward_reference_resolves_through_the_prepass() {
        let lowered = lower(vec![assign("x", Expr::Number(1)), decl("x")]);

        find(
            &lowered.instructions,
            &[Instruction::Store {
                base: Reg::Rbp,
                offset: -8,
                src: Reg::R10,
            }],
        );
    }

    #[test]
    fn discovery_is_idempotent() {
        let items = vec![
            decl("a"),
            Stmt::If {
                condition: Expr::Binary {
                    op: BinOp::Greater,
                    left: Box::new(var("a")),
                    right: Box::new(Expr::Number(0)),
                },
                then: vec![decl("b"), assign("b", Expr::Number(1))],
                otherwise: vec![],
            },
        ];

        let first = lower(items.clone()).instructions;
        let second = lower(items).instructions;

        assert_eq!(first, second);
    }

    #[test]
    fn assignment_to_undeclared_name_fails() {
        let result = lower_program(&Program {
            items: vec![assign("ghost", Expr::Number(1))],
        });

        assert_eq!(
            result.unwrap_err(),
            CodegenError::Undefined(UndefinedSymbol("ghost".to_string()))
        );
    }

    #[test]
    fn non_relational_condition_is_malformed() {
        let result = lower_program(&Program {
            items: vec![Stmt::If {
                condition: Expr::Number(1),
                then: vec![],
                otherwise: vec![],
            }],
        });

        assert!(matches!(
            result.unwrap_err(),
            CodegenError::MalformedNode(_)
        ));
    }

    #[test]
    fn nested_function_declaration_is_malformed() {
        let result = lower_program(&Program {
            items: vec![Stmt::Func(FuncDecl {
                name: "outer".to_string(),
                params: vec![],
                body: vec![Stmt::Func(FuncDecl {
                    name: "inner".to_string(),
                    params: vec![],
                    body: vec![],
                })],
            })],
        });

        assert!(matches!(
            result.unwrap_err(),
            CodegenError::MalformedNode(_)
        ));
    }

    #[test]
    fn relational_operator_in_value_position_is_diagnosed() {
        let lowered = lower(vec![
            decl("x"),
            assign(
                "x",
                Expr::Binary {
                    op: BinOp::Equal,
                    left: Box::new(Expr::Number(1)),
                    right: Box::new(Expr::Number(2)),
                },
            ),
        ]);

        assert_eq!(lowered.diagnostics.len(), 1);
        assert!(lowered.diagnostics[0].contains("eq"));
    }

    #[test]
    fn sqrt_statement_is_diagnosed_as_unsupported() {
        let lowered = lower(vec![Stmt::Sqrt {
            expr: Expr::Number(2),
        }]);

        assert_eq!(lowered.diagnostics.len(), 1);
        assert!(lowered.diagnostics[0].contains("root"));
    }

    #[test]
    fn top_level_return_exits_with_the_value() {
        let lowered = lower(vec![Stmt::Return {
            expr: Expr::Number(7),
        }]);

        find(
            &lowered.instructions,
            &[
                Instruction::MovRI {
                    dst: Reg::R10,
                    imm: 7,
                },
                Instruction::MovRR {
                    dst: Reg::Rdi,
                    src: Reg::R10,
                },
                Instruction::MovRI {
                    dst: Reg::Rax,
                    imm: 60,
                },
                Instruction::Syscall,
            ],
        );
    }

    #[test]
    fn read_statement_calls_the_input_routine() {
        let lowered = lower(vec![decl("x"), Stmt::Read {
            name: "x".to_string(),
        }]);

        find(
            &lowered.instructions,
            &[
                Instruction::Call(Label::named(READ_INT)),
                Instruction::MovRR {
                    dst: Reg::R10,
                    src: Reg::Rax,
                },
                Instruction::Store {
                    base: Reg::Rbp,
                    offset: -8,
                    src: Reg::R10,
                },
            ],
        );
        assert!(lowered
            .instructions
            .contains(&Instruction::LabelDef(Label::named(READ_INT))));
    }

    #[test]
    fn function_falling_off_the_end_returns_zero() {
        let lowered = lower(vec![Stmt::Func(FuncDecl {
            name: "noop".to_string(),
            params: vec![],
            body: vec![],
        })]);

        find(
            &lowered.instructions,
            &[
                Instruction::LabelDef(Label::named("noop")),
                Instruction::Push(Reg::Rbp),
                Instruction::MovRR {
                    dst: Reg::Rbp,
                    src: Reg::Rsp,
                },
                Instruction::MovRI {
                    dst: Reg::Rax,
                    imm: 0,
                },
                Instruction::MovRR {
                    dst: Reg::Rsp,
                    src: Reg::Rbp,
                },
                Instruction::Pop(Reg::Rbp),
                Instruction::Ret,
            ],
        );
    }
}
