//! Graphviz dump of a parsed program, written next to the other
//! compilation artifacts so the tree can be inspected with `dot -Tpng`.

use std::fs::File;
use std::io::{BufWriter, Write};

use crate::{Expr, FuncDecl, Program, Stmt};

type IOResult = std::io::Result<()>;

const CHAIN_COLOR: &str = "#19A302";
const OPERAND_COLOR: &str = "#C00303";

pub fn dump_ast(program: &Program, file_name: &str) -> IOResult {
    let output = File::create(file_name)?;
    let mut writer = BufWriter::new(output);

    writeln!(writer, "digraph Ast {{")?;
    writeln!(writer, "\tnode [shape=\"record\", fontsize=15] ;")?;
    writeln!(writer, "\trankdir=TB;")?;

    let mut dot = Dot {
        writer: &mut writer,
        next_id: 0,
    };

    let root = dot.node("Program")?;
    for stmt in &program.items {
        let child = dot.stmt(stmt)?;
        dot.edge(root, child, CHAIN_COLOR)?;
    }

    writeln!(writer, "}}")?;
    writer.flush()?;

    Ok(())
}

struct Dot<'w, W: Write> {
    writer: &'w mut W,
    next_id: usize,
}

impl<W: Write> Dot<'_, W> {
    fn node(&mut self, label: &str) -> std::io::Result<usize> {
        let id = self.next_id;
        self.next_id += 1;

        writeln!(self.writer, "\t\"n{}\" [label = \"{}\"]", id, label)?;

        Ok(id)
    }

    fn edge(&mut self, from: usize, to: usize, color: &str) -> IOResult {
        writeln!(
            self.writer,
            "\t\"n{}\" -> \"n{}\" [color = \"{}\"];",
            from, to, color
        )
    }

    fn stmt(&mut self, stmt: &Stmt) -> std::io::Result<usize> {
        match stmt {
            Stmt::VarDecl { name } => self.node(&format!("Idea | {}", name)),
            Stmt::Assign { name, value } => {
                let id = self.node(&format!("Let | {}", name))?;
                let value = self.expr(value)?;
                self.edge(id, value, OPERAND_COLOR)?;
                Ok(id)
            }
            Stmt::If {
                condition,
                then,
                otherwise,
            } => {
                let id = self.node("Criterion")?;
                let cond = self.expr(condition)?;
                self.edge(id, cond, OPERAND_COLOR)?;
                for stmt in then.iter().chain(otherwise) {
                    let child = self.stmt(stmt)?;
                    self.edge(id, child, CHAIN_COLOR)?;
                }
                Ok(id)
            }
            Stmt::Return { expr } => {
                let id = self.node("Catharsis")?;
                let expr = self.expr(expr)?;
                self.edge(id, expr, OPERAND_COLOR)?;
                Ok(id)
            }
            Stmt::Write { expr } => {
                let id = self.node("Write")?;
                let expr = self.expr(expr)?;
                self.edge(id, expr, OPERAND_COLOR)?;
                Ok(id)
            }
            Stmt::Read { name } => self.node(&format!("Read | {}", name)),
            Stmt::Sqrt { expr } => {
                let id = self.node("root")?;
                let expr = self.expr(expr)?;
                self.edge(id, expr, OPERAND_COLOR)?;
                Ok(id)
            }
            Stmt::Exit => self.node("Thanks"),
            Stmt::Call { func, args } => {
                let id = self.node(&format!("Ritual | {}", func))?;
                for arg in args {
                    let arg = self.expr(arg)?;
                    self.edge(id, arg, OPERAND_COLOR)?;
                }
                Ok(id)
            }
            Stmt::Func(decl) => self.func(decl),
        }
    }

    fn func(&mut self, decl: &FuncDecl) -> std::io::Result<usize> {
        let id = self.node(&format!(
            "Theurgy | {} | {}",
            decl.name,
            decl.params.join(", ")
        ))?;
        for stmt in &decl.body {
            let child = self.stmt(stmt)?;
            self.edge(id, child, CHAIN_COLOR)?;
        }
        Ok(id)
    }

    fn expr(&mut self, expr: &Expr) -> std::io::Result<usize> {
        match expr {
            Expr::Number(val) => self.node(&format!("{}", val)),
            Expr::Var(name) => self.node(name),
            Expr::Binary { op, left, right } => {
                let id = self.node(&format!("{}", op))?;
                let left = self.expr(left)?;
                let right = self.expr(right)?;
                self.edge(id, left, OPERAND_COLOR)?;
                self.edge(id, right, OPERAND_COLOR)?;
                Ok(id)
            }
            Expr::Call { func, args } => {
                let id = self.node(&format!("Ritual | {}", func))?;
                for arg in args {
                    let arg = self.expr(arg)?;
                    self.edge(id, arg, OPERAND_COLOR)?;
                }
                Ok(id)
            }
        }
    }
}
