use std::collections::HashMap;

use thiserror::Error;

#[derive(Error, Clone, Debug, PartialEq, Eq)]
#[error("use of undeclared identifier '{0}'")]
pub struct UndefinedSymbol(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Local,
    Arg,
}

/// Per-function symbol table: identifier -> signed byte offset from RBP.
/// Locals sit below the frame base at -8, -16, ... in declaration order;
/// arguments above it at +16, +24, ... (past the saved RBP and the return
/// address) in parameter order. One frame per function body; the language
/// has no nested scopes.
#[derive(Debug, Default)]
pub struct Frame {
    offsets: HashMap<String, i32>,
    locals: u32,
    args: u32,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns the next slot of the given kind. Redefining a name returns
    /// its existing slot, which keeps the discovery pre-pass idempotent.
    pub fn define(&mut self, name: &str, kind: SlotKind) -> i32 {
        if let Some(&offset) = self.offsets.get(name) {
            return offset;
        }

        let offset = match kind {
            SlotKind::Local => {
                self.locals += 1;
                -8 * self.locals as i32
            }
            SlotKind::Arg => {
                self.args += 1;
                16 + 8 * (self.args as i32 - 1)
            }
        };

        self.offsets.insert(name.to_string(), offset);
        offset
    }

    pub fn lookup(&self, name: &str) -> Result<i32, UndefinedSymbol> {
        self.offsets
            .get(name)
            .copied()
            .ok_or_else(|| UndefinedSymbol(name.to_string()))
    }

    /// Bytes of stack space the prologue must reserve for locals.
    pub fn local_bytes(&self) -> i32 {
        8 * self.locals as i32
    }
}
