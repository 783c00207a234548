mod frame;
mod lir_def;

pub use frame::{Frame, SlotKind, UndefinedSymbol};
pub use lir_def::*;
