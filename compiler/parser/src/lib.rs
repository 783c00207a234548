mod parser;

pub use parser::{ParseError, Parser};
