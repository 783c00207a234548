use std::fs::File;
use std::io::{BufWriter, Write};

use itertools::Itertools;

use lir::Instruction;

type IOResult = std::io::Result<()>;

pub fn output(path: &str, instructions: &[Instruction]) -> IOResult {
    let output = File::create(path)?;
    let mut writer = BufWriter::new(output);

    writeln!(writer, "{}", render(instructions))?;

    writer.flush()?;

    Ok(())
}

/// One instruction per line, NASM syntax: labels and directives flush
/// left, everything else indented.
pub fn render(instructions: &[Instruction]) -> String {
    instructions
        .iter()
        .map(|inst| match inst {
            Instruction::LabelDef(_) | Instruction::Section(_) | Instruction::Global(_) => {
                inst.text()
            }
            _ => format!("\t{}", inst.text()),
        })
        .join("\n")
}
