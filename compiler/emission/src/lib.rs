mod elf;
mod emission;

pub use elf::{load_addr, write_elf, BASE_VADDR};
pub use emission::{output, render};
