use anyhow::Result;

fn main() -> Result<()> {
    lyceum_driver::main()
}
