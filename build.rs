// build.rs

fn main() -> anyhow::Result<()> {
    embuild::espidf::sysenv::output();
    Ok(())
}

// EOF
