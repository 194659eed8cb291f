use anyhow::Result;
use vergen::EmitBuilder;

fn main() -> Result<()> {
    // VERGEN_GIT_SHA is shown in --debug output
    EmitBuilder::builder().git_sha(true).emit()?;
    Ok(())
}
