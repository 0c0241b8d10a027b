use anyhow::{Context, Result};
use qp_painter::codec::{rle_decode, rle_encode};
use std::path::Path;

fn transform(input: &Path, output: &Path, f: impl FnOnce(&[u8]) -> Result<Vec<u8>>) -> Result<()> {
    let raw = std::fs::read(input).with_context(|| format!("reading '{}'", input.display()))?;
    let out = f(&raw)?;
    std::fs::write(output, &out).with_context(|| format!("writing '{}'", output.display()))?;
    eprintln!(
        "[OK] {} -> {} ({} -> {} bytes)",
        input.display(),
        output.display(),
        raw.len(),
        out.len()
    );
    Ok(())
}

pub fn encode(input: &Path, output: &Path) -> Result<()> {
    transform(input, output, |raw| Ok(rle_encode(raw)))
}

pub fn decode(input: &Path, output: &Path) -> Result<()> {
    transform(input, output, |raw| rle_decode(raw).context("decoding RLE stream"))
}
