use anyhow::{bail, Context, Result};
use qp_painter::{FileStream, QgfImage};
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::manifest::{self, ImageManifest};

#[derive(Debug, Serialize)]
struct FrameReport {
    index: u16,
    format: String,
    bpp: u8,
    compression: String,
    delay_ms: u16,
    transparency_index: Option<u8>,
    delta: Option<[u16; 4]>,
    data_offset: u32,
    data_length: u32,
}

#[derive(Debug, Serialize)]
struct ImageReport {
    path: PathBuf,
    total_file_size: u32,
    width: u16,
    height: u16,
    frames: Vec<FrameReport>,
}

fn open(path: &Path) -> Result<QgfImage<FileStream>> {
    let stream = FileStream::open(path).with_context(|| format!("opening '{}'", path.display()))?;
    QgfImage::load(stream).with_context(|| format!("validating '{}'", path.display()))
}

fn report(path: &Path) -> Result<ImageReport> {
    let mut image = open(path)?;
    let mut frames = Vec::with_capacity(usize::from(image.frame_count()));
    for index in 0..image.frame_count() {
        let info = image.frame_info(index).with_context(|| format!("reading frame {index}"))?;
        frames.push(FrameReport {
            index,
            format: format!("{:?}", info.format),
            bpp: info.bpp,
            compression: format!("{:?}", info.compression),
            delay_ms: info.delay,
            transparency_index: info.is_transparent.then_some(info.transparency_index),
            delta: info.delta.map(|r| [r.left, r.top, r.right, r.bottom]),
            data_offset: info.data_offset,
            data_length: info.data_length,
        });
    }
    Ok(ImageReport {
        path: path.to_path_buf(),
        total_file_size: image.descriptor().total_file_size,
        width: image.width(),
        height: image.height(),
        frames,
    })
}

pub fn info(path: &Path, json: bool) -> Result<()> {
    let report = report(path)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", report.path.display());
    println!("  size:   {}x{}", report.width, report.height);
    println!("  bytes:  {}", report.total_file_size);
    println!("  frames: {}", report.frames.len());
    for f in &report.frames {
        print!(
            "  [{}] {} ({}bpp, {}), {} ms, data {}@{}",
            f.index, f.format, f.bpp, f.compression, f.delay_ms, f.data_length, f.data_offset
        );
        if let Some([l, t, r, b]) = f.delta {
            print!(", delta ({l},{t})-({r},{b})");
        }
        if let Some(index) = f.transparency_index {
            print!(", transparent {index}");
        }
        println!();
    }
    Ok(())
}

pub fn validate(paths: &[PathBuf]) -> Result<()> {
    let mut ok = true;
    for path in paths {
        match open(path) {
            Ok(image) => eprintln!(
                "[OK] {} ({}x{}, {} frame(s))",
                path.display(),
                image.width(),
                image.height(),
                image.frame_count()
            ),
            Err(e) => {
                eprintln!("[FAIL] {e:#}");
                ok = false;
            }
        }
    }
    if !ok {
        bail!("qgf validation failed");
    }
    Ok(())
}

pub fn encode(manifest_path: &Path, output: &Path) -> Result<()> {
    let manifest: ImageManifest = manifest::load(manifest_path)?;
    let bytes = manifest.encode()?;
    std::fs::write(output, &bytes).with_context(|| format!("writing '{}'", output.display()))?;
    eprintln!(
        "[OK] wrote {} ({} bytes, {} frame(s))",
        output.display(),
        bytes.len(),
        manifest.frames.len()
    );
    Ok(())
}
