use anyhow::{bail, Context, Result};
use qp_painter::qff::{ASCII_FIRST, ASCII_LAST};
use qp_painter::{FileStream, QffFont};
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::manifest::{self, FontManifest};

#[derive(Debug, Serialize)]
struct GlyphReport {
    code_point: u32,
    #[serde(rename = "char")]
    ch: Option<char>,
    width: u8,
    offset: u32,
}

#[derive(Debug, Serialize)]
struct FontReport {
    path: PathBuf,
    total_file_size: u32,
    line_height: u8,
    format: String,
    compression: String,
    glyphs: Vec<GlyphReport>,
    /// Unicode table entries that carry no glyph.
    empty_entries: usize,
}

fn open(path: &Path) -> Result<QffFont<FileStream>> {
    let stream = FileStream::open(path).with_context(|| format!("opening '{}'", path.display()))?;
    QffFont::load(stream).with_context(|| format!("validating '{}'", path.display()))
}

fn report(path: &Path) -> Result<FontReport> {
    let mut font = open(path)?;
    let desc = *font.descriptor();
    let mut glyphs = Vec::new();

    for cp in ASCII_FIRST..=ASCII_LAST {
        if let Some(g) = font.ascii_glyph(cp)? {
            glyphs.push(GlyphReport {
                code_point: cp,
                ch: char::from_u32(cp),
                width: g.width,
                offset: g.offset,
            });
        }
    }

    let mut empty_entries = 0;
    for index in 0..desc.num_unicode_glyphs {
        match font.unicode_entry(index)? {
            Some((cp, Some(g))) => glyphs.push(GlyphReport {
                code_point: cp,
                ch: char::from_u32(cp),
                width: g.width,
                offset: g.offset,
            }),
            Some((_, None)) => empty_entries += 1,
            None => break,
        }
    }

    Ok(FontReport {
        path: path.to_path_buf(),
        total_file_size: desc.total_file_size,
        line_height: desc.line_height,
        format: format!("{:?}", desc.format),
        compression: format!("{:?}", desc.compression),
        glyphs,
        empty_entries,
    })
}

pub fn info(path: &Path, json: bool) -> Result<()> {
    let report = report(path)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", report.path.display());
    println!("  line height: {}", report.line_height);
    println!("  format:      {} ({})", report.format, report.compression);
    println!("  bytes:       {}", report.total_file_size);
    println!("  glyphs:      {}", report.glyphs.len());
    for g in &report.glyphs {
        let shown = g.ch.filter(|c| !c.is_control()).unwrap_or('?');
        println!("    U+{:04X} '{}' width {} @ {}", g.code_point, shown, g.width, g.offset);
    }
    if report.empty_entries > 0 {
        println!("  empty unicode entries: {}", report.empty_entries);
    }
    Ok(())
}

pub fn validate(paths: &[PathBuf]) -> Result<()> {
    let mut ok = true;
    for path in paths {
        match open(path) {
            Ok(font) => eprintln!("[OK] {} (line height {})", path.display(), font.line_height()),
            Err(e) => {
                eprintln!("[FAIL] {e:#}");
                ok = false;
            }
        }
    }
    if !ok {
        bail!("qff validation failed");
    }
    Ok(())
}

pub fn encode(manifest_path: &Path, output: &Path) -> Result<()> {
    let manifest: FontManifest = manifest::load(manifest_path)?;
    let bytes = manifest.encode()?;
    std::fs::write(output, &bytes).with_context(|| format!("writing '{}'", output.display()))?;
    eprintln!(
        "[OK] wrote {} ({} bytes, {} glyph(s))",
        output.display(),
        bytes.len(),
        manifest.glyphs.len()
    );
    Ok(())
}
