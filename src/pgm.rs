//! PGM (P5, binary grayscale) image I/O (spec.md §6), grounded in
//! `examples/original_source/EX1/GoL_parallel_read_write.c`.
//!
//! The header is a fixed 23 bytes — `"P5\n%8d %8d\n%d\n"` with the
//! width and height each zero-padded to 8 digits — so every rank can
//! compute its row band's file offset without reading the file first.
//! This is what lets [`crate::cluster::Cluster`] have each rank write
//! its band directly at the right offset instead of funnelling every
//! write through one rank.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::config::PGM_HEADER_SIZE;
use crate::error::{GolError, Result};

/// Formats the fixed-width PGM header for a `k`×`k` image. The maxval
/// field is fixed at `1`: cells are binary, written as raw `0`/`1`
/// bytes rather than scaled to the conventional `0`/`255` grayscale
/// range, matching `write_snapshot`'s `maxval = 1` argument in the
/// reference implementation.
pub fn header(k: usize) -> Vec<u8> {
    let text = format!("P5\n{:>8} {:>8}\n1\n", k, k);
    debug_assert_eq!(text.len(), PGM_HEADER_SIZE);
    text.into_bytes()
}

fn open_err(path: &Path, source: std::io::Error) -> GolError {
    GolError::io(path, source)
}

/// Reads a whole square PGM image, returning `(k, pixels)` with
/// `pixels` in row-major order.
pub fn read_pgm(path: &Path) -> Result<(usize, Vec<u8>)> {
    let mut file = File::open(path).map_err(|e| open_err(path, e))?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf).map_err(|e| open_err(path, e))?;
    if buf.len() < PGM_HEADER_SIZE {
        return Err(GolError::Protocol(format!(
            "{}: file shorter than the PGM header",
            path.display()
        )));
    }
    let header_text = std::str::from_utf8(&buf[..PGM_HEADER_SIZE])
        .map_err(|_| GolError::Protocol(format!("{}: header is not valid UTF-8", path.display())))?;
    let mut fields = header_text.split_whitespace();
    let magic = fields.next().ok_or_else(|| malformed(path))?;
    if magic != "P5" {
        return Err(GolError::Protocol(format!(
            "{}: expected P5 magic, found {magic}",
            path.display()
        )));
    }
    let width: usize = fields
        .next()
        .ok_or_else(|| malformed(path))?
        .parse()
        .map_err(|_| malformed(path))?;
    let height: usize = fields
        .next()
        .ok_or_else(|| malformed(path))?
        .parse()
        .map_err(|_| malformed(path))?;
    if width != height {
        return Err(GolError::Protocol(format!(
            "{}: expected a square grid, got {width}x{height}",
            path.display()
        )));
    }
    let pixels = buf[PGM_HEADER_SIZE..].to_vec();
    if pixels.len() != width * height {
        return Err(GolError::Protocol(format!(
            "{}: expected {} pixel bytes, found {}",
            path.display(),
            width * height,
            pixels.len()
        )));
    }
    Ok((width, pixels))
}

fn malformed(path: &Path) -> GolError {
    GolError::Protocol(format!("{}: malformed PGM header", path.display()))
}

/// Writes a whole square PGM image in one call (used by the serial
/// `-i` initial-condition writer and by tests).
pub fn write_pgm(path: &Path, k: usize, pixels: &[u8]) -> Result<()> {
    debug_assert_eq!(pixels.len(), k * k);
    let mut file = File::create(path).map_err(|e| open_err(path, e))?;
    file.write_all(&header(k)).map_err(|e| open_err(path, e))?;
    file.write_all(pixels).map_err(|e| open_err(path, e))?;
    Ok(())
}

/// Opens `path` for banded, offset-based writing: every rank writes
/// its own rows directly to the right byte range of the same file,
/// with only rank 0 writing the header.
pub struct PgmWriter {
    file: File,
}

impl PgmWriter {
    pub fn create(path: &Path, k: usize, is_root: bool) -> Result<Self> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(is_root)
            .open(path)
            .map_err(|e| open_err(path, e))?;
        if is_root {
            file.set_len((PGM_HEADER_SIZE + k * k) as u64)
                .map_err(|e| open_err(path, e))?;
            file.write_all(&header(k)).map_err(|e| open_err(path, e))?;
        }
        Ok(Self { file })
    }

    /// Writes `rows` (row-major, `cols` columns each) starting at
    /// `first_row` of the full image.
    pub fn write_band(&mut self, path: &Path, first_row: usize, cols: usize, rows: &[u8]) -> Result<()> {
        let offset = (PGM_HEADER_SIZE + first_row * cols) as u64;
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(|e| open_err(path, e))?;
        self.file.write_all(rows).map_err(|e| open_err(path, e))
    }
}
