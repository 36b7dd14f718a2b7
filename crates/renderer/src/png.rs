//! PNG encoding for ARGB rasters.
//!
//! Output is truecolor with alpha (color type 6, 8 bits per channel), one
//! IDAT chunk holding a zlib stream of *stored* (uncompressed) deflate
//! blocks. The byte layout is fixed so that tiles are bit-identical across
//! server versions:
//!
//! - signature, IHDR, IDAT, IEND
//! - CRC-32 over each chunk's type and data
//! - zlib header `08 1D`, stored blocks of at most [`DEFLATE_BLOCK_SIZE`]
//!   bytes, Adler-32 of the filtered scanlines (big-endian) at the end
//! - every scanline uses filter type 0

use crate::encode::TileEncoder;
use crate::error::EncodeError;
use crate::raster::{alpha, blue, green, red, ArgbRaster};

pub const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Maximum payload of one stored deflate block.
pub const DEFLATE_BLOCK_SIZE: usize = 32000;

/// Create a PNG from packed ARGB pixels.
///
/// With `preserve_alpha == false` every pixel is written fully opaque, which
/// is the historical tile layout.
pub fn create_png(pixels: &[u32], width: usize, height: usize, preserve_alpha: bool) -> Vec<u8> {
    let mut scanlines = Vec::new();
    write_scanlines(&mut scanlines, pixels, width, height, preserve_alpha);
    assemble_png(&scanlines, width, height)
}

fn write_scanlines(
    out: &mut Vec<u8>,
    pixels: &[u32],
    width: usize,
    height: usize,
    preserve_alpha: bool,
) {
    out.clear();
    out.reserve(height * (1 + width * 4));
    for row in pixels.chunks_exact(width).take(height) {
        out.push(0); // filter type: none
        for &c in row {
            let a = if preserve_alpha { alpha(c) as u8 } else { 0xFF };
            out.extend_from_slice(&[red(c) as u8, green(c) as u8, blue(c) as u8, a]);
        }
    }
}

fn assemble_png(scanlines: &[u8], width: usize, height: usize) -> Vec<u8> {
    let idat = zlib_stored(scanlines);
    let mut png = Vec::with_capacity(PNG_SIGNATURE.len() + 25 + idat.len() + 12 + 12);

    // PNG signature
    png.extend_from_slice(&PNG_SIGNATURE);

    // IHDR chunk
    let mut ihdr_data = Vec::with_capacity(13);
    ihdr_data.extend_from_slice(&(width as u32).to_be_bytes());
    ihdr_data.extend_from_slice(&(height as u32).to_be_bytes());
    ihdr_data.push(8); // bit depth
    ihdr_data.push(6); // color type (RGBA)
    ihdr_data.push(0); // compression method
    ihdr_data.push(0); // filter method
    ihdr_data.push(0); // interlace method
    write_chunk(&mut png, b"IHDR", &ihdr_data);

    write_chunk(&mut png, b"IDAT", &idat);

    write_chunk(&mut png, b"IEND", &[]);

    png
}

/// Write a PNG chunk: length, type, data, CRC-32 of type + data.
pub fn write_chunk(png: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    png.extend_from_slice(chunk_type);
    png.extend_from_slice(data);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(data);
    png.extend_from_slice(&hasher.finalize().to_be_bytes());
}

/// Wrap `raw` in a zlib stream of stored deflate blocks.
pub fn zlib_stored(raw: &[u8]) -> Vec<u8> {
    let blocks = raw.len() / DEFLATE_BLOCK_SIZE + 1;
    let mut out = Vec::with_capacity(2 + raw.len() + blocks * 5 + 4);

    // CM = 8, CINFO = 0; FCHECK makes the header a multiple of 31
    let cmf: u8 = 8;
    out.push(cmf);
    out.push(((31 - ((cmf as u32) << 8) % 31) % 31) as u8);

    let mut pos = 0;
    while raw.len() - pos > DEFLATE_BLOCK_SIZE {
        write_stored_block(&mut out, false, &raw[pos..pos + DEFLATE_BLOCK_SIZE]);
        pos += DEFLATE_BLOCK_SIZE;
    }
    write_stored_block(&mut out, true, &raw[pos..]);

    out.extend_from_slice(&adler32(raw).to_be_bytes());
    out
}

fn write_stored_block(out: &mut Vec<u8>, last: bool, data: &[u8]) {
    let len = data.len() as u16;
    out.push(u8::from(last)); // BFINAL, BTYPE = 00
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(&(!len).to_le_bytes());
    out.extend_from_slice(data);
}

/// Adler-32 checksum as used by zlib.
pub fn adler32(data: &[u8]) -> u32 {
    adler2::adler32_slice(data)
}

/// PNG tile encoder. Keeps its scanline buffer between tiles.
#[derive(Debug, Default)]
pub struct PngEncoder {
    preserve_alpha: bool,
    scanlines: Vec<u8>,
}

impl PngEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write the raster's alpha channel instead of forcing opaque pixels.
    pub fn with_alpha(mut self, preserve_alpha: bool) -> Self {
        self.preserve_alpha = preserve_alpha;
        self
    }
}

impl TileEncoder for PngEncoder {
    fn content_type(&self) -> &'static str {
        "image/png"
    }

    fn encode(&mut self, raster: &ArgbRaster) -> Result<Vec<u8>, EncodeError> {
        let (width, height) = raster.dimensions();
        if raster.is_empty() {
            return Err(EncodeError::EmptyRaster { width, height });
        }
        write_scanlines(
            &mut self.scanlines,
            raster.pixels(),
            width as usize,
            height as usize,
            self.preserve_alpha,
        );
        Ok(assemble_png(&self.scanlines, width as usize, height as usize))
    }
}
