//! JPEG encoding: maximum quality, baseline, no chroma subsampling.

use image::codecs::jpeg::JpegEncoder as ImageJpegEncoder;
use image::ColorType;

use crate::encode::TileEncoder;
use crate::error::EncodeError;
use crate::raster::ArgbRaster;

/// Quality used for every tile.
pub const JPEG_QUALITY: u8 = 100;

/// JPEG tile encoder. Alpha is dropped.
#[derive(Debug, Default)]
pub struct JpegEncoder {
    rgb: Vec<u8>,
}

impl JpegEncoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TileEncoder for JpegEncoder {
    fn content_type(&self) -> &'static str {
        "image/jpeg"
    }

    fn encode(&mut self, raster: &ArgbRaster) -> Result<Vec<u8>, EncodeError> {
        let (width, height) = raster.dimensions();
        if raster.is_empty() {
            return Err(EncodeError::EmptyRaster { width, height });
        }

        raster.write_rgb_bytes(&mut self.rgb);

        // The `image` encoder writes baseline frames with 1x1 sampling for
        // every component, i.e. 4:4:4.
        let mut out = Vec::with_capacity(self.rgb.len() / 4);
        {
            let mut encoder = ImageJpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
            encoder
                .encode(&self.rgb, width, height, ColorType::Rgb8)
                .map_err(|e| EncodeError::Jpeg(e.to_string()))?;
        }
        Ok(out)
    }
}
