//! ARGB raster buffer owned by a renderer worker.

/// Pack channels into `0xAARRGGBB`.
#[inline(always)]
pub fn argb(a: u32, r: u32, g: u32, b: u32) -> u32 {
    (a << 24) | (r << 16) | (g << 8) | b
}

#[inline(always)]
pub fn alpha(c: u32) -> u32 {
    c >> 24
}

#[inline(always)]
pub fn red(c: u32) -> u32 {
    (c >> 16) & 0xFF
}

#[inline(always)]
pub fn green(c: u32) -> u32 {
    (c >> 8) & 0xFF
}

#[inline(always)]
pub fn blue(c: u32) -> u32 {
    c & 0xFF
}

/// Row-major 2D store of packed ARGB pixels.
///
/// Reallocated only when the requested dimensions change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgbRaster {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl ArgbRaster {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Make the raster `width`×`height`. Returns `true` when a new buffer was
    /// allocated; an unchanged size keeps the existing buffer.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if self.width == width && self.height == height {
            return false;
        }
        self.width = width;
        self.height = height;
        self.pixels = vec![0; width as usize * height as usize];
        true
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u32] {
        &mut self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> u32 {
        self.pixels[y as usize * self.width as usize + x as usize]
    }

    pub fn row(&self, y: u32) -> &[u32] {
        let w = self.width as usize;
        let start = y as usize * w;
        &self.pixels[start..start + w]
    }

    pub fn fill(&mut self, color: u32) {
        self.pixels.fill(color);
    }

    /// Interleaved RGB bytes (alpha dropped).
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_rgb_bytes(&mut out);
        out
    }

    /// Replace the contents of `out` with interleaved RGB bytes.
    pub fn write_rgb_bytes(&self, out: &mut Vec<u8>) {
        out.clear();
        out.reserve(self.pixels.len() * 3);
        for &c in &self.pixels {
            out.extend_from_slice(&[red(c) as u8, green(c) as u8, blue(c) as u8]);
        }
    }

    /// Interleaved RGBA bytes.
    pub fn to_rgba_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixels.len() * 4);
        for &c in &self.pixels {
            out.extend_from_slice(&[red(c) as u8, green(c) as u8, blue(c) as u8, alpha(c) as u8]);
        }
        out
    }
}
