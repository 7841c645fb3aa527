/// One captured camera image, 8-bit RGB, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>, // len = 3*w*h
}

impl Frame {
    /// Wrap an RGB buffer. Returns `None` when the length does not match the size.
    pub fn from_rgb(width: usize, height: usize, data: Vec<u8>) -> Option<Self> {
        let expected = width.checked_mul(height)?.checked_mul(3)?;
        if data.len() != expected {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    /// Expand a single-channel buffer into an RGB frame.
    pub fn from_gray(width: usize, height: usize, gray: &[u8]) -> Option<Self> {
        if width.checked_mul(height)? != gray.len() {
            return None;
        }
        let data = gray.iter().flat_map(|&v| [v, v, v]).collect();
        Some(Self {
            width,
            height,
            data,
        })
    }

    /// A frame filled with one color.
    pub fn filled(width: usize, height: usize, rgb: [u8; 3]) -> Self {
        let data = std::iter::repeat_n(rgb, width * height).flatten().collect();
        Self {
            width,
            height,
            data,
        }
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = 3 * (y * self.width + x);
        Some([self.data[i], self.data[i + 1], self.data[i + 2]])
    }

    /// Rec. 709 luminance, one byte per pixel.
    pub fn to_luma(&self) -> Vec<u8> {
        self.data
            .chunks_exact(3)
            .map(|p| {
                let l = 2126 * p[0] as u32 + 7152 * p[1] as u32 + 722 * p[2] as u32;
                ((l + 5000) / 10_000) as u8
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}
