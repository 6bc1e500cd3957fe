//─────────────────────────────────────────────────────────────────────────────
// 32-bit packed pixel layouts
//─────────────────────────────────────────────────────────────────────────────

/// byte positions of each channel inside a packed `u32` pixel.
/// every shift must be one of 0, 8, 16, 24 and all four must differ.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PixelFormat {
    pub r_shift: u32,
    pub g_shift: u32,
    pub b_shift: u32,
    pub a_shift: u32,
}

impl PixelFormat {
    /// 0xAARRGGBB, the layout the SIMD fitness path is written for
    pub const ARGB8888: Self = Self { r_shift: 16, g_shift: 8, b_shift: 0, a_shift: 24 };

    /// 0xAABBGGRR, i.e. RGBA bytes in memory on little-endian hosts
    pub const ABGR8888: Self = Self { r_shift: 0, g_shift: 8, b_shift: 16, a_shift: 24 };

    pub fn is_valid(&self) -> bool {
        let shifts = [self.r_shift, self.g_shift, self.b_shift, self.a_shift];
        let mut seen = 0u8;
        for s in shifts {
            if s > 24 || s % 8 != 0 {
                return false;
            }
            seen |= 1 << (s / 8);
        }
        seen == 0b1111
    }

    #[inline]
    pub fn is_argb8888(&self) -> bool {
        *self == Self::ARGB8888
    }

    /// split a packed pixel into `[r, g, b, a]`
    #[inline(always)]
    pub fn decompose(&self, px: u32) -> [u8; 4] {
        [
            (px >> self.r_shift) as u8,
            (px >> self.g_shift) as u8,
            (px >> self.b_shift) as u8,
            (px >> self.a_shift) as u8,
        ]
    }

    #[inline(always)]
    pub fn compose(&self, rgba: [u8; 4]) -> u32 {
        (rgba[0] as u32) << self.r_shift
            | (rgba[1] as u32) << self.g_shift
            | (rgba[2] as u32) << self.b_shift
            | (rgba[3] as u32) << self.a_shift
    }
}

impl Default for PixelFormat {
    fn default() -> Self {
        Self::ARGB8888
    }
}
