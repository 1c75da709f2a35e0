/// RGBA color with integer channels.
///
/// Channels are conventionally `0..=255` but are not validated. Backends
/// interpret out-of-range values by keeping the low 8 bits of each channel
/// (see [`Color::to_rgba8`]).
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct Color {
    pub r: i32,
    pub g: i32,
    pub b: i32,
    pub a: i32,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    #[inline]
    pub const fn new(r: i32, g: i32, b: i32, a: i32) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color.
    #[inline]
    pub const fn rgb(r: i32, g: i32, b: i32) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Truncates every channel to a byte.
    #[inline]
    pub const fn to_rgba8(self) -> [u8; 4] {
        [self.r as u8, self.g as u8, self.b as u8, self.a as u8]
    }

    /// Normalized `[0, 1]` channels after byte truncation, for GPU upload.
    #[inline]
    pub fn to_unit_f32(self) -> [f32; 4] {
        let [r, g, b, a] = self.to_rgba8();
        [
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            a as f32 / 255.0,
        ]
    }
}
