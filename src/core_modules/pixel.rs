// THEORY:
// The `Pixel` module is the most fundamental unit of the retrieval engine. It is a
// "dumb" data container for a single RGB pixel plus the two single-pixel heuristics
// the histogram layer needs: which intensity band the pixel falls in, and which cell
// of the coarse 4x4x4 color cube it belongs to.
//
// Key principles:
// 1) Single-pixel scope: nothing here reads neighbors or other images.
// 2) Alpha is dropped. Every raster is converted to RGB before its channels are
//    read, so a pixel only ever carries red, green and blue.
// 3) Bin indices are always in range. Luma can reach 255 and 255 / 10 would name a
//    26th band, so the intensity band is clamped into the last bin explicitly.

pub mod pixel {
    pub type Byte = u8;
    pub type Channel = Byte;
    pub type Luminance = f64;
    pub type BinIndex = usize;

    const CHANNELS: usize = 3;

    /// Width of one intensity band in luma units.
    pub const INTENSITY_BAND_WIDTH: usize = 10;
    /// Number of intensity bands; the last band absorbs every luma value >= 240.
    pub const INTENSITY_BINS: usize = 25;
    /// Right shift that quantizes a 0..=255 channel into 4 ranges (channel / 64).
    pub const COLOR_CODE_SHIFT: u32 = 6;
    /// Ranges per channel after quantization.
    pub const COLOR_CODE_LEVELS: usize = 4;
    /// Cells in the joint color cube (4 x 4 x 4).
    pub const COLOR_CODE_BINS: usize = COLOR_CODE_LEVELS * COLOR_CODE_LEVELS * COLOR_CODE_LEVELS;

    /// A "dumb" data container representing a single RGB pixel.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Pixel {
        /// The red channel value (0-255).
        pub red: Channel,
        /// The green channel value (0-255).
        pub green: Channel,
        /// The blue channel value (0-255).
        pub blue: Channel,
    }

    impl Pixel {
        pub fn new(red: Channel, green: Channel, blue: Channel) -> Self {
            Pixel { red, green, blue }
        }

        /// Luminance estimate (Rec. 601 luma), 0.0..=255.0.
        pub fn luminance(&self) -> Luminance {
            0.299_f64 * self.red as f64
                + 0.587_f64 * self.green as f64
                + 0.114_f64 * self.blue as f64
        }

        /// Intensity band of this pixel: `min(floor(L) / 10, 24)`.
        pub fn intensity_bin(&self) -> BinIndex {
            let band = self.luminance().floor() as usize / INTENSITY_BAND_WIDTH;
            band.min(INTENSITY_BINS - 1)
        }

        /// Cell of the 4x4x4 color cube: `(R>>6)*16 + (G>>6)*4 + (B>>6)`.
        pub fn color_code_bin(&self) -> BinIndex {
            let quantize = |channel: Channel| (channel >> COLOR_CODE_SHIFT) as BinIndex;
            quantize(self.red) * COLOR_CODE_LEVELS * COLOR_CODE_LEVELS
                + quantize(self.green) * COLOR_CODE_LEVELS
                + quantize(self.blue)
        }
    }

    impl From<&[Byte]> for Pixel {
        fn from(bytes: &[Byte]) -> Self {
            if bytes.len() != CHANNELS {
                panic!("Cannot convert {} bytes into pixel.", bytes.len());
            }
            Pixel::new(bytes[0], bytes[1], bytes[2])
        }
    }

    impl From<image::Rgb<u8>> for Pixel {
        fn from(rgb: image::Rgb<u8>) -> Self {
            let [red, green, blue] = rgb.0;
            Pixel::new(red, green, blue)
        }
    }
}
