// THEORY:
// The `histogram` module is the feature-extraction layer of the retrieval engine.
// It turns a decoded raster into fixed-length count vectors that summarize how the
// image's pixels are distributed, discarding all spatial layout.
//
// Key architectural principles:
// 1.  **Two Independent Lenses**: The intensity histogram (25 luma bands) captures
//     brightness distribution; the color-code histogram (64 cells of a 4x4x4 RGB
//     cube) captures coarse color distribution. Each is useful on its own.
// 2.  **Combined Space**: The combined histogram concatenates both lenses after
//     normalizing each half by pixel count, giving two probability distributions in
//     a single 89-dimension vector. It is the input to corpus-wide standardization.
// 3.  **Pure Extraction**: Every function here is pure and deterministic. A raster
//     is converted to RGB once and its bytes are counted in bulk; no state survives
//     the call.
// 4.  **Invariants**: The bins of both raw histograms always sum to the image's
//     pixel count, and every bin index is in range, including at channel value 255.

use image::{DynamicImage, RgbImage};

use crate::core_modules::pixel::pixel::{COLOR_CODE_BINS, INTENSITY_BINS, Pixel};
use crate::error::InvalidImageError;

/// Length of the combined (intensity ++ color-code) feature vector.
pub const COMBINED_BINS: usize = INTENSITY_BINS + COLOR_CODE_BINS;

pub type Count = u64;

/// A fixed-length vector of non-negative pixel counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram<const BINS: usize> {
    bins: [Count; BINS],
}

/// Luma histogram: bin `b` counts pixels with luma in `[10b, 10b+9]`, bin 24 absorbs `>= 240`.
pub type IntensityHistogram = Histogram<INTENSITY_BINS>;
/// Joint 4x4x4 quantized RGB histogram.
pub type ColorCodeHistogram = Histogram<COLOR_CODE_BINS>;

impl<const BINS: usize> Default for Histogram<BINS> {
    fn default() -> Self {
        Self { bins: [0; BINS] }
    }
}

impl<const BINS: usize> Histogram<BINS> {
    pub fn from_bins(bins: [Count; BINS]) -> Self {
        Self { bins }
    }

    pub fn bins(&self) -> &[Count; BINS] {
        &self.bins
    }

    /// Total number of counted pixels.
    pub fn total(&self) -> Count {
        self.bins.iter().sum()
    }

    /// Per-bin share of the total. A zero-total histogram is returned unscaled.
    pub fn proportions(&self) -> [f64; BINS] {
        let total = self.total();
        let mut shares = [0.0; BINS];
        for (share, &count) in shares.iter_mut().zip(self.bins.iter()) {
            *share = if total == 0 {
                count as f64
            } else {
                count as f64 / total as f64
            };
        }
        shares
    }

    fn record(&mut self, bin: usize) {
        self.bins[bin] += 1;
    }
}

/// Intensity and color-code proportions of one image, concatenated.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedHistogram {
    values: [f64; COMBINED_BINS],
}

impl CombinedHistogram {
    /// Builds the combined vector, normalizing each half by its own pixel total.
    pub fn from_parts(intensity: &IntensityHistogram, color_code: &ColorCodeHistogram) -> Self {
        let mut values = [0.0; COMBINED_BINS];
        let (intensity_half, color_code_half) = values.split_at_mut(INTENSITY_BINS);
        intensity_half.copy_from_slice(&intensity.proportions());
        color_code_half.copy_from_slice(&color_code.proportions());
        Self { values }
    }

    pub fn from_values(values: [f64; COMBINED_BINS]) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[f64; COMBINED_BINS] {
        &self.values
    }
}

/// The three histogram variants of a single image.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSet {
    pub intensity: IntensityHistogram,
    pub color_code: ColorCodeHistogram,
    pub combined: CombinedHistogram,
}

impl HistogramSet {
    /// Extracts all three variants with a single RGB conversion and a single pass.
    pub fn extract(image: &DynamicImage) -> Result<Self, InvalidImageError> {
        let raster = rgb_raster(image)?;
        let mut intensity = IntensityHistogram::default();
        let mut color_code = ColorCodeHistogram::default();
        for pixel in pixels(&raster) {
            intensity.record(pixel.intensity_bin());
            color_code.record(pixel.color_code_bin());
        }
        let combined = CombinedHistogram::from_parts(&intensity, &color_code);
        Ok(Self {
            intensity,
            color_code,
            combined,
        })
    }

    pub fn pixel_count(&self) -> Count {
        self.intensity.total()
    }
}

pub fn intensity_histogram(image: &DynamicImage) -> Result<IntensityHistogram, InvalidImageError> {
    let raster = rgb_raster(image)?;
    let mut histogram = IntensityHistogram::default();
    for pixel in pixels(&raster) {
        histogram.record(pixel.intensity_bin());
    }
    Ok(histogram)
}

pub fn color_code_histogram(image: &DynamicImage) -> Result<ColorCodeHistogram, InvalidImageError> {
    let raster = rgb_raster(image)?;
    let mut histogram = ColorCodeHistogram::default();
    for pixel in pixels(&raster) {
        histogram.record(pixel.color_code_bin());
    }
    Ok(histogram)
}

pub fn combined_histogram(image: &DynamicImage) -> Result<CombinedHistogram, InvalidImageError> {
    Ok(HistogramSet::extract(image)?.combined)
}

/// Converts any color type to 8-bit RGB, rejecting rasters with no pixels.
fn rgb_raster(image: &DynamicImage) -> Result<RgbImage, InvalidImageError> {
    let raster = image.to_rgb8();
    let (width, height) = raster.dimensions();
    if width == 0 || height == 0 {
        return Err(InvalidImageError::ZeroArea { width, height });
    }
    Ok(raster)
}

fn pixels(raster: &RgbImage) -> impl Iterator<Item = Pixel> + '_ {
    raster.as_raw().chunks_exact(3).map(Pixel::from)
}
