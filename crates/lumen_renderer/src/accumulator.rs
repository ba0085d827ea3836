//! Running radiance sums across samples per pixel.

use lumen_math::{Color, Interval};
use thiserror::Error;

/// Errors raised while committing radiance.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AccumulateError {
    #[error("pixel {pixel} is outside the {len}-pixel image")]
    OutOfBounds { pixel: usize, len: usize },

    #[error("sample buffer holds {found} pixels, image has {expected}")]
    SizeMismatch { expected: usize, found: usize },
}

/// Per-pixel radiance sums plus the number of committed samples.
#[derive(Debug, Clone)]
pub struct FrameAccumulator {
    width: u32,
    height: u32,
    sum: Vec<Color>,
    samples: u32,
}

impl FrameAccumulator {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            sum: vec![Color::ZERO; width as usize * height as usize],
            samples: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of whole samples committed with `add_sample`.
    pub fn sample_count(&self) -> u32 {
        self.samples
    }

    /// Add radiance to one pixel's running sum.
    pub fn accumulate(&mut self, pixel: usize, radiance: Color) -> Result<(), AccumulateError> {
        let len = self.sum.len();
        let slot = self
            .sum
            .get_mut(pixel)
            .ok_or(AccumulateError::OutOfBounds { pixel, len })?;
        *slot += radiance;
        Ok(())
    }

    /// Commit one sample's radiance for every pixel.
    pub fn add_sample(&mut self, buffer: &[Color]) -> Result<(), AccumulateError> {
        if buffer.len() != self.sum.len() {
            return Err(AccumulateError::SizeMismatch {
                expected: self.sum.len(),
                found: buffer.len(),
            });
        }
        for (slot, radiance) in self.sum.iter_mut().zip(buffer) {
            *slot += *radiance;
        }
        self.samples += 1;
        Ok(())
    }

    /// Average radiance of one pixel, before quantization.
    pub fn mean(&self, pixel: usize) -> Option<Color> {
        let sum = *self.sum.get(pixel)?;
        Some(if self.samples > 1 {
            sum / self.samples as f32
        } else {
            sum
        })
    }

    /// Average every pixel and quantize to 8-bit RGB, row-major.
    pub fn finalize(&self) -> Vec<[u8; 3]> {
        let scale = if self.samples > 1 {
            1.0 / self.samples as f32
        } else {
            1.0
        };
        self.sum
            .iter()
            .map(|&sum| {
                let c = sum * scale;
                [quantize(c.x), quantize(c.y), quantize(c.z)]
            })
            .collect()
    }
}

/// Map [0, 1] to [0, 255] with rounding; out-of-range values are clamped.
#[inline]
pub fn quantize(value: f32) -> u8 {
    (Interval::UNIT.clamp(value) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantize() {
        assert_eq!(quantize(0.0), 0);
        assert_eq!(quantize(1.0), 255);
        assert_eq!(quantize(0.5), 128);
        assert_eq!(quantize(-3.0), 0);
        assert_eq!(quantize(42.0), 255);
    }

    #[test]
    fn test_average_over_samples() {
        let mut acc = FrameAccumulator::new(2, 1);
        acc.add_sample(&[Color::splat(0.2), Color::ZERO]).unwrap();
        acc.add_sample(&[Color::splat(0.6), Color::ONE]).unwrap();

        assert_eq!(acc.sample_count(), 2);
        assert!((acc.mean(0).unwrap() - Color::splat(0.4)).length() < 1e-6);
        assert_eq!(acc.finalize(), vec![[102, 102, 102], [128, 128, 128]]);
    }

    #[test]
    fn test_single_sample_is_not_divided() {
        let mut acc = FrameAccumulator::new(1, 1);
        acc.accumulate(0, Color::new(0.25, 2.0, 0.0)).unwrap();
        acc.add_sample(&[Color::new(0.25, 0.0, 0.0)]).unwrap();

        assert_eq!(acc.finalize(), vec![[128, 255, 0]]);
    }

    #[test]
    fn test_out_of_bounds_writes_nothing() {
        let mut acc = FrameAccumulator::new(2, 2);
        assert_eq!(
            acc.accumulate(4, Color::ONE),
            Err(AccumulateError::OutOfBounds { pixel: 4, len: 4 })
        );
        assert!(acc.finalize().iter().all(|p| *p == [0, 0, 0]));
        assert_eq!(acc.mean(4), None);
    }

    #[test]
    fn test_sample_size_mismatch() {
        let mut acc = FrameAccumulator::new(2, 2);
        assert_eq!(
            acc.add_sample(&[Color::ONE]),
            Err(AccumulateError::SizeMismatch { expected: 4, found: 1 })
        );
        assert_eq!(acc.sample_count(), 0);
    }
}
