//! Filter bank — pure, deterministic 8-bit RGB transforms.
//!
//! Every filter takes a non-empty region and returns a new image of the same
//! dimensions. Intermediate float math is rounded and saturated back into
//! `0..=255`. Zero-area regions are rejected by callers (see [`crate::region`]).

use crate::types::FilterName;
use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};

// --- Named constants (no magic numbers) ---
const DEFAULT_BLUR_KERNEL: u32 = 15;
const DEFAULT_SMOOTH_KERNEL: u32 = 15;
const DEFAULT_HUE_DELTA: i32 = 50;
const DEFAULT_BRIGHTNESS_ALPHA: f32 = 1.5;
const DEFAULT_BRIGHTNESS_BETA: f32 = 50.0;
const DEFAULT_PIXELATE_BLOCK: u32 = 10;
const DEFAULT_THRESHOLD: u8 = 127;

/// Hue circle used for tonal shifts (OpenCV 8-bit HSV convention: 2° per step).
pub const HUE_PERIOD: i32 = 180;

/// Neutral position of the brightness slider (scale factor 1.0).
pub const NEUTRAL_BRIGHTNESS: u8 = 50;
pub const MAX_BRIGHTNESS: u8 = 100;
pub const MAX_BLUR: u8 = 20;

/// Numeric parameters bound to each filter; constant for a session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterParams {
    /// Gaussian kernel size (even values are bumped to the next odd size).
    pub blur_kernel: u32,
    /// Box-mean kernel size for `Smooth`.
    pub smooth_kernel: u32,
    /// Hue rotation in steps of the 180-step hue circle.
    pub hue_delta: i32,
    pub brightness_alpha: f32,
    pub brightness_beta: f32,
    pub pixelate_block: u32,
    /// Luminance cut for `Threshold`.
    pub threshold: u8,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            blur_kernel: DEFAULT_BLUR_KERNEL,
            smooth_kernel: DEFAULT_SMOOTH_KERNEL,
            hue_delta: DEFAULT_HUE_DELTA,
            brightness_alpha: DEFAULT_BRIGHTNESS_ALPHA,
            brightness_beta: DEFAULT_BRIGHTNESS_BETA,
            pixelate_block: DEFAULT_PIXELATE_BLOCK,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Apply `filter` to `region`, returning a new image of identical size.
///
/// `FilterName::None` is the identity and returns an exact copy.
pub fn apply(region: &RgbImage, filter: FilterName, params: &FilterParams) -> RgbImage {
    match filter {
        FilterName::None => region.clone(),
        FilterName::GaussianBlur => gaussian_blur(region, params.blur_kernel),
        FilterName::Smooth => box_blur(region, params.smooth_kernel),
        FilterName::Sobel => sobel(region),
        FilterName::Laplacian => laplacian(region),
        FilterName::TonalShift => tonal_shift(region, params.hue_delta),
        FilterName::Brightness => {
            scale_brightness(region, params.brightness_alpha, params.brightness_beta)
        }
        FilterName::Invert => {
            let mut out = region.clone();
            image::imageops::invert(&mut out);
            out
        }
        FilterName::Pixelate => pixelate(region, params.pixelate_block),
        FilterName::Threshold => threshold_inverted(region, params.threshold),
    }
}

/// Round a requested kernel size up to the nearest odd size ≥ 1.
pub fn odd_kernel(size: u32) -> usize {
    let size = size.max(1) as usize;
    if size % 2 == 0 {
        size + 1
    } else {
        size
    }
}

/// Normalized 1-D Gaussian weights; sigma follows the OpenCV default for a given size.
fn gaussian_kernel(size: u32) -> Vec<f32> {
    let size = odd_kernel(size);
    let sigma = 0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let radius = (size / 2) as f32;
    let two_sigma_sq = 2.0 * sigma * sigma;
    let mut weights: Vec<f32> = (0..size)
        .map(|i| {
            let d = i as f32 - radius;
            (-(d * d) / two_sigma_sq).exp()
        })
        .collect();
    let sum: f32 = weights.iter().sum();
    for w in weights.iter_mut() {
        *w /= sum;
    }
    weights
}

/// Isotropic Gaussian smoothing.
pub fn gaussian_blur(region: &RgbImage, kernel_size: u32) -> RgbImage {
    separable_filter(region, &gaussian_kernel(kernel_size))
}

/// Normalized box (mean) filter.
pub fn box_blur(region: &RgbImage, kernel_size: u32) -> RgbImage {
    let size = odd_kernel(kernel_size);
    separable_filter(region, &vec![1.0 / size as f32; size])
}

/// Convolve rows then columns with the same odd-length kernel. Borders replicate
/// the edge pixel.
fn separable_filter(region: &RgbImage, kernel: &[f32]) -> RgbImage {
    let w = region.width() as usize;
    let h = region.height() as usize;
    if w == 0 || h == 0 {
        return region.clone();
    }
    let radius = (kernel.len() / 2) as isize;
    let src = region.as_raw();

    let mut horizontal = vec![0.0f32; w * h * 3];
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0.0f32; 3];
            for (k, weight) in kernel.iter().enumerate() {
                let sx = (x as isize + k as isize - radius).clamp(0, w as isize - 1) as usize;
                let idx = (y * w + sx) * 3;
                for c in 0..3 {
                    acc[c] += src[idx + c] as f32 * weight;
                }
            }
            horizontal[(y * w + x) * 3..(y * w + x) * 3 + 3].copy_from_slice(&acc);
        }
    }

    let mut out = vec![0u8; w * h * 3];
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0.0f32; 3];
            for (k, weight) in kernel.iter().enumerate() {
                let sy = (y as isize + k as isize - radius).clamp(0, h as isize - 1) as usize;
                let idx = (sy * w + x) * 3;
                for c in 0..3 {
                    acc[c] += horizontal[idx + c] * weight;
                }
            }
            let idx = (y * w + x) * 3;
            for c in 0..3 {
                out[idx + c] = saturate(acc[c]);
            }
        }
    }

    from_raw_rgb(region.width(), region.height(), out)
}

/// 3×3 Sobel gradients on luminance, merged as `(gray, |gy|, |gx|)` in RGB order.
pub fn sobel(region: &RgbImage) -> RgbImage {
    let gray = image::imageops::grayscale(region);
    let (w, h) = gray.dimensions();
    let mut out = RgbImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let p = |dx: i32, dy: i32| sample_clamped(&gray, x as i32 + dx, y as i32 + dy);
            let gx =
                (p(1, -1) + 2.0 * p(1, 0) + p(1, 1)) - (p(-1, -1) + 2.0 * p(-1, 0) + p(-1, 1));
            let gy =
                (p(-1, 1) + 2.0 * p(0, 1) + p(1, 1)) - (p(-1, -1) + 2.0 * p(0, -1) + p(1, -1));
            let g = gray.get_pixel(x, y).0[0];
            out.put_pixel(x, y, image::Rgb([g, saturate(gy.abs()), saturate(gx.abs())]));
        }
    }
    out
}

/// 4-neighbour Laplacian magnitude on luminance, replicated across channels.
pub fn laplacian(region: &RgbImage) -> RgbImage {
    let gray = image::imageops::grayscale(region);
    let (w, h) = gray.dimensions();
    let mut out = RgbImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let p = |dx: i32, dy: i32| sample_clamped(&gray, x as i32 + dx, y as i32 + dy);
            let l = p(0, -1) + p(-1, 0) + p(1, 0) + p(0, 1) - 4.0 * p(0, 0);
            let v = saturate(l.abs());
            out.put_pixel(x, y, image::Rgb([v, v, v]));
        }
    }
    out
}

fn sample_clamped(gray: &GrayImage, x: i32, y: i32) -> f32 {
    let x = x.clamp(0, gray.width() as i32 - 1) as u32;
    let y = y.clamp(0, gray.height() as i32 - 1) as u32;
    gray.get_pixel(x, y).0[0] as f32
}

/// Rotate hue by `delta` steps of the 180-step circle, wrapping modulo the period.
pub fn tonal_shift(region: &RgbImage, delta: i32) -> RgbImage {
    let delta = delta.rem_euclid(HUE_PERIOD);
    let mut out = region.clone();
    for px in out.pixels_mut() {
        let [r, g, b] = px.0;
        let (h, s, v) = rgb_to_hsv(r, g, b);
        let h = (h + delta) % HUE_PERIOD;
        px.0 = hsv_to_rgb(h, s, v);
    }
    out
}

/// RGB → (hue in 0..180, saturation in [0,1], value in 0..=255).
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (i32, f32, f32) {
    let (r, g, b) = (r as f32, g as f32, b as f32);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;
    let s = if max > 0.0 { delta / max } else { 0.0 };
    let mut h_deg = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (g - b) / delta
    } else if max == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    if h_deg < 0.0 {
        h_deg += 360.0;
    }
    let h = ((h_deg / 2.0).round() as i32).rem_euclid(HUE_PERIOD);
    (h, s, max)
}

fn hsv_to_rgb(h: i32, s: f32, v: f32) -> [u8; 3] {
    let h_deg = (h * 2) as f32;
    let c = v * s;
    let sector = h_deg / 60.0;
    let x = c * (1.0 - ((sector % 2.0) - 1.0).abs());
    let m = v - c;
    let (r, g, b) = match sector as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    [saturate(r + m), saturate(g + m), saturate(b + m)]
}

/// `saturate(alpha * v + beta)` per channel.
pub fn scale_brightness(region: &RgbImage, alpha: f32, beta: f32) -> RgbImage {
    let mut out = region.clone();
    for px in out.pixels_mut() {
        for c in px.0.iter_mut() {
            *c = saturate(alpha * *c as f32 + beta);
        }
    }
    out
}

/// Average each `block × block` cell (anchored at the region origin) and fill it
/// with its mean. A second pass with the same block size is a no-op.
pub fn pixelate(region: &RgbImage, block: u32) -> RgbImage {
    let block = block.max(1);
    let (w, h) = region.dimensions();
    let mut out = region.clone();

    for by in (0..h).step_by(block as usize) {
        for bx in (0..w).step_by(block as usize) {
            let x_end = (bx + block).min(w);
            let y_end = (by + block).min(h);
            let count = ((x_end - bx) * (y_end - by)) as u64;

            let mut sum = [0u64; 3];
            for y in by..y_end {
                for x in bx..x_end {
                    let p = region.get_pixel(x, y).0;
                    for c in 0..3 {
                        sum[c] += p[c] as u64;
                    }
                }
            }
            let mean = sum.map(|s| ((s + count / 2) / count) as u8);

            for y in by..y_end {
                for x in bx..x_end {
                    out.put_pixel(x, y, image::Rgb(mean));
                }
            }
        }
    }
    out
}

/// Binary cut at `threshold` on luminance, then inverted: bright → black, dark → white.
pub fn threshold_inverted(region: &RgbImage, threshold: u8) -> RgbImage {
    let gray = image::imageops::grayscale(region);
    let mut out = RgbImage::new(region.width(), region.height());
    for (x, y, px) in out.enumerate_pixels_mut() {
        let v = if gray.get_pixel(x, y).0[0] > threshold { 0 } else { 255 };
        px.0 = [v, v, v];
    }
    out
}

/// Round and clamp into the 8-bit range.
fn saturate(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

fn from_raw_rgb(width: u32, height: u32, data: Vec<u8>) -> RgbImage {
    // Length is always width * height * 3 by construction.
    RgbImage::from_raw(width, height, data).unwrap_or_else(|| RgbImage::new(width, height))
}

/// Slider-driven adjustments (brightness, blur, hue), snapshotted once per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Adjustments {
    /// 0..=100; 50 leaves brightness unchanged.
    pub brightness: u8,
    /// 0..=20; Gaussian kernel `2 * blur + 1` when non-zero.
    pub blur: u8,
    /// 0..180 hue steps.
    pub hue: u8,
}

impl Default for Adjustments {
    fn default() -> Self {
        Self {
            brightness: NEUTRAL_BRIGHTNESS,
            blur: 0,
            hue: 0,
        }
    }
}

impl Adjustments {
    /// Build adjustments, clamping each slider into its bounded range.
    pub fn new(brightness: u8, blur: u8, hue: u8) -> Self {
        Self {
            brightness: brightness.min(MAX_BRIGHTNESS),
            blur: blur.min(MAX_BLUR),
            hue: hue % HUE_PERIOD as u8,
        }
    }

    /// True when every slider sits at its neutral position.
    pub fn is_neutral(&self) -> bool {
        self.brightness == NEUTRAL_BRIGHTNESS && self.blur == 0 && self.hue == 0
    }

    /// Brightness scale, then optional blur, then hue rotation.
    pub fn apply(&self, region: &RgbImage) -> RgbImage {
        let mut out =
            scale_brightness(region, self.brightness as f32 / NEUTRAL_BRIGHTNESS as f32, 0.0);
        if self.blur > 0 {
            out = gaussian_blur(&out, self.blur as u32 * 2 + 1);
        }
        if self.hue > 0 {
            out = tonal_shift(&out, self.hue as i32);
        }
        out
    }
}
