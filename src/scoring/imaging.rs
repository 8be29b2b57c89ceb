//! CHW tensor primitives for classifier pre-processing.
//!
//! All tensors are `ndarray` arrays in (channel, height, width) layout,
//! RGB channel order, f32 values. The u8 → f32 conversion happens once,
//! at the alignment boundary; everything here stays in f32.

use ndarray::{Array3, Array4, Axis};

/// Convert an interleaved RGB8 image into a (3, H, W) tensor in [0,1].
pub fn image_to_chw(image: &image::RgbImage) -> Array3<f32> {
    let (width, height) = image.dimensions();
    let mut chw = Array3::zeros((3, height as usize, width as usize));

    for y in 0..height as usize {
        for x in 0..width as usize {
            let pixel = image.get_pixel(x as u32, y as u32);
            chw[[0, y, x]] = pixel[0] as f32 / 255.0;
            chw[[1, y, x]] = pixel[1] as f32 / 255.0;
            chw[[2, y, x]] = pixel[2] as f32 / 255.0;
        }
    }

    chw
}

/// Bilinear resize of a CHW tensor.
///
/// Uses half-pixel source mapping: `src = (dst + 0.5) * scale - 0.5`,
/// with source coordinates clamped to the image, matching the resize
/// the classifiers were trained against.
pub fn bilinear_resize(src: &Array3<f32>, out_height: usize, out_width: usize) -> Array3<f32> {
    let (channels, src_height, src_width) = src.dim();
    if src_height == out_height && src_width == out_width {
        return src.clone();
    }

    let scale_y = src_height as f32 / out_height as f32;
    let scale_x = src_width as f32 / out_width as f32;

    let mut out = Array3::zeros((channels, out_height, out_width));

    for dst_y in 0..out_height {
        let src_y = ((dst_y as f32 + 0.5) * scale_y - 0.5).clamp(0.0, (src_height - 1) as f32);
        let y0 = src_y as usize;
        let y1 = (y0 + 1).min(src_height - 1);
        let dy = src_y - y0 as f32;

        for dst_x in 0..out_width {
            let src_x = ((dst_x as f32 + 0.5) * scale_x - 0.5).clamp(0.0, (src_width - 1) as f32);
            let x0 = src_x as usize;
            let x1 = (x0 + 1).min(src_width - 1);
            let dx = src_x - x0 as f32;

            for ch in 0..channels {
                let top = src[[ch, y0, x0]] * (1.0 - dx) + src[[ch, y0, x1]] * dx;
                let bottom = src[[ch, y1, x0]] * (1.0 - dx) + src[[ch, y1, x1]] * dx;
                out[[ch, dst_y, dst_x]] = top * (1.0 - dy) + bottom * dy;
            }
        }
    }

    out
}

/// Per-channel `(x - mean) / std` normalization.
pub fn normalize(src: &Array3<f32>, mean: [f32; 3], std: [f32; 3]) -> Array3<f32> {
    let mut out = src.clone();
    for (ch, mut plane) in out.axis_iter_mut(Axis(0)).enumerate() {
        plane.mapv_inplace(|x| (x - mean[ch]) / std[ch]);
    }
    out
}

/// Wrap a CHW tensor as a batch of one (1, C, H, W).
pub fn to_batch(face: Array3<f32>) -> Array4<f32> {
    face.insert_axis(Axis(0))
}

/// Softmax over a pair of logits.
pub fn softmax2(logits: [f32; 2]) -> [f32; 2] {
    let max = logits[0].max(logits[1]);
    let e0 = (logits[0] - max).exp();
    let e1 = (logits[1] - max).exp();
    let sum = e0 + e1;
    [e0 / sum, e1 / sum]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_to_chw_layout() {
        let mut img = image::RgbImage::new(2, 1);
        img.put_pixel(0, 0, image::Rgb([255, 0, 0]));
        img.put_pixel(1, 0, image::Rgb([0, 0, 255]));

        let chw = image_to_chw(&img);
        assert_eq!(chw.dim(), (3, 1, 2));
        assert!((chw[[0, 0, 0]] - 1.0).abs() < 1e-6);
        assert!((chw[[2, 0, 1]] - 1.0).abs() < 1e-6);
        assert_eq!(chw[[1, 0, 0]], 0.0);
    }

    #[test]
    fn test_resize_identity() {
        let src = Array3::from_shape_fn((3, 4, 4), |(c, y, x)| (c + y + x) as f32);
        let out = bilinear_resize(&src, 4, 4);
        assert_eq!(out, src);
    }

    #[test]
    fn test_resize_constant_image_stays_constant() {
        let src = Array3::from_elem((3, 320, 320), 0.25f32);
        let out = bilinear_resize(&src, 299, 299);
        assert_eq!(out.dim(), (3, 299, 299));
        for &v in out.iter() {
            assert!((v - 0.25).abs() < 1e-6);
        }
    }

    #[test]
    fn test_resize_downscale_averages() {
        // 2x2 -> 1x1 with half-pixel mapping samples the exact center.
        let src = Array3::from_shape_vec((1, 2, 2), vec![0.0, 1.0, 1.0, 0.0]).unwrap();
        let out = bilinear_resize(&src, 1, 1);
        assert!((out[[0, 0, 0]] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_normalize() {
        let src = Array3::from_elem((3, 2, 2), 0.5f32);
        let out = normalize(&src, [0.5, 0.25, 0.0], [1.0, 0.5, 2.0]);
        assert!((out[[0, 0, 0]] - 0.0).abs() < 1e-6);
        assert!((out[[1, 0, 0]] - 0.5).abs() < 1e-6);
        assert!((out[[2, 0, 0]] - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_softmax2() {
        let p = softmax2([0.0, 0.0]);
        assert!((p[0] - 0.5).abs() < 1e-6);
        assert!((p[1] - 0.5).abs() < 1e-6);

        let p = softmax2([-2.0, 3.0]);
        assert!((p[0] + p[1] - 1.0).abs() < 1e-6);
        assert!(p[1] > 0.99);

        // Large logits must not overflow.
        let p = softmax2([1000.0, 999.0]);
        assert!(p[0] > p[1]);
        assert!((p[0] + p[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_to_batch_shape() {
        let face = Array3::<f32>::zeros((3, 320, 320));
        assert_eq!(to_batch(face).dim(), (1, 3, 320, 320));
    }
}
