//! Geometric face normalization.
//!
//! A similarity transform (rotation + uniform scale + translation) maps
//! the detected 5-point landmarks onto canonical reference positions,
//! then a backward-mapping warp produces a fixed-size crop. This is the
//! one place the interleaved u8 image becomes a CHW f32 tensor; every
//! classifier downstream consumes the RGB channel order produced here.

use ndarray::Array3;

use crate::detect::Landmarks;
use crate::scoring::imaging::image_to_chw;

/// Canonical output size fed to the ensemble.
pub const ALIGNED_SIZE: usize = 320;

/// ArcFace reference landmark positions in a 112x112 aligned crop,
/// ordered left eye, right eye, nose tip, left mouth, right mouth.
/// Scaled to the requested output size at alignment time.
const REFERENCE_112: [[f32; 2]; 5] = [
    [38.2946, 51.6963],
    [73.5318, 51.5014],
    [56.0252, 71.7366],
    [41.5493, 92.3655],
    [70.7299, 92.2041],
];

/// 2x3 affine transform `[a, b, tx; c, d, ty]`.
#[derive(Debug, Clone, Copy)]
struct Affine {
    a: f32,
    b: f32,
    tx: f32,
    c: f32,
    d: f32,
    ty: f32,
}

/// Align a face crop to the canonical pose and size.
///
/// Landmark coordinates are pixels in the full input image. Output is a
/// (3, size, size) RGB tensor in [0,1]; regions that map outside the
/// source image are zero-filled.
pub fn align(image: &image::RgbImage, landmarks: &Landmarks, size: usize) -> Array3<f32> {
    let src: [[f32; 2]; 5] = landmarks.0.map(|[x, y]| [x as f32, y as f32]);

    let scale = size as f32 / 112.0;
    let dst: [[f32; 2]; 5] = REFERENCE_112.map(|[x, y]| [x * scale, y * scale]);

    let transform = similarity_transform(&src, &dst);
    let chw = image_to_chw(image);
    warp(&chw, transform, size)
}

/// Estimate the similarity transform mapping `src` landmarks to `dst`.
///
/// Rotation and scale come from the eye-to-eye vector, translation from
/// the eye midpoints. A simplified Umeyama; adequate for the
/// near-frontal faces a detector emits landmarks for.
fn similarity_transform(src: &[[f32; 2]; 5], dst: &[[f32; 2]; 5]) -> Affine {
    let src_dx = src[1][0] - src[0][0];
    let src_dy = src[1][1] - src[0][1];
    let dst_dx = dst[1][0] - dst[0][0];
    let dst_dy = dst[1][1] - dst[0][1];

    let src_eye_dist = (src_dx * src_dx + src_dy * src_dy).sqrt();
    let dst_eye_dist = (dst_dx * dst_dx + dst_dy * dst_dy).sqrt();
    let scale = if src_eye_dist > 1e-6 {
        dst_eye_dist / src_eye_dist
    } else {
        1.0
    };

    let angle = dst_dy.atan2(dst_dx) - src_dy.atan2(src_dx);
    let cos_a = angle.cos() * scale;
    let sin_a = angle.sin() * scale;

    let src_cx = (src[0][0] + src[1][0]) / 2.0;
    let src_cy = (src[0][1] + src[1][1]) / 2.0;
    let dst_cx = (dst[0][0] + dst[1][0]) / 2.0;
    let dst_cy = (dst[0][1] + dst[1][1]) / 2.0;

    Affine {
        a: cos_a,
        b: -sin_a,
        tx: dst_cx - (src_cx * cos_a - src_cy * sin_a),
        c: sin_a,
        d: cos_a,
        ty: dst_cy - (src_cx * sin_a + src_cy * cos_a),
    }
}

/// Backward-mapping warp with bilinear interpolation.
fn warp(src: &Array3<f32>, t: Affine, size: usize) -> Array3<f32> {
    let (channels, src_height, src_width) = src.dim();
    let mut out = Array3::zeros((channels, size, size));

    let det = t.a * t.d - t.b * t.c;
    if det.abs() < 1e-6 {
        // Degenerate landmarks (coincident eyes). Nothing sensible to
        // sample; return the zero crop.
        return out;
    }

    let inv_a = t.d / det;
    let inv_b = -t.b / det;
    let inv_c = -t.c / det;
    let inv_d = t.a / det;
    let inv_tx = (t.b * t.ty - t.d * t.tx) / det;
    let inv_ty = (t.c * t.tx - t.a * t.ty) / det;

    let x_limit = (src_width - 1) as f32;
    let y_limit = (src_height - 1) as f32;

    for dst_y in 0..size {
        let dst_yf = dst_y as f32;
        let row_x = inv_b * dst_yf + inv_tx;
        let row_y = inv_d * dst_yf + inv_ty;

        for dst_x in 0..size {
            let dst_xf = dst_x as f32;
            let src_x = inv_a * dst_xf + row_x;
            let src_y = inv_c * dst_xf + row_y;

            if src_x < 0.0 || src_x >= x_limit || src_y < 0.0 || src_y >= y_limit {
                continue;
            }

            let x0 = src_x as usize;
            let y0 = src_y as usize;
            let dx = src_x - x0 as f32;
            let dy = src_y - y0 as f32;

            for ch in 0..channels {
                let top = src[[ch, y0, x0]] * (1.0 - dx) + src[[ch, y0, x0 + 1]] * dx;
                let bottom = src[[ch, y0 + 1, x0]] * (1.0 - dx) + src[[ch, y0 + 1, x0 + 1]] * dx;
                out[[ch, dst_y, dst_x]] = top * (1.0 - dy) + bottom * dy;
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::Landmarks;

    fn uniform_image(width: u32, height: u32, value: u8) -> image::RgbImage {
        image::RgbImage::from_pixel(width, height, image::Rgb([value, value, value]))
    }

    #[test]
    fn test_align_output_shape_and_range() {
        let img = uniform_image(640, 480, 128);
        // Landmarks roughly centered in the image, frontal geometry.
        let landmarks = Landmarks([
            [280, 200],
            [360, 200],
            [320, 250],
            [290, 300],
            [350, 300],
        ]);

        let face = align(&img, &landmarks, ALIGNED_SIZE);
        assert_eq!(face.dim(), (3, ALIGNED_SIZE, ALIGNED_SIZE));
        for &v in face.iter() {
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn test_align_samples_source_intensity() {
        let img = uniform_image(640, 480, 255);
        let landmarks = Landmarks([
            [280, 200],
            [360, 200],
            [320, 250],
            [290, 300],
            [350, 300],
        ]);

        let face = align(&img, &landmarks, ALIGNED_SIZE);
        // The face region maps well inside a 640x480 source, so the
        // center of the crop must carry the source intensity.
        let center = face[[0, ALIGNED_SIZE / 2, ALIGNED_SIZE / 2]];
        assert!((center - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_identity_transform_from_reference_landmarks() {
        // Landmarks already at the scaled reference positions produce a
        // near-identity transform.
        let scale = ALIGNED_SIZE as f32 / 112.0;
        let src: [[f32; 2]; 5] = REFERENCE_112.map(|[x, y]| [x * scale, y * scale]);
        let t = similarity_transform(&src, &src);
        assert!((t.a - 1.0).abs() < 1e-4);
        assert!(t.b.abs() < 1e-4);
        assert!(t.tx.abs() < 1e-2);
        assert!(t.ty.abs() < 1e-2);
    }

    #[test]
    fn test_out_of_source_region_zero_filled() {
        // Eyes near the top-left corner of a small source: part of the
        // canonical crop maps outside the image and must stay zero.
        let img = uniform_image(60, 60, 255);
        let landmarks = Landmarks([[5, 5], [15, 5], [10, 12], [6, 18], [14, 18]]);

        let face = align(&img, &landmarks, 64);
        assert!(face.iter().any(|&v| v == 0.0));
        assert!(face.iter().any(|&v| v > 0.9));
    }
}
