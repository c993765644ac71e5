//! Best-effort background removal for generated images.
//!
//! The subject is assumed to sit inside the image minus a fixed border. Any
//! segmentation failure degrades to the original pixels with an opaque alpha
//! channel; this step never fails.
use image::{DynamicImage, Rgba, RgbaImage};

pub mod segmentation;

pub use segmentation::{GraphCutSegmenter, Label, Rect, SegmentationError, Segmenter};

/// Pixels trimmed from every side to form the seed rectangle.
pub const SEED_BORDER: u32 = 10;

pub fn remove_background(image: &DynamicImage, segmenter: &dyn Segmenter) -> RgbaImage {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();

    let labels = Rect::inset(width, height, SEED_BORDER)
        .ok_or(SegmentationError::EmptyRegion(width, height))
        .and_then(|rect| segmenter.segment(&rgb, rect));

    match labels {
        Ok(labels) if labels.len() == (width as usize) * (height as usize) => {
            RgbaImage::from_fn(width, height, |x, y| {
                let p = rgb.get_pixel(x, y);
                let alpha = if labels[(y * width + x) as usize].is_foreground() { 255 } else { 0 };
                Rgba([p[0], p[1], p[2], alpha])
            })
        }
        Ok(labels) => {
            tracing::warn!(
                "Segmenter returned {} labels for a {}x{} image, keeping opaque alpha",
                labels.len(),
                width,
                height
            );
            opaque(&rgb)
        }
        Err(e) => {
            tracing::warn!("Background removal failed, keeping opaque alpha: {}", e);
            opaque(&rgb)
        }
    }
}

fn opaque(rgb: &image::RgbImage) -> RgbaImage {
    RgbaImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let p = rgb.get_pixel(x, y);
        Rgba([p[0], p[1], p[2], 255])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    struct FailingSegmenter;

    impl Segmenter for FailingSegmenter {
        fn segment(&self, _image: &RgbImage, _rect: Rect) -> Result<Vec<Label>, SegmentationError> {
            Err(SegmentationError::EmptyModel("foreground"))
        }
    }

    struct ShortSegmenter;

    impl Segmenter for ShortSegmenter {
        fn segment(&self, _image: &RgbImage, _rect: Rect) -> Result<Vec<Label>, SegmentationError> {
            Ok(vec![Label::Foreground; 3])
        }
    }

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        }))
    }

    #[test]
    fn forced_failure_falls_back_to_opaque() {
        let input = gradient(48, 36);
        let out = remove_background(&input, &FailingSegmenter);
        assert_eq!(out.dimensions(), (48, 36));
        assert!(out.pixels().all(|p| p[3] == 255));
        assert_eq!(out.get_pixel(7, 5), &Rgba([7, 5, 128, 255]));
    }

    #[test]
    fn wrong_label_count_falls_back_to_opaque() {
        let out = remove_background(&gradient(30, 30), &ShortSegmenter);
        assert!(out.pixels().all(|p| p[3] == 255));
    }

    #[test]
    fn tiny_image_keeps_opaque_alpha() {
        let out = remove_background(&gradient(16, 16), &GraphCutSegmenter::default());
        assert_eq!(out.dimensions(), (16, 16));
        assert!(out.pixels().all(|p| p[3] == 255));
    }

    #[test]
    fn border_becomes_transparent() {
        let input = DynamicImage::ImageRgb8(RgbImage::from_fn(64, 64, |x, y| {
            if (22..42).contains(&x) && (22..42).contains(&y) {
                Rgb([30, 200, 40])
            } else {
                Rgb([250, 250, 250])
            }
        }));
        let out = remove_background(&input, &GraphCutSegmenter::default());
        assert_eq!(out.get_pixel(0, 0)[3], 0);
        assert_eq!(out.get_pixel(63, 63)[3], 0);
        assert_eq!(out.get_pixel(32, 32)[3], 255);
        assert_eq!(out.get_pixel(32, 32)[1], 200);
    }
}
