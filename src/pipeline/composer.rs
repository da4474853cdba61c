// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 帧拼接: 叠加后的原始帧 | 趋势图

use fast_image_resize as fr;
use image::{imageops, DynamicImage, RgbImage};
use tracing::debug;

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameComposer {
    plot_width: u32,
}

impl FrameComposer {
    pub fn new(plot_width: u32) -> Self {
        Self { plot_width }
    }

    pub fn plot_width(&self) -> u32 {
        self.plot_width
    }

    /// 输出尺寸 `(frame_w + plot_width, frame_h)`; 宽度溢出时报错
    pub fn output_size(&self, frame_width: u32, frame_height: u32) -> Result<(u32, u32)> {
        let width = frame_width.checked_add(self.plot_width).ok_or_else(|| {
            PipelineError::Format(format!(
                "output width overflows: {} + {}",
                frame_width, self.plot_width
            ))
        })?;
        Ok((width, frame_height))
    }

    /// 横向拼接; 趋势图必须是 8-bit RGB, 尺寸不符时先缩放
    pub fn compose(&self, frame: &RgbImage, plot: &DynamicImage) -> Result<RgbImage> {
        let DynamicImage::ImageRgb8(plot) = plot else {
            return Err(PipelineError::Format(format!(
                "plot must be 8-bit RGB, got {:?}",
                plot.color()
            )));
        };

        let (fw, fh) = frame.dimensions();
        let (w, h) = self.output_size(fw, fh)?;
        let target = (self.plot_width, fh);
        let resized;
        let plot = if plot.dimensions() != target {
            debug!(
                "趋势图尺寸 {}x{} → {}x{}",
                plot.width(),
                plot.height(),
                target.0,
                target.1
            );
            resized = resize_rgb(plot, target.0, target.1)?;
            &resized
        } else {
            plot
        };

        let mut out = RgbImage::new(w, h);
        imageops::replace(&mut out, frame, 0, 0);
        imageops::replace(&mut out, plot, fw as i64, 0);
        Ok(out)
    }

    /// 不拼接趋势图时原样输出
    pub fn passthrough(&self, frame: RgbImage) -> RgbImage {
        frame
    }
}

/// fast_image_resize 双线性缩放
fn resize_rgb(src: &RgbImage, width: u32, height: u32) -> Result<RgbImage> {
    if width == 0 || height == 0 || src.width() == 0 || src.height() == 0 {
        return Err(PipelineError::Format(format!(
            "cannot resize {}x{} to {}x{}",
            src.width(),
            src.height(),
            width,
            height
        )));
    }

    let src_image = fr::images::Image::from_vec_u8(
        src.width(),
        src.height(),
        src.as_raw().clone(),
        fr::PixelType::U8x3,
    )
    .map_err(|e| PipelineError::Format(e.to_string()))?;
    let mut dst_image = fr::images::Image::new(width, height, fr::PixelType::U8x3);

    let mut resizer = fr::Resizer::new();
    resizer
        .resize(
            &src_image,
            &mut dst_image,
            &fr::ResizeOptions::new()
                .resize_alg(fr::ResizeAlg::Convolution(fr::FilterType::Bilinear)),
        )
        .map_err(|e| PipelineError::Format(e.to_string()))?;

    RgbImage::from_raw(width, height, dst_image.into_vec())
        .ok_or_else(|| PipelineError::Format("resized buffer has wrong length".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbaImage};

    #[test]
    fn test_compose_side_by_side() {
        let frame = RgbImage::from_pixel(100, 100, Rgb([255, 0, 0]));
        let plot = DynamicImage::ImageRgb8(RgbImage::from_pixel(300, 100, Rgb([0, 0, 255])));
        let out = FrameComposer::new(300).compose(&frame, &plot).unwrap();

        assert_eq!(out.dimensions(), (400, 100));
        assert_eq!(*out.get_pixel(99, 50), Rgb([255, 0, 0]));
        assert_eq!(*out.get_pixel(100, 50), Rgb([0, 0, 255]));
    }

    #[test]
    fn test_compose_resizes_plot() {
        let frame = RgbImage::new(100, 100);
        let plot = DynamicImage::ImageRgb8(RgbImage::from_pixel(250, 90, Rgb([0, 200, 0])));
        let out = FrameComposer::new(300).compose(&frame, &plot).unwrap();

        assert_eq!(out.dimensions(), (400, 100));
        let [r, g, b] = out.get_pixel(250, 50).0;
        assert!(r <= 2 && (198..=202).contains(&g) && b <= 2);
    }

    #[test]
    fn test_compose_rejects_rgba_plot() {
        let frame = RgbImage::new(100, 100);
        let plot = DynamicImage::ImageRgba8(RgbaImage::new(300, 100));
        assert!(matches!(
            FrameComposer::new(300).compose(&frame, &plot),
            Err(PipelineError::Format(_))
        ));
    }

    #[test]
    fn test_output_width_overflow() {
        let composer = FrameComposer::new(u32::MAX);
        assert_eq!(FrameComposer::new(300).output_size(100, 50).unwrap(), (400, 50));
        assert!(matches!(
            composer.output_size(100, 50),
            Err(PipelineError::Format(_))
        ));

        let frame = RgbImage::new(2, 2);
        let plot = DynamicImage::ImageRgb8(RgbImage::new(2, 2));
        assert!(matches!(
            composer.compose(&frame, &plot),
            Err(PipelineError::Format(_))
        ));
    }

    #[test]
    fn test_passthrough() {
        let frame = RgbImage::from_pixel(64, 48, Rgb([1, 2, 3]));
        let out = FrameComposer::new(300).passthrough(frame.clone());
        assert_eq!(out, frame);
    }
}
