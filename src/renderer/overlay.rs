// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 骨架叠加

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};

use crate::detection::{LandmarkSet, SKELETON};

/// 叠加样式
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayStyle {
    pub line_color: Rgb<u8>,
    pub point_color: Rgb<u8>,
    pub line_thickness: u32,
    pub point_radius: i32,
    pub min_visibility: f32, // 低于该值的关键点及其连线不绘制
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            line_color: Rgb([255, 255, 255]),
            point_color: Rgb([255, 0, 0]),
            line_thickness: 2,
            point_radius: 3,
            min_visibility: 0.5,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OverlayRenderer {
    style: OverlayStyle,
}

impl OverlayRenderer {
    pub fn new(style: OverlayStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &OverlayStyle {
        &self.style
    }

    /// 原地绘制; `landmarks` 为空时帧保持不变
    pub fn draw(&self, frame: &mut RgbImage, landmarks: Option<&LandmarkSet>) {
        let Some(set) = landmarks else {
            return;
        };
        let (w, h) = frame.dimensions();
        let min_vis = self.style.min_visibility;

        for &(a, b) in SKELETON.iter() {
            let (pa, pb) = (set.get(a), set.get(b));
            if pa.visibility() < min_vis || pb.visibility() < min_vis {
                continue;
            }
            let start = pa.to_pixel(w, h);
            let end = pb.to_pixel(w, h);
            self.draw_thick_line(frame, start, end);
        }

        for (_, point) in set.iter() {
            if point.visibility() < min_vis {
                continue;
            }
            let (x, y) = point.to_pixel(w, h);
            draw_filled_circle_mut(
                frame,
                (x.round() as i32, y.round() as i32),
                self.style.point_radius,
                self.style.point_color,
            );
        }
    }

    // imageproc 的线段只有1像素宽, 粗线用平移叠画
    fn draw_thick_line(&self, frame: &mut RgbImage, start: (f32, f32), end: (f32, f32)) {
        let thickness = self.style.line_thickness.max(1) as i32;
        let (dx, dy) = (end.0 - start.0, end.1 - start.1);
        // 沿垂直于主方向的轴平移
        let along_y = dx.abs() >= dy.abs();
        for i in 0..thickness {
            let offset = (i - thickness / 2) as f32;
            let (ox, oy) = if along_y { (0.0, offset) } else { (offset, 0.0) };
            draw_line_segment_mut(
                frame,
                (start.0 + ox, start.1 + oy),
                (end.0 + ox, end.1 + oy),
                self.style.line_color,
            );
        }
    }
}
