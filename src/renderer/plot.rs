// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 肩部高度趋势图
//!
//! 每帧整体重绘: 坐标轴 + 刻度 + 两条折线 + 图例 + 轴标题

use std::fs;
use std::path::{Path, PathBuf};

use ab_glyph::{FontVec, PxScale};
use image::{imageops, DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{
    draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut, draw_text_mut, text_size,
};
use imageproc::rect::Rect;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::pipeline::TrendSeries;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const GRAY: Rgb<u8> = Rgb([200, 200, 200]);
const RIGHT_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
const LEFT_COLOR: Rgb<u8> = Rgb([0, 128, 0]);

const RIGHT_LABEL: &str = "Right Shoulder Y";
const LEFT_LABEL: &str = "Left Shoulder Y";
const X_LABEL: &str = "Frame Number";
const Y_LABEL: &str = "Normalized Y Coordinate";

/// 画布最小边长; 更小的视频由拼接时缩放吸收
const MIN_CANVAS: u32 = 2;
const TICK_LEN: i32 = 4;
const TICK_FONT: f32 = 10.0;
const LABEL_FONT: f32 = 12.0;

/// 未指定字体时依次尝试
const FONT_CANDIDATES: &[&str] = &[
    "assets/font/msyh.ttc",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// 坐标轴范围
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotBounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl PlotBounds {
    /// x: `0..max(total, current + 10)`, y: `0..1`
    pub fn for_frame(total_frames: u64, current_frame: u64) -> Self {
        Self {
            x_min: 0.0,
            x_max: total_frames.max(current_frame + 10) as f64,
            y_min: 0.0,
            y_max: 1.0,
        }
    }
}

/// 趋势图绘制接口
pub trait TrendPlotter {
    /// 输出 8-bit RGB 图像
    fn plot(&mut self, series: &TrendSeries, bounds: &PlotBounds) -> Result<DynamicImage>;
}

impl<T: TrendPlotter + ?Sized> TrendPlotter for Box<T> {
    fn plot(&mut self, series: &TrendSeries, bounds: &PlotBounds) -> Result<DynamicImage> {
        (**self).plot(series, bounds)
    }
}

/// 绘图区在画布中的位置
#[derive(Debug, Clone, Copy)]
struct Area {
    left: i32,
    top: i32,
    width: i32,
    height: i32,
}

impl Area {
    fn map(&self, bounds: &PlotBounds, x: f64, y: f64) -> (f32, f32) {
        let fx = (x - bounds.x_min) / (bounds.x_max - bounds.x_min).max(f64::EPSILON);
        let fy = (y - bounds.y_min) / (bounds.y_max - bounds.y_min).max(f64::EPSILON);
        (
            self.left as f32 + (fx * (self.width - 1) as f64) as f32,
            self.top as f32 + ((1.0 - fy) * (self.height - 1) as f64) as f32,
        )
    }

    fn bottom(&self) -> i32 {
        self.top + self.height - 1
    }

    fn right(&self) -> i32 {
        self.left + self.width - 1
    }
}

/// imageproc + ab_glyph 光栅化的折线图
pub struct ChartPlotter {
    width: u32,
    height: u32,
    font: Option<FontVec>,
    drawn: u64,
}

impl ChartPlotter {
    /// `font` 为空或加载失败时查找系统字体; 都找不到则只画线条
    pub fn new(width: u32, height: u32, font: Option<&Path>) -> Self {
        let font = load_font(font);
        if font.is_none() {
            warn!("⚠️ 未找到可用字体, 趋势图将不绘制文字");
        }
        Self {
            width: width.max(MIN_CANVAS),
            height: height.max(MIN_CANVAS),
            font,
            drawn: 0,
        }
    }

    /// 不带文字的绘图器
    pub fn without_text(width: u32, height: u32) -> Self {
        Self {
            width: width.max(MIN_CANVAS),
            height: height.max(MIN_CANVAS),
            font: None,
            drawn: 0,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    fn text_extent(&self, scale: f32, text: &str) -> (i32, i32) {
        match &self.font {
            Some(font) => {
                let (w, h) = text_size(PxScale::from(scale), font, text);
                (w as i32, h as i32)
            }
            None => (0, 0),
        }
    }

    fn text(&self, canvas: &mut RgbImage, x: i32, y: i32, scale: f32, text: &str) {
        if let Some(font) = &self.font {
            draw_text_mut(canvas, BLACK, x, y, PxScale::from(scale), font, text);
        }
    }

    fn layout(&self) -> Area {
        let (w, h) = (self.width as i32, self.height as i32);
        let (left, bottom) = if self.font.is_some() {
            (46, 32)
        } else {
            (10, 10)
        };
        let (top, right) = (8, 8);
        Area {
            left: left.min(w / 2),
            top: top.min(h / 4),
            width: (w - left - right).max(2).min(w),
            height: (h - top - bottom).max(2).min(h),
        }
    }

    fn draw_axes(&self, canvas: &mut RgbImage, area: &Area, bounds: &PlotBounds) {
        draw_hollow_rect_mut(
            canvas,
            Rect::at(area.left, area.top).of_size(area.width as u32, area.height as u32),
            BLACK,
        );

        // x 刻度
        let step = nice_step(bounds.x_max - bounds.x_min, 5);
        let mut x = (bounds.x_min / step).ceil() * step;
        while x <= bounds.x_max + 1e-9 {
            let (px, py) = area.map(bounds, x, bounds.y_min);
            draw_line_segment_mut(canvas, (px, py), (px, py + TICK_LEN as f32), BLACK);
            let label = format!("{}", x.round() as i64);
            let (tw, _) = self.text_extent(TICK_FONT, &label);
            self.text(
                canvas,
                px as i32 - tw / 2,
                area.bottom() + TICK_LEN + 2,
                TICK_FONT,
                &label,
            );
            x += step;
        }

        // y 刻度 0.0 .. 1.0
        for i in 0..=5 {
            let y = bounds.y_min + (bounds.y_max - bounds.y_min) * i as f64 / 5.0;
            let (px, py) = area.map(bounds, bounds.x_min, y);
            draw_line_segment_mut(canvas, (px - TICK_LEN as f32, py), (px, py), BLACK);
            let label = format!("{:.1}", y);
            let (tw, th) = self.text_extent(TICK_FONT, &label);
            self.text(
                canvas,
                area.left - TICK_LEN - 2 - tw,
                py as i32 - th / 2,
                TICK_FONT,
                &label,
            );
        }
    }

    fn draw_series(
        &self,
        canvas: &mut RgbImage,
        area: &Area,
        bounds: &PlotBounds,
        frames: &[u64],
        values: &[f32],
        color: Rgb<u8>,
    ) {
        let points: Vec<(f32, f32)> = frames
            .iter()
            .zip(values)
            .map(|(&f, &v)| area.map(bounds, f as f64, v as f64))
            .collect();

        match points.as_slice() {
            [] => {}
            [p] => draw_line_segment_mut(canvas, *p, *p, color),
            _ => {
                for pair in points.windows(2) {
                    let (a, b) = (pair[0], pair[1]);
                    draw_line_segment_mut(canvas, a, b, color);
                    draw_line_segment_mut(canvas, (a.0, a.1 + 1.0), (b.0, b.1 + 1.0), color);
                }
            }
        }
    }

    fn draw_legend(&self, canvas: &mut RgbImage, area: &Area) {
        const SWATCH: i32 = 18;
        const PAD: i32 = 5;
        let entries = [(RIGHT_LABEL, RIGHT_COLOR), (LEFT_LABEL, LEFT_COLOR)];

        let text_w = entries
            .iter()
            .map(|(label, _)| self.text_extent(TICK_FONT, label).0)
            .max()
            .unwrap_or(0);
        let row_h = self.text_extent(TICK_FONT, RIGHT_LABEL).1.max(6) + 4;
        let gap = if text_w > 0 { 4 } else { 0 };
        let box_w = PAD + SWATCH + gap + text_w + PAD;
        let box_h = PAD + row_h * entries.len() as i32 + PAD;
        let x0 = area.right() - box_w - 4;
        let y0 = area.top + 4;

        let frame = Rect::at(x0, y0).of_size(box_w as u32, box_h as u32);
        draw_filled_rect_mut(canvas, frame, WHITE);
        draw_hollow_rect_mut(canvas, frame, GRAY);

        for (row, (label, color)) in entries.iter().enumerate() {
            let cy = y0 + PAD + row_h * row as i32 + row_h / 2;
            let (sx, ex) = ((x0 + PAD) as f32, (x0 + PAD + SWATCH) as f32);
            draw_line_segment_mut(canvas, (sx, cy as f32), (ex, cy as f32), *color);
            draw_line_segment_mut(canvas, (sx, cy as f32 + 1.0), (ex, cy as f32 + 1.0), *color);

            let (_, th) = self.text_extent(TICK_FONT, label);
            self.text(canvas, x0 + PAD + SWATCH + gap, cy - th / 2, TICK_FONT, label);
        }
    }

    fn draw_titles(&self, canvas: &mut RgbImage, area: &Area) {
        let Some(font) = &self.font else {
            return;
        };

        let (tw, th) = self.text_extent(LABEL_FONT, X_LABEL);
        let x = area.left + (area.width - tw) / 2;
        let y = self.height as i32 - th - 3;
        self.text(canvas, x, y, LABEL_FONT, X_LABEL);

        // y 轴标题: 先横向画到小图, 再逆时针旋转90度贴到左侧
        let (tw, th) = self.text_extent(LABEL_FONT, Y_LABEL);
        if tw <= 0 || th <= 0 {
            return;
        }
        let mut label = RgbImage::from_pixel(tw as u32 + 2, th as u32 + 2, WHITE);
        draw_text_mut(&mut label, BLACK, 1, 1, PxScale::from(LABEL_FONT), font, Y_LABEL);
        let rotated = imageops::rotate270(&label);
        let y = area.top + (area.height - rotated.height() as i32) / 2;
        imageops::overlay(canvas, &rotated, 2, y as i64);
    }
}

impl TrendPlotter for ChartPlotter {
    fn plot(&mut self, series: &TrendSeries, bounds: &PlotBounds) -> Result<DynamicImage> {
        if !(bounds.x_max > bounds.x_min) || !(bounds.y_max > bounds.y_min) {
            return Err(PipelineError::Plot(format!("empty axis range {:?}", bounds)));
        }

        let mut canvas = RgbImage::from_pixel(self.width, self.height, WHITE);
        let area = self.layout();

        self.draw_axes(&mut canvas, &area, bounds);
        let frames = series.frame_numbers();
        self.draw_series(&mut canvas, &area, bounds, frames, series.right(), RIGHT_COLOR);
        self.draw_series(&mut canvas, &area, bounds, frames, series.left(), LEFT_COLOR);
        self.draw_legend(&mut canvas, &area);
        self.draw_titles(&mut canvas, &area);

        self.drawn += 1;
        if self.drawn % 100 == 0 {
            debug!("📈 趋势图已绘制 {} 次 ({} 个采样点)", self.drawn, series.len());
        }
        Ok(DynamicImage::ImageRgb8(canvas))
    }
}

fn load_font(configured: Option<&Path>) -> Option<FontVec> {
    if let Some(path) = configured {
        match read_font(path) {
            Some(font) => return Some(font),
            None => warn!("⚠️ 字体加载失败: {}, 尝试系统字体", path.display()),
        }
    }
    FONT_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .find_map(|path| read_font(&path))
}

fn read_font(path: &Path) -> Option<FontVec> {
    let data = fs::read(path).ok()?;
    match FontVec::try_from_vec(data) {
        Ok(font) => {
            info!("🔤 趋势图字体: {}", path.display());
            Some(font)
        }
        Err(e) => {
            debug!("字体无效 {}: {}", path.display(), e);
            None
        }
    }
}

/// 1/2/5 × 10^n 的刻度间隔, 不小于1 (帧号是整数)
fn nice_step(range: f64, target: usize) -> f64 {
    if !(range > 0.0) {
        return 1.0;
    }
    let raw = range / target.max(1) as f64;
    let mag = 10f64.powf(raw.log10().floor());
    let norm = raw / mag;
    let step = if norm <= 1.0 {
        1.0
    } else if norm <= 2.0 {
        2.0
    } else if norm <= 5.0 {
        5.0
    } else {
        10.0
    };
    (step * mag).max(1.0)
}
