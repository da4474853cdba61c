// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// YOLOv8-Pose 完整模型实现
// 包含: 模型加载、预处理(letterbox)、推理、后处理(取最可信的人)

use std::path::Path;

use anyhow::Context;
use image::{imageops::FilterType, RgbImage};
use ndarray::{Array4, ArrayViewD};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::detection::{Keypoint, LandmarkSet, KEYPOINT_COUNT};
use crate::error::{PipelineError, Result};

use super::LandmarkExtractor;

/// Ultralytics 导出的输入/输出张量名称
const INPUT_NAME: &str = "images";
const OUTPUT_NAME: &str = "output0";

const CXYWH_OFFSET: usize = 4;
const KPT_STEP: usize = 3;
/// 每个候选: cx cy w h score + 17 * (x y conf)
const ROW_LEN: usize = CXYWH_OFFSET + 1 + KEYPOINT_COUNT * KPT_STEP;

/// letterbox 缩放参数 (图像贴在左上角, 其余填充灰色)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub ratio: f32,
    pub width: u32,  // 原图宽
    pub height: u32, // 原图高
}

impl Letterbox {
    pub fn new(width: u32, height: u32, input_size: u32) -> Self {
        let ratio = (input_size as f32 / width as f32).min(input_size as f32 / height as f32);
        Self {
            ratio,
            width,
            height,
        }
    }

    /// 模型坐标 → 归一化坐标
    pub fn normalize(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x / self.ratio / self.width as f32,
            y / self.ratio / self.height as f32,
        )
    }
}

/// YOLOv8-Pose 后处理: 选出分数最高且不低于 `conf` 的人
///
/// 输出张量形状 `[1, 56, N]`; 低于 `kconf` 的关键点保留位置, 可见度置0
pub fn decode_pose(
    output: &ArrayViewD<f32>,
    letterbox: &Letterbox,
    conf: f32,
    kconf: f32,
) -> Result<Option<LandmarkSet>> {
    let shape = output.shape();
    if shape.len() != 3 || shape[0] == 0 || shape[1] != ROW_LEN {
        return Err(PipelineError::Extract(format!(
            "unexpected pose output shape {:?}, expected [1, {}, N]",
            shape, ROW_LEN
        )));
    }

    let anchors = shape[2];
    let best = (0..anchors)
        .map(|i| (i, output[[0, CXYWH_OFFSET, i]]))
        .filter(|(_, score)| *score >= conf)
        .max_by(|a, b| a.1.total_cmp(&b.1));

    let Some((idx, score)) = best else {
        return Ok(None);
    };
    debug!("🧍 人体候选 #{} 置信度 {:.3}", idx, score);

    let mut points = [Keypoint::default(); KEYPOINT_COUNT];
    for (k, point) in points.iter_mut().enumerate() {
        let base = CXYWH_OFFSET + 1 + k * KPT_STEP;
        let (x, y) = letterbox.normalize(output[[0, base, idx]], output[[0, base + 1, idx]]);
        let kpt_conf = output[[0, base + 2, idx]];
        let visibility = if kpt_conf < kconf { 0.0 } else { kpt_conf };
        *point = Keypoint::new(x, y, visibility);
    }
    Ok(Some(LandmarkSet::new(points)))
}

/// YOLOv8-Pose 完整模型结构
pub struct YOLOv8Pose {
    session: Session,
    size: u32,
    conf: f32,
    kconf: f32,
}

impl YOLOv8Pose {
    /// 从ONNX文件创建模型
    pub fn new(model: &Path, config: &PipelineConfig) -> anyhow::Result<Self> {
        if !model.is_file() {
            return Err(PipelineError::Model(format!("{} not found", model.display())).into());
        }
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(model)
            .with_context(|| format!("Failed to load ONNX model {}", model.display()))?;

        info!(
            "🦴 姿态模型: {} (输入 {}x{}, conf {:.2}, kconf {:.2})",
            model.display(),
            config.model_input_size,
            config.model_input_size,
            config.conf_threshold,
            config.keypoint_threshold
        );

        Ok(Self {
            session,
            size: config.model_input_size,
            conf: config.conf_threshold,
            kconf: config.keypoint_threshold,
        })
    }

    /// 预处理: 等比缩放到模型输入, 左上角对齐, 灰色填充, NCHW / 255
    pub fn preprocess(&self, frame: &RgbImage) -> (Array4<f32>, Letterbox) {
        let size = self.size as usize;
        let letterbox = Letterbox::new(frame.width(), frame.height(), self.size);
        let w_new = ((frame.width() as f32 * letterbox.ratio).round() as u32).clamp(1, self.size);
        let h_new = ((frame.height() as f32 * letterbox.ratio).round() as u32).clamp(1, self.size);
        let resized = image::imageops::resize(frame, w_new, h_new, FilterType::Triangle);

        let mut ys = Array4::<f32>::from_elem((1, 3, size, size), 144.0 / 255.0);
        for (x, y, rgb) in resized.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            let [r, g, b] = rgb.0;
            ys[[0, 0, y, x]] = r as f32 / 255.0;
            ys[[0, 1, y, x]] = g as f32 / 255.0;
            ys[[0, 2, y, x]] = b as f32 / 255.0;
        }
        (ys, letterbox)
    }
}

impl LandmarkExtractor for YOLOv8Pose {
    fn extract(&mut self, frame: &RgbImage) -> Result<Option<LandmarkSet>> {
        if frame.width() == 0 || frame.height() == 0 {
            return Err(PipelineError::Extract("empty frame".into()));
        }

        let (xs, letterbox) = self.preprocess(frame);
        let input_tensor =
            Tensor::from_array(xs).map_err(|e| PipelineError::Extract(e.to_string()))?;
        let outputs = self
            .session
            .run(ort::inputs![INPUT_NAME => input_tensor])
            .map_err(|e| PipelineError::Extract(format!("inference failed: {}", e)))?;
        let output: ArrayViewD<f32> = outputs[OUTPUT_NAME]
            .try_extract_array()
            .map_err(|e| PipelineError::Extract(e.to_string()))?;

        decode_pose(&output, &letterbox, self.conf, self.kconf)
    }

    fn name(&self) -> &str {
        "yolov8-pose"
    }
}
