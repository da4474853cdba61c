/// 姿态模型统一接口与实现
///
/// # 架构说明
///
/// ## LandmarkExtractor Trait
/// 流水线只依赖这个接口: 一帧RGB图像 → 可选的关键点集合
/// - `Ok(Some(..))`: 检测到人体
/// - `Ok(None)`:     画面中没有人 (不是错误, 流水线继续)
/// - `Err(..)`:      输入本身有问题 (空帧、张量形状不符、推理失败)
///
/// ## 具体实现
/// - **YOLOv8Pose**: ONNX Runtime 推理 + 后处理, 文件: `yolov8_pose.rs`
///
/// ## 使用示例
/// ```no_run
/// use pose_trend_rs::models::{LandmarkExtractor, YOLOv8Pose};
/// use pose_trend_rs::PipelineConfig;
///
/// let mut model = YOLOv8Pose::new("models/yolov8n-pose.onnx".as_ref(), &PipelineConfig::default())?;
/// let frame = image::RgbImage::new(640, 480);
/// let landmarks = model.extract(&frame)?;
/// # Ok::<(), anyhow::Error>(())
/// ```
use image::RgbImage;

use crate::detection::LandmarkSet;
use crate::error::Result;

/// 关键点提取器
pub trait LandmarkExtractor {
    /// 单帧关键点提取 (RGB通道顺序)
    fn extract(&mut self, frame: &RgbImage) -> Result<Option<LandmarkSet>>;

    /// 模型名称 (日志用)
    fn name(&self) -> &str {
        "landmark-extractor"
    }
}

impl<T: LandmarkExtractor + ?Sized> LandmarkExtractor for Box<T> {
    fn extract(&mut self, frame: &RgbImage) -> Result<Option<LandmarkSet>> {
        (**self).extract(frame)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

pub mod yolov8_pose; // YOLOv8-Pose 完整模型 (ONNX Runtime)

// Re-exports
pub use yolov8_pose::{decode_pose, Letterbox, YOLOv8Pose};
