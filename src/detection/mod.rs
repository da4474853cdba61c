/// 关键点系统 (Landmark System)
///
/// 姿态模型与骨架绘制共用的关键点定义
/// - Landmark:    COCO-17 关键点枚举
/// - LandmarkSet: 单帧一个人的全部关键点 (归一化坐标)
/// - SKELETON:    骨架连接图
pub mod types;

pub use types::{Keypoint, Landmark, LandmarkSet, KEYPOINT_COUNT, SKELETON};
