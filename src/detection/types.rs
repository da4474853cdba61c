// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 关键点数据结构定义
/// Data structures for pose landmarks
use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};

// ========== 公共常量 ==========

/// COCO-Pose 关键点数量
pub const KEYPOINT_COUNT: usize = 17;

// ========== 枚举类型 ==========

/// COCO-Pose 关键点 (值即模型输出中的下标)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Landmark {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl Landmark {
    pub const ALL: [Landmark; KEYPOINT_COUNT] = [
        Landmark::Nose,
        Landmark::LeftEye,
        Landmark::RightEye,
        Landmark::LeftEar,
        Landmark::RightEar,
        Landmark::LeftShoulder,
        Landmark::RightShoulder,
        Landmark::LeftElbow,
        Landmark::RightElbow,
        Landmark::LeftWrist,
        Landmark::RightWrist,
        Landmark::LeftHip,
        Landmark::RightHip,
        Landmark::LeftKnee,
        Landmark::RightKnee,
        Landmark::LeftAnkle,
        Landmark::RightAnkle,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Landmark::Nose => "NOSE",
            Landmark::LeftEye => "LEFT_EYE",
            Landmark::RightEye => "RIGHT_EYE",
            Landmark::LeftEar => "LEFT_EAR",
            Landmark::RightEar => "RIGHT_EAR",
            Landmark::LeftShoulder => "LEFT_SHOULDER",
            Landmark::RightShoulder => "RIGHT_SHOULDER",
            Landmark::LeftElbow => "LEFT_ELBOW",
            Landmark::RightElbow => "RIGHT_ELBOW",
            Landmark::LeftWrist => "LEFT_WRIST",
            Landmark::RightWrist => "RIGHT_WRIST",
            Landmark::LeftHip => "LEFT_HIP",
            Landmark::RightHip => "RIGHT_HIP",
            Landmark::LeftKnee => "LEFT_KNEE",
            Landmark::RightKnee => "RIGHT_KNEE",
            Landmark::LeftAnkle => "LEFT_ANKLE",
            Landmark::RightAnkle => "RIGHT_ANKLE",
        }
    }
}

/// 骨架连接 (COCO-Pose)
pub const SKELETON: [(Landmark, Landmark); 16] = [
    (Landmark::Nose, Landmark::LeftEye),
    (Landmark::Nose, Landmark::RightEye),
    (Landmark::LeftEye, Landmark::LeftEar),
    (Landmark::RightEye, Landmark::RightEar),
    (Landmark::LeftShoulder, Landmark::RightShoulder),
    (Landmark::LeftShoulder, Landmark::LeftHip),
    (Landmark::RightShoulder, Landmark::RightHip),
    (Landmark::LeftHip, Landmark::RightHip),
    (Landmark::LeftShoulder, Landmark::LeftElbow),
    (Landmark::RightShoulder, Landmark::RightElbow),
    (Landmark::LeftElbow, Landmark::LeftWrist),
    (Landmark::RightElbow, Landmark::RightWrist),
    (Landmark::LeftHip, Landmark::LeftKnee),
    (Landmark::RightHip, Landmark::RightKnee),
    (Landmark::LeftKnee, Landmark::LeftAnkle),
    (Landmark::RightKnee, Landmark::RightAnkle),
];

// ========== 数据结构 ==========

/// 归一化关键点 (x, y, visibility 均在 [0,1])
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Keypoint {
    x: f32,
    y: f32,
    visibility: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32, visibility: f32) -> Self {
        Self {
            x: clamp_unit(x),
            y: clamp_unit(y),
            visibility: clamp_unit(visibility),
        }
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn visibility(&self) -> f32 {
        self.visibility
    }

    /// 反归一化到像素坐标
    pub fn to_pixel(&self, width: u32, height: u32) -> (f32, f32) {
        (self.x * width as f32, self.y * height as f32)
    }
}

fn clamp_unit(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

/// 单帧检测到的一个人的全部关键点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkSet {
    points: [Keypoint; KEYPOINT_COUNT],
}

impl LandmarkSet {
    pub fn new(points: [Keypoint; KEYPOINT_COUNT]) -> Self {
        Self { points }
    }

    pub fn from_slice(points: &[Keypoint]) -> Result<Self> {
        let points: [Keypoint; KEYPOINT_COUNT] = points.try_into().map_err(|_| {
            PipelineError::Extract(format!(
                "expected {} keypoints, got {}",
                KEYPOINT_COUNT,
                points.len()
            ))
        })?;
        Ok(Self { points })
    }

    pub fn get(&self, landmark: Landmark) -> &Keypoint {
        &self.points[landmark.index()]
    }

    pub fn set(&mut self, landmark: Landmark, point: Keypoint) {
        self.points[landmark.index()] = point;
    }

    pub fn points(&self) -> &[Keypoint; KEYPOINT_COUNT] {
        &self.points
    }

    pub fn iter(&self) -> impl Iterator<Item = (Landmark, &Keypoint)> {
        Landmark::ALL.iter().copied().zip(self.points.iter())
    }
}
