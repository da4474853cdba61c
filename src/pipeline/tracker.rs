// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 肩部高度趋势序列

use serde::{Deserialize, Serialize};

use crate::detection::{Landmark, LandmarkSet};

/// 单个采样点 (帧号, 右肩, 左肩)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub frame: u64,
    pub right: f32,
    pub left: f32,
}

/// 右肩/左肩高度 + 帧号, 三个序列等长
///
/// 只有检测到人体的帧才会追加; 数值为 `1 - y`, 画面中越高数值越大
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendSeries {
    frame_numbers: Vec<u64>,
    right: Vec<f32>,
    left: Vec<f32>,
}

impl TrendSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一帧; 没有关键点时不做任何事
    pub fn record(&mut self, frame_number: u64, landmarks: Option<&LandmarkSet>) {
        let Some(set) = landmarks else {
            return;
        };
        self.right.push(1.0 - set.get(Landmark::RightShoulder).y());
        self.left.push(1.0 - set.get(Landmark::LeftShoulder).y());
        self.frame_numbers.push(frame_number);
    }

    pub fn len(&self) -> usize {
        self.frame_numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frame_numbers.is_empty()
    }

    pub fn clear(&mut self) {
        self.frame_numbers.clear();
        self.right.clear();
        self.left.clear();
    }

    pub fn frame_numbers(&self) -> &[u64] {
        &self.frame_numbers
    }

    pub fn right(&self) -> &[f32] {
        &self.right
    }

    pub fn left(&self) -> &[f32] {
        &self.left
    }

    /// 按时间顺序遍历采样点
    pub fn points(&self) -> impl Iterator<Item = TrendPoint> + '_ {
        self.frame_numbers
            .iter()
            .zip(self.right.iter().zip(self.left.iter()))
            .map(|(&frame, (&right, &left))| TrendPoint { frame, right, left })
    }

    pub fn last(&self) -> Option<TrendPoint> {
        self.points().last()
    }
}
