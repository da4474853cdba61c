/// 内存帧来源
/// In-memory frame source
use std::collections::VecDeque;

use image::RgbImage;

use super::{FrameSource, VideoFrame, VideoInfo};
use crate::error::{PipelineError, Result};

/// 已解码帧序列, 按顺序逐帧输出
pub struct MemorySource {
    info: VideoInfo,
    frames: VecDeque<RgbImage>,
    emitted: u64,
}

impl MemorySource {
    /// 所有帧必须同尺寸; 空序列按给定尺寸构造
    pub fn new(frames: Vec<RgbImage>, fps: f64) -> Result<Self> {
        let (width, height) = frames.first().map(|f| f.dimensions()).unwrap_or((0, 0));
        if let Some(bad) = frames.iter().find(|f| f.dimensions() != (width, height)) {
            return Err(PipelineError::open(
                "memory",
                format!(
                    "frame size {}x{} differs from first frame {}x{}",
                    bad.width(),
                    bad.height(),
                    width,
                    height
                ),
            ));
        }
        Ok(Self {
            info: VideoInfo {
                width,
                height,
                fps,
                total_frames: frames.len() as u64,
            },
            frames: frames.into(),
            emitted: 0,
        })
    }

    pub fn empty(width: u32, height: u32, fps: f64) -> Self {
        Self {
            info: VideoInfo {
                width,
                height,
                fps,
                total_frames: 0,
            },
            frames: VecDeque::new(),
            emitted: 0,
        }
    }
}

impl FrameSource for MemorySource {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn next_frame(&mut self) -> Result<Option<VideoFrame>> {
        Ok(self.frames.pop_front().map(|image| {
            self.emitted += 1;
            VideoFrame {
                number: self.emitted,
                image,
            }
        }))
    }

    fn close(&mut self) {
        self.frames.clear();
    }
}
