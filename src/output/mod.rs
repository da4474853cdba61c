/// 视频输出系统 (Video Output System)
///
/// - Encoder: FFmpeg编码, 写到文件或内存缓冲区
/// - Memory:  直接保存拼接后的帧 (测试/预览)
///
/// 第一帧决定输出尺寸, 之后尺寸不一致的帧一律拒绝
pub mod encoder;
pub mod memory;

pub use encoder::VideoEncoder;
pub use memory::MemoryFrameSink;

use std::path::PathBuf;

use image::RgbImage;

use crate::error::{PipelineError, Result};

/// 编码目标
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    File(PathBuf),
    Memory,
}

/// 输出结果
#[derive(Debug, Clone, PartialEq)]
pub enum SinkOutput {
    File(PathBuf),
    Buffer(Vec<u8>),
    Frames(Vec<RgbImage>),
}

impl SinkOutput {
    /// 日志用的简短描述
    pub fn describe(&self) -> String {
        match self {
            SinkOutput::File(path) => path.display().to_string(),
            SinkOutput::Buffer(bytes) => format!("<内存 {} bytes>", bytes.len()),
            SinkOutput::Frames(frames) => format!("<内存 {} 帧>", frames.len()),
        }
    }
}

/// 帧输出
pub trait FrameSink {
    /// 运行开始前告知输出尺寸; 没有帧时也能写出合法的空视频
    fn begin(&mut self, width: u32, height: u32) -> Result<()>;

    fn write_frame(&mut self, frame: &RgbImage) -> Result<()>;

    /// 结束输出; 之后再调用返回空结果
    fn finish(&mut self) -> Result<SinkOutput>;

    fn frames_written(&self) -> u64;
}

impl<T: FrameSink + ?Sized> FrameSink for Box<T> {
    fn begin(&mut self, width: u32, height: u32) -> Result<()> {
        (**self).begin(width, height)
    }

    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        (**self).write_frame(frame)
    }

    fn finish(&mut self) -> Result<SinkOutput> {
        (**self).finish()
    }

    fn frames_written(&self) -> u64 {
        (**self).frames_written()
    }
}

/// 第一帧固定尺寸, 后续帧必须一致
pub(crate) fn check_geometry(fixed: &mut Option<(u32, u32)>, frame: &RgbImage) -> Result<()> {
    fix_geometry(fixed, frame.dimensions())
}

/// 尺寸未定时记录, 已定时比较
pub(crate) fn fix_geometry(fixed: &mut Option<(u32, u32)>, found: (u32, u32)) -> Result<()> {
    match *fixed {
        None => {
            *fixed = Some(found);
            Ok(())
        }
        Some(expected) if expected == found => Ok(()),
        Some(expected) => Err(PipelineError::DimensionMismatch { expected, found }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_fixed_by_first_frame() {
        let mut fixed = None;
        check_geometry(&mut fixed, &RgbImage::new(400, 100)).unwrap();
        check_geometry(&mut fixed, &RgbImage::new(400, 100)).unwrap();
        let err = check_geometry(&mut fixed, &RgbImage::new(100, 100)).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::DimensionMismatch {
                expected: (400, 100),
                found: (100, 100)
            }
        ));
        assert_eq!(fixed, Some((400, 100)));
    }

    #[test]
    fn test_geometry_announced_before_frames() {
        let mut fixed = None;
        fix_geometry(&mut fixed, (400, 100)).unwrap();
        assert!(check_geometry(&mut fixed, &RgbImage::new(400, 100)).is_ok());
        assert!(matches!(
            fix_geometry(&mut fixed, (300, 100)),
            Err(PipelineError::DimensionMismatch { .. })
        ));
    }
}
