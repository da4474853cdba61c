/// 内存帧输出
/// In-memory frame sink
use image::RgbImage;

use super::{check_geometry, fix_geometry, FrameSink, SinkOutput};
use crate::error::Result;

/// 按顺序保存每一帧
#[derive(Debug, Default)]
pub struct MemoryFrameSink {
    frames: Vec<RgbImage>,
    geometry: Option<(u32, u32)>,
    written: u64,
}

impl MemoryFrameSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> &[RgbImage] {
        &self.frames
    }

    /// 第一帧确定的输出尺寸
    pub fn geometry(&self) -> Option<(u32, u32)> {
        self.geometry
    }
}

impl FrameSink for MemoryFrameSink {
    fn begin(&mut self, width: u32, height: u32) -> Result<()> {
        fix_geometry(&mut self.geometry, (width, height))
    }

    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        check_geometry(&mut self.geometry, frame)?;
        self.frames.push(frame.clone());
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<SinkOutput> {
        Ok(SinkOutput::Frames(std::mem::take(&mut self.frames)))
    }

    fn frames_written(&self) -> u64 {
        self.written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;

    #[test]
    fn test_memory_sink_keeps_order() {
        let mut sink = MemoryFrameSink::new();
        for v in 0..3u8 {
            let frame = RgbImage::from_pixel(4, 2, image::Rgb([v, v, v]));
            sink.write_frame(&frame).unwrap();
        }
        assert_eq!(sink.frames_written(), 3);

        let SinkOutput::Frames(frames) = sink.finish().unwrap() else {
            panic!("expected frames");
        };
        let firsts: Vec<u8> = frames.iter().map(|f| f.get_pixel(0, 0)[0]).collect();
        assert_eq!(firsts, vec![0, 1, 2]);
    }

    #[test]
    fn test_memory_sink_rejects_resize() {
        let mut sink = MemoryFrameSink::new();
        sink.write_frame(&RgbImage::new(4, 2)).unwrap();
        assert!(matches!(
            sink.write_frame(&RgbImage::new(2, 4)),
            Err(PipelineError::DimensionMismatch { .. })
        ));
        assert_eq!(sink.frames_written(), 1);
    }

    #[test]
    fn test_memory_sink_begin_fixes_geometry() {
        let mut sink = MemoryFrameSink::new();
        sink.begin(8, 4).unwrap();
        assert_eq!(sink.geometry(), Some((8, 4)));
        assert!(matches!(
            sink.write_frame(&RgbImage::new(4, 4)),
            Err(PipelineError::DimensionMismatch {
                expected: (8, 4),
                found: (4, 4)
            })
        ));
    }
}
