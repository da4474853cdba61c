/// 视频编码器
/// Video encoder (ez-ffmpeg): raw rgb24 frames → mp4
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender};
use ez_ffmpeg::{FfmpegContext, Input, Output};
use image::RgbImage;
use tracing::{debug, info, warn};

use super::{check_geometry, fix_geometry, FrameSink, OutputTarget, SinkOutput};
use crate::error::{PipelineError, Result};

/// 编码通道容量 (帧)
const FRAME_QUEUE: usize = 4;
/// 编码线程长时间不取帧视为卡死
const SEND_TIMEOUT: Duration = Duration::from_secs(30);
/// FFERRTAG('E','O','F',' ')
const AVERROR_EOF: i32 = -0x2046_4F45;

type EncodeJob = Box<dyn FnOnce() -> std::result::Result<(), String>>;

/// FFmpeg编码输出
///
/// `begin` 或第一帧到达时启动编码任务 (此时才知道输出尺寸);
/// 帧通过有界通道交给 rawvideo 读回调, 编码顺序与写入顺序一致
pub struct VideoEncoder {
    target: OutputTarget,
    fps: f64,
    codec: String,
    geometry: Option<(u32, u32)>,
    tx: Option<Sender<Vec<u8>>>,
    job: Option<EncodeJob>,
    buffer: Arc<Mutex<Vec<u8>>>,
    written: u64,
    finished: bool,
}

impl VideoEncoder {
    pub fn new(target: OutputTarget, fps: f64, codec: impl Into<String>) -> Self {
        let fps = if fps.is_finite() && fps > 0.0 { fps } else { 30.0 };
        Self {
            target,
            fps,
            codec: codec.into(),
            geometry: None,
            tx: None,
            job: None,
            buffer: Arc::new(Mutex::new(Vec::new())),
            written: 0,
            finished: false,
        }
    }

    pub fn target(&self) -> &OutputTarget {
        &self.target
    }

    /// 启动编码任务
    fn start(&mut self, width: u32, height: u32) -> Result<()> {
        let (tx, rx) = bounded::<Vec<u8>>(FRAME_QUEUE);

        let video_size = format!("{}x{}", width, height);
        let framerate = format!("{}", self.fps);
        let input = Input::new_by_read_callback(raw_reader(rx))
            .set_format("rawvideo")
            .set_input_opts(
                [
                    ("video_size", video_size.as_str()),
                    ("pixel_format", "rgb24"),
                    ("framerate", framerate.as_str()),
                ]
                .into(),
            );

        let output = match &self.target {
            OutputTarget::File(path) => Output::new(path.to_string_lossy().to_string()),
            OutputTarget::Memory => {
                let buffer = Arc::clone(&self.buffer);
                // 内存输出无法回写文件头, 用分片 mp4
                Output::new_by_write_callback(move |data: &[u8]| match buffer.lock() {
                    Ok(mut buf) => {
                        buf.extend_from_slice(data);
                        data.len() as i32
                    }
                    Err(_) => -1,
                })
                .set_format("mp4")
                .set_format_opt("movflags", "frag_keyframe+empty_moov")
            }
        }
        .set_video_codec(self.codec.clone());

        let sch = FfmpegContext::builder()
            .input(input)
            .filter_descs(["format=yuv420p"].into())
            .output(output)
            .build()
            .map_err(|e| PipelineError::Write(format!("构建编码器失败: {}", e)))?
            .start()
            .map_err(|e| PipelineError::Write(format!("启动编码器失败: {}", e)))?;

        info!(
            "🎞️ 编码启动: {}x{} | {:.2}fps | {} → {}",
            width,
            height,
            self.fps,
            self.codec,
            match &self.target {
                OutputTarget::File(path) => path.display().to_string(),
                OutputTarget::Memory => "内存".to_string(),
            }
        );

        self.tx = Some(tx);
        self.job = Some(Box::new(move || sch.wait().map_err(|e| e.to_string())));
        Ok(())
    }

    /// 关闭通道并等待编码任务结束
    fn join(&mut self) -> Result<()> {
        self.tx = None;
        match self.job.take() {
            Some(wait) => wait().map_err(|e| PipelineError::Write(format!("编码失败: {}", e))),
            None => Ok(()),
        }
    }
}

/// rawvideo 读回调: 每次从通道取一帧, 按 ffmpeg 要求的块大小切分
fn raw_reader(rx: Receiver<Vec<u8>>) -> impl FnMut(&mut [u8]) -> i32 + Send + 'static {
    let mut pending: Vec<u8> = Vec::new();
    let mut offset = 0usize;
    move |buf: &mut [u8]| {
        if offset >= pending.len() {
            match rx.recv() {
                Ok(frame) => {
                    pending = frame;
                    offset = 0;
                }
                Err(_) => return AVERROR_EOF,
            }
        }
        let n = buf.len().min(pending.len() - offset);
        buf[..n].copy_from_slice(&pending[offset..offset + n]);
        offset += n;
        n as i32
    }
}

impl FrameSink for VideoEncoder {
    /// 提前启动编码任务; 没有帧时也会写出只有文件头的容器
    fn begin(&mut self, width: u32, height: u32) -> Result<()> {
        if self.finished {
            return Err(PipelineError::Write("encoder already finished".into()));
        }
        if width == 0 || height == 0 {
            return Err(PipelineError::Write(format!(
                "invalid output size {}x{}",
                width, height
            )));
        }
        fix_geometry(&mut self.geometry, (width, height))?;
        if self.job.is_none() {
            self.start(width, height)?;
        }
        Ok(())
    }

    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        if self.finished {
            return Err(PipelineError::Write("encoder already finished".into()));
        }
        check_geometry(&mut self.geometry, frame)?;
        if self.job.is_none() {
            let (w, h) = frame.dimensions();
            self.start(w, h)?;
        }

        let Some(tx) = &self.tx else {
            return Err(PipelineError::Write("encoder is not running".into()));
        };
        match tx.send_timeout(frame.as_raw().clone(), SEND_TIMEOUT) {
            Ok(()) => {
                self.written += 1;
                Ok(())
            }
            Err(SendTimeoutError::Timeout(_)) => {
                Err(PipelineError::Write("encoder stopped consuming frames".into()))
            }
            Err(SendTimeoutError::Disconnected(_)) => {
                // 读回调已释放 = 编码任务提前退出, 取出真正的错误
                self.join()?;
                Err(PipelineError::Write("encoder exited early".into()))
            }
        }
    }

    fn finish(&mut self) -> Result<SinkOutput> {
        if self.finished {
            return Ok(match &self.target {
                OutputTarget::File(path) => SinkOutput::File(path.clone()),
                OutputTarget::Memory => SinkOutput::Buffer(Vec::new()),
            });
        }
        self.finished = true;

        if self.job.is_none() {
            // 尺寸未知: 没有可写的容器
            warn!("⚠️ 编码器未启动 (未知输出尺寸), 不生成输出");
        }
        self.join()?;
        debug!("✅ 编码完成: {}帧", self.written);

        match &self.target {
            OutputTarget::File(path) => Ok(SinkOutput::File(path.clone())),
            OutputTarget::Memory => {
                let mut buf = self
                    .buffer
                    .lock()
                    .map_err(|_| PipelineError::Write("output buffer poisoned".into()))?;
                Ok(SinkOutput::Buffer(std::mem::take(&mut *buf)))
            }
        }
    }

    fn frames_written(&self) -> u64 {
        self.written
    }
}

impl Drop for VideoEncoder {
    fn drop(&mut self) {
        if !self.finished && self.job.is_some() {
            warn!("⚠️ 编码未正常结束, 输出可能不完整 ({}帧)", self.written);
            if let Err(e) = self.join() {
                debug!("编码任务结束: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_reader_chunks_frames() {
        let (tx, rx) = bounded(2);
        let mut read = raw_reader(rx);
        tx.send(vec![1, 2, 3, 4, 5]).unwrap();
        drop(tx);

        let mut buf = [0u8; 3];
        assert_eq!(read(&mut buf), 3);
        assert_eq!(buf, [1, 2, 3]);
        assert_eq!(read(&mut buf), 2);
        assert_eq!(&buf[..2], &[4, 5]);
        assert_eq!(read(&mut buf), AVERROR_EOF);
    }

    /// ISO-BMFF 第一个 box 的类型
    fn first_box(bytes: &[u8]) -> &[u8] {
        &bytes[4..8]
    }

    fn gradient(width: u32, height: u32, shift: u8) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, shift])
        })
    }

    #[test]
    fn test_zero_frames_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.mp4");
        let mut encoder = VideoEncoder::new(OutputTarget::File(path.clone()), 25.0, "mpeg4");

        encoder.begin(400, 100).unwrap();
        assert_eq!(encoder.finish().unwrap(), SinkOutput::File(path.clone()));
        assert_eq!(encoder.frames_written(), 0);

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.len() > 8);
        assert_eq!(first_box(&bytes), b"ftyp");
        let info = crate::input::probe(&path).unwrap();
        assert_eq!((info.width, info.height), (400, 100));
    }

    #[test]
    fn test_zero_frames_memory() {
        let mut encoder = VideoEncoder::new(OutputTarget::Memory, 25.0, "mpeg4");
        encoder.begin(400, 100).unwrap();
        let SinkOutput::Buffer(bytes) = encoder.finish().unwrap() else {
            panic!("expected buffer");
        };
        assert!(bytes.len() > 8);
        assert_eq!(first_box(&bytes), b"ftyp");
    }

    #[test]
    fn test_begin_rejects_other_size() {
        let mut encoder = VideoEncoder::new(OutputTarget::Memory, 25.0, "mpeg4");
        encoder.begin(400, 100).unwrap();
        assert!(matches!(
            encoder.write_frame(&gradient(300, 100, 0)),
            Err(PipelineError::DimensionMismatch {
                expected: (400, 100),
                found: (300, 100)
            })
        ));
        encoder.finish().unwrap();
    }

    #[test]
    fn test_encode_to_memory() {
        let mut encoder = VideoEncoder::new(OutputTarget::Memory, 25.0, "mpeg4");
        for i in 0..3u8 {
            encoder.write_frame(&gradient(400, 100, i * 80)).unwrap();
        }
        assert_eq!(encoder.frames_written(), 3);

        let SinkOutput::Buffer(bytes) = encoder.finish().unwrap() else {
            panic!("expected buffer");
        };
        assert!(!bytes.is_empty());
        assert_eq!(first_box(&bytes), b"ftyp");
    }

    #[test]
    fn test_write_after_finish() {
        let mut encoder = VideoEncoder::new(OutputTarget::Memory, 25.0, "mpeg4");
        encoder.finish().unwrap();
        assert!(matches!(
            encoder.write_frame(&RgbImage::new(16, 16)),
            Err(PipelineError::Write(_))
        ));
    }
}
