/// 解码帧转发
/// Forwards decoded rgb24 frames from the FFmpeg thread to the pipeline
use crossbeam_channel::Sender;
use ez_ffmpeg::filter::frame_filter::FrameFilter;
use ez_ffmpeg::filter::frame_filter_context::FrameFilterContext;
use ez_ffmpeg::{AVMediaType, Frame};
use image::RgbImage;
use std::time::Instant;
use tracing::{debug, warn};

use super::VideoFrame;

/// FFmpeg解码过滤器: 视频文件 → RGB帧 → 通道 (保持解码顺序)
///
/// 过滤图已经把像素格式转成 rgb24, 这里只按行拷贝
pub struct DecodeFilter {
    tx: Option<Sender<VideoFrame>>, // uninit 时释放, 接收端据此得知流结束
    decoded: u64, // 已送出的帧数 (即帧号)
    window_start: Instant,
    window_frames: u32,
}

impl DecodeFilter {
    pub fn new(tx: Sender<VideoFrame>) -> Self {
        Self {
            tx: Some(tx),
            decoded: 0,
            window_start: Instant::now(),
            window_frames: 0,
        }
    }

    /// 已送出的帧数
    pub fn decoded(&self) -> u64 {
        self.decoded
    }

    /// 每秒输出一次解码速度
    fn tick(&mut self) {
        self.window_frames += 1;
        let secs = self.window_start.elapsed().as_secs_f64();
        if secs < 1.0 {
            return;
        }
        debug!(
            "📺 解码速度 {:.1}fps | 累计{}帧",
            self.window_frames as f64 / secs,
            self.decoded
        );
        self.window_start = Instant::now();
        self.window_frames = 0;
    }
}

impl FrameFilter for DecodeFilter {
    fn media_type(&self) -> AVMediaType {
        AVMediaType::AVMEDIA_TYPE_VIDEO
    }

    fn init(&mut self, _ctx: &FrameFilterContext) -> Result<(), String> {
        debug!("✅ 解码线程启动");
        Ok(())
    }

    fn filter_frame(
        &mut self,
        frame: Frame,
        _ctx: &FrameFilterContext,
    ) -> Result<Option<Frame>, String> {
        let image = unsafe {
            if frame.as_ptr().is_null() || frame.is_empty() {
                return Ok(Some(frame));
            }

            let w = (*frame.as_ptr()).width;
            let h = (*frame.as_ptr()).height;
            let data = (*frame.as_ptr()).data[0];
            let stride = (*frame.as_ptr()).linesize[0];

            // 检查分辨率与步长合法性; 不静默丢帧, 直接终止解码
            if w <= 0 || h <= 0 || data.is_null() || (stride as i64) < (w as i64) * 3 {
                warn!("⚠️ 非法帧 #{}: {}x{} stride={}", self.decoded + 1, w, h, stride);
                return Err(format!("invalid frame {}x{} stride={}", w, h, stride));
            }

            let (w, h, stride) = (w as usize, h as usize, stride as usize);
            let row_bytes = w * 3;
            let mut rgb = vec![0u8; row_bytes * h];
            for (y, row) in rgb.chunks_exact_mut(row_bytes).enumerate() {
                std::ptr::copy_nonoverlapping(data.add(y * stride), row.as_mut_ptr(), row_bytes);
            }

            match RgbImage::from_raw(w as u32, h as u32, rgb) {
                Some(img) => img,
                None => return Err("RGB图像转换失败".to_string()),
            }
        };

        self.decoded += 1;
        self.tick();

        // 阻塞发送: 流水线处理慢时反压解码线程; 接收端关闭则终止解码
        let tx = self.tx.as_ref().ok_or("decode filter already closed")?;
        tx.send(VideoFrame {
            number: self.decoded,
            image,
        })
        .map_err(|_| "frame receiver closed".to_string())?;

        Ok(Some(frame))
    }

    fn uninit(&mut self, _ctx: &FrameFilterContext) {
        self.tx = None;
        debug!("✅ 解码线程退出 (送出{}帧)", self.decoded);
    }
}
