/// 视频文件解码器
/// Video file decoder (ez-ffmpeg, software decoding)
use std::path::Path;

use crossbeam_channel::{bounded, Receiver};
use ez_ffmpeg::container_info::get_duration_us;
use ez_ffmpeg::core::context::null_output::create_null_output;
use ez_ffmpeg::filter::frame_pipeline_builder::FramePipelineBuilder;
use ez_ffmpeg::stream_info::{find_video_stream_info, StreamInfo};
use ez_ffmpeg::{AVMediaType, FfmpegContext, Input};
use tracing::{debug, info, warn};

use super::decode_filter::DecodeFilter;
use super::{FrameSource, VideoFrame, VideoInfo};
use crate::error::{PipelineError, Result};

/// 解码通道容量 (帧)
const FRAME_QUEUE: usize = 8;

/// 读取容器中视频流的尺寸、帧率、总帧数
pub fn probe(path: &Path) -> Result<VideoInfo> {
    let url = path.to_string_lossy().to_string();

    let stream = find_video_stream_info(url.as_str())
        .map_err(|e| PipelineError::open(&url, e))?
        .ok_or_else(|| PipelineError::open(&url, "no video stream"))?;

    let StreamInfo::Video {
        width,
        height,
        fps,
        nb_frames,
        ..
    } = stream
    else {
        return Err(PipelineError::open(&url, "first stream is not video"));
    };

    let width = u32::try_from(width).unwrap_or(0);
    let height = u32::try_from(height).unwrap_or(0);
    if width == 0 || height == 0 {
        return Err(PipelineError::open(&url, "video stream has no dimensions"));
    }

    let mut fps = f64::from(fps);
    if !fps.is_finite() || fps <= 0.0 {
        warn!("⚠️ 无法读取帧率, 使用30fps");
        fps = 30.0;
    }

    // 部分容器(avi)不记录帧数, 用时长估算
    let mut total_frames = u64::try_from(nb_frames).unwrap_or(0);
    if total_frames == 0 {
        if let Ok(duration_us) = get_duration_us(url.as_str()) {
            if duration_us > 0 {
                total_frames = (duration_us as f64 / 1_000_000.0 * fps).round() as u64;
            }
        }
    }

    Ok(VideoInfo {
        width,
        height,
        fps,
        total_frames,
    })
}

/// FFmpeg帧来源: 后台解码任务 → 有界通道 → 按解码顺序逐帧读取
pub struct FfmpegSource {
    url: String,
    info: VideoInfo,
    rx: Option<Receiver<VideoFrame>>,
    job: Option<Box<dyn FnOnce() -> std::result::Result<(), String>>>,
}

impl FfmpegSource {
    pub fn open(path: &Path) -> Result<Self> {
        let url = path.to_string_lossy().to_string();
        if !path.is_file() {
            return Err(PipelineError::open(&url, "file not found"));
        }

        let info = probe(path)?;
        info!(
            "🎬 打开视频: {} | {}x{} | {:.2}fps | {}帧",
            url, info.width, info.height, info.fps, info.total_frames
        );

        let (tx, rx) = bounded::<VideoFrame>(FRAME_QUEUE);
        let filter = DecodeFilter::new(tx);

        let pipe: FramePipelineBuilder = AVMediaType::AVMEDIA_TYPE_VIDEO.into();
        let pipe = pipe.filter("decode", Box::new(filter));
        let out = create_null_output().add_frame_pipeline(pipe);

        // 构建FFmpeg上下文: 统一转成 rgb24
        let ctx = FfmpegContext::builder()
            .input(Input::new(url.clone()))
            .filter_descs(["format=rgb24"].into())
            .output(out)
            .build()
            .map_err(|e| PipelineError::open(&url, format!("构建失败: {}", e)))?;

        let sch = ctx
            .start()
            .map_err(|e| PipelineError::open(&url, format!("启动失败: {}", e)))?;
        debug!("✅ 解码任务启动");

        Ok(Self {
            url,
            info,
            rx: Some(rx),
            job: Some(Box::new(move || sch.wait().map_err(|e| e.to_string()))),
        })
    }

    /// 等待解码任务结束
    fn join(&mut self) -> std::result::Result<(), String> {
        match self.job.take() {
            Some(wait) => wait(),
            None => Ok(()),
        }
    }
}

impl FrameSource for FfmpegSource {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn next_frame(&mut self) -> Result<Option<VideoFrame>> {
        let Some(rx) = &self.rx else {
            return Ok(None);
        };

        match rx.recv() {
            Ok(frame) => Ok(Some(frame)),
            Err(_) => {
                // 通道关闭 = 解码任务已结束, 检查是否正常退出
                self.rx = None;
                self.join()
                    .map_err(|e| PipelineError::open(&self.url, format!("解码失败: {}", e)))?;
                debug!("✅ 解码完成: {}", self.url);
                Ok(None)
            }
        }
    }

    fn close(&mut self) {
        // 先关闭接收端, 解码过滤器下一次发送失败即退出
        self.rx = None;
        if let Err(e) = self.join() {
            debug!("解码任务提前结束: {}", e);
        }
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        self.close();
    }
}
