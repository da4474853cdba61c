/// 视频输入系统 (Video Input System)
///
/// 负责上传校验与视频解码
/// - intake:  上传文件的扩展名/文件头校验 + 临时目录暂存
/// - Decoder: FFmpeg解码, 按解码顺序逐帧输出RGB图像
/// - Filter:  FFmpeg帧过滤器, 把解码帧送入通道
/// - Memory:  已解码帧 (测试/嵌入使用)
pub mod decode_filter;
pub mod decoder;
pub mod intake;
pub mod memory;

pub use decode_filter::DecodeFilter;
pub use decoder::{probe, FfmpegSource};
pub use intake::{StagedUpload, VideoKind, VideoUpload};
pub use memory::MemorySource;

use image::RgbImage;

use crate::error::Result;

/// 视频基本信息
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub total_frames: u64, // 容器声明的总帧数, 未知时为0
}

/// 已解码帧 (帧号从1开始, 与解码顺序一致)
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub number: u64,
    pub image: RgbImage,
}

/// 帧来源: 有限、惰性、不可重启
pub trait FrameSource {
    fn info(&self) -> &VideoInfo;

    /// 下一帧; 流结束返回 `Ok(None)`
    fn next_frame(&mut self) -> Result<Option<VideoFrame>>;

    /// 释放解码资源 (可重复调用)
    fn close(&mut self) {}
}
