#![allow(clippy::type_complexity)]
// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
pub mod config; // 运行配置 (CLI参数 + JSON配置文件)
pub mod detection; // 关键点数据结构
pub mod error; // 统一错误类型
pub mod input; // 视频输入系统 (上传校验 / 解码)
pub mod models; // 姿态模型接口与实现
pub mod output; // 视频输出系统 (编码到文件/内存)
pub mod pipeline; // 逐帧处理流水线
pub mod renderer; // 骨架叠加 + 趋势图绘制

pub use crate::config::{Args, OutputMode, PipelineConfig};
pub use crate::detection::{Keypoint, Landmark, LandmarkSet, SKELETON};
pub use crate::error::{PipelineError, Result};
pub use crate::input::{FfmpegSource, FrameSource, MemorySource, VideoFrame, VideoInfo};
pub use crate::models::{LandmarkExtractor, YOLOv8Pose};
pub use crate::output::{FrameSink, MemoryFrameSink, OutputTarget, SinkOutput, VideoEncoder};
pub use crate::pipeline::{Pipeline, PipelineState, RunSummary, TrendSeries};
pub use crate::renderer::{ChartPlotter, OverlayRenderer, PlotBounds, TrendPlotter};

/// 默认输出文件名: output_video_with_plot_<时间戳>.mp4
pub fn default_output_name() -> String {
    format!("output_video_with_plot_{}.mp4", gen_time_string("-"))
}

pub fn gen_time_string(delimiter: &str) -> String {
    let t_now = chrono::Local::now();
    let fmt = format!(
        "%Y{}%m{}%d{}%H{}%M{}%S",
        delimiter, delimiter, delimiter, delimiter, delimiter
    );
    t_now.format(&fmt).to_string()
}
