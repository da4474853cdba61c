// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 运行配置 - CLI参数 + JSON配置文件

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{PipelineError, Result};

/// 姿态趋势分析程序
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "视频姿态分析: 骨架叠加 + 肩部高度趋势图", long_about = None)]
pub struct Args {
    /// 输入视频 (mp4/avi/mov)
    pub input: PathBuf,

    /// 输出视频路径, "-" 表示写到标准输出 (默认: output_video_with_plot_<时间>.mp4)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// ONNX姿态模型
    #[arg(short, long, default_value = "models/yolov8n-pose.onnx")]
    pub model: PathBuf,

    /// JSON配置文件 (命令行参数优先)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// 不绘制趋势图, 只输出骨架叠加视频
    #[arg(long)]
    pub no_plot: bool,

    /// 在内存中编码输出 (不落临时文件)
    #[arg(long)]
    pub in_memory: bool,

    /// 趋势图宽度(像素)
    #[arg(long)]
    pub plot_width: Option<u32>,

    /// 人体检测置信度阈值
    #[arg(long)]
    pub conf: Option<f32>,

    /// 关键点置信度阈值
    #[arg(long)]
    pub kconf: Option<f32>,

    /// 视频编码器 (mpeg4 / libx264 ...)
    #[arg(long)]
    pub codec: Option<String>,

    /// 趋势图文字字体 (TTF/OTF)
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// 导出肩部趋势序列 (JSON)
    #[arg(long)]
    pub series_json: Option<PathBuf>,

    /// 日志详细程度 (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// 合并配置: 默认值 < 配置文件 < 命令行
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path)?,
            None => PipelineConfig::default(),
        };

        if self.no_plot {
            config.trend_plot = false;
        }
        if self.in_memory || self.writes_to_stdout() {
            config.output_mode = OutputMode::Memory;
        }
        if let Some(width) = self.plot_width {
            config.plot_width = width;
        }
        if let Some(conf) = self.conf {
            config.conf_threshold = conf;
        }
        if let Some(kconf) = self.kconf {
            config.keypoint_threshold = kconf;
        }
        if let Some(codec) = &self.codec {
            config.codec = codec.clone();
        }
        if let Some(font) = &self.font {
            config.font_path = Some(font.clone());
        }

        config.validate()?;
        Ok(config)
    }

    pub fn writes_to_stdout(&self) -> bool {
        self.output.as_deref() == Some(Path::new("-"))
    }
}

/// 输出方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// 编码到磁盘文件
    #[default]
    File,
    /// 编码到内存缓冲区
    Memory,
}

/// 趋势图最大宽度 (像素)
pub const MAX_PLOT_WIDTH: u32 = 8192;

/// 流水线参数配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    // === 输出 ===
    pub trend_plot: bool,         // 是否拼接趋势图
    pub plot_width: u32,          // 趋势图宽度
    pub output_mode: OutputMode,  // 文件 / 内存
    pub codec: String,            // FFmpeg编码器名称

    // === 模型 ===
    pub model_input_size: u32,    // 模型输入尺寸
    pub conf_threshold: f32,      // 人体置信度阈值
    pub keypoint_threshold: f32,  // 关键点置信度阈值

    // === 绘制 ===
    pub min_visibility: f32,      // 低于该可见度的关键点不绘制
    pub font_path: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            trend_plot: true,
            plot_width: 300,
            output_mode: OutputMode::File,
            codec: String::from("mpeg4"),

            model_input_size: 640,
            conf_threshold: 0.25,
            keypoint_threshold: 0.5,

            min_visibility: 0.5,
            font_path: None,
        }
    }
}

impl PipelineConfig {
    /// 从JSON文件加载配置
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)
            .map_err(|e| PipelineError::Config(format!("{}: {}", path.display(), e)))?;
        info!("✅ 配置已从 {} 加载", path.display());
        Ok(config)
    }

    /// 保存配置到JSON文件
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| PipelineError::Config(e.to_string()))?;
        fs::write(path, json)?;
        info!("💾 配置已保存到 {}", path.display());
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.trend_plot && self.plot_width == 0 {
            return Err(PipelineError::Config("plot_width must be > 0".into()));
        }
        if self.plot_width > MAX_PLOT_WIDTH {
            return Err(PipelineError::Config(format!(
                "plot_width must be <= {}, got {}",
                MAX_PLOT_WIDTH, self.plot_width
            )));
        }
        if self.model_input_size == 0 || self.model_input_size % 32 != 0 {
            return Err(PipelineError::Config(format!(
                "model_input_size must be a positive multiple of 32, got {}",
                self.model_input_size
            )));
        }
        for (name, v) in [
            ("conf_threshold", self.conf_threshold),
            ("keypoint_threshold", self.keypoint_threshold),
            ("min_visibility", self.min_visibility),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(PipelineError::Config(format!(
                    "{} must be within [0, 1], got {}",
                    name, v
                )));
            }
        }
        if self.codec.trim().is_empty() {
            return Err(PipelineError::Config("codec must not be empty".into()));
        }
        Ok(())
    }

    /// 打印当前配置
    pub fn print_summary(&self) {
        info!("🎛️  当前配置:");
        info!(
            "  趋势图: {} (宽度 {}px)",
            if self.trend_plot { "开启" } else { "关闭" },
            self.plot_width
        );
        info!("  输出方式: {:?} | 编码器: {}", self.output_mode, self.codec);
        info!(
            "  置信度: {:.2} | 关键点置信度: {:.2} | 绘制可见度: {:.2}",
            self.conf_threshold, self.keypoint_threshold, self.min_visibility
        );
        if self.font_path.is_none() {
            warn!("  未指定字体, 将尝试系统字体");
        }
    }
}
