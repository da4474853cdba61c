/// 视频姿态分析 (Pose Trend)
///
/// 处理流程:
/// 1. 校验上传的视频 (mp4/avi/mov) 并暂存到临时目录
/// 2. FFmpeg解码 → YOLOv8-Pose关键点 → 骨架叠加
/// 3. 每帧重绘肩部高度趋势图, 拼接在画面右侧
/// 4. 编码输出到文件 / 内存 / 标准输出
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pose_trend_rs::input::VideoUpload;
use pose_trend_rs::pipeline::LogProgress;
use pose_trend_rs::{
    default_output_name, Args, ChartPlotter, FfmpegSource, FrameSource, OutputMode, OutputTarget,
    Pipeline, SinkOutput, VideoEncoder, YOLOv8Pose,
};

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // 标准输出可能用来输出视频, 日志统一写 stderr
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = args.pipeline_config().context("配置无效")?;
    config.print_summary();

    // 上传校验 + 暂存, staged 析构时清理临时目录
    let upload = VideoUpload::from_path(&args.input)
        .with_context(|| format!("读取输入失败: {}", args.input.display()))?;
    let staged = upload.stage()?;

    let mut source = FfmpegSource::open(staged.path())?;
    let video = *source.info();

    let model = YOLOv8Pose::new(&args.model, &config)?;
    let mut pipeline = Pipeline::new(Box::new(model), &config)
        .with_progress(Box::new(LogProgress::default()));
    if config.trend_plot {
        pipeline = pipeline.with_plotter(Box::new(ChartPlotter::new(
            config.plot_width,
            video.height,
            config.font_path.as_deref(),
        )));
    }

    let output_path = args
        .output
        .clone()
        .filter(|_| !args.writes_to_stdout())
        .unwrap_or_else(|| PathBuf::from(default_output_name()));
    let target = match config.output_mode {
        OutputMode::File => OutputTarget::File(output_path.clone()),
        OutputMode::Memory => OutputTarget::Memory,
    };
    let mut encoder = VideoEncoder::new(target, video.fps, config.codec.clone());

    let summary = pipeline.run(&mut source, &mut encoder)?;

    match &summary.output {
        SinkOutput::Buffer(bytes) if args.writes_to_stdout() => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(bytes).context("写入标准输出失败")?;
            stdout.flush()?;
        }
        SinkOutput::Buffer(bytes) => {
            fs::write(&output_path, bytes)
                .with_context(|| format!("写入输出失败: {}", output_path.display()))?;
            info!("💾 内存编码结果已保存: {}", output_path.display());
        }
        SinkOutput::File(_) | SinkOutput::Frames(_) => {}
    }

    if let Some(path) = &args.series_json {
        let file = fs::File::create(path)
            .with_context(|| format!("无法创建 {}", path.display()))?;
        serde_json::to_writer_pretty(file, pipeline.series())?;
        info!("📊 趋势序列已导出: {} ({}个点)", path.display(), pipeline.series().len());
    }

    info!(
        "🏁 完成: 读取{}帧 | 写出{}帧 | 检测到人体{}帧 | 输出 {}",
        summary.frames_read,
        summary.frames_written,
        summary.detections,
        if args.writes_to_stdout() {
            "<stdout>".to_string()
        } else {
            output_path.display().to_string()
        }
    );

    drop(source);
    drop(staged);
    Ok(())
}
