/// 视频处理流水线 (Video Processing Pipeline)
///
/// 单线程顺序处理, 每帧依次经过:
/// - Extractor: 关键点提取
/// - Tracker:   肩部高度序列
/// - Overlay:   骨架叠加
/// - Plotter:   趋势图重绘
/// - Composer:  横向拼接
/// - Sink:      编码输出
///
/// 解码/编码在 FFmpeg 线程中进行, 只通过有界通道交换帧, 输出顺序与解码顺序一致
pub mod composer;
pub mod progress;
pub mod tracker;

pub use composer::FrameComposer;
pub use progress::{ChannelProgress, LogProgress, NoProgress, ProgressSink, RunState};
pub use tracker::{TrendPoint, TrendSeries};

use std::time::Instant;

use tracing::{debug, error, info};

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::input::{FrameSource, VideoFrame};
use crate::models::LandmarkExtractor;
use crate::output::{FrameSink, SinkOutput};
use crate::renderer::{OverlayRenderer, OverlayStyle, PlotBounds, TrendPlotter};

/// 流水线状态: Idle → Opened → Running → Completed | Aborted → Closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Opened,
    Running,
    Completed,
    Aborted,
    Closed,
}

/// 一次运行的结果
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub frames_read: u64,
    pub frames_written: u64,
    pub detections: u64,
    pub output: SinkOutput,
}

pub struct Pipeline {
    extractor: Box<dyn LandmarkExtractor>,
    plotter: Option<Box<dyn TrendPlotter>>,
    overlay: OverlayRenderer,
    composer: FrameComposer,
    progress: Box<dyn ProgressSink>,
    series: TrendSeries,
    run: RunState,
    state: PipelineState,
}

impl Pipeline {
    /// 不带趋势图; 需要时再调用 `with_plotter`
    pub fn new(extractor: Box<dyn LandmarkExtractor>, config: &PipelineConfig) -> Self {
        let style = OverlayStyle {
            min_visibility: config.min_visibility,
            ..Default::default()
        };
        Self {
            extractor,
            plotter: None,
            overlay: OverlayRenderer::new(style),
            composer: FrameComposer::new(config.plot_width),
            progress: Box::new(NoProgress),
            series: TrendSeries::new(),
            run: RunState::default(),
            state: PipelineState::Idle,
        }
    }

    pub fn with_plotter(mut self, plotter: Box<dyn TrendPlotter>) -> Self {
        self.plotter = Some(plotter);
        self
    }

    pub fn with_progress(mut self, progress: Box<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// 最近一次运行的肩部序列
    pub fn series(&self) -> &TrendSeries {
        &self.series
    }

    pub fn run_state(&self) -> &RunState {
        &self.run
    }

    fn transition(&mut self, next: PipelineState) {
        debug!("流水线状态 {:?} → {:?}", self.state, next);
        self.state = next;
    }

    /// 处理整个视频; 无论成功与否都会关闭来源并结束输出
    pub fn run(
        &mut self,
        source: &mut dyn FrameSource,
        sink: &mut dyn FrameSink,
    ) -> Result<RunSummary> {
        let info = *source.info();
        self.series.clear();
        self.run = RunState::new(info.total_frames);
        self.transition(PipelineState::Opened);
        info!(
            "🚀 开始处理: {}x{} | {:.2}fps | {}帧 | 模型 {} | 趋势图 {}",
            info.width,
            info.height,
            info.fps,
            info.total_frames,
            self.extractor.name(),
            if self.plotter.is_some() { "开启" } else { "关闭" }
        );

        self.transition(PipelineState::Running);
        let start = Instant::now();
        let processed = self.process(source, sink);

        source.close();
        let finished = sink.finish();

        let outcome = processed.and(finished);
        match outcome {
            Ok(output) => {
                self.transition(PipelineState::Completed);
                if let Some(p) = self.run.complete() {
                    self.progress.report(p);
                }
                let elapsed = start.elapsed().as_secs_f64();
                info!(
                    "✅ 处理完成: {}帧 | 检测到人体 {}帧 | 耗时 {:.1}s ({:.1}fps)",
                    self.run.frames_written,
                    self.run.detections,
                    elapsed,
                    self.run.frames_written as f64 / elapsed.max(1e-6)
                );
                self.transition(PipelineState::Closed);
                Ok(RunSummary {
                    frames_read: self.run.frames_read,
                    frames_written: self.run.frames_written,
                    detections: self.run.detections,
                    output,
                })
            }
            Err(e) => {
                self.transition(PipelineState::Aborted);
                error!("❌ 处理中止 (第{}帧): {}", self.run.frames_read, e);
                self.transition(PipelineState::Closed);
                Err(e)
            }
        }
    }

    /// 告知输出尺寸后逐帧: 提取 → 记录 → 叠加 → 绘图 → 拼接 → 写出 → 进度
    fn process(&mut self, source: &mut dyn FrameSource, sink: &mut dyn FrameSink) -> Result<()> {
        let total = self.run.total_frames;
        let info = *source.info();
        if info.width > 0 && info.height > 0 {
            // 先告知输出尺寸, 零帧视频也能得到合法容器
            let (w, h) = match self.plotter {
                Some(_) => self.composer.output_size(info.width, info.height)?,
                None => (info.width, info.height),
            };
            sink.begin(w, h)?;
        }
        while let Some(VideoFrame { number, mut image }) = source.next_frame()? {
            self.run.frames_read += 1;

            let landmarks = self.extractor.extract(&image)?;
            match &landmarks {
                Some(_) => self.run.detections += 1,
                None => debug!("帧 {} 未检测到人体", number),
            }
            self.series.record(number, landmarks.as_ref());
            self.overlay.draw(&mut image, landmarks.as_ref());

            let composed = match &mut self.plotter {
                Some(plotter) => {
                    let bounds = PlotBounds::for_frame(total, number);
                    let plot = plotter.plot(&self.series, &bounds)?;
                    self.composer.compose(&image, &plot)?
                }
                None => self.composer.passthrough(image),
            };

            sink.write_frame(&composed)?;
            self.run.frames_written += 1;

            if let Some(p) = self.run.advance() {
                self.progress.report(p);
            }
        }
        Ok(())
    }
}
