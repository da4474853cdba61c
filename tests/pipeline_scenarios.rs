// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 端到端流水线场景 (内存来源 + 内存输出 + 确定性桩)

use std::cell::Cell;
use std::rc::Rc;

use image::{DynamicImage, Rgb, RgbImage, RgbaImage};
use pose_trend_rs::detection::KEYPOINT_COUNT;
use pose_trend_rs::pipeline::ChannelProgress;
use pose_trend_rs::{
    ChartPlotter, FrameSink, FrameSource, Keypoint, Landmark, LandmarkExtractor, LandmarkSet, MemoryFrameSink,
    MemorySource, Pipeline, PipelineConfig, PipelineError, PipelineState, PlotBounds, Result,
    SinkOutput, TrendPlotter, TrendSeries, VideoFrame, VideoInfo,
};

/// 左上角像素的红色通道: 1 = 有人, 2 = 提取失败, 其他 = 无人
const PERSON: u8 = 1;
const BROKEN: u8 = 2;

struct StubExtractor;

impl LandmarkExtractor for StubExtractor {
    fn extract(&mut self, frame: &RgbImage) -> Result<Option<LandmarkSet>> {
        match frame.get_pixel(0, 0)[0] {
            PERSON => {
                let mut set = LandmarkSet::new([Keypoint::default(); KEYPOINT_COUNT]);
                set.set(Landmark::RightShoulder, Keypoint::new(0.3, 0.4, 1.0));
                set.set(Landmark::LeftShoulder, Keypoint::new(0.7, 0.6, 1.0));
                Ok(Some(set))
            }
            BROKEN => Err(PipelineError::Extract("stub failure".into())),
            _ => Ok(None),
        }
    }

    fn name(&self) -> &str {
        "stub"
    }
}

/// 固定尺寸的纯色趋势图
struct StubPlotter {
    width: u32,
    height: u32,
    rgba: bool,
}

impl StubPlotter {
    fn rgb(width: u32, height: u32) -> Box<Self> {
        Box::new(Self {
            width,
            height,
            rgba: false,
        })
    }
}

impl TrendPlotter for StubPlotter {
    fn plot(&mut self, _series: &TrendSeries, _bounds: &PlotBounds) -> Result<DynamicImage> {
        if self.rgba {
            return Ok(DynamicImage::ImageRgba8(RgbaImage::new(self.width, self.height)));
        }
        Ok(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            self.width,
            self.height,
            Rgb([255, 255, 255]),
        )))
    }
}

/// 不检查尺寸的帧来源, 并记录是否被关闭
struct VecSource {
    info: VideoInfo,
    frames: Vec<RgbImage>,
    next: usize,
    closed: Rc<Cell<bool>>,
}

impl VecSource {
    fn new(frames: Vec<RgbImage>) -> Self {
        let (width, height) = frames.first().map(|f| f.dimensions()).unwrap_or((0, 0));
        Self {
            info: VideoInfo {
                width,
                height,
                fps: 25.0,
                total_frames: frames.len() as u64,
            },
            frames,
            next: 0,
            closed: Rc::new(Cell::new(false)),
        }
    }
}

impl FrameSource for VecSource {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn next_frame(&mut self) -> Result<Option<VideoFrame>> {
        let Some(image) = self.frames.get(self.next).cloned() else {
            return Ok(None);
        };
        self.next += 1;
        Ok(Some(VideoFrame {
            number: self.next as u64,
            image,
        }))
    }

    fn close(&mut self) {
        self.closed.set(true);
    }
}

fn frame(width: u32, height: u32, marker: u8) -> RgbImage {
    let mut img = RgbImage::from_pixel(width, height, Rgb([0, 40, 80]));
    img.put_pixel(0, 0, Rgb([marker, 40, 80]));
    img
}

fn pipeline(config: &PipelineConfig) -> Pipeline {
    Pipeline::new(Box::new(StubExtractor), config)
}

fn frames_of(output: SinkOutput) -> Vec<RgbImage> {
    match output {
        SinkOutput::Frames(frames) => frames,
        other => panic!("expected frames, got {:?}", other.describe()),
    }
}

#[test]
fn test_three_frame_scenario() {
    let config = PipelineConfig::default();
    let mut pipeline = pipeline(&config).with_plotter(StubPlotter::rgb(300, 100));
    let mut source = MemorySource::new(
        vec![frame(100, 100, PERSON), frame(100, 100, 0), frame(100, 100, PERSON)],
        25.0,
    )
    .unwrap();
    let mut sink = MemoryFrameSink::new();

    let summary = pipeline.run(&mut source, &mut sink).unwrap();

    let series = pipeline.series();
    assert_eq!(series.len(), 2);
    assert_eq!(series.frame_numbers(), &[1, 3]);
    for (r, l) in series.right().iter().zip(series.left()) {
        assert!((r - 0.6).abs() < 1e-6);
        assert!((l - 0.4).abs() < 1e-6);
    }

    assert_eq!(summary.frames_read, 3);
    assert_eq!(summary.frames_written, 3);
    assert_eq!(summary.detections, 2);
    let frames = frames_of(summary.output);
    assert_eq!(frames.len(), 3);
    assert!(frames.iter().all(|f| f.dimensions() == (400, 100)));
    assert_eq!(pipeline.state(), PipelineState::Closed);
}

#[test]
fn test_zero_frames() {
    let config = PipelineConfig::default();
    let mut pipeline = pipeline(&config).with_plotter(StubPlotter::rgb(300, 100));
    let mut source = MemorySource::empty(100, 100, 25.0);
    let mut sink = MemoryFrameSink::new();

    let summary = pipeline.run(&mut source, &mut sink).unwrap();

    assert_eq!(summary.frames_written, 0);
    assert!(frames_of(summary.output).is_empty());
    // 没有帧也已按视频尺寸确定输出尺寸
    assert_eq!(sink.geometry(), Some((400, 100)));
    assert!(pipeline.series().is_empty());
    assert_eq!(pipeline.state(), PipelineState::Closed);
}

#[test]
fn test_no_detection_frame_is_unannotated() {
    let config = PipelineConfig {
        trend_plot: false,
        ..Default::default()
    };
    let mut pipeline = pipeline(&config);
    let inputs = vec![frame(64, 48, 0), frame(64, 48, PERSON)];
    let mut source = MemorySource::new(inputs.clone(), 25.0).unwrap();
    let mut sink = MemoryFrameSink::new();

    let frames = frames_of(pipeline.run(&mut source, &mut sink).unwrap().output);

    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0], inputs[0]);
    assert_ne!(frames[1], inputs[1]);
    // 不拼接趋势图时尺寸与原视频一致
    assert_eq!(frames[1].dimensions(), (64, 48));
    assert_eq!(pipeline.series().frame_numbers(), &[2]);
}

#[test]
fn test_frame_count_preserved() {
    let config = PipelineConfig::default();
    let mut pipeline = pipeline(&config).with_plotter(StubPlotter::rgb(300, 60));
    let inputs: Vec<RgbImage> = (0..7)
        .map(|i| frame(80, 60, if i % 2 == 0 { PERSON } else { 0 }))
        .collect();
    let mut source = MemorySource::new(inputs, 25.0).unwrap();
    let mut sink = MemoryFrameSink::new();

    let summary = pipeline.run(&mut source, &mut sink).unwrap();

    assert_eq!(summary.frames_read, 7);
    assert_eq!(sink.frames_written(), 7);
    assert_eq!(summary.detections, 4);
    let series = pipeline.series();
    assert_eq!(series.right().len(), series.len());
    assert_eq!(series.left().len(), series.len());
}

#[test]
fn test_rerun_is_idempotent() {
    let config = PipelineConfig::default();
    let mut pipeline = pipeline(&config).with_plotter(StubPlotter::rgb(300, 100));
    let inputs = vec![frame(100, 100, PERSON), frame(100, 100, 0), frame(100, 100, PERSON)];

    let mut runs = Vec::new();
    for _ in 0..2 {
        let mut source = MemorySource::new(inputs.clone(), 25.0).unwrap();
        let mut sink = MemoryFrameSink::new();
        let frames = frames_of(pipeline.run(&mut source, &mut sink).unwrap().output);
        let dims: Vec<(u32, u32)> = frames.iter().map(|f| f.dimensions()).collect();
        runs.push((dims, pipeline.series().clone()));
    }

    assert_eq!(runs[0], runs[1]);
    assert_eq!(runs[0].1.len(), 2);
}

#[test]
fn test_mismatched_plot_is_resized() {
    let config = PipelineConfig::default();
    let mut pipeline = pipeline(&config).with_plotter(StubPlotter::rgb(250, 90));
    let mut source = MemorySource::new(vec![frame(100, 100, PERSON)], 25.0).unwrap();
    let mut sink = MemoryFrameSink::new();

    let frames = frames_of(pipeline.run(&mut source, &mut sink).unwrap().output);

    assert_eq!(frames[0].dimensions(), (400, 100));
    assert!(frames[0].get_pixel(399, 99).0.iter().all(|&c| c >= 250));
}

#[test]
fn test_non_rgb_plot_aborts() {
    let config = PipelineConfig::default();
    let mut pipeline = pipeline(&config).with_plotter(Box::new(StubPlotter {
        width: 300,
        height: 100,
        rgba: true,
    }));
    let mut source = VecSource::new(vec![frame(100, 100, PERSON), frame(100, 100, PERSON)]);
    let closed = Rc::clone(&source.closed);
    let mut sink = MemoryFrameSink::new();

    let err = pipeline.run(&mut source, &mut sink).unwrap_err();

    assert!(matches!(err, PipelineError::Format(_)));
    assert_eq!(pipeline.state(), PipelineState::Closed);
    assert!(closed.get());
    assert_eq!(sink.frames_written(), 0);
}

#[test]
fn test_extractor_failure_aborts() {
    let config = PipelineConfig::default();
    let mut pipeline = pipeline(&config).with_plotter(StubPlotter::rgb(300, 100));
    let mut source = VecSource::new(vec![frame(100, 100, PERSON), frame(100, 100, BROKEN)]);
    let closed = Rc::clone(&source.closed);
    let mut sink = MemoryFrameSink::new();

    let err = pipeline.run(&mut source, &mut sink).unwrap_err();

    assert!(matches!(err, PipelineError::Extract(_)));
    assert!(closed.get());
    assert_eq!(sink.frames_written(), 1);
    assert_eq!(pipeline.state(), PipelineState::Closed);
}

#[test]
fn test_frame_size_change_is_rejected() {
    let config = PipelineConfig {
        trend_plot: false,
        ..Default::default()
    };
    let mut pipeline = pipeline(&config);
    let mut source = VecSource::new(vec![frame(100, 100, 0), frame(120, 100, 0)]);
    let mut sink = MemoryFrameSink::new();

    let err = pipeline.run(&mut source, &mut sink).unwrap_err();

    assert!(matches!(
        err,
        PipelineError::DimensionMismatch {
            expected: (100, 100),
            found: (120, 100)
        }
    ));
    assert_eq!(sink.frames_written(), 1);
}

#[test]
fn test_progress_is_monotonic() {
    let (tx, rx) = crossbeam_channel::unbounded();
    let config = PipelineConfig::default();
    let mut pipeline = pipeline(&config)
        .with_plotter(StubPlotter::rgb(300, 40))
        .with_progress(Box::new(ChannelProgress::new(tx)));
    let inputs: Vec<RgbImage> = (0..5).map(|_| frame(40, 40, PERSON)).collect();
    let mut source = MemorySource::new(inputs, 25.0).unwrap();
    let mut sink = MemoryFrameSink::new();

    pipeline.run(&mut source, &mut sink).unwrap();

    let reported: Vec<u8> = rx.try_iter().collect();
    assert_eq!(reported, vec![20, 40, 60, 80, 100]);
}

#[test]
fn test_one_pixel_tall_video_gets_plot() {
    let config = PipelineConfig::default();
    let mut pipeline =
        pipeline(&config).with_plotter(Box::new(ChartPlotter::without_text(300, 1)));
    let inputs = vec![frame(40, 1, PERSON), frame(40, 1, 0)];
    let mut source = MemorySource::new(inputs, 25.0).unwrap();
    let mut sink = MemoryFrameSink::new();

    let frames = frames_of(pipeline.run(&mut source, &mut sink).unwrap().output);

    assert_eq!(frames.len(), 2);
    assert!(frames.iter().all(|f| f.dimensions() == (340, 1)));
    assert_eq!(pipeline.state(), PipelineState::Closed);
}

#[test]
fn test_overflowing_output_width_aborts() {
    let config = PipelineConfig {
        plot_width: u32::MAX,
        ..Default::default()
    };
    let mut pipeline = pipeline(&config).with_plotter(StubPlotter::rgb(300, 100));
    let mut source = VecSource::new(vec![frame(100, 100, PERSON)]);
    let closed = Rc::clone(&source.closed);
    let mut sink = MemoryFrameSink::new();

    let err = pipeline.run(&mut source, &mut sink).unwrap_err();

    assert!(matches!(err, PipelineError::Format(_)));
    assert!(closed.get());
    assert_eq!(sink.frames_written(), 0);
}
