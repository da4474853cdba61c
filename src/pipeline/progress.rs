// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 运行进度

use crossbeam_channel::{Sender, TrySendError};
use tracing::{debug, info};

/// 进度回调 (0..=100, 单调不减)
pub trait ProgressSink {
    fn report(&mut self, percent: u8);
}

impl<T: ProgressSink + ?Sized> ProgressSink for Box<T> {
    fn report(&mut self, percent: u8) {
        (**self).report(percent)
    }
}

/// 写日志, 每跨过10%打一次 info
#[derive(Debug, Default)]
pub struct LogProgress {
    last_logged: Option<u8>,
}

impl ProgressSink for LogProgress {
    fn report(&mut self, percent: u8) {
        let bucket = percent / 10;
        if self.last_logged.map_or(true, |b| bucket > b) {
            info!("⏳ 处理进度: {}%", percent);
            self.last_logged = Some(bucket);
        } else {
            debug!("进度 {}%", percent);
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _percent: u8) {}
}

/// 发送到通道; 通道满或接收端已关闭时丢弃, 不阻塞流水线
#[derive(Debug, Clone)]
pub struct ChannelProgress {
    tx: Sender<u8>,
}

impl ChannelProgress {
    pub fn new(tx: Sender<u8>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgress {
    fn report(&mut self, percent: u8) {
        match self.tx.try_send(percent) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => debug!("进度通道已满, 丢弃 {}%", percent),
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

/// 单次运行的计数器
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunState {
    pub total_frames: u64,
    pub frames_read: u64,
    pub frames_written: u64,
    pub detections: u64,
    last_percent: Option<u8>,
}

impl RunState {
    pub fn new(total_frames: u64) -> Self {
        Self {
            total_frames,
            ..Default::default()
        }
    }

    /// `min(100, current * 100 / total)`; 总帧数未知时为 None
    pub fn percent(&self) -> Option<u8> {
        if self.total_frames == 0 {
            return None;
        }
        let p = (self.frames_read.saturating_mul(100) / self.total_frames).min(100);
        Some(p as u8)
    }

    /// 返回需要上报的进度 (不回退, 不重复)
    pub fn advance(&mut self) -> Option<u8> {
        let p = self.percent()?;
        self.emit(p)
    }

    /// 完成时补报 100
    pub fn complete(&mut self) -> Option<u8> {
        self.emit(100)
    }

    fn emit(&mut self, percent: u8) -> Option<u8> {
        match self.last_percent {
            Some(last) if percent <= last => None,
            _ => {
                self.last_percent = Some(percent);
                Some(percent)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn test_percent_is_monotonic() {
        let mut state = RunState::new(3);
        let mut emitted = Vec::new();
        for _ in 0..5 {
            state.frames_read += 1;
            emitted.extend(state.advance());
        }
        emitted.extend(state.complete());
        assert_eq!(emitted, vec![33, 66, 100]);
    }

    #[test]
    fn test_unknown_total() {
        let mut state = RunState::new(0);
        state.frames_read = 10;
        assert_eq!(state.percent(), None);
        assert_eq!(state.advance(), None);
        assert_eq!(state.complete(), Some(100));
        assert_eq!(state.complete(), None);
    }

    #[test]
    fn test_channel_progress_never_blocks() {
        let (tx, rx) = bounded(1);
        let mut sink = ChannelProgress::new(tx);
        sink.report(10);
        sink.report(20);
        assert_eq!(rx.try_recv(), Ok(10));
        assert!(rx.try_recv().is_err());

        drop(rx);
        sink.report(30);
    }
}
