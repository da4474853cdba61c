/// 渲染模块 (Renderer)
///
/// - overlay: 在原始帧上叠加骨架连线与关键点
/// - plot:    肩部高度趋势图光栅化
pub mod overlay;
pub mod plot;

pub use overlay::{OverlayRenderer, OverlayStyle};
pub use plot::{ChartPlotter, PlotBounds, TrendPlotter};
