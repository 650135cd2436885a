//! NCX（Navigation Control file for XML）导航地图模块
//!
//! 此模块提供NCX导航点的结构定义，以及在文档树上编辑导航地图的 [`Ncx`]。
//! 导航地图中每个章节对应一个顶层navPoint，playOrder与脊柱顺序一致。

mod document;
mod navigation;

pub use document::Ncx;
pub use navigation::{NavPoint, play_order_of};
