//! clickosm - OSM 点击要素解析引擎
//!
//! 将一次模糊的地图点击 (单个经纬度) 解析为空间查询结果中最相关的
//! 单个地理要素，并附带可绘制的高亮几何。渲染、视口管理、定位 UI
//! 都不在此层，调用方只消费 `resolve` / `clear_selection` 两个入口。
//!
//! # 模块结构
//!
//! - `element`: 公共元素模型
//! - `query`: 空间查询构造
//! - `geodata`: 数据源契约
//! - `overpass`: Overpass API 数据源
//! - `store`: 内存数据源 (DashMap + R-Tree)
//! - `pbf_parser`: PBF 文件解析器
//! - `scoring`: 相关性评分
//! - `pick`: 过滤/距离/分桶/选择管线
//! - `feature`: 要素输出映射
//! - `highlight`: 高亮几何构造
//! - `resolver`: 点击解析入口

mod element;
mod feature;
mod geodata;
mod highlight;
mod overpass;
mod pbf_parser;
mod pick;
mod query;
mod resolver;
mod scoring;
mod store;

pub use element::{Coordinate, ElementKind, ElementShape, QueryBranch, RawElement, Tags};
pub use feature::{map_feature, Feature};
pub use geodata::{GeoDataSource, QueryResponse};
pub use highlight::{build_highlight, HighlightGeometry};
pub use overpass::{OverpassSource, DEFAULT_ENDPOINT};
pub use pbf_parser::{load_pbf, LoadStats};
pub use pick::{
    classify, element_distance, filter_elements, score_and_measure, select, Buckets, ScoredElement,
};
pub use query::{SpatialQuery, NODE_CATEGORIES, WAY_CATEGORIES};
pub use resolver::{ClickResolver, ResolveConfig, ResolveOutcome, SelectionState};
pub use scoring::score_element;
pub use store::{GeoStore, StoredNode, StoredWay};
