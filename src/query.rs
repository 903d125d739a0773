//! 空间查询构造
//!
//! 围绕一个点击坐标构造两个分支的查询描述：
//! - 半径分支：类别标签过滤的节点与路径
//! - 包含分支：范围覆盖点击点的所有元素
//!
//! 描述本身对数据源不透明，各数据源自行解释。纯构造，无错误路径。

use crate::element::Coordinate;
use serde::Deserialize;

/// 半径分支允许的节点类别标签
pub const NODE_CATEGORIES: [&str; 6] = [
    "amenity", "shop", "tourism", "leisure", "historic", "building",
];

/// 半径分支允许的路径类别标签 (另加裸 `name` 标签的路径)
pub const WAY_CATEGORIES: [&str; 5] = ["building", "amenity", "shop", "tourism", "leisure"];

/// 点击周边的空间查询描述
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SpatialQuery {
    pub lat: f64,
    pub lon: f64,
    pub radius_m: f64,
}

impl SpatialQuery {
    pub fn around(lat: f64, lon: f64, radius_m: f64) -> Self {
        Self { lat, lon, radius_m }
    }

    /// 点击坐标
    pub fn click(&self) -> Coordinate {
        Coordinate {
            lat: self.lat,
            lon: self.lon,
        }
    }
}
