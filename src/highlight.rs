//! 高亮几何构造
//!
//! 为选中要素派生一个可绘制的形状 (标记/线/面)，与任何渲染库无关。
//! 几何不完整时退化为点击点标记，绝不硬失败。

use crate::element::{Coordinate, ElementShape, QueryBranch, RawElement};
use serde::Serialize;
use std::collections::HashMap;

/// 构成面状高亮的类别标签
const AREA_KEYS: [&str; 3] = ["building", "amenity", "leisure"];

/// 可绘制的高亮几何
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HighlightGeometry {
    /// 点标记 (样式上区别于原始点击标记)
    Marker { point: Coordinate },
    /// 开放路径
    Polyline { path: Vec<Coordinate> },
    /// 闭合环；来自包含分支时建议虚线描边
    Polygon { ring: Vec<Coordinate>, dashed: bool },
    /// 无选中
    None,
}

/// 为选中元素构造高亮几何
pub fn build_highlight(
    element: &RawElement,
    points: &HashMap<i64, Coordinate>,
    click: Coordinate,
) -> HighlightGeometry {
    match &element.shape {
        ElementShape::Point(coordinate) => HighlightGeometry::Marker { point: *coordinate },
        ElementShape::Way(member_refs) => {
            let resolved: Vec<Coordinate> = member_refs
                .iter()
                .filter_map(|id| points.get(id).copied())
                .collect();
            if resolved.len() < 3 {
                // 几何不完整：退化为点击点标记
                return HighlightGeometry::Marker { point: click };
            }
            let from_enclosing = element.branch == QueryBranch::Enclosing;
            let is_area = from_enclosing || AREA_KEYS.iter().any(|key| element.has_tag(key));
            if is_area {
                HighlightGeometry::Polygon {
                    ring: resolved,
                    dashed: from_enclosing,
                }
            } else {
                HighlightGeometry::Polyline { path: resolved }
            }
        }
        ElementShape::Relation => HighlightGeometry::Marker { point: click },
    }
}
