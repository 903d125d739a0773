//! 公共元素模型
//!
//! 地理数据源返回的原始元素及其配套类型。
//! 种类专属的几何数据直接挂在 `ElementShape` 变体上，
//! 下游阶段通过穷尽匹配分发，不做标签探测。

use serde::Serialize;
use std::collections::BTreeMap;

/// 元素标签集 (键唯一，迭代按字母序)
pub type Tags = BTreeMap<String, String>;

/// WGS84 坐标点
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

/// 元素种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Node,
    Way,
    Relation,
}

/// 元素几何形态
#[derive(Debug, Clone)]
pub enum ElementShape {
    /// 单点坐标
    Point(Coordinate),
    /// 有序节点引用序列，定义 Way 的形状
    Way(Vec<i64>),
    /// 逻辑组合，无直接几何
    Relation,
}

/// 元素来自哪个查询分支
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryBranch {
    /// 半径搜索
    Radius,
    /// 包含搜索 (点击点落在元素范围内)
    Enclosing,
}

/// 地理数据源返回的一条原始元素
///
/// `id` 仅在各自种类内唯一。
#[derive(Debug, Clone)]
pub struct RawElement {
    pub id: i64,
    pub shape: ElementShape,
    pub tags: Tags,
    pub branch: QueryBranch,
}

impl RawElement {
    pub fn kind(&self) -> ElementKind {
        match self.shape {
            ElementShape::Point(_) => ElementKind::Node,
            ElementShape::Way(_) => ElementKind::Way,
            ElementShape::Relation => ElementKind::Relation,
        }
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn has_tag(&self, key: &str) -> bool {
        self.tags.contains_key(key)
    }

    pub fn tag_is(&self, key: &str, value: &str) -> bool {
        self.tag(key) == Some(value)
    }
}
