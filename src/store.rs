//! OSM 内存数据源
//!
//! 架构设计：
//! - DashMap 存储实体本身 (O(1) 随机访问)
//! - R-Tree 存储空间索引 (O(log n) 范围查询)
//! - 两阶段加载：先收集数据，再批量构建索引
//!
//! 作为离线数据源使用，查询语义与 Overpass 数据源一致：
//! 半径分支按类别标签过滤，包含分支返回覆盖点击点的闭合面。

use crate::element::{Coordinate, ElementShape, QueryBranch, RawElement, Tags};
use crate::geodata::{GeoDataSource, QueryResponse};
use crate::pick::METERS_PER_DEGREE;
use crate::query::{SpatialQuery, NODE_CATEGORIES, WAY_CATEGORIES};
use anyhow::Result;
use dashmap::DashMap;
use rstar::{RTree, RTreeObject, AABB};
use std::sync::RwLock;

/// 存储的节点
#[derive(Debug, Clone)]
pub struct StoredNode {
    pub id: i64,
    pub lat: f64,
    pub lon: f64,
    pub tags: Tags,
}

/// 存储的路径
#[derive(Debug, Clone)]
pub struct StoredWay {
    pub id: i64,
    pub node_refs: Vec<i64>,
    pub tags: Tags,
    /// 是否是闭合面 (加载时预计算，包含分支只考虑闭合面)
    pub is_area: bool,
}

/// R-Tree 中的空间索引项 (只存 ID 和包围盒)
#[derive(Debug, Clone, Copy)]
struct SpatialEntry {
    id: i64,
    min_lon: f64,
    min_lat: f64,
    max_lon: f64,
    max_lat: f64,
}

impl RTreeObject for SpatialEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners([self.min_lon, self.min_lat], [self.max_lon, self.max_lat])
    }
}

/// 核心数据存储结构
pub struct GeoStore {
    nodes: DashMap<i64, StoredNode>,
    ways: DashMap<i64, StoredWay>,
    node_index: RwLock<RTree<SpatialEntry>>,
    way_index: RwLock<RTree<SpatialEntry>>,
}

impl GeoStore {
    pub fn new() -> Self {
        Self {
            nodes: DashMap::new(),
            ways: DashMap::new(),
            node_index: RwLock::new(RTree::new()),
            way_index: RwLock::new(RTree::new()),
        }
    }

    /// 插入节点 (不更新索引，需要后续调用 rebuild_indices)
    pub fn insert_node(&self, node: StoredNode) {
        self.nodes.insert(node.id, node);
    }

    /// 插入路径 (不更新索引)
    pub fn insert_way(&self, way: StoredWay) {
        self.ways.insert(way.id, way);
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn way_count(&self) -> usize {
        self.ways.len()
    }

    /// 批量重建空间索引 (O(n log n) 一次性构建，比逐条插入快得多)
    pub fn rebuild_indices(&self) {
        let node_entries: Vec<SpatialEntry> = self
            .nodes
            .iter()
            .map(|entry| {
                let node = entry.value();
                SpatialEntry {
                    id: node.id,
                    min_lon: node.lon,
                    min_lat: node.lat,
                    max_lon: node.lon,
                    max_lat: node.lat,
                }
            })
            .collect();

        let way_entries: Vec<SpatialEntry> = self
            .ways
            .iter()
            .filter_map(|entry| self.way_bbox(entry.value()))
            .collect();

        if let Ok(mut index) = self.node_index.write() {
            *index = RTree::bulk_load(node_entries);
        }
        if let Ok(mut index) = self.way_index.write() {
            *index = RTree::bulk_load(way_entries);
        }
    }

    /// 计算 Way 的包围盒
    fn way_bbox(&self, way: &StoredWay) -> Option<SpatialEntry> {
        let mut min_lon = f64::MAX;
        let mut min_lat = f64::MAX;
        let mut max_lon = f64::MIN;
        let mut max_lat = f64::MIN;
        let mut found = false;

        for node_id in &way.node_refs {
            if let Some(node) = self.nodes.get(node_id) {
                min_lon = min_lon.min(node.lon);
                min_lat = min_lat.min(node.lat);
                max_lon = max_lon.max(node.lon);
                max_lat = max_lat.max(node.lat);
                found = true;
            }
        }

        found.then_some(SpatialEntry {
            id: way.id,
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        })
    }

    /// 半径分支：范围内按类别过滤的节点与路径
    fn radius_elements(&self, query: &SpatialQuery) -> Vec<RawElement> {
        let deg = query.radius_m / METERS_PER_DEGREE;
        let search_box = AABB::from_corners(
            [query.lon - deg, query.lat - deg],
            [query.lon + deg, query.lat + deg],
        );

        let mut elements = Vec::new();

        let node_ids = match self.node_index.read() {
            Ok(index) => {
                let mut ids: Vec<i64> = index
                    .locate_in_envelope_intersecting(&search_box)
                    .map(|entry| entry.id)
                    .collect();
                ids.sort_unstable();
                ids
            }
            Err(_) => return elements,
        };
        for id in node_ids {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            if !NODE_CATEGORIES
                .iter()
                .any(|key| node.tags.contains_key(*key))
            {
                continue;
            }
            elements.push(RawElement {
                id,
                shape: ElementShape::Point(Coordinate {
                    lat: node.lat,
                    lon: node.lon,
                }),
                tags: node.tags.clone(),
                branch: QueryBranch::Radius,
            });
        }

        let way_ids = match self.way_index.read() {
            Ok(index) => {
                let mut ids: Vec<i64> = index
                    .locate_in_envelope_intersecting(&search_box)
                    .map(|entry| entry.id)
                    .collect();
                ids.sort_unstable();
                ids
            }
            Err(_) => return elements,
        };
        for id in way_ids {
            let Some(way) = self.ways.get(&id) else {
                continue;
            };
            let wanted = WAY_CATEGORIES
                .iter()
                .any(|key| way.tags.contains_key(*key))
                || way.tags.contains_key("name");
            if !wanted {
                continue;
            }
            elements.push(RawElement {
                id,
                shape: ElementShape::Way(way.node_refs.clone()),
                tags: way.tags.clone(),
                branch: QueryBranch::Radius,
            });
        }

        elements
    }

    /// 包含分支：环覆盖点击点的闭合面
    fn enclosing_elements(&self, query: &SpatialQuery) -> Vec<RawElement> {
        // 极小的查询框找出包围盒覆盖点击点的所有 Way
        let eps = 1e-9;
        let click_box = AABB::from_corners(
            [query.lon - eps, query.lat - eps],
            [query.lon + eps, query.lat + eps],
        );

        let mut elements = Vec::new();
        let way_ids = match self.way_index.read() {
            Ok(index) => {
                let mut ids: Vec<i64> = index
                    .locate_in_envelope_intersecting(&click_box)
                    .map(|entry| entry.id)
                    .collect();
                ids.sort_unstable();
                ids
            }
            Err(_) => return elements,
        };

        for id in way_ids {
            let Some(way) = self.ways.get(&id) else {
                continue;
            };
            if !way.is_area {
                continue;
            }
            let ring: Vec<Coordinate> = way
                .node_refs
                .iter()
                .filter_map(|node_id| {
                    self.nodes.get(node_id).map(|n| Coordinate {
                        lat: n.lat,
                        lon: n.lon,
                    })
                })
                .collect();
            if ring.len() < 4 {
                continue;
            }
            if point_in_ring(query.lat, query.lon, &ring) {
                elements.push(RawElement {
                    id,
                    shape: ElementShape::Way(way.node_refs.clone()),
                    tags: way.tags.clone(),
                    branch: QueryBranch::Enclosing,
                });
            }
        }

        elements
    }

    /// 为响应中的 Way 解析成员节点坐标
    fn collect_points(&self, response: &mut QueryResponse) {
        let mut wanted: Vec<i64> = Vec::new();
        for element in &response.elements {
            if let ElementShape::Way(member_refs) = &element.shape {
                wanted.extend_from_slice(member_refs);
            }
        }
        for id in wanted {
            if let Some(node) = self.nodes.get(&id) {
                response.add_point(
                    id,
                    Coordinate {
                        lat: node.lat,
                        lon: node.lon,
                    },
                );
            }
        }
    }
}

impl Default for GeoStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GeoDataSource for GeoStore {
    async fn fetch(&self, query: &SpatialQuery) -> Result<QueryResponse> {
        let mut response = QueryResponse::new();
        for element in self.radius_elements(query) {
            response.add_element(element);
        }
        for element in self.enclosing_elements(query) {
            response.add_element(element);
        }
        self.collect_points(&mut response);
        Ok(response)
    }
}

/// 判断一个 Way 是否应该被视为闭合面
pub(crate) fn is_area_way(tags: &Tags, node_refs: &[i64]) -> bool {
    if node_refs.len() < 4 || node_refs.first() != node_refs.last() {
        return false;
    }

    // 明确标记优先
    if let Some(value) = tags.get("area") {
        return value == "yes";
    }

    for (key, value) in tags {
        match key.as_str() {
            "building" | "landuse" | "leisure" | "amenity" | "shop" | "tourism" | "man_made"
                if value != "no" =>
            {
                return true;
            }
            "natural" if value != "no" && value != "coastline" && value != "tree_row" => {
                return true;
            }
            "waterway" if value == "riverbank" || value == "dock" || value == "boatyard" => {
                return true;
            }
            _ => {}
        }
    }

    false
}

/// 射线法判断点是否落在环内
fn point_in_ring(lat: f64, lon: f64, ring: &[Coordinate]) -> bool {
    let mut inside = false;
    let n = ring.len();
    for i in 0..n {
        let j = (i + 1) % n;
        let (xi, yi) = (ring[i].lon, ring[i].lat);
        let (xj, yj) = (ring[j].lon, ring[j].lat);
        let intersect =
            ((yi > lat) != (yj > lat)) && (lon < (xj - xi) * (lat - yi) / (yj - yi) + xi);
        if intersect {
            inside = !inside;
        }
    }
    inside
}
