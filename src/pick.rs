//! 点击拾取管线
//!
//! 对数据源响应执行 过滤 → 评分 → 距离 → 分桶 → 选择 的纯同步管线，
//! 产出唯一的最佳元素或空结果，绝不向调用方报告歧义。
//!
//! 距离采用平面近似 (一度按 111 km 计)，城市尺度下足够，不追求
//! 大地测量精度。

use crate::element::{Coordinate, ElementKind, ElementShape, RawElement};
use crate::geodata::QueryResponse;
use crate::scoring::score_element;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// 一度经纬线的近似长度（米）
pub(crate) const METERS_PER_DEGREE: f64 = 111_000.0;

/// 近邻判定的半径倍数
const NEARBY_RADIUS_FACTOR: f64 = 2.0;

/// 包含候选的最大距离（米）；超出者视为大型行政区域 (如国家)，
/// 不是有效的包含目标
const ENCLOSING_MAX_DISTANCE_M: f64 = 1_000.0;

/// 评分与距离标注后的元素，构造后不再修改
#[derive(Debug, Clone, Copy)]
pub struct ScoredElement<'a> {
    pub element: &'a RawElement,
    pub score: u32,
    /// 点击到元素的距离；Way 成员节点全部无法解析时为 None
    pub distance_m: Option<f64>,
}

/// 分桶结果
#[derive(Debug, Default)]
pub struct Buckets<'a> {
    /// 距离升序，同距离分数降序
    pub nearby: Vec<ScoredElement<'a>>,
    /// 距离升序 (距离作为区域物理大小的代理，小的排前)，同距离分数降序
    pub enclosing: Vec<ScoredElement<'a>>,
}

/// 过滤不可用元素：无标签，或成员不足以构成可见形状的 Way。
/// 保持输入顺序。
pub fn filter_elements(elements: &[RawElement]) -> Vec<&RawElement> {
    elements
        .iter()
        .filter(|e| {
            if e.tags.is_empty() {
                return false;
            }
            match &e.shape {
                ElementShape::Way(member_refs) => member_refs.len() >= 3,
                _ => true,
            }
        })
        .collect()
}

/// 平面近似距离（米）
pub fn planar_distance_m(click: Coordinate, target: Coordinate) -> f64 {
    let dlat = target.lat - click.lat;
    let dlon = target.lon - click.lon;
    (dlat * dlat + dlon * dlon).sqrt() * METERS_PER_DEGREE
}

/// 点击到元素的距离
///
/// Node 直接计算；Way 对已解析的成员节点取最小值；
/// Relation 或成员全部缺失时距离未知。
pub fn element_distance(
    click: Coordinate,
    element: &RawElement,
    points: &HashMap<i64, Coordinate>,
) -> Option<f64> {
    match &element.shape {
        ElementShape::Point(coordinate) => Some(planar_distance_m(click, *coordinate)),
        ElementShape::Way(member_refs) => member_refs
            .iter()
            .filter_map(|id| points.get(id))
            .map(|c| planar_distance_m(click, *c))
            .min_by(|a, b| a.total_cmp(b)),
        ElementShape::Relation => None,
    }
}

/// 对过滤幸存者评分并标注距离
pub fn score_and_measure<'a>(
    filtered: &[&'a RawElement],
    click: Coordinate,
    points: &HashMap<i64, Coordinate>,
) -> Vec<ScoredElement<'a>> {
    filtered
        .iter()
        .map(|&element| ScoredElement {
            element,
            score: score_element(element),
            distance_m: element_distance(click, element, points),
        })
        .collect()
}

/// 行政边界判定；行政边界完全丧失包含角色资格
fn is_administrative(element: &RawElement) -> bool {
    element.tag_is("boundary", "administrative") || element.has_tag("admin_level")
}

fn is_enclosing_candidate(scored: &ScoredElement) -> bool {
    if is_administrative(scored.element) {
        return false;
    }
    let has_category = ["building", "amenity", "shop", "tourism", "leisure"]
        .iter()
        .any(|key| scored.element.has_tag(key));
    if !has_category {
        return false;
    }
    // 距离未知的元素仍可作为包含候选
    !matches!(scored.distance_m, Some(d) if d > ENCLOSING_MAX_DISTANCE_M)
}

fn is_nearby_candidate(scored: &ScoredElement, radius_m: f64) -> bool {
    if is_administrative(scored.element) {
        return false;
    }
    matches!(scored.distance_m, Some(d) if d <= NEARBY_RADIUS_FACTOR * radius_m)
}

/// 桶内排序：距离升序 (未知距离排最后)，分数降序
fn bucket_order(a: &ScoredElement, b: &ScoredElement) -> Ordering {
    match (a.distance_m, b.distance_m) {
        (Some(da), Some(db)) => da.total_cmp(&db).then(b.score.cmp(&a.score)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b.score.cmp(&a.score),
    }
}

/// 将元素分入近邻/包含桶；同一元素可以同时满足两种候选资格
pub fn classify(scored: Vec<ScoredElement<'_>>, radius_m: f64) -> Buckets<'_> {
    let mut buckets = Buckets::default();
    for entry in scored {
        if is_enclosing_candidate(&entry) {
            buckets.enclosing.push(entry);
        }
        if is_nearby_candidate(&entry, radius_m) {
            buckets.nearby.push(entry);
        }
    }
    buckets.nearby.sort_by(bucket_order);
    buckets.enclosing.sort_by(bucket_order);
    buckets
}

/// 按固定优先序选出唯一元素，首条命中即返回
pub fn select<'a>(buckets: &Buckets<'a>, filtered: &[&'a RawElement]) -> Option<&'a RawElement> {
    // 1. 同时出现在两个桶中的元素：又近又是有效容器，意图信号最强
    let enclosing_keys: HashSet<(ElementKind, i64)> = buckets
        .enclosing
        .iter()
        .map(|s| (s.element.kind(), s.element.id))
        .collect();
    if let Some(hit) = buckets
        .nearby
        .iter()
        .find(|s| enclosing_keys.contains(&(s.element.kind(), s.element.id)))
    {
        return Some(hit.element);
    }

    // 2. 无近邻时取最小的包含区域
    if buckets.nearby.is_empty() {
        if let Some(first) = buckets.enclosing.first() {
            return Some(first.element);
        }
    }

    // 3. 近邻桶头部
    if let Some(first) = buckets.nearby.first() {
        return Some(first.element);
    }

    // 4. 防御性回退；规则 2/3 之后理论上不可达
    if let Some(first) = buckets.enclosing.first() {
        return Some(first.element);
    }

    // 5. 降级：按查询顺序取第一个带标签的过滤幸存者
    filtered.first().copied()
}

/// 在一次完整响应上运行整个管线
pub fn run_pipeline<'a>(
    response: &'a QueryResponse,
    click: Coordinate,
    radius_m: f64,
) -> Option<&'a RawElement> {
    let filtered = filter_elements(&response.elements);
    let scored = score_and_measure(&filtered, click, &response.points);
    let buckets = classify(scored, radius_m);
    select(&buckets, &filtered)
}
