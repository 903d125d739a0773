//! 点击解析入口
//!
//! 单次点击 = 构造查询 → 等待数据源 → 同步执行纯管线 → 返回选中状态。
//! 数据源请求是唯一的挂起点，之后的管线无副作用。
//!
//! 重叠点击通过代际计数器仲裁：每次 resolve / clear 领取新的代际号，
//! 旧的在途解析在完成时发现自己已过期，返回 Superseded 而不是结果，
//! 保证调用方观察到的永远是最后一次点击的结果。

use crate::feature::{map_feature, Feature};
use crate::geodata::GeoDataSource;
use crate::highlight::{build_highlight, HighlightGeometry};
use crate::pick;
use crate::query::SpatialQuery;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// 解析配置
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ResolveConfig {
    /// 半径搜索范围（米）
    pub radius_m: f64,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self { radius_m: 30.0 }
    }
}

/// 一次解析产出的选中状态
///
/// 调用方持有唯一一份，整体替换 (先替换再丢弃旧值)，不原地修改字段。
#[derive(Debug, Clone, Serialize)]
pub struct SelectionState {
    pub feature: Option<Feature>,
    pub highlight: HighlightGeometry,
}

impl SelectionState {
    /// 空选中 (清除或无结果)
    pub fn cleared() -> Self {
        Self {
            feature: None,
            highlight: HighlightGeometry::None,
        }
    }
}

/// 解析结果
#[derive(Debug, Clone, Serialize)]
pub enum ResolveOutcome {
    /// 本次点击仍是最新的，结果有效
    Current(SelectionState),
    /// 等待期间有更新的点击或清除到达，本次结果作废
    Superseded,
}

/// 点击解析器
pub struct ClickResolver<S> {
    source: S,
    config: ResolveConfig,
    epoch: AtomicU64,
}

impl<S: GeoDataSource> ClickResolver<S> {
    pub fn new(source: S) -> Self {
        Self::with_config(source, ResolveConfig::default())
    }

    pub fn with_config(source: S, config: ResolveConfig) -> Self {
        Self {
            source,
            config,
            epoch: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &ResolveConfig {
        &self.config
    }

    /// 解析一次地图点击
    pub async fn resolve(&self, lat: f64, lon: f64) -> ResolveOutcome {
        let ticket = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let query = SpatialQuery::around(lat, lon, self.config.radius_m);

        let response = match self.source.fetch(&query).await {
            Ok(response) => response,
            Err(error) => {
                // 查询失败折叠为空结果，不向调用方抛出
                log::warn!("空间查询失败，按无结果处理: {error:#}");
                return self.finish(ticket, SelectionState::cleared());
            }
        };
        if self.epoch.load(Ordering::SeqCst) != ticket {
            return ResolveOutcome::Superseded;
        }

        let click = query.click();
        let state = match pick::run_pipeline(&response, click, query.radius_m) {
            Some(element) => SelectionState {
                feature: Some(map_feature(element)),
                highlight: build_highlight(element, &response.points, click),
            },
            None => SelectionState::cleared(),
        };
        self.finish(ticket, state)
    }

    /// 清除当前选中，并作废仍在途的解析
    pub fn clear_selection(&self) -> SelectionState {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        SelectionState::cleared()
    }

    fn finish(&self, ticket: u64, state: SelectionState) -> ResolveOutcome {
        if self.epoch.load(Ordering::SeqCst) == ticket {
            ResolveOutcome::Current(state)
        } else {
            ResolveOutcome::Superseded
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Coordinate, ElementKind, ElementShape, QueryBranch, RawElement, Tags};
    use crate::geodata::QueryResponse;
    use anyhow::{anyhow, Result};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use tokio::sync::Notify;

    const CLICK_LAT: f64 = 13.7563;
    const CLICK_LON: f64 = 100.5018;

    fn make_tags(pairs: &[(&str, &str)]) -> Tags {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// 距点击点约 meters 米的纬向偏移坐标
    fn offset(meters: f64) -> Coordinate {
        Coordinate {
            lat: CLICK_LAT + meters / 111_000.0,
            lon: CLICK_LON,
        }
    }

    /// 餐厅节点 + 居住道路的小场景
    fn restaurant_scene() -> QueryResponse {
        let mut response = QueryResponse::new();
        response.add_element(RawElement {
            id: 1,
            shape: ElementShape::Point(offset(5.0)),
            tags: make_tags(&[("amenity", "restaurant"), ("name", "Test")]),
            branch: QueryBranch::Radius,
        });
        response.add_element(RawElement {
            id: 2,
            shape: ElementShape::Way(vec![10, 11, 12]),
            tags: make_tags(&[("highway", "residential")]),
            branch: QueryBranch::Radius,
        });
        response.add_point(10, offset(15.0));
        response.add_point(11, offset(25.0));
        response.add_point(12, offset(40.0));
        response
    }

    /// 点击落在大建筑内、周边没有点状要素的场景
    fn building_scene() -> QueryResponse {
        let mut response = QueryResponse::new();
        response.add_element(RawElement {
            id: 7,
            shape: ElementShape::Way(vec![20, 21, 22, 20]),
            tags: make_tags(&[("building", "yes")]),
            branch: QueryBranch::Enclosing,
        });
        response.add_point(20, offset(100.0));
        response.add_point(21, offset(130.0));
        response.add_point(22, offset(160.0));
        response
    }

    struct StaticSource {
        response: QueryResponse,
    }

    impl GeoDataSource for StaticSource {
        async fn fetch(&self, _query: &SpatialQuery) -> Result<QueryResponse> {
            Ok(self.response.clone())
        }
    }

    struct FailingSource;

    impl GeoDataSource for FailingSource {
        async fn fetch(&self, _query: &SpatialQuery) -> Result<QueryResponse> {
            Err(anyhow!("connection refused"))
        }
    }

    /// 第一次请求挂起等待放行，之后的请求立即返回
    struct GatedSource {
        response: QueryResponse,
        calls: AtomicUsize,
        entered: Arc<Notify>,
        release: Arc<Notify>,
    }

    impl GeoDataSource for GatedSource {
        async fn fetch(&self, _query: &SpatialQuery) -> Result<QueryResponse> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                self.entered.notify_one();
                self.release.notified().await;
            }
            Ok(self.response.clone())
        }
    }

    fn expect_current(outcome: ResolveOutcome) -> SelectionState {
        match outcome {
            ResolveOutcome::Current(state) => state,
            ResolveOutcome::Superseded => panic!("resolution unexpectedly superseded"),
        }
    }

    #[tokio::test]
    async fn test_restaurant_node_selected_over_road() {
        let resolver = ClickResolver::new(StaticSource {
            response: restaurant_scene(),
        });
        let state = expect_current(resolver.resolve(CLICK_LAT, CLICK_LON).await);
        let feature = state.feature.expect("feature expected");
        assert_eq!(feature.id, 1);
        assert_eq!(feature.kind, ElementKind::Node);
        assert_eq!(feature.display_name.as_deref(), Some("Test"));
        assert!(matches!(state.highlight, HighlightGeometry::Marker { .. }));
    }

    #[tokio::test]
    async fn test_enclosing_building_yields_polygon() {
        let resolver = ClickResolver::new(StaticSource {
            response: building_scene(),
        });
        let state = expect_current(resolver.resolve(CLICK_LAT, CLICK_LON).await);
        let feature = state.feature.expect("feature expected");
        assert_eq!(feature.id, 7);
        assert_eq!(feature.kind, ElementKind::Way);
        match state.highlight {
            HighlightGeometry::Polygon { ring, dashed } => {
                assert_eq!(ring.len(), 4);
                assert!(dashed);
            }
            other => panic!("expected polygon, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_query_failure_returns_empty_selection() {
        let resolver = ClickResolver::new(FailingSource);
        let state = expect_current(resolver.resolve(CLICK_LAT, CLICK_LON).await);
        assert!(state.feature.is_none());
        assert_eq!(state.highlight, HighlightGeometry::None);
    }

    #[tokio::test]
    async fn test_empty_response_selects_nothing() {
        let resolver = ClickResolver::new(StaticSource {
            response: QueryResponse::new(),
        });
        let state = expect_current(resolver.resolve(CLICK_LAT, CLICK_LON).await);
        assert!(state.feature.is_none());
        assert_eq!(state.highlight, HighlightGeometry::None);
    }

    #[tokio::test]
    async fn test_second_click_supersedes_first() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let resolver = ClickResolver::new(GatedSource {
            response: restaurant_scene(),
            calls: AtomicUsize::new(0),
            entered: entered.clone(),
            release: release.clone(),
        });

        let first = resolver.resolve(CLICK_LAT, CLICK_LON);
        let second = async {
            entered.notified().await;
            let outcome = resolver.resolve(CLICK_LAT, CLICK_LON).await;
            release.notify_one();
            outcome
        };
        let (first, second) = tokio::join!(first, second);

        assert!(matches!(first, ResolveOutcome::Superseded));
        let state = expect_current(second);
        assert_eq!(state.feature.unwrap().id, 1);
    }

    #[tokio::test]
    async fn test_clear_invalidates_inflight_resolution() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let resolver = ClickResolver::new(GatedSource {
            response: restaurant_scene(),
            calls: AtomicUsize::new(0),
            entered: entered.clone(),
            release: release.clone(),
        });

        let pending = resolver.resolve(CLICK_LAT, CLICK_LON);
        let clearing = async {
            entered.notified().await;
            let cleared = resolver.clear_selection();
            release.notify_one();
            cleared
        };
        let (outcome, cleared) = tokio::join!(pending, clearing);

        assert!(matches!(outcome, ResolveOutcome::Superseded));
        assert!(cleared.feature.is_none());
        assert_eq!(cleared.highlight, HighlightGeometry::None);
    }
}
