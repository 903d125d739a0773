//! Overpass API 数据源
//!
//! 通过公共 Overpass 接口执行两个分支的空间查询：
//! - 半径分支：`around` 过滤 + 类别标签的 node/way 联合查询
//! - 包含分支：`is_in` 得到覆盖点击点的区域，再 `pivot` 取回元素本体
//!
//! 两个语句都以 `out body; >; out skel qt;` 结尾，Way 的成员节点
//! (无标签的骨架节点) 随响应一起返回，进入坐标表后在过滤阶段被
//! 自然丢弃。

use crate::element::{Coordinate, ElementShape, QueryBranch, RawElement, Tags};
use crate::geodata::{GeoDataSource, QueryResponse};
use crate::query::{SpatialQuery, NODE_CATEGORIES, WAY_CATEGORIES};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt::Write;

/// 默认公共端点
pub const DEFAULT_ENDPOINT: &str = "https://overpass-api.de/api/interpreter";

/// Overpass 服务端超时（秒）
const QUERY_TIMEOUT_S: u32 = 25;

/// Overpass API 客户端
pub struct OverpassSource {
    endpoint: String,
    client: reqwest::Client,
}

impl OverpassSource {
    pub fn new() -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT)
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
        }
    }

    /// 半径分支查询语句
    fn radius_ql(query: &SpatialQuery) -> String {
        let mut ql = format!("[out:json][timeout:{QUERY_TIMEOUT_S}];\n(\n");
        for category in NODE_CATEGORIES {
            let _ = writeln!(
                ql,
                "  node(around:{},{},{})[\"{}\"];",
                query.radius_m, query.lat, query.lon, category
            );
        }
        for category in WAY_CATEGORIES {
            let _ = writeln!(
                ql,
                "  way(around:{},{},{})[\"{}\"];",
                query.radius_m, query.lat, query.lon, category
            );
        }
        let _ = writeln!(
            ql,
            "  way(around:{},{},{})[\"name\"];",
            query.radius_m, query.lat, query.lon
        );
        ql.push_str(");\nout body;\n>;\nout skel qt;\n");
        ql
    }

    /// 包含分支查询语句
    fn enclosing_ql(query: &SpatialQuery) -> String {
        format!(
            "[out:json][timeout:{QUERY_TIMEOUT_S}];\n\
             is_in({},{})->.a;\n\
             (\n  way(pivot.a);\n  relation(pivot.a);\n);\n\
             out body;\n>;\nout skel qt;\n",
            query.lat, query.lon
        )
    }

    async fn execute(&self, ql: &str) -> Result<OverpassResponseDto> {
        let response = self
            .client
            .post(&self.endpoint)
            .form(&[("data", ql)])
            .send()
            .await
            .with_context(|| format!("Overpass 请求失败: {}", self.endpoint))?
            .error_for_status()
            .context("Overpass 返回非成功状态")?;
        response
            .json::<OverpassResponseDto>()
            .await
            .context("Overpass 响应解析失败")
    }
}

impl Default for OverpassSource {
    fn default() -> Self {
        Self::new()
    }
}

impl GeoDataSource for OverpassSource {
    async fn fetch(&self, query: &SpatialQuery) -> Result<QueryResponse> {
        let radius = self.execute(&Self::radius_ql(query)).await?;
        let enclosing = self.execute(&Self::enclosing_ql(query)).await?;

        let mut response = QueryResponse::new();
        absorb(radius, QueryBranch::Radius, &mut response);
        absorb(enclosing, QueryBranch::Enclosing, &mut response);
        log::debug!(
            "Overpass 返回 {} 个元素, {} 个坐标",
            response.elements.len(),
            response.points.len()
        );
        Ok(response)
    }
}

// ============================================================================
// 传输 DTO
// ============================================================================

#[derive(Debug, Deserialize)]
struct OverpassResponseDto {
    #[serde(default)]
    elements: Vec<OverpassElementDto>,
}

#[derive(Debug, Deserialize)]
struct OverpassElementDto {
    #[serde(rename = "type")]
    kind: String,
    id: i64,
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(default)]
    tags: Tags,
    #[serde(default)]
    nodes: Vec<i64>,
}

/// 将一个分支的 DTO 批量并入响应
fn absorb(dto: OverpassResponseDto, branch: QueryBranch, response: &mut QueryResponse) {
    for element in dto.elements {
        match element.kind.as_str() {
            "node" => {
                let (Some(lat), Some(lon)) = (element.lat, element.lon) else {
                    // 缺失坐标的畸形节点：本地跳过
                    continue;
                };
                let coordinate = Coordinate { lat, lon };
                response.add_point(element.id, coordinate);
                response.add_element(RawElement {
                    id: element.id,
                    shape: ElementShape::Point(coordinate),
                    tags: element.tags,
                    branch,
                });
            }
            "way" => response.add_element(RawElement {
                id: element.id,
                shape: ElementShape::Way(element.nodes),
                tags: element.tags,
                branch,
            }),
            "relation" => response.add_element(RawElement {
                id: element.id,
                shape: ElementShape::Relation,
                tags: element.tags,
                branch,
            }),
            _ => {}
        }
    }
}
