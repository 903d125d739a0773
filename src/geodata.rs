//! 地理数据源契约
//!
//! 数据源执行空间查询并返回原始元素序列，Way 的成员节点坐标随响应
//! 一起返回。请求失败 (网络/解析/状态码) 以 `Err` 上报，由调用方折叠
//! 为空结果，绝不向上层抛出致命错误。

use crate::element::{Coordinate, QueryBranch, RawElement};
use crate::query::SpatialQuery;
use anyhow::Result;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// 一次空间查询的完整响应
#[derive(Debug, Clone, Default)]
pub struct QueryResponse {
    /// 两个分支返回的全部元素，保持来源顺序
    pub elements: Vec<RawElement>,
    /// Way 成员节点的坐标表 (节点 id -> 坐标)
    pub points: HashMap<i64, Coordinate>,
}

impl QueryResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// 合并一条元素
    ///
    /// 同一 (种类, id) 再次出现时不重复记录；若新来源是包含分支，
    /// 覆盖已记录元素的分支标记 (包含信息更强)。
    pub fn add_element(&mut self, element: RawElement) {
        if let Some(existing) = self
            .elements
            .iter_mut()
            .find(|e| e.kind() == element.kind() && e.id == element.id)
        {
            if element.branch == QueryBranch::Enclosing {
                existing.branch = QueryBranch::Enclosing;
            }
            return;
        }
        self.elements.push(element);
    }

    pub fn add_point(&mut self, id: i64, coordinate: Coordinate) {
        self.points.insert(id, coordinate);
    }
}

/// 地理数据源：执行空间查询并返回原始元素
pub trait GeoDataSource: Send + Sync {
    fn fetch(
        &self,
        query: &SpatialQuery,
    ) -> impl Future<Output = Result<QueryResponse>> + Send;
}

impl<S: GeoDataSource> GeoDataSource for Arc<S> {
    async fn fetch(&self, query: &SpatialQuery) -> Result<QueryResponse> {
        S::fetch(self, query).await
    }
}
