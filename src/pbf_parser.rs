//! PBF 流式解析器
//!
//! 基于 osmpbf crate 实现流式解析，避免一次性加载整个文件到内存。
//! 多线程并行解析，完成后一次性重建空间索引。

use crate::element::Tags;
use crate::store::{is_area_way, GeoStore, StoredNode, StoredWay};
use anyhow::{Context, Result};
use osmpbf::{Element, ElementReader};
use std::path::Path;
use std::sync::Arc;

/// 加载统计
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct LoadStats {
    pub nodes: u64,
    pub ways: u64,
    /// Relation 仅计数，点击解析不消费其成员
    pub relations: u64,
}

fn collect_tags<'a>(iter: impl Iterator<Item = (&'a str, &'a str)>) -> Tags {
    iter.map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

/// 并行解析 PBF 文件并填充存储
pub fn load_pbf(path: &Path, store: Arc<GeoStore>) -> Result<LoadStats> {
    let reader =
        ElementReader::from_path(path).with_context(|| format!("无法打开 PBF 文件: {:?}", path))?;

    let store_ref = &store;

    let (nodes, ways, relations) = reader
        .par_map_reduce(
            |element| match element {
                Element::Node(node) => {
                    store_ref.insert_node(StoredNode {
                        id: node.id(),
                        lat: node.lat(),
                        lon: node.lon(),
                        tags: collect_tags(node.tags()),
                    });
                    (1u64, 0u64, 0u64)
                }
                Element::DenseNode(node) => {
                    store_ref.insert_node(StoredNode {
                        id: node.id(),
                        lat: node.lat(),
                        lon: node.lon(),
                        tags: collect_tags(node.tags()),
                    });
                    (1, 0, 0)
                }
                Element::Way(way) => {
                    let tags = collect_tags(way.tags());
                    let node_refs: Vec<i64> = way.refs().collect();
                    let is_area = is_area_way(&tags, &node_refs);
                    store_ref.insert_way(StoredWay {
                        id: way.id(),
                        node_refs,
                        tags,
                        is_area,
                    });
                    (0, 1, 0)
                }
                Element::Relation(_) => (0, 0, 1),
            },
            || (0u64, 0u64, 0u64),
            |a, b| (a.0 + b.0, a.1 + b.1, a.2 + b.2),
        )
        .with_context(|| "并行解析 PBF 时发生错误")?;

    // 批量重建空间索引
    store.rebuild_indices();

    log::info!("PBF 加载完成: {} 节点, {} 路径, {} 关系", nodes, ways, relations);

    Ok(LoadStats {
        nodes,
        ways,
        relations,
    })
}
