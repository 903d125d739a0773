//! 相关性评分
//!
//! 对每个元素计算一个确定性的整数分值，各项贡献独立累加，无短路。
//! 高特异性、对人有意义的标签 (有名字的店铺) 必须压过泛化的线状
//! 基础设施 (无名的服务路)；包含分支重加权，因为覆盖点击点的容器
//! (如建筑多边形) 通常才是用户的点击意图，即使旁边有道路经过。

use crate::element::{ElementKind, QueryBranch, RawElement};

// 种类基础分
const BASE_NODE: u32 = 5;
const BASE_WAY: u32 = 3;
const BASE_OTHER: u32 = 1;

/// 有 name 标签
const NAME_BONUS: u32 = 20;
/// 来自包含分支
const ENCLOSING_BONUS: u32 = 30;

// 类别权重
const W_BUILDING: u32 = 15;
const W_AMENITY: u32 = 18;
const W_SHOP: u32 = 18;
const W_TOURISM: u32 = 17;
const W_LEISURE: u32 = 16;
const W_HISTORIC: u32 = 16;

// 基础设施权重
const W_HIGHWAY: u32 = 10;
const W_RAILWAY: u32 = 10;
const W_PUBLIC_TRANSPORT: u32 = 12;

// 次要权重
const W_NATURAL: u32 = 8;
const W_LANDUSE: u32 = 5;
const W_WATER: u32 = 7;

/// 计算元素分值：种类基础分 + 分支加成 + 一次遍历标签累加权重
pub fn score_element(element: &RawElement) -> u32 {
    let mut score = match element.kind() {
        ElementKind::Node => BASE_NODE,
        ElementKind::Way => BASE_WAY,
        ElementKind::Relation => BASE_OTHER,
    };

    if element.branch == QueryBranch::Enclosing {
        score += ENCLOSING_BONUS;
    }

    for (key, value) in &element.tags {
        score += match key.as_str() {
            "name" => NAME_BONUS,
            "building" => W_BUILDING,
            "amenity" => W_AMENITY,
            "shop" => W_SHOP,
            "tourism" => W_TOURISM,
            "leisure" => W_LEISURE,
            "historic" => W_HISTORIC,
            "highway" if value != "service" => W_HIGHWAY,
            "railway" => W_RAILWAY,
            "public_transport" => W_PUBLIC_TRANSPORT,
            "natural" => W_NATURAL,
            "landuse" => W_LANDUSE,
            "water" => W_WATER,
            _ => 0,
        };
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Coordinate, ElementShape, Tags};

    fn make_element(shape: ElementShape, pairs: &[(&str, &str)], branch: QueryBranch) -> RawElement {
        let tags: Tags = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RawElement {
            id: 1,
            shape,
            tags,
            branch,
        }
    }

    fn node(pairs: &[(&str, &str)]) -> RawElement {
        make_element(
            ElementShape::Point(Coordinate { lat: 0.0, lon: 0.0 }),
            pairs,
            QueryBranch::Radius,
        )
    }

    #[test]
    fn test_score_is_deterministic() {
        let a = node(&[("amenity", "cafe"), ("name", "X")]);
        let b = node(&[("amenity", "cafe"), ("name", "X")]);
        assert_eq!(score_element(&a), score_element(&b));
    }

    #[test]
    fn test_name_adds_exactly_20() {
        let without = node(&[("amenity", "cafe")]);
        let with = node(&[("amenity", "cafe"), ("name", "X")]);
        assert_eq!(score_element(&with), score_element(&without) + 20);
    }

    #[test]
    fn test_kind_base_values() {
        let n = node(&[("name", "X")]);
        let w = make_element(
            ElementShape::Way(vec![1, 2, 3]),
            &[("name", "X")],
            QueryBranch::Radius,
        );
        let r = make_element(ElementShape::Relation, &[("name", "X")], QueryBranch::Radius);
        assert_eq!(score_element(&n), 5 + 20);
        assert_eq!(score_element(&w), 3 + 20);
        assert_eq!(score_element(&r), 1 + 20);
    }

    #[test]
    fn test_enclosing_branch_adds_30() {
        let radius = node(&[("building", "yes")]);
        let mut enclosing = radius.clone();
        enclosing.branch = QueryBranch::Enclosing;
        assert_eq!(score_element(&enclosing), score_element(&radius) + 30);
    }

    #[test]
    fn test_service_road_not_weighted() {
        let service = node(&[("highway", "service")]);
        let residential = node(&[("highway", "residential")]);
        assert_eq!(score_element(&service), 5);
        assert_eq!(score_element(&residential), 5 + 10);
    }

    #[test]
    fn test_weights_are_additive() {
        // building + amenity 同时存在时两者都计入
        let both = node(&[("building", "yes"), ("amenity", "cafe")]);
        assert_eq!(score_element(&both), 5 + 15 + 18);
    }
}
