//! 要素输出映射
//!
//! 将选中的原始元素转换为交给调用方的领域要素：
//! 名称/展示名推导 + 属性视图过滤。要素构造后不可变，所有权归调用方。

use crate::element::{ElementKind, RawElement};
use serde::Serialize;

/// 属性视图排除的标签键：纯记账信息，或已在要素头部单独展示
const EXCLUDED_KEYS: [&str; 17] = [
    "name",
    "source",
    "created_by",
    "id",
    "type",
    "source:date",
    "source:name",
    "attribution",
    "note",
    "fixme",
    "FIXME",
    "description",
    "website",
    "phone",
    "opening_hours",
    "brand",
    "layer",
];

/// `addr:*` 与 `operator` 及其变体按前缀排除
fn is_excluded_key(key: &str) -> bool {
    EXCLUDED_KEYS.contains(&key)
        || key.starts_with("addr:")
        || key == "operator"
        || key.starts_with("operator:")
}

/// 解析出的领域要素
#[derive(Debug, Clone, Serialize)]
pub struct Feature {
    pub id: i64,
    pub kind: ElementKind,
    pub name: Option<String>,
    pub display_name: Option<String>,
    /// 过滤后的属性视图，键按字母序
    pub properties: Vec<(String, String)>,
}

/// 将选中元素映射为要素
pub fn map_feature(element: &RawElement) -> Feature {
    let name = element.tag("name").map(str::to_string);

    // 展示名：name 优先，其次由门牌号 + 街道拼接
    let display_name = name.clone().or_else(|| {
        element.tag("addr:street").map(|street| {
            match element.tag("addr:housenumber") {
                Some(number) => format!("{number} {street}"),
                None => street.to_string(),
            }
        })
    });

    let properties = element
        .tags
        .iter()
        .filter(|(key, _)| !is_excluded_key(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    Feature {
        id: element.id,
        kind: element.kind(),
        name,
        display_name,
        properties,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Coordinate, ElementShape, QueryBranch, Tags};

    fn node_with(pairs: &[(&str, &str)]) -> RawElement {
        let tags: Tags = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RawElement {
            id: 42,
            shape: ElementShape::Point(Coordinate { lat: 0.0, lon: 0.0 }),
            tags,
            branch: QueryBranch::Radius,
        }
    }

    #[test]
    fn test_named_cafe_display_name() {
        let feature = map_feature(&node_with(&[("name", "Joe's Cafe"), ("amenity", "cafe")]));
        assert_eq!(feature.name.as_deref(), Some("Joe's Cafe"));
        assert_eq!(feature.display_name.as_deref(), Some("Joe's Cafe"));
        // name 已在头部展示，不再出现在属性视图
        assert_eq!(
            feature.properties,
            vec![("amenity".to_string(), "cafe".to_string())]
        );
    }

    #[test]
    fn test_address_fallback_display_name() {
        let feature = map_feature(&node_with(&[
            ("addr:housenumber", "12"),
            ("addr:street", "Main Street"),
            ("building", "yes"),
        ]));
        assert_eq!(feature.name, None);
        assert_eq!(feature.display_name.as_deref(), Some("12 Main Street"));
    }

    #[test]
    fn test_street_without_housenumber() {
        let feature = map_feature(&node_with(&[("addr:street", "Main Street")]));
        assert_eq!(feature.display_name.as_deref(), Some("Main Street"));
    }

    #[test]
    fn test_no_name_no_address() {
        let feature = map_feature(&node_with(&[("building", "yes")]));
        assert_eq!(feature.name, None);
        assert_eq!(feature.display_name, None);
    }

    #[test]
    fn test_bookkeeping_keys_excluded() {
        let feature = map_feature(&node_with(&[
            ("amenity", "cafe"),
            ("source", "survey"),
            ("created_by", "editor"),
            ("addr:city", "Bangkok"),
            ("operator", "Chain Ltd"),
            ("operator:wikidata", "Q1"),
            ("opening_hours", "24/7"),
            ("cuisine", "thai"),
        ]));
        let keys: Vec<&str> = feature.properties.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["amenity", "cuisine"]);
    }

    #[test]
    fn test_properties_alphabetical() {
        let feature = map_feature(&node_with(&[
            ("tourism", "museum"),
            ("cuisine", "thai"),
            ("amenity", "restaurant"),
        ]));
        let keys: Vec<&str> = feature.properties.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["amenity", "cuisine", "tourism"]);
    }
}
