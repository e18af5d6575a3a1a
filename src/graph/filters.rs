use eframe::egui::Color32;

use super::color::ITEM_GREEN;
use super::store::{GraphStore, Node, NodeKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterColor {
    Unassigned,
    Assigned(Color32),
}

impl FilterColor {
    pub fn assigned(self) -> Option<Color32> {
        match self {
            Self::Unassigned => None,
            Self::Assigned(color) => Some(color),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterEntry {
    pub category: String,
    pub query: String,
    pub color: FilterColor,
}

impl FilterEntry {
    pub fn key(&self) -> String {
        filter_key(&self.category, &self.query)
    }
}

pub fn filter_key(category: &str, query: &str) -> String {
    format!("{category}::{query}")
}

#[derive(Clone, Debug, Default)]
pub struct FilterColorMap {
    entries: Vec<FilterEntry>,
}

impl FilterColorMap {
    pub fn entries(&self) -> &[FilterEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.key() == key)
    }

    pub fn color_of(&self, key: &str) -> Option<FilterColor> {
        self.position(key).map(|index| self.entries[index].color)
    }

    pub fn add_filter(&mut self, category: &str, query: &str) -> Option<String> {
        let category = category.trim();
        let query = query.trim();
        if category.is_empty() || query.is_empty() {
            return None;
        }

        let key = filter_key(category, query);
        if self.position(&key).is_none() {
            self.entries.push(FilterEntry {
                category: category.to_owned(),
                query: query.to_owned(),
                color: FilterColor::Unassigned,
            });
        }
        Some(key)
    }

    pub fn remove_filter(&mut self, key: &str) -> bool {
        match self.position(key) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn assign_color(&mut self, key: &str, color: Color32) -> bool {
        match self.position(key) {
            Some(index) => {
                self.entries[index].color = FilterColor::Assigned(color);
                true
            }
            None => false,
        }
    }

    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|entry| (entry.category.clone(), entry.query.clone()))
            .collect()
    }

    /// Filters recolour users only; items always show the recommendation colour.
    pub fn resolve_node_color(&self, node: &Node) -> Color32 {
        match node.kind {
            NodeKind::Item => ITEM_GREEN,
            NodeKind::User => node
                .filter_pair()
                .and_then(|(feature, query)| self.color_of(&filter_key(&feature, &query)))
                .and_then(FilterColor::assigned)
                .unwrap_or(NodeKind::User.default_color()),
        }
    }

    pub fn apply(&self, store: &mut GraphStore) -> usize {
        let updates = store
            .nodes()
            .filter_map(|node| {
                let color = self.resolve_node_color(node);
                (color != node.color).then(|| (node.id.clone(), color))
            })
            .collect::<Vec<_>>();

        for (id, color) in &updates {
            store.set_node_color(id, *color);
        }
        updates.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::color::{PRESET_COLORS, USER_BLUE, parse_hex_color};
    use crate::graph::store::tests::{item, user};
    use crate::graph::store::{AttributeValue, RawGraph};

    fn tagged_user(id: &str, feature: &str, query: &str) -> Node {
        let mut node = user(id);
        node.attributes.insert(
            "filter_feature".to_owned(),
            AttributeValue::Text(feature.to_owned()),
        );
        node.attributes
            .insert("filter_query".to_owned(), AttributeValue::Text(query.to_owned()));
        node
    }

    #[test]
    fn adding_twice_keeps_the_assigned_colour() {
        let mut filters = FilterColorMap::default();
        let key = filters.add_filter("genre", "action").expect("valid filter");
        assert!(filters.assign_color(&key, PRESET_COLORS[2]));

        assert_eq!(filters.add_filter("genre", "action"), Some(key.clone()));
        assert_eq!(filters.entries().len(), 1);
        assert_eq!(filters.color_of(&key), Some(FilterColor::Assigned(PRESET_COLORS[2])));
    }

    #[test]
    fn removing_an_absent_key_changes_nothing() {
        let mut filters = FilterColorMap::default();
        filters.add_filter("age", "20-30");
        let before = filters.entries().to_vec();

        assert!(!filters.remove_filter("age::40"));
        assert_eq!(filters.entries(), before.as_slice());
        assert!(filters.remove_filter("age::20-30"));
        assert!(filters.is_empty());
    }

    #[test]
    fn blank_filters_are_rejected() {
        let mut filters = FilterColorMap::default();
        assert_eq!(filters.add_filter("", "x"), None);
        assert_eq!(filters.add_filter("age", "   "), None);
        assert!(filters.is_empty());
    }

    #[test]
    fn new_filter_starts_unassigned() {
        let mut filters = FilterColorMap::default();
        let key = filters.add_filter("gender", "F").expect("valid filter");
        let color = filters.color_of(&key).expect("entry exists");

        assert_eq!(color, FilterColor::Unassigned);
        assert_eq!(color.assigned(), None);
        for preset in PRESET_COLORS {
            assert_ne!(color, FilterColor::Assigned(preset));
        }
        assert_ne!(color, FilterColor::Assigned(USER_BLUE));
        assert_ne!(color, FilterColor::Assigned(ITEM_GREEN));
    }

    #[test]
    fn items_ignore_filter_colours() {
        let mut filters = FilterColorMap::default();
        let key = filters.add_filter("genre", "action").expect("valid filter");
        filters.assign_color(&key, PRESET_COLORS[0]);

        let mut node = item("item-1");
        node.attributes.insert(
            "filter_feature".to_owned(),
            AttributeValue::Text("genre".to_owned()),
        );
        node.attributes
            .insert("filter_query".to_owned(), AttributeValue::Text("action".to_owned()));

        assert_eq!(filters.resolve_node_color(&node), ITEM_GREEN);
    }

    #[test]
    fn assigning_a_colour_recolours_only_matching_users() {
        let mut store = GraphStore::from_raw(RawGraph {
            nodes: vec![
                tagged_user("user-1", "genre", "action"),
                tagged_user("user-2", "genre", "drama"),
                user("user-3"),
                item("item-1"),
            ],
            edges: Vec::new(),
        });
        let mut filters = FilterColorMap::default();
        let key = filters.add_filter("genre", "action").expect("valid filter");

        filters.apply(&mut store);
        assert_eq!(store.node("user-1").map(|n| n.color), Some(USER_BLUE));

        let red = parse_hex_color("#FF0000").expect("valid hex");
        assert!(filters.assign_color(&key, red));
        assert_eq!(filters.apply(&mut store), 1);

        assert_eq!(store.node("user-1").map(|n| n.color), Some(red));
        assert_eq!(store.node("user-2").map(|n| n.color), Some(USER_BLUE));
        assert_eq!(store.node("user-3").map(|n| n.color), Some(USER_BLUE));
        assert_eq!(store.node("item-1").map(|n| n.color), Some(ITEM_GREEN));
    }

    #[test]
    fn query_pairs_follow_insertion_order() {
        let mut filters = FilterColorMap::default();
        filters.add_filter("age", "20-30");
        filters.add_filter("gender", "M");
        assert_eq!(
            filters.query_pairs(),
            vec![
                ("age".to_owned(), "20-30".to_owned()),
                ("gender".to_owned(), "M".to_owned())
            ]
        );
    }
}
