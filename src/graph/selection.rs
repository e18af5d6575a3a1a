use std::collections::{BTreeMap, HashMap};

use eframe::egui::Color32;
use log::debug;

use super::color::{DIMMED, ITEM_GREEN, NEIGHBOR_ORANGE};
use super::store::{AttributeValue, Edge, GraphStore, Node, NodeId};

const SELECTED_SIZE_FACTOR: f32 = 4.0;
const HISTORY_KEYS: [&str; 2] = ["interaction_history", "interaction_history_str"];

#[derive(Clone, Debug)]
struct Selected {
    id: NodeId,
    attributes: BTreeMap<String, AttributeValue>,
    neighbor_edge_colors: HashMap<NodeId, Color32>,
}

#[derive(Clone, Debug, Default)]
pub struct SelectionState {
    selected: Option<Selected>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionOutcome {
    pub user_id: Option<String>,
    pub interaction_history: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NodeView {
    pub color: Color32,
    pub size: f32,
    pub label: Option<String>,
    pub force_label: bool,
    pub z_index: i8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EdgeView {
    pub color: Color32,
    pub hidden: bool,
}

impl SelectionState {
    pub fn is_idle(&self) -> bool {
        self.selected.is_none()
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_ref().map(|selected| selected.id.as_str())
    }

    pub fn attributes(&self) -> Option<&BTreeMap<String, AttributeValue>> {
        self.selected.as_ref().map(|selected| &selected.attributes)
    }

    pub fn click_node(&mut self, store: &GraphStore, id: &str) -> Option<SelectionOutcome> {
        let node = store.node(id)?;

        let neighbor_edge_colors = store
            .incident_edges(id)
            .filter_map(|edge| {
                edge.other_end(id)
                    .filter(|neighbor| *neighbor != id)
                    .map(|neighbor| (neighbor.to_owned(), edge.color))
            })
            .fold(HashMap::new(), |mut colors, (neighbor, color)| {
                colors.entry(neighbor).or_insert(color);
                colors
            });

        let outcome = SelectionOutcome {
            user_id: node.attribute("user_id").map(ToString::to_string),
            interaction_history: HISTORY_KEYS
                .iter()
                .find_map(|key| node.attribute(key))
                .map(ToString::to_string),
        };

        debug!(
            "selected {id} with {} neighbours",
            neighbor_edge_colors.len()
        );
        self.selected = Some(Selected {
            id: node.id.clone(),
            attributes: node.attributes.clone(),
            neighbor_edge_colors,
        });
        Some(outcome)
    }

    pub fn click_stage(&mut self) -> bool {
        if self.selected.take().is_some() {
            debug!("selection cleared by stage click");
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.selected = None;
    }
}

fn base_node_view(node: &Node) -> NodeView {
    NodeView {
        color: node.color,
        size: node.size,
        label: Some(node.label.clone()),
        force_label: false,
        z_index: 0,
    }
}

/// Display-time attributes of `node` under `selection`; the store is never touched.
pub fn node_view(node: &Node, selection: &SelectionState) -> NodeView {
    let base = base_node_view(node);
    let Some(selected) = &selection.selected else {
        return base;
    };

    if node.id == selected.id {
        return NodeView {
            size: base.size * SELECTED_SIZE_FACTOR,
            force_label: true,
            z_index: 1,
            ..base
        };
    }

    if let Some(edge_color) = selected.neighbor_edge_colors.get(&node.id) {
        let color = if *edge_color == ITEM_GREEN {
            NEIGHBOR_ORANGE
        } else {
            ITEM_GREEN
        };
        return NodeView { color, ..base };
    }

    NodeView {
        color: DIMMED,
        label: None,
        z_index: -1,
        ..base
    }
}

pub fn edge_view(edge: &Edge, selection: &SelectionState) -> EdgeView {
    let base = EdgeView {
        color: edge.color,
        hidden: edge.hidden,
    };
    match &selection.selected {
        Some(selected) if !edge.touches(&selected.id) => EdgeView {
            hidden: true,
            ..base
        },
        _ => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::color::USER_BLUE;
    use crate::graph::store::tests::{item, sample_store, user};
    use crate::graph::store::{Edge, RawGraph};

    fn snapshot_views(store: &GraphStore, selection: &SelectionState) -> (Vec<NodeView>, Vec<EdgeView>) {
        (
            store.nodes().map(|node| node_view(node, selection)).collect(),
            store.edges().map(|edge| edge_view(edge, selection)).collect(),
        )
    }

    #[test]
    fn idle_views_match_base_attributes() {
        let store = sample_store();
        let selection = SelectionState::default();
        let node = store.node("user-1").expect("node exists");

        let view = node_view(node, &selection);
        assert_eq!(view.color, node.color);
        assert_eq!(view.size, node.size);
        assert_eq!(view.label.as_deref(), Some(node.label.as_str()));
        assert!(store.edges().all(|edge| !edge_view(edge, &selection).hidden));
    }

    #[test]
    fn clicked_node_is_enlarged_and_labelled() {
        let store = sample_store();
        let mut selection = SelectionState::default();
        selection.click_node(&store, "user-1");

        let node = store.node("user-1").expect("node exists");
        let view = node_view(node, &selection);
        assert_eq!(view.size, node.size * 4.0);
        assert!(view.force_label);
        assert_eq!(view.color, node.color);
    }

    #[test]
    fn neighbours_flip_the_edge_colour_and_others_dim() {
        let mut store = sample_store();
        store.set_edge_color("e0", ITEM_GREEN);
        let mut selection = SelectionState::default();
        selection.click_node(&store, "user-1");

        let via_green = node_view(store.node("item-1").expect("node"), &selection);
        let via_default = node_view(store.node("item-2").expect("node"), &selection);
        let unrelated = node_view(store.node("user-2").expect("node"), &selection);

        assert_eq!(via_green.color, NEIGHBOR_ORANGE);
        assert_eq!(via_default.color, ITEM_GREEN);
        assert_eq!(unrelated.color, DIMMED);
        assert_eq!(unrelated.label, None);
        assert!(unrelated.z_index < 0);
    }

    #[test]
    fn only_incident_edges_stay_visible() {
        let store = sample_store();
        let mut selection = SelectionState::default();
        selection.click_node(&store, "user-1");

        for edge in store.edges() {
            let view = edge_view(edge, &selection);
            assert_eq!(view.hidden, !edge.touches("user-1"), "edge {}", edge.id);
            assert_eq!(view.color, edge.color);
        }
    }

    #[test]
    fn stage_click_restores_the_exact_prior_view() {
        let store = sample_store();
        let mut selection = SelectionState::default();
        let before = snapshot_views(&store, &selection);

        selection.click_node(&store, "item-2");
        assert_ne!(snapshot_views(&store, &selection), before);

        assert!(selection.click_stage());
        assert_eq!(snapshot_views(&store, &selection), before);
        assert!(!selection.click_stage());
        assert!(selection.is_idle());
    }

    #[test]
    fn clicking_another_node_replaces_the_selection() {
        let store = sample_store();
        let mut selection = SelectionState::default();
        selection.click_node(&store, "user-1");
        selection.click_node(&store, "user-2");

        assert_eq!(selection.selected_id(), Some("user-2"));
        let item_one = node_view(store.node("item-1").expect("node"), &selection);
        assert_eq!(item_one.color, DIMMED);
    }

    #[test]
    fn unknown_node_click_is_ignored() {
        let store = sample_store();
        let mut selection = SelectionState::default();
        assert_eq!(selection.click_node(&store, "user-404"), None);
        assert!(selection.is_idle());
    }

    #[test]
    fn click_surfaces_user_id_and_history() {
        let mut person = user("user-7");
        person
            .attributes
            .insert("user_id".to_owned(), AttributeValue::Number(7.0));
        person.attributes.insert(
            "interaction_history_str".to_owned(),
            AttributeValue::Text("Heat, Alien".to_owned()),
        );
        let store = GraphStore::from_raw(RawGraph {
            nodes: vec![person, item("item-1")],
            edges: vec![Edge::new("e0", "user-7", "item-1")],
        });

        let mut selection = SelectionState::default();
        let outcome = selection.click_node(&store, "user-7").expect("node exists");
        assert_eq!(outcome.user_id.as_deref(), Some("7"));
        assert_eq!(outcome.interaction_history.as_deref(), Some("Heat, Alien"));
        assert!(selection.attributes().is_some_and(|attributes| attributes.contains_key("user_id")));

        let outcome = selection.click_node(&store, "item-1").expect("node exists");
        assert_eq!(outcome, SelectionOutcome::default());
        let user_view = node_view(store.node("user-7").expect("node"), &selection);
        assert_eq!(user_view.color, ITEM_GREEN);
        assert_ne!(user_view.color, USER_BLUE);
    }
}
