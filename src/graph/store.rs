use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use eframe::egui::{Color32, Rect, Vec2, pos2};
use log::warn;

use super::color::{DEFAULT_EDGE, ITEM_GREEN, USER_BLUE};

pub type NodeId = String;

pub const RESERVED_KEYS: [&str; 6] = ["label", "type", "size", "x", "y", "color"];

static NEXT_REVISION: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Item,
    User,
}

impl NodeKind {
    pub fn from_shape(shape: &str) -> Self {
        if shape.eq_ignore_ascii_case("circle") {
            Self::User
        } else {
            Self::Item
        }
    }

    pub fn default_color(self) -> Color32 {
        match self {
            Self::Item => ITEM_GREEN,
            Self::User => USER_BLUE,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    Text(String),
    Number(f64),
    Bool(bool),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Number(value) if value.is_finite() && value.fract() == 0.0 => {
                write!(f, "{}", *value as i64)
            }
            Self::Number(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub position: Vec2,
    pub color: Color32,
    pub size: f32,
    pub label: String,
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, kind: NodeKind) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            kind,
            position: Vec2::ZERO,
            color: kind.default_color(),
            size: 2.0,
            attributes: BTreeMap::new(),
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    pub fn filter_pair(&self) -> Option<(String, String)> {
        let feature = self.attribute("filter_feature")?.to_string();
        let query = self.attribute("filter_query")?.to_string();
        if feature.is_empty() || query.is_empty() {
            None
        } else {
            Some((feature, query))
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
    pub id: String,
    pub source: NodeId,
    pub target: NodeId,
    pub color: Color32,
    pub hidden: bool,
    pub directed: bool,
}

impl Edge {
    pub fn new(id: impl Into<String>, source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            color: DEFAULT_EDGE,
            hidden: false,
            directed: false,
        }
    }

    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }

    pub fn other_end(&self, node_id: &str) -> Option<&str> {
        if self.source == node_id {
            Some(self.target.as_str())
        } else if self.target == node_id {
            Some(self.source.as_str())
        } else {
            None
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct RawGraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

#[derive(Clone, Debug, Default)]
pub struct GraphStore {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    node_index: HashMap<NodeId, usize>,
    edge_index: HashMap<String, usize>,
    incident: Vec<Vec<usize>>,
    revision: u64,
}

impl GraphStore {
    pub fn from_raw(raw: RawGraph) -> Self {
        let mut store = Self::default();
        store.load(raw);
        store
    }

    /// Replaces every node and edge. Duplicate ids keep their first occurrence and
    /// edges with an unknown endpoint are dropped.
    pub fn load(&mut self, raw: RawGraph) {
        let mut nodes = Vec::with_capacity(raw.nodes.len());
        let mut node_index = HashMap::with_capacity(raw.nodes.len());
        for mut node in raw.nodes {
            if node_index.contains_key(&node.id) {
                warn!("duplicate node id {} ignored", node.id);
                continue;
            }
            node.attributes
                .retain(|key, _| !RESERVED_KEYS.contains(&key.as_str()));
            node_index.insert(node.id.clone(), nodes.len());
            nodes.push(node);
        }

        let mut edges = Vec::with_capacity(raw.edges.len());
        let mut edge_index = HashMap::with_capacity(raw.edges.len());
        let mut incident = vec![Vec::new(); nodes.len()];
        let mut dropped = 0usize;
        for edge in raw.edges {
            let (Some(&source), Some(&target)) =
                (node_index.get(&edge.source), node_index.get(&edge.target))
            else {
                dropped += 1;
                continue;
            };
            if edge_index.contains_key(&edge.id) {
                dropped += 1;
                continue;
            }

            let index = edges.len();
            edge_index.insert(edge.id.clone(), index);
            incident[source].push(index);
            if target != source {
                incident[target].push(index);
            }
            edges.push(edge);
        }
        if dropped > 0 {
            warn!("{dropped} edges dropped while loading graph (dangling or duplicate)");
        }

        self.nodes = nodes;
        self.edges = edges;
        self.node_index = node_index;
        self.edge_index = edge_index;
        self.incident = incident;
        self.revision = NEXT_REVISION.fetch_add(1, Ordering::Relaxed);
    }

    pub fn is_loaded(&self) -> bool {
        self.revision != 0
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.node_index.get(id).map(|&index| &self.nodes[index])
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    pub fn for_each_node(&self, mut visit: impl FnMut(&Node)) {
        self.nodes().for_each(|node| visit(node));
    }

    pub fn for_each_edge(&self, mut visit: impl FnMut(&Edge)) {
        self.edges().for_each(|edge| visit(edge));
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|node| node.id.clone()).collect()
    }

    pub fn set_node_color(&mut self, id: &str, color: Color32) -> bool {
        match self.node_index.get(id) {
            Some(&index) => {
                self.nodes[index].color = color;
                true
            }
            None => false,
        }
    }

    pub fn set_edge_color(&mut self, id: &str, color: Color32) -> bool {
        match self.edge_index.get(id) {
            Some(&index) => {
                self.edges[index].color = color;
                true
            }
            None => false,
        }
    }

    pub fn incident_edges(&self, id: &str) -> impl Iterator<Item = &Edge> {
        self.node_index
            .get(id)
            .map(|&index| self.incident[index].as_slice())
            .unwrap_or_default()
            .iter()
            .map(|&edge| &self.edges[edge])
    }

    pub fn neighbors(&self, id: &str) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.incident_edges(id)
            .filter_map(|edge| edge.other_end(id))
            .filter(|neighbor| seen.insert(*neighbor))
            .collect()
    }

    pub fn edge_between(&self, a: &str, b: &str) -> Option<&Edge> {
        self.incident_edges(a)
            .find(|edge| edge.other_end(a) == Some(b))
    }

    pub fn bounds(&self) -> Option<Rect> {
        let first = self.nodes.first()?;
        let mut rect = Rect::from_min_max(
            pos2(first.position.x, first.position.y),
            pos2(first.position.x, first.position.y),
        );
        for node in &self.nodes {
            rect.extend_with(pos2(node.position.x, node.position.y));
        }
        Some(rect)
    }
}
