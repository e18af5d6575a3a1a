use std::collections::HashSet;

use eframe::egui::{Color32, vec2};
use log::info;

use crate::util::format_significant;

use super::color::{ITEM_GREEN, USER_BLUE};
use super::store::{AttributeValue, Edge, GraphStore, Node, NodeKind, RawGraph};

pub const MIN_K: usize = 1;
pub const MAX_K: usize = 50;

const RECS_X: f32 = 500.0;
const HISTORY_X: f32 = 1100.0;
const ROW_SPACING: f32 = 50.0;
const NODE_SIZE: f32 = 10.0;

pub fn clamp_k(k: usize) -> usize {
    k.clamp(MIN_K, MAX_K)
}

#[derive(Clone, Debug, PartialEq)]
pub struct Recommendation {
    pub label: String,
    pub item_id: String,
    pub score: f64,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ComparisonKey {
    pub dataset: String,
    pub model1: String,
    pub model2: String,
    pub k: usize,
    pub user1: String,
    pub user2: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ComparisonInput {
    pub recs1: Vec<Recommendation>,
    pub recs2: Vec<Recommendation>,
    pub hist1: Vec<String>,
    pub hist2: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Column {
    LeftHistory,
    LeftRecs,
    RightRecs,
    RightHistory,
}

impl Column {
    pub fn x(self) -> f32 {
        match self {
            Self::LeftHistory => -HISTORY_X,
            Self::LeftRecs => -RECS_X,
            Self::RightRecs => RECS_X,
            Self::RightHistory => HISTORY_X,
        }
    }

    pub fn node_id(self, row: usize) -> String {
        match self {
            Self::LeftHistory => format!("interaction-user1-{row}"),
            Self::LeftRecs => format!("user1-{row}"),
            Self::RightRecs => format!("user2-{row}"),
            Self::RightHistory => format!("interaction-user2-{row}"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ComparisonGraph {
    pub store: GraphStore,
    pub match_edges: usize,
    pub history_edges: usize,
}

pub struct ComparisonGraphBuilder {
    aspect_ratio: f32,
}

struct EdgeSet {
    edges: Vec<Edge>,
    seen: HashSet<(String, String)>,
}

impl EdgeSet {
    fn add(&mut self, source: String, target: String, color: Color32) -> bool {
        if !self.seen.insert((source.clone(), target.clone())) {
            return false;
        }
        let mut edge = Edge::new(format!("{source}->{target}"), source, target);
        edge.directed = true;
        edge.color = color;
        self.edges.push(edge);
        true
    }
}

impl ComparisonGraphBuilder {
    pub fn new(aspect_ratio: f32) -> Self {
        let aspect_ratio = if aspect_ratio.is_finite() && aspect_ratio > 0.0 {
            aspect_ratio
        } else {
            1.0
        };
        Self { aspect_ratio }
    }

    /// Vertical distance between rows; shrinks on wide viewports so the column
    /// height stays proportional to the viewport.
    pub fn row_spacing(&self) -> f32 {
        ROW_SPACING / self.aspect_ratio
    }

    fn place(&self, column: Column, row: usize, label: String, item_name: &str, color: Color32) -> Node {
        let mut node = Node::new(column.node_id(row), NodeKind::Item);
        node.position = vec2(column.x(), -(row as f32) * self.row_spacing());
        node.label = label;
        node.color = color;
        node.size = NODE_SIZE;
        node.attributes.insert(
            "item_name".to_owned(),
            AttributeValue::Text(item_name.to_owned()),
        );
        node
    }

    pub fn build(&self, input: &ComparisonInput, k: usize) -> ComparisonGraph {
        let k = clamp_k(k);
        let recs1 = &input.recs1[..input.recs1.len().min(k)];
        let recs2 = &input.recs2[..input.recs2.len().min(k)];
        let hist1 = &input.hist1[..input.hist1.len().min(k)];
        let hist2 = &input.hist2[..input.hist2.len().min(k)];

        let mut nodes = Vec::new();
        for (column, recs) in [(Column::LeftRecs, recs1), (Column::RightRecs, recs2)] {
            for (row, rec) in recs.iter().enumerate() {
                let label = format!(
                    "{} ({}, {})",
                    rec.label,
                    rec.item_id,
                    format_significant(rec.score, 6)
                );
                nodes.push(self.place(column, row, label, &rec.label, ITEM_GREEN));
            }
        }

        let mut edges = EdgeSet {
            edges: Vec::new(),
            seen: HashSet::new(),
        };

        let mut match_edges = 0usize;
        for (i, left) in recs1.iter().enumerate() {
            for (j, right) in recs2.iter().enumerate() {
                if left.label == right.label
                    && edges.add(
                        Column::LeftRecs.node_id(i),
                        Column::RightRecs.node_id(j),
                        ITEM_GREEN,
                    )
                {
                    match_edges += 1;
                }
            }
        }

        let mut history_edges = 0usize;
        if !hist1.is_empty() && !hist2.is_empty() {
            for (column, history) in [(Column::LeftHistory, hist1), (Column::RightHistory, hist2)] {
                for (row, label) in history.iter().enumerate() {
                    nodes.push(self.place(column, row, label.clone(), label, USER_BLUE));
                }
            }

            for (history_row, history_label) in hist1.iter().enumerate() {
                for rec_row in history_matches(recs1, history_label) {
                    if edges.add(
                        Column::LeftHistory.node_id(history_row),
                        Column::LeftRecs.node_id(rec_row),
                        USER_BLUE,
                    ) {
                        history_edges += 1;
                    }
                }
            }
            for (history_row, history_label) in hist2.iter().enumerate() {
                for rec_row in history_matches(recs2, history_label) {
                    if edges.add(
                        Column::RightRecs.node_id(rec_row),
                        Column::RightHistory.node_id(history_row),
                        USER_BLUE,
                    ) {
                        history_edges += 1;
                    }
                }
            }
        }

        info!(
            "comparison graph built: {} nodes, {match_edges} match edges, {history_edges} history edges",
            nodes.len()
        );

        ComparisonGraph {
            store: GraphStore::from_raw(RawGraph {
                nodes,
                edges: edges.edges,
            }),
            match_edges,
            history_edges,
        }
    }
}

fn history_matches<'a>(
    recs: &'a [Recommendation],
    history_label: &'a str,
) -> impl Iterator<Item = usize> + 'a {
    let needle = history_label.trim();
    recs.iter()
        .enumerate()
        .filter(move |(_, rec)| !needle.is_empty() && rec.label.contains(needle))
        .map(|(row, _)| row)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(label: &str, item_id: &str, score: f64) -> Recommendation {
        Recommendation {
            label: label.to_owned(),
            item_id: item_id.to_owned(),
            score,
        }
    }

    fn titles(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|label| (*label).to_owned()).collect()
    }

    fn column_len(graph: &ComparisonGraph, column: Column) -> usize {
        graph
            .store
            .nodes()
            .filter(|node| node.position.x == column.x())
            .count()
    }

    #[test]
    fn equal_labels_produce_one_match_edge() {
        let input = ComparisonInput {
            recs1: vec![rec("Matrix", "i1", 0.9)],
            recs2: vec![rec("Matrix", "i2", 0.8)],
            ..Default::default()
        };
        let graph = ComparisonGraphBuilder::new(16.0 / 9.0).build(&input, 10);

        assert_eq!(graph.match_edges, 1);
        assert_eq!(graph.store.edge_count(), 1);
        let edge = graph.store.edges().next().expect("one edge");
        assert_eq!((edge.source.as_str(), edge.target.as_str()), ("user1-0", "user2-0"));
        assert!(edge.directed);
    }

    #[test]
    fn disjoint_labels_produce_no_edges() {
        let input = ComparisonInput {
            recs1: vec![rec("Heat", "i1", 0.9), rec("Alien", "i2", 0.7)],
            recs2: vec![rec("Up", "i3", 0.8)],
            ..Default::default()
        };
        let graph = ComparisonGraphBuilder::new(1.0).build(&input, 10);

        assert_eq!(graph.match_edges, 0);
        assert_eq!(graph.store.edge_count(), 0);
        assert_eq!(graph.store.node_count(), 3);
    }

    #[test]
    fn history_matches_by_substring() {
        let input = ComparisonInput {
            recs1: vec![rec("The Matrix Reloaded", "i1", 0.5)],
            recs2: vec![rec("Heat", "i9", 0.4)],
            hist1: titles(&["Matrix"]),
            hist2: titles(&["Casino"]),
        };
        let graph = ComparisonGraphBuilder::new(1.0).build(&input, 10);

        assert_eq!(graph.history_edges, 1);
        let edge = graph
            .store
            .edge_between("interaction-user1-0", "user1-0")
            .expect("history edge");
        assert_eq!(edge.source, "interaction-user1-0");
        assert_eq!(edge.target, "user1-0");
    }

    #[test]
    fn right_history_edges_point_outwards() {
        let input = ComparisonInput {
            recs1: vec![rec("Heat", "i1", 0.5)],
            recs2: vec![rec("Alien: Resurrection", "i2", 0.4)],
            hist1: titles(&["Casino"]),
            hist2: titles(&["Alien", "Alien"]),
        };
        let graph = ComparisonGraphBuilder::new(1.0).build(&input, 10);

        assert_eq!(graph.history_edges, 2);
        for edge in graph.store.edges() {
            assert_eq!(edge.source, "user2-0");
            assert!(edge.target.starts_with("interaction-user2-"));
        }
    }

    #[test]
    fn history_columns_need_both_histories() {
        let input = ComparisonInput {
            recs1: vec![rec("Matrix", "i1", 0.5)],
            recs2: vec![rec("Matrix", "i1", 0.5)],
            hist1: titles(&["Matrix"]),
            hist2: Vec::new(),
        };
        let graph = ComparisonGraphBuilder::new(1.0).build(&input, 10);

        assert_eq!(column_len(&graph, Column::LeftHistory), 0);
        assert_eq!(graph.history_edges, 0);
        assert_eq!(graph.match_edges, 1);
    }

    #[test]
    fn blank_history_labels_match_nothing() {
        let input = ComparisonInput {
            recs1: vec![rec("Heat", "i1", 0.5)],
            recs2: vec![rec("Up", "i2", 0.4)],
            hist1: titles(&[""]),
            hist2: titles(&["  "]),
        };
        let graph = ComparisonGraphBuilder::new(1.0).build(&input, 10);

        assert_eq!(graph.history_edges, 0);
        assert_eq!(column_len(&graph, Column::LeftHistory), 1);
    }

    #[test]
    fn k_of_one_keeps_one_row_per_column() {
        let input = ComparisonInput {
            recs1: vec![rec("A", "i1", 0.9), rec("B", "i2", 0.8)],
            recs2: vec![rec("C", "i3", 0.9), rec("D", "i4", 0.8)],
            hist1: titles(&["A", "B"]),
            hist2: titles(&["C", "D"]),
        };
        let graph = ComparisonGraphBuilder::new(1.0).build(&input, 1);

        for column in [
            Column::LeftHistory,
            Column::LeftRecs,
            Column::RightRecs,
            Column::RightHistory,
        ] {
            assert_eq!(column_len(&graph, column), 1, "{column:?}");
        }
    }

    #[test]
    fn k_of_fifty_caps_columns_and_spacing_tracks_aspect() {
        let recs = (0..60)
            .map(|index| rec(&format!("Movie {index}"), &format!("i{index}"), 1.0))
            .collect::<Vec<_>>();
        let input = ComparisonInput {
            recs1: recs.clone(),
            recs2: recs,
            ..Default::default()
        };

        let wide = ComparisonGraphBuilder::new(2.0).build(&input, 80);
        assert_eq!(column_len(&wide, Column::LeftRecs), MAX_K);
        assert_eq!(column_len(&wide, Column::RightRecs), MAX_K);

        let bounds = wide.store.bounds().expect("non-empty graph");
        assert_eq!(bounds.max.y, 0.0);
        assert!((bounds.min.y + 49.0 * 25.0).abs() < 1e-3);

        let tall = ComparisonGraphBuilder::new(0.5);
        let wide = ComparisonGraphBuilder::new(2.0);
        assert!((tall.row_spacing() - 4.0 * wide.row_spacing()).abs() < 1e-3);
    }

    #[test]
    fn recommendation_labels_carry_id_and_score() {
        let input = ComparisonInput {
            recs1: vec![rec("Heat", "item-3", 0.912_345_678)],
            ..Default::default()
        };
        let graph = ComparisonGraphBuilder::new(1.0).build(&input, 5);

        let node = graph.store.node("user1-0").expect("left node");
        assert_eq!(node.label, "Heat (item-3, 0.912346)");
        assert_eq!(node.color, ITEM_GREEN);
    }
}
