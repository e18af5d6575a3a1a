use std::collections::HashMap;

use anyhow::{Context, Result, anyhow};
use eframe::egui::{Color32, vec2};
use log::warn;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde::Deserialize;
use serde_json::Value;

use crate::graph::{
    AttributeValue, CommunityId, Edge, Node, NodeKind, RawGraph, Recommendation, TopKAll,
    parse_hex_color,
};

use super::MetricRecord;

pub(super) fn parse_string_list(value: &Value, field: &str) -> Vec<String> {
    let Some(entries) = value.get(field).and_then(Value::as_array) else {
        warn!("response has no `{field}` list; treating it as empty");
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| match entry {
            Value::String(text) => Some(text.clone()),
            Value::Number(number) => Some(number.to_string()),
            other => {
                warn!("skipping non-string `{field}` entry {other}");
                None
            }
        })
        .collect()
}

fn json_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

pub(super) fn parse_topk_all(value: &Value) -> TopKAll {
    let Some(users) = value.as_object() else {
        warn!("top-k response is not an object; no recommendation matches applied");
        return TopKAll::new();
    };

    users
        .iter()
        .map(|(user, recommendations)| {
            let items = recommendations
                .as_array()
                .map(|entries| {
                    entries
                        .iter()
                        .filter_map(|entry| entry.get(1).and_then(json_text))
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();
            (user.clone(), items)
        })
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Number(serde_json::Number),
    Text(String),
}

impl Scalar {
    fn text(self) -> String {
        match self {
            Self::Number(number) => number.to_string(),
            Self::Text(text) => text,
        }
    }

    fn number(&self) -> Option<f64> {
        match self {
            Self::Number(number) => number.as_f64(),
            Self::Text(text) => text.trim().parse().ok(),
        }
    }
}

/// `[label, item_id, score]` as served by the recommendation endpoints.
#[derive(Debug, Deserialize)]
struct RawRecommendation(Scalar, Scalar, Scalar);

fn parse_recommendation(entry: &Value) -> Option<Recommendation> {
    let RawRecommendation(label, item_id, score) = serde_json::from_value(entry.clone()).ok()?;
    let score = score.number()?;
    Some(Recommendation {
        label: label.text(),
        item_id: item_id.text(),
        score,
    })
}

/// `{ "<user>": [[label, item_id, score], ...] }`; anything else becomes an empty list.
pub(super) fn parse_user_topk(value: &Value) -> Vec<Recommendation> {
    let Some(entries) = value
        .as_object()
        .and_then(|users| users.values().next())
        .and_then(Value::as_array)
    else {
        warn!("user top-k response is not a recommendation list; treating it as empty");
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let parsed = parse_recommendation(entry);
            if parsed.is_none() {
                warn!("skipping malformed recommendation {entry}");
            }
            parsed
        })
        .collect()
}

pub(super) fn parse_history(value: &Value) -> Vec<String> {
    parse_string_list(value, "result")
}

pub(super) fn parse_communities(value: &Value) -> HashMap<String, CommunityId> {
    let Some(nodes) = value.as_object() else {
        warn!("community response is not an object; no node will be recoloured");
        return HashMap::new();
    };

    nodes
        .iter()
        .filter_map(|(node, community)| {
            let id = match community {
                Value::Number(number) => number
                    .as_i64()
                    .or_else(|| number.as_f64().filter(|v| v.fract() == 0.0).map(|v| v as i64)),
                Value::String(text) => text.parse().ok(),
                _ => None,
            };
            id.map(|id| (node.clone(), id))
        })
        .collect()
}

/// Numeric fields of a metrics record. An `error` field is returned as `Err`.
pub(super) fn parse_metrics(value: &Value) -> std::result::Result<MetricRecord, String> {
    let Some(fields) = value.as_object() else {
        return Err("metrics response is not an object".to_owned());
    };

    if let Some(message) = fields.get("error").and_then(Value::as_str) {
        return Err(message.to_owned());
    }

    Ok(fields
        .iter()
        .filter_map(|(name, value)| value.as_f64().map(|number| (name.clone(), number)))
        .collect())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DeclaredType {
    Text,
    Number,
    Bool,
}

impl DeclaredType {
    fn from_gexf(name: &str) -> Self {
        match name {
            "integer" | "long" | "float" | "double" => Self::Number,
            "boolean" => Self::Bool,
            _ => Self::Text,
        }
    }

    fn convert(self, raw: &str) -> AttributeValue {
        match self {
            Self::Number => raw
                .parse()
                .map(AttributeValue::Number)
                .unwrap_or_else(|_| AttributeValue::Text(raw.to_owned())),
            Self::Bool => match raw {
                "true" | "True" | "1" => AttributeValue::Bool(true),
                "false" | "False" | "0" => AttributeValue::Bool(false),
                _ => AttributeValue::Text(raw.to_owned()),
            },
            Self::Text => AttributeValue::Text(raw.to_owned()),
        }
    }
}

struct NodeDraft {
    node: Node,
    shape: Option<String>,
    explicit_color: bool,
}

#[derive(Default)]
struct GexfReader {
    declarations: HashMap<String, (String, DeclaredType)>,
    attribute_class: Option<String>,
    directed: bool,
    node: Option<NodeDraft>,
    edge: Option<Edge>,
    graph: RawGraph,
}

fn attributes_of(element: &BytesStart<'_>) -> Result<HashMap<String, String>> {
    let mut attributes = HashMap::new();
    for attribute in element.attributes() {
        let attribute = attribute.context("malformed XML attribute")?;
        let key = String::from_utf8_lossy(attribute.key.local_name().as_ref()).into_owned();
        let value = attribute
            .unescape_value()
            .context("malformed XML attribute value")?
            .into_owned();
        attributes.insert(key, value);
    }
    Ok(attributes)
}

fn parse_f32(raw: Option<&String>) -> Option<f32> {
    raw.and_then(|value| value.trim().parse().ok())
}

impl GexfReader {
    fn open(&mut self, element: &BytesStart<'_>, self_closing: bool) -> Result<()> {
        let name = element.local_name();
        let attributes = attributes_of(element)?;

        match name.as_ref() {
            b"graph" => {
                self.directed = attributes
                    .get("defaultedgetype")
                    .is_some_and(|kind| kind == "directed");
            }
            b"attributes" => {
                self.attribute_class = attributes.get("class").cloned();
            }
            b"attribute" if self.attribute_class.as_deref() == Some("node") => {
                if let (Some(id), Some(title)) = (attributes.get("id"), attributes.get("title")) {
                    let declared = attributes
                        .get("type")
                        .map(|kind| DeclaredType::from_gexf(kind))
                        .unwrap_or(DeclaredType::Text);
                    self.declarations.insert(id.clone(), (title.clone(), declared));
                }
            }
            b"node" => {
                let id = attributes
                    .get("id")
                    .cloned()
                    .ok_or_else(|| anyhow!("node element without an id"))?;
                let mut node = Node::new(id, NodeKind::Item);
                if let Some(label) = attributes.get("label") {
                    node.label = label.clone();
                }
                self.node = Some(NodeDraft {
                    node,
                    shape: None,
                    explicit_color: false,
                });
            }
            b"attvalue" => {
                if let Some(draft) = self.node.as_mut()
                    && let (Some(key), Some(raw)) = (attributes.get("for"), attributes.get("value"))
                {
                    let (title, declared) = self
                        .declarations
                        .get(key)
                        .cloned()
                        .unwrap_or_else(|| (key.clone(), DeclaredType::Text));
                    draft.assign(&title, declared, raw);
                }
            }
            b"position" => {
                if let Some(draft) = self.node.as_mut() {
                    let x = parse_f32(attributes.get("x")).unwrap_or(draft.node.position.x);
                    let y = parse_f32(attributes.get("y")).unwrap_or(draft.node.position.y);
                    draft.node.position = vec2(x, y);
                }
            }
            b"size" => {
                if let Some(draft) = self.node.as_mut()
                    && let Some(size) = parse_f32(attributes.get("value"))
                {
                    draft.node.size = size;
                }
            }
            b"color" => {
                let channel = |key: &str| attributes.get(key).and_then(|v| v.trim().parse::<u8>().ok());
                if let (Some(r), Some(g), Some(b)) = (channel("r"), channel("g"), channel("b")) {
                    let color = Color32::from_rgb(r, g, b);
                    if let Some(edge) = self.edge.as_mut() {
                        edge.color = color;
                    } else if let Some(draft) = self.node.as_mut() {
                        draft.node.color = color;
                        draft.explicit_color = true;
                    }
                }
            }
            b"edge" => {
                let (Some(source), Some(target)) = (attributes.get("source"), attributes.get("target"))
                else {
                    warn!("skipping edge without endpoints");
                    return Ok(());
                };
                let id = attributes
                    .get("id")
                    .cloned()
                    .unwrap_or_else(|| format!("e{}", self.graph.edges.len()));
                let mut edge = Edge::new(id, source.clone(), target.clone());
                edge.directed = match attributes.get("type").map(String::as_str) {
                    Some("directed") => true,
                    Some("undirected") => false,
                    _ => self.directed,
                };
                self.edge = Some(edge);
            }
            _ => {}
        }

        if self_closing {
            self.close(name.as_ref());
        }
        Ok(())
    }

    fn close(&mut self, name: &[u8]) {
        match name {
            b"attributes" => self.attribute_class = None,
            b"node" => {
                if let Some(draft) = self.node.take() {
                    self.graph.nodes.push(draft.finish());
                }
            }
            b"edge" => {
                if let Some(edge) = self.edge.take() {
                    self.graph.edges.push(edge);
                }
            }
            _ => {}
        }
    }
}

impl NodeDraft {
    fn assign(&mut self, title: &str, declared: DeclaredType, raw: &str) {
        match title {
            "type" => self.shape = Some(raw.to_owned()),
            "label" => self.node.label = raw.to_owned(),
            "x" => self.node.position.x = raw.parse().unwrap_or(self.node.position.x),
            "y" => self.node.position.y = raw.parse().unwrap_or(self.node.position.y),
            "size" => self.node.size = raw.parse().unwrap_or(self.node.size),
            "color" => {
                if let Some(color) = parse_hex_color(raw) {
                    self.node.color = color;
                    self.explicit_color = true;
                }
            }
            _ => {
                self.node
                    .attributes
                    .insert(title.to_owned(), declared.convert(raw));
            }
        }
    }

    fn finish(self) -> Node {
        let mut node = self.node;
        let kind = self
            .shape
            .as_deref()
            .map(NodeKind::from_shape)
            .unwrap_or(NodeKind::Item);
        node.kind = kind;
        if !self.explicit_color {
            node.color = kind.default_color();
        }
        node
    }
}

/// Reads the subset of a GEXF document the viewer renders.
pub(super) fn parse_gexf(xml: &str) -> Result<RawGraph> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut state = GexfReader::default();

    loop {
        match reader
            .read_event()
            .with_context(|| format!("malformed graph document near byte {}", reader.buffer_position()))?
        {
            Event::Start(element) => state.open(&element, false)?,
            Event::Empty(element) => state.open(&element, true)?,
            Event::End(element) => state.close(element.local_name().as_ref()),
            Event::Eof => break,
            _ => {}
        }
    }

    if state.graph.nodes.is_empty() && !xml.contains("<nodes") && !xml.contains(":nodes") {
        return Err(anyhow!("document does not describe a graph"));
    }

    Ok(state.graph)
}
