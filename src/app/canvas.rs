use std::collections::HashMap;

use eframe::egui::{self, Align2, Color32, FontId, Pos2, Sense, Stroke, Ui, vec2};

use crate::graph::{GraphStore, LABEL_PURPLE, NodeKind, SelectionState, edge_view, node_view};

use super::render_utils::{
    Camera, draw_arrow_head, draw_background, segment_visible, shape_visible,
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(super) enum CanvasClick {
    #[default]
    None,
    Node(String),
    Stage,
}

struct ScreenNode<'a> {
    id: &'a str,
    kind: NodeKind,
    position: Pos2,
    radius: f32,
    color: Color32,
    label: Option<String>,
    force_label: bool,
    z_index: i8,
}

fn screen_radius(size: f32, zoom: f32) -> f32 {
    (size * 1.6 * zoom.powf(0.4)).clamp(1.5, 64.0)
}

fn hovered_node(ui: &Ui, nodes: &[ScreenNode<'_>]) -> Option<usize> {
    let pointer = ui.input(|input| input.pointer.hover_pos())?;
    nodes
        .iter()
        .enumerate()
        .filter_map(|(index, node)| {
            let distance = node.position.distance(pointer);
            (distance <= node.radius.max(4.0)).then_some((index, node.z_index, distance))
        })
        .max_by(|a, b| a.1.cmp(&b.1).then(b.2.total_cmp(&a.2)))
        .map(|(index, _, _)| index)
}

pub(super) fn draw_graph(
    ui: &mut Ui,
    store: &GraphStore,
    selection: &SelectionState,
    camera: &mut Camera,
) -> CanvasClick {
    let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
    let painter = ui.painter_at(rect);

    camera.fit_if_requested(rect, store.bounds());
    camera.handle_zoom(ui, rect, &response);
    camera.handle_pan(&response);
    draw_background(&painter, rect, camera);

    let zoom = camera.zoom();
    let mut nodes = store
        .nodes()
        .map(|node| {
            let view = node_view(node, selection);
            ScreenNode {
                id: node.id.as_str(),
                kind: node.kind,
                position: camera.world_to_screen(rect, node.position),
                radius: screen_radius(view.size, zoom),
                color: view.color,
                label: view.label,
                force_label: view.force_label,
                z_index: view.z_index,
            }
        })
        .collect::<Vec<_>>();
    nodes.sort_by_key(|node| node.z_index);

    let by_id = nodes
        .iter()
        .enumerate()
        .map(|(index, node)| (node.id, index))
        .collect::<HashMap<_, _>>();

    let edge_width = (1.0 * zoom.sqrt()).clamp(0.6, 2.4);
    store.for_each_edge(|edge| {
        let view = edge_view(edge, selection);
        if view.hidden {
            return;
        }
        let (Some(&source), Some(&target)) =
            (by_id.get(edge.source.as_str()), by_id.get(edge.target.as_str()))
        else {
            return;
        };

        let start = nodes[source].position;
        let end = nodes[target].position;
        if !segment_visible(rect, start, end, 4.0) {
            return;
        }

        painter.line_segment([start, end], Stroke::new(edge_width, view.color));
        if edge.directed {
            draw_arrow_head(&painter, start, end, nodes[target].radius, view.color);
        }
    });

    let hovered = hovered_node(ui, &nodes);
    if hovered.is_some() {
        ui.output_mut(|output| output.cursor_icon = egui::CursorIcon::PointingHand);
    }

    let font = FontId::proportional(12.0);
    for (index, node) in nodes.iter().enumerate() {
        if !shape_visible(rect, node.position, node.radius) {
            continue;
        }

        match node.kind {
            NodeKind::User => {
                painter.circle_filled(node.position, node.radius, node.color);
            }
            NodeKind::Item => {
                let square = egui::Rect::from_center_size(node.position, vec2(2.0, 2.0) * node.radius);
                painter.rect_filled(square, 0.0, node.color);
            }
        }

        let show_label = node.force_label
            || hovered == Some(index)
            || zoom > 1.35
            || node.radius > 12.0;
        if show_label && let Some(label) = &node.label {
            painter.text(
                node.position + vec2(node.radius + 5.0, 0.0),
                Align2::LEFT_CENTER,
                label,
                font.clone(),
                LABEL_PURPLE,
            );
        }
    }

    if let Some(node) = hovered.and_then(|index| nodes.get(index)) {
        painter.text(
            rect.left_top() + vec2(10.0, 10.0),
            Align2::LEFT_TOP,
            node.label.as_deref().unwrap_or(node.id),
            FontId::proportional(13.0),
            Color32::from_gray(240),
        );
    }

    if response.dragged() {
        ui.ctx().request_repaint();
    }

    if response.clicked_by(egui::PointerButton::Primary) {
        match hovered.and_then(|index| nodes.get(index)) {
            Some(node) => CanvasClick::Node(node.id.to_owned()),
            None => CanvasClick::Stage,
        }
    } else {
        CanvasClick::None
    }
}
