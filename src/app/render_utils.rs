use eframe::egui::{self, Color32, Painter, Pos2, Rect, Stroke, Ui, Vec2, pos2, vec2};

const MIN_ZOOM: f32 = 0.01;
const MAX_ZOOM: f32 = 8.0;
const FIT_MARGIN: f32 = 0.88;

#[derive(Clone, Copy, Debug)]
pub(super) struct Camera {
    pan: Vec2,
    zoom: f32,
    fit_pending: bool,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: 1.0,
            fit_pending: true,
        }
    }
}

impl Camera {
    pub(super) fn zoom(&self) -> f32 {
        self.zoom
    }

    pub(super) fn request_fit(&mut self) {
        self.fit_pending = true;
    }

    pub(super) fn fit_if_requested(&mut self, rect: Rect, bounds: Option<Rect>) {
        if !self.fit_pending {
            return;
        }
        self.fit_pending = false;

        let Some(bounds) = bounds else {
            self.pan = Vec2::ZERO;
            self.zoom = 1.0;
            return;
        };

        let width = bounds.width().max(1.0);
        let height = bounds.height().max(1.0);
        self.zoom = ((rect.width() / width).min(rect.height() / height) * FIT_MARGIN)
            .clamp(MIN_ZOOM, MAX_ZOOM);
        let center = bounds.center();
        self.pan = -vec2(center.x, -center.y) * self.zoom;
    }

    pub(super) fn center_on(&mut self, world: Vec2) {
        self.pan = -vec2(world.x, -world.y) * self.zoom;
    }

    pub(super) fn world_to_screen(&self, rect: Rect, world: Vec2) -> Pos2 {
        rect.center() + self.pan + vec2(world.x, -world.y) * self.zoom
    }

    pub(super) fn screen_to_world(&self, rect: Rect, screen: Pos2) -> Vec2 {
        let flipped = (screen - rect.center() - self.pan) / self.zoom;
        vec2(flipped.x, -flipped.y)
    }

    pub(super) fn handle_zoom(&mut self, ui: &Ui, rect: Rect, response: &egui::Response) {
        if !response.hovered() {
            return;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return;
        }

        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .unwrap_or_else(|| rect.center());
        let world_before = self.screen_to_world(rect, pointer);

        let zoom_factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
        self.zoom = (self.zoom * zoom_factor).clamp(MIN_ZOOM, MAX_ZOOM);
        self.pan = pointer - rect.center() - vec2(world_before.x, -world_before.y) * self.zoom;
    }

    pub(super) fn handle_pan(&mut self, response: &egui::Response) {
        if response.dragged_by(egui::PointerButton::Secondary)
            || response.dragged_by(egui::PointerButton::Middle)
            || response.dragged_by(egui::PointerButton::Primary)
        {
            self.pan += response.drag_delta();
        }
    }
}

pub(super) fn draw_background(painter: &Painter, rect: Rect, camera: &Camera) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(19, 23, 29));

    let step = (56.0 * camera.zoom.clamp(0.6, 1.8)).max(20.0);
    let origin = rect.center() + camera.pan;
    let stroke = Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 70, 80, 70));

    let mut x = rect.left() + (origin.x - rect.left()).rem_euclid(step);
    while x < rect.right() {
        painter.line_segment([pos2(x, rect.top()), pos2(x, rect.bottom())], stroke);
        x += step;
    }

    let mut y = rect.top() + (origin.y - rect.top()).rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment([pos2(rect.left(), y), pos2(rect.right(), y)], stroke);
        y += step;
    }
}

pub(super) fn shape_visible(rect: Rect, position: Pos2, radius: f32) -> bool {
    !(position.x + radius < rect.left()
        || position.x - radius > rect.right()
        || position.y + radius < rect.top()
        || position.y - radius > rect.bottom())
}

pub(super) fn segment_visible(rect: Rect, start: Pos2, end: Pos2, padding: f32) -> bool {
    let min_x = start.x.min(end.x) - padding;
    let max_x = start.x.max(end.x) + padding;
    let min_y = start.y.min(end.y) - padding;
    let max_y = start.y.max(end.y) + padding;

    !(max_x < rect.left() || min_x > rect.right() || max_y < rect.top() || min_y > rect.bottom())
}

pub(super) fn draw_arrow_head(painter: &Painter, start: Pos2, end: Pos2, target_radius: f32, color: Color32) {
    let direction = end - start;
    let length = direction.length();
    if length <= target_radius + 1.0 {
        return;
    }

    let unit = direction / length;
    let tip = end - unit * target_radius;
    let size = 7.0;
    let normal = vec2(-unit.y, unit.x) * size * 0.5;
    let base = tip - unit * size;

    painter.add(egui::Shape::convex_polygon(
        vec![tip, base + normal, base - normal],
        color,
        Stroke::NONE,
    ));
}

pub(super) fn draw_unassigned_swatch(painter: &Painter, rect: Rect) {
    painter.rect_filled(rect, 3.0, Color32::from_gray(235));

    let hatch = painter.with_clip_rect(rect);
    let stroke = Stroke::new(2.0, Color32::from_gray(170));
    let mut offset = -rect.height();
    while offset < rect.width() {
        hatch.line_segment(
            [
                pos2(rect.left() + offset, rect.bottom()),
                pos2(rect.left() + offset + rect.height(), rect.top()),
            ],
            stroke,
        );
        offset += 5.0;
    }

    painter.rect_stroke(
        rect,
        3.0,
        Stroke::new(1.0, Color32::from_gray(204)),
        egui::StrokeKind::Inside,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Rect {
        Rect::from_min_size(Pos2::ZERO, vec2(800.0, 600.0))
    }

    #[test]
    fn screen_and_world_round_trip_with_flipped_y() {
        let mut camera = Camera::default();
        camera.fit_if_requested(viewport(), Some(Rect::from_min_max(pos2(-100.0, -50.0), pos2(100.0, 50.0))));

        let world = vec2(40.0, 20.0);
        let screen = camera.world_to_screen(viewport(), world);
        assert!(screen.y < viewport().center().y, "positive y is drawn above the centre");
        let back = camera.screen_to_world(viewport(), screen);
        assert!((back - world).length() < 1e-3);
    }

    #[test]
    fn fit_frames_the_bounds() {
        let mut camera = Camera::default();
        let bounds = Rect::from_min_max(pos2(1000.0, 1000.0), pos2(1400.0, 1200.0));
        camera.fit_if_requested(viewport(), Some(bounds));

        for corner in [bounds.left_top(), bounds.right_bottom()] {
            let screen = camera.world_to_screen(viewport(), corner.to_vec2());
            assert!(viewport().contains(screen), "{corner:?} off screen at {screen:?}");
        }

        camera.center_on(vec2(0.0, 0.0));
        camera.fit_if_requested(viewport(), Some(bounds));
        assert_eq!(camera.world_to_screen(viewport(), Vec2::ZERO), viewport().center());
    }
}
