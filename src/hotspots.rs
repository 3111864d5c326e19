// hotspots.rs — info and navigation markers drawn over the panorama

use crate::config::TooltipMode;
use crate::scene::{HotspotKind, Scene};
use crate::viewer::Viewer;
use egui::{vec2, Color32, Pos2, Rect, Sense};
use std::collections::HashSet;

const MARKER_SIZE: f32 = 40.0;
const INFO_COLOR: Color32 = Color32::from_rgb(37, 99, 235);
const NAV_COLOR: Color32 = Color32::from_rgb(234, 88, 12);

/// Marker overlay for the active scene. Remembers which info tooltips were
/// opened by a click when tooltips are in click mode.
#[derive(Debug, Default)]
pub struct HotspotOverlay {
    pinned: HashSet<(String, usize)>,
}

impl HotspotOverlay {
    /// Draw every marker of `scene` that fits inside `visible`, the part of the
    /// screen not covered by panels. Returns the target of a clicked
    /// navigation marker.
    pub fn show(
        &mut self,
        ctx: &egui::Context,
        scene: &Scene,
        viewer: &Viewer,
        mode: TooltipMode,
        visible: Rect,
    ) -> Option<String> {
        let mut clicked = None;

        for (index, spot) in scene.hotspots.iter().enumerate() {
            let Some(center) = viewer.project(spot.yaw, spot.pitch) else {
                continue;
            };
            if !marker_fits(center, visible) {
                continue;
            }
            let id = egui::Id::new(("hotspot", scene.id.as_str(), index));

            match &spot.kind {
                HotspotKind::Info { label, description } => {
                    let response = marker(ctx, id, center, |painter, rect, hovered| {
                        let fill = if hovered { INFO_COLOR.linear_multiply(0.85) } else { INFO_COLOR };
                        painter.circle_filled(rect.center(), MARKER_SIZE / 2.0, fill);
                        painter.text(
                            rect.center(),
                            egui::Align2::CENTER_CENTER,
                            "i",
                            egui::FontId::proportional(16.0),
                            Color32::WHITE,
                        );
                    });

                    let key = (scene.id.clone(), index);
                    if mode == TooltipMode::Click && response.clicked() && !self.pinned.remove(&key) {
                        self.pinned.insert(key.clone());
                    }
                    let visible = match mode {
                        TooltipMode::Hover => response.hovered(),
                        TooltipMode::Click => self.pinned.contains(&key),
                    };
                    if visible {
                        info_tooltip(ctx, id, center, label, description);
                    }
                }
                HotspotKind::Nav { target, target_label } => {
                    let response = marker(ctx, id, center, |painter, rect, hovered| {
                        let fill = if hovered { NAV_COLOR.linear_multiply(0.85) } else { NAV_COLOR };
                        painter.circle_filled(rect.center(), MARKER_SIZE / 2.0, fill);
                        let c = rect.center();
                        let arrow = vec![c + vec2(0.0, -9.0), c + vec2(8.0, 6.0), c + vec2(-8.0, 6.0)];
                        painter.add(egui::Shape::convex_polygon(arrow, Color32::WHITE, egui::Stroke::NONE));
                    })
                    .on_hover_text(target_label.as_str());

                    if response.clicked() {
                        clicked = Some(target.clone());
                    }
                }
            }
        }
        clicked
    }
}

/// A marker is drawn only when the whole icon lies inside `visible`.
fn marker_fits(center: Pos2, visible: Rect) -> bool {
    visible.shrink(MARKER_SIZE / 2.0).contains(center)
}

fn marker(
    ctx: &egui::Context,
    id: egui::Id,
    center: Pos2,
    draw: impl FnOnce(&egui::Painter, Rect, bool),
) -> egui::Response {
    egui::Area::new(id)
        .fixed_pos(center - vec2(MARKER_SIZE, MARKER_SIZE) / 2.0)
        .show(ctx, |ui| {
            let (rect, response) = ui.allocate_exact_size(vec2(MARKER_SIZE, MARKER_SIZE), Sense::click());
            draw(ui.painter(), rect, response.hovered());
            response
        })
        .inner
}

fn info_tooltip(ctx: &egui::Context, id: egui::Id, center: Pos2, label: &str, description: &str) {
    egui::Area::new(id.with("tooltip"))
        .fixed_pos(center + vec2(MARKER_SIZE * 0.6, -MARKER_SIZE * 0.4))
        .order(egui::Order::Tooltip)
        .interactable(false)
        .show(ctx, |ui| {
            egui::Frame::popup(ui.style()).show(ui, |ui| {
                ui.set_max_width(150.0);
                ui.label(egui::RichText::new(label).strong());
                ui.label(description);
            });
        });
}
