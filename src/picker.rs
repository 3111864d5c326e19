// picker.rs — floor / room picker: modal, floor-plan pins, pan-zoom and dropdown

use crate::catalog::{Catalog, PlanPosition, SceneKey};
use crate::i18n::{tr, tr_with};
use crate::loader::{ImageLoader, LoadError};
use egui::{pos2, vec2, Color32, Rect, Sense, Vec2};
use image::RgbaImage;
use std::collections::HashMap;

/// Viewports narrower than this (logical points) get the pan/zoom floor plan.
pub const MOBILE_BREAKPOINT: f32 = 1024.0;

/// Largest floor-plan edge uploaded as a texture.
const MAX_PLAN_EDGE: u32 = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerState {
    pub open: bool,
    pub floor: usize,
    pub dropdown_open: bool,
}

impl PickerState {
    pub fn new(floor: usize) -> Self {
        Self {
            open: true,
            floor,
            dropdown_open: true,
        }
    }

    /// Change the floor filter. Out-of-range floors are ignored.
    pub fn select_floor(&mut self, floor: usize, catalog: &Catalog) {
        if floor < catalog.floors.len() {
            self.floor = floor;
        }
    }
}

/// One row of the room list for the selected floor.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomEntry {
    pub id: String,
    pub label: String,
    pub position: Option<PlanPosition>,
    pub has_panorama: bool,
}

pub fn rooms_for_floor(catalog: &Catalog, floor: usize) -> Vec<RoomEntry> {
    let Some(f) = catalog.floor(floor) else {
        return Vec::new();
    };
    f.rooms
        .iter()
        .enumerate()
        .map(|(index, room)| RoomEntry {
            id: SceneKey::new(floor, index).to_string(),
            label: room.loc.clone(),
            position: room.position,
            has_panorama: room.has_panorama(),
        })
        .collect()
}

/// Pan/zoom state for the floor plan on narrow viewports.
///
/// `offset` is where the content's top-left sits relative to the view's
/// top-left. Panning is bounded with no padding: the content always covers
/// the view on any axis where it is larger than the view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanZoom {
    zoom: f32,
    offset: Vec2,
}

impl Default for PanZoom {
    fn default() -> Self {
        Self {
            zoom: Self::MIN_ZOOM,
            offset: Vec2::ZERO,
        }
    }
}

impl PanZoom {
    pub const MIN_ZOOM: f32 = 1.0;
    pub const MAX_ZOOM: f32 = 4.0;

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    pub fn pan(&mut self, delta: Vec2, view: Vec2, content: Vec2) {
        self.offset += delta;
        self.clamp(view, content);
    }

    /// Zoom by `factor` keeping the content point under `anchor` in place.
    pub fn zoom_at(&mut self, factor: f32, anchor: Vec2, view: Vec2, content: Vec2) {
        let new_zoom = (self.zoom * factor).clamp(Self::MIN_ZOOM, Self::MAX_ZOOM);
        let content_point = (anchor - self.offset) / self.zoom;
        self.offset = anchor - content_point * new_zoom;
        self.zoom = new_zoom;
        self.clamp(view, content);
    }

    fn clamp(&mut self, view: Vec2, content: Vec2) {
        let scaled = content * self.zoom;
        let min = (view - scaled).min(Vec2::ZERO);
        self.offset.x = self.offset.x.clamp(min.x, 0.0);
        self.offset.y = self.offset.y.clamp(min.y, 0.0);
    }

    pub fn content_rect(&self, view: Rect, content: Vec2) -> Rect {
        Rect::from_min_size(view.min + self.offset, content * self.zoom)
    }
}

/// Owns the pan/zoom controller of the floor plan currently on screen.
///
/// The controller is dropped and rebuilt whenever the floor or its plan
/// image changes, or when the viewport crosses the breakpoint; it is released
/// entirely when the picker closes.
#[derive(Debug, Default)]
pub struct FloorPlanView {
    deps: Option<(usize, String)>,
    narrow: bool,
    pan_zoom: Option<PanZoom>,
    created: u64,
}

impl FloorPlanView {
    pub fn sync(&mut self, floor: usize, denah_url: &str, viewport_width: f32) -> Option<&mut PanZoom> {
        let narrow = viewport_width < MOBILE_BREAKPOINT;
        let deps_changed = self
            .deps
            .as_ref()
            .map_or(true, |(f, url)| *f != floor || url != denah_url);

        if deps_changed || narrow != self.narrow {
            self.release();
            self.deps = Some((floor, denah_url.to_string()));
            self.narrow = narrow;
            if narrow {
                self.pan_zoom = Some(PanZoom::default());
                self.created += 1;
                log::debug!("floor-plan pan/zoom attached for floor {}", floor);
            }
        }
        self.pan_zoom.as_mut()
    }

    pub fn release(&mut self) {
        if self.pan_zoom.take().is_some() {
            log::debug!("floor-plan pan/zoom released");
        }
        self.deps = None;
    }

    pub fn is_active(&self) -> bool {
        self.pan_zoom.is_some()
    }

    /// How many controllers have been created so far.
    pub fn created(&self) -> u64 {
        self.created
    }
}

pub enum PlanImage {
    Loading,
    Ready(egui::TextureHandle),
    Failed(String),
}

/// Floor-plan textures by catalog reference, loaded on first use.
#[derive(Default)]
pub struct FloorPlans {
    images: HashMap<String, PlanImage>,
}

impl FloorPlans {
    pub fn get(&mut self, url: &str, loader: &ImageLoader) -> &PlanImage {
        self.images.entry(url.to_string()).or_insert_with(|| {
            loader.request_floor_plan(url);
            PlanImage::Loading
        })
    }

    pub fn finish(&mut self, ctx: &egui::Context, url: &str, result: Result<RgbaImage, LoadError>) {
        let entry = match result {
            Ok(img) => {
                let img = fit_plan(img);
                let size = [img.width() as usize, img.height() as usize];
                let color = egui::ColorImage::from_rgba_unmultiplied(size, img.as_raw());
                let handle = ctx.load_texture(format!("floorplan:{url}"), color, egui::TextureOptions::LINEAR);
                PlanImage::Ready(handle)
            }
            Err(e) => {
                log::error!("floor plan {}: {}", url, e);
                PlanImage::Failed(e.to_string())
            }
        };
        self.images.insert(url.to_string(), entry);
    }
}

fn fit_plan(img: RgbaImage) -> RgbaImage {
    let (w, h) = img.dimensions();
    if w <= MAX_PLAN_EDGE && h <= MAX_PLAN_EDGE {
        return img;
    }
    let scale = MAX_PLAN_EDGE as f32 / w.max(h) as f32;
    let (nw, nh) = ((w as f32 * scale) as u32, (h as f32 * scale) as u32);
    image::imageops::resize(&img, nw.max(1), nh.max(1), image::imageops::FilterType::Triangle)
}

/// Top-left of a pin placed by percentage coordinates inside `plan`.
pub fn pin_origin(plan: Rect, position: PlanPosition) -> egui::Pos2 {
    pos2(
        plan.min.x + plan.width() * position.x / 100.0,
        plan.min.y + plan.height() * position.y / 100.0,
    )
}

/// The "choose a room" modal. Returns the scene id the user clicked.
pub fn show_modal(
    ctx: &egui::Context,
    state: &mut PickerState,
    catalog: &Catalog,
    plans: &mut FloorPlans,
    plan_view: &mut FloorPlanView,
    loader: &ImageLoader,
) -> Option<String> {
    if !state.open {
        plan_view.release();
        return None;
    }

    let screen = ctx.screen_rect();
    let mut clicked = None;

    // Backdrop: dims the panorama and swallows its input while the modal is up.
    egui::CentralPanel::default()
        .frame(egui::Frame::none().fill(Color32::from_black_alpha(128)))
        .show(ctx, |ui| {
            ui.allocate_rect(ui.max_rect(), Sense::click_and_drag());
        });

    let mut open = true;
    egui::Window::new(tr("picker.title"))
        .id(egui::Id::new("picker_modal"))
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .fixed_size(vec2(screen.width() * 7.0 / 8.0, screen.height() * 0.8))
        .open(&mut open)
        .show(ctx, |ui| {
            ui.horizontal_wrapped(|ui| {
                for (index, floor) in catalog.floors.iter().enumerate() {
                    let button = egui::Button::new(floor.name.as_str())
                        .selected(index == state.floor)
                        .min_size(vec2(ui.available_width().min(160.0), 32.0));
                    if ui.add(button).clicked() {
                        state.select_floor(index, catalog);
                    }
                }
            });
            ui.add_space(12.0);

            let Some(floor) = catalog.floor(state.floor) else {
                return;
            };
            let rooms = rooms_for_floor(catalog, state.floor);
            let pan_zoom = plan_view.sync(state.floor, &floor.denah_url, screen.width());

            let plan = plans.get(&floor.denah_url, loader);
            match (plan, pan_zoom) {
                (PlanImage::Ready(texture), Some(pan_zoom)) => {
                    ui.label(egui::RichText::new(tr("picker.pan_hint")).weak());
                    if let Some(id) = pan_zoom_plan(ui, texture, pan_zoom, &rooms, screen) {
                        clicked = Some(id);
                    }
                    if let Some(id) = unpinned_rooms(ui, &rooms) {
                        clicked = Some(id);
                    }
                }
                (PlanImage::Ready(texture), None) => {
                    egui::ScrollArea::vertical().show(ui, |ui| {
                        if let Some(id) = static_plan(ui, texture, &rooms) {
                            clicked = Some(id);
                        }
                        if let Some(id) = unpinned_rooms(ui, &rooms) {
                            clicked = Some(id);
                        }
                    });
                }
                (PlanImage::Loading, _) => {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label(tr("floorplan.loading"));
                    });
                    if let Some(id) = unpinned_rooms(ui, &rooms) {
                        clicked = Some(id);
                    }
                }
                (PlanImage::Failed(err), _) => {
                    ui.colored_label(Color32::LIGHT_RED, tr("floorplan.failed"))
                        .on_hover_text(err.as_str());
                    if let Some(id) = unpinned_rooms(ui, &rooms) {
                        clicked = Some(id);
                    }
                }
            }
        });

    if !open {
        state.open = false;
    }
    clicked
}

fn plan_size(texture: &egui::TextureHandle, width: f32) -> Vec2 {
    let [w, h] = texture.size();
    vec2(width, width * h as f32 / w.max(1) as f32)
}

fn static_plan(ui: &mut egui::Ui, texture: &egui::TextureHandle, rooms: &[RoomEntry]) -> Option<String> {
    let size = plan_size(texture, ui.available_width());
    let (rect, _) = ui.allocate_exact_size(size, Sense::hover());
    let uv = Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0));
    ui.painter().image(texture.id(), rect, uv, Color32::WHITE);
    draw_pins(ui, rect, rect, rooms, 16.0)
}

fn pan_zoom_plan(
    ui: &mut egui::Ui,
    texture: &egui::TextureHandle,
    pan_zoom: &mut PanZoom,
    rooms: &[RoomEntry],
    screen: Rect,
) -> Option<String> {
    let content = plan_size(texture, ui.available_width());
    let view_size = vec2(content.x, content.y.min(screen.height() * 0.6));
    let (view, response) = ui.allocate_exact_size(view_size, Sense::click_and_drag());

    pan_zoom.pan(response.drag_delta(), view_size, content);
    if response.hovered() {
        let (pinch, scroll, hover) = ui.input(|i| (i.zoom_delta(), i.scroll_delta.y, i.pointer.hover_pos()));
        let factor = pinch * (1.0 + scroll * 0.002);
        if (factor - 1.0).abs() > f32::EPSILON {
            let anchor = hover.map_or(view_size / 2.0, |p| p - view.min);
            pan_zoom.zoom_at(factor, anchor, view_size, content);
        }
    }

    let plan = pan_zoom.content_rect(view, content);
    let uv = Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0));
    let painter = ui.painter_at(view);
    painter.image(texture.id(), plan, uv, Color32::WHITE);
    painter.rect_stroke(view, 0.0, ui.visuals().widgets.noninteractive.bg_stroke);
    draw_pins(ui, plan, view, rooms, 8.0)
}

fn draw_pins(ui: &mut egui::Ui, plan: Rect, clip: Rect, rooms: &[RoomEntry], size: f32) -> Option<String> {
    let painter = ui.painter_at(clip);
    let mut clicked = None;

    for room in rooms {
        let Some(position) = room.position else {
            continue;
        };
        let pin = Rect::from_min_size(pin_origin(plan, position), vec2(size, size));
        if !clip.contains(pin.center()) {
            continue;
        }
        let response = ui
            .interact(pin, ui.id().with(("pin", &room.id)), Sense::click())
            .on_hover_text(room.label.as_str());
        let color = if response.hovered() {
            Color32::from_rgb(254, 202, 202)
        } else {
            Color32::from_rgb(239, 68, 68)
        };
        painter.circle_filled(pin.center(), size / 2.0, color);
        if response.clicked() {
            clicked = Some(room.id.clone());
        }
    }
    clicked
}

/// Buttons for rooms that have no pin on the plan.
fn unpinned_rooms(ui: &mut egui::Ui, rooms: &[RoomEntry]) -> Option<String> {
    let unpinned: Vec<_> = rooms.iter().filter(|r| r.position.is_none()).collect();
    if unpinned.is_empty() {
        return None;
    }

    let mut clicked = None;
    ui.add_space(8.0);
    ui.label(egui::RichText::new(tr("picker.unpinned_rooms")).strong());
    ui.horizontal_wrapped(|ui| {
        for room in unpinned {
            let text = if room.has_panorama {
                egui::RichText::new(&room.label)
            } else {
                egui::RichText::new(&room.label).weak()
            };
            let mut response = ui.button(text);
            if !room.has_panorama {
                response = response.on_hover_text(tr_with("picker.no_panorama", &[("room", room.label.clone())]));
            }
            if response.clicked() {
                clicked = Some(room.id.clone());
            }
        }
    });
    clicked
}

/// "Choose a Room" dropdown for the selected floor.
pub fn room_dropdown(
    ui: &mut egui::Ui,
    state: &mut PickerState,
    catalog: &Catalog,
    selected: Option<&str>,
) -> Option<String> {
    let header = selected.map_or_else(|| tr("picker.choose_room"), str::to_string);
    let arrow = if state.dropdown_open { "⏶" } else { "⏷" };
    let button = egui::Button::new(format!("{header}   {arrow}")).min_size(vec2(220.0, 28.0));
    if ui.add(button).clicked() {
        state.dropdown_open = !state.dropdown_open;
    }
    if !state.dropdown_open {
        return None;
    }

    let mut clicked = None;
    egui::Frame::popup(ui.style()).show(ui, |ui| {
        ui.set_width(220.0);
        egui::ScrollArea::vertical().max_height(240.0).show(ui, |ui| {
            for room in rooms_for_floor(catalog, state.floor) {
                let is_current = selected == Some(room.label.as_str());
                if ui.selectable_label(is_current, room.label.as_str()).clicked() {
                    clicked = Some(room.id);
                }
            }
        });
    });
    clicked
}

/// Floor selector used by the embedded variant in place of the modal.
pub fn floor_combo(ui: &mut egui::Ui, state: &mut PickerState, catalog: &Catalog) {
    let current = catalog
        .floor(state.floor)
        .map(|f| f.name.as_str())
        .unwrap_or_default();
    let mut floor = state.floor;
    egui::ComboBox::from_id_source("floor_combo")
        .selected_text(current)
        .show_ui(ui, |ui| {
            for (index, f) in catalog.floors.iter().enumerate() {
                ui.selectable_value(&mut floor, index, f.name.as_str());
            }
        });
    state.select_floor(floor, catalog);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const VIEW: Vec2 = Vec2 { x: 300.0, y: 200.0 };
    const CONTENT: Vec2 = Vec2 { x: 300.0, y: 400.0 };

    #[test]
    fn lantai_1_lists_nine_rooms_without_panoramas() {
        let catalog = Catalog::builtin().unwrap();
        let mut state = PickerState::new(2);
        state.select_floor(0, &catalog);
        let rooms = rooms_for_floor(&catalog, state.floor);

        assert_eq!(rooms.len(), 9);
        assert_eq!(rooms[0].label, "Lobby");
        assert_eq!(rooms[8].id, "0-8");
        assert!(rooms.iter().all(|r| !r.has_panorama));
    }

    #[test]
    fn floor_buttons_do_not_touch_the_scene_or_modal() {
        let catalog = Catalog::builtin().unwrap();
        let mut state = PickerState::new(2);
        state.select_floor(3, &catalog);
        assert_eq!(state, PickerState { open: true, floor: 3, dropdown_open: true });
        state.select_floor(17, &catalog);
        assert_eq!(state.floor, 3);
    }

    #[test]
    fn zoom_is_clamped_to_range() {
        let mut pz = PanZoom::default();
        pz.zoom_at(100.0, VIEW / 2.0, VIEW, CONTENT);
        assert_eq!(pz.zoom(), PanZoom::MAX_ZOOM);
        pz.zoom_at(0.001, VIEW / 2.0, VIEW, CONTENT);
        assert_eq!(pz.zoom(), PanZoom::MIN_ZOOM);
    }

    #[test]
    fn panning_never_leaves_a_gap() {
        let mut pz = PanZoom::default();
        pz.pan(vec2(50.0, 50.0), VIEW, CONTENT);
        assert_eq!(pz.offset(), Vec2::ZERO);

        pz.pan(vec2(-1000.0, -1000.0), VIEW, CONTENT);
        // Width fits exactly at zoom 1; height can scroll by the overflow only.
        assert_eq!(pz.offset(), vec2(0.0, -200.0));

        pz.zoom_at(2.0, Vec2::ZERO, VIEW, CONTENT);
        pz.pan(vec2(-5000.0, 0.0), VIEW, CONTENT);
        assert_eq!(pz.offset().x, VIEW.x - CONTENT.x * 2.0);
    }

    #[test]
    fn zoom_keeps_anchor_fixed() {
        let mut pz = PanZoom::default();
        let anchor = vec2(150.0, 100.0);
        pz.zoom_at(2.0, anchor, VIEW, CONTENT);
        // Content point under the anchor was (150, 100); at zoom 2 it is at
        // (300, 200) inside the content, so the offset moves by -anchor.
        assert_eq!(pz.offset(), vec2(-150.0, -100.0));
    }

    #[test]
    fn plan_controller_follows_its_dependencies() {
        let mut view = FloorPlanView::default();
        assert!(view.sync(2, "/plan3.jpeg", 1440.0).is_none());
        assert_eq!(view.created(), 0);

        assert!(view.sync(2, "/plan3.jpeg", 600.0).is_some());
        assert_eq!(view.created(), 1);

        // Same deps: the same controller survives, state included.
        view.sync(2, "/plan3.jpeg", 600.0).unwrap().pan(vec2(0.0, -50.0), VIEW, CONTENT);
        let pz = *view.sync(2, "/plan3.jpeg", 600.0).unwrap();
        assert_eq!(pz.offset(), vec2(0.0, -50.0));
        assert_eq!(view.created(), 1);

        // Floor index changes even though the plan image is shared.
        let pz = *view.sync(3, "/plan3.jpeg", 600.0).unwrap();
        assert_eq!(pz, PanZoom::default());
        assert_eq!(view.created(), 2);

        view.release();
        assert!(!view.is_active());
        view.sync(3, "/plan3.jpeg", 600.0);
        assert_eq!(view.created(), 3);
    }

    #[test]
    fn pins_use_percentage_coordinates() {
        let plan = Rect::from_min_size(pos2(10.0, 20.0), vec2(200.0, 100.0));
        let origin = pin_origin(plan, PlanPosition { x: 50.0, y: 25.0 });
        assert_eq!(origin, pos2(110.0, 45.0));
    }
}
