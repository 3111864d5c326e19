// main.rs — window, event loop and the tour UI

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod catalog;
mod config;
mod hotspots;
mod i18n;
mod layout;
mod loader;
mod picker;
mod renderer;
mod scene;
mod tour;
mod viewer;

use anyhow::Context as _;
use catalog::Catalog;
use clap::Parser;
use config::{Config, PageVariant};
use hotspots::HotspotOverlay;
use i18n::{tr, tr_with};
use layout::LayoutController;
use loader::{ImageLoader, LoadTarget};
use picker::{FloorPlanView, FloorPlans};
use renderer::Renderer;
use tour::Tour;

use winit::{
    dpi::{LogicalSize, PhysicalPosition},
    event::*,
    event_loop::{ControlFlow, EventLoop},
    window::{Fullscreen, Window, WindowBuilder},
};

use std::sync::Arc;
use std::time::Instant;

/// What the status bar says about the active panorama.
enum PanoramaStatus {
    Loading,
    Ready,
    Failed(String),
}

/// UI state that lives outside the tour itself.
struct UiState {
    plans: FloorPlans,
    plan_view: FloorPlanView,
    overlay: HotspotOverlay,
    status: PanoramaStatus,
}

/// Requests the UI makes during a frame, applied after drawing.
#[derive(Default)]
struct UiOutcome {
    switch_to: Option<String>,
    toggle_fullscreen: bool,
    language_changed: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();
    i18n::init(config.lang.clone());
    let mut current_lang = i18n::current_lang();

    let catalog = load_catalog(&config)?;

    let event_loop = EventLoop::new();
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(tr("app.title"))
            .with_inner_size(LogicalSize::new(1280, 720))
            .build(&event_loop)
            .context("cannot open the viewer window")?,
    );

    let mut renderer = pollster::block_on(Renderer::new(window.clone()))?;
    let mut layout = LayoutController::new(config.layout_delay());
    let mut tour = Tour::new(catalog, viewer_frame(config.variant, &layout, &window));
    if config.variant == PageVariant::Embedded {
        tour.picker.open = false;
    }

    let loader = ImageLoader::new(config.assets_root.clone());
    let mut ui = UiState {
        plans: FloorPlans::default(),
        plan_view: FloorPlanView::default(),
        overlay: HotspotOverlay::default(),
        status: PanoramaStatus::Ready,
    };
    if let Some(scene) = tour.active_scene() {
        loader.request_panorama(&scene.id, &scene.source);
        ui.status = PanoramaStatus::Loading;
    }

    let mut mouse_pressed = false;
    let mut cursor_pos: Option<PhysicalPosition<f64>> = None;
    let mut last_mouse_pos: Option<PhysicalPosition<f64>> = None;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;

        while let Some(loaded) = loader.try_recv() {
            match loaded.target {
                LoadTarget::Panorama { scene_id, .. } => {
                    if tour.viewer.active_id() != Some(scene_id.as_str()) {
                        continue;
                    }
                    match loaded.result {
                        Ok(img) => {
                            let max_width = tour
                                .registry
                                .find(&scene_id)
                                .map_or(scene::GEOMETRY_WIDTH, |s| s.geometry.width);
                            renderer.load_panorama(img, max_width);
                            ui.status = PanoramaStatus::Ready;
                        }
                        Err(e) => {
                            log::error!("panorama for {}: {}", scene_id, e);
                            ui.status = PanoramaStatus::Failed(e.to_string());
                        }
                    }
                }
                LoadTarget::FloorPlan { url } => {
                    ui.plans.finish(&renderer.egui_ctx, &url, loaded.result);
                }
            }
        }

        if layout.poll(Instant::now()) {
            let frame = viewer_frame(config.variant, &layout, &window);
            tour.viewer.update_size(frame);
            log::info!(
                "layout settled (fullscreen: {}), viewer now {:.0}x{:.0}",
                layout.is_fullscreen(),
                frame.width(),
                frame.height()
            );
        }

        match event {
            Event::WindowEvent { event, .. } => {
                // A release must end the drag even when it lands on a widget.
                if let WindowEvent::MouseInput {
                    state: ElementState::Released,
                    button: MouseButton::Left,
                    ..
                } = event
                {
                    mouse_pressed = false;
                    last_mouse_pos = None;
                }

                let response = renderer.egui_state.on_event(&renderer.egui_ctx, &event);
                if response.consumed {
                    return;
                }

                match event {
                    WindowEvent::CloseRequested => {
                        *control_flow = ControlFlow::Exit;
                    }

                    WindowEvent::Resized(new_size) => {
                        renderer.resize(new_size);
                        on_window_resized(&mut tour, &mut layout, config.variant, &window);
                    }

                    WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                        renderer.resize(*new_inner_size);
                        on_window_resized(&mut tour, &mut layout, config.variant, &window);
                    }

                    WindowEvent::KeyboardInput { input, .. } => {
                        if input.state == ElementState::Pressed {
                            match input.virtual_keycode {
                                Some(VirtualKeyCode::F11) => toggle_fullscreen(&mut layout, &window),
                                Some(VirtualKeyCode::Escape) => tour.picker.open = false,
                                _ => {}
                            }
                        }
                    }

                    WindowEvent::MouseInput {
                        state: ElementState::Pressed,
                        button: MouseButton::Left,
                        ..
                    } => {
                        let scale = window.scale_factor();
                        mouse_pressed = cursor_pos.is_some_and(|p| {
                            let p = p.to_logical::<f32>(scale);
                            tour.viewer.viewport().contains(egui::pos2(p.x, p.y))
                        });
                    }

                    WindowEvent::CursorMoved { position, .. } => {
                        cursor_pos = Some(position);
                        if mouse_pressed {
                            if let Some(last_pos) = last_mouse_pos {
                                let scale = window.scale_factor() as f32;
                                let dx = (position.x - last_pos.x) as f32 / scale;
                                let dy = (position.y - last_pos.y) as f32 / scale;
                                tour.viewer.drag(dx, dy);
                            }
                            last_mouse_pos = Some(position);
                        }
                    }

                    WindowEvent::CursorLeft { .. } => {
                        cursor_pos = None;
                    }

                    WindowEvent::MouseWheel { delta, .. } => {
                        let scroll = match delta {
                            MouseScrollDelta::LineDelta(_, y) => y,
                            MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 20.0,
                        };
                        tour.viewer.zoom(scroll);
                    }

                    WindowEvent::TouchpadMagnify { delta, .. } => {
                        tour.viewer.pinch(1.0 + delta as f32);
                    }

                    _ => {}
                }
            }

            Event::RedrawRequested(_) => {
                let viewport = tour.viewer.viewport();
                if let Some(view) = tour.viewer.view() {
                    let aspect = viewport.width() / viewport.height().max(1.0);
                    renderer.update_camera(view, aspect);
                }

                let mut outcome = UiOutcome::default();
                let render_result = renderer.render_with_ui(&window, viewport, |ctx| {
                    outcome = draw_ui(ctx, &mut tour, &mut ui, &loader, &config, &layout, &mut current_lang);
                });

                if let Some(id) = outcome.switch_to {
                    activate(&id, &mut tour, &loader, &mut renderer, &mut ui);
                }
                if outcome.toggle_fullscreen {
                    toggle_fullscreen(&mut layout, &window);
                }
                if outcome.language_changed {
                    i18n::init(current_lang.clone());
                    window.set_title(&tr("app.title"));
                }

                match render_result {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost) => renderer.resize(renderer.size),
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("GPU out of memory, exiting");
                        *control_flow = ControlFlow::Exit;
                    }
                    Err(e) => log::warn!("render error: {:?}", e),
                }
            }

            Event::MainEventsCleared => {
                window.request_redraw();
            }

            _ => {}
        }
    });
}

fn load_catalog(config: &Config) -> anyhow::Result<Catalog> {
    let catalog = match &config.catalog {
        Some(path) => {
            Catalog::from_path(path).with_context(|| format!("loading catalog {}", path.display()))?
        }
        None => Catalog::builtin().context("built-in catalog is malformed")?,
    };

    let problems = catalog.validate();
    for problem in &problems {
        log::warn!("catalog: {}", problem);
    }
    if config.strict_catalog && !problems.is_empty() {
        anyhow::bail!("catalog has {} broken navigation links", problems.len());
    }

    log::info!(
        "catalog: {} floors, {} rooms",
        catalog.floors.len(),
        catalog.rooms().count()
    );
    Ok(catalog)
}

/// The rectangle the viewer should occupy for the current layout, in logical points.
fn viewer_frame(variant: PageVariant, layout: &LayoutController, window: &Window) -> egui::Rect {
    let size = window.inner_size().to_logical::<f32>(window.scale_factor());
    let screen = egui::Rect::from_min_size(egui::Pos2::ZERO, egui::vec2(size.width, size.height));
    match variant {
        PageVariant::Tour => screen,
        PageVariant::Embedded => layout.frame(screen),
    }
}

/// The tour viewer follows the window at once. The embedded frame is only
/// re-measured by the layout controller once the window has settled.
fn on_window_resized(tour: &mut Tour, layout: &mut LayoutController, variant: PageVariant, window: &Window) {
    match variant {
        PageVariant::Tour => tour.viewer.update_size(viewer_frame(variant, layout, window)),
        PageVariant::Embedded => layout.schedule(Instant::now()),
    }
}

fn toggle_fullscreen(layout: &mut LayoutController, window: &Window) {
    let fullscreen = layout.toggle(Instant::now());
    window.set_fullscreen(fullscreen.then_some(Fullscreen::Borderless(None)));
}

fn activate(id: &str, tour: &mut Tour, loader: &ImageLoader, renderer: &mut Renderer, ui: &mut UiState) {
    let already_active = tour.viewer.active_id() == Some(id);
    let Some(scene) = tour.switch_scene(id) else {
        return;
    };
    if !already_active {
        renderer.clear_panorama();
        loader.request_panorama(&scene.id, &scene.source);
        ui.status = PanoramaStatus::Loading;
    }
}

fn draw_ui(
    ctx: &egui::Context,
    tour: &mut Tour,
    ui_state: &mut UiState,
    loader: &ImageLoader,
    config: &Config,
    layout: &LayoutController,
    current_lang: &mut String,
) -> UiOutcome {
    let mut outcome = UiOutcome::default();

    egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
        egui::menu::bar(ui, |ui| {
            ui.menu_button(tr("menu.view"), |ui| {
                if ui.button(tr("view.reset")).clicked() {
                    tour.viewer.reset_view();
                    ui.close_menu();
                }

                let label = if layout.is_fullscreen() {
                    tr("view.fullscreen.exit")
                } else {
                    tr("view.fullscreen.enter")
                };
                if ui.button(label).clicked() {
                    outcome.toggle_fullscreen = true;
                    ui.close_menu();
                }

                ui.separator();
                ui.menu_button(tr("view.input_sensitivity"), |ui| {
                    ui.add(
                        egui::Slider::new(&mut tour.viewer.sensitivity_scale, 0.1..=5.0)
                            .text(tr("view.multiplier")),
                    );
                    if ui.button(tr("view.reset_1_0")).clicked() {
                        tour.viewer.sensitivity_scale = 1.0;
                    }
                });
            });

            ui.menu_button(tr("menu.language"), |ui| {
                for (code, name) in i18n::LANGUAGES {
                    if ui.radio_value(current_lang, code.to_string(), name).clicked() {
                        outcome.language_changed = true;
                        ui.close_menu();
                    }
                }
            });
        });
    });

    egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
        ui.horizontal(|ui| {
            match &ui_state.status {
                PanoramaStatus::Loading => {
                    ui.label(
                        egui::RichText::new(tr("status.loading_panorama")).color(egui::Color32::YELLOW),
                    );
                    ui.label("|");
                }
                PanoramaStatus::Failed(err) => {
                    let text = tr_with(
                        "status.load_failed",
                        &[("what", "panorama".to_string()), ("err", err.clone())],
                    );
                    ui.label(egui::RichText::new(text).color(egui::Color32::LIGHT_RED));
                    ui.label("|");
                }
                PanoramaStatus::Ready => {}
            }

            match tour.active_scene() {
                Some(scene) => {
                    ui.label(format!("{} {}", tr("status.location_prefix"), scene.label));
                }
                None => {
                    ui.label(tr("status.no_scene"));
                }
            }

            if let Some(view) = tour.viewer.view() {
                ui.label("|");
                ui.label(format!("{} {:.1}°", tr("status.fov_prefix"), view.fov.to_degrees()));
                ui.label("|");
                ui.label(format!("Yaw: {:.1}°", view.yaw.to_degrees()));
                ui.label("|");
                ui.label(format!("Pitch: {:.1}°", view.pitch.to_degrees()));
            }
        });
    });

    match config.variant {
        PageVariant::Tour => {
            egui::Area::new("tour_controls")
                .fixed_pos(ctx.available_rect().min + egui::vec2(20.0, 20.0))
                .show(ctx, |ui| {
                    let open = egui::Button::new(
                        egui::RichText::new(tr("picker.open")).color(egui::Color32::WHITE),
                    )
                    .fill(egui::Color32::from_rgb(37, 99, 235))
                    .min_size(egui::vec2(104.0, 32.0));
                    if ui.add(open).clicked() {
                        tour.picker.open = true;
                    }
                    ui.add_space(24.0);
                    let selected = tour.selected_label().map(str::to_string);
                    if let Some(id) =
                        picker::room_dropdown(ui, &mut tour.picker, &tour.catalog, selected.as_deref())
                    {
                        outcome.switch_to = Some(id);
                    }
                });

            if let Some(id) = picker::show_modal(
                ctx,
                &mut tour.picker,
                &tour.catalog,
                &mut ui_state.plans,
                &mut ui_state.plan_view,
                loader,
            ) {
                outcome.switch_to = Some(id);
            }
        }
        PageVariant::Embedded => {
            let frame = layout.frame(ctx.screen_rect());
            ctx.layer_painter(egui::LayerId::background()).rect_stroke(
                frame,
                0.0,
                egui::Stroke::new(1.0, egui::Color32::GRAY),
            );

            egui::Area::new("embedded_controls")
                .fixed_pos(frame.min.max(ctx.available_rect().min) + egui::vec2(12.0, 12.0))
                .show(ctx, |ui| {
                    picker::floor_combo(ui, &mut tour.picker, &tour.catalog);
                    ui.add_space(8.0);
                    let selected = tour.selected_label().map(str::to_string);
                    if let Some(id) =
                        picker::room_dropdown(ui, &mut tour.picker, &tour.catalog, selected.as_deref())
                    {
                        outcome.switch_to = Some(id);
                    }
                });

            egui::Area::new("fullscreen_toggle")
                .fixed_pos(egui::pos2(frame.max.x - 12.0, frame.min.y.max(ctx.available_rect().min.y) + 12.0))
                .pivot(egui::Align2::RIGHT_TOP)
                .show(ctx, |ui| {
                    let icon = if layout.is_fullscreen() { "🗗" } else { "⛶" };
                    let hint = if layout.is_fullscreen() {
                        tr("view.fullscreen.exit")
                    } else {
                        tr("view.fullscreen.enter")
                    };
                    if ui.button(icon).on_hover_text(hint).clicked() {
                        outcome.toggle_fullscreen = true;
                    }
                });
        }
    }

    let modal_up = config.variant == PageVariant::Tour && tour.picker.open;
    if !modal_up {
        // Whatever the menu and status bars leave uncovered.
        let visible = ctx.available_rect();
        if let Some(scene) = tour.active_scene() {
            if let Some(target) = ui_state.overlay.show(ctx, scene, &tour.viewer, config.tooltips, visible) {
                outcome.switch_to = Some(target);
            }
        }
    }

    outcome
}
