//! Viewer state without any GPU resources.
//!
//! The presenter owns the camera, orbit controls, light, and (once loaded) the
//! scene graph with its part index. Input and load completion mutate it; the
//! renderer reads it back each frame and uploads whatever changed.

use std::collections::BTreeSet;

use glam::Vec3;
use log::{debug, error, info, warn};

use crate::camera::{self, Camera};
use crate::color::Color;
use crate::commands::ViewerCommand;
use crate::config::{PaintSpec, ViewerConfig};
use crate::error::Result;
use crate::input::KeyAction;
use crate::light::{LightStep, SphericalLight};
use crate::loader::{LoadState, LoadedModel, MeshData};
use crate::math::Aabb;
use crate::orbit::OrbitController;
use crate::scene::{PartIndex, SceneGraph, SurfaceId};

/// Whether the viewer should keep running after an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

#[derive(Debug)]
struct ReadyModel {
    scene: SceneGraph,
    parts: PartIndex,
    bounds: Aabb,
}

#[derive(Debug)]
pub struct ScenePresenter {
    camera: Camera,
    orbit: OrbitController,
    light: SphericalLight,
    ambient: Color,
    background: Color,
    palette: Vec<Color>,
    model: Option<ReadyModel>,
    load_state: LoadState,
    selected_color: Color,
    selected_part: Option<String>,
    /// Paints requested at startup, applied once the model is ready.
    startup_paints: Vec<PaintSpec>,
    dirty: bool,
    dirty_surfaces: BTreeSet<SurfaceId>,
}

impl ScenePresenter {
    pub fn new(config: &ViewerConfig) -> Self {
        let aspect = config.width as f32 / config.height.max(1) as f32;
        let camera = Camera::new(config.fov_radians(), aspect, config.near, config.far);
        let mut orbit = OrbitController::new();
        orbit.retarget(&camera);

        let mut light = SphericalLight::new(config.light_radius, config.light_step);
        light.intensity = config.light_intensity;

        Self {
            camera,
            orbit,
            light,
            ambient: config.ambient,
            background: config.background,
            palette: config.palette_colors(),
            model: None,
            load_state: LoadState::Loading,
            selected_color: Color::WHITE,
            selected_part: None,
            startup_paints: config.paints.clone(),
            dirty: true,
            dirty_surfaces: BTreeSet::new(),
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn light(&self) -> &SphericalLight {
        &self.light
    }

    pub fn ambient(&self) -> Color {
        self.ambient
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    pub fn selected_color(&self) -> Color {
        self.selected_color
    }

    pub fn selected_part(&self) -> Option<&str> {
        self.selected_part.as_deref()
    }

    pub fn scene(&self) -> Option<&SceneGraph> {
        self.model.as_ref().map(|m| &m.scene)
    }

    pub fn part_names(&self) -> &[String] {
        self.model.as_ref().map(|m| m.parts.names()).unwrap_or(&[])
    }

    pub fn surface_color(&self, id: SurfaceId) -> Option<Color> {
        self.scene()
            .and_then(|s| s.surface(id))
            .map(|s| s.material.base_color)
    }

    /// Take over a finished load.
    ///
    /// On success the scene is indexed, the camera framed on its bounds, startup
    /// paints applied, and the geometry handed back for upload. On failure the
    /// viewer stays without a model.
    pub fn on_model_loaded(&mut self, result: Result<LoadedModel>) -> Option<Vec<MeshData>> {
        let model = match result {
            Ok(model) => model,
            Err(e) => {
                error!("{e}; continuing without a model");
                self.load_state = LoadState::Failed(e.to_string());
                return None;
            }
        };

        let LoadedModel {
            scene,
            meshes,
            bounds,
        } = model;
        let parts = PartIndex::build(&scene);
        let bounds = bounds.unwrap_or_else(|| {
            warn!("model has no geometry, framing the origin");
            Aabb::point(Vec3::ZERO)
        });

        self.load_state = LoadState::Ready {
            parts: parts.len(),
            surfaces: scene.surfaces().len(),
        };
        info!(
            "model ready: {} parts, {} surfaces, extent {:?}",
            parts.len(),
            scene.surfaces().len(),
            bounds.size()
        );
        self.model = Some(ReadyModel {
            scene,
            parts,
            bounds,
        });

        self.frame_model();
        for spec in std::mem::take(&mut self.startup_paints) {
            self.paint(&spec.part, spec.color);
        }
        self.dirty = true;
        Some(meshes)
    }

    /// Point the camera at the loaded model. No-op before the model is ready.
    pub fn frame_model(&mut self) {
        let Some(model) = &self.model else {
            debug!("frame requested before the model is ready");
            return;
        };
        let framing = camera::fit_to_bounds(&model.bounds, self.camera.fov_y);
        self.camera.apply_framing(framing);
        self.orbit.retarget(&self.camera);
        self.dirty = true;
    }

    /// Make `color` current and paint every surface of part `name` with it.
    ///
    /// Returns the number of surfaces changed. Unknown names and calls made
    /// before the model is ready change nothing.
    pub fn paint(&mut self, name: &str, color: Color) -> usize {
        self.selected_color = color;
        let Some(model) = self.model.as_mut() else {
            debug!("paint '{name}' ignored, model not ready");
            return 0;
        };

        let mut changed = 0;
        for &surface in model.parts.surfaces(name) {
            if model.scene.set_surface_color(surface, color) {
                self.dirty_surfaces.insert(surface);
                changed += 1;
            }
        }
        if changed == 0 {
            debug!("paint '{name}' matched no surfaces");
        } else {
            debug!("painted {changed} surface(s) of '{name}' {color}");
            self.dirty = true;
        }
        changed
    }

    pub fn step_light(&mut self, step: LightStep) {
        self.light.apply(step);
        self.dirty = true;
    }

    /// Advance the selection to the next part name, wrapping around.
    pub fn select_next_part(&mut self) -> Option<&str> {
        let names = self.part_names();
        if names.is_empty() {
            return None;
        }
        let next = match &self.selected_part {
            Some(current) => names
                .iter()
                .position(|n| n == current)
                .map_or(0, |i| (i + 1) % names.len()),
            None => 0,
        };
        let name = names[next].clone();
        info!("selected part '{name}'");
        self.selected_part = Some(name);
        self.selected_part.as_deref()
    }

    pub fn select_part(&mut self, name: &str) {
        if self.model.as_ref().is_some_and(|m| !m.parts.contains(name)) {
            warn!("part '{name}' is not in the model");
        }
        self.selected_part = Some(name.to_string());
    }

    /// Pick palette slot `slot` and paint the selected part with it.
    pub fn pick_palette(&mut self, slot: usize) -> usize {
        let Some(&color) = self.palette.get(slot) else {
            debug!("palette slot {} is empty", slot + 1);
            return 0;
        };
        self.selected_color = color;
        match self.selected_part.clone() {
            Some(part) => self.paint(&part, color),
            None => {
                info!("color {color} selected, press Tab to choose a part");
                0
            }
        }
    }

    pub fn apply_key(&mut self, action: KeyAction) -> Flow {
        match action {
            KeyAction::Light(step) => self.step_light(step),
            KeyAction::NextPart => {
                self.select_next_part();
            }
            KeyAction::Palette(slot) => {
                self.pick_palette(slot);
            }
            KeyAction::Frame => self.frame_model(),
            KeyAction::Quit => return Flow::Exit,
        }
        Flow::Continue
    }

    pub fn apply_command(&mut self, command: ViewerCommand) -> Flow {
        match command {
            ViewerCommand::Paint { part, color } => {
                self.paint(&part, color);
            }
            ViewerCommand::SelectColor(color) => self.selected_color = color,
            ViewerCommand::SelectPart(part) => self.select_part(&part),
            ViewerCommand::Light(step) => self.step_light(step),
            ViewerCommand::Frame => self.frame_model(),
            ViewerCommand::ListParts => {
                if self.load_state.is_ready() {
                    info!("parts: {}", self.part_names().join(", "));
                } else {
                    info!("no parts yet ({:?})", self.load_state);
                }
            }
            ViewerCommand::Quit => return Flow::Exit,
        }
        Flow::Continue
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.camera.set_viewport(width, height);
        self.dirty = true;
    }

    pub fn set_dragging(&mut self, dragging: bool) {
        self.orbit.set_dragging(dragging);
    }

    pub fn cursor_moved(&mut self, x: f64, y: f64) {
        self.orbit.cursor_moved(x, y);
    }

    pub fn scroll(&mut self, lines: f32) {
        self.orbit.zoom(lines);
    }

    /// Advance damped camera motion by one frame.
    pub fn update(&mut self) {
        if self.orbit.update(&mut self.camera) {
            self.dirty = true;
        }
    }

    pub fn needs_redraw(&self) -> bool {
        self.dirty || self.orbit.is_moving()
    }

    pub fn mark_drawn(&mut self) {
        self.dirty = false;
    }

    /// Surfaces whose color changed since the last call.
    pub fn take_dirty_surfaces(&mut self) -> Vec<SurfaceId> {
        std::mem::take(&mut self.dirty_surfaces).into_iter().collect()
    }
}
