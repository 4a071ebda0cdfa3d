//! Simulated AR host: a person standing in an empty room with a flat floor.
//!
//! Runtime answers are held back until the next [`TerminalHost::deliver`],
//! so they reach the viewer one tick later, like resolved promises.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::f32::consts::TAU;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use arview_core::config::ReferenceSpaceKind;
use arview_core::hit_test::reticle_mesh;
use arview_core::host::{AssetSource, SceneGraph, UiSurface, XrRuntime};
use arview_core::{
    ButtonState, Camera, EventQueue, LoadIndicator, Mesh, ModelId, ModelTemplate, NodeId, Pose,
    RotationState, SessionEpoch, SessionInit, StatusTicket, Transform, ViewerEvent,
};
use crossterm::{
    cursor::MoveTo,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
    QueueableCommand,
};
use nalgebra::{Point3, Vector3};

use crate::renderer::{AsciiRenderer, Shade, RETICLE_CHAR};

pub const EYE_HEIGHT: f32 = 1.6;
/// Furthest floor hit reported, measured along the floor
pub const HIT_RANGE: f32 = 6.0;
pub const HEADER_ROWS: u16 = 1;

const MOVE_STEP: f32 = 0.1;
const TURN_STEP: f32 = 0.05;
const MAX_PITCH: f32 = 1.4;
/// Terminal cells are roughly twice as tall as they are wide
const CELL_ASPECT: f32 = 0.5;

const SUPPORTED_FEATURES: &[&str] = &["viewer", "local", "local-floor", "hit-test", "dom-overlay"];

/// Where the simulated user stands and looks, in local-floor coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewerRig {
    pub position: Point3<f32>,
    pub yaw: f32,
    pub pitch: f32,
}

impl Default for ViewerRig {
    fn default() -> Self {
        Self {
            position: Point3::new(0.0, EYE_HEIGHT, 0.0),
            yaw: 0.0,
            pitch: -0.5,
        }
    }
}

impl ViewerRig {
    pub fn forward(&self) -> Vector3<f32> {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        Vector3::new(-sy * cp, sp, -cy * cp)
    }

    /// Move along the floor relative to the facing direction, in steps
    pub fn walk(&mut self, ahead: f32, right: f32) {
        let (sy, cy) = self.yaw.sin_cos();
        let forward = Vector3::new(-sy, 0.0, -cy);
        let side = Vector3::new(cy, 0.0, -sy);
        self.position += (forward * ahead + side * right) * MOVE_STEP;
    }

    /// Turn left (positive `yaw`) or look up (positive `pitch`), in steps
    pub fn turn(&mut self, yaw: f32, pitch: f32) {
        self.yaw = (self.yaw + yaw * TURN_STEP).rem_euclid(TAU);
        self.pitch = (self.pitch + pitch * TURN_STEP).clamp(-MAX_PITCH, MAX_PITCH);
    }
}

/// Where the forward ray meets the floor, if within reach
pub fn floor_hit(eye: &Point3<f32>, forward: &Vector3<f32>) -> Option<Point3<f32>> {
    if forward.y >= -1e-4 {
        return None;
    }
    let t = -eye.y / forward.y;
    if t <= 0.0 {
        return None;
    }
    let hit = eye + forward * t;
    let reach = Vector3::new(hit.x - eye.x, 0.0, hit.z - eye.z).norm();
    (reach <= HIT_RANGE).then_some(hit)
}

/// Express a local-floor point in `kind`. The local space starts at eye height.
fn to_space(point: Point3<f32>, kind: ReferenceSpaceKind) -> Point3<f32> {
    match kind {
        ReferenceSpaceKind::LocalFloor => point,
        ReferenceSpaceKind::Local | ReferenceSpaceKind::Viewer => {
            Point3::new(point.x, point.y - EYE_HEIGHT, point.z)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimSession {
    id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimSpace {
    pub kind: ReferenceSpaceKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimHitTestSource {
    id: u32,
}

/// Viewer pose for one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimFrame {
    pub eye: Point3<f32>,
    pub forward: Vector3<f32>,
}

#[derive(Debug, Clone)]
struct SceneNode {
    model: ModelId,
    position: Point3<f32>,
    rotation: RotationState,
}

#[derive(Debug, Clone)]
pub struct HostOptions {
    /// Behave like a device without immersive-ar
    pub supported: bool,
    /// Model urls are resolved against this directory
    pub asset_root: PathBuf,
    pub width: u16,
    pub height: u16,
}

pub struct TerminalHost {
    queue: EventQueue<TerminalHost>,
    outbox: VecDeque<ViewerEvent<TerminalHost>>,
    supported: bool,
    asset_root: PathBuf,
    pub rig: ViewerRig,
    next_id: u32,
    active: Option<(SessionEpoch, SimSession)>,
    live_sources: HashSet<u32>,
    world_kind: ReferenceSpaceKind,
    templates: HashMap<ModelId, Mesh>,
    nodes: HashMap<NodeId, SceneNode>,
    next_node: u32,
    reticle: Option<Pose>,
    reticle_mesh: Mesh,
    camera: Camera,
    renderer: AsciiRenderer,
    button: ButtonState,
    status: Option<String>,
    timers: Vec<(Instant, StatusTicket)>,
    indicators: BTreeMap<ModelId, LoadIndicator>,
    surface_hint: bool,
}

impl TerminalHost {
    pub fn new(queue: EventQueue<TerminalHost>, options: HostOptions) -> Self {
        let rows = options.height.saturating_sub(HEADER_ROWS);
        Self {
            queue,
            outbox: VecDeque::new(),
            supported: options.supported,
            asset_root: options.asset_root,
            rig: ViewerRig::default(),
            next_id: 0,
            active: None,
            live_sources: HashSet::new(),
            world_kind: ReferenceSpaceKind::Local,
            templates: HashMap::new(),
            nodes: HashMap::new(),
            next_node: 0,
            reticle: None,
            reticle_mesh: reticle_mesh(),
            camera: Camera::new(options.width as u32, rows as u32),
            renderer: AsciiRenderer::new(options.width as usize, rows as usize),
            button: ButtonState::EnterAr,
            status: None,
            timers: Vec::new(),
            indicators: BTreeMap::new(),
            surface_hint: false,
        }
    }

    /// Hand pending runtime answers and elapsed status timers to the viewer
    pub fn deliver(&mut self) {
        while let Some(event) = self.outbox.pop_front() {
            self.queue.push(event);
        }

        let now = Instant::now();
        let (due, pending): (Vec<_>, Vec<_>) = self.timers.drain(..).partition(|(at, _)| *at <= now);
        self.timers = pending;
        for (_, ticket) in due {
            self.queue.push(ViewerEvent::StatusExpired(ticket));
        }
    }

    pub fn is_presenting(&self) -> bool {
        self.active.is_some()
    }

    /// Pose data for this tick while a session runs
    pub fn current_frame(&self) -> Option<SimFrame> {
        self.active.map(|_| SimFrame {
            eye: self.rig.position,
            forward: self.rig.forward(),
        })
    }

    pub fn placed_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn header_line(&self) -> String {
        let mut parts = vec![
            format!("[{}]", self.button.label()),
            format!("placed: {}", self.nodes.len()),
        ];
        if self.is_presenting() {
            parts.push(if self.surface_hint { "surface".into() } else { "searching".into() });
        }
        for (model, indicator) in &self.indicators {
            if let LoadIndicator::Progress(fraction) = indicator {
                parts.push(format!("{} {:.0}%", model, fraction * 100.0));
            }
        }
        if let Some(status) = &self.status {
            parts.push(status.clone());
        }
        parts.join(" | ")
    }

    /// Write the header and the last rendered grid
    pub fn present<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.queue(MoveTo(0, 0))?;
        out.queue(Clear(ClearType::CurrentLine))?;
        out.queue(SetForegroundColor(Color::Yellow))?;
        let (width, _) = self.renderer.size();
        let header: String = self.header_line().chars().take(width).collect();
        out.queue(Print(header))?;
        out.queue(ResetColor)?;
        self.renderer.draw(out, HEADER_ROWS)?;
        out.flush()
    }

    fn is_live(&self, session: &SimSession) -> bool {
        matches!(self.active, Some((_, active)) if active == *session)
    }

    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

impl XrRuntime for TerminalHost {
    type Session = SimSession;
    type Space = SimSpace;
    type HitTestSource = SimHitTestSource;
    type Frame = SimFrame;

    fn check_support(&mut self) {
        self.outbox.push_back(ViewerEvent::SupportChecked {
            supported: self.supported,
        });
    }

    fn request_session(&mut self, epoch: SessionEpoch, init: &SessionInit) {
        let refusal = if !self.supported {
            Some(format!("NotSupportedError: {} is not available on this device", init.mode))
        } else if self.active.is_some() {
            Some("InvalidStateError: an immersive session is already active".to_string())
        } else {
            init.required_features
                .iter()
                .find(|f| !SUPPORTED_FEATURES.contains(&f.as_str()))
                .map(|f| format!("NotSupportedError: required feature '{}' is unavailable", f))
        };

        let event = match refusal {
            Some(reason) => ViewerEvent::SessionRejected { epoch, reason },
            None => {
                let session = SimSession { id: self.next_id() };
                self.active = Some((epoch, session));
                log::info!("simulated session {} granted", session.id);
                ViewerEvent::SessionGranted { epoch, session }
            }
        };
        self.outbox.push_back(event);
    }

    fn request_reference_space(&mut self, epoch: SessionEpoch, session: &SimSession, kind: ReferenceSpaceKind) {
        let event = if self.is_live(session) {
            ViewerEvent::ReferenceSpaceReady {
                epoch,
                kind,
                space: SimSpace { kind },
            }
        } else {
            ViewerEvent::ReferenceSpaceFailed {
                epoch,
                kind,
                reason: "InvalidStateError: session has ended".into(),
            }
        };
        self.outbox.push_back(event);
    }

    fn request_hit_test_source(&mut self, epoch: SessionEpoch, session: &SimSession, space: &SimSpace) {
        if !self.is_live(session) {
            self.outbox.push_back(ViewerEvent::HitTestSourceFailed {
                epoch,
                reason: "InvalidStateError: session has ended".into(),
            });
            return;
        }
        log::debug!("hit-test source bound to {} space", space.kind.as_str());
        let source = SimHitTestSource { id: self.next_id() };
        self.live_sources.insert(source.id);
        self.outbox.push_back(ViewerEvent::HitTestSourceReady { epoch, source });
    }

    fn use_world_space(&mut self, _session: &SimSession, space: &SimSpace) {
        self.world_kind = space.kind;
    }

    fn hit_test_results(&self, frame: &SimFrame, source: &SimHitTestSource, space: &SimSpace) -> Vec<Pose> {
        if self.active.is_none() || !self.live_sources.contains(&source.id) {
            log::warn!("hit test against released source {}", source.id);
            return Vec::new();
        }
        floor_hit(&frame.eye, &frame.forward)
            .map(|hit| Pose::from_translation(to_space(hit, space.kind)))
            .into_iter()
            .collect()
    }

    fn cancel_hit_test_source(&mut self, source: SimHitTestSource) {
        self.live_sources.remove(&source.id);
    }

    fn end_session(&mut self, session: &SimSession) {
        if let Some((epoch, active)) = self.active {
            if active == *session {
                self.active = None;
                self.outbox.push_back(ViewerEvent::SessionEnded { epoch });
            }
        }
    }
}

impl SceneGraph for TerminalHost {
    fn register_template(&mut self, template: &ModelTemplate) {
        self.templates.insert(template.id.clone(), template.mesh.clone());
    }

    fn spawn(&mut self, model: &ModelId, position: Point3<f32>) -> NodeId {
        self.next_node += 1;
        let node = NodeId(self.next_node);
        self.nodes.insert(
            node,
            SceneNode {
                model: model.clone(),
                position,
                rotation: RotationState::zero(),
            },
        );
        node
    }

    fn set_rotation(&mut self, node: NodeId, rotation: &RotationState) {
        if let Some(entry) = self.nodes.get_mut(&node) {
            entry.rotation = *rotation;
        }
    }

    fn remove(&mut self, node: NodeId) {
        self.nodes.remove(&node);
    }

    fn set_reticle(&mut self, visible: bool, pose: &Pose) {
        self.reticle = visible.then_some(*pose);
    }

    fn set_viewport(&mut self, camera: &Camera, width: u32, height: u32) {
        let rows = height.saturating_sub(HEADER_ROWS as u32);
        let mut camera = camera.clone();
        if !camera.resize(width, rows) {
            return;
        }
        camera.aspect *= CELL_ASPECT;
        self.camera = camera;
        self.renderer.resize(width as usize, rows as usize);
    }

    fn render(&mut self) {
        let eye = to_space(self.rig.position, self.world_kind);
        self.camera.look_from(eye, self.rig.forward());
        self.renderer.clear();

        for node in self.nodes.values() {
            let Some(mesh) = self.templates.get(&node.model) else {
                continue;
            };
            let model = Transform::model_matrix(&node.position, &node.rotation);
            self.renderer.render_mesh(mesh, &model, &self.camera, Shade::Lit);
        }
        if let Some(pose) = &self.reticle {
            self.renderer
                .render_mesh(&self.reticle_mesh, &pose.matrix, &self.camera, Shade::Flat(RETICLE_CHAR));
        }
    }
}

impl UiSurface for TerminalHost {
    fn set_button(&mut self, state: ButtonState) {
        self.button = state;
    }

    fn show_status(&mut self, text: &str, ticket: StatusTicket) {
        self.status = Some(text.to_string());
        let at = Instant::now() + Duration::from_millis(ticket.duration_ms as u64);
        self.timers.push((at, ticket));
    }

    fn hide_status(&mut self) {
        self.status = None;
    }

    fn set_load_indicator(&mut self, model: &ModelId, indicator: LoadIndicator) {
        self.indicators.insert(model.clone(), indicator);
    }

    fn set_surface_hint(&mut self, active: bool) {
        self.surface_hint = active;
    }
}

impl AssetSource for TerminalHost {
    fn fetch(&mut self, model: &ModelId, url: &str) {
        let path = self.asset_root.join(url);
        let event = match fs::read(&path) {
            Ok(bytes) => {
                self.outbox.push_back(ViewerEvent::AssetProgress {
                    model: model.clone(),
                    fraction: 1.0,
                });
                ViewerEvent::AssetFetched {
                    model: model.clone(),
                    bytes,
                }
            }
            Err(err) => ViewerEvent::AssetFailed {
                model: model.clone(),
                reason: format!("{}: {}", path.display(), err),
            },
        };
        self.outbox.push_back(event);
    }
}
