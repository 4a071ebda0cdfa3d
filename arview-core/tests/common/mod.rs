#![allow(dead_code)]

use std::cell::Cell;
use std::collections::HashMap;

use arview_core::config::{DecoderKind, ReferenceSpaceKind};
use arview_core::{
    ArModelViewer, ButtonState, Camera, EventQueue, LoadIndicator, ModelId, ModelTemplate, NodeId,
    Pose, RotationState, SessionEpoch, SessionInit, StatusTicket, ViewerConfig, ViewerEvent,
};
use arview_core::host::{AssetSource, SceneGraph, UiSurface, XrRuntime};
use nalgebra::Point3;

#[derive(Debug, Clone)]
pub struct MockNode {
    pub model: ModelId,
    pub position: Point3<f32>,
    pub rotation: RotationState,
}

/// Records every call the viewer makes. Sessions are numbered by epoch,
/// hit-test sources by a counter, and a frame is just the hit list to report.
#[derive(Default)]
pub struct MockHost {
    pub calls: Vec<String>,
    pub hit_queries: Cell<usize>,
    pub last_epoch: Option<SessionEpoch>,
    pub button: Option<ButtonState>,
    pub status: Option<(String, StatusTicket)>,
    /// Every text passed to `show_status`, oldest first
    pub shown: Vec<String>,
    pub reticle: Option<(bool, Pose)>,
    pub surface_hint: bool,
    pub templates: Vec<ModelId>,
    pub nodes: HashMap<NodeId, MockNode>,
    pub indicators: HashMap<ModelId, LoadIndicator>,
    pub fetches: Vec<(ModelId, String)>,
    pub cancelled: Vec<u32>,
    pub viewport: Option<(u32, u32)>,
    pub renders: usize,
    next_node: u32,
}

impl XrRuntime for MockHost {
    type Session = u64;
    type Space = ReferenceSpaceKind;
    type HitTestSource = u32;
    type Frame = Vec<Pose>;

    fn check_support(&mut self) {
        self.calls.push("check-support".into());
    }

    fn request_session(&mut self, epoch: SessionEpoch, init: &SessionInit) {
        self.calls.push(format!("request-session {}", init.mode));
        self.last_epoch = Some(epoch);
    }

    fn request_reference_space(&mut self, _: SessionEpoch, _: &u64, kind: ReferenceSpaceKind) {
        self.calls.push(format!("request-space {}", kind.as_str()));
    }

    fn request_hit_test_source(&mut self, _: SessionEpoch, _: &u64, space: &ReferenceSpaceKind) {
        self.calls.push(format!("request-hit-test {}", space.as_str()));
    }

    fn use_world_space(&mut self, _: &u64, space: &ReferenceSpaceKind) {
        self.calls.push(format!("use-world {}", space.as_str()));
    }

    fn hit_test_results(&self, frame: &Vec<Pose>, _: &u32, _: &ReferenceSpaceKind) -> Vec<Pose> {
        self.hit_queries.set(self.hit_queries.get() + 1);
        frame.clone()
    }

    fn cancel_hit_test_source(&mut self, source: u32) {
        self.calls.push(format!("cancel {}", source));
        self.cancelled.push(source);
    }

    fn end_session(&mut self, session: &u64) {
        self.calls.push(format!("end {}", session));
    }
}

impl SceneGraph for MockHost {
    fn register_template(&mut self, template: &ModelTemplate) {
        self.templates.push(template.id.clone());
    }

    fn spawn(&mut self, model: &ModelId, position: Point3<f32>) -> NodeId {
        self.next_node += 1;
        let node = NodeId(self.next_node);
        self.nodes.insert(
            node,
            MockNode {
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
        self.reticle = Some((visible, *pose));
    }

    fn set_viewport(&mut self, _: &Camera, width: u32, height: u32) {
        self.viewport = Some((width, height));
    }

    fn render(&mut self) {
        self.renders += 1;
    }
}

impl UiSurface for MockHost {
    fn set_button(&mut self, state: ButtonState) {
        self.button = Some(state);
    }

    fn show_status(&mut self, text: &str, ticket: StatusTicket) {
        self.status = Some((text.to_string(), ticket));
        self.shown.push(text.to_string());
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

impl AssetSource for MockHost {
    fn fetch(&mut self, model: &ModelId, url: &str) {
        self.fetches.push((model.clone(), url.to_string()));
    }
}

/// A viewer over [`MockHost`] plus a handle to its queue
pub struct Harness {
    pub viewer: ArModelViewer<MockHost>,
    pub queue: EventQueue<MockHost>,
}

pub fn placeholder_config() -> ViewerConfig {
    ViewerConfig {
        decoder: DecoderKind::Placeholder,
        seed: Some(1),
        ..ViewerConfig::default()
    }
}

impl Harness {
    pub fn new(config: ViewerConfig) -> Self {
        let queue = EventQueue::new();
        let mut viewer = ArModelViewer::new(config, MockHost::default(), queue.clone())
            .expect("valid config");
        viewer.start();
        Self { viewer, queue }
    }

    pub fn host(&self) -> &MockHost {
        self.viewer.host()
    }

    pub fn send(&mut self, event: ViewerEvent<MockHost>) {
        self.queue.push(event);
        self.viewer.pump();
    }

    pub fn load(&mut self, id: &str) {
        self.send(ViewerEvent::AssetFetched {
            model: ModelId::from(id),
            bytes: Vec::new(),
        });
    }

    pub fn fail(&mut self, id: &str, reason: &str) {
        self.send(ViewerEvent::AssetFailed {
            model: ModelId::from(id),
            reason: reason.to_string(),
        });
    }

    pub fn request(&mut self) -> SessionEpoch {
        self.send(ViewerEvent::TogglePressed);
        self.host().last_epoch.expect("session requested")
    }

    /// Request, grant and finish negotiation of a session with hit-test source `source`
    pub fn enter_ar(&mut self, source: u32) -> SessionEpoch {
        self.send(ViewerEvent::SupportChecked { supported: true });
        let epoch = self.request();
        self.send(ViewerEvent::SessionGranted {
            epoch,
            session: epoch.0,
        });
        self.send(ViewerEvent::ReferenceSpaceReady {
            epoch,
            kind: ReferenceSpaceKind::Viewer,
            space: ReferenceSpaceKind::Viewer,
        });
        self.send(ViewerEvent::ReferenceSpaceReady {
            epoch,
            kind: ReferenceSpaceKind::Local,
            space: ReferenceSpaceKind::Local,
        });
        self.send(ViewerEvent::HitTestSourceReady { epoch, source });
        epoch
    }

    pub fn frame(&mut self, hits: &[Pose]) {
        let frame = hits.to_vec();
        self.viewer.on_frame(Some(&frame));
    }

    pub fn select(&mut self) {
        self.send(ViewerEvent::Select);
    }

    pub fn status_text(&self) -> Option<&str> {
        self.host().status.as_ref().map(|(text, _)| text.as_str())
    }
}

pub fn hit_at(x: f32, y: f32, z: f32) -> Pose {
    Pose::from_translation(Point3::new(x, y, z))
}
