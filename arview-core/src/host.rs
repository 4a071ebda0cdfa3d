//! Seams to the host environment: AR runtime, rendering engine, UI and asset fetch.
//!
//! Asynchronous operations are fire-and-forget requests. The host performs them
//! and reports the outcome by pushing a [`ViewerEvent`](crate::event::ViewerEvent)
//! onto the viewer's queue.

use nalgebra::Point3;

use crate::config::{ReferenceSpaceKind, SessionOptions};
use crate::projection::Camera;
use crate::registry::{LoadIndicator, ModelId, ModelTemplate};
use crate::status::{ButtonState, StatusTicket};
use crate::transform::{Pose, RotationState};

/// Tags every asynchronous result with the session request it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionEpoch(pub u64);

/// Handle of a node in the host's scene graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

/// Parameters of an `immersive-ar` session request
#[derive(Debug, Clone, PartialEq)]
pub struct SessionInit {
    pub mode: &'static str,
    pub required_features: Vec<String>,
    pub optional_features: Vec<String>,
    pub dom_overlay: bool,
}

impl SessionInit {
    pub const IMMERSIVE_AR: &'static str = "immersive-ar";
}

impl From<&SessionOptions> for SessionInit {
    fn from(options: &SessionOptions) -> Self {
        let mut required_features = options.required_features.clone();
        // The world space has to be granted for the session to be usable
        let world = options.world_space.as_str().to_string();
        if options.world_space == ReferenceSpaceKind::LocalFloor
            && !required_features.contains(&world)
            && !options.optional_features.contains(&world)
        {
            required_features.push(world);
        }

        Self {
            mode: Self::IMMERSIVE_AR,
            required_features,
            optional_features: options.optional_features.clone(),
            dom_overlay: options.dom_overlay,
        }
    }
}

/// The device AR runtime (WebXR or a simulation of it)
pub trait XrRuntime {
    type Session;
    type Space;
    type HitTestSource;
    type Frame;

    /// Find out whether immersive AR is available; answers with `SupportChecked`.
    fn check_support(&mut self);

    /// Answers with `SessionGranted` or `SessionRejected`.
    fn request_session(&mut self, epoch: SessionEpoch, init: &SessionInit);

    /// Answers with `ReferenceSpaceReady` or `ReferenceSpaceFailed`.
    fn request_reference_space(
        &mut self,
        epoch: SessionEpoch,
        session: &Self::Session,
        kind: ReferenceSpaceKind,
    );

    /// Standing hit-test query along the forward ray of `space`.
    /// Answers with `HitTestSourceReady` or `HitTestSourceFailed`.
    fn request_hit_test_source(
        &mut self,
        epoch: SessionEpoch,
        session: &Self::Session,
        space: &Self::Space,
    );

    /// The space the renderer should draw in
    fn use_world_space(&mut self, session: &Self::Session, space: &Self::Space);

    /// Hit poses for this frame, nearest first, expressed in `space`.
    fn hit_test_results(
        &self,
        frame: &Self::Frame,
        source: &Self::HitTestSource,
        space: &Self::Space,
    ) -> Vec<Pose>;

    fn cancel_hit_test_source(&mut self, source: Self::HitTestSource);

    /// Ask the runtime to end the session; it confirms with `SessionEnded`.
    fn end_session(&mut self, session: &Self::Session);
}

/// The rendering engine's scene graph
pub trait SceneGraph {
    /// Make a template available for cloning
    fn register_template(&mut self, template: &ModelTemplate);

    /// Insert an independent copy of a registered template
    fn spawn(&mut self, model: &ModelId, position: Point3<f32>) -> NodeId;

    fn set_rotation(&mut self, node: NodeId, rotation: &RotationState);

    fn remove(&mut self, node: NodeId);

    fn set_reticle(&mut self, visible: bool, pose: &Pose);

    fn set_viewport(&mut self, camera: &Camera, width: u32, height: u32);

    fn render(&mut self);
}

/// On-screen affordances
pub trait UiSurface {
    fn set_button(&mut self, state: ButtonState);

    /// Show `text`; the host posts `StatusExpired(ticket)` after `ticket.duration_ms`.
    fn show_status(&mut self, text: &str, ticket: StatusTicket);

    fn hide_status(&mut self);

    fn set_load_indicator(&mut self, model: &ModelId, indicator: LoadIndicator);

    /// Whether the reticle currently sits on a detected surface
    fn set_surface_hint(&mut self, active: bool);
}

/// Static asset fetch
pub trait AssetSource {
    /// Answers with `AssetProgress`, then `AssetFetched` or `AssetFailed`.
    fn fetch(&mut self, model: &ModelId, url: &str);
}

/// Everything the viewer needs from its environment
pub trait ArHost: XrRuntime + SceneGraph + UiSurface + AssetSource {}

impl<T> ArHost for T where T: XrRuntime + SceneGraph + UiSurface + AssetSource {}
