/// ARView Core Library - AR placement logic shared by every host
///
/// This library holds the host-independent part of the viewer: session
/// lifecycle, hit-test tracking, model loading and placement, status
/// messages, and the geometry they operate on. Hosts (the browser WebXR
/// build and the terminal simulation) implement the traits in [`host`].

pub mod config;
pub mod decoder;
pub mod error;
pub mod event;
pub mod geometry;
pub mod hit_test;
pub mod host;
pub mod placement;
pub mod projection;
pub mod registry;
pub mod session;
pub mod status;
pub mod transform;
pub mod viewer;

// Re-export commonly used types
pub use config::{ModelSpec, ReferenceSpaceKind, ViewerConfig};
pub use error::{DecodeError, Result, ViewerError};
pub use event::{EventQueue, ViewerEvent};
pub use geometry::{Mesh, Triangle, Vertex};
pub use host::{ArHost, AssetSource, NodeId, SceneGraph, SessionEpoch, SessionInit, UiSurface, XrRuntime};
pub use projection::Camera;
pub use registry::{LoadIndicator, ModelId, ModelTemplate};
pub use status::{ButtonState, StatusTicket};
pub use transform::{Pose, RotationState, Transform};
pub use viewer::ArModelViewer;
