//! Browser host: WebXR for the runtime, three.js for the scene, the DOM for UI
//! and `fetch` for assets.
//!
//! Promise-returning calls are handed to `spawn_local`; their outcome is pushed
//! onto the viewer queue, whose waker pumps the viewer.

use std::cell::RefCell;
use std::rc::Rc;

use arview_core::{
    AssetSource, ButtonState, Camera, EventQueue, LoadIndicator, ModelId, ModelTemplate, NodeId,
    Pose, ReferenceSpaceKind, RotationState, SceneGraph, SessionEpoch, SessionInit, StatusTicket,
    UiSurface, ViewerEvent, XrRuntime,
};
use js_sys::{Array, Promise, Reflect, Uint8Array};
use nalgebra::Point3;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{
    Event, HtmlButtonElement, Response, Window, XrDomOverlayInit, XrFrame, XrHitTestOptionsInit,
    XrHitTestResult, XrHitTestSource, XrReferenceSpace, XrReferenceSpaceType, XrSession,
    XrSessionInit, XrSessionMode, XrSystem,
};

use crate::bridge::SceneBridge;
use crate::dom::Overlay;

type Listener = Closure<dyn FnMut(Event)>;

const DOM_OVERLAY_FEATURE: &str = "dom-overlay";

pub struct WebHost {
    window: Window,
    queue: EventQueue<WebHost>,
    bridge: SceneBridge,
    overlay: Overlay,
    world_kind: ReferenceSpaceKind,
    /// `end` and `select` listeners of the current session
    session_listeners: Rc<RefCell<Vec<Listener>>>,
}

impl WebHost {
    pub fn new(
        window: Window,
        queue: EventQueue<WebHost>,
        bridge: SceneBridge,
        overlay: Overlay,
        world_kind: ReferenceSpaceKind,
    ) -> Self {
        Self {
            window,
            queue,
            bridge,
            overlay,
            world_kind,
            session_listeners: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn toggle_button(&self) -> &HtmlButtonElement {
        self.overlay.button()
    }

    /// `navigator.xr`, absent on browsers without WebXR
    fn xr(&self) -> Option<XrSystem> {
        let navigator = self.window.navigator();
        Reflect::get(&navigator, &JsValue::from_str("xr"))
            .ok()
            .filter(|xr| !xr.is_undefined() && !xr.is_null())
            .map(|xr| xr.unchecked_into::<XrSystem>())
    }

    fn session_options(&self, init: &SessionInit) -> XrSessionInit {
        let (required, optional) = requested_features(init);
        let options = XrSessionInit::new();
        options.set_required_features(&feature_list(&required));
        options.set_optional_features(&feature_list(&optional));
        if init.dom_overlay {
            if let Some(body) = self.window.document().and_then(|d| d.body()) {
                options.set_dom_overlay(&XrDomOverlayInit::new(&body));
            }
        }
        options
    }
}

/// Required and optional feature names for the session request. An overlay
/// root is only honoured when `dom-overlay` is among the requested features.
fn requested_features(init: &SessionInit) -> (Vec<String>, Vec<String>) {
    let required = init.required_features.clone();
    let mut optional = init.optional_features.clone();
    let overlay = DOM_OVERLAY_FEATURE.to_string();
    if init.dom_overlay && !required.contains(&overlay) && !optional.contains(&overlay) {
        optional.push(overlay);
    }
    (required, optional)
}

fn feature_list(features: &[String]) -> Array {
    features.iter().map(|f| JsValue::from_str(f)).collect()
}

fn space_type(kind: ReferenceSpaceKind) -> XrReferenceSpaceType {
    match kind {
        ReferenceSpaceKind::Viewer => XrReferenceSpaceType::Viewer,
        ReferenceSpaceKind::Local => XrReferenceSpaceType::Local,
        ReferenceSpaceKind::LocalFloor => XrReferenceSpaceType::LocalFloor,
    }
}

/// Human-readable reason from a rejected promise
fn describe(error: &JsValue) -> String {
    if let Some(error) = error.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    error
        .as_string()
        .unwrap_or_else(|| format!("{error:?}"))
}

fn report(result: Result<(), JsValue>, what: &str) {
    if let Err(err) = result {
        log::warn!("{what} failed: {}", describe(&err));
    }
}

fn install_session_listeners(
    session: &XrSession,
    epoch: SessionEpoch,
    queue: &EventQueue<WebHost>,
    listeners: &RefCell<Vec<Listener>>,
) -> Result<(), JsValue> {
    let end_queue = queue.clone();
    let on_end = Listener::new(move |_: Event| end_queue.push(ViewerEvent::SessionEnded { epoch }));
    session.add_event_listener_with_callback("end", on_end.as_ref().unchecked_ref())?;

    let select_queue = queue.clone();
    let on_select = Listener::new(move |_: Event| select_queue.push(ViewerEvent::Select));
    session.add_event_listener_with_callback("select", on_select.as_ref().unchecked_ref())?;

    // The previous session has ended by now, so its listeners can go
    *listeners.borrow_mut() = vec![on_end, on_select];
    Ok(())
}

async fn fetch_bytes(request: Promise) -> Result<Vec<u8>, String> {
    let response = JsFuture::from(request)
        .await
        .and_then(|value| value.dyn_into::<Response>())
        .map_err(|err| describe(&err))?;
    if !response.ok() {
        return Err(format!("HTTP {}", response.status()));
    }

    let buffer = response.array_buffer().map_err(|err| describe(&err))?;
    let buffer = JsFuture::from(buffer).await.map_err(|err| describe(&err))?;
    Ok(Uint8Array::new(&buffer).to_vec())
}

impl XrRuntime for WebHost {
    type Session = XrSession;
    type Space = XrReferenceSpace;
    type HitTestSource = XrHitTestSource;
    type Frame = XrFrame;

    fn check_support(&mut self) {
        let queue = self.queue.clone();
        let Some(xr) = self.xr() else {
            log::warn!("navigator.xr is unavailable");
            queue.push(ViewerEvent::SupportChecked { supported: false });
            return;
        };

        let promise = xr.is_session_supported(XrSessionMode::ImmersiveAr);
        spawn_local(async move {
            let supported = match JsFuture::from(promise).await {
                Ok(value) => value.as_bool().unwrap_or(false),
                Err(err) => {
                    log::warn!("isSessionSupported failed: {}", describe(&err));
                    false
                }
            };
            queue.push(ViewerEvent::SupportChecked { supported });
        });
    }

    fn request_session(&mut self, epoch: SessionEpoch, init: &SessionInit) {
        let Some(xr) = self.xr() else {
            self.queue.push(ViewerEvent::SessionRejected {
                epoch,
                reason: "WebXR is not available".into(),
            });
            return;
        };

        // Must run inside the click handler to keep the user activation
        let promise = xr.request_session_with_options(XrSessionMode::ImmersiveAr, &self.session_options(init));
        let queue = self.queue.clone();
        let bridge = self.bridge.clone();
        let listeners = Rc::clone(&self.session_listeners);
        let world = self.world_kind.as_str();

        spawn_local(async move {
            let session = match JsFuture::from(promise)
                .await
                .and_then(|value| value.dyn_into::<XrSession>())
            {
                Ok(session) => session,
                Err(err) => {
                    queue.push(ViewerEvent::SessionRejected {
                        epoch,
                        reason: describe(&err),
                    });
                    return;
                }
            };

            report(
                install_session_listeners(&session, epoch, &queue, &listeners),
                "session listeners",
            );
            let presenting = bridge.set_session(&session, world);
            queue.push(ViewerEvent::SessionGranted { epoch, session });

            if let Err(err) = JsFuture::from(presenting).await {
                log::error!("renderer could not present the session: {}", describe(&err));
            }
        });
    }

    fn request_reference_space(
        &mut self,
        epoch: SessionEpoch,
        session: &XrSession,
        kind: ReferenceSpaceKind,
    ) {
        let promise = session.request_reference_space(space_type(kind));
        let queue = self.queue.clone();
        spawn_local(async move {
            let event = match JsFuture::from(promise)
                .await
                .and_then(|value| value.dyn_into::<XrReferenceSpace>())
            {
                Ok(space) => ViewerEvent::ReferenceSpaceReady { epoch, kind, space },
                Err(err) => ViewerEvent::ReferenceSpaceFailed {
                    epoch,
                    kind,
                    reason: describe(&err),
                },
            };
            queue.push(event);
        });
    }

    fn request_hit_test_source(
        &mut self,
        epoch: SessionEpoch,
        session: &XrSession,
        space: &XrReferenceSpace,
    ) {
        let promise = session.request_hit_test_source(&XrHitTestOptionsInit::new(space));
        let queue = self.queue.clone();
        spawn_local(async move {
            let event = match JsFuture::from(promise)
                .await
                .and_then(|value| value.dyn_into::<XrHitTestSource>())
            {
                Ok(source) => ViewerEvent::HitTestSourceReady { epoch, source },
                Err(err) => ViewerEvent::HitTestSourceFailed {
                    epoch,
                    reason: describe(&err),
                },
            };
            queue.push(event);
        });
    }

    fn use_world_space(&mut self, _session: &XrSession, space: &XrReferenceSpace) {
        self.bridge.set_reference_space(space);
    }

    fn hit_test_results(
        &self,
        frame: &XrFrame,
        source: &XrHitTestSource,
        space: &XrReferenceSpace,
    ) -> Vec<Pose> {
        frame
            .get_hit_test_results(source)
            .iter()
            .filter_map(|value| value.dyn_into::<XrHitTestResult>().ok())
            .filter_map(|result| result.get_pose(space))
            .filter_map(|pose| Pose::from_column_major(&pose.transform().matrix()))
            .collect()
    }

    fn cancel_hit_test_source(&mut self, source: XrHitTestSource) {
        source.cancel();
    }

    fn end_session(&mut self, session: &XrSession) {
        let promise = session.end();
        spawn_local(async move {
            if let Err(err) = JsFuture::from(promise).await {
                log::warn!("session end failed: {}", describe(&err));
            }
        });
    }
}

impl SceneGraph for WebHost {
    fn register_template(&mut self, template: &ModelTemplate) {
        self.bridge.register_template(
            template.id.as_str(),
            &template.mesh.positions(),
            &template.mesh.normals(),
        );
    }

    fn spawn(&mut self, model: &ModelId, position: Point3<f32>) -> NodeId {
        NodeId(self.bridge.spawn(model.as_str(), position.x, position.y, position.z))
    }

    fn set_rotation(&mut self, node: NodeId, rotation: &RotationState) {
        self.bridge.set_rotation(node.0, rotation.x, rotation.y, rotation.z);
    }

    fn remove(&mut self, node: NodeId) {
        self.bridge.remove(node.0);
    }

    fn set_reticle(&mut self, visible: bool, pose: &Pose) {
        self.bridge.set_reticle(visible, &pose.to_column_major());
    }

    fn set_viewport(&mut self, camera: &Camera, width: u32, height: u32) {
        self.bridge.set_viewport(
            camera.fov.to_degrees(),
            camera.aspect,
            camera.near,
            camera.far,
            width,
            height,
        );
    }

    fn render(&mut self) {
        self.bridge.render();
    }
}

impl UiSurface for WebHost {
    fn set_button(&mut self, state: ButtonState) {
        report(self.overlay.set_button(state), "button update");
    }

    fn show_status(&mut self, text: &str, ticket: StatusTicket) {
        report(self.overlay.show_status(text), "status update");

        let queue = self.queue.clone();
        let expire = Closure::once_into_js(move || queue.push(ViewerEvent::StatusExpired(ticket)));
        let scheduled = self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                expire.unchecked_ref(),
                ticket.duration_ms.min(i32::MAX as u32) as i32,
            );
        report(scheduled.map(drop), "status timer");
    }

    fn hide_status(&mut self) {
        report(self.overlay.hide_status(), "status update");
    }

    fn set_load_indicator(&mut self, model: &ModelId, indicator: LoadIndicator) {
        report(self.overlay.set_load_indicator(model, indicator), "progress bar");
    }

    fn set_surface_hint(&mut self, active: bool) {
        report(self.overlay.set_surface_hint(active), "surface hint");
    }
}

impl AssetSource for WebHost {
    fn fetch(&mut self, model: &ModelId, url: &str) {
        let request = self.window.fetch_with_str(url);
        let queue = self.queue.clone();
        let model = model.clone();
        let url = url.to_string();

        spawn_local(async move {
            let event = match fetch_bytes(request).await {
                Ok(bytes) => {
                    log::debug!("fetched {url} ({} bytes)", bytes.len());
                    queue.push(ViewerEvent::AssetProgress {
                        model: model.clone(),
                        fraction: 1.0,
                    });
                    ViewerEvent::AssetFetched { model, bytes }
                }
                Err(reason) => ViewerEvent::AssetFailed {
                    model,
                    reason: format!("{url}: {reason}"),
                },
            };
            queue.push(event);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arview_core::config::SessionOptions;

    #[test]
    fn test_default_request_needs_hit_test_and_asks_for_overlay() {
        let init = SessionInit::from(&SessionOptions::default());
        let (required, optional) = requested_features(&init);
        assert_eq!(required, vec!["hit-test".to_string()]);
        assert_eq!(optional, vec!["dom-overlay".to_string()]);
    }

    #[test]
    fn test_overlay_feature_added_when_missing() {
        let options = SessionOptions {
            optional_features: Vec::new(),
            ..SessionOptions::default()
        };
        let (required, optional) = requested_features(&SessionInit::from(&options));
        assert_eq!(required, vec!["hit-test".to_string()]);
        assert_eq!(optional, vec!["dom-overlay".to_string()]);

        let options = SessionOptions {
            optional_features: Vec::new(),
            dom_overlay: false,
            ..SessionOptions::default()
        };
        let (_, optional) = requested_features(&SessionInit::from(&options));
        assert!(optional.is_empty());
    }

    #[test]
    fn test_space_type_mapping() {
        assert_eq!(space_type(ReferenceSpaceKind::Viewer), XrReferenceSpaceType::Viewer);
        assert_eq!(space_type(ReferenceSpaceKind::Local), XrReferenceSpaceType::Local);
        assert_eq!(
            space_type(ReferenceSpaceKind::LocalFloor),
            XrReferenceSpaceType::LocalFloor
        );
    }
}
