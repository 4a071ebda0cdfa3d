/// ARView Web - WebXR build of the AR model viewer
///
/// WebXR provides tracking and hit testing, three.js draws the scene and the
/// DOM carries the button, status toast and progress bars.
use std::cell::RefCell;
use std::rc::Rc;

use arview_core::hit_test::reticle_mesh;
use arview_core::{ArModelViewer, EventQueue, ViewerConfig, ViewerEvent};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Event, Window, XrFrame};

mod bridge;
mod dom;
mod host;

pub use bridge::SceneBridge;
pub use host::WebHost;

#[wasm_bindgen(start)]
pub fn main() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).map_err(|err| JsValue::from_str(&err.to_string()))?;
    Ok(())
}

type Viewer = ArModelViewer<WebHost>;

/// The running viewer. Keep it alive for as long as the page shows it:
/// dropping it detaches the button, resize and frame callbacks.
#[wasm_bindgen]
pub struct ArViewerApp {
    viewer: Rc<RefCell<Viewer>>,
    _on_toggle: Closure<dyn FnMut(Event)>,
    _on_resize: Closure<dyn FnMut(Event)>,
    _on_frame: Closure<dyn FnMut(f64, JsValue)>,
}

#[wasm_bindgen]
impl ArViewerApp {
    /// `config_json` follows the viewer configuration format; defaults apply when omitted.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<ArViewerApp, JsValue> {
        let config = match config_json {
            Some(json) => ViewerConfig::from_json(&json).map_err(to_js)?,
            None => ViewerConfig::default(),
        };
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no global window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("window has no document"))?;

        let overlay = dom::Overlay::new(&document)?;
        let bridge = SceneBridge::new();
        bridge.create_reticle(&reticle_mesh().positions());

        let queue = EventQueue::new();
        let world_kind = config.session.world_space;
        let host = WebHost::new(window.clone(), queue.clone(), bridge.clone(), overlay, world_kind);
        let toggle = host.toggle_button().clone();
        let viewer = Rc::new(RefCell::new(ArModelViewer::new(config, host, queue.clone()).map_err(to_js)?));

        // Events pushed while the viewer is busy stay queued for the pump already running
        let weak = Rc::downgrade(&viewer);
        queue.set_waker(move || {
            if let Some(viewer) = weak.upgrade() {
                if let Ok(mut viewer) = viewer.try_borrow_mut() {
                    viewer.pump();
                }
            }
        });

        // Pumped synchronously, so the session request runs with user activation
        let toggle_queue = queue.clone();
        let on_toggle = Closure::<dyn FnMut(Event)>::new(move |_: Event| {
            toggle_queue.push(ViewerEvent::TogglePressed);
        });
        toggle.add_event_listener_with_callback("click", on_toggle.as_ref().unchecked_ref())?;

        let resize_queue = queue.clone();
        let resize_window = window.clone();
        let on_resize = Closure::<dyn FnMut(Event)>::new(move |_: Event| {
            if let Some((width, height)) = window_size(&resize_window) {
                resize_queue.push(ViewerEvent::Resize { width, height });
            }
        });
        window.add_event_listener_with_callback("resize", on_resize.as_ref().unchecked_ref())?;

        let frame_viewer = Rc::downgrade(&viewer);
        let on_frame = Closure::<dyn FnMut(f64, JsValue)>::new(move |_timestamp: f64, frame: JsValue| {
            let Some(viewer) = frame_viewer.upgrade() else {
                return;
            };
            let frame = frame.dyn_into::<XrFrame>().ok();
            match viewer.try_borrow_mut() {
                Ok(mut viewer) => viewer.on_frame(frame.as_ref()),
                Err(_) => log::warn!("frame skipped, viewer busy"),
            };
        });
        bridge.set_animation_loop(on_frame.as_ref().unchecked_ref());

        if let Some((width, height)) = window_size(&window) {
            queue.push(ViewerEvent::Resize { width, height });
        }
        viewer.borrow_mut().start();
        // Anything answered synchronously during start
        viewer.borrow_mut().pump();

        Ok(Self {
            viewer,
            _on_toggle: on_toggle,
            _on_resize: on_resize,
            _on_frame: on_frame,
        })
    }

    #[wasm_bindgen(js_name = placedCount)]
    pub fn placed_count(&self) -> usize {
        self.viewer.borrow().placements().len()
    }

    #[wasm_bindgen(js_name = buttonLabel)]
    pub fn button_label(&self) -> String {
        self.viewer.borrow().button_state().label().to_string()
    }

    #[wasm_bindgen(js_name = statusText)]
    pub fn status_text(&self) -> Option<String> {
        self.viewer.borrow().status().text().map(str::to_string)
    }
}

fn window_size(window: &Window) -> Option<(u32, u32)> {
    let width = window.inner_width().ok()?.as_f64()?;
    let height = window.inner_height().ok()?.as_f64()?;
    Some((width as u32, height as u32))
}

fn to_js(err: arview_core::ViewerError) -> JsValue {
    JsValue::from_str(&err.to_string())
}
