//! Bindings to the three.js scene shim in `js/scene_bridge.js`

use js_sys::{Function, Promise};
use wasm_bindgen::prelude::*;
use web_sys::{XrReferenceSpace, XrSession};

#[wasm_bindgen(module = "/js/scene_bridge.js")]
extern "C" {
    pub type SceneBridge;

    #[wasm_bindgen(constructor)]
    pub fn new() -> SceneBridge;

    #[wasm_bindgen(method, js_name = createReticle)]
    pub fn create_reticle(this: &SceneBridge, positions: &[f32]);

    #[wasm_bindgen(method, js_name = registerTemplate)]
    pub fn register_template(this: &SceneBridge, id: &str, positions: &[f32], normals: &[f32]);

    /// Handle of the new node, or 0 for an unknown template
    #[wasm_bindgen(method)]
    pub fn spawn(this: &SceneBridge, id: &str, x: f32, y: f32, z: f32) -> u32;

    #[wasm_bindgen(method, js_name = setRotation)]
    pub fn set_rotation(this: &SceneBridge, handle: u32, x: f32, y: f32, z: f32);

    #[wasm_bindgen(method)]
    pub fn remove(this: &SceneBridge, handle: u32);

    #[wasm_bindgen(method, js_name = setReticle)]
    pub fn set_reticle(this: &SceneBridge, visible: bool, matrix: &[f32]);

    #[wasm_bindgen(method, js_name = setViewport)]
    pub fn set_viewport(
        this: &SceneBridge,
        fov_degrees: f32,
        aspect: f32,
        near: f32,
        far: f32,
        width: u32,
        height: u32,
    );

    #[wasm_bindgen(method, js_name = setSession)]
    pub fn set_session(this: &SceneBridge, session: &XrSession, reference_space_type: &str) -> Promise;

    #[wasm_bindgen(method, js_name = setReferenceSpace)]
    pub fn set_reference_space(this: &SceneBridge, space: &XrReferenceSpace);

    #[wasm_bindgen(method, js_name = setAnimationLoop)]
    pub fn set_animation_loop(this: &SceneBridge, callback: &Function);

    #[wasm_bindgen(method)]
    pub fn render(this: &SceneBridge);
}
