//! DOM overlay: the AR button, the status toast and per-model progress bars

use arview_core::{ButtonState, LoadIndicator, ModelId};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, HtmlButtonElement, HtmlElement};

/// Element that receives status messages; the page has to provide it
pub const STATUS_ELEMENT_ID: &str = "hit-test-status";
/// Added to every model container while the reticle sits on a surface
pub const SURFACE_CLASS: &str = "hit-test-active";
const HIDE_CLASS: &str = "hide";

const BUTTON_CSS: &str = "position:absolute;bottom:20px;left:calc(50% - 75px);width:150px;\
padding:12px 6px;border:1px solid #fff;border-radius:4px;background:rgba(0,0,0,0.1);\
color:#fff;font:normal 13px sans-serif;text-align:center;outline:none;z-index:999;";

pub struct Overlay {
    document: Document,
    button: HtmlButtonElement,
    status: HtmlElement,
}

impl Overlay {
    /// Attach to the page. Fails when the status element is missing.
    pub fn new(document: &Document) -> Result<Self, JsValue> {
        let status = document
            .get_element_by_id(STATUS_ELEMENT_ID)
            .ok_or_else(|| JsValue::from_str(&format!("missing #{STATUS_ELEMENT_ID} element")))?
            .dyn_into::<HtmlElement>()?;
        let body = document
            .body()
            .ok_or_else(|| JsValue::from_str("document has no body"))?;

        let button = document.create_element("button")?.dyn_into::<HtmlButtonElement>()?;
        button.set_id("ar-button");
        button.style().set_css_text(BUTTON_CSS);
        // Shown once support detection settles
        button.style().set_property("display", "none")?;
        body.append_child(&button)?;

        let overlay = Self {
            document: document.clone(),
            button,
            status,
        };
        overlay.hide_status()?;
        Ok(overlay)
    }

    pub fn button(&self) -> &HtmlButtonElement {
        &self.button
    }

    pub fn set_button(&self, state: ButtonState) -> Result<(), JsValue> {
        self.button.set_text_content(Some(state.label()));
        self.button.set_disabled(!state.enabled());
        let (opacity, cursor) = button_look(state);
        let style = self.button.style();
        style.set_property("display", "")?;
        style.set_property("opacity", opacity)?;
        style.set_property("cursor", cursor)
    }

    pub fn show_status(&self, text: &str) -> Result<(), JsValue> {
        self.status.set_text_content(Some(text));
        self.status.style().set_property("display", "block")
    }

    pub fn hide_status(&self) -> Result<(), JsValue> {
        self.status.style().set_property("display", "none")
    }

    /// Pages without a container for `model` are left alone.
    pub fn set_load_indicator(&self, model: &ModelId, indicator: LoadIndicator) -> Result<(), JsValue> {
        let Some(container) = self.document.query_selector(&model_selector(model))? else {
            log::debug!("no progress bar for {model}");
            return Ok(());
        };
        let Some(progress) = container.query_selector(".progress-bar")? else {
            return Ok(());
        };

        match indicator {
            LoadIndicator::Progress(fraction) => {
                progress.class_list().remove_1(HIDE_CLASS)?;
                if let Some(bar) = container.query_selector(".update-bar")? {
                    bar.dyn_into::<HtmlElement>()?
                        .style()
                        .set_property("transform", &progress_transform(fraction))?;
                }
                Ok(())
            }
            LoadIndicator::Hidden => progress.class_list().add_1(HIDE_CLASS),
        }
    }

    pub fn set_surface_hint(&self, active: bool) -> Result<(), JsValue> {
        let containers = self.document.query_selector_all(".model-container")?;
        for index in 0..containers.length() {
            if let Some(element) = containers.item(index).and_then(|node| node.dyn_into::<Element>().ok()) {
                element.class_list().toggle_with_force(SURFACE_CLASS, active)?;
            }
        }
        Ok(())
    }
}

fn model_selector(model: &ModelId) -> String {
    format!(".model-container[data-model=\"{}\"]", model.as_str())
}

fn progress_transform(fraction: f32) -> String {
    format!("scaleX({:.3})", fraction.clamp(0.0, 1.0))
}

fn button_look(state: ButtonState) -> (&'static str, &'static str) {
    if state.enabled() {
        ("0.9", "pointer")
    } else {
        ("0.5", "auto")
    }
}
