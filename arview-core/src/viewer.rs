//! The AR model viewer: event dispatch and the per-frame placement loop

use crate::config::ViewerConfig;
use crate::decoder::{decoder_for, ModelDecoder};
use crate::error::{Result, ViewerError};
use crate::event::{EventQueue, ViewerEvent};
use crate::hit_test::Reticle;
use crate::host::{ArHost, SessionInit};
use crate::placement::{Admission, ModelPicker, PlacedModel, Placements};
use crate::projection::Camera;
use crate::registry::{LoadIndicator, ModelId, ModelRegistry, ModelTemplate, Slot};
use crate::session::{SessionController, SessionNotice};
use crate::status::{ButtonState, StatusBoard};

pub const SESSION_STARTED: &str = "AR session started. Move your device to detect surfaces.";
pub const HIT_TEST_READY: &str = "Hit testing initialized";
pub const SESSION_ENDED: &str = "AR session ended";
pub const MODEL_PLACED: &str = "Model placed successfully";
pub const CAPACITY_REACHED: &str = "Maximum number of models placed";

/// Owns the host and all viewer state. Everything happens on one thread:
/// host callbacks push onto [`EventQueue`], [`pump`](Self::pump) drains it, and
/// [`on_frame`](Self::on_frame) drives hit testing, idle rotation and rendering.
pub struct ArModelViewer<H: ArHost> {
    config: ViewerConfig,
    host: H,
    queue: EventQueue<H>,
    session: SessionController<H>,
    registry: ModelRegistry,
    decoder: Box<dyn ModelDecoder>,
    reticle: Reticle,
    surface_hint: bool,
    placements: Placements,
    picker: ModelPicker,
    status: StatusBoard,
    camera: Camera,
    button: Option<ButtonState>,
    started: bool,
}

impl<H: ArHost> ArModelViewer<H> {
    pub fn new(config: ViewerConfig, host: H, queue: EventQueue<H>) -> Result<Self> {
        let decoder = decoder_for(config.decoder);
        Self::with_decoder(config, host, queue, decoder)
    }

    pub fn with_decoder(
        config: ViewerConfig,
        host: H,
        queue: EventQueue<H>,
        decoder: Box<dyn ModelDecoder>,
    ) -> Result<Self> {
        config.validate()?;

        let session = SessionController::new(
            SessionInit::from(&config.session),
            config.session.world_space,
        );
        let camera = Camera::perspective(
            config.camera.fov_degrees,
            1,
            1,
            config.camera.near,
            config.camera.far,
        );

        Ok(Self {
            registry: ModelRegistry::new(&config.models),
            placements: Placements::new(config.max_models, config.capacity_policy),
            picker: ModelPicker::new(config.selection, config.seed),
            session,
            decoder,
            reticle: Reticle::new(),
            surface_hint: false,
            status: StatusBoard::new(),
            camera,
            button: None,
            started: false,
            config,
            host,
            queue,
        })
    }

    /// Show the toggle, probe AR support and start fetching every model.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;

        self.sync_button();
        self.host.check_support();

        let sources: Vec<(ModelId, String)> = self
            .registry
            .sources()
            .map(|(id, url)| (id.clone(), url.to_string()))
            .collect();
        for (id, url) in sources {
            log::info!("loading {} from {}", id, url);
            self.host.set_load_indicator(&id, LoadIndicator::Progress(0.0));
            self.host.fetch(&id, &url);
        }
    }

    pub fn queue(&self) -> EventQueue<H> {
        self.queue.clone()
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn session(&self) -> &SessionController<H> {
        &self.session
    }

    pub fn button_state(&self) -> ButtonState {
        self.session.button_state()
    }

    pub fn reticle(&self) -> &Reticle {
        &self.reticle
    }

    pub fn placements(&self) -> &Placements {
        &self.placements
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn status(&self) -> &StatusBoard {
        &self.status
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Handle every queued event in arrival order
    pub fn pump(&mut self) {
        while let Some(event) = self.queue.pop() {
            self.handle(event);
        }
    }

    /// One rendered frame. `frame` is the runtime's frame while a session is
    /// presenting and `None` otherwise.
    pub fn on_frame(&mut self, frame: Option<&H::Frame>) {
        self.pump();

        if let (Some(frame), Some((source, space))) = (frame, self.session.hit_test_handles()) {
            let hits = self.host.hit_test_results(frame, source, space);
            self.reticle.track(&hits);
            self.host.set_reticle(self.reticle.is_visible(), self.reticle.pose());
            self.set_surface_hint(self.reticle.is_visible());
        }

        self.placements.spin_all(self.config.rotation_step);
        for model in self.placements.iter() {
            self.host.set_rotation(model.node, &model.rotation);
        }

        self.host.render();
    }

    fn handle(&mut self, event: ViewerEvent<H>) {
        log::debug!("event {}", event.name());
        match event {
            ViewerEvent::SupportChecked { supported } => {
                log::info!("immersive-ar supported: {}", supported);
                self.session.on_support_checked(supported);
            }
            ViewerEvent::TogglePressed => {
                self.session.toggle(&mut self.host);
                // No placements between asking to end and the runtime confirming it
                if self.session.context().is_some_and(|ctx| ctx.is_ending()) {
                    self.clear_reticle();
                }
            }
            ViewerEvent::SessionGranted { epoch, session } => {
                let notice = self.session.on_granted(epoch, session, &mut self.host);
                self.notify(notice);
            }
            ViewerEvent::SessionRejected { epoch, reason } => {
                let notice = self.session.on_rejected(epoch, reason);
                self.notify(notice);
            }
            ViewerEvent::ReferenceSpaceReady { epoch, kind, space } => {
                self.session.on_reference_space(epoch, kind, space, &mut self.host);
            }
            ViewerEvent::ReferenceSpaceFailed { epoch, kind, reason } => {
                let notice = self.session.on_reference_space_failed(epoch, kind, reason);
                self.notify(notice);
            }
            ViewerEvent::HitTestSourceReady { epoch, source } => {
                let notice = self.session.on_hit_test_source(epoch, source, &mut self.host);
                self.notify(notice);
            }
            ViewerEvent::HitTestSourceFailed { epoch, reason } => {
                let notice = self.session.on_hit_test_failed(epoch, reason);
                self.notify(notice);
            }
            ViewerEvent::SessionEnded { epoch } => {
                let notice = self.session.on_ended(epoch, &mut self.host);
                self.notify(notice);
            }
            ViewerEvent::Select => self.place(),
            ViewerEvent::AssetProgress { model, fraction } => {
                if matches!(self.registry.slot(&model), Some(Slot::Pending)) {
                    let fraction = fraction.clamp(0.0, 1.0);
                    self.host
                        .set_load_indicator(&model, LoadIndicator::Progress(fraction));
                }
            }
            ViewerEvent::AssetFetched { model, bytes } => self.load_model(model, &bytes),
            ViewerEvent::AssetFailed { model, reason } => self.fail_model(&model, reason),
            ViewerEvent::Resize { width, height } => {
                if self.camera.resize(width, height) {
                    self.host.set_viewport(&self.camera, width, height);
                } else {
                    log::debug!("ignoring {}x{} resize", width, height);
                }
            }
            ViewerEvent::StatusExpired(ticket) => {
                if self.status.expire(ticket) {
                    self.host.hide_status();
                }
            }
        }
        self.sync_button();
    }

    fn notify(&mut self, notice: Option<SessionNotice>) {
        let Some(notice) = notice else {
            return;
        };
        let error_ms = self.config.error_status_duration_ms;
        match notice {
            SessionNotice::Started => self.show_status(SESSION_STARTED),
            SessionNotice::Rejected(reason) => {
                self.show_status_for(format!("AR not available: {}", reason), error_ms)
            }
            SessionNotice::SpaceFailed(kind, reason) => self.show_status_for(
                format!("{} reference space unavailable: {}", kind.as_str(), reason),
                error_ms,
            ),
            SessionNotice::HitTestReady => self.show_status(HIT_TEST_READY),
            SessionNotice::HitTestFailed(reason) => {
                self.show_status_for(format!("Hit testing unavailable: {}", reason), error_ms)
            }
            SessionNotice::Ended => {
                self.clear_reticle();
                self.show_status(SESSION_ENDED);
            }
        }
    }

    fn place(&mut self) {
        let Some(pose) = self.reticle.placement_pose().copied() else {
            log::debug!("select ignored: no surface under the reticle");
            return;
        };
        let Some(template) = self.picker.pick(&self.registry) else {
            log::debug!("select ignored: no model loaded yet");
            return;
        };

        match self.placements.admit() {
            Admission::Accept => {}
            Admission::Evict(oldest) => {
                log::debug!("evicting {:?} to stay within capacity", oldest);
                self.host.remove(oldest);
            }
            Admission::Reject => {
                self.show_status(CAPACITY_REACHED);
                return;
            }
        }

        let position = pose.position();
        let node = self.host.spawn(&template.id, position);
        log::info!(
            "placed {} at ({:.2}, {:.2}, {:.2})",
            template.id,
            position.x,
            position.y,
            position.z
        );
        self.placements
            .push(PlacedModel::new(node, template.id.clone(), position));
        self.show_status(MODEL_PLACED);
    }

    fn load_model(&mut self, model: ModelId, bytes: &[u8]) {
        let url = self.registry.url(&model).unwrap_or_default().to_string();
        let mesh = match self.decoder.decode(bytes, &url) {
            Ok(mesh) => mesh,
            Err(source) => {
                let error = ViewerError::Decode {
                    model: model.to_string(),
                    source,
                };
                self.fail_model(&model, error.to_string());
                return;
            }
        };

        let template = ModelTemplate::new(model.clone(), &mesh, self.config.model_scale);
        match self.registry.insert(template) {
            Ok(template) => {
                self.host.register_template(&template);
                self.host.set_load_indicator(&model, LoadIndicator::Hidden);
                self.show_status(format!("{} model loaded successfully", model));
            }
            Err(err) => log::warn!("discarding {}: {}", model, err),
        }
    }

    fn fail_model(&mut self, model: &ModelId, reason: String) {
        log::error!("error loading {}: {}", model, reason);
        match self.registry.mark_failed(model, reason) {
            Ok(()) => {
                self.host.set_load_indicator(model, LoadIndicator::Hidden);
                let text = format!("Error loading {} model", model);
                self.show_status_for(text, self.config.error_status_duration_ms);
            }
            Err(err) => log::warn!("ignoring failure report: {}", err),
        }
    }

    fn show_status(&mut self, text: impl Into<String>) {
        self.show_status_for(text, self.config.status_duration_ms);
    }

    fn show_status_for(&mut self, text: impl Into<String>, duration_ms: u32) {
        let text = text.into();
        let ticket = self.status.show(text.as_str(), duration_ms);
        self.host.show_status(&text, ticket);
    }

    fn clear_reticle(&mut self) {
        self.reticle.hide();
        self.host.set_reticle(false, self.reticle.pose());
        self.set_surface_hint(false);
    }

    fn set_surface_hint(&mut self, active: bool) {
        if self.surface_hint != active {
            self.surface_hint = active;
            self.host.set_surface_hint(active);
        }
    }

    fn sync_button(&mut self) {
        let state = self.session.button_state();
        if self.button != Some(state) {
            self.button = Some(state);
            self.host.set_button(state);
        }
    }
}
