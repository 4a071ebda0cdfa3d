//! AR session lifecycle
//!
//! ```text
//! Inactive --toggle--> Requesting --granted--> Active --ended--> Inactive
//!                          |
//!                          +--rejected--> Inactive
//! ```
//!
//! While active the controller owns the session handle, both reference
//! spaces and the hit-test source. Results from an older request are
//! recognised by their epoch and dropped; a late hit-test source is
//! cancelled on arrival so no handle outlives its session.

use crate::config::ReferenceSpaceKind;
use crate::host::{SessionEpoch, SessionInit, XrRuntime};
use crate::status::ButtonState;

/// Progress of the standing hit-test query
#[derive(Debug)]
pub enum HitTestState<S> {
    Idle,
    Requested,
    Active(S),
    Unavailable,
}

/// Everything negotiated for one active session
pub struct SessionContext<R: XrRuntime> {
    pub epoch: SessionEpoch,
    pub session: R::Session,
    pub viewer_space: Option<R::Space>,
    pub world_space: Option<R::Space>,
    pub hit_test: HitTestState<R::HitTestSource>,
    ending: bool,
}

impl<R: XrRuntime> SessionContext<R> {
    fn new(epoch: SessionEpoch, session: R::Session) -> Self {
        Self {
            epoch,
            session,
            viewer_space: None,
            world_space: None,
            hit_test: HitTestState::Idle,
            ending: false,
        }
    }

    pub fn is_ending(&self) -> bool {
        self.ending
    }
}

pub enum SessionPhase<R: XrRuntime> {
    Inactive,
    Requesting(SessionEpoch),
    Active(SessionContext<R>),
}

/// What the viewer should tell the user about a lifecycle step
#[derive(Debug, Clone, PartialEq)]
pub enum SessionNotice {
    Started,
    Rejected(String),
    SpaceFailed(ReferenceSpaceKind, String),
    HitTestReady,
    HitTestFailed(String),
    Ended,
}

pub struct SessionController<R: XrRuntime> {
    phase: SessionPhase<R>,
    supported: Option<bool>,
    next_epoch: u64,
    world_kind: ReferenceSpaceKind,
    init: SessionInit,
}

impl<R: XrRuntime> SessionController<R> {
    pub fn new(init: SessionInit, world_kind: ReferenceSpaceKind) -> Self {
        Self {
            phase: SessionPhase::Inactive,
            supported: None,
            next_epoch: 0,
            world_kind,
            init,
        }
    }

    pub fn phase(&self) -> &SessionPhase<R> {
        &self.phase
    }

    pub fn context(&self) -> Option<&SessionContext<R>> {
        match &self.phase {
            SessionPhase::Active(ctx) => Some(ctx),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, SessionPhase::Active(_))
    }

    pub fn button_state(&self) -> ButtonState {
        match (&self.phase, self.supported) {
            (SessionPhase::Active(_), _) => ButtonState::ExitAr,
            (_, Some(false)) => ButtonState::NotSupported,
            _ => ButtonState::EnterAr,
        }
    }

    /// Source and world space to query this frame, if the query is live
    pub fn hit_test_handles(&self) -> Option<(&R::HitTestSource, &R::Space)> {
        let ctx = self.context()?;
        match (&ctx.hit_test, &ctx.world_space) {
            (HitTestState::Active(source), Some(space)) => Some((source, space)),
            _ => None,
        }
    }

    pub fn on_support_checked(&mut self, supported: bool) {
        self.supported = Some(supported);
    }

    /// Enter or exit depending on the current phase
    pub fn toggle(&mut self, runtime: &mut R) {
        match &mut self.phase {
            SessionPhase::Inactive => {
                if self.supported == Some(false) {
                    log::debug!("toggle ignored: immersive-ar unsupported");
                    return;
                }
                self.next_epoch += 1;
                let epoch = SessionEpoch(self.next_epoch);
                log::info!("requesting {} session ({:?})", self.init.mode, epoch);
                self.phase = SessionPhase::Requesting(epoch);
                runtime.request_session(epoch, &self.init);
            }
            SessionPhase::Requesting(epoch) => {
                log::debug!("toggle ignored: {:?} still pending", epoch);
            }
            SessionPhase::Active(ctx) => {
                if !ctx.ending {
                    log::info!("ending session {:?}", ctx.epoch);
                    ctx.ending = true;
                    runtime.end_session(&ctx.session);
                }
            }
        }
    }

    pub fn on_granted(
        &mut self,
        epoch: SessionEpoch,
        session: R::Session,
        runtime: &mut R,
    ) -> Option<SessionNotice> {
        if !matches!(self.phase, SessionPhase::Requesting(pending) if pending == epoch) {
            log::warn!("ending unexpected session grant {:?}", epoch);
            runtime.end_session(&session);
            return None;
        }

        log::info!("session {:?} started", epoch);
        runtime.request_reference_space(epoch, &session, ReferenceSpaceKind::Viewer);
        runtime.request_reference_space(epoch, &session, self.world_kind);
        self.phase = SessionPhase::Active(SessionContext::new(epoch, session));
        Some(SessionNotice::Started)
    }

    pub fn on_rejected(&mut self, epoch: SessionEpoch, reason: String) -> Option<SessionNotice> {
        match self.phase {
            SessionPhase::Requesting(pending) if pending == epoch => {
                log::warn!("session request {:?} rejected: {}", epoch, reason);
                self.phase = SessionPhase::Inactive;
                Some(SessionNotice::Rejected(reason))
            }
            _ => {
                log::debug!("ignoring stale rejection {:?}", epoch);
                None
            }
        }
    }

    pub fn on_reference_space(
        &mut self,
        epoch: SessionEpoch,
        kind: ReferenceSpaceKind,
        space: R::Space,
        runtime: &mut R,
    ) {
        let world_kind = self.world_kind;
        let Some(ctx) = self.live_context(epoch) else {
            log::debug!("dropping {} space for stale {:?}", kind.as_str(), epoch);
            return;
        };

        if kind == ReferenceSpaceKind::Viewer {
            if matches!(ctx.hit_test, HitTestState::Idle) {
                runtime.request_hit_test_source(epoch, &ctx.session, &space);
                ctx.hit_test = HitTestState::Requested;
            }
            ctx.viewer_space = Some(space);
        } else if kind == world_kind {
            runtime.use_world_space(&ctx.session, &space);
            ctx.world_space = Some(space);
        } else {
            log::warn!("unrequested {} space ignored", kind.as_str());
        }
    }

    pub fn on_reference_space_failed(
        &mut self,
        epoch: SessionEpoch,
        kind: ReferenceSpaceKind,
        reason: String,
    ) -> Option<SessionNotice> {
        let ctx = self.live_context(epoch)?;
        log::warn!("{} space unavailable: {}", kind.as_str(), reason);
        if kind == ReferenceSpaceKind::Viewer {
            ctx.hit_test = HitTestState::Unavailable;
        }
        Some(SessionNotice::SpaceFailed(kind, reason))
    }

    pub fn on_hit_test_source(
        &mut self,
        epoch: SessionEpoch,
        source: R::HitTestSource,
        runtime: &mut R,
    ) -> Option<SessionNotice> {
        match self.live_context(epoch) {
            Some(ctx) if matches!(ctx.hit_test, HitTestState::Requested) => {
                log::info!("hit-test source ready for {:?}", epoch);
                ctx.hit_test = HitTestState::Active(source);
                Some(SessionNotice::HitTestReady)
            }
            _ => {
                log::warn!("cancelling stale hit-test source for {:?}", epoch);
                runtime.cancel_hit_test_source(source);
                None
            }
        }
    }

    pub fn on_hit_test_failed(&mut self, epoch: SessionEpoch, reason: String) -> Option<SessionNotice> {
        let ctx = self.live_context(epoch)?;
        log::warn!("hit-test source unavailable: {}", reason);
        ctx.hit_test = HitTestState::Unavailable;
        Some(SessionNotice::HitTestFailed(reason))
    }

    /// Session ended, by request or by the runtime. Releases every handle.
    pub fn on_ended(&mut self, epoch: SessionEpoch, runtime: &mut R) -> Option<SessionNotice> {
        match &self.phase {
            SessionPhase::Active(ctx) if ctx.epoch == epoch => {}
            _ => {
                log::debug!("ignoring end of stale session {:?}", epoch);
                return None;
            }
        }

        let SessionPhase::Active(ctx) = std::mem::replace(&mut self.phase, SessionPhase::Inactive)
        else {
            return None;
        };
        if let HitTestState::Active(source) = ctx.hit_test {
            runtime.cancel_hit_test_source(source);
        }
        log::info!("session {:?} ended", epoch);
        Some(SessionNotice::Ended)
    }

    /// Active context for `epoch` that has not been asked to end
    fn live_context(&mut self, epoch: SessionEpoch) -> Option<&mut SessionContext<R>> {
        match &mut self.phase {
            SessionPhase::Active(ctx) if ctx.epoch == epoch && !ctx.ending => Some(ctx),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionOptions;
    use crate::transform::Pose;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl XrRuntime for Recorder {
        type Session = u32;
        type Space = ReferenceSpaceKind;
        type HitTestSource = u32;
        type Frame = ();

        fn check_support(&mut self) {}
        fn request_session(&mut self, epoch: SessionEpoch, _: &SessionInit) {
            self.calls.push(format!("request-session {}", epoch.0));
        }
        fn request_reference_space(&mut self, _: SessionEpoch, _: &u32, kind: ReferenceSpaceKind) {
            self.calls.push(format!("request-space {}", kind.as_str()));
        }
        fn request_hit_test_source(&mut self, _: SessionEpoch, _: &u32, space: &ReferenceSpaceKind) {
            self.calls.push(format!("request-hit-test {}", space.as_str()));
        }
        fn use_world_space(&mut self, _: &u32, space: &ReferenceSpaceKind) {
            self.calls.push(format!("use-world {}", space.as_str()));
        }
        fn hit_test_results(&self, _: &(), _: &u32, _: &ReferenceSpaceKind) -> Vec<Pose> {
            Vec::new()
        }
        fn cancel_hit_test_source(&mut self, source: u32) {
            self.calls.push(format!("cancel {}", source));
        }
        fn end_session(&mut self, session: &u32) {
            self.calls.push(format!("end {}", session));
        }
    }

    fn controller() -> SessionController<Recorder> {
        SessionController::new(
            SessionInit::from(&SessionOptions::default()),
            ReferenceSpaceKind::Local,
        )
    }

    fn activate(controller: &mut SessionController<Recorder>, runtime: &mut Recorder) -> SessionEpoch {
        controller.toggle(runtime);
        let epoch = SessionEpoch(1);
        controller.on_granted(epoch, 7, runtime);
        controller.on_reference_space(epoch, ReferenceSpaceKind::Viewer, ReferenceSpaceKind::Viewer, runtime);
        controller.on_reference_space(epoch, ReferenceSpaceKind::Local, ReferenceSpaceKind::Local, runtime);
        controller.on_hit_test_source(epoch, 42, runtime);
        epoch
    }

    #[test]
    fn test_full_negotiation_order() {
        let mut runtime = Recorder::default();
        let mut controller = controller();
        activate(&mut controller, &mut runtime);

        assert_eq!(
            runtime.calls,
            vec![
                "request-session 1",
                "request-space viewer",
                "request-space local",
                "request-hit-test viewer",
                "use-world local",
            ]
        );
        assert_eq!(controller.button_state(), ButtonState::ExitAr);
        let (source, space) = controller.hit_test_handles().unwrap();
        assert_eq!((*source, *space), (42, ReferenceSpaceKind::Local));
    }

    #[test]
    fn test_rejection_returns_to_inactive() {
        let mut runtime = Recorder::default();
        let mut controller = controller();
        controller.toggle(&mut runtime);

        let notice = controller.on_rejected(SessionEpoch(1), "NotSupportedError".into());
        assert_eq!(notice, Some(SessionNotice::Rejected("NotSupportedError".into())));
        assert!(matches!(controller.phase(), SessionPhase::Inactive));
        assert_eq!(controller.button_state(), ButtonState::EnterAr);
    }

    #[test]
    fn test_toggle_while_requesting_is_ignored() {
        let mut runtime = Recorder::default();
        let mut controller = controller();
        controller.toggle(&mut runtime);
        controller.toggle(&mut runtime);
        assert_eq!(runtime.calls, vec!["request-session 1"]);
    }

    #[test]
    fn test_end_releases_hit_test_source() {
        let mut runtime = Recorder::default();
        let mut controller = controller();
        let epoch = activate(&mut controller, &mut runtime);

        controller.toggle(&mut runtime);
        assert_eq!(runtime.calls.last().unwrap(), "end 7");
        // Still held until the runtime confirms
        assert!(controller.is_active());

        assert_eq!(controller.on_ended(epoch, &mut runtime), Some(SessionNotice::Ended));
        assert_eq!(runtime.calls.last().unwrap(), "cancel 42");
        assert!(controller.hit_test_handles().is_none());
        assert_eq!(controller.button_state(), ButtonState::EnterAr);
    }

    #[test]
    fn test_late_hit_test_source_is_cancelled() {
        let mut runtime = Recorder::default();
        let mut controller = controller();
        controller.toggle(&mut runtime);
        let epoch = SessionEpoch(1);
        controller.on_granted(epoch, 7, &mut runtime);
        controller.on_reference_space(epoch, ReferenceSpaceKind::Viewer, ReferenceSpaceKind::Viewer, &mut runtime);
        controller.on_ended(epoch, &mut runtime);

        assert_eq!(controller.on_hit_test_source(epoch, 9, &mut runtime), None);
        assert_eq!(runtime.calls.last().unwrap(), "cancel 9");
    }

    #[test]
    fn test_unsupported_blocks_requests() {
        let mut runtime = Recorder::default();
        let mut controller = controller();
        controller.on_support_checked(false);
        controller.toggle(&mut runtime);

        assert!(runtime.calls.is_empty());
        assert_eq!(controller.button_state(), ButtonState::NotSupported);
    }
}
