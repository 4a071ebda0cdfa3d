//! Single-threaded event queue feeding the viewer
//!
//! Host callbacks (button clicks, resolved promises, timers, resize) push
//! events; the viewer drains them in arrival order.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use crate::config::ReferenceSpaceKind;
use crate::host::{SessionEpoch, XrRuntime};
use crate::registry::ModelId;
use crate::status::StatusTicket;

pub enum ViewerEvent<R: XrRuntime> {
    SupportChecked {
        supported: bool,
    },
    TogglePressed,
    SessionGranted {
        epoch: SessionEpoch,
        session: R::Session,
    },
    SessionRejected {
        epoch: SessionEpoch,
        reason: String,
    },
    ReferenceSpaceReady {
        epoch: SessionEpoch,
        kind: ReferenceSpaceKind,
        space: R::Space,
    },
    ReferenceSpaceFailed {
        epoch: SessionEpoch,
        kind: ReferenceSpaceKind,
        reason: String,
    },
    HitTestSourceReady {
        epoch: SessionEpoch,
        source: R::HitTestSource,
    },
    HitTestSourceFailed {
        epoch: SessionEpoch,
        reason: String,
    },
    SessionEnded {
        epoch: SessionEpoch,
    },
    Select,
    AssetProgress {
        model: ModelId,
        fraction: f32,
    },
    AssetFetched {
        model: ModelId,
        bytes: Vec<u8>,
    },
    AssetFailed {
        model: ModelId,
        reason: String,
    },
    Resize {
        width: u32,
        height: u32,
    },
    StatusExpired(StatusTicket),
}

impl<R: XrRuntime> ViewerEvent<R> {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            ViewerEvent::SupportChecked { .. } => "support-checked",
            ViewerEvent::TogglePressed => "toggle-pressed",
            ViewerEvent::SessionGranted { .. } => "session-granted",
            ViewerEvent::SessionRejected { .. } => "session-rejected",
            ViewerEvent::ReferenceSpaceReady { .. } => "reference-space-ready",
            ViewerEvent::ReferenceSpaceFailed { .. } => "reference-space-failed",
            ViewerEvent::HitTestSourceReady { .. } => "hit-test-source-ready",
            ViewerEvent::HitTestSourceFailed { .. } => "hit-test-source-failed",
            ViewerEvent::SessionEnded { .. } => "session-ended",
            ViewerEvent::Select => "select",
            ViewerEvent::AssetProgress { .. } => "asset-progress",
            ViewerEvent::AssetFetched { .. } => "asset-fetched",
            ViewerEvent::AssetFailed { .. } => "asset-failed",
            ViewerEvent::Resize { .. } => "resize",
            ViewerEvent::StatusExpired(_) => "status-expired",
        }
    }
}

impl<R: XrRuntime> fmt::Debug for ViewerEvent<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

struct QueueInner<R: XrRuntime> {
    events: VecDeque<ViewerEvent<R>>,
    waker: Option<Rc<dyn Fn()>>,
}

/// Cloneable handle to the viewer's FIFO
pub struct EventQueue<R: XrRuntime> {
    inner: Rc<RefCell<QueueInner<R>>>,
}

impl<R: XrRuntime> Clone for EventQueue<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<R: XrRuntime> Default for EventQueue<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: XrRuntime> EventQueue<R> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(QueueInner {
                events: VecDeque::new(),
                waker: None,
            })),
        }
    }

    /// Called after every push, outside the queue borrow. Hosts use it to
    /// pump the viewer when an event arrives outside a frame callback.
    pub fn set_waker(&self, waker: impl Fn() + 'static) {
        self.inner.borrow_mut().waker = Some(Rc::new(waker));
    }

    pub fn push(&self, event: ViewerEvent<R>) {
        let waker = {
            let mut inner = self.inner.borrow_mut();
            inner.events.push_back(event);
            inner.waker.clone()
        };
        if let Some(waker) = waker {
            waker();
        }
    }

    pub fn pop(&self) -> Option<ViewerEvent<R>> {
        self.inner.borrow_mut().events.pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().events.is_empty()
    }
}
