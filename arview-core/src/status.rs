//! Presentation state: the enter/exit toggle and the transient status toast

/// State of the enter/exit AR toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    EnterAr,
    ExitAr,
    NotSupported,
}

impl ButtonState {
    pub fn label(&self) -> &'static str {
        match self {
            ButtonState::EnterAr => "ENTER AR",
            ButtonState::ExitAr => "EXIT AR",
            ButtonState::NotSupported => "AR NOT SUPPORTED",
        }
    }

    pub fn enabled(&self) -> bool {
        !matches!(self, ButtonState::NotSupported)
    }
}

/// Handle for one shown message; the host posts it back when the duration elapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusTicket {
    pub generation: u64,
    pub duration_ms: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct StatusMessage {
    text: String,
    ticket: StatusTicket,
}

/// The single status line. Showing a message replaces the previous one;
/// an expiry only hides the message whose ticket it carries.
#[derive(Debug, Default)]
pub struct StatusBoard {
    current: Option<StatusMessage>,
    next_generation: u64,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self, text: impl Into<String>, duration_ms: u32) -> StatusTicket {
        self.next_generation += 1;
        let ticket = StatusTicket {
            generation: self.next_generation,
            duration_ms,
        };
        self.current = Some(StatusMessage {
            text: text.into(),
            ticket,
        });
        ticket
    }

    /// Returns true if the message for `ticket` was still showing and is now hidden.
    pub fn expire(&mut self, ticket: StatusTicket) -> bool {
        match &self.current {
            Some(message) if message.ticket == ticket => {
                self.current = None;
                true
            }
            _ => false,
        }
    }

    pub fn text(&self) -> Option<&str> {
        self.current.as_ref().map(|m| m.text.as_str())
    }
}
