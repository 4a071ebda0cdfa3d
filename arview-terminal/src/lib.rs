/// Terminal preview of the AR viewer: a simulated AR runtime and an ASCII view
use arview_core::{ArModelViewer, EventQueue, ViewerConfig, ViewerEvent};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{self},
};
use std::io::{self, stdout};
use std::time::Duration;

pub mod host;
pub mod renderer;

pub use host::{HostOptions, TerminalHost};
pub use renderer::AsciiRenderer;

/// Main application struct for the terminal preview
pub struct TerminalApp {
    viewer: ArModelViewer<TerminalHost>,
    queue: EventQueue<TerminalHost>,
    running: bool,
}

/// What a key press asks for
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Quit,
    ToggleSession,
    Select,
    Walk { ahead: f32, right: f32 },
    Turn { yaw: f32, pitch: f32 },
}

impl Command {
    pub fn from_key(code: KeyCode) -> Option<Self> {
        let command = match code {
            KeyCode::Char('q') | KeyCode::Esc => Command::Quit,
            KeyCode::Enter => Command::ToggleSession,
            KeyCode::Char(' ') => Command::Select,
            KeyCode::Char('w') => Command::Walk { ahead: 1.0, right: 0.0 },
            KeyCode::Char('s') => Command::Walk { ahead: -1.0, right: 0.0 },
            KeyCode::Char('a') => Command::Walk { ahead: 0.0, right: -1.0 },
            KeyCode::Char('d') => Command::Walk { ahead: 0.0, right: 1.0 },
            KeyCode::Left => Command::Turn { yaw: 1.0, pitch: 0.0 },
            KeyCode::Right => Command::Turn { yaw: -1.0, pitch: 0.0 },
            KeyCode::Up => Command::Turn { yaw: 0.0, pitch: 1.0 },
            KeyCode::Down => Command::Turn { yaw: 0.0, pitch: -1.0 },
            _ => return None,
        };
        Some(command)
    }
}

impl TerminalApp {
    pub fn new(config: ViewerConfig, options: HostOptions) -> arview_core::Result<Self> {
        let queue = EventQueue::new();
        let host = TerminalHost::new(queue.clone(), options);
        let viewer = ArModelViewer::new(config, host, queue.clone())?;

        Ok(Self {
            viewer,
            queue,
            running: true,
        })
    }

    pub fn viewer(&self) -> &ArModelViewer<TerminalHost> {
        &self.viewer
    }

    pub fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;

        let result = self.main_loop();

        // Cleanup
        terminal::disable_raw_mode()?;
        execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;

        result
    }

    fn main_loop(&mut self) -> io::Result<()> {
        let target_frame_time = Duration::from_millis(1000 / 30); // 30 FPS target

        let (width, height) = terminal::size()?;
        self.start(width, height);

        while self.running {
            let frame_start = std::time::Instant::now();

            while event::poll(Duration::from_millis(0))? {
                self.handle_input(event::read()?);
            }

            self.tick();

            let mut stdout = stdout();
            self.viewer.host().present(&mut stdout)?;

            let elapsed = frame_start.elapsed();
            if elapsed < target_frame_time {
                std::thread::sleep(target_frame_time - elapsed);
            }
        }

        Ok(())
    }

    /// Size the view and kick off support detection and model loading
    pub fn start(&mut self, width: u16, height: u16) {
        self.queue.push(ViewerEvent::Resize {
            width: width as u32,
            height: height as u32,
        });
        self.viewer.start();
    }

    /// One animation frame: runtime answers in, then the viewer's frame work
    pub fn tick(&mut self) {
        self.viewer.host_mut().deliver();
        let frame = self.viewer.host().current_frame();
        self.viewer.on_frame(frame.as_ref());
    }

    pub fn apply(&mut self, command: Command) {
        match command {
            Command::Quit => self.running = false,
            Command::ToggleSession => self.queue.push(ViewerEvent::TogglePressed),
            Command::Select => {
                // Select input only exists inside an immersive session
                if self.viewer.host().is_presenting() {
                    self.queue.push(ViewerEvent::Select);
                }
            }
            Command::Walk { ahead, right } => self.viewer.host_mut().rig.walk(ahead, right),
            Command::Turn { yaw, pitch } => self.viewer.host_mut().rig.turn(yaw, pitch),
        }
    }

    fn handle_input(&mut self, event: Event) {
        match event {
            Event::Key(KeyEvent {
                code,
                kind: KeyEventKind::Press | KeyEventKind::Repeat,
                ..
            }) => {
                if let Some(command) = Command::from_key(code) {
                    self.apply(command);
                }
            }
            Event::Resize(width, height) => self.queue.push(ViewerEvent::Resize {
                width: width as u32,
                height: height as u32,
            }),
            _ => {}
        }
    }
}
