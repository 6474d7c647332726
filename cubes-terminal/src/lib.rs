//! Terminal host for the spinning cubes render loop

use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{self},
};
use cubes_core::{RenderLoop, SceneConfig};
use log::{debug, info};
use std::io::{self, stdout, Stdout};
use std::time::Instant;

pub mod clock;
pub mod renderer;

pub use clock::FrameClock;
pub use renderer::{HalfBlockRenderer, TerminalSurface};

/// Main application struct for terminal rendering
pub struct TerminalApp {
    controller: RenderLoop<HalfBlockRenderer<Stdout>>,
    clock: FrameClock,
    max_frames: Option<u64>,
    running: bool,
    last_sample: Instant,
    frame_count: u32,
    fps: f32,
}

impl TerminalApp {
    pub fn new(config: &SceneConfig, fps: u32, max_frames: Option<u64>) -> anyhow::Result<Self> {
        let (columns, rows) = terminal::size()?;
        let renderer = HalfBlockRenderer::new(TerminalSurface::new(columns, rows), stdout());

        Ok(Self {
            controller: RenderLoop::initialize(renderer, config)?,
            clock: FrameClock::new(fps),
            max_frames,
            running: true,
            last_sample: Instant::now(),
            frame_count: 0,
            fps: 0.0,
        })
    }

    pub fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;

        let result = self.main_loop();

        // Cleanup
        self.controller.stop(&mut self.clock);
        terminal::disable_raw_mode()?;
        execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;

        result
    }

    fn main_loop(&mut self) -> io::Result<()> {
        self.controller.start(&mut self.clock);
        info!("terminal loop started at {:?} per frame", self.clock.interval());

        while self.running && self.clock.has_pending() {
            // Wait for input until the next frame is due
            if event::poll(self.clock.until_due())? {
                self.handle_event(event::read()?);
                continue;
            }

            let Some(time_ms) = self.clock.fire() else {
                continue;
            };
            let report = self.controller.on_frame(time_ms, &mut self.clock)?;
            self.update_fps(report.tick);

            if self.max_frames.is_some_and(|max| report.tick >= max) {
                debug!("frame limit reached after {} ticks", report.tick);
                self.running = false;
            }
        }

        Ok(())
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(KeyEvent {
                code: KeyCode::Char('q') | KeyCode::Esc,
                kind: KeyEventKind::Press,
                ..
            }) => {
                self.running = false;
            }
            Event::Resize(columns, rows) => {
                self.controller
                    .renderer_mut()
                    .surface_mut()
                    .resize(columns, rows);
            }
            _ => {}
        }
    }

    fn update_fps(&mut self, tick: u64) {
        self.frame_count += 1;
        let elapsed = self.last_sample.elapsed();
        if elapsed.as_secs() >= 1 {
            self.fps = self.frame_count as f32 / elapsed.as_secs_f32();
            self.frame_count = 0;
            self.last_sample = Instant::now();
        }

        let status = format!(
            "Spinning Cubes | FPS: {:.1} | tick {} | Q/Esc=Quit",
            self.fps, tick
        );
        self.controller.renderer_mut().set_status(status);
    }
}
