use std::{
    io,
    sync::mpsc::{self, RecvTimeoutError},
    time::{Duration, Instant},
};

use tracing::{debug, info, warn};

use crate::{
    view::{status, Surface},
    Cell, Pos, Torus,
};

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_TICK_STEP: Duration = Duration::from_millis(50);

/// Everything the controller can be asked to do. Positions and sizes are in
/// screen space, the controller maps them onto the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimCmd {
    Exit,
    SwitchMode,
    Accelerate,
    Decelerate,
    Toggle(Pos),
    Resize(usize, usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Owns the grid and the simulation parameters. Only the thread running
/// [`Session::run`] ever touches it; other threads talk to it through [`SimCmd`].
#[derive(Debug)]
pub struct Session {
    torus: Torus,
    running: bool,
    tick_interval: Duration,
    tick_step: Duration,
}

impl Session {
    pub fn new(torus: Torus, tick_interval: Duration, tick_step: Duration) -> Self {
        Self {
            torus,
            running: false,
            tick_interval,
            tick_step,
        }
    }

    pub fn torus(&self) -> &Torus {
        &self.torus
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    pub fn switch_mode(&mut self) {
        self.running = !self.running;
        info!(running = self.running, "switched mode");
    }

    /// shortens the tick interval, never below zero.
    pub fn accelerate(&mut self) {
        self.tick_interval = self.tick_interval.saturating_sub(self.tick_step);
        info!(interval_ms = self.tick_interval.as_millis() as u64, "accelerated");
    }

    pub fn decelerate(&mut self) {
        self.tick_interval += self.tick_step;
        info!(interval_ms = self.tick_interval.as_millis() as u64, "decelerated");
    }

    pub fn dispatch<S>(&mut self, cmd: SimCmd, surface: &mut S) -> io::Result<Flow>
    where
        S: Surface,
    {
        match cmd {
            SimCmd::Exit => {
                info!(generation = self.torus.generation(), "exit requested");
                return Ok(Flow::Exit);
            }
            SimCmd::SwitchMode => self.switch_mode(),
            SimCmd::Accelerate => self.accelerate(),
            SimCmd::Decelerate => self.decelerate(),
            SimCmd::Toggle(screen) => {
                let Some(pos) = status::screen_to_grid(screen, &self.torus) else {
                    return Ok(Flow::Continue);
                };
                let cell = self.torus.toggle(pos);
                debug!(x = pos.x, y = pos.y, active = cell.is_active(), "toggled cell");
                status::draw_cell(surface, pos, cell);
                surface.flush()?;
                return Ok(Flow::Continue);
            }
            SimCmd::Resize(columns, rows) => {
                self.resize(columns, rows, surface)?;
                return Ok(Flow::Continue);
            }
        }
        self.draw_status(surface);
        surface.flush()?;
        Ok(Flow::Continue)
    }

    fn resize<S>(&mut self, columns: usize, rows: usize, surface: &mut S) -> io::Result<()>
    where
        S: Surface,
    {
        let Some((width, height)) = status::grid_size(columns, rows) else {
            warn!(columns, rows, "terminal too small, ignoring resize");
            return Ok(());
        };
        self.running = false;
        let actives = self.torus.resize(width, height);
        info!(width, height, "resized");
        surface.clear();
        for pos in actives {
            status::draw_cell(surface, pos, Cell::active());
        }
        self.draw_status(surface);
        surface.sync()
    }

    /// one timer expiry; only advances the grid while playing.
    pub fn tick<S>(&mut self, surface: &mut S) -> io::Result<()>
    where
        S: Surface,
    {
        if !self.running {
            return Ok(());
        }
        let changed = self.torus.step();
        debug!(
            generation = self.torus.generation(),
            changed = changed.len(),
            "stepped"
        );
        for pos in changed {
            status::draw_cell(surface, pos, self.torus.get(pos));
        }
        self.draw_status(surface);
        surface.flush()
    }

    /// paints every live cell and the status panel.
    pub fn repaint<S>(&self, surface: &mut S) -> io::Result<()>
    where
        S: Surface,
    {
        surface.clear();
        for pos in self.torus.actives() {
            status::draw_cell(surface, pos, Cell::active());
        }
        self.draw_status(surface);
        surface.sync()
    }

    fn draw_status<S>(&self, surface: &mut S)
    where
        S: Surface,
    {
        status::draw_status(
            surface,
            &status::Status {
                width: self.torus.width(),
                height: self.torus.height(),
                running: self.running,
                generation: self.torus.generation(),
                tick_interval: self.tick_interval,
            },
        );
    }

    /// serves commands and ticks until an exit command arrives or every
    /// sender is gone. the next tick is armed with the interval current at
    /// the time of the previous one.
    pub fn run<S>(&mut self, receiver: mpsc::Receiver<SimCmd>, surface: &mut S) -> io::Result<()>
    where
        S: Surface,
    {
        self.repaint(surface)?;
        let mut deadline = Instant::now() + self.tick_interval;
        loop {
            let timeout = deadline.saturating_duration_since(Instant::now());
            match receiver.recv_timeout(timeout) {
                Ok(cmd) => {
                    if self.dispatch(cmd, surface)? == Flow::Exit {
                        return Ok(());
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    self.tick(surface)?;
                    deadline = Instant::now() + self.tick_interval;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    info!("input closed");
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, io, sync::mpsc, time::Duration};

    use super::*;
    use crate::{pos, view::status::MARGIN};

    #[derive(Debug, Default)]
    struct Recorder {
        screen: HashMap<(usize, usize), char>,
        flushes: usize,
        clears: usize,
        syncs: usize,
    }

    impl Recorder {
        fn glyph(&self, x: usize, y: usize) -> char {
            self.screen.get(&(x, y)).copied().unwrap_or(' ')
        }

        fn line(&self, y: usize) -> String {
            (0..MARGIN).map(|x| self.glyph(x, y)).collect::<String>().trim_end().to_string()
        }
    }

    impl Surface for Recorder {
        fn set_cell(&mut self, x: usize, y: usize, glyph: char) {
            self.screen.insert((x, y), glyph);
        }

        fn clear(&mut self) {
            self.clears += 1;
            self.screen.clear();
        }

        fn flush(&mut self) -> io::Result<()> {
            self.flushes += 1;
            Ok(())
        }

        fn sync(&mut self) -> io::Result<()> {
            self.syncs += 1;
            Ok(())
        }
    }

    fn session(width: usize, height: usize, actives: &[(usize, usize)]) -> Session {
        let mut torus = Torus::new(width, height);
        torus.seed(actives.iter().map(|&(x, y)| pos!(x, y)));
        Session::new(torus, DEFAULT_TICK_INTERVAL, DEFAULT_TICK_STEP)
    }

    #[test]
    fn starts_paused() {
        let session = session(4, 4, &[]);
        assert!(!session.is_running());
        assert_eq!(session.torus().generation(), 0);
        assert_eq!(session.tick_interval(), DEFAULT_TICK_INTERVAL);
    }

    #[test]
    fn switch_mode_updates_status() {
        let mut session = session(4, 4, &[]);
        let mut surface = Recorder::default();
        let flow = session.dispatch(SimCmd::SwitchMode, &mut surface).unwrap();
        assert_eq!(flow, Flow::Continue);
        assert!(session.is_running());
        assert_eq!(surface.line(0), "4x4");
        assert_eq!(surface.line(1), "Play");
        assert_eq!(surface.line(2), "Gen: 0");
        assert_eq!(surface.flushes, 1);

        session.dispatch(SimCmd::SwitchMode, &mut surface).unwrap();
        assert!(!session.is_running());
        assert_eq!(surface.line(1), "Pause");
    }

    #[test]
    fn speed_never_goes_negative() {
        let mut session = session(4, 4, &[]);
        let mut surface = Recorder::default();
        for _ in 0..50 {
            session.dispatch(SimCmd::Accelerate, &mut surface).unwrap();
        }
        assert_eq!(session.tick_interval(), Duration::ZERO);
        assert!(!session.is_running());
        session.dispatch(SimCmd::Decelerate, &mut surface).unwrap();
        assert_eq!(session.tick_interval(), DEFAULT_TICK_STEP);
        assert_eq!(surface.line(3), "50ms");
    }

    #[test]
    fn click_toggles_cell_behind_margin() {
        let mut session = session(4, 3, &[]);
        let mut surface = Recorder::default();
        session
            .dispatch(SimCmd::Toggle(pos!(MARGIN + 2, 1)), &mut surface)
            .unwrap();
        assert!(session.torus().get(pos!(2, 1)).is_active());
        assert_eq!(surface.glyph(MARGIN + 2, 1), status::ALIVE);

        session
            .dispatch(SimCmd::Toggle(pos!(MARGIN + 2, 1)), &mut surface)
            .unwrap();
        assert!(!session.torus().get(pos!(2, 1)).is_active());
        assert_eq!(surface.glyph(MARGIN + 2, 1), status::DEAD);
        assert_eq!(session.torus().generation(), 0);
    }

    #[test]
    fn clicks_outside_grid_are_ignored() {
        let mut session = session(4, 3, &[]);
        let mut surface = Recorder::default();
        for screen in [pos!(0, 0), pos!(MARGIN - 1, 1), pos!(MARGIN + 4, 0), pos!(MARGIN, 3)] {
            session.dispatch(SimCmd::Toggle(screen), &mut surface).unwrap();
        }
        assert_eq!(session.torus().population(), 0);
        assert!(surface.screen.is_empty());
        assert_eq!(surface.flushes, 0);
    }

    #[test]
    fn tick_is_gated_by_mode() {
        let mut session = session(5, 5, &[(1, 2), (2, 2), (3, 2)]);
        let mut surface = Recorder::default();
        session.tick(&mut surface).unwrap();
        assert_eq!(session.torus().generation(), 0);
        assert_eq!(surface.flushes, 0);

        session.switch_mode();
        session.tick(&mut surface).unwrap();
        assert_eq!(session.torus().generation(), 1);
        assert_eq!(surface.glyph(MARGIN + 2, 1), status::ALIVE);
        assert_eq!(surface.glyph(MARGIN + 2, 3), status::ALIVE);
        assert_eq!(surface.glyph(MARGIN + 1, 2), status::DEAD);
        assert_eq!(surface.glyph(MARGIN + 3, 2), status::DEAD);
        assert_eq!(surface.line(2), "Gen: 1");
        assert_eq!(surface.flushes, 1);
    }

    #[test]
    fn resize_pauses_and_repaints() {
        let mut session = session(4, 4, &[(3, 3), (0, 1)]);
        let mut surface = Recorder::default();
        session.switch_mode();
        session
            .dispatch(SimCmd::Resize(MARGIN + 2, 2), &mut surface)
            .unwrap();
        assert!(!session.is_running());
        assert_eq!((session.torus().width(), session.torus().height()), (2, 2));
        assert_eq!(session.torus().actives(), vec![pos!(0, 1)]);
        assert_eq!(surface.clears, 1);
        assert_eq!(surface.syncs, 1);
        assert_eq!(surface.glyph(MARGIN, 1), status::ALIVE);
        assert_eq!(surface.line(0), "2x2");
        assert_eq!(surface.line(1), "Pause");
    }

    #[test]
    fn degenerate_resize_is_rejected() {
        let mut session = session(4, 4, &[(3, 3)]);
        let mut surface = Recorder::default();
        session.switch_mode();
        session.dispatch(SimCmd::Resize(MARGIN, 10), &mut surface).unwrap();
        session.dispatch(SimCmd::Resize(40, 0), &mut surface).unwrap();
        assert!(session.is_running());
        assert_eq!((session.torus().width(), session.torus().height()), (4, 4));
        assert_eq!(surface.syncs, 0);
    }

    #[test]
    fn run_serves_queued_commands_until_exit() {
        let mut session = Session::new(Torus::new(4, 4), Duration::from_secs(60), DEFAULT_TICK_STEP);
        let mut surface = Recorder::default();
        let (sender, receiver) = mpsc::channel();
        sender.send(SimCmd::Toggle(pos!(MARGIN + 1, 1))).unwrap();
        sender.send(SimCmd::SwitchMode).unwrap();
        sender.send(SimCmd::Exit).unwrap();
        sender.send(SimCmd::Toggle(pos!(MARGIN + 2, 2))).unwrap();
        session.run(receiver, &mut surface).unwrap();
        assert_eq!(session.torus().actives(), vec![pos!(1, 1)]);
        assert!(session.is_running());
        assert_eq!(session.torus().generation(), 0);
    }

    #[test]
    fn run_stops_when_senders_hang_up() {
        let mut session = Session::new(Torus::new(3, 3), Duration::from_secs(60), DEFAULT_TICK_STEP);
        let mut surface = Recorder::default();
        let (sender, receiver) = mpsc::channel::<SimCmd>();
        drop(sender);
        session.run(receiver, &mut surface).unwrap();
        assert_eq!(surface.syncs, 1);
    }

    #[test]
    fn run_ends_when_input_ends_while_watcher_lives() {
        let mut session = Session::new(Torus::new(4, 4), Duration::from_millis(5), DEFAULT_TICK_STEP);
        session.switch_mode();
        let (sender, receiver) = mpsc::channel();
        let watcher = sender.clone();
        let input = std::thread::spawn(move || {
            crate::view::forward_events(Vec::<io::Result<termion::event::Event>>::new(), &sender)
        });
        let (done, finished) = mpsc::channel();
        let controller = std::thread::spawn(move || {
            let mut surface = Recorder::default();
            session.run(receiver, &mut surface).unwrap();
            done.send(()).unwrap();
        });
        assert!(finished.recv_timeout(Duration::from_secs(2)).is_ok());
        input.join().unwrap();
        controller.join().unwrap();
        drop(watcher);
    }

    #[test]
    fn run_ticks_while_playing() {
        let mut torus = Torus::new(5, 5);
        torus.seed([pos!(1, 2), pos!(2, 2), pos!(3, 2)]);
        let mut session = Session::new(torus, Duration::from_millis(1), DEFAULT_TICK_STEP);
        session.switch_mode();
        let mut surface = Recorder::default();
        let (sender, receiver) = mpsc::channel();
        let feeder = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            sender.send(SimCmd::Exit).unwrap();
        });
        session.run(receiver, &mut surface).unwrap();
        feeder.join().unwrap();
        assert!(session.torus().generation() > 0);
        assert_eq!(session.torus().population(), 3);
    }
}
