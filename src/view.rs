use std::{
    io::{self, stdin},
    sync::mpsc,
    thread::{self, JoinHandle},
    time::Duration,
};

use termion::{
    event::{Event, Key, MouseButton, MouseEvent},
    input::TermRead,
};
use tracing::{debug, warn};

use crate::{pos, Pos, SimCmd};

pub use canvas::Canvas;
mod canvas;

pub mod status;

/// The drawing capability the controller renders through.
/// Coordinates are 0-based screen cells.
pub trait Surface {
    fn set_cell(&mut self, x: usize, y: usize, glyph: char);
    /// blanks the whole screen on the next flush.
    fn clear(&mut self);
    fn flush(&mut self) -> io::Result<()>;
    /// redraws the whole screen, used after the terminal changed size.
    fn sync(&mut self) -> io::Result<()>;
}

/// translates one terminal event, `None` for anything without a binding.
pub fn command_of(event: Event) -> Option<SimCmd> {
    let command = match event {
        Event::Key(Key::Esc | Key::Char('\n') | Key::Char('q') | Key::Char('Q')) => SimCmd::Exit,
        Event::Key(Key::Char(' ')) => SimCmd::SwitchMode,
        Event::Key(Key::Left) => SimCmd::Accelerate,
        Event::Key(Key::Right) => SimCmd::Decelerate,
        // termion reports drags as holds without the button, so any drag paints
        Event::Mouse(MouseEvent::Press(MouseButton::Left, x, y) | MouseEvent::Hold(x, y)) => {
            SimCmd::Toggle(pos!(
                (x as usize).saturating_sub(1),
                (y as usize).saturating_sub(1)
            ))
        }
        _ => return None,
    };
    Some(command)
}

pub fn spawn_input(sender: mpsc::Sender<SimCmd>) -> JoinHandle<()> {
    thread::spawn(move || input_loop(sender))
}

fn input_loop(sender: mpsc::Sender<SimCmd>) {
    forward_events(stdin().events(), &sender);
}

/// sends the command for each event until quit, end of input or a read
/// error. every way out ends the session with an exit command.
pub fn forward_events<I>(events: I, sender: &mpsc::Sender<SimCmd>)
where
    I: IntoIterator<Item = io::Result<Event>>,
{
    for event in events {
        let event = match event {
            Ok(event) => event,
            Err(error) => {
                warn!(%error, "failed to read input");
                break;
            }
        };
        let Some(command) = command_of(event) else {
            continue;
        };
        debug!(?command, "input");
        let exit = command == SimCmd::Exit;
        if sender.send(command).is_err() || exit {
            return;
        }
    }
    debug!("input ended");
    let _ = sender.send(SimCmd::Exit);
}

const RESIZE_CHECK_INTERVAL: Duration = Duration::from_millis(100);

/// termion has no resize event, so the size is polled and a
/// [`SimCmd::Resize`] is sent whenever it differs from the last one seen.
pub fn spawn_resize_watch(sender: mpsc::Sender<SimCmd>, size: (u16, u16)) -> JoinHandle<()> {
    thread::spawn(move || resize_loop(sender, size))
}

fn resize_loop(sender: mpsc::Sender<SimCmd>, mut last: (u16, u16)) {
    loop {
        thread::sleep(RESIZE_CHECK_INTERVAL);
        let size = match termion::terminal_size() {
            Ok(size) => size,
            Err(error) => {
                warn!(%error, "failed to read terminal size");
                return;
            }
        };
        if size == last {
            continue;
        }
        last = size;
        let (columns, rows) = size;
        if sender
            .send(SimCmd::Resize(columns as usize, rows as usize))
            .is_err()
        {
            return;
        }
    }
}

#[test]
fn test_key_bindings() {
    for key in [Key::Esc, Key::Char('\n'), Key::Char('q'), Key::Char('Q')] {
        assert_eq!(command_of(Event::Key(key)), Some(SimCmd::Exit));
    }
    assert_eq!(command_of(Event::Key(Key::Char(' '))), Some(SimCmd::SwitchMode));
    assert_eq!(command_of(Event::Key(Key::Left)), Some(SimCmd::Accelerate));
    assert_eq!(command_of(Event::Key(Key::Right)), Some(SimCmd::Decelerate));
    assert_eq!(command_of(Event::Key(Key::Char('x'))), None);
    assert_eq!(command_of(Event::Key(Key::Up)), None);
}

#[test]
fn test_mouse_bindings() {
    let press = Event::Mouse(MouseEvent::Press(MouseButton::Left, 12, 3));
    assert_eq!(command_of(press), Some(SimCmd::Toggle(pos!(11, 2))));
    let right = Event::Mouse(MouseEvent::Press(MouseButton::Right, 12, 3));
    assert_eq!(command_of(right), None);
    let release = Event::Mouse(MouseEvent::Release(12, 3));
    assert_eq!(command_of(release), None);
    let drag = Event::Mouse(MouseEvent::Hold(13, 3));
    assert_eq!(command_of(drag), Some(SimCmd::Toggle(pos!(12, 2))));
}

#[cfg(test)]
fn forwarded(events: Vec<io::Result<Event>>) -> Vec<SimCmd> {
    let (sender, receiver) = mpsc::channel();
    forward_events(events, &sender);
    drop(sender);
    receiver.iter().collect()
}

#[test]
fn test_forward_events_stops_at_quit() {
    let events = vec![
        Ok(Event::Key(Key::Char(' '))),
        Ok(Event::Key(Key::Char('q'))),
        Ok(Event::Key(Key::Left)),
    ];
    assert_eq!(forwarded(events), vec![SimCmd::SwitchMode, SimCmd::Exit]);
}

#[test]
fn test_forward_events_exits_when_input_ends() {
    let events = vec![Ok(Event::Key(Key::Right))];
    assert_eq!(forwarded(events), vec![SimCmd::Decelerate, SimCmd::Exit]);
    assert_eq!(forwarded(vec![]), vec![SimCmd::Exit]);
}

#[test]
fn test_forward_events_exits_on_read_error() {
    let events = vec![
        Err(io::Error::new(io::ErrorKind::UnexpectedEof, "closed")),
        Ok(Event::Key(Key::Left)),
    ];
    assert_eq!(forwarded(events), vec![SimCmd::Exit]);
}
