// event.rs
use std::{
    sync::mpsc::{self, Receiver},
    thread,
    time::{Duration, Instant},
};

use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use tracing::warn;

pub enum Event {
    Tick,
    Input(KeyEvent),
    Resize,
}

/// Polls crossterm on a background thread and forwards key presses, resizes
/// and periodic ticks over a channel.
pub struct EventHandler {
    receiver: Receiver<Event>,
    #[allow(dead_code)]
    event_thread: thread::JoinHandle<()>,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> EventHandler {
        let (sender, receiver) = mpsc::channel();
        let event_thread = thread::spawn(move || {
            let mut last_tick = Instant::now();
            loop {
                let timeout = tick_rate
                    .checked_sub(last_tick.elapsed())
                    .unwrap_or(Duration::ZERO);

                let polled = match event::poll(timeout) {
                    Ok(ready) => ready,
                    Err(e) => {
                        warn!("unable to poll terminal events: {}", e);
                        break;
                    }
                };
                if polled {
                    let forwarded = match event::read() {
                        // Release and repeat events would toggle twice on some platforms.
                        Ok(CrosstermEvent::Key(e)) if e.kind == KeyEventKind::Press => {
                            sender.send(Event::Input(e))
                        }
                        Ok(CrosstermEvent::Resize(_, _)) => sender.send(Event::Resize),
                        Ok(_) => Ok(()),
                        Err(e) => {
                            warn!("unable to read terminal event: {}", e);
                            break;
                        }
                    };
                    // Receiver gone: the UI loop has exited.
                    if forwarded.is_err() {
                        break;
                    }
                }

                if last_tick.elapsed() >= tick_rate {
                    if sender.send(Event::Tick).is_err() {
                        break;
                    }
                    last_tick = Instant::now();
                }
            }
        });
        EventHandler {
            receiver,
            event_thread,
        }
    }

    pub fn next(&self, timeout: Duration) -> Result<Event, mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}
