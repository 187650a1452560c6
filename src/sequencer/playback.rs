/// Playback clock - a timer thread that emits step ticks
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    Tick,
}

pub struct Metronome {
    sender: Sender<PlaybackEvent>,
    receiver: Receiver<PlaybackEvent>,
    is_running: Arc<AtomicBool>,
    interval_ms: Arc<AtomicU64>,
}

impl Metronome {
    pub fn new() -> Self {
        let (sender, receiver) = channel();

        Self {
            sender,
            receiver,
            is_running: Arc::new(AtomicBool::new(false)),
            interval_ms: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Start ticking every `interval_ms`. Does nothing if already running.
    pub fn start(&mut self, interval_ms: u64) {
        self.interval_ms.store(interval_ms.max(1), Ordering::Relaxed);
        if self.is_running() {
            return;
        }

        // one flag per run
        let is_running = Arc::new(AtomicBool::new(true));
        self.is_running = Arc::clone(&is_running);
        let interval = Arc::clone(&self.interval_ms);
        let sender = self.sender.clone();

        log::debug!("Metronome started at {} ms", interval_ms);

        thread::spawn(move || {
            let mut last_tick = Instant::now();

            while is_running.load(Ordering::Relaxed) {
                let step = Duration::from_millis(interval.load(Ordering::Relaxed));
                let now = Instant::now();

                if now.duration_since(last_tick) >= step {
                    if sender.send(PlaybackEvent::Tick).is_err() {
                        break;
                    }
                    last_tick = now;
                }

                thread::sleep(Duration::from_millis(1));
            }
        });
    }

    /// Safe to call when not running.
    pub fn stop(&mut self) {
        if self.is_running.swap(false, Ordering::Relaxed) {
            log::debug!("Metronome stopped");
        }
    }

    /// Takes effect on the running thread from its next tick.
    pub fn set_interval_ms(&self, interval_ms: u64) {
        self.interval_ms.store(interval_ms.max(1), Ordering::Relaxed);
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Relaxed)
    }

    pub fn poll_events(&self) -> Vec<PlaybackEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }
}

impl Default for Metronome {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Metronome {
    fn drop(&mut self) {
        self.stop();
    }
}
