/// Control-thread side of the output bus.
///
/// Voices are built on the control thread and handed to the mixer as
/// [`Command::Start`]. Every later change to a voice is another command on
/// the same bounded queue, which the mixer drains at the start of each
/// audio buffer. Nothing here ever waits on the audio thread: a full queue
/// drops the command and logs it.
use std::fmt;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use crate::dsp::{Effect, Param, Signal};

/// Identifies a voice on the mixer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId(u64);

/// Where a source voice's output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Straight to the device.
    Main,
    /// Into the aux send, to be picked up by return voices.
    Send,
}

/// A voice as the mixer runs it.
pub enum Voice {
    /// Generates samples and writes them to its route.
    Source { signal: Box<dyn Signal>, route: Route },
    /// Processes the aux send and writes the result to the main output.
    Return { effect: Box<dyn Effect> },
}

impl Voice {
    pub fn route(&self) -> Option<Route> {
        match self {
            Voice::Source { route, .. } => Some(*route),
            Voice::Return { .. } => None,
        }
    }
}

impl fmt::Debug for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Voice::Source { route, .. } => f.debug_struct("Source").field("route", route).finish(),
            Voice::Return { .. } => f.write_str("Return"),
        }
    }
}

#[derive(Debug)]
pub enum Command {
    Start { id: VoiceId, voice: Voice },
    Set { id: VoiceId, param: Param },
    /// Graceful stop: start the voice's fade-out, the mixer drops it after.
    Release { id: VoiceId },
    /// Immediate stop.
    Stop { id: VoiceId },
}

/// The mixer's ends of the bus channels.
pub struct MixerLink {
    pub commands: Receiver<Command>,
    pub retired: Sender<Voice>,
}

/// Sends voices and voice updates to the mixer.
pub struct Bus {
    commands: Sender<Command>,
    retired: Receiver<Voice>,
    next_id: u64,
}

impl Bus {
    /// Create a bus whose command queue holds `capacity` pending commands.
    pub fn new(capacity: usize) -> (Self, MixerLink) {
        let (command_tx, command_rx) = bounded(capacity.max(1));
        let (retired_tx, retired_rx) = bounded(capacity.max(1));
        let bus = Self {
            commands: command_tx,
            retired: retired_rx,
            next_id: 0,
        };
        let link = MixerLink {
            commands: command_rx,
            retired: retired_tx,
        };
        (bus, link)
    }

    /// Route a signal straight to the output.
    pub fn play(&mut self, signal: Box<dyn Signal>) -> VoiceHandle {
        self.start(Voice::Source {
            signal,
            route: Route::Main,
        })
    }

    /// Route a signal into the aux send.
    pub fn play_to_send(&mut self, signal: Box<dyn Signal>) -> VoiceHandle {
        self.start(Voice::Source {
            signal,
            route: Route::Send,
        })
    }

    /// Start an effect return fed from the aux send.
    pub fn play_return(&mut self, effect: Box<dyn Effect>) -> VoiceHandle {
        self.start(Voice::Return { effect })
    }

    fn start(&mut self, voice: Voice) -> VoiceHandle {
        let id = VoiceId(self.next_id);
        self.next_id += 1;
        self.send(Command::Start { id, voice });
        VoiceHandle { id }
    }

    fn send(&self, command: Command) {
        match self.commands.try_send(command) {
            Ok(()) => {}
            Err(TrySendError::Full(command)) => {
                log::warn!("Audio command queue full, dropping {:?}", command);
            }
            Err(TrySendError::Disconnected(_)) => {
                log::debug!("Audio output not running, command discarded");
            }
        }
    }

    /// Drop voices the mixer has finished with. Call from the control thread.
    pub fn collect_retired(&self) -> usize {
        self.retired.try_iter().count()
    }
}

/// Sole owner of a routed voice.
///
/// Not `Clone`: stopping consumes the handle, so a voice is stopped at most
/// once and never addressed after it is gone.
#[derive(Debug, PartialEq, Eq)]
pub struct VoiceHandle {
    id: VoiceId,
}

impl VoiceHandle {
    pub fn id(&self) -> VoiceId {
        self.id
    }

    pub fn set(&self, bus: &Bus, param: Param) {
        bus.send(Command::Set { id: self.id, param });
    }

    /// Fade out and let the mixer drop the voice when the fade completes.
    pub fn fade_out(self, bus: &Bus) {
        bus.send(Command::Release { id: self.id });
    }

    /// Remove the voice now.
    pub fn stop(self, bus: &Bus) {
        bus.send(Command::Stop { id: self.id });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::oscillator::Sine;

    #[test]
    fn test_handles_get_unique_ids() {
        let (mut bus, link) = Bus::new(8);
        let a = bus.play(Box::new(Sine::new(220.0, 44100.0)));
        let b = bus.play_to_send(Box::new(Sine::new(220.0, 44100.0)));
        assert_ne!(a.id(), b.id());

        let commands: Vec<Command> = link.commands.try_iter().collect();
        assert_eq!(commands.len(), 2);
        assert!(matches!(
            &commands[1],
            Command::Start { voice: Voice::Source { route: Route::Send, .. }, .. }
        ));
    }

    #[test]
    fn test_stop_consumes_handle() {
        let (mut bus, link) = Bus::new(8);
        let handle = bus.play(Box::new(Sine::new(220.0, 44100.0)));
        let id = handle.id();
        handle.set(&bus, Param::Gain(0.1));
        handle.stop(&bus);

        let commands: Vec<Command> = link.commands.try_iter().collect();
        assert!(matches!(commands[1], Command::Set { id: i, param: Param::Gain(_) } if i == id));
        assert!(matches!(commands[2], Command::Stop { id: i } if i == id));
    }

    #[test]
    fn test_full_queue_drops_without_blocking() {
        let (mut bus, link) = Bus::new(1);
        let first = bus.play(Box::new(Sine::new(220.0, 44100.0)));
        first.fade_out(&bus);
        assert_eq!(link.commands.try_iter().count(), 1);
    }

    #[test]
    fn test_disconnected_mixer_is_tolerated() {
        let (mut bus, link) = Bus::new(4);
        drop(link);
        let handle = bus.play(Box::new(Sine::new(220.0, 44100.0)));
        handle.stop(&bus);
        assert_eq!(bus.collect_retired(), 0);
    }
}
