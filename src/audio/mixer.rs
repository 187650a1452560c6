/// Audio-thread side of the output bus.
///
/// The mixer owns every live voice. It drains pending commands once per
/// buffer, renders sources, feeds the aux send through return voices and
/// hands finished voices back to the control thread to be dropped there.
/// The voice list never grows past [`VOICE_CAPACITY`]: starts beyond it are
/// refused and handed straight back.
use super::bus::{Command, MixerLink, Route, Voice, VoiceId};

/// Most voices the mixer holds, live or waiting to be handed back.
pub const VOICE_CAPACITY: usize = 64;

struct Slot {
    id: VoiceId,
    voice: Voice,
}

impl Slot {
    fn is_finished(&self) -> bool {
        match &self.voice {
            Voice::Source { signal, .. } => signal.is_finished(),
            Voice::Return { .. } => false,
        }
    }
}

pub struct Mixer {
    link: MixerLink,
    slots: Vec<Slot>,
    // removed voices the retire queue had no room for
    pending: Vec<Voice>,
    refused: usize,
}

impl Mixer {
    pub fn new(link: MixerLink) -> Self {
        Self {
            link,
            slots: Vec::with_capacity(VOICE_CAPACITY),
            pending: Vec::with_capacity(VOICE_CAPACITY),
            refused: 0,
        }
    }

    pub fn voice_count(&self) -> usize {
        self.slots.len()
    }

    /// Starts turned away because the mixer was full.
    pub fn refused_count(&self) -> usize {
        self.refused
    }

    /// Removed voices still waiting for room in the retire queue.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn has_voice(&self, id: VoiceId) -> bool {
        self.slots.iter().any(|slot| slot.id == id)
    }

    /// Apply every command queued since the last buffer.
    pub fn drain_commands(&mut self) {
        self.flush_pending();
        while let Ok(command) = self.link.commands.try_recv() {
            self.apply(command);
        }
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Start { id, voice } => {
                if self.slots.len() + self.pending.len() >= VOICE_CAPACITY {
                    self.refused += 1;
                    self.retire(voice);
                } else {
                    self.slots.push(Slot { id, voice });
                }
            }
            Command::Set { id, param } => {
                if let Some(slot) = self.slots.iter_mut().find(|slot| slot.id == id) {
                    match &mut slot.voice {
                        Voice::Source { signal, .. } => signal.set(param),
                        Voice::Return { effect } => effect.set(param),
                    }
                }
            }
            Command::Release { id } => {
                let Some(slot) = self.slots.iter_mut().find(|slot| slot.id == id) else {
                    return;
                };
                if let Voice::Source { signal, .. } = &mut slot.voice {
                    signal.release();
                    return;
                }
                // returns have no envelope of their own
                self.remove(id);
            }
            Command::Stop { id } => self.remove(id),
        }
    }

    fn remove(&mut self, id: VoiceId) {
        if let Some(index) = self.slots.iter().position(|slot| slot.id == id) {
            let slot = self.slots.swap_remove(index);
            self.retire(slot.voice);
        }
    }

    fn retire(&mut self, voice: Voice) {
        if let Err(err) = self.link.retired.try_send(voice) {
            // dropped here only once both the queue and the backlog are full
            if self.pending.len() < self.pending.capacity() {
                self.pending.push(err.into_inner());
            }
        }
    }

    fn flush_pending(&mut self) {
        while let Some(voice) = self.pending.pop() {
            if let Err(err) = self.link.retired.try_send(voice) {
                self.pending.push(err.into_inner());
                break;
            }
        }
    }

    /// One mono output sample.
    pub fn next_sample(&mut self) -> f32 {
        let mut send = 0.0;
        let mut main = 0.0;
        for slot in &mut self.slots {
            if let Voice::Source { signal, route } = &mut slot.voice {
                match route {
                    Route::Main => main += signal.tick(),
                    Route::Send => send += signal.tick(),
                }
            }
        }
        for slot in &mut self.slots {
            if let Voice::Return { effect } = &mut slot.voice {
                main += effect.process(send);
            }
        }
        main.clamp(-1.0, 1.0)
    }

    /// Fill an interleaved buffer, copying the mono mix to every channel.
    pub fn render(&mut self, out: &mut [f32], channels: usize) {
        self.drain_commands();
        for frame in out.chunks_mut(channels.max(1)) {
            let sample = self.next_sample();
            frame.fill(sample);
        }
        self.reap();
    }

    /// Retire voices whose envelopes have run out.
    fn reap(&mut self) {
        let mut index = 0;
        while index < self.slots.len() {
            if self.slots[index].is_finished() {
                let slot = self.slots.swap_remove(index);
                self.retire(slot.voice);
            } else {
                index += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::bus::Bus;
    use crate::dsp::envelope::Fader;
    use crate::dsp::test_util::{Dc, SR};
    use crate::dsp::{Effect, Param, Processed};

    struct Halve;

    impl Effect for Halve {
        fn process(&mut self, input: f32) -> f32 {
            input * 0.5
        }
    }

    #[test]
    fn test_sources_sum_on_main() {
        let (mut bus, link) = Bus::new(16);
        let mut mixer = Mixer::new(link);
        let _a = bus.play(Box::new(Dc(0.25)));
        let _b = bus.play(Box::new(Dc(0.5)));

        let mut out = [0.0f32; 4];
        mixer.render(&mut out, 2);
        assert_eq!(out, [0.75; 4]);
        assert_eq!(mixer.voice_count(), 2);
    }

    #[test]
    fn test_send_is_heard_only_through_return() {
        let (mut bus, link) = Bus::new(16);
        let mut mixer = Mixer::new(link);
        let _src = bus.play_to_send(Box::new(Dc(0.8)));

        let mut out = [0.0f32; 2];
        mixer.render(&mut out, 1);
        assert_eq!(out, [0.0; 2]);

        let ret = bus.play_return(Box::new(Halve));
        mixer.render(&mut out, 1);
        assert_eq!(out, [0.4; 2]);

        ret.stop(&bus);
        mixer.render(&mut out, 1);
        assert_eq!(out, [0.0; 2]);
        assert_eq!(bus.collect_retired(), 1);
    }

    #[test]
    fn test_release_removes_voice_after_fade() {
        let (mut bus, link) = Bus::new(16);
        let mut mixer = Mixer::new(link);
        let fader = Fader::new(0.001, 0.01, 1.0, SR).play();
        let handle = bus.play(Box::new(fader));
        let id = handle.id();

        let mut out = vec![0.0f32; 256];
        mixer.render(&mut out, 1);
        assert!(mixer.has_voice(id));

        handle.fade_out(&bus);
        mixer.render(&mut out, 1);
        assert!(mixer.has_voice(id));
        mixer.render(&mut out, 1);
        assert!(!mixer.has_voice(id));
        assert_eq!(bus.collect_retired(), 1);
    }

    #[test]
    fn test_stop_is_immediate() {
        let (mut bus, link) = Bus::new(16);
        let mut mixer = Mixer::new(link);
        let handle = bus.play(Box::new(Dc(0.5)));
        let mut out = [0.0f32; 8];
        mixer.render(&mut out, 1);
        handle.stop(&bus);
        mixer.render(&mut out, 1);
        assert_eq!(mixer.voice_count(), 0);
        assert_eq!(out, [0.0; 8]);
    }

    #[test]
    fn test_set_reaches_voice() {
        let (mut bus, link) = Bus::new(16);
        let mut mixer = Mixer::new(link);
        let fader = Fader::new(0.0, 0.1, 1.0, SR).play();
        let handle = bus.play(Box::new(Processed::new(Box::new(fader), Box::new(Halve))));
        let mut out = [0.0f32; 4];
        mixer.render(&mut out, 1);
        assert_eq!(out[3], 0.5);
        handle.set(&bus, Param::Gain(0.5));
        mixer.render(&mut out, 1);
        assert_eq!(out[0], 0.25);
    }

    #[test]
    fn test_starts_beyond_capacity_are_refused() {
        let (mut bus, link) = Bus::new(2 * VOICE_CAPACITY);
        let mut mixer = Mixer::new(link);
        let handles: Vec<_> = (0..VOICE_CAPACITY + 1)
            .map(|_| bus.play(Box::new(Dc(0.0))))
            .collect();
        let mut out = [0.0f32; 1];
        mixer.render(&mut out, 1);

        assert_eq!(mixer.voice_count(), VOICE_CAPACITY);
        assert_eq!(mixer.refused_count(), 1);
        assert!(!mixer.has_voice(handles[VOICE_CAPACITY].id()));
        assert_eq!(bus.collect_retired(), 1);
    }

    #[test]
    fn test_full_retire_queue_holds_voices_back() {
        let (mut bus, link) = Bus::new(2);
        let mut mixer = Mixer::new(link);
        let mut out = [0.0f32; 1];
        let a = bus.play(Box::new(Dc(0.1)));
        let b = bus.play(Box::new(Dc(0.1)));
        mixer.render(&mut out, 1);
        a.stop(&bus);
        b.stop(&bus);
        mixer.render(&mut out, 1);

        let c = bus.play(Box::new(Dc(0.1)));
        mixer.render(&mut out, 1);
        c.stop(&bus);
        mixer.render(&mut out, 1);
        assert_eq!(mixer.pending_count(), 1);

        assert_eq!(bus.collect_retired(), 2);
        mixer.render(&mut out, 1);
        assert_eq!(mixer.pending_count(), 0);
        assert_eq!(bus.collect_retired(), 1);
    }

    #[test]
    fn test_output_is_clamped() {
        let (mut bus, link) = Bus::new(16);
        let mut mixer = Mixer::new(link);
        let _a = bus.play(Box::new(Dc(0.9)));
        let _b = bus.play(Box::new(Dc(0.9)));
        let mut out = [0.0f32; 1];
        mixer.render(&mut out, 1);
        assert_eq!(out[0], 1.0);
    }
}
