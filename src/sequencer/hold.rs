/// Hold voices - one momentary voice per instrument while its button is down
use crate::audio::{Bus, VoiceHandle};
use crate::dsp::Param;
use crate::error::Result;
use crate::instrument::{Instrument, InstrumentFactory};
use crate::settings::Settings;

/// Pitch of every hold voice.
pub const HOLD_FREQUENCY: f32 = 220.0;

#[derive(Debug, Default)]
pub struct HoldVoices {
    slots: [Option<VoiceHandle>; Instrument::COUNT],
}

impl HoldVoices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_held(&self, instrument: Instrument) -> bool {
        self.slots[instrument.index()].is_some()
    }

    pub fn held_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Start a hold for `instrument`. A second press while held does nothing.
    pub fn press(
        &mut self,
        instrument: Instrument,
        factory: &mut InstrumentFactory,
        bus: &mut Bus,
        settings: &Settings,
    ) -> Result<()> {
        let slot = &mut self.slots[instrument.index()];
        if slot.is_some() {
            return Ok(());
        }
        let graph = factory.build(instrument, HOLD_FREQUENCY, settings)?;
        *slot = Some(bus.play(Box::new(graph)));
        log::debug!("Hold {} pressed", instrument.name());
        Ok(())
    }

    /// Stop the hold for `instrument` at once.
    pub fn release(&mut self, instrument: Instrument, bus: &Bus) {
        if let Some(handle) = self.slots[instrument.index()].take() {
            handle.stop(bus);
            log::debug!("Hold {} released", instrument.name());
        }
    }

    /// Apply the master volume to every live hold.
    pub fn set_volume(&self, volume: f32, bus: &Bus) {
        for handle in self.slots.iter().flatten() {
            handle.set(bus, Param::Gain(volume));
        }
    }

    pub fn stop_all(&mut self, bus: &Bus) {
        for handle in self.slots.iter_mut().filter_map(Option::take) {
            handle.stop(bus);
        }
    }
}
