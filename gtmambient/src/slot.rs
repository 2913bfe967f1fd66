//! Holder of the ambient audio handle

use crate::AmbientAudio;
use std::sync::{Arc, RwLock};
use tracing::{debug, trace};

/// Optional ambient handle plus the volume it starts at
///
/// The handle may appear, disappear or be replaced at any time by whoever
/// owns the ambient element; playback calls made while the slot is empty
/// are dropped.
#[derive(Debug)]
pub struct AmbientSlot {
    handle: RwLock<Option<Arc<dyn AmbientAudio>>>,
    volume: f64,
}

impl Default for AmbientSlot {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl AmbientSlot {
    pub fn new(volume: f64) -> Self {
        Self {
            handle: RwLock::new(None),
            volume: volume.clamp(0.0, 1.0),
        }
    }

    /// Installs a handle, replacing the previous one, and sets its volume
    pub fn install(&self, handle: Arc<dyn AmbientAudio>) {
        handle.set_volume(self.volume);
        *self.handle.write().unwrap() = Some(handle);
        debug!(volume = self.volume, "Ambient handle installed");
    }

    pub fn clear(&self) -> Option<Arc<dyn AmbientAudio>> {
        let previous = self.handle.write().unwrap().take();
        if previous.is_some() {
            debug!("Ambient handle removed");
        }
        previous
    }

    pub fn current(&self) -> Option<Arc<dyn AmbientAudio>> {
        self.handle.read().unwrap().clone()
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn play(&self) {
        match self.current() {
            Some(handle) => handle.play(),
            None => trace!("No ambient handle, play dropped"),
        }
    }

    pub fn pause(&self) {
        match self.current() {
            Some(handle) => handle.pause(),
            None => trace!("No ambient handle, pause dropped"),
        }
    }

    pub(crate) fn set_playing(&self, playing: bool) {
        if playing { self.play() } else { self.pause() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    impl AmbientAudio for Recorder {
        fn play(&self) {
            self.calls.lock().unwrap().push("play".into());
        }
        fn pause(&self) {
            self.calls.lock().unwrap().push("pause".into());
        }
        fn set_volume(&self, volume: f64) {
            self.calls.lock().unwrap().push(format!("volume {volume}"));
        }
    }

    #[test]
    fn test_empty_slot_is_noop() {
        let slot = AmbientSlot::default();
        slot.play();
        slot.pause();
        assert!(slot.current().is_none());
        assert!(slot.clear().is_none());
    }

    #[test]
    fn test_install_applies_volume_then_forwards() {
        let slot = AmbientSlot::new(1.7);
        let recorder = Arc::new(Recorder::default());
        slot.install(recorder.clone());

        slot.set_playing(true);
        slot.set_playing(false);
        assert_eq!(*recorder.calls.lock().unwrap(), vec!["volume 1", "play", "pause"]);

        slot.clear();
        slot.play();
        assert_eq!(recorder.calls.lock().unwrap().len(), 3);
    }
}
