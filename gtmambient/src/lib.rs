//! # gtmambient - Ambient menu music coordination
//!
//! The ambient stream is the background music of the host's menus. It must
//! never play while a game is running or while the theme selection UI is
//! open. [`AmbientController`] tracks both signals and drives an injected
//! [`AmbientAudio`] handle accordingly.
//!
//! # Architecture
//!
//! - **AmbientController**: the debounced state machine (cheap to clone)
//! - **AmbientSlot**: holder of the optional ambient handle; play/pause are
//!   silent no-ops while it is empty
//! - **AmbientState**: the composite state broadcast to observers
//!
//! # Example
//!
//! ```no_run
//! use gtmambient::{AmbientController, AmbientTimings};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let controller = AmbientController::new(AmbientTimings::default());
//! let mut updates = controller.subscribe();
//!
//! controller.set_active_sessions([730]);
//! let state = updates.recv().await.unwrap();
//! assert!(!state.should_play());
//! # }
//! ```

mod controller;
mod slot;

#[cfg(feature = "gtmconfig")]
mod config_ext;

pub use controller::AmbientController;
pub use slot::AmbientSlot;

#[cfg(feature = "gtmconfig")]
pub use config_ext::AmbientConfigExt;

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt::Debug;
use std::time::Duration;

/// Identifier of a running foreground game
pub type SessionId = u32;

/// Play/pause capability of the ambient audio element
///
/// The controller never creates or destroys the element; it only toggles
/// playback on whichever handle is currently installed in its
/// [`AmbientSlot`].
pub trait AmbientAudio: Debug + Send + Sync {
    fn play(&self);

    fn pause(&self);

    /// Linear volume in `[0, 1]`
    fn set_volume(&self, volume: f64);
}

/// Composite state owned by the controller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmbientState {
    pub active_sessions: BTreeSet<SessionId>,
    pub selection_ui_open: bool,
}

impl AmbientState {
    /// Ambient music may play only when idle and outside the selection UI
    pub fn should_play(&self) -> bool {
        !self.selection_ui_open && self.active_sessions.is_empty()
    }
}

/// Delays driving the debounced transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmbientTimings {
    /// Delay before a "selection UI closed" update is applied
    pub dismiss_delay: Duration,
    /// How long pause is re-asserted after the last game stops
    pub settle_window: Duration,
    /// Spacing of the re-asserted pauses
    pub settle_interval: Duration,
}

impl Default for AmbientTimings {
    fn default() -> Self {
        Self {
            dismiss_delay: Duration::from_millis(1000),
            settle_window: Duration::from_millis(1000),
            settle_interval: Duration::from_millis(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_play_truth_table() {
        let mut state = AmbientState::default();
        assert!(state.should_play());

        state.selection_ui_open = true;
        assert!(!state.should_play());

        state.selection_ui_open = false;
        state.active_sessions.insert(42);
        assert!(!state.should_play());

        state.selection_ui_open = true;
        assert!(!state.should_play());
    }

    #[test]
    fn test_state_serializes_for_ui() {
        let state = AmbientState {
            active_sessions: [7, 3].into_iter().collect(),
            selection_ui_open: true,
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["activeSessions"], serde_json::json!([3, 7]));
        assert_eq!(json["selectionUiOpen"], true);
    }
}
