//! ==============================================================================
//! display.rs - display surfaces
//! ==============================================================================
//!
//! purpose:
//!     the concrete targets the binder renders into:
//!
//!     - SharedDisplay:  display state behind a lock, read by the web server
//!     - ConsoleSurface: one structured log line per update
//!
//! sharing:
//!     the binder writes from its subscription task while http handlers read.
//!     SharedDisplay swaps the whole state in one write lock, so a reader sees
//!     either the previous update or the next one, never a mix.
//!
//! ==============================================================================

use std::sync::{Arc, RwLock};

use serde::Serialize;

use crate::binder::DisplaySurface;
use crate::domain::{now_ms, DisplayState, StatusColor};

// ==============================================================================
// shared (web) surface
// ==============================================================================

#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub display: DisplayState,
    /// unix timestamp (ms) of the last render
    pub last_update: u64,
    /// whether the page has a mode region
    pub show_mode: bool,
}

#[derive(Clone)]
pub struct SharedDisplay {
    inner: Arc<RwLock<Snapshot>>,
}

impl SharedDisplay {
    pub fn new(show_mode: bool) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Snapshot {
                display: DisplayState::no_data(),
                last_update: 0,
                show_mode,
            })),
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn update(&self, f: impl FnOnce(&mut Snapshot)) {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut *guard);
        guard.last_update = now_ms();
    }
}

impl DisplaySurface for SharedDisplay {
    fn set_status(&mut self, text: &str) {
        self.update(|s| s.display.status = text.to_string());
    }

    fn set_status_color(&mut self, color: StatusColor) {
        self.update(|s| s.display.status_color = color);
    }

    fn set_distance(&mut self, text: &str) {
        self.update(|s| s.display.distance = text.to_string());
    }

    fn set_timestamp(&mut self, text: &str) {
        self.update(|s| s.display.timestamp = text.to_string());
    }

    fn set_mode(&mut self, text: &str) {
        self.update(|s| s.display.mode = text.to_string());
    }

    fn has_mode(&self) -> bool {
        self.snapshot().show_mode
    }

    fn apply(&mut self, state: &DisplayState) {
        self.update(|s| {
            let mode = if s.show_mode { state.mode.clone() } else { s.display.mode.clone() };
            s.display = DisplayState { mode, ..state.clone() };
        });
    }
}

// ==============================================================================
// console surface
// ==============================================================================

/// logs every rendered state as one line (when enabled)
#[derive(Default)]
pub struct ConsoleSurface {
    enabled: bool,
    state: Option<DisplayState>,
}

impl ConsoleSurface {
    pub fn new(enabled: bool) -> Self {
        Self { enabled, state: None }
    }

    fn state(&mut self) -> &mut DisplayState {
        self.state.get_or_insert_with(DisplayState::no_data)
    }
}

impl DisplaySurface for ConsoleSurface {
    fn set_status(&mut self, text: &str) {
        self.state().status = text.to_string();
    }

    fn set_status_color(&mut self, color: StatusColor) {
        self.state().status_color = color;
    }

    fn set_distance(&mut self, text: &str) {
        self.state().distance = text.to_string();
    }

    fn set_timestamp(&mut self, text: &str) {
        self.state().timestamp = text.to_string();
    }

    fn set_mode(&mut self, text: &str) {
        self.state().mode = text.to_string();
    }

    fn apply(&mut self, state: &DisplayState) {
        self.state = Some(state.clone());
        if !self.enabled {
            return;
        }
        tracing::info!(
            target: "backbeacon::display",
            status = %state.status,
            color = state.status_color.css(),
            distance = %state.distance,
            timestamp = %state.timestamp,
            mode = %state.mode,
            "[POSTURE]"
        );
    }
}
