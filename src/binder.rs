//! ==============================================================================
//! binder.rs - live status binder
//! ==============================================================================
//!
//! purpose:
//!     maps store notifications onto display updates.
//!     every notification carries the latest record at the path (or nothing),
//!     and every notification re-renders ALL regions from that value alone.
//!
//! seams:
//!     - DisplaySurface: named setters for each region (status, colour,
//!       distance, timestamp, mode). display.rs has the real ones, tests
//!       use a recording fake.
//!     - RecordObserver: single-method observer the store backends call.
//!       the binder is one; nothing in here knows about firebase.
//!
//! relationships:
//!     - uses: domain.rs (PostureRecord, DisplayState, colour rule)
//!     - used by: main.rs (wires a backend subscription to the surfaces)
//!     - called by: store/memory.rs, store/firebase.rs (on_record)
//!
//! ==============================================================================

use crate::domain::{DisplayState, PostureRecord, StatusColor, DEFAULT_MODE, PLACEHOLDER};
use crate::store::{Subscribe, SubscriptionHandle};

// ==============================================================================
// seams
// ==============================================================================

/// a set of named text regions plus one colour-styled status region
pub trait DisplaySurface: Send + 'static {
    fn set_status(&mut self, text: &str);
    fn set_status_color(&mut self, color: StatusColor);
    fn set_distance(&mut self, text: &str);
    fn set_timestamp(&mut self, text: &str);
    fn set_mode(&mut self, text: &str);

    /// whether this surface has a mode region at all
    fn has_mode(&self) -> bool {
        true
    }

    /// write a whole display state through the setters.
    /// surfaces with concurrent readers override this to swap atomically.
    fn apply(&mut self, state: &DisplayState) {
        self.set_status(&state.status);
        self.set_status_color(state.status_color);
        self.set_distance(&state.distance);
        self.set_timestamp(&state.timestamp);
        if self.has_mode() {
            self.set_mode(&state.mode);
        }
    }
}

/// receives the latest value at a subscribed path, or None when it is empty
pub trait RecordObserver: Send + 'static {
    fn on_record(&mut self, record: Option<&PostureRecord>);
}

/// two surfaces driven as one
impl<A: DisplaySurface, B: DisplaySurface> DisplaySurface for (A, B) {
    fn set_status(&mut self, text: &str) {
        self.0.set_status(text);
        self.1.set_status(text);
    }

    fn set_status_color(&mut self, color: StatusColor) {
        self.0.set_status_color(color);
        self.1.set_status_color(color);
    }

    fn set_distance(&mut self, text: &str) {
        self.0.set_distance(text);
        self.1.set_distance(text);
    }

    fn set_timestamp(&mut self, text: &str) {
        self.0.set_timestamp(text);
        self.1.set_timestamp(text);
    }

    fn set_mode(&mut self, text: &str) {
        self.0.set_mode(text);
        self.1.set_mode(text);
    }

    fn has_mode(&self) -> bool {
        self.0.has_mode() || self.1.has_mode()
    }

    fn apply(&mut self, state: &DisplayState) {
        self.0.apply(state);
        self.1.apply(state);
    }
}

// ==============================================================================
// rendering
// ==============================================================================

#[derive(Clone, Copy, Debug)]
pub struct RenderOptions {
    /// append " cm" to the distance
    pub distance_unit: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { distance_unit: true }
    }
}

/// compute the full display state for the latest value at the path
pub fn render(record: Option<&PostureRecord>, opts: RenderOptions) -> DisplayState {
    let Some(record) = record else {
        return DisplayState::no_data();
    };

    let distance = match record.distance_cm {
        Some(d) if opts.distance_unit => format!("{} cm", d),
        Some(d) => d.to_string(),
        None => PLACEHOLDER.to_string(),
    };

    DisplayState {
        status: record.status.clone().unwrap_or_else(|| PLACEHOLDER.to_string()),
        status_color: StatusColor::for_status(record.status.as_deref()),
        distance,
        timestamp: record.timestamp.clone().unwrap_or_else(|| PLACEHOLDER.to_string()),
        mode: record.mode.clone().unwrap_or_else(|| DEFAULT_MODE.to_string()),
    }
}

// ==============================================================================
// binder
// ==============================================================================

pub struct StatusBinder<D> {
    surface: D,
    opts: RenderOptions,
}

impl<D: DisplaySurface> StatusBinder<D> {
    /// create a binder and put the surface into its placeholder state
    pub fn new(mut surface: D, opts: RenderOptions) -> Self {
        surface.apply(&DisplayState::no_data());
        Self { surface, opts }
    }

    /// register with a source; the binder lives inside the subscription
    /// until the returned handle is stopped
    pub fn start<S: Subscribe + ?Sized>(self, source: &S) -> SubscriptionHandle {
        source.subscribe(Box::new(self))
    }

    #[cfg(test)]
    pub fn surface(&self) -> &D {
        &self.surface
    }
}

impl<D: DisplaySurface> RecordObserver for StatusBinder<D> {
    fn on_record(&mut self, record: Option<&PostureRecord>) {
        let state = render(record, self.opts);
        tracing::debug!(status = %state.status, color = state.status_color.css(), "render");
        self.surface.apply(&state);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::{GOOD_POSTURE, NO_DATA, SLOUCH_DETECTED};

    /// recording fake: keeps the current region contents
    #[derive(Default)]
    pub(crate) struct FakeSurface {
        pub status: String,
        pub color: StatusColor,
        pub distance: String,
        pub timestamp: String,
        pub mode: Option<String>,
        pub with_mode: bool,
    }

    impl FakeSurface {
        pub fn with_mode() -> Self {
            Self { with_mode: true, ..Default::default() }
        }
    }

    impl DisplaySurface for FakeSurface {
        fn set_status(&mut self, text: &str) {
            self.status = text.to_string();
        }
        fn set_status_color(&mut self, color: StatusColor) {
            self.color = color;
        }
        fn set_distance(&mut self, text: &str) {
            self.distance = text.to_string();
        }
        fn set_timestamp(&mut self, text: &str) {
            self.timestamp = text.to_string();
        }
        fn set_mode(&mut self, text: &str) {
            self.mode = Some(text.to_string());
        }
        fn has_mode(&self) -> bool {
            self.with_mode
        }
    }

    fn record(status: Option<&str>, distance: Option<f64>, ts: Option<&str>) -> PostureRecord {
        PostureRecord {
            status: status.map(str::to_owned),
            distance_cm: distance,
            timestamp: ts.map(str::to_owned),
            mode: None,
        }
    }

    #[test]
    fn test_new_renders_placeholders() {
        let binder = StatusBinder::new(FakeSurface::with_mode(), RenderOptions::default());
        let s = binder.surface();
        assert_eq!(s.status, NO_DATA);
        assert_eq!(s.distance, "-");
        assert_eq!(s.timestamp, "-");
        assert_eq!(s.mode.as_deref(), Some("-"));
        assert_eq!(s.color, StatusColor::Gray);
    }

    #[test]
    fn test_good_posture_renders_fields() {
        let mut binder = StatusBinder::new(FakeSurface::with_mode(), RenderOptions::default());
        binder.on_record(Some(&record(Some(GOOD_POSTURE), Some(42.0), Some("T1"))));

        let s = binder.surface();
        assert!(s.status.contains("GOOD POSTURE"));
        assert!(s.distance.contains("42"));
        assert!(s.distance.contains("cm"));
        assert_eq!(s.distance, "42 cm");
        assert_eq!(s.timestamp, "T1");
        assert_eq!(s.color, StatusColor::Green);
    }

    #[test]
    fn test_slouch_is_red_and_unknown_is_gray() {
        let mut binder = StatusBinder::new(FakeSurface::default(), RenderOptions::default());

        binder.on_record(Some(&record(Some(SLOUCH_DETECTED), Some(48.25), None)));
        assert_eq!(binder.surface().color, StatusColor::Red);
        assert_eq!(binder.surface().distance, "48.25 cm");

        binder.on_record(Some(&record(Some("IDLE"), Some(0.0), None)));
        assert_eq!(binder.surface().color, StatusColor::Gray);

        binder.on_record(Some(&record(None, None, None)));
        assert_eq!(binder.surface().color, StatusColor::Gray);
        assert_eq!(binder.surface().status, "-");
    }

    #[test]
    fn test_absent_value_clears_previous_data() {
        let mut binder = StatusBinder::new(FakeSurface::with_mode(), RenderOptions::default());
        binder.on_record(Some(&record(Some(SLOUCH_DETECTED), Some(50.0), Some("T9"))));
        binder.on_record(None);

        let s = binder.surface();
        assert_eq!(s.status, NO_DATA);
        assert_eq!(s.distance, "-");
        assert_eq!(s.timestamp, "-");
        assert_eq!(s.mode.as_deref(), Some("-"));
        assert_eq!(s.color, StatusColor::Gray);
    }

    #[test]
    fn test_repeated_notification_is_idempotent() {
        let mut binder = StatusBinder::new(FakeSurface::with_mode(), RenderOptions::default());
        let r = record(Some(GOOD_POSTURE), Some(21.5), Some("T2"));

        binder.on_record(Some(&r));
        let first = (
            binder.surface().status.clone(),
            binder.surface().distance.clone(),
            binder.surface().timestamp.clone(),
            binder.surface().color,
            binder.surface().mode.clone(),
        );
        binder.on_record(Some(&r));
        let second = (
            binder.surface().status.clone(),
            binder.surface().distance.clone(),
            binder.surface().timestamp.clone(),
            binder.surface().color,
            binder.surface().mode.clone(),
        );
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_mode_renders_default() {
        let mut binder = StatusBinder::new(FakeSurface::with_mode(), RenderOptions::default());
        binder.on_record(Some(&record(Some(GOOD_POSTURE), Some(20.0), Some("T3"))));
        assert_eq!(binder.surface().mode.as_deref(), Some("Default"));

        let mut with_mode = record(Some(GOOD_POSTURE), Some(20.0), Some("T3"));
        with_mode.mode = Some("Study".into());
        binder.on_record(Some(&with_mode));
        assert_eq!(binder.surface().mode.as_deref(), Some("Study"));
    }

    #[test]
    fn test_surface_without_mode_is_never_asked() {
        let mut binder = StatusBinder::new(FakeSurface::default(), RenderOptions::default());
        binder.on_record(Some(&record(Some(GOOD_POSTURE), Some(20.0), Some("T3"))));
        assert_eq!(binder.surface().mode, None);
    }

    #[test]
    fn test_unitless_distance() {
        let opts = RenderOptions { distance_unit: false };
        let state = render(Some(&record(None, Some(42.0), None)), opts);
        assert_eq!(state.distance, "42");
    }

    #[test]
    fn test_pair_surface_drives_both() {
        let pair = (FakeSurface::default(), FakeSurface::with_mode());
        let mut binder = StatusBinder::new(pair, RenderOptions::default());
        binder.on_record(Some(&record(Some(SLOUCH_DETECTED), Some(41.0), Some("T4"))));

        let (a, b) = binder.surface();
        assert_eq!(a.status, "SLOUCH DETECTED");
        assert_eq!(b.status, "SLOUCH DETECTED");
        assert_eq!(a.mode, None);
        assert_eq!(b.mode.as_deref(), Some("Default"));
    }

    #[tokio::test]
    async fn test_live_subscription_tracks_set_then_remove() {
        use crate::display::SharedDisplay;
        use crate::store::{MemoryStore, PathLayout};
        use serde_json::json;
        use std::time::Duration;

        async fn wait_for_status(display: &SharedDisplay, want: &str) {
            for _ in 0..200 {
                if display.snapshot().display.status == want {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            panic!("display never showed {:?}", want);
        }

        let store = MemoryStore::new("BackBeacon", PathLayout::Scalar);
        let display = SharedDisplay::new(true);
        let handle = StatusBinder::new(display.clone(), RenderOptions::default()).start(&store);
        wait_for_status(&display, NO_DATA).await;

        store.set(json!({"status": "SLOUCH DETECTED", "distance_cm": 44, "timestamp": "T9"}));
        wait_for_status(&display, SLOUCH_DETECTED).await;
        let shown = display.snapshot().display;
        assert_eq!(shown.distance, "44 cm");
        assert_eq!(shown.status_color, StatusColor::Red);

        store.remove();
        wait_for_status(&display, NO_DATA).await;
        let shown = display.snapshot().display;
        assert_eq!(shown.distance, PLACEHOLDER);
        assert_eq!(shown.timestamp, PLACEHOLDER);
        assert_eq!(shown.status_color, StatusColor::Gray);

        handle.stop();
    }
}
