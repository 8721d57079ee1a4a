//! ==============================================================================
//! domain.rs - posture records and the rendered display state
//! ==============================================================================
//!
//! purpose:
//!     the two value types everything else passes around:
//!     - PostureRecord: one observation as read from (or written to) the store
//!     - DisplayState: what the dashboard regions currently show
//!
//! schema:
//!     records are read schema-on-read. every field is optional and degrades on
//!     its own: a field that is missing or has the wrong json type is simply
//!     absent, it never rejects the whole record.
//!
//! relationships:
//!     - used by: binder.rs (render), store/ (extraction), publisher.rs (build)
//!     - used by: display.rs, web.rs (display state)
//!
//! ==============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// status label the headrest module writes when the head is too far back
pub const SLOUCH_DETECTED: &str = "SLOUCH DETECTED";
/// status label for a head resting within the normal distance
pub const GOOD_POSTURE: &str = "GOOD POSTURE";
/// status label for an unoccupied seat
pub const IDLE: &str = "IDLE";

/// status text shown when the path holds no value
pub const NO_DATA: &str = "No data available";
/// text shown in a region whose field is absent
pub const PLACEHOLDER: &str = "-";
/// mode shown when a record carries none
pub const DEFAULT_MODE: &str = "Default";

// ==============================================================================
// posture record
// ==============================================================================

/// one posture observation
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PostureRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_cm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

impl PostureRecord {
    /// build a record stamped with the current time, as the publisher writes it
    pub fn stamped(status: impl Into<String>, distance_cm: f64) -> Self {
        Self {
            status: Some(status.into()),
            distance_cm: Some(distance_cm),
            timestamp: Some(sortable_timestamp()),
            mode: None,
        }
    }

    /// lenient field-by-field read of a json value.
    ///
    /// returns None only for json null (the store's "nothing here").
    /// any other value yields a record, possibly with every field absent.
    pub fn from_value(value: &Value) -> Option<Self> {
        if value.is_null() {
            return None;
        }

        let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_owned);

        // the first raspberry pi prototype sent epoch seconds as a number
        let timestamp = match value.get("timestamp") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };

        Some(Self {
            status: text("status"),
            distance_cm: value.get("distance_cm").and_then(Value::as_f64),
            timestamp,
            mode: text("mode"),
        })
    }
}

/// current utc time as rfc 3339 with millisecond precision.
/// fixed width and "Z" suffix keep it lexicographically sortable.
pub fn sortable_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// unix timestamp in milliseconds
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ==============================================================================
// display state
// ==============================================================================

/// colour of the status region
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusColor {
    Red,
    Green,
    #[default]
    Gray,
}

impl StatusColor {
    /// three-way colour rule: slouch is red, good posture green, anything else gray
    pub fn for_status(status: Option<&str>) -> Self {
        match status {
            Some(SLOUCH_DETECTED) => StatusColor::Red,
            Some(GOOD_POSTURE) => StatusColor::Green,
            _ => StatusColor::Gray,
        }
    }

    /// css colour name
    pub fn css(self) -> &'static str {
        match self {
            StatusColor::Red => "red",
            StatusColor::Green => "green",
            StatusColor::Gray => "gray",
        }
    }
}

/// everything the dashboard regions show, recomputed whole on every update
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayState {
    pub status: String,
    pub status_color: StatusColor,
    pub distance: String,
    pub timestamp: String,
    pub mode: String,
}

impl DisplayState {
    /// the "nothing at the path" rendering
    pub fn no_data() -> Self {
        Self {
            status: NO_DATA.to_string(),
            status_color: StatusColor::Gray,
            distance: PLACEHOLDER.to_string(),
            timestamp: PLACEHOLDER.to_string(),
            mode: PLACEHOLDER.to_string(),
        }
    }
}

impl Default for DisplayState {
    fn default() -> Self {
        Self::no_data()
    }
}
