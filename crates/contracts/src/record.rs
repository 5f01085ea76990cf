//! SourceRecord - Mapper output, queue element, wire payload
//!
//! One appended instrument row, ready for delivery. The serde
//! representation is the wire format: an object with a single key naming
//! the record kind (`gas`, `level_control`, `dilution`).

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Record kind, one per monitored source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Gas,
    LevelControl,
    Dilution,
}

impl RecordKind {
    /// All kinds, in display order
    pub const ALL: [RecordKind; 3] = [Self::Gas, Self::LevelControl, Self::Dilution];

    /// Key wrapping the record on the wire
    pub fn wire_key(self) -> &'static str {
        match self {
            Self::Gas => "gas",
            Self::LevelControl => "level_control",
            Self::Dilution => "dilution",
        }
    }

    /// Short label used in status messages
    pub fn label(self) -> &'static str {
        match self {
            Self::Gas => "Gas",
            Self::LevelControl => "Level",
            Self::Dilution => "Dilution",
        }
    }

    /// Parse a wire key (`gas`, `level_control`, `dilution`).
    ///
    /// `level` is accepted as an alias for `level_control`.
    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim().to_ascii_lowercase().as_str() {
            "gas" => Some(Self::Gas),
            "level_control" | "level" => Some(Self::LevelControl),
            "dilution" => Some(Self::Dilution),
            _ => None,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_key())
    }
}

/// Off-gas analyser measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GasMeasurement {
    pub reactor_id: i64,
    pub timestamp: NaiveDateTime,
    #[serde(rename = "OUR")]
    pub our: Option<f64>,
    #[serde(rename = "RQ")]
    pub rq: Option<f64>,
    #[serde(rename = "Kla_1h")]
    pub kla_1h: Option<f64>,
    #[serde(rename = "Kla_bar")]
    pub kla_bar: Option<f64>,
    pub stirrer_speed: Option<f64>,
    #[serde(rename = "pH")]
    pub ph: Option<f64>,
    #[serde(rename = "DO")]
    pub dissolved_oxygen: Option<f64>,
    pub reactor_temp: Option<f64>,
    pub pio2: Option<f64>,
    pub gas_flow_in: Option<f64>,
    pub reactor_volume: Option<f64>,
    #[serde(rename = "Tout")]
    pub t_out: Option<f64>,
    #[serde(rename = "Tin")]
    pub t_in: Option<f64>,
    #[serde(rename = "Pout")]
    pub p_out: Option<f64>,
    #[serde(rename = "Pin")]
    pub p_in: Option<f64>,
    pub gas_out: Option<f64>,
    #[serde(rename = "Ni")]
    pub n_in: Option<f64>,
    #[serde(rename = "Nout")]
    pub n_out: Option<f64>,
    #[serde(rename = "CPR")]
    pub cpr: Option<f64>,
    #[serde(rename = "Yo2in")]
    pub y_o2_in: Option<f64>,
    #[serde(rename = "Yo2out")]
    pub y_o2_out: Option<f64>,
    #[serde(rename = "Yco2in")]
    pub y_co2_in: Option<f64>,
    #[serde(rename = "Yco2out")]
    pub y_co2_out: Option<f64>,
    #[serde(rename = "Yinert_in")]
    pub y_inert_in: Option<f64>,
    #[serde(rename = "Yinert_out")]
    pub y_inert_out: Option<f64>,
    pub uploaded_at: NaiveDateTime,
}

/// Level control loop reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelControl {
    pub reactor_id: i64,
    pub timestamp: NaiveDateTime,
    pub reactor_weight: Option<f64>,
    pub volume_reactor: Option<f64>,
    pub pid_value: Option<f64>,
    pub pump_rpm: Option<f64>,
    pub uploaded_at: NaiveDateTime,
}

/// Feed/dilution balance reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DilutionMeasurement {
    pub reactor_id: i64,
    pub timestamp: NaiveDateTime,
    pub time_passed: Option<f64>,
    pub flowrate: Option<f64>,
    pub dilution_rate: Option<f64>,
    pub volume_reactor: Option<f64>,
    pub mass_in_tank: Option<f64>,
    pub filtered_mass_in_tank: Option<f64>,
    pub total_tank_balance: Option<f64>,
    pub uploaded_at: NaiveDateTime,
}

/// A record prepared for delivery. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceRecord {
    Gas(GasMeasurement),
    LevelControl(LevelControl),
    Dilution(DilutionMeasurement),
}

impl SourceRecord {
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Gas(_) => RecordKind::Gas,
            Self::LevelControl(_) => RecordKind::LevelControl,
            Self::Dilution(_) => RecordKind::Dilution,
        }
    }

    pub fn reactor_id(&self) -> i64 {
        match self {
            Self::Gas(r) => r.reactor_id,
            Self::LevelControl(r) => r.reactor_id,
            Self::Dilution(r) => r.reactor_id,
        }
    }

    /// Measurement time taken from the source row
    pub fn timestamp(&self) -> NaiveDateTime {
        match self {
            Self::Gas(r) => r.timestamp,
            Self::LevelControl(r) => r.timestamp,
            Self::Dilution(r) => r.timestamp,
        }
    }

    /// Wall-clock time at which the row was mapped
    pub fn uploaded_at(&self) -> NaiveDateTime {
        match self {
            Self::Gas(r) => r.uploaded_at,
            Self::LevelControl(r) => r.uploaded_at,
            Self::Dilution(r) => r.uploaded_at,
        }
    }
}
