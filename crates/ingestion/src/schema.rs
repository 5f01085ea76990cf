//! Column schema per record kind
//!
//! Binds every record field to the source column it is read from. The
//! built-in layouts match the instrument exports; `[columns.<kind>]` config
//! overrides are applied once at startup through [`RecordSchema::with_overrides`].

use std::collections::BTreeMap;

use contracts::RecordKind;

use crate::error::{IngestionError, Result};

/// Override key for the date column
pub const DATE_KEY: &str = "date";
/// Override key for the time column
pub const TIME_KEY: &str = "time";

const GAS_COLUMNS: &[(&str, &str)] = &[
    ("OUR", "OUR"),
    ("RQ", "RQ"),
    ("Kla_1h", "Kla(1/h)"),
    ("Kla_bar", "Kla bar(mmol/min atm)"),
    ("stirrer_speed", "Stirrer speed"),
    ("pH", "pH"),
    ("DO", "DO"),
    ("reactor_temp", "Reactor temperature (C)"),
    ("pio2", "pio2"),
    ("gas_flow_in", "Gas flow in"),
    ("reactor_volume", "Reactor volume(l)"),
    ("Tout", "Tout"),
    ("Tin", "Tin"),
    ("Pout", "Pout"),
    ("Pin", "Pin"),
    ("gas_out", "Gas out"),
    ("Ni", "Ni"),
    ("Nout", "Nout"),
    ("CPR", "CPR"),
    ("Yo2in", "Yo2in"),
    ("Yo2out", "Yo2out"),
    ("Yco2in", "Yco2in"),
    ("Yco2out", "Yco2out"),
    ("Yinert_in", "Yinert in"),
    ("Yinert_out", "Yinert out"),
];

const LEVEL_COLUMNS: &[(&str, &str)] = &[
    ("reactor_weight", "Reactor weigt(kg)"),
    ("volume_reactor", "Volume of Reactor"),
    ("pid_value", "PID"),
    ("pump_rpm", "E. Pump RPM"),
];

const DILUTION_COLUMNS: &[(&str, &str)] = &[
    ("time_passed", "Time passed"),
    ("flowrate", "Flowrate"),
    ("dilution_rate", "Dilution rate"),
    ("volume_reactor", "Volume of Reactor"),
    ("mass_in_tank", "Mass in Tank"),
    ("filtered_mass_in_tank", "Filtered Mass in tank"),
    ("total_tank_balance", "Total tank balance"),
];

/// One field → source column binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnBinding {
    /// Record field (wire name)
    pub field: &'static str,
    /// Source column header
    pub column: String,
}

/// Column layout for one record kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSchema {
    kind: RecordKind,
    date_column: String,
    time_column: String,
    bindings: Vec<ColumnBinding>,
}

impl RecordSchema {
    /// Built-in layout for `kind`
    pub fn builtin(kind: RecordKind) -> Self {
        let columns = match kind {
            RecordKind::Gas => GAS_COLUMNS,
            RecordKind::LevelControl => LEVEL_COLUMNS,
            RecordKind::Dilution => DILUTION_COLUMNS,
        };

        Self {
            kind,
            date_column: "Date".to_string(),
            time_column: "Time".to_string(),
            bindings: columns
                .iter()
                .map(|&(field, column)| ColumnBinding {
                    field,
                    column: column.to_string(),
                })
                .collect(),
        }
    }

    /// Built-in layout with `overrides` (field → column) applied.
    ///
    /// `date` and `time` keys rebind the timestamp columns.
    ///
    /// # Errors
    /// Unknown field names and empty column names.
    pub fn with_overrides(kind: RecordKind, overrides: &BTreeMap<String, String>) -> Result<Self> {
        let mut schema = Self::builtin(kind);
        for (field, column) in overrides {
            schema.rebind(field, column)?;
        }
        Ok(schema)
    }

    fn rebind(&mut self, field: &str, column: &str) -> Result<()> {
        let column = column.trim();
        if column.is_empty() {
            return Err(IngestionError::EmptyColumn {
                kind: self.kind.wire_key().to_string(),
                field: field.to_string(),
            });
        }

        if field.eq_ignore_ascii_case(DATE_KEY) {
            self.date_column = column.to_string();
            return Ok(());
        }
        if field.eq_ignore_ascii_case(TIME_KEY) {
            self.time_column = column.to_string();
            return Ok(());
        }

        let binding = self
            .bindings
            .iter_mut()
            .find(|b| b.field == field)
            .ok_or_else(|| IngestionError::UnknownField {
                kind: self.kind.wire_key().to_string(),
                field: field.to_string(),
            })?;
        binding.column = column.to_string();
        Ok(())
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn date_column(&self) -> &str {
        &self.date_column
    }

    pub fn time_column(&self) -> &str {
        &self.time_column
    }

    pub fn bindings(&self) -> &[ColumnBinding] {
        &self.bindings
    }

    /// Source column for `field`, if the field exists
    pub fn column_for(&self, field: &str) -> Option<&str> {
        self.bindings
            .iter()
            .find(|b| b.field == field)
            .map(|b| b.column.as_str())
    }

    /// Every column this schema reads, timestamp columns first
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        [self.date_column.as_str(), self.time_column.as_str()]
            .into_iter()
            .chain(self.bindings.iter().map(|b| b.column.as_str()))
    }
}
