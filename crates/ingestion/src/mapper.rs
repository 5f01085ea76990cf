//! Record mapper
//!
//! Converts one source row into a [`SourceRecord`]. Numeric cells that are
//! missing, blank or unparsable become `None`; only the timestamp is
//! mandatory.

use chrono::{Local, NaiveDateTime};
use contracts::{DilutionMeasurement, GasMeasurement, LevelControl, RecordKind, SourceRecord};

use crate::schema::RecordSchema;
use crate::table::SourceRow;
use crate::timestamp::{normalize, InvalidTimestamp};

/// Schema-aware accessor over one row
#[derive(Debug, Clone, Copy)]
pub struct FieldReader<'a> {
    schema: &'a RecordSchema,
    row: SourceRow<'a>,
}

impl<'a> FieldReader<'a> {
    pub fn new(schema: &'a RecordSchema, row: SourceRow<'a>) -> Self {
        Self { schema, row }
    }

    /// Numeric value of `field`; `None` when absent or not a finite number
    pub fn number(&self, field: &str) -> Option<f64> {
        let column = self.schema.column_for(field)?;
        let cell = self.row.get(column)?;
        cell.parse::<f64>().ok().filter(|v| v.is_finite())
    }

    pub fn date(&self) -> &'a str {
        self.row.get(self.schema.date_column()).unwrap_or("")
    }

    pub fn time(&self) -> &'a str {
        self.row.get(self.schema.time_column()).unwrap_or("")
    }

    fn timestamp(&self) -> Result<NaiveDateTime, InvalidTimestamp> {
        normalize(self.date(), self.time())
    }
}

pub fn map_gas(
    r: &FieldReader<'_>,
    reactor_id: i64,
    uploaded_at: NaiveDateTime,
) -> Result<SourceRecord, InvalidTimestamp> {
    Ok(SourceRecord::Gas(GasMeasurement {
        reactor_id,
        timestamp: r.timestamp()?,
        our: r.number("OUR"),
        rq: r.number("RQ"),
        kla_1h: r.number("Kla_1h"),
        kla_bar: r.number("Kla_bar"),
        stirrer_speed: r.number("stirrer_speed"),
        ph: r.number("pH"),
        dissolved_oxygen: r.number("DO"),
        reactor_temp: r.number("reactor_temp"),
        pio2: r.number("pio2"),
        gas_flow_in: r.number("gas_flow_in"),
        reactor_volume: r.number("reactor_volume"),
        t_out: r.number("Tout"),
        t_in: r.number("Tin"),
        p_out: r.number("Pout"),
        p_in: r.number("Pin"),
        gas_out: r.number("gas_out"),
        n_in: r.number("Ni"),
        n_out: r.number("Nout"),
        cpr: r.number("CPR"),
        y_o2_in: r.number("Yo2in"),
        y_o2_out: r.number("Yo2out"),
        y_co2_in: r.number("Yco2in"),
        y_co2_out: r.number("Yco2out"),
        y_inert_in: r.number("Yinert_in"),
        y_inert_out: r.number("Yinert_out"),
        uploaded_at,
    }))
}

pub fn map_level(
    r: &FieldReader<'_>,
    reactor_id: i64,
    uploaded_at: NaiveDateTime,
) -> Result<SourceRecord, InvalidTimestamp> {
    Ok(SourceRecord::LevelControl(LevelControl {
        reactor_id,
        timestamp: r.timestamp()?,
        reactor_weight: r.number("reactor_weight"),
        volume_reactor: r.number("volume_reactor"),
        pid_value: r.number("pid_value"),
        pump_rpm: r.number("pump_rpm"),
        uploaded_at,
    }))
}

pub fn map_dilution(
    r: &FieldReader<'_>,
    reactor_id: i64,
    uploaded_at: NaiveDateTime,
) -> Result<SourceRecord, InvalidTimestamp> {
    Ok(SourceRecord::Dilution(DilutionMeasurement {
        reactor_id,
        timestamp: r.timestamp()?,
        time_passed: r.number("time_passed"),
        flowrate: r.number("flowrate"),
        dilution_rate: r.number("dilution_rate"),
        volume_reactor: r.number("volume_reactor"),
        mass_in_tank: r.number("mass_in_tank"),
        filtered_mass_in_tank: r.number("filtered_mass_in_tank"),
        total_tank_balance: r.number("total_tank_balance"),
        uploaded_at,
    }))
}

/// Maps rows of one source kind
#[derive(Debug, Clone)]
pub struct RecordMapper {
    schema: RecordSchema,
}

impl RecordMapper {
    pub fn new(schema: RecordSchema) -> Self {
        Self { schema }
    }

    pub fn builtin(kind: RecordKind) -> Self {
        Self::new(RecordSchema::builtin(kind))
    }

    pub fn kind(&self) -> RecordKind {
        self.schema.kind()
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    /// Map `row`, stamping `uploaded_at` with the local wall clock
    pub fn map_row(
        &self,
        row: SourceRow<'_>,
        reactor_id: i64,
    ) -> Result<SourceRecord, InvalidTimestamp> {
        self.map_row_at(row, reactor_id, Local::now().naive_local())
    }

    pub fn map_row_at(
        &self,
        row: SourceRow<'_>,
        reactor_id: i64,
        uploaded_at: NaiveDateTime,
    ) -> Result<SourceRecord, InvalidTimestamp> {
        let reader = FieldReader::new(&self.schema, row);
        match self.schema.kind() {
            RecordKind::Gas => map_gas(&reader, reactor_id, uploaded_at),
            RecordKind::LevelControl => map_level(&reader, reactor_id, uploaded_at),
            RecordKind::Dilution => map_dilution(&reader, reactor_id, uploaded_at),
        }
    }
}
