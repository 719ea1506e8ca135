//! Guided results tables: expected-vs-entered grading of student data entry.
//!
//! One table per measured component, one row per configured wavelength, three
//! measurement attempts plus the derived average and per-kilometre attenuation
//! cells. Gating is strictly left to right: a cell that went valid is locked
//! forever, and a new instrument measurement is refused until the current
//! attempt's column is fully and correctly transcribed.

use std::collections::HashMap;

use crate::state::{FiberMeasurementResult, Wavelength};
use fotsim_config::ValidationCfg;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CellStatus {
    Empty,
    Valid,
    Error,
}

/// A single graded cell. `status` is always the pure outcome of comparing
/// `entered` against `actual` under the field's tolerance rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    pub entered: Option<f64>,
    pub actual: f64,
    pub status: CellStatus,
    pub message: Option<String>,
}

impl Entry {
    fn awaiting(actual: f64) -> Self {
        Self {
            entered: None,
            actual,
            status: CellStatus::Empty,
            message: None,
        }
    }

    fn is_valid(&self) -> bool {
        self.entered.is_some() && self.status == CellStatus::Valid
    }
}

/// Which cell the student is typing into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// Attempt index 0..=2.
    Measurement(usize),
    Average,
    KmAttenuation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WavelengthRow {
    pub wavelength: Wavelength,
    pub measurements: [Option<Entry>; 3],
    pub average: Option<Entry>,
    pub km_attenuation: Option<Entry>,
}

impl WavelengthRow {
    fn new(wavelength: Wavelength) -> Self {
        Self {
            wavelength,
            measurements: [None, None, None],
            average: None,
            km_attenuation: None,
        }
    }

    fn measurement_valid(&self, index: usize) -> bool {
        self.measurements[index]
            .as_ref()
            .is_some_and(Entry::is_valid)
    }

    fn all_measurements_valid(&self) -> bool {
        (0..3).all(|i| self.measurement_valid(i))
    }

    fn average_valid(&self) -> bool {
        self.average.as_ref().is_some_and(Entry::is_valid)
    }

    fn km_valid(&self) -> bool {
        self.km_attenuation.as_ref().is_some_and(Entry::is_valid)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentResultsTable {
    pub component_id: String,
    pub component_label: String,
    pub fiber_length_m: f64,
    pub rows: Vec<WavelengthRow>,
    /// Attempt currently being transcribed, 1..=3.
    pub current_measurement: usize,
    /// Derived from row state after every mutation, never set directly.
    pub completed: bool,
}

impl ComponentResultsTable {
    fn row_mut(&mut self, wavelength: Wavelength) -> Option<&mut WavelengthRow> {
        self.rows.iter_mut().find(|r| r.wavelength == wavelength)
    }

    fn row(&self, wavelength: Wavelength) -> Option<&WavelengthRow> {
        self.rows.iter().find(|r| r.wavelength == wavelength)
    }

    fn requires_km_attenuation(&self, cfg: &ValidationCfg) -> bool {
        self.fiber_length_m >= cfg.min_fiber_length_for_km_m
    }

    /// All attempts, averages and (where required) km cells valid.
    fn recompute_completed(&mut self, cfg: &ValidationCfg) {
        let requires_km = self.requires_km_attenuation(cfg);
        self.completed = self.rows.iter().all(|row| {
            row.all_measurements_valid()
                && row.average_valid()
                && (!requires_km || row.km_valid())
        });
    }

    /// Every row's entry at the current attempt index is present and valid.
    fn current_attempt_done(&self) -> bool {
        let index = self.current_measurement - 1;
        self.rows.iter().all(|row| row.measurement_valid(index))
    }
}

/// All tables of the session, keyed by component id. Tables accumulate for
/// the whole lab; they are never deleted.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ResultsTables {
    tables: HashMap<String, ComponentResultsTable>,
    /// Component currently awaiting data entry, if any.
    pub pending_input: Option<String>,
    #[serde(skip)]
    cfg: ValidationCfg,
}

impl ResultsTables {
    pub fn new(cfg: ValidationCfg) -> Self {
        Self {
            tables: HashMap::new(),
            pending_input: None,
            cfg,
        }
    }

    pub fn table(&self, component_id: &str) -> Option<&ComponentResultsTable> {
        self.tables.get(component_id)
    }

    pub fn tables(&self) -> impl Iterator<Item = &ComponentResultsTable> {
        self.tables.values()
    }

    /// Create the table for a component on its first completed measurement.
    /// Idempotent: an existing table is left untouched.
    pub fn create_table(
        &mut self,
        component_id: &str,
        component_label: &str,
        fiber_length_m: f64,
        wavelengths: &[Wavelength],
    ) {
        if self.tables.contains_key(component_id) {
            return;
        }
        let table = ComponentResultsTable {
            component_id: component_id.to_string(),
            component_label: component_label.to_string(),
            fiber_length_m,
            rows: wavelengths.iter().map(|&w| WavelengthRow::new(w)).collect(),
            current_measurement: 1,
            completed: false,
        };
        self.tables.insert(component_id.to_string(), table);
        self.pending_input = Some(component_id.to_string());
    }

    /// Record an instrument reading as the expected values for an attempt.
    ///
    /// If the current attempt's column is already fully valid, the table
    /// advances to the next attempt (up to 3) before writing. Delivering the
    /// same completion twice is detected (all rows already populated at the
    /// target attempt) and ignored, because the orchestration layer may
    /// re-fire completion events.
    pub fn add_device_measurement(&mut self, component_id: &str, result: &FiberMeasurementResult) {
        let cfg = self.cfg;
        let Some(table) = self.tables.get_mut(component_id) else {
            return;
        };

        let advance = table.current_attempt_done() && table.current_measurement < 3;
        let target = if advance {
            table.current_measurement + 1
        } else {
            table.current_measurement
        };
        let target_index = target - 1;

        // Duplicate delivery: every row already holds an entry at the target.
        let already_added = table
            .rows
            .iter()
            .all(|row| row.measurements[target_index].is_some());
        if already_added {
            tracing::debug!(component_id, attempt = target, "duplicate measurement delivery ignored");
            return;
        }

        for row in &mut table.rows {
            if let Some(reading) = result.reading_for(row.wavelength) {
                row.measurements[target_index] = Some(Entry::awaiting(reading.average));
            }
        }
        table.current_measurement = target;
        table.recompute_completed(&cfg);
        self.pending_input = Some(component_id.to_string());
    }

    /// Grade a value the student typed into a cell. Returns the resulting
    /// status, or `None` when the cell does not exist.
    pub fn enter_value(
        &mut self,
        component_id: &str,
        wavelength: Wavelength,
        field: Field,
        value: f64,
    ) -> Option<CellStatus> {
        let cfg = self.cfg;
        let table = self.tables.get_mut(component_id)?;
        let requires_km = table.requires_km_attenuation(&cfg);
        let fiber_length_m = table.fiber_length_m;
        let row = table.row_mut(wavelength)?;

        let status = match field {
            Field::Measurement(index) => {
                if index > 2 {
                    return None;
                }
                let entry = row.measurements[index].as_mut()?;
                grade_against(entry, value, cfg.measurement_tolerance_db, || {
                    "Incorrect measurement value".to_string()
                })
            }
            Field::Average => grade_average(row, value, &cfg),
            Field::KmAttenuation => {
                grade_km_attenuation(row, value, requires_km, fiber_length_m, &cfg)
            }
        };

        table.recompute_completed(&cfg);
        if table.current_attempt_done() && self.pending_input.as_deref() == Some(component_id) {
            self.pending_input = None;
        }
        Some(status)
    }

    /// Strict left-to-right, top-to-bottom gating. Once a cell is valid it is
    /// locked for good; later cells unlock only when their prerequisites are.
    pub fn is_cell_editable(&self, component_id: &str, wavelength: Wavelength, field: Field) -> bool {
        let Some(table) = self.tables.get(component_id) else {
            return false;
        };
        let Some(row) = table.row(wavelength) else {
            return false;
        };

        match field {
            Field::Measurement(index) => {
                if index > 2 {
                    return false;
                }
                let Some(entry) = row.measurements[index].as_ref() else {
                    return false;
                };
                if entry.is_valid() || row.all_measurements_valid() {
                    return false;
                }
                index == table.current_measurement - 1
            }
            Field::Average => !row.average_valid() && row.all_measurements_valid(),
            // Short spans never unlock the km cell; the grader's 0-accepting
            // branch stays as a backstop for values fed in anyway.
            Field::KmAttenuation => {
                !row.km_valid()
                    && row.average_valid()
                    && table.requires_km_attenuation(&self.cfg)
            }
        }
    }

    /// True when the current attempt's column is fully transcribed and valid,
    /// i.e. the instrument may be asked for the next measurement.
    pub fn can_proceed(&self, component_id: &str) -> bool {
        self.tables
            .get(component_id)
            .is_some_and(ComponentResultsTable::current_attempt_done)
    }
}

fn grade_against(
    entry: &mut Entry,
    value: f64,
    tolerance: f64,
    message: impl FnOnce() -> String,
) -> CellStatus {
    let valid = (value - entry.actual).abs() <= tolerance;
    entry.entered = Some(value);
    entry.status = if valid { CellStatus::Valid } else { CellStatus::Error };
    entry.message = if valid { None } else { Some(message()) };
    entry.status
}

fn grade_average(row: &mut WavelengthRow, value: f64, cfg: &ValidationCfg) -> CellStatus {
    if !row.all_measurements_valid() {
        row.average = Some(Entry {
            entered: Some(value),
            actual: 0.0,
            status: CellStatus::Error,
            message: Some("Enter all three measurements first".to_string()),
        });
        return CellStatus::Error;
    }

    let sum: f64 = row
        .measurements
        .iter()
        .filter_map(|m| m.as_ref().and_then(|e| e.entered))
        .sum();
    let actual = sum / 3.0;
    let mut entry = Entry::awaiting(actual);
    let status = grade_against(&mut entry, value, cfg.calculation_tolerance_db, || {
        "Incorrect average value".to_string()
    });
    row.average = Some(entry);
    status
}

fn grade_km_attenuation(
    row: &mut WavelengthRow,
    value: f64,
    requires_km: bool,
    fiber_length_m: f64,
    cfg: &ValidationCfg,
) -> CellStatus {
    // Short spans do not get a per-km figure; the only accepted entry is 0.
    if !requires_km {
        let valid = value == 0.0;
        row.km_attenuation = Some(Entry {
            entered: Some(value),
            actual: 0.0,
            status: if valid { CellStatus::Valid } else { CellStatus::Error },
            message: (!valid)
                .then(|| format!("Not required for a {fiber_length_m:.0} m span")),
        });
        return row.km_attenuation.as_ref().map_or(CellStatus::Error, |e| e.status);
    }

    let Some(average_entered) = row
        .average
        .as_ref()
        .filter(|e| e.is_valid())
        .and_then(|e| e.entered)
    else {
        row.km_attenuation = Some(Entry {
            entered: Some(value),
            actual: 0.0,
            status: CellStatus::Error,
            message: Some("Enter the average value first".to_string()),
        });
        return CellStatus::Error;
    };

    let actual = average_entered / (fiber_length_m / 1000.0);
    let mut entry = Entry::awaiting(actual);
    let status = grade_against(&mut entry, value, cfg.calculation_tolerance_db, || {
        "Incorrect kilometric attenuation".to_string()
    });
    row.km_attenuation = Some(entry);
    status
}
