//! Grading and gating behavior of the guided results tables.

use fotsim_config::ValidationCfg;
use fotsim_core::state::{BidirectionalReading, FiberMeasurementResult};
use fotsim_core::{CellStatus, Field, ResultsTables, Wavelength};
use rstest::rstest;

const WAVELENGTHS: [Wavelength; 2] = [Wavelength::W1310, Wavelength::W1550];

fn reading(wavelength: Wavelength, average: f64) -> BidirectionalReading {
    BidirectionalReading {
        wavelength,
        a_to_b: average - 0.05,
        b_to_a: average + 0.05,
        average,
    }
}

fn fiber_result(avg_1310: f64, avg_1550: f64) -> FiberMeasurementResult {
    FiberMeasurementResult {
        fiber_name: "BCFiber001".into(),
        cable_name: "BigCable".into(),
        component_id: "coil-1".into(),
        component_label: "Fiber coil 1 km".into(),
        fiber_length_m: 1000.0,
        readings: vec![
            reading(Wavelength::W1310, avg_1310),
            reading(Wavelength::W1550, avg_1550),
        ],
        timestamp_ms: 0,
    }
}

fn tables_with_first_measurement(fiber_length_m: f64) -> ResultsTables {
    let mut tables = ResultsTables::new(ValidationCfg::default());
    tables.create_table("coil-1", "Fiber coil 1 km", fiber_length_m, &WAVELENGTHS);
    tables.add_device_measurement("coil-1", &fiber_result(2.10, 1.80));
    tables
}

/// Transcribe the current attempt's column correctly for both rows.
fn transcribe_attempt(tables: &mut ResultsTables, index: usize, v_1310: f64, v_1550: f64) {
    assert_eq!(
        tables.enter_value("coil-1", Wavelength::W1310, Field::Measurement(index), v_1310),
        Some(CellStatus::Valid)
    );
    assert_eq!(
        tables.enter_value("coil-1", Wavelength::W1550, Field::Measurement(index), v_1550),
        Some(CellStatus::Valid)
    );
}

#[test]
fn measurement_cells_accept_only_the_displayed_value() {
    let mut tables = tables_with_first_measurement(1000.0);
    assert_eq!(tables.pending_input.as_deref(), Some("coil-1"));

    // Off by a hundredth: rejected, measurement tolerance is zero.
    assert_eq!(
        tables.enter_value("coil-1", Wavelength::W1310, Field::Measurement(0), 2.12),
        Some(CellStatus::Error)
    );
    let table = tables.table("coil-1").unwrap();
    let entry = table.rows[0].measurements[0].as_ref().unwrap();
    assert_eq!(entry.message.as_deref(), Some("Incorrect measurement value"));

    // The exact value corrects the cell in place.
    assert_eq!(
        tables.enter_value("coil-1", Wavelength::W1310, Field::Measurement(0), 2.10),
        Some(CellStatus::Valid)
    );
}

#[test]
fn pending_input_clears_once_the_attempt_is_transcribed() {
    let mut tables = tables_with_first_measurement(1000.0);
    assert!(!tables.can_proceed("coil-1"));
    transcribe_attempt(&mut tables, 0, 2.10, 1.80);
    assert!(tables.can_proceed("coil-1"));
    assert_eq!(tables.pending_input, None);
}

#[test]
fn duplicate_delivery_of_the_same_attempt_is_ignored() {
    let mut tables = tables_with_first_measurement(1000.0);
    let before = tables.table("coil-1").unwrap().clone();
    // Attempt 1 is not transcribed, so this lands on the same column again.
    tables.add_device_measurement("coil-1", &fiber_result(9.99, 9.99));
    assert_eq!(tables.table("coil-1").unwrap(), &before);
}

#[test]
fn table_advances_through_three_attempts() {
    let mut tables = tables_with_first_measurement(1000.0);
    transcribe_attempt(&mut tables, 0, 2.10, 1.80);

    tables.add_device_measurement("coil-1", &fiber_result(2.13, 1.78));
    assert_eq!(tables.table("coil-1").unwrap().current_measurement, 2);
    transcribe_attempt(&mut tables, 1, 2.13, 1.78);

    tables.add_device_measurement("coil-1", &fiber_result(2.07, 1.82));
    assert_eq!(tables.table("coil-1").unwrap().current_measurement, 3);
    transcribe_attempt(&mut tables, 2, 2.07, 1.82);

    // A fourth delivery has nowhere to go.
    let before = tables.table("coil-1").unwrap().clone();
    tables.add_device_measurement("coil-1", &fiber_result(5.0, 5.0));
    assert_eq!(tables.table("coil-1").unwrap(), &before);
}

#[rstest]
#[case(2.10, CellStatus::Valid)] // exact mean of 2.10, 2.13, 2.07
#[case(2.105, CellStatus::Valid)] // inside the 0.01 calculation tolerance
#[case(2.11, CellStatus::Valid)] // a full 0.01 above the mean, still accepted
#[case(2.12, CellStatus::Error)]
#[case(2.08, CellStatus::Error)]
fn average_is_graded_against_the_mean_of_entered_values(
    #[case] entered: f64,
    #[case] expected: CellStatus,
) {
    let mut tables = tables_with_first_measurement(1000.0);
    transcribe_attempt(&mut tables, 0, 2.10, 1.80);
    tables.add_device_measurement("coil-1", &fiber_result(2.13, 1.78));
    transcribe_attempt(&mut tables, 1, 2.13, 1.78);
    tables.add_device_measurement("coil-1", &fiber_result(2.07, 1.82));
    transcribe_attempt(&mut tables, 2, 2.07, 1.82);

    assert_eq!(
        tables.enter_value("coil-1", Wavelength::W1310, Field::Average, entered),
        Some(expected)
    );
}

#[test]
fn average_requires_all_three_measurements_first() {
    let mut tables = tables_with_first_measurement(1000.0);
    transcribe_attempt(&mut tables, 0, 2.10, 1.80);
    assert_eq!(
        tables.enter_value("coil-1", Wavelength::W1310, Field::Average, 2.10),
        Some(CellStatus::Error)
    );
    let table = tables.table("coil-1").unwrap();
    let entry = table.rows[0].average.as_ref().unwrap();
    assert_eq!(
        entry.message.as_deref(),
        Some("Enter all three measurements first")
    );
}

#[test]
fn km_attenuation_divides_the_average_by_span_kilometres() {
    let mut tables = tables_with_first_measurement(1000.0);
    transcribe_attempt(&mut tables, 0, 2.10, 1.80);
    tables.add_device_measurement("coil-1", &fiber_result(2.10, 1.80));
    transcribe_attempt(&mut tables, 1, 2.10, 1.80);
    tables.add_device_measurement("coil-1", &fiber_result(2.10, 1.80));
    transcribe_attempt(&mut tables, 2, 2.10, 1.80);

    // Km cell refuses until the average is in.
    assert_eq!(
        tables.enter_value("coil-1", Wavelength::W1310, Field::KmAttenuation, 2.10),
        Some(CellStatus::Error)
    );
    assert_eq!(
        tables.enter_value("coil-1", Wavelength::W1310, Field::Average, 2.10),
        Some(CellStatus::Valid)
    );
    // 2.10 dB over 1.000 km.
    assert_eq!(
        tables.enter_value("coil-1", Wavelength::W1310, Field::KmAttenuation, 2.10),
        Some(CellStatus::Valid)
    );
    assert_eq!(
        tables.enter_value("coil-1", Wavelength::W1550, Field::KmAttenuation, 1.80),
        Some(CellStatus::Error) // average for this row not entered yet
    );
}

#[test]
fn short_spans_skip_the_km_column() {
    let mut tables = tables_with_first_measurement(300.0);
    transcribe_attempt(&mut tables, 0, 2.10, 1.80);

    assert_eq!(
        tables.enter_value("coil-1", Wavelength::W1310, Field::KmAttenuation, 2.10),
        Some(CellStatus::Error)
    );
    let table = tables.table("coil-1").unwrap();
    let entry = table.rows[0].km_attenuation.as_ref().unwrap();
    assert_eq!(
        entry.message.as_deref(),
        Some("Not required for a 300 m span")
    );
    assert_eq!(
        tables.enter_value("coil-1", Wavelength::W1310, Field::KmAttenuation, 0.0),
        Some(CellStatus::Valid)
    );
}

#[test]
fn short_spans_never_unlock_the_km_cell() {
    let mut tables = tables_with_first_measurement(300.0);
    for i in 0..3 {
        if i > 0 {
            tables.add_device_measurement("coil-1", &fiber_result(2.10, 1.80));
        }
        transcribe_attempt(&mut tables, i, 2.10, 1.80);
    }
    assert_eq!(
        tables.enter_value("coil-1", Wavelength::W1310, Field::Average, 2.10),
        Some(CellStatus::Valid)
    );

    // The row is otherwise complete, yet the km cell stays locked.
    assert!(!tables.is_cell_editable("coil-1", Wavelength::W1310, Field::KmAttenuation));

    // A rejected non-zero entry does not unlock it either.
    assert_eq!(
        tables.enter_value("coil-1", Wavelength::W1310, Field::KmAttenuation, 7.0),
        Some(CellStatus::Error)
    );
    assert!(!tables.is_cell_editable("coil-1", Wavelength::W1310, Field::KmAttenuation));
}

#[test]
fn editability_follows_the_progression_gates() {
    let mut tables = tables_with_first_measurement(1000.0);

    assert!(tables.is_cell_editable("coil-1", Wavelength::W1310, Field::Measurement(0)));
    // Attempt 2 has no entry yet.
    assert!(!tables.is_cell_editable("coil-1", Wavelength::W1310, Field::Measurement(1)));
    assert!(!tables.is_cell_editable("coil-1", Wavelength::W1310, Field::Average));

    transcribe_attempt(&mut tables, 0, 2.10, 1.80);
    // A valid cell is locked for good.
    assert!(!tables.is_cell_editable("coil-1", Wavelength::W1310, Field::Measurement(0)));
}

#[test]
fn table_completes_when_every_required_cell_is_valid() {
    let mut tables = tables_with_first_measurement(1000.0);
    for i in 0..3 {
        if i > 0 {
            tables.add_device_measurement("coil-1", &fiber_result(2.10, 1.80));
        }
        transcribe_attempt(&mut tables, i, 2.10, 1.80);
    }
    for w in WAVELENGTHS {
        let avg = if w == Wavelength::W1310 { 2.10 } else { 1.80 };
        assert_eq!(
            tables.enter_value("coil-1", w, Field::Average, avg),
            Some(CellStatus::Valid)
        );
        assert_eq!(
            tables.enter_value("coil-1", w, Field::KmAttenuation, avg),
            Some(CellStatus::Valid)
        );
    }
    assert!(tables.table("coil-1").unwrap().completed);
}

#[test]
fn create_table_is_idempotent() {
    let mut tables = tables_with_first_measurement(1000.0);
    transcribe_attempt(&mut tables, 0, 2.10, 1.80);
    tables.create_table("coil-1", "renamed", 250.0, &WAVELENGTHS);
    let table = tables.table("coil-1").unwrap();
    assert_eq!(table.component_label, "Fiber coil 1 km");
    assert_eq!(table.fiber_length_m, 1000.0);
    assert!(table.rows[0].measurements[0].is_some());
}
