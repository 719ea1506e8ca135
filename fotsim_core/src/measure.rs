//! Synthetic measurement generation.
//!
//! Pure functions over an injected `rand::Rng`; under a fixed seed every
//! generated value is reproducible. Readings are rounded to 0.01 (what the
//! LCD shows) before they are stored or compared, so the student transcribes
//! exactly what the instrument displayed.

use rand::Rng;

use crate::catalog::PassiveComponent;
use crate::error::MeasureError;
use crate::scheme::{ConnectionScheme, ElementKind};
use crate::state::{
    BidirectionalReading, FiberMeasurementResult, PortStatus, ReferenceResult, Wavelength,
};
use fotsim_config::MeasurementCfg;

/// What the instrument reports.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mode {
    /// Received power in dBm.
    Power,
    /// Insertion loss in dB.
    Loss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Db,
    Dbm,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub value: f64,
    pub unit: Unit,
}

/// Nominal light-source power per wavelength (dBm).
pub fn source_power_dbm(wavelength: Wavelength) -> f64 {
    match wavelength {
        Wavelength::W850 => -5.0,
        Wavelength::W1300 => -7.0,
        Wavelength::W1310 => -6.5,
        Wavelength::W1550 => -8.0,
        Wavelength::W1625 => -8.5,
    }
}

/// Standard normal sample via the Box–Muller transform.
///
/// Implemented directly on `Rng` rather than through a distribution type so
/// the sampling stays bit-for-bit stable across dependency bumps.
pub fn gaussian<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let mut u: f64 = 0.0;
    while u == 0.0 {
        u = rng.r#gen::<f64>();
    }
    let mut v: f64 = 0.0;
    while v == 0.0 {
        v = rng.r#gen::<f64>();
    }
    (-2.0 * u.ln()).sqrt() * (2.0 * std::f64::consts::PI * v).cos()
}

/// Round to the 0.01 resolution of the display.
#[inline]
pub(crate) fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// One simulated reading of a single component between the two test ports.
///
/// Base loss comes from the catalog table, plus gaussian variation and the two
/// mated connectors. Loss beyond the dynamic range is an error result, never a
/// clamped number: the real instrument cannot see through a 45 dB span either.
pub fn single_component_measurement<R: Rng + ?Sized>(
    cfg: &MeasurementCfg,
    component: &PassiveComponent,
    mode: Mode,
    wavelength: Wavelength,
    rng: &mut R,
) -> Result<Reading, MeasureError> {
    let base = component.kind.base_loss_db(wavelength);
    let actual = base + gaussian(rng) * cfg.std_dev_db;
    let total = actual + cfg.connector_loss_db * 2.0;
    finish_reading(cfg, total, mode, wavelength)
}

/// Simulated reading of an assembled scheme: losses of every component and
/// connector in the sequence accumulate.
pub fn complex_scheme_measurement<R: Rng + ?Sized>(
    cfg: &MeasurementCfg,
    scheme: &ConnectionScheme,
    components: &[PassiveComponent],
    mode: Mode,
    wavelength: Wavelength,
    rng: &mut R,
) -> Result<Reading, MeasureError> {
    let mut total = 0.0;
    for element in &scheme.sequence {
        match element.kind {
            ElementKind::Component => {
                if let Some(component) = components.iter().find(|c| c.id == element.id) {
                    let base = component.kind.base_loss_db(wavelength);
                    total += base + gaussian(rng) * cfg.std_dev_db;
                }
            }
            ElementKind::Connector => total += cfg.connector_loss_db,
            ElementKind::Tester => {}
        }
    }
    finish_reading(cfg, total, mode, wavelength)
}

fn finish_reading(
    cfg: &MeasurementCfg,
    total_db: f64,
    mode: Mode,
    wavelength: Wavelength,
) -> Result<Reading, MeasureError> {
    // Boundary convention: exactly max_loss_db still measures.
    if total_db > cfg.max_loss_db {
        return Err(MeasureError::RangeExceeded {
            total_db,
            max_db: cfg.max_loss_db,
        });
    }
    match mode {
        Mode::Power => Ok(Reading {
            value: round2(source_power_dbm(wavelength) - total_db),
            unit: Unit::Dbm,
        }),
        Mode::Loss => Ok(Reading {
            value: round2(total_db),
            unit: Unit::Db,
        }),
    }
}

/// Bidirectional FasTest measurement of a fiber-bearing component.
///
/// When a previous result for this exact component exists, both directions are
/// perturbed by the much tighter repeat deviation instead of being
/// regenerated: re-measuring the same fiber must give nearly the same numbers.
/// Fresh measurements derive A→B from the single-component path and B→A from a
/// small asymmetry term on top of it.
pub fn fiber_measurement<R: Rng + ?Sized>(
    cfg: &MeasurementCfg,
    component: &PassiveComponent,
    wavelengths: &[Wavelength],
    fiber_number: u32,
    previous: Option<&FiberMeasurementResult>,
    timestamp_ms: u64,
    rng: &mut R,
) -> Result<FiberMeasurementResult, MeasureError> {
    if component.fiber_length_m <= 0.0 {
        return Err(MeasureError::MissingFiberLength {
            id: component.id.clone(),
        });
    }

    let mut readings = Vec::with_capacity(wavelengths.len());
    for &wavelength in wavelengths {
        let prev_reading = previous.and_then(|p| p.reading_for(wavelength));
        let reading = match prev_reading {
            Some(prev) => {
                // One tight perturbation applied to both directions, so the
                // asymmetry between them is preserved across repeats.
                let wobble = gaussian(rng) * cfg.repeat_std_dev_db;
                let a_to_b = prev.a_to_b + wobble;
                let b_to_a = prev.b_to_a + wobble;
                BidirectionalReading {
                    wavelength,
                    a_to_b: round2(a_to_b),
                    b_to_a: round2(b_to_a),
                    average: round2((a_to_b + b_to_a) / 2.0),
                }
            }
            None => {
                let base =
                    single_component_measurement(cfg, component, Mode::Loss, wavelength, rng)?;
                let a_to_b = base.value;
                let b_to_a = a_to_b + gaussian(rng) * cfg.asymmetry_std_dev_db;
                BidirectionalReading {
                    wavelength,
                    a_to_b: round2(a_to_b),
                    b_to_a: round2(b_to_a),
                    average: round2((a_to_b + b_to_a) / 2.0),
                }
            }
        };
        readings.push(reading);
    }

    Ok(FiberMeasurementResult {
        fiber_name: format!("{}{:03}", cfg.fiber_prefix, fiber_number),
        cable_name: cfg.cable_name.clone(),
        component_id: component.id.clone(),
        component_label: component.label.clone(),
        fiber_length_m: component.fiber_length_m,
        readings,
        timestamp_ms,
    })
}

/// Baseline (reference) power readings for the selected wavelengths.
///
/// The loopback reference sees only the two mated connectors; dirty or
/// still-drying ports add a contamination penalty. A previous reference is
/// perturbed by the repeat deviation rather than regenerated, for the same
/// repeatability reason as fiber measurements.
pub fn reference_measurement<R: Rng + ?Sized>(
    cfg: &MeasurementCfg,
    wavelengths: &[Wavelength],
    port_status: PortStatus,
    previous: &[ReferenceResult],
    timestamp_ms: u64,
    rng: &mut R,
) -> Vec<ReferenceResult> {
    wavelengths
        .iter()
        .map(|&wavelength| {
            let prev = previous.iter().find(|r| r.wavelength == wavelength);
            let value_dbm = match prev {
                Some(prev) => prev.value_dbm + gaussian(rng) * cfg.repeat_std_dev_db,
                None => {
                    let mut loss = cfg.connector_loss_db * 2.0;
                    if port_status != PortStatus::Clean {
                        loss += cfg.dirty_port_penalty_db;
                    }
                    source_power_dbm(wavelength) - loss + gaussian(rng) * cfg.reference_jitter_db
                }
            };
            ReferenceResult {
                wavelength,
                value_dbm: round2(value_dbm),
                timestamp_ms,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ComponentKind, ConnectorType};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn coil() -> PassiveComponent {
        PassiveComponent {
            id: "coil-1".into(),
            kind: ComponentKind::FiberCoil,
            label: "Fiber coil 1 km".into(),
            connector: ConnectorType::ScApc,
            fiber_length_m: 1000.0,
        }
    }

    #[test]
    fn deterministic_under_fixed_seed() {
        let cfg = MeasurementCfg::default();
        let mut a = ChaCha8Rng::seed_from_u64(7);
        let mut b = ChaCha8Rng::seed_from_u64(7);
        let ra =
            single_component_measurement(&cfg, &coil(), Mode::Loss, Wavelength::W1310, &mut a);
        let rb =
            single_component_measurement(&cfg, &coil(), Mode::Loss, Wavelength::W1310, &mut b);
        assert_eq!(ra, rb);
    }

    #[test]
    fn loss_mode_reports_db_near_base_plus_connectors() {
        let cfg = MeasurementCfg::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..200 {
            let r = single_component_measurement(&cfg, &coil(), Mode::Loss, Wavelength::W1550, &mut rng)
                .unwrap();
            assert_eq!(r.unit, Unit::Db);
            // base 1.5 + 0.6 connectors, ±5σ
            assert!((r.value - 2.1).abs() < 0.15 * 5.0, "value {}", r.value);
        }
    }

    #[test]
    fn power_mode_subtracts_from_source() {
        let cfg = MeasurementCfg::default();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let r = single_component_measurement(&cfg, &coil(), Mode::Power, Wavelength::W1310, &mut rng)
            .unwrap();
        assert_eq!(r.unit, Unit::Dbm);
        assert!(r.value < source_power_dbm(Wavelength::W1310));
    }

    #[test]
    fn gaussian_is_roughly_standard_normal() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let n = 20_000;
        let samples: Vec<f64> = (0..n).map(|_| gaussian(&mut rng)).collect();
        let mean = samples.iter().sum::<f64>() / n as f64;
        let var = samples.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / n as f64;
        assert!(mean.abs() < 0.05, "mean {mean}");
        assert!((var - 1.0).abs() < 0.1, "variance {var}");
    }

    #[test]
    fn dynamic_range_boundary_is_inclusive() {
        let cfg = MeasurementCfg::default();
        // Exactly at the limit still measures; anything above is an error.
        assert!(finish_reading(&cfg, 45.0, Mode::Loss, Wavelength::W1310).is_ok());
        assert!(matches!(
            finish_reading(&cfg, 45.01, Mode::Loss, Wavelength::W1310),
            Err(MeasureError::RangeExceeded { .. })
        ));
    }

    #[test]
    fn over_range_component_always_errors() {
        let mut cfg = MeasurementCfg::default();
        cfg.max_loss_db = 1.0; // coil base loss alone is beyond this
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for _ in 0..50 {
            let r = single_component_measurement(
                &cfg,
                &coil(),
                Mode::Loss,
                Wavelength::W1550,
                &mut rng,
            );
            assert!(matches!(r, Err(MeasureError::RangeExceeded { .. })));
        }
    }

    #[test]
    fn reference_with_dirty_ports_reads_lower() {
        let cfg = MeasurementCfg::default();
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let clean = reference_measurement(
            &cfg,
            &[Wavelength::W1310],
            PortStatus::Clean,
            &[],
            0,
            &mut rng,
        );
        let dirty = reference_measurement(
            &cfg,
            &[Wavelength::W1310],
            PortStatus::Dirty,
            &[],
            0,
            &mut rng,
        );
        assert!(dirty[0].value_dbm < clean[0].value_dbm);
    }
}
