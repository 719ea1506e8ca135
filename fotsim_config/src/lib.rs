#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and catalog parsing for the optical tester simulator.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - The passive-component catalog is loaded from CSV with strict headers so a
//!   mislabeled lab kit file fails loudly instead of producing nonsense losses.
use serde::Deserialize;

/// Catalog CSV schema.
///
/// Expected headers:
/// id,kind,label,connector,fiber_length_m
///
/// Example:
/// id,kind,label,connector,fiber_length_m
/// coil-1,FIBER_COIL,Fiber coil 1 km,SC_APC,1000
/// patch-2,OPTICAL_CABLE,Patch cord 3 m,SC_UPC,3
#[derive(Debug, Deserialize, Clone)]
pub struct CatalogRow {
    pub id: String,
    pub kind: String,
    pub label: String,
    pub connector: String,
    pub fiber_length_m: f64,
}

/// Fixed delays for the instrument's timed phases (milliseconds).
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct TimingCfg {
    /// Boot animation delay between LOADING and MAIN
    pub loading_ms: u64,
    /// Port cleaning duration
    pub cleaning_ms: u64,
    /// Reference and fiber measurement duration
    pub measuring_ms: u64,
}

impl Default for TimingCfg {
    fn default() -> Self {
        Self {
            loading_ms: 2_000,
            cleaning_ms: 1_500,
            measuring_ms: 3_000,
        }
    }
}

/// Parameters of the synthetic measurement model.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MeasurementCfg {
    /// Standard deviation of a first-time loss measurement (dB)
    pub std_dev_db: f64,
    /// Standard deviation applied when re-measuring a known fiber (dB).
    /// Much tighter than `std_dev_db`: repeat readings must track the
    /// previous ones, not regenerate from scratch.
    pub repeat_std_dev_db: f64,
    /// Scale of the B→A direction asymmetry term (dB)
    pub asymmetry_std_dev_db: f64,
    /// Loss per mated connector (dB)
    pub connector_loss_db: f64,
    /// Loss per fusion splice (dB)
    pub splice_loss_db: f64,
    /// Dynamic-range limit; accumulated loss above this is unmeasurable (dB)
    pub max_loss_db: f64,
    /// Jitter of a reference (baseline) power reading (dB)
    pub reference_jitter_db: f64,
    /// Extra loss added to reference readings while ports are not clean (dB)
    pub dirty_port_penalty_db: f64,
    /// Cable name reported in fiber results
    pub cable_name: String,
    /// Prefix for the zero-padded fiber label (e.g. "BCFiber" -> BCFiber001)
    pub fiber_prefix: String,
}

impl Default for MeasurementCfg {
    fn default() -> Self {
        Self {
            std_dev_db: 0.15,
            repeat_std_dev_db: 0.015,
            asymmetry_std_dev_db: 0.15,
            connector_loss_db: 0.3,
            splice_loss_db: 0.1,
            max_loss_db: 45.0,
            reference_jitter_db: 0.05,
            dirty_port_penalty_db: 1.5,
            cable_name: "BigCable".into(),
            fiber_prefix: "BCFiber".into(),
        }
    }
}

/// Tolerances for grading student data entry.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct ValidationCfg {
    /// Tolerance for raw measurement transcription (dB). 0 = exact match.
    pub measurement_tolerance_db: f64,
    /// Tolerance for derived values: average and km attenuation (dB), inclusive.
    pub calculation_tolerance_db: f64,
    /// Spans at least this long (metres) require a km-attenuation entry.
    pub min_fiber_length_for_km_m: f64,
}

impl Default for ValidationCfg {
    fn default() -> Self {
        Self {
            measurement_tolerance_db: 0.0,
            calculation_tolerance_db: 0.01,
            min_fiber_length_for_km_m: 500.0,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub timing: TimingCfg,
    pub measurement: MeasurementCfg,
    pub validation: ValidationCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read and validate a config file; a missing path yields the defaults.
pub fn load_file(path: &std::path::Path) -> eyre::Result<Config> {
    if !path.exists() {
        let cfg = Config::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {:?}: {}", path, e))?;
    let cfg = load_toml(&content).map_err(|e| eyre::eyre!("parse config {:?}: {}", path, e))?;
    cfg.validate()?;
    Ok(cfg)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Timing
        if self.timing.loading_ms == 0 {
            eyre::bail!("timing.loading_ms must be >= 1");
        }
        if self.timing.cleaning_ms == 0 {
            eyre::bail!("timing.cleaning_ms must be >= 1");
        }
        if self.timing.measuring_ms == 0 {
            eyre::bail!("timing.measuring_ms must be >= 1");
        }
        if self.timing.measuring_ms > 60_000 {
            eyre::bail!("timing.measuring_ms is unreasonably large (>60s)");
        }

        // Measurement model
        if self.measurement.std_dev_db <= 0.0 {
            eyre::bail!("measurement.std_dev_db must be > 0");
        }
        if self.measurement.repeat_std_dev_db <= 0.0 {
            eyre::bail!("measurement.repeat_std_dev_db must be > 0");
        }
        if self.measurement.repeat_std_dev_db >= self.measurement.std_dev_db {
            eyre::bail!("measurement.repeat_std_dev_db must be < std_dev_db");
        }
        if self.measurement.asymmetry_std_dev_db < 0.0 {
            eyre::bail!("measurement.asymmetry_std_dev_db must be >= 0");
        }
        if self.measurement.connector_loss_db < 0.0 {
            eyre::bail!("measurement.connector_loss_db must be >= 0");
        }
        if self.measurement.splice_loss_db < 0.0 {
            eyre::bail!("measurement.splice_loss_db must be >= 0");
        }
        if self.measurement.max_loss_db <= 0.0 {
            eyre::bail!("measurement.max_loss_db must be > 0");
        }
        if self.measurement.reference_jitter_db < 0.0 {
            eyre::bail!("measurement.reference_jitter_db must be >= 0");
        }
        if self.measurement.dirty_port_penalty_db < 0.0 {
            eyre::bail!("measurement.dirty_port_penalty_db must be >= 0");
        }
        if self.measurement.fiber_prefix.is_empty() {
            eyre::bail!("measurement.fiber_prefix must not be empty");
        }

        // Grading tolerances
        if self.validation.measurement_tolerance_db < 0.0 {
            eyre::bail!("validation.measurement_tolerance_db must be >= 0");
        }
        if self.validation.calculation_tolerance_db <= 0.0 {
            eyre::bail!("validation.calculation_tolerance_db must be > 0");
        }
        if self.validation.min_fiber_length_for_km_m <= 0.0 {
            eyre::bail!("validation.min_fiber_length_for_km_m must be > 0");
        }

        Ok(())
    }
}

pub fn load_catalog_csv(path: &std::path::Path) -> eyre::Result<Vec<CatalogRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open catalog CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["id", "kind", "label", "connector", "fiber_length_m"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "catalog CSV must have headers 'id,kind,label,connector,fiber_length_m', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<CatalogRow>().enumerate() {
        match rec {
            Ok(row) => {
                if row.id.trim().is_empty() {
                    eyre::bail!("catalog CSV row {}: empty id", idx + 2);
                }
                if row.fiber_length_m < 0.0 {
                    eyre::bail!("catalog CSV row {}: negative fiber length", idx + 2);
                }
                rows.push(row);
            }
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }
    if rows.is_empty() {
        eyre::bail!("catalog CSV {:?} has no component rows", path);
    }

    Ok(rows)
}
