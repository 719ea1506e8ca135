//! Passive components the student can put on the bench.
//!
//! The per-kind, per-wavelength base loss table is the ground truth the
//! measurement engine perturbs. Values are typical insertion losses in dB.

use crate::state::Wavelength;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ComponentKind {
    OpticalCable,
    FiberCoil,
    Splitter1x2,
    Splitter1x4,
    Splitter1x8,
    Splitter1x16,
    Splitter1x32,
    Splitter1x64,
}

impl ComponentKind {
    /// Typical insertion loss of this component (dB).
    pub fn base_loss_db(self, wavelength: Wavelength) -> f64 {
        use ComponentKind::*;
        use Wavelength::*;
        match self {
            OpticalCable => match wavelength {
                W850 => 0.5,
                W1300 => 0.4,
                W1310 => 0.35,
                W1550 => 0.3,
                W1625 => 0.32,
            },
            FiberCoil => match wavelength {
                W850 => 2.5,
                W1300 => 2.0,
                W1310 => 1.8,
                W1550 => 1.5,
                W1625 => 1.6,
            },
            Splitter1x2 => match wavelength {
                W850 => 3.5,
                W1300 => 3.3,
                W1310 => 3.2,
                W1550 => 3.0,
                W1625 => 3.1,
            },
            Splitter1x4 => match wavelength {
                W850 => 7.0,
                W1300 => 6.8,
                W1310 => 6.5,
                W1550 => 6.2,
                W1625 => 6.3,
            },
            Splitter1x8 => match wavelength {
                W850 => 10.5,
                W1300 => 10.2,
                W1310 => 10.0,
                W1550 => 9.5,
                W1625 => 9.7,
            },
            Splitter1x16 => match wavelength {
                W850 => 14.0,
                W1300 => 13.5,
                W1310 => 13.2,
                W1550 => 12.8,
                W1625 => 13.0,
            },
            Splitter1x32 => match wavelength {
                W850 => 17.5,
                W1300 => 17.0,
                W1310 => 16.8,
                W1550 => 16.2,
                W1625 => 16.5,
            },
            Splitter1x64 => match wavelength {
                W850 => 21.0,
                W1300 => 20.5,
                W1310 => 20.2,
                W1550 => 19.5,
                W1625 => 19.8,
            },
        }
    }
}

impl std::str::FromStr for ComponentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPTICAL_CABLE" => Ok(ComponentKind::OpticalCable),
            "FIBER_COIL" => Ok(ComponentKind::FiberCoil),
            "SPLITTER_1_2" => Ok(ComponentKind::Splitter1x2),
            "SPLITTER_1_4" => Ok(ComponentKind::Splitter1x4),
            "SPLITTER_1_8" => Ok(ComponentKind::Splitter1x8),
            "SPLITTER_1_16" => Ok(ComponentKind::Splitter1x16),
            "SPLITTER_1_32" => Ok(ComponentKind::Splitter1x32),
            "SPLITTER_1_64" => Ok(ComponentKind::Splitter1x64),
            other => Err(format!("unknown component kind: {other}")),
        }
    }
}

/// SC connector polish variants used in the lab kit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectorType {
    ScApc,
    ScUpc,
}

impl std::str::FromStr for ConnectorType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SC_APC" => Ok(ConnectorType::ScApc),
            "SC_UPC" => Ok(ConnectorType::ScUpc),
            other => Err(format!("unknown connector type: {other}")),
        }
    }
}

/// One entry of the lab kit: a component that can be measured.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassiveComponent {
    pub id: String,
    pub kind: ComponentKind,
    pub label: String,
    pub connector: ConnectorType,
    pub fiber_length_m: f64,
}

impl PassiveComponent {
    /// Build from a catalog CSV row, rejecting unknown kind/connector tokens.
    pub fn from_row(row: &fotsim_config::CatalogRow) -> eyre::Result<Self> {
        let kind: ComponentKind = row
            .kind
            .parse()
            .map_err(|e: String| eyre::eyre!("catalog row {}: {}", row.id, e))?;
        let connector: ConnectorType = row
            .connector
            .parse()
            .map_err(|e: String| eyre::eyre!("catalog row {}: {}", row.id, e))?;
        Ok(Self {
            id: row.id.clone(),
            kind,
            label: row.label.clone(),
            connector,
            fiber_length_m: row.fiber_length_m,
        })
    }
}

/// Load and convert the whole catalog file.
pub fn load_catalog(path: &std::path::Path) -> eyre::Result<Vec<PassiveComponent>> {
    let rows = fotsim_config::load_catalog_csv(path)?;
    rows.iter().map(PassiveComponent::from_row).collect()
}
