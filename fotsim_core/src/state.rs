//! Typed state of the simulated instrument.
//!
//! `DeviceState` is a value: the reducer consumes a reference and produces a
//! fresh state, so snapshots handed to subscribers can never be mutated from
//! under them.

use serde::Serialize;
use std::collections::HashMap;

/// Operating wavelengths of the instrument (nm). Closed set; the loss tables
/// in `catalog` are total over it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "u32")]
pub enum Wavelength {
    W850,
    W1300,
    W1310,
    W1550,
    W1625,
}

impl Wavelength {
    pub const ALL: [Wavelength; 5] = [
        Wavelength::W850,
        Wavelength::W1300,
        Wavelength::W1310,
        Wavelength::W1550,
        Wavelength::W1625,
    ];

    /// Wavelengths offered on the FasTest loss-wavelength checklist.
    pub const FASTEST: [Wavelength; 3] = [Wavelength::W1310, Wavelength::W1550, Wavelength::W1625];

    #[inline]
    pub fn nm(self) -> u32 {
        match self {
            Wavelength::W850 => 850,
            Wavelength::W1300 => 1300,
            Wavelength::W1310 => 1310,
            Wavelength::W1550 => 1550,
            Wavelength::W1625 => 1625,
        }
    }

    pub fn from_nm(nm: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|w| w.nm() == nm)
    }
}

impl From<Wavelength> for u32 {
    fn from(w: Wavelength) -> u32 {
        w.nm()
    }
}

impl std::fmt::Display for Wavelength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} nm", self.nm())
    }
}

/// LCD screens. Exactly one is active at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Screen {
    Off,
    Loading,
    Main,
    MenuSetup,
    FastestSetup,
    FastestMain,
    FastestMeasuring,
    FastestResults,
}

/// Physical buttons on the front panel. The only input vocabulary the state
/// machine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Power,
    Menu,
    Up,
    Down,
    Enter,
    Back,
    Fastest,
    F1,
    F2,
}

impl Button {
    pub const ALL: [Button; 9] = [
        Button::Power,
        Button::Menu,
        Button::Up,
        Button::Down,
        Button::Enter,
        Button::Back,
        Button::Fastest,
        Button::F1,
        Button::F2,
    ];
}

impl std::str::FromStr for Button {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "power" => Ok(Button::Power),
            "menu" => Ok(Button::Menu),
            "up" => Ok(Button::Up),
            "down" => Ok(Button::Down),
            "enter" => Ok(Button::Enter),
            "back" | "esc" => Ok(Button::Back),
            "fastest" | "measure" => Ok(Button::Fastest),
            "f1" => Ok(Button::F1),
            "f2" => Ok(Button::F2),
            other => Err(format!("unknown button: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PortStatus {
    Dirty,
    Cleaning,
    Clean,
}

/// FasTest port type: single-mode or multi-mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PortType {
    Sm,
    Mm,
}

impl PortType {
    pub const ALL: [PortType; 2] = [PortType::Sm, PortType::Mm];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LengthUnit {
    Ft,
    Mi,
    M,
    Km,
}

impl LengthUnit {
    pub const ALL: [LengthUnit; 4] = [LengthUnit::Ft, LengthUnit::Mi, LengthUnit::M, LengthUnit::Km];
}

/// How the zero-loss baseline is taken before fiber measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReferenceType {
    Loopback,
    PointToPoint,
    None,
}

impl ReferenceType {
    pub const ALL: [ReferenceType; 3] = [
        ReferenceType::Loopback,
        ReferenceType::PointToPoint,
        ReferenceType::None,
    ];
}

/// Which dropdown is currently open, if any. At most one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Dropdown {
    Port,
    LengthUnit,
    ReferenceType,
}

/// Disambiguates which completion handler applies to the measuring screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MeasurementKind {
    Reference,
    Fiber,
}

/// FasTest measurement settings chosen on the setup screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FastestSettings {
    pub port_type: PortType,
    pub length_unit: LengthUnit,
    /// Selected loss wavelengths, kept sorted ascending.
    pub loss_wavelengths: Vec<Wavelength>,
    /// True once the settings match the lab procedure (SM, metres, 1310+1550).
    pub configured: bool,
}

/// A stored baseline power reading for one wavelength.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceResult {
    pub wavelength: Wavelength,
    pub value_dbm: f64,
    pub timestamp_ms: u64,
}

/// Bidirectional loss readings for one wavelength.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BidirectionalReading {
    pub wavelength: Wavelength,
    pub a_to_b: f64,
    pub b_to_a: f64,
    pub average: f64,
}

/// Immutable snapshot of one completed fiber measurement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FiberMeasurementResult {
    /// Display label, e.g. "BCFiber001".
    pub fiber_name: String,
    pub cable_name: String,
    pub component_id: String,
    pub component_label: String,
    pub fiber_length_m: f64,
    pub readings: Vec<BidirectionalReading>,
    pub timestamp_ms: u64,
}

impl FiberMeasurementResult {
    pub fn reading_for(&self, wavelength: Wavelength) -> Option<&BidirectionalReading> {
        self.readings.iter().find(|r| r.wavelength == wavelength)
    }
}

/// Preparation progress: cleaning, configuration and referencing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreparationState {
    pub port_status: PortStatus,
    pub fastest: FastestSettings,
    /// Append-only until the next reference run replaces them wholesale.
    pub reference_results: Vec<ReferenceResult>,
    pub reference_type: ReferenceType,
    /// Derived: clean ports + configured FasTest + at least one reference.
    /// Recomputed after every relevant mutation, never set directly.
    pub ready_for_measurements: bool,
}

impl PreparationState {
    pub(crate) fn recompute_readiness(&mut self) {
        self.ready_for_measurements = self.port_status == PortStatus::Clean
            && self.fastest.configured
            && !self.reference_results.is_empty();
    }
}

/// Full state of the simulated instrument. Singleton per session; mutated only
/// through the reducer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceState {
    pub screen: Screen,
    pub is_powered_on: bool,
    pub preparation: PreparationState,
    /// Cursor in the setup menu (one entry today: FasTest).
    pub setup_menu_index: usize,
    /// Cursor over the three FasTest setup sections (port / unit / wavelengths).
    pub fastest_setup_section: usize,
    /// Cursor within the loss-wavelength checklist.
    pub fastest_wavelength_index: usize,
    /// Whether the reference-type field on the FasTest main screen has focus.
    pub fastest_main_reference_selected: bool,
    pub open_dropdown: Option<Dropdown>,
    pub dropdown_index: usize,
    /// Completed fiber measurements so far; drives the zero-padded fiber label.
    pub fiber_counter: u32,
    pub current_fiber_result: Option<FiberMeasurementResult>,
    /// Last result per component, consulted for repeat-measurement stability.
    pub fiber_history: HashMap<String, FiberMeasurementResult>,
    pub current_measurement: Option<MeasurementKind>,
}

/// Everything the state machine reacts to: one action per panel button plus
/// the completion/side-channel events the orchestration layer feeds back.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    PressPower,
    PressMenu,
    PressUp,
    PressDown,
    PressEnter,
    PressBack,
    PressFastest,
    PressF1,
    PressF2,
    CompleteLoading,
    CleanPorts,
    CompletePortCleaning,
    ToggleLossWavelength(Wavelength),
    SetReferenceType(ReferenceType),
    CompleteReferenceMeasurement(Vec<ReferenceResult>),
    CompleteFiberMeasurement(FiberMeasurementResult),
}

impl From<Button> for Action {
    fn from(button: Button) -> Self {
        match button {
            Button::Power => Action::PressPower,
            Button::Menu => Action::PressMenu,
            Button::Up => Action::PressUp,
            Button::Down => Action::PressDown,
            Button::Enter => Action::PressEnter,
            Button::Back => Action::PressBack,
            Button::Fastest => Action::PressFastest,
            Button::F1 => Action::PressF1,
            Button::F2 => Action::PressF2,
        }
    }
}
