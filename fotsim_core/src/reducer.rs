//! Pure, total state machine of the instrument.
//!
//! `reduce` never fails and never performs I/O: every action either yields a
//! new state or hands back the input unchanged. Actions that are momentarily
//! inapplicable (a button the current screen does not use, a completion for a
//! phase that was already left) are absorbed silently; UI layers are free to
//! dispatch optimistically.

use crate::state::{
    Action, DeviceState, Dropdown, FastestSettings, LengthUnit, MeasurementKind, PortStatus,
    PortType, PreparationState, ReferenceType, Screen, Wavelength,
};

/// Factory-fresh instrument: powered off, dirty ports, multi-mode defaults
/// that the student must reconfigure before the lab procedure accepts them.
pub fn initial_state() -> DeviceState {
    DeviceState {
        screen: Screen::Off,
        is_powered_on: false,
        preparation: PreparationState {
            port_status: PortStatus::Dirty,
            fastest: FastestSettings {
                port_type: PortType::Mm,
                length_unit: LengthUnit::Ft,
                loss_wavelengths: vec![Wavelength::W1625],
                configured: false,
            },
            reference_results: Vec::new(),
            reference_type: ReferenceType::PointToPoint,
            ready_for_measurements: false,
        },
        setup_menu_index: 0,
        fastest_setup_section: 0,
        fastest_wavelength_index: 0,
        fastest_main_reference_selected: false,
        open_dropdown: None,
        dropdown_index: 0,
        fiber_counter: 0,
        current_fiber_result: None,
        fiber_history: std::collections::HashMap::new(),
        current_measurement: None,
    }
}

impl Default for DeviceState {
    fn default() -> Self {
        initial_state()
    }
}

/// Apply one action. Pure and total; callers own the returned state.
pub fn reduce(state: &DeviceState, action: &Action) -> DeviceState {
    // Power is the only thing a dark instrument reacts to.
    if !state.is_powered_on && !matches!(action, Action::PressPower) {
        return state.clone();
    }

    match action {
        Action::PressPower => handle_power(state),
        Action::PressMenu => handle_menu(state),
        Action::PressUp => handle_up(state),
        Action::PressDown => handle_down(state),
        Action::PressEnter => handle_enter(state),
        Action::PressBack => handle_back(state),
        Action::PressFastest => handle_fastest(state),
        Action::PressF1 => handle_f1(state),
        Action::PressF2 => handle_f2(state),
        Action::CompleteLoading => handle_complete_loading(state),
        Action::CleanPorts => handle_clean_ports(state),
        Action::CompletePortCleaning => handle_complete_cleaning(state),
        Action::ToggleLossWavelength(w) => handle_toggle_wavelength(state, *w),
        Action::SetReferenceType(t) => handle_set_reference_type(state, *t),
        Action::CompleteReferenceMeasurement(results) => {
            handle_complete_reference(state, results)
        }
        Action::CompleteFiberMeasurement(result) => handle_complete_fiber(state, result),
    }
}

// ------------------------------------------------------------
// Button handlers
// ------------------------------------------------------------

fn handle_power(state: &DeviceState) -> DeviceState {
    if state.is_powered_on {
        // Power-off is a full reset: preparation progress is intentionally
        // lost, matching the real instrument's volatile setup memory.
        initial_state()
    } else {
        let mut next = initial_state();
        next.is_powered_on = true;
        next.screen = Screen::Loading;
        next
    }
}

fn handle_menu(state: &DeviceState) -> DeviceState {
    // Ignored while booting or mid-measurement; a stale menu jump out of the
    // measuring screen would orphan the pending completion.
    if matches!(state.screen, Screen::Loading | Screen::FastestMeasuring) {
        return state.clone();
    }
    let mut next = state.clone();
    next.screen = Screen::MenuSetup;
    next.setup_menu_index = 0;
    next.open_dropdown = None;
    next.dropdown_index = 0;
    next
}

fn handle_up(state: &DeviceState) -> DeviceState {
    let mut next = state.clone();
    match state.screen {
        Screen::MenuSetup => {
            next.setup_menu_index = state.setup_menu_index.saturating_sub(1);
            next
        }
        Screen::FastestSetup => {
            match state.open_dropdown {
                Some(Dropdown::Port) => {
                    next.dropdown_index = wrap_prev(state.dropdown_index, PortType::ALL.len());
                    return next;
                }
                Some(Dropdown::LengthUnit) => {
                    next.dropdown_index = wrap_prev(state.dropdown_index, LengthUnit::ALL.len());
                    return next;
                }
                _ => {}
            }
            // No dropdown open: move between the three sections; inside the
            // wavelength checklist, move between its entries first.
            match state.fastest_setup_section {
                0 => {
                    next.fastest_setup_section = 2;
                    next.fastest_wavelength_index = 0;
                }
                1 => next.fastest_setup_section = 0,
                _ => {
                    if state.fastest_wavelength_index > 0 {
                        next.fastest_wavelength_index = state.fastest_wavelength_index - 1;
                    } else {
                        next.fastest_setup_section = 1;
                    }
                }
            }
            next
        }
        Screen::FastestMain => {
            if state.open_dropdown == Some(Dropdown::ReferenceType) {
                next.dropdown_index = wrap_prev(state.dropdown_index, ReferenceType::ALL.len());
            } else {
                next.fastest_main_reference_selected = !state.fastest_main_reference_selected;
            }
            next
        }
        _ => state.clone(),
    }
}

fn handle_down(state: &DeviceState) -> DeviceState {
    let mut next = state.clone();
    match state.screen {
        Screen::MenuSetup => {
            // Single menu entry today; the cursor stays clamped.
            next.setup_menu_index = 0;
            next
        }
        Screen::FastestSetup => {
            match state.open_dropdown {
                Some(Dropdown::Port) => {
                    next.dropdown_index = wrap_next(state.dropdown_index, PortType::ALL.len());
                    return next;
                }
                Some(Dropdown::LengthUnit) => {
                    next.dropdown_index = wrap_next(state.dropdown_index, LengthUnit::ALL.len());
                    return next;
                }
                _ => {}
            }
            match state.fastest_setup_section {
                0 => next.fastest_setup_section = 1,
                1 => {
                    next.fastest_setup_section = 2;
                    next.fastest_wavelength_index = 0;
                }
                _ => {
                    if state.fastest_wavelength_index + 1 < Wavelength::FASTEST.len() {
                        next.fastest_wavelength_index = state.fastest_wavelength_index + 1;
                    } else {
                        next.fastest_setup_section = 0;
                    }
                }
            }
            next
        }
        Screen::FastestMain => {
            if state.open_dropdown == Some(Dropdown::ReferenceType) {
                next.dropdown_index = wrap_next(state.dropdown_index, ReferenceType::ALL.len());
            } else {
                next.fastest_main_reference_selected = !state.fastest_main_reference_selected;
            }
            next
        }
        _ => state.clone(),
    }
}

fn handle_enter(state: &DeviceState) -> DeviceState {
    match state.screen {
        Screen::MenuSetup => {
            if state.setup_menu_index == 0 {
                let mut next = state.clone();
                next.screen = Screen::FastestSetup;
                next.fastest_setup_section = 0;
                next.fastest_wavelength_index = 0;
                next
            } else {
                state.clone()
            }
        }
        Screen::FastestSetup => enter_on_setup(state),
        Screen::FastestMain => enter_on_fastest_main(state),
        _ => state.clone(),
    }
}

fn enter_on_setup(state: &DeviceState) -> DeviceState {
    let mut next = state.clone();

    // Open dropdown: commit the highlighted option and close.
    match state.open_dropdown {
        Some(Dropdown::Port) => {
            let port = PortType::ALL[state.dropdown_index.min(PortType::ALL.len() - 1)];
            next.preparation.fastest.port_type = port;
            next.open_dropdown = None;
            next.dropdown_index = 0;
            return next;
        }
        Some(Dropdown::LengthUnit) => {
            let unit = LengthUnit::ALL[state.dropdown_index.min(LengthUnit::ALL.len() - 1)];
            next.preparation.fastest.length_unit = unit;
            next.open_dropdown = None;
            next.dropdown_index = 0;
            return next;
        }
        _ => {}
    }

    match state.fastest_setup_section {
        // Port section: open the dropdown with the current value highlighted.
        0 => {
            let current = match state.preparation.fastest.port_type {
                PortType::Sm => 0,
                PortType::Mm => 1,
            };
            next.open_dropdown = Some(Dropdown::Port);
            next.dropdown_index = current;
        }
        1 => {
            let current = LengthUnit::ALL
                .iter()
                .position(|u| *u == state.preparation.fastest.length_unit)
                .unwrap_or(0);
            next.open_dropdown = Some(Dropdown::LengthUnit);
            next.dropdown_index = current;
        }
        // Wavelength checklist: toggle membership of the highlighted entry.
        _ => {
            let selected = Wavelength::FASTEST
                [state.fastest_wavelength_index.min(Wavelength::FASTEST.len() - 1)];
            toggle_wavelength(&mut next.preparation.fastest, selected);
        }
    }
    next
}

fn enter_on_fastest_main(state: &DeviceState) -> DeviceState {
    let mut next = state.clone();

    if state.open_dropdown == Some(Dropdown::ReferenceType) {
        let rt = ReferenceType::ALL[state.dropdown_index.min(ReferenceType::ALL.len() - 1)];
        next.preparation.reference_type = rt;
        next.open_dropdown = None;
        next.dropdown_index = 0;
        return next;
    }

    if state.fastest_main_reference_selected {
        let current = ReferenceType::ALL
            .iter()
            .position(|t| *t == state.preparation.reference_type)
            .unwrap_or(0);
        next.open_dropdown = Some(Dropdown::ReferenceType);
        next.dropdown_index = current;
        return next;
    }
    state.clone()
}

fn handle_back(state: &DeviceState) -> DeviceState {
    let mut next = state.clone();
    match state.screen {
        Screen::MenuSetup => {
            next.screen = Screen::Main;
            next
        }
        Screen::FastestSetup => {
            // An open dropdown closes without committing.
            if state.open_dropdown.is_some() {
                next.open_dropdown = None;
                next.dropdown_index = 0;
                return next;
            }
            // Leaving setup grades the configuration: single-mode port, metre
            // units, and exactly the 1310+1550 wavelength pair.
            let fastest = &state.preparation.fastest;
            let configured = fastest.port_type == PortType::Sm
                && fastest.length_unit == LengthUnit::M
                && fastest.loss_wavelengths.contains(&Wavelength::W1310)
                && fastest.loss_wavelengths.contains(&Wavelength::W1550)
                && !fastest.loss_wavelengths.contains(&Wavelength::W1625);
            next.screen = Screen::MenuSetup;
            next.preparation.fastest.configured = configured;
            next.preparation.recompute_readiness();
            next
        }
        Screen::FastestResults => {
            next.screen = Screen::FastestMain;
            next.current_fiber_result = None;
            next
        }
        Screen::FastestMain => {
            if state.open_dropdown.is_some() {
                next.open_dropdown = None;
                next.dropdown_index = 0;
                return next;
            }
            next.screen = Screen::Main;
            next.fastest_main_reference_selected = false;
            next
        }
        // Escape hatch out of a hung or aborted measurement; the pending
        // completion for this phase becomes stale and is dropped by the
        // session scheduler.
        Screen::FastestMeasuring => {
            next.screen = Screen::FastestMain;
            next.current_measurement = None;
            next
        }
        _ => state.clone(),
    }
}

fn handle_fastest(state: &DeviceState) -> DeviceState {
    if !state.preparation.fastest.configured
        || matches!(state.screen, Screen::Loading | Screen::FastestMeasuring)
    {
        return state.clone();
    }
    let mut next = state.clone();
    // From the FasTest main or results screens the button repeats the fiber
    // measurement directly; from elsewhere it opens the FasTest main screen.
    if matches!(state.screen, Screen::FastestMain | Screen::FastestResults) {
        next.screen = Screen::FastestMeasuring;
        next.current_measurement = Some(MeasurementKind::Fiber);
        next.current_fiber_result = None;
    } else {
        next.screen = Screen::FastestMain;
        next.fastest_main_reference_selected = true;
    }
    next
}

fn handle_f1(state: &DeviceState) -> DeviceState {
    // F1 starts a reference run, but only with the loopback method selected.
    if state.screen == Screen::FastestMain
        && state.preparation.reference_type == ReferenceType::Loopback
    {
        let mut next = state.clone();
        next.screen = Screen::FastestMeasuring;
        next.current_measurement = Some(MeasurementKind::Reference);
        next
    } else {
        state.clone()
    }
}

fn handle_f2(state: &DeviceState) -> DeviceState {
    // F2 measures the fiber under test once the preparation checklist is done.
    if state.screen == Screen::FastestMain && state.preparation.ready_for_measurements {
        let mut next = state.clone();
        next.screen = Screen::FastestMeasuring;
        next.current_measurement = Some(MeasurementKind::Fiber);
        next
    } else {
        state.clone()
    }
}

// ------------------------------------------------------------
// Completion and side-channel handlers
// ------------------------------------------------------------

fn handle_complete_loading(state: &DeviceState) -> DeviceState {
    if state.screen != Screen::Loading {
        return state.clone();
    }
    let mut next = state.clone();
    next.screen = Screen::Main;
    next
}

fn handle_clean_ports(state: &DeviceState) -> DeviceState {
    if state.preparation.port_status != PortStatus::Dirty {
        return state.clone();
    }
    let mut next = state.clone();
    next.preparation.port_status = PortStatus::Cleaning;
    next
}

fn handle_complete_cleaning(state: &DeviceState) -> DeviceState {
    if state.preparation.port_status != PortStatus::Cleaning {
        return state.clone();
    }
    let mut next = state.clone();
    next.preparation.port_status = PortStatus::Clean;
    next.preparation.recompute_readiness();
    next
}

fn handle_toggle_wavelength(state: &DeviceState, wavelength: Wavelength) -> DeviceState {
    if state.screen != Screen::FastestSetup {
        return state.clone();
    }
    let mut next = state.clone();
    toggle_wavelength(&mut next.preparation.fastest, wavelength);
    next
}

fn handle_set_reference_type(state: &DeviceState, rt: ReferenceType) -> DeviceState {
    let mut next = state.clone();
    next.preparation.reference_type = rt;
    next
}

fn handle_complete_reference(
    state: &DeviceState,
    results: &[crate::state::ReferenceResult],
) -> DeviceState {
    // Only applicable while actually measuring a reference; anything else is a
    // stale or duplicate delivery.
    if state.screen != Screen::FastestMeasuring
        || state.current_measurement != Some(MeasurementKind::Reference)
    {
        return state.clone();
    }
    let mut next = state.clone();
    next.screen = Screen::FastestMain;
    next.current_measurement = None;
    next.preparation.reference_results = results.to_vec();
    next.preparation.recompute_readiness();
    next
}

fn handle_complete_fiber(
    state: &DeviceState,
    result: &crate::state::FiberMeasurementResult,
) -> DeviceState {
    if state.screen != Screen::FastestMeasuring
        || state.current_measurement != Some(MeasurementKind::Fiber)
    {
        return state.clone();
    }
    let mut next = state.clone();
    next.screen = Screen::FastestResults;
    next.current_measurement = None;
    next.current_fiber_result = Some(result.clone());
    next.fiber_counter = state.fiber_counter + 1;
    next.fiber_history
        .insert(result.component_id.clone(), result.clone());
    next
}

// ------------------------------------------------------------
// Helpers
// ------------------------------------------------------------

#[inline]
fn wrap_prev(index: usize, len: usize) -> usize {
    if index == 0 { len - 1 } else { index - 1 }
}

#[inline]
fn wrap_next(index: usize, len: usize) -> usize {
    if index + 1 >= len { 0 } else { index + 1 }
}

/// Toggle checklist membership, keeping the selection sorted ascending.
fn toggle_wavelength(fastest: &mut FastestSettings, wavelength: Wavelength) {
    if let Some(pos) = fastest.loss_wavelengths.iter().position(|w| *w == wavelength) {
        fastest.loss_wavelengths.remove(pos);
    } else {
        fastest.loss_wavelengths.push(wavelength);
        fastest.loss_wavelengths.sort();
    }
}
