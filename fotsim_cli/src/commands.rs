//! Subcommand implementations: interactive run, scripted replay, scheme check.

use std::io::{BufRead, Write};
use std::path::Path;
use std::time::Duration;

use eyre::WrapErr;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Deserialize;
use tracing::{info, warn};

use crate::store::JsonFileStore;
use fotsim_config::Config;
use fotsim_core::catalog::{PassiveComponent, load_catalog};
use fotsim_core::record::{StudentRecord, load_record, save_record};
use fotsim_core::scheme::{ConnectionElement, ConnectionScheme, ElementKind};
use fotsim_core::state::{Action, Button, DeviceState, Wavelength};
use fotsim_core::{Field, ResultsTables, Session};
use fotsim_traits::{Clock, MonotonicClock};

type CliSession = Session<StdRng, MonotonicClock>;

/// Everything a lab run needs, shared by `run` and `script`.
pub struct LabOptions<'a> {
    pub catalog: Option<&'a Path>,
    pub student_file: Option<&'a Path>,
    pub seed: Option<u64>,
    pub json: bool,
}

pub struct Lab {
    session: CliSession,
    clock: MonotonicClock,
    catalog: Vec<PassiveComponent>,
    tables: ResultsTables,
    store: Option<JsonFileStore>,
    record: Option<StudentRecord>,
    json: bool,
}

impl Lab {
    pub fn new(cfg: &Config, opts: &LabOptions<'_>) -> eyre::Result<Self> {
        let rng = match opts.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let clock = MonotonicClock::new();
        let catalog = match opts.catalog {
            Some(path) => load_catalog(path)
                .wrap_err_with(|| format!("load catalog {}", path.display()))?,
            None => Vec::new(),
        };
        let mut store = opts.student_file.map(JsonFileStore::new);
        let record = match store.as_mut() {
            Some(store) => load_record(store)?,
            None => None,
        };
        if let Some(record) = &record {
            info!(student = %record.name, group = %record.group, "student record loaded");
        }
        Ok(Self {
            session: Session::new(cfg.measurement.clone(), cfg.timing, clock, rng),
            clock,
            catalog,
            tables: ResultsTables::new(cfg.validation),
            store,
            record,
            json: opts.json,
        })
    }

    /// Apply one script/stdin command. Errors on unknown vocabulary so script
    /// replay fails loudly; the interactive loop downgrades that to a warning.
    fn apply(&mut self, line: &str) -> eyre::Result<()> {
        let mut parts = line.split_whitespace();
        let Some(head) = parts.next() else {
            return Ok(());
        };
        match head.to_ascii_lowercase().as_str() {
            "wait" => {
                let ms: u64 = parts
                    .next()
                    .ok_or_else(|| eyre::eyre!("wait needs a duration in ms"))?
                    .parse()
                    .wrap_err("wait duration must be an integer (ms)")?;
                self.clock.sleep(Duration::from_millis(ms));
            }
            "select" => {
                let id = parts
                    .next()
                    .ok_or_else(|| eyre::eyre!("select needs a component id"))?;
                let component = self
                    .catalog
                    .iter()
                    .find(|c| c.id == id)
                    .ok_or_else(|| eyre::eyre!("unknown component id: {id}"))?
                    .clone();
                info!(component = %component.id, "component selected");
                self.session.select_component(component);
            }
            "clean" => self.session.dispatch(Action::CleanPorts),
            "enter" => {
                let nm: u32 = parts
                    .next()
                    .ok_or_else(|| eyre::eyre!("enter needs <wavelength> <cell> <value>"))?
                    .parse()
                    .wrap_err("wavelength must be in nm, e.g. 1310")?;
                let wavelength = Wavelength::from_nm(nm)
                    .ok_or_else(|| eyre::eyre!("unsupported wavelength: {nm} nm"))?;
                let field = match parts
                    .next()
                    .ok_or_else(|| eyre::eyre!("enter needs a cell: m1|m2|m3|avg|km"))?
                {
                    "m1" => Field::Measurement(0),
                    "m2" => Field::Measurement(1),
                    "m3" => Field::Measurement(2),
                    "avg" => Field::Average,
                    "km" => Field::KmAttenuation,
                    other => eyre::bail!("unknown cell: {other} (expected m1|m2|m3|avg|km)"),
                };
                let value: f64 = parts
                    .next()
                    .ok_or_else(|| eyre::eyre!("enter needs a value after the cell"))?
                    .parse()
                    .wrap_err("cell value must be a number")?;
                self.enter(wavelength, field, value)?;
            }
            "register" => {
                let name = parts
                    .next()
                    .ok_or_else(|| eyre::eyre!("register needs a name and a group"))?;
                let group = parts
                    .next()
                    .ok_or_else(|| eyre::eyre!("register needs a group after the name"))?;
                self.register(name, group)?;
            }
            button => {
                let button: Button = button
                    .parse()
                    .map_err(|e: String| eyre::eyre!("unknown command: {e}"))?;
                self.session.press(button);
            }
        }
        self.session.poll();
        self.track_results();
        Ok(())
    }

    /// Transcribe one value into the results table currently awaiting input,
    /// falling back to the selected component once the attempt is complete.
    /// A wrong value is not a command failure; its status lands in the table.
    fn enter(&mut self, wavelength: Wavelength, field: Field, value: f64) -> eyre::Result<()> {
        let component = self
            .tables
            .pending_input
            .clone()
            .or_else(|| self.session.selected_component().map(|c| c.id.clone()))
            .ok_or_else(|| eyre::eyre!("no results table awaiting input"))?;
        let status = self
            .tables
            .enter_value(&component, wavelength, field, value)
            .ok_or_else(|| eyre::eyre!("no such cell for component {component}"))?;
        info!(component = %component, %wavelength, value, status = ?status, "cell graded");
        Ok(())
    }

    /// Create or rename the student record, keeping earlier test results.
    fn register(&mut self, name: &str, group: &str) -> eyre::Result<()> {
        let store = self
            .store
            .as_mut()
            .ok_or_else(|| eyre::eyre!("register requires --student-file"))?;
        let mut record = self
            .record
            .take()
            .unwrap_or_else(|| StudentRecord::new(name, group));
        record.name = name.to_string();
        record.group = group.to_string();
        save_record(store, &record)?;
        info!(student = %record.name, group = %record.group, "student registered");
        self.record = Some(record);
        Ok(())
    }

    /// Feed freshly completed fiber measurements into the results tables.
    fn track_results(&mut self) {
        let Some(result) = self.session.state().current_fiber_result.clone() else {
            return;
        };
        let wavelengths: Vec<_> = result.readings.iter().map(|r| r.wavelength).collect();
        self.tables.create_table(
            &result.component_id,
            &result.component_label,
            result.fiber_length_m,
            &wavelengths,
        );
        self.tables.add_device_measurement(&result.component_id, &result);
    }

    fn print_state(&self, out: &mut impl Write) -> eyre::Result<()> {
        if self.json {
            writeln!(out, "{}", serde_json::to_string(self.session.state())?)?;
        } else {
            writeln!(out, "{}", render(self.session.state()))?;
        }
        Ok(())
    }
}

fn render(state: &DeviceState) -> String {
    let prep = &state.preparation;
    let mut line = format!(
        "screen={:?} power={} port={:?} configured={} ready={} fibers={}",
        state.screen,
        if state.is_powered_on { "on" } else { "off" },
        prep.port_status,
        prep.fastest.configured,
        prep.ready_for_measurements,
        state.fiber_counter,
    );
    if let Some(result) = &state.current_fiber_result {
        line.push_str(&format!("\n  {} ({}):", result.fiber_name, result.component_label));
        for r in &result.readings {
            line.push_str(&format!(
                "\n    {}: A\u{2192}B {:.2} dB, B\u{2192}A {:.2} dB, avg {:.2} dB",
                r.wavelength, r.a_to_b, r.b_to_a, r.average
            ));
        }
    }
    line
}

/// `run`: one command per stdin line, state echoed after each.
pub fn run(cfg: &Config, opts: &LabOptions<'_>) -> eyre::Result<()> {
    let mut lab = Lab::new(cfg, opts)?;
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();

    lab.print_state(&mut stdout)?;
    for line in stdin.lock().lines() {
        let line = line.wrap_err("read stdin")?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if matches!(trimmed, "quit" | "exit") {
            break;
        }
        if let Err(err) = lab.apply(trimmed) {
            warn!("{err}");
            continue;
        }
        lab.print_state(&mut stdout)?;
    }
    Ok(())
}

/// `script`: replay a command file, print the final state as JSON.
pub fn script(cfg: &Config, opts: &LabOptions<'_>, file: &Path) -> eyre::Result<()> {
    let content = std::fs::read_to_string(file)
        .wrap_err_with(|| format!("read script {}", file.display()))?;
    let mut lab = Lab::new(cfg, opts)?;

    for (number, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        lab.apply(trimmed)
            .wrap_err_with(|| format!("script line {}: {trimmed:?}", number + 1))?;
    }

    let output = serde_json::json!({
        "device": lab.session.state(),
        "results": lab.tables,
        "student": lab.record,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[derive(Debug, Deserialize)]
struct SchemeFile {
    /// Reference element order, by id.
    correct: Vec<String>,
    /// What the student actually assembled.
    assembled: Vec<SchemeElementRow>,
}

#[derive(Debug, Deserialize)]
struct SchemeElementRow {
    kind: SchemeKindToken,
    id: String,
    #[serde(default)]
    label: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum SchemeKindToken {
    Tester,
    Component,
    Connector,
}

impl From<SchemeKindToken> for ElementKind {
    fn from(token: SchemeKindToken) -> Self {
        match token {
            SchemeKindToken::Tester => ElementKind::Tester,
            SchemeKindToken::Component => ElementKind::Component,
            SchemeKindToken::Connector => ElementKind::Connector,
        }
    }
}

/// `check-scheme`: judge an assembled scheme listing.
pub fn check_scheme(file: &Path) -> eyre::Result<()> {
    let content = std::fs::read_to_string(file)
        .wrap_err_with(|| format!("read scheme {}", file.display()))?;
    let parsed: SchemeFile =
        toml::from_str(&content).wrap_err_with(|| format!("parse scheme {}", file.display()))?;

    let scheme = ConnectionScheme {
        sequence: parsed
            .assembled
            .into_iter()
            .map(|row| ConnectionElement {
                kind: row.kind.into(),
                id: row.id,
                label: row.label,
            })
            .collect(),
        correct_sequence: parsed.correct,
    };
    scheme.validate()?;
    println!("scheme OK ({} elements)", scheme.sequence.len());
    Ok(())
}
