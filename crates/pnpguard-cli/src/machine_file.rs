//! Machine description files (TOML) and the built-in demo machine.

use std::fs;
use std::path::Path;

use pnpguard_machine::sim::SimMachine;
use pnpguard_machine::{MachineSnapshot, NozzleTip};
use pnpguard_types::{Length, Location};

/// Read and validate a machine description.
pub fn load(path: &Path) -> Result<MachineSnapshot, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read machine file {}: {}", path.display(), e))?;
    parse(&raw).map_err(|e| format!("{}: {}", path.display(), e))
}

pub fn parse(raw: &str) -> Result<MachineSnapshot, String> {
    let machine: MachineSnapshot =
        toml::from_str(raw).map_err(|e| format!("Failed to parse machine file: {}", e))?;
    machine.validate_topology().map_err(|e| e.to_string())?;
    Ok(machine)
}

/// Pretty-printed JSON schema of the machine description format.
pub fn schema() -> Result<String, String> {
    let schema = schemars::schema_for!(MachineSnapshot);
    serde_json::to_string_pretty(&schema).map_err(|e| format!("Failed to render schema: {}", e))
}

/// A single-head bench machine with a 502 tip on the nozzle and one
/// 160 × 100 mm board at (50, 50).
pub fn demo_machine() -> MachineSnapshot {
    SimMachine::single_head()
        .with_board("demo-board", Location::mm(50.0, 50.0, 0.0, 0.0), 160.0, 100.0)
        .tweak(|m| {
            if let Some(nozzle) = m.tools.iter_mut().find(|t| t.id == "n1")
                && let pnpguard_machine::ToolKind::Nozzle { tip, .. } = &mut nozzle.kind
            {
                *tip = Some(NozzleTip {
                    name: "502".into(),
                    diameter_low: Length::mm(1.5),
                    max_part_diameter: Length::mm(4.0),
                });
            }
        })
        .build_snapshot()
}
