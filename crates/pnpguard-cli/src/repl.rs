//! REPL – the operator shell.
//!
//! Supported slash-commands:
//!   /help                               – show this list
//!   /status                             – machine, tools and boards
//!   /jog   <tool> <x> <y> <z> [rot]     – jog a tool (guarded)
//!   /move  <tool> <x> <y> <z> [rot]     – move a tool, not as a jog (guarded)
//!   /check <tool> <x> <y> <z> [rot]     – verify a move without moving
//!   /select <tool>                      – select a tool without moving it
//!   /target-tool                        – tool to where the camera looks
//!   /target-camera                      – camera over the tool
//!   /protect on|off                     – board protection for the machine
//!   /board <id> on|off                  – include/exclude one board
//!   /tip   <nozzle> <name> <dia> <max>  – load a nozzle tip (`none` unloads)
//!   /pick  <nozzle> <part> <height>     – the nozzle now holds a part
//!   /place <nozzle>                     – the nozzle holds nothing
//!   /events                             – recent safety events (JSON)
//!   /schema                             – JSON schema of machine files
//!   /quit | /exit                       – leave
//!
//! Coordinates and sizes accept units (`12.5mm`, `0.5in`); bare numbers are
//! millimeters.

use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use pnpguard_kernel::{JogGate, JogOutcome};
use pnpguard_machine::{NozzleTip, Part};
use pnpguard_types::{GuardError, Length, LengthUnit, Location};

use crate::config::parse_switch;
use crate::machine_file;

/// A parsed operator command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Status,
    Jog { tool: String, target: Location },
    Move { tool: String, target: Location },
    Check { tool: String, target: Location },
    Select(String),
    TargetTool,
    TargetCamera,
    Protect(bool),
    Board { id: String, enabled: bool },
    Tip { nozzle: String, tip: Option<NozzleTip> },
    Pick { nozzle: String, part: Part },
    Place { nozzle: String },
    Events,
    Schema,
    Quit,
}

/// What the loop does after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Command, String> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err("empty command".to_string());
        };
        let args: Vec<&str> = words.collect();

        let command = match (verb, args.as_slice()) {
            ("/help", []) => Command::Help,
            ("/status", []) => Command::Status,
            ("/jog", [tool, rest @ ..]) => Command::Jog {
                tool: tool.to_string(),
                target: parse_target(rest)?,
            },
            ("/move", [tool, rest @ ..]) => Command::Move {
                tool: tool.to_string(),
                target: parse_target(rest)?,
            },
            ("/check", [tool, rest @ ..]) => Command::Check {
                tool: tool.to_string(),
                target: parse_target(rest)?,
            },
            ("/select", [tool]) => Command::Select(tool.to_string()),
            ("/target-tool", []) => Command::TargetTool,
            ("/target-camera", []) => Command::TargetCamera,
            ("/protect", [switch]) => Command::Protect(switch_arg(switch)?),
            ("/board", [id, switch]) => Command::Board {
                id: id.to_string(),
                enabled: switch_arg(switch)?,
            },
            ("/tip", [nozzle, "none"]) => Command::Tip {
                nozzle: nozzle.to_string(),
                tip: None,
            },
            ("/tip", [nozzle, name, diameter_low, max_part_diameter]) => Command::Tip {
                nozzle: nozzle.to_string(),
                tip: Some(NozzleTip {
                    name: name.to_string(),
                    diameter_low: length_arg(diameter_low)?,
                    max_part_diameter: length_arg(max_part_diameter)?,
                }),
            },
            ("/pick", [nozzle, part, height]) => Command::Pick {
                nozzle: nozzle.to_string(),
                part: Part {
                    id: part.to_string(),
                    height: length_arg(height)?,
                },
            },
            ("/place", [nozzle]) => Command::Place {
                nozzle: nozzle.to_string(),
            },
            ("/events", []) => Command::Events,
            ("/schema", []) => Command::Schema,
            ("/quit" | "/exit", []) => Command::Quit,
            (
                "/help" | "/status" | "/jog" | "/move" | "/check" | "/select" | "/target-tool"
                | "/target-camera" | "/protect" | "/board" | "/tip" | "/pick" | "/place"
                | "/events" | "/schema" | "/quit" | "/exit",
                _,
            ) => return Err(format!("wrong arguments for {verb}")),
            _ => return Err(format!("unknown command '{verb}'")),
        };
        Ok(command)
    }
}

fn length_arg(text: &str) -> Result<Length, String> {
    Length::parse(text, Some(LengthUnit::Millimeters)).map_err(|e| e.to_string())
}

fn switch_arg(text: &str) -> Result<bool, String> {
    parse_switch(text).ok_or_else(|| format!("expected on/off, got '{text}'"))
}

/// `<x> <y> <z> [rotation]` as a millimeter [`Location`].
fn parse_target(args: &[&str]) -> Result<Location, String> {
    let (x, y, z, rotation) = match args {
        [x, y, z] => (x, y, z, None),
        [x, y, z, r] => (x, y, z, Some(r)),
        _ => return Err("expected <x> <y> <z> [rotation]".to_string()),
    };
    let rotation = match rotation {
        Some(r) => r
            .parse::<f64>()
            .map_err(|_| format!("invalid rotation '{r}'"))?,
        None => 0.0,
    };
    Ok(Location::mm(
        length_arg(x)?.to_mm(),
        length_arg(y)?.to_mm(),
        length_arg(z)?.to_mm(),
        rotation,
    ))
}

/// Entry point for the interactive REPL.
///
/// `shutdown` is polled each iteration; when set the REPL exits cleanly.
pub fn run(gate: &JogGate, shutdown: Arc<AtomicBool>) {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        print!("{} ", "pnpguard>".bold().cyan());
        stdout.flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        }

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match Command::parse(line) {
            Ok(command) => {
                if execute(gate, &command) == Flow::Quit {
                    println!("{}", "Goodbye.".green());
                    shutdown.store(true, Ordering::SeqCst);
                    break;
                }
            }
            Err(e) => println!(
                "{} {}. Type {} for available commands.",
                "Error:".red(),
                e.yellow(),
                "/help".bold()
            ),
        }
    }
}

/// Run one command against the gate, printing the result.
pub fn execute(gate: &JogGate, command: &Command) -> Flow {
    let result = match command {
        Command::Help => {
            cmd_help();
            Ok(())
        }
        Command::Status => cmd_status(gate),
        Command::Jog { tool, target } => gate
            .jog(tool, *target)
            .map(|outcome| print_outcome("✓ Jogged", &outcome)),
        Command::Move { tool, target } => gate
            .move_to(tool, *target)
            .map(|outcome| print_outcome("✓ Moved", &outcome)),
        Command::Check { tool, target } => gate
            .check(tool, *target)
            .map(|()| println!("{} {} → {}", "✓ Safe".green(), tool.bold(), target)),
        Command::Select(tool) => gate
            .select_tool(tool)
            .map(|()| println!("  {} selected", tool.bold())),
        Command::TargetTool => gate
            .target_tool()
            .map(|outcome| print_outcome("✓ Targeted", &outcome)),
        Command::TargetCamera => gate
            .target_camera()
            .map(|outcome| print_outcome("✓ Targeted", &outcome)),
        Command::Protect(enabled) => gate.set_board_protection(*enabled).map(|()| {
            println!("  Board protection {}", on_off(*enabled));
        }),
        Command::Board { id, enabled } => gate
            .set_board_enabled(id, *enabled)
            .map(|()| println!("  Board {} {}", id.bold(), on_off(*enabled))),
        Command::Tip { nozzle, tip } => gate.load_nozzle_tip(nozzle, tip.clone()).map(|()| match tip {
            Some(tip) => println!("  {} now carries tip {}", nozzle.bold(), tip.name.bold()),
            None => println!("  {} has no tip", nozzle.bold()),
        }),
        Command::Pick { nozzle, part } => gate
            .load_part(nozzle, part.clone())
            .map(|()| println!("  {} holds {} ({})", nozzle.bold(), part.id.bold(), part.height)),
        Command::Place { nozzle } => gate
            .unload_part(nozzle)
            .map(|()| println!("  {} holds nothing", nozzle.bold())),
        Command::Events => cmd_events(gate),
        Command::Schema => {
            match machine_file::schema() {
                Ok(schema) => println!("{schema}"),
                Err(e) => println!("{}: {}", "Schema error".red(), e),
            }
            Ok(())
        }
        Command::Quit => return Flow::Quit,
    };

    if let Err(e) = result {
        report(&e);
    }
    Flow::Continue
}

// ─────────────────────────────────────────────────────────────────────────────
// Command handlers
// ─────────────────────────────────────────────────────────────────────────────

fn cmd_help() {
    println!();
    println!("{}", "pnpguard Commands".bold().underline());
    println!("  {}                     – machine, tools and boards", "/status".bold().cyan());
    println!("  {} – jog a tool (guarded)", "/jog <tool> <x> <y> <z> [rot]".bold().cyan());
    println!("  {} – move a tool, not as a jog", "/move <tool> <x> <y> <z> [rot]".bold().cyan());
    println!("  {} – verify without moving", "/check <tool> <x> <y> <z> [rot]".bold().cyan());
    println!("  {}              – select without moving", "/select <tool>".bold().cyan());
    println!("  {}                – tool to where the camera looks", "/target-tool".bold().cyan());
    println!("  {}              – camera over the tool", "/target-camera".bold().cyan());
    println!("  {}             – machine board protection", "/protect on|off".bold().cyan());
    println!("  {}          – include/exclude one board", "/board <id> on|off".bold().cyan());
    println!("  {} – load a nozzle tip", "/tip <nozzle> <name> <dia> <max>".bold().cyan());
    println!("  {}   – nozzle now holds a part", "/pick <nozzle> <part> <height>".bold().cyan());
    println!("  {}              – nozzle holds nothing", "/place <nozzle>".bold().cyan());
    println!("  {}                     – recent safety events", "/events".bold().cyan());
    println!("  {}                     – machine file JSON schema", "/schema".bold().cyan());
    println!("  {}               – exit", "/quit  /exit".bold().cyan());
    println!();
}

fn cmd_status(gate: &JogGate) -> Result<(), GuardError> {
    let machine = gate.snapshot()?;
    let selected = gate.selected_tool()?;

    println!("{}", "Machine".bold().underline());
    println!("  Driver           : {}", gate.driver_id()?.yellow());
    println!("  Board protection : {}", on_off(machine.settings.board_protection));
    println!(
        "  Roaming distance : {}",
        machine.settings.unsafe_z_roaming_distance
    );

    println!("{}", "Tools".bold().underline());
    for tool in &machine.tools {
        let marker = if selected.as_deref() == Some(tool.id.as_str()) { "▶" } else { " " };
        println!(
            "  {} {:<8} {:<32} {}",
            marker.green(),
            tool.id.bold(),
            tool.to_string(),
            machine.current_location(tool).to_string().dimmed()
        );
    }

    println!("{}", "Boards".bold().underline());
    if machine.boards.is_empty() {
        println!("  {}", "none".dimmed());
    }
    for board in &machine.boards {
        println!(
            "  {:<12} {} {}×{} at {}",
            board.id.bold(),
            on_off(board.enabled),
            board.dimensions.length_x(),
            board.dimensions.length_y(),
            board.origin
        );
    }
    Ok(())
}

fn cmd_events(gate: &JogGate) -> Result<(), GuardError> {
    let events = gate.events()?;
    if events.is_empty() {
        println!("  {}", "no events yet".dimmed());
    }
    for event in events {
        match serde_json::to_string(&event) {
            Ok(json) => println!("{json}"),
            Err(e) => println!("{}: {}", "Serialization error".red(), e),
        }
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn print_outcome(verb: &str, outcome: &JogOutcome) {
    println!("{} {} → {}", verb.green(), outcome.tool_id.bold(), outcome.target);
    match (&outcome.safe_z_error, outcome.safe_z_requested) {
        (Some(e), _) => println!(
            "  {} roamed too far at unsafe Z and could not go to safe Z: {}",
            outcome.tool_id.yellow(),
            e
        ),
        (None, true) => println!(
            "  {} roamed too far at unsafe Z, sent to safe Z",
            outcome.tool_id.yellow()
        ),
        (None, false) => {}
    }
}

fn on_off(enabled: bool) -> colored::ColoredString {
    if enabled { "on".green() } else { "off".red() }
}

fn report(error: &GuardError) {
    match error {
        GuardError::CollisionRisk { .. } | GuardError::SoftLimit { .. } => {
            println!("{} {}", "✗ Refused:".red().bold(), error)
        }
        _ => println!("{} {}", "Error:".red(), error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pnpguard_kernel::MotionVerifier;
    use pnpguard_machine::sim::SimMachine;

    fn demo_gate() -> JogGate {
        let registry = SimMachine::builder()
            .tweak(|m| *m = machine_file::demo_machine())
            .build()
            .unwrap();
        JogGate::new(registry, MotionVerifier::with_default_rules())
    }

    #[test]
    fn parses_moves_with_units() {
        let cmd = Command::parse("/jog n1 10 0.5in -2mm 90").unwrap();
        let Command::Jog { tool, target } = cmd else {
            panic!("expected a jog");
        };
        assert_eq!(tool, "n1");
        assert!((target.y - 12.7).abs() < 1e-9);
        assert!((target.z + 2.0).abs() < 1e-9);
        assert_eq!(target.rotation, 90.0);
        assert_eq!(target.units, LengthUnit::Millimeters);
    }

    #[test]
    fn parses_switches_and_tooling() {
        assert_eq!(Command::parse("/protect off").unwrap(), Command::Protect(false));
        assert_eq!(
            Command::parse("/board b1 on").unwrap(),
            Command::Board {
                id: "b1".into(),
                enabled: true
            }
        );
        assert_eq!(
            Command::parse("/tip n1 none").unwrap(),
            Command::Tip {
                nozzle: "n1".into(),
                tip: None
            }
        );
        assert!(matches!(
            Command::parse("/pick n1 R0805 0.6mm").unwrap(),
            Command::Pick { ref part, .. } if part.id == "R0805"
        ));
        assert_eq!(Command::parse("/exit").unwrap(), Command::Quit);
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(Command::parse("/jog n1 10 20").unwrap_err().contains("<x> <y> <z>"));
        assert!(Command::parse("/jog n1 ten 20 0").is_err());
        assert!(Command::parse("/jog n1 10 20 0 north").is_err());
        assert!(Command::parse("/protect maybe").is_err());
        assert!(Command::parse("/place").unwrap_err().contains("wrong arguments"));
        assert!(Command::parse("/fly n1").unwrap_err().contains("unknown command"));
    }

    #[test]
    fn execute_applies_operator_commands() {
        let gate = demo_gate();
        assert_eq!(execute(&gate, &Command::Protect(false)), Flow::Continue);
        assert!(!gate.snapshot().unwrap().settings.board_protection);

        execute(&gate, &Command::parse("/pick n1 SOT23 1.2mm").unwrap());
        let machine = gate.snapshot().unwrap();
        assert_eq!(machine.tool("n1").unwrap().part().map(|p| p.id.as_str()), Some("SOT23"));

        execute(&gate, &Command::parse("/place n1").unwrap());
        assert!(gate.snapshot().unwrap().tool("n1").unwrap().part().is_none());
    }

    #[test]
    fn refused_jog_leaves_the_machine_still() {
        let gate = demo_gate();
        let before = gate.snapshot().unwrap();
        assert_eq!(
            execute(&gate, &Command::parse("/jog n1 100 100 -5").unwrap()),
            Flow::Continue
        );
        assert_eq!(gate.snapshot().unwrap(), before);

        execute(&gate, &Command::parse("/jog n1 300 300 -5").unwrap());
        assert_ne!(gate.snapshot().unwrap(), before);
    }

    #[test]
    fn parses_targeting_commands() {
        assert_eq!(Command::parse("/select cam").unwrap(), Command::Select("cam".into()));
        assert_eq!(Command::parse("/target-tool").unwrap(), Command::TargetTool);
        assert_eq!(Command::parse("/target-camera").unwrap(), Command::TargetCamera);
        assert!(Command::parse("/target-tool n1").unwrap_err().contains("wrong arguments"));
    }

    #[test]
    fn targeting_moves_the_camera_over_the_nozzle() {
        let gate = demo_gate();
        execute(&gate, &Command::parse("/jog n1 300 300 0").unwrap());
        assert_eq!(execute(&gate, &Command::TargetCamera), Flow::Continue);

        let m = gate.snapshot().unwrap();
        let camera_at = m.current_location(m.tool("cam").unwrap());
        assert!((camera_at.x - 300.0).abs() < 1e-9);
        assert_eq!(gate.selected_tool().unwrap().as_deref(), Some("cam"));

        execute(&gate, &Command::TargetTool);
        assert_eq!(gate.selected_tool().unwrap().as_deref(), Some("n1"));
    }

    #[test]
    fn quit_ends_the_loop() {
        let gate = demo_gate();
        assert_eq!(execute(&gate, &Command::Quit), Flow::Quit);
    }
}
