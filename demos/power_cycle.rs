//! Example: Poll a projector and toggle its power.
//!
//! Run with: `cargo run --example power_cycle -- 192.168.1.50`

use escvp::{DEFAULT_PORT, ProjectorController, ProjectorError, TcpTransport};

fn main() -> Result<(), ProjectorError> {
    // Initialize logging (optional)
    env_logger::init();

    let host = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "192.168.1.50".to_owned());

    // Create the controller
    let transport = TcpTransport::new(format!("{host}:{DEFAULT_PORT}"));
    let controller = ProjectorController::new(transport);

    // Read the current device state
    println!("Polling {host}...");
    let snapshot = controller.poll()?;
    for (name, value) in &snapshot.statistics {
        println!("{name}: {value}");
    }

    // Toggle the lamp
    let lamp_on = snapshot.statistics.get("Power").map(String::as_str) == Some("1");
    let target = if lamp_on { "0" } else { "1" };
    match controller.control("Power", target) {
        Ok(outcome) => println!("Power -> {target}: {outcome:?}"),
        Err(e) => eprintln!("Error toggling power: {e}"),
    }

    Ok(())
}
