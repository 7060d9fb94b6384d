//! Stepped frequency sweep on a serial instrument.
//!
//! Demonstrates connecting to the first serial port found, running a sweep
//! in the background, and following its progress through the sweep state
//! watch channel. Press Ctrl-C to stop the sweep early; the controller
//! reports `Stopped` instead of `Completed`.
//!
//! The example sweeps 1.000 - 1.100 GHz in 10 MHz steps, holding each
//! frequency for 200 ms.
//!
//! # Requirements
//!
//! - An instrument that accepts `SETFREQ <hz>` on a serial port
//! - Serial port path adjusted for your system (or leave it to discovery)
//!
//! # Usage
//!
//! ```sh
//! cargo run -p rfctl --example sweep_frequencies
//! ```

use std::time::Duration;

use rfctl::serial::SerialConnector;
use rfctl::{ControllerBuilder, SweepParameters, SweepState, format_freq_mhz};

/// Sweep parameters.
const START_HZ: f64 = 1_000_000_000.0; // 1.000 GHz
const STOP_HZ: f64 = 1_100_000_000.0; // 1.100 GHz
const STEP_HZ: f64 = 10_000_000.0; // 10 MHz steps
const DWELL_MS: u64 = 200;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let rf = ControllerBuilder::new()
        .baud_rate(115_200)
        .build(SerialConnector::new());

    let ports = rf.discover_endpoints().await;
    println!("Found {} serial port(s): {:?}", ports.len(), ports);

    rf.connect(None).await?;
    let endpoint = rf.endpoint().await;
    println!(
        "Connected to {} on {}\n",
        rf.device_alias(),
        endpoint.map(|e| e.to_string()).unwrap_or_default()
    );

    let params = SweepParameters::new(
        START_HZ,
        STOP_HZ,
        STEP_HZ,
        Duration::from_millis(DWELL_MS),
    );
    println!(
        "Sweeping {} - {} in {} steps...\n",
        format_freq_mhz(START_HZ),
        format_freq_mhz(STOP_HZ),
        params.step_count()
    );

    let mut state = rf.watch_sweep();
    rf.start_sweep(params).await?;

    loop {
        tokio::select! {
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *state.borrow_and_update();
                match current {
                    SweepState::Running { current_hz } => {
                        println!("  {:>18}", format_freq_mhz(current_hz));
                    }
                    SweepState::Completed | SweepState::Stopped => {
                        println!("\nSweep {current}.");
                        break;
                    }
                    SweepState::Idle => {}
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nStopping sweep...");
                rf.stop_sweep().await;
            }
        }
    }

    rf.disconnect().await;
    Ok(())
}
