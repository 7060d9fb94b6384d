//! Monitor real-time controller events.
//!
//! Demonstrates subscribing to the controller event stream while the status
//! poller runs, printing every event as it arrives. This is useful for
//! building live displays, logging instrument status, or debugging the
//! serial link.
//!
//! Events include connection changes, polled status lines, sweep progress,
//! and transient transmit/receive failures.
//!
//! # Requirements
//!
//! - An instrument that answers `STATUS?` on a serial port
//! - Serial port path adjusted for your system
//!
//! # Usage
//!
//! ```sh
//! cargo run -p rfctl --example monitor_events
//! ```

use std::time::Duration;

use rfctl::serial::SerialConnector;
use rfctl::{ControllerBuilder, ControllerEvent, Endpoint, format_freq_mhz};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let serial_port = "/dev/ttyUSB0";

    println!("Connecting to {}...", serial_port);

    let rf = ControllerBuilder::new()
        .baud_rate(115_200)
        .build(SerialConnector::new());

    // Subscribe before connecting so the Connected event is seen too.
    let mut events = rf.subscribe();

    rf.connect(Some(Endpoint::new(serial_port))).await?;
    rf.start_polling(Duration::from_millis(500)).await?;
    println!("Polling status. Monitoring for 60 seconds...\n");

    let deadline = tokio::time::Instant::now() + Duration::from_secs(60);

    println!("{:<12} Event", "Timestamp");
    println!("{:-<12} {:-<50}", "", "");

    let start = tokio::time::Instant::now();

    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            break;
        }

        match tokio::time::timeout(remaining, events.recv()).await {
            Ok(Ok(event)) => {
                let elapsed = start.elapsed();
                let timestamp = format!("{:>6}.{:03}s", elapsed.as_secs(), elapsed.subsec_millis());

                match event {
                    ControllerEvent::Connected { endpoint } => {
                        println!("{} Connected         {}", timestamp, endpoint);
                    }
                    ControllerEvent::ConnectFailed { reason } => {
                        println!("{} ConnectFailed     {}", timestamp, reason);
                    }
                    ControllerEvent::Disconnected => {
                        println!("{} Disconnected", timestamp);
                        break;
                    }
                    ControllerEvent::PollingStarted { interval } => {
                        println!(
                            "{} PollingStarted    every {} ms",
                            timestamp,
                            interval.as_millis()
                        );
                    }
                    ControllerEvent::PollingStopped => {
                        println!("{} PollingStopped", timestamp);
                    }
                    ControllerEvent::Status { line } => {
                        println!("{} Status            {}", timestamp, line);
                    }
                    ControllerEvent::SweepStarted { params } => {
                        println!("{} SweepStarted      {}", timestamp, params);
                    }
                    ControllerEvent::SweepStep { freq_hz } => {
                        println!("{} SweepStep         {}", timestamp, format_freq_mhz(freq_hz));
                    }
                    ControllerEvent::SweepCompleted { steps } => {
                        println!("{} SweepCompleted    {} steps", timestamp, steps);
                    }
                    ControllerEvent::SweepStopped { last_hz } => match last_hz {
                        Some(hz) => println!(
                            "{} SweepStopped      at {}",
                            timestamp,
                            format_freq_mhz(hz)
                        ),
                        None => println!("{} SweepStopped      before first step", timestamp),
                    },
                    ControllerEvent::TxFailed { detail } => {
                        println!("{} TxFailed          {}", timestamp, detail);
                    }
                    ControllerEvent::RxFailed { detail } => {
                        println!("{} RxFailed          {}", timestamp, detail);
                    }
                }
            }
            Ok(Err(tokio::sync::broadcast::error::RecvError::Lagged(n))) => {
                println!("(missed {} events due to lag)", n);
            }
            Ok(Err(tokio::sync::broadcast::error::RecvError::Closed)) => {
                println!("Event channel closed.");
                break;
            }
            Err(_) => {
                // Timeout -- monitoring period elapsed.
                break;
            }
        }
    }

    rf.disconnect().await;
    println!("\nMonitoring complete.");
    Ok(())
}
