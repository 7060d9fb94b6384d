// rfctl test application -- CLI tool for exercising the controller against
// a serial instrument or a mock transport.
//
// Usage:
//   rfctl-test-app list
//   rfctl-test-app --port /dev/ttyUSB0 status --duration 10
//   rfctl-test-app --port COM3 --baud 9600 sweep --start 1e9 --stop 2e9 --step 1e7
//   rfctl-test-app --mock sweep --dwell-ms 0
//   rfctl-test-app --port /dev/ttyUSB0 send "STATUS?"
//
// Logging goes to stderr through `tracing`; set RUST_LOG or pass --verbose.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rfctl::serial::SerialConnector;
use rfctl::{
    Connector, ControllerBuilder, ControllerEvent, DEFAULT_DWELL, Endpoint, ResponseLine,
    RfController, StatusHandler, SweepParameters, SweepState, format_freq_mhz,
};
use rfctl_test_harness::MockConnector;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// rfctl test application -- drives an RF instrument from the command line.
#[derive(Parser)]
#[command(name = "rfctl-test-app", version, about)]
struct Cli {
    /// Serial port path (e.g. /dev/ttyUSB0, COM3).
    /// Defaults to the first port discovered.
    #[arg(long)]
    port: Option<String>,

    /// Serial baud rate.
    #[arg(long, default_value_t = 115_200)]
    baud: u32,

    /// Per-operation I/O timeout in milliseconds.
    #[arg(long, default_value_t = 1000)]
    timeout_ms: u64,

    /// Use a mock transport instead of a real serial port.
    /// The mock answers STATUS? with a locked status line.
    #[arg(long)]
    mock: bool,

    /// Log controller internals (debug level) to stderr.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List candidate serial ports.
    List,

    /// Poll instrument status and print each line.
    Status {
        /// Poll interval in milliseconds.
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,

        /// Duration in seconds (0 = run until Ctrl-C).
        #[arg(long, default_value_t = 0)]
        duration: u64,
    },

    /// Run a stepped frequency sweep (Ctrl-C stops it early).
    Sweep {
        /// Start frequency in hertz.
        #[arg(long, default_value_t = 1.0e9)]
        start: f64,

        /// Stop frequency in hertz (never commanded).
        #[arg(long, default_value_t = 2.0e9)]
        stop: f64,

        /// Step in hertz; negative for a descending sweep.
        #[arg(long, default_value_t = 1.0e7, allow_negative_numbers = true)]
        step: f64,

        /// Dwell at each frequency in milliseconds.
        #[arg(long, default_value_t = DEFAULT_DWELL.as_millis() as u64)]
        dwell_ms: u64,

        /// Poll status while sweeping.
        #[arg(long)]
        poll: bool,
    },

    /// Send one raw command and print any reply.
    Send {
        /// Command text, without line terminator.
        command: String,

        /// How long to wait for reply lines, in milliseconds.
        #[arg(long, default_value_t = 500)]
        wait_ms: u64,
    },
}

// ---------------------------------------------------------------------------
// Status display
// ---------------------------------------------------------------------------

/// Prints every polled status line, flagging locked instruments.
struct ConsoleStatus;

impl StatusHandler for ConsoleStatus {
    fn process(&self, line: &ResponseLine) {
        println!("{}", describe_status(line));
    }
}

/// Render a status line, e.g. `STATUS:LOCKED,FREQ=2400.0,POWER=10`.
fn describe_status(line: &ResponseLine) -> String {
    if line.as_str().contains("LOCKED") {
        format!("[status] Device locked | raw: {line}")
    } else {
        format!("[status] {line}")
    }
}

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn make_connector(cli: &Cli) -> Arc<dyn Connector> {
    if cli.mock {
        let connector = MockConnector::new(["MOCK0"]);
        connector.reply_to("STATUS?", "STATUS:LOCKED,FREQ=2400.0,POWER=10");
        Arc::new(connector)
    } else {
        Arc::new(SerialConnector::new())
    }
}

fn build_controller(cli: &Cli, connector: Arc<dyn Connector>) -> RfController {
    ControllerBuilder::new()
        .baud_rate(cli.baud)
        .io_timeout(Duration::from_millis(cli.timeout_ms))
        .status_handler(ConsoleStatus)
        .build_with_connector(connector)
}

async fn connect(cli: &Cli, rf: &RfController) -> Result<()> {
    let endpoint = cli.port.as_deref().map(Endpoint::new);
    rf.connect(endpoint)
        .await
        .context("could not connect to the instrument")?;
    if let Some(ep) = rf.endpoint().await {
        println!("Connected to {} on {ep} @ {} baud", rf.device_alias(), cli.baud);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

async fn cmd_list(rf: &RfController) -> Result<()> {
    let endpoints = rf.discover_endpoints().await;
    if endpoints.is_empty() {
        println!("No serial ports found.");
        return Ok(());
    }
    println!("{:<4} Endpoint", "#");
    println!("{:-<4} {:-<30}", "", "");
    for (i, ep) in endpoints.iter().enumerate() {
        println!("{:<4} {}", i, ep);
    }
    Ok(())
}

async fn cmd_status(rf: &RfController, interval_ms: u64, duration_secs: u64) -> Result<()> {
    rf.start_polling(Duration::from_millis(interval_ms)).await?;
    println!("Polling every {interval_ms} ms (Ctrl-C to stop)...");

    let mut events = rf.subscribe();
    let deadline = (duration_secs > 0).then(|| Instant::now() + Duration::from_secs(duration_secs));

    loop {
        let remaining = match deadline {
            Some(dl) => {
                let remaining = dl.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    println!("Status duration elapsed.");
                    break;
                }
                remaining
            }
            None => Duration::from_secs(3600),
        };

        tokio::select! {
            event = tokio::time::timeout(remaining, events.recv()) => match event {
                Ok(Ok(event)) => print_transient(&event),
                Ok(Err(tokio::sync::broadcast::error::RecvError::Lagged(n))) => {
                    println!("[warning] missed {n} events (consumer too slow)");
                }
                Ok(Err(tokio::sync::broadcast::error::RecvError::Closed)) => break,
                Err(_) => {
                    if deadline.is_some() {
                        println!("Status duration elapsed.");
                        break;
                    }
                }
            },
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        }
    }

    rf.stop_polling().await;
    Ok(())
}

async fn cmd_sweep(rf: &RfController, params: SweepParameters, poll: bool) -> Result<()> {
    params.validate()?;
    if poll {
        rf.start_polling_default().await?;
    }

    println!(
        "Sweeping {} -> {} step {} Hz, dwell {} ms ({} steps)",
        format_freq_mhz(params.start_hz),
        format_freq_mhz(params.stop_hz),
        params.step_hz,
        params.dwell.as_millis(),
        params.step_count()
    );

    let mut state = rf.watch_sweep();
    let mut events = rf.subscribe();
    let started = Instant::now();
    rf.start_sweep(params).await?;

    let finished = loop {
        tokio::select! {
            changed = state.changed() => {
                if changed.is_err() {
                    bail!("sweep state channel closed");
                }
                let current = *state.borrow_and_update();
                match current {
                    SweepState::Running { current_hz } => {
                        println!("  {:>18}", format_freq_mhz(current_hz));
                    }
                    SweepState::Completed | SweepState::Stopped => break current,
                    SweepState::Idle => {}
                }
            }
            event = events.recv() => {
                if let Ok(event) = event {
                    print_transient(&event);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nStopping sweep...");
                rf.stop_sweep().await;
            }
        }
    };

    if poll {
        rf.stop_polling().await;
    }
    println!(
        "Sweep {finished} after {:.3} s",
        started.elapsed().as_secs_f64()
    );
    Ok(())
}

async fn cmd_send(rf: &RfController, command: &str, wait_ms: u64) -> Result<()> {
    rf.send_command(command)
        .await
        .with_context(|| format!("sending {command:?}"))?;
    println!("TX: {command}");

    let deadline = Instant::now() + Duration::from_millis(wait_ms);
    let mut received = 0;
    while Instant::now() < deadline {
        match rf.read_response().await {
            Some(line) => {
                println!("RX: {line}");
                received += 1;
            }
            None => tokio::time::sleep(Duration::from_millis(10)).await,
        }
    }
    if received == 0 {
        println!("(no reply within {wait_ms} ms)");
    }
    Ok(())
}

/// Print the events that are not already shown by the status handler or
/// the sweep progress display.
fn print_transient(event: &ControllerEvent) {
    if let Some(text) = describe_transient(event) {
        println!("{text}");
    }
}

fn describe_transient(event: &ControllerEvent) -> Option<String> {
    match event {
        ControllerEvent::TxFailed { detail } => Some(format!("[error] TX failed: {detail}")),
        ControllerEvent::RxFailed { detail } => Some(format!("[error] RX failed: {detail}")),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let rf = build_controller(&cli, make_connector(&cli));

    // The `list` command does not require a connection.
    if matches!(cli.command, Command::List) {
        return cmd_list(&rf).await;
    }

    connect(&cli, &rf).await?;

    let result = match &cli.command {
        Command::List => unreachable!("list handled above"),
        Command::Status {
            interval_ms,
            duration,
        } => cmd_status(&rf, *interval_ms, *duration).await,
        Command::Sweep {
            start,
            stop,
            step,
            dwell_ms,
            poll,
        } => {
            let params =
                SweepParameters::new(*start, *stop, *step, Duration::from_millis(*dwell_ms));
            cmd_sweep(&rf, params, *poll).await
        }
        Command::Send { command, wait_ms } => cmd_send(&rf, command, *wait_ms).await,
    };

    rf.disconnect().await;
    result
}
