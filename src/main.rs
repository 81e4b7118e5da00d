//! Proctorwatch operator CLI.
//!
//! The embedded monitor itself has no process surface; this binary is an
//! operator harness for validating configuration and endpoint behavior
//! with scripted capture scenarios, and for inspecting persisted state.

use clap::{Parser, Subcommand};
use crossbeam_channel::unbounded;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use proctorwatch_agent::{
    alert::TerminalPresenter,
    capture::{CaptureSource, FacePrediction, SyntheticFeed},
    config::Config,
    delivery::HttpLogTransport,
    detect::{FaceEstimator, ScriptedEstimator, ScriptedOutcome},
    monitor::Monitor,
    stats::StatsSnapshot,
    visibility::Visibility,
    MONITORING_NOTICE, VERSION,
};

#[derive(Parser)]
#[command(name = "proctorwatch")]
#[command(author = "Proctorwatch")]
#[command(version = VERSION)]
#[command(about = "Client-side exam integrity monitor", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a monitoring session against a scripted capture scenario
    Run {
        /// Session identifier (generated when omitted)
        #[arg(long)]
        session_id: Option<String>,

        /// Logging endpoint URL (defaults to the configured endpoint)
        #[arg(long)]
        endpoint: Option<String>,

        /// Capture scenario: normal, absence, lookdown, crowd, flaky
        #[arg(long, default_value = "normal")]
        scenario: String,

        /// Run without a face estimator to exercise fallback monitoring
        #[arg(long)]
        no_estimator: bool,

        /// Periodically simulate tab switches
        #[arg(long)]
        simulate_tab_switches: bool,
    },

    /// Show queue backlog and session statistics
    Status,

    /// Display the candidate monitoring disclosure
    Notice,

    /// Show configuration
    Config,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            session_id,
            endpoint,
            scenario,
            no_estimator,
            simulate_tab_switches,
        } => {
            cmd_run(
                session_id,
                endpoint,
                &scenario,
                no_estimator,
                simulate_tab_switches,
            );
        }
        Commands::Status => {
            cmd_status();
        }
        Commands::Notice => {
            cmd_notice();
        }
        Commands::Config => {
            cmd_config();
        }
    }
}

fn cmd_run(
    session_id: Option<String>,
    endpoint: Option<String>,
    scenario: &str,
    no_estimator: bool,
    simulate_tab_switches: bool,
) {
    println!("Proctorwatch Agent v{VERSION}");
    println!();

    let mut config = Config::load().unwrap_or_default();
    if let Some(url) = endpoint {
        config.delivery.endpoint_url = url;
    }
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create data directory: {e}");
    }

    let session_id = session_id.unwrap_or_else(|| {
        format!("SESS-{}", &uuid::Uuid::new_v4().to_string()[..8])
    });

    let estimator: Option<Box<dyn FaceEstimator>> = if no_estimator {
        None
    } else {
        match scenario_script(scenario) {
            Some(script) => Some(Box::new(ScriptedEstimator::new(script))),
            None => {
                eprintln!("Error: Unknown scenario '{scenario}'");
                eprintln!("Available: normal, absence, lookdown, crowd, flaky");
                std::process::exit(1);
            }
        }
    };

    let transport = match HttpLogTransport::new(config.delivery.endpoint_url.clone()) {
        Ok(transport) => transport,
        Err(e) => {
            eprintln!("Error creating log transport: {e}");
            std::process::exit(1);
        }
    };

    println!("Starting monitoring...");
    println!("  Session: {session_id}");
    println!("  Endpoint: {}", config.delivery.endpoint_url);
    println!("  Sample interval: {}ms", config.sample_interval.as_millis());
    if no_estimator {
        println!("  Mode: fallback (periodic screenshots, no face estimation)");
    } else {
        println!("  Scenario: {scenario}");
    }
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let capture = CaptureSource::new(Box::new(SyntheticFeed::new(640, 480)));
    let mut monitor = Monitor::new(
        session_id,
        config,
        capture,
        estimator,
        transport,
        Box::new(TerminalPresenter),
    );

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl+C handler");

    let (visibility_tx, visibility_rx) = unbounded();
    if simulate_tab_switches {
        let running = running.clone();
        thread::spawn(move || {
            // Away for five seconds out of every thirty.
            while running.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_secs(25));
                if visibility_tx.send(Visibility::Hidden).is_err() {
                    break;
                }
                thread::sleep(Duration::from_secs(5));
                if visibility_tx.send(Visibility::Visible).is_err() {
                    break;
                }
            }
        });
    }

    let stats = monitor.stats();
    monitor.run(visibility_rx, running);

    println!();
    println!("Stopping monitoring...");
    if monitor.backlog() > 0 {
        println!(
            "{} event(s) remain queued and will be retried on the next run.",
            monitor.backlog()
        );
    }
    println!();
    println!("{}", stats.summary());
}

/// Scripted estimator outcomes for each named scenario.
fn scenario_script(name: &str) -> Option<Vec<ScriptedOutcome>> {
    // Predictions are laid out for the 640x480 synthetic feed.
    let normal = || FacePrediction::new([200.0, 100.0], [440.0, 300.0]);
    let low_in_frame = || FacePrediction::new([200.0, 320.0], [440.0, 460.0]).with_probability(0.85);

    let script = match name {
        "normal" => vec![ScriptedOutcome::Faces(vec![normal()])],
        "absence" => {
            let mut s = vec![ScriptedOutcome::Faces(vec![normal()]); 4];
            s.extend(vec![ScriptedOutcome::Faces(Vec::new()); 6]);
            s
        }
        "lookdown" => {
            let mut s = vec![ScriptedOutcome::Faces(vec![normal()]); 4];
            s.extend(vec![ScriptedOutcome::Faces(vec![low_in_frame()]); 6]);
            s
        }
        "crowd" => {
            let mut s = vec![ScriptedOutcome::Faces(vec![normal()]); 5];
            s.extend(vec![ScriptedOutcome::Faces(vec![normal(), normal()]); 4]);
            s
        }
        "flaky" => {
            let mut s = vec![ScriptedOutcome::Faces(vec![normal()]); 5];
            s.push(ScriptedOutcome::Error("estimation backend timeout".to_string()));
            s
        }
        _ => return None,
    };
    Some(script)
}

fn cmd_status() {
    let config = Config::load().unwrap_or_default();

    println!("Proctorwatch Agent Status");
    println!("=========================");
    println!();
    println!("Data directory: {:?}", config.data_path);
    println!("Endpoint: {}", config.delivery.endpoint_url);
    println!();

    let entries: Vec<_> = std::fs::read_dir(&config.data_path)
        .map(|entries| entries.filter_map(|e| e.ok()).collect())
        .unwrap_or_default();

    let mut found_any = false;
    for entry in &entries {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with("queue-") && name.ends_with(".json") {
            found_any = true;
            let backlog = std::fs::read_to_string(entry.path())
                .ok()
                .and_then(|content| serde_json::from_str::<serde_json::Value>(&content).ok())
                .and_then(|v| v.as_array().map(|a| a.len()))
                .unwrap_or(0);
            println!("  {name}: {backlog} queued event(s)");
        }
    }
    if !found_any {
        println!("  No persisted retry queues found.");
    }
    println!();

    for entry in &entries {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with("stats-") && name.ends_with(".json") {
            if let Ok(content) = std::fs::read_to_string(entry.path()) {
                if let Ok(snapshot) = serde_json::from_str::<StatsSnapshot>(&content) {
                    println!(
                        "  {name}: {} frames, {} events, {} warnings",
                        snapshot.frames_sampled, snapshot.events_emitted, snapshot.warnings_shown
                    );
                }
            }
        }
    }
}

fn cmd_notice() {
    println!("{MONITORING_NOTICE}");
}

fn cmd_config() {
    let config = Config::load().unwrap_or_default();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
}
