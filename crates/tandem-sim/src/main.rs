//! tandem-sim: pair two simulated devices end to end.
//!
//! Both devices run the real pairing core against the in-memory store,
//! discovery medium and anchor cloud. The simulator drives them to a
//! shared anchor, has each draw a few strokes, and prints what each
//! device's UI would show.

mod cli;

use std::time::{Duration, Instant};

use clap::Parser;
use tandem_common::{ConfigError, Point3, TandemError};
use tandem_config::{load_from_path, validation, TandemConfig};
use tandem_pairing::memory::{pump_all, SimDevice, SimWorld};
use tandem_pairing::{Command, LocalStroke, PairingConfig, PairingPhase, Role, StrokeStyle};

use crate::cli::Args;

const STEP: Duration = Duration::from_millis(20);
const SETTLE_LIMIT: Duration = Duration::from_secs(5);

fn load_settings(args: &Args) -> Result<TandemConfig, ConfigError> {
    match &args.config {
        Some(path) => {
            let settings = load_from_path(path)?;
            validation::validate(&settings)?;
            Ok(settings)
        }
        None => Ok(TandemConfig::default()),
    }
}

/// Pump both devices until `done` holds for each, or the limit passes.
async fn settle(
    alice: &mut SimDevice,
    bob: &mut SimDevice,
    done: impl Fn(&SimDevice) -> bool,
) -> bool {
    let started = Instant::now();
    loop {
        pump_all(&mut [&mut *alice, &mut *bob]);
        if done(alice) && done(bob) {
            return true;
        }
        if started.elapsed() > SETTLE_LIMIT {
            return false;
        }
        tokio::time::sleep(STEP).await;
    }
}

fn has_role(device: &SimDevice) -> bool {
    device.role() != Role::Unassigned || device.phase().is_error()
}

fn finished(device: &SimDevice) -> bool {
    device.phase() == PairingPhase::Synced || device.phase().is_error()
}

fn draw(device: &SimDevice, index: usize) {
    let mut stroke = LocalStroke::new(StrokeStyle::default());
    let offset = index as f32 * 0.05;
    for step in 0..4 {
        stroke.push(Point3::new(offset, step as f32 * 0.02, -0.5));
    }
    device.command(Command::UpdateStroke {
        stroke,
        remove: false,
    });
}

fn report(device: &SimDevice) {
    let view = device.view();
    println!(
        "{:<6} phase={} role={:?} button={:?} local={} partner={}",
        device.name(),
        view.phase,
        view.role,
        view.button(),
        view.local_strokes.len(),
        view.partner_strokes.len(),
    );
    println!("       {}", view.message());
    if let Some(reason) = &view.last_failure {
        println!("       failure: {reason}");
    }
}

async fn run(args: &Args, settings: &TandemConfig) -> tandem_common::Result<()> {
    let mut config = PairingConfig::from_settings(settings);
    config.mode = args.mode.into();
    config.with_pairing = true;

    let world = SimWorld::new();
    let mut alice = world.device_with("alice", config.clone(), true);
    let mut bob = world.device_with("bob", config.clone(), true);

    let outcome = drive(args, &config, &mut alice, &mut bob).await;
    report(&alice);
    report(&bob);
    outcome
}

/// The error a device that stopped short of `Synced` ended with.
fn pairing_failure(config: &PairingConfig, alice: &SimDevice, bob: &SimDevice) -> TandemError {
    [alice, bob]
        .into_iter()
        .find_map(|device| device.view().last_failure.clone())
        .map(|reason| TandemError::from(reason.to_error(config)))
        .unwrap_or_else(|| TandemError::Other("pairing stopped before syncing".into()))
}

async fn drive(
    args: &Args,
    config: &PairingConfig,
    alice: &mut SimDevice,
    bob: &mut SimDevice,
) -> tandem_common::Result<()> {
    alice.command(Command::Begin);
    // In the global room the second device must find the pointer the first
    // one claimed.
    pump_all(&mut [&mut *alice, &mut *bob]);
    bob.command(Command::Begin);

    if !settle(alice, bob, has_role).await {
        return Err(TandemError::Other("devices never found each other".into()));
    }
    tracing::info!(alice = ?alice.role(), bob = ?bob.role(), "Roles elected");

    if args.host_failure {
        let host = if alice.role() == Role::Host { &*alice } else { &*bob };
        tracing::info!(host = host.name(), "Dropping host tracking");
        host.tracking().set_tracking(false);
    }

    alice.command(Command::SetReadyToSetAnchor);
    bob.command(Command::SetReadyToSetAnchor);
    if !settle(alice, bob, finished).await {
        return Err(TandemError::Other("anchor handshake did not finish".into()));
    }
    if alice.phase() != PairingPhase::Synced || bob.phase() != PairingPhase::Synced {
        return Err(pairing_failure(config, alice, bob));
    }

    for index in 0..args.strokes {
        draw(alice, index);
        draw(bob, index);
    }
    let expected = args.strokes;
    let synced = settle(alice, bob, |device| {
        device.view().partner_strokes.len() == expected
    })
    .await;
    if !synced {
        return Err(TandemError::Other("strokes did not converge".into()));
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let settings = match load_settings(&args) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("tandem-sim: {e}");
            std::process::exit(2);
        }
    };

    let default_filter = args
        .log_level
        .clone()
        .unwrap_or_else(|| {
            let level = settings.logging.level.as_directive();
            format!("tandem_sim={level},tandem_pairing={level}")
        });
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    tracing::info!(mode = ?args.mode, strokes = args.strokes, "tandem-sim starting");

    if let Err(e) = run(&args, &settings).await {
        tracing::warn!(error = %e, "Simulation failed");
        eprintln!("tandem-sim: {e}");
        std::process::exit(1);
    }
}
