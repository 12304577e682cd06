// Tabrs CLI
// Standalone frontend for the system-wide Tab-burst hook engine

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;

use tabrs_core::{
    default_config_content, list_devices, BurstConfig, EvdevSource, HookController, Key,
    KeyEventSource,
};

/// System-wide Tab-burst utility
#[derive(Parser, Debug)]
#[command(name = "tabrs")]
#[command(version)]
#[command(about = "Sends a burst of Tab presses on Tab or modifier+letter", long_about = None)]
struct Args {
    /// TOML configuration file; flags below are ignored when set
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// How many Tab presses to send per trigger (1-99)
    #[arg(short = 'n', long, default_value_t = 9)]
    count: u32,

    /// Delay between presses in milliseconds
    #[arg(short, long, default_value_t = 10)]
    delay_ms: u64,

    /// Deliver the physical Tab alongside the burst instead of swallowing it
    #[arg(long)]
    no_suppress_tab: bool,

    /// Key that arms the chord trigger while held
    #[arg(short, long, default_value = "CAPSLOCK")]
    modifier: String,

    /// Disable the modifier-held-plus-letter trigger
    #[arg(long)]
    no_chord: bool,

    /// Validate config and exit
    #[arg(long)]
    check_config: bool,

    /// List available keyboard devices
    #[arg(long)]
    list_devices: bool,

    /// Print a commented default configuration file and exit
    #[arg(long)]
    print_default_config: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn to_config(&self) -> Result<BurstConfig> {
        if let Some(ref path) = self.config {
            return BurstConfig::from_file(path)
                .with_context(|| format!("failed to load {}", path.display()));
        }

        let modifier: Key = self
            .modifier
            .parse()
            .map_err(|e: String| anyhow!(e))
            .context("invalid --modifier")?;

        let config = BurstConfig {
            tab_count: self.count,
            inter_key_delay: Duration::from_millis(self.delay_ms),
            suppress_tab: !self.no_suppress_tab,
            trigger_modifier: modifier,
            chord_enabled: !self.no_chord,
        };
        config.validate()?;
        Ok(config)
    }
}

fn print_devices() -> Result<()> {
    let devices = list_devices().context("error finding keyboard devices")?;
    println!("Found {} keyboard device(s):", devices.len());
    for device in &devices {
        match &device.path {
            Some(path) => println!("  {}: {} ({})", device.index, device.name, path),
            None => println!("  {}: {}", device.index, device.name),
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if args.verbose { "debug" } else { "info" }),
    )
    .init();

    if args.print_default_config {
        print!("{}", default_config_content());
        return Ok(());
    }

    if args.list_devices {
        return print_devices();
    }

    let config = args.to_config()?;

    if args.check_config {
        println!("Configuration is valid");
        return Ok(());
    }

    let source = Arc::new(
        EvdevSource::new()
            .context("failed to open input devices (requires root or the input group)")?,
    );
    let controller = HookController::new(source as Arc<dyn KeyEventSource>);

    if let Err(e) = controller.start(config) {
        eprintln!("Status: Error");
        return Err(e).context("failed to start keyboard hooks");
    }
    println!("Status: {}", controller.state());
    println!(
        "Press Tab to send the burst; hold {} plus a letter for turbo mode.",
        args.modifier.to_uppercase()
    );

    let mut signals = Signals::new([SIGINT, SIGTERM]).context("failed to install signal handler")?;
    let _ = signals.forever().next();

    // Unregister before exit so the grab never outlives the process.
    controller.stop();
    println!("Status: {}", controller.state());
    Ok(())
}
