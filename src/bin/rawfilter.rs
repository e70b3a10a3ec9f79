// Rawfilter CLI
// Loads a filter configuration and drives the raw input interceptor

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;

use rawfilter_core::binding::validate;
use rawfilter_core::Config;

/// Per-device raw input filter
#[derive(Parser, Debug)]
#[command(name = "rawfilter")]
#[command(version)]
#[command(about = "Per-device raw input filter toggled by global key bindings", long_about = None)]
struct Args {
    /// Configuration file (TOML, or JSON with a .json extension)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Validate config and exit
    #[arg(long)]
    check_config: bool,

    /// List attached raw input devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Stop after this many update periods instead of waiting for Ctrl+C
    #[arg(long, value_name = "N")]
    ticks: Option<u64>,
}

fn load_config(args: &Args) -> Result<Config> {
    let path = match &args.config {
        Some(path) => path.clone(),
        None => match Config::default_path() {
            Some(path) if path.is_file() => path,
            _ => return Ok(Config::default()),
        },
    };
    Config::from_path(&path).with_context(|| format!("failed to load {}", path.display()))
}

/// `--verbose` wins, then `RUST_LOG`, then the configured `logLevel`
fn init_logging(verbose: bool, configured: LevelFilter) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(configured);
    builder.parse_env("RUST_LOG");
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();
}

fn check_config(config: &Config) -> Result<()> {
    let bindings = validate(config).context("invalid binding")?;
    println!(
        "Configuration is valid: {} device aliases, {} bindings",
        config.devices.len(),
        bindings.len()
    );
    for binding in &bindings {
        println!("  {} -> {} on {}", binding.trigger, binding.action, binding.target);
    }
    Ok(())
}

#[cfg(windows)]
mod live {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;

    use anyhow::{Context, Result};
    use log::{debug, info, warn};

    use rawfilter_core::input::RecordWalker;
    use rawfilter_core::interceptor::{device_listing, SourceProvider};
    use rawfilter_core::platform::windows::{RawInputSink, Win32Keys, Win32Source};
    use rawfilter_core::{Config, DeviceId, Interceptor, LazyProvider, RawInputSource};

    pub fn list_devices(config: &Config) -> Result<()> {
        let source = Win32Source::open(&config.dll_path).context("raw input unavailable")?;
        let lines = device_listing(&source).context("failed to enumerate devices")?;
        println!("Found {} raw input device(s):", lines.len());
        for line in lines {
            println!("  {}", line);
        }
        Ok(())
    }

    fn install_shutdown_flag() -> Result<Arc<AtomicBool>> {
        let stop = Arc::new(AtomicBool::new(false));
        for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
            signal_hook::flag::register(signal, Arc::clone(&stop))
                .context("failed to install signal handler")?;
        }
        Ok(stop)
    }

    pub fn run(config: Config, ticks: Option<u64>) -> Result<()> {
        let stop = install_shutdown_flag()?;
        let dll_path = config.dll_path.clone();
        let provider: SourceProvider = LazyProvider::new(move || {
            Ok(Arc::new(Win32Source::open(&dll_path)?) as Arc<dyn RawInputSource>)
        });
        let period = config.update_period;
        let interceptor = Interceptor::with_provider(config, provider, Arc::new(Win32Keys))
            .context("failed to start interceptor")?;
        let _sink = RawInputSink::register().context("failed to register for raw input")?;

        info!(target: "rawfilter", "rawfilter is running. Press Ctrl+C to exit.");
        let mut passed: BTreeMap<DeviceId, u64> = BTreeMap::new();
        let mut buf = Vec::new();
        let mut tick: u64 = 0;

        while !stop.load(Ordering::Relaxed) {
            if ticks.is_some_and(|limit| tick >= limit) {
                break;
            }
            tick += 1;

            let required = match interceptor.raw_input_buffer(None) {
                Ok(required) => required,
                Err(e) => {
                    warn!(target: "rawfilter", "size query failed: {}", e);
                    thread::sleep(period);
                    continue;
                }
            };
            if required == 0 {
                thread::sleep(period);
                continue;
            }

            buf.resize(required, 0);
            match interceptor.raw_input_buffer(Some(&mut buf)) {
                Ok(count) => {
                    for record in RecordWalker::new(&buf, count).flatten() {
                        *passed.entry(record.device_id()).or_default() += 1;
                    }
                    debug!(target: "rawfilter", "{} records passed", count);
                }
                Err(e) => warn!(target: "rawfilter", "read failed: {}", e),
            }
        }

        interceptor.shutdown();
        for (device, count) in &passed {
            info!(target: "rawfilter", "{}: {} records passed", device, count);
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;
    init_logging(args.verbose, config.log_level);

    if args.check_config {
        return check_config(&config);
    }

    #[cfg(windows)]
    {
        if args.list_devices {
            return live::list_devices(&config);
        }
        live::run(config, args.ticks)?;
        log::info!(target: "rawfilter", "shut down");
        Ok(())
    }

    #[cfg(not(windows))]
    {
        anyhow::bail!(
            "{} needs the Windows Raw Input API; only --check-config works on this platform",
            if args.list_devices { "--list-devices" } else { "filtering" }
        )
    }
}
