//! pingring demo - wave pattern generator on a simulated circular DMA
//!
//! Alur sama seperti firmware:
//! - Console: log target lewat ring buffer `up`, dikuras oleh thread host
//! - Streamer: dua blok 8K, diisi ulang di setiap sinyal half/full consumed
//!
//! Usage:
//!   cargo run --release -- --passes 20 --marker-period 6

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use clap::Parser;
use pingring::console::ConsoleChannel;
use pingring::core::{Idle, Yield};
use pingring::pattern::{pulses_per_frame, RefMarker, WavePattern, Xorshift128, MARKER_BIT};
use pingring::stream::SimulatedTransfer;
use pingring::{Error, Result};

const HALF_BUFFER_SIZE: usize = 8192;

#[derive(Parser, Debug)]
#[command(name = "pingring", version, about = "Double-buffered wave pattern demo")]
struct Args {
    /// Full passes (2 blocks each) to stream before exiting
    #[arg(short, long, default_value_t = 10)]
    passes: u64,

    /// Regenerations between reference clock markers
    #[arg(short, long, default_value_t = RefMarker::FIRMWARE_PERIOD)]
    marker_period: u32,

    /// Output rate in elements per second (0 = unthrottled)
    #[arg(short, long, default_value_t = 0)]
    rate_hz: u64,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

/// Demo configuration
#[derive(Debug, Clone)]
struct DemoConfig {
    passes: u64,
    marker_period: u32,
    rate_hz: u64,
}

impl TryFrom<Args> for DemoConfig {
    type Error = Error;

    fn try_from(args: Args) -> Result<Self> {
        if args.passes == 0 {
            return Err(Error::InvalidConfig("passes must be at least 1".to_string()));
        }
        if args.marker_period == 0 {
            return Err(Error::InvalidConfig(
                "marker period must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            passes: args.passes,
            marker_period: args.marker_period,
            rate_hz: args.rate_hz,
        })
    }
}

fn run(config: DemoConfig) -> Result<()> {
    let mut channel = ConsoleChannel::new();
    let done = AtomicBool::new(false);
    log::debug!(
        "console channel {:#x}, {} bytes per direction",
        channel.magic(),
        channel.bufsize()
    );

    let (mut console, mut host) = channel.split();

    std::thread::scope(|s| {
        // Host side: drain console output to real stdout
        let drainer = s.spawn(|| {
            let stdout = std::io::stdout();
            let mut buf = Vec::with_capacity(256);
            loop {
                let finished = done.load(Ordering::Acquire);
                buf.clear();
                if host.drain_into(&mut buf) > 0 {
                    let mut out = stdout.lock();
                    if let Err(e) = out.write_all(&buf).and_then(|_| out.flush()) {
                        log::warn!("console drain: stdout write failed: {}", e);
                    }
                } else if finished {
                    break;
                } else {
                    std::thread::sleep(Duration::from_millis(1));
                }
            }
        });

        let result = stream(&config, &mut console);
        done.store(true, Ordering::Release);
        if drainer.join().is_err() {
            log::warn!("console drain thread panicked");
        }

        if console.dropped() > 0 {
            log::warn!("console dropped {} bytes", console.dropped());
        }
        result
    })
}

fn stream<W: Write>(config: &DemoConfig, console: &mut W) -> Result<()> {
    let marker = RefMarker::new(config.marker_period)?;
    let mut transfer: SimulatedTransfer<u8, HALF_BUFFER_SIZE, WavePattern> =
        SimulatedTransfer::new(WavePattern::new(Xorshift128::new(), marker));

    transfer.arm();
    writeln!(console, "buffer initialized")?;
    writeln!(
        console,
        "starting with {} pulses/frame",
        pulses_per_frame(transfer.streamer().region())
    )?;

    let pass_len = 2 * HALF_BUFFER_SIZE;
    let pass_budget = (config.rate_hz > 0)
        .then(|| Duration::from_secs_f64(pass_len as f64 / config.rate_hz as f64));
    let mut idle = Yield;
    let start = Instant::now();
    let mut markers = 0u64;

    for pass in 0..config.passes {
        let pass_start = Instant::now();
        transfer.drain(pass_len, |v| {
            if v & MARKER_BIT != 0 {
                markers += 1;
            }
        });

        if let Some(budget) = pass_budget {
            // Host tidak punya timer DMA: tunggu sampai jatah waktu pass habis
            while pass_start.elapsed() < budget {
                idle.idle();
            }
        }
        log::debug!("pass {} done, {} markers so far", pass, markers);
    }

    let elapsed = start.elapsed();
    let stats = transfer.streamer().stats();
    writeln!(
        console,
        "streamed {} passes in {:.3}s ({:.2} M elements/sec)",
        stats.passes,
        elapsed.as_secs_f64(),
        (stats.passes * pass_len as u64) as f64 / elapsed.as_secs_f64() / 1_000_000.0
    )?;
    writeln!(
        console,
        "regenerations: block0={} block1={}, markers={}, re-arms={}",
        stats.regenerations[0],
        stats.regenerations[1],
        markers,
        transfer.channel().stops()
    )?;
    if stats.out_of_order > 0 {
        log::warn!("{} out-of-order transfer signals", stats.out_of_order);
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let config = match DemoConfig::try_from(args) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(2);
        }
    };
    log::debug!("{:?}", config);

    if let Err(e) = run(config) {
        eprintln!("❌ pingring error: {}", e);
        std::process::exit(1);
    }
}
