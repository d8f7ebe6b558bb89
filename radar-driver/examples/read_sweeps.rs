use clap::{value_parser, Arg, ArgAction, Command};
use radar_driver::{
    ClientOptions, RadarClient, ScanConfig, Sweep, SweepCollector, DEFAULT_BAUD_RATE,
};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

const TICK_MS: u64 = 50;

fn command() -> Command {
    Command::new("Radar sweep reader.")
        .about("Reads sweeps from a serial rangefinder and prints them.")
        .disable_version_flag(true)
        .arg(
            Arg::new("port")
                .help("The device path to a serial port")
                .use_value_delimiter(false)
                .required(true),
        )
        .arg(
            Arg::new("baud")
                .long("baud")
                .help("Line speed, 115200 when omitted")
                .value_parser(value_parser!(u32)),
        )
        .arg(
            Arg::new("resolution")
                .long("resolution")
                .help("Samples per sweep")
                .value_parser(value_parser!(u32))
                .requires("angle"),
        )
        .arg(
            Arg::new("angle")
                .long("angle")
                .help("Sweep span in degrees (0-270)")
                .value_parser(value_parser!(u32))
                .requires("resolution"),
        )
        .arg(
            Arg::new("rate")
                .long("rate")
                .help("Sweeps displayed per second")
                .value_parser(value_parser!(f64))
                .default_value("5"),
        )
        .arg(
            Arg::new("split")
                .long("split-on-regression")
                .help("Also start a new sweep when the angle goes backwards")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("csv")
                .long("csv")
                .help("Append every sweep to this CSV file"),
        )
}

fn print_sweep(sweep: &Sweep) {
    let max = sweep.distances().fold(f64::NAN, f64::max);
    println!("Received {} points, farthest {}.", sweep.len(), max);
}

fn write_csv(out: &mut impl Write, sweep: &Sweep) -> std::io::Result<()> {
    for sample in &sweep.samples {
        writeln!(out, "{},{}", sample.angle, sample.distance)?;
    }
    out.flush()
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let matches = command().get_matches();
    let port_name: &String = matches.get_one("port").unwrap();
    let baud_rate = matches
        .get_one::<u32>("baud")
        .copied()
        .unwrap_or(DEFAULT_BAUD_RATE);
    let rate = matches.get_one::<f64>("rate").unwrap().max(0.1);
    let min_interval = Duration::from_secs_f64(1. / rate);

    let mut client = RadarClient::new(ClientOptions::default());
    if let (Some(resolution), Some(angle)) = (
        matches.get_one::<u32>("resolution"),
        matches.get_one::<u32>("angle"),
    ) {
        match ScanConfig::new(*resolution, *angle) {
            Ok(config) => client.request_config(config),
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(2);
            }
        }
    }

    let mut csv = matches
        .get_one::<String>("csv")
        .map(|path| File::create(path).map(BufWriter::new).unwrap());

    if let Err(e) = client.connect(port_name, baud_rate, Duration::from_secs(1)) {
        eprintln!("Failed to open \"{}\". Error: {}", port_name, e);
        std::process::exit(1);
    }

    let mut collector = SweepCollector::new().split_on_regression(matches.get_flag("split"));
    let mut last_draw: Option<Instant> = None;
    let mut latest: Option<Sweep> = None;

    while client.is_connected() {
        for sweep in collector.extend(client.poll_all()) {
            if let Some(out) = csv.as_mut() {
                if let Err(e) = write_csv(out, &sweep) {
                    eprintln!("{e}");
                }
            }
            latest = Some(sweep);
        }

        if latest.is_some() && last_draw.map_or(true, |t| t.elapsed() >= min_interval) {
            if let Some(sweep) = latest.take() {
                print_sweep(&sweep);
            }
            last_draw = Some(Instant::now());
        }

        if client.queue_depth() > 10_000 {
            eprintln!("Falling behind: {} items queued.", client.queue_depth());
        }
        std::thread::sleep(Duration::from_millis(TICK_MS));
    }

    if let Some(e) = client.take_last_error() {
        eprintln!("{e}");
    }
}
