extern crate clap;
extern crate env_logger;
extern crate failure;
extern crate mandelbrot_queues;
extern crate num;
extern crate num_cpus;

use clap::{App, Arg, ArgMatches};
use failure::{format_err, Error};
use log::{info, warn};
use mandelbrot_queues::{
    read_task, render, workers_from_env, ComplexPlane, Observation, RenderConfig,
};
use num::Complex;
use std::io::{self, Write};
use std::str::FromStr;

fn parse_pair<T>(s: &str, separator: char) -> Option<(T, T)>
where
    T: FromStr,
{
    match s.find(separator) {
        None => None,
        Some(index) => match (T::from_str(&s[..index]), T::from_str(&s[index + 1..])) {
            (Ok(l), Ok(r)) => Some((l, r)),
            _ => None,
        },
    }
}

fn parse_complex(s: &str) -> Option<Complex<f64>> {
    match parse_pair(s, ',') {
        Some((re, im)) => Some(Complex { re, im }),
        None => None,
    }
}

fn validate_pair<T: FromStr>(s: &str, separator: char, err: &str) -> Result<(), String> {
    match parse_pair::<T>(s, separator) {
        Some(_) => Ok(()),
        None => Err(err.to_string()),
    }
}

fn validate_positive(s: &str, isnotanumber_err: &str) -> Result<(), String> {
    match usize::from_str(s) {
        Ok(0) => Err(format!("{}: must be at least 1", isnotanumber_err)),
        Ok(_) => Ok(()),
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

const THREADS: &str = "threads";
const LEFTLOWER: &str = "leftlower";
const RIGHTUPPER: &str = "rightupper";
const PNM: &str = "pnm";
const TIMING_LOG: &str = "timing-log";
const INPUT_DEPTH: &str = "input-depth";
const OUTPUT_DEPTH: &str = "output-depth";

fn args<'a>() -> ArgMatches<'a> {
    App::new("mandelbrot")
        .version("0.1.0")
        .about(
            "Renders the Mandelbrot set as text.  Reads ROWS COLS MAX_ITERATIONS from \
             stdin; the worker count defaults to $MAX_CPUS, or 1.",
        )
        .arg(
            Arg::with_name(THREADS)
                .required(false)
                .long(THREADS)
                .short("t")
                .takes_value(true)
                .validator(|s| validate_positive(&s, "Could not parse thread count"))
                .help("Number of worker threads (overrides MAX_CPUS)"),
        )
        .arg(
            Arg::with_name(LEFTLOWER)
                .required(false)
                .long(LEFTLOWER)
                .short("l")
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("-1.5,-1.0")
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse left lower corner"))
                .help("Left lower corner of the complex plane"),
        )
        .arg(
            Arg::with_name(RIGHTUPPER)
                .required(false)
                .long(RIGHTUPPER)
                .short("r")
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("0.5,1.0")
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse right upper corner"))
                .help("Right upper corner of the complex plane"),
        )
        .arg(
            Arg::with_name(PNM)
                .required(false)
                .long(PNM)
                .short("p")
                .takes_value(true)
                .help("Also write the grid as a binary graymap to this file"),
        )
        .arg(
            Arg::with_name(TIMING_LOG)
                .required(false)
                .long(TIMING_LOG)
                .takes_value(true)
                .help("Append a timing observation to this file"),
        )
        .arg(
            Arg::with_name(INPUT_DEPTH)
                .required(false)
                .long(INPUT_DEPTH)
                .takes_value(true)
                .default_value("16")
                .validator(|s| validate_positive(&s, "Could not parse input queue depth"))
                .help("Slots in each worker's input queue"),
        )
        .arg(
            Arg::with_name(OUTPUT_DEPTH)
                .required(false)
                .long(OUTPUT_DEPTH)
                .takes_value(true)
                .default_value("8")
                .validator(|s| validate_positive(&s, "Could not parse output queue depth"))
                .help("Slots in each worker's output queue"),
        )
        .get_matches()
}

fn value<T: FromStr>(matches: &ArgMatches, name: &str) -> Result<T, Error> {
    let raw = matches
        .value_of(name)
        .ok_or_else(|| format_err!("missing --{}", name))?;
    T::from_str(raw).map_err(|_| format_err!("could not parse --{}: {}", name, raw))
}

fn corner(matches: &ArgMatches, name: &str) -> Result<Complex<f64>, Error> {
    matches
        .value_of(name)
        .and_then(parse_complex)
        .ok_or_else(|| format_err!("could not parse --{}", name))
}

fn run(matches: &ArgMatches) -> Result<(), Error> {
    let workers = match matches.value_of(THREADS) {
        Some(_) => value(matches, THREADS)?,
        None => workers_from_env()?,
    };
    let cpus = num_cpus::get();
    if workers + 2 > cpus {
        warn!(
            "{} workers plus distributor and collector on {} cpus; spinning threads will share cores",
            workers, cpus
        );
    }
    let plane = ComplexPlane(corner(matches, LEFTLOWER)?, corner(matches, RIGHTUPPER)?);

    let stdin = io::stdin();
    let task = read_task(stdin.lock())?;
    let config: RenderConfig = task
        .into_config()
        .with_workers(workers)
        .with_queue_depths(value(matches, INPUT_DEPTH)?, value(matches, OUTPUT_DEPTH)?)
        .with_plane(plane);

    let report = render(&config)?;
    info!(
        "rendered in {:?} after {:?} of preparation; input done at {:?}, output at {:?}",
        report.elapsed, report.preparation, report.dispatching, report.collecting
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    report.grid.write_text(&mut out)?;
    out.flush()?;

    if let Some(path) = matches.value_of(PNM) {
        report.grid.save_pnm(path)?;
    }
    if let Some(path) = matches.value_of(TIMING_LOG) {
        Observation::of(&config, report.elapsed).append_to(path)?;
    }
    info!("done");
    Ok(())
}

fn main() {
    env_logger::init();
    let matches = args();
    if let Err(e) = run(&matches) {
        eprintln!("Render failure: {}", e);
        std::process::exit(1);
    }
}
