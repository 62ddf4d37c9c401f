extern crate clap;
extern crate colored;
extern crate gnss_acquisition;
extern crate serde;

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::Display;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use clap::{Arg, App, ArgMatches};
use colored::*;
use log::info;
use serde::{Serialize, Deserialize};

use gnss_acquisition::block::{result_channel, spawn_engine, EngineHandle, SampleFanout};
use gnss_acquisition::config::{ChannelConfig, ReceiverConfig};
use gnss_acquisition::gnss::common::acquisition::{AcquisitionEngine, AcquisitionReport};
use gnss_acquisition::gnss::common::acquisition::dump::ProfileDump;
use gnss_acquisition::gnss::common::acquisition::telemetry::LogObserver;
use gnss_acquisition::gnss::signal::{Modulation, Signal};
use gnss_acquisition::io::{SampleFormat, SampleReader, DEFAULT_BLOCK_SIZE};

type Observer = (LogObserver, Option<ProfileDump<BufWriter<File>>>);

#[derive(Debug, Serialize, Deserialize)]
struct AcquisitionRecord {
	pub channel:usize,
	pub signal:Signal,
	pub prn:usize,
	pub detected:bool,
	pub doppler_hz:i32,
	pub code_phase_samples:usize,
	pub code_phase_chips:f64,
	/// Clamped to `f64::MAX` under a zero threshold, which JSON would otherwise print as null
	pub peak_to_threshold_ratio:f64,
	pub sample_idx:usize,
	pub time_sec:f64,
}

fn json_ratio(ratio:f64) -> f64 {
	if ratio.is_nan() { 0.0 } else { ratio.min(f64::MAX) }
}

fn parsed<T>(matches:&ArgMatches, name:&str) -> Result<Option<T>, String> where T: FromStr, T::Err: Display {
	matches.value_of(name).map(|s| s.parse::<T>().map_err(|e| format!("--{}: {}", name, e))).transpose()
}

// Accepts "1,5,7" and ranges like "1-32"
fn parse_prns(s:&str) -> Result<Vec<usize>, String> {
	let mut prns = vec![];
	for part in s.split(',').map(|p| p.trim()).filter(|p| !p.is_empty()) {
		let bad = |_| format!("--prns: cannot parse \"{}\"", part);
		match part.find('-') {
			Some(i) => {
				let lo:usize = part[..i].parse().map_err(bad)?;
				let hi:usize = part[i+1..].parse().map_err(bad)?;
				prns.extend(lo..=hi);
			},
			None => prns.push(part.parse().map_err(bad)?),
		}
	}
	Ok(prns)
}

// One dump file per channel, "profiles.jsonl" -> "profiles_ch3.jsonl"
fn channel_dump_path(base:&Path, channel:usize) -> PathBuf {
	let stem = base.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| "acquisition".to_string());
	let name = match base.extension() {
		Some(ext) => format!("{}_ch{}.{}", stem, channel, ext.to_string_lossy()),
		None => format!("{}_ch{}", stem, channel),
	};
	base.with_file_name(name)
}

fn receiver_config(matches:&ArgMatches) -> Result<ReceiverConfig, Box<dyn Error>> {
	let mut config = match matches.value_of("config") {
		Some(path) => ReceiverConfig::load(path)?,
		None => ReceiverConfig::default(),
	};

	let acq = &mut config.acquisition;
	if let Some(fs) = parsed(matches, "sample_rate_sps")? { acq.sample_rate_hz = fs; }
	if let Some(f) = parsed(matches, "intermediate_freq")? { acq.intermediate_frequency_hz = f; }
	if let Some(max) = parsed(matches, "doppler_max")? { acq.doppler_max_hz = max; }
	if let Some(step) = parsed(matches, "doppler_step")? { acq.doppler_step_hz = step; }
	if let Some(ms) = parsed(matches, "coherent_ms")? { acq.coherent_integration_ms = ms; }
	if let Some(n) = parsed(matches, "max_dwells")? { acq.max_dwells = n; }
	if let Some(pfa) = parsed(matches, "pfa")? { acq.false_alarm_probability = pfa; }
	if let Some(t) = parsed(matches, "threshold")? { acq.fixed_threshold = Some(t); }
	if let Some(path) = matches.value_of("dump") { acq.dump_filename = Some(PathBuf::from(path)); }
	if let Some(path) = matches.value_of("codebook") { config.code_book = Some(PathBuf::from(path)); }
	if let Some(format) = parsed::<SampleFormat>(matches, "input_type")? { config.sample_format = format; }

	let signal:Option<Signal> = parsed(matches, "signal")?;
	let modulation:Option<Modulation> = parsed(matches, "modulation")?;
	let prns:Option<Vec<usize>> = matches.value_of("prns").map(parse_prns).transpose()?;

	if prns.is_some() || config.channels.is_empty() {
		let signal = signal.unwrap_or(Signal::GpsL1Ca);
		let prns = prns.unwrap_or_else(|| (1..=signal.max_prn()).collect());
		config.channels = prns.into_iter().map(|prn| ChannelConfig{ modulation, ..ChannelConfig::new(signal, prn) }).collect();
	}

	Ok(config)
}

async fn run(matches:ArgMatches<'_>) -> Result<(), Box<dyn Error>> {
	let fname:&str = matches.value_of("filename").ok_or("--filename is required")?;
	let block_size:usize = parsed(&matches, "block_size")?.unwrap_or(DEFAULT_BLOCK_SIZE);
	let queue_depth:usize = parsed(&matches, "queue_depth")?.unwrap_or(16);
	let config = receiver_config(&matches)?;
	let fs = config.acquisition.sample_rate_hz;

	eprintln!("Acquiring {} channels in {} at {} [samples/sec], {:?}", config.channels.len(), &fname, fs, config.sample_format);

	let code_book = Arc::new(config.load_code_book()?);
	let (tx, mut rx) = result_channel();
	let mut fanout = SampleFanout::new();
	let mut handles:Vec<EngineHandle<Observer>> = vec![];

	for (idx, ch) in config.channels.iter().enumerate() {
		let acq_config = config.acquisition_for(idx);
		let dump = match &acq_config.dump_filename {
			Some(base) => Some(ProfileDump::create(channel_dump_path(base, idx))?),
			None => None,
		};

		let engine = AcquisitionEngine::with_observer(idx, tx.clone(), code_book.clone(), (LogObserver, dump));
		let handle = spawn_engine(engine, queue_depth);

		match handle.assign(ch.satellite(), ch.modulation(), acq_config).await {
			Ok(resolved) => {
				handle.start().await?;
				eprintln!("Channel {:2}: {} {:?}, {} Doppler bins x {} dwells, threshold {:?}", idx, ch.satellite(), ch.modulation(),
					resolved.num_doppler_bins, resolved.config.max_dwells, resolved.threshold);
				fanout.register(idx, handle.input());
				handles.push(handle);
			},
			Err(e) => {
				eprintln!("Channel {:2}: {} {}", idx, ch.satellite(), format!("skipped, {}", e).red());
				handle.shutdown().await?;
			},
		}
	}
	drop(tx);

	let mut reports:BTreeMap<usize, AcquisitionReport> = BTreeMap::new();
	let reader = SampleReader::open(fname, config.sample_format, block_size)?;
	let mut samples_read:usize = 0;

	for block in reader {
		samples_read = block.end_idx();
		fanout.publish_all(block).await;

		while let Some(report) = rx.try_recv() { reports.insert(report.channel, report); }
		if reports.len() >= handles.len() { break; }
	}
	info!("Read {} samples", samples_read);

	// Let the engines drain their queues before collecting the rest
	drop(fanout);
	for handle in handles {
		handle.shutdown().await?;
	}
	while let Some(report) = rx.recv().await { reports.insert(report.channel, report); }

	let mut all_records:Vec<AcquisitionRecord> = vec![];
	for (idx, ch) in config.channels.iter().enumerate() {
		let sv = ch.satellite();
		let report = match reports.get(&idx) {
			Some(r) => r,
			None => {
				eprintln!("Channel {:2}: {} {}", idx, sv, "no decision, ran out of samples".yellow());
				continue;
			}
		};

		let r = &report.result;
		let samples_per_chip = fs / sv.signal.chip_rate_hz();
		let time_sec = report.sample_idx as f64 / fs;
		let result_str = format!("{:6} [Hz], {:6} [samples], {:8.3} [chips], ratio {:.3}",
			r.doppler_hz, r.code_phase_samples, r.code_phase_samples as f64 / samples_per_chip, r.peak_to_threshold_ratio);
		if r.detected {
			eprintln!("{:6.2} [sec], Channel {:2}: {} {}", time_sec, idx, sv, result_str.green());
		} else {
			eprintln!("{:6.2} [sec], Channel {:2}: {} {}", time_sec, idx, sv, result_str.yellow());
		}

		all_records.push(AcquisitionRecord {
			channel:                 idx,
			signal:                  sv.signal,
			prn:                     sv.prn,
			detected:                r.detected,
			doppler_hz:              r.doppler_hz,
			code_phase_samples:      r.code_phase_samples,
			code_phase_chips:        r.code_phase_samples as f64 / samples_per_chip,
			peak_to_threshold_ratio: json_ratio(r.peak_to_threshold_ratio),
			sample_idx:              report.sample_idx,
			time_sec,
		});
	}

	// Output data in JSON format
	println!("{}", serde_json::to_string_pretty(&all_records)?);

	Ok(())
}

#[tokio::main]
async fn main() {
	env_logger::init();

	let matches = App::new("GNSS Acquisition")
		.version("0.1.0")
		.author("John Stanford (johnwstanford@gmail.com)")
		.about("Takes IQ samples and searches for GPS L1 C/A or Galileo E1 satellites over a Doppler/code phase grid")
		.arg(Arg::with_name("filename")
			.short("f").long("filename")
			.help("Input filename")
			.required(true).takes_value(true))
		.arg(Arg::with_name("input_type")
			.short("t").long("type")
			.takes_value(true)
			.possible_values(&["gr_complex", "cshort", "cbyte"]))
		.arg(Arg::with_name("sample_rate_sps")
			.short("s").long("sample_rate_sps")
			.takes_value(true))
		.arg(Arg::with_name("intermediate_freq")
			.long("if_hz")
			.takes_value(true))
		.arg(Arg::with_name("signal")
			.long("signal")
			.takes_value(true)
			.possible_values(&["gps_l1_ca", "galileo_e1b", "galileo_e1c"]))
		.arg(Arg::with_name("modulation")
			.long("modulation")
			.takes_value(true)
			.possible_values(&["bpsk", "boc11", "cboc"]))
		.arg(Arg::with_name("prns")
			.short("p").long("prns")
			.help("PRNs to search for, e.g. 1,3,5 or 1-32")
			.takes_value(true))
		.arg(Arg::with_name("doppler_max")
			.long("doppler_max")
			.takes_value(true))
		.arg(Arg::with_name("doppler_step")
			.long("doppler_step")
			.takes_value(true))
		.arg(Arg::with_name("coherent_ms")
			.long("coherent_ms")
			.takes_value(true))
		.arg(Arg::with_name("max_dwells")
			.long("max_dwells")
			.takes_value(true))
		.arg(Arg::with_name("pfa")
			.long("pfa")
			.help("Probability of false alarm; 0 uses --threshold")
			.takes_value(true))
		.arg(Arg::with_name("threshold")
			.long("threshold")
			.takes_value(true))
		.arg(Arg::with_name("codebook")
			.long("codebook")
			.help("JSON file of Galileo E1 memory codes")
			.takes_value(true))
		.arg(Arg::with_name("config")
			.short("c").long("config")
			.help("JSON receiver configuration; command line options override it")
			.takes_value(true))
		.arg(Arg::with_name("dump")
			.long("dump")
			.help("Write every correlation profile to this file, one per channel")
			.takes_value(true))
		.arg(Arg::with_name("block_size")
			.long("block_size")
			.takes_value(true))
		.arg(Arg::with_name("queue_depth")
			.long("queue_depth")
			.takes_value(true))
		.get_matches();

	if let Err(e) = run(matches).await {
		eprintln!("{} {}", "Error:".red(), e);
		std::process::exit(1);
	}
}
