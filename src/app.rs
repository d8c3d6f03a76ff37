use crate::cli::{Cli, Commands};
use ffwatch::config::SettingsFile;
use ffwatch::engine::hardware::EncoderCapability;
use ffwatch::engine::{
    CancelToken, Dispatcher, EventSink, ToolPaths, TranscodeOutcome, convert_files,
    default_worker_count, destination_path, ffmpeg_version, ffprobe_version, scan_source,
};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

static STOP_REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_stop_signal(_sig: libc::c_int) {
    STOP_REQUESTED.store(true, Ordering::SeqCst);
}

fn install_signal_handlers() {
    unsafe {
        libc::signal(libc::SIGINT, on_stop_signal as libc::sighandler_t);
        libc::signal(libc::SIGTERM, on_stop_signal as libc::sighandler_t);
    }
}

/// Feed the process-level stop flag into the engine's cancel token.
fn bridge_stop_signal(cancel: CancelToken) {
    thread::spawn(move || {
        while !STOP_REQUESTED.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(200));
        }
        cancel.cancel();
    });
}

fn settings_path(cli: &Cli) -> PathBuf {
    if let Some(path) = &cli.config {
        return path.clone();
    }
    match SettingsFile::settings_path() {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Error locating settings file: {e:#}");
            process::exit(1);
        }
    }
}

fn tool_paths(cli: &Cli) -> ToolPaths {
    let mut tools = ToolPaths::default();
    if let Some(ffmpeg) = &cli.ffmpeg {
        tools.ffmpeg = ffmpeg.clone();
    }
    if let Some(ffprobe) = &cli.ffprobe {
        tools.ffprobe = ffprobe.clone();
    }
    tools
}

pub fn run(cli: Cli) {
    let config_path = settings_path(&cli);
    let tools = tool_paths(&cli);
    let workers = cli.workers.unwrap_or_else(default_worker_count);

    match cli.command {
        Some(Commands::Scan) => handle_scan(&config_path),
        Some(Commands::Encoders) => handle_encoders(&tools),
        Some(Commands::CheckTools) => handle_check_tools(&tools),
        Some(Commands::Convert { files }) => handle_convert(&config_path, &tools, workers, files),
        Some(Commands::InitConfig) => handle_init_config(&config_path),
        Some(Commands::Run) | None => handle_run(config_path, tools, workers),
    }
}

fn handle_run(config_path: PathBuf, tools: ToolPaths, workers: usize) {
    if let Err(e) = SettingsFile::ensure_default(&config_path) {
        eprintln!("Error creating settings file: {e:#}");
        process::exit(1);
    }

    install_signal_handlers();
    let cancel = CancelToken::new();
    bridge_stop_signal(cancel.clone());

    let (events, event_rx) = EventSink::channel();
    thread::spawn(move || {
        for line in event_rx {
            println!("{line}");
        }
    });

    let mut dispatcher = Dispatcher::new(config_path, tools, workers, events, cancel);
    if let Err(e) = dispatcher.run() {
        eprintln!("Error running conversion service: {e:#}");
        process::exit(1);
    }
}

fn handle_scan(config_path: &PathBuf) {
    let settings = SettingsFile::load_or_default(config_path);
    match scan_source(&settings) {
        Ok(found) if found.is_empty() => println!("No files waiting for conversion."),
        Ok(found) => {
            println!("{} file(s) waiting for conversion:", found.len());
            for request in found {
                let destination = destination_path(&request.source_path, &settings)
                    .map(|d| d.display().to_string())
                    .unwrap_or_else(|| "<unnamed>".to_string());
                println!("  {} -> {}", request.source_path.display(), destination);
            }
        }
        Err(e) => {
            eprintln!("Error scanning source folder: {e}");
            process::exit(1);
        }
    }
}

fn handle_encoders(tools: &ToolPaths) {
    let capability = EncoderCapability::detect(&tools.ffmpeg);
    println!("Hardware encoder support:");
    println!("  NVIDIA (NVENC): {}", yes_no(capability.nvidia));
    println!("  Intel (QSV):    {}", yes_no(capability.intel));
    println!("  AMD (AMF):      {}", yes_no(capability.amd));

    match capability.select() {
        Some((vendor, encoders)) => {
            println!(
                "Selected: {} ({} / {})",
                vendor.display_name(),
                encoders.h264,
                encoders.hevc
            );
        }
        None => println!("Selected: software encoding"),
    }
}

fn yes_no(available: bool) -> &'static str {
    if available { "yes" } else { "no" }
}

fn handle_check_tools(tools: &ToolPaths) {
    let mut ok = true;
    match ffmpeg_version(tools) {
        Ok(version) => println!("ffmpeg:  {version}"),
        Err(e) => {
            eprintln!("ffmpeg:  NOT FOUND ({e:#})");
            ok = false;
        }
    }
    match ffprobe_version(tools) {
        Ok(version) => println!("ffprobe: {version}"),
        Err(e) => {
            eprintln!("ffprobe: NOT FOUND ({e:#})");
            ok = false;
        }
    }
    if !ok {
        process::exit(1);
    }
}

fn handle_convert(config_path: &PathBuf, tools: &ToolPaths, workers: usize, files: Vec<PathBuf>) {
    let settings = SettingsFile::load_or_default(config_path);

    install_signal_handlers();
    let cancel = CancelToken::new();
    bridge_stop_signal(cancel.clone());

    let (events, event_rx) = EventSink::channel();
    thread::spawn(move || {
        for line in event_rx {
            println!("{line}");
        }
    });

    let results = convert_files(&files, &settings, tools, workers, &events, &cancel);

    let mut failed = false;
    for (source, outcome) in &results {
        println!("{}: {}", source.display(), outcome.label());
        failed |= matches!(
            outcome,
            TranscodeOutcome::PreprocessFailed(_)
                | TranscodeOutcome::TranscodeFailed(_)
                | TranscodeOutcome::ToolNotFound
        );
    }
    if failed {
        process::exit(1);
    }
}

fn handle_init_config(config_path: &PathBuf) {
    match SettingsFile::ensure_default(config_path) {
        Ok(()) => println!("Settings file: {}", config_path.display()),
        Err(e) => {
            eprintln!("Error creating settings file: {e:#}");
            process::exit(1);
        }
    }
}
