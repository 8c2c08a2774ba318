use std::env;
use std::error::Error;
use std::io::{self, BufRead};
use std::path::Path;
use std::process;
use std::sync::{Arc, Weak};

use sysaudio_recorder_core::{OverlayInput, RecorderEvent};
use sysaudio_recorder_host::console_surface::ConsoleSurface;
use sysaudio_recorder_host::demo_source::ToneGrant;
use sysaudio_recorder_host::{HeadlessEnvironment, RecorderConfig, RecorderPlugin};

const TONE_HZ: f32 = 440.0;

const HELP: &str = "commands: start | stop | yes | no | list | overlay | quit";

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        log::error!("{}", e);
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let config = match env::args().nth(1) {
        Some(path) => RecorderConfig::load(Path::new(&path))?,
        None => RecorderConfig::default(),
    };
    log::info!("Recording to {}", config.capture.output_directory.display());

    let plugin = Arc::new(RecorderPlugin::new(config, Arc::new(HeadlessEnvironment::default()))?);
    let host = Arc::downgrade(&plugin);
    plugin.attach_host(Arc::new(move |event: RecorderEvent| on_recorder_event(&host, event)));

    open_overlay(&plugin);
    println!("{}", HELP);

    for line in io::stdin().lock().lines() {
        let line = line?;
        let input = match line.trim() {
            "" => continue,
            "start" => OverlayInput::StartPressed,
            "stop" => OverlayInput::StopPressed,
            "yes" => OverlayInput::ConfirmAccepted,
            "no" => OverlayInput::ConfirmDeclined,
            "list" => {
                print_recordings(&plugin);
                continue;
            }
            "overlay" => {
                open_overlay(&plugin);
                continue;
            }
            "quit" | "exit" => break,
            other => {
                println!("unknown command `{}`; {}", other, HELP);
                continue;
            }
        };
        if !plugin.send_overlay_input(input) {
            println!("overlay is closed (type `overlay` to reopen)");
        }
    }

    plugin.stop_floating_recorder();
    if plugin.is_recording() {
        if let Ok(Some(path)) = plugin.stop_record() {
            println!("saved {}", path.display());
        }
    }
    plugin.detach_host();
    Ok(())
}

/// Host side of the bridge: overlay start/stop drive the capture session.
fn on_recorder_event(host: &Weak<RecorderPlugin>, event: RecorderEvent) -> Result<(), String> {
    let plugin = host.upgrade().ok_or("recorder shut down")?;
    match event {
        RecorderEvent::Start => match plugin.start_record(Some(ToneGrant::handle(TONE_HZ))) {
            Ok(path) => {
                println!("recording to {}", path.display());
                Ok(())
            }
            Err(e) => {
                plugin.report_capture_failed();
                Err(e.to_string())
            }
        },
        RecorderEvent::Stop => match plugin.stop_record() {
            Ok(Some(path)) => {
                println!("saved {}", path.display());
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) => Err(e.to_string()),
        },
    }
}

fn open_overlay(plugin: &RecorderPlugin) {
    if let Err(e) = plugin.start_floating_recorder(Box::new(ConsoleSurface::stdout())) {
        println!("cannot show overlay: {} ({})", e, e.code());
    }
}

fn print_recordings(plugin: &RecorderPlugin) {
    match plugin.list_recordings() {
        Ok(recordings) if recordings.is_empty() => println!("no recordings yet"),
        Ok(recordings) => {
            for recording in recordings {
                println!(
                    "{}  {:>10} bytes  {}",
                    recording.last_modified.format("%Y-%m-%d %H:%M:%S"),
                    recording.size,
                    recording.name
                );
            }
        }
        Err(e) => println!("{} ({})", e, e.code()),
    }
}
