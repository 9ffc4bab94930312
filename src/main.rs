use std::env;
use std::fs;
use std::io::{self, BufRead};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use rand::Rng;

use dialgauge::{GaugeCommand, GaugeConfig, GaugeRegistry, ShowOptions};

/// Font locations tried when no --font path is given.
const FONT_FALLBACKS: [&str; 4] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/Library/Fonts/Arial Unicode.ttf",
];

struct Args {
    title: String,
    font_path: Option<String>,
    /// Attribute name/value pairs applied before the window opens.
    attrs: Vec<(String, String)>,
    /// Drive the needle from a random walk instead of stdin.
    demo: bool,
}

fn parse_args() -> Args {
    let mut parsed = Args {
        title: "gauge".to_string(),
        font_path: None,
        attrs: Vec::new(),
        demo: false,
    };
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--range" => {
                if let (Some(x), Some(y)) = (args.next(), args.next()) {
                    parsed.attrs.push(("min".to_string(), x));
                    parsed.attrs.push(("max".to_string(), y));
                }
            }
            "--title" => {
                if let Some(title) = args.next() {
                    parsed.title = title;
                }
            }
            "--font" => {
                parsed.font_path = args.next();
            }
            "--attr" => {
                if let Some(pair) = args.next() {
                    if let Some((name, value)) = pair.split_once('=') {
                        parsed.attrs.push((name.to_string(), value.to_string()));
                    } else {
                        log::warn!("--attr expects name=value, got {pair:?}");
                    }
                }
            }
            "--demo" => {
                parsed.demo = true;
            }
            other => {
                log::warn!("ignoring unknown argument {other:?}");
            }
        }
    }
    parsed
}

fn load_font(path: Option<&str>) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return Ok(fs::read(path)?);
    }
    for candidate in FONT_FALLBACKS {
        if let Ok(data) = fs::read(candidate) {
            log::debug!("using fallback font {candidate}");
            return Ok(data);
        }
    }
    Err("no font found; pass --font <path>".into())
}

/// Feed lines from stdin: a bare number becomes an update, `name=value`
/// becomes an attribute change.
fn spawn_stdin_feed(sender: mpsc::Sender<GaugeCommand>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines().map_while(Result::ok) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let command = if let Ok(value) = line.parse::<f64>() {
                GaugeCommand::Update(value)
            } else if let Some((name, value)) = line.split_once('=') {
                GaugeCommand::SetAttribute(name.to_string(), value.to_string())
            } else {
                log::warn!("unparsed input line {line:?}");
                continue;
            };
            if sender.send(command).is_err() {
                break;
            }
        }
    });
}

/// Random-walk feed for trying the gauge without a data source.
fn spawn_demo_feed(sender: mpsc::Sender<GaugeCommand>) {
    thread::spawn(move || {
        let mut rng = rand::rng();
        let mut value: f64 = 50.0;
        loop {
            value = (value + rng.random_range(-8.0..8.0)).clamp(0.0, 100.0);
            if sender.send(GaugeCommand::Update(value)).is_err() {
                break;
            }
            thread::sleep(Duration::from_millis(150));
        }
    });
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = parse_args();
    let font_data = load_font(args.font_path.as_deref())?;

    let mut registry = GaugeRegistry::new();
    let (event_tx, event_rx) = mpsc::channel();
    registry.set_event_sink(event_tx);
    let id = registry.create(GaugeConfig::default());
    while let Ok(event) = event_rx.try_recv() {
        log::info!("registry event: {event:?}");
    }

    let gauge = registry.get_mut(id).expect("gauge was just created");
    for (name, value) in &args.attrs {
        gauge.set_attribute(name, value);
    }

    let (command_tx, command_rx) = mpsc::channel();
    if args.demo {
        spawn_demo_feed(command_tx);
    } else {
        spawn_stdin_feed(command_tx);
    }

    let options = ShowOptions::builder()
        .title(args.title)
        .font_data(font_data)
        .build();
    gauge.show_with_commands(options, command_rx)
}
