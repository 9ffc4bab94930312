use dialgauge::{Gauge, GaugeCommand, GaugeConfig, ShowOptions};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use rand::Rng;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let font_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf".to_string());
    let font_data = std::fs::read(&font_path)?;

    let mut gauge = Gauge::new(GaugeConfig::default());
    gauge.set_attribute("max", "1200");
    gauge.set_attribute("multiplier", "100");
    gauge.set_attribute("measurement", "pressure");
    gauge.set_attribute("unit", "kPa");
    gauge.set_attribute(
        "zones",
        r#"[{"type":"normal","cover":3,"rotate":81},
            {"type":"warn","cover":2,"rotate":189},
            {"type":"high","cover":1,"rotate":243}]"#,
    );

    // Feed random readings the way a polling sensor would.
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let mut rng = rand::rng();
        loop {
            let value = rng.random_range(0.0..1200.0);
            if sender.send(GaugeCommand::Update(value)).is_err() {
                break;
            }
            thread::sleep(Duration::from_millis(900));
        }
    });

    println!("Displaying gauge fed by random pressure readings:");
    println!("- Scale: 0..1200 with a x100 multiplier");
    println!("- Zones: normal, warn and high bands on the plate");
    println!("Press Ctrl+C to exit");

    let options = ShowOptions::builder()
        .title("pressure".to_string())
        .font_data(font_data)
        .build();
    gauge.show_with_commands(options, receiver)
}
