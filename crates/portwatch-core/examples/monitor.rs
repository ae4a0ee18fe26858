use anyhow::Result;
use portwatch_core::device::{
    list_ports, DeviceOptions, ParserOptions, SerialEvent, SerialEventDevice, SharedEventBuffer,
    DEFAULT_BAUD_RATE,
};
use std::env;
use std::thread;
use std::time::Duration;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        println!("Usage: monitor <port|auto> [baud]");
        println!("Available ports:");
        for port in list_ports() {
            println!("  - {} {:?}", port.name, port.product);
        }
        return Ok(());
    }

    let baud = args
        .get(2)
        .map(|s| s.parse::<u32>())
        .transpose()?
        .unwrap_or(DEFAULT_BAUD_RATE);

    let options = DeviceOptions {
        port: args[1].clone(),
        baud,
        event_parser: ParserOptions {
            delimiter: Some(r"\n".to_string()),
            ..Default::default()
        },
    };

    let buffer = SharedEventBuffer::new();
    let mut device = SerialEventDevice::open(&options, Box::new(buffer.clone()))?;
    device.enable_reporting(true)?;
    println!("Monitoring {} at {} baud (newline-delimited)", device.port(), baud);

    loop {
        device.poll();
        for event in buffer.drain() {
            match event {
                SerialEvent::Input(ev) => println!(
                    "[{:.6}] #{} {:?} (+/-{:.1}ms)",
                    ev.read_time,
                    ev.id,
                    String::from_utf8_lossy(&ev.data),
                    ev.confidence_interval * 1000.0
                ),
                SerialEvent::ByteChange(ev) => println!(
                    "[{:.6}] #{} byte {:#04x} -> {:#04x}",
                    ev.read_time, ev.id, ev.prev_byte, ev.current_byte
                ),
            }
        }
        thread::sleep(Duration::from_millis(10));
    }
}
