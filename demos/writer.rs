//! Demo producer
//!
//! Publishes synthetic moving-gradient frames at a fixed rate, standing in
//! for a camera loop. Pair with the `reader` demo:
//!
//! ```sh
//! cargo run --example writer -- frame
//! cargo run --example reader -- frame
//! ```

use framechan::{Frame, FrameWriter};
use std::time::Duration;

const HEIGHT: u32 = 240;
const WIDTH: u32 = 320;
const CHANNELS: u32 = 3;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let channel = std::env::args().nth(1).unwrap_or_else(|| "frame".to_string());

    let mut writer = match FrameWriter::open(&channel) {
        Ok(w) => w,
        Err(e) => {
            eprintln!("failed to open channel: {}", e);
            std::process::exit(1);
        }
    };

    let mut data = vec![0u8; (HEIGHT * WIDTH * CHANNELS) as usize];
    let mut tick = 0u64;

    loop {
        // Moving gradient so the reader can see the content change
        for y in 0..HEIGHT as usize {
            for x in 0..WIDTH as usize {
                let base = (y * WIDTH as usize + x) * CHANNELS as usize;
                data[base] = (x as u64 + tick) as u8;
                data[base + 1] = (y as u64 + tick) as u8;
                data[base + 2] = tick as u8;
            }
        }

        let frame = match Frame::new(HEIGHT, WIDTH, CHANNELS, &data) {
            Ok(f) => f,
            Err(e) => {
                eprintln!("bad frame: {}", e);
                break;
            }
        };
        if let Err(e) = writer.publish(frame) {
            eprintln!("publish failed: {}", e);
            break;
        }

        tick += 1;
        std::thread::sleep(Duration::from_millis(33));
    }

    writer.close();
}
