//! Example: Decode a video file and print frame information
//!
//! Usage: cargo run --example decode_video <video_file> [hwaccel]
//!
//! Opens a video, decodes and converts the first 10 frames, rewinds, and
//! decodes the first frame again.

use std::env;
use std::path::Path;

use immersive_video::telemetry::{init_logging, LogConfig};
use immersive_video::{DecodeOutcome, DecodeSession, FrameConverter, HwAccelKind, PresentationLayout};

fn main() {
    let _guard = init_logging(&LogConfig::default()).ok().flatten();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <video_file> [hwaccel]", args[0]);
        eprintln!("Example: {} test.mp4 vaapi", args[0]);
        std::process::exit(1);
    }

    let video_path = Path::new(&args[1]);
    let hw_accel = match args.get(2).map(|s| s.parse::<HwAccelKind>()) {
        Some(Ok(kind)) => kind,
        Some(Err(e)) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
        None => HwAccelKind::None,
    };

    println!("Opening video: {} ({})", video_path.display(), hw_accel);

    let mut session = match DecodeSession::open(video_path, hw_accel) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };
    let mut converter = match FrameConverter::for_session(&session, PresentationLayout::Rgba) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let (width, height) = session.frame_size();
    println!("\n=== Video Information ===");
    println!("Codec: {}", session.codec_name());
    println!("Resolution: {}x{} ({:?})", width, height, session.pixel_format());
    println!("Frame rate: {:.2} fps", session.frame_rate());
    println!("Duration: {:.2} seconds", session.duration());
    for (key, value) in session.metadata() {
        println!("  {}: {}", key, value);
    }
    println!();

    println!("=== Decoding first 10 frames ===");
    let mut decoded_count = 0;
    while decoded_count < 10 {
        let frame = match session.decode_next_frame(false) {
            Ok(DecodeOutcome::Frame(frame)) => frame,
            Ok(DecodeOutcome::EndOfStream) => {
                println!("End of video reached");
                break;
            }
            Err(e) => {
                eprintln!("Decode error: {}", e);
                break;
            }
        };
        let pts = frame.pts();
        match converter.convert(frame) {
            Ok(view) => println!(
                "Frame {}: {}x{}, PTS: {:?}, data size: {} bytes",
                decoded_count,
                view.width,
                view.height,
                pts,
                view.data.len()
            ),
            Err(e) => {
                eprintln!("Conversion error: {}", e);
                break;
            }
        }
        decoded_count += 1;
    }

    println!("\nDecoded {} frames", decoded_count);

    println!("\n=== Testing reset ===");
    if let Err(e) = session.reset() {
        eprintln!("Reset failed: {}", e);
    } else if let Ok(DecodeOutcome::Frame(frame)) = session.decode_next_frame(false) {
        println!("After reset, first frame PTS: {:?}", frame.pts());
    }

    converter.dispose();
    session.close();
    println!("\nDone!");
}
