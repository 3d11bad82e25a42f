use std::path::PathBuf;
use std::time::Duration;
use std::{fs, thread};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use gif_player::{Bitmap, GifPlayer, LoadMode, PlayState};

mod ppm_writer;

const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Play a GIF and dump every shown frame as a PPM file.
#[derive(Parser, Debug)]
#[command(name = "gif-player")]
#[command(version)]
#[command(about = "Play a GIF and write its frames as PPM files")]
struct Args {
    /// GIF file to play
    file: PathBuf,

    /// Directory the frame_<n>.ppm files are written to
    out_dir: PathBuf,

    /// Stop after this many frames
    #[arg(default_value_t = 100)]
    max_frames: usize,

    /// Load the whole file into memory before playing
    #[arg(long)]
    to_mem: bool,
}

impl Args {
    fn load_mode(&self) -> LoadMode {
        if self.to_mem {
            LoadMode::Memory
        } else {
            LoadMode::Streamed
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut player = GifPlayer::new();
    player
        .open_file(&args.file, args.load_mode())
        .with_context(|| format!("failed to open {}", args.file.display()))?;

    let (width, height) = player.width().zip(player.height()).context("no gif is open")?;
    let mut frame = Bitmap::try_new(width, height)?;
    fs::create_dir_all(&args.out_dir)?;

    let mut written = 0;
    while written < args.max_frames {
        match player.play(&mut frame)? {
            PlayState::Frame => {
                let path = args.out_dir.join(format!("frame_{written}.ppm"));
                ppm_writer::write_ppm(&path, &frame)?;
                written += 1;
            }
            PlayState::Waiting => thread::sleep(POLL_INTERVAL),
            PlayState::Finished => break,
        }
    }

    info!("wrote {written} frames to {}", args.out_dir.display());
    player.close();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_positional_arguments_and_flag() {
        let args = Args::try_parse_from(["gif-player", "in.gif", "out", "--to-mem"]).unwrap();
        assert_eq!(args.file, PathBuf::from("in.gif"));
        assert_eq!(args.out_dir, PathBuf::from("out"));
        assert_eq!(args.max_frames, 100);
        assert_eq!(args.load_mode(), LoadMode::Memory);

        let args = Args::try_parse_from(["gif-player", "in.gif", "out", "7"]).unwrap();
        assert_eq!(args.max_frames, 7);
        assert_eq!(args.load_mode(), LoadMode::Streamed);
    }

    #[test]
    fn rejects_missing_output_directory() {
        assert!(Args::try_parse_from(["gif-player", "in.gif"]).is_err());
        assert!(Args::try_parse_from(["gif-player", "in.gif", "out", "many"]).is_err());
    }
}
