//! Bell playback on the default output device

use crate::error::{Error, Result};
use rodio::{Decoder, OutputStream, Sink};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Plays a sound file a configured number of times per ring.
///
/// The output stream is opened fresh for every ring and torn down when
/// playback completes, so the device is only held while the bell is
/// actually sounding.
pub struct BellPlayer {
    path: PathBuf,
    loops: u32,
}

impl BellPlayer {
    /// Create a player for `path`, repeating the sound `loops` times
    /// per ring.
    pub fn new(path: impl Into<PathBuf>, loops: u32) -> Self {
        Self {
            path: path.into(),
            loops: loops.max(1),
        }
    }

    /// The configured sound file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Play the bell and block until playback completes.
    pub fn ring(&self) -> Result<()> {
        // Open the file before touching the device so a missing file
        // reports as such even where no output device exists.
        let file = File::open(&self.path)?;
        let source =
            Decoder::new(BufReader::new(file)).map_err(|e| Error::Decode(e.to_string()))?;

        let (_stream, handle) =
            OutputStream::try_default().map_err(|e| Error::Device(e.to_string()))?;
        let sink = Sink::try_new(&handle).map_err(|e| Error::Stream(e.to_string()))?;

        sink.append(source);
        for _ in 1..self.loops {
            let file = File::open(&self.path)?;
            let source =
                Decoder::new(BufReader::new(file)).map_err(|e| Error::Decode(e.to_string()))?;
            sink.append(source);
        }

        sink.sleep_until_end();
        debug!("bell playback completed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loops_floor_at_one() {
        let player = BellPlayer::new("/tmp/bell.wav", 0);
        assert_eq!(player.loops, 1);
    }

    #[test]
    fn test_ring_reports_missing_file() {
        let player = BellPlayer::new("/nonexistent/bell.wav", 1);
        assert!(matches!(player.ring(), Err(Error::Io(_))));
    }

    #[test]
    fn test_path_accessor() {
        let player = BellPlayer::new("/tmp/bell.wav", 3);
        assert_eq!(player.path(), Path::new("/tmp/bell.wav"));
    }
}
