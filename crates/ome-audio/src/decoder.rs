//! Audio file decoding via symphonia.
//!
//! `FileSource` streams packets from disk on demand; nothing is decoded
//! ahead of the read position. Dropping it closes the file.

use crate::source::{MemorySource, PcmFormat, PcmSource};
use ome_core::{AudioSourceId, OmeError, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Opens the PCM source behind a track id.
pub trait SourceOpener {
    fn open(&self, id: &AudioSourceId) -> Result<Box<dyn PcmSource>>;
}

/// Opens tracks by decoding the file at the id's path.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileOpener;

impl SourceOpener for FileOpener {
    fn open(&self, id: &AudioSourceId) -> Result<Box<dyn PcmSource>> {
        Ok(Box::new(FileSource::open(id.path())?))
    }
}

/// Opens every existing path as an in-memory ramp of fixed length.
///
/// Lets the engine run without decoding real audio: the file only has to
/// exist. Used for headless runs and tests.
#[derive(Debug, Clone, Copy)]
pub struct MemoryOpener {
    pub frames: usize,
    pub format: PcmFormat,
}

impl MemoryOpener {
    pub fn new(frames: usize, format: PcmFormat) -> Self {
        Self { frames, format }
    }
}

impl SourceOpener for MemoryOpener {
    fn open(&self, id: &AudioSourceId) -> Result<Box<dyn PcmSource>> {
        if !id.path().is_file() {
            return Err(OmeError::NotFound(id.to_string()));
        }
        Ok(Box::new(MemorySource::ramp(self.frames, self.format)?))
    }
}

struct Stream {
    reader: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    format: PcmFormat,
    n_frames: Option<u64>,
}

fn decoder_error(path: &Path, err: SymphoniaError) -> OmeError {
    OmeError::Decoder(format!("{}: {}", path.display(), err))
}

fn is_end_of_stream(err: &SymphoniaError) -> bool {
    match err {
        SymphoniaError::IoError(e) => e.kind() == std::io::ErrorKind::UnexpectedEof,
        SymphoniaError::ResetRequired => true,
        _ => false,
    }
}

fn open_stream(path: &Path) -> Result<Stream> {
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => OmeError::NotFound(path.display().to_string()),
        _ => OmeError::Io(e),
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| decoder_error(path, e))?;
    let reader = probed.format;

    let track = reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| OmeError::Decoder(format!("{}: no audio track", path.display())))?;

    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| OmeError::Decoder(format!("{}: unknown sample rate", path.display())))?;
    let channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .ok_or_else(|| OmeError::Decoder(format!("{}: unknown channel layout", path.display())))?;
    if channels == 0 {
        return Err(OmeError::Decoder(format!("{}: no audio channels", path.display())));
    }
    let track_id = track.id;
    let n_frames = track.codec_params.n_frames;

    let decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| decoder_error(path, e))?;

    Ok(Stream {
        reader,
        decoder,
        track_id,
        format: PcmFormat::new(sample_rate, channels),
        n_frames,
    })
}

/// Sum packet durations when the container does not declare a frame count.
fn count_frames(path: &Path) -> Result<u64> {
    let mut stream = open_stream(path)?;
    let mut total = 0u64;
    loop {
        match stream.reader.next_packet() {
            Ok(packet) if packet.track_id() == stream.track_id => total += packet.dur,
            Ok(_) => {}
            Err(e) if is_end_of_stream(&e) => break,
            Err(e) => return Err(decoder_error(path, e)),
        }
    }
    debug!(path = %path.display(), frames = total, "Counted frames by scanning packets");
    Ok(total)
}

/// A decoded audio file exposed as a seekable PCM source.
pub struct FileSource {
    path: PathBuf,
    reader: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    format: PcmFormat,
    total_frames: u64,
    position: u64,
    exhausted: bool,
    /// Frames to drop from the next decoded packets after an accurate seek.
    skip_frames: u64,
    pending: Vec<f32>,
    pending_offset: usize,
    sample_buf: Option<SampleBuffer<f32>>,
}

impl FileSource {
    /// Open an audio file and detect its format. The file stays open until drop.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let stream = open_stream(path)?;
        let total_frames = match stream.n_frames {
            Some(n) => n,
            None => count_frames(path)?,
        };

        debug!(
            path = %path.display(),
            sample_rate = stream.format.sample_rate,
            channels = stream.format.channels,
            frames = total_frames,
            "Opened audio file"
        );

        Ok(Self {
            path: path.to_path_buf(),
            reader: stream.reader,
            decoder: stream.decoder,
            track_id: stream.track_id,
            format: stream.format,
            total_frames,
            position: 0,
            exhausted: false,
            skip_frames: 0,
            pending: Vec::new(),
            pending_offset: 0,
            sample_buf: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn reopen(&mut self) -> Result<()> {
        let stream = open_stream(&self.path)?;
        self.reader = stream.reader;
        self.decoder = stream.decoder;
        self.track_id = stream.track_id;
        self.skip_frames = 0;
        Ok(())
    }

    /// Decode the next packet into `pending`. Returns `false` at end of stream.
    fn decode_next(&mut self) -> Result<bool> {
        let channels = self.format.channels as usize;
        loop {
            let packet = match self.reader.next_packet() {
                Ok(packet) => packet,
                Err(e) if is_end_of_stream(&e) => return Ok(false),
                Err(e) => return Err(decoder_error(&self.path, e)),
            };
            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(msg)) => {
                    warn!(path = %self.path.display(), "Skipping undecodable packet: {}", msg);
                    continue;
                }
                Err(e) if is_end_of_stream(&e) => return Ok(false),
                Err(e) => return Err(decoder_error(&self.path, e)),
            };

            let spec = *decoded.spec();
            if spec.channels.count() != channels {
                return Err(OmeError::Decoder(format!(
                    "{}: channel count changed mid-stream",
                    self.path.display()
                )));
            }

            let needed = decoded.capacity() * channels;
            if self.sample_buf.as_ref().map_or(true, |b| b.capacity() < needed) {
                self.sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
            }

            self.pending.clear();
            self.pending_offset = 0;
            if let Some(buf) = self.sample_buf.as_mut() {
                buf.copy_interleaved_ref(decoded);
                self.pending.extend_from_slice(buf.samples());
            }

            if self.skip_frames > 0 {
                let frames = (self.pending.len() / channels) as u64;
                let skip = self.skip_frames.min(frames);
                self.pending_offset = skip as usize * channels;
                self.skip_frames -= skip;
            }

            if self.pending_offset < self.pending.len() {
                return Ok(true);
            }
        }
    }
}

impl PcmSource for FileSource {
    fn format(&self) -> PcmFormat {
        self.format
    }

    fn len_frames(&self) -> u64 {
        self.total_frames
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn seek(&mut self, frame: u64) -> Result<()> {
        self.pending.clear();
        self.pending_offset = 0;

        if frame >= self.total_frames {
            self.position = self.total_frames;
            self.exhausted = true;
            return Ok(());
        }
        self.exhausted = false;

        // Timestamps are in frames for the supported containers.
        let target = SeekTo::TimeStamp {
            ts: frame,
            track_id: self.track_id,
        };
        match self.reader.seek(SeekMode::Accurate, target) {
            Ok(seeked) => {
                self.decoder.reset();
                self.skip_frames = seeked.required_ts.saturating_sub(seeked.actual_ts);
            }
            Err(e) if frame == 0 => {
                debug!(path = %self.path.display(), error = %e, "Seek to start failed, reopening");
                self.reopen()?;
            }
            Err(e) => return Err(decoder_error(&self.path, e)),
        }

        self.position = frame;
        Ok(())
    }

    fn read(&mut self, out: &mut [f32]) -> Result<usize> {
        if self.exhausted {
            return Ok(0);
        }
        let channels = self.format.channels as usize;
        let wanted = out.len() - out.len() % channels;
        let mut written = 0;

        while written < wanted {
            if self.pending_offset >= self.pending.len() && !self.decode_next()? {
                self.exhausted = true;
                break;
            }
            let available = self.pending.len() - self.pending_offset;
            let count = available.min(wanted - written);
            out[written..written + count]
                .copy_from_slice(&self.pending[self.pending_offset..self.pending_offset + count]);
            self.pending_offset += count;
            written += count;
            self.position += (count / channels) as u64;
        }

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Write a mono 16-bit PCM WAV whose sample `i` equals `i * 100`.
    fn write_wav(path: &Path, frames: u32, sample_rate: u32) {
        let data_len = frames * 2;
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVEfmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes()); // PCM
        bytes.extend_from_slice(&1u16.to_le_bytes()); // mono
        bytes.extend_from_slice(&sample_rate.to_le_bytes());
        bytes.extend_from_slice(&(sample_rate * 2).to_le_bytes());
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        for i in 0..frames {
            bytes.extend_from_slice(&((i * 100) as i16).to_le_bytes());
        }
        let mut file = File::create(path).unwrap();
        file.write_all(&bytes).unwrap();
    }

    #[test]
    fn test_open_wav_reports_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_wav(&path, 200, 8000);

        let src = FileSource::open(&path).unwrap();
        assert_eq!(src.format(), PcmFormat::new(8000, 1));
        assert_eq!(src.len_frames(), 200);
        assert_eq!(src.position(), 0);
    }

    #[test]
    fn test_read_until_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_wav(&path, 200, 8000);

        let mut src = FileSource::open(&path).unwrap();
        let mut out = vec![0.0f32; 64];
        let mut total = 0;
        loop {
            let n = src.read(&mut out).unwrap();
            if n == 0 {
                break;
            }
            total += n;
        }
        assert_eq!(total, 200);
        assert_eq!(src.position(), 200);
    }

    #[test]
    fn test_seek_to_start_replays() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_wav(&path, 50, 8000);

        let mut src = FileSource::open(&path).unwrap();
        let mut first = vec![0.0f32; 10];
        src.read(&mut first).unwrap();

        let mut rest = vec![0.0f32; 100];
        src.read(&mut rest).unwrap();
        src.seek(0).unwrap();

        let mut again = vec![0.0f32; 10];
        assert_eq!(src.read(&mut again).unwrap(), 10);
        assert_eq!(first, again);
        assert_eq!(src.position(), 10);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let result = FileSource::open(dir.path().join("missing.flac"));
        assert!(matches!(result, Err(OmeError::NotFound(_))));
    }

    #[test]
    fn test_zero_channel_wav_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty-layout.wav");
        write_wav(&path, 20, 8000);
        let mut bytes = std::fs::read(&path).unwrap();
        // Channel count lives at byte 22 of the canonical header.
        bytes[22..24].copy_from_slice(&0u16.to_le_bytes());
        std::fs::write(&path, bytes).unwrap();

        assert!(matches!(FileSource::open(&path), Err(OmeError::Decoder(_))));
    }

    #[test]
    fn test_garbage_file_is_decoder_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.mp3");
        std::fs::write(&path, b"definitely not audio").unwrap();
        assert!(matches!(FileSource::open(&path), Err(OmeError::Decoder(_))));
    }
}
