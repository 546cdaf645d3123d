//! Audio I/O for the CLI frontend.
//!
//! Raw interleaved 32-bit little-endian float frames in, the same out. One
//! channel per input port and one per output port, in port-number order.

use std::io::{self, Read, Write};

use crate::error::{Error, Result};
use crate::solver::Simulator;

/// Frames processed per block.
pub const BLOCK_FRAMES: usize = 256;

const SAMPLE_BYTES: usize = 4;

/// Reads interleaved f32le frames.
pub struct FrameReader<R> {
    inner: R,
    channels: usize,
    bytes: Vec<u8>,
    /// Bytes of an incomplete frame carried over from the last read
    pending: usize,
}

impl<R: Read> FrameReader<R> {
    pub fn new(inner: R, channels: usize) -> Self {
        Self {
            inner,
            channels: channels.max(1),
            bytes: Vec::new(),
            pending: 0,
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Fill `samples` with whole frames. Returns the number of frames read,
    /// 0 at end of stream. A trailing partial frame at end of stream is
    /// dropped.
    pub fn read_frames(&mut self, samples: &mut [f32]) -> Result<usize> {
        let frame_bytes = self.channels * SAMPLE_BYTES;
        let wanted = (samples.len() / self.channels) * frame_bytes;
        if self.bytes.len() < wanted {
            self.bytes.resize(wanted, 0);
        }

        let mut filled = self.pending;
        while filled < frame_bytes.min(wanted) || (filled % frame_bytes != 0 && filled < wanted) {
            let n = match self.inner.read(&mut self.bytes[filled..wanted]) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(Error::AudioInputError {
                        message: e.to_string(),
                    })
                }
            };
            filled += n;
        }

        let frames = filled / frame_bytes;
        let used = frames * frame_bytes;
        for (sample, chunk) in samples.iter_mut().zip(self.bytes[..used].chunks_exact(SAMPLE_BYTES)) {
            *sample = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        self.bytes.copy_within(used..filled, 0);
        self.pending = filled - used;
        Ok(frames)
    }
}

/// Writes interleaved f32le frames.
pub struct FrameWriter<W> {
    inner: W,
    bytes: Vec<u8>,
}

impl<W: Write> FrameWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            bytes: Vec::new(),
        }
    }

    pub fn write_samples(&mut self, samples: &[f32]) -> Result<()> {
        self.bytes.clear();
        for sample in samples {
            self.bytes.extend_from_slice(&sample.to_le_bytes());
        }
        self.inner.write_all(&self.bytes).map_err(|e| Error::AudioOutputError {
            message: e.to_string(),
        })
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush().map_err(|e| Error::AudioOutputError {
            message: e.to_string(),
        })
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Run `simulator` over an interleaved stream until the input ends. Returns
/// the number of frames processed.
///
/// A circuit without input ports still reads one channel, which only clocks
/// the simulation. A circuit without output ports writes one silent channel.
pub fn process_stream<R: Read, W: Write>(simulator: &mut Simulator, input: R, output: W) -> Result<u64> {
    let in_channels = simulator.input_count().max(1);
    let out_channels = simulator.output_count().max(1);
    let mut reader = FrameReader::new(input, in_channels);
    let mut writer = FrameWriter::new(output);

    let mut in_block = vec![0.0f32; BLOCK_FRAMES * in_channels];
    let mut out_block = vec![0.0f32; BLOCK_FRAMES * out_channels];
    let mut total = 0u64;

    loop {
        let frames = reader.read_frames(&mut in_block)?;
        if frames == 0 {
            break;
        }
        let out = &mut out_block[..frames * out_channels];
        simulator.process_frames(&in_block[..frames * in_channels], in_channels, out, out_channels);
        writer.write_samples(out)?;
        total += frames as u64;
    }

    writer.flush()?;
    tracing::debug!(frames = total, "stream finished");
    Ok(total)
}

/// [`process_stream`] from stdin to stdout.
pub fn process_audio(simulator: &mut Simulator) -> Result<u64> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    process_stream(simulator, stdin.lock(), io::BufWriter::new(stdout.lock()))
}
