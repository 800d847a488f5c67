use crate::config::VoiceCaptureConfig;
#[cfg(any(feature = "high-quality-audio", not(test)))]
use crate::log_debug;
use anyhow::{anyhow, Context, Result};
#[cfg(not(test))]
use cpal::traits::StreamTrait;
use cpal::traits::{DeviceTrait, HostTrait};
#[cfg(not(test))]
use cpal::{SampleFormat, StreamConfig};
#[cfg(not(test))]
use crossbeam_channel::{bounded, RecvTimeoutError, Sender, TrySendError};
#[cfg(feature = "high-quality-audio")]
use rubato::{InterpolationParameters, InterpolationType, Resampler, SincFixedIn, WindowFunction};
use std::f32::consts::PI;
use std::io::Cursor;
use std::sync::atomic::AtomicBool;
#[cfg(not(test))]
use std::sync::atomic::AtomicUsize;
#[cfg(any(feature = "high-quality-audio", not(test)))]
use std::sync::atomic::Ordering;
use std::sync::Arc;
#[cfg(not(test))]
use std::sync::Mutex;
#[cfg(not(test))]
use std::time::Duration;

#[cfg(not(test))]
const CHUNK_CHANNEL_CAPACITY: usize = 32;

#[cfg(feature = "high-quality-audio")]
static SINC_FALLBACK_LOGGED: AtomicBool = AtomicBool::new(false);

/// Handle on one input device. The rest of the app asks it for upload-ready
/// samples and never touches cpal directly. Outside test builds the device
/// is always present.
pub struct Recorder {
    device: Option<cpal::Device>,
}

/// Explains why capture ended.
#[derive(Debug, Clone, Default)]
pub enum StopReason {
    ManualStop,
    #[default]
    MaxDuration,
    Error(String),
}

impl StopReason {
    pub fn label(&self) -> &'static str {
        match self {
            StopReason::ManualStop => "manual_stop",
            StopReason::MaxDuration => "max_duration",
            StopReason::Error(_) => "error",
        }
    }
}

/// Summarizes a finished capture for logging.
#[derive(Debug, Clone, Default)]
pub struct CaptureMetrics {
    pub capture_ms: u64,
    pub chunks_captured: usize,
    pub chunks_dropped: usize,
    pub stop_reason: StopReason,
}

/// Caller-facing result: mono PCM at the upload rate plus metrics.
#[derive(Debug, Clone)]
pub struct CaptureResult {
    pub audio: Vec<f32>,
    pub sample_rate: u32,
    pub metrics: CaptureMetrics,
}

/// Ordered capture chunks, concatenated once recording ends.
struct ChunkAccumulator {
    samples: Vec<f32>,
    chunks: usize,
}

impl ChunkAccumulator {
    fn new() -> Self {
        Self {
            samples: Vec::new(),
            chunks: 0,
        }
    }

    fn push_chunk(&mut self, chunk: Vec<f32>) {
        if chunk.is_empty() {
            return;
        }
        self.samples.extend(chunk);
        self.chunks += 1;
    }

    fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    fn chunk_count(&self) -> usize {
        self.chunks
    }

    fn total_samples(&self) -> usize {
        self.samples.len()
    }

    fn into_audio(self) -> Vec<f32> {
        self.samples
    }
}

fn find_named_device(name: &str) -> Result<cpal::Device> {
    let mut inputs = cpal::default_host()
        .input_devices()
        .context("no input devices available")?;
    inputs
        .find(|device| device.name().is_ok_and(|n| n == name))
        .ok_or_else(|| anyhow!("input device '{name}' not found"))
}

impl Recorder {
    /// Microphone names for the settings picker and `--list-input-devices`.
    pub fn list_devices() -> Result<Vec<String>> {
        let inputs = cpal::default_host()
            .input_devices()
            .context("no input devices available")?;
        Ok(inputs.filter_map(|device| device.name().ok()).collect())
    }

    /// Open a recorder on the preferred device, or the host default when
    /// none was named.
    #[cfg(not(test))]
    pub fn new(preferred_device: Option<&str>) -> Result<Self> {
        let device = match preferred_device {
            Some(name) => find_named_device(name)?,
            None => cpal::default_host()
                .default_input_device()
                .context("no default input device available")?,
        };
        Ok(Self {
            device: Some(device),
        })
    }

    /// Named devices still resolve against the host so missing-device errors
    /// surface; the default path skips hardware.
    #[cfg(test)]
    pub fn new(preferred_device: Option<&str>) -> Result<Self> {
        let device = preferred_device.map(find_named_device).transpose()?;
        Ok(Self { device })
    }

    /// Name of the underlying device, when the recorder has one.
    pub fn device_name(&self) -> String {
        self.device
            .as_ref()
            .and_then(|device| device.name().ok())
            .unwrap_or_else(|| "Unknown Device".to_string())
    }

    /// Capture in fixed-cadence chunks until the stop flag is raised or the
    /// configured cap is reached, then return mono audio at the upload rate.
    #[cfg(not(test))]
    pub fn record_until(
        &self,
        stop_flag: Arc<AtomicBool>,
        cfg: &VoiceCaptureConfig,
    ) -> Result<CaptureResult> {
        record_until_impl(self, stop_flag, cfg)
    }

    #[cfg(test)]
    pub fn record_until(
        &self,
        _stop_flag: Arc<AtomicBool>,
        cfg: &VoiceCaptureConfig,
    ) -> Result<CaptureResult> {
        Ok(CaptureResult {
            audio: Vec::new(),
            sample_rate: cfg.sample_rate,
            metrics: CaptureMetrics::default(),
        })
    }
}

/// Native format and geometry of the stream we are about to open.
#[cfg(not(test))]
struct StreamLayout {
    format: SampleFormat,
    config: StreamConfig,
    rate: u32,
    channels: usize,
}

#[cfg(not(test))]
impl StreamLayout {
    fn probe(device: &cpal::Device) -> Result<Self> {
        let supported = device.default_input_config()?;
        let format = supported.sample_format();
        let config: StreamConfig = supported.into();
        let rate = config.sample_rate.0;
        let channels = usize::from(config.channels.max(1));
        Ok(Self {
            format,
            config,
            rate,
            channels,
        })
    }

    fn samples_per_chunk(&self, chunk_ms: u64) -> usize {
        ((u64::from(self.rate) * chunk_ms) / 1000).max(1) as usize
    }
}

#[cfg(not(test))]
fn record_until_impl(
    recorder: &Recorder,
    stop_flag: Arc<AtomicBool>,
    cfg: &VoiceCaptureConfig,
) -> Result<CaptureResult> {
    let device = recorder
        .device
        .as_ref()
        .context("recorder has no input device")?;
    let layout = StreamLayout::probe(device)?;
    let chunk_ms = cfg.chunk_ms.clamp(100, 5_000);
    let chunk_samples = layout.samples_per_chunk(chunk_ms);
    log_debug(&format!(
        "recorder config: format={:?} sample_rate={}Hz channels={} chunk_ms={chunk_ms}",
        layout.format, layout.rate, layout.channels
    ));

    // cpal delivers samples on a callback thread; the feed slices them into
    // chunk-sized buffers and hands them over a bounded channel.
    let (tx, rx) = bounded::<Vec<f32>>(CHUNK_CHANNEL_CAPACITY);
    let dropped = Arc::new(AtomicUsize::new(0));
    let feed = Arc::new(Mutex::new(ChunkFeed::new(
        chunk_samples,
        tx,
        dropped.clone(),
    )));
    let stream = open_stream(device, &layout, feed.clone())?;
    stream.play()?;

    let wait = Duration::from_millis(chunk_ms);
    let mut chunks = ChunkAccumulator::new();
    let mut clock_ms = 0u64;
    let mut halted = None;

    while clock_ms < cfg.max_capture_ms {
        if stop_flag.load(Ordering::Relaxed) {
            halted = Some(StopReason::ManualStop);
            break;
        }
        match rx.recv_timeout(wait) {
            Ok(chunk) => {
                clock_ms = clock_ms.saturating_add(chunk_ms);
                chunks.push_chunk(chunk);
            }
            Err(RecvTimeoutError::Timeout) => {
                // A stalled stream still advances the clock so the cap holds.
                clock_ms = clock_ms.saturating_add(chunk_ms);
            }
            Err(RecvTimeoutError::Disconnected) => {
                halted = Some(StopReason::Error("input stream disconnected".to_string()));
                break;
            }
        }
    }
    let stop_reason = halted.unwrap_or(StopReason::MaxDuration);

    if let Err(err) = stream.pause() {
        log_debug(&format!("audio stream pause failed: {err}"));
    }
    // The device must be released before any processing starts; nothing
    // below this point touches the stream.
    drop(stream);

    // Collect chunks that were queued when the stop landed, plus the
    // partial tail still sitting in the feed.
    for chunk in rx.try_iter() {
        chunks.push_chunk(chunk);
    }
    if let Ok(mut sink) = feed.lock() {
        chunks.push_chunk(sink.take_pending());
    }

    if chunks.is_empty() {
        return Err(anyhow!(
            "no audio captured; check microphone permissions and device availability"
        ));
    }

    let capture_ms = if layout.rate > 0 {
        (chunks.total_samples() as u64).saturating_mul(1000) / u64::from(layout.rate)
    } else {
        clock_ms
    };
    let chunks_captured = chunks.chunk_count();
    let audio = resample_to_rate(&chunks.into_audio(), layout.rate, cfg.sample_rate);

    Ok(CaptureResult {
        audio,
        sample_rate: cfg.sample_rate,
        metrics: CaptureMetrics {
            capture_ms,
            chunks_captured,
            chunks_dropped: dropped.load(Ordering::Relaxed),
            stop_reason,
        },
    })
}

#[cfg(not(test))]
fn open_stream(
    device: &cpal::Device,
    layout: &StreamLayout,
    feed: Arc<Mutex<ChunkFeed>>,
) -> Result<cpal::Stream> {
    let channels = layout.channels;
    // Stream errors go to the log; the UI never sees them.
    let err_fn = |err| log_debug(&format!("input stream error: {err}"));
    // All three formats funnel through the same mono feed as f32.
    let stream = match layout.format {
        SampleFormat::F32 => device.build_input_stream(
            &layout.config,
            mono_callback::<f32>(feed, channels, |sample| sample),
            err_fn,
            None,
        )?,
        SampleFormat::I16 => device.build_input_stream(
            &layout.config,
            mono_callback::<i16>(feed, channels, |sample| f32::from(sample) / 32_768.0),
            err_fn,
            None,
        )?,
        SampleFormat::U16 => device.build_input_stream(
            &layout.config,
            mono_callback::<u16>(feed, channels, |sample| {
                (f32::from(sample) - 32_768.0) / 32_768.0
            }),
            err_fn,
            None,
        )?,
        other => return Err(anyhow!("unsupported input sample format: {other:?}")),
    };
    Ok(stream)
}

#[cfg(not(test))]
fn mono_callback<T: Copy>(
    feed: Arc<Mutex<ChunkFeed>>,
    channels: usize,
    convert: fn(T) -> f32,
) -> impl FnMut(&[T], &cpal::InputCallbackInfo) {
    move |data, _| {
        if let Ok(mut sink) = feed.lock() {
            sink.accept(data, channels, convert);
        }
    }
}

/// Collapse interleaved channels to mono, converting samples to f32 on the
/// way. A trailing partial frame is averaged over the samples it has.
fn mix_to_mono<T: Copy, F: FnMut(T) -> f32>(
    buf: &mut Vec<f32>,
    data: &[T],
    channels: usize,
    mut convert: F,
) {
    if channels <= 1 {
        buf.extend(data.iter().map(|&sample| convert(sample)));
        return;
    }
    for frame in data.chunks(channels) {
        let sum: f32 = frame.iter().copied().map(&mut convert).sum();
        buf.push(sum / frame.len() as f32);
    }
}

/// Buffers mono samples on the callback thread and ships full chunks over
/// the channel. Never blocks; a full channel drops the chunk instead.
#[cfg(not(test))]
struct ChunkFeed {
    span: usize,
    buffered: Vec<f32>,
    tx: Sender<Vec<f32>>,
    dropped: Arc<AtomicUsize>,
}

#[cfg(not(test))]
impl ChunkFeed {
    fn new(span: usize, tx: Sender<Vec<f32>>, dropped: Arc<AtomicUsize>) -> Self {
        Self {
            span: span.max(1),
            buffered: Vec::with_capacity(span),
            tx,
            dropped,
        }
    }

    fn accept<T: Copy, F: FnMut(T) -> f32>(&mut self, data: &[T], channels: usize, convert: F) {
        mix_to_mono(&mut self.buffered, data, channels, convert);
        while self.buffered.len() >= self.span {
            let rest = self.buffered.split_off(self.span);
            let chunk = std::mem::replace(&mut self.buffered, rest);
            match self.tx.try_send(chunk) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                }
                Err(TrySendError::Disconnected(_)) => break,
            }
        }
    }

    fn take_pending(&mut self) -> Vec<f32> {
        std::mem::take(&mut self.buffered)
    }
}

/// Convert f32 samples to WAV bytes (mono 16-bit PCM) without touching disk.
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer =
        hound::WavWriter::new(&mut cursor, spec).context("failed to start WAV encoder")?;
    for &sample in samples {
        let clamped = sample.clamp(-1.0, 1.0);
        writer
            .write_sample((clamped * i16::MAX as f32) as i16)
            .context("failed to write WAV sample")?;
    }
    writer.finalize().context("failed to finalize WAV data")?;
    Ok(cursor.into_inner())
}

fn needs_resample(input: &[f32], source_rate: u32, target_rate: u32) -> bool {
    !input.is_empty() && source_rate != 0 && target_rate != 0 && source_rate != target_rate
}

#[cfg(feature = "high-quality-audio")]
pub fn resample_to_rate(input: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    if !needs_resample(input, source_rate, target_rate) {
        return input.to_vec();
    }
    match sinc_resample(input, source_rate, target_rate) {
        Ok(output) => output,
        Err(err) => {
            if !SINC_FALLBACK_LOGGED.swap(true, Ordering::AcqRel) {
                log_debug(&format!("sinc resampler failed ({err}); using the basic path"));
            }
            basic_resample(input, source_rate, target_rate)
        }
    }
}

#[cfg(not(feature = "high-quality-audio"))]
pub fn resample_to_rate(input: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    basic_resample(input, source_rate, target_rate)
}

#[cfg(feature = "high-quality-audio")]
fn sinc_resample(input: &[f32], source_rate: u32, target_rate: u32) -> Result<Vec<f32>> {
    const CHUNK: usize = 256;

    let ratio = f64::from(target_rate) / f64::from(source_rate);
    let params = InterpolationParameters {
        sinc_len: 64,
        f_cutoff: 0.90,
        interpolation: InterpolationType::Cubic,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, CHUNK, 1)
        .map_err(|err| anyhow!("sinc resampler construction failed: {err:?}"))?;

    let expect =
        ((input.len() as u64) * u64::from(target_rate) / u64::from(source_rate)) as usize + 8;
    let mut out = Vec::with_capacity(expect);
    for piece in input.chunks(CHUNK) {
        let mut block = piece.to_vec();
        let pad = block.last().copied().unwrap_or(0.0);
        block.resize(CHUNK, pad);
        let produced = resampler
            .process(std::slice::from_ref(&block), None)
            .map_err(|err| anyhow!("sinc resampler process failed: {err:?}"))?;
        out.extend_from_slice(&produced[0]);
    }

    // Resize both trims overshoot and pads shortfall to the expected length.
    let tail = out.last().copied().unwrap_or(0.0);
    out.resize(expect, tail);
    Ok(out)
}

fn basic_resample(input: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    if !needs_resample(input, source_rate, target_rate) {
        return input.to_vec();
    }
    let ratio = target_rate as f32 / source_rate as f32;
    if source_rate <= target_rate {
        return linear_resample(input, ratio);
    }
    // Decimation aliases without a low-pass in front of it.
    let taps = decimation_taps(source_rate, target_rate);
    linear_resample(&fir_low_pass(input, source_rate, target_rate, taps), ratio)
}

/// Plain linear interpolation. Good enough for short speech snippets once
/// the FIR has tamed the top end.
fn linear_resample(input: &[f32], ratio: f32) -> Vec<f32> {
    if input.is_empty() {
        return Vec::new();
    }
    let out_len = (input.len() as f32 * ratio).round() as usize;
    let last = input[input.len() - 1];
    let mut out = Vec::with_capacity(out_len);
    for step in 0..out_len {
        let pos = step as f32 / ratio;
        let base = pos.floor() as usize;
        let frac = pos - base as f32;
        let a = input.get(base).copied().unwrap_or(last);
        let b = input.get(base + 1).copied().unwrap_or(a);
        out.push(a + (b - a) * frac);
    }
    out
}

/// Tap count grows with the decimation ratio; always odd so the kernel has
/// a center tap.
fn decimation_taps(source_rate: u32, target_rate: u32) -> usize {
    let squeeze = source_rate as f32 / target_rate.max(1) as f32;
    let taps = (squeeze * 4.0).ceil().max(11.0) as usize;
    taps | 1
}

/// Low-pass ahead of decimation. Without it, 44.1/48 kHz microphones fold
/// high frequencies into the speech band.
fn fir_low_pass(input: &[f32], source_rate: u32, target_rate: u32, taps: usize) -> Vec<f32> {
    if input.is_empty() || taps <= 1 {
        return input.to_vec();
    }
    let cutoff = (target_rate as f32 * 0.5 / source_rate as f32).min(0.499);
    let kernel = windowed_sinc_kernel(cutoff, taps);
    convolve_same_length(input, &kernel)
}

fn convolve_same_length(input: &[f32], kernel: &[f32]) -> Vec<f32> {
    let half = kernel.len() / 2;
    let mut out = Vec::with_capacity(input.len());
    for center in 0..input.len() {
        let mut acc = 0.0f32;
        for (offset, weight) in kernel.iter().enumerate() {
            let Some(pos) = (center + offset).checked_sub(half) else {
                continue;
            };
            if let Some(sample) = input.get(pos) {
                acc += sample * weight;
            }
        }
        out.push(acc);
    }
    out
}

/// Normalized Hamming-windowed sinc taps.
fn windowed_sinc_kernel(cutoff: f32, taps: usize) -> Vec<f32> {
    let span = (taps - 1) as f32;
    let mut kernel: Vec<f32> = (0..taps)
        .map(|tap| {
            let centered = tap as f32 - span / 2.0;
            let phase = 2.0 * PI * cutoff * centered;
            let sinc = if phase.abs() < 1e-6 {
                2.0 * cutoff
            } else {
                (2.0 * cutoff * phase.sin()) / phase
            };
            let hamming = if span.abs() < f32::EPSILON {
                1.0
            } else {
                0.54 - 0.46 * ((2.0 * PI * tap as f32) / span).cos()
            };
            sinc * hamming
        })
        .collect();
    let total: f32 = kernel.iter().sum();
    if total.abs() > f32::EPSILON {
        for weight in &mut kernel {
            *weight /= total;
        }
    }
    kernel
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VoiceCaptureConfig;
    use std::sync::atomic::AtomicBool;

    fn capture_config() -> VoiceCaptureConfig {
        VoiceCaptureConfig {
            sample_rate: 16_000,
            chunk_ms: 1_000,
            max_capture_ms: 60_000,
            input_device: None,
        }
    }

    #[test]
    fn stereo_frames_average_to_mono() {
        let mut buf = Vec::new();
        let samples = [1.0f32, 0.0, -0.25, 0.75];
        mix_to_mono(&mut buf, &samples, 2, |sample| sample);
        assert_eq!(buf, vec![0.5, 0.25]);
    }

    #[test]
    fn mono_passes_through_untouched() {
        let mut buf = Vec::new();
        let samples = [0.25f32, -0.5, 0.75];
        mix_to_mono(&mut buf, &samples, 1, |sample| sample);
        assert_eq!(buf.as_slice(), &samples);
    }

    #[test]
    fn downmix_averages_trailing_partial_frame() {
        let mut buf = Vec::new();
        let samples = [0.2f32, 0.4, 0.6];
        mix_to_mono(&mut buf, &samples, 2, |sample| sample);
        assert_eq!(buf.len(), 2);
        assert!((buf[0] - 0.3).abs() < 1e-6);
        assert!((buf[1] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn chunk_accumulator_concatenates_in_order() {
        let mut acc = ChunkAccumulator::new();
        acc.push_chunk(vec![1.0, 2.0]);
        acc.push_chunk(vec![3.0]);
        acc.push_chunk(Vec::new());
        assert_eq!(acc.chunk_count(), 2);
        assert_eq!(acc.total_samples(), 3);
        assert_eq!(acc.into_audio(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn chunk_accumulator_starts_empty() {
        let acc = ChunkAccumulator::new();
        assert!(acc.is_empty());
        assert_eq!(acc.chunk_count(), 0);
    }

    #[test]
    fn stop_reason_labels_are_fixed() {
        let cases = [
            (StopReason::ManualStop, "manual_stop"),
            (StopReason::MaxDuration, "max_duration"),
            (StopReason::Error("boom".into()), "error"),
        ];
        for (reason, label) in cases {
            assert_eq!(reason.label(), label);
        }
    }

    #[test]
    fn record_until_stub_returns_empty_capture() {
        let recorder = Recorder::new(None).expect("stub recorder");
        let flag = Arc::new(AtomicBool::new(false));
        let capture = recorder
            .record_until(flag, &capture_config())
            .expect("stub capture");
        assert!(capture.audio.is_empty());
        assert_eq!(capture.sample_rate, 16_000);
        assert_eq!(capture.metrics.chunks_captured, 0);
    }

    #[test]
    fn linear_resample_halves_the_length() {
        let input = vec![0.0f32, 2.0, 4.0, 6.0];
        let out = linear_resample(&input, 0.5);
        assert_eq!(out.len(), 2);
        assert!(out[0].abs() < 1e-6);
    }

    #[cfg(not(feature = "high-quality-audio"))]
    #[test]
    fn resample_to_rate_shrinks_when_downsampling() {
        let input: Vec<f32> = (0..48).map(|i| (i as f32 * 0.2).sin()).collect();
        let result = resample_to_rate(&input, 48_000, 16_000);
        assert_eq!(result.len(), 16);
    }

    #[cfg(feature = "high-quality-audio")]
    fn expect_sinc_len(source: u32, target: u32, source_len: usize) {
        let input: Vec<f32> = (0..source_len).map(|i| (i as f32 * 0.01).sin()).collect();
        let out = resample_to_rate(&input, source, target);
        let want = (source_len as f64 * f64::from(target) / f64::from(source)).round() as usize;
        let diff = (out.len() as isize - want as isize).unsigned_abs();
        // Rubato chunking can introduce a few extra samples on some hosts.
        assert!(
            diff <= 10,
            "want {want} samples, got {} (diff {diff})",
            out.len()
        );
    }

    #[cfg(feature = "high-quality-audio")]
    #[test]
    fn sinc_resampler_tracks_length_when_downsampling() {
        expect_sinc_len(48_000, 16_000, 960);
    }

    #[cfg(feature = "high-quality-audio")]
    #[test]
    fn sinc_resampler_tracks_length_when_upsampling() {
        expect_sinc_len(8_000, 16_000, 160);
    }

    #[test]
    fn fir_low_pass_preserves_length() {
        let input: Vec<f32> = (0..256).map(|i| (i as f32 * 0.3).sin()).collect();
        let taps = decimation_taps(48_000, 16_000);
        let output = fir_low_pass(&input, 48_000, 16_000, taps);
        assert_eq!(output.len(), input.len());
    }

    #[test]
    fn fir_taps_are_normalized_and_odd() {
        let taps = decimation_taps(48_000, 16_000);
        assert_eq!(taps % 2, 1);
        let kernel = windowed_sinc_kernel(0.167, taps);
        let sum: f32 = kernel.iter().sum();
        assert!((sum - 1.0).abs() < 1e-3, "coefficient sum {sum}");
    }

    #[test]
    fn samples_to_wav_writes_mono_16bit_pcm() {
        let samples = vec![0.0f32, 0.5, -0.5, 2.0];
        let bytes = samples_to_wav(&samples, 16_000).expect("wav bytes");
        assert_eq!(&bytes[..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");

        let reader = hound::WavReader::new(Cursor::new(bytes)).expect("readable wav");
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 16_000);
        assert_eq!(spec.bits_per_sample, 16);
        let decoded: Vec<i16> = reader.into_samples().map(|s| s.expect("sample")).collect();
        assert_eq!(decoded.len(), 4);
        assert_eq!(decoded[0], 0);
        // Out-of-range input clamps instead of wrapping.
        assert_eq!(decoded[3], i16::MAX);
    }

    #[test]
    fn samples_to_wav_handles_empty_input() {
        let bytes = samples_to_wav(&[], 16_000).expect("wav bytes");
        let reader = hound::WavReader::new(Cursor::new(bytes)).expect("readable wav");
        assert_eq!(reader.len(), 0);
    }
}
