//! Log mel filterbank front-end.
//!
//! Kaldi-style pipeline per frame: DC removal, pre-emphasis, Povey window,
//! zero-padded radix-2 FFT, power spectrum, triangular mel filters, log.

use std::f64::consts::PI;

/// Configures filterbank extraction.
///
/// Defaults produce the 64-channel frames the ResCNN expects:
/// 16 kHz input, 25 ms frames, 10 ms hop, 20 Hz to Nyquist - 400 Hz.
#[derive(Debug, Clone)]
pub struct FbankConfig {
    /// Input sample rate in Hz (default: 16000).
    pub sample_rate: usize,
    /// Number of mel channels (default: 64).
    pub num_mels: usize,
    /// Frame length in samples (default: 400 = 25ms @ 16kHz).
    pub frame_length: usize,
    /// Frame shift in samples (default: 160 = 10ms @ 16kHz).
    pub frame_shift: usize,
    /// Pre-emphasis coefficient (default: 0.97).
    pub pre_emphasis: f64,
    /// Floor applied before the log (default: 1e-10).
    pub energy_floor: f64,
    /// Lowest mel edge in Hz (default: 20).
    pub low_freq: f64,
    /// Highest mel edge in Hz; zero or negative is an offset from Nyquist (default: -400).
    pub high_freq: f64,
    /// Subtract the per-frame mean (default: true).
    pub remove_dc: bool,
    /// Povey window (hamming^0.85) instead of Hamming (default: true).
    pub povey_window: bool,
    /// Scale PCM16 to [-1, 1) (default: true).
    pub normalize_pcm: bool,
}

impl Default for FbankConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            num_mels: 64,
            frame_length: 400,
            frame_shift: 160,
            pre_emphasis: 0.97,
            energy_floor: 1e-10,
            low_freq: 20.0,
            high_freq: -400.0,
            remove_dc: true,
            povey_window: true,
            normalize_pcm: true,
        }
    }
}

impl FbankConfig {
    /// Number of frames produced for `n_samples` samples (0 if too short).
    pub fn num_frames(&self, n_samples: usize) -> usize {
        if self.frame_shift == 0 || n_samples < self.frame_length {
            return 0;
        }
        (n_samples - self.frame_length) / self.frame_shift + 1
    }

    /// Smallest PCM16 payload that yields one frame.
    pub fn min_bytes(&self) -> usize {
        self.frame_length * 2
    }

    fn is_degenerate(&self) -> bool {
        self.frame_shift == 0 || self.frame_length == 0 || self.num_mels == 0 || self.sample_rate == 0
    }

    fn resolved_high_freq(&self) -> f64 {
        if self.high_freq <= 0.0 {
            self.sample_rate as f64 / 2.0 + self.high_freq
        } else {
            self.high_freq
        }
    }
}

/// Filterbank extractor with precomputed window and mel weights.
pub struct Extractor {
    cfg: FbankConfig,
    fft_size: usize,
    window: Vec<f64>,
    filters: Vec<MelFilter>,
}

/// Triangular filter stored as its non-zero span of FFT bins.
struct MelFilter {
    start: usize,
    weights: Vec<f64>,
}

impl Extractor {
    pub fn new(cfg: FbankConfig) -> Self {
        let fft_size = cfg.frame_length.max(1).next_power_of_two();
        let window = if cfg.povey_window {
            povey_window(cfg.frame_length)
        } else {
            hamming_window(cfg.frame_length)
        };
        let filters = mel_filters(
            cfg.num_mels,
            fft_size,
            cfg.sample_rate.max(1),
            cfg.low_freq,
            cfg.resolved_high_freq(),
        );
        Self {
            cfg,
            fft_size,
            window,
            filters,
        }
    }

    pub fn config(&self) -> &FbankConfig {
        &self.cfg
    }

    /// Extracts `[num_frames][num_mels]` log energies from PCM16 LE audio.
    ///
    /// Returns `None` if the audio is shorter than one frame or the config
    /// has a zero size.
    pub fn compute(&self, audio: &[u8]) -> Option<Vec<Vec<f32>>> {
        let cfg = &self.cfg;
        if cfg.is_degenerate() {
            return None;
        }
        let scale = if cfg.normalize_pcm { 1.0 / 32768.0 } else { 1.0 };
        let samples: Vec<f64> = audio
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]) as f64 * scale)
            .collect();

        let num_frames = cfg.num_frames(samples.len());
        if num_frames == 0 {
            return None;
        }

        let half_fft = self.fft_size / 2 + 1;
        let mut frame = vec![0.0f64; cfg.frame_length];
        let mut spectrum = vec![(0.0f64, 0.0f64); self.fft_size];
        let mut power = vec![0.0f64; half_fft];
        let mut features = Vec::with_capacity(num_frames);

        for f in 0..num_frames {
            let offset = f * cfg.frame_shift;
            frame.copy_from_slice(&samples[offset..offset + cfg.frame_length]);

            if cfg.remove_dc {
                let mean = frame.iter().sum::<f64>() / cfg.frame_length as f64;
                frame.iter_mut().for_each(|v| *v -= mean);
            }

            if cfg.pre_emphasis > 0.0 {
                for i in (1..cfg.frame_length).rev() {
                    frame[i] -= cfg.pre_emphasis * frame[i - 1];
                }
                frame[0] *= 1.0 - cfg.pre_emphasis;
            }

            spectrum.fill((0.0, 0.0));
            for (slot, (&s, &w)) in spectrum.iter_mut().zip(frame.iter().zip(&self.window)) {
                *slot = (s * w, 0.0);
            }
            fft(&mut spectrum);

            for (p, &(re, im)) in power.iter_mut().zip(&spectrum) {
                *p = re * re + im * im;
            }

            let mels = self
                .filters
                .iter()
                .map(|filter| {
                    let energy: f64 = filter
                        .weights
                        .iter()
                        .zip(&power[filter.start..])
                        .map(|(w, p)| w * p)
                        .sum();
                    energy.max(cfg.energy_floor).ln() as f32
                })
                .collect();
            features.push(mels);
        }

        Some(features)
    }
}

/// One-shot extraction with a temporary [`Extractor`].
pub fn compute_fbank(audio: &[u8], cfg: &FbankConfig) -> Option<Vec<Vec<f32>>> {
    Extractor::new(cfg.clone()).compute(audio)
}

/// Mean and variance normalization per mel channel, in place.
pub fn cmvn(features: &mut [Vec<f32>]) {
    let Some(num_mels) = features.first().map(Vec::len) else {
        return;
    };
    let t = features.len() as f64;

    for m in 0..num_mels {
        let mean = features.iter().map(|f| f[m] as f64).sum::<f64>() / t;
        let var = features
            .iter()
            .map(|f| {
                let d = f[m] as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / t;
        let std = var.sqrt().max(1e-10);
        for f in features.iter_mut() {
            f[m] = ((f[m] as f64 - mean) / std) as f32;
        }
    }
}

/// Scales `v` to unit length in place; zero vectors are left untouched.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|&x| (x as f64) * (x as f64)).sum::<f64>().sqrt();
    if norm > 0.0 {
        let scale = (1.0 / norm) as f32;
        v.iter_mut().for_each(|x| *x *= scale);
    }
}

fn hamming_window(n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![1.0];
    }
    (0..n)
        .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f64 / (n - 1) as f64).cos())
        .collect()
}

fn povey_window(n: usize) -> Vec<f64> {
    hamming_window(n).into_iter().map(|w| w.powf(0.85)).collect()
}

fn hz_to_mel(hz: f64) -> f64 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f64) -> f64 {
    700.0 * (10.0_f64.powf(mel / 2595.0) - 1.0)
}

fn mel_filters(
    num_mels: usize,
    fft_size: usize,
    sample_rate: usize,
    low_freq: f64,
    high_freq: f64,
) -> Vec<MelFilter> {
    let half_fft = fft_size / 2 + 1;
    let mel_low = hz_to_mel(low_freq);
    let mel_high = hz_to_mel(high_freq);
    let step = (mel_high - mel_low) / (num_mels + 1) as f64;

    let bins: Vec<usize> = (0..num_mels + 2)
        .map(|i| {
            let hz = mel_to_hz(mel_low + i as f64 * step);
            let bin = (hz * fft_size as f64 / sample_rate as f64).floor() as isize;
            bin.clamp(0, half_fft as isize - 1) as usize
        })
        .collect();

    bins.windows(3)
        .map(|edge| {
            let (left, center, right) = (edge[0], edge[1], edge[2]);
            let weights = (left..=right)
                .map(|k| {
                    if k < center {
                        (k - left) as f64 / (center - left) as f64
                    } else if k == center {
                        1.0
                    } else {
                        (right - k) as f64 / (right - center) as f64
                    }
                })
                .collect();
            MelFilter { start: left, weights }
        })
        .collect()
}

/// In-place iterative radix-2 FFT over `(re, im)` pairs; length must be a power of 2.
fn fft(x: &mut [(f64, f64)]) {
    let n = x.len();
    if n <= 1 {
        return;
    }

    let mut j = 0usize;
    for i in 1..n {
        let mut bit = n >> 1;
        while j & bit != 0 {
            j ^= bit;
            bit >>= 1;
        }
        j ^= bit;
        if i < j {
            x.swap(i, j);
        }
    }

    let mut size = 2;
    while size <= n {
        let half = size / 2;
        let angle = -2.0 * PI / size as f64;
        let wn = (angle.cos(), angle.sin());
        for start in (0..n).step_by(size) {
            let mut w = (1.0f64, 0.0f64);
            for k in 0..half {
                let a = x[start + k];
                let b = x[start + k + half];
                let t = (w.0 * b.0 - w.1 * b.1, w.0 * b.1 + w.1 * b.0);
                x[start + k] = (a.0 + t.0, a.1 + t.1);
                x[start + k + half] = (a.0 - t.0, a.1 - t.1);
                w = (w.0 * wn.0 - w.1 * wn.1, w.0 * wn.1 + w.1 * wn.0);
            }
        }
        size <<= 1;
    }
}
