//! Offline effect processing for stems: EQ, compressor and reverb.
//!
//! All processors work on interleaved stereo f32 in place.

use stemstudio_mixer::{CompressorSettings, EqSettings, ReverbSettings, StemEffects};

/// Second-order IIR section (RBJ cookbook), transposed direct form II.
#[derive(Debug, Clone, Copy)]
pub struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    z1: f64,
    z2: f64,
}

impl Biquad {
    fn normalized(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> Self {
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
            z1: 0.0,
            z2: 0.0,
        }
    }

    fn omega(freq: f64, sample_rate: u32) -> (f64, f64) {
        let nyquist_safe = freq.clamp(10.0, sample_rate as f64 * 0.45);
        let w0 = 2.0 * std::f64::consts::PI * nyquist_safe / sample_rate as f64;
        (w0.sin(), w0.cos())
    }

    /// Low shelf with unit slope.
    pub fn low_shelf(freq: f64, gain_db: f64, sample_rate: u32) -> Self {
        let a = 10f64.powf(gain_db / 40.0);
        let (sin, cos) = Self::omega(freq, sample_rate);
        let two_sqrt_a_alpha = 2.0 * a.sqrt() * sin / 2.0 * std::f64::consts::SQRT_2;
        Self::normalized(
            a * ((a + 1.0) - (a - 1.0) * cos + two_sqrt_a_alpha),
            2.0 * a * ((a - 1.0) - (a + 1.0) * cos),
            a * ((a + 1.0) - (a - 1.0) * cos - two_sqrt_a_alpha),
            (a + 1.0) + (a - 1.0) * cos + two_sqrt_a_alpha,
            -2.0 * ((a - 1.0) + (a + 1.0) * cos),
            (a + 1.0) + (a - 1.0) * cos - two_sqrt_a_alpha,
        )
    }

    /// High shelf with unit slope.
    pub fn high_shelf(freq: f64, gain_db: f64, sample_rate: u32) -> Self {
        let a = 10f64.powf(gain_db / 40.0);
        let (sin, cos) = Self::omega(freq, sample_rate);
        let two_sqrt_a_alpha = 2.0 * a.sqrt() * sin / 2.0 * std::f64::consts::SQRT_2;
        Self::normalized(
            a * ((a + 1.0) + (a - 1.0) * cos + two_sqrt_a_alpha),
            -2.0 * a * ((a - 1.0) + (a + 1.0) * cos),
            a * ((a + 1.0) + (a - 1.0) * cos - two_sqrt_a_alpha),
            (a + 1.0) - (a - 1.0) * cos + two_sqrt_a_alpha,
            2.0 * ((a - 1.0) - (a + 1.0) * cos),
            (a + 1.0) - (a - 1.0) * cos - two_sqrt_a_alpha,
        )
    }

    pub fn peaking(freq: f64, q: f64, gain_db: f64, sample_rate: u32) -> Self {
        let a = 10f64.powf(gain_db / 40.0);
        let (sin, cos) = Self::omega(freq, sample_rate);
        let alpha = sin / (2.0 * q.max(0.01));
        Self::normalized(
            1.0 + alpha * a,
            -2.0 * cos,
            1.0 - alpha * a,
            1.0 + alpha / a,
            -2.0 * cos,
            1.0 - alpha / a,
        )
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let x = input as f64;
        let y = self.b0 * x + self.z1;
        self.z1 = self.b1 * x - self.a1 * y + self.z2;
        self.z2 = self.b2 * x - self.a2 * y;
        y as f32
    }
}

/// Low shelf, peaking mid and high shelf, one filter set per channel.
#[derive(Debug, Clone)]
pub struct ThreeBandEq {
    bands: [[Biquad; 3]; 2],
}

impl ThreeBandEq {
    pub fn new(eq: &EqSettings, sample_rate: u32) -> Self {
        let set = [
            Biquad::low_shelf(eq.low_freq_hz as f64, eq.low_gain_db as f64, sample_rate),
            Biquad::peaking(
                EqSettings::MID_FREQ_HZ as f64,
                EqSettings::MID_Q as f64,
                eq.mid_gain_db as f64,
                sample_rate,
            ),
            Biquad::high_shelf(eq.high_freq_hz as f64, eq.high_gain_db as f64, sample_rate),
        ];
        Self { bands: [set, set] }
    }

    pub fn process(&mut self, interleaved: &mut [f32]) {
        for frame in interleaved.chunks_exact_mut(2) {
            for (sample, bands) in frame.iter_mut().zip(self.bands.iter_mut()) {
                for band in bands.iter_mut() {
                    *sample = band.process(*sample);
                }
            }
        }
    }
}

/// Stereo-linked feed-forward compressor with a soft knee.
#[derive(Debug, Clone)]
pub struct Compressor {
    threshold_db: f32,
    ratio: f32,
    knee_db: f32,
    attack_coef: f32,
    release_coef: f32,
    /// Smoothed gain reduction in dB (≤ 0).
    envelope_db: f32,
}

impl Compressor {
    pub fn new(settings: &CompressorSettings, sample_rate: u32) -> Self {
        let coef = |secs: f32| {
            if secs <= 0.0 {
                0.0
            } else {
                (-1.0 / (secs * sample_rate as f32)).exp()
            }
        };
        Self {
            threshold_db: settings.threshold_db,
            ratio: settings.ratio.max(1.0),
            knee_db: settings.knee_db.max(0.0),
            attack_coef: coef(settings.attack_secs),
            release_coef: coef(settings.release_secs),
            envelope_db: 0.0,
        }
    }

    /// Static gain computer: reduction in dB for an input level.
    pub fn gain_reduction_db(&self, level_db: f32) -> f32 {
        let over = level_db - self.threshold_db;
        let slope = 1.0 / self.ratio - 1.0;
        if self.knee_db > 0.0 && 2.0 * over.abs() <= self.knee_db {
            slope * (over + self.knee_db / 2.0).powi(2) / (2.0 * self.knee_db)
        } else if over > 0.0 {
            slope * over
        } else {
            0.0
        }
    }

    pub fn process(&mut self, interleaved: &mut [f32]) {
        for frame in interleaved.chunks_exact_mut(2) {
            let peak = frame[0].abs().max(frame[1].abs());
            let level_db = 20.0 * (peak + 1e-9).log10();
            let target = self.gain_reduction_db(level_db);
            let coef = if target < self.envelope_db {
                self.attack_coef
            } else {
                self.release_coef
            };
            self.envelope_db = coef * self.envelope_db + (1.0 - coef) * target;
            let gain = 10f32.powf(self.envelope_db / 20.0);
            frame[0] *= gain;
            frame[1] *= gain;
        }
    }
}

#[derive(Debug, Clone)]
struct Comb {
    buffer: Vec<f32>,
    index: usize,
    feedback: f32,
}

impl Comb {
    fn process(&mut self, input: f32) -> f32 {
        let out = self.buffer[self.index];
        self.buffer[self.index] = input + out * self.feedback;
        self.index = (self.index + 1) % self.buffer.len();
        out
    }
}

#[derive(Debug, Clone)]
struct Allpass {
    buffer: Vec<f32>,
    index: usize,
}

impl Allpass {
    const GAIN: f32 = 0.5;

    fn process(&mut self, input: f32) -> f32 {
        let delayed = self.buffer[self.index];
        let out = delayed - input;
        self.buffer[self.index] = input + delayed * Self::GAIN;
        self.index = (self.index + 1) % self.buffer.len();
        out
    }
}

/// Schroeder reverb: parallel combs into series allpasses, per channel.
#[derive(Debug, Clone)]
pub struct Reverb {
    combs: [Vec<Comb>; 2],
    allpasses: [Vec<Allpass>; 2],
    wet: f32,
    dry: f32,
}

impl Reverb {
    /// Delay lengths in samples at 44.1 kHz.
    const COMB_TUNING: [usize; 4] = [1116, 1188, 1277, 1356];
    const ALLPASS_TUNING: [usize; 2] = [556, 441];
    /// Extra delay on the right channel for stereo width.
    const STEREO_SPREAD: usize = 23;

    pub fn new(settings: &ReverbSettings, sample_rate: u32) -> Self {
        let scale = sample_rate as f32 / 44_100.0;
        let decay = settings.decay_secs.max(0.1);
        let make = |spread: usize| {
            let combs = Self::COMB_TUNING
                .iter()
                .map(|&len| {
                    let len = (((len + spread) as f32 * scale) as usize).max(1);
                    // Feedback giving a 60 dB decay over `decay` seconds.
                    let loop_secs = len as f32 / sample_rate as f32;
                    Comb {
                        buffer: vec![0.0; len],
                        index: 0,
                        feedback: 10f32.powf(-3.0 * loop_secs / decay).min(0.98),
                    }
                })
                .collect::<Vec<_>>();
            let allpasses = Self::ALLPASS_TUNING
                .iter()
                .map(|&len| Allpass {
                    buffer: vec![0.0; (((len + spread) as f32 * scale) as usize).max(1)],
                    index: 0,
                })
                .collect::<Vec<_>>();
            (combs, allpasses)
        };
        let (left_combs, left_allpasses) = make(0);
        let (right_combs, right_allpasses) = make(Self::STEREO_SPREAD);
        let wet = settings.wet_dry.clamp(0.0, 1.0);
        Self {
            combs: [left_combs, right_combs],
            allpasses: [left_allpasses, right_allpasses],
            wet,
            dry: 1.0 - wet,
        }
    }

    pub fn process(&mut self, interleaved: &mut [f32]) {
        let comb_scale = 1.0 / Self::COMB_TUNING.len() as f32;
        for frame in interleaved.chunks_exact_mut(2) {
            let input = (frame[0] + frame[1]) * 0.5;
            for (ch, sample) in frame.iter_mut().enumerate() {
                let mut wet: f32 = self.combs[ch].iter_mut().map(|c| c.process(input)).sum();
                wet *= comb_scale;
                for allpass in self.allpasses[ch].iter_mut() {
                    wet = allpass.process(wet);
                }
                *sample = *sample * self.dry + wet * self.wet;
            }
        }
    }
}

/// A stem's effect chain: EQ, then compressor, then reverb.
#[derive(Debug, Clone)]
pub struct EffectChain {
    eq: Option<ThreeBandEq>,
    compressor: Option<Compressor>,
    reverb: Option<Reverb>,
}

impl EffectChain {
    pub fn new(effects: &StemEffects, sample_rate: u32) -> Self {
        Self {
            eq: (!effects.eq.is_flat()).then(|| ThreeBandEq::new(&effects.eq, sample_rate)),
            compressor: effects
                .compressor
                .enabled
                .then(|| Compressor::new(&effects.compressor, sample_rate)),
            reverb: effects
                .reverb
                .enabled
                .then(|| Reverb::new(&effects.reverb, sample_rate)),
        }
    }

    pub fn is_bypassed(&self) -> bool {
        self.eq.is_none() && self.compressor.is_none() && self.reverb.is_none()
    }

    pub fn process(&mut self, interleaved: &mut [f32]) {
        if let Some(eq) = &mut self.eq {
            eq.process(interleaved);
        }
        if let Some(compressor) = &mut self.compressor {
            compressor.process(interleaved);
        }
        if let Some(reverb) = &mut self.reverb {
            reverb.process(interleaved);
        }
    }
}
