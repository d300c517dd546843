// src/analysis/window.rs
use std::f32::consts::PI;

/// Symmetric Hann window (zero at both ends).
pub fn hann_window(n: usize) -> Vec<f32> {
    if n <= 1 {
        return vec![1.0; n];
    }
    let denom = (n - 1) as f32;
    (0..n)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / denom).cos()))
        .collect()
}

/// Average interleaved channels into one mono stream, appending to `out`.
pub fn downmix_into(interleaved: &[f32], channels: usize, out: &mut Vec<f32>) {
    if channels <= 1 {
        out.extend_from_slice(interleaved);
        return;
    }
    let scale = 1.0 / channels as f32;
    for chunk in interleaved.chunks_exact(channels) {
        out.push(chunk.iter().sum::<f32>() * scale);
    }
}

/// Zero every sample quieter than `gate` and return the loudest survivor.
/// Non-finite samples are treated as silence.
pub fn apply_noise_gate(samples: &mut [f32], gate: f32) -> f32 {
    let mut peak = 0.0_f32;
    for s in samples.iter_mut() {
        let abs_s = s.abs();
        if !s.is_finite() || abs_s < gate {
            *s = 0.0;
        } else if abs_s > peak {
            peak = abs_s;
        }
    }
    peak
}
