// src/analysis/mapper.rs

use crate::config::{FrequencyRange, Pattern};

use super::{DisplayFrame, SPECTRUM_BINS, Spectrum};

const HALF_BINS: usize = SPECTRUM_BINS / 2;

/// Remap the smoothed spectrum onto the 256 display bins for the selected
/// range and pattern. Stateless.
pub fn map_bins(spectrum: &Spectrum, range: FrequencyRange, pattern: Pattern) -> DisplayFrame {
    match pattern {
        Pattern::Direct => map_direct(spectrum, range),
        Pattern::Mirror => map_mirror(spectrum, range),
    }
}

/// Linear sweep: output bin `i` reads `round(min + i * (max - min) / 256)`.
fn map_direct(spectrum: &Spectrum, range: FrequencyRange) -> DisplayFrame {
    let mut out = [0.0; SPECTRUM_BINS];
    let start = range.min_bin as f32;
    let step = (range.max_bin as f32 - start) / SPECTRUM_BINS as f32;

    for (i, slot) in out.iter_mut().enumerate() {
        let src = (start + i as f32 * step).round();
        if src >= 0.0 && (src as usize) < SPECTRUM_BINS {
            *slot = spectrum[src as usize];
        }
    }
    out
}

/// Resample `[min, max]` (inclusive) to 128 points by linear interpolation
/// and write it into both halves.
fn map_mirror(spectrum: &Spectrum, range: FrequencyRange) -> DisplayFrame {
    let mut out = [0.0; SPECTRUM_BINS];
    let min_bin = range.min_bin.min(SPECTRUM_BINS - 1);
    let max_bin = range.max_bin.min(SPECTRUM_BINS - 1);
    if min_bin >= max_bin {
        return out;
    }

    let selected = &spectrum[min_bin..=max_bin];
    let last = (selected.len() - 1) as f32;

    for i in 0..HALF_BINS {
        let pos = i as f32 * last / (HALF_BINS - 1) as f32;
        let lo = (pos.floor() as usize).min(selected.len() - 1);
        let hi = (lo + 1).min(selected.len() - 1);
        let frac = pos - lo as f32;
        let v = selected[lo] + (selected[hi] - selected[lo]) * frac;
        out[i] = v;
        out[HALF_BINS + i] = v;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> Spectrum {
        let mut s = [0.0; SPECTRUM_BINS];
        for (i, v) in s.iter_mut().enumerate() {
            *v = i as f32;
        }
        s
    }

    #[test]
    fn test_direct_full_range_is_near_identity() {
        let out = map_bins(&ramp(), FrequencyRange::FULL, Pattern::Direct);
        // round(i * 255 / 256) == i until the accumulated 1/256 offset passes 0.5
        for i in 0..128 {
            assert_eq!(out[i], i as f32);
        }
        assert_eq!(out[255], 254.0);
    }

    #[test]
    fn test_direct_sub_range_sweeps_between_bounds() {
        let range = FrequencyRange { min_bin: 64, max_bin: 128 };
        let out = map_bins(&ramp(), range, Pattern::Direct);
        assert_eq!(out[0], 64.0);
        assert_eq!(out[128], 96.0);
        assert!(out.iter().all(|&v| (64.0..=128.0).contains(&v)));
        assert!(out.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_mirror_halves_are_identical() {
        let range = FrequencyRange { min_bin: 10, max_bin: 200 };
        let out = map_bins(&ramp(), range, Pattern::Mirror);
        assert_eq!(out[..128], out[128..]);
        assert_eq!(out[0], 10.0);
        assert!((out[127] - 200.0).abs() < 1e-4);
    }

    #[test]
    fn test_mirror_interpolates_linearly() {
        let mut s = [0.0; SPECTRUM_BINS];
        s[1] = 127.0;
        let out = map_bins(&s, FrequencyRange { min_bin: 0, max_bin: 1 }, Pattern::Mirror);
        for i in 0..128 {
            assert!((out[i] - i as f32).abs() < 1e-3);
        }
    }

    #[test]
    fn test_mirror_empty_range_is_zero() {
        let range = FrequencyRange { min_bin: 50, max_bin: 50 };
        let out = map_bins(&ramp(), range, Pattern::Mirror);
        assert!(out.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_direct_collapsed_range_repeats_one_bin() {
        let range = FrequencyRange { min_bin: 50, max_bin: 50 };
        let out = map_bins(&ramp(), range, Pattern::Direct);
        assert!(out.iter().all(|&v| v == 50.0));
    }
}
