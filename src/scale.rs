//! Sequential colour scale for region fills and the legend.
//!
//! The ramp is the nine-class ColorBrewer "Reds" scheme smoothed with a
//! uniform cubic B-spline per channel, so fills vary continuously from
//! near-white at the domain minimum to dark red at the maximum.

use image::Rgb;

const REDS: [&str; 9] = [
    "#fff5f0", "#fee0d2", "#fcbba1", "#fc9272", "#fb6a4a", "#ef3b2c", "#cb181d", "#a50f15",
    "#67000d",
];

/// Parses `#rrggbb` (leading `#` optional). Malformed channels read as zero.
pub fn hex_to_rgb(hex: &str) -> Rgb<u8> {
    let hex = hex.trim_start_matches('#');
    let channel = |range: std::ops::Range<usize>| {
        hex.get(range)
            .and_then(|s| u8::from_str_radix(s, 16).ok())
            .unwrap_or(0)
    };
    Rgb([channel(0..2), channel(2..4), channel(4..6)])
}

/// CSS functional notation, as written into `fill` attributes.
pub fn css_color(color: Rgb<u8>) -> String {
    let Rgb([r, g, b]) = color;
    format!("rgb({}, {}, {})", r, g, b)
}

fn basis(t1: f64, v0: f64, v1: f64, v2: f64, v3: f64) -> f64 {
    let t2 = t1 * t1;
    let t3 = t2 * t1;
    ((1.0 - 3.0 * t1 + 3.0 * t2 - t3) * v0
        + (4.0 - 6.0 * t2 + 3.0 * t3) * v1
        + (1.0 + 3.0 * t1 + 3.0 * t2 - 3.0 * t3) * v2
        + t3 * v3)
        / 6.0
}

/// B-spline through `values`, with phantom end points reflected so the curve
/// reaches the first and last value exactly.
fn basis_spline(values: &[f64], t: f64) -> f64 {
    let n = values.len() - 1;
    let (i, t) = if t <= 0.0 {
        (0, 0.0)
    } else if t >= 1.0 {
        (n - 1, 1.0)
    } else {
        ((t * n as f64).floor() as usize, t)
    };
    let v1 = values[i];
    let v2 = values[i + 1];
    let v0 = if i > 0 { values[i - 1] } else { 2.0 * v1 - v2 };
    let v3 = if i < n - 1 { values[i + 2] } else { 2.0 * v2 - v1 };
    basis((t - i as f64 / n as f64) * n as f64, v0, v1, v2, v3)
}

/// Maps `t` in `[0, 1]` onto the Reds ramp; values outside are clamped.
pub fn interpolate_reds(t: f64) -> Rgb<u8> {
    let stops: Vec<Rgb<u8>> = REDS.iter().map(|h| hex_to_rgb(h)).collect();
    let mut out = [0u8; 3];
    for (c, slot) in out.iter_mut().enumerate() {
        let channel: Vec<f64> = stops.iter().map(|s| s.0[c] as f64).collect();
        *slot = basis_spline(&channel, t).round().clamp(0.0, 255.0) as u8;
    }
    Rgb(out)
}

/// Continuous scale from a numeric domain onto the Reds ramp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorScale {
    domain: (f64, f64),
}

impl ColorScale {
    pub fn new(min: f64, max: f64) -> Self {
        Self { domain: (min, max) }
    }

    /// Domain `[0, max]` over the known values; unknown values are ignored
    /// and an empty input gives the degenerate domain `[0, 0]`.
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        let max = values
            .into_iter()
            .flatten()
            .filter(|v| !v.is_nan())
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |m| m.max(v))));
        Self::new(0.0, max.unwrap_or(0.0))
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    /// Colour for `value`; `None` when the value is missing or NaN. A
    /// degenerate domain maps everything to the middle of the ramp.
    pub fn color(&self, value: Option<f64>) -> Option<Rgb<u8>> {
        let v = value.filter(|v| !v.is_nan())?;
        let (d0, d1) = self.domain;
        let t = if d0 == d1 { 0.5 } else { (v - d0) / (d1 - d0) };
        Some(interpolate_reds(t))
    }

    /// Roughly `count` round-numbered values spanning the domain.
    pub fn ticks(&self, count: usize) -> Vec<f64> {
        ticks(self.domain.0, self.domain.1, count as f64)
    }
}

fn tick_spec(start: f64, stop: f64, count: f64) -> (f64, f64, f64) {
    let e10 = 50f64.sqrt();
    let e5 = 10f64.sqrt();
    let e2 = 2f64.sqrt();

    let step = (stop - start) / count.max(0.0);
    let power = step.log10().floor();
    let error = step / 10f64.powf(power);
    let factor = if error >= e10 {
        10.0
    } else if error >= e5 {
        5.0
    } else if error >= e2 {
        2.0
    } else {
        1.0
    };

    let (mut i1, mut i2, inc);
    if power < 0.0 {
        let k = 10f64.powf(-power) / factor;
        i1 = (start * k).round();
        i2 = (stop * k).round();
        if i1 / k < start {
            i1 += 1.0;
        }
        if i2 / k > stop {
            i2 -= 1.0;
        }
        inc = -k;
    } else {
        let k = 10f64.powf(power) * factor;
        i1 = (start / k).round();
        i2 = (stop / k).round();
        if i1 * k < start {
            i1 += 1.0;
        }
        if i2 * k > stop {
            i2 -= 1.0;
        }
        inc = k;
    }

    if i2 < i1 && (0.5..2.0).contains(&count) {
        return tick_spec(start, stop, count * 2.0);
    }
    (i1, i2, inc)
}

/// Nice tick values in `[start, stop]`. Steps are 1, 2 or 5 times a power of
/// ten; a negative increment encodes a fractional step as its reciprocal so
/// values such as 0.1 come out exact.
pub fn ticks(start: f64, stop: f64, count: f64) -> Vec<f64> {
    if !(count > 0.0) || start.is_nan() || stop.is_nan() {
        return Vec::new();
    }
    if start == stop {
        return vec![start];
    }
    let reverse = stop < start;
    let (i1, i2, inc) = if reverse {
        tick_spec(stop, start, count)
    } else {
        tick_spec(start, stop, count)
    };
    if !(i2 >= i1) {
        return Vec::new();
    }

    let n = (i2 - i1) as usize + 1;
    let value = |i: usize| {
        let k = if reverse { i2 - i as f64 } else { i1 + i as f64 };
        if inc < 0.0 {
            k / -inc
        } else {
            k * inc
        }
    };
    (0..n).map(value).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn darkness(c: Rgb<u8>) -> u32 {
        765 - (c.0[0] as u32 + c.0[1] as u32 + c.0[2] as u32)
    }

    #[test]
    fn ramp_hits_scheme_end_points() {
        assert_eq!(interpolate_reds(0.0), Rgb([0xff, 0xf5, 0xf0]));
        assert_eq!(interpolate_reds(1.0), Rgb([0x67, 0x00, 0x0d]));
        assert_eq!(interpolate_reds(-3.0), interpolate_reds(0.0));
        assert_eq!(interpolate_reds(7.0), interpolate_reds(1.0));
    }

    #[test]
    fn color_darkens_monotonically_with_value() {
        let scale = ColorScale::new(0.0, 250.0);
        let mut previous = None;
        for step in 0..=250 {
            let c = scale.color(Some(step as f64)).unwrap();
            if let Some(p) = previous {
                assert!(darkness(c) >= darkness(p), "value {} got lighter", step);
                assert!(c.0[1] <= p.0[1]);
            }
            previous = Some(c);
        }
    }

    #[test]
    fn equal_values_get_equal_colors() {
        let scale = ColorScale::from_values([Some(120.0), Some(180.0), None]);
        assert_eq!(scale.color(Some(150.0)), scale.color(Some(150.0)));
        assert_eq!(scale.domain(), (0.0, 180.0));
    }

    #[test]
    fn missing_values_have_no_color() {
        let scale = ColorScale::new(0.0, 100.0);
        assert_eq!(scale.color(None), None);
        assert_eq!(scale.color(Some(f64::NAN)), None);
    }

    #[test]
    fn six_ticks_over_wide_domain() {
        let scale = ColorScale::new(0.0, 250.0);
        assert_eq!(scale.ticks(6), vec![0.0, 50.0, 100.0, 150.0, 200.0, 250.0]);
    }

    #[test]
    fn ticks_pick_round_steps() {
        assert_eq!(ticks(0.0, 180.0, 6.0).len(), 10);
        assert_eq!(ticks(0.0, 1.0, 6.0), vec![0.0, 0.2, 0.4, 0.6, 0.8, 1.0]);
        assert_eq!(ticks(0.0, 10.0, 6.0), vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
    }

    #[test]
    fn reversed_domain_ticks_descend() {
        assert_eq!(ticks(10.0, 0.0, 6.0), vec![10.0, 8.0, 6.0, 4.0, 2.0, 0.0]);
    }

    #[test]
    fn degenerate_domain_still_has_a_tick() {
        let scale = ColorScale::from_values(Vec::<Option<f64>>::new());
        assert_eq!(scale.domain(), (0.0, 0.0));
        assert_eq!(scale.ticks(6), vec![0.0]);
        assert!(scale.color(Some(0.0)).is_some());
    }

    #[test]
    fn zero_count_yields_no_ticks() {
        assert!(ticks(0.0, 100.0, 0.0).is_empty());
    }

    #[test]
    fn hex_parsing_and_css_output() {
        assert_eq!(hex_to_rgb("#ffc0cb"), Rgb([255, 192, 203]));
        assert_eq!(hex_to_rgb("zz"), Rgb([0, 0, 0]));
        assert_eq!(css_color(Rgb([165, 15, 21])), "rgb(165, 15, 21)");
    }
}
