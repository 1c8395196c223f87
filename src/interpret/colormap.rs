//! Discrete color scales sampled from named colormaps.
//!
//! A colormap is a list of stops on `[0, 1]`. [`ColorScale::new`] places each
//! stop at `round(index * shades)` and linearly interpolates between
//! neighbouring stops, which yields `shades + 1` entries. Lookups only span
//! the first `shades` of them, so the last stop's pure color is never drawn.

use super::Rgb;
use crate::error::{InterpretError, Result};

/// Fewest shades a scale may have.
pub const MIN_SHADES: usize = 6;
/// Most shades a scale may have.
pub const MAX_SHADES: usize = 72;

type Stop = (f64, [u8; 3]);

const COPPER: &[Stop] = &[
    (0.0, [0, 0, 0]),
    (0.804, [255, 160, 102]),
    (1.0, [255, 199, 127]),
];

const GREYS: &[Stop] = &[(0.0, [0, 0, 0]), (1.0, [255, 255, 255])];

const HOT: &[Stop] = &[
    (0.0, [0, 0, 0]),
    (0.3, [230, 0, 0]),
    (0.6, [255, 210, 0]),
    (1.0, [255, 255, 255]),
];

const COOL: &[Stop] = &[(0.0, [0, 255, 255]), (1.0, [255, 0, 255])];

const BONE: &[Stop] = &[
    (0.0, [0, 0, 0]),
    (0.376, [84, 84, 116]),
    (0.753, [169, 200, 200]),
    (1.0, [255, 255, 255]),
];

const JET: &[Stop] = &[
    (0.0, [0, 0, 131]),
    (0.125, [0, 60, 170]),
    (0.375, [5, 255, 255]),
    (0.625, [255, 255, 0]),
    (0.875, [250, 0, 0]),
    (1.0, [128, 0, 0]),
];

/// Names accepted by [`ColorScale::new`].
pub const COLORMAPS: &[&str] = &["copper", "greys", "hot", "cool", "bone", "jet"];

fn stops(name: &str) -> Option<&'static [Stop]> {
    match name {
        "copper" => Some(COPPER),
        "greys" => Some(GREYS),
        "hot" => Some(HOT),
        "cool" => Some(COOL),
        "bone" => Some(BONE),
        "jet" => Some(JET),
        _ => None,
    }
}

/// Clamp a requested shade count into `[MIN_SHADES, MAX_SHADES]`.
pub fn clamp_shades(shades: usize) -> usize {
    shades.clamp(MIN_SHADES, MAX_SHADES)
}

/// Ordered palette a normalized weight is looked up in.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorScale {
    name: String,
    shades: usize,
    colors: Vec<Rgb>,
}

impl ColorScale {
    /// Build the palette for `name` with `shades` (clamped) lookup entries.
    pub fn new(name: &str, shades: usize) -> Result<Self> {
        let stops = stops(name).ok_or_else(|| {
            InterpretError::UnknownColormap(format!("{} (expected one of {})", name, COLORMAPS.join(", ")))
        })?;
        let shades = clamp_shades(shades);

        let positions: Vec<usize> = stops
            .iter()
            .map(|(index, _)| (index * shades as f64).round() as usize)
            .collect();

        let mut colors = Vec::with_capacity(shades + 1);
        for (i, pair) in stops.windows(2).enumerate() {
            let (from, to) = (pair[0].1, pair[1].1);
            let steps = positions[i + 1].saturating_sub(positions[i]);
            for j in 0..steps {
                let amt = j as f64 / steps as f64;
                colors.push(Rgb(
                    lerp(from[0], to[0], amt),
                    lerp(from[1], to[1], amt),
                    lerp(from[2], to[2], amt),
                ));
            }
        }
        let [r, g, b] = stops[stops.len() - 1].1;
        colors.push(Rgb(r, g, b));

        Ok(Self {
            name: name.to_string(),
            shades,
            colors,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of shades a weight can map to.
    pub fn len(&self) -> usize {
        self.shades
    }

    /// The whole generated palette, `len() + 1` entries.
    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    /// Color for a weight normalized to `[0, 1]`.
    ///
    /// The palette index is `round(weight * (len - 1))`; weights outside the
    /// range (and NaN) land on the nearest end of the palette.
    pub fn at(&self, weight: f64) -> Rgb {
        let colors = self.colors();
        let last = self.shades - 1;
        let pos = (weight * last as f64).round();
        let idx = if pos.is_nan() || pos <= 0.0 {
            0
        } else {
            (pos as usize).min(last)
        };
        colors[idx]
    }
}

fn lerp(from: u8, to: u8, amt: f64) -> u8 {
    let v = f64::from(from) + (f64::from(to) - f64::from(from)) * amt;
    v.round().clamp(0.0, 255.0) as u8
}
