//! Fitting a flattened slide into a viewport

use crate::decode::decode;
use crate::unit::FlatSlide;
use crate::Error;
use std::fmt;
use std::str::FromStr;

/// Share of the viewport a fitted slide may occupy along its tighter axis
const FIT_MARGIN: f64 = 0.95;

/// Viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Scale `content_w` x `content_h` to fit this viewport and centre it.
    ///
    /// Missing or degenerate sizes (zero, negative, non-finite) give the identity.
    pub fn fit(&self, content_w: f64, content_h: f64) -> FitTransform {
        let vw = self.width as f64;
        let vh = self.height as f64;
        let usable = |v: f64| v.is_finite() && v > 0.0;
        if !(usable(content_w) && usable(content_h) && usable(vw) && usable(vh)) {
            return FitTransform::identity();
        }
        let scale = FIT_MARGIN / (content_h / vh).max(content_w / vw);
        FitTransform {
            scale,
            translate_x: (vw - content_w * scale) / 2.0,
            translate_y: (vh - content_h * scale) / 2.0,
        }
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Viewport {
    type Err = Error;

    /// Parse `WIDTHxHEIGHT`, e.g. `1280x720`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| Error::ConfigError(format!("viewport {:?} is not WIDTHxHEIGHT", s)))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| Error::ConfigError(format!("invalid viewport dimension {:?}", v)))
        };
        Ok(Self::new(parse(w)?, parse(h)?))
    }
}

/// Scale-then-centre transform, applied with `transform-origin: left top`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitTransform {
    pub scale: f64,
    pub translate_x: f64,
    pub translate_y: f64,
}

impl FitTransform {
    pub fn identity() -> Self {
        Self {
            scale: 1.0,
            translate_x: 0.0,
            translate_y: 0.0,
        }
    }

    pub fn to_css(&self) -> String {
        format!(
            "translate({}px, {}px) scale({})",
            self.translate_x, self.translate_y, self.scale
        )
    }
}

/// Decode a slide into a relatively positioned container sized to the slide
/// and fitted to `viewport`.
pub fn decode_into_container(slide: &FlatSlide, viewport: Viewport) -> String {
    let width = slide.width.unwrap_or(viewport.width as f64);
    let height = slide.height.unwrap_or(viewport.height as f64);
    let fit = viewport.fit(width, height);
    format!(
        "<div style=\"position: relative; width: {}px; height: {}px; transform-origin: left top; transform: {};\">{}</div>",
        width,
        height,
        fit.to_css(),
        decode(&slide.units)
    )
}
