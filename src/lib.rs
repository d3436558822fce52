//! slideflat
//!
//! Flattens a rendered HTML slide fragment into a list of absolutely
//! positioned "visual units" and rebuilds equivalent markup from that list,
//! so a slide can be re-laid out in a container of a different size.
//!
//! # Features
//!
//! - **Encode**: render a fragment, collapse nested text runs into one unit
//!   per logical block, recover fill-only decorations, capture computed style
//! - **Decode**: rebuild one positioned element per unit, stacked by area
//! - **Pluggable rendering**: anything implementing [`RenderSurface`] can do
//!   the layout; [`StaticSurface`] is built in
//! - **Memoized**: encode results are cached per fragment in a bounded LRU
//!
//! # Example
//!
//! ```no_run
//! use slideflat::{decode, FlattenConfig, Viewport};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let config = FlattenConfig {
//!     viewport: Viewport { width: 1280, height: 720 },
//!     ..Default::default()
//! };
//!
//! let flattener = slideflat::new_flattener(&config);
//! let slide = flattener.encode("<div><h1>Title</h1><p>Body</p></div>").await;
//! println!("{} units, {:?} wide", slide.units.len(), slide.width);
//! let rebuilt = decode(&slide.units);
//! # let _ = rebuilt;
//! # }
//! ```

use std::sync::Arc;

pub mod error;
pub use error::{Error, Result};

pub mod decode;
pub mod dom;
pub mod flatten;
pub mod presentation;
pub mod rendering;
pub mod style;
pub mod surface;
pub mod unit;

pub use decode::decode;
pub use flatten::{EncodeCache, Flattener};
pub use presentation::{decode_into_container, FitTransform, Viewport};
pub use rendering::StaticSurface;
pub use style::{StyleProperty, StyleSnapshot};
pub use surface::{MeasurableDocument, Rect, RenderSurface, SettlePolicy};
pub use unit::{ChildStyle, FlatSlide, VisualUnit};

/// Slides kept by an [`EncodeCache`] unless configured otherwise
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Configuration for a [`Flattener`]
///
/// The defaults match a 16:9 presentation viewport and keep a modest cache:
/// - `viewport` is 1280x720, the size slides are generated for
/// - `cache_capacity` bounds the encode cache; `0` disables eviction
/// - `settle` trusts the surface's readiness signal
///
/// # Examples
///
/// ```
/// let cfg = slideflat::FlattenConfig::default();
/// assert_eq!(cfg.viewport.width, 1280);
/// assert_eq!(cfg.cache_capacity, 256);
/// ```
#[derive(Debug, Clone)]
pub struct FlattenConfig {
    /// Viewport the built-in surface lays fragments out in
    pub viewport: Viewport,
    /// Maximum number of cached encode results (0 => unbounded)
    pub cache_capacity: usize,
    /// What to wait for between loading and measuring
    pub settle: SettlePolicy,
    /// Fragments rendered at once by `encode_deck`
    pub deck_concurrency: usize,
}

impl Default for FlattenConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            settle: SettlePolicy::Ready,
            deck_concurrency: num_cpus::get(),
        }
    }
}

impl FlattenConfig {
    /// Reject settings that cannot work.
    pub fn validate(&self) -> Result<()> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(Error::ConfigError(format!(
                "viewport must be non-empty, got {}",
                self.viewport
            )));
        }
        if self.deck_concurrency == 0 {
            return Err(Error::ConfigError(
                "deck_concurrency must be at least 1".to_string(),
            ));
        }
        if let SettlePolicy::PollUntilStable { max_polls: 0, .. } = self.settle {
            return Err(Error::ConfigError(
                "PollUntilStable needs max_polls > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply this configuration to a flattener over any surface.
    pub fn build<S: RenderSurface>(&self, surface: S) -> Flattener<S> {
        Flattener::new(surface)
            .with_cache(Arc::new(EncodeCache::new(self.cache_capacity)))
            .with_settle_policy(self.settle)
            .with_deck_concurrency(self.deck_concurrency)
    }
}

/// Create a flattener backed by the built-in [`StaticSurface`].
pub fn new_flattener(config: &FlattenConfig) -> Flattener<StaticSurface> {
    config.build(StaticSurface::new(config.viewport))
}
