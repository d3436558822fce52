//! The encoder: render a fragment, extract its visual units, memoize.

pub mod background;
pub mod cache;
pub mod collapse;
pub mod extract;
pub mod zorder;

pub use cache::{CacheStats, EncodeCache};
pub use zorder::StackedUnit;

use crate::decode::decode;
use crate::surface::{settle, RenderSurface, SettlePolicy};
use crate::unit::FlatSlide;
use crate::Result;
use futures::stream::{self, StreamExt};
use log::{debug, warn};
use std::sync::Arc;
use std::time::Instant;

/// Encodes fragments on one render surface, sharing one result cache.
pub struct Flattener<S> {
    surface: S,
    cache: Arc<EncodeCache>,
    settle: SettlePolicy,
    deck_concurrency: usize,
}

impl<S: RenderSurface> Flattener<S> {
    /// A flattener with a private default-sized cache.
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            cache: Arc::new(EncodeCache::default()),
            settle: SettlePolicy::default(),
            deck_concurrency: 1,
        }
    }

    /// Share `cache` with other flatteners.
    pub fn with_cache(mut self, cache: Arc<EncodeCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_settle_policy(mut self, policy: SettlePolicy) -> Self {
        self.settle = policy;
        self
    }

    /// Upper bound on fragments rendered at once by [`Flattener::encode_deck`].
    pub fn with_deck_concurrency(mut self, n: usize) -> Self {
        self.deck_concurrency = n.max(1);
        self
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn cache(&self) -> &Arc<EncodeCache> {
        &self.cache
    }

    /// Encode one fragment.
    ///
    /// Never fails: a surface that cannot render the fragment yields an empty
    /// slide, which is not cached so a later call can retry.
    pub async fn encode(&self, markup: &str) -> Arc<FlatSlide> {
        if let Some(hit) = self.cache.get(markup) {
            return hit;
        }
        match self.try_encode(markup).await {
            Ok(slide) => {
                let slide = Arc::new(slide);
                self.cache.insert(markup, Arc::clone(&slide));
                slide
            }
            Err(e) => {
                warn!("Encode failed, returning an empty slide: {}", e);
                Arc::new(FlatSlide::empty())
            }
        }
    }

    async fn try_encode(&self, markup: &str) -> Result<FlatSlide> {
        let started = Instant::now();
        let doc = self.surface.load(markup).await?;
        settle(doc.as_ref(), self.settle).await;
        let slide = extract::extract(doc.as_ref());
        debug!(
            "encoded {} bytes into {} units in {:?}",
            markup.len(),
            slide.units.len(),
            started.elapsed()
        );
        Ok(slide)
    }

    /// Encode several fragments, at most `deck_concurrency` at a time.
    /// Results are in input order.
    ///
    /// Loads overlap only as far as the surface yields: [`StaticSurface`]
    /// renders on the blocking pool, while extraction itself runs on the
    /// calling task.
    ///
    /// [`StaticSurface`]: crate::rendering::StaticSurface
    pub async fn encode_deck<T>(&self, slides: &[T]) -> Vec<Arc<FlatSlide>>
    where
        T: AsRef<str>,
    {
        stream::iter(slides.iter().map(|markup| self.encode(markup.as_ref())))
            .buffered(self.deck_concurrency)
            .collect()
            .await
    }

    /// Encode then rebuild: the flattened equivalent of `markup`.
    pub async fn roundtrip(&self, markup: &str) -> String {
        let slide = self.encode(markup).await;
        decode(&slide.units)
    }
}
