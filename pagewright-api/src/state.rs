//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use pagewright_storage::{CacheBackend, ContentStore};

use crate::config::RenderConfig;
use crate::services::{
    InvalidationService, PageRegenerator, PublishPipeline, RenderPipeline,
};

/// Application-wide state shared across all routes.
///
/// The content store and cache are constructed by the caller and handed in,
/// so tests can build isolated instances.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ContentStore>,
    pub cache: Arc<dyn CacheBackend>,
    pub render: Arc<RenderPipeline>,
    pub publish: Arc<PublishPipeline>,
    pub invalidation: Arc<InvalidationService>,
    pub regenerator: Arc<PageRegenerator>,
    pub render_config: Arc<RenderConfig>,
    pub start_time: Instant,
}

impl AppState {
    /// Wire every pipeline around one store and one cache.
    pub fn new(
        store: Arc<dyn ContentStore>,
        cache: Arc<dyn CacheBackend>,
        render_config: RenderConfig,
    ) -> Self {
        let render = Arc::new(RenderPipeline::new(
            Arc::clone(&store),
            Arc::clone(&cache),
            render_config.clone(),
        ));
        let invalidation = InvalidationService::new(Arc::clone(&store), Arc::clone(&cache));
        let publish = Arc::new(PublishPipeline::new(
            Arc::clone(&store),
            Arc::clone(&cache),
            render.assembler().clone(),
            invalidation.clone(),
        ));
        let regenerator = Arc::new(PageRegenerator::new(Arc::clone(&render)));

        Self {
            store,
            cache,
            render,
            publish,
            invalidation: Arc::new(invalidation),
            regenerator,
            render_config: Arc::new(render_config),
            start_time: Instant::now(),
        }
    }
}

crate::impl_from_ref!(Arc<dyn ContentStore>, store);
crate::impl_from_ref!(Arc<dyn CacheBackend>, cache);
crate::impl_from_ref!(Arc<RenderPipeline>, render);
crate::impl_from_ref!(Arc<PublishPipeline>, publish);
crate::impl_from_ref!(Arc<InvalidationService>, invalidation);
crate::impl_from_ref!(Arc<PageRegenerator>, regenerator);
crate::impl_from_ref!(Arc<RenderConfig>, render_config);
crate::impl_from_ref!(Instant, start_time);
