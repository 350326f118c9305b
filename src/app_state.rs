use std::sync::Arc;

use crate::auth::Auth;
use crate::cache_mgr::CacheMgr;
use crate::config::Config;
use crate::indexer::Indexer;
use crate::metadata::{MetadataProvider, TmdbProvider};
use crate::protocol_client::ProtocolClientCache;
use crate::store::Store;
use crate::transcoder::Transcoder;
use crate::watch::WatchLocks;

/// Owns every long-lived singleton and hands clones/references to handlers.
/// Per spec.md §9 ("model each as an owned value held by the composition
/// root"), nothing here is a module-level global.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Store,
    pub auth: Arc<Auth>,
    pub protocol_clients: Arc<ProtocolClientCache>,
    pub indexer: Arc<Indexer>,
    pub transcoder: Arc<Transcoder>,
    pub cache_mgr: Arc<CacheMgr>,
    pub watch_locks: Arc<WatchLocks>,
}

impl AppState {
    pub async fn bootstrap(config: Config) -> anyhow::Result<Self> {
        let store = Store::connect(&config.database_path).await?;
        let auth = Arc::new(Auth::new(&config.server_secret, config.credential_expiry_days));
        let protocol_clients = Arc::new(ProtocolClientCache::new());

        let cache_mgr = Arc::new(CacheMgr::new(
            config.cache_root.clone(),
            config.cache_size_cap_bytes,
            std::time::Duration::from_secs(config.cache_ttl_hours as u64 * 3600),
        ));

        let transcoder = Arc::new(Transcoder::new(
            config.ffmpeg_path.clone(),
            cache_mgr.clone(),
            config.hls_segment_secs,
        ));

        let metadata_provider: Option<Arc<dyn MetadataProvider>> = config
            .metadata_provider_key
            .clone()
            .map(|key| {
                Arc::new(TmdbProvider::new(key, config.metadata_language.clone()))
                    as Arc<dyn MetadataProvider>
            });

        let indexer = Arc::new(Indexer::new(
            store.clone(),
            protocol_clients.clone(),
            config.video_extensions.clone(),
            config.server_secret.clone(),
            config.auto_enrich,
            metadata_provider,
        ));

        Ok(Self {
            config: Arc::new(config),
            store,
            auth,
            protocol_clients,
            indexer,
            transcoder,
            cache_mgr,
            watch_locks: Arc::new(WatchLocks::new()),
        })
    }
}
