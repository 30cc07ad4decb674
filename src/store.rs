// src/store.rs
//! Result caching: one [`ResultCache`] per concept, bundled in [`Store`].
//!
//! A cache is an explicit state record: idle, loading (with the one shared
//! in-flight load), loaded, or failed. The idle→loading check-and-set happens
//! under a plain mutex before anything is awaited, so two callers can never
//! both start a load.
//!
//! Loads run as spawned tasks: they finish even if every caller stops
//! waiting. Each load carries a generation number; `force_reload` starts a
//! new generation, and a load that finishes after being superseded is handed
//! to its own callers but never written into the cache.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};

use crate::assemble::{ConceptResult, FormationTemplate, LegionTemplate, TitanResult, TraitTemplate, UpgradeTemplate};
use crate::config::CatalogOptions;
use crate::core::net::Fetch;
use crate::error::{Error, Result};
use crate::overrides::{self, OverrideCache, OverrideTables};
use crate::scrape::{self, Sources};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Idle,
    Loading,
    Loaded,
    Failed,
}

type SharedLoad<T> = Shared<BoxFuture<'static, Result<Arc<T>>>>;

enum Slot<T> {
    Idle,
    Loading { generation: u64, load: SharedLoad<T> },
    Loaded(Arc<T>),
    /// Replayed to every caller until a forced reload.
    Failed(Error),
}

struct Inner<T> {
    slot: Slot<T>,
    generation: u64,
}

pub struct ResultCache<T> {
    inner: Arc<Mutex<Inner<T>>>,
}

impl<T> Clone for ResultCache<T> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<T: Send + Sync + 'static> Default for ResultCache<T> {
    fn default() -> Self { Self::new() }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Write a finished load into the cache, unless a newer generation took over.
fn commit<T>(state: &Mutex<Inner<T>>, generation: u64, result: &Result<Arc<T>>) {
    let mut inner = lock(state);
    let current = matches!(&inner.slot, Slot::Loading { generation: g, .. } if *g == generation);
    if !current {
        logd!("cache: load #{generation} superseded, result dropped");
        return;
    }
    inner.slot = match result {
        Ok(value) => Slot::Loaded(Arc::clone(value)),
        Err(e) => {
            logw!("cache: load #{generation} failed: {e}");
            Slot::Failed(e.clone())
        }
    };
}

impl<T: Send + Sync + 'static> ResultCache<T> {
    pub fn new() -> Self {
        Self { inner: Arc::new(Mutex::new(Inner { slot: Slot::Idle, generation: 0 })) }
    }

    pub fn status(&self) -> Status {
        match lock(&self.inner).slot {
            Slot::Idle => Status::Idle,
            Slot::Loading { .. } => Status::Loading,
            Slot::Loaded(_) => Status::Loaded,
            Slot::Failed(_) => Status::Failed,
        }
    }

    /// Generation of the most recently started load (0: never loaded).
    pub fn generation(&self) -> u64 {
        lock(&self.inner).generation
    }

    /// Spawn `fut` as generation n+1 and make it the in-flight load.
    /// Must be called with the lock held.
    fn start<Fut>(&self, inner: &mut Inner<T>, fut: Fut) -> SharedLoad<T>
    where
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        inner.generation += 1;
        let generation = inner.generation;

        let state = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let result = fut.await.map(Arc::new);
            commit(&state, generation, &result);
            result
        });

        let state = Arc::clone(&self.inner);
        let load = async move {
            match task.await {
                Ok(result) => result,
                Err(join) => {
                    // the task never got to commit
                    let result = Err(Error::TaskFailed(join.to_string()));
                    commit(&state, generation, &result);
                    result
                }
            }
        }
        .boxed()
        .shared();

        inner.slot = Slot::Loading { generation, load: load.clone() };
        logd!("cache: load #{generation} started");
        load
    }

    /// Cached value, cached error, the in-flight load, or a new load. The
    /// loader is only called in the last case.
    pub async fn load_once<F, Fut>(&self, loader: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let load = {
            let mut inner = lock(&self.inner);
            let in_flight = match &inner.slot {
                Slot::Loaded(value) => return Ok(Arc::clone(value)),
                Slot::Failed(e) => return Err(e.clone()),
                Slot::Loading { load, .. } => Some(load.clone()),
                Slot::Idle => None,
            };
            match in_flight {
                Some(load) => load,
                None => self.start(&mut inner, loader()),
            }
        };
        load.await
    }

    /// Start a new load whatever the state. An older in-flight load is not
    /// cancelled; it just can no longer fill the cache.
    pub async fn force_reload<F, Fut>(&self, loader: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let load = {
            let mut inner = lock(&self.inner);
            self.start(&mut inner, loader())
        };
        load.await
    }

    /// Back to idle; an in-flight load is orphaned like in `force_reload`.
    pub fn reset(&self) {
        let mut inner = lock(&self.inner);
        inner.generation += 1;
        inner.slot = Slot::Idle;
    }
}

/* ---------------- Per-concept store ---------------- */

/// Everything a consumer needs: one cache per concept over one shared cache
/// of fetched + parsed sources.
pub struct Store {
    fetcher: Arc<dyn Fetch>,
    opts: Arc<CatalogOptions>,
    /// `None`: the process-wide override cache.
    override_cache: Option<Arc<OverrideCache>>,
    sources: ResultCache<Sources>,
    titans: ResultCache<TitanResult>,
    formations: ResultCache<ConceptResult<FormationTemplate>>,
    legions: ResultCache<ConceptResult<LegionTemplate>>,
    upgrades: ResultCache<ConceptResult<UpgradeTemplate>>,
    traits: ResultCache<ConceptResult<TraitTemplate>>,
}

/// Shared handles a loader task needs; cheap to clone into `'static` futures.
#[derive(Clone)]
struct Ctx {
    fetcher: Arc<dyn Fetch>,
    opts: Arc<CatalogOptions>,
    override_cache: Option<Arc<OverrideCache>>,
    sources: ResultCache<Sources>,
}

impl Ctx {
    async fn sources(&self) -> Result<Arc<Sources>> {
        let fetcher = Arc::clone(&self.fetcher);
        let opts = Arc::clone(&self.opts);
        self.sources
            .load_once(move || async move { Ok(scrape::fetch_sources(fetcher.as_ref(), &opts, None).await) })
            .await
    }

    async fn overrides(&self) -> Result<Arc<OverrideTables>> {
        let fetcher = Arc::clone(&self.fetcher);
        match &self.override_cache {
            Some(cache) => cache.load(fetcher, &self.opts).await,
            None => overrides::load(fetcher, &self.opts).await,
        }
    }
}

impl Store {
    pub fn new(fetcher: Arc<dyn Fetch>, opts: CatalogOptions) -> Self {
        Self {
            fetcher,
            opts: Arc::new(opts),
            override_cache: None,
            sources: ResultCache::new(),
            titans: ResultCache::new(),
            formations: ResultCache::new(),
            legions: ResultCache::new(),
            upgrades: ResultCache::new(),
            traits: ResultCache::new(),
        }
    }

    /// Use a private override cache instead of the process-wide one.
    pub fn with_override_cache(mut self, cache: Arc<OverrideCache>) -> Self {
        self.override_cache = Some(cache);
        self
    }

    pub fn options(&self) -> &CatalogOptions { &self.opts }

    fn ctx(&self) -> Ctx {
        Ctx {
            fetcher: Arc::clone(&self.fetcher),
            opts: Arc::clone(&self.opts),
            override_cache: self.override_cache.clone(),
            sources: self.sources.clone(),
        }
    }

    fn titans_loader(&self) -> impl FnOnce() -> BoxFuture<'static, Result<TitanResult>> {
        let ctx = self.ctx();
        move || {
            async move {
                let (sources, tables) = tokio::join!(ctx.sources(), ctx.overrides());
                Ok(scrape::titans(&*sources?, &*tables?))
            }
            .boxed()
        }
    }

    pub async fn titans(&self) -> Result<Arc<TitanResult>> {
        self.titans.load_once(self.titans_loader()).await
    }

    /// Refetch sources and rebuild titans. Override tables stay cached
    /// (see `overrides::clear`).
    pub async fn reload_titans(&self) -> Result<Arc<TitanResult>> {
        self.sources.reset();
        self.titans.force_reload(self.titans_loader()).await
    }

    pub fn titans_status(&self) -> Status { self.titans.status() }
}

/// The four override-free concepts share one shape.
macro_rules! concept_accessors {
    ($($field:ident, $reload:ident, $status:ident, $extract:path, $ty:ty;)+) => {
        impl Store {
            $(
                pub async fn $field(&self) -> Result<Arc<ConceptResult<$ty>>> {
                    let ctx = self.ctx();
                    self.$field
                        .load_once(move || async move { Ok($extract(&*ctx.sources().await?)) })
                        .await
                }

                pub async fn $reload(&self) -> Result<Arc<ConceptResult<$ty>>> {
                    self.sources.reset();
                    let ctx = self.ctx();
                    self.$field
                        .force_reload(move || async move { Ok($extract(&*ctx.sources().await?)) })
                        .await
                }

                pub fn $status(&self) -> Status { self.$field.status() }
            )+
        }
    };
}

concept_accessors! {
    formations, reload_formations, formations_status, scrape::formations, FormationTemplate;
    legions, reload_legions, legions_status, scrape::legions, LegionTemplate;
    upgrades, reload_upgrades, upgrades_status, scrape::upgrades, UpgradeTemplate;
    traits, reload_traits, traits_status, scrape::traits, TraitTemplate;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn concurrent_callers_share_one_load() {
        let cache: ResultCache<u32> = ResultCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let loader = |calls: Arc<AtomicUsize>| {
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
                Ok(7)
            }
        };
        let (a, b) = tokio::join!(cache.load_once(loader(calls.clone())), cache.load_once(loader(calls.clone())));
        assert_eq!((*a.unwrap(), *b.unwrap()), (7, 7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.status(), Status::Loaded);
    }

    #[tokio::test]
    async fn errors_replay_until_force_reload() {
        let cache: ResultCache<u32> = ResultCache::new();
        let err = cache.load_once(|| async { Err(Error::Config(s!("boom"))) }).await.unwrap_err();
        assert_eq!(err, Error::Config(s!("boom")));
        assert_eq!(cache.status(), Status::Failed);

        // loader not even called
        let again = cache.load_once(|| async { Ok(1) }).await.unwrap_err();
        assert_eq!(again, err);

        let v = cache.force_reload(|| async { Ok(2) }).await.unwrap();
        assert_eq!(*v, 2);
        assert_eq!(cache.status(), Status::Loaded);
    }

    #[tokio::test]
    async fn superseded_load_never_fills_the_cache() {
        let cache: ResultCache<&'static str> = ResultCache::new();
        let (tx, rx) = oneshot::channel::<()>();

        let slow = {
            let cache = cache.clone();
            tokio::spawn(async move {
                cache
                    .load_once(|| async move {
                        let _ = rx.await;
                        Ok("stale")
                    })
                    .await
            })
        };
        while cache.status() != Status::Loading {
            tokio::task::yield_now().await;
        }

        let fresh = cache.force_reload(|| async { Ok("fresh") }).await.unwrap();
        assert_eq!(*fresh, "fresh");

        tx.send(()).unwrap();
        // the stale caller still gets its own answer
        assert_eq!(*slow.await.unwrap().unwrap(), "stale");
        assert_eq!(*cache.load_once(|| async { Ok("unused") }).await.unwrap(), "fresh");
        assert_eq!(cache.generation(), 2);
    }

    #[tokio::test]
    async fn load_finishes_when_caller_gives_up() {
        let cache: ResultCache<u32> = ResultCache::new();
        let (tx, rx) = oneshot::channel::<()>();
        let waiting = cache.load_once(|| async move {
            let _ = rx.await;
            Ok(5)
        });
        // poll once so the load starts, then drop the caller
        let _ = tokio::time::timeout(std::time::Duration::from_millis(1), waiting).await;
        assert_eq!(cache.status(), Status::Loading);

        tx.send(()).unwrap();
        while cache.status() == Status::Loading {
            tokio::task::yield_now().await;
        }
        assert_eq!(cache.status(), Status::Loaded);
    }
}
