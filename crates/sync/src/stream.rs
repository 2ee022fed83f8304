use crate::action::{Executor, Report};
use crate::error::{ErrorKind, Result};
use crate::local::walk;
use crate::resource::Resource;
use crate::status::Status;
use async_stream::stream;
use bucketsync_config::Config;
use bucketsync_storage::{ObjectInfo, ObjectStore, StoreHandle};
use exn::ResultExt;
use futures::stream::FuturesUnordered;
use futures::{Stream, StreamExt, TryStreamExt};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, VecDeque};
use std::path::PathBuf;
use std::pin::pin;
use std::sync::Arc;

/// Progress events emitted by [`sync`].
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started) exactly once.
/// 2. [`DiscoveryComplete`](Self::DiscoveryComplete) exactly once, with the
///    number of logical paths found on either side.
/// 3. [`Applied`](Self::Applied) once per resource that was handled.
/// 4. [`Complete`](Self::Complete) exactly once.
///
/// If enumeration fails the stream ends after the error, and
/// [`Complete`](Self::Complete) is never emitted.
#[derive(Debug)]
pub enum SyncEvent {
    Started,
    DiscoveryComplete(u64),
    Applied(Report),
    Complete,
}

/// Every logical path on either side, sorted, with the listing entry for
/// the ones that exist remotely.
pub async fn enumerate(store: &dyn ObjectStore, config: &Config) -> Result<BTreeMap<PathBuf, Option<ObjectInfo>>> {
    let mut paths = BTreeMap::new();

    let mut listing = store.list_stream(None);
    while let Some(info) = listing.try_next().await.or_raise(|| ErrorKind::Enumerate("remote listing"))? {
        match paths.entry(info.path.clone()) {
            Entry::Vacant(entry) => {
                entry.insert(Some(info));
            },
            // `blog` and `blog/` map to the same logical path.
            Entry::Occupied(entry) => {
                tracing::warn!(key = %info.key, path = %entry.key().display(), "Remote keys collide; keeping the first");
            },
        }
    }

    let mut local = pin!(walk(&config.build_dir, config.prefer_gzip));
    while let Some(path) = local.try_next().await.or_raise(|| ErrorKind::Enumerate("build directory"))? {
        paths.entry(path).or_insert(None);
    }

    tracing::debug!(store = store.name(), paths = paths.len(), "Enumerated resources");
    Ok(paths)
}

/// Streams [`SyncEvent`]s while making `store` match the build directory.
///
/// Resources are reconciled concurrently, at most `config.concurrency` at a
/// time; more are started as in-flight ones complete. A failing resource is
/// surfaced as an `Err` item without terminating the stream. Only an
/// enumeration failure is fatal.
pub fn sync(store: StoreHandle, config: Arc<Config>) -> impl Stream<Item = Result<SyncEvent>> {
    // `rustfmt` does not format macros that use braces. Wrap in parentheses!
    stream!({
        yield Ok(SyncEvent::Started);

        let paths = match enumerate(store.as_ref(), &config).await {
            Ok(paths) => paths,
            Err(e) => {
                yield Err(e);
                return;
            },
        };
        // Infallible: a usize (either 32- or 64-bit) will always fit in a u64.
        yield Ok(SyncEvent::DiscoveryComplete(u64::try_from(paths.len()).unwrap_or(0)));

        let executor = Executor::new(store.clone(), config.clone());
        let mut pending: VecDeque<_> = paths
            .into_iter()
            .map(|(path, listed)| reconcile(&executor, store.clone(), &config, path, listed))
            .collect();
        let mut processing = FuturesUnordered::new();
        processing.extend(pending.drain(..config.concurrency.max(1).min(pending.len())));
        while let Some(result) = processing.next().await {
            yield result.map(SyncEvent::Applied);
            if let Some(next) = pending.pop_front() {
                processing.push(next);
            }
        }

        yield Ok(SyncEvent::Complete);
    })
}

async fn reconcile(
    executor: &Executor,
    store: StoreHandle,
    config: &Config,
    path: PathBuf,
    listed: Option<ObjectInfo>,
) -> Result<Report> {
    let mut resource = Resource::new(path, listed, store, config).await?;
    executor.apply(&mut resource).await
}

/// Outcome counts of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub discovered: u64,
    pub statuses: BTreeMap<Status, usize>,
    pub failed: usize,
}

impl Summary {
    pub fn record(&mut self, report: &Report) {
        *self.statuses.entry(report.status).or_default() += 1;
    }

    pub fn count(&self, status: Status) -> usize {
        self.statuses.get(&status).copied().unwrap_or(0)
    }

    /// Resources that were handled, successfully or not.
    pub fn total(&self) -> usize {
        self.statuses.values().sum::<usize>() + self.failed
    }
}

/// Drive [`sync`] to completion. Per-resource failures are logged and
/// counted; an enumeration failure is returned.
pub async fn run(store: StoreHandle, config: Arc<Config>) -> Result<Summary> {
    let mut summary = Summary::default();
    let mut events = pin!(sync(store, config));
    while let Some(event) = events.next().await {
        match event {
            Ok(SyncEvent::DiscoveryComplete(discovered)) => summary.discovered = discovered,
            Ok(SyncEvent::Applied(report)) => summary.record(&report),
            Ok(SyncEvent::Started | SyncEvent::Complete) => {},
            Err(e) if matches!(&*e, ErrorKind::Enumerate(_)) => return Err(e),
            Err(e) => {
                tracing::error!(path = ?e.path(), retryable = e.is_retryable(), error = ?e, "Resource failed");
                summary.failed += 1;
            },
        }
    }
    tracing::info!(discovered = summary.discovered, failed = summary.failed, "Sync complete");
    Ok(summary)
}
