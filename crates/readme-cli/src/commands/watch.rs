//! Watch command: foreground loop reacting to filesystem events
//!
//! One `notify` watcher per root feeds a channel. Events are coalesced by a
//! [`Debouncer`] and applied one at a time on a blocking worker, so Ctrl-C
//! never interrupts a file halfway through.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use notify::event::{ModifyKind, RenameMode};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use readme_core::{Debouncer, EventAction, EventKind, FileOutcome, Side, SyncEngine, WatchEvent};
use readme_fs::NormalizedPath;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::context::Context;
use crate::error::Result;

const TICK: Duration = Duration::from_millis(500);

/// Run the watch loop until Ctrl-C.
pub fn run_watch(ctx: &Context) -> Result<()> {
    let engine = ctx.engine()?;
    engine.settings().ensure_runnable()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(watch_loop(Arc::new(engine)))
}

async fn watch_loop(engine: Arc<SyncEngine>) -> Result<()> {
    let settings = engine.settings().sync_settings.clone();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let _watchers = start_watchers(&engine, tx)?;

    let debounce = Duration::try_from_secs_f64(settings.debounce_seconds).unwrap_or_default();
    let mut debouncer = Debouncer::new(debounce, engine.clock());

    let mut tick = tokio::time::interval(TICK);
    let auto_enabled = settings.auto_sync_interval > 0;
    let mut auto_sync = tokio::time::interval(Duration::from_secs(settings.auto_sync_interval.max(1)));
    let cleanup_every = Duration::from_secs(settings.cleanup_interval);
    let mut cleanup =
        tokio::time::interval_at(tokio::time::Instant::now() + cleanup_every, cleanup_every);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    println!(
        "{} Watching {} folders, press Ctrl-C to stop",
        "=>".blue().bold(),
        engine.scanner().roots().len() + 1
    );

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("shutting down");
                break;
            }
            Some(event) = rx.recv() => debouncer.push(event),
            _ = tick.tick() => {
                for event in debouncer.drain_ready() {
                    apply(&engine, event).await;
                }
            }
            _ = auto_sync.tick(), if auto_enabled => {
                let engine = engine.clone();
                match tokio::task::spawn_blocking(move || engine.sync_all()).await {
                    Ok(Ok(report)) => info!(
                        synced = report.synced,
                        reverse_synced = report.reverse_synced,
                        conflicts = report.conflicts,
                        errors = report.errors,
                        "periodic sync"
                    ),
                    Ok(Err(e)) => error!(error = %e, "periodic sync failed"),
                    Err(e) => error!(error = %e, "periodic sync task panicked"),
                }
            }
            _ = cleanup.tick() => {
                let engine = engine.clone();
                let result = tokio::task::spawn_blocking(move || {
                    let swept = engine.sweep_guard();
                    engine.purge_orphans().map(|purged| (swept, purged))
                })
                .await;
                match result {
                    Ok(Ok((swept, purged))) => info!(swept, purged, "periodic cleanup"),
                    Ok(Err(e)) => error!(error = %e, "periodic cleanup failed"),
                    Err(e) => error!(error = %e, "cleanup task panicked"),
                }
            }
        }
    }

    println!("{} Stopped", "=>".blue().bold());
    Ok(())
}

async fn apply(engine: &Arc<SyncEngine>, event: WatchEvent) {
    let engine = engine.clone();
    let path = event.path.clone();
    match tokio::task::spawn_blocking(move || engine.handle_event(&event)).await {
        Ok(Ok(EventAction::Ignored)) => debug!(path = %path, "event ignored"),
        Ok(Ok(EventAction::Reconciled(FileOutcome::Error(message)))) => {
            warn!(path = %path, error = %message, "sync failed")
        }
        Ok(Ok(action)) => info!(path = %path, ?action, "event handled"),
        Ok(Err(e)) => error!(path = %path, error = %e, "event failed"),
        Err(e) => error!(path = %path, error = %e, "event task panicked"),
    }
}

/// Watch every existing enabled root and the target folder.
fn start_watchers(
    engine: &SyncEngine,
    tx: mpsc::UnboundedSender<WatchEvent>,
) -> Result<Vec<RecommendedWatcher>> {
    let target_root = engine.scanner().target_root().map(Path::to_path_buf);
    let mut roots: Vec<PathBuf> = engine
        .scanner()
        .roots()
        .iter()
        .filter(|r| r.is_dir())
        .cloned()
        .collect();
    roots.extend(target_root.clone());

    let mut watchers = Vec::with_capacity(roots.len());
    for root in roots {
        let tx = tx.clone();
        let target_root = target_root.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    for translated in translate(&event, target_root.as_deref()) {
                        // The receiver only goes away on shutdown.
                        let _ = tx.send(translated);
                    }
                }
                Err(e) => warn!(error = %e, "watch error"),
            }
        })?;
        watcher.watch(&root, RecursiveMode::Recursive)?;
        debug!(root = %root.display(), "watching");
        watchers.push(watcher);
    }
    Ok(watchers)
}

/// Turn a raw notification into engine events for Markdown files.
fn translate(event: &notify::Event, target_root: Option<&Path>) -> Vec<WatchEvent> {
    use notify::EventKind as Raw;

    let side_of = |path: &Path| match target_root {
        Some(root) if path.starts_with(root) => Side::Target,
        _ => Side::Source,
    };
    let single = |kind: EventKind| -> Vec<WatchEvent> {
        event
            .paths
            .iter()
            .filter(|p| is_markdown(p))
            .map(|p| WatchEvent::new(p.as_path(), kind.clone(), side_of(p)))
            .collect()
    };

    match event.kind {
        Raw::Modify(ModifyKind::Name(RenameMode::Both)) => match event.paths.as_slice() {
            [from, to] if side_of(from) == side_of(to) && is_markdown(from) => {
                vec![WatchEvent::new(
                    from.as_path(),
                    EventKind::Moved {
                        to: NormalizedPath::new(to),
                    },
                    side_of(from),
                )]
            }
            [from, to] => {
                let mut events = Vec::new();
                if is_markdown(from) {
                    events.push(WatchEvent::new(from.as_path(), EventKind::Deleted, side_of(from)));
                }
                if is_markdown(to) {
                    events.push(WatchEvent::new(to.as_path(), EventKind::Created, side_of(to)));
                }
                events
            }
            _ => Vec::new(),
        },
        Raw::Modify(ModifyKind::Name(RenameMode::From)) => single(EventKind::Deleted),
        Raw::Modify(ModifyKind::Name(RenameMode::To)) => single(EventKind::Created),
        Raw::Modify(ModifyKind::Metadata(_)) => Vec::new(),
        Raw::Modify(_) => single(EventKind::Modified),
        Raw::Create(_) => single(EventKind::Created),
        Raw::Remove(_) => single(EventKind::Deleted),
        _ => Vec::new(),
    }
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("md"))
}
