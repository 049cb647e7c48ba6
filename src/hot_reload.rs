//! # Hot Reload Module
//!
//! Live reloading of a route file without restarting the process.
//!
//! ## Overview
//!
//! The watcher observes the route file and, on every modification:
//! - loads and binds a complete new [`Map`] off to the side
//! - swaps it into the [`SharedMap`] in one atomic step
//! - calls the reload hook with the new map
//!
//! Requests already holding an adapter keep the snapshot they were bound to;
//! new requests see the new table.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use routemap::config::load_routes;
//! use routemap::hot_reload::watch_routes;
//! use routemap::router::SharedMap;
//! use std::sync::Arc;
//!
//! # fn main() -> anyhow::Result<()> {
//! let shared = Arc::new(SharedMap::new(load_routes("routes.yaml")?));
//! let _watcher = watch_routes("routes.yaml", Arc::clone(&shared), |map| {
//!     println!("reloaded {} rules", map.rule_count());
//! })?;
//! // keep `_watcher` alive for as long as reloading should happen
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! If the new file fails to parse or a rule fails to bind:
//! - the error is logged
//! - the previous map remains active
//!
//! Saving a half-edited file therefore never takes routing down.

use crate::config::load_routes;
use crate::router::{Map, SharedMap};
use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Load `path` and, if it binds cleanly, publish it through `shared`.
///
/// Returns the number of rules now being served.
pub fn reload_routes(path: &Path, shared: &SharedMap) -> anyhow::Result<usize> {
    let map = load_routes(path)?;
    let rules = map.rule_count();
    shared.replace(map);
    Ok(rules)
}

/// Watch a route file and swap the [`SharedMap`] whenever it changes.
///
/// The callback receives the newly published map. The returned watcher must
/// be kept alive; dropping it stops the watch.
pub fn watch_routes<P, F>(
    routes_path: P,
    shared: Arc<SharedMap>,
    mut on_reload: F,
) -> notify::Result<RecommendedWatcher>
where
    P: AsRef<Path>,
    F: FnMut(&Map) + Send + 'static,
{
    let path: PathBuf = routes_path.as_ref().to_path_buf();
    let watch_path = path.clone();

    let mut watcher = RecommendedWatcher::new(
        move |res: Result<notify::Event, notify::Error>| match res {
            Ok(event) => {
                if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                    return;
                }
                match reload_routes(&watch_path, &shared) {
                    Ok(rules) => {
                        info!(
                            path = %watch_path.display(),
                            rules,
                            "hot-reload: routing table swapped"
                        );
                        on_reload(&shared.load());
                    }
                    Err(e) => {
                        warn!(
                            path = %watch_path.display(),
                            error = %format!("{e:#}"),
                            "hot-reload: keeping previous routing table"
                        );
                    }
                }
            }
            Err(e) => error!(error = %e, "hot-reload: watch error"),
        },
        Config::default(),
    )?;

    watcher.watch(&path, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}
