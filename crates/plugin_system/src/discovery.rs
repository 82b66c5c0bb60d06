//! Ordering of candidate plugins before they are handed to the manager.

use plasocket_api::Plugin;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Plugins whose name starts with this are never loaded.
pub const EXCLUSION_MARKER: char = '_';

/// Filters and orders plugin candidates.
///
/// Candidates named with the [`EXCLUSION_MARKER`], listed in `disabled`, or
/// duplicating an earlier name are dropped. Core plugins move to the front;
/// otherwise the input order is kept.
pub fn order_plugins(candidates: Vec<Arc<dyn Plugin>>, disabled: &[String]) -> Vec<Arc<dyn Plugin>> {
    let mut seen = HashSet::new();
    let mut ordered: Vec<Arc<dyn Plugin>> = Vec::with_capacity(candidates.len());

    for plugin in candidates {
        let name = plugin.name().to_string();

        if name.starts_with(EXCLUSION_MARKER) {
            debug!("Skipping excluded plugin {}", name);
            continue;
        }
        if disabled.iter().any(|d| d == &name) {
            info!("Plugin {} is disabled in configuration", name);
            continue;
        }
        if !seen.insert(name.clone()) {
            warn!("Plugin {} is already registered, ignoring duplicate", name);
            continue;
        }

        ordered.push(plugin);
    }

    // stable, so non-core plugins keep their relative order
    ordered.sort_by_key(|p| !p.is_core());
    ordered
}
