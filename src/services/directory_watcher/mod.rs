//! DirectoryChangeWatcher service: responsibility and boundaries
//!
//! This module is responsible ONLY for watching one directory for freshly
//! written screenshot files and delivering each qualifying file exactly once
//! per watch session, in creation-time order. It never writes or deletes in
//! the watched directory. What happens to a delivered file (clipboard copy,
//! paste) is decided exclusively by the bridge orchestrator.
//!
//! All session state lives on one dedicated worker task; public entry points
//! hand a command to that task and await completion, so start/stop/rescan
//! never interleave for a given watcher instance.

mod scan;
mod watcher;

pub use watcher::DirectoryWatcher;
