//! TargetAppPaster service: responsibility and boundaries
//!
//! The highest-hazard component: it synchronizes against OS UI state it does
//! not own (foreground window, keyboard focus, held gesture keys). The paste
//! sequence is strictly ordered, every wait is bounded, and the only retry is
//! the single verify-and-repeat of the settle/nudge/paste tail. The clipboard
//! content itself is NOT this module's concern - it only delivers the paste.

mod dry_paster;
mod focus;
mod gesture;
mod input;
mod paster;
mod window_control;

use crate::config::Config;
use crate::error::Result;
use std::sync::Arc;

/// Trait for target pasters that can run in different modes
#[async_trait::async_trait]
pub trait TargetPasterTrait: Send + Sync {
    /// Активировать целевое приложение и синтезировать вставку
    async fn activate_and_paste(&self, target_identifier: Option<&str>) -> Result<()>;
}

/// Factory function to create an appropriate paster based on the dry_run flag
pub fn create_target_paster(
    config: Arc<Config>,
    dry_run: bool,
) -> Result<Box<dyn TargetPasterTrait + Send>> {
    if dry_run {
        Ok(Box::new(dry_paster::DryRunPaster::new(config)))
    } else {
        Ok(Box::new(paster::RealTargetPaster::new(config)))
    }
}
