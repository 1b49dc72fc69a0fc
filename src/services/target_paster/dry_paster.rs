use super::TargetPasterTrait;
use crate::config::Config;
use crate::error::Result;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::info;

/// Эмуляция вставки для dry-run режима: проходит те же шаги по таймингам,
/// но не трогает ни окна, ни ввод
pub struct DryRunPaster {
    config: Arc<Config>,
}

impl DryRunPaster {
    pub fn new(config: Arc<Config>) -> Self {
        info!("Инициализация DryRunPaster");
        Self { config }
    }
}

#[async_trait::async_trait]
impl TargetPasterTrait for DryRunPaster {
    async fn activate_and_paste(&self, target_identifier: Option<&str>) -> Result<()> {
        let target = target_identifier
            .or(self.config.paster.target_app.as_deref())
            .unwrap_or("<по умолчанию>");

        info!("[DRY RUN] Активация целевого приложения '{}'", target);
        tokio::time::sleep(Duration::from_millis(self.config.paster.settle_delay_ms)).await;
        info!("[DRY RUN] Синтез аккорда вставки");
        Ok(())
    }
}
