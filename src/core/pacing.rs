use crate::config::{DelayRange, TimingConfig};
use rand::Rng;
use std::time::Duration;

/// 依設定產生隨機等待，模擬真人操作
#[derive(Debug, Clone)]
pub struct Pacer {
    timing: TimingConfig,
}

impl Pacer {
    pub fn new(timing: TimingConfig) -> Self {
        Self { timing }
    }

    /// 所有等待皆為零
    pub fn instant() -> Self {
        Self::new(TimingConfig::instant())
    }

    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    pub fn sample(range: DelayRange) -> Duration {
        if range.max_ms <= range.min_ms {
            return Duration::from_millis(range.min_ms);
        }
        let millis = rand::thread_rng().gen_range(range.min_ms..range.max_ms);
        Duration::from_millis(millis)
    }

    pub async fn pause(&self, range: DelayRange) {
        let delay = Self::sample(range);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    pub async fn pause_ms(&self, millis: u64) {
        if millis > 0 {
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }
    }
}
