use crate::config::DelayRange;
use crate::core::pacing::Pacer;
use crate::core::text::find_exact;
use crate::domain::ports::{DriverResult, PageDriver, Selector, Target};
use crate::utils::error::{BookingError, Result};
use crate::utils::logger::RunLog;

pub const CLICK_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    Clicked { attempts: u32 },
    /// 所有嘗試都失敗，呼叫端自行決定是否繼續
    Exhausted,
}

impl ClickOutcome {
    pub fn is_clicked(&self) -> bool {
        matches!(self, ClickOutcome::Clicked { .. })
    }
}

/// 最多嘗試三次的點擊：每次先隨機等待、等元素可見、點擊後再隨機等待
pub async fn resilient_click(
    driver: &mut dyn PageDriver,
    pacer: &Pacer,
    log: &RunLog,
    target: &Target,
) -> ClickOutcome {
    let timing = pacer.timing();

    for attempt in 1..=CLICK_ATTEMPTS {
        pacer.pause(timing.click_jitter).await;

        let result = match driver
            .wait_visible(target, timing.click_visible_timeout())
            .await
        {
            Ok(()) => driver.click(target).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                log.info(format!("Clicked: {}", target));
                pacer.pause(timing.click_jitter).await;
                return ClickOutcome::Clicked { attempts: attempt };
            }
            Err(e) => log.warn(format!(
                "Failed to click {} (attempt {}/{}): {}. Retrying...",
                target, attempt, CLICK_ATTEMPTS, e
            )),
        }
    }

    log.warn(format!("Giving up on click after {} attempts: {}", CLICK_ATTEMPTS, target));
    ClickOutcome::Exhausted
}

/// `<select>` 內所有選項的文字
pub async fn option_labels(driver: &mut dyn PageDriver, select: &Target) -> DriverResult<Vec<String>> {
    driver
        .texts(&Selector::css("option").within(select.clone()))
        .await
}

/// 以完全相同的標籤選擇下拉選單，找不到即中止
pub async fn fill_dropdown(
    driver: &mut dyn PageDriver,
    pacer: &Pacer,
    log: &RunLog,
    select: &Target,
    target: &str,
) -> Result<()> {
    let options = option_labels(driver, select).await?;
    log.info(format!("Options for {}: {:?}", select, options));

    let index = match find_exact(&options, target) {
        Some(index) => index,
        None => {
            log.error(format!("Option not found: {}", target));
            return Err(BookingError::OptionNotFound {
                target: target.to_string(),
                available: options,
            });
        }
    };

    driver.select_option(select, &options[index]).await?;
    log.info(format!("Selected: {}", options[index]));
    pacer.pause(pacer.timing().after_dropdown).await;
    Ok(())
}

/// 清空欄位後逐字輸入，每個字元之間隨機停頓
pub async fn type_humanized(
    driver: &mut dyn PageDriver,
    pacer: &Pacer,
    target: &Target,
    text: &str,
    keystroke: DelayRange,
) -> DriverResult<()> {
    driver.focus_and_clear(target).await?;

    let mut buf = [0u8; 4];
    for ch in text.chars() {
        driver.type_text(ch.encode_utf8(&mut buf)).await?;
        pacer.pause(keystroke).await;
    }
    Ok(())
}
