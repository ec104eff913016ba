use crate::core::actions::{self, ClickOutcome};
use crate::core::selectors;
use crate::core::sequencer::BookingSequencer;
use crate::utils::error::{BookingError, Result};

pub const BRANCH_SEARCH_ATTEMPTS: u32 = 3;

impl<'a> BookingSequencer<'a> {
    /// 依郵遞區號搜尋分店並選擇第一個結果
    pub(crate) async fn select_branch(&mut self) -> Result<()> {
        let pacer = self.pacer;
        let log = self.log;
        let timing = pacer.timing();
        let booking = self.booking;
        let postal_code = &booking.request().postal_code;

        pacer.pause(timing.branch_lead_in).await;

        match self.click(&selectors::cookie_accept()).await {
            ClickOutcome::Clicked { .. } => log.info("Cookies accepted"),
            ClickOutcome::Exhausted => log.warn("No cookie consent dialog found"),
        }

        actions::type_humanized(
            &mut *self.driver,
            pacer,
            &selectors::location_search(),
            postal_code,
            timing.search_keystroke,
        )
        .await?;

        log.info("Waiting for branch entries to load...");
        let first_branch = selectors::branch_entries().first();
        let mut loaded = false;

        for attempt in 1..=BRANCH_SEARCH_ATTEMPTS {
            self.driver.press_enter().await?;
            match self
                .driver
                .wait_visible(&first_branch, timing.branch_results_timeout())
                .await
            {
                Ok(()) => {
                    log.info("Branch entries loaded successfully!");
                    loaded = true;
                    break;
                }
                Err(e) => log.warn(format!(
                    "Branch entries did not load (attempt {}/{}): {}",
                    attempt, BRANCH_SEARCH_ATTEMPTS, e
                )),
            }
        }

        if !loaded {
            log.error(format!("No branches found for postal code {}", postal_code));
            return Err(BookingError::BranchesNotLoaded {
                postal_code: postal_code.clone(),
                attempts: BRANCH_SEARCH_ATTEMPTS,
            });
        }

        pacer.pause_ms(timing.branch_settle_ms).await;
        self.click(&first_branch).await;
        Ok(())
    }
}
