use crate::core::actions;
use crate::core::selectors;
use crate::core::sequencer::BookingSequencer;
use crate::core::text::{choose_date, DateChoice};
use crate::utils::error::Result;

impl<'a> BookingSequencer<'a> {
    /// 選擇預約日期並確認；日期選擇失敗時保留網站預設日期
    pub(crate) async fn select_appointment(&mut self) -> Option<DateChoice> {
        let pacer = self.pacer;
        pacer.pause(pacer.timing().appointment_lead_in).await;

        let choice = match self.choose_appointment_date().await {
            Ok(Some(choice)) => Some(choice),
            Ok(None) => {
                self.log
                    .warn("No selectable date options, keeping the default date");
                None
            }
            Err(e) => {
                self.log.warn(format!(
                    "Date selection error ({}), keeping the default date",
                    e
                ));
                None
            }
        };

        self.click(&selectors::confirm_appointment()).await;
        choice
    }

    async fn choose_appointment_date(&mut self) -> Result<Option<DateChoice>> {
        let pacer = self.pacer;
        let log = self.log;
        let booking = self.booking;
        let preferred = booking.request().preferred_date.as_deref();
        let select = selectors::date_dropdown();

        let options = actions::option_labels(&mut *self.driver, &select).await?;
        log.info(format!("Date options: {:?}", options));

        let Some(choice) = choose_date(&options, preferred) else {
            return Ok(None);
        };

        let label = &options[choice.index()];
        match choice {
            DateChoice::Matched(_) => log.info(format!("Option found {}", label)),
            DateChoice::Fallback(_) => {
                log.warn(format!("Option not found {}", preferred.unwrap_or("(no date)")));
                log.warn(format!("Choosing first option instead, {}", label));
            }
        }

        self.driver.select_option(&select, label).await?;
        pacer.pause(pacer.timing().after_date_select).await;
        Ok(Some(choice))
    }
}
