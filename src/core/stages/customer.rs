use crate::core::actions;
use crate::core::selectors;
use crate::core::sequencer::BookingSequencer;
use crate::utils::error::Result;

impl<'a> BookingSequencer<'a> {
    /// 依插入順序逐欄輸入客戶資料；頁面上不存在的欄位會中止執行
    pub(crate) async fn enter_customer_data(&mut self) -> Result<()> {
        let pacer = self.pacer;
        let timing = pacer.timing();
        let booking = self.booking;

        pacer.pause(timing.customer_lead_in).await;

        for (field, value) in &booking.request().customer_fields {
            self.log.info(format!("Filling {}", field));
            actions::type_humanized(
                &mut *self.driver,
                pacer,
                &selectors::customer_field(field),
                value,
                timing.form_keystroke,
            )
            .await?;
        }
        Ok(())
    }
}
