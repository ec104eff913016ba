use crate::core::actions;
use crate::core::selectors;
use crate::core::sequencer::BookingSequencer;
use crate::core::text::{find_exact, match_service, ServiceMatch};
use crate::domain::model::{BookingRequest, ServiceSelection};
use crate::utils::error::{BookingError, Result};

/// HU/AU 不套用請求的數量
const EXEMPT_QUANTITY: &str = "1";

/// 實際要在服務清單中選擇的名稱與數量
///
/// HU/AU 群組忽略對照表的服務名稱，改依引擎種類選擇固定標籤。
pub fn service_target<'r>(
    service: &'r ServiceSelection,
    request: &'r BookingRequest,
) -> Result<(&'r str, &'r str)> {
    if !service.is_hu_au() {
        return Ok((service.name.as_str(), request.quantity.as_str()));
    }
    match request.engine_kind {
        Some(engine) => Ok((engine.hu_au_label(), EXEMPT_QUANTITY)),
        None => Err(BookingError::ValidationError {
            message: "engine_kind is required for HU/AU services".to_string(),
        }),
    }
}

impl<'a> BookingSequencer<'a> {
    /// 依序加入所有已解析的服務，回傳成功選到服務名稱的數量
    pub(crate) async fn select_services(&mut self) -> Result<usize> {
        let pacer = self.pacer;
        let log = self.log;
        let booking = self.booking;

        pacer.pause(pacer.timing().services_lead_in).await;
        self.click(&selectors::more_services()).await;

        let mut selected = 0;
        for (index, service) in booking.services().iter().enumerate() {
            if index > 0 {
                self.click(&selectors::add_another_service()).await;
            }

            self.choose_service_group(&service.group).await?;

            if service.is_mechanical() {
                if self.state.vehicle_details_filled {
                    log.info("Vehicle details already filled, skipping");
                } else {
                    if index > 0 {
                        log.info("Need to fill vehicle details first");
                    }
                    self.fill_vehicle_details().await?;
                }
            }

            if self.choose_service(service).await?.is_some() {
                selected += 1;
            }
        }

        log.info(format!(
            "Added {} of {} services",
            selected,
            booking.services().len()
        ));
        self.click(&selectors::next_step()).await;
        Ok(selected)
    }

    async fn choose_service_group(&mut self, group: &str) -> Result<()> {
        let pacer = self.pacer;
        let log = self.log;
        let groups = selectors::service_groups();

        let available = self.driver.texts(&groups).await?;
        log.info(format!("Service groups: {:?}", available));
        log.info(format!("Choosing service group: {}", group));

        let Some(index) = find_exact(&available, group) else {
            log.error(format!("Service group not found: {}", group));
            return Err(BookingError::ServiceGroupNotFound {
                group: group.to_string(),
                available,
            });
        };

        self.driver.click(&groups.nth(index)).await?;
        pacer.pause(pacer.timing().after_group_click).await;
        Ok(())
    }

    async fn fill_vehicle_details(&mut self) -> Result<()> {
        let pacer = self.pacer;
        let log = self.log;
        let booking = self.booking;
        let request = booking.request();
        let timing = pacer.timing();

        log.info("Filling vehicle details");
        pacer.pause(timing.vehicle_form_open).await;

        let Some(values) = request.vehicle() else {
            log.error("Vehicle details missing for a mechanical service");
            return Err(BookingError::ValidationError {
                message: "manufacturer, model and year are required for mechanical services"
                    .to_string(),
            });
        };
        for (index, value) in values.into_iter().enumerate() {
            actions::fill_dropdown(
                &mut *self.driver,
                pacer,
                log,
                &selectors::vehicle_dropdown(index),
                value,
            )
            .await?;
        }

        self.click(&selectors::vehicle_save()).await;
        pacer.pause(timing.after_vehicle_save).await;
        self.state.vehicle_details_filled = true;
        Ok(())
    }

    /// 在目前展開的服務清單中選擇服務、設定數量並加入
    ///
    /// 頁面上的失敗只記錄不中止，回傳 `None` 表示沒有選到任何服務。
    async fn choose_service(&mut self, service: &ServiceSelection) -> Result<Option<ServiceMatch>> {
        let pacer = self.pacer;
        let log = self.log;
        let booking = self.booking;
        let request = booking.request();
        let (name, quantity) = service_target(service, request)?;

        if let (true, Some(engine)) = (service.is_hu_au(), request.engine_kind) {
            log.info(format!(
                "HU/AU group: selecting '{}' for {:?} engine",
                name, engine
            ));
        }

        let names = selectors::active_service_names();
        let chosen = match self.driver.texts(&names).await {
            Ok(candidates) if !candidates.is_empty() => {
                log.info(format!("Services: {:?}", candidates));
                log.info(format!("Choosing service: {}", name));

                let matched = match_service(&candidates, name);
                match matched {
                    ServiceMatch::Exact(index) => {
                        log.info(format!("Selecting: {}, {}", index, candidates[index]))
                    }
                    ServiceMatch::Fallback => {
                        log.warn("Name not found, selecting first service...")
                    }
                }

                match self.driver.click(&names.nth(matched.index())).await {
                    Ok(()) => Some(matched),
                    Err(e) => {
                        log.error(format!("Failed to select service {}: {}", name, e));
                        None
                    }
                }
            }
            Ok(_) => {
                log.error(format!("Service list is empty, cannot select {}", name));
                None
            }
            Err(e) => {
                log.error(format!("Service name not found: {}", e));
                None
            }
        };

        self.set_quantity(quantity).await;

        self.click(&selectors::add_service()).await;
        pacer.pause(pacer.timing().after_add_service).await;
        Ok(chosen)
    }

    async fn set_quantity(&mut self, quantity: &str) {
        let amount = selectors::service_amount();
        let timeout = self.pacer.timing().quantity_timeout();

        let result = match self.driver.wait_visible(&amount, timeout).await {
            Ok(()) => self.driver.select_option(&amount, quantity).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => self.log.info(format!("Quantity changed to {}", quantity)),
            Err(_) => self.log.warn("Quantity field not found"),
        }
    }
}
