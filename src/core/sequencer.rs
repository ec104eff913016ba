use crate::core::actions::{self, ClickOutcome};
use crate::core::pacing::Pacer;
use crate::core::text::DateChoice;
use crate::domain::model::{ResolvedBooking, RunState};
use crate::domain::ports::{PageDriver, Target};
use crate::utils::error::Result;
use crate::utils::logger::RunLog;
use std::fmt;

/// 預約精靈的階段，依序執行且不可跳過
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Navigation,
    BranchSelection,
    ServiceSelection,
    AppointmentSelection,
    CustomerData,
    Screenshot,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Navigation => "Navigation",
            Stage::BranchSelection => "Branch Selection",
            Stage::ServiceSelection => "Service Selection",
            Stage::AppointmentSelection => "Appointment Selection",
            Stage::CustomerData => "Your Data Section",
            Stage::Screenshot => "Screenshot",
        };
        write!(f, "{}", name)
    }
}

/// 一次成功執行的結果
#[derive(Debug, Clone)]
pub struct BookingOutcome {
    pub screenshot: Vec<u8>,
    pub services_selected: usize,
    pub vehicle_details_filled: bool,
    pub date_choice: Option<DateChoice>,
}

/// 驅動預約精靈的狀態機
///
/// 每次執行建立一個實例；頁面操作介面由呼叫端持有並負責關閉。
pub struct BookingSequencer<'a> {
    pub(crate) driver: &'a mut dyn PageDriver,
    pub(crate) booking: &'a ResolvedBooking,
    pub(crate) pacer: &'a Pacer,
    pub(crate) log: &'a RunLog,
    pub(crate) state: RunState,
    base_url: &'a str,
    stage: Stage,
    services_selected: usize,
    date_choice: Option<DateChoice>,
}

impl<'a> BookingSequencer<'a> {
    pub fn new(
        driver: &'a mut dyn PageDriver,
        booking: &'a ResolvedBooking,
        base_url: &'a str,
        pacer: &'a Pacer,
        log: &'a RunLog,
    ) -> Self {
        Self {
            driver,
            booking,
            pacer,
            log,
            state: RunState::default(),
            base_url,
            stage: Stage::Navigation,
            services_selected: 0,
            date_choice: None,
        }
    }

    pub async fn run(mut self) -> Result<BookingOutcome> {
        match self.run_stages().await {
            Ok(screenshot) => {
                self.log.info("Script completed.");
                Ok(BookingOutcome {
                    screenshot,
                    services_selected: self.services_selected,
                    vehicle_details_filled: self.state.vehicle_details_filled,
                    date_choice: self.date_choice,
                })
            }
            Err(e) => {
                self.log
                    .error(format!("Run aborted during {}: {}", self.stage, e));
                Err(e)
            }
        }
    }

    async fn run_stages(&mut self) -> Result<Vec<u8>> {
        self.log.info("Starting booking automation...");
        let timeout = self.pacer.timing().navigation_timeout();
        self.driver.goto(self.base_url, timeout).await?;
        self.log.info("Page loaded successfully");

        self.enter(Stage::BranchSelection);
        self.select_branch().await?;

        self.enter(Stage::ServiceSelection);
        self.services_selected = self.select_services().await?;

        self.enter(Stage::AppointmentSelection);
        self.date_choice = self.select_appointment().await;

        self.enter(Stage::CustomerData);
        self.enter_customer_data().await?;

        self.enter(Stage::Screenshot);
        let screenshot = self.driver.screenshot().await?;
        self.log
            .info(format!("Captured full-page screenshot ({} bytes)", screenshot.len()));
        Ok(screenshot)
    }

    fn enter(&mut self, stage: Stage) {
        self.stage = stage;
        self.log.info(format!("###### {} ######", stage));
    }

    pub(crate) async fn click(&mut self, target: &Target) -> ClickOutcome {
        actions::resilient_click(&mut *self.driver, self.pacer, self.log, target).await
    }
}
