#![allow(dead_code)]

use async_trait::async_trait;
use fleet_booker::core::selectors;
use fleet_booker::domain::model::{BookingRequest, BrowserProfile, ResolvedBooking, ServiceSelection};
use fleet_booker::domain::ports::{
    DriverFactory, DriverResult, PageDriver, Selector, Target,
};
use fleet_booker::utils::error::DriverError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Goto(String),
    Click(String),
    Select { target: String, label: String },
    Focus(String),
    Type(String),
    Enter,
    Screenshot,
    Close,
}

#[derive(Debug, Clone)]
struct FakeElement {
    visible: bool,
    failing_clicks: u32,
    appears_after_enters: u32,
}

#[derive(Debug, Default)]
struct PageState {
    elements: HashMap<String, FakeElement>,
    lists: HashMap<String, Vec<String>>,
    actions: Vec<Action>,
    typed: HashMap<String, String>,
    focused: Option<String>,
    enters: u32,
}

impl PageState {
    fn is_list_item(&self, target: &Target) -> bool {
        self.lists
            .get(&target.selector.to_string())
            .and_then(|items| target.pick.resolve(items.len()))
            .is_some()
    }

    fn is_visible(&self, target: &Target) -> bool {
        match self.elements.get(&target.to_string()) {
            Some(element) => element.visible && self.enters >= element.appears_after_enters,
            None => self.is_list_item(target),
        }
    }

    fn exists(&self, target: &Target) -> bool {
        self.elements.contains_key(&target.to_string()) || self.is_list_item(target)
    }
}

fn not_found(target: &Target) -> DriverError {
    DriverError::ElementNotFound {
        selector: target.to_string(),
    }
}

/// 以字串鍵描述的假網站；`page()` 取得的每個頁面共用同一份狀態
#[derive(Clone, Default)]
pub struct FakeSite {
    state: Arc<Mutex<PageState>>,
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    /// 完整可走完預約流程的頁面
    pub fn workshop() -> Self {
        Self::new()
            .element(&selectors::cookie_accept())
            .element(&selectors::location_search())
            .element(&selectors::branch_entries().first())
            .element(&selectors::more_services())
            .list(
                &selectors::service_groups(),
                &["Ölwechsel", "Inspektion", "HU/AU", "Reifen"],
            )
            .element(&selectors::vehicle_dropdown(0))
            .element(&selectors::vehicle_dropdown(1))
            .element(&selectors::vehicle_dropdown(2))
            .options(&selectors::vehicle_dropdown(0), &["Bitte wählen", "FORD", "VW"])
            .options(&selectors::vehicle_dropdown(1), &["Bitte wählen", "KA", "FIESTA"])
            .options(&selectors::vehicle_dropdown(2), &["Bitte wählen", "2010", "2011"])
            .element(&selectors::vehicle_save())
            .list(
                &selectors::active_service_names(),
                &[
                    "Ölwechsel, inkl. Filter",
                    "Inspektion nach Herstellervorgabe",
                    "HU/AU",
                    "HU für E-Fahrzeuge",
                ],
            )
            .element(&selectors::service_amount())
            .options(&selectors::service_amount(), &["1", "2", "3", "4"])
            .element(&selectors::add_service())
            .element(&selectors::add_another_service())
            .element(&selectors::next_step())
            .options(
                &selectors::date_dropdown(),
                &["Datum wählen", "Mi 11.06.2025", "Do 12.06.2025"],
            )
            .element(&selectors::date_dropdown())
            .element(&selectors::confirm_appointment())
            .element(&selectors::customer_field("firstName"))
            .element(&selectors::customer_field("lastName"))
    }

    fn edit(self, f: impl FnOnce(&mut PageState)) -> Self {
        f(&mut self.state.lock().unwrap());
        self
    }

    pub fn element(self, target: &Target) -> Self {
        let key = target.to_string();
        self.edit(|state| {
            state.elements.insert(
                key,
                FakeElement {
                    visible: true,
                    failing_clicks: 0,
                    appears_after_enters: 0,
                },
            );
        })
    }

    pub fn without(self, target: &Target) -> Self {
        let key = target.to_string();
        self.edit(|state| {
            state.elements.remove(&key);
        })
    }

    pub fn hidden(self, target: &Target) -> Self {
        let key = target.to_string();
        self.edit(|state| {
            if let Some(element) = state.elements.get_mut(&key) {
                element.visible = false;
            }
        })
    }

    /// 前 `failures` 次點擊失敗
    pub fn flaky(self, target: &Target, failures: u32) -> Self {
        let key = target.to_string();
        self.edit(|state| {
            if let Some(element) = state.elements.get_mut(&key) {
                element.failing_clicks = failures;
            }
        })
    }

    /// 元素在按下 Enter `enters` 次之後才出現
    pub fn appears_after_enters(self, target: &Target, enters: u32) -> Self {
        let key = target.to_string();
        self.edit(|state| {
            if let Some(element) = state.elements.get_mut(&key) {
                element.appears_after_enters = enters;
            }
        })
    }

    pub fn list(self, selector: &Selector, items: &[&str]) -> Self {
        let key = selector.to_string();
        let items = items.iter().map(|item| item.to_string()).collect();
        self.edit(|state| {
            state.lists.insert(key, items);
        })
    }

    pub fn options(self, select: &Target, labels: &[&str]) -> Self {
        self.list(&Selector::css("option").within(select.clone()), labels)
    }

    pub fn page(&self) -> FakePage {
        FakePage {
            state: Arc::clone(&self.state),
            load_delay: Duration::ZERO,
            sessions: None,
        }
    }

    pub fn actions(&self) -> Vec<Action> {
        self.state.lock().unwrap().actions.clone()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.actions()
            .into_iter()
            .filter_map(|action| match action {
                Action::Click(target) => Some(target),
                _ => None,
            })
            .collect()
    }

    pub fn selections(&self) -> Vec<(String, String)> {
        self.actions()
            .into_iter()
            .filter_map(|action| match action {
                Action::Select { target, label } => Some((target, label)),
                _ => None,
            })
            .collect()
    }

    pub fn typed(&self, target: &Target) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .typed
            .get(&target.to_string())
            .cloned()
    }

    pub fn count(&self, action: &Action) -> usize {
        self.actions().iter().filter(|a| *a == action).count()
    }

    pub fn enters(&self) -> u32 {
        self.state.lock().unwrap().enters
    }
}

/// 目前開啟中的工作階段數與曾同時開啟的最大值
#[derive(Debug, Default)]
pub struct SessionGauge {
    live: AtomicU32,
    peak: AtomicU32,
}

impl SessionGauge {
    fn open(&self) {
        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(live, Ordering::SeqCst);
    }

    fn close(&self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn live(&self) -> u32 {
        self.live.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> u32 {
        self.peak.load(Ordering::SeqCst)
    }
}

pub struct FakePage {
    state: Arc<Mutex<PageState>>,
    load_delay: Duration,
    sessions: Option<Arc<SessionGauge>>,
}

impl FakePage {
    fn with<T>(&self, f: impl FnOnce(&mut PageState) -> T) -> T {
        f(&mut self.state.lock().unwrap())
    }
}

#[async_trait]
impl PageDriver for FakePage {
    async fn goto(&mut self, url: &str, _timeout: Duration) -> DriverResult<()> {
        if !self.load_delay.is_zero() {
            tokio::time::sleep(self.load_delay).await;
        }
        self.with(|state| state.actions.push(Action::Goto(url.to_string())));
        Ok(())
    }

    async fn texts(&mut self, selector: &Selector) -> DriverResult<Vec<String>> {
        Ok(self.with(|state| {
            state
                .lists
                .get(&selector.to_string())
                .cloned()
                .unwrap_or_default()
        }))
    }

    async fn wait_visible(&mut self, target: &Target, timeout: Duration) -> DriverResult<()> {
        if self.with(|state| state.is_visible(target)) {
            Ok(())
        } else {
            Err(DriverError::Timeout {
                selector: target.to_string(),
                timeout,
            })
        }
    }

    async fn click(&mut self, target: &Target) -> DriverResult<()> {
        self.with(|state| {
            if !state.exists(target) {
                return Err(not_found(target));
            }
            if let Some(element) = state.elements.get_mut(&target.to_string()) {
                if element.failing_clicks > 0 {
                    element.failing_clicks -= 1;
                    return Err(DriverError::WebDriver(format!(
                        "element click intercepted: {}",
                        target
                    )));
                }
            }
            state.actions.push(Action::Click(target.to_string()));
            Ok(())
        })
    }

    async fn select_option(&mut self, target: &Target, label: &str) -> DriverResult<()> {
        self.with(|state| {
            let options_key = Selector::css("option").within(target.clone()).to_string();
            let has_label = state
                .lists
                .get(&options_key)
                .is_some_and(|labels| labels.iter().any(|l| l == label));
            if !state.exists(target) || !has_label {
                return Err(not_found(target));
            }
            state.actions.push(Action::Select {
                target: target.to_string(),
                label: label.to_string(),
            });
            Ok(())
        })
    }

    async fn focus_and_clear(&mut self, target: &Target) -> DriverResult<()> {
        self.with(|state| {
            if !state.exists(target) {
                return Err(not_found(target));
            }
            let key = target.to_string();
            state.typed.insert(key.clone(), String::new());
            state.focused = Some(key.clone());
            state.actions.push(Action::Focus(key));
            Ok(())
        })
    }

    async fn type_text(&mut self, text: &str) -> DriverResult<()> {
        self.with(|state| {
            if let Some(focused) = state.focused.clone() {
                state.typed.entry(focused).or_default().push_str(text);
            }
            state.actions.push(Action::Type(text.to_string()));
            Ok(())
        })
    }

    async fn press_enter(&mut self) -> DriverResult<()> {
        self.with(|state| {
            state.enters += 1;
            state.actions.push(Action::Enter);
        });
        Ok(())
    }

    async fn screenshot(&mut self) -> DriverResult<Vec<u8>> {
        self.with(|state| state.actions.push(Action::Screenshot));
        Ok(b"\x89PNG fake".to_vec())
    }

    async fn close(&mut self) -> DriverResult<()> {
        if let Some(sessions) = self.sessions.take() {
            sessions.close();
        }
        self.with(|state| state.actions.push(Action::Close));
        Ok(())
    }
}

/// 每次啟動回傳共用 `FakeSite` 狀態的新頁面
pub struct FakeFactory {
    site: FakeSite,
    launches: Arc<AtomicU32>,
    failing_launches: AtomicU32,
    load_delay: Duration,
    sessions: Arc<SessionGauge>,
}

impl FakeFactory {
    pub fn new(site: FakeSite) -> Self {
        Self {
            site,
            launches: Arc::new(AtomicU32::new(0)),
            failing_launches: AtomicU32::new(0),
            load_delay: Duration::ZERO,
            sessions: Arc::new(SessionGauge::default()),
        }
    }

    /// 每個頁面載入時多等 `delay`
    pub fn slow(mut self, delay: Duration) -> Self {
        self.load_delay = delay;
        self
    }

    pub fn sessions(&self) -> Arc<SessionGauge> {
        Arc::clone(&self.sessions)
    }

    /// 前 `failures` 次啟動回傳工作階段錯誤
    pub fn failing_first(self, failures: u32) -> Self {
        self.failing_launches.store(failures, Ordering::SeqCst);
        self
    }

    pub fn launch_counter(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.launches)
    }
}

#[async_trait]
impl DriverFactory for FakeFactory {
    async fn launch(&self, _profile: BrowserProfile) -> DriverResult<Box<dyn PageDriver>> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failing_launches.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_launches.store(remaining - 1, Ordering::SeqCst);
            return Err(DriverError::Session("connection refused".to_string()));
        }
        self.sessions.open();
        let mut page = self.site.page();
        page.load_delay = self.load_delay;
        page.sessions = Some(Arc::clone(&self.sessions));
        Ok(Box::new(page))
    }
}

pub fn request(identifiers: &[u64], engine: &str) -> BookingRequest {
    serde_json::from_value(serde_json::json!({
        "pin_code": "64347",
        "id_target": identifiers,
        "target_manufacturer": "FORD",
        "target_model": "KA",
        "target_year": 2011,
        "quantity_amount": 2,
        "target_date": "12.06.2025",
        "engine": engine,
        "your_data": { "firstName": "Max", "lastName": "Muster" },
    }))
    .unwrap()
}

/// 只有非機械類服務需要的欄位：沒有車輛資料、引擎種類與日期
pub fn minimal_request(identifiers: &[u64]) -> BookingRequest {
    serde_json::from_value(serde_json::json!({
        "pin_code": "64347",
        "id_target": identifiers,
        "quantity_amount": "4",
        "your_data": { "firstName": "Max", "lastName": "Muster" },
    }))
    .unwrap()
}

pub fn booking(services: &[(&str, &str)], engine: &str) -> ResolvedBooking {
    let services = services
        .iter()
        .map(|(group, name)| ServiceSelection::new(*group, *name))
        .collect();
    ResolvedBooking::new(request(&[26], engine), services).unwrap()
}
