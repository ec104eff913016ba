//! 預約精靈頁面上的元素位置

use crate::domain::ports::{Selector, Target};

pub fn cookie_accept() -> Target {
    Selector::css("button").has_text("Alle akzeptieren").first()
}

pub fn location_search() -> Target {
    Selector::css("#locationSearchInput").first()
}

pub fn branch_entries() -> Selector {
    Selector::css(".branch-list-entry")
}

pub fn more_services() -> Target {
    Selector::css(".more-entries").first()
}

pub fn service_groups() -> Selector {
    Selector::css(".service-name.group")
}

/// 車輛資料表單中的第 `index` 個下拉選單（廠牌、車型、年份）
pub fn vehicle_dropdown(index: usize) -> Target {
    Selector::css("select").nth(index)
}

pub fn vehicle_save() -> Target {
    Selector::text("Speichern und weiter").first()
}

/// 最後展開的服務清單中的服務名稱
pub fn active_service_names() -> Selector {
    Selector::css("h3.service-name").within(Selector::css(".service-list").last())
}

pub fn service_amount() -> Target {
    Selector::css("select[name=\"service-amount\"]").first()
}

pub fn add_service() -> Target {
    Selector::css(".btn.btn-primary.btn-addService").first()
}

pub fn add_another_service() -> Target {
    Selector::text("Service hinzufügen").first()
}

pub fn next_step() -> Target {
    Selector::css(".btn.btn-primary.next").first()
}

pub fn date_dropdown() -> Target {
    Selector::css("select[aria-label=\"Tagauswahl\"]").first()
}

pub fn confirm_appointment() -> Target {
    Selector::css(".btn.btn-primary.btn-big").first()
}

pub fn customer_field(id: &str) -> Target {
    Selector::css(format!("#{}", id)).first()
}
