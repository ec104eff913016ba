use crate::utils::error::{BookingError, Result};
use crate::utils::validation::{validate_postal_code, Validate};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// 需要先填寫車輛資料（廠牌 / 車型 / 年份）的服務群組
pub const MECHANICAL_GROUPS: [&str; 6] = [
    "Ölwechsel",
    "Inspektion",
    "Achsvermessung",
    "Bremsen",
    "Fahrwerk",
    "Zahnriemen",
];

pub const HU_AU_GROUP: &str = "HU/AU";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Electric,
    Fuel,
}

impl EngineKind {
    /// HU/AU 群組下依引擎種類固定選擇的服務名稱
    pub fn hu_au_label(&self) -> &'static str {
        match self {
            EngineKind::Electric => "HU für E-Fahrzeuge",
            EngineKind::Fuel => "HU/AU",
        }
    }
}

/// 預約請求，欄位名稱同時接受舊版 JSON 的命名
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequest {
    #[serde(alias = "pin_code")]
    pub postal_code: String,

    #[serde(alias = "id_target")]
    pub identifiers: Vec<u64>,

    #[serde(alias = "target_manufacturer", default)]
    pub manufacturer: Option<String>,

    #[serde(alias = "target_model", default)]
    pub model: Option<String>,

    #[serde(
        alias = "target_year",
        deserialize_with = "optional_string_or_number",
        default
    )]
    pub year: Option<String>,

    #[serde(
        alias = "quantity_amount",
        deserialize_with = "string_or_number",
        default = "default_quantity"
    )]
    pub quantity: String,

    #[serde(alias = "target_date", default)]
    pub preferred_date: Option<String>,

    #[serde(alias = "engine", default)]
    pub engine_kind: Option<EngineKind>,

    #[serde(alias = "your_data", default)]
    pub customer_fields: IndexMap<String, String>,
}

fn default_quantity() -> String {
    "1".to_string()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Text(String),
    Integer(i64),
}

impl From<StringOrNumber> for String {
    fn from(raw: StringOrNumber) -> Self {
        match raw {
            StringOrNumber::Text(text) => text,
            StringOrNumber::Integer(n) => n.to_string(),
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    StringOrNumber::deserialize(deserializer).map(String::from)
}

fn optional_string_or_number<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<StringOrNumber>::deserialize(deserializer)?.map(String::from))
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl BookingRequest {
    /// 車輛下拉選單要填的 [廠牌, 車型, 年份]；任一欄缺少或空白時為 `None`
    pub fn vehicle(&self) -> Option<[&str; 3]> {
        Some([
            present(&self.manufacturer)?,
            present(&self.model)?,
            present(&self.year)?,
        ])
    }

    /// 去除重複、保留原始順序的識別碼
    pub fn unique_identifiers(&self) -> Vec<u64> {
        let mut seen = Vec::with_capacity(self.identifiers.len());
        for id in &self.identifiers {
            if !seen.contains(id) {
                seen.push(*id);
            }
        }
        seen
    }
}

impl Validate for BookingRequest {
    fn validate(&self) -> Result<()> {
        validate_postal_code(&self.postal_code)?;
        if self.identifiers.is_empty() {
            return Err(BookingError::Resolution {
                identifiers: Vec::new(),
            });
        }
        Ok(())
    }
}

/// 對照表中的一筆 (服務群組, 服務名稱)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSelection {
    pub group: String,
    pub name: String,
}

impl ServiceSelection {
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
        }
    }

    pub fn is_mechanical(&self) -> bool {
        MECHANICAL_GROUPS.contains(&self.group.as_str())
    }

    pub fn is_hu_au(&self) -> bool {
        self.group == HU_AU_GROUP
    }
}

/// 已完成服務解析的請求
///
/// 建立後 `services` 保證不為空；含機械類服務時車輛資料齊全，含 HU/AU 時
/// 引擎種類已知。
#[derive(Debug, Clone)]
pub struct ResolvedBooking {
    request: BookingRequest,
    services: Vec<ServiceSelection>,
}

impl ResolvedBooking {
    pub fn new(request: BookingRequest, services: Vec<ServiceSelection>) -> Result<Self> {
        if services.is_empty() {
            return Err(BookingError::Resolution {
                identifiers: request.identifiers.clone(),
            });
        }
        if services.iter().any(ServiceSelection::is_mechanical) && request.vehicle().is_none() {
            return Err(BookingError::ValidationError {
                message: "manufacturer, model and year are required for mechanical services"
                    .to_string(),
            });
        }
        if services.iter().any(ServiceSelection::is_hu_au) && request.engine_kind.is_none() {
            return Err(BookingError::ValidationError {
                message: "engine_kind is required for HU/AU services".to_string(),
            });
        }
        Ok(Self { request, services })
    }

    pub fn request(&self) -> &BookingRequest {
        &self.request
    }

    pub fn services(&self) -> &[ServiceSelection] {
        &self.services
    }

    pub fn service_groups(&self) -> Vec<&str> {
        self.services.iter().map(|s| s.group.as_str()).collect()
    }

    pub fn service_names(&self) -> Vec<&str> {
        self.services.iter().map(|s| s.name.as_str()).collect()
    }
}

/// 流程內部狀態，只存活於單次執行
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunState {
    pub vehicle_details_filled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserProfile {
    Firefox,
    Chromium,
}

impl FromStr for BrowserProfile {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "firefox" | "camoufox" => Ok(BrowserProfile::Firefox),
            "chromium" | "chrome" | "opera" => Ok(BrowserProfile::Chromium),
            other => Err(BookingError::ValidationError {
                message: format!("Unsupported browser type: {}", other),
            }),
        }
    }
}

impl fmt::Display for BrowserProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrowserProfile::Firefox => write!(f, "firefox"),
            BrowserProfile::Chromium => write!(f, "chromium"),
        }
    }
}

/// 交給執行器的一個工作
#[derive(Debug, Clone)]
pub struct JobSubmission {
    pub run_id: String,
    pub request: BookingRequest,
    pub profile: BrowserProfile,
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEGACY_JSON: &str = r#"{
        "pin_code": "64347",
        "id_target": [26],
        "target_service_group": [],
        "service_name": [],
        "target_manufacturer": "FORD",
        "target_model": "KA",
        "target_year": "2011",
        "quantity_amount": "1",
        "target_date": "12.06.2025",
        "engine": "electric",
        "your_data": {
            "firstName": "Dominik",
            "lastName": "Skakuj",
            "email": "dominik@example.com",
            "Erreichbarkeit": ""
        }
    }"#;

    #[test]
    fn test_parse_legacy_field_names() {
        let request: BookingRequest = serde_json::from_str(LEGACY_JSON).unwrap();

        assert_eq!(request.postal_code, "64347");
        assert_eq!(request.identifiers, vec![26]);
        assert_eq!(request.manufacturer.as_deref(), Some("FORD"));
        assert_eq!(request.year.as_deref(), Some("2011"));
        assert_eq!(request.engine_kind, Some(EngineKind::Electric));
        assert_eq!(request.vehicle(), Some(["FORD", "KA", "2011"]));

        let keys: Vec<&str> = request.customer_fields.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["firstName", "lastName", "email", "Erreichbarkeit"]);
    }

    #[test]
    fn test_parse_numeric_quantity_and_year() {
        let json = r#"{
            "postal_code": "10115",
            "identifiers": [1, 2],
            "manufacturer": "VW",
            "model": "Golf",
            "year": 2019,
            "quantity": 4,
            "preferred_date": "01.07.2025",
            "engine_kind": "fuel"
        }"#;
        let request: BookingRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.quantity, "4");
        assert_eq!(request.year.as_deref(), Some("2019"));
        assert_eq!(request.engine_kind, Some(EngineKind::Fuel));
        assert!(request.customer_fields.is_empty());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_vehicle_and_date_fields_are_optional() {
        let json = r#"{
            "pin_code": "64347",
            "id_target": [40],
            "quantity_amount": "4",
            "target_date": "12.06.2025",
            "your_data": { "firstName": "Max", "lastName": "Muster" }
        }"#;
        let request: BookingRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.manufacturer, None);
        assert_eq!(request.year, None);
        assert_eq!(request.engine_kind, None);
        assert_eq!(request.vehicle(), None);
        assert_eq!(request.quantity, "4");
        assert!(request.validate().is_ok());

        let request: BookingRequest = serde_json::from_str(
            r#"{"postal_code": "64347", "identifiers": [40], "year": null}"#,
        )
        .unwrap();
        assert_eq!(request.preferred_date, None);
        assert_eq!(request.quantity, "1");
    }

    #[test]
    fn test_blank_vehicle_field_counts_as_missing() {
        let mut request: BookingRequest = serde_json::from_str(LEGACY_JSON).unwrap();
        request.model = Some("  ".to_string());
        assert_eq!(request.vehicle(), None);
    }

    #[test]
    fn test_empty_identifiers_is_a_resolution_error() {
        let mut request: BookingRequest = serde_json::from_str(LEGACY_JSON).unwrap();
        request.identifiers.clear();

        let err = request.validate().unwrap_err();
        assert!(matches!(err, BookingError::Resolution { ref identifiers } if identifiers.is_empty()));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_resolved_booking_requires_what_its_groups_need() {
        let request: BookingRequest = serde_json::from_str(
            r#"{"postal_code": "64347", "identifiers": [40]}"#,
        )
        .unwrap();

        let tyres = vec![ServiceSelection::new("Reifen", "Reifenwechsel")];
        assert!(ResolvedBooking::new(request.clone(), tyres).is_ok());

        let oil = vec![ServiceSelection::new("Ölwechsel", "Ölwechsel inkl. Filter")];
        let err = ResolvedBooking::new(request.clone(), oil).unwrap_err();
        assert!(matches!(err, BookingError::ValidationError { ref message } if message.contains("manufacturer")));

        let hu_au = vec![ServiceSelection::new("HU/AU", "HU/AU")];
        let err = ResolvedBooking::new(request, hu_au).unwrap_err();
        assert!(matches!(err, BookingError::ValidationError { ref message } if message.contains("engine_kind")));
    }

    #[test]
    fn test_unique_identifiers_keeps_order() {
        let mut request: BookingRequest = serde_json::from_str(LEGACY_JSON).unwrap();
        request.identifiers = vec![30, 26, 30, 12, 26];
        assert_eq!(request.unique_identifiers(), vec![30, 26, 12]);
    }

    #[test]
    fn test_resolved_booking_requires_services() {
        let request: BookingRequest = serde_json::from_str(LEGACY_JSON).unwrap();
        let err = ResolvedBooking::new(request.clone(), vec![]).unwrap_err();
        assert!(matches!(err, BookingError::Resolution { .. }));

        let resolved = ResolvedBooking::new(
            request,
            vec![
                ServiceSelection::new("Ölwechsel", "Ölwechsel Standard"),
                ServiceSelection::new("HU/AU", "HU/AU"),
            ],
        )
        .unwrap();
        assert_eq!(resolved.service_groups(), vec!["Ölwechsel", "HU/AU"]);
        assert_eq!(resolved.service_names(), vec!["Ölwechsel Standard", "HU/AU"]);
    }

    #[test]
    fn test_mechanical_and_hu_au_groups() {
        assert!(ServiceSelection::new("Bremsen", "x").is_mechanical());
        assert!(!ServiceSelection::new("Reifen", "x").is_mechanical());
        assert!(ServiceSelection::new("HU/AU", "x").is_hu_au());
        assert_eq!(EngineKind::Electric.hu_au_label(), "HU für E-Fahrzeuge");
        assert_eq!(EngineKind::Fuel.hu_au_label(), "HU/AU");
    }

    #[test]
    fn test_browser_profile_aliases() {
        assert_eq!("Camoufox".parse::<BrowserProfile>().unwrap(), BrowserProfile::Firefox);
        assert_eq!("Opera".parse::<BrowserProfile>().unwrap(), BrowserProfile::Chromium);
        assert_eq!("chrome".parse::<BrowserProfile>().unwrap(), BrowserProfile::Chromium);
        assert!("safari".parse::<BrowserProfile>().is_err());
    }
}
