use crate::domain::model::BrowserProfile;
use crate::utils::error::{BookingError, Result};
use crate::utils::validation::{self, invalid, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub site: SiteConfig,
    pub browser: BrowserConfig,
    pub mapping: MappingConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub timing: TimingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    pub default_profile: BrowserProfile,
    #[serde(default = "default_headless")]
    pub headless: bool,
    #[serde(default = "default_firefox_url")]
    pub firefox_webdriver_url: String,
    #[serde(default = "default_chromium_url")]
    pub chromium_webdriver_url: String,
    pub chromium_binary: Option<String>,
    pub user_agent: Option<String>,
}

impl BrowserConfig {
    pub fn webdriver_url(&self, profile: BrowserProfile) -> &str {
        match profile {
            BrowserProfile::Firefox => &self.firefox_webdriver_url,
            BrowserProfile::Chromium => &self.chromium_webdriver_url,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingConfig {
    pub file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub logs_dir: String,
    pub screenshots_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
    pub max_concurrent_runs: usize,
    pub job_retention_hours: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

/// 隨機延遲的範圍（毫秒），取值於 `[min_ms, max_ms)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const fn millis(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    pub const fn secs(min: u64, max: u64) -> Self {
        Self::millis(min * 1000, max * 1000)
    }

    pub const fn zero() -> Self {
        Self::millis(0, 0)
    }
}

/// 所有等待與逾時設定；預設值模擬真人操作的節奏
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub branch_lead_in: DelayRange,
    pub services_lead_in: DelayRange,
    pub appointment_lead_in: DelayRange,
    pub customer_lead_in: DelayRange,
    pub click_jitter: DelayRange,
    pub search_keystroke: DelayRange,
    pub form_keystroke: DelayRange,
    pub after_group_click: DelayRange,
    pub after_add_service: DelayRange,
    pub vehicle_form_open: DelayRange,
    pub after_dropdown: DelayRange,
    pub after_vehicle_save: DelayRange,
    pub after_date_select: DelayRange,
    pub branch_settle_ms: u64,
    pub click_visible_timeout_ms: u64,
    pub branch_results_timeout_ms: u64,
    pub quantity_timeout_ms: u64,
    pub navigation_timeout_ms: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_seconds: 10,
            max_concurrent_runs: 2,
            job_retention_hours: 24,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            branch_lead_in: DelayRange::secs(2, 5),
            services_lead_in: DelayRange::secs(3, 6),
            appointment_lead_in: DelayRange::secs(4, 6),
            customer_lead_in: DelayRange::secs(2, 4),
            click_jitter: DelayRange::secs(1, 3),
            search_keystroke: DelayRange::millis(100, 500),
            form_keystroke: DelayRange::millis(100, 400),
            after_group_click: DelayRange::secs(2, 5),
            after_add_service: DelayRange::secs(2, 5),
            vehicle_form_open: DelayRange::secs(2, 3),
            after_dropdown: DelayRange::secs(2, 6),
            after_vehicle_save: DelayRange::secs(3, 6),
            after_date_select: DelayRange::secs(5, 10),
            branch_settle_ms: 500,
            click_visible_timeout_ms: 5_000,
            branch_results_timeout_ms: 30_000,
            quantity_timeout_ms: 5_000,
            navigation_timeout_ms: 60_000,
        }
    }
}

impl TimingConfig {
    /// 不等待的設定，用於測試與模擬頁面
    pub fn instant() -> Self {
        Self {
            branch_lead_in: DelayRange::zero(),
            services_lead_in: DelayRange::zero(),
            appointment_lead_in: DelayRange::zero(),
            customer_lead_in: DelayRange::zero(),
            click_jitter: DelayRange::zero(),
            search_keystroke: DelayRange::zero(),
            form_keystroke: DelayRange::zero(),
            after_group_click: DelayRange::zero(),
            after_add_service: DelayRange::zero(),
            vehicle_form_open: DelayRange::zero(),
            after_dropdown: DelayRange::zero(),
            after_vehicle_save: DelayRange::zero(),
            after_date_select: DelayRange::zero(),
            branch_settle_ms: 0,
            ..Self::default()
        }
    }

    pub fn click_visible_timeout(&self) -> Duration {
        Duration::from_millis(self.click_visible_timeout_ms)
    }

    pub fn branch_results_timeout(&self) -> Duration {
        Duration::from_millis(self.branch_results_timeout_ms)
    }

    pub fn quantity_timeout(&self) -> Duration {
        Duration::from_millis(self.quantity_timeout_ms)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    fn ranges(&self) -> [(&'static str, DelayRange); 13] {
        [
            ("timing.branch_lead_in", self.branch_lead_in),
            ("timing.services_lead_in", self.services_lead_in),
            ("timing.appointment_lead_in", self.appointment_lead_in),
            ("timing.customer_lead_in", self.customer_lead_in),
            ("timing.click_jitter", self.click_jitter),
            ("timing.search_keystroke", self.search_keystroke),
            ("timing.form_keystroke", self.form_keystroke),
            ("timing.after_group_click", self.after_group_click),
            ("timing.after_add_service", self.after_add_service),
            ("timing.vehicle_form_open", self.vehicle_form_open),
            ("timing.after_dropdown", self.after_dropdown),
            ("timing.after_vehicle_save", self.after_vehicle_save),
            ("timing.after_date_select", self.after_date_select),
        ]
    }
}

/// 每次重試都會重開瀏覽器，上限避免單一工作佔住執行槽太久
const MAX_RETRIES: u32 = 10;

fn default_headless() -> bool {
    true
}

fn default_firefox_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_chromium_url() -> String {
    "http://localhost:9515".to_string()
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(BookingError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| BookingError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${WEBDRIVER_URL})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| BookingError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 指定瀏覽器設定檔對應的 WebDriver 位址
    pub fn webdriver_url(&self, profile: BrowserProfile) -> &str {
        self.browser.webdriver_url(profile)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.runner.retry_delay_seconds)
    }

    pub fn job_retention(&self) -> Duration {
        Duration::from_secs(self.runner.job_retention_hours * 60 * 60)
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_site_url("site.base_url", &self.site.base_url)?;
        validation::validate_webdriver_url(
            "browser.firefox_webdriver_url",
            &self.browser.firefox_webdriver_url,
        )?;
        validation::validate_webdriver_url(
            "browser.chromium_webdriver_url",
            &self.browser.chromium_webdriver_url,
        )?;
        if let Some(binary) = &self.browser.chromium_binary {
            if !Path::new(binary).is_file() {
                return Err(invalid(
                    "browser.chromium_binary",
                    binary,
                    "Browser binary does not exist",
                ));
            }
        }

        validation::validate_mapping_file("mapping.file", Path::new(&self.mapping.file))?;
        validation::validate_output_dir("output.logs_dir", &self.output.logs_dir)?;
        validation::validate_output_dir("output.screenshots_dir", &self.output.screenshots_dir)?;

        if self.runner.max_retries > MAX_RETRIES {
            return Err(invalid(
                "runner.max_retries",
                self.runner.max_retries,
                format!("At most {} retries are allowed", MAX_RETRIES),
            ));
        }
        if self.runner.max_concurrent_runs == 0 {
            return Err(invalid(
                "runner.max_concurrent_runs",
                0,
                "At least one run must be allowed",
            ));
        }
        validation::validate_bind_addr("server.bind", &self.server.bind)?;

        for (field, range) in self.timing.ranges() {
            if range.min_ms > range.max_ms {
                return Err(invalid(
                    field,
                    format!("{}..{}", range.min_ms, range.max_ms),
                    "min_ms must not exceed max_ms",
                ));
            }
        }

        Ok(())
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
