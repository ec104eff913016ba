use crate::config::BrowserConfig;
use crate::domain::model::BrowserProfile;
use crate::domain::ports::{DriverFactory, DriverResult, PageDriver, Query, Selector, Target};
use crate::utils::error::DriverError;
use async_trait::async_trait;
use fantoccini::elements::Element;
use fantoccini::error::CmdError;
use fantoccini::key::Key;
use fantoccini::wd::Capabilities;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;

const VISIBILITY_POLL: Duration = Duration::from_millis(100);

const PAGE_SIZE_SCRIPT: &str = "return [\
    document.documentElement.scrollWidth, \
    document.documentElement.scrollHeight];";

fn webdriver_error(e: CmdError) -> DriverError {
    DriverError::WebDriver(e.to_string())
}

/// 把字串轉成 XPath 字面值，處理同時含有單引號與雙引號的情況
pub fn xpath_literal(text: &str) -> String {
    if !text.contains('\'') {
        return format!("'{}'", text);
    }
    if !text.contains('"') {
        return format!("\"{}\"", text);
    }
    let parts: Vec<String> = text.split('\'').map(|part| format!("'{}'", part)).collect();
    format!("concat({})", parts.join(", \"'\", "))
}

/// 直接文字節點包含 `text` 的元素
pub fn text_xpath(text: &str, scoped: bool) -> String {
    let prefix = if scoped { "." } else { "" };
    format!(
        "{}//*[text()[contains(normalize-space(.), {})]]",
        prefix,
        xpath_literal(text)
    )
}

/// 下拉選單中正規化空白後文字等於 `label` 的 `<option>`
pub fn option_xpath(label: &str) -> String {
    let label = label.split_whitespace().collect::<Vec<_>>().join(" ");
    format!(".//option[normalize-space(.)={}]", xpath_literal(&label))
}

/// 依作業系統列出 Opera 常見的安裝位置
pub fn opera_candidates() -> Vec<PathBuf> {
    if cfg!(target_os = "windows") {
        let mut paths = Vec::new();
        if let Ok(local) = std::env::var("LOCALAPPDATA") {
            paths.push(Path::new(&local).join("Programs").join("Opera").join("opera.exe"));
        }
        paths.push(PathBuf::from(r"C:\Program Files\Opera\opera.exe"));
        paths.push(PathBuf::from(r"C:\Program Files (x86)\Opera\opera.exe"));
        paths
    } else if cfg!(target_os = "macos") {
        vec![PathBuf::from("/Applications/Opera.app/Contents/MacOS/Opera")]
    } else {
        ["/usr/bin/opera", "/usr/local/bin/opera", "/snap/bin/opera"]
            .iter()
            .map(PathBuf::from)
            .collect()
    }
}

/// 第一個存在的候選路徑
pub fn find_opera_binary(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates.iter().find(|path| path.is_file()).cloned()
}

/// 以 WebDriver 工作階段實作的頁面操作
pub struct WebDriverPage {
    client: Client,
    closed: bool,
}

impl WebDriverPage {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            closed: false,
        }
    }

    async fn find_in(
        &self,
        parent: Option<&Element>,
        selector: &Selector,
    ) -> DriverResult<Vec<Element>> {
        let found = match &selector.query {
            Query::Css(css) => match parent {
                Some(parent) => parent.find_all(Locator::Css(css)).await,
                None => self.client.find_all(Locator::Css(css)).await,
            },
            Query::Text(text) => {
                let xpath = text_xpath(text, parent.is_some());
                match parent {
                    Some(parent) => parent.find_all(Locator::XPath(&xpath)).await,
                    None => self.client.find_all(Locator::XPath(&xpath)).await,
                }
            }
        }
        .map_err(webdriver_error)?;

        let Some(needle) = &selector.has_text else {
            return Ok(found);
        };

        let mut filtered = Vec::with_capacity(found.len());
        for element in found {
            if text_content(&element).await?.contains(needle.as_str()) {
                filtered.push(element);
            }
        }
        Ok(filtered)
    }

    /// 由外而內解析限定範圍，回傳所有符合的元素
    async fn locate_all(&self, selector: &Selector) -> DriverResult<Vec<Element>> {
        let mut scopes = Vec::new();
        let mut scope = selector.scope.as_deref();
        while let Some(target) = scope {
            scopes.push(target);
            scope = target.selector.scope.as_deref();
        }

        let mut parent: Option<Element> = None;
        for target in scopes.into_iter().rev() {
            let mut found = self.find_in(parent.as_ref(), &target.selector).await?;
            let index = target
                .pick
                .resolve(found.len())
                .ok_or_else(|| DriverError::ElementNotFound {
                    selector: target.to_string(),
                })?;
            parent = Some(found.swap_remove(index));
        }

        self.find_in(parent.as_ref(), selector).await
    }

    async fn locate(&self, target: &Target) -> DriverResult<Element> {
        let mut found = self.locate_all(&target.selector).await?;
        match target.pick.resolve(found.len()) {
            Some(index) => Ok(found.swap_remove(index)),
            None => Err(DriverError::ElementNotFound {
                selector: target.to_string(),
            }),
        }
    }

    async fn page_size(&self) -> DriverResult<(u32, u32)> {
        let value = self
            .client
            .execute(PAGE_SIZE_SCRIPT, vec![])
            .await
            .map_err(webdriver_error)?;

        let dimension = |index: usize| value.get(index).and_then(Value::as_u64);
        match (dimension(0), dimension(1)) {
            (Some(width), Some(height)) => Ok((width as u32, height as u32)),
            _ => Err(DriverError::WebDriver(format!(
                "Unexpected page size result: {}",
                value
            ))),
        }
    }
}

async fn text_content(element: &Element) -> DriverResult<String> {
    let text = element
        .prop("textContent")
        .await
        .map_err(webdriver_error)?
        .unwrap_or_default();
    Ok(text.trim().to_string())
}

#[async_trait]
impl PageDriver for WebDriverPage {
    async fn goto(&mut self, url: &str, timeout: Duration) -> DriverResult<()> {
        match tokio::time::timeout(timeout, self.client.goto(url)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(DriverError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            }),
            Err(_) => Err(DriverError::Navigation {
                url: url.to_string(),
                message: format!("timed out after {:?}", timeout),
            }),
        }
    }

    async fn texts(&mut self, selector: &Selector) -> DriverResult<Vec<String>> {
        let elements = match self.locate_all(selector).await {
            Ok(elements) => elements,
            // 外層範圍不存在時視為沒有符合的元素
            Err(DriverError::ElementNotFound { .. }) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut texts = Vec::with_capacity(elements.len());
        for element in &elements {
            texts.push(text_content(element).await?);
        }
        Ok(texts)
    }

    async fn wait_visible(&mut self, target: &Target, timeout: Duration) -> DriverResult<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Ok(element) = self.locate(target).await {
                if element.is_displayed().await.unwrap_or(false) {
                    return Ok(());
                }
            }
            if Instant::now() >= deadline {
                return Err(DriverError::Timeout {
                    selector: target.to_string(),
                    timeout,
                });
            }
            tokio::time::sleep(VISIBILITY_POLL).await;
        }
    }

    async fn click(&mut self, target: &Target) -> DriverResult<()> {
        let element = self.locate(target).await?;
        element.click().await.map_err(webdriver_error)
    }

    async fn select_option(&mut self, target: &Target, label: &str) -> DriverResult<()> {
        let select = self.locate(target).await?;
        let option = select
            .find(Locator::XPath(&option_xpath(label)))
            .await
            .map_err(|e| {
                if e.is_no_such_element() {
                    DriverError::ElementNotFound {
                        selector: format!("{} >> option={:?}", target, label),
                    }
                } else {
                    webdriver_error(e)
                }
            })?;
        option.click().await.map_err(webdriver_error)
    }

    async fn focus_and_clear(&mut self, target: &Target) -> DriverResult<()> {
        let element = self.locate(target).await?;
        element.click().await.map_err(webdriver_error)?;
        element.clear().await.map_err(webdriver_error)
    }

    async fn type_text(&mut self, text: &str) -> DriverResult<()> {
        let element = self.client.active_element().await.map_err(webdriver_error)?;
        element.send_keys(text).await.map_err(webdriver_error)
    }

    async fn press_enter(&mut self) -> DriverResult<()> {
        let enter = char::from(Key::Enter).to_string();
        self.type_text(&enter).await
    }

    async fn screenshot(&mut self) -> DriverResult<Vec<u8>> {
        let original = self.client.get_window_size().await.ok();
        match self.page_size().await {
            Ok((width, height)) => {
                if let Err(e) = self.client.set_window_size(width, height).await {
                    tracing::debug!("Could not resize window for full-page screenshot: {}", e);
                }
            }
            Err(e) => tracing::debug!("Could not measure page size: {}", e),
        }

        let png = self.client.screenshot().await.map_err(webdriver_error)?;

        if let Some((width, height)) = original {
            if let Err(e) = self
                .client
                .set_window_size(width as u32, height as u32)
                .await
            {
                tracing::debug!("Could not restore window size: {}", e);
            }
        }
        Ok(png)
    }

    async fn close(&mut self) -> DriverResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.client
            .clone()
            .close()
            .await
            .map_err(|e| DriverError::Session(e.to_string()))
    }
}

/// 依瀏覽器設定檔連線到對應的 WebDriver 服務
pub struct WebDriverFactory {
    browser: BrowserConfig,
    http: reqwest::Client,
}

impl WebDriverFactory {
    pub fn new(browser: BrowserConfig) -> Self {
        Self::with_opera_candidates(browser, &opera_candidates())
    }

    /// 未設定 `chromium_binary` 時，從 `candidates` 中尋找 Opera；找不到就用 Chromium
    pub fn with_opera_candidates(mut browser: BrowserConfig, candidates: &[PathBuf]) -> Self {
        if browser.chromium_binary.is_none() {
            match find_opera_binary(candidates) {
                Some(path) => {
                    tracing::info!("Opera path found: {}", path.display());
                    browser.chromium_binary = Some(path.display().to_string());
                }
                None => tracing::warn!("Opera path not found, falling back to Chromium"),
            }
        }

        Self {
            browser,
            http: reqwest::Client::new(),
        }
    }

    pub fn capabilities(&self, profile: BrowserProfile) -> Capabilities {
        let mut caps = Capabilities::new();

        match profile {
            BrowserProfile::Firefox => {
                let mut args = Vec::new();
                if self.browser.headless {
                    args.push("-headless".to_string());
                }
                let mut prefs = serde_json::Map::new();
                prefs.insert("dom.webdriver.enabled".to_string(), json!(false));
                if let Some(user_agent) = &self.browser.user_agent {
                    prefs.insert(
                        "general.useragent.override".to_string(),
                        json!(user_agent),
                    );
                }
                caps.insert("browserName".to_string(), json!("firefox"));
                caps.insert(
                    "moz:firefoxOptions".to_string(),
                    json!({ "args": args, "prefs": prefs }),
                );
            }
            BrowserProfile::Chromium => {
                let mut args = vec![
                    "--no-sandbox".to_string(),
                    "--disable-blink-features=AutomationControlled".to_string(),
                ];
                if self.browser.headless {
                    args.push("--headless=new".to_string());
                    args.push("--disable-gpu".to_string());
                    args.push("--disable-dev-shm-usage".to_string());
                }
                if let Some(user_agent) = &self.browser.user_agent {
                    args.push(format!("--user-agent={}", user_agent));
                }

                let mut options = serde_json::Map::new();
                options.insert("args".to_string(), json!(args));
                options.insert("excludeSwitches".to_string(), json!(["enable-automation"]));
                if let Some(binary) = &self.browser.chromium_binary {
                    options.insert("binary".to_string(), json!(binary));
                }
                caps.insert("browserName".to_string(), json!("chrome"));
                caps.insert("goog:chromeOptions".to_string(), Value::Object(options));
            }
        }

        caps
    }

    /// 確認 WebDriver 服務可用
    pub async fn check_ready(&self, webdriver_url: &str) -> DriverResult<()> {
        let status_url = format!("{}/status", webdriver_url.trim_end_matches('/'));
        let response = self
            .http
            .get(&status_url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map_err(|e| {
                DriverError::Session(format!("WebDriver at {} unreachable: {}", webdriver_url, e))
            })?;

        if !response.status().is_success() {
            return Err(DriverError::Session(format!(
                "WebDriver at {} returned {}",
                webdriver_url,
                response.status()
            )));
        }

        let body: Value = response.json().await.unwrap_or(Value::Null);
        if body["value"]["ready"] == json!(false) {
            return Err(DriverError::Session(format!(
                "WebDriver at {} is not ready",
                webdriver_url
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl DriverFactory for WebDriverFactory {
    async fn launch(&self, profile: BrowserProfile) -> DriverResult<Box<dyn PageDriver>> {
        let url = self.browser.webdriver_url(profile);
        self.check_ready(url).await?;

        tracing::debug!("Connecting to {} WebDriver at {}", profile, url);
        let client = ClientBuilder::native()
            .capabilities(self.capabilities(profile))
            .connect(url)
            .await
            .map_err(|e| DriverError::Session(format!("Failed to start {} session: {}", profile, e)))?;

        Ok(Box::new(WebDriverPage::new(client)))
    }
}
