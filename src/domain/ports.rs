use crate::domain::model::{BrowserProfile, ServiceSelection};
use crate::utils::error::{DriverError, Result};
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

pub type DriverResult<T> = std::result::Result<T, DriverError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// CSS 選擇器
    Css(String),
    /// 文字內容包含指定字串的元素
    Text(String),
}

/// 一組元素的查詢條件，可選擇限定在某個元素之內
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub query: Query,
    pub has_text: Option<String>,
    pub scope: Option<Box<Target>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pick {
    First,
    Last,
    Nth(usize),
}

/// 查詢結果中的單一元素
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub selector: Selector,
    pub pick: Pick,
}

impl Selector {
    pub fn css(css: impl Into<String>) -> Self {
        Self {
            query: Query::Css(css.into()),
            has_text: None,
            scope: None,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            query: Query::Text(text.into()),
            has_text: None,
            scope: None,
        }
    }

    pub fn has_text(mut self, text: impl Into<String>) -> Self {
        self.has_text = Some(text.into());
        self
    }

    pub fn within(mut self, scope: Target) -> Self {
        self.scope = Some(Box::new(scope));
        self
    }

    pub fn first(self) -> Target {
        self.pick(Pick::First)
    }

    pub fn last(self) -> Target {
        self.pick(Pick::Last)
    }

    pub fn nth(self, index: usize) -> Target {
        self.pick(Pick::Nth(index))
    }

    pub fn pick(self, pick: Pick) -> Target {
        Target {
            selector: self,
            pick,
        }
    }
}

impl Pick {
    /// 在 `len` 個候選中實際選中的索引
    pub fn resolve(&self, len: usize) -> Option<usize> {
        match self {
            Pick::First if len > 0 => Some(0),
            Pick::Last if len > 0 => Some(len - 1),
            Pick::Nth(index) if *index < len => Some(*index),
            _ => None,
        }
    }
}

// Playwright 風格的表示法，用於日誌與比對
impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(scope) = &self.scope {
            write!(f, "{} >> ", scope)?;
        }
        match &self.query {
            Query::Css(css) => write!(f, "{}", css)?,
            Query::Text(text) => write!(f, "text={}", text)?,
        }
        if let Some(text) = &self.has_text {
            write!(f, ":has-text('{}')", text)?;
        }
        Ok(())
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.pick {
            Pick::First => write!(f, "{} >> nth=0", self.selector),
            Pick::Last => write!(f, "{} >> nth=-1", self.selector),
            Pick::Nth(index) => write!(f, "{} >> nth={}", self.selector, index),
        }
    }
}

/// 瀏覽器頁面操作介面
///
/// 一個實例只屬於一次執行，執行結束時必須呼叫 `close`。
#[async_trait]
pub trait PageDriver: Send {
    async fn goto(&mut self, url: &str, timeout: Duration) -> DriverResult<()>;

    /// 所有符合元素的文字內容，沒有符合時回傳空陣列
    async fn texts(&mut self, selector: &Selector) -> DriverResult<Vec<String>>;

    async fn wait_visible(&mut self, target: &Target, timeout: Duration) -> DriverResult<()>;

    async fn click(&mut self, target: &Target) -> DriverResult<()>;

    /// 以選項標籤選擇 `<select>` 的值
    async fn select_option(&mut self, target: &Target, label: &str) -> DriverResult<()>;

    /// 聚焦輸入欄位並清空內容
    async fn focus_and_clear(&mut self, target: &Target) -> DriverResult<()>;

    /// 對目前聚焦的元素輸入文字
    async fn type_text(&mut self, text: &str) -> DriverResult<()>;

    async fn press_enter(&mut self) -> DriverResult<()>;

    /// 整頁截圖，回傳 PNG
    async fn screenshot(&mut self) -> DriverResult<Vec<u8>>;

    async fn close(&mut self) -> DriverResult<()>;
}

/// 為每次嘗試建立新的瀏覽器工作階段
#[async_trait]
pub trait DriverFactory: Send + Sync {
    async fn launch(&self, profile: BrowserProfile) -> DriverResult<Box<dyn PageDriver>>;
}

pub trait ServiceResolver: Send + Sync {
    /// 依輸入順序回傳所有符合的 (服務群組, 服務名稱)，可能為空
    fn resolve(&self, identifiers: &[u64]) -> Vec<ServiceSelection>;
}

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<String>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_display() {
        let cookie = Selector::css("button").has_text("Alle akzeptieren").first();
        assert_eq!(cookie.to_string(), "button:has-text('Alle akzeptieren') >> nth=0");

        let names = Selector::css("h3.service-name").within(Selector::css(".service-list").last());
        assert_eq!(names.to_string(), ".service-list >> nth=-1 >> h3.service-name");
        assert_eq!(
            names.nth(2).to_string(),
            ".service-list >> nth=-1 >> h3.service-name >> nth=2"
        );

        assert_eq!(
            Selector::text("Speichern und weiter").first().to_string(),
            "text=Speichern und weiter >> nth=0"
        );
    }

    #[test]
    fn test_pick_resolve() {
        assert_eq!(Pick::First.resolve(3), Some(0));
        assert_eq!(Pick::Last.resolve(3), Some(2));
        assert_eq!(Pick::Nth(1).resolve(3), Some(1));
        assert_eq!(Pick::Nth(3).resolve(3), None);
        assert_eq!(Pick::First.resolve(0), None);
        assert_eq!(Pick::Last.resolve(0), None);
    }
}
