use crate::utils::error::{BookingError, Result};
use std::net::SocketAddr;
use std::path::Path;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub(crate) fn invalid(field: &str, value: impl ToString, reason: impl Into<String>) -> BookingError {
    BookingError::InvalidConfigValueError {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn parse_http_url(field: &str, value: &str) -> Result<Url> {
    let url = Url::parse(value).map_err(|e| invalid(field, value, format!("Invalid URL: {}", e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(
            field,
            value,
            format!("Unsupported URL scheme: {}", url.scheme()),
        ));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid(field, value, "URL has no host"));
    }
    Ok(url)
}

/// 預約網站入口
pub fn validate_site_url(field: &str, value: &str) -> Result<()> {
    parse_http_url(field, value).map(|_| ())
}

/// WebDriver 服務位址必須寫明主機與連接埠，例如 `http://localhost:4444`
pub fn validate_webdriver_url(field: &str, value: &str) -> Result<()> {
    let url = parse_http_url(field, value)?;
    if url.port().is_none() {
        return Err(invalid(
            field,
            value,
            "WebDriver URL needs an explicit port (geckodriver 4444, chromedriver 9515)",
        ));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid(field, value, "WebDriver URL must not carry a query or fragment"));
    }
    Ok(())
}

/// HTTP 服務的監聽位址，例如 `0.0.0.0:8000`
pub fn validate_bind_addr(field: &str, value: &str) -> Result<SocketAddr> {
    value
        .trim()
        .parse()
        .map_err(|e| invalid(field, value, format!("Expected host:port socket address: {}", e)))
}

/// 服務對照表必須是已存在的 `.csv` 檔
pub fn validate_mapping_file(field: &str, path: &Path) -> Result<()> {
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if !is_csv {
        return Err(invalid(
            field,
            path.display(),
            "Mapping table must be exported as .csv",
        ));
    }
    if !path.is_file() {
        return Err(invalid(field, path.display(), "Mapping file does not exist"));
    }
    Ok(())
}

/// 輸出目錄會在執行時建立；已存在時不能是檔案
pub fn validate_output_dir(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(field, value, "Directory cannot be empty"));
    }
    let path = Path::new(value);
    if path.exists() && !path.is_dir() {
        return Err(invalid(field, value, "Path exists but is not a directory"));
    }
    Ok(())
}

/// 郵遞區號會逐字輸入搜尋框，只接受英數字、空白與連字號
pub fn validate_postal_code(value: &str) -> Result<()> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(BookingError::ValidationError {
            message: "postal_code cannot be empty".to_string(),
        });
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == ' ' || c == '-')
    {
        return Err(BookingError::ValidationError {
            message: format!("postal_code '{}' contains unexpected characters", value),
        });
    }
    Ok(())
}
