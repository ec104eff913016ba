//! 頁面文字比對

/// 移除逗號與句點、合併連續空白並去除首尾空白
pub fn clean_text(text: &str) -> String {
    text.chars()
        .filter(|c| *c != ',' && *c != '.')
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// 完全相同的第一個選項
pub fn find_exact(options: &[String], target: &str) -> Option<usize> {
    options.iter().position(|option| option == target)
}

/// 包含 `needle` 的第一個選項
pub fn find_containing(options: &[String], needle: &str) -> Option<usize> {
    options.iter().position(|option| option.contains(needle))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceMatch {
    Exact(usize),
    /// 找不到名稱時改選第一項
    Fallback,
}

impl ServiceMatch {
    pub fn index(&self) -> usize {
        match self {
            ServiceMatch::Exact(index) => *index,
            ServiceMatch::Fallback => 0,
        }
    }
}

/// 忽略標點與多餘空白比對服務名稱（大小寫仍須相同）
pub fn match_service(candidates: &[String], target: &str) -> ServiceMatch {
    let target = clean_text(target);
    candidates
        .iter()
        .position(|candidate| clean_text(candidate) == target)
        .map(ServiceMatch::Exact)
        .unwrap_or(ServiceMatch::Fallback)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateChoice {
    Matched(usize),
    /// 跳過索引 0 的佔位選項
    Fallback(usize),
}

impl DateChoice {
    pub fn index(&self) -> usize {
        match self {
            DateChoice::Matched(index) | DateChoice::Fallback(index) => *index,
        }
    }
}

/// 選擇包含偏好日期的日期選項；選項不足以退回時回傳 `None`
///
/// 沒有偏好日期視同找不到。
pub fn choose_date(options: &[String], preferred_date: Option<&str>) -> Option<DateChoice> {
    let matched = preferred_date
        .map(str::trim)
        .filter(|date| !date.is_empty())
        .and_then(|date| find_containing(options, date));
    match matched {
        Some(index) => Some(DateChoice::Matched(index)),
        None if options.len() > 1 => Some(DateChoice::Fallback(1)),
        None => None,
    }
}
