use crate::domain::model::ServiceSelection;
use crate::domain::ports::ServiceResolver;
use crate::utils::error::Result;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(rename = "FleetLink ID")]
    ids: Option<String>,
    #[serde(rename = "Service Gruppe", default)]
    group: String,
    #[serde(rename = "ATU Service", default)]
    name: String,
}

/// 對照表中的一列
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingRow {
    pub ids: Vec<u64>,
    pub group: String,
    pub name: String,
}

impl MappingRow {
    pub fn matches(&self, identifier: u64) -> bool {
        self.ids.contains(&identifier)
    }
}

/// FleetLink ID 與網站服務分類的對照表（由試算表匯出的 CSV）
#[derive(Debug, Clone, Default)]
pub struct ServiceTable {
    rows: Vec<MappingRow>,
}

impl ServiceTable {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        let table = Self::from_reader(file)?;
        tracing::debug!(
            "Loaded {} mapping rows from {}",
            table.rows.len(),
            path.as_ref().display()
        );
        Ok(table)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let mut rows = Vec::new();
        for record in reader.deserialize::<RawRow>() {
            let raw = record?;
            let Some(cell) = raw.ids.filter(|cell| !cell.is_empty()) else {
                continue;
            };
            let ids = parse_ids(&cell);
            if ids.is_empty() {
                continue;
            }
            rows.push(MappingRow {
                ids,
                group: raw.group,
                name: raw.name,
            });
        }

        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[MappingRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// 解析 ID 欄位，例如 `26|27?|abc` -> `[26, 27]`
///
/// 試算表匯出時整數可能變成 `26.0`，也一併接受。
pub fn parse_ids(cell: &str) -> Vec<u64> {
    cell.split('|')
        .filter_map(|token| {
            let token = token.replace('?', "");
            let token = token.trim();
            token.parse::<u64>().ok().or_else(|| {
                token
                    .strip_suffix(".0")
                    .and_then(|whole| whole.parse::<u64>().ok())
            })
        })
        .collect()
}

impl ServiceResolver for ServiceTable {
    fn resolve(&self, identifiers: &[u64]) -> Vec<ServiceSelection> {
        identifiers
            .iter()
            .flat_map(|id| {
                self.rows
                    .iter()
                    .filter(move |row| row.matches(*id))
                    .map(|row| ServiceSelection::new(row.group.clone(), row.name.clone()))
            })
            .collect()
    }
}
