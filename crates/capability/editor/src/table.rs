use crate::{EditorError, SaveStatus};
use citydb_storage::CityDbStore;
use citydb_telemetry::LOG_TARGET;
use domain::{FeatureId, GenericAttribute, GenericAttributeUpdate};
use tracing::{info, warn};

pub const COLUMN_COUNT: usize = 4;

pub const COLUMN_HEADERS: [&str; COLUMN_COUNT] = ["attrname", "strval", "intval", "realval"];

const SEPARATOR: &str = " | ";

/// 属性表格模型。
#[derive(Debug, Clone)]
pub struct AttributeEditor {
    feature_id: FeatureId,
    rows: Vec<[String; COLUMN_COUNT]>,
    status_text: String,
}

impl AttributeEditor {
    /// 由 (attrname, strval, intval, realval) 行构造；空值显示为空文本。
    pub fn new(feature_id: FeatureId, rows: impl IntoIterator<Item = GenericAttributeUpdate>) -> Self {
        let rows = rows
            .into_iter()
            .map(|row| {
                [
                    row.attrname,
                    row.strval.unwrap_or_default(),
                    row.intval.map(|value| value.to_string()).unwrap_or_default(),
                    row.realval.map(|value| value.to_string()).unwrap_or_default(),
                ]
            })
            .collect();
        Self {
            feature_id,
            rows,
            status_text: String::new(),
        }
    }

    pub fn from_attributes(feature_id: FeatureId, attributes: &[GenericAttribute]) -> Self {
        Self::new(feature_id, attributes.iter().map(GenericAttributeUpdate::from))
    }

    pub fn feature_id(&self) -> FeatureId {
        self.feature_id
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    pub fn is_editable(column: usize) -> bool {
        (1..COLUMN_COUNT).contains(&column)
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column).map(String::as_str)
    }

    pub fn set_cell(
        &mut self,
        row: usize,
        column: usize,
        text: impl Into<String>,
    ) -> Result<(), EditorError> {
        if column == 0 {
            return Err(EditorError::ReadOnlyColumn(column));
        }
        let cell = self
            .rows
            .get_mut(row)
            .and_then(|cells| cells.get_mut(column))
            .ok_or(EditorError::OutOfRange { row, column })?;
        *cell = text.into();
        Ok(())
    }

    /// 固定列宽的文本表格。
    pub fn render(&self) -> String {
        let mut widths = COLUMN_HEADERS.map(|header| header.chars().count());
        for cells in &self.rows {
            for (width, cell) in widths.iter_mut().zip(cells) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let format_row = |cells: [&str; COLUMN_COUNT]| {
            cells
                .iter()
                .zip(widths)
                .map(|(cell, width)| format!("{cell:<width$}"))
                .collect::<Vec<_>>()
                .join(SEPARATOR)
                .trim_end()
                .to_string()
        };

        let mut lines = Vec::with_capacity(self.rows.len() + 2);
        lines.push(format_row(COLUMN_HEADERS));
        lines.push(
            widths
                .iter()
                .map(|width| "-".repeat(*width))
                .collect::<Vec<_>>()
                .join("-+-"),
        );
        for cells in &self.rows {
            lines.push(format_row([
                cells[0].as_str(),
                cells[1].as_str(),
                cells[2].as_str(),
                cells[3].as_str(),
            ]));
        }
        lines.join("\n")
    }

    /// 读取当前单元格文本，生成整行改写。
    pub fn collect_updates(&self) -> Vec<GenericAttributeUpdate> {
        self.rows
            .iter()
            .map(|cells| GenericAttributeUpdate {
                attrname: cells[0].clone(),
                strval: (!cells[1].is_empty()).then(|| cells[1].clone()),
                intval: parse_int_cell(&cells[2]),
                realval: parse_real_cell(&cells[3]),
            })
            .collect()
    }

    /// 保存全部行并更新状态文本。
    pub async fn save(&mut self, store: &dyn CityDbStore) -> SaveStatus {
        let updates = self.collect_updates();
        let status = match store.save_generic_attributes(self.feature_id, &updates).await {
            Ok(rows) => {
                info!(
                    target: LOG_TARGET,
                    feature_id = self.feature_id,
                    rows,
                    "generic attributes saved"
                );
                SaveStatus::Saved
            }
            Err(err) => {
                warn!(
                    target: LOG_TARGET,
                    feature_id = self.feature_id,
                    error = %err,
                    "generic attributes not saved"
                );
                SaveStatus::Failed
            }
        };
        self.status_text = status.message().to_string();
        status
    }
}

/// 整数列解析；失败为空值。
pub fn parse_int_cell(text: &str) -> Option<i64> {
    text.trim().parse::<i64>().ok()
}

/// 实数列解析；失败或非有限值为空值。
pub fn parse_real_cell(text: &str) -> Option<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}
