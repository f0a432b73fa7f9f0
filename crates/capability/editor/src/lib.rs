//! 通用属性编辑器
//!
//! 为单个要素的通用属性提供固定四列的表格模型：
//! attrname（只读）、strval、intval、realval（可编辑文本）。
//!
//! - 行数在打开时确定，只支持改值，不支持增删行
//! - 保存时 intval / realval 解析失败按空值处理，不阻止保存
//! - 整批改写在单个事务中执行，全部成功或全部回滚
//! - 取消时不访问数据库

pub mod table;

pub use table::{AttributeEditor, COLUMN_COUNT, COLUMN_HEADERS, parse_int_cell, parse_real_cell};

/// 编辑器错误。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditorError {
    #[error("column {0} is read-only")]
    ReadOnlyColumn(usize),
    #[error("cell ({row}, {column}) out of range")]
    OutOfRange { row: usize, column: usize },
}

/// 对话框结束方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogOutcome {
    Save,
    Cancel,
}

/// 保存结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    Saved,
    Failed,
}

impl SaveStatus {
    /// 状态栏文本。
    pub fn message(&self) -> &'static str {
        match self {
            SaveStatus::Saved => "Data saved.",
            SaveStatus::Failed => "Error saving data.",
        }
    }
}
