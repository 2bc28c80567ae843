// ==========================================
// 上部完井管柱配管系统 - 导入层
// ==========================================
// 职责: 外部表格 → 管柱清单、立柱、总成、套管接箍
// 支持: Excel (.xlsx/.xls), CSV
// ==========================================

pub mod error;
pub mod file_parser;
pub mod tally_importer;

pub use error::{ImportError, ImportResult};
pub use file_parser::{column_index, CsvParser, ExcelParser, SheetParser, SheetRows, UniversalFileParser};
pub use tally_importer::{remaining_singles, TallyImporter};
