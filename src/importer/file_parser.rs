// ==========================================
// 上部完井管柱配管系统 - 表格解析器
// ==========================================
// 支持: Excel (.xlsx/.xls) / CSV (.csv)
// 输出: 表头 + 按行保存的单元格文本（保留空行，行号与原表对齐）
// 寻址: 列字母 (A, B, ..., AA) + 表头下方 1 起始的数据行号
// ==========================================

use crate::config::RowRange;
use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto, Reader};
use csv::ReaderBuilder;
use std::fs::File;
use std::path::Path;

// ==========================================
// SheetRows - 解析后的表格
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetRows {
    pub source: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl SheetRows {
    /// 表格最大列数（表头与数据行取大）
    pub fn width(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.header.len()))
            .max()
            .unwrap_or(0)
    }

    /// 行范围对应的数据行（附 1 起始行号）
    pub fn rows_in(&self, range: RowRange) -> ImportResult<Vec<(usize, &[String])>> {
        let last = range.last.unwrap_or(self.rows.len());
        if range.first == 0 || range.first > last || last > self.rows.len() {
            return Err(self.range_error(format!(
                "行范围 {}-{} 超出数据行数 {}",
                range.first,
                last,
                self.rows.len()
            )));
        }
        Ok((range.first..=last)
            .map(|row| (row, self.rows[row - 1].as_slice()))
            .collect())
    }

    /// 指定列在行范围内的单元格（附 1 起始行号）
    pub fn column(&self, letter: &str, range: RowRange) -> ImportResult<Vec<(usize, String)>> {
        let index = column_index(letter).ok_or_else(|| {
            self.range_error(format!("列标识无效: {letter}"))
        })?;
        if index >= self.width() {
            return Err(self.range_error(format!("列 {letter} 不存在（共 {} 列）", self.width())));
        }
        Ok(self
            .rows_in(range)?
            .into_iter()
            .map(|(row, cells)| (row, cells.get(index).cloned().unwrap_or_default()))
            .collect())
    }

    fn range_error(&self, message: String) -> ImportError {
        ImportError::ColumnOrRangeError {
            file: self.source.clone(),
            message,
        }
    }
}

/// 列字母转 0 起始索引（A → 0, Z → 25, AA → 26）
pub fn column_index(letter: &str) -> Option<usize> {
    let letter = letter.trim();
    if letter.is_empty() {
        return None;
    }
    letter.chars().try_fold(0usize, |acc, c| {
        if c.is_ascii_alphabetic() {
            let digit = (c.to_ascii_uppercase() as u8 - b'A') as usize + 1;
            acc.checked_mul(26)?.checked_add(digit)
        } else {
            None
        }
    })
    .map(|n| n - 1)
}

// ==========================================
// Trait: SheetParser
// ==========================================
pub trait SheetParser {
    /// 解析表格（sheet 为 None 时读取第一个工作表）
    fn parse_rows(&self, path: &Path, sheet: Option<&str>) -> ImportResult<SheetRows>;
}

fn ensure_exists(path: &Path) -> ImportResult<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(ImportError::FileNotFound(path.display().to_string()))
    }
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl SheetParser for CsvParser {
    fn parse_rows(&self, path: &Path, _sheet: Option<&str>) -> ImportResult<SheetRows> {
        ensure_exists(path)?;

        let file = File::open(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(file);

        let header: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            rows.push(record.iter().map(|v| v.trim().to_string()).collect());
        }

        Ok(SheetRows {
            source: path.display().to_string(),
            header,
            rows,
        })
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl SheetParser for ExcelParser {
    fn parse_rows(&self, path: &Path, sheet: Option<&str>) -> ImportResult<SheetRows> {
        ensure_exists(path)?;

        let mut workbook = open_workbook_auto(path)?;
        let sheet_name = match sheet {
            Some(name) => name.to_string(),
            None => workbook
                .sheet_names()
                .first()
                .cloned()
                .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?,
        };
        let range = workbook.worksheet_range(&sheet_name)?;

        // 单元格区域可能不从 A1 开始，补齐为绝对行列
        let (row_offset, col_offset) = range
            .start()
            .map(|(r, c)| (r as usize, c as usize))
            .unwrap_or((0, 0));
        let mut grid: Vec<Vec<String>> = vec![Vec::new(); row_offset];
        for cells in range.rows() {
            let mut row = vec![String::new(); col_offset];
            row.extend(cells.iter().map(|cell| cell.to_string().trim().to_string()));
            grid.push(row);
        }

        let mut grid = grid.into_iter();
        let header = grid
            .next()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无数据行".to_string()))?;

        Ok(SheetRows {
            source: format!("{}#{}", path.display(), sheet_name),
            header,
            rows: grid.collect(),
        })
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl SheetParser for UniversalFileParser {
    fn parse_rows(&self, path: &Path, sheet: Option<&str>) -> ImportResult<SheetRows> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" => CsvParser.parse_rows(path, sheet),
            "xlsx" | "xls" => ExcelParser.parse_rows(path, sheet),
            _ => Err(ImportError::UnsupportedFormat(ext)),
        }
    }
}
