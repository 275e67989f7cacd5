use crate::core::result::QueryResult;
use crate::core::types::DataType;

pub struct TableFormatter;

impl TableFormatter {
    /// 把一条语句的结果格式化为终端输出：先是结果表，然后是消息或错误
    pub fn format_result(result: &QueryResult) -> String {
        let mut output = String::new();
        if result.has_rows() {
            let rows: Vec<Vec<String>> = result
                .rows
                .iter()
                .map(|row| row.iter().map(Self::format_value).collect())
                .collect();
            output.push_str(&Self::format_table(&result.fields, &rows));
            output.push_str(&format!("({} row(s))\n", result.rows.len()));
        }
        for message in &result.messages {
            output.push_str(message);
            output.push('\n');
        }
        if let Some(error) = &result.error {
            output.push_str(error);
            output.push('\n');
        }
        output
    }

    fn format_value(value: &DataType) -> String {
        match value {
            DataType::Null => String::new(),
            other => other.to_string(),
        }
    }

    /// 格式化表格输出
    /// 列中最长字段距离左右边界各1个空格，其他字段向左对齐
    /// 每个单元格宽度至少为5个字符(包括内容和空格)
    pub fn format_table(headers: &[String], rows: &[Vec<String>]) -> String {
        // 计算每列的最大宽度，按字符数计算
        let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count().max(3)).collect();
        for row in rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let mut result = Self::format_row(headers, &widths);
        result.push('\n');

        // 分隔线
        result.push('|');
        for width in &widths {
            result.push(' ');
            result.push_str(&"-".repeat(*width));
            result.push_str(" |");
        }
        result.push('\n');

        for row in rows {
            result.push_str(&Self::format_row(row, &widths));
            result.push('\n');
        }
        result
    }

    /// 格式化单行数据
    fn format_row(cells: &[String], widths: &[usize]) -> String {
        let mut line = String::from("|");
        for (cell, width) in cells.iter().zip(widths) {
            let padding = width.saturating_sub(cell.chars().count());
            line.push(' ');
            line.push_str(cell);
            line.push_str(&" ".repeat(padding + 1));
            line.push('|');
        }
        line
    }
}
