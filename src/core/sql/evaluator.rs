use std::collections::BTreeSet;
use tracing::debug;
use crate::core::error::DbError;
use crate::core::storage::TableStore;
use crate::core::types::{DataType, RowId};
use super::expression::Node;
use super::join::Join;
use super::operator::Operator;
use super::table::{GroupedRows, TableDetail, TableService};
use super::value::Value;

/// 单个比较谓词的取数方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LookupPath<'a> {
    Index(&'a str),
    PrimaryKey(usize),
    Scan,
}

/// WHERE 表达式树求值器。结果始终是连接之后的分组行。
pub struct StatementEvaluator<'a> {
    store: &'a dyn TableStore,
    tables: &'a TableService,
    join: &'a Join,
    from_table: &'a TableDetail,
}

impl<'a> StatementEvaluator<'a> {
    pub fn new(
        store: &'a dyn TableStore,
        tables: &'a TableService,
        join: &'a Join,
        from_table: &'a TableDetail,
    ) -> Self {
        StatementEvaluator {
            store,
            tables,
            join,
            from_table,
        }
    }

    pub fn evaluate(&self, node: &Node) -> Result<GroupedRows, DbError> {
        match node {
            Node::And(left, right) => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                Ok(left
                    .into_iter()
                    .filter(|(id, _)| right.contains_key(id))
                    .collect())
            }
            Node::Or(left, right) => {
                let left = self.evaluate(left)?;
                let mut merged = self.evaluate(right)?;
                // 同一行标识两侧都有时保留左侧的内容
                merged.extend(left);
                Ok(merged)
            }
            Node::Compare { op, left, right } => {
                if !op.is_comparison() {
                    return Err(DbError::InvalidOperator(op.spelling().to_string()));
                }
                match (left.as_ref(), right.as_ref()) {
                    (Node::Column(l), Node::Column(r)) => self.compare_columns(*op, l, r),
                    (Node::Value(_), Node::Column(_)) => match node.normalized() {
                        Some(normalized) => self.evaluate(&normalized),
                        None => Err(DbError::InvalidTree(node.to_string())),
                    },
                    (Node::Column(column), Node::Value(constant)) => {
                        self.compare_constant(*op, column, constant)
                    }
                    (Node::Value(l), Node::Value(r)) => self.compare_literals(*op, l, r),
                    _ => Err(DbError::InvalidTree(node.to_string())),
                }
            }
            Node::Column(_) | Node::Value(_) => Err(DbError::InvalidTree(node.to_string())),
        }
    }

    /// 同一张表内两列的比较，逐行扫描
    fn compare_columns(&self, op: Operator, left: &Value, right: &Value) -> Result<GroupedRows, DbError> {
        let (left_table, left_column) = self.resolve(left)?;
        let (right_table, right_column) = self.resolve(right)?;
        if left_table.name_in_use() != right_table.name_in_use() {
            return Err(DbError::InvalidExpression(format!(
                "WHERE 中不能比较不同表的列 {} 和 {}，请使用 JOIN",
                left, right
            )));
        }

        let mut ids = BTreeSet::new();
        for (id, row) in &left_table.content {
            let l = row.get(&left_column).unwrap_or(&DataType::Null);
            let r = row.get(&right_column).unwrap_or(&DataType::Null);
            if op.compare(l, r)? {
                ids.insert(id.clone());
            }
        }
        self.expand(left_table, ids)
    }

    /// 列与常量比较：等值时依次尝试索引、主键，否则全表扫描
    fn compare_constant(&self, op: Operator, column: &Value, constant: &Value) -> Result<GroupedRows, DbError> {
        let (table, column_name) = self.resolve(column)?;
        let column_type = table
            .column_type(&column_name)
            .ok_or_else(|| DbError::UnknownColumn(column.to_string()))?;
        let value = constant
            .typed()
            .ok_or_else(|| DbError::InvalidTree(constant.to_string()))?;
        column_type.check_comparable(value)?;

        let ids = match lookup_path(op, table, &column_name, value) {
            LookupPath::Index(index_file) => {
                debug!("{}.{} 使用索引 {}", table.name_in_use(), column_name, index_file);
                match column_type.lookup_value(value) {
                    Some(key) => self.store.filter_by_index(
                        &key,
                        index_file,
                        &table.table_name,
                        &table.database_name,
                    )?,
                    None => BTreeSet::new(),
                }
            }
            LookupPath::PrimaryKey(position) => {
                debug!("{}.{} 使用主键查找", table.name_in_use(), column_name);
                match column_type.lookup_value(value) {
                    Some(key) => self.store.filter_by_primary_key(
                        &key,
                        position,
                        &table.table_name,
                        &table.database_name,
                    )?,
                    None => BTreeSet::new(),
                }
            }
            LookupPath::Scan => {
                debug!("{}.{} 全表扫描 ({})", table.name_in_use(), column_name, op);
                scan(table, &column_name, op, value)?
            }
        };
        self.expand(table, ids)
    }

    /// 两侧都是常量：条件成立时返回 FROM 表的全部行
    fn compare_literals(&self, op: Operator, left: &Value, right: &Value) -> Result<GroupedRows, DbError> {
        let l = left.typed().ok_or_else(|| DbError::InvalidTree(left.to_string()))?;
        let r = right.typed().ok_or_else(|| DbError::InvalidTree(right.to_string()))?;
        if op.compare(l, r)? {
            self.join.evaluate(self.from_table.grouped_content())
        } else {
            Ok(GroupedRows::new())
        }
    }

    fn resolve(&self, column: &Value) -> Result<(&'a TableDetail, String), DbError> {
        let name = column
            .column_name()
            .ok_or_else(|| DbError::InvalidTree(column.to_string()))?;
        self.tables.resolve(name)
    }

    /// 把某张表上命中的行标识展开为连接后的分组行
    fn expand(&self, table: &TableDetail, ids: BTreeSet<RowId>) -> Result<GroupedRows, DbError> {
        if table.name_in_use() == self.from_table.name_in_use() {
            let rows = self.store.select_rows(
                Some(&ids),
                &[],
                &table.table_name,
                &table.database_name,
            )?;
            return self.join.evaluate(table.group(rows));
        }

        let position = self.join.part_index(table.name_in_use()).ok_or_else(|| {
            DbError::TableError(format!("表 {} 不在查询中", table.name_in_use()))
        })?;
        let joined = self.join.evaluate(self.from_table.grouped_content())?;
        Ok(joined
            .into_iter()
            .filter(|(id, _)| id.part(position).map_or(false, |part| ids.contains(&part)))
            .collect())
    }
}

fn lookup_path<'t>(op: Operator, table: &'t TableDetail, column: &str, value: &DataType) -> LookupPath<'t> {
    // 只有非 NULL 的等值比较走捷径
    if op != Operator::Eq || value.is_null() {
        return LookupPath::Scan;
    }
    if let Some(index_file) = table.indexed_columns.get(column) {
        return LookupPath::Index(index_file);
    }
    match table.primary_keys.iter().position(|key| key == column) {
        Some(position) => LookupPath::PrimaryKey(position),
        None => LookupPath::Scan,
    }
}

fn scan(table: &TableDetail, column: &str, op: Operator, value: &DataType) -> Result<BTreeSet<RowId>, DbError> {
    let mut ids = BTreeSet::new();
    for (id, row) in &table.content {
        let cell = row.get(column).unwrap_or(&DataType::Null);
        if op.compare(cell, value)? {
            ids.insert(id.clone());
        }
    }
    Ok(ids)
}

/// 求值结果中各分组行的标识
pub fn row_ids(rows: &GroupedRows) -> Vec<RowId> {
    rows.keys().cloned().collect()
}
