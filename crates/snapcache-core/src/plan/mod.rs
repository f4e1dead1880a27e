//! Table import plans
//!
//! A plan describes how one destination table is created, populated and
//! indexed. The registry is an immutable, ordered collection of plans built
//! once at start-up and handed to the importer.

mod clinic;

use crate::convert::Converter;
use crate::errors::{ImportError, ImportErrorKind, Result};
use std::collections::HashSet;

/// Destination column fed from one source field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    /// Position of the field in the raw (source-select order) row
    pub source: usize,
    pub convert: Converter,
}

impl ColumnMap {
    pub const fn new(source: usize, convert: Converter) -> Self {
        Self { source, convert }
    }
}

/// Import plan for one destination table
#[derive(Debug, Clone, PartialEq)]
pub struct TablePlan {
    table: String,
    create_sql: String,
    insert_sql: String,
    index_sql: Vec<String>,
    columns: Vec<ColumnMap>,
    select_columns: Vec<String>,
}

impl TablePlan {
    pub fn new(
        table: impl Into<String>,
        create_sql: impl Into<String>,
        insert_sql: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            create_sql: create_sql.into(),
            insert_sql: insert_sql.into(),
            index_sql: Vec::new(),
            columns: Vec::new(),
            select_columns: Vec::new(),
        }
    }

    pub fn with_index(mut self, sql: impl Into<String>) -> Self {
        self.index_sql.push(sql.into());
        self
    }

    pub fn with_columns(mut self, columns: Vec<ColumnMap>) -> Self {
        self.columns = columns;
        self
    }

    /// Source column names, in the order the live source must select them
    pub fn with_select_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn create_sql(&self) -> &str {
        &self.create_sql
    }

    pub fn insert_sql(&self) -> &str {
        &self.insert_sql
    }

    pub fn index_sql(&self) -> &[String] {
        &self.index_sql
    }

    pub fn columns(&self) -> &[ColumnMap] {
        &self.columns
    }

    pub fn select_columns(&self) -> &[String] {
        &self.select_columns
    }

    /// `DROP TABLE` statement used before re-applying the schema
    pub fn drop_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS \"{}\"", self.table)
    }

    /// Live-mode query over the declared source columns
    pub fn select_sql(&self) -> String {
        let columns = self
            .select_columns
            .iter()
            .map(|c| format!("`{}`", c))
            .collect::<Vec<_>>()
            .join(", ");
        format!("SELECT {} FROM `{}`", columns, self.table)
    }

    /// Check the plan's shape invariants
    ///
    /// - the upsert statement has one placeholder per column mapping
    /// - every source position is inside the live select list
    pub fn validate(&self) -> Result<()> {
        let placeholders = self.insert_sql.matches('?').count();
        if placeholders != self.columns.len() {
            return Err(invalid_plan(
                &self.table,
                format!(
                    "insert statement has {} placeholders but {} columns are mapped",
                    placeholders,
                    self.columns.len()
                ),
            ));
        }
        if let Some(column) = self
            .columns
            .iter()
            .find(|c| c.source >= self.select_columns.len())
        {
            return Err(invalid_plan(
                &self.table,
                format!(
                    "source index {} is outside the {} selected columns",
                    column.source,
                    self.select_columns.len()
                ),
            ));
        }
        Ok(())
    }
}

fn invalid_plan(table: &str, reason: String) -> ImportError {
    ImportError::new(ImportErrorKind::Configuration)
        .with_op("validate_plan")
        .with_table(table)
        .with_message(reason)
}

/// Ordered, immutable collection of table plans
#[derive(Debug, Clone, PartialEq)]
pub struct PlanRegistry {
    plans: Vec<TablePlan>,
}

impl PlanRegistry {
    /// Build a registry, validating every plan and rejecting duplicate tables
    pub fn new(plans: Vec<TablePlan>) -> Result<Self> {
        let mut seen = HashSet::new();
        for plan in &plans {
            plan.validate()?;
            if !seen.insert(plan.table()) {
                return Err(invalid_plan(plan.table(), "duplicate table plan".to_string()));
            }
        }
        Ok(Self { plans })
    }

    /// The plans of the legacy clinic database
    ///
    /// Built through [`PlanRegistry::new`], so the clinic plans are held to
    /// the same checks as any caller-supplied registry.
    pub fn clinic() -> Result<Self> {
        Self::new(clinic::plans())
    }

    pub fn get(&self, table: &str) -> Option<&TablePlan> {
        self.plans.iter().find(|p| p.table() == table)
    }

    pub fn position(&self, table: &str) -> Option<usize> {
        self.plans.iter().position(|p| p.table() == table)
    }

    pub fn plans(&self) -> &[TablePlan] {
        &self.plans
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TablePlan> {
        self.plans.iter()
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.plans.iter().map(|p| p.table())
    }
}

impl<'a> IntoIterator for &'a PlanRegistry {
    type Item = &'a TablePlan;
    type IntoIter = std::slice::Iter<'a, TablePlan>;

    fn into_iter(self) -> Self::IntoIter {
        self.plans.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_column_plan(table: &str) -> TablePlan {
        TablePlan::new(
            table,
            format!("CREATE TABLE {} (a TEXT PRIMARY KEY, b REAL)", table),
            format!("INSERT OR REPLACE INTO {} VALUES (?, ?)", table),
        )
        .with_columns(vec![
            ColumnMap::new(0, Converter::Text),
            ColumnMap::new(1, Converter::Real),
        ])
        .with_select_columns(["a", "b"])
    }

    #[test]
    fn test_clinic_registry_is_valid() {
        let registry = PlanRegistry::clinic();
        assert!(registry.is_ok(), "{:?}", registry.err());
        assert_eq!(registry.unwrap().len(), 5);
    }


    #[test]
    fn test_clinic_registry_order() {
        let registry = PlanRegistry::clinic().unwrap();
        let names: Vec<_> = registry.table_names().collect();
        assert_eq!(
            names,
            vec!["patients", "payment_method", "stock_items", "receipts", "receipt_items"]
        );
    }

    #[test]
    fn test_placeholder_mismatch_rejected() {
        let plan = two_column_plan("t").with_columns(vec![ColumnMap::new(0, Converter::Text)]);
        let err = plan.validate().unwrap_err();
        assert_eq!(err.kind(), ImportErrorKind::Configuration);
        assert_eq!(err.table(), Some("t"));
    }

    #[test]
    fn test_source_index_out_of_bounds_rejected() {
        let plan = two_column_plan("t").with_columns(vec![
            ColumnMap::new(0, Converter::Text),
            ColumnMap::new(5, Converter::Real),
        ]);
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_duplicate_tables_rejected() {
        let result = PlanRegistry::new(vec![two_column_plan("t"), two_column_plan("t")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_select_sql_quotes_identifiers() {
        let plan = two_column_plan("t");
        assert_eq!(plan.select_sql(), "SELECT `a`, `b` FROM `t`");
    }

    #[test]
    fn test_lookup() {
        let registry = PlanRegistry::new(vec![two_column_plan("x"), two_column_plan("y")]).unwrap();
        assert_eq!(registry.position("y"), Some(1));
        assert!(registry.get("z").is_none());
    }
}
