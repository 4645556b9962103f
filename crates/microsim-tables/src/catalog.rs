//! Compiled mapping from `"table.measure"` names to numeric addresses.
//!
//! Built once from the table definitions before any member starts and
//! shared read-only afterwards.

use std::collections::BTreeMap;

use microsim_types::{MeasureId, TableAddress, TableId};

use crate::error::TableError;
use crate::table::Table;

/// Name lookups for tables and their measures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableCatalog {
    tables: BTreeMap<String, TableId>,
    measures: BTreeMap<String, TableAddress>,
}

impl TableCatalog {
    /// Compile the catalog for `tables`.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::DuplicateTable`] if two tables share a name.
    pub fn compile<'a>(tables: impl IntoIterator<Item = &'a Table>) -> Result<Self, TableError> {
        let mut catalog = Self::default();
        for table in tables {
            if catalog
                .tables
                .insert(table.name().to_owned(), table.id())
                .is_some()
            {
                return Err(TableError::DuplicateTable(table.name().to_owned()));
            }
            for (position, measure) in table.measure_names().iter().enumerate() {
                let Ok(raw) = u32::try_from(position) else {
                    break;
                };
                catalog.measures.insert(
                    format!("{}.{measure}", table.name()),
                    TableAddress {
                        table: table.id(),
                        measure: MeasureId::new(raw),
                    },
                );
            }
        }
        Ok(catalog)
    }

    /// Check that the catalog describes exactly `tables`: the same names,
    /// ids and measures in the same order.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::CatalogMismatch`] naming the first table the
    /// catalog disagrees on, or [`TableError::DuplicateTable`] if `tables`
    /// itself repeats a name.
    pub fn verify<'a>(&self, tables: impl IntoIterator<Item = &'a Table>) -> Result<(), TableError> {
        let expected = Self::compile(tables)?;
        if *self == expected {
            return Ok(());
        }
        let differs = |name: &String, id: &TableId| {
            self.tables.get(name) != Some(id) || self.measures_of(*id) != expected.measures_of(*id)
        };
        let name = expected
            .tables
            .iter()
            .find(|(name, id)| differs(name, id))
            .or_else(|| {
                self.tables
                    .iter()
                    .find(|(name, _)| !expected.tables.contains_key(*name))
            })
            .map_or_else(String::new, |(name, _)| name.clone());
        Err(TableError::CatalogMismatch(name))
    }

    fn measures_of(&self, table: TableId) -> Vec<(&str, MeasureId)> {
        self.measures
            .iter()
            .filter(|(_, address)| address.table == table)
            .map(|(name, address)| (name.as_str(), address.measure))
            .collect()
    }

    /// Address of the qualified measure name `"table.measure"`.
    pub fn resolve(&self, qualified: &str) -> Option<TableAddress> {
        self.measures.get(qualified).copied()
    }

    /// Id of the table called `name`.
    pub fn table_id(&self, name: &str) -> Option<TableId> {
        self.tables.get(name).copied()
    }

    /// Qualified measure names in sorted order.
    pub fn measure_names(&self) -> impl Iterator<Item = &str> {
        self.measures.keys().map(String::as_str)
    }

    /// Number of measures across all tables.
    pub fn len(&self) -> usize {
        self.measures.len()
    }

    /// Whether no measure is known.
    pub fn is_empty(&self) -> bool {
        self.measures.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn resolves_qualified_names() {
        let a = Table::new(TableId::new(0), "A", &[2], &["x", "y"]).unwrap();
        let b = Table::new(TableId::new(1), "B", &[], &["z"]).unwrap();
        let catalog = TableCatalog::compile([&a, &b]).unwrap();
        assert_eq!(
            catalog.resolve("A.y"),
            Some(TableAddress {
                table: TableId::new(0),
                measure: MeasureId::new(1),
            })
        );
        assert_eq!(catalog.resolve("B.z").unwrap().table, TableId::new(1));
        assert!(catalog.resolve("B.x").is_none());
        assert!(catalog.resolve("Bz").is_none());
        assert_eq!(catalog.table_id("B"), Some(TableId::new(1)));
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.measure_names().collect::<Vec<_>>(), vec!["A.x", "A.y", "B.z"]);
    }

    #[test]
    fn duplicate_table_names_are_rejected() {
        let a = Table::new(TableId::new(0), "A", &[1], &["x"]).unwrap();
        let again = Table::new(TableId::new(1), "A", &[1], &["y"]).unwrap();
        assert_eq!(
            TableCatalog::compile([&a, &again]),
            Err(TableError::DuplicateTable("A".to_owned()))
        );
    }
}
