//! Per-type mapping between a record and its table
//!
//! A `ClassHandler` is built once per record type and never changes. It owns
//! the ordered field mappings, the CREATE TABLE statement and the statements
//! used to insert, update, load and delete a record by identity.

use crate::errors::{DbError, DbResult};
use crate::field::{DefaultFieldHandler, FieldHandler, FieldMapping};
use crate::id_type::RecordId;
use crate::traits::Record;
use crate::validation::{ValidatedFieldName, ValidatedTableName};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Column, Row};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use type_mapping::{rust_type_to_sql_kind, SqlKind, SqlValue};

pub struct ClassHandler<T> {
    table: ValidatedTableName,
    id_column: ValidatedFieldName,
    fields: Vec<FieldMapping<T>>,
    create_sql: String,
    drop_sql: String,
    insert_sql: String,
    update_sql: String,
    select_by_id_sql: String,
    delete_by_id_sql: String,
}

impl<T: Record> ClassHandler<T> {
    /// Build the handler for `T`, using `overrides` (field name to handler)
    /// before handlers declared on the type and the default handlers
    pub fn build(overrides: &HashMap<String, Arc<dyn FieldHandler>>) -> DbResult<Self> {
        let record = std::any::type_name::<T>();

        let table = ValidatedTableName::new(T::table_name())
            .map_err(|e| DbError::mapping(record, e.to_string()))?;
        let id_column = ValidatedFieldName::new(T::id_field())
            .map_err(|e| DbError::mapping(record, e.to_string()))?;

        let bindings = T::field_bindings();
        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(bindings.len());

        for binding in bindings {
            ValidatedFieldName::new(binding.name)
                .map_err(|e| DbError::mapping(record, e.to_string()))?;

            if binding.name == T::id_field() || !seen.insert(binding.name) {
                return Err(DbError::mapping(
                    record,
                    format!("column '{}' is mapped more than once", binding.name),
                ));
            }

            let default_kind = rust_type_to_sql_kind(binding.rust_type);

            if binding.insert_timestamp && default_kind != Some(SqlKind::Timestamp) {
                return Err(DbError::mapping(
                    record,
                    format!(
                        "insert timestamp field '{}' has type {}, expected DateTime<Utc>",
                        binding.name, binding.rust_type
                    ),
                ));
            }

            let handler: Arc<dyn FieldHandler> = match overrides
                .get(binding.name)
                .cloned()
                .or_else(|| T::custom_field_handler(binding.name))
            {
                Some(handler) => handler,
                None => match default_kind {
                    Some(kind) => Arc::new(DefaultFieldHandler::new(kind)),
                    None => {
                        return Err(DbError::mapping(
                            record,
                            format!(
                                "field '{}' of type {} has no column mapping, register a field handler",
                                binding.name, binding.rust_type
                            ),
                        ));
                    }
                },
            };

            fields.push(FieldMapping::new(binding, handler));
        }

        if let Some(unknown) = overrides.keys().find(|name| !seen.contains(name.as_str())) {
            return Err(DbError::mapping(
                record,
                format!("field handler registered for unknown field '{}'", unknown),
            ));
        }

        let handler = Self::with_statements(table, id_column, fields);
        debug_log!(
            "Built class handler for {} on table {}: {}",
            record,
            handler.table,
            handler.create_sql
        );
        Ok(handler)
    }

    fn with_statements(
        table: ValidatedTableName,
        id_column: ValidatedFieldName,
        fields: Vec<FieldMapping<T>>,
    ) -> Self {
        let quoted_table = table.quoted();
        let quoted_id = id_column.quoted();
        let columns: Vec<String> = fields
            .iter()
            .map(|f| crate::validation::quote_identifier(f.field_name()))
            .collect();

        let mut definitions = vec![format!("{} BIGSERIAL PRIMARY KEY", quoted_id)];
        definitions.extend(fields.iter().map(FieldMapping::column_definition));
        let create_sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quoted_table,
            definitions.join(", ")
        );

        let insert_sql = if columns.is_empty() {
            format!(
                "INSERT INTO {} DEFAULT VALUES RETURNING {}",
                quoted_table, quoted_id
            )
        } else {
            let placeholders: Vec<String> =
                (1..=columns.len()).map(|i| format!("${}", i)).collect();
            format!(
                "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
                quoted_table,
                columns.join(", "),
                placeholders.join(", "),
                quoted_id
            )
        };

        let update_sql = if columns.is_empty() {
            // Still reports whether the row exists
            format!(
                "UPDATE {} SET {} = {} WHERE {} = $1",
                quoted_table, quoted_id, quoted_id, quoted_id
            )
        } else {
            let assignments: Vec<String> = columns
                .iter()
                .enumerate()
                .map(|(i, column)| format!("{} = ${}", column, i + 1))
                .collect();
            format!(
                "UPDATE {} SET {} WHERE {} = ${}",
                quoted_table,
                assignments.join(", "),
                quoted_id,
                columns.len() + 1
            )
        };

        Self {
            drop_sql: format!("DROP TABLE IF EXISTS {}", quoted_table),
            select_by_id_sql: format!(
                "SELECT * FROM {} WHERE {} = $1",
                quoted_table, quoted_id
            ),
            delete_by_id_sql: format!("DELETE FROM {} WHERE {} = $1", quoted_table, quoted_id),
            create_sql,
            insert_sql,
            update_sql,
            table,
            id_column,
            fields,
        }
    }

    pub fn table_name(&self) -> &str {
        self.table.as_str()
    }

    pub fn id_column(&self) -> &str {
        self.id_column.as_str()
    }

    /// Field mappings in declaration order
    pub fn fields(&self) -> &[FieldMapping<T>] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldMapping<T>> {
        self.fields.iter().find(|f| f.field_name() == name)
    }

    pub fn create_statement(&self) -> &str {
        &self.create_sql
    }

    pub fn drop_statement(&self) -> &str {
        &self.drop_sql
    }

    pub fn insert_statement(&self) -> &str {
        &self.insert_sql
    }

    pub fn update_statement(&self) -> &str {
        &self.update_sql
    }

    pub fn select_by_id_statement(&self) -> &str {
        &self.select_by_id_sql
    }

    pub fn delete_by_id_statement(&self) -> &str {
        &self.delete_by_id_sql
    }

    /// Parameters for the insert statement, in column order
    pub fn insert_values(&self, record: &T) -> DbResult<Vec<SqlValue>> {
        self.fields.iter().map(|f| f.bind_value(record)).collect()
    }

    /// Parameters for the insert statement with every insert-timestamp
    /// column set to `now`; `record` itself is left alone
    pub fn insert_values_at(&self, record: &T, now: DateTime<Utc>) -> DbResult<Vec<SqlValue>> {
        self.fields
            .iter()
            .map(|f| {
                if f.is_insert_timestamp() {
                    f.column_value(SqlValue::Timestamp(now))
                } else {
                    f.bind_value(record)
                }
            })
            .collect()
    }

    /// Parameters for the update statement: every column, then the identity
    pub fn update_values(&self, record: &T) -> DbResult<Vec<SqlValue>> {
        let mut values = self.insert_values(record)?;
        values.push(record.id().into());
        Ok(values)
    }

    /// Set every insert-timestamp field of `record` to `now`
    pub fn stamp_insert_timestamps(&self, record: &mut T, now: DateTime<Utc>) -> DbResult<()> {
        for field in self.fields.iter().filter(|f| f.is_insert_timestamp()) {
            field.assign(record, SqlValue::Timestamp(now))?;
        }
        Ok(())
    }

    /// Fill `record` from a result row, matching columns by name.
    /// Fields whose column is not part of the result keep their value.
    pub fn read_into(&self, record: &mut T, row: &PgRow) -> DbResult<()> {
        let mut positions: HashMap<&str, usize> = HashMap::with_capacity(row.len());
        for (index, column) in row.columns().iter().enumerate() {
            // First occurrence wins, as with `t.*` in front of joined columns
            positions.entry(column.name()).or_insert(index);
        }

        if let Some(&index) = positions.get(self.id_column.as_str()) {
            let id: i64 = row.try_get(index).map_err(|e| {
                DbError::mapping(self.table.as_str(), format!("cannot read identity: {}", e))
            })?;
            record.set_id(RecordId::new(id));
        }

        for field in &self.fields {
            if let Some(&index) = positions.get(field.field_name()) {
                field.extract_from_row(record, row, index)?;
            }
        }
        Ok(())
    }

    /// A new record built from a result row
    pub fn read_row(&self, row: &PgRow) -> DbResult<T> {
        let mut record = T::default();
        self.read_into(&mut record, row)?;
        Ok(record)
    }
}

impl<T> fmt::Debug for ClassHandler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassHandler")
            .field("table", &self.table)
            .field("id_column", &self.id_column)
            .field("fields", &self.fields)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::StringListHandler;
    use crate::traits::FieldBinding;
    use crate::Record;
    use type_mapping::ConversionError;

    #[crate::record]
    #[table(name = "orders")]
    struct Order {
        id: RecordId,
        customer: String,
        total: f64,
        note: Option<String>,
        #[field(insert_timestamp)]
        placed_at: Option<DateTime<Utc>>,
        #[field(handler = "StringListHandler")]
        labels: Vec<String>,
        #[transient]
        dirty: bool,
    }

    #[derive(Debug, Default)]
    struct Blob {
        id: RecordId,
        bytes: Vec<u8>,
    }

    impl Record for Blob {
        fn table_name() -> &'static str {
            "blobs"
        }

        fn id_field() -> &'static str {
            "id"
        }

        fn id(&self) -> RecordId {
            self.id
        }

        fn set_id(&mut self, id: RecordId) {
            self.id = id;
        }

        fn field_bindings() -> Vec<FieldBinding<Self>> {
            vec![FieldBinding {
                name: "bytes",
                rust_type: "Vec<u8>",
                get: |r: &Blob| SqlValue::Text(format!("{:?}", r.bytes)),
                set: |_: &mut Blob, _: SqlValue| -> Result<(), ConversionError> { Ok(()) },
                insert_timestamp: false,
            }]
        }
    }

    fn order_handler() -> ClassHandler<Order> {
        ClassHandler::build(&HashMap::new()).unwrap()
    }

    #[test]
    fn test_create_statement() {
        let handler = order_handler();
        assert_eq!(
            handler.create_statement(),
            "CREATE TABLE IF NOT EXISTS \"orders\" (\"id\" BIGSERIAL PRIMARY KEY, \
             \"customer\" VARCHAR NOT NULL, \"total\" DOUBLE PRECISION NOT NULL, \
             \"note\" VARCHAR, \"placed_at\" TIMESTAMP WITH TIME ZONE, \
             \"labels\" VARCHAR NOT NULL)"
        );
    }

    #[test]
    fn test_fields_in_declaration_order() {
        let handler = order_handler();
        let names: Vec<&str> = handler.fields().iter().map(|f| f.field_name()).collect();
        assert_eq!(names, vec!["customer", "total", "note", "placed_at", "labels"]);
        assert_eq!(handler.field("labels").unwrap().sql_type(), SqlKind::Text);
        assert_eq!(handler.field("total").unwrap().rust_type(), "f64");
        assert!(handler.field("dirty").is_none());
    }

    #[test]
    fn test_crud_statements() {
        let handler = order_handler();
        assert_eq!(
            handler.insert_statement(),
            "INSERT INTO \"orders\" (\"customer\", \"total\", \"note\", \"placed_at\", \"labels\") \
             VALUES ($1, $2, $3, $4, $5) RETURNING \"id\""
        );
        assert_eq!(
            handler.update_statement(),
            "UPDATE \"orders\" SET \"customer\" = $1, \"total\" = $2, \"note\" = $3, \
             \"placed_at\" = $4, \"labels\" = $5 WHERE \"id\" = $6"
        );
        assert_eq!(
            handler.select_by_id_statement(),
            "SELECT * FROM \"orders\" WHERE \"id\" = $1"
        );
        assert_eq!(
            handler.delete_by_id_statement(),
            "DELETE FROM \"orders\" WHERE \"id\" = $1"
        );
    }

    #[test]
    fn test_bind_values_go_through_handlers() {
        let handler = order_handler();
        let order = Order {
            id: RecordId::new(12),
            customer: "ada".to_string(),
            total: 9.5,
            labels: vec!["gift".to_string(), "rush".to_string()],
            ..Default::default()
        };

        let values = handler.update_values(&order).unwrap();
        assert_eq!(
            values,
            vec![
                SqlValue::Text("ada".to_string()),
                SqlValue::Double(9.5),
                SqlValue::Null(SqlKind::Text),
                SqlValue::Null(SqlKind::Timestamp),
                SqlValue::Text("gift,rush".to_string()),
                SqlValue::BigInt(12),
            ]
        );
    }

    #[test]
    fn test_insert_timestamp_stamping() {
        let handler = order_handler();
        let mut order = Order::default();
        let now = Utc::now();
        handler.stamp_insert_timestamps(&mut order, now).unwrap();
        assert_eq!(order.placed_at, Some(now));
    }

    #[test]
    fn test_insert_values_carry_timestamp_without_touching_record() {
        let handler = order_handler();
        let order = Order {
            customer: "grace".to_string(),
            ..Default::default()
        };
        let now = Utc::now();

        let values = handler.insert_values_at(&order, now).unwrap();
        assert_eq!(values[3], SqlValue::Timestamp(now));
        assert_eq!(values.len(), 5);
        assert_eq!(order.placed_at, None);
    }

    #[test]
    fn test_override_replaces_declared_handler() {
        let mut overrides: HashMap<String, Arc<dyn FieldHandler>> = HashMap::new();
        overrides.insert(
            "labels".to_string(),
            Arc::new(DefaultFieldHandler::new(SqlKind::TextArray)),
        );
        let handler = ClassHandler::<Order>::build(&overrides).unwrap();
        assert_eq!(handler.field("labels").unwrap().sql_type(), SqlKind::TextArray);
        assert!(handler.create_statement().contains("\"labels\" TEXT[] NOT NULL"));
    }

    #[test]
    fn test_override_for_unknown_field_fails() {
        let mut overrides: HashMap<String, Arc<dyn FieldHandler>> = HashMap::new();
        overrides.insert("missing".to_string(), Arc::new(StringListHandler::default()));
        let err = ClassHandler::<Order>::build(&overrides).unwrap_err();
        assert!(matches!(err, DbError::Mapping { .. }));
    }

    #[test]
    fn test_unsupported_type_fails_fast() {
        let err = ClassHandler::<Blob>::build(&HashMap::new()).unwrap_err();
        assert!(err.to_string().contains("no column mapping"));

        let mut overrides: HashMap<String, Arc<dyn FieldHandler>> = HashMap::new();
        overrides.insert(
            "bytes".to_string(),
            Arc::new(DefaultFieldHandler::new(SqlKind::Text)),
        );
        assert!(ClassHandler::<Blob>::build(&overrides).is_ok());
    }
}
