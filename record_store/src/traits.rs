//! Record contract implemented by `#[derive(Record)]`

use crate::field::FieldHandler;
use crate::id_type::RecordId;
use std::fmt;
use std::sync::Arc;
use type_mapping::{ConversionError, SqlValue};

/// Generated accessors for one persisted field
pub struct FieldBinding<T> {
    /// Field name, also the column name
    pub name: &'static str,
    /// Normalized Rust type as written in the struct
    pub rust_type: &'static str,
    pub get: fn(&T) -> SqlValue,
    pub set: fn(&mut T, SqlValue) -> Result<(), ConversionError>,
    /// Stamped with the current time when the record is inserted
    pub insert_timestamp: bool,
}

impl<T> Clone for FieldBinding<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for FieldBinding<T> {}

impl<T> fmt::Debug for FieldBinding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldBinding")
            .field("name", &self.name)
            .field("rust_type", &self.rust_type)
            .field("insert_timestamp", &self.insert_timestamp)
            .finish()
    }
}

/// A struct stored as one row of a table
///
/// Usually derived:
///
/// ```rust,ignore
/// #[record]
/// #[table(name = "customers")]
/// pub struct Customer {
///     pub id: RecordId,
///     pub name: String,
/// }
/// ```
pub trait Record: Default + fmt::Debug + Send + Sync + Unpin + 'static {
    fn table_name() -> &'static str;

    /// Column holding the generated identity
    fn id_field() -> &'static str;

    fn id(&self) -> RecordId;

    fn set_id(&mut self, id: RecordId);

    /// Persisted fields in declaration order, identity excluded
    fn field_bindings() -> Vec<FieldBinding<Self>>;

    /// Handler declared with `#[field(handler = "...")]`
    fn custom_field_handler(_field: &str) -> Option<Arc<dyn FieldHandler>> {
        None
    }

    fn is_persisted(&self) -> bool {
        self.id().is_persisted()
    }
}
