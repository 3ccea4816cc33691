//! Procedural macros for mapping structs to database records
//!
//! This crate provides the `#[record]` attribute and the `Record` derive,
//! which generate the table metadata and per-field bindings used by
//! `record_store::ClassHandler`.

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod codegen;
mod parsing;
mod record_macro;

use codegen::generate_record_impl;
use parsing::parse_record;
use record_macro::record_attribute;

/// Derive macro for the `Record` trait
///
/// Note: `#[record]` is usually more convenient, it adds this derive along
/// with `Debug`, `Clone` and `Default`.
///
/// ```rust,ignore
/// #[derive(Debug, Clone, Default, Record)]
/// #[table(name = "customers")]
/// pub struct Customer {
///     pub id: RecordId,
///     pub first_name: String,
///     #[field(insert_timestamp)]
///     pub created_at: Option<DateTime<Utc>>,
///     #[field(handler = "StringListHandler")]
///     pub nicknames: Vec<String>,
///     #[transient]
///     pub dirty: bool,
/// }
/// ```
#[proc_macro_derive(Record, attributes(table, id, field, transient))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let info = match parse_record(&input.data, &input.attrs, &input.ident) {
        Ok(info) => info,
        Err(e) => return e.to_compile_error().into(),
    };

    generate_record_impl(&input.ident, &info).into()
}

/// Convenience attribute macro that adds all necessary derives for a record
///
/// ```rust,ignore
/// #[record]
/// #[table(name = "users")]
/// pub struct User {
///     pub id: RecordId,
///     pub name: String,
/// }
/// ```
#[proc_macro_attribute]
pub fn record(attr: TokenStream, item: TokenStream) -> TokenStream {
    record_attribute(attr, item)
}
