//! Parsing utilities for record and field attributes
//!
//! This module handles the parsing of `#[table]`, `#[id]`, `#[transient]` and
//! `#[field]` attributes and validation of table and column names.

use quote::quote;
use syn::{Attribute, Data, Error, Fields, Ident, LitStr, Path, Result};
use type_mapping::{normalize_type, rust_type_to_sql_kind, strip_option};

/// Compile-time check of a table name, reported at `span`
pub fn validate_table_name_syn(name: &str, span: proc_macro2::Span) -> Result<()> {
    identifier_problem(name).map_or(Ok(()), |problem| {
        Err(Error::new(span, format!("table name `{}` {}", name, problem)))
    })
}

/// Compile-time check of a column name, reported at `span`
pub fn validate_field_name_syn(name: &str, span: proc_macro2::Span) -> Result<()> {
    identifier_problem(name).map_or(Ok(()), |problem| {
        Err(Error::new(span, format!("column name `{}` {}", name, problem)))
    })
}

/// Same rules as `record_store::validation`, so a record that derives also
/// builds its class handler. Keywords pass, generated SQL quotes every name.
fn identifier_problem(name: &str) -> Option<String> {
    let first = match name.chars().next() {
        Some(c) => c,
        None => return Some("is empty".to_string()),
    };
    if name.len() > 63 {
        return Some(format!("is {} bytes long, PostgreSQL keeps 63", name.len()));
    }
    if !(first == '_' || first.is_ascii_alphabetic()) {
        return Some("must start with a letter or underscore".to_string());
    }
    name.chars()
        .find(|c| !(*c == '_' || c.is_ascii_alphanumeric()))
        .map(|c| format!("contains {:?}; use letters, digits and underscores", c))
}

#[derive(Debug)]
pub struct RecordInfo {
    pub table_name: String,
    pub id_field: Ident,
    /// Persisted fields in declaration order, identity excluded
    pub fields: Vec<FieldInfo>,
}

#[derive(Debug)]
pub struct FieldInfo {
    pub ident: Ident,
    pub rust_type: String,
    pub handler: Option<Path>,
    pub insert_timestamp: bool,
}

#[derive(Default)]
struct FieldOptions {
    handler: Option<Path>,
    insert_timestamp: bool,
}

pub fn parse_table_name(attrs: &[Attribute], struct_name: &Ident) -> Result<String> {
    let mut table_name = None;

    for attr in attrs {
        if attr.path().is_ident("table") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    let value: LitStr = meta.value()?.parse()?;
                    validate_table_name_syn(&value.value(), value.span())?;
                    table_name = Some(value.value());
                    Ok(())
                } else {
                    Err(meta.error("unsupported table attribute, expected `name = \"...\"`"))
                }
            })?;
        }
    }

    match table_name {
        Some(name) => Ok(name),
        None => {
            let name = to_snake_case(&struct_name.to_string());
            validate_table_name_syn(&name, struct_name.span())?;
            Ok(name)
        }
    }
}

/// `OrderLine` becomes `order_line`
fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn parse_field_options(attrs: &[Attribute]) -> Result<FieldOptions> {
    let mut options = FieldOptions::default();

    for attr in attrs {
        if attr.path().is_ident("field") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("handler") {
                    let value: LitStr = meta.value()?.parse()?;
                    options.handler = Some(value.parse()?);
                    Ok(())
                } else if meta.path.is_ident("insert_timestamp") {
                    options.insert_timestamp = true;
                    Ok(())
                } else {
                    Err(meta.error(
                        "unsupported field attribute, expected `handler = \"...\"` or `insert_timestamp`",
                    ))
                }
            })?;
        }
    }

    Ok(options)
}

pub fn has_attribute(attrs: &[Attribute], name: &str) -> bool {
    attrs.iter().any(|attr| attr.path().is_ident(name))
}

fn is_record_id(rust_type: &str) -> bool {
    matches!(
        rust_type,
        "RecordId" | "record_store::RecordId" | "recordhaus::RecordId"
    )
}

fn is_timestamp(rust_type: &str) -> bool {
    matches!(
        strip_option(rust_type).as_str(),
        "DateTime<Utc>" | "chrono::DateTime<Utc>" | "chrono::DateTime<chrono::Utc>"
    )
}

pub fn parse_record(data: &Data, attrs: &[Attribute], struct_name: &Ident) -> Result<RecordInfo> {
    let table_name = parse_table_name(attrs, struct_name)?;

    let Data::Struct(data_struct) = data else {
        return Err(Error::new(
            struct_name.span(),
            "Record can only be derived for structs with named fields",
        ));
    };
    let Fields::Named(fields_named) = &data_struct.fields else {
        return Err(Error::new(
            struct_name.span(),
            "Record can only be derived for structs with named fields",
        ));
    };

    let mut explicit_ids = Vec::new();
    let mut implicit_id = None;
    let mut fields = Vec::new();

    for field in &fields_named.named {
        let ident = field
            .ident
            .as_ref()
            .ok_or_else(|| Error::new_spanned(field, "Field must have a name"))?;

        if has_attribute(&field.attrs, "transient") {
            continue;
        }

        validate_field_name_syn(&ident.to_string(), ident.span())?;

        let ty = &field.ty;
        let rust_type = normalize_type(&quote!(#ty).to_string());

        if has_attribute(&field.attrs, "id") {
            explicit_ids.push((ident.clone(), rust_type));
            continue;
        }
        if ident == "id" {
            implicit_id = Some((ident.clone(), rust_type.clone()));
        }

        let options = parse_field_options(&field.attrs)?;

        if options.handler.is_none() && rust_type_to_sql_kind(&rust_type).is_none() {
            return Err(Error::new_spanned(
                ty,
                format!(
                    "field '{}' has type '{}' which has no default column mapping; declare #[field(handler = \"...\")]",
                    ident, rust_type
                ),
            ));
        }

        if options.insert_timestamp && !is_timestamp(&rust_type) {
            return Err(Error::new_spanned(
                ty,
                format!(
                    "insert_timestamp field '{}' must be DateTime<Utc> or Option<DateTime<Utc>>",
                    ident
                ),
            ));
        }

        fields.push(FieldInfo {
            ident: ident.clone(),
            rust_type,
            handler: options.handler,
            insert_timestamp: options.insert_timestamp,
        });
    }

    let (id_field, id_type) = match explicit_ids.len() {
        1 => explicit_ids.remove(0),
        0 => {
            let (ident, rust_type) = implicit_id.ok_or_else(|| {
                Error::new(
                    struct_name.span(),
                    "record needs an identity field: mark one field with #[id] or name it `id`",
                )
            })?;
            fields.retain(|f| f.ident != ident);
            (ident, rust_type)
        }
        _ => {
            return Err(Error::new(
                struct_name.span(),
                "only one field may be marked with #[id]",
            ));
        }
    };

    if !is_record_id(&id_type) {
        return Err(Error::new(
            id_field.span(),
            format!(
                "identity field '{}' must have type RecordId, found '{}'",
                id_field, id_type
            ),
        ));
    }

    Ok(RecordInfo {
        table_name,
        id_field,
        fields,
    })
}

#[cfg(test)]
mod validation_tests {
    use super::*;
    use syn::DeriveInput;

    fn parse(input: DeriveInput) -> Result<RecordInfo> {
        parse_record(&input.data, &input.attrs, &input.ident)
    }

    fn table_ok(name: &str) -> bool {
        validate_table_name_syn(name, proc_macro2::Span::call_site()).is_ok()
    }

    #[test]
    fn test_identifier_rules() {
        for name in ["orders", "order_lines", "_hidden", "v2", "group"] {
            assert!(table_ok(name), "rejected {}", name);
        }
        for name in ["", "9lives", "orders-2024", "orders; DROP TABLE orders", "o'rders", "o\"rders"] {
            assert!(!table_ok(name), "accepted {}", name);
        }
        assert!(!table_ok(&"x".repeat(64)));
    }

    #[test]
    fn test_error_names_the_identifier() {
        let err = validate_field_name_syn("bad-name", proc_macro2::Span::call_site()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "column name `bad-name` contains '-'; use letters, digits and underscores"
        );
    }

    #[test]
    fn test_parse_record_fields() {
        let input: DeriveInput = syn::parse_quote! {
            #[table(name = "events")]
            struct Event {
                id: RecordId,
                name: String,
                #[field(insert_timestamp)]
                stamped_at: chrono::DateTime<chrono::Utc>,
                #[field(handler = "StringListHandler")]
                labels: Vec<String>,
                #[transient]
                scratch: Vec<u8>,
            }
        };

        let info = parse(input).unwrap();
        assert_eq!(info.table_name, "events");
        assert_eq!(info.id_field, "id");
        let names: Vec<String> = info.fields.iter().map(|f| f.ident.to_string()).collect();
        assert_eq!(names, vec!["name", "stamped_at", "labels"]);
        assert!(info.fields[1].insert_timestamp);
        assert!(info.fields[2].handler.is_some());
    }

    #[test]
    fn test_default_table_name() {
        let input: DeriveInput = syn::parse_quote! {
            struct OrderLine {
                id: RecordId,
                qty: i32,
            }
        };
        assert_eq!(parse(input).unwrap().table_name, "order_line");
    }

    #[test]
    fn test_explicit_id_field() {
        let input: DeriveInput = syn::parse_quote! {
            struct Account {
                #[id]
                account_no: RecordId,
                owner: String,
            }
        };
        let info = parse(input).unwrap();
        assert_eq!(info.id_field, "account_no");
        assert_eq!(info.fields.len(), 1);
    }

    #[test]
    fn test_rejects_missing_identity() {
        let input: DeriveInput = syn::parse_quote! {
            struct Note {
                text: String,
            }
        };
        assert!(parse(input).is_err());
    }

    #[test]
    fn test_rejects_non_record_id_identity() {
        let input: DeriveInput = syn::parse_quote! {
            struct Note {
                id: i64,
                text: String,
            }
        };
        assert!(parse(input).is_err());
    }

    #[test]
    fn test_rejects_unmapped_type_without_handler() {
        let input: DeriveInput = syn::parse_quote! {
            struct Note {
                id: RecordId,
                blob: Vec<u8>,
            }
        };
        let err = parse(input).unwrap_err();
        assert!(err.to_string().contains("no default column mapping"));
    }

    #[test]
    fn test_rejects_non_timestamp_insert_stamp() {
        let input: DeriveInput = syn::parse_quote! {
            struct Note {
                id: RecordId,
                #[field(insert_timestamp)]
                created: String,
            }
        };
        assert!(parse(input).is_err());
    }
}
