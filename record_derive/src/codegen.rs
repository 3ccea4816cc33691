//! Code generation for the `Record` trait
//!
//! Every persisted field gets an explicit getter/setter pair, so reading and
//! writing rows never inspects a record at runtime.

use proc_macro2::TokenStream;
use quote::quote;
use syn::Ident;

use crate::parsing::{FieldInfo, RecordInfo};

fn field_binding(field: &FieldInfo) -> TokenStream {
    let ident = &field.ident;
    let name = ident.to_string();
    let rust_type = &field.rust_type;
    let insert_timestamp = field.insert_timestamp;

    quote! {
        record_store::FieldBinding {
            name: #name,
            rust_type: #rust_type,
            get: |record: &Self| record_store::ToSqlValue::to_sql_value(&record.#ident),
            set: |record: &mut Self, value: record_store::SqlValue|
                -> ::core::result::Result<(), record_store::ConversionError> {
                record.#ident = record_store::FromSqlValue::from_sql_value(value)?;
                ::core::result::Result::Ok(())
            },
            insert_timestamp: #insert_timestamp,
        }
    }
}

fn custom_handler_arm(field: &FieldInfo) -> Option<TokenStream> {
    let handler = field.handler.as_ref()?;
    let name = field.ident.to_string();
    Some(quote! {
        #name => ::core::option::Option::Some(::std::sync::Arc::new(
            <#handler as ::core::default::Default>::default(),
        )),
    })
}

pub fn generate_record_impl(name: &Ident, info: &RecordInfo) -> TokenStream {
    let table_name = &info.table_name;
    let id_ident = &info.id_field;
    let id_name = id_ident.to_string();

    let bindings: Vec<_> = info.fields.iter().map(field_binding).collect();
    let handler_arms: Vec<_> = info.fields.iter().filter_map(custom_handler_arm).collect();

    quote! {
        impl record_store::Record for #name {
            fn table_name() -> &'static str {
                #table_name
            }

            fn id_field() -> &'static str {
                #id_name
            }

            fn id(&self) -> record_store::RecordId {
                self.#id_ident
            }

            fn set_id(&mut self, id: record_store::RecordId) {
                self.#id_ident = id;
            }

            fn field_bindings() -> ::std::vec::Vec<record_store::FieldBinding<Self>> {
                ::std::vec![#(#bindings),*]
            }

            fn custom_field_handler(
                field: &str,
            ) -> ::core::option::Option<::std::sync::Arc<dyn record_store::FieldHandler>> {
                match field {
                    #(#handler_arms)*
                    _ => ::core::option::Option::None,
                }
            }
        }
    }
}
