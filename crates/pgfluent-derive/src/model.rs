//! Model derive macro implementation
//!
//! Generates `pgfluent::Model` (table, primary key, fillable columns and
//! defaults) and `pgfluent::FromRecord` for a struct with named fields.

mod attrs;

use attrs::{DefaultLit, default_table_name, field_attr, struct_attr};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Result};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Model can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Model can only be derived for structs",
            ));
        }
    };

    let struct_attr = struct_attr(&input)?;
    let table = struct_attr
        .table
        .unwrap_or_else(|| default_table_name(name));

    let mut id_column: Option<String> = None;
    let mut fillable: Vec<String> = Vec::new();
    let mut defaults: Vec<TokenStream> = Vec::new();
    let mut field_extracts: Vec<TokenStream> = Vec::new();

    for field in fields {
        let Some(field_name) = field.ident.as_ref() else {
            continue;
        };
        let attr = field_attr(field)?;
        let column = attr.column.unwrap_or_else(|| field_name.to_string());

        if attr.is_id {
            if id_column.is_some() {
                return Err(syn::Error::new_spanned(
                    field,
                    "only one field can be marked #[orm(id)]",
                ));
            }
            id_column = Some(column.clone());
        }
        if attr.fillable {
            fillable.push(column.clone());
        }
        if let Some(default) = &attr.default {
            let value = default_value(default)?;
            defaults.push(quote! {
                record.insert(::std::string::String::from(#column), #value);
            });
        }

        field_extracts.push(quote! {
            #field_name: record.try_get_column(#column)?
        });
    }

    let primary_key = struct_attr
        .primary_key
        .or(id_column)
        .unwrap_or_else(|| "id".to_string());

    let fillable_fn = if fillable.is_empty() {
        quote! {}
    } else {
        quote! {
            fn fillable() -> ::std::option::Option<&'static [&'static str]> {
                ::std::option::Option::Some(&[#(#fillable),*])
            }
        }
    };

    let defaults_fn = if defaults.is_empty() {
        quote! {}
    } else {
        quote! {
            fn defaults() -> ::std::option::Option<pgfluent::Record> {
                let mut record = pgfluent::Record::new();
                #(#defaults)*
                ::std::option::Option::Some(record)
            }
        }
    };

    Ok(quote! {
        impl #impl_generics pgfluent::Model for #name #ty_generics #where_clause {
            const TABLE: &'static str = #table;
            const PRIMARY_KEY: &'static str = #primary_key;

            #fillable_fn
            #defaults_fn
        }

        impl #impl_generics pgfluent::FromRecord for #name #ty_generics #where_clause {
            fn from_record(record: &pgfluent::Record) -> pgfluent::OrmResult<Self> {
                use pgfluent::RecordExt;
                ::std::result::Result::Ok(Self {
                    #(#field_extracts),*
                })
            }
        }
    })
}

fn default_value(default: &DefaultLit) -> Result<TokenStream> {
    let negative = default.negative;
    match &default.lit {
        syn::Lit::Int(i) => {
            let magnitude: u64 = i.base10_parse()?;
            let value = if negative {
                0i64.checked_sub_unsigned(magnitude)
            } else {
                i64::try_from(magnitude).ok()
            };
            let Some(value) = value else {
                return Err(syn::Error::new_spanned(i, "default integer does not fit in i64"));
            };
            Ok(quote! { pgfluent::Value::Int(#value) })
        }
        syn::Lit::Float(f) => {
            let magnitude: f64 = f.base10_parse()?;
            if !magnitude.is_finite() {
                return Err(syn::Error::new_spanned(f, "default float does not fit in f64"));
            }
            let value = if negative { -magnitude } else { magnitude };
            Ok(quote! { pgfluent::Value::Float(#value) })
        }
        other if negative => Err(syn::Error::new_spanned(
            other,
            "only integer and float defaults can be negated",
        )),
        syn::Lit::Str(s) => Ok(quote! { pgfluent::Value::Text(::std::string::String::from(#s)) }),
        syn::Lit::Bool(b) => Ok(quote! { pgfluent::Value::Bool(#b) }),
        other => Err(syn::Error::new_spanned(
            other,
            "default must be a string, integer, float or boolean literal",
        )),
    }
}
