//! Attribute parsing for Model derive macro.
//!
//! Handles parsing of struct-level and field-level `#[orm(...)]` attributes.

use heck::ToSnakeCase;
use syn::{DeriveInput, Result};

/// Struct-level `#[orm(table = "...", primary_key = "...")]`.
#[derive(Default)]
pub(super) struct StructAttr {
    pub table: Option<String>,
    pub primary_key: Option<String>,
}

impl syn::parse::Parse for StructAttr {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut attr = StructAttr::default();

        while !input.is_empty() {
            let ident: syn::Ident = input.parse()?;
            let _: syn::Token![=] = input.parse()?;
            let value: syn::LitStr = input.parse()?;

            if ident == "table" {
                attr.table = Some(value.value());
            } else if ident == "primary_key" {
                attr.primary_key = Some(value.value());
            } else {
                return Err(syn::Error::new_spanned(
                    ident,
                    "expected `table` or `primary_key`",
                ));
            }

            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            } else {
                break;
            }
        }

        Ok(attr)
    }
}

/// Literal given to `default = ...`, with an optional leading `-`.
pub(super) struct DefaultLit {
    pub negative: bool,
    pub lit: syn::Lit,
}

impl syn::parse::Parse for DefaultLit {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let negative = if input.peek(syn::Token![-]) {
            input.parse::<syn::Token![-]>()?;
            true
        } else {
            false
        };
        Ok(DefaultLit {
            negative,
            lit: input.parse()?,
        })
    }
}

/// Field-level `#[orm(id, fillable, column = "...", default = <literal>)]`.
#[derive(Default)]
pub(super) struct FieldAttr {
    pub is_id: bool,
    pub fillable: bool,
    pub column: Option<String>,
    pub default: Option<DefaultLit>,
}

impl syn::parse::Parse for FieldAttr {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut attr = FieldAttr::default();

        // Parse comma-separated key=value pairs or single identifiers
        while !input.is_empty() {
            let ident: syn::Ident = input.parse()?;
            if ident == "id" {
                attr.is_id = true;
            } else if ident == "fillable" {
                attr.fillable = true;
            } else if ident == "column" {
                let _: syn::Token![=] = input.parse()?;
                let value: syn::LitStr = input.parse()?;
                attr.column = Some(value.value());
            } else if ident == "default" {
                let _: syn::Token![=] = input.parse()?;
                attr.default = Some(input.parse()?);
            } else {
                return Err(syn::Error::new_spanned(
                    ident,
                    "expected `id`, `fillable`, `column` or `default`",
                ));
            }

            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            } else {
                break;
            }
        }

        Ok(attr)
    }
}

/// Merge every `#[orm(...)]` on the struct.
pub(super) fn struct_attr(input: &DeriveInput) -> Result<StructAttr> {
    let mut merged = StructAttr::default();
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("orm")) {
        let parsed: StructAttr = attr.parse_args()?;
        merged.table = parsed.table.or(merged.table);
        merged.primary_key = parsed.primary_key.or(merged.primary_key);
    }
    Ok(merged)
}

/// Merge every `#[orm(...)]` on a field.
pub(super) fn field_attr(field: &syn::Field) -> Result<FieldAttr> {
    let mut merged = FieldAttr::default();
    for attr in field.attrs.iter().filter(|a| a.path().is_ident("orm")) {
        let parsed: FieldAttr = attr.parse_args()?;
        merged.is_id |= parsed.is_id;
        merged.fillable |= parsed.fillable;
        merged.column = parsed.column.or(merged.column);
        merged.default = parsed.default.or(merged.default);
    }
    Ok(merged)
}

/// Table name for a struct without `#[orm(table = ...)]`: snake case, pluralized with `s`.
pub(super) fn default_table_name(ident: &syn::Ident) -> String {
    format!("{}s", ident.to_string().to_snake_case())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_field_flags_and_values() {
        let attr: FieldAttr =
            syn::parse_str(r#"fillable, column = "email_address", default = 3"#).unwrap();
        assert!(attr.fillable);
        assert!(!attr.is_id);
        assert_eq!(attr.column.as_deref(), Some("email_address"));
        assert!(matches!(
            attr.default,
            Some(DefaultLit { negative: false, lit: syn::Lit::Int(_) })
        ));
    }

    #[test]
    fn parses_negated_default() {
        let attr: FieldAttr = syn::parse_str("default = -1").unwrap();
        let default = attr.default.unwrap();
        assert!(default.negative);
        assert!(matches!(default.lit, syn::Lit::Int(ref i) if i.base10_digits() == "1"));

        let attr: FieldAttr = syn::parse_str("fillable, default = -0.5").unwrap();
        assert!(attr.fillable);
        assert!(matches!(
            attr.default,
            Some(DefaultLit { negative: true, lit: syn::Lit::Float(_) })
        ));
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(syn::parse_str::<FieldAttr>("nullable").is_err());
        assert!(syn::parse_str::<StructAttr>(r#"schema = "public""#).is_err());
    }

    #[test]
    fn default_table_is_snake_case_plural() {
        let ident = syn::Ident::new("UserProfile", proc_macro2::Span::call_site());
        assert_eq!(default_table_name(&ident), "user_profiles");
    }
}
