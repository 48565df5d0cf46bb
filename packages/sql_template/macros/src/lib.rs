#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, LitStr, parse_macro_input, spanned::Spanned as _};

/// `last_login_time` becomes `lastLoginTime`.
fn camel_case(name: &str) -> String {
    let name = name.strip_prefix("r#").unwrap_or(name);
    let mut result = String::with_capacity(name.len());
    let mut upper_next = false;

    for c in name.chars() {
        if c == '_' {
            upper_next = !result.is_empty();
        } else if upper_next {
            result.extend(c.to_uppercase());
            upper_next = false;
        } else {
            result.push(c);
        }
    }

    result
}

#[derive(Default)]
struct FieldOptions {
    rename: Option<String>,
    skip: bool,
}

fn field_options(field: &syn::Field) -> syn::Result<FieldOptions> {
    let mut options = FieldOptions::default();

    for attr in &field.attrs {
        if !attr.path().is_ident("row") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                options.skip = true;
                Ok(())
            } else if meta.path.is_ident("rename") {
                let name: LitStr = meta.value()?.parse()?;
                options.rename = Some(name.value());
                Ok(())
            } else {
                Err(meta.error("unsupported row attribute, expected `rename` or `skip`"))
            }
        })?;
    }

    Ok(options)
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new(
            input.span(),
            "RowRecord can only be derived for structs",
        ));
    };
    let Fields::Named(fields) = &data.fields else {
        return Err(syn::Error::new(
            data.fields.span(),
            "RowRecord requires named fields",
        ));
    };

    let mut descriptors = vec![];

    for field in &fields.named {
        let options = field_options(field)?;
        if options.skip {
            continue;
        }
        let Some(ident) = &field.ident else {
            continue;
        };
        let ty = &field.ty;
        let name = options
            .rename
            .unwrap_or_else(|| camel_case(&ident.to_string()));

        descriptors.push(quote! {
            ::switchy_sql_template::mapper::FieldDescriptor::of::<#ty>(#name, |record, value| {
                record.#ident =
                    <#ty as ::switchy_sql_template::coercion::FromSqlValue>::from_sql_value(value)?;
                ::core::result::Result::Ok(())
            })
        });
    }

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::switchy_sql_template::mapper::RowRecord for #ident #ty_generics #where_clause {
            fn new_record() -> Self {
                ::core::default::Default::default()
            }

            fn fields() -> ::std::vec::Vec<::switchy_sql_template::mapper::FieldDescriptor<Self>> {
                ::std::vec![#(#descriptors),*]
            }
        }
    })
}

/// Derives `RowRecord` for a struct with named fields that implements
/// `Default`.
///
/// Each field is exposed under its camelCase name. `#[row(rename = "...")]`
/// overrides the name and `#[row(skip)]` leaves the field out.
#[proc_macro_derive(RowRecord, attributes(row))]
pub fn derive_row_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test_log::test]
    fn camel_case_joins_snake_case_words() {
        assert_eq!(camel_case("last_login_time"), "lastLoginTime");
        assert_eq!(camel_case("id"), "id");
        assert_eq!(camel_case("r#type"), "type");
        assert_eq!(camel_case("_private"), "private");
    }

    #[test_log::test]
    fn rejects_enums() {
        let input: DeriveInput = syn::parse_quote! {
            enum Admin { A, B }
        };

        assert!(expand(&input).is_err());
    }

    #[test_log::test]
    fn skipped_and_renamed_fields() {
        let input: DeriveInput = syn::parse_quote! {
            struct Admin {
                id: i64,
                #[row(rename = "user")]
                username: String,
                #[row(skip)]
                cache: Vec<u8>,
            }
        };

        let tokens = expand(&input).unwrap().to_string();

        assert!(tokens.contains("\"id\""));
        assert!(tokens.contains("\"user\""));
        assert!(!tokens.contains("cache"));
    }
}
