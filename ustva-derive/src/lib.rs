//! `#[derive(Validate)]`: generates a validating `new` constructor.
//!
//! Rules are attached with `#[validate(rule, ...)]` on the struct (applies to
//! every field) or on a single field (overrides the struct rules). Rules apply
//! to `String` fields and to the inner value of `Option<String>` fields.
//! `#[validate(skip)]` opts a field out. The error type defaults to `String`
//! and can be changed with `#[validate_error(Type)]`; it must implement
//! `From<String>`.
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{quote, ToTokens};
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, Fields, GenericArgument, PathArguments, Type,
};

mod rules;

fn extract_error_type(attrs: &[Attribute]) -> syn::Result<TokenStream2> {
    for attr in attrs.iter().filter(|a| a.path().is_ident("validate_error")) {
        let mut ty = None;
        attr.parse_nested_meta(|meta| {
            ty = Some(meta.path.to_token_stream());
            Ok(())
        })?;
        if let Some(t) = ty {
            return Ok(t);
        }
    }
    Ok(quote! { String })
}

fn extract_rules(attrs: &[Attribute]) -> syn::Result<Vec<String>> {
    let mut out = vec![];
    for attr in attrs.iter().filter(|a| a.path().is_ident("validate")) {
        attr.parse_nested_meta(|meta| {
            if let Some(id) = meta.path.get_ident() {
                out.push(id.to_string());
            }
            Ok(())
        })?;
    }
    Ok(out)
}

enum StringField {
    Plain,
    Optional,
}

fn is_string_path(ty: &Type) -> bool {
    match ty {
        Type::Path(p) => p
            .path
            .segments
            .last()
            .map(|s| s.ident == "String")
            .unwrap_or(false),
        _ => false,
    }
}

fn string_field(ty: &Type) -> Option<StringField> {
    if is_string_path(ty) {
        return Some(StringField::Plain);
    }
    let Type::Path(p) = ty else { return None };
    let last = p.path.segments.last()?;
    if last.ident != "Option" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &last.arguments else {
        return None;
    };
    match args.args.first() {
        Some(GenericArgument::Type(inner)) if is_string_path(inner) => Some(StringField::Optional),
        _ => None,
    }
}

#[proc_macro_derive(Validate, attributes(validate, validate_error))]
pub fn derive_validate(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);
    match expand(ast) {
        Ok(ts) => ts.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(ast: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = ast.ident;
    let error_type = extract_error_type(&ast.attrs)?;
    let struct_rules = extract_rules(&ast.attrs)?;

    let mut ctor_params = vec![];
    let mut ctor_assigns = vec![];
    let mut validations = vec![];

    let fields = match ast.data {
        Data::Struct(s) => match s.fields {
            Fields::Named(n) => n.named,
            _ => return Ok(quote! { compile_error!("Validate supports named structs only"); }),
        },
        _ => return Ok(quote! { compile_error!("Validate can only be used on structs"); }),
    };

    for field in fields {
        let Some(ident) = field.ident else { continue };
        let ty = field.ty;

        ctor_params.push(quote! { #ident: #ty });
        ctor_assigns.push(quote! { #ident });

        let mut field_rules = extract_rules(&field.attrs)?;
        if field_rules.iter().any(|r| r == "skip") {
            continue;
        }
        if field_rules.is_empty() {
            field_rules = struct_rules.clone();
        }
        if field_rules.is_empty() {
            continue;
        }

        let Some(kind) = string_field(&ty) else {
            let msg = format!(
                "Validation rules can only be applied to String or Option<String> fields: {}",
                ident
            );
            return Ok(quote! { compile_error!(#msg); });
        };

        let mut checks = vec![];
        for rule in field_rules {
            let value = quote! { value };
            match rules::dispatch(&rule, &value, &ident) {
                Some(ts) => checks.push(ts),
                None => {
                    let msg = format!("Unknown rule `{}`", rule);
                    return Ok(quote! { compile_error!(#msg); });
                }
            }
        }

        validations.push(match kind {
            StringField::Plain => quote! {
                {
                    let value: &str = #ident.as_str();
                    #(#checks)*
                }
            },
            StringField::Optional => quote! {
                if let Some(value) = #ident.as_deref() {
                    #(#checks)*
                }
            },
        });
    }

    Ok(quote! {
        impl #struct_name {
            #[allow(clippy::too_many_arguments)]
            pub fn new(
                #(#ctor_params),*
            ) -> ::core::result::Result<Self, #error_type> {
                #(
                    #validations
                )*

                Ok(Self {
                    #(#ctor_assigns),*
                })
            }
        }
    })
}
