//! Builtin validation rules.
//!
//! Every rule receives the checked value as a `&str` expression and the field
//! name for the error message. Add new rules to [`dispatch`].
use proc_macro2::{Ident, TokenStream as TokenStream2};
use quote::quote;

pub(crate) fn dispatch(rule: &str, value: &TokenStream2, field: &Ident) -> Option<TokenStream2> {
    let name = field.to_string();
    let ts = match rule {
        "non_empty" => quote! {
            if #value.trim().is_empty() {
                return Err(::core::convert::From::from(
                    ::std::format!("{} must be non-empty", #name),
                ));
            }
        },
        "no_control_chars" => quote! {
            if #value.chars().any(char::is_control) {
                return Err(::core::convert::From::from(
                    ::std::format!("{} must not contain control characters", #name),
                ));
            }
        },
        // German postal codes: exactly five ASCII digits.
        "postal_code" => quote! {
            {
                let v = #value.trim();
                if v.len() != 5 || !v.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(::core::convert::From::from(
                        ::std::format!("{} must be a five digit postal code", #name),
                    ));
                }
            }
        },
        "email" => quote! {
            {
                let v = #value.trim();
                let valid = match v.split_once('@') {
                    Some((local, domain)) => {
                        !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
                    }
                    None => false,
                };
                if !valid {
                    return Err(::core::convert::From::from(
                        ::std::format!("{} must be an e-mail address", #name),
                    ));
                }
            }
        },
        _ => return None,
    };
    Some(ts)
}
