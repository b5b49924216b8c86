use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{parse_macro_input, DeriveInput, Expr, Fields, Ident, Lit, Variant};

/// Derives `FromStr` and `Display` for a line protocol enum.
///
/// Every variant becomes a command word followed by its fields, separated by whitespace:
/// `Reset(Flag)` with `#[burk(name = "reset")]` reads and writes `reset 1`. Without the
/// attribute the upper-cased variant name is used. Fields are parsed with their own `FromStr`.
/// The generated code refers to `alloc`, so the deriving crate needs `extern crate alloc;`.
#[proc_macro_derive(Burk, attributes(burk))]
pub fn derive(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);
    expand(ast)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

fn expand(ast: DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let enum_name = &ast.ident;
    let variants = match &ast.data {
        syn::Data::Enum(en) => &en.variants,
        _ => {
            return Err(syn::Error::new_spanned(
                &ast.ident,
                "'burk' can only be derived on enums",
            ))
        }
    };

    let mut cmd_names = Vec::new();
    for variant in variants {
        cmd_names.push(command_name(variant)?);
        if let Fields::Named(named) = &variant.fields {
            return Err(syn::Error::new_spanned(
                named,
                "'burk' variants take unnamed fields only",
            ));
        }
    }

    let mut match_code = quote! {};
    for (cmd_name, variant) in cmd_names.iter().zip(variants) {
        let ident = &variant.ident;
        if variant.fields.is_empty() {
            match_code.extend(quote! {
                Some(#cmd_name) => core::result::Result::Ok(Self::#ident),
            });
            continue;
        }
        let parse_fields = variant.fields.iter().map(|field| {
            let ty = &field.ty;
            quote! {
                parts.next().ok_or(())?.parse::<#ty>().map_err(|_| ())?
            }
        });
        match_code.extend(quote! {
            Some(#cmd_name) => core::result::Result::Ok(Self::#ident(#(#parse_fields),*)),
        });
    }

    let mut match_fmt = quote! {};
    for (cmd_name, variant) in cmd_names.iter().zip(variants) {
        let ident = &variant.ident;
        let field_idents: Vec<_> = (0..variant.fields.len())
            .map(|cnt| Ident::new(&format!("f{cnt}"), Span::call_site()))
            .collect();
        if field_idents.is_empty() {
            match_fmt.extend(quote! {
                Self::#ident => f.write_str(#cmd_name),
            });
        } else {
            match_fmt.extend(quote! {
                Self::#ident(#(#field_idents),*) => {
                    f.write_str(#cmd_name)?;
                    #(write!(f, " {}", #field_idents)?;)*
                    Ok(())
                }
            });
        }
    }

    Ok(quote! {
        impl core::str::FromStr for #enum_name {
            type Err = alloc::string::String;
            fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
                let mut parts = s.split_whitespace();
                let parsed: core::result::Result<Self, ()> = (|| match parts.next() {
                    #match_code
                    _ => core::result::Result::Err(()),
                })();
                let parsed = match parsed {
                    core::result::Result::Ok(value) if parts.next().is_none() => {
                        core::result::Result::Ok(value)
                    }
                    _ => core::result::Result::Err(()),
                };
                parsed.map_err(|_| alloc::format!("failed to parse: {:?}", s))
            }
        }
        impl core::fmt::Display for #enum_name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                match self {
                    #match_fmt
                }
            }
        }
    })
}

fn command_name(variant: &Variant) -> syn::Result<String> {
    let mut custom_name = None;
    for attr in &variant.attrs {
        if !attr.path.is_ident("burk") {
            continue;
        }
        let expr: Expr = attr.parse_args()?;
        let lit = match expr {
            Expr::Assign(assign) => match *assign.right {
                Expr::Lit(exprlit) => exprlit.lit,
                other => {
                    return Err(syn::Error::new_spanned(
                        other,
                        "expected a string literal on the right side",
                    ))
                }
            },
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "expected `name = \"...\"`",
                ))
            }
        };
        match lit {
            Lit::Str(name) => custom_name = Some(name.value()),
            other => return Err(syn::Error::new_spanned(other, "name must be a string")),
        }
    }
    Ok(custom_name.unwrap_or_else(|| variant.ident.to_string().to_uppercase()))
}
