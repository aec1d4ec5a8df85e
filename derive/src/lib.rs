/*!
 * DeepRelease Derive
 *
 * Generates structural `DeepRelease` implementations for records and tagged
 * sums. Fields are released in declaration order; enums release only the
 * payload of the variant that is live.
 *
 * Attributes:
 * - `#[deep_release(skip)]` on a field: never traversed (opaque data)
 * - `#[deep_release(explicit)]` on a type: delegate to `ExplicitRelease`
 *   instead of walking the fields
 */

use proc_macro::TokenStream;
use proc_macro2::{TokenStream as TokenStream2, TokenTree};
use quote::{format_ident, quote, ToTokens};
use std::collections::HashSet;
use syn::{
    parse_macro_input, parse_quote, Attribute, Data, DeriveInput, Fields, Generics, Ident, Path,
    Type,
};

#[proc_macro_derive(DeepRelease, attributes(deep_release))]
pub fn derive_deep_release(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: DeriveInput) -> syn::Result<TokenStream2> {
    let krate: Path = parse_quote!(::resguard);
    let name = &input.ident;

    let (generics, body) = if is_explicit(&input.attrs)? {
        let mut generics = input.generics.clone();
        generics
            .make_where_clause()
            .predicates
            .push(parse_quote!(Self: #krate::ExplicitRelease));
        let body = quote! {
            #krate::ExplicitRelease::release_explicit(self)
        };
        (generics, body)
    } else {
        let body = match &input.data {
            Data::Struct(data) => {
                let (pattern, calls) = destructure(quote!(Self), &data.fields, &krate)?;
                quote! {
                    let #pattern = self;
                    #calls
                }
            }
            Data::Enum(data) => {
                let mut arms = Vec::with_capacity(data.variants.len());
                for variant in &data.variants {
                    let ident = &variant.ident;
                    let (pattern, calls) =
                        destructure(quote!(Self::#ident), &variant.fields, &krate)?;
                    arms.push(quote! {
                        #pattern => { #calls }
                    });
                }
                quote! {
                    match self {
                        #(#arms)*
                    }
                }
            }
            Data::Union(_) => {
                return Err(syn::Error::new_spanned(
                    name,
                    "untagged unions cannot be traversed; implement ExplicitRelease \
                     and mark the type #[deep_release(explicit)]",
                ));
            }
        };
        let generics = add_bounds(input.generics.clone(), &input.data, &krate)?;
        (generics, body)
    };

    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();
    Ok(quote! {
        impl #impl_generics #krate::DeepRelease for #name #ty_generics #where_clause {
            #[inline]
            fn deep_release(self) {
                #body
            }
        }
    })
}

/// Build an irrefutable pattern binding every non-skipped field, plus the
/// release calls for those bindings in declaration order.
fn destructure(
    path: TokenStream2,
    fields: &Fields,
    krate: &Path,
) -> syn::Result<(TokenStream2, TokenStream2)> {
    let mut calls = Vec::new();

    let pattern = match fields {
        Fields::Named(named) => {
            let mut bindings = Vec::with_capacity(named.named.len());
            for (index, field) in named.named.iter().enumerate() {
                let Some(ident) = field.ident.as_ref() else {
                    return Err(syn::Error::new_spanned(field, "named field without ident"));
                };
                if is_skipped(&field.attrs)? {
                    bindings.push(quote!(#ident: _));
                } else {
                    let binding = format_ident!("__field{}", index);
                    bindings.push(quote!(#ident: #binding));
                    calls.push(quote!(#krate::DeepRelease::deep_release(#binding);));
                }
            }
            quote!(#path { #(#bindings),* })
        }
        Fields::Unnamed(unnamed) => {
            let mut bindings = Vec::with_capacity(unnamed.unnamed.len());
            for (index, field) in unnamed.unnamed.iter().enumerate() {
                if is_skipped(&field.attrs)? {
                    bindings.push(quote!(_));
                } else {
                    let binding = format_ident!("__field{}", index);
                    bindings.push(quote!(#binding));
                    calls.push(quote!(#krate::DeepRelease::deep_release(#binding);));
                }
            }
            quote!(#path( #(#bindings),* ))
        }
        Fields::Unit => quote!(#path),
    };

    Ok((pattern, quote!(#(#calls)*)))
}

/// Require `DeepRelease` on every traversed field type that mentions a type
/// parameter. Skipped fields and parameters used only in no-op positions
/// (`PhantomData<M>`) get no bound; concrete field types are checked in the
/// body, which keeps recursive types free of cyclic where-clauses.
fn add_bounds(mut generics: Generics, data: &Data, krate: &Path) -> syn::Result<Generics> {
    let params: HashSet<Ident> = generics.type_params().map(|p| p.ident.clone()).collect();
    if params.is_empty() {
        return Ok(generics);
    }

    let fields: Vec<&Fields> = match data {
        Data::Struct(data) => vec![&data.fields],
        Data::Enum(data) => data.variants.iter().map(|v| &v.fields).collect(),
        Data::Union(_) => Vec::new(),
    };

    let mut seen = HashSet::new();
    let mut bounded: Vec<&Type> = Vec::new();
    for field in fields.into_iter().flat_map(|f| f.iter()) {
        if is_skipped(&field.attrs)? || !mentions_param(field.ty.to_token_stream(), &params) {
            continue;
        }
        if seen.insert(field.ty.to_token_stream().to_string()) {
            bounded.push(&field.ty);
        }
    }

    let where_clause = generics.make_where_clause();
    for ty in bounded {
        where_clause
            .predicates
            .push(parse_quote!(#ty: #krate::DeepRelease));
    }
    Ok(generics)
}

fn mentions_param(tokens: TokenStream2, params: &HashSet<Ident>) -> bool {
    tokens.into_iter().any(|tree| match tree {
        TokenTree::Ident(ident) => params.contains(&ident),
        TokenTree::Group(group) => mentions_param(group.stream(), params),
        _ => false,
    })
}

fn is_explicit(attrs: &[Attribute]) -> syn::Result<bool> {
    let mut explicit = false;
    for attr in attrs.iter().filter(|a| a.path().is_ident("deep_release")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("explicit") {
                explicit = true;
                Ok(())
            } else {
                Err(meta.error("expected `explicit`"))
            }
        })?;
    }
    Ok(explicit)
}

fn is_skipped(attrs: &[Attribute]) -> syn::Result<bool> {
    let mut skip = false;
    for attr in attrs.iter().filter(|a| a.path().is_ident("deep_release")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                skip = true;
                Ok(())
            } else {
                Err(meta.error("expected `skip`"))
            }
        })?;
    }
    Ok(skip)
}
