use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::ext::IdentExt;
use syn::{Data, DeriveInput, Fields, Lit, parse_macro_input};

/// Convert snake_case to camelCase
fn to_camel_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut capitalize_next = false;

    for c in s.chars() {
        if c == '_' {
            capitalize_next = true;
        } else if capitalize_next {
            result.push(c.to_ascii_uppercase());
            capitalize_next = false;
        } else {
            result.push(c);
        }
    }

    result
}

/// Parse a `key = "value"` pair inside `#[document(...)]`.
fn parse_str_value(meta: &syn::meta::ParseNestedMeta) -> syn::Result<String> {
    meta.input.parse::<syn::Token![=]>()?;
    let lit: Lit = meta.input.parse()?;
    match lit {
        Lit::Str(s) => Ok(s.value()),
        other => Err(syn::Error::new_spanned(other, "expected a string literal")),
    }
}

/// Container-level `#[document(...)]` options.
#[derive(Default)]
struct ContainerAttrs {
    rename_all: Option<String>,
    collection: Option<String>,
    id_field: Option<String>,
}

fn parse_container_attrs(input: &DeriveInput) -> syn::Result<ContainerAttrs> {
    let mut attrs = ContainerAttrs::default();
    for attr in &input.attrs {
        if !attr.path().is_ident("document") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") {
                let style = parse_str_value(&meta)?;
                if style != "camelCase" && style != "snake_case" {
                    return Err(meta.error("rename_all must be \"camelCase\" or \"snake_case\""));
                }
                attrs.rename_all = Some(style);
            } else if meta.path.is_ident("collection") {
                attrs.collection = Some(parse_str_value(&meta)?);
            } else if meta.path.is_ident("id_field") {
                attrs.id_field = Some(parse_str_value(&meta)?);
            } else {
                return Err(meta.error("unsupported document attribute"));
            }
            Ok(())
        })?;
    }

    if attrs.id_field.is_some() && attrs.collection.is_none() {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "id_field requires collection = \"...\"",
        ));
    }
    Ok(attrs)
}

/// Field-level `#[document(...)]` options.
#[derive(Default)]
struct FieldAttrs {
    rename: Option<String>,
    skip: bool,
}

fn parse_field_attrs(field: &syn::Field) -> syn::Result<FieldAttrs> {
    let mut attrs = FieldAttrs::default();
    for attr in &field.attrs {
        if !attr.path().is_ident("document") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                attrs.rename = Some(parse_str_value(&meta)?);
            } else if meta.path.is_ident("skip") {
                attrs.skip = true;
            } else {
                return Err(meta.error("unsupported document field attribute"));
            }
            Ok(())
        })?;
    }
    Ok(attrs)
}

/// Derive macro for document encoding and decoding.
///
/// Generates `typed_docstore::ToValue` and `typed_docstore::FromValue` for a
/// struct with named fields. Decoding reports every failing field, not just
/// the first.
///
/// ## Attributes
///
/// Container:
/// - `#[document(rename_all = "camelCase")]` - stored key style
/// - `#[document(collection = "name")]` - also implement `Collection`
/// - `#[document(collection = "name", id_field = "id")]` - inject the document
///   id under `id` on read
///
/// Field:
/// - `#[document(rename = "k")]` - stored key for this field
/// - `#[document(skip)]` - never written, `Default::default()` on read. Use
///   `Option<StorageDatetime>` for a skipped instant
///
/// ## Example
///
/// ```text
/// #[derive(Document)]
/// #[document(collection = "a", id_field = "id", rename_all = "camelCase")]
/// pub struct Article {
///     pub id: String,
///     pub title: String,
///     pub published_at: StorageDatetime,
///     pub featured: Option<bool>,
/// }
/// ```
#[proc_macro_derive(Document, attributes(document))]
pub fn derive_document(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_document(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_document(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Document only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "Document only supports structs",
            ));
        }
    };
    let container = parse_container_attrs(input)?;

    let mut inserts = Vec::new();
    let mut decoded_idents = Vec::new();
    let mut decode_stmts = Vec::new();
    let mut field_inits = Vec::new();

    for field in fields.iter() {
        let Some(field_name) = field.ident.as_ref() else {
            continue;
        };
        let field_ty = &field.ty;
        let attrs = parse_field_attrs(field)?;

        if attrs.skip {
            field_inits.push(quote! { #field_name: ::std::default::Default::default() });
            continue;
        }

        let rust_name = field_name.unraw().to_string();
        let key = match (&attrs.rename, container.rename_all.as_deref()) {
            (Some(rename), _) => rename.clone(),
            (None, Some("camelCase")) => to_camel_case(&rust_name),
            _ => rust_name,
        };
        let local = format_ident!("__field_{}", field_name.unraw());

        inserts.push(quote! {
            map.insert(
                ::std::string::String::from(#key),
                typed_docstore::ToValue::to_value(&self.#field_name),
            );
        });
        decode_stmts.push(quote! {
            let #local = report.capture(typed_docstore::decode_field::<#field_ty>(map, #key, path));
        });
        decoded_idents.push(local.clone());
        field_inits.push(quote! { #field_name: #local });
    }

    let decode_body = if decoded_idents.is_empty() {
        quote! {
            let _ = (map, path);
            Ok(Self { #(#field_inits),* })
        }
    } else {
        quote! {
            let mut report = typed_docstore::DecodeReport::new();
            #(#decode_stmts)*
            match (#(#decoded_idents,)*) {
                (#(Some(#decoded_idents),)*) => Ok(Self { #(#field_inits),* }),
                _ => Err(report),
            }
        }
    };

    let expected = name.to_string();

    // Generate Collection impl if #[document(collection = "...")] is present
    let collection_impl = if let Some(collection) = &container.collection {
        let id_field = match &container.id_field {
            Some(field) => quote! { Some(#field) },
            None => quote! { None },
        };
        quote! {
            impl #impl_generics typed_docstore::Collection for #name #ty_generics #where_clause {
                fn collection_name() -> &'static str {
                    #collection
                }

                fn id_field() -> Option<&'static str> {
                    #id_field
                }
            }
        }
    } else {
        quote! {}
    };

    Ok(quote! {
        impl #impl_generics typed_docstore::ToValue for #name #ty_generics #where_clause {
            fn to_value(&self) -> typed_docstore::Value {
                #[allow(unused_mut)]
                let mut map = typed_docstore::Map::new();
                #(#inserts)*
                typed_docstore::Value::Map(map)
            }
        }

        impl #impl_generics typed_docstore::FromValue for #name #ty_generics #where_clause {
            const EXPECTED: &'static str = #expected;

            fn from_value(
                value: &typed_docstore::Value,
                path: &str,
            ) -> ::std::result::Result<Self, typed_docstore::DecodeReport> {
                let map = match value {
                    typed_docstore::Value::Map(map) => map,
                    other => {
                        return Err(typed_docstore::DecodeReport::mismatch(path, "map", other));
                    }
                };
                #decode_body
            }
        }

        #collection_impl
    })
}
