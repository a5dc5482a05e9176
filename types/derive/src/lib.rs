//! Crate with derive `ContractType` macro

// darling-generated code triggers this lint
#![allow(clippy::option_if_let_else)]

use darling::FromAttributes;
use manyhow::{manyhow, Result};
use proc_macro2::TokenStream;
use quote::quote;
use syn::parse_quote;

#[derive(Debug, Default, FromAttributes)]
#[darling(attributes(metadata))]
struct MetadataAttributes {
    name: Option<String>,
    #[darling(default)]
    optional: bool,
    #[darling(default)]
    skip: bool,
}

#[derive(Debug, Default)]
struct SerdeFieldOpts {
    rename: Option<String>,
    skip: bool,
    flatten: bool,
}

impl SerdeFieldOpts {
    /// Pick out the serde options relevant to the field shape, ignoring the rest
    fn from_attrs(attrs: &[syn::Attribute]) -> syn::Result<Self> {
        let mut opts = Self::default();
        for attr in attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    if meta.input.peek(syn::Token![=]) {
                        let lit: syn::LitStr = meta.value()?.parse()?;
                        opts.rename = Some(lit.value());
                    } else {
                        skip_meta(&meta)?;
                    }
                } else if meta.path.is_ident("skip") {
                    opts.skip = true;
                } else if meta.path.is_ident("flatten") {
                    opts.flatten = true;
                } else {
                    skip_meta(&meta)?;
                }
                Ok(())
            })?;
        }
        Ok(opts)
    }
}

/// Container level `#[serde(rename_all = "...")]` rule
#[derive(Debug, Clone, Copy)]
enum RenameRule {
    Lower,
    Upper,
    Pascal,
    Camel,
    Snake,
    ScreamingSnake,
    Kebab,
    ScreamingKebab,
}

impl RenameRule {
    fn from_attrs(attrs: &[syn::Attribute]) -> syn::Result<Option<Self>> {
        let mut rule = None;
        for attr in attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
            attr.parse_nested_meta(|meta| {
                if !meta.path.is_ident("rename_all") {
                    return skip_meta(&meta);
                }
                if !meta.input.peek(syn::Token![=]) {
                    return Err(meta.error(
                        "ContractType needs one `rename_all` rule for both directions",
                    ));
                }
                let lit: syn::LitStr = meta.value()?.parse()?;
                rule = Some(Self::from_lit(&lit)?);
                Ok(())
            })?;
        }
        Ok(rule)
    }

    fn from_lit(lit: &syn::LitStr) -> syn::Result<Self> {
        Ok(match lit.value().as_str() {
            "lowercase" => Self::Lower,
            "UPPERCASE" => Self::Upper,
            "PascalCase" => Self::Pascal,
            "camelCase" => Self::Camel,
            "snake_case" => Self::Snake,
            "SCREAMING_SNAKE_CASE" => Self::ScreamingSnake,
            "kebab-case" => Self::Kebab,
            "SCREAMING-KEBAB-CASE" => Self::ScreamingKebab,
            other => {
                return Err(syn::Error::new_spanned(
                    lit,
                    format!("unknown rename rule `{other}`"),
                ))
            }
        })
    }

    /// Name serde gives to the snake case `field`
    fn apply(self, field: &str) -> String {
        match self {
            Self::Lower | Self::Snake => field.to_owned(),
            Self::Upper | Self::ScreamingSnake => field.to_ascii_uppercase(),
            Self::Pascal => pascal_case(field),
            Self::Camel => {
                let pascal = pascal_case(field);
                let mut chars = pascal.chars();
                chars.next().map_or_else(String::new, |first| {
                    first.to_ascii_lowercase().to_string() + chars.as_str()
                })
            }
            Self::Kebab => field.replace('_', "-"),
            Self::ScreamingKebab => field.to_ascii_uppercase().replace('_', "-"),
        }
    }
}

fn pascal_case(field: &str) -> String {
    let mut pascal = String::with_capacity(field.len());
    let mut capitalize = true;
    for ch in field.chars() {
        if ch == '_' {
            capitalize = true;
        } else if capitalize {
            pascal.push(ch.to_ascii_uppercase());
            capitalize = false;
        } else {
            pascal.push(ch);
        }
    }
    pascal
}

fn skip_meta(meta: &syn::meta::ParseNestedMeta) -> syn::Result<()> {
    if meta.input.peek(syn::Token![=]) {
        let _: syn::Expr = meta.value()?.parse()?;
    } else if meta.input.peek(syn::token::Paren) {
        let content;
        syn::parenthesized!(content in meta.input);
        content.parse::<TokenStream>()?;
    }
    Ok(())
}

struct ContractField {
    ident: syn::Ident,
    ty: syn::Type,
    exported: bool,
    metadata: Option<MetadataAttributes>,
    serde: SerdeFieldOpts,
}

impl ContractField {
    /// Read the field's annotations.
    ///
    /// The recorded serde rename is the name serde actually uses,
    /// `rename_all` included. A metadata name must agree with it.
    fn from_field(field: &syn::Field, rename_all: Option<RenameRule>) -> Result<Self> {
        let Some(ident) = field.ident.clone() else {
            return Err(syn::Error::new_spanned(field, "expected a named field").into());
        };
        let metadata = if field.attrs.iter().any(|attr| attr.path().is_ident("metadata")) {
            Some(MetadataAttributes::from_attributes(&field.attrs)?)
        } else {
            None
        };

        let mut serde = SerdeFieldOpts::from_attrs(&field.attrs)?;
        let ident_name = ident.to_string();
        let ident_name = ident_name.strip_prefix("r#").unwrap_or(&ident_name).to_owned();
        if serde.rename.is_none() {
            serde.rename = rename_all
                .map(|rule| rule.apply(&ident_name))
                .filter(|renamed| *renamed != ident_name);
        }

        if let Some(MetadataAttributes {
            name: Some(name),
            skip: false,
            ..
        }) = &metadata
        {
            let serialized = serde.rename.as_deref().unwrap_or(&ident_name);
            if !serde.skip && !serde.flatten && name != serialized {
                let message =
                    format!("metadata name `{name}` does not match the serialized name `{serialized}`");
                return Err(syn::Error::new_spanned(&ident, message).into());
            }
        }

        Ok(Self {
            ident,
            ty: field.ty.clone(),
            exported: matches!(field.vis, syn::Visibility::Public(_)),
            metadata,
            serde,
        })
    }

    fn to_field_info(&self) -> TokenStream {
        let ident = self.ident.to_string();
        let ident = ident.strip_prefix("r#").unwrap_or(&ident);
        let ty = &self.ty;
        let exported = self.exported;
        let metadata = match &self.metadata {
            None => quote! { ::core::option::Option::None },
            Some(attrs) => {
                let name = option_str(attrs.name.as_deref());
                let optional = attrs.optional;
                let skip = attrs.skip;
                quote! {
                    ::core::option::Option::Some(fabric_contract_types::FieldAnnotation {
                        name: #name,
                        optional: #optional,
                        skip: #skip,
                    })
                }
            }
        };
        let rename = option_str(self.serde.rename.as_deref());
        let serde_skip = self.serde.skip;
        let flatten = self.serde.flatten;

        quote! {
            fabric_contract_types::FieldInfo {
                ident: #ident,
                exported: #exported,
                metadata: #metadata,
                serde_rename: #rename,
                serde_skip: #serde_skip,
                flatten: #flatten,
                ty: <#ty as fabric_contract_types::ContractType>::type_info,
            }
        }
    }
}

fn option_str(value: Option<&str>) -> TokenStream {
    match value {
        Some(value) => quote! { ::core::option::Option::Some(#value) },
        None => quote! { ::core::option::Option::None },
    }
}

/// Derive [`fabric_contract_types::ContractType`] for a struct with named fields.
///
/// Field visibility decides whether a field is exported. Recognised field
/// attributes:
///
/// - `#[metadata(name = "...", optional, skip)]` names the property, marks it
///   as not required or excludes it from metadata. The name must be the one
///   serde uses for the field.
/// - `#[serde(rename = "...")]`, `#[serde(skip)]`, `#[serde(flatten)]` and the
///   container's `#[serde(rename_all = "...")]` are honoured the same way
///   serde honours them
///
/// ```
/// use fabric_contract_types::{ContractType, TypeKind};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize, ContractType)]
/// pub struct Asset {
///     #[serde(rename = "ID")]
///     #[metadata(name = "ID")]
///     pub id: String,
///     #[metadata(optional)]
///     pub colour: Option<String>,
/// }
///
/// let TypeKind::Struct(info) = Asset::type_info().kind else {
///     unreachable!()
/// };
/// assert_eq!(info.fields[0].property_name(), "ID");
/// assert!(!info.fields[1].is_required());
/// ```
#[manyhow]
#[proc_macro_derive(ContractType, attributes(metadata))]
pub fn contract_type_derive(input: TokenStream) -> Result<TokenStream> {
    let mut input: syn::DeriveInput = syn::parse2(input)?;

    let syn::Data::Struct(syn::DataStruct {
        fields: syn::Fields::Named(named),
        ..
    }) = &input.data
    else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "ContractType can only be derived for structs with named fields",
        )
        .into());
    };

    let rename_all = RenameRule::from_attrs(&input.attrs)?;
    let fields = named
        .named
        .iter()
        .map(|field| ContractField::from_field(field, rename_all))
        .collect::<Result<Vec<_>>>()?;
    let field_infos = fields.iter().map(ContractField::to_field_info);

    input.generics.type_params_mut().for_each(|ty_param| {
        ty_param
            .bounds
            .push(parse_quote! {fabric_contract_types::ContractType});
    });

    let ident = &input.ident;
    let type_params = input
        .generics
        .type_params()
        .map(|param| &param.ident)
        .collect::<Vec<_>>();
    let name = if type_params.is_empty() {
        let name = ident.to_string();
        quote! { #name }
    } else {
        let prefix = format!("{ident}<{{}}>");
        quote! {
            ::std::format!(
                #prefix,
                [#(<#type_params as fabric_contract_types::ContractType>::type_info().name),*].join(", ")
            )
        }
    };

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics fabric_contract_types::ContractType for #ident #ty_generics #where_clause {
            fn type_info() -> fabric_contract_types::TypeInfo {
                fabric_contract_types::TypeInfo::structure::<Self>(
                    #name,
                    ::core::module_path!(),
                    ::std::vec![#(#field_infos),*],
                )
            }
        }
    })
}
