//! Derive macros for native query entities.
//!
//! This crate provides `#[derive(Entity)]` and `#[derive(Embeddable)]`,
//! which describe a struct to the `oxide-native` metamodel and convert
//! mapped rows back into it.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, Expr, Fields, GenericArgument, Ident, Lit,
    Meta, Path, PathArguments, Type,
};

/// Derives `Entity` and `FromResultValue` for a struct.
///
/// # Attributes
///
/// - `#[entity(name = "Name", table = "table")]` - Entity name (defaults to
///   the struct name) and table (defaults to snake_case of the struct name)
///
/// # Field Attributes
///
/// - `#[id]` / `#[id(column = "c")]` - The identifier attribute
/// - `#[embedded_id]` - An identifier made of an embeddable
/// - `#[column(name = "c")]` - Column name (defaults to the field name)
/// - `#[embedded]` - A field whose type derives `Embeddable`
/// - `#[to_one(column = "c")]` - A to-one association; the field type is the
///   target entity, optionally wrapped in `Option`
/// - `#[convert(with = Converter)]` - Reads the column through an
///   `AttributeConverter`
/// - `#[transient]` - Not mapped; filled with `Default::default()`
#[proc_macro_derive(
    Entity,
    attributes(entity, id, embedded_id, column, embedded, to_one, convert, transient)
)]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    derive_entity_impl(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Derives `Embeddable` and `FromResultValue` for a struct.
///
/// Accepts the `column`, `embedded`, `convert` and `transient` field
/// attributes of [`Entity`](derive@Entity), and `#[embeddable(name = "N")]`
/// on the struct.
#[proc_macro_derive(Embeddable, attributes(embeddable, column, embedded, convert, transient))]
pub fn derive_embeddable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    derive_embeddable_impl(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

fn derive_entity_impl(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let container = parse_container_attrs(&input.attrs, "entity")?;
    let entity_name = container.name.unwrap_or_else(|| struct_name.to_string());
    let table_name = container
        .table
        .unwrap_or_else(|| to_snake_case(&struct_name.to_string()));
    let fields = collect_fields(&input)?;

    let mut identifier = None;
    let mut attributes = Vec::new();
    for field in &fields {
        let attribute = field.ident.to_string();
        let column = &field.column;
        match &field.kind {
            FieldKind::Id => {
                let type_code = field.type_code();
                set_identifier(
                    &mut identifier,
                    field,
                    quote! {
                        ::oxide_native::IdentifierMapping::Basic {
                            attribute: #attribute.to_string(),
                            column: #column.to_string(),
                            type_code: #type_code,
                        }
                    },
                )?;
            }
            FieldKind::EmbeddedId => {
                let ty = &field.ty;
                set_identifier(
                    &mut identifier,
                    field,
                    quote! {
                        ::oxide_native::IdentifierMapping::Embedded {
                            attribute: #attribute.to_string(),
                            embeddable: <#ty as ::oxide_native::Embeddable>::embeddable_mapping(),
                        }
                    },
                )?;
            }
            FieldKind::ToOne => {
                let target = option_inner(&field.ty);
                attributes.push(quote! {
                    .with_to_one(
                        #attribute,
                        <#target as ::oxide_native::Entity>::ENTITY_NAME,
                        #column,
                    )
                });
            }
            FieldKind::Basic | FieldKind::Embedded | FieldKind::Transient => {
                if let Some(attribute) = field.attribute_mapping() {
                    attributes.push(attribute);
                }
            }
        }
    }
    let identifier = identifier.ok_or_else(|| {
        syn::Error::new_spanned(
            struct_name,
            "Entity derive requires one #[id] or #[embedded_id] field",
        )
    })?;

    let field_inits: Vec<TokenStream2> = fields
        .iter()
        .map(|f| f.initializer(&quote!(instance)))
        .collect();

    Ok(quote! {
        impl ::oxide_native::Entity for #struct_name {
            const ENTITY_NAME: &'static str = #entity_name;

            fn entity_mapping() -> ::oxide_native::EntityMapping {
                ::oxide_native::EntityMapping::new(#entity_name, #table_name, #identifier)
                    #(#attributes)*
            }
        }

        impl ::oxide_native::FromResultValue for #struct_name {
            fn from_result_value(
                value: ::oxide_native::ResultValue,
            ) -> ::oxide_native::Result<Self> {
                let instance = ::oxide_native::expect_entity(value, #entity_name)?;
                Ok(Self {
                    #(#field_inits),*
                })
            }

            fn result_type_name() -> ::std::string::String {
                #entity_name.to_string()
            }

            fn accepts(shape: &::oxide_native::ResultShape) -> bool {
                matches!(shape, ::oxide_native::ResultShape::Entity(name) if name == #entity_name)
            }
        }
    })
}

fn derive_embeddable_impl(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let container = parse_container_attrs(&input.attrs, "embeddable")?;
    let name = container.name.unwrap_or_else(|| struct_name.to_string());
    let fields = collect_fields(&input)?;

    let mut attributes = Vec::new();
    for field in &fields {
        if matches!(field.kind, FieldKind::Id | FieldKind::EmbeddedId | FieldKind::ToOne) {
            return Err(syn::Error::new_spanned(
                &field.ident,
                "Embeddable fields cannot be identifiers or associations",
            ));
        }
        if let Some(attribute) = field.attribute_mapping() {
            attributes.push(attribute);
        }
    }
    let field_inits: Vec<TokenStream2> = fields
        .iter()
        .map(|f| f.initializer(&quote!(composite)))
        .collect();

    Ok(quote! {
        impl ::oxide_native::Embeddable for #struct_name {
            fn embeddable_mapping() -> ::oxide_native::EmbeddableMapping {
                ::oxide_native::EmbeddableMapping::new(#name)
                    #(#attributes)*
            }
        }

        impl ::oxide_native::FromResultValue for #struct_name {
            fn from_result_value(
                value: ::oxide_native::ResultValue,
            ) -> ::oxide_native::Result<Self> {
                let composite = ::oxide_native::expect_composite(value, #name)?;
                Ok(Self {
                    #(#field_inits),*
                })
            }

            fn result_type_name() -> ::std::string::String {
                #name.to_string()
            }

            fn accepts(_shape: &::oxide_native::ResultShape) -> bool {
                false
            }
        }
    })
}

fn set_identifier(
    identifier: &mut Option<TokenStream2>,
    field: &FieldInfo,
    tokens: TokenStream2,
) -> syn::Result<()> {
    if identifier.is_some() {
        return Err(syn::Error::new_spanned(
            &field.ident,
            "Entity derive allows only one identifier field",
        ));
    }
    *identifier = Some(tokens);
    Ok(())
}

enum FieldKind {
    Id,
    EmbeddedId,
    Basic,
    Embedded,
    ToOne,
    Transient,
}

struct FieldInfo {
    ident: Ident,
    ty: Type,
    column: String,
    kind: FieldKind,
    converter: Option<Path>,
}

impl FieldInfo {
    /// Type code of the column, taken from the converter when present.
    fn type_code(&self) -> TokenStream2 {
        let ty = &self.ty;
        match &self.converter {
            Some(converter) => quote! {
                <<#converter as ::oxide_native::AttributeConverter>::Relational
                    as ::oxide_native::FieldType>::TYPE_CODE
            },
            None => quote! { <#ty as ::oxide_native::FieldType>::TYPE_CODE },
        }
    }

    fn attribute_mapping(&self) -> Option<TokenStream2> {
        let attribute = self.ident.to_string();
        let column = &self.column;
        let ty = option_inner(&self.ty);
        match self.kind {
            FieldKind::Basic => {
                let type_code = self.type_code();
                Some(quote! { .with_basic(#attribute, #column, #type_code) })
            }
            FieldKind::Embedded => Some(quote! {
                .with_embedded(#attribute, <#ty as ::oxide_native::Embeddable>::embeddable_mapping())
            }),
            _ => None,
        }
    }

    fn initializer(&self, source: &TokenStream2) -> TokenStream2 {
        let ident = &self.ident;
        let attribute = ident.to_string();
        let ty = &self.ty;
        if matches!(self.kind, FieldKind::Transient) {
            return quote! { #ident: ::core::default::Default::default() };
        }
        match &self.converter {
            Some(converter) => quote! {
                #ident: {
                    let relational = #source.attribute::<
                        <#converter as ::oxide_native::AttributeConverter>::Relational,
                    >(#attribute)?;
                    <#converter as ::oxide_native::AttributeConverter>::to_domain(relational)
                        .map_err(|message| ::oxide_native::QueryError::AttributeConversion {
                            attribute: #attribute.to_string(),
                            message,
                        })?
                }
            },
            None => quote! { #ident: #source.attribute::<#ty>(#attribute)? },
        }
    }
}

fn collect_fields(input: &DeriveInput) -> syn::Result<Vec<FieldInfo>> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "mapped structs cannot be generic",
        ));
    }
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    "derive only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "derive only supports structs",
            ));
        }
    };

    let mut infos = Vec::with_capacity(fields.len());
    for field in fields {
        let Some(ident) = field.ident.clone() else {
            return Err(syn::Error::new_spanned(field, "unnamed field"));
        };
        let attrs = parse_field_attrs(&field.attrs)?;
        let column = attrs.column.unwrap_or_else(|| match attrs.kind {
            FieldKind::ToOne => format!("{ident}_id"),
            _ => ident.to_string(),
        });
        if attrs.converter.is_some()
            && !matches!(attrs.kind, FieldKind::Basic | FieldKind::Id)
        {
            return Err(syn::Error::new_spanned(
                &ident,
                "#[convert] only applies to basic attributes",
            ));
        }
        infos.push(FieldInfo {
            ident,
            ty: field.ty.clone(),
            column,
            kind: attrs.kind,
            converter: attrs.converter,
        });
    }
    Ok(infos)
}

#[derive(Default)]
struct ContainerAttrs {
    name: Option<String>,
    table: Option<String>,
}

fn parse_container_attrs(attrs: &[Attribute], ident: &str) -> syn::Result<ContainerAttrs> {
    let mut result = ContainerAttrs::default();
    for attr in attrs {
        if !attr.path().is_ident(ident) {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                result.name = Some(string_value(&meta.value()?.parse::<Expr>()?)?);
            } else if meta.path.is_ident("table") {
                result.table = Some(string_value(&meta.value()?.parse::<Expr>()?)?);
            } else {
                return Err(meta.error("unsupported attribute"));
            }
            Ok(())
        })?;
    }
    Ok(result)
}

struct FieldAttrs {
    kind: FieldKind,
    column: Option<String>,
    converter: Option<Path>,
}

fn parse_field_attrs(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut result = FieldAttrs {
        kind: FieldKind::Basic,
        column: None,
        converter: None,
    };

    for attr in attrs {
        let path = attr.path();
        if path.is_ident("id") {
            result.kind = FieldKind::Id;
            if !matches!(attr.meta, Meta::Path(_)) {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("column") {
                        result.column = Some(string_value(&meta.value()?.parse::<Expr>()?)?);
                        Ok(())
                    } else {
                        Err(meta.error("unsupported id attribute"))
                    }
                })?;
            }
        } else if path.is_ident("embedded_id") {
            result.kind = FieldKind::EmbeddedId;
        } else if path.is_ident("embedded") {
            result.kind = FieldKind::Embedded;
        } else if path.is_ident("transient") {
            result.kind = FieldKind::Transient;
        } else if path.is_ident("to_one") {
            result.kind = FieldKind::ToOne;
            if !matches!(attr.meta, Meta::Path(_)) {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("column") {
                        result.column = Some(string_value(&meta.value()?.parse::<Expr>()?)?);
                        Ok(())
                    } else {
                        Err(meta.error("unsupported to_one attribute"))
                    }
                })?;
            }
        } else if path.is_ident("column") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    result.column = Some(string_value(&meta.value()?.parse::<Expr>()?)?);
                    Ok(())
                } else {
                    Err(meta.error("unsupported column attribute"))
                }
            })?;
        } else if path.is_ident("convert") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("with") {
                    result.converter = Some(meta.value()?.parse()?);
                    Ok(())
                } else {
                    Err(meta.error("unsupported convert attribute"))
                }
            })?;
        }
    }

    Ok(result)
}

fn string_value(expr: &Expr) -> syn::Result<String> {
    if let Expr::Lit(lit) = expr {
        if let Lit::Str(s) = &lit.lit {
            return Ok(s.value());
        }
    }
    Err(syn::Error::new_spanned(expr, "expected a string literal"))
}

/// `T` for `Option<T>`, otherwise the type itself.
fn option_inner(ty: &Type) -> &Type {
    if let Type::Path(path) = ty {
        if let Some(segment) = path.path.segments.last() {
            if segment.ident == "Option" {
                if let PathArguments::AngleBracketed(args) = &segment.arguments {
                    if let Some(GenericArgument::Type(inner)) = args.args.first() {
                        return inner;
                    }
                }
            }
        }
    }
    ty
}

fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.push(c.to_ascii_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}
