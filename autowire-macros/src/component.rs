use darling::util::Flag;
use darling::{FromDeriveInput, FromField, FromMeta, ast};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{quote, quote_spanned};
use syn::ext::IdentExt;
use syn::spanned::Spanned;
use syn::{Attribute, DeriveInput, Expr, Ident, LitStr, Meta, Path, Type, parse_macro_input};

#[derive(FromDeriveInput)]
#[darling(attributes(component), supports(struct_named, struct_unit))]
struct ComponentArgs {
    ident: Ident,
    generics: syn::Generics,
    data: ast::Data<(), ComponentField>,
    #[darling(multiple, rename = "register")]
    registrations: Vec<RegisterArgs>,
    #[darling(default)]
    environment: Option<EnvironmentArgs>,
    skip_scan: Flag,
}

#[derive(FromField)]
#[darling(forward_attrs(resolve, property))]
struct ComponentField {
    ident: Option<Ident>,
    ty: Type,
    vis: syn::Visibility,
    attrs: Vec<Attribute>,
}

#[derive(FromMeta)]
struct RegisterArgs {
    lifetime: LifetimeArg,
    #[darling(default)]
    service: Option<Type>,
    #[darling(default)]
    into: Option<Path>,
    #[darling(default)]
    name: Option<String>,
}

#[derive(FromMeta, Clone, Copy)]
#[darling(rename_all = "snake_case")]
enum LifetimeArg {
    Transient,
    Scoped,
    Singleton,
}

#[derive(FromMeta, Default)]
struct EnvironmentArgs {
    #[darling(default)]
    enabled: Option<String>,
    #[darling(default)]
    disabled: Option<String>,
}

/// A field after its `#[resolve]` / `#[property]` attributes are read.
struct Slot<'a> {
    ident: &'a Ident,
    ty: &'a Type,
    public: bool,
    property: bool,
    resolvers: Vec<Expr>,
}

pub fn derive_component(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let expanded = ComponentArgs::from_derive_input(&input)
        .map_err(darling::Error::write_errors)
        .and_then(|args| generate_component_impl(&args).map_err(|e| e.to_compile_error()));

    match expanded {
        Ok(tokens) | Err(tokens) => TokenStream::from(tokens),
    }
}

fn generate_component_impl(args: &ComponentArgs) -> syn::Result<TokenStream2> {
    let name = &args.ident;

    if !args.generics.params.is_empty() {
        return Err(syn::Error::new(
            args.generics.span(),
            "#[derive(Component)] does not support generic types",
        ));
    }

    let fields = match &args.data {
        ast::Data::Struct(fields) => fields,
        ast::Data::Enum(_) => {
            return Err(syn::Error::new(
                name.span(),
                "#[derive(Component)] can only be applied to structs",
            ));
        }
    };
    let unit = matches!(fields.style, ast::Style::Unit);

    let slots = fields
        .fields
        .iter()
        .map(read_slot)
        .collect::<syn::Result<Vec<_>>>()?;

    let registrations = args.registrations.iter().map(registration_tokens);
    let environment = args.environment.as_ref().map(environment_tokens);

    let (parameters, properties): (Vec<&Slot>, Vec<&Slot>) =
        slots.iter().partition(|slot| !slot.property);

    let parameter_infos = parameters.iter().map(|slot| {
        let ty = slot.ty;
        let label = slot_name(slot.ident);
        let resolvers = &slot.resolvers;
        quote! {
            ::autowire::metadata::ParameterInfo::of::<#ty>(#label)
                #(.with_resolver(#resolvers))*
        }
    });

    let construction = if unit {
        quote!(Self)
    } else {
        let initializers = slots.iter().map(|slot| {
            let ident = slot.ident;
            if slot.property {
                quote!(#ident: ::core::default::Default::default())
            } else {
                quote!(#ident: args.take()?)
            }
        });
        quote!(Self { #(#initializers),* })
    };

    let property_infos = properties.iter().map(|slot| {
        let ident = slot.ident;
        let ty = slot.ty;
        let label = slot_name(ident);
        let resolvers = &slot.resolvers;
        let visibility = if slot.public {
            quote!(::autowire::metadata::Visibility::Public)
        } else {
            quote!(::autowire::metadata::Visibility::Restricted)
        };
        quote! {
            .property(
                ::autowire::metadata::PropertyInfo::settable::<Self, #ty>(
                    #label,
                    #visibility,
                    |target, value| { target.#ident = value; },
                )
                #(.with_resolver(#resolvers))*
            )
        }
    });

    let submission = if args.skip_scan.is_present() {
        quote!()
    } else {
        quote!(::autowire::submit_component!(#name);)
    };

    Ok(quote! {
        impl ::autowire::metadata::Component for #name {
            fn metadata() -> ::autowire::metadata::TypeMetadata {
                ::autowire::metadata::TypeMetadata::builder::<Self>()
                    #(#registrations)*
                    #environment
                    .constructor(
                        ::std::vec![#(#parameter_infos),*],
                        |args: &mut ::autowire::metadata::Arguments| {
                            let _ = &args;
                            ::core::result::Result::Ok(#construction)
                        },
                    )
                    #(#property_infos)*
                    .build()
            }
        }

        #submission
    })
}

fn read_slot(field: &ComponentField) -> syn::Result<Slot<'_>> {
    let ident = field
        .ident
        .as_ref()
        .ok_or_else(|| syn::Error::new(field.ty.span(), "expected a named field"))?;

    let mut property = false;
    let mut resolvers = Vec::new();

    for attr in &field.attrs {
        if attr.path().is_ident("property") {
            if !matches!(attr.meta, Meta::Path(_)) {
                return Err(syn::Error::new(attr.span(), "#[property] takes no arguments"));
            }
            property = true;
        } else if attr.path().is_ident("resolve") {
            resolvers.push(attr.parse_args::<Expr>()?);
        }
    }

    Ok(Slot {
        ident,
        ty: &field.ty,
        public: matches!(field.vis, syn::Visibility::Public(_)),
        property,
        resolvers,
    })
}

fn slot_name(ident: &Ident) -> LitStr {
    LitStr::new(&ident.unraw().to_string(), ident.span())
}

fn registration_tokens(register: &RegisterArgs) -> TokenStream2 {
    let lifetime = match register.lifetime {
        LifetimeArg::Transient => quote!(::autowire::Lifetime::Transient),
        LifetimeArg::Scoped => quote!(::autowire::Lifetime::Scoped),
        LifetimeArg::Singleton => quote!(::autowire::Lifetime::Singleton),
    };

    let service = register.service.as_ref().map(|service| {
        let convert = match &register.into {
            Some(path) => quote!(#path),
            None => quote_spanned!(service.span()=> ::core::convert::Into::into),
        };
        quote!(.service_as::<Self, #service>(#convert))
    });

    let named = register.name.as_ref().map(|name| {
        quote!(.named(::autowire::TypeKey::of::<Self>(), #name))
    });

    quote! {
        .register(
            ::autowire::metadata::RegisterService::new(#lifetime)
                #service
                #named
        )
    }
}

fn environment_tokens(environment: &EnvironmentArgs) -> TokenStream2 {
    let list = |names: &Option<String>| {
        names.as_ref().map(|names| {
            let names = split_names(names);
            quote!(::std::vec::Vec::<&'static str>::from([#(#names),*]))
        })
    };

    let enabled = list(&environment.enabled).map(|names| quote!(.enabled(#names)));
    let disabled = list(&environment.disabled).map(|names| quote!(.disabled(#names)));

    quote! {
        .environment(
            ::autowire::environment::EnvironmentSelector::new()
                #enabled
                #disabled
        )
    }
}

fn split_names(names: &str) -> Vec<String> {
    names
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
