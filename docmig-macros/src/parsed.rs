use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::parse::Parse;
use syn::punctuated::Punctuated;
use syn::{Attribute, DeriveInput, Error, Generics, Ident, LitBool, LitInt, LitStr, Result, Token};

pub(crate) struct ParsedMigration {
    name: Ident,
    generics: Generics,
    version: i64,
    profiles: Vec<String>,
    register: bool,
}

impl ParsedMigration {
    pub(crate) fn from_input(input: &DeriveInput) -> Result<Self> {
        let mut version: Option<i64> = None;
        let mut profiles: Vec<String> = Vec::new();
        let mut register = true;

        for attr in &input.attrs {
            if attr.path().is_ident("migration") {
                Self::parse_container_attr(attr, &mut version, &mut profiles, &mut register)?;
            }
        }

        let version = version.ok_or_else(|| {
            Error::new(
                input.ident.span(),
                "MigrationInfo requires #[migration(version = N)]",
            )
        })?;

        if register && !input.generics.params.is_empty() {
            return Err(Error::new(
                input.ident.span(),
                "generic migrations cannot be auto-registered; add `register = false`",
            ));
        }

        Ok(Self {
            name: input.ident.clone(),
            generics: input.generics.clone(),
            version,
            profiles,
            register,
        })
    }

    fn parse_container_attr(
        attr: &Attribute,
        version: &mut Option<i64>,
        profiles: &mut Vec<String>,
        register: &mut bool,
    ) -> Result<()> {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("version") {
                // signed: `version = -1` parses as a minus sign and a literal
                let input = meta.value()?;
                let negative = input.parse::<Option<Token![-]>>()?.is_some();
                let value: LitInt = input.parse()?;
                if version.is_some() {
                    return Err(meta.error("duplicate `version`"));
                }
                let magnitude: i128 = value.base10_parse()?;
                let signed = if negative { -magnitude } else { magnitude };
                let parsed = i64::try_from(signed).map_err(|_| Error::new(value.span(), "version must fit in an i64"))?;
                *version = Some(parsed);
            } else if meta.path.is_ident("profiles") {
                // #[migration(profiles = ["prod", "staging"])]
                meta.input.parse::<Token![=]>()?;
                let content;
                syn::bracketed!(content in meta.input);
                let parsed: Punctuated<LitStr, Token![,]> =
                    content.parse_terminated(<LitStr as Parse>::parse, Token![,])?;
                for lit in parsed {
                    let profile = lit.value();
                    if profile.trim().is_empty() {
                        return Err(Error::new(lit.span(), "profile names cannot be empty"));
                    }
                    if !profiles.contains(&profile) {
                        profiles.push(profile);
                    }
                }
            } else if meta.path.is_ident("profile") {
                let value: LitStr = meta.value()?.parse()?;
                if !profiles.contains(&value.value()) {
                    profiles.push(value.value());
                }
            } else if meta.path.is_ident("register") {
                let value: LitBool = meta.value()?.parse()?;
                *register = value.value;
            } else {
                return Err(meta.error("unknown migration attribute, expected `version`, `profiles`, `profile` or `register`"));
            }
            Ok(())
        })
    }

    pub(crate) fn emit(&self) -> TokenStream2 {
        let name = &self.name;
        let (impl_generics, ty_generics, where_clause) = self.generics.split_for_impl();
        let name_lit = LitStr::new(&name.to_string(), Span::call_site());
        let version = self.version;
        let profile_lits: Vec<LitStr> = self
            .profiles
            .iter()
            .map(|profile| LitStr::new(profile, Span::call_site()))
            .collect();

        let info_impl = quote! {
            impl #impl_generics ::docmig::MigrationInfo for #name #ty_generics #where_clause {
                const NAME: &'static str = #name_lit;
                const VERSION: i64 = #version;
                const PROFILES: &'static [&'static str] = &[#(#profile_lits),*];
            }
        };

        if !self.register {
            return info_impl;
        }

        quote! {
            #info_impl

            ::docmig::inventory::submit! {
                ::docmig::RegisteredMigration {
                    type_id: ::std::any::TypeId::of::<#name>,
                    type_name: #name_lit,
                    version: #version,
                    profiles: &[#(#profile_lits),*],
                    factory: ::docmig::discovery::instantiate::<#name>,
                }
            }
        }
    }
}
