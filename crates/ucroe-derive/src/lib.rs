use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::meta::ParseNestedMeta;
use syn::{parse_macro_input, Expr, ItemFn, LitBool, Path, ReturnType};

/// Return the last cached result when the function fails
///
/// The function must return `Result<T, E>` where `T` is
/// `Serialize + DeserializeOwned` and `E: Display + From<ucroe::CacheError>`.
/// Name, visibility, attributes, doc comments and signature are kept.
/// Works on free functions, methods and `async fn`.
///
/// ```ignore
/// #[cached_result_on_exception]
/// fn fetch() -> Result<Rates, AppError> { ... }
///
/// #[cached_result_on_exception(log_exception = true, on_exception = alert)]
/// async fn fetch_async() -> Result<Rates, AppError> { ... }
///
/// static SHARED: CachedResultOnException = CachedResultOnException::new();
///
/// #[cached_result_on_exception(guard = SHARED)]
/// fn fetch_shared() -> Result<Rates, AppError> { ... }
/// ```
///
/// Options:
/// - `log_exception = bool`: log each fallback at WARN, overriding the
///   configured default
/// - `on_exception = expr`: a `Fn(&FallbackEvent)` or `Fn()` run once per
///   fallback
/// - `cache = expr`: a `CacheBackend` used instead of the configured one
/// - `guard = path`: use an existing guard static (excludes the other options)
///
/// The cache key is the function's qualified name; arguments are not part
/// of it.
#[proc_macro_attribute]
pub fn cached_result_on_exception(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut options = GuardOptions::default();
    let parser = syn::meta::parser(|meta| options.parse(meta));
    parse_macro_input!(attr with parser);

    let func = parse_macro_input!(item as ItemFn);

    match expand(options, func) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

#[derive(Default)]
struct GuardOptions {
    log_exception: Option<LitBool>,
    on_exception: Option<Expr>,
    cache: Option<Expr>,
    guard: Option<Path>,
}

impl GuardOptions {
    fn parse(&mut self, meta: ParseNestedMeta) -> syn::Result<()> {
        if meta.path.is_ident("log_exception") {
            self.log_exception = Some(meta.value()?.parse()?);
        } else if meta.path.is_ident("on_exception") {
            self.on_exception = Some(meta.value()?.parse()?);
        } else if meta.path.is_ident("cache") {
            self.cache = Some(meta.value()?.parse()?);
        } else if meta.path.is_ident("guard") {
            self.guard = Some(meta.value()?.parse()?);
        } else {
            return Err(meta.error(
                "unsupported option, expected `log_exception`, `on_exception`, `cache` or `guard`",
            ));
        }
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.log_exception.is_none() && self.on_exception.is_none() && self.cache.is_none()
    }

    fn guard_tokens(mut self) -> syn::Result<TokenStream2> {
        if let Some(path) = self.guard.take() {
            if !self.is_empty() {
                return Err(syn::Error::new_spanned(
                    path,
                    "`guard` cannot be combined with other options",
                ));
            }
            return Ok(quote! {
                let __ucroe_guard: &::ucroe::CachedResultOnException = &#path;
            });
        }

        if self.is_empty() {
            return Ok(quote! {
                static __UCROE_GUARD: ::ucroe::CachedResultOnException =
                    ::ucroe::CachedResultOnException::new();
                let __ucroe_guard: &::ucroe::CachedResultOnException = &__UCROE_GUARD;
            });
        }

        let mut builder = quote! { ::ucroe::CachedResultOnException::builder() };
        if let Some(flag) = self.log_exception {
            builder = quote! { #builder.log_exception(#flag) };
        }
        if let Some(callback) = self.on_exception {
            builder = quote! { #builder.on_exception(#callback) };
        }
        if let Some(cache) = self.cache {
            builder = quote! { #builder.cache(#cache) };
        }

        Ok(quote! {
            static __UCROE_GUARD: ::std::sync::LazyLock<::ucroe::CachedResultOnException> =
                ::std::sync::LazyLock::new(|| #builder.build());
            let __ucroe_guard: &::ucroe::CachedResultOnException = &__UCROE_GUARD;
        })
    }
}

fn expand(options: GuardOptions, func: ItemFn) -> syn::Result<TokenStream2> {
    let ItemFn {
        attrs,
        vis,
        sig,
        block,
    } = func;

    if let Some(constness) = &sig.constness {
        return Err(syn::Error::new_spanned(
            constness,
            "`const fn` cannot be guarded",
        ));
    }

    let ret = match &sig.output {
        ReturnType::Type(_, ty) => ty.clone(),
        ReturnType::Default => {
            return Err(syn::Error::new_spanned(
                &sig,
                "guarded functions must return `Result<T, E>`",
            ));
        }
    };

    let guard = options.guard_tokens()?;

    let body = if sig.asyncness.is_some() {
        quote! {
            #guard
            fn __ucroe_key() {}
            __ucroe_guard
                .invoke_async(::ucroe::qualified_name(&__ucroe_key), async move {
                    let __ucroe_out: #ret = #block;
                    __ucroe_out
                })
                .await
                .map_err(::ucroe::GuardError::flatten)
        }
    } else {
        quote! {
            #guard
            fn __ucroe_key() {}
            __ucroe_guard
                .invoke(::ucroe::qualified_name(&__ucroe_key), move || -> #ret #block)
                .map_err(::ucroe::GuardError::flatten)
        }
    };

    let track_caller = if sig.asyncness.is_some() {
        quote! {}
    } else {
        quote! { #[track_caller] }
    };

    Ok(quote! {
        #(#attrs)*
        #track_caller
        #vis #sig {
            #body
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse::Parser;

    fn expand_with(attr: TokenStream2, item: TokenStream2) -> syn::Result<String> {
        let mut options = GuardOptions::default();
        let parser = syn::meta::parser(|meta| options.parse(meta));
        parser.parse2(attr)?;
        Ok(expand(options, syn::parse2(item)?)?.to_string())
    }

    #[test]
    fn test_shared_guard_is_referenced() {
        let expanded = expand_with(
            quote! { guard = SHARED },
            quote! { fn fetch() -> Result<u8, AppError> { Ok(1) } },
        )
        .unwrap();

        assert!(expanded.contains("SHARED"));
        assert!(!expanded.contains("__UCROE_GUARD"));
        assert!(expanded.contains("track_caller"));
    }

    #[test]
    fn test_shared_guard_excludes_other_options() {
        let err = expand_with(
            quote! { guard = SHARED, log_exception = true },
            quote! { fn fetch() -> Result<u8, AppError> { Ok(1) } },
        )
        .unwrap_err();

        assert_eq!(err.to_string(), "`guard` cannot be combined with other options");
    }

    #[test]
    fn test_bare_form_uses_const_guard() {
        let expanded = expand_with(
            quote! {},
            quote! { pub fn fetch(x: u8) -> Result<u8, AppError> { Ok(x) } },
        )
        .unwrap();

        assert!(expanded.contains("CachedResultOnException :: new ()"));
        assert!(!expanded.contains("LazyLock"));
    }

    #[test]
    fn test_options_build_lazy_guard() {
        let expanded = expand_with(
            quote! { log_exception = false, on_exception = alert },
            quote! { fn fetch() -> Result<u8, AppError> { Ok(1) } },
        )
        .unwrap();

        assert!(expanded.contains("LazyLock"));
        assert!(expanded.contains("log_exception (false)"));
        assert!(expanded.contains("on_exception (alert)"));
    }

    #[test]
    fn test_async_fn_is_not_track_caller() {
        let expanded = expand_with(
            quote! {},
            quote! { async fn fetch() -> Result<u8, AppError> { Ok(1) } },
        )
        .unwrap();

        assert!(expanded.contains("invoke_async"));
        assert!(!expanded.contains("track_caller"));
    }

    #[test]
    fn test_rejects_missing_return_type() {
        let err = expand_with(quote! {}, quote! { fn fetch() {} }).unwrap_err();
        assert_eq!(err.to_string(), "guarded functions must return `Result<T, E>`");
    }

    #[test]
    fn test_rejects_unknown_option() {
        let err = expand_with(
            quote! { ttl = 5 },
            quote! { fn fetch() -> Result<u8, AppError> { Ok(1) } },
        )
        .unwrap_err();

        assert!(err.to_string().starts_with("unsupported option"));
    }
}
