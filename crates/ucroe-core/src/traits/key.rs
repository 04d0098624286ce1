//! Cache key derivation from function identity

/// Qualified name of the item enclosing `marker`
///
/// `marker` is a zero-sized item declared inside the function being guarded
/// (a nested `fn` or a closure). Its type name is the enclosing function's
/// path followed by one more segment, which is stripped:
///
/// ```
/// mod rates {
///     pub fn fetch() -> &'static str {
///         fn marker() {}
///         ucroe_core::qualified_name(&marker)
///     }
/// }
///
/// assert!(rates::fetch().ends_with("rates::fetch"));
/// ```
///
/// The result is stable for the lifetime of a build and distinct for
/// distinct functions, which is all a fallback cache key needs.
pub fn qualified_name<F: ?Sized>(marker: &F) -> &'static str {
    let full = std::any::type_name_of_val(marker);
    match full.rsplit_once("::") {
        Some((enclosing, _)) => enclosing,
        None => full,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first() -> &'static str {
        fn marker() {}
        qualified_name(&marker)
    }

    fn second() -> &'static str {
        let marker = || {};
        qualified_name(&marker)
    }

    struct Client;

    impl Client {
        fn fetch(&self) -> &'static str {
            fn marker() {}
            qualified_name(&marker)
        }
    }

    #[test]
    fn test_name_of_free_function() {
        assert!(first().ends_with("key::tests::first"));
    }

    #[test]
    fn test_names_are_distinct() {
        assert_ne!(first(), second());
        assert!(second().contains("key::tests::second"));
    }

    #[test]
    fn test_name_is_stable() {
        assert_eq!(first(), first());
    }

    #[test]
    fn test_name_of_method_includes_type() {
        assert!(Client.fetch().ends_with("Client::fetch"));
    }
}
