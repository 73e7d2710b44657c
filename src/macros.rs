/// Intern a literal once and hand back the cached [`Symbol`](crate::Symbol).
///
/// Hot paths compare against well-known labels (`+START+`, `NPB`, ...) on
/// every chart operation; this keeps the interner lock off those paths.
#[macro_export]
macro_rules! sym {
    ($name:literal) => {{
        static SYM: once_cell::sync::Lazy<$crate::Symbol> = once_cell::sync::Lazy::new(|| $crate::Symbol::new($name));
        *SYM
    }};
}

/// Build a [`Sexp`](crate::Sexp) list from expressions convertible into `Sexp`.
#[macro_export]
macro_rules! sexp_list {
    ($($item:expr),* $(,)?) => {
        $crate::Sexp::List(vec![ $($crate::Sexp::from($item)),* ])
    };
}
