// src/macros.rs
#[macro_export]
macro_rules! s {
    // String shorthand!

    // Zero-arg → String::new()
    () => {
        ::std::string::String::new()
    };
    // Any single expression: literals, consts, or vars
    ($expr:expr) => {
        ::std::string::String::from($expr)
    };
}

#[macro_export]
macro_rules! join {
    // String-type concatenation shorthand! Used for url building.
    ($first:expr $(, $rest:expr)+ $(,)?) => {{
        let mut s = ::std::string::String::from($first);
        $(
            s.push_str($rest);
        )+
        s
    }};
}

/// Record a data-quality warning: push it onto the result's list and log it.
#[macro_export]
macro_rules! warn_push {
    ($list:expr, $($arg:tt)*) => {{
        let msg = format!($($arg)*);
        ::tracing::warn!("{}", msg);
        $list.push(msg);
    }};
}
