// src/macros.rs
#[macro_export]
macro_rules! s {
    // String shorthand!

    // Zero-arg → String::new()
    () => {
        ::std::string::String::new()
    };
    // Any single expression: literal, const or variable
    ($expr:expr) => {
        ::std::string::String::from($expr)
    };
}

#[macro_export]
macro_rules! meta {
    // Metadata map shorthand: meta! { "feed" => name, "unit" => "percent" }
    () => {
        $crate::data::Metadata::new()
    };
    ($($k:expr => $v:expr),+ $(,)?) => {{
        let mut m = $crate::data::Metadata::new();
        $(
            m.insert(::std::string::String::from($k), ::std::string::ToString::to_string(&$v));
        )+
        m
    }};
}
