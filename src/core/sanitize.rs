// src/core/sanitize.rs

pub fn normalize_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_space { out.push(' '); prev_space = true; }
        } else { out.push(ch); prev_space = false; }
    }
    out.trim().to_string()
}

/// Case- and whitespace-insensitive equality for filter values ("Test" == " test ").
pub fn same_value(a: &str, b: &str) -> bool {
    normalize_ws(a).to_lowercase() == normalize_ws(b).to_lowercase()
}

/// File stem an export is dropped under: "New Clients/Month" → "new_clients_month".
pub fn feed_file_stem(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_us = false;
    for ch in name.chars() {
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
            last_us = false;
        } else if ch.is_whitespace() || ch == '/' || ch == '_' || ch == '-' {
            if !last_us { out.push('_'); last_us = true; }
        }
    }
    let out = out.trim_matches('_').to_string();
    if out.is_empty() { s!("feed") } else { out }
}

/// Strip a UTF-8 byte order mark some exporters prepend to the first header cell.
pub fn strip_bom(s: &str) -> &str {
    s.strip_prefix('\u{feff}').unwrap_or(s)
}
