//! `Exec=` command lines
//!
//! Arguments are split with the launcher-file quoting rules: double quotes
//! group, and inside them a backslash escapes `"`, `` ` ``, `$` and `\`.
//! Field codes are dropped since the broker never passes files or URLs.

const FIELD_CODES: &[char] = &['f', 'F', 'u', 'U', 'd', 'D', 'n', 'N', 'i', 'c', 'k', 'v', 'm'];

/// Split an `Exec=` value into raw arguments
pub fn split_exec(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current: Option<String> = None;
    let mut in_quotes = false;
    let mut chars = line.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                current.get_or_insert_with(String::new);
            }
            '\\' if in_quotes => {
                let arg = current.get_or_insert_with(String::new);
                match chars.next() {
                    Some(escaped @ ('"' | '`' | '$' | '\\')) => arg.push(escaped),
                    Some(other) => {
                        arg.push('\\');
                        arg.push(other);
                    }
                    None => arg.push('\\'),
                }
            }
            ch if ch.is_whitespace() && !in_quotes => {
                if let Some(arg) = current.take() {
                    args.push(arg);
                }
            }
            ch => current.get_or_insert_with(String::new).push(ch),
        }
    }

    if let Some(arg) = current {
        args.push(arg);
    }
    args
}

/// Expand `%%` and drop field codes; `None` when nothing is left of an
/// argument that only held field codes
fn expand_field_codes(arg: &str) -> Option<String> {
    let mut expanded = String::with_capacity(arg.len());
    let mut had_code = false;
    let mut chars = arg.chars();

    while let Some(ch) = chars.next() {
        if ch != '%' {
            expanded.push(ch);
            continue;
        }
        match chars.next() {
            Some('%') => expanded.push('%'),
            Some(code) if FIELD_CODES.contains(&code) => had_code = true,
            Some(other) => {
                expanded.push('%');
                expanded.push(other);
            }
            None => expanded.push('%'),
        }
    }

    if had_code && expanded.is_empty() {
        None
    } else {
        Some(expanded)
    }
}

/// Program and arguments of an `Exec=` value, or `None` if it is empty
pub fn parse_exec(line: &str) -> Option<(String, Vec<String>)> {
    let mut args = split_exec(line)
        .iter()
        .filter_map(|arg| expand_field_codes(arg))
        .collect::<Vec<_>>()
        .into_iter();

    let program = args.next().filter(|program| !program.is_empty())?;
    Some((program, args.collect()))
}
