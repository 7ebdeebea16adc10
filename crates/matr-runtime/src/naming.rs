//! Task display names

/// Derive the display name of a task from its function identifier.
///
/// The first character is lower-cased and camel-case word boundaries become
/// hyphens, so `BuildDocker` becomes `build-docker` and `HTTPServer` becomes
/// `http-server`. Underscores are treated as word separators as well.
pub fn task_name(ident: &str) -> String {
    let chars: Vec<char> = ident.chars().collect();
    let mut name = String::with_capacity(ident.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == '-' {
            push_separator(&mut name);
            continue;
        }

        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower)
            {
                push_separator(&mut name);
            }
        }

        name.extend(c.to_lowercase());
    }

    while name.ends_with('-') {
        name.pop();
    }
    name
}

fn push_separator(name: &mut String) {
    if !name.is_empty() && !name.ends_with('-') {
        name.push('-');
    }
}
