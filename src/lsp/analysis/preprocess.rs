//! Comment stripping and declaration scanning

use super::language::LanguageProfile;

/// Remove comments from `text`, line by line.
///
/// A line whose first non-blank character is the comment marker is dropped.
/// Otherwise the line is cut at the first comment marker that is not inside a
/// string literal. String state carries across lines, so an unterminated
/// literal protects markers on the lines that follow it. Lines are rejoined
/// with `\n`.
pub fn strip_comments(text: &str, profile: &LanguageProfile) -> String {
    let mut in_string = false;
    let mut kept: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim_start().starts_with(profile.comment_marker) {
            continue;
        }

        let mut end = line.len();
        let mut prev: Option<char> = None;
        for (idx, ch) in line.char_indices() {
            if ch == profile.string_quote {
                let escaped = profile.escape_char.is_some() && prev == profile.escape_char;
                if !escaped {
                    in_string = !in_string;
                }
            } else if ch == profile.comment_marker && !in_string {
                end = idx;
                break;
            }
            prev = Some(ch);
        }

        kept.push(&line[..end]);
    }

    kept.join("\n")
}

/// Identifiers declared in `text`, in first-seen order without duplicates.
///
/// Comments are stripped first so commented-out declarations do not count.
pub fn find_declared_variables(text: &str, profile: &LanguageProfile) -> Vec<String> {
    let Some(pattern) = &profile.declaration else {
        return Vec::new();
    };

    let stripped = strip_comments(text, profile);
    let mut names: Vec<String> = Vec::new();

    for caps in pattern.captures_iter(&stripped) {
        let Some(list) = caps.get(1) else { continue };
        for name in list.as_str().split(',').map(str::trim).filter(|n| !n.is_empty()) {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
    }

    names
}
