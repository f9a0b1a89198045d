//! Single-pass `{name}` placeholder substitution.
//!
//! Templates use Python-style named placeholders: `{name}` is replaced by the
//! value bound to `name`, and `{{` / `}}` produce literal braces. Substitution
//! happens in one left-to-right pass, so braces that appear inside substituted
//! values (student essays, persona text) are copied through untouched and never
//! re-interpreted as placeholders.

use crate::error::{Error, Result};

/// Render `template` by resolving every placeholder through `lookup`.
///
/// `template_name` only labels [`Error::MissingVariable`] when `lookup`
/// returns `None` for a referenced name.
pub fn render<'a, F>(template_name: &str, template: &str, mut lookup: F) -> Result<String>
where
    F: FnMut(&str) -> Option<&'a str>,
{
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        let (literal, tail) = rest.split_at(pos);
        out.push_str(literal);

        if let Some(after) = tail.strip_prefix("{{") {
            out.push('{');
            rest = after;
        } else if let Some(after) = tail.strip_prefix("}}") {
            out.push('}');
            rest = after;
        } else if let Some(after) = tail.strip_prefix('{') {
            match after.find('}') {
                Some(end) => {
                    let (name, after_name) = after.split_at(end);
                    let value = lookup(name).ok_or_else(|| Error::MissingVariable {
                        template: template_name.to_string(),
                        name: name.to_string(),
                    })?;
                    out.push_str(value);
                    rest = after_name.strip_prefix('}').unwrap_or(after_name);
                }
                None => {
                    // Unterminated brace: keep it literally.
                    out.push_str(tail);
                    rest = "";
                }
            }
        } else {
            // A lone '}' is kept as-is.
            out.push('}');
            rest = tail.strip_prefix('}').unwrap_or(tail);
        }
    }
    out.push_str(rest);
    Ok(out)
}

/// Names of all placeholders referenced by `template`, in order of first use.
pub fn placeholders(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let _ = render("", template, |name| {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
        Some("")
    });
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars<'a>(pairs: &[(&'a str, &'a str)]) -> HashMap<&'a str, &'a str> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn substitutes_named_placeholders() {
        let v = vars(&[("name", "Syllabus"), ("body", "Attend class.")]);
        let out = render("t", "NAME: {name}\n{body}", |k| v.get(k).copied()).unwrap();
        assert_eq!(out, "NAME: Syllabus\nAttend class.");
    }

    #[test]
    fn missing_variable_is_an_error() {
        let v = vars(&[("name", "x")]);
        let err = render("create", "{name} {other}", |k| v.get(k).copied()).unwrap_err();
        match err {
            Error::MissingVariable { template, name } => {
                assert_eq!(template, "create");
                assert_eq!(name, "other");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let v = vars(&[("student_text", "I wrote {not_a_var} here")]);
        let out = render("t", "TEXT: {student_text}", |k| v.get(k).copied()).unwrap();
        assert_eq!(out, "TEXT: I wrote {not_a_var} here");
    }

    #[test]
    fn doubled_braces_are_literal() {
        let out = render("t", "{{json}} and }}", |_| None).unwrap();
        assert_eq!(out, "{json} and }");
    }

    #[test]
    fn multibyte_text_around_placeholders() {
        let v = vars(&[("q", "¿Qué?")]);
        let out = render("t", "— {q} —", |k| v.get(k).copied()).unwrap();
        assert_eq!(out, "— ¿Qué? —");
    }

    #[test]
    fn placeholders_in_first_use_order() {
        let names = placeholders("{b} {a} {b} {{skip}}");
        assert_eq!(names, vec!["b".to_string(), "a".to_string()]);
    }
}
