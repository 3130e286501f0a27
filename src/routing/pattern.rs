//! Segment templates shared by the path and host predicates.
//!
//! # Syntax
//! - literal text matches itself
//! - `*` matches zero or more characters within one segment
//! - `?` matches exactly one character within one segment
//! - `**` as a whole segment matches any number of segments
//!   (paths: zero or more, hosts: one or more labels)
//! - `{name}` captures one segment into a template variable
//! - `{name:regex}` captures text matching `regex`
//!
//! # Design Decisions
//! - Templates compile to a single anchored regex at configuration time
//! - Request-time matching never fails; it only answers yes/no

use std::collections::HashMap;

use regex::Regex;

use crate::config::ArgumentError;

/// A compiled path or host template.
#[derive(Debug, Clone)]
pub struct SegmentPattern {
    source: String,
    regex: Regex,
    variables: Vec<String>,
}

impl SegmentPattern {
    /// Compile a path template. The template must start with `/`.
    /// A trailing `/` on the matched path is tolerated.
    pub fn path(template: &str) -> Result<Self, ArgumentError> {
        if !template.starts_with('/') {
            return Err(ArgumentError::new(format!(
                "path pattern '{}' must start with '/'",
                template
            )));
        }

        // `/api/` and `/api` are the same template.
        let body = match template.strip_suffix('/') {
            Some(rest) if !rest.is_empty() => rest,
            _ => template,
        };

        let mut variables = Vec::new();
        let mut expr = String::from("^");
        if body == "/" {
            expr.push('/');
        } else {
            let segments: Vec<&str> = body[1..].split('/').collect();
            for segment in &segments {
                if *segment == "**" {
                    expr.push_str("(?:/.*)?");
                } else {
                    expr.push('/');
                    expr.push_str(&segment_regex(segment, '/', &mut variables)?);
                }
            }
            if segments.last() != Some(&"**") {
                expr.push_str("/?");
            }
        }
        expr.push('$');

        Self::finish(template, &expr, variables)
    }

    /// Compile a host template. Labels are separated by `.` and compared
    /// case-insensitively.
    pub fn host(template: &str) -> Result<Self, ArgumentError> {
        if template.is_empty() {
            return Err(ArgumentError::new("host pattern must not be empty"));
        }

        let mut variables = Vec::new();
        let mut labels = Vec::new();
        for label in template.split('.') {
            if label.is_empty() {
                return Err(ArgumentError::new(format!(
                    "host pattern '{}' has an empty label",
                    template
                )));
            }
            if label == "**" {
                labels.push(".+".to_string());
            } else {
                labels.push(segment_regex(label, '.', &mut variables)?);
            }
        }
        let expr = format!("(?i)^{}$", labels.join(r"\."));

        Self::finish(template, &expr, variables)
    }

    fn finish(template: &str, expr: &str, variables: Vec<String>) -> Result<Self, ArgumentError> {
        let regex = Regex::new(expr)?;
        Ok(Self {
            source: template.to_string(),
            regex,
            variables,
        })
    }

    /// The template this pattern was compiled from.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Names of the variables this template captures, in declaration order.
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn is_match(&self, input: &str) -> bool {
        self.regex.is_match(input)
    }

    /// Match `input`, writing captured variables into `into`.
    /// Nothing is written when the input does not match.
    pub fn capture_into(&self, input: &str, into: &mut HashMap<String, String>) -> bool {
        let Some(caps) = self.regex.captures(input) else {
            return false;
        };
        for name in &self.variables {
            if let Some(value) = caps.name(name) {
                into.insert(name.clone(), value.as_str().to_string());
            }
        }
        true
    }
}

/// Translate one segment of a template into regex syntax.
fn segment_regex(
    segment: &str,
    separator: char,
    variables: &mut Vec<String>,
) -> Result<String, ArgumentError> {
    let mut out = String::new();
    let mut chars = segment.chars().peekable();
    let not_sep = format!("[^{}]", regex::escape(&separator.to_string()));

    while let Some(c) = chars.next() {
        match c {
            '*' => {
                out.push_str(&not_sep);
                out.push('*');
            }
            '?' => out.push_str(&not_sep),
            '{' => {
                let mut depth = 1;
                let mut body = String::new();
                for c in chars.by_ref() {
                    match c {
                        '{' => depth += 1,
                        '}' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    body.push(c);
                }
                if depth != 0 {
                    return Err(ArgumentError::new(format!(
                        "unterminated variable in segment '{}'",
                        segment
                    )));
                }
                let (name, constraint) = match body.split_once(':') {
                    Some((name, constraint)) => (name, Some(constraint)),
                    None => (body.as_str(), None),
                };
                if !is_identifier(name) {
                    return Err(ArgumentError::new(format!(
                        "invalid variable name '{}'",
                        name
                    )));
                }
                let inner = match constraint {
                    Some(re) => re.to_string(),
                    None => format!("{}+", not_sep),
                };
                out.push_str(&format!("(?P<{}>{})", name, inner));
                variables.push(name.to_string());
            }
            '}' => {
                return Err(ArgumentError::new(format!(
                    "unbalanced '}}' in segment '{}'",
                    segment
                )))
            }
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }

    Ok(out)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Expand `{name}` placeholders in `template` from `variables`.
///
/// Returns the name of the first placeholder without a value on failure.
pub fn expand_template(
    template: &str,
    variables: &HashMap<String, String>,
) -> Result<String, String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after
            .find('}')
            .ok_or_else(|| format!("unterminated placeholder in '{}'", template))?;
        let name = &after[..end];
        let value = variables
            .get(name)
            .ok_or_else(|| format!("no value for template variable '{}'", name))?;
        out.push_str(value);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Check that every placeholder in `template` is well formed.
pub fn check_template(template: &str) -> Result<(), ArgumentError> {
    let mut rest = template;
    while let Some(start) = rest.find(['{', '}']) {
        if rest[start..].starts_with('}') {
            return Err(ArgumentError::new(format!("unbalanced '}}' in '{}'", template)));
        }
        let after = &rest[start + 1..];
        let end = after.find('}').ok_or_else(|| {
            ArgumentError::new(format!("unterminated placeholder in '{}'", template))
        })?;
        if !is_identifier(&after[..end]) {
            return Err(ArgumentError::new(format!(
                "invalid placeholder '{{{}}}' in '{}'",
                &after[..end],
                template
            )));
        }
        rest = &after[end + 1..];
    }
    Ok(())
}

/// Names of the `{name}` placeholders in `template`, in order.
pub fn placeholder_names(template: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) => {
                names.push(&after[..end]);
                rest = &after[end + 1..];
            }
            None => break,
        }
    }
    names
}
