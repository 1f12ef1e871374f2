//! Spelling suggestions for template errors

use serde_json::Value as JsonValue;

/// Maximum Levenshtein distance to consider for suggestions
const MAX_SUGGESTION_DISTANCE: usize = 3;

/// Filters registered by the engine plus the common MiniJinja built-ins
pub const AVAILABLE_FILTERS: &[&str] = &[
    "toyaml",
    "tojson",
    "b64encode",
    "b64decode",
    "quote",
    "squote",
    "nindent",
    "indent",
    "required",
    "empty",
    "sha256",
    "trunc",
    "trimprefix",
    "trimsuffix",
    "default",
    "upper",
    "lower",
    "replace",
    "trim",
    "join",
    "first",
    "last",
    "length",
    "sort",
    "dictsort",
    "items",
    "int",
    "string",
    "list",
];

/// Functions registered by the engine plus the MiniJinja globals
pub const AVAILABLE_FUNCTIONS: &[&str] = &[
    "fail", "dict", "list", "get", "coalesce", "ternary", "tostring", "toint", "printf", "range",
    "namespace",
];

/// Top-level context variables always available in templates
pub const CONTEXT_VARIABLES: &[&str] = &["values", "release", "pack", "capabilities"];

/// Closest candidates to `input`, best first
pub fn find_closest_matches<'a>(input: &str, candidates: &[&'a str], max_results: usize) -> Vec<&'a str> {
    let mut matches: Vec<(usize, &str)> = candidates
        .iter()
        .map(|candidate| (strsim::levenshtein(input, candidate), *candidate))
        .filter(|(distance, _)| *distance > 0 && *distance <= MAX_SUGGESTION_DISTANCE)
        .collect();

    matches.sort();
    matches.truncate(max_results);
    matches.into_iter().map(|(_, candidate)| candidate).collect()
}

fn quoted(matches: &[&str], prefix: &str) -> String {
    matches
        .iter()
        .map(|m| format!("`{}{}`", prefix, m))
        .collect::<Vec<_>>()
        .join(" or ")
}

/// Suggest a fix for an undefined variable such as `values.imag.tag`
pub fn suggest_undefined_variable(variable: &str, values: Option<&JsonValue>) -> Option<String> {
    if variable == "value" || variable.starts_with("value.") {
        return Some(format!(
            "Did you mean `{}`? The values object is `values` (plural).",
            variable.replacen("value", "values", 1)
        ));
    }

    let Some(path) = variable.strip_prefix("values.") else {
        let root = variable.split('.').next().unwrap_or(variable);
        let matches = find_closest_matches(root, CONTEXT_VARIABLES, 1);
        return (!matches.is_empty()).then(|| format!("Did you mean {}?", quoted(&matches, "")));
    };

    let mut current = values?;
    let mut walked = vec!["values"];

    for part in path.split('.') {
        match current.get(part) {
            Some(next) => {
                walked.push(part);
                current = next;
            }
            None => {
                let available: Vec<&str> = current
                    .as_object()
                    .map(|obj| obj.keys().map(String::as_str).collect())
                    .unwrap_or_default();
                let prefix = format!("{}.", walked.join("."));
                let matches = find_closest_matches(part, &available, 3);

                return Some(if matches.is_empty() {
                    format!(
                        "Key `{}` not found in `{}`. Available keys: {}",
                        part,
                        walked.join("."),
                        available.join(", ")
                    )
                } else {
                    format!("Key `{}` not found. Did you mean {}?", part, quoted(&matches, &prefix))
                });
            }
        }
    }

    None
}

/// Suggest a fix for an unknown filter
pub fn suggest_unknown_filter(filter: &str) -> Option<String> {
    let matches = find_closest_matches(filter, AVAILABLE_FILTERS, 3);

    Some(if matches.is_empty() {
        format!(
            "Unknown filter `{}`. Common filters: toyaml, tojson, quote, default, nindent",
            filter
        )
    } else {
        format!("Did you mean {}?", quoted(&matches, ""))
    })
}

/// Suggest a fix for an unknown function
pub fn suggest_unknown_function(function: &str) -> Option<String> {
    let matches = find_closest_matches(function, AVAILABLE_FUNCTIONS, 3);

    Some(if matches.is_empty() {
        format!(
            "Unknown function `{}`. Available functions: {}",
            function,
            AVAILABLE_FUNCTIONS.join(", ")
        )
    } else {
        format!("Did you mean {}?", quoted(&matches, ""))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_closest_matches() {
        assert_eq!(find_closest_matches("toyml", AVAILABLE_FILTERS, 1), vec!["toyaml"]);
        assert!(find_closest_matches("completelydifferent", AVAILABLE_FILTERS, 3).is_empty());
    }

    #[test]
    fn test_suggest_value_typo() {
        let hint = suggest_undefined_variable("value.image", None).unwrap();
        assert!(hint.contains("`values.image`"));
    }

    #[test]
    fn test_suggest_missing_key() {
        let values = json!({"image": {"tag": "1.0", "repository": "nginx"}});

        let hint = suggest_undefined_variable("values.image.tga", Some(&values)).unwrap();
        assert!(hint.contains("`values.image.tag`"));

        let hint = suggest_undefined_variable("values.zzzzzz", Some(&values)).unwrap();
        assert!(hint.contains("Available keys: image"));
    }

    #[test]
    fn test_suggest_context_variable() {
        let hint = suggest_undefined_variable("relase.name", None).unwrap();
        assert!(hint.contains("`release`"));
    }
}
