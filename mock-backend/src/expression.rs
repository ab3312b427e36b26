//! A tiny stand-in for the expression language the real backend embeds.
//! Good enough to drive the wizard's validate/preview buttons offline.

use domain::dtos::{StreamDataField, Transform};
use serde_json::{Map, Value};

const KEYWORDS: &[&str] = &[
    "and", "or", "not", "in", "true", "false", "nil", "matches", "contains", "startsWith",
    "endsWith", "len", "upper", "lower", "trim",
];

#[derive(Debug, PartialEq)]
enum Token {
    Ident(String),
    Literal,
    Open,
    Close,
    Other,
}

fn tokenize(expression: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = expression.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            '"' | '\'' => {
                chars.next();
                let mut closed = false;
                for next in chars.by_ref() {
                    if next == c {
                        closed = true;
                        break;
                    }
                }
                if !closed {
                    return Err("unterminated string literal".to_string());
                }
                tokens.push(Token::Literal);
            }
            c if c.is_ascii_digit() => {
                while chars.peek().is_some_and(|c| c.is_ascii_digit() || *c == '.') {
                    chars.next();
                }
                tokens.push(Token::Literal);
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' || c == '.' {
                        ident.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            _ => {
                chars.next();
                tokens.push(Token::Other);
            }
        }
    }

    Ok(tokens)
}

pub fn validate_filter(expression: &str, fields: &[StreamDataField]) -> Result<(), String> {
    if expression.trim().is_empty() {
        return Err("expression must not be empty".to_string());
    }

    let tokens = tokenize(expression)?;

    let mut depth = 0i32;
    for token in &tokens {
        match token {
            Token::Open => depth += 1,
            Token::Close => {
                depth -= 1;
                if depth < 0 {
                    return Err("unbalanced parentheses".to_string());
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err("unbalanced parentheses".to_string());
    }

    if fields.is_empty() {
        return Ok(());
    }

    for token in &tokens {
        if let Token::Ident(ident) = token {
            let root = ident.split('.').next().unwrap_or(ident);
            if KEYWORDS.contains(&root) {
                continue;
            }
            if !fields.iter().any(|field| field.field_name == *ident || field.field_name == root) {
                return Err(format!("unknown field: {ident}"));
            }
        }
    }

    Ok(())
}

fn lookup<'a>(sample: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = sample.get(parts.next()?)?;
    for part in parts {
        current = current.get(part)?;
    }
    Some(current)
}

fn evaluate(expression: &str, sample: &Map<String, Value>) -> Result<Value, String> {
    let expression = expression.trim();

    for function in ["upper", "lower", "trim"] {
        if let Some(argument) = expression
            .strip_prefix(function)
            .and_then(|rest| rest.trim_start().strip_prefix('('))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return match evaluate(argument, sample)? {
                Value::String(value) => Ok(Value::String(match function {
                    "upper" => value.to_uppercase(),
                    "lower" => value.to_lowercase(),
                    _ => value.trim().to_string(),
                })),
                Value::Null => Ok(Value::Null),
                other => Err(format!("{function}() expects a string, got {other}")),
            };
        }
    }

    if let Some(literal) = expression
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    {
        return Ok(Value::String(literal.to_string()));
    }

    if let Ok(number) = expression.parse::<f64>() {
        return Ok(serde_json::json!(number));
    }

    match expression {
        "true" => return Ok(Value::Bool(true)),
        "false" => return Ok(Value::Bool(false)),
        "nil" => return Ok(Value::Null),
        _ => {}
    }

    lookup(sample, expression)
        .cloned()
        .ok_or_else(|| format!("unknown field or unsupported expression: {expression}"))
}

pub fn evaluate_transforms(transforms: &[Transform], sample: &Value) -> Result<Value, String> {
    let Value::Object(sample) = sample else {
        return Err("sample must be a JSON object".to_string());
    };

    let mut output = Map::new();
    for transform in transforms {
        let value = evaluate(&transform.expression, sample)?;
        output.insert(transform.output_name.clone(), value);
    }

    Ok(Value::Object(output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(names: &[&str]) -> Vec<StreamDataField> {
        names
            .iter()
            .map(|name| StreamDataField {
                field_name: name.to_string(),
                field_type: "string".to_string(),
            })
            .collect()
    }

    fn transform(expression: &str, output_name: &str) -> Transform {
        Transform {
            expression: expression.to_string(),
            output_name: output_name.to_string(),
            output_type: "string".to_string(),
        }
    }

    #[test]
    fn filter_accepts_known_fields() {
        let fields = fields(&["age", "country"]);
        assert!(validate_filter("age > 18 and (country == \"DE\")", &fields).is_ok());
    }

    #[test]
    fn filter_rejects_unknown_fields() {
        let fields = fields(&["age"]);
        assert_eq!(
            validate_filter("height > 2", &fields).unwrap_err(),
            "unknown field: height"
        );
    }

    #[test]
    fn filter_rejects_unbalanced_parens() {
        assert!(validate_filter("(age > 18", &[]).is_err());
        assert!(validate_filter("age > 18)", &[]).is_err());
        assert!(validate_filter("   ", &[]).is_err());
    }

    #[test]
    fn transforms_project_and_upper() {
        let sample = json!({ "user_id": "u-1", "name": "ada", "meta": { "plan": "pro" } });
        let output = evaluate_transforms(
            &[
                transform("user_id", "user_id"),
                transform("upper(name)", "name_upper"),
                transform("meta.plan", "plan"),
            ],
            &sample,
        )
        .unwrap();

        assert_eq!(
            output,
            json!({ "user_id": "u-1", "name_upper": "ADA", "plan": "pro" })
        );
    }

    #[test]
    fn transforms_report_unknown_fields() {
        let sample = json!({ "user_id": "u-1" });
        assert!(evaluate_transforms(&[transform("missing", "x")], &sample).is_err());
        assert!(evaluate_transforms(&[transform("user_id", "x")], &json!([1])).is_err());
    }
}
