use std::borrow::Cow;

use serde_json::Value;

use super::Field;

impl Field {
    /// The key this field is stored under, with `$variable` references in its arguments replaced
    /// by the serialized value of the variable. Unknown variables become `null`.
    pub fn key<'a>(&'a self, variables: &Value) -> Cow<'a, str> {
        evaluate_key(&self.key_raw, variables)
    }
}

pub(crate) fn evaluate_key<'a>(key_raw: &'a str, variables: &Value) -> Cow<'a, str> {
    if !key_raw.contains('$') {
        return Cow::Borrowed(key_raw);
    }

    let mut evaluated = String::with_capacity(key_raw.len());
    let mut chars = key_raw.char_indices().peekable();
    let mut in_string = false;
    let mut escaped = false;

    while let Some((i, c)) = chars.next() {
        if in_string {
            evaluated.push(c);
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                evaluated.push(c);
            }
            '$' => {
                let start = i + 1;
                let mut end = start;
                while let Some((j, next)) = chars.next_if(|(_, next)| next.is_ascii_alphanumeric() || *next == '_') {
                    end = j + next.len_utf8();
                }

                match variables.get(&key_raw[start..end]) {
                    Some(value) => evaluated.push_str(&value.to_string()),
                    None => evaluated.push_str("null"),
                }
            }
            c => evaluated.push(c),
        }
    }

    Cow::Owned(evaluated)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn key_without_variables_is_borrowed() {
        let key = evaluate_key("friends(first: 10)", &json!({}));
        assert!(matches!(key, Cow::Borrowed("friends(first: 10)")));
    }

    #[test]
    fn variables_are_replaced() {
        let variables = json!({"first": 10, "filter": "best", "after_cursor": null});

        assert_eq!(
            evaluate_key("friends(first: $first, filter: $filter)", &variables),
            r#"friends(first: 10, filter: "best")"#
        );
        assert_eq!(evaluate_key("friends(after: $after_cursor)", &variables), "friends(after: null)");
        assert_eq!(evaluate_key("friends(after: $missing)", &variables), "friends(after: null)");
    }

    #[test]
    fn dollars_inside_strings_are_kept() {
        let variables = json!({"currency": "EUR"});

        assert_eq!(
            evaluate_key(r#"products(price: "$100", currency: $currency)"#, &variables),
            r#"products(price: "$100", currency: "EUR")"#
        );
        assert_ne!(
            evaluate_key(r#"products(price: "$100")"#, &variables),
            evaluate_key(r#"products(price: "$200")"#, &variables)
        );
        assert_eq!(
            evaluate_key(r#"search(text: "say \"$hi\"", limit: $limit)"#, &variables),
            r#"search(text: "say \"$hi\"", limit: null)"#
        );
    }
}
