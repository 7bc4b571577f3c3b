//! String-pattern operators.
//!
//! `startswith`, `endswith`, `contains` and their case-insensitive `i`
//! variants compile to `$regex` documents over the escaped literal.

use bson::{doc, Bson, Document};

use crate::error::{QueryError, Result};

/// Translates a pattern token, or returns `None` if `token` is not one.
pub(crate) fn translate(key: &str, token: &str, operand: &Bson) -> Option<Result<Document>> {
    let (anchor_start, anchor_end, fold) = match token {
        "startswith" => (true, false, false),
        "istartswith" => (true, false, true),
        "endswith" => (false, true, false),
        "iendswith" => (false, true, true),
        "contains" => (false, false, false),
        "icontains" => (false, false, true),
        _ => return None,
    };

    let Bson::String(literal) = operand else {
        return Some(Err(QueryError::InvalidValue {
            key: key.to_string(),
            expected: "a string",
        }));
    };

    let escaped = regex::escape(literal);
    let pattern = format!(
        "{}{escaped}{}",
        if anchor_start { "^" } else { ".*" },
        if anchor_end { "$" } else { ".*" }
    );

    let mut out = doc! { "$regex": pattern };
    if fold {
        out.insert("$options", "i");
    }
    Some(Ok(out))
}

/// Normalizes an explicit `regex` operand into a `{$regex, $options}` document.
pub(crate) fn regex_operand(key: &str, operand: Bson) -> Result<Document> {
    match operand {
        Bson::String(pattern) => Ok(doc! { "$regex": pattern }),
        Bson::RegularExpression(re) => {
            let mut out = doc! { "$regex": re.pattern };
            if !re.options.is_empty() {
                out.insert("$options", re.options);
            }
            Ok(out)
        }
        Bson::Document(d) if d.contains_key("$regex") => Ok(d),
        _ => Err(QueryError::InvalidValue {
            key: key.to_string(),
            expected: "a pattern string, a regular expression or a {$regex} document",
        }),
    }
}
