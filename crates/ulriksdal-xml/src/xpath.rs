#![forbid(unsafe_code)]

//! Same-document URI references understood by the reference resolver.
//!
//! Only the bare-name and XPointer forms XML-DSig requires are accepted:
//!
//! | URI                   | selects                            | comments |
//! |-----------------------|------------------------------------|----------|
//! | `""`                  | whole document                     | removed  |
//! | `#xpointer(/)`        | whole document                     | kept     |
//! | `#id`                 | subtree of the element with `id`   | removed  |
//! | `#xpointer(id('id'))` | subtree of the element with `id`   | kept     |

use ulriksdal_core::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameDocumentRef<'a> {
    Document { with_comments: bool },
    Id { id: &'a str, with_comments: bool },
}

/// Classify a Reference URI.  External URIs are rejected.
pub fn parse_reference_uri(uri: &str) -> Result<SameDocumentRef<'_>, Error> {
    if uri.is_empty() {
        return Ok(SameDocumentRef::Document { with_comments: false });
    }
    let Some(fragment) = parse_same_document_ref(uri) else {
        return Err(Error::InvalidUri(format!("external URI not supported: {uri}")));
    };
    if fragment == "xpointer(/)" {
        return Ok(SameDocumentRef::Document { with_comments: true });
    }
    if let Some(id) = parse_xpointer_id(fragment) {
        return Ok(SameDocumentRef::Id { id, with_comments: true });
    }
    if fragment.is_empty() || fragment.starts_with("xpointer(") {
        return Err(Error::InvalidUri(format!("unsupported fragment: {uri}")));
    }
    Ok(SameDocumentRef::Id {
        id: fragment,
        with_comments: false,
    })
}

/// Parse a same-document reference (e.g., `#foo` → `foo`).
pub fn parse_same_document_ref(uri: &str) -> Option<&str> {
    uri.strip_prefix('#')
}

/// Parse an `xpointer(id('...'))` expression and return the ID value.
/// Double quotes are accepted as well.
pub fn parse_xpointer_id(expr: &str) -> Option<&str> {
    let inner = expr.strip_prefix("xpointer(id(")?.strip_suffix("))")?;
    inner
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .or_else(|| inner.strip_prefix('"').and_then(|s| s.strip_suffix('"')))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_forms() {
        assert_eq!(
            parse_reference_uri("").unwrap(),
            SameDocumentRef::Document { with_comments: false }
        );
        assert_eq!(
            parse_reference_uri("#xpointer(/)").unwrap(),
            SameDocumentRef::Document { with_comments: true }
        );
        assert_eq!(
            parse_reference_uri("#bar").unwrap(),
            SameDocumentRef::Id { id: "bar", with_comments: false }
        );
        assert_eq!(
            parse_reference_uri("#xpointer(id(\"bar\"))").unwrap(),
            SameDocumentRef::Id { id: "bar", with_comments: true }
        );
    }

    #[test]
    fn test_rejected_forms() {
        assert!(matches!(parse_reference_uri("doc.xml"), Err(Error::InvalidUri(_))));
        assert!(matches!(parse_reference_uri("#"), Err(Error::InvalidUri(_))));
        assert!(matches!(
            parse_reference_uri("#xpointer(//a)"),
            Err(Error::InvalidUri(_))
        ));
    }
}
