//! Repairs for the malformed XML that real-world feeds serve.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Matches every `&`, capturing a following XML entity when there is one.
static AMPERSAND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:(amp|lt|gt|quot|apos|#[0-9]+|#[xX][0-9a-fA-F]+);)?")
        .expect("valid ampersand regex")
});

static DOUBLE_CDATA_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:<!\[CDATA\[\s*){2,}").expect("valid cdata open regex")
});

static DOUBLE_CDATA_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\]\]>\s*){2,}").expect("valid cdata close regex"));

/// Make a feed body parseable by a lenient XML reader.
///
/// - Bare `&` that does not start one of the five XML entities or a numeric
///   character reference becomes `&amp;`. HTML-only entities such as `&nbsp;`
///   are escaped too, so they survive as literal text.
/// - Doubled `<![CDATA[` / `]]>` markers collapse to one.
#[must_use]
pub fn sanitize_feed_body(body: &str) -> String {
    let escaped = AMPERSAND.replace_all(body, |caps: &Captures<'_>| {
        if caps.get(1).is_some() {
            caps[0].to_string()
        } else {
            "&amp;".to_string()
        }
    });
    let opened = DOUBLE_CDATA_OPEN.replace_all(&escaped, "<![CDATA[");
    DOUBLE_CDATA_CLOSE.replace_all(&opened, "]]>").into_owned()
}
