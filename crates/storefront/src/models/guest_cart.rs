//! Guest cart/wishlist mirror cookies.
//!
//! Anonymous visitors have no server-side cart document. Their lines live in
//! a `cart` (or `wishlist`) cookie holding a URL-encoded JSON array of
//! `{product_id, variant_id, quantity}` - identity and quantity only, never
//! prices. The cookie is readable by the browser app (not `HttpOnly`) so the
//! client can hydrate its local copy from it.
//!
//! Clearing writes an explicitly expired cookie rather than relying on the
//! client to forget, so the mirror cannot outlive a cleared cart.

use axum::http::{HeaderMap, header};
use tower_sessions::cookie::{
    Cookie, SameSite,
    time::{Duration, OffsetDateTime},
};

use marigold_core::{LineQuantity, LineSet};

use crate::db::CollectionKind;

/// Lifetime of a guest mirror cookie.
const MIRROR_COOKIE_MAX_AGE_DAYS: i64 = 30;

/// Read guest lines for a collection from the request cookies.
///
/// A missing, undecodable, or malformed cookie yields an empty set; garbage
/// in the cookie is logged and otherwise ignored (the visitor keeps an empty
/// cart rather than an error page).
#[must_use]
pub fn read_lines(headers: &HeaderMap, kind: CollectionKind) -> LineSet {
    let Some(raw) = cookie_value(headers, kind.cookie_name()) else {
        return LineSet::new();
    };

    let decoded = match urlencoding::decode(&raw) {
        Ok(decoded) => decoded,
        Err(e) => {
            tracing::warn!(cookie = kind.cookie_name(), "undecodable mirror cookie: {e}");
            return LineSet::new();
        }
    };

    match serde_json::from_str::<Vec<LineQuantity>>(&decoded) {
        Ok(lines) => LineSet::sanitize(lines),
        Err(e) => {
            tracing::warn!(cookie = kind.cookie_name(), "malformed mirror cookie: {e}");
            LineSet::new()
        }
    }
}

/// Build the `Set-Cookie` value mirroring the given lines.
///
/// # Panics
///
/// Never panics: `LineQuantity` serialization to JSON cannot fail.
#[must_use]
pub fn mirror_cookie(kind: CollectionKind, lines: &LineSet, secure: bool) -> String {
    let json = serde_json::to_string(lines.as_slice()).unwrap_or_else(|_| "[]".to_owned());
    let value = urlencoding::encode(&json).into_owned();

    Cookie::build((kind.cookie_name(), value))
        .path("/")
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::days(MIRROR_COOKIE_MAX_AGE_DAYS))
        .build()
        .to_string()
}

/// Build a `Set-Cookie` value that expires the mirror cookie immediately.
#[must_use]
pub fn expired_mirror_cookie(kind: CollectionKind, secure: bool) -> String {
    Cookie::build((kind.cookie_name(), ""))
        .path("/")
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::ZERO)
        .expires(OffsetDateTime::UNIX_EPOCH)
        .build()
        .to_string()
}

/// Find a cookie's raw value in the request headers.
fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| {
            let (k, v) = pair.trim().split_once('=')?;
            (k == name).then(|| v.to_owned())
        })
        .next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use marigold_core::{LineKey, ProductId, VariantId};

    fn lines(entries: &[(i32, i32, u32)]) -> LineSet {
        entries
            .iter()
            .map(|&(p, v, q)| {
                LineQuantity::new(LineKey::new(ProductId::new(p), VariantId::new(v)), q)
            })
            .collect()
    }

    fn headers_with_cookie(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(value).expect("valid header"),
        );
        headers
    }

    #[test]
    fn test_mirror_roundtrip() {
        let original = lines(&[(1, 2, 3), (4, 5, 1)]);
        let set_cookie = mirror_cookie(CollectionKind::Cart, &original, false);

        // Take "name=value" from the Set-Cookie string and feed it back
        let name_value = set_cookie
            .split(';')
            .next()
            .expect("cookie has a name=value part");
        let headers = headers_with_cookie(name_value);

        let read = read_lines(&headers, CollectionKind::Cart);
        assert_eq!(read, original);
    }

    #[test]
    fn test_missing_cookie_is_empty() {
        let headers = HeaderMap::new();
        assert!(read_lines(&headers, CollectionKind::Cart).is_empty());
    }

    #[test]
    fn test_malformed_cookie_is_empty() {
        let headers = headers_with_cookie("cart=not-json");
        assert!(read_lines(&headers, CollectionKind::Cart).is_empty());
    }

    #[test]
    fn test_zero_quantity_lines_are_dropped_on_read() {
        let json = r#"[{"product_id":1,"variant_id":1,"quantity":0},{"product_id":2,"variant_id":1,"quantity":2}]"#;
        let encoded = urlencoding::encode(json).into_owned();
        let headers = headers_with_cookie(&format!("cart={encoded}"));

        let read = read_lines(&headers, CollectionKind::Cart);
        assert_eq!(read.len(), 1);
        assert!(read.iter().all(|l| l.quantity > 0));
    }

    #[test]
    fn test_cart_and_wishlist_cookies_are_distinct() {
        let cart = lines(&[(1, 1, 1)]);
        let set_cookie = mirror_cookie(CollectionKind::Cart, &cart, false);
        let name_value = set_cookie.split(';').next().expect("name=value");
        let headers = headers_with_cookie(name_value);

        assert!(read_lines(&headers, CollectionKind::Wishlist).is_empty());
        assert_eq!(read_lines(&headers, CollectionKind::Cart), cart);
    }

    #[test]
    fn test_expired_cookie_expiry_is_in_the_past() {
        let set_cookie = expired_mirror_cookie(CollectionKind::Cart, false);
        let cookie = Cookie::parse(set_cookie).expect("parseable cookie");

        let expires = cookie
            .expires_datetime()
            .expect("expired cookie has an Expires attribute");
        assert!(expires < OffsetDateTime::now_utc());
        assert_eq!(cookie.max_age(), Some(Duration::ZERO));
        assert_eq!(cookie.value(), "");
    }
}
