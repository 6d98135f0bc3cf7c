/// Keys whose value identifies the ASN a path (or speaker) belongs to
const ASN_KEYS: &[&str] = &["asn", "source_asn"];

/// Pull the ASN out of a `key:value` text rendering
///
/// Returns the value of the first `asn` or `source_asn` token, or an empty
/// string when neither is present (locally originated, or unknown):
/// ```
/// use zbgp::reconcile::resolve_local_asn;
///
/// assert_eq!(resolve_local_asn(r#"asn:65000 router_id:"1.1.1.1""#), "65000");
/// assert_eq!(resolve_local_asn(r#"prefix:"10.0.0.0/24" best:true"#), "");
/// ```
pub fn resolve_local_asn(text: &str) -> String {
    text.split_whitespace()
        .find_map(|token| {
            let mut parts = token.split(':');
            let key = parts.next()?;
            if ASN_KEYS.contains(&key) {
                Some(parts.next().unwrap_or("").to_string())
            } else {
                None
            }
        })
        .unwrap_or_default()
}
