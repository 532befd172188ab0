use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Current UTC time formatted as RFC 3339.
pub(crate) fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}
