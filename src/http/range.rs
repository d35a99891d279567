//! `Range` header parsing (single byte range, RFC 7233).

use std::ops::RangeInclusive;

/// Outcome of interpreting a `Range` header against a resource length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ByteRange {
    /// No usable range: serve the whole resource with 200.
    Full,
    /// Serve these byte positions (inclusive) with 206.
    Partial(RangeInclusive<u64>),
    /// The range lies outside the resource: 416.
    NotSatisfiable,
}

/// Interpret `header` for a resource of `len` bytes.
///
/// Supported forms are `bytes=a-b`, `bytes=a-` and `bytes=-suffix`. Ends past the
/// resource are truncated to its last byte. Other units, multiple ranges and
/// malformed values fall back to [`ByteRange::Full`].
pub fn parse_range(header: Option<&str>, len: u64) -> ByteRange {
    let Some(spec) = header.and_then(|h| h.trim().strip_prefix("bytes=")) else {
        return ByteRange::Full;
    };
    if spec.contains(',') {
        return ByteRange::Full;
    }
    let Some((start, end)) = spec.split_once('-') else {
        return ByteRange::Full;
    };
    let (start, end) = (start.trim(), end.trim());

    if start.is_empty() {
        return suffix_range(end, len);
    }

    let Ok(first) = start.parse::<u64>() else {
        return ByteRange::Full;
    };
    let last = if end.is_empty() {
        None
    } else {
        match end.parse::<u64>() {
            Ok(last) if last >= first => Some(last),
            _ => return ByteRange::Full,
        }
    };

    if first >= len {
        return ByteRange::NotSatisfiable;
    }
    let last = last.map_or(len - 1, |last| last.min(len - 1));
    ByteRange::Partial(first..=last)
}

fn suffix_range(suffix: &str, len: u64) -> ByteRange {
    match suffix.parse::<u64>() {
        Ok(0) => ByteRange::NotSatisfiable,
        Ok(_) if len == 0 => ByteRange::NotSatisfiable,
        Ok(n) => ByteRange::Partial(len.saturating_sub(n)..=len - 1),
        Err(_) => ByteRange::Full,
    }
}
