mod macros;

pub use macros::*;

use std::fmt::Write;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Convert spaces to hyphens. Remove characters that aren't alphanumerics,
/// underscores, or hyphens. Convert to lowercase. Also strip leading and
/// trailing whitespace.
pub fn slugify(string: &str) -> String {
    let mut output = String::with_capacity(string.len());

    let mut need_dash = false;
    for ch in string.chars() {
        for b in deunicode::deunicode_char(ch).unwrap_or("-").bytes() {
            match b {
                b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' => {
                    if need_dash {
                        output.push('-');
                        need_dash = false;
                    }

                    output.push(b.to_ascii_lowercase() as char);
                }
                _ => {
                    // All sequences of characters not alphanumeric or `_` are
                    // converted into one `-`.
                    need_dash = !output.is_empty();
                }
            }
        }
    }

    output
}

/// Slugifies each `/`-separated segment of `path` independently.
///
/// ```
/// use snowdrift::util::slugify_path;
///
/// assert_eq!(slugify_path("Rust Lang/Async IO"), "rust-lang/async-io");
/// assert_eq!(slugify_path(""), "");
/// ```
pub fn slugify_path(path: &str) -> String {
    split_trim(path, "/")
        .iter()
        .map(|segment| slugify(segment))
        .collect::<Vec<_>>()
        .join("/")
}

/// Replaces every occurrence of each key in `vars` with its value.
///
/// Keys are whole tokens, so `{section}` never matches inside
/// `{section:slug}`.
///
/// ```
/// use snowdrift::util::replace_vars;
///
/// let vars = [("{section}", "Blog"), ("{section:slug}", "blog")];
/// assert_eq!(replace_vars("{section:slug}/index.html", &vars), "blog/index.html");
/// assert_eq!(replace_vars("plain", &vars), "plain");
/// ```
pub fn replace_vars<K, V>(template: &str, vars: &[(K, V)]) -> String
    where K: AsRef<str>, V: AsRef<str>
{
    let mut output = template.to_string();
    for (key, value) in vars {
        if output.contains(key.as_ref()) {
            output = output.replace(key.as_ref(), value.as_ref());
        }
    }

    output
}

/// Splits `string` on `sep`, trims each part, and drops empty parts.
pub fn split_trim<'a>(string: &'a str, sep: &str) -> Vec<&'a str> {
    string.split(sep)
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect()
}

/// Returns every `/`-separated prefix of `path`, shortest first.
///
/// ```
/// use snowdrift::util::split_prefix;
///
/// assert_eq!(split_prefix("a/b/c"), vec!["a", "a/b", "a/b/c"]);
/// assert_eq!(split_prefix(" a / b "), vec!["a", "a/b"]);
/// assert!(split_prefix("").is_empty());
/// ```
pub fn split_prefix(path: &str) -> Vec<String> {
    let mut prefixes: Vec<String> = vec![];
    for segment in split_trim(path, "/") {
        let prefix = match prefixes.last() {
            Some(last) => format!("{last}/{segment}"),
            None => segment.to_string(),
        };

        prefixes.push(prefix);
    }

    prefixes
}

/// The file name of `path` with its final extension removed.
pub fn file_base_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// The extension of `path`, without the leading `.`, if it has one.
pub fn file_extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|ext| ext.to_str())
}

/// Parses a date or date-time in one of the common front-matter formats.
///
/// Offsets are accepted and discarded; the naive local time is kept.
pub fn parse_time(input: &str) -> Option<NaiveDateTime> {
    const DATE_TIMES: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
        "%Y/%m/%d %H:%M:%S",
        "%Y/%m/%d %H:%M",
    ];

    const DATES: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

    let input = input.trim();
    if let Ok(datetime) = chrono::DateTime::parse_from_rfc3339(input) {
        return Some(datetime.naive_local());
    }

    if let Ok(datetime) = chrono::DateTime::parse_from_rfc2822(input) {
        return Some(datetime.naive_local());
    }

    let datetime = DATE_TIMES.iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok());

    datetime.or_else(|| {
        DATES.iter()
            .find_map(|fmt| NaiveDate::parse_from_str(input, fmt).ok())
            .map(|date| date.and_time(NaiveTime::MIN))
    })
}

/// Formats `time` with the strftime `format`. Returns `None` if `format` is
/// malformed or asks for fields a naive time doesn't carry, such as `%z`.
pub fn format_time(time: &NaiveDateTime, format: &str) -> Option<String> {
    let mut output = String::with_capacity(format.len() + 8);
    write!(output, "{}", time.format(format)).ok()?;
    Some(output)
}
