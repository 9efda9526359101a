use std::iter::Peekable;

use pulldown_cmark::{html, Options, Parser};

use crate::error::Result;
use crate::meta::Meta;
use crate::reader::Reader;
use crate::value::{Dict, Format, Toml, Yaml};

/// Reads Markdown with optional front matter.
///
/// A line of three or more `-` opens a YAML block, and one of three or more
/// `+` a TOML block; either ends at the next such line or at a blank line.
/// Legacy `key: value` header lines may precede the block and may follow it
/// up to the first line that isn't a header. Block keys replace those of
/// earlier headers; later headers merge over both. A `<!--more-->` line ends
/// the summary; without one, the summary is the first paragraph.
///
/// ```
/// use snowdrift::reader::{Markdown, Reader};
///
/// let meta = Markdown::new().read("---\ntitle: Hi\n---\nOne.\n\nTwo.\n").unwrap();
/// assert_eq!(meta.get_string("title"), "Hi");
/// assert_eq!(meta.get_string("summary"), "<p>One.</p>\n");
/// assert_eq!(meta.get_string("content"), "<p>One.</p>\n<p>Two.</p>\n");
/// ```
#[derive(Debug, Clone)]
pub struct Markdown {
    options: Options,
}

impl Default for Markdown {
    fn default() -> Self {
        Markdown::new()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Marker {
    Yaml,
    Toml,
}

/// The front matter marker `line` is, if any.
fn marker(line: &str) -> Option<Marker> {
    let line = line.trim_end();
    let first = line.chars().next()?;
    if line.len() < 3 || !matches!(first, '-' | '+') || !line.chars().all(|c| c == first) {
        return None;
    }

    match line == "---" {
        true => Some(Marker::Yaml),
        false => Some(Marker::Toml),
    }
}

/// Splits a legacy `key: value` header line.
fn header(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(':')?;
    if key.is_empty() || !(value.is_empty() || value.starts_with(char::is_whitespace)) {
        return None;
    }

    Some((key, value.trim()))
}

fn is_more(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case("<!--more-->")
}

impl Markdown {
    pub fn new() -> Self {
        Markdown { options: Options::all().difference(Options::ENABLE_SMART_PUNCTUATION) }
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn html(&self, input: &str) -> String {
        let parser = Parser::new_ext(input, self.options);
        let mut output = String::with_capacity(input.len() * 3 / 2);
        html::push_html(&mut output, parser);
        output
    }
}

/// The first paragraph of `body`: everything up to the first blank line
/// after any leading blank lines.
fn first_paragraph(body: &str) -> &str {
    let body = body.trim_start_matches(['\n', '\r']);
    match body.find("\n\n") {
        Some(end) => &body[..end + 1],
        None => body,
    }
}

/// Sets every leading header line of `lines` on `meta`.
fn read_headers<'a, I>(lines: &mut Peekable<I>, meta: &mut Meta)
    where I: Iterator<Item = &'a str>
{
    while let Some((key, value)) = lines.peek().copied().and_then(header) {
        meta.set(&key.to_lowercase(), value);
        lines.next();
    }
}

/// Reads the front matter block opened by a `kind` marker, consuming the
/// closing line.
fn read_block<'a, I>(lines: &mut Peekable<I>, kind: Marker) -> Result<Meta>
    where I: Iterator<Item = &'a str>
{
    let mut block = String::new();
    for line in lines.by_ref() {
        if line.trim().is_empty() || marker(line).is_some() {
            break;
        }

        block.push_str(line);
        block.push('\n');
    }

    let dict: Dict = match kind {
        Marker::Yaml if block.trim().is_empty() => Dict::new(),
        Marker::Yaml => Yaml::parse(&block)?,
        Marker::Toml => Toml::parse(&block)?,
    };

    Ok(Meta::from(dict))
}

impl Reader for Markdown {
    fn read(&self, input: &str) -> Result<Meta> {
        let mut lines = input.lines().peekable();
        let mut meta = Meta::new();

        read_headers(&mut lines, &mut meta);
        if let Some(kind) = lines.peek().copied().and_then(marker) {
            lines.next();
            meta.load(&read_block(&mut lines, kind)?);
            read_headers(&mut lines, &mut meta);
        }

        let mut body = String::with_capacity(input.len());
        let mut summary = None;
        for line in lines {
            if summary.is_none() && is_more(line) {
                summary = Some(body.clone());
            }

            body.push_str(line);
            body.push('\n');
        }

        let summary = match summary {
            Some(summary) => self.html(&summary),
            None => self.html(first_paragraph(&body)),
        };

        meta.insert("summary", summary);
        meta.insert("content", self.html(&body));
        Ok(meta)
    }
}
