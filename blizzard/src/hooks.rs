use snowdrift::error::Result;
use snowdrift::{Hook, HookRegistry, Page, Pages, Site};

/// Words read per minute.
const WPM: usize = 200;

/// Sets `reading_time`, in whole minutes, on every page.
pub struct ReadingTime;

fn words(html: &str) -> usize {
    let mut in_tag = false;
    let text: String = html.chars()
        .map(|c| match c {
            '<' => { in_tag = true; ' ' }
            '>' => { in_tag = false; ' ' }
            _ if in_tag => ' ',
            c => c,
        })
        .collect();

    text.split_whitespace().count()
}

impl Hook for ReadingTime {
    fn name(&self) -> &str {
        "reading_time"
    }

    fn after_page_parse(&self, mut page: Page) -> Option<Page> {
        let minutes = words(&page.content).div_ceil(WPM).max(1);
        page.meta.insert("reading_time", minutes);
        Some(page)
    }
}

/// Moves pages marked `pinned` to the front, keeping the relative order of
/// the rest.
pub struct Pinned;

impl Hook for Pinned {
    fn name(&self) -> &str {
        "pinned"
    }

    fn before_pages_write(&self, site: &mut Site, pages: Pages) -> Pages {
        let (mut pinned, rest): (Pages, Pages) = pages.into_iter()
            .partition(|&id| site[id].meta.get_bool("pinned"));

        pinned.extend(rest);
        pinned
    }
}

/// The built-in hooks plus the ones this generator provides.
pub fn registry() -> Result<HookRegistry> {
    let mut registry = HookRegistry::with_builtins();
    registry.register("reading_time", |_| Box::new(ReadingTime))?;
    registry.register("pinned", |_| Box::new(Pinned))?;
    Ok(registry)
}
