use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use snowdrift::reader::Readers;
use snowdrift::templating::minijinja::MiniJinjaEngine;
use snowdrift::templating::{Engine, Vars};
use snowdrift::{Config, HookRegistry, PageBuilder, PageId, SectionId, Site};

const TEMPLATES: &[(&str, &str)] = &[
    ("page.html", "{{ page.title }}|{{ page.section.name }}|{% if page.next %}{{ page.next.title }}{% endif %}"),
    ("section.html", "{{ section.name }}:{% for p in pages %}{{ p.title }},{% endfor %}"),
    ("taxonomy.html", "{% for t in terms %}{{ t.name }};{% endfor %}"),
    ("_default/taxonomy.terms.html", "{{ term.name }}={% for p in pages %}{{ p.title }},{% endfor %}"),
];

fn write(root: &Path, path: &str, contents: &str) {
    let file = root.join(path);
    fs::create_dir_all(file.parent().unwrap()).unwrap();
    fs::write(file, contents).unwrap();
}

fn builder(root: &Path, toml: &str, engine: impl Engine + 'static) -> PageBuilder {
    let config = Config::from_toml(root.join("content"), root.join("output"), toml).unwrap();
    PageBuilder::new(
        Arc::new(config),
        Arc::new(engine),
        Arc::new(Readers::markdown()),
        Arc::new(HookRegistry::with_builtins()),
    ).unwrap()
}

fn engine() -> MiniJinjaEngine {
    engine_with(&[])
}

fn engine_with(extra: &[(&'static str, &'static str)]) -> MiniJinjaEngine {
    MiniJinjaEngine::from_templates(TEMPLATES.iter().chain(extra).copied()).unwrap()
}

fn scan(builder: &PageBuilder) -> Site {
    let hooks = HookRegistry::with_builtins().chain(builder.config());
    builder.scan(&hooks).unwrap()
}

fn by_title(site: &Site, title: &str) -> PageId {
    site.languages().iter()
        .flat_map(|lang| {
            let lists = site.lists(lang);
            [lists.pages, lists.hidden_pages, lists.section_pages].concat()
        })
        .find(|&id| site[id].title == title)
        .unwrap()
}

fn section_in(site: &Site, dir: &str, lang: &str) -> SectionId {
    site.sections.iter()
        .find(|s| s.lang == lang && s.dir.ends_with(dir))
        .map(|s| s.id)
        .unwrap()
}

fn read(root: &Path, path: &str) -> String {
    fs::read_to_string(root.join("output").join(path)).unwrap()
}

#[test]
fn sibling_sections_inherit_root_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "content/a/one.md", "---\ntitle: One\n---\nOne.\n");
    write(root, "content/b/two.md", "---\ntitle: Two\ntemplate: custom.html\n---\nTwo.\n");

    let site = scan(&builder(root, "", engine()));
    let a = site.find_section("a", "en").unwrap();
    let b = site.find_section("b", "en").unwrap();
    let home = site.root("en").unwrap();

    assert_eq!(site.sections.len(), 3);
    assert_eq!(site[home].children, vec![a, b]);
    assert_eq!(site[a].parent, Some(home));
    assert_eq!(site[a].meta.get_int("paginate"), 10);
    assert_eq!(site[b].meta.get_string("orderby"), "date desc");
    assert_eq!(site[a].path, "/a/index.html");

    let one = by_title(&site, "One");
    let two = by_title(&site, "Two");
    assert_eq!(site[one].meta.get_string("template"), "page.html");
    assert_eq!(site[two].meta.get_string("template"), "custom.html");
    assert_eq!(site[one].path, "/a/one.html");
    assert_eq!(site[one].kind, "a");
}

#[test]
fn hidden_pages_stay_out_of_listings_and_taxonomies() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "content/blog/a.md", "---\ntitle: A\ntags: [x]\n---\nA.\n");
    write(root, "content/blog/secret.md", "---\ntitle: Secret\nhidden: true\ntags: [x]\n---\nS.\n");

    let site = scan(&builder(root, "", engine()));
    let blog = site.find_section("blog", "en").unwrap();
    let a = by_title(&site, "A");
    let secret = by_title(&site, "Secret");

    assert_eq!(site[blog].pages, vec![a]);
    assert_eq!(site[blog].hidden_pages, vec![secret]);
    assert_eq!(site.lists("en").pages, vec![a]);

    let tags = site.find_taxonomy("tags", "en").unwrap();
    let x = site.find_term(tags, "x").unwrap();
    assert_eq!(site[x].pages, vec![a]);
    assert_eq!(site[x].path, "/tags/x/index.html");
}

#[test]
fn drafts_are_dropped_and_filters_exclude() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "content/a.md", "---\ntitle: Kept\n---\n");
    write(root, "content/b.md", "---\ntitle: Draft\ndraft: true\n---\n");
    write(root, "content/c.md", "---\ntitle: Other\ntype: note\n---\n");

    let site = scan(&builder(root, "", engine()));
    let titles: Vec<_> = site.pages.iter().map(|p| p.title.as_str()).collect();
    assert!(titles.contains(&"Kept"));
    assert!(titles.contains(&"Other"));
    assert!(!titles.contains(&"Draft"));

    let filtered = builder(root, "[site]\nfilter = \"type != 'note'\"\n", engine());
    let site = scan(&filtered);
    let titles: Vec<_> = site.pages.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["Kept"]);
}

#[test]
fn pages_are_linked_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "content/blog/old.md", "---\ntitle: Old\ndate: 2024-01-01\n---\n");
    write(root, "content/blog/new.md", "---\ntitle: New\ndate: 2024-02-01\n---\n");
    write(root, "content/blog/mid.md", "---\ntitle: Mid\ndate: 2024-01-15\n---\n");

    let site = scan(&builder(root, "", engine()));
    let blog = site.find_section("blog", "en").unwrap();
    let (old, mid, new) = (by_title(&site, "Old"), by_title(&site, "Mid"), by_title(&site, "New"));

    assert_eq!(site[blog].pages, vec![new, mid, old]);
    assert_eq!(site.lists("en").pages, vec![new, mid, old]);
    assert_eq!(site[new].prev, None);
    assert_eq!(site[new].next, Some(mid));
    assert_eq!(site[mid].prev_in_section, Some(new));
    assert_eq!(site[old].next_in_section, None);
}

#[test]
fn languages_get_their_own_trees() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "content/blog/a.md", "---\ntitle: Hello\n---\n");
    write(root, "content/blog/a.zh.md", "---\ntitle: Nihao\n---\n");
    write(root, "content/blog/_index.zh.md", "---\ntitle: Boke\n---\n");

    let site = scan(&builder(root, "[languages.zh]\n", engine()));
    assert_eq!(site.languages(), ["en", "zh"]);

    let en = site.find_section("blog", "en").unwrap();
    let zh = site.sections_in("zh").into_iter().find(|&s| site[s].title == "Boke").unwrap();
    assert_ne!(en, zh);
    assert_eq!(site[zh].path, "/zh/blog/index.html");

    let hello = by_title(&site, "Hello");
    let nihao = by_title(&site, "Nihao");
    assert_eq!(site[en].pages, vec![hello]);
    assert_eq!(site[zh].pages, vec![nihao]);
    assert_eq!(site[nihao].lang, "zh");
    assert!(site[nihao].path.starts_with("/zh/"));
}

#[test]
fn a_full_build_writes_every_node() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "content/blog/a.md", "---\ntitle: A\ndate: 2024-01-02\ntags: [rust/async]\n---\nAlpha.\n");
    write(root, "content/blog/b.md", "---\ntitle: B\ndate: 2024-01-01\ntags: [rust]\naliases: [old/b.html]\n---\nBeta.\n");
    write(root, "content/blog/empty/_index.md", "---\ntitle: Nothing\n---\n");

    let builder = builder(root, "", engine());
    let stats = builder.run().unwrap();
    assert_eq!(stats.failed, 0);

    assert_eq!(read(root, "blog/a.html"), "A|blog|B");
    assert_eq!(read(root, "blog/b.html"), "B|blog|");
    assert_eq!(read(root, "blog/index.html"), "blog:A,B,");
    assert_eq!(read(root, "index.html"), ":");
    assert_eq!(read(root, "tags/index.html"), "rust;");
    assert_eq!(read(root, "tags/rust/index.html"), "rust=A,B,");
    assert_eq!(read(root, "tags/rust/async/index.html"), "async=A,");
    assert_eq!(read(root, "categories/index.html"), "");

    // No alias template, and empty sections are skipped.
    assert!(!root.join("output/old/b.html").exists());
    assert!(!root.join("output/blog/empty/index.html").exists());
    assert_eq!(stats.written, 8);
}

#[derive(Debug)]
struct Fallback;

impl Engine for Fallback {
    fn contains(&self, name: &str) -> bool {
        name == "_default/post.html"
    }

    fn render(&self, name: &str, vars: &Vars) -> snowdrift::error::Result<String> {
        Ok(format!("{name}:{}", vars.get("current_path").map(|v| v.to_string()).unwrap_or_default()))
    }
}

#[test]
fn template_lookup_falls_back_to_generic_names() {
    let dir = tempfile::tempdir().unwrap();
    let engine: &dyn Engine = &Fallback;
    let template = engine.lookup(&["post.html", "_default/post.html"]).unwrap();
    assert_eq!(template.name(), "_default/post.html");

    let mut vars = Vars::new();
    vars.insert("current_path", "/p.html".into());
    let file = dir.path().join("out/p.html");
    template.write(&file, &vars).unwrap();
    assert_eq!(fs::read_to_string(file).unwrap(), "_default/post.html:/p.html");

    let root = dir.path();
    write(root, "content/p.md", "---\ntitle: P\ntemplate: post.html\ntype: x\n---\n");
    let stats = builder(root, "[taxonomies.tags]\ndisable = true\n[taxonomies.categories]\ndisable = true\n", Fallback)
        .run()
        .unwrap();

    assert_eq!(stats.written, 0);
    assert!(engine.lookup(&["post.html"]).is_none());
}

#[test]
fn section_pages_render_as_filtered_sections() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "content/blog/a.md", "---\ntitle: A\n---\n");
    write(root, "content/blog/b.md", "---\ntitle: B\n---\n");
    write(root, "content/blog/rust/c.md", "---\ntitle: C\n---\n");
    write(root, "content/blog/all.md", "---\ntitle: All\nsection: true\norderby: title desc\nfilter: title != 'B'\n---\n");

    let builder = builder(root, "", engine());
    let site = scan(&builder);
    let blog = site.find_section("blog", "en").unwrap();
    let all = by_title(&site, "All");
    assert_eq!(site[blog].section_pages, vec![all]);
    assert!(!site[blog].pages.contains(&all));

    let stats = builder.run().unwrap();
    assert_eq!(stats.failed, 0);
    assert_eq!(read(root, "blog/all.html"), "All:C,A,");
}

#[test]
fn extra_formats_are_written() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "content/blog/a.md", "---\ntitle: A\ndate: 2024-01-02\n---\n");
    write(root, "content/blog/b.md", "---\ntitle: B\ndate: 2024-01-01\n---\n");

    let toml = "[sections.blog.formats.rss]\npath = \"{section:slug}/index.xml\"\n";
    let rss = [("_default/rss.xml", "rss:{% for p in pages %}{{ p.title }},{% endfor %}")];
    let stats = builder(root, toml, engine_with(&rss)).run().unwrap();

    assert_eq!(stats.failed, 0);
    assert_eq!(read(root, "blog/index.xml"), "rss:A,B,");
    assert!(!root.join("output/index.xml").exists());
}

#[test]
fn long_sections_are_paginated() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "content/blog/a.md", "---\ntitle: A\ndate: 2024-01-03\n---\n");
    write(root, "content/blog/b.md", "---\ntitle: B\ndate: 2024-01-02\n---\n");
    write(root, "content/blog/c.md", "---\ntitle: C\ndate: 2024-01-01\n---\n");

    let toml = "[sections.blog]\npaginate = 2\ntemplate = \"paged.txt\"\n";
    let paged = [(
        "paged.txt",
        "{{ paginator.number }}/{{ paginator.total }}:{% for p in paginator.pages %}{{ p.title }}{% endfor %}\
         {% if paginator.has_next %}>{{ paginator.next_url }}{% endif %}",
    )];

    let stats = builder(root, toml, engine_with(&paged)).run().unwrap();
    assert_eq!(stats.failed, 0);
    assert_eq!(read(root, "blog/index.html"), "1/2:AB>/blog/index2.html");
    assert_eq!(read(root, "blog/index2.html"), "2/2:C");
    assert!(!root.join("output/blog/index3.html").exists());
}

#[test]
fn section_settings_override_index_files() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "content/blog/_index.md", "---\ntitle: Blog\npaginate: 3\norderby: title\npaginate_path: \"{name}/p{number}\"\n---\n");
    write(root, "content/blog/_index.zh.md", "---\npaginate: 3\nslug: boke\n---\n");
    write(root, "content/blog/a.md", "---\ntitle: A\n---\n");
    write(root, "content/blog/a.zh.md", "---\ntitle: A\n---\n");

    let toml = "[languages.zh]\n\n\
        [sections.blog]\npaginate = 5\norderby = \"weight\"\n\n\
        [languages.zh.sections.blog]\npaginate = 7\n";

    let site = scan(&builder(root, toml, engine()));
    let en = section_in(&site, "blog", "en");
    let zh = section_in(&site, "blog", "zh");

    assert_eq!(site[en].title, "Blog");
    assert_eq!(site[en].meta.get_int("paginate"), 5);
    assert_eq!(site[en].meta.get_string("orderby"), "weight");
    assert_eq!(site[en].meta.get_string("paginate_path"), "{name}/p{number}");

    assert_eq!(site[zh].meta.get_int("paginate"), 7);
    assert_eq!(site[zh].meta.get_string("orderby"), "weight");
    assert_eq!(site[zh].slug, "boke");
    assert_eq!(site[zh].path, "/zh/boke/index.html");
}

#[test]
fn ignored_files_are_skipped_in_their_directory_only() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "content/blog/_index.md", "---\nignore_files: [\"^wip-\"]\n---\n");
    write(root, "content/blog/wip-a.md", "---\ntitle: WipA\n---\n");
    write(root, "content/blog/b.md", "---\ntitle: B\n---\n");
    write(root, "content/blog/sub/wip-c.md", "---\ntitle: WipC\n---\n");

    let site = scan(&builder(root, "", engine()));
    let titles: Vec<_> = site.pages.iter().map(|p| p.title.as_str()).collect();
    assert!(!titles.contains(&"WipA"));
    assert!(titles.contains(&"B"));
    assert!(titles.contains(&"WipC"));

    let sub = section_in(&site, "sub", "en");
    assert_eq!(site[sub].pages, vec![by_title(&site, "WipC")]);
}

#[test]
fn aliases_are_written_with_the_alias_template() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "content/blog/b.md", "---\ntitle: B\naliases: [old/b.html, /older/b/]\n---\n");

    let alias = [("alias.html", "moved:{{ page.title }}")];
    let stats = builder(root, "", engine_with(&alias)).run().unwrap();

    assert_eq!(stats.failed, 0);
    assert_eq!(read(root, "blog/b.html"), "B|blog|");
    assert_eq!(read(root, "old/b.html"), "moved:B");
    assert_eq!(read(root, "older/b/index.html"), "moved:B");
}

#[test]
fn concurrent_scans_build_each_section_once() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    for i in 0..32 {
        for j in 0..5 {
            write(root, &format!("content/d{i:02}/p{j}.md"), "body\n");
            write(root, &format!("content/d{i:02}/p{j}.zh.md"), "body\n");
        }

        write(root, &format!("content/d{i:02}/n/q.md"), "body\n");
        write(root, &format!("content/d{i:02}/n/q.zh.md"), "body\n");
    }

    let toml = "[languages.zh]\n[taxonomies.tags]\ndisable = true\n[taxonomies.categories]\ndisable = true\n";
    let site = scan(&builder(root, toml, engine()));

    let keys: HashSet<_> = site.sections.iter().map(|s| (s.dir.clone(), s.lang.clone())).collect();
    assert_eq!(keys.len(), site.sections.len());
    assert_eq!(site.sections.len(), 2 * (1 + 32 * 2));
    assert_eq!(site.pages.len(), 2 * 32 * 6);

    for lang in ["en", "zh"] {
        let home = site.root(lang).unwrap();
        assert_eq!(site[home].children.len(), 32);
        for &child in &site[home].children {
            assert_eq!(site[child].lang, lang);
            assert_eq!(site[child].pages.len(), 5);
            assert_eq!(site[child].children.len(), 1);
            assert!(site[child].pages.iter().all(|&p| site[p].lang == lang && site[p].section == child));
        }
    }
}

#[test]
fn bad_date_formats_fail_jobs_not_builds() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "content/a.md", "---\ntitle: A\ndate: 2024-01-02\n---\n");
    write(root, "content/b.md", "---\ntitle: B\ntemplate: dated.html\ndate: 2024-01-03\n---\n");

    let toml = "[taxonomies.archives]\ngroup_by = \"date:%Q\"\n";
    let builder = builder(root, toml, engine_with(&[("dated.html", "{{ page.date | date(\"%Q\") }}")]));
    let site = scan(&builder);
    assert!(site.find_taxonomy("archives", "en").is_none());
    assert!(site.find_taxonomy("tags", "en").is_some());

    let stats = builder.run().unwrap();
    assert_eq!(stats.failed, 1);
    assert_eq!(read(root, "a.html"), "A||");
    assert!(!root.join("output/b.html").exists());
}
