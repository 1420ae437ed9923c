use quick_xml::events::Event;

/// One entry of a sitemap document: either a nested sitemap reference
/// (from a `<sitemapindex>`) or a page URL (from a `<urlset>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapEntry {
    Sitemap(String),
    Page(String),
}

/// Parse a sitemap or sitemap-index document. Element names are matched by
/// local name, so the standard sitemap default namespace (prefixed or not)
/// is accepted. Malformed XML yields whatever was parsed up to the error.
pub fn parse_sitemap(s: &str) -> Vec<SitemapEntry> {
    let mut reader = quick_xml::Reader::from_str(s);

    let mut res = vec![];

    let mut in_sitemap = false;
    let mut in_url = false;
    let mut in_loc = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match e.name().local_name().as_ref() {
                b"sitemap" => in_sitemap = true,
                b"url" => in_url = true,
                b"loc" => in_loc = true,
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.name().local_name().as_ref() {
                b"sitemap" => in_sitemap = false,
                b"url" => in_url = false,
                b"loc" => in_loc = false,
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_loc {
                    if let Ok(text) = e.unescape() {
                        let loc = text.trim().to_string();
                        if loc.is_empty() {
                            continue;
                        }
                        if in_sitemap {
                            res.push(SitemapEntry::Sitemap(loc));
                        } else if in_url {
                            res.push(SitemapEntry::Page(loc));
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                tracing::debug!("failed to parse sitemap: {}", e);
                break;
            }
            _ => (),
        }
    }

    res
}
