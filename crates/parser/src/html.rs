use scraper::{Html, Selector};
use url::Url;

pub struct HtmlResult {
    pub body_text: String,
    pub outlinks: Vec<String>,
}

pub fn parse_html(html_str: &str, base_url: &Url) -> HtmlResult {
    let document = Html::parse_document(html_str);

    // Body text - all visible text, whitespace-collapsed
    let body_text = selector("body")
        .and_then(|s| document.select(&s).next())
        .map(|el| {
            el.text()
                .collect::<Vec<_>>()
                .join(" ")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default();

    let outlinks = extract_links(&document, base_url);

    HtmlResult {
        body_text,
        outlinks,
    }
}

fn selector(s: &str) -> Option<Selector> {
    Selector::parse(s).ok()
}

fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let Some(sel) = selector("a[href]") else {
        return vec![];
    };

    document
        .select(&sel)
        .filter_map(|el| {
            let href = el.value().attr("href")?;

            // Skip non-crawlable URL schemes
            if href.starts_with("javascript:")
                || href.starts_with("mailto:")
                || href.starts_with("tel:")
                || href.starts_with("data:")
                || href.starts_with('#')
            {
                return None;
            }

            let resolved = base_url.join(href).ok()?;
            Some(resolved.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_text_and_links() {
        let base = Url::parse("http://www.ics.uci.edu/about").unwrap();
        let html = r##"<html><body>
            <h1>About  the   school</h1>
            <a href="/research">Research</a>
            <a href="http://vision.ics.uci.edu/">Vision</a>
            <a href="mailto:chair@ics.uci.edu">Chair</a>
            <a href="#top">Top</a>
        </body></html>"##;

        let result = parse_html(html, &base);
        assert_eq!(result.body_text, "About the school Research Vision Chair Top");
        assert_eq!(
            result.outlinks,
            vec![
                "http://www.ics.uci.edu/research".to_string(),
                "http://vision.ics.uci.edu/".to_string(),
            ]
        );
    }

    #[test]
    fn relative_links_resolve_against_base() {
        let base = Url::parse("http://www.ics.uci.edu/grad/admissions/").unwrap();
        let html = r#"<body><a href="../courses">Courses</a></body>"#;
        let result = parse_html(html, &base);
        assert_eq!(result.outlinks, vec!["http://www.ics.uci.edu/grad/courses"]);
    }

    #[test]
    fn empty_document_yields_nothing() {
        let base = Url::parse("http://www.ics.uci.edu/").unwrap();
        let result = parse_html("", &base);
        assert!(result.body_text.is_empty());
        assert!(result.outlinks.is_empty());
    }
}
