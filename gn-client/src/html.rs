use once_cell::sync::Lazy;
use regex::Regex;

static TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("static regex"));

/// Page returned by GeoNode, with the few lookups the suites need
#[derive(Debug, Clone)]
pub struct Html {
    source: String,
}

impl Html {
    pub fn new(source: String) -> Self {
        Self { source }
    }

    /// Outer html of every element with this tag name, in document order
    pub fn find_all(&self, tag: &str) -> Vec<String> {
        let pattern = format!(r"(?is)<{0}(?:\s[^>]*)?>.*?</{0}\s*>", regex::escape(tag));
        match Regex::new(&pattern) {
            Ok(re) => re.find_iter(&self.source).map(|m| m.as_str().to_string()).collect(),
            Err(_) => vec![],
        }
    }
}

/// Text content of an html fragment, tags removed and blanks collapsed
pub fn text_of(fragment: &str) -> String {
    let without_tags = TAG_REGEX.replace_all(fragment, " ");
    without_tags.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use crate::html::{text_of, Html};

    const SRS_PAGE: &str = r#"<html><head><title>Upload - SRS</title></head>
        <body><h2 class="page-title">Could not find a projection for
           <strong>san_andres_y_providencia_highway</strong></h2><H2>second</H2></body></html>"#;

    #[test]
    fn find_h2_in_document_order() {
        let html = Html::new(SRS_PAGE.to_string());
        let h2 = html.find_all("h2");
        assert_eq!(2, h2.len());
        assert!(h2[0].contains("san_andres_y_providencia_highway"));
        assert_eq!("second", text_of(&h2[1]));
    }

    #[test]
    fn text_without_tags() {
        let html = Html::new(SRS_PAGE.to_string());
        let h2 = html.find_all("h2");
        assert_eq!("Could not find a projection for san_andres_y_providencia_highway", text_of(&h2[0]));
        assert!(Html::new("<p>no title</p>".to_string()).find_all("title").is_empty());
    }
}
