//! Paper records returned by search and by paper cards

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// An academic paper
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Paper {
    /// Title
    pub title: String,
    /// Author names in listing order
    pub authors: Vec<String>,
    /// Abstract
    pub summary: String,
    /// Link to the PDF; the service sends `""` when there is none
    pub pdf_link: Option<String>,
    /// Publication date as sent by the service (ISO 8601)
    pub published: String,
    /// arXiv identifier URL
    pub arxiv_id: Option<String>,
}

impl Paper {
    /// Comma-separated author list
    pub fn authors_display(&self) -> String {
        self.authors.join(", ")
    }

    /// PDF link, if non-empty
    pub fn pdf(&self) -> Option<&str> {
        self.pdf_link.as_deref().filter(|l| !l.is_empty())
    }

    /// Publication date as `Mon DD, YYYY`
    ///
    /// Unparseable dates are returned verbatim; an empty date stays empty.
    pub fn published_display(&self) -> String {
        format_date(&self.published)
    }
}

/// Format an ISO date as `Mon DD, YYYY`, falling back to the input
pub fn format_date(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let date = DateTime::parse_from_rfc3339(raw)
        .map(|d| d.date_naive())
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|d| d.date()))
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"));
    match date {
        Ok(d) => d.format("%b %d, %Y").to_string(),
        Err(_) => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("2023-06-12T17:59:59Z"), "Jun 12, 2023");
        assert_eq!(format_date("2021-01-05"), "Jan 05, 2021");
        assert_eq!(format_date("last spring"), "last spring");
        assert_eq!(format_date(""), "");
    }

    #[test]
    fn test_empty_pdf_link_is_none() {
        let paper: Paper = serde_json::from_value(serde_json::json!({
            "title": "Attention Is All You Need",
            "authors": ["Ashish Vaswani", "Noam Shazeer"],
            "pdf_link": "",
            "published": "2017-06-12T17:57:34Z"
        }))
        .unwrap();
        assert_eq!(paper.pdf(), None);
        assert_eq!(paper.authors_display(), "Ashish Vaswani, Noam Shazeer");
        assert_eq!(paper.summary, "");
    }
}
