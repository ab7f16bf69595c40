//! `PubmedArticleSet` parsing (efetch, `retmode=xml`)

use super::{PubmedError, PubmedResult};
use crate::models::Abstract;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Serialize;

/// Records dropped while converting a batch
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SkipCounts {
    pub missing_abstract: Vec<String>,
    pub missing_pmid: usize,
    pub other_error: Vec<String>,
}

impl SkipCounts {
    pub fn total(&self) -> usize {
        self.missing_abstract.len() + self.missing_pmid + self.other_error.len()
    }

    pub fn merge(&mut self, other: SkipCounts) {
        self.missing_abstract.extend(other.missing_abstract);
        self.missing_pmid += other.missing_pmid;
        self.other_error.extend(other.other_error);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedBatch {
    pub papers: Vec<Abstract>,
    pub skipped: SkipCounts,
}

#[derive(Default)]
struct ArticleRecord {
    pmid: Option<String>,
    has_article: bool,
    title: String,
    abstract_parts: Vec<String>,
    journal: String,
    pub_date: Vec<(String, String)>,
}

impl ArticleRecord {
    fn on_start(&mut self, path: &[String], name: &str) {
        match name {
            "Article" if path.last().map(String::as_str) == Some("MedlineCitation") => {
                self.has_article = true
            }
            "AbstractText" if path.iter().any(|p| p == "Abstract") => {
                self.abstract_parts.push(String::new())
            }
            _ => {}
        }
    }

    fn on_text(&mut self, path: &[String], text: &str) {
        let n = path.len();
        let tail = |names: &[&str]| n >= names.len() && path[n - names.len()..] == *names;

        if tail(&["MedlineCitation", "PMID"]) {
            self.pmid = Some(text.trim().to_string());
        } else if path.iter().any(|p| p == "ArticleTitle") {
            self.title.push_str(text);
        } else if path.iter().any(|p| p == "AbstractText") && path.iter().any(|p| p == "Abstract")
        {
            if let Some(part) = self.abstract_parts.last_mut() {
                part.push_str(text);
            }
        } else if tail(&["Journal", "Title"]) {
            self.journal.push_str(text);
        } else if let Some(pos) = path.iter().position(|p| p == "PubDate") {
            if let Some(field) = path.get(pos + 1) {
                self.pub_date.push((field.clone(), text.trim().to_string()));
            }
        }
    }

    fn published(&self) -> Option<String> {
        if let Some((_, date)) = self.pub_date.iter().find(|(k, _)| k == "MedlineDate") {
            return Some(date.clone());
        }
        let parts: Vec<&str> = ["Year", "Month", "Day"]
            .iter()
            .filter_map(|key| {
                self.pub_date
                    .iter()
                    .find(|(k, _)| k == key)
                    .map(|(_, v)| v.as_str())
            })
            .collect();
        (!parts.is_empty()).then(|| parts.join(" "))
    }

    fn finish(self, batch: &mut FetchedBatch) {
        let Some(pmid) = self.pmid.clone().filter(|p| !p.is_empty()) else {
            batch.skipped.missing_pmid += 1;
            return;
        };
        if !self.has_article {
            batch.skipped.other_error.push(pmid);
            return;
        }

        let text = self
            .abstract_parts
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if text.is_empty() {
            batch.skipped.missing_abstract.push(pmid);
            return;
        }
        let title = self.title.trim();
        if title.is_empty() {
            batch.skipped.other_error.push(pmid);
            return;
        }

        let mut paper = Abstract::new(pmid, text, title, self.journal.trim());
        paper.published = self.published();
        batch.papers.push(paper);
    }
}

/// Convert a `PubmedArticleSet` document into abstracts. Book articles and
/// other record kinds are ignored.
pub fn parse_article_set(xml: &str) -> PubmedResult<FetchedBatch> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut batch = FetchedBatch::default();
    let mut path: Vec<String> = Vec::new();
    let mut current: Option<ArticleRecord> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if name == "PubmedArticle" {
                    current = Some(ArticleRecord::default());
                } else if let Some(record) = current.as_mut() {
                    record.on_start(&path, &name);
                }
                path.push(name);
            }
            Ok(Event::End(_)) => {
                if path.pop().as_deref() == Some("PubmedArticle") {
                    if let Some(record) = current.take() {
                        record.finish(&mut batch);
                    }
                }
            }
            Ok(Event::Text(t)) => {
                if let Some(record) = current.as_mut() {
                    let text = t
                        .unescape()
                        .map_err(|e| PubmedError::Parse(e.to_string()))?;
                    record.on_text(&path, &text);
                }
            }
            Ok(Event::CData(c)) => {
                if let Some(record) = current.as_mut() {
                    record.on_text(&path, &String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(PubmedError::Parse(format!(
                    "XML error at byte {}: {}",
                    reader.error_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(pmid: &str, body: &str) -> String {
        format!(
            "<PubmedArticle><MedlineCitation Status=\"MEDLINE\"><PMID Version=\"1\">{pmid}</PMID>{body}</MedlineCitation></PubmedArticle>"
        )
    }

    const FULL: &str = "<Article>\
        <Journal><JournalIssue><PubDate><Year>2017</Year><Month>Jun</Month></PubDate></JournalIssue>\
        <Title>Antimicrobial agents &amp; chemotherapy</Title></Journal>\
        <ArticleTitle>A <i>bla</i> gene</ArticleTitle>\
        <Abstract><AbstractText Label=\"BACKGROUND\">Novel <i>blaKPC-2</i> found.</AbstractText>\
        <AbstractText Label=\"RESULTS\">It spreads.</AbstractText></Abstract>\
        </Article>\
        <CommentsCorrectionsList><CommentsCorrections><PMID>999</PMID></CommentsCorrections></CommentsCorrectionsList>";

    #[test]
    fn test_parse_full_article() {
        let xml = format!("<PubmedArticleSet>{}</PubmedArticleSet>", article("28000001", FULL));
        let batch = parse_article_set(&xml).expect("parse");
        assert_eq!(batch.skipped.total(), 0);
        let paper = &batch.papers[0];
        assert_eq!(paper.id, "28000001");
        assert_eq!(paper.text, "Novel blaKPC-2 found. It spreads.");
        assert_eq!(paper.title, "A bla gene");
        assert_eq!(paper.journal, "Antimicrobial agents & chemotherapy");
        assert_eq!(paper.published.as_deref(), Some("2017 Jun"));
    }

    #[test]
    fn test_skip_reasons() {
        let no_abstract = article(
            "2",
            "<Article><Journal><Title>J</Title></Journal><ArticleTitle>T</ArticleTitle></Article>",
        );
        let no_article = article("3", "");
        let other_abstract = article(
            "4",
            "<Article><ArticleTitle>T</ArticleTitle></Article><OtherAbstract><AbstractText>x</AbstractText></OtherAbstract>",
        );
        let no_pmid = "<PubmedArticle><MedlineCitation><Article/></MedlineCitation></PubmedArticle>";
        let xml = format!(
            "<PubmedArticleSet>{no_abstract}{no_article}{other_abstract}{no_pmid}</PubmedArticleSet>"
        );

        let batch = parse_article_set(&xml).expect("parse");
        assert!(batch.papers.is_empty());
        assert_eq!(batch.skipped.missing_abstract, vec!["2", "4"]);
        assert_eq!(batch.skipped.other_error, vec!["3"]);
        assert_eq!(batch.skipped.missing_pmid, 1);
        assert_eq!(batch.skipped.total(), 4);
    }

    #[test]
    fn test_medline_date() {
        let body = "<Article><Journal><JournalIssue><PubDate><MedlineDate>2017 Nov-Dec</MedlineDate></PubDate></JournalIssue><Title>J</Title></Journal>\
            <ArticleTitle>T</ArticleTitle><Abstract><AbstractText>text</AbstractText></Abstract></Article>";
        let batch = parse_article_set(&article("5", body)).expect("parse");
        assert_eq!(batch.papers[0].published.as_deref(), Some("2017 Nov-Dec"));
    }

    #[test]
    fn test_malformed_xml() {
        assert!(matches!(
            parse_article_set("<PubmedArticleSet><PubmedArticle></Oops>"),
            Err(PubmedError::Parse(_))
        ));
    }

    #[test]
    fn test_skip_counts_merge() {
        let mut a = SkipCounts {
            missing_abstract: vec!["1".into()],
            missing_pmid: 1,
            other_error: vec![],
        };
        a.merge(SkipCounts {
            missing_abstract: vec![],
            missing_pmid: 2,
            other_error: vec!["9".into()],
        });
        assert_eq!(a.total(), 5);
    }
}
