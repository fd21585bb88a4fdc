//! JMA area catalog (`area.json`): centers and the offices they group.

use std::collections::BTreeMap;
use std::io::{self, Write};

use serde::Deserialize;
use tracing::{debug, info};

use crate::client::JmaClient;
use crate::error::Result;

/// Shown instead of the region selector when the catalog cannot be loaded.
pub const CATALOG_LOAD_FAILED_MESSAGE: &str =
    "地域データの取得に失敗しました。アプリを再起動してください。";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Center {
    pub name: String,
    /// Office codes in upstream order. May reference offices that are
    /// missing from the catalog.
    pub children: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Office {
    pub name: String,
    #[serde(rename = "enName", default)]
    pub en_name: Option<String>,
    /// Code of the owning center.
    #[serde(default)]
    pub parent: Option<String>,
}

/// Read-only lookup table of centers and offices, keyed by code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AreaCatalog {
    centers: BTreeMap<String, Center>,
    offices: BTreeMap<String, Office>,
}

impl AreaCatalog {
    pub fn centers(&self) -> impl Iterator<Item = (&str, &Center)> {
        self.centers.iter().map(|(code, c)| (code.as_str(), c))
    }

    pub fn offices(&self) -> impl Iterator<Item = (&str, &Office)> {
        self.offices.iter().map(|(code, o)| (code.as_str(), o))
    }

    pub fn center(&self, code: &str) -> Option<&Center> {
        self.centers.get(code)
    }

    pub fn office(&self, code: &str) -> Option<&Office> {
        self.offices.get(code)
    }

    pub fn office_name(&self, code: &str) -> Option<&str> {
        self.office(code).map(|o| o.name.as_str())
    }

    /// Offices listed under a center, in order, skipping child codes that
    /// have no office record. Empty for an unknown center.
    pub fn center_offices<'a>(
        &'a self,
        center_code: &str,
    ) -> impl Iterator<Item = (&'a str, &'a Office)> + 'a {
        self.centers
            .get(center_code)
            .into_iter()
            .flat_map(|center| center.children.iter())
            .filter_map(|code| self.offices.get(code).map(|office| (code.as_str(), office)))
    }

    /// Child codes referenced by some center with no office record.
    pub fn dangling_children(&self) -> impl Iterator<Item = &str> {
        self.centers
            .values()
            .flat_map(|c| c.children.iter())
            .filter(|code| !self.offices.contains_key(*code))
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.offices.is_empty()
    }
}

pub fn parse_area_catalog(body: &str) -> Result<AreaCatalog> {
    Ok(serde_json::from_str(body)?)
}

/// Writes either the center/office listing or, when the catalog failed to
/// load, only the fixed failure message. Returns whether a listing was
/// written.
pub fn write_catalog_listing<W: Write>(
    catalog: &Result<AreaCatalog>,
    out: &mut W,
) -> io::Result<bool> {
    let Ok(catalog) = catalog else {
        writeln!(out, "{CATALOG_LOAD_FAILED_MESSAGE}")?;
        return Ok(false);
    };
    for (center_code, center) in catalog.centers() {
        writeln!(out, "{center_code} {}", center.name)?;
        for (code, office) in catalog.center_offices(center_code) {
            writeln!(out, "  {code} {}", office.name)?;
        }
    }
    Ok(true)
}

impl JmaClient {
    /// Fetches and parses the area catalog. One request, no retry.
    pub async fn load_area_catalog(&self) -> Result<AreaCatalog> {
        let body = self.get_text(&self.endpoints().area_url).await?;
        let catalog = parse_area_catalog(&body)?;
        info!(
            centers = catalog.centers.len(),
            offices = catalog.offices.len(),
            "area catalog loaded"
        );
        // upstream lists a few codes with no office record; they are hidden
        let dangling: Vec<_> = catalog.dangling_children().collect();
        if !dangling.is_empty() {
            debug!(?dangling, "center children without office records");
        }
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, FetchError};

    const SAMPLE: &str = r#"{
        "centers": {
            "010100": {"name": "北海道地方", "enName": "Hokkaido", "officeName": "札幌管区気象台", "children": ["011000", "012000"]},
            "010300": {"name": "関東甲信地方", "enName": "Kanto Koshin", "children": ["130000", "999999", "140000"]}
        },
        "offices": {
            "011000": {"name": "宗谷地方", "enName": "Soya", "officeName": "稚内地方気象台", "parent": "010100", "children": ["011000"]},
            "012000": {"name": "上川・留萌地方", "parent": "010100"},
            "130000": {"name": "東京都", "enName": "Tokyo", "parent": "010300"},
            "140000": {"name": "神奈川県", "parent": "010300"}
        },
        "class10s": {},
        "class15s": {}
    }"#;

    #[test]
    fn parses_centers_and_offices() {
        let catalog = parse_area_catalog(SAMPLE).unwrap();
        let codes: Vec<_> = catalog.centers().map(|(code, _)| code).collect();
        assert_eq!(codes, ["010100", "010300"]);
        assert_eq!(catalog.office_name("130000"), Some("東京都"));
        let tokyo = catalog.office("130000").unwrap();
        assert_eq!(tokyo.en_name.as_deref(), Some("Tokyo"));
        assert_eq!(tokyo.parent.as_deref(), Some("010300"));
        assert_eq!(catalog.office("140000").unwrap().en_name, None);
    }

    #[test]
    fn dangling_children_are_not_listed() {
        let catalog = parse_area_catalog(SAMPLE).unwrap();
        let listed: Vec<_> = catalog.center_offices("010300").map(|(c, _)| c).collect();
        assert_eq!(listed, ["130000", "140000"]);
        // still present in the raw record
        assert_eq!(catalog.center("010300").unwrap().children.len(), 3);
        assert_eq!(catalog.dangling_children().collect::<Vec<_>>(), ["999999"]);
    }

    #[test]
    fn every_listed_office_exists() {
        let catalog = parse_area_catalog(SAMPLE).unwrap();
        for (center_code, _) in catalog.centers() {
            for (code, office) in catalog.center_offices(center_code) {
                assert_eq!(catalog.office(code), Some(office));
            }
        }
    }

    #[test]
    fn unknown_center_lists_nothing() {
        let catalog = parse_area_catalog(SAMPLE).unwrap();
        assert_eq!(catalog.center_offices("nope").count(), 0);
    }

    #[test]
    fn listing_skips_dangling_children() {
        let catalog = parse_area_catalog(SAMPLE);
        let mut out = Vec::new();
        assert!(write_catalog_listing(&catalog, &mut out).unwrap());
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("010100 北海道地方\n  011000 宗谷地方\n"));
        assert!(text.contains("010300 関東甲信地方\n  130000 東京都\n  140000 神奈川県\n"));
        assert!(!text.contains("999999"));
    }

    #[test]
    fn failed_load_lists_only_the_failure_message() {
        let failed: Result<AreaCatalog> = Err(FetchError::MissingField("offices"));
        let mut out = Vec::new();
        assert!(!write_catalog_listing(&failed, &mut out).unwrap());
        assert_eq!(
            String::from_utf8(out).unwrap(),
            format!("{CATALOG_LOAD_FAILED_MESSAGE}\n")
        );
    }

    #[test]
    fn missing_offices_key_is_a_parse_error() {
        let err = parse_area_catalog(r#"{"centers": {}}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn center_without_children_is_a_parse_error() {
        let body = r#"{"centers": {"C1": {"name": "Kanto"}}, "offices": {}}"#;
        assert!(matches!(parse_area_catalog(body), Err(FetchError::Parse(_))));
    }

    #[test]
    fn non_json_body_is_a_parse_error() {
        assert!(matches!(
            parse_area_catalog("<html>maintenance</html>"),
            Err(FetchError::Parse(_))
        ));
    }
}
