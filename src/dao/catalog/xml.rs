//! Parsers for the BoardGameGeek XML API v2 `search` and `thing` payloads.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use super::{CatalogCandidateRecord, CatalogDetails, error::CatalogResult};

/// Rank entry carrying the overall board-game rank inside `<ranks>`.
const OVERALL_RANK_NAME: &str = "boardgame";
/// BGG encodes line breaks in descriptions as escaped character references.
const ENCODED_NEWLINE: &str = "&#10;";

#[derive(Default)]
struct PartialCandidate {
    id: Option<String>,
    name: Option<String>,
    primary_name: Option<String>,
    publication_year: Option<i32>,
}

impl PartialCandidate {
    fn finish(self) -> Option<CatalogCandidateRecord> {
        let id = self.id?;
        let name = self.primary_name.or(self.name)?;
        Some(CatalogCandidateRecord {
            id,
            name,
            publication_year: self.publication_year,
        })
    }
}

/// Parse a `search` response into candidate records, in catalog order.
pub fn parse_search_response(xml: &str) -> CatalogResult<Vec<CatalogCandidateRecord>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut records = Vec::new();
    let mut current: Option<PartialCandidate> = None;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) if e.name().as_ref() == b"item" => {
                current = Some(PartialCandidate {
                    id: attribute(e, b"id")?,
                    ..PartialCandidate::default()
                });
            }
            Event::Empty(ref e) => {
                let Some(candidate) = current.as_mut() else {
                    continue;
                };
                match e.name().as_ref() {
                    b"name" => {
                        let value = attribute(e, b"value")?;
                        if attribute(e, b"type")?.as_deref() == Some("primary") {
                            candidate.primary_name = value;
                        } else if candidate.name.is_none() {
                            candidate.name = value;
                        }
                    }
                    b"yearpublished" => candidate.publication_year = positive_number(e)?,
                    _ => {}
                }
            }
            Event::End(ref e) if e.name().as_ref() == b"item" => {
                if let Some(record) = current.take().and_then(PartialCandidate::finish) {
                    records.push(record);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(records)
}

#[derive(Clone, Copy)]
enum TextField {
    Image,
    Thumbnail,
    Description,
}

/// Parse a `thing` response; returns `None` when the payload holds no item.
pub fn parse_thing_response(xml: &str) -> CatalogResult<Option<CatalogDetails>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut details: Option<CatalogDetails> = None;
    let mut primary_name: Option<String> = None;
    let mut fallback_name: Option<String> = None;
    let mut text_field: Option<TextField> = None;
    let mut finished = false;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => match e.name().as_ref() {
                b"item" if details.is_none() => {
                    details = Some(CatalogDetails {
                        id: attribute(e, b"id")?.unwrap_or_default(),
                        ..CatalogDetails::default()
                    });
                }
                b"image" => text_field = Some(TextField::Image),
                b"thumbnail" => text_field = Some(TextField::Thumbnail),
                b"description" => text_field = Some(TextField::Description),
                _ => {}
            },
            Event::Text(ref e) => {
                let (Some(item), Some(field)) = (details.as_mut(), text_field) else {
                    continue;
                };
                if finished {
                    continue;
                }
                let text = e.unescape()?.into_owned();
                match field {
                    TextField::Image => item.image_url = Some(text),
                    TextField::Thumbnail => item.thumbnail_url = Some(text),
                    TextField::Description => {
                        item.description = Some(text.replace(ENCODED_NEWLINE, "\n"))
                    }
                }
            }
            Event::Empty(ref e) => {
                let Some(item) = details.as_mut() else {
                    continue;
                };
                if finished {
                    continue;
                }
                match e.name().as_ref() {
                    b"name" => {
                        let value = attribute(e, b"value")?;
                        if attribute(e, b"type")?.as_deref() == Some("primary") {
                            primary_name = value;
                        } else if fallback_name.is_none() {
                            fallback_name = value;
                        }
                    }
                    b"yearpublished" => item.publication_year = positive_number(e)?,
                    b"minplayers" => item.min_players = positive_number(e)?,
                    b"maxplayers" => item.max_players = positive_number(e)?,
                    b"rank" => {
                        if attribute(e, b"name")?.as_deref() == Some(OVERALL_RANK_NAME) {
                            // "Not Ranked" items carry a non numeric value.
                            item.rank = positive_number(e)?;
                        }
                    }
                    _ => {}
                }
            }
            Event::End(ref e) => match e.name().as_ref() {
                b"item" => finished = true,
                b"image" | b"thumbnail" | b"description" => text_field = None,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(details.map(|mut item| {
        item.title = primary_name.or(fallback_name).unwrap_or_default();
        item
    }))
}

fn attribute(element: &BytesStart<'_>, key: &[u8]) -> CatalogResult<Option<String>> {
    for attr in element.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Read a numeric `value` attribute; zero, negative and non numeric values count as absent.
fn positive_number<T>(element: &BytesStart<'_>) -> CatalogResult<Option<T>>
where
    T: std::str::FromStr + Default + PartialOrd,
{
    Ok(attribute(element, b"value")?
        .and_then(|value| value.trim().parse::<T>().ok())
        .filter(|value| *value > T::default()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<items total="3" termsofuse="https://boardgamegeek.com/xmlapi/termsofuse">
    <item type="boardgame" id="13">
        <name type="primary" value="Catan"/>
        <yearpublished value="1995" />
    </item>
    <item type="boardgame" id="325">
        <name type="primary" value="Catan: Seafarers"/>
        <yearpublished value="1997" />
    </item>
    <item type="boardgame" id="2807">
        <name type="alternate" value="Die Siedler von Catan: Cities &amp; Knights"/>
    </item>
</items>"#;

    const THING_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<items termsofuse="https://boardgamegeek.com/xmlapi/termsofuse">
    <item type="boardgame" id="13">
        <thumbnail>https://cf.geekdo-images.com/catan_t.jpg</thumbnail>
        <image>https://cf.geekdo-images.com/catan.jpg</image>
        <name type="primary" sortindex="1" value="Catan" />
        <name type="alternate" sortindex="1" value="Die Siedler von Catan" />
        <description>Trade, build &amp;amp; settle.&amp;#10;Up to four players.</description>
        <yearpublished value="1995" />
        <minplayers value="3" />
        <maxplayers value="4" />
        <poll name="suggested_numplayers" title="User Suggested Number of Players" totalvotes="10">
            <results numplayers="3">
                <result value="Best" numvotes="5" />
            </results>
        </poll>
        <statistics page="1">
            <ratings>
                <ranks>
                    <rank type="subtype" id="1" name="boardgame" friendlyname="Board Game Rank" value="520" bayesaverage="7.0" />
                    <rank type="family" id="5497" name="strategygames" friendlyname="Strategy Game Rank" value="401" bayesaverage="7.0" />
                </ranks>
            </ratings>
        </statistics>
    </item>
</items>"#;

    #[test]
    fn parses_search_items_in_order() {
        let records = parse_search_response(SEARCH_XML).unwrap();
        assert_eq!(
            records,
            vec![
                CatalogCandidateRecord {
                    id: "13".into(),
                    name: "Catan".into(),
                    publication_year: Some(1995),
                },
                CatalogCandidateRecord {
                    id: "325".into(),
                    name: "Catan: Seafarers".into(),
                    publication_year: Some(1997),
                },
                CatalogCandidateRecord {
                    id: "2807".into(),
                    name: "Die Siedler von Catan: Cities & Knights".into(),
                    publication_year: None,
                },
            ]
        );
    }

    #[test]
    fn empty_search_yields_no_records() {
        let xml = r#"<items total="0" termsofuse="https://boardgamegeek.com/xmlapi/termsofuse"></items>"#;
        assert!(parse_search_response(xml).unwrap().is_empty());
    }

    #[test]
    fn parses_thing_details() {
        let details = parse_thing_response(THING_XML).unwrap().unwrap();
        assert_eq!(details.id, "13");
        assert_eq!(details.title, "Catan");
        assert_eq!(
            details.image_url.as_deref(),
            Some("https://cf.geekdo-images.com/catan.jpg")
        );
        assert_eq!(
            details.thumbnail_url.as_deref(),
            Some("https://cf.geekdo-images.com/catan_t.jpg")
        );
        assert_eq!(details.min_players, Some(3));
        assert_eq!(details.max_players, Some(4));
        assert_eq!(details.rank, Some(520));
        assert_eq!(details.publication_year, Some(1995));
        assert_eq!(
            details.description.as_deref(),
            Some("Trade, build &amp; settle.\nUp to four players.")
        );
    }

    #[test]
    fn unranked_items_have_no_rank() {
        let xml = r#"<items><item type="boardgame" id="99">
            <name type="primary" value="Prototype" />
            <yearpublished value="0" />
            <statistics page="1"><ratings><ranks>
                <rank type="subtype" id="1" name="boardgame" value="Not Ranked" />
            </ranks></ratings></statistics>
        </item></items>"#;
        let details = parse_thing_response(xml).unwrap().unwrap();
        assert_eq!(details.title, "Prototype");
        assert_eq!(details.rank, None);
        assert_eq!(details.publication_year, None);
    }

    #[test]
    fn missing_thing_yields_none() {
        let xml = r#"<items termsofuse="https://boardgamegeek.com/xmlapi/termsofuse"></items>"#;
        assert_eq!(parse_thing_response(xml).unwrap(), None);
    }
}
