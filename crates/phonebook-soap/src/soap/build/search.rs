//! `Search` request and `SearchResponse` serialization.

use std::io::Write;

use phonebook_core::constants::{PHONEBOOK_NAMESPACE, SOAP_ENVELOPE_NAMESPACE};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use super::escape::escape_ascii;
use crate::error::SoapResult;
use crate::soap::core::{Catalog, Entry, Protocol, SearchQuery, SearchResult};

const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// Serializes one search page into the `SearchResponse` envelope endpoints expect.
///
/// ## Summary
/// Writes `Name`, `Id`, `IsFirst`, `IsLast` and `NoOfEntries` of the result, then
/// one `Catalog` per group and one `Entry` per item. Catalogs and entries share a
/// single position sequence for their own `IsFirst`/`IsLast` flags. The body carries
/// no XML declaration and is pure ASCII.
///
/// ## Errors
/// Returns an error if writing fails or the output is not valid UTF-8.
pub fn serialize_search_result(result: &SearchResult) -> SoapResult<String> {
    let mut writer = Writer::new(Vec::new());
    writer.config_mut().add_space_before_slash_in_empty_elements = true;

    let mut envelope = BytesStart::new("env:Envelope");
    envelope.push_attribute(("xmlns:xsi", XSI_NAMESPACE));
    envelope.push_attribute(("xmlns:xsd", XSD_NAMESPACE));
    envelope.push_attribute(("xmlns:env", SOAP_ENVELOPE_NAMESPACE));
    writer.write_event(Event::Start(envelope))?;
    writer.write_event(Event::Start(BytesStart::new("env:Body")))?;

    let mut response = BytesStart::new("SearchResponse");
    response.push_attribute(("xmlns", PHONEBOOK_NAMESPACE));
    writer.write_event(Event::Start(response))?;
    writer.write_event(Event::Start(BytesStart::new("SearchResult")))?;

    let total = result.len();
    write_text_element(&mut writer, "Name", &result.name)?;
    write_text_element(&mut writer, "Id", "0")?;
    write_text_element(&mut writer, "IsFirst", flag(result.is_first))?;
    write_text_element(&mut writer, "IsLast", flag(result.is_last))?;
    write_text_element(&mut writer, "NoOfEntries", &total.to_string())?;

    let mut position = 0;
    for catalog in &result.catalogs {
        position += 1;
        write_catalog(&mut writer, catalog, position, total)?;
    }
    for entry in &result.entries {
        position += 1;
        write_entry(&mut writer, entry, position, total)?;
    }

    writer.write_event(Event::End(BytesEnd::new("SearchResult")))?;
    writer.write_event(Event::End(BytesEnd::new("SearchResponse")))?;
    writer.write_event(Event::End(BytesEnd::new("env:Body")))?;
    writer.write_event(Event::End(BytesEnd::new("env:Envelope")))?;

    Ok(String::from_utf8(writer.into_inner())?)
}

fn write_catalog<W: Write>(
    writer: &mut Writer<W>,
    catalog: &Catalog,
    position: usize,
    total: usize,
) -> SoapResult<()> {
    writer.write_event(Event::Start(BytesStart::new("Catalog")))?;
    write_text_element(writer, "Name", &catalog.name)?;
    write_text_element(writer, "Id", &catalog.id)?;
    write_text_element(writer, "IsFirst", flag(position == 1))?;
    write_text_element(writer, "IsLast", flag(position == total))?;
    writer.write_event(Event::End(BytesEnd::new("Catalog")))?;
    Ok(())
}

fn write_entry<W: Write>(
    writer: &mut Writer<W>,
    entry: &Entry,
    position: usize,
    total: usize,
) -> SoapResult<()> {
    writer.write_event(Event::Start(BytesStart::new("Entry")))?;
    write_text_element(writer, "Name", &entry.name)?;
    write_text_element(writer, "Id", &entry.id)?;
    write_text_element(writer, "IsFirst", flag(position == 1))?;
    write_text_element(writer, "IsLast", flag(position == total))?;
    writer.write_event(Event::Empty(BytesStart::new("BaseDN")))?;
    writer.write_event(Event::Empty(BytesStart::new("SystemType")))?;

    for protocol in [Protocol::Sip, Protocol::H323] {
        let Some(dial_string) = entry
            .routes
            .iter()
            .find(|r| r.protocol == protocol && !r.dial_string.is_empty())
            .map(|r| r.dial_string.as_str())
        else {
            continue;
        };

        writer.write_event(Event::Start(BytesStart::new("Route")))?;
        write_text_element(writer, "CallType", "Video")?;
        write_text_element(writer, "Protocol", protocol.as_str())?;
        write_text_element(writer, "DialString", dial_string)?;
        writer.write_event(Event::Empty(BytesStart::new("Restrict")))?;
        writer.write_event(Event::Empty(BytesStart::new("Description")))?;
        writer.write_event(Event::Empty(BytesStart::new("SystemType")))?;
        writer.write_event(Event::End(BytesEnd::new("Route")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("Entry")))?;
    Ok(())
}

/// Serializes a `Search` call against an upstream phonebook server.
///
/// ## Errors
/// Returns an error if writing fails or the output is not valid UTF-8.
pub fn serialize_search_request(query: &SearchQuery) -> SoapResult<String> {
    let mut writer = Writer::new(Vec::new());

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut envelope = BytesStart::new("env:Envelope");
    envelope.push_attribute(("xmlns:env", SOAP_ENVELOPE_NAMESPACE));
    writer.write_event(Event::Start(envelope))?;
    writer.write_event(Event::Start(BytesStart::new("env:Body")))?;

    let mut search = BytesStart::new("Search");
    search.push_attribute(("xmlns", PHONEBOOK_NAMESPACE));
    writer.write_event(Event::Start(search))?;

    writer.write_event(Event::Start(BytesStart::new("Identification")))?;
    write_text_element(&mut writer, "MACAddress", &query.mac)?;
    writer.write_event(Event::End(BytesEnd::new("Identification")))?;

    write_text_element(&mut writer, "CaseSensitiveSearch", "false")?;
    write_text_element(&mut writer, "SearchString", &query.query)?;
    write_text_element(&mut writer, "SearchType", "Free")?;
    write_text_element(&mut writer, "MaxResult", &query.limit.to_string())?;
    if let Some(ref parent_id) = query.parent_id {
        write_text_element(&mut writer, "SearchPath", parent_id)?;
    }
    if let Some(ref start_id) = query.start_id {
        write_text_element(&mut writer, "StartFromId", start_id)?;
    }
    let scope = if !query.query.is_empty() && query.parent_id.is_none() {
        "SubTree"
    } else {
        "SingleLevel"
    };
    write_text_element(&mut writer, "Scope", scope)?;
    write_text_element(&mut writer, "RangeInclusive", "false")?;

    writer.write_event(Event::End(BytesEnd::new("Search")))?;
    writer.write_event(Event::End(BytesEnd::new("env:Body")))?;
    writer.write_event(Event::End(BytesEnd::new("env:Envelope")))?;

    Ok(String::from_utf8(writer.into_inner())?)
}

const fn flag(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

/// Writes a simple text element.
fn write_text_element<W: Write>(writer: &mut Writer<W>, name: &str, text: &str) -> SoapResult<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::from_escaped(escape_ascii(text))))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soap::core::Route;
    use crate::soap::parse::{parse_search_request, parse_search_response};

    fn sample_result() -> SearchResult {
        SearchResult {
            name: "Main office".into(),
            is_first: true,
            is_last: true,
            catalogs: vec![Catalog {
                name: "test".into(),
                id: "g-3".into(),
            }],
            entries: vec![Entry {
                name: "Item3".into(),
                id: "i-9".into(),
                routes: vec![
                    Route {
                        protocol: Protocol::Sip,
                        dial_string: "item3@example.com".into(),
                    },
                    Route {
                        protocol: Protocol::H323,
                        dial_string: "1003".into(),
                    },
                ],
            }],
        }
    }

    #[test]
    fn serialize_exact_body() {
        let xml = serialize_search_result(&sample_result()).unwrap();

        let expected = concat!(
            r#"<env:Envelope xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" "#,
            r#"xmlns:xsd="http://www.w3.org/2001/XMLSchema" "#,
            r#"xmlns:env="http://schemas.xmlsoap.org/soap/envelope/">"#,
            "<env:Body>",
            r#"<SearchResponse xmlns="http://www.tandberg.net/2004/06/PhoneBookSearch/">"#,
            "<SearchResult>",
            "<Name>Main office</Name><Id>0</Id><IsFirst>true</IsFirst><IsLast>true</IsLast>",
            "<NoOfEntries>2</NoOfEntries>",
            "<Catalog><Name>test</Name><Id>g-3</Id><IsFirst>true</IsFirst><IsLast>false</IsLast></Catalog>",
            "<Entry><Name>Item3</Name><Id>i-9</Id><IsFirst>false</IsFirst><IsLast>true</IsLast>",
            "<BaseDN /><SystemType />",
            "<Route><CallType>Video</CallType><Protocol>SIP</Protocol>",
            "<DialString>item3@example.com</DialString><Restrict /><Description /><SystemType /></Route>",
            "<Route><CallType>Video</CallType><Protocol>H323</Protocol>",
            "<DialString>1003</DialString><Restrict /><Description /><SystemType /></Route>",
            "</Entry>",
            "</SearchResult></SearchResponse></env:Body></env:Envelope>",
        );
        assert_eq!(xml, expected);
    }

    #[test]
    fn empty_page_is_well_formed() {
        let result = SearchResult {
            name: "Empty".into(),
            is_first: false,
            is_last: true,
            ..SearchResult::default()
        };
        let xml = serialize_search_result(&result).unwrap();

        assert!(xml.contains("<NoOfEntries>0</NoOfEntries>"));
        assert!(xml.contains("<IsFirst>false</IsFirst>"));
        assert!(!xml.contains("<Catalog>"));
        let page = parse_search_response(xml.as_bytes()).unwrap();
        assert!(page.catalogs.is_empty() && page.entries.is_empty());
    }

    #[test]
    fn non_ascii_names_are_character_references() {
        let mut result = sample_result();
        result.catalogs[0].name = "M\u{f6}tesrum & co".into();
        let xml = serialize_search_result(&result).unwrap();

        assert!(xml.is_ascii());
        assert!(xml.contains("<Name>M&#246;tesrum &amp; co</Name>"));

        let page = parse_search_response(xml.as_bytes()).unwrap();
        assert_eq!(page.catalogs[0].name, "M\u{f6}tesrum & co");
    }

    #[test]
    fn entry_without_routes_has_no_route_elements() {
        let mut result = sample_result();
        result.entries[0].routes.clear();
        let xml = serialize_search_result(&result).unwrap();
        assert!(!xml.contains("<Route>"));
    }

    #[test]
    fn request_round_trips_through_parser() {
        let query = SearchQuery {
            mac: "00:11:22:33:44:55".into(),
            query: String::new(),
            parent_id: Some("c_1".into()),
            start_id: Some("e_4".into()),
            limit: 100,
        };
        let xml = serialize_search_request(&query).unwrap();

        assert!(xml.contains("<Scope>SingleLevel</Scope>"));
        let req = parse_search_request(xml.as_bytes()).unwrap();
        assert_eq!(req.mac.as_deref(), Some("00:11:22:33:44:55"));
        assert_eq!(req.group_id.as_deref(), Some("c_1"));
        assert_eq!(req.last_id.as_deref(), Some("e_4"));
        assert_eq!(req.limit, Some(100));
        assert_eq!(req.value, "");
    }

    #[test]
    fn free_text_query_searches_subtree() {
        let query = SearchQuery {
            mac: "00:11:22:33:44:55".into(),
            query: "a<b".into(),
            parent_id: None,
            start_id: None,
            limit: 10,
        };
        let xml = serialize_search_request(&query).unwrap();

        assert!(xml.contains("<Scope>SubTree</Scope>"));
        assert_eq!(parse_search_request(xml.as_bytes()).unwrap().value, "a<b");
    }
}
