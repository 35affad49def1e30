use osm_api_xml::convert::{self, ID_KEY, TYPE_KEY};
use osm_api_xml::shape::flatten;
use osm_api_xml::{parse_str, ElementType, Error};
use serde_json::{json, Value};

#[test]
fn test_elements_missing_type() {
    let xml = r#"<osm version="0.6"><node id="1" lat="0" lon="0"/></osm>"#;
    assert!(convert::elements(xml, ElementType::Way).unwrap().is_empty());
    assert!(convert::elements("<osm/>", ElementType::Relation)
        .unwrap()
        .is_empty());

    let nodes = convert::elements(xml, ElementType::Node).unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0][ID_KEY], "1");
    assert_eq!(nodes[0][TYPE_KEY], "node");
    assert_eq!(nodes[0]["attributes"]["lat"], "0");
}

#[test]
fn test_element_not_found() {
    let xml = r#"<osm version="0.6"><way id="1"/></osm>"#;
    let err = convert::element(xml, ElementType::Node, "1").unwrap_err();
    assert!(matches!(err, Error::NotFound(path) if path == "osm.node[0]"));
}

#[test]
fn test_element_id_from_caller() {
    let xml = r#"<osm><relation id="9"><member type="way" ref="3" role="outer"/></relation></osm>"#;
    let relation = convert::element(xml, ElementType::Relation, "-9").unwrap();
    assert_eq!(relation[ID_KEY], "-9");
    assert_eq!(relation[TYPE_KEY], "relation");
    assert_eq!(relation["member"][0]["attributes"]["role"], "outer");
}

#[test]
fn test_parse_error_propagates() {
    let bad = "<osm><user></osm>";
    assert!(matches!(convert::user(bad), Err(Error::MalformedXML(_))));
    assert!(matches!(convert::notes(bad), Err(Error::MalformedXML(_))));
    assert!(matches!(
        convert::element(bad, ElementType::Node, "1"),
        Err(Error::MalformedXML(_))
    ));
    assert!(matches!(
        convert::elements(bad, ElementType::Node),
        Err(Error::MalformedXML(_))
    ));
    assert!(matches!(convert::changesets(bad), Err(Error::MalformedXML(_))));
    assert!(matches!(convert::preferences(bad), Err(Error::MalformedXML(_))));
    assert!(matches!(convert::parse_map_data(bad), Err(Error::MalformedXML(_))));
}

#[test]
fn test_user_not_found() {
    let err = convert::user(r#"<osm version="0.6"></osm>"#).unwrap_err();
    assert!(matches!(err, Error::NotFound(path) if path == "osm.user[0]"));
}

#[test]
fn test_notes_comment_attributes() {
    let xml = r#"<osm>
      <note id="3">
        <comments>
          <comment uid="1" action="opened"><text>a</text></comment>
          <comment uid="2" action="closed"><text>b</text></comment>
        </comments>
      </note>
    </osm>"#;
    let notes = convert::notes(xml).unwrap();
    assert_eq!(
        notes,
        vec![json!({
            "id": "3",
            "comments": [
                {"uid": "1", "action": "opened", "text": "a"},
                {"uid": "2", "action": "closed", "text": "b"},
            ],
        })]
    );
}

#[test]
fn test_notes_empty() {
    assert!(convert::notes("<osm/>").unwrap().is_empty());
    assert!(convert::notes(r#"<osm version="0.6"></osm>"#)
        .unwrap()
        .is_empty());
}

#[test]
fn test_user_reflatten_is_idempotent() {
    let xml = r#"<osm><user id="1" display_name="a">
        <home lat="1" lon="2" zoom="3"/>
        <description>plain</description>
    </user></osm>"#;
    let user = convert::user(xml).unwrap();
    assert_eq!(
        Value::Object(user.clone()),
        json!({
            "id": "1",
            "display_name": "a",
            "home": {"lat": "1", "lon": "2", "zoom": "3"},
            "description": "plain",
        })
    );
    // flattening a field without attributes changes nothing
    let home = user["home"].as_object().unwrap();
    assert_eq!(&flatten(home), home);
}

#[test]
fn test_user_without_blocks() {
    let user = convert::user(r#"<osm><user id="5"/></osm>"#).unwrap();
    assert_eq!(Value::Object(user), json!({"id": "5"}));
}

#[test]
fn test_map_data_from_tree() {
    let tree = parse_str(
        r#"<osm><relation id="4"><member type="node" ref="1" role=""/></relation></osm>"#,
    )
    .unwrap();
    let data = convert::map_data(&tree);
    assert_eq!(data.keys().map(String::as_str).collect::<Vec<_>>(), vec!["relation"]);
    assert_eq!(data["relation"][0][ID_KEY], "4");
    assert_eq!(data["relation"][0]["member"][0]["attributes"]["type"], "node");
}

#[test]
fn test_preferences_missing() {
    assert!(convert::preferences("<osm/>").unwrap().is_empty());
    assert!(convert::preferences("<osm><preferences/></osm>")
        .unwrap()
        .is_empty());
}

#[test]
fn test_user_empty_children_omitted() {
    let user = convert::user(r#"<osm><user id="1"><roles/><description></description></user></osm>"#)
        .unwrap();
    assert!(!user.contains_key("roles"));
    assert!(!user.contains_key("description"));
    assert_eq!(Value::Object(user), json!({"id": "1"}));
}

#[test]
fn test_notes_empty_children_omitted() {
    let xml = r#"<osm><note lon="1" lat="2"><id>7</id><closed_at/><comments/></note></osm>"#;
    let notes = convert::notes(xml).unwrap();
    assert_eq!(
        notes,
        vec![json!({"lon": "1", "lat": "2", "id": "7", "comments": []})]
    );
}

#[test]
fn test_entries_without_content_skipped() {
    let xml = r#"<osm><node/><node id="2" lat="0" lon="0"/></osm>"#;
    let nodes = convert::elements(xml, ElementType::Node).unwrap();
    assert_eq!(nodes.len(), 1);

    let data = convert::parse_map_data(xml).unwrap();
    assert_eq!(data["node"].as_array().unwrap().len(), 1);
    assert_eq!(data["node"][0][ID_KEY], "2");
}
