use serde::de::Visitor;
use serde::ser::SerializeMap;
use serde::{Deserializer, Serializer};
use std::fmt;

pub fn serialize_tags_as_map<S>(tags: &[(String, String)], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut map = serializer.serialize_map(Some(tags.len()))?;
    for (k, v) in tags {
        map.serialize_entry(k, v)?;
    }
    map.end()
}

pub fn deserialize_tags_from_map<'de, D>(deserializer: D) -> Result<Vec<(String, String)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct MapVisitor;

    impl<'de> Visitor<'de> for MapVisitor {
        type Value = Vec<(String, String)>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a JSON object")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: serde::de::MapAccess<'de>,
        {
            let mut tags = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((key, value)) = map.next_entry::<String, String>()? {
                tags.push((key, value));
            }
            Ok(tags)
        }
    }

    deserializer.deserialize_map(MapVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(serde::Serialize, serde::Deserialize)]
    struct Wrapper {
        #[serde(
            serialize_with = "serialize_tags_as_map",
            deserialize_with = "deserialize_tags_from_map"
        )]
        tags: Vec<(String, String)>,
    }

    #[test]
    fn test_serialize_empty_tags() {
        let w = Wrapper { tags: Vec::new() };
        assert_eq!(serde_json::to_string(&w).unwrap(), r#"{"tags":{}}"#);
    }

    #[test]
    fn test_serialize_preserves_insertion_order() {
        let w = Wrapper {
            tags: vec![
                ("metric_type".to_string(), "gauge".to_string()),
                ("url".to_string(), "/a/*/receiver/*/".to_string()),
            ],
        };
        assert_eq!(
            serde_json::to_string(&w).unwrap(),
            r#"{"tags":{"metric_type":"gauge","url":"/a/*/receiver/*/"}}"#
        );
    }

    #[test]
    fn test_deserialize_object_into_pairs() {
        let w: Wrapper = serde_json::from_str(r#"{"tags":{"action":"submit-all"}}"#).unwrap();
        assert_eq!(
            w.tags,
            vec![("action".to_string(), "submit-all".to_string())]
        );
    }
}
