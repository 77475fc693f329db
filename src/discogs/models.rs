use serde::Serialize;
use serde_json::Value;

/// Release row returned by the artist route, built from either a full
/// release record or the lighter artist-releases listing entry.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReleaseSummary {
    pub id: Value,
    pub title: Value,
    pub year: Option<i64>,
    pub thumb: Value,
    pub cover_image: Value,
    pub resource_url: Value,
    #[serde(rename = "type")]
    pub kind: Value,
    pub format: Value,
    pub label: Value,
    pub genre: Value,
    pub style: Value,
}

impl ReleaseSummary {
    /// From `/releases/{id}`.
    pub fn from_detail(detail: &Value) -> Self {
        let first_image = detail["images"]
            .as_array()
            .and_then(|images| images.first())
            .and_then(|image| non_null(&image["uri"]));
        let thumb = non_null(&detail["thumb"]);

        Self {
            id: detail["id"].clone(),
            title: detail["title"].clone(),
            year: release_year(detail),
            thumb: thumb
                .clone()
                .or_else(|| first_image.clone())
                .unwrap_or_else(empty_string),
            cover_image: first_image.or(thumb).unwrap_or_else(empty_string),
            resource_url: detail["resource_url"].clone(),
            kind: non_null(&detail["type"]).unwrap_or_else(|| Value::String("release".to_string())),
            format: names(&detail["formats"]),
            label: names(&detail["labels"]),
            genre: list_or_empty(&detail["genres"]),
            style: list_or_empty(&detail["styles"]),
        }
    }

    /// From an entry of `/artists/{id}/releases` (used when the detail call fails).
    ///
    /// Genres and styles are not part of the listing and stay empty.
    pub fn from_basic(entry: &Value) -> Self {
        let wrap = |v: &Value| match v {
            Value::Null => Value::Array(Vec::new()),
            Value::Array(_) => v.clone(),
            other => Value::Array(vec![other.clone()]),
        };

        Self {
            id: entry["id"].clone(),
            title: entry["title"].clone(),
            year: entry["year"].as_i64().filter(|y| *y > 0),
            thumb: non_null(&entry["thumb"]).unwrap_or_else(empty_string),
            cover_image: non_null(&entry["thumb"]).unwrap_or_else(empty_string),
            resource_url: entry["resource_url"].clone(),
            kind: non_null(&entry["type"]).unwrap_or_else(|| Value::String("release".to_string())),
            format: wrap(&entry["format"]),
            label: wrap(&entry["label"]),
            genre: Value::Array(Vec::new()),
            style: Value::Array(Vec::new()),
        }
    }
}

/// Artist profile as exposed by the artist route.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ArtistInfo {
    pub id: Value,
    pub name: Value,
    pub profile: Value,
    pub images: Value,
    pub resource_url: Value,
}

impl ArtistInfo {
    pub fn from_value(artist: &Value) -> Self {
        Self {
            id: artist["id"].clone(),
            name: artist["name"].clone(),
            profile: non_null(&artist["profile"]).unwrap_or_else(empty_string),
            images: list_or_empty(&artist["images"]),
            resource_url: artist["resource_url"].clone(),
        }
    }
}

fn non_null(v: &Value) -> Option<Value> {
    match v {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        other => Some(other.clone()),
    }
}

fn empty_string() -> Value {
    Value::String(String::new())
}

fn list_or_empty(v: &Value) -> Value {
    if v.is_array() {
        v.clone()
    } else {
        Value::Array(Vec::new())
    }
}

/// `name` of every object in an array of formats or labels.
fn names(v: &Value) -> Value {
    Value::Array(
        v.as_array()
            .map(|items| items.iter().map(|item| item["name"].clone()).collect())
            .unwrap_or_default(),
    )
}

/// `year` when set, else the leading year of `released` ("1971-02-00").
fn release_year(detail: &Value) -> Option<i64> {
    detail["year"].as_i64().filter(|y| *y > 0).or_else(|| {
        detail["released"]
            .as_str()
            .and_then(|released| released.get(..4))
            .and_then(|year| year.parse().ok())
    })
}
