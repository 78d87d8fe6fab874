use serde::{Deserialize, Deserializer, Serialize};

use super::de::string_or_number;

/// A listing as returned by the search endpoints. Read-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Warehouse {
    #[serde(alias = "_id", deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    /// Built-up area in square feet.
    #[serde(default)]
    pub build_up_area: f64,
    /// Monthly rent in rupees.
    #[serde(default)]
    pub rent: f64,
    #[serde(default)]
    pub warehouse_type: String,
    /// The API sends either one URL or a list of URLs.
    #[serde(default, deserialize_with = "one_or_many")]
    pub images: Vec<String>,
}

impl Warehouse {
    pub fn cover_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    pub fn location(&self) -> String {
        match (self.city.is_empty(), self.state.is_empty()) {
            (false, false) => format!("{}, {}", self.city, self.state),
            (false, true) => self.city.clone(),
            (true, false) => self.state.clone(),
            (true, true) => String::new(),
        }
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Images {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<Images>::deserialize(deserializer)? {
        Some(Images::One(url)) if !url.is_empty() => vec![url],
        Some(Images::Many(urls)) => urls.into_iter().filter(|u| !u.is_empty()).collect(),
        _ => Vec::new(),
    })
}
