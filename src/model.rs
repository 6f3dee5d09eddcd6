use serde::{Deserialize, Deserializer, Serialize};

/// Envelope fields present on every REST response.
#[derive(Deserialize, Debug)]
pub struct Status {
    pub stat: String,
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub message: String,
}

impl Status {
    pub fn is_ok(&self) -> bool {
        self.stat == "ok"
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Content {
    #[serde(rename = "_content")]
    pub content: String,
}

#[derive(Deserialize, Debug)]
pub struct PeoplePhotos {
    pub photos: PhotoPage,
}

#[derive(Deserialize, Debug)]
pub struct SetPhotos {
    pub photoset: PhotoPage,
}

/// One page of a photo listing. Counters arrive either as numbers or as
/// strings depending on the method.
#[derive(Deserialize, Debug, Default)]
pub struct PhotoPage {
    #[serde(default, deserialize_with = "flexible_u32")]
    pub page: u32,
    #[serde(default, deserialize_with = "flexible_u32")]
    pub pages: u32,
    #[serde(default, deserialize_with = "flexible_u32")]
    pub total: u32,
    #[serde(default)]
    pub photo: Vec<Photo>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Photo {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "datetaken", default)]
    pub date_taken: Option<String>,
    #[serde(default)]
    pub url_o: Option<String>,
}

#[cfg(test)]
impl Photo {
    pub fn new(id: &str, title: &str) -> Photo {
        Photo {
            id: id.to_string(),
            title: title.to_string(),
            date_taken: None,
            url_o: None,
        }
    }

    pub fn with_date_taken(mut self, date_taken: &str) -> Photo {
        self.date_taken = Some(date_taken.to_string());
        self
    }
}

#[derive(Deserialize, Debug)]
pub struct LoginResponse {
    pub user: LoginUser,
}

#[derive(Deserialize, Debug)]
pub struct LoginUser {
    pub id: String,
    pub username: Content,
}

#[derive(Deserialize, Debug)]
pub struct PhotoInfoResponse {
    pub photo: PhotoInfo,
}

#[derive(Deserialize, Debug)]
pub struct PhotoInfo {
    pub dates: Dates,
}

#[derive(Deserialize, Debug)]
pub struct Dates {
    pub taken: String,
}

#[derive(Deserialize, Debug)]
pub struct SizesResponse {
    pub sizes: Sizes,
}

#[derive(Deserialize, Debug)]
pub struct Sizes {
    #[serde(default)]
    pub size: Vec<Size>,
}

#[derive(Deserialize, Debug)]
pub struct Size {
    pub label: String,
    pub source: String,
}

impl Sizes {
    /// Flickr lists sizes from smallest to largest.
    pub fn largest(&self) -> Option<&Size> {
        self.size
            .iter()
            .find(|s| s.label == "Original")
            .or_else(|| self.size.last())
    }
}

#[derive(Deserialize, Debug)]
pub struct PhotosetListResponse {
    pub photosets: PhotosetList,
}

#[derive(Deserialize, Debug)]
pub struct PhotosetList {
    #[serde(default, deserialize_with = "flexible_u32")]
    pub pages: u32,
    #[serde(default)]
    pub photoset: Vec<Photoset>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Photoset {
    pub id: String,
    pub title: Content,
    #[serde(default, deserialize_with = "flexible_u32")]
    pub photos: u32,
}

fn flexible_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u32),
        String(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => s.parse().map_err(serde::de::Error::custom),
    }
}
