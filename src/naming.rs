use std::{fmt, str::FromStr};

use crate::error::Error;
use crate::model::Photo;

pub const EXTENSION: &str = "jpg";

/// Strategy used to derive a local filename from photo metadata.
///
/// Every mode includes the photo id, so distinct photos never share a name
/// even when their titles are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamingMode {
    /// `{title}-{id}.jpg`
    #[default]
    TitleAndId,
    /// `{unix timestamp}-{title}-{id}.jpg`
    TimestampAndTitleAndId,
    /// `{id}.jpg`
    Id,
}

impl NamingMode {
    pub const ALL: [NamingMode; 3] = [
        NamingMode::TitleAndId,
        NamingMode::TimestampAndTitleAndId,
        NamingMode::Id,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NamingMode::TitleAndId => "title_and_id",
            NamingMode::TimestampAndTitleAndId => "timestamp_and_title_and_id",
            NamingMode::Id => "id",
        }
    }

    pub fn uses_capture_time(self) -> bool {
        matches!(self, NamingMode::TimestampAndTitleAndId)
    }

    /// `taken` is the capture time as unix seconds, ignored unless
    /// [`NamingMode::uses_capture_time`].
    pub fn filename(self, photo: &Photo, taken: i64, suffix: &str) -> String {
        let stem = match self {
            NamingMode::TitleAndId => format!("{}-{}", photo.title, photo.id),
            NamingMode::TimestampAndTitleAndId => {
                format!("{taken}-{}-{}", photo.title, photo.id)
            }
            NamingMode::Id => photo.id.clone(),
        };

        sanitize(&format!("{stem}{suffix}.{EXTENSION}"))
    }
}

impl FromStr for NamingMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NamingMode::ALL
            .into_iter()
            .find(|mode| mode.name() == s)
            .ok_or_else(|| Error::UnknownNamingMode {
                name: s.to_string(),
                valid: NamingMode::ALL.map(NamingMode::name).join(", "),
            })
    }
}

impl fmt::Display for NamingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ending shared by every file named after this photo in the title based
/// modes, whatever the prefix.
pub fn id_suffix(photo: &Photo) -> String {
    sanitize(&format!("-{}.{EXTENSION}", photo.id))
}

fn sanitize(name: &str) -> String {
    name.replace('/', "-")
}
