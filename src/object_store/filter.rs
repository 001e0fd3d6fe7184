use std::str::FromStr;

/// Extensions the image-only listing recognises.
pub const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "webp", "gif"];

/// Which listed keys count as results. One predicate shared by every listing path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeyFilter {
    /// Everything except directory markers.
    Folders,
    /// Directory markers excluded, and the key must end in a known image
    /// extension or have no extension at all.
    #[default]
    Images,
}

impl KeyFilter {
    pub fn accepts(&self, key: &str) -> bool {
        if key.is_empty() || key.ends_with('/') {
            return false;
        }
        match self {
            KeyFilter::Folders => true,
            KeyFilter::Images => {
                let name = key.rsplit('/').next().unwrap_or(key);
                match name.rsplit_once('.') {
                    Some((_, ext)) => {
                        let ext = ext.to_ascii_lowercase();
                        IMAGE_EXTENSIONS.contains(&ext.as_str())
                    }
                    None => true,
                }
            }
        }
    }
}

impl FromStr for KeyFilter {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "folders" | "all" => Ok(KeyFilter::Folders),
            "images" => Ok(KeyFilter::Images),
            other => Err(format!("unknown listing filter: {other}")),
        }
    }
}
