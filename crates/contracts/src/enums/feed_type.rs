use serde::{Deserialize, Serialize};

/// Feed type tag submitted alongside a feed document.
///
/// MWS knows dozens of feed types; only the two this system actually
/// builds get named variants, everything else travels as the raw tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedType {
    PostProductData,
    PostInventoryAvailabilityData,
    Other(String),
}

impl FeedType {
    pub fn as_tag(&self) -> &str {
        match self {
            Self::PostProductData => "_POST_PRODUCT_DATA_",
            Self::PostInventoryAvailabilityData => "_POST_INVENTORY_AVAILABILITY_DATA_",
            Self::Other(tag) => tag,
        }
    }

    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "_POST_PRODUCT_DATA_" => Self::PostProductData,
            "_POST_INVENTORY_AVAILABILITY_DATA_" => Self::PostInventoryAvailabilityData,
            other => Self::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for FeedType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tags_pass_through_unchanged() {
        let ft = FeedType::from_tag("_POST_FLAT_FILE_LISTINGS_DATA_");
        assert_eq!(ft, FeedType::Other("_POST_FLAT_FILE_LISTINGS_DATA_".into()));
        assert_eq!(ft.as_tag(), "_POST_FLAT_FILE_LISTINGS_DATA_");
    }
}
