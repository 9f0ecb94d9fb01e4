use serde::{Deserialize, Serialize};

/// Marketplace country code with the static endpoint and
/// fulfillment-center lookups MWS scopes its regions by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    Us,
    Ca,
    De,
    Es,
    Fr,
    It,
    Gb,
    Jp,
    Cn,
    In,
}

impl Region {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Us => "US",
            Self::Ca => "CA",
            Self::De => "DE",
            Self::Es => "ES",
            Self::Fr => "FR",
            Self::It => "IT",
            Self::Gb => "GB",
            Self::Jp => "JP",
            Self::Cn => "CN",
            Self::In => "IN",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "US" => Some(Self::Us),
            "CA" => Some(Self::Ca),
            "DE" => Some(Self::De),
            "ES" => Some(Self::Es),
            "FR" => Some(Self::Fr),
            "IT" => Some(Self::It),
            "GB" => Some(Self::Gb),
            "JP" => Some(Self::Jp),
            "CN" => Some(Self::Cn),
            "IN" => Some(Self::In),
            _ => None,
        }
    }

    /// API endpoint host serving this marketplace region
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::Us => "mws.amazonservices.com",
            Self::Ca => "mws.amazonservices.ca",
            Self::De | Self::Es | Self::Fr | Self::It | Self::Gb => "mws-eu.amazonservices.com",
            Self::Jp => "mws.amazonservices.jp",
            Self::Cn => "mws.amazonservices.com.cn",
            Self::In => "mws.amazonservices.in",
        }
    }

    /// Fulfillment-network tag used when switching a product to
    /// Amazon-fulfilled in a given region
    pub fn fulfillment_center(&self) -> &'static str {
        match self {
            Self::Us | Self::Ca => "AMAZON_NA",
            Self::De | Self::Es | Self::Fr | Self::It | Self::Gb => "AMAZON_EU",
            Self::Jp => "AMAZON_JP",
            Self::Cn => "AMAZON_CN",
            Self::In => "AMAZON_IN",
        }
    }
}

impl Default for Region {
    fn default() -> Self {
        Self::Us
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fulfillment_center_lookup() {
        assert_eq!(Region::Us.fulfillment_center(), "AMAZON_NA");
        assert_eq!(Region::Ca.fulfillment_center(), "AMAZON_NA");
        assert_eq!(Region::Gb.fulfillment_center(), "AMAZON_EU");
        assert_eq!(Region::Jp.fulfillment_center(), "AMAZON_JP");
        assert_eq!(Region::In.fulfillment_center(), "AMAZON_IN");
    }

    #[test]
    fn eu_marketplaces_share_one_endpoint() {
        for r in [Region::De, Region::Es, Region::Fr, Region::It, Region::Gb] {
            assert_eq!(r.endpoint(), "mws-eu.amazonservices.com");
        }
    }
}
