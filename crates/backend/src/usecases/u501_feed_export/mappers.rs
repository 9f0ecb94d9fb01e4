use contracts::domain::a003_amazon_profile::aggregate::AmazonProfile;
use contracts::domain::a006_catalog_product::aggregate::CatalogProduct;

use crate::shared::mws::{FieldMap, FieldValue};

/// Attributes emitted directly under the Product element, in schema
/// order
pub const BASE_ATTRIBUTES: &[&str] = &[
    "SKU",
    "StandardProductID",
    "ProductTaxCode",
    "LaunchDate",
    "DiscontinueDate",
    "ReleaseDate",
    "ExternalProductUrl",
    "OffAmazonChannel",
    "OnAmazonChannel",
    "Condition",
    "Rebate",
    "ItemPackageQuantity",
    "NumberOfItems",
];

/// Attributes nested under DescriptionData, in schema order
pub const DESCRIPTION_DATA_ATTRIBUTES: &[&str] = &[
    "Title",
    "Brand",
    "Designer",
    "Description",
    "BulletPoint",
    "ItemDimensions",
    "PackageDimensions",
    "PackageWeight",
    "ShippingWeight",
    "MerchantCatalogNumber",
    "MSRP",
    "MaxOrderQuantity",
    "SerialNumberRequired",
    "Prop65",
    "LegalDisclaimer",
    "Manufacturer",
    "MfrPartNumber",
    "SearchTerms",
    "PlatinumKeywords",
    "RecommendedBrowseNode",
    "Memorabilia",
    "Autographed",
    "UsedFor",
    "ItemType",
    "OtherItemAttributes",
    "TargetAudience",
    "SubjectContent",
    "IsGiftWrapAvailable",
    "IsGiftMessageAvailable",
    "IsDiscontinuedByManufacturer",
    "MaxAggregateShipQuantity",
];

/// Standard product IDs accept at most 16 characters
const STANDARD_PRODUCT_ID_MAX: usize = 16;

/// Everything a resolver may draw on when producing one attribute
pub struct MappingContext<'a> {
    pub product: &'a CatalogProduct,
    pub profile: &'a AmazonProfile,
}

/// Strategy producing the value of one named attribute. Registered
/// resolvers take precedence over the built-in profile and product
/// lookups.
pub trait AttributeResolver: Send + Sync {
    fn attribute(&self) -> &str;
    fn resolve(&self, ctx: &MappingContext<'_>) -> Option<FieldValue>;
}

struct StandardProductIdResolver;

impl AttributeResolver for StandardProductIdResolver {
    fn attribute(&self) -> &str {
        "StandardProductID"
    }

    fn resolve(&self, ctx: &MappingContext<'_>) -> Option<FieldValue> {
        let upc = ctx.product.upc.as_deref()?;
        if upc.is_empty() {
            return None;
        }
        let value: String = upc.chars().take(STANDARD_PRODUCT_ID_MAX).collect();
        Some(FieldValue::Map(vec![
            ("Type".into(), FieldValue::text("UPC")),
            ("Value".into(), FieldValue::Text(value)),
        ]))
    }
}

/// Maps a catalog product and its profile onto the attribute sets the
/// product feed carries. Values resolve in three tiers: a registered
/// resolver, then the profile, then the product itself; falsy values
/// are dropped.
pub struct ProductMapper {
    resolvers: Vec<Box<dyn AttributeResolver>>,
}

impl ProductMapper {
    pub fn new() -> Self {
        Self {
            resolvers: vec![Box::new(StandardProductIdResolver)],
        }
    }

    pub fn with_resolver(mut self, resolver: Box<dyn AttributeResolver>) -> Self {
        self.resolvers.push(resolver);
        self
    }

    fn resolve(&self, attribute: &str, ctx: &MappingContext<'_>) -> Option<FieldValue> {
        if let Some(resolver) = self.resolvers.iter().find(|r| r.attribute() == attribute) {
            if let Some(value) = resolver.resolve(ctx) {
                return Some(value);
            }
        }
        profile_value(attribute, ctx).or_else(|| product_value(attribute, ctx))
    }

    /// Product-level attributes, in schema order, falsy values omitted
    pub fn base_fields(&self, ctx: &MappingContext<'_>) -> FieldMap {
        self.collect(BASE_ATTRIBUTES, ctx)
    }

    /// DescriptionData attributes, in schema order, falsy values
    /// omitted
    pub fn description_fields(&self, ctx: &MappingContext<'_>) -> FieldMap {
        self.collect(DESCRIPTION_DATA_ATTRIBUTES, ctx)
    }

    fn collect(&self, attributes: &[&str], ctx: &MappingContext<'_>) -> FieldMap {
        let mut fields = FieldMap::new();
        for attribute in attributes {
            if let Some(value) = self.resolve(attribute, ctx) {
                fields.insert_truthy(*attribute, value);
            }
        }
        fields
    }
}

impl Default for ProductMapper {
    fn default() -> Self {
        Self::new()
    }
}

fn profile_value(attribute: &str, ctx: &MappingContext<'_>) -> Option<FieldValue> {
    let profile = ctx.profile;
    match attribute {
        "SKU" => Some(FieldValue::text(profile.sku.clone())),
        "ProductTaxCode" => profile.product_tax_code.clone().map(FieldValue::Text),
        "LaunchDate" => profile.launch_date.map(|d| FieldValue::Text(d.to_rfc3339())),
        "ReleaseDate" => profile
            .release_date
            .map(|d| FieldValue::Text(d.to_rfc3339())),
        "ItemPackageQuantity" => profile
            .item_package_quantity
            .map(|n| FieldValue::Int(n as i64)),
        "NumberOfItems" => profile.number_of_items.map(|n| FieldValue::Int(n as i64)),
        _ => None,
    }
}

fn product_value(attribute: &str, ctx: &MappingContext<'_>) -> Option<FieldValue> {
    let product = ctx.product;
    match attribute {
        "Title" => Some(FieldValue::text(product.title().to_string())),
        "Brand" => product.brand.clone().map(FieldValue::Text),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(upc: Option<&str>) -> (CatalogProduct, AmazonProfile) {
        let mut product =
            CatalogProduct::new_for_insert("Leather wallet".into(), upc.map(String::from));
        product.brand = Some("Acme".into());
        let profile = AmazonProfile::new_for_insert(product.base.id, "WALLET-1".into());
        (product, profile)
    }

    #[test]
    fn standard_product_id_is_truncated_upc() {
        let (product, profile) = fixture(Some("012345678901234567890"));
        let mapper = ProductMapper::new();
        let ctx = MappingContext {
            product: &product,
            profile: &profile,
        };
        let fields = mapper.base_fields(&ctx);
        match fields.get("StandardProductID") {
            Some(FieldValue::Map(entries)) => {
                assert_eq!(entries[0], ("Type".into(), FieldValue::text("UPC")));
                assert_eq!(
                    entries[1],
                    ("Value".into(), FieldValue::text("0123456789012345"))
                );
            }
            other => panic!("unexpected value: {:?}", other),
        }
    }

    #[test]
    fn absent_and_falsy_values_are_omitted() {
        let (mut product, mut profile) = fixture(None);
        product.brand = Some(String::new());
        profile.item_package_quantity = Some(0);
        let mapper = ProductMapper::new();
        let ctx = MappingContext {
            product: &product,
            profile: &profile,
        };
        let base = mapper.base_fields(&ctx);
        let description = mapper.description_fields(&ctx);
        assert!(base.contains_key("SKU"));
        assert!(!base.contains_key("StandardProductID"));
        assert!(!base.contains_key("ItemPackageQuantity"));
        assert!(description.contains_key("Title"));
        assert!(!description.contains_key("Brand"));
    }

    #[test]
    fn registered_resolvers_take_precedence() {
        struct FixedTitle;
        impl AttributeResolver for FixedTitle {
            fn attribute(&self) -> &str {
                "Title"
            }
            fn resolve(&self, _ctx: &MappingContext<'_>) -> Option<FieldValue> {
                Some(FieldValue::text("Override"))
            }
        }
        let (product, profile) = fixture(None);
        let mapper = ProductMapper::new().with_resolver(Box::new(FixedTitle));
        let ctx = MappingContext {
            product: &product,
            profile: &profile,
        };
        let description = mapper.description_fields(&ctx);
        assert_eq!(
            description.get("Title"),
            Some(&FieldValue::text("Override"))
        );
    }
}
