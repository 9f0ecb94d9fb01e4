pub mod a001_merchant_account;
pub mod a002_amazon_marketplace;
pub mod a003_amazon_profile;
pub mod a004_feed_submission;
pub mod a005_fulfillment_order;
pub mod a006_catalog_product;
pub mod a007_store_order;
pub mod a008_shipping_event;
