pub mod u501_feed_export;
pub mod u502_fulfillment_sync;
pub mod u503_inventory_sync;
pub mod u504_marketplace_sync;
