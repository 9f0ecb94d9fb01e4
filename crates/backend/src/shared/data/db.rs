use once_cell::sync::OnceCell;
use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, Statement};

static DB_CONN: OnceCell<DatabaseConnection> = OnceCell::new();

const TABLES: &[(&str, &str)] = &[
    (
        "a001_merchant_account",
        r#"
        CREATE TABLE a001_merchant_account (
            id TEXT PRIMARY KEY NOT NULL,
            code TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL,
            comment TEXT,
            seller_id TEXT NOT NULL UNIQUE,
            aws_api_key TEXT NOT NULL,
            aws_api_secret TEXT NOT NULL,
            region TEXT NOT NULL DEFAULT 'US',
            is_deleted INTEGER NOT NULL DEFAULT 0,
            created_at TEXT,
            updated_at TEXT,
            version INTEGER NOT NULL DEFAULT 0
        );
        "#,
    ),
    (
        "a002_amazon_marketplace",
        r#"
        CREATE TABLE a002_amazon_marketplace (
            id TEXT PRIMARY KEY NOT NULL,
            code TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL,
            comment TEXT,
            marketplace_id TEXT NOT NULL,
            merchant TEXT NOT NULL,
            region TEXT NOT NULL DEFAULT 'US',
            domain_name TEXT NOT NULL DEFAULT '',
            currency_code TEXT NOT NULL DEFAULT '',
            is_deleted INTEGER NOT NULL DEFAULT 0,
            created_at TEXT,
            updated_at TEXT,
            version INTEGER NOT NULL DEFAULT 0
        );
        "#,
    ),
    (
        "a003_amazon_profile",
        r#"
        CREATE TABLE a003_amazon_profile (
            id TEXT PRIMARY KEY NOT NULL,
            code TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL,
            comment TEXT,
            product TEXT NOT NULL UNIQUE,
            sku TEXT NOT NULL,
            asin TEXT,
            product_tax_code TEXT,
            launch_date TEXT,
            release_date TEXT,
            item_package_quantity INTEGER,
            number_of_items INTEGER,
            fulfillment_by TEXT NOT NULL DEFAULT 'MFN',
            is_deleted INTEGER NOT NULL DEFAULT 0,
            created_at TEXT,
            updated_at TEXT,
            version INTEGER NOT NULL DEFAULT 0
        );
        "#,
    ),
    (
        "a003_amazon_profile_marketplace",
        r#"
        CREATE TABLE a003_amazon_profile_marketplace (
            id TEXT PRIMARY KEY NOT NULL,
            profile TEXT NOT NULL,
            marketplace TEXT NOT NULL
        );
        "#,
    ),
    (
        "a004_feed_submission",
        r#"
        CREATE TABLE a004_feed_submission (
            id TEXT PRIMARY KEY NOT NULL,
            code TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL,
            comment TEXT,
            submission_id TEXT NOT NULL,
            feed_type TEXT NOT NULL,
            date_submitted TEXT NOT NULL,
            processing_status TEXT NOT NULL,
            merchant TEXT NOT NULL,
            feed_xml TEXT,
            is_deleted INTEGER NOT NULL DEFAULT 0,
            created_at TEXT,
            updated_at TEXT,
            version INTEGER NOT NULL DEFAULT 0
        );
        "#,
    ),
    (
        "a004_feed_submission_message",
        r#"
        CREATE TABLE a004_feed_submission_message (
            id TEXT PRIMARY KEY NOT NULL,
            submission TEXT NOT NULL,
            product TEXT NOT NULL,
            message_id INTEGER NOT NULL
        );
        "#,
    ),
    (
        "a004_feed_report",
        r#"
        CREATE TABLE a004_feed_report (
            id TEXT PRIMARY KEY NOT NULL,
            submission TEXT NOT NULL UNIQUE,
            status_code TEXT NOT NULL,
            processed INTEGER NOT NULL DEFAULT 0,
            successful INTEGER NOT NULL DEFAULT 0,
            errors INTEGER NOT NULL DEFAULT 0,
            warnings INTEGER NOT NULL DEFAULT 0
        );
        "#,
    ),
    (
        "a004_feed_result",
        r#"
        CREATE TABLE a004_feed_result (
            id TEXT PRIMARY KEY NOT NULL,
            report TEXT NOT NULL,
            message_code TEXT NOT NULL,
            result_type TEXT NOT NULL,
            description TEXT NOT NULL,
            product TEXT
        );
        "#,
    ),
    (
        "a005_fulfillment_order",
        r#"
        CREATE TABLE a005_fulfillment_order (
            id TEXT PRIMARY KEY NOT NULL,
            code TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL,
            comment TEXT,
            fulfillment_id TEXT NOT NULL,
            order_ref TEXT NOT NULL,
            merchant TEXT NOT NULL,
            shipping_address TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'UNSUBMITTED',
            shipping_speed TEXT NOT NULL DEFAULT 'Standard',
            date_updated TEXT NOT NULL,
            is_deleted INTEGER NOT NULL DEFAULT 0,
            created_at TEXT,
            updated_at TEXT,
            version INTEGER NOT NULL DEFAULT 0
        );
        "#,
    ),
    (
        "a005_fulfillment_order_line",
        r#"
        CREATE TABLE a005_fulfillment_order_line (
            id TEXT PRIMARY KEY NOT NULL,
            fulfillment_order TEXT NOT NULL,
            order_line TEXT NOT NULL,
            order_item_id TEXT NOT NULL,
            quantity INTEGER NOT NULL DEFAULT 0,
            comment TEXT,
            price_incl_tax TEXT,
            price_currency TEXT,
            shipment TEXT,
            package TEXT
        );
        "#,
    ),
    (
        "a005_fulfillment_shipment",
        r#"
        CREATE TABLE a005_fulfillment_shipment (
            id TEXT PRIMARY KEY NOT NULL,
            shipment_id TEXT NOT NULL UNIQUE,
            order_ref TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT '',
            fulfillment_center_id TEXT NOT NULL DEFAULT '',
            date_estimated_arrival TEXT,
            date_shipped TEXT
        );
        "#,
    ),
    (
        "a005_shipment_package",
        r#"
        CREATE TABLE a005_shipment_package (
            id TEXT PRIMARY KEY NOT NULL,
            shipment TEXT NOT NULL,
            package_number INTEGER NOT NULL,
            tracking_number TEXT NOT NULL DEFAULT '',
            carrier_code TEXT NOT NULL DEFAULT ''
        );
        "#,
    ),
    (
        "a006_catalog_product",
        r#"
        CREATE TABLE a006_catalog_product (
            id TEXT PRIMARY KEY NOT NULL,
            code TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL,
            comment TEXT,
            upc TEXT,
            brand TEXT,
            is_deleted INTEGER NOT NULL DEFAULT 0,
            created_at TEXT,
            updated_at TEXT,
            version INTEGER NOT NULL DEFAULT 0
        );
        "#,
    ),
    (
        "a006_stock_record",
        r#"
        CREATE TABLE a006_stock_record (
            id TEXT PRIMARY KEY NOT NULL,
            product TEXT NOT NULL,
            merchant TEXT,
            partner_sku TEXT NOT NULL,
            num_in_stock INTEGER NOT NULL DEFAULT 0,
            num_allocated INTEGER NOT NULL DEFAULT 0
        );
        "#,
    ),
    (
        "a007_store_order",
        r#"
        CREATE TABLE a007_store_order (
            id TEXT PRIMARY KEY NOT NULL,
            code TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL,
            comment TEXT,
            order_number TEXT NOT NULL UNIQUE,
            email TEXT,
            date_placed TEXT NOT NULL,
            shipping_address TEXT,
            is_deleted INTEGER NOT NULL DEFAULT 0,
            created_at TEXT,
            updated_at TEXT,
            version INTEGER NOT NULL DEFAULT 0
        );
        "#,
    ),
    (
        "a007_order_line",
        r#"
        CREATE TABLE a007_order_line (
            id TEXT PRIMARY KEY NOT NULL,
            order_ref TEXT NOT NULL,
            product TEXT NOT NULL,
            partner_sku TEXT NOT NULL,
            partner_line_reference TEXT,
            quantity INTEGER NOT NULL DEFAULT 0,
            unit_price_incl_tax TEXT,
            line_price_incl_tax TEXT,
            shipping_address TEXT
        );
        "#,
    ),
    (
        "a007_shipping_address",
        r#"
        CREATE TABLE a007_shipping_address (
            id TEXT PRIMARY KEY NOT NULL,
            name TEXT NOT NULL DEFAULT '',
            line1 TEXT NOT NULL DEFAULT '',
            line2 TEXT,
            line3 TEXT,
            city TEXT NOT NULL DEFAULT '',
            state TEXT,
            postcode TEXT NOT NULL DEFAULT '',
            country_code TEXT NOT NULL DEFAULT ''
        );
        "#,
    ),
    (
        "a008_shipping_event",
        r#"
        CREATE TABLE a008_shipping_event (
            id TEXT PRIMARY KEY NOT NULL,
            order_ref TEXT NOT NULL,
            event_type TEXT NOT NULL,
            notes TEXT,
            date_created TEXT NOT NULL
        );
        "#,
    ),
    (
        "a008_shipping_event_quantity",
        r#"
        CREATE TABLE a008_shipping_event_quantity (
            id TEXT PRIMARY KEY NOT NULL,
            event TEXT NOT NULL,
            order_line TEXT NOT NULL,
            quantity INTEGER NOT NULL DEFAULT 0
        );
        "#,
    ),
];

async fn ensure_table(
    conn: &DatabaseConnection,
    name: &str,
    create_sql: &str,
) -> anyhow::Result<()> {
    let check = format!(
        "SELECT name FROM sqlite_master WHERE type='table' AND name='{}';",
        name
    );
    let existing = conn
        .query_all(Statement::from_string(DatabaseBackend::Sqlite, check))
        .await?;
    if existing.is_empty() {
        tracing::info!("Creating {} table", name);
        conn.execute(Statement::from_string(
            DatabaseBackend::Sqlite,
            create_sql.to_string(),
        ))
        .await?;
    }
    Ok(())
}

pub async fn initialize_database(db_path: Option<&str>) -> anyhow::Result<()> {
    let db_file = db_path.unwrap_or("target/db/app.db");
    if let Some(parent) = std::path::Path::new(db_file).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let absolute_path = if std::path::Path::new(db_file).is_absolute() {
        std::path::PathBuf::from(db_file)
    } else {
        std::env::current_dir()?.join(db_file)
    };
    // Normalize path separators and ensure proper URL form on Windows
    let normalized = absolute_path.to_string_lossy().replace('\\', "/");
    let needs_leading_slash = !normalized.starts_with('/') && normalized.contains(':');
    let prefix = if needs_leading_slash { "/" } else { "" };
    let db_url = format!("sqlite://{}{}?mode=rwc", prefix, normalized);
    let conn = Database::connect(&db_url).await?;

    // Minimal schema bootstrap
    for (name, create_sql) in TABLES {
        ensure_table(&conn, name, create_sql).await?;
    }

    DB_CONN
        .set(conn)
        .map_err(|_| anyhow::anyhow!("Failed to set DB_CONN"))?;
    Ok(())
}

pub fn get_connection() -> &'static DatabaseConnection {
    DB_CONN
        .get()
        .expect("Database connection has not been initialized")
}

/// Whether the global connection was already initialized. Used by test
/// setup to make repeated initialization a no-op.
pub fn is_initialized() -> bool {
    DB_CONN.get().is_some()
}
