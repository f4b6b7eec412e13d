//! Database schema definitions using sea-query.
//!
//! These define the table and column identifiers for type-safe query building.

use sea_query::Iden;

/// Profiles table schema.
#[derive(Iden)]
pub enum Profiles {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "full_name"]
    FullName,
    #[iden = "phone"]
    Phone,
    #[iden = "role"]
    Role,
    #[iden = "created_at"]
    CreatedAt,
}

/// Camps table schema.
#[derive(Iden)]
pub enum Camps {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "admin_id"]
    AdminId,
    #[iden = "name"]
    Name,
    #[iden = "location"]
    Location,
    #[iden = "latitude"]
    Latitude,
    #[iden = "longitude"]
    Longitude,
    #[iden = "total_capacity"]
    TotalCapacity,
    #[iden = "occupied_seats"]
    OccupiedSeats,
    #[iden = "contact_phone"]
    ContactPhone,
    #[iden = "contact_email"]
    ContactEmail,
    #[iden = "status"]
    Status,
    #[iden = "created_at"]
    CreatedAt,
    #[iden = "updated_at"]
    UpdatedAt,
}

/// Needs table schema.
#[derive(Iden)]
pub enum Needs {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "camp_id"]
    CampId,
    #[iden = "item_name"]
    ItemName,
    #[iden = "quantity_needed"]
    QuantityNeeded,
    #[iden = "quantity_fulfilled"]
    QuantityFulfilled,
    #[iden = "urgency"]
    Urgency,
    #[iden = "status"]
    Status,
    #[iden = "created_at"]
    CreatedAt,
    #[iden = "updated_at"]
    UpdatedAt,
}

/// Assistance ledger table schema.
#[derive(Iden)]
pub enum AssistanceEntries {
    #[iden = "assistance"]
    Table,
    #[iden = "id"]
    Id,
    #[iden = "ngo_id"]
    NgoId,
    #[iden = "camp_id"]
    CampId,
    #[iden = "need_id"]
    NeedId,
    #[iden = "items_provided"]
    ItemsProvided,
    #[iden = "quantity"]
    Quantity,
    #[iden = "delivery_status"]
    DeliveryStatus,
    #[iden = "notes"]
    Notes,
    #[iden = "created_at"]
    CreatedAt,
}

/// Volunteer registrations table schema.
#[derive(Iden)]
pub enum Volunteers {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "user_id"]
    UserId,
    #[iden = "camp_id"]
    CampId,
    #[iden = "volunteer_type"]
    VolunteerType,
    #[iden = "created_at"]
    CreatedAt,
}

/// SQL for creating the profiles table.
pub const CREATE_PROFILES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS profiles (
    id TEXT PRIMARY KEY,
    full_name TEXT NOT NULL,
    phone TEXT,
    role TEXT NOT NULL CHECK (role IN ('user', 'camp', 'ngo')),
    created_at TEXT NOT NULL
)
"#;

/// SQL for creating the camps table.
pub const CREATE_CAMPS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS camps (
    id TEXT PRIMARY KEY,
    admin_id TEXT NOT NULL,
    name TEXT NOT NULL,
    location TEXT NOT NULL,
    latitude REAL,
    longitude REAL,
    total_capacity INTEGER NOT NULL CHECK (total_capacity >= 0),
    occupied_seats INTEGER NOT NULL DEFAULT 0
        CHECK (occupied_seats >= 0 AND occupied_seats <= total_capacity),
    contact_phone TEXT,
    contact_email TEXT,
    status TEXT NOT NULL CHECK (status IN ('active', 'inactive', 'full')),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
"#;

/// SQL for creating the needs table.
pub const CREATE_NEEDS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS needs (
    id TEXT PRIMARY KEY,
    camp_id TEXT NOT NULL REFERENCES camps(id) ON DELETE CASCADE,
    item_name TEXT NOT NULL,
    quantity_needed INTEGER NOT NULL CHECK (quantity_needed > 0),
    quantity_fulfilled INTEGER NOT NULL DEFAULT 0
        CHECK (quantity_fulfilled >= 0 AND quantity_fulfilled <= quantity_needed),
    urgency TEXT NOT NULL CHECK (urgency IN ('low', 'medium', 'high', 'critical')),
    status TEXT NOT NULL CHECK (status IN ('pending', 'partial', 'fulfilled')),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
"#;

/// SQL for creating the assistance ledger table.
///
/// `camp_id` carries no foreign key: ledger entries outlive their camp.
pub const CREATE_ASSISTANCE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS assistance (
    id TEXT PRIMARY KEY,
    ngo_id TEXT NOT NULL,
    camp_id TEXT NOT NULL,
    need_id TEXT REFERENCES needs(id) ON DELETE SET NULL,
    items_provided TEXT NOT NULL,
    quantity INTEGER NOT NULL CHECK (quantity > 0),
    delivery_status TEXT NOT NULL
        CHECK (delivery_status IN ('pledged', 'in_transit', 'delivered')),
    notes TEXT,
    created_at TEXT NOT NULL
)
"#;

/// SQL for creating the volunteer registrations table.
pub const CREATE_VOLUNTEERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS volunteers (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    camp_id TEXT NOT NULL REFERENCES camps(id) ON DELETE CASCADE,
    volunteer_type TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE (user_id, camp_id, volunteer_type)
)
"#;

/// Index statements, run after the tables exist.
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_camps_admin ON camps(admin_id)",
    "CREATE INDEX IF NOT EXISTS idx_needs_camp ON needs(camp_id)",
    "CREATE INDEX IF NOT EXISTS idx_assistance_need ON assistance(need_id)",
    "CREATE INDEX IF NOT EXISTS idx_assistance_ngo ON assistance(ngo_id)",
    "CREATE INDEX IF NOT EXISTS idx_assistance_camp ON assistance(camp_id)",
    "CREATE INDEX IF NOT EXISTS idx_volunteers_camp ON volunteers(camp_id)",
    "CREATE INDEX IF NOT EXISTS idx_volunteers_user ON volunteers(user_id)",
];

/// Table statements in dependency order.
pub const CREATE_TABLES: &[&str] = &[
    CREATE_PROFILES_TABLE,
    CREATE_CAMPS_TABLE,
    CREATE_NEEDS_TABLE,
    CREATE_ASSISTANCE_TABLE,
    CREATE_VOLUNTEERS_TABLE,
];
