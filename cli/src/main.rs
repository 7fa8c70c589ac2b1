use std::path::PathBuf;

use anyhow::Context;
use argon2::password_hash::{rand_core::OsRng, PasswordHasher, SaltString};
use argon2::Argon2;
use clap::{Parser, Subcommand};
use diesel::prelude::*;
use diesel::PgConnection;
use rand::{distributions::Alphanumeric, Rng};
use shared::Role;

mod schema {
    diesel::table! {
        users (id) {
            id -> Varchar,
            name -> Varchar,
            email -> Varchar,
            password -> Varchar,
            role -> Varchar,
            skills -> Text,
            capacity -> Int4,
            created_at -> Timestamptz,
            updated_at -> Timestamptz,
        }
    }

    diesel::table! {
        priorities (id) {
            id -> Varchar,
            name -> Varchar,
            level -> Int4,
            color -> Varchar,
        }
    }

    diesel::table! {
        statuses (id) {
            id -> Varchar,
            name -> Varchar,
            #[sql_name = "type"]
            kind -> Varchar,
            sort_order -> Int4,
            color -> Varchar,
        }
    }

    diesel::table! {
        categories (id) {
            id -> Varchar,
            name -> Varchar,
            description -> Nullable<Text>,
            color -> Varchar,
            created_at -> Timestamptz,
        }
    }

    diesel::allow_tables_to_appear_in_same_query!(users, priorities, statuses, categories,);
}

use schema::*;

// ============================================================================
// CLI
// ============================================================================

#[derive(Parser)]
#[command(name = "demandit-cli")]
#[command(about = "Admin CLI for the demandit backend")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed reference data (priorities, statuses, categories) and the admin account
    Seed {
        /// Initial admin password (falls back to ADMIN_PASSWORD, then "admin123")
        #[arg(long)]
        admin_password: Option<String>,
    },
    /// Create a new user
    CreateUser {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        /// ADMIN, MANAGER or TEAM_MEMBER
        #[arg(long, default_value = "TEAM_MEMBER")]
        role: String,
        /// Weekly capacity in hours
        #[arg(long, default_value_t = 40)]
        capacity: i32,
        #[arg(long)]
        password: String,
    },
    /// List all users
    ListUsers,
    /// Import users from a CSV file (Name,Email,Role,Capacity,Skills)
    ImportUsers {
        /// Path to the CSV file
        #[arg(long)]
        file: PathBuf,
        /// Dry run - parse and validate without writing to the database
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
}

// ============================================================================
// Models
// ============================================================================

#[derive(Insertable)]
#[diesel(table_name = users)]
struct NewUser {
    id: String,
    name: String,
    email: String,
    password: String,
    role: String,
    skills: String,
    capacity: i32,
}

#[derive(Queryable)]
#[allow(dead_code)]
struct User {
    id: String,
    name: String,
    email: String,
    password: String,
    role: String,
    skills: String,
    capacity: i32,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = priorities)]
struct NewPriority {
    id: String,
    name: String,
    level: i32,
    color: String,
}

#[derive(Insertable)]
#[diesel(table_name = statuses)]
struct NewStatus {
    id: String,
    name: String,
    kind: String,
    sort_order: i32,
    color: String,
}

#[derive(Insertable)]
#[diesel(table_name = categories)]
struct NewCategory {
    id: String,
    name: String,
    description: Option<String>,
    color: String,
}

// ============================================================================
// CSV row
// ============================================================================

#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Email")]
    email: String,
    #[serde(rename = "Role")]
    role: String,
    #[serde(rename = "Capacity")]
    capacity: String,
    #[serde(rename = "Skills", default)]
    skills: String,
}

// ============================================================================
// Validation helpers
// ============================================================================

/// Normalize a role string to the canonical form stored in the database.
fn normalize_role(s: &str) -> anyhow::Result<Role> {
    match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
        "admin" => Ok(Role::Admin),
        "manager" => Ok(Role::Manager),
        "team_member" | "member" => Ok(Role::TeamMember),
        other => anyhow::bail!("Unknown role: '{}'", other),
    }
}

/// Parse a weekly capacity column. Blank means the default of 40 hours.
fn parse_capacity(s: &str) -> anyhow::Result<i32> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(40);
    }
    let capacity: i32 = s
        .parse()
        .with_context(|| format!("Invalid capacity: '{}'", s))?;
    if capacity < 0 {
        anyhow::bail!("Capacity must be >= 0, got {}", capacity);
    }
    Ok(capacity)
}

/// Minimal email sanity check; the point is catching swapped columns, not
/// validating RFC 5322.
fn looks_like_email(s: &str) -> bool {
    let s = s.trim();
    match s.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.'),
        None => false,
    }
}

/// Skills arrive as a semicolon-separated list and are stored as JSON.
fn parse_skills(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;
    Ok(hash.to_string())
}

fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// ============================================================================
// Seed
// ============================================================================

fn seed(admin_password: Option<String>) -> anyhow::Result<()> {
    let admin_password = admin_password
        .or_else(|| std::env::var("ADMIN_PASSWORD").ok())
        .unwrap_or_else(|| {
            println!("WARNING: using default admin password 'admin123' - change it");
            "admin123".to_string()
        });

    let mut conn = establish_connection();

    // Admin account
    let admin = NewUser {
        id: new_id(),
        name: "Admin User".to_string(),
        email: "admin@demandit.com".to_string(),
        password: hash_password(&admin_password)?,
        role: Role::Admin.as_str().to_string(),
        skills: serde_json::to_string(&[
            "Project Management",
            "System Architecture",
            "DevOps",
        ])?,
        capacity: 40,
    };
    let inserted = diesel::insert_into(users::table)
        .values(&admin)
        .on_conflict(users::email)
        .do_nothing()
        .execute(&mut conn)?;
    if inserted > 0 {
        println!("Created admin user: {}", admin.email);
    } else {
        println!("Admin user already exists, skipping");
    }

    // Priorities
    let priority_rows = [
        ("Critical", 1, "#ef4444"),
        ("High", 2, "#f97316"),
        ("Medium", 3, "#eab308"),
        ("Low", 4, "#64748b"),
    ];
    for (name, level, color) in priority_rows {
        let row = NewPriority {
            id: new_id(),
            name: name.to_string(),
            level,
            color: color.to_string(),
        };
        diesel::insert_into(priorities::table)
            .values(&row)
            .on_conflict(priorities::name)
            .do_nothing()
            .execute(&mut conn)?;
    }
    println!("Seeded {} priorities", priority_rows.len());

    // Demand and project workflow statuses
    let status_rows = [
        ("New", "DEMAND", 1, "#94a3b8"),
        ("Under Review", "DEMAND", 2, "#60a5fa"),
        ("Approved", "DEMAND", 3, "#22c55e"),
        ("Rejected", "DEMAND", 4, "#ef4444"),
        ("Not Started", "PROJECT", 1, "#94a3b8"),
        ("In Progress", "PROJECT", 2, "#3b82f6"),
        ("On Hold", "PROJECT", 3, "#f59e0b"),
        ("Completed", "PROJECT", 4, "#10b981"),
    ];
    for (name, kind, sort_order, color) in status_rows {
        let row = NewStatus {
            id: new_id(),
            name: name.to_string(),
            kind: kind.to_string(),
            sort_order,
            color: color.to_string(),
        };
        diesel::insert_into(statuses::table)
            .values(&row)
            .on_conflict((statuses::name, statuses::kind))
            .do_nothing()
            .execute(&mut conn)?;
    }
    println!("Seeded {} statuses", status_rows.len());

    // Categories
    let category_rows = [
        (
            "Infrastructure",
            "Server, network, and infrastructure related demands",
            "#6366f1",
        ),
        (
            "Application Development",
            "New application development or major enhancements",
            "#ec4899",
        ),
        (
            "Security",
            "Security related improvements and patches",
            "#f43f5e",
        ),
        (
            "Business Process",
            "Improvements to business processes",
            "#14b8a6",
        ),
    ];
    for (name, description, color) in category_rows {
        let row = NewCategory {
            id: new_id(),
            name: name.to_string(),
            description: Some(description.to_string()),
            color: color.to_string(),
        };
        diesel::insert_into(categories::table)
            .values(&row)
            .on_conflict(categories::name)
            .do_nothing()
            .execute(&mut conn)?;
    }
    println!("Seeded {} categories", category_rows.len());

    println!("Database seeded successfully.");
    Ok(())
}

// ============================================================================
// Import logic
// ============================================================================

fn import_users(file: PathBuf, dry_run: bool) -> anyhow::Result<()> {
    let contents = std::fs::read_to_string(&file)
        .with_context(|| format!("Failed to read file: {}", file.display()))?;

    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(contents.as_bytes());

    let mut rows: Vec<CsvRow> = Vec::new();
    for result in rdr.deserialize() {
        let row: CsvRow = result?;
        // Skip blank padding rows
        if row.name.trim().is_empty() && row.email.trim().is_empty() {
            continue;
        }
        rows.push(row);
    }

    if rows.is_empty() {
        println!("No users found in CSV.");
        return Ok(());
    }

    println!("Parsed {} users", rows.len());

    // Validate all rows before writing anything
    let mut errors: Vec<String> = Vec::new();
    let mut seen_emails = std::collections::HashSet::new();

    for (i, row) in rows.iter().enumerate() {
        let line = i + 1;

        if row.name.trim().is_empty() {
            errors.push(format!("Row {}: empty name", line));
        }
        if !looks_like_email(&row.email) {
            errors.push(format!("Row {}: invalid email '{}'", line, row.email));
        }
        if !seen_emails.insert(row.email.trim().to_lowercase()) {
            errors.push(format!("Row {}: duplicate email '{}'", line, row.email));
        }
        if let Err(e) = normalize_role(&row.role) {
            errors.push(format!("Row {}: {}", line, e));
        }
        if let Err(e) = parse_capacity(&row.capacity) {
            errors.push(format!("Row {}: {}", line, e));
        }
    }

    if !errors.is_empty() {
        println!("\nValidation errors:");
        for e in &errors {
            println!("  ERROR: {}", e);
        }
        anyhow::bail!("{} validation error(s) found", errors.len());
    }

    println!("All rows validated successfully.");

    if dry_run {
        println!("\n[DRY RUN] Would import {} users.", rows.len());
        for row in &rows {
            println!(
                "  {} <{}> ({}, {}h/week)",
                row.name.trim(),
                row.email.trim(),
                normalize_role(&row.role)?.as_str(),
                parse_capacity(&row.capacity)?
            );
        }
        return Ok(());
    }

    let mut conn = establish_connection();

    // Check for emails already in the database
    let existing: Vec<String> = users::table.select(users::email).load(&mut conn)?;
    let existing: std::collections::HashSet<String> =
        existing.into_iter().map(|e| e.to_lowercase()).collect();

    conn.transaction::<_, anyhow::Error, _>(|conn| {
        let mut imported = 0;
        let mut skipped = 0;

        for row in &rows {
            let email = row.email.trim().to_string();
            if existing.contains(&email.to_lowercase()) {
                println!("  SKIP {} (already exists)", email);
                skipped += 1;
                continue;
            }

            let password = generate_password();
            let new_user = NewUser {
                id: new_id(),
                name: row.name.trim().to_string(),
                email: email.clone(),
                password: hash_password(&password)?,
                role: normalize_role(&row.role)?.as_str().to_string(),
                skills: serde_json::to_string(&parse_skills(&row.skills))?,
                capacity: parse_capacity(&row.capacity)?,
            };

            diesel::insert_into(users::table)
                .values(&new_user)
                .execute(conn)?;

            // Initial passwords are only shown here, once
            println!("  IMPORTED {} <{}> password: {}", new_user.name, email, password);
            imported += 1;
        }

        println!("\nImport complete: {} imported, {} skipped", imported, skipped);
        Ok(())
    })?;

    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn establish_connection() -> PgConnection {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    PgConnection::establish(&database_url)
        .unwrap_or_else(|_| panic!("Error connecting to {}", database_url))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Seed { admin_password } => {
            seed(admin_password)?;
        }

        Commands::CreateUser {
            email,
            name,
            role,
            capacity,
            password,
        } => {
            if !looks_like_email(&email) {
                anyhow::bail!("Invalid email: '{}'", email);
            }
            if capacity < 0 {
                anyhow::bail!("Capacity must be >= 0");
            }
            let role = normalize_role(&role)?.as_str().to_string();

            let mut conn = establish_connection();

            let new_user = NewUser {
                id: new_id(),
                name: name.clone(),
                email: email.clone(),
                password: hash_password(&password)?,
                role,
                skills: "[]".to_string(),
                capacity,
            };

            diesel::insert_into(users::table)
                .values(&new_user)
                .execute(&mut conn)?;

            println!("Created user: {} <{}>", name, email);
        }

        Commands::ListUsers => {
            let mut conn = establish_connection();

            let results: Vec<User> = users::table.order(users::name.asc()).load(&mut conn)?;

            println!(
                "{:<38} {:<25} {:<30} {:<12} {:<8}",
                "ID", "Name", "Email", "Role", "Capacity"
            );
            println!("{}", "-".repeat(115));
            for user in results {
                println!(
                    "{:<38} {:<25} {:<30} {:<12} {:<8}",
                    user.id, user.name, user.email, user.role, user.capacity
                );
            }
        }

        Commands::ImportUsers { file, dry_run } => {
            import_users(file, dry_run)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_role_spellings() {
        assert_eq!(normalize_role("admin").unwrap(), Role::Admin);
        assert_eq!(normalize_role("Team Member").unwrap(), Role::TeamMember);
        assert_eq!(normalize_role("team-member").unwrap(), Role::TeamMember);
        assert_eq!(normalize_role(" MANAGER ").unwrap(), Role::Manager);
        assert!(normalize_role("superuser").is_err());
    }

    #[test]
    fn capacity_defaults_and_bounds() {
        assert_eq!(parse_capacity("").unwrap(), 40);
        assert_eq!(parse_capacity("32").unwrap(), 32);
        assert!(parse_capacity("-5").is_err());
        assert!(parse_capacity("lots").is_err());
    }

    #[test]
    fn email_sanity_check() {
        assert!(looks_like_email("dev@example.com"));
        assert!(!looks_like_email("ADMIN"));
        assert!(!looks_like_email("@example.com"));
        assert!(!looks_like_email("dev@localhost"));
    }

    #[test]
    fn skills_split_and_trim() {
        assert_eq!(
            parse_skills("Rust; SQL ;;DevOps"),
            vec!["Rust", "SQL", "DevOps"]
        );
        assert!(parse_skills("").is_empty());
    }

    #[test]
    fn generated_passwords_are_long_enough() {
        let p = generate_password();
        assert_eq!(p.len(), 16);
        assert!(p.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
