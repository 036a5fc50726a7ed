// Database connection and initialization

use diesel::prelude::*;
use diesel_async::async_connection_wrapper::AsyncConnectionWrapper;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use rocket::Rocket;
use rocket_db_pools::Database;
use rocket_db_pools::diesel::MysqlPool;

use crate::config::AppConfig;
use crate::models::{NewCategory, NewParticipant};
use crate::schema::{categories, participants};

/// Database connection pool for the vote ledger
#[derive(Database)]
#[database("voting_db")]
pub struct VotingDb(pub MysqlPool);

// Embed migrations from the migrations directory
const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

// Sync wrapper over the async mysql connection; MigrationHarness and the
// seeding path both require a sync Connection, and this avoids linking a
// native mysql client library.
type SetupConn = AsyncConnectionWrapper<diesel_async::AsyncMysqlConnection>;

/// Run pending database migrations
pub async fn run_migrations(rocket: Rocket<rocket::Build>) -> Rocket<rocket::Build> {
    let database_url = rocket
        .state::<AppConfig>()
        .expect("AppConfig is managed")
        .database_url
        .clone();

    // Run migrations in a blocking task since MigrationHarness requires a sync connection
    let result: Result<Vec<String>, String> = rocket::tokio::task::spawn_blocking(move || {
        let mut sync_conn = SetupConn::establish(&database_url)
            .map_err(|e| format!("Failed to establish connection: {}", e))?;

        let versions = sync_conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| format!("Failed to run migrations: {}", e))?
            .into_iter()
            .map(|v| v.to_string())
            .collect::<Vec<String>>();

        Ok(versions)
    })
    .await
    .expect("Migration task panicked");

    match result {
        Ok(versions) => {
            if versions.is_empty() {
                println!("✅ Database is up to date");
            } else {
                println!("✅ Applied {} migration(s):", versions.len());
                for version in versions {
                    println!("   - {}", version);
                }
            }
        }
        Err(e) => {
            eprintln!("❌ {}", e);
            panic!("Database migration failed");
        }
    }

    rocket
}

/// One category with its participants, parsed from SEED_CATEGORIES.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySeed {
    pub name: String,
    pub batch: String,
    pub participants: Vec<String>,
}

/// Parse a SEED_CATEGORIES value of the form
/// `Name@Batch=Participant;Participant,Name@Batch=...`.
pub fn parse_seed_spec(spec: &str) -> Result<Vec<CategorySeed>, String> {
    let mut seeds = Vec::new();

    for entry in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (head, tail) = match entry.split_once('=') {
            Some((head, tail)) => (head, tail),
            None => (entry, ""),
        };
        let (name, batch) = head
            .split_once('@')
            .ok_or_else(|| format!("Missing '@Batch' in seed entry '{}'", entry))?;
        let name = name.trim();
        let batch = batch.trim();
        if name.is_empty() || batch.is_empty() {
            return Err(format!("Empty name or batch in seed entry '{}'", entry));
        }

        let participants = tail
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        seeds.push(CategorySeed {
            name: name.to_string(),
            batch: batch.to_string(),
            participants,
        });
    }

    Ok(seeds)
}

/// Seed database with initial categories and participants
pub async fn run_seeding(rocket: Rocket<rocket::Build>) -> Rocket<rocket::Build> {
    let database_url = rocket
        .state::<AppConfig>()
        .expect("AppConfig is managed")
        .database_url
        .clone();

    let result: Result<Option<(usize, usize)>, String> =
        rocket::tokio::task::spawn_blocking(move || {
            let spec = match std::env::var("SEED_CATEGORIES") {
                Ok(spec) => spec,
                Err(_) => return Ok(None),
            };
            let seeds = parse_seed_spec(&spec)?;
            if seeds.is_empty() {
                return Ok(None);
            }

            let mut sync_conn = SetupConn::establish(&database_url)
                .map_err(|e| format!("Failed to establish connection: {}", e))?;

            let existing: i64 = categories::table
                .count()
                .get_result(&mut sync_conn)
                .unwrap_or(0);
            if existing > 0 {
                return Ok(None);
            }

            let mut participant_total = 0;
            for seed in &seeds {
                diesel::insert_into(categories::table)
                    .values(&NewCategory {
                        name: seed.name.clone(),
                        batch: seed.batch.clone(),
                        is_active: true,
                    })
                    .execute(&mut sync_conn)
                    .map_err(|e| format!("Failed to seed category '{}': {}", seed.name, e))?;

                let category_id = diesel::select(diesel::dsl::sql::<diesel::sql_types::Integer>(
                    "LAST_INSERT_ID()",
                ))
                .get_result::<i32>(&mut sync_conn)
                .map_err(|e| format!("Failed to get category ID: {}", e))?;

                let rows: Vec<NewParticipant> = seed
                    .participants
                    .iter()
                    .map(|name| NewParticipant {
                        category_id,
                        name: name.clone(),
                    })
                    .collect();
                if !rows.is_empty() {
                    diesel::insert_into(participants::table)
                        .values(&rows)
                        .execute(&mut sync_conn)
                        .map_err(|e| {
                            format!("Failed to seed participants for '{}': {}", seed.name, e)
                        })?;
                    participant_total += rows.len();
                }
            }

            Ok(Some((seeds.len(), participant_total)))
        })
        .await
        .expect("Seeding task panicked");

    match result {
        Ok(Some((category_count, participant_count))) => {
            println!(
                "🌱 Seeded {} categories and {} participants from environment variable",
                category_count, participant_count
            );
        }
        Ok(None) => {}
        Err(e) => {
            eprintln!("❌ Seeding failed: {}", e);
        }
    }

    rocket
}
