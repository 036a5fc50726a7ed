// Main application entry point

#[macro_use]
extern crate rocket;

mod config;
mod db;
mod engine;
mod identity;
mod ledger;
mod limiter;
mod models;
mod queries;
mod routes;
mod schema;

use rocket::fairing::AdHoc;
use rocket_db_pools::Database;

use config::AppConfig;
use db::VotingDb;
use engine::VoteEngine;
use ledger::DbLedger;
use limiter::RateLimiter;
use queries::Queries;
use routes::voting;

#[rocket::launch]
fn rocket() -> _ {
    let app_config = AppConfig::load();

    let figment = rocket::config::Config::figment()
        .merge(("port", app_config.rocket_port))
        .merge((
            "databases.voting_db",
            rocket_db_pools::Config {
                url: app_config.database_url.clone(),
                min_connections: None,
                max_connections: 1024,
                connect_timeout: 3,
                idle_timeout: None,
                extensions: None,
            },
        ));

    rocket::custom(figment)
        .manage(app_config)
        .attach(VotingDb::init())
        .attach(AdHoc::on_ignite("Database Migrations", db::run_migrations))
        .attach(AdHoc::on_ignite("Database Seeding", db::run_seeding))
        .attach(AdHoc::on_ignite("Vote Ledger", |rocket| async move {
            let config = rocket
                .state::<AppConfig>()
                .expect("AppConfig is managed")
                .clone();
            let pool = VotingDb::fetch(&rocket)
                .expect("VotingDb is attached")
                .0
                .clone();
            let ledger = DbLedger::new(pool);
            let limiter = RateLimiter::new(config.vote_limit, config.timezone());
            rocket
                .manage(VoteEngine::new(ledger.clone(), limiter))
                .manage(Queries::new(ledger, limiter))
        }))
        .mount(
            "/api",
            routes![
                voting::client::get_categories,
                voting::client::get_participants,
                voting::client::get_remaining,
                voting::client::cast_vote,
                voting::admin::admin_login,
                voting::admin::admin_logout,
                voting::admin::admin_check,
                voting::admin::get_stats,
                voting::admin::set_category_active,
                voting::admin::audit_tallies,
            ],
        )
        .register(
            "/api",
            catchers![routes::not_found, routes::unauthorized, routes::bad_request],
        )
}
