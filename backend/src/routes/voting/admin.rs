use bcrypt::verify;
use rocket::State;
use rocket::http::{Cookie, CookieJar, SameSite, Status};
use rocket::serde::json::Json;
use rocket_db_pools::Connection;
use rocket_db_pools::diesel::prelude::*;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::db::VotingDb;
use crate::ledger::DbLedger;
use crate::models::{
    AdminLoginRequest, AuditReport, DashboardStats, NewAdminSession, SetCategoryActiveRequest,
};
use crate::queries::Queries;
use crate::schema::{admin_sessions, categories, participants, vote_events};

// Helper function to check if admin is authenticated
async fn is_admin_authenticated(cookies: &CookieJar<'_>, db: &mut Connection<VotingDb>) -> bool {
    if let Some(cookie) = cookies.get("admin_auth") {
        let token = cookie.value();
        admin_sessions::table
            .find(token)
            .count()
            .get_result::<i64>(db)
            .await
            .unwrap_or(0)
            > 0
    } else {
        false
    }
}

// Admin login endpoint
#[post("/admin/login", format = "json", data = "<login>")]
pub async fn admin_login(
    mut db: Connection<VotingDb>,
    config: &State<AppConfig>,
    cookies: &CookieJar<'_>,
    login: Json<AdminLoginRequest>,
) -> Result<Status, Status> {
    if verify(&login.password, &config.admin_password_hash).unwrap_or(false) {
        let token = Uuid::new_v4().to_string();
        let new_session = NewAdminSession {
            session_token: token.clone(),
            expires_at: None,
            ip_address: None,
        };

        diesel::insert_into(admin_sessions::table)
            .values(&new_session)
            .execute(&mut db)
            .await
            .map_err(|e| {
                eprintln!("Error creating admin session: {}", e);
                Status::InternalServerError
            })?;

        let mut cookie = Cookie::new("admin_auth", token);
        cookie.set_http_only(true);
        cookie.set_same_site(SameSite::Lax);
        cookie.set_path("/");
        cookies.add(cookie);
        Ok(Status::Ok)
    } else {
        // Clear any existing invalid cookie
        cookies.remove(Cookie::from("admin_auth"));
        Err(Status::Unauthorized)
    }
}

// Admin logout endpoint
#[post("/admin/logout")]
pub async fn admin_logout(
    mut db: Connection<VotingDb>,
    cookies: &CookieJar<'_>,
) -> Result<Status, Status> {
    if let Some(cookie) = cookies.get("admin_auth") {
        let token = cookie.value();
        diesel::delete(admin_sessions::table.find(token))
            .execute(&mut db)
            .await
            .ok();
        cookies.remove(Cookie::from("admin_auth"));
    }
    Ok(Status::Ok)
}

// Check if admin is authenticated
#[get("/admin/check")]
pub async fn admin_check(
    mut db: Connection<VotingDb>,
    cookies: &CookieJar<'_>,
) -> Result<Json<bool>, Status> {
    let authenticated = is_admin_authenticated(cookies, &mut db).await;
    Ok(Json(authenticated))
}

// Admin route to get dashboard stats
#[get("/admin/stats")]
pub async fn get_stats(
    mut db: Connection<VotingDb>,
    cookies: &CookieJar<'_>,
) -> Result<Json<DashboardStats>, Status> {
    if !is_admin_authenticated(cookies, &mut db).await {
        return Err(Status::Unauthorized);
    }

    let count_error = |e| {
        eprintln!("Error getting stats: {}", e);
        Status::InternalServerError
    };

    let total_categories: i64 = categories::table
        .count()
        .get_result(&mut db)
        .await
        .map_err(count_error)?;
    let active_categories: i64 = categories::table
        .filter(categories::is_active.eq(true))
        .count()
        .get_result(&mut db)
        .await
        .map_err(count_error)?;
    let batch_a_categories: i64 = categories::table
        .filter(categories::batch.eq("A"))
        .count()
        .get_result(&mut db)
        .await
        .map_err(count_error)?;
    let batch_b_categories: i64 = categories::table
        .filter(categories::batch.eq("B"))
        .count()
        .get_result(&mut db)
        .await
        .map_err(count_error)?;
    let total_participants: i64 = participants::table
        .count()
        .get_result(&mut db)
        .await
        .map_err(count_error)?;
    let total_votes: i64 = vote_events::table
        .count()
        .get_result(&mut db)
        .await
        .map_err(count_error)?;

    Ok(Json(DashboardStats {
        total_categories,
        active_categories,
        batch_a_categories,
        batch_b_categories,
        total_participants,
        total_votes,
    }))
}

// Admin route to activate or deactivate a category. Categories referenced by
// votes are never deleted, only deactivated.
#[post("/admin/categories/<category_id>/active", format = "json", data = "<request>")]
pub async fn set_category_active(
    mut db: Connection<VotingDb>,
    cookies: &CookieJar<'_>,
    category_id: i32,
    request: Json<SetCategoryActiveRequest>,
) -> Result<Status, Status> {
    if !is_admin_authenticated(cookies, &mut db).await {
        return Err(Status::Unauthorized);
    }

    let updated = diesel::update(categories::table.find(category_id))
        .set(categories::is_active.eq(request.active))
        .execute(&mut db)
        .await
        .map_err(|e| {
            eprintln!("Error updating category {}: {}", category_id, e);
            Status::InternalServerError
        })?;

    if updated == 0 {
        Err(Status::NotFound)
    } else {
        Ok(Status::Ok)
    }
}

// Admin route to reconcile cached tallies against the vote log. Reports
// drift; repairs nothing.
#[get("/admin/audit")]
pub async fn audit_tallies(
    mut db: Connection<VotingDb>,
    cookies: &CookieJar<'_>,
    queries: &State<Queries<DbLedger>>,
) -> Result<Json<AuditReport>, Status> {
    if !is_admin_authenticated(cookies, &mut db).await {
        return Err(Status::Unauthorized);
    }

    let participants_checked: i64 = participants::table
        .count()
        .get_result(&mut db)
        .await
        .map_err(|e| {
            eprintln!("Error counting participants: {}", e);
            Status::InternalServerError
        })?;
    let drift = queries.audit_tallies().await.map_err(|e| {
        eprintln!("Error auditing tallies: {}", e);
        Status::InternalServerError
    })?;

    Ok(Json(AuditReport {
        participants_checked,
        drift,
    }))
}
