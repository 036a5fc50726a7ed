// Routes module - organizes all HTTP route handlers

pub mod voting;

use rocket::http::Status;

#[catch(404)]
pub fn not_found() -> Status {
    Status::NotFound
}

#[catch(401)]
pub fn unauthorized() -> Status {
    Status::Unauthorized
}

#[catch(400)]
pub fn bad_request() -> Status {
    Status::BadRequest
}
