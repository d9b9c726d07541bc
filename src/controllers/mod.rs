pub mod admin;
pub mod auth;
pub mod events;
pub mod favorites;
pub mod payouts;
pub mod tickets;
pub mod waitlist;

use axum::Router;
use std::sync::Arc;

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(auth::routes())
        .merge(events::routes())
        .merge(tickets::routes())
        .merge(waitlist::routes())
        .merge(payouts::routes())
        .merge(favorites::routes())
        .nest("/admin", admin::routes())
}
