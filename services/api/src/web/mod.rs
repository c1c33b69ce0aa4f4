pub mod auth;
pub mod middleware;
pub mod rate_limit;
pub mod rest;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;

pub use middleware::require_auth;
pub use rest::{
    create_lead_handler, delete_lead_handler, due_today_handler, get_lead_handler,
    list_leads_handler, update_lead_handler, update_status_handler,
};
