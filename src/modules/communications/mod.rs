pub mod controller;
pub mod model;
pub mod router;
pub mod service;

pub use model::*;
pub use router::{
    init_announcements_router, init_messages_router, init_notification_preferences_router,
    init_notifications_router,
};
