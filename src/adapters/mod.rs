// Adapters layer: concrete implementations for external systems (menu page, Gmail, OAuth, clock).

pub mod clock;
pub mod credentials;
pub mod gmail;
pub mod menu_page;
