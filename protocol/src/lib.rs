//! Wire types shared by the theme service and its host.
//!
//! Every message on the bus is a JSON object with a `meta` header naming the
//! event type and namespace. Inbound requests carry `meta.reply`, the event
//! type the answer must be published under.

mod events;
mod schema;
mod theme;

pub use events::*;
pub use schema::protocol_schema;
pub use theme::Theme;
pub use theme::ThemeId;
pub use theme::ThemeManifest;
