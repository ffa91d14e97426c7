//! Reply generators and the conversation bootstrap used by the HTTP handlers.

pub mod cat_fact;
pub mod clock;
pub mod echo;
pub mod history;

pub use cat_fact::{CatFactClient, CatFactError, CAT_FACT_FALLBACK, DEFAULT_CAT_FACT_URL};
pub use clock::{current_time, format_clock};
pub use echo::echo;
pub use history::{derive_title, ensure_conversation, save_echo_messages};
