pub mod intent;
pub mod models;
pub mod payload;
pub mod replies;

pub use intent::{
    detect_crop, match_crop_attribute, match_transaction_query, normalize_question, title_case,
};
pub use models::*;
pub use payload::{parse_question, InvalidInput};
pub use replies::{generator_prompt, APOLOGY_REPLY, MISSING_FIELD};
