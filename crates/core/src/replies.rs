use crate::intent::title_case;
use crate::models::{Crop, Supplier, TransactionQuery};

pub const APOLOGY_REPLY: &str = "Sorry, I could not generate a response at this time.";

/// Stand-in for a field the store could not supply for a detected crop.
pub const MISSING_FIELD: &str = "unknown";

pub const GENERATOR_PROMPT_PREFIX: &str = "Answer in detail: ";

pub fn generator_prompt(question: &str) -> String {
    format!("{GENERATOR_PROMPT_PREFIX}{question}")
}

pub fn season_reply(crop: &str, record: Option<&Crop>) -> String {
    let season = field(record.and_then(|c| c.season.as_deref()));
    format!("{} grows in {} season.", title_case(crop), season)
}

pub fn fertilizer_reply(crop: &str, record: Option<&Crop>) -> String {
    let fertilizer = field(record.and_then(|c| c.fertilizer.as_deref()));
    format!("Best fertilizer for {} is {}.", title_case(crop), fertilizer)
}

pub fn water_reply(crop: &str, record: Option<&Crop>) -> String {
    let water = field(record.and_then(|c| c.water_requirement.as_deref()));
    format!("{} needs {} water.", title_case(crop), water)
}

pub fn harvest_reply(crop: &str, harvest_date: Option<&str>) -> String {
    format!(
        "Harvest date for {} is {}.",
        title_case(crop),
        field(harvest_date)
    )
}

pub fn supplier_reply(supplier: Option<&Supplier>) -> String {
    format!(
        "Supplier: {}, Location: {}, Contact: {}.",
        field(supplier.map(|s| s.supplier_name.as_str())),
        field(supplier.and_then(|s| s.location.as_deref())),
        field(supplier.and_then(|s| s.contact.as_deref())),
    )
}

pub fn overview_reply(crop: &str, record: Option<&Crop>) -> String {
    format!(
        "{} \u{2014} Season: {}, Fertilizer: {}, Water: {}.",
        title_case(crop),
        field(record.and_then(|c| c.season.as_deref())),
        field(record.and_then(|c| c.fertilizer.as_deref())),
        field(record.and_then(|c| c.water_requirement.as_deref())),
    )
}

pub fn transaction_reply(query: TransactionQuery, count: i64) -> String {
    match query {
        TransactionQuery::Pending => format!("{count} pending transactions."),
        TransactionQuery::Completed => format!("{count} completed transactions."),
        TransactionQuery::Total => format!("Total transactions: {count}"),
    }
}

fn field(value: Option<&str>) -> &str {
    value.unwrap_or(MISSING_FIELD)
}
