use crate::models::{CropAttribute, TransactionQuery};

/// Keyword groups for crop questions, in priority order. The first group with
/// any keyword present in the question decides the attribute.
pub const CROP_RULES: &[(CropAttribute, &[&str])] = &[
    (CropAttribute::Season, &["season", "grow"]),
    (CropAttribute::Fertilizer, &["fertilizer"]),
    (CropAttribute::Water, &["water", "irrigation"]),
    (CropAttribute::HarvestDate, &["harvest", "date"]),
    (CropAttribute::Supplier, &["supplier", "vendor", "buy"]),
    (CropAttribute::Overview, &["info", "tell me"]),
];

pub const TRANSACTION_TRIGGERS: &[&str] = &["transaction", "pending", "completed"];

/// Status-specific transaction rules; `pending` is checked before `completed`.
pub const TRANSACTION_RULES: &[(TransactionQuery, &str)] = &[
    (TransactionQuery::Pending, "pending"),
    (TransactionQuery::Completed, "completed"),
];

pub fn normalize_question(input: &str) -> String {
    input.trim().to_lowercase()
}

/// Picks the first crop, in the order given, whose case-folded name occurs
/// anywhere in the normalized question.
pub fn detect_crop<'a, I>(crop_names: I, normalized: &str) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    crop_names
        .into_iter()
        .map(str::to_lowercase)
        .find(|name| !name.is_empty() && normalized.contains(name.as_str()))
}

pub fn match_crop_attribute(normalized: &str) -> Option<CropAttribute> {
    CROP_RULES
        .iter()
        .find(|(_, keywords)| contains_any(normalized, keywords))
        .map(|(attribute, _)| *attribute)
}

pub fn match_transaction_query(normalized: &str) -> Option<TransactionQuery> {
    if !contains_any(normalized, TRANSACTION_TRIGGERS) {
        return None;
    }

    let query = TRANSACTION_RULES
        .iter()
        .find(|(_, keyword)| normalized.contains(keyword))
        .map(|(query, _)| *query)
        .unwrap_or(TransactionQuery::Total);

    Some(query)
}

/// Python-style `str.title()`: uppercase the first letter of every
/// alphabetic run, lowercase the rest.
pub fn title_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut previous_is_alpha = false;

    for ch in input.chars() {
        if ch.is_alphabetic() {
            if previous_is_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            previous_is_alpha = true;
        } else {
            out.push(ch);
            previous_is_alpha = false;
        }
    }

    out
}

fn contains_any(input: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| input.contains(needle))
}
