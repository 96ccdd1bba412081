use farm_core::{Crop, FaqEntry, FarmUser, HarvestRecord, Supplier, Transaction};

/// Rows inserted by the startup seeding step. Each table is only filled when
/// it is empty, so reseeding an existing database is a no-op.
#[derive(Debug, Clone, Default)]
pub struct SeedData {
    pub users: Vec<FarmUser>,
    pub crops: Vec<Crop>,
    pub harvests: Vec<HarvestRecord>,
    pub suppliers: Vec<Supplier>,
    pub faqs: Vec<FaqEntry>,
    pub transactions: Vec<Transaction>,
}

/// Outcome of a seeding pass: which tables received rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub users: bool,
    pub crops: bool,
    pub harvests: bool,
    pub suppliers: bool,
    pub faqs: bool,
    pub transactions: bool,
}

impl SeedReport {
    pub fn any(&self) -> bool {
        self.users
            || self.crops
            || self.harvests
            || self.suppliers
            || self.faqs
            || self.transactions
    }
}

impl SeedData {
    pub fn defaults() -> Self {
        Self {
            users: vec![
                user("Ravi", "Andhra Pradesh", "9876543210"),
                user("Sneha", "Telangana", "8765432109"),
            ],
            crops: vec![
                crop("Tomato", "Summer", "NPK 20-20-20", "Medium"),
                crop("Potato", "Spring", "NPK 10-52-10", "Moderate"),
                crop("Carrot", "Autumn", "Balanced NPK", "Low"),
            ],
            harvests: vec![
                harvest("Tomato", "2025-03-15"),
                harvest("Potato", "2025-02-10"),
                harvest("Carrot", "2025-01-25"),
            ],
            suppliers: vec![
                supplier("Tomato", "GreenGrow Supplies", "Hyderabad", "9123456789"),
                supplier("Potato", "AgriFarm Traders", "Guntur", "9876543212"),
                supplier("Carrot", "FreshField Supply Co.", "Vizag", "9988776655"),
            ],
            faqs: vec![
                faq(
                    "what is crop rotation",
                    "Crop rotation improves soil health by changing crops each season.",
                ),
                faq(
                    "how to store tomatoes",
                    "Store tomatoes at room temperature away from sunlight.",
                ),
            ],
            transactions: vec![
                transaction("Tomato", "pending", "Order #101"),
                transaction("Carrot", "completed", "Order #99"),
                transaction("Potato", "pending", "Order #102"),
                transaction("Tomato", "completed", "Order #98"),
            ],
        }
    }
}

fn user(name: &str, location: &str, contact: &str) -> FarmUser {
    FarmUser {
        name: name.to_string(),
        location: Some(location.to_string()),
        contact: Some(contact.to_string()),
    }
}

fn crop(name: &str, season: &str, fertilizer: &str, water: &str) -> Crop {
    Crop {
        name: name.to_string(),
        season: Some(season.to_string()),
        fertilizer: Some(fertilizer.to_string()),
        water_requirement: Some(water.to_string()),
    }
}

fn harvest(crop_name: &str, date: &str) -> HarvestRecord {
    HarvestRecord {
        crop_name: crop_name.to_string(),
        harvest_date: date.to_string(),
    }
}

fn supplier(crop_name: &str, name: &str, location: &str, contact: &str) -> Supplier {
    Supplier {
        crop_name: crop_name.to_string(),
        supplier_name: name.to_string(),
        location: Some(location.to_string()),
        contact: Some(contact.to_string()),
    }
}

fn faq(question: &str, answer: &str) -> FaqEntry {
    FaqEntry {
        question: question.to_string(),
        answer: answer.to_string(),
    }
}

fn transaction(crop_name: &str, status: &str, details: &str) -> Transaction {
    Transaction {
        crop_name: Some(crop_name.to_string()),
        status: Some(status.to_string()),
        details: Some(details.to_string()),
    }
}
