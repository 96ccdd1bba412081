use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crop {
    pub name: String,
    pub season: Option<String>,
    pub fertilizer: Option<String>,
    pub water_requirement: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestRecord {
    pub crop_name: String,
    pub harvest_date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    pub crop_name: String,
    pub supplier_name: String,
    pub location: Option<String>,
    pub contact: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub crop_name: Option<String>,
    pub status: Option<String>,
    pub details: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FarmUser {
    pub name: String,
    pub location: Option<String>,
    pub contact: Option<String>,
}

/// Row counts per table, reported by `/health` and `farmbot stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub users: i64,
    pub crops: i64,
    pub harvests: i64,
    pub suppliers: i64,
    pub faqs: i64,
    pub transactions: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CropAttribute {
    Season,
    Fertilizer,
    Water,
    HarvestDate,
    Supplier,
    Overview,
}

impl CropAttribute {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Season => "season",
            Self::Fertilizer => "fertilizer",
            Self::Water => "water",
            Self::HarvestDate => "harvest_date",
            Self::Supplier => "supplier",
            Self::Overview => "overview",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionQuery {
    Pending,
    Completed,
    Total,
}

impl TransactionQuery {
    /// Status filter passed to the store; `None` counts every row.
    pub fn status(self) -> Option<&'static str> {
        match self {
            Self::Pending => Some("pending"),
            Self::Completed => Some("completed"),
            Self::Total => None,
        }
    }
}

/// Which step of the routing chain produced a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteKind {
    CropAttribute,
    TransactionCount,
    Faq,
    Generated,
    Apology,
}

impl RouteKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CropAttribute => "crop_attribute",
            Self::TransactionCount => "transaction_count",
            Self::Faq => "faq",
            Self::Generated => "generated",
            Self::Apology => "apology",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutedReply {
    pub reply: String,
    pub route: RouteKind,
    pub crop: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
}

impl ChatReply {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }
}
