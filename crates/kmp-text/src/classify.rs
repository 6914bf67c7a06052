//! Content classification by keyword counting.
//!
//! `CATEGORY_KEYWORDS` is the one table every fallback path (question pools,
//! compiler section headings) keys off.

use serde::{Deserialize, Serialize};

/// Content category of a knowledge item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Electrical,
    Incident,
    Product,
    Procedure,
    Location,
    Person,
    Vehicle,
    Supplier,
    Equipment,
    Software,
    General,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Electrical => "electrical",
            Self::Incident => "incident",
            Self::Product => "product",
            Self::Procedure => "procedure",
            Self::Location => "location",
            Self::Person => "person",
            Self::Vehicle => "vehicle",
            Self::Supplier => "supplier",
            Self::Equipment => "equipment",
            Self::Software => "software",
            Self::General => "general",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category → keywords (Arabic and lower-case English).
pub const CATEGORY_KEYWORDS: &[(Category, &[&str])] = &[
    (
        Category::Electrical,
        &[
            "كهرباء", "كهربائي", "تماس", "فولت", "أسلاك", "تيار", "electric", "voltage",
            "wiring", "circuit",
        ],
    ),
    (
        Category::Incident,
        &[
            "حادث", "إصابة", "ضرر", "خطر", "إسعاف", "طوارئ", "حريق", "دخان", "لهب", "إطفاء",
            "طفاية", "accident", "injury", "fire", "emergency",
        ],
    ),
    (
        Category::Product,
        &[
            "منتج", "سلعة", "بضاعة", "مخزون", "صنف", "أصناف", "ماركة", "product", "item",
            "goods", "brand",
        ],
    ),
    (
        Category::Procedure,
        &[
            "إجراء", "عملية", "خطوات", "تعليمات", "دليل", "طريقة", "آلية", "process",
            "procedure", "steps", "protocol", "method",
        ],
    ),
    (
        Category::Location,
        &[
            "مكان", "موقع", "مبنى", "طابق", "مكتب", "قاعة", "غرفة", "فرع", "مستودع", "مخزن",
            "عنوان", "location", "office", "branch", "warehouse", "address",
        ],
    ),
    (
        Category::Person,
        &[
            "موظف", "شخص", "مدير", "مسؤول", "مشرف", "مهندس", "فريق", "manager", "employee",
            "supervisor", "contact",
        ],
    ),
    (
        Category::Vehicle,
        &[
            "سيارة", "سيارات", "مركبة", "شاحنة", "تويوتا", "مرسيدس", "هوندا", "نيسان", "بيك اب",
            "vehicle", "truck", "toyota", "pickup",
        ],
    ),
    (
        Category::Supplier,
        &[
            "مورد", "مزود", "موزع", "بائع", "تاجر", "supplier", "vendor", "distributor",
        ],
    ),
    (
        Category::Equipment,
        &[
            "معدة", "آلة", "جهاز", "أجهزة", "ماكينة", "أداة", "أدوات", "مصعد", "مكيف", "عطل",
            "معطل", "خلل", "صيانة", "إصلاح", "تصليح", "equipment", "machine", "device", "tool",
            "elevator",
        ],
    ),
    (
        Category::Software,
        &[
            "برنامج", "نظام", "تطبيق", "منصة", "software", "system", "application", "website",
            "platform",
        ],
    ),
];

/// Whether `text` contains any of `words` as a substring.
pub fn contains_any(text: &str, words: &[&str]) -> bool {
    words.iter().any(|w| text.contains(w))
}

/// Keyword hit counts per category, in table order. Categories without
/// hits are included with a zero count.
pub fn category_scores(text: &str) -> Vec<(Category, usize)> {
    let lowered = text.to_lowercase();
    CATEGORY_KEYWORDS
        .iter()
        .map(|(category, keywords)| {
            let hits = keywords.iter().map(|kw| lowered.matches(kw).count()).sum();
            (*category, hits)
        })
        .collect()
}

/// Classify text into the category with the strictly highest keyword count.
/// No hits, or a tie at the top, yields `General`.
pub fn classify(text: &str) -> Category {
    let scores = category_scores(text);
    let best = scores.iter().map(|(_, n)| *n).max().unwrap_or(0);
    if best == 0 {
        return Category::General;
    }
    let mut leaders = scores.iter().filter(|(_, n)| *n == best);
    match (leaders.next(), leaders.next()) {
        (Some((category, _)), None) => *category,
        _ => Category::General,
    }
}
