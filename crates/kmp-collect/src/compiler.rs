//! Knowledge compilation: text enhancement, document integration and tagging.
//!
//! Each operation tries the collaborator first and falls back to a
//! deterministic template on any collaborator error.

use kmp_chat::{ChatMessage, CollaboratorError};
use kmp_text::{classify, contains_any, correct_words, Category};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::collector::Collector;
use crate::draft::Turn;

const ENHANCE_PROMPT: &str = "You are an AI assistant helping a knowledge management platform. \
Your task is to process knowledge contributions from employees, enhance them for clarity, \
and structure them professionally. Maintain all factual information and technical accuracy \
while improving structure, clarity, grammar and professional language. \
Add relevant section headings if appropriate. Keep the text in its original language.";

const COMPILE_PROMPT: &str = "You are a knowledge management assistant. You have received an \
original knowledge contribution along with follow-up questions and answers. Integrate all this \
information into a comprehensive, well-structured knowledge entry with appropriate section \
headings. Maintain factual accuracy. The result must read as a cohesive document, not as a Q&A \
format. Keep the text in its original language.";

const TAGS_PROMPT: &str = "You are a knowledge management AI that helps categorize information. \
Extract 3-5 relevant tags from the text provided. Return only the tags as a JSON array of strings.";

const MAX_TAGS: usize = 5;
const TITLE_CHARS: usize = 50;
pub const DEFAULT_TAG: &str = "معلومات عامة";

const CLOSING_SECTION: &str = "## ملاحظات ختامية\n\
تم تجميع هذه المعلومات بواسطة نظام إدارة المعرفة. يرجى التحقق من دقة المعلومات قبل الاعتماد عليها بشكل كامل.\n";

/// Base keyword → related tags, in priority order.
const TAG_TABLE: &[(&str, &[&str])] = &[
    ("مورد", &["موردين", "مزودين", "مشتريات", "توريد"]),
    ("ورد", &["زهور", "نباتات", "تنسيق زهور"]),
    ("توصيل", &["خدمة توصيل", "توصيل سريع", "شحن"]),
    ("منتج", &["منتجات", "سلع", "بضائع"]),
    ("إجراء", &["عملية", "خطوات", "سياسة", "إجراءات"]),
    ("خدمة", &["خدمات", "دعم", "مساعدة"]),
    ("معلومات", &["بيانات", "معرفة"]),
    ("جديد", &["جديد", "حديث", "تحديث"]),
];

const FLOWER_TAGS: &[&str] = &["ورد", "زهور", "تنسيق", "هدايا"];

// "ورد" as a word or after the article; plain substring matching would also
// hit "مورد".
static FLOWER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^\p{L}]|ال)ورد|زهور|نبات").unwrap());

/// Keyword → subsection heading tables, checked in order.
type HeadingTable = &'static [(&'static [&'static str], &'static str)];

const VEHICLE_HEADINGS: HeadingTable = &[
    (&["حالة", "تعمل", "فنية"], "الحالة الفنية للسيارة"),
    (&["اتصال", "مالك", "تواصل"], "معلومات المالك/الاتصال"),
    (&["سعة", "تحميل", "حمولة", "قدرة", "capacity"], "قدرة التحميل والسعة"),
];

const SUPPLIER_HEADINGS: HeadingTable = &[
    (&["اتصال", "phone", "contact"], "معلومات الاتصال"),
    (&["توصيل", "delivery"], "خدمة التوصيل"),
    (&["منتجات", "خدمات", "products", "services"], "المنتجات والخدمات"),
];

const PRODUCT_HEADINGS: HeadingTable = &[
    (&["مواصفات", "specification"], "المواصفات"),
    (&["استخدام", "usage", "application"], "الاستخدامات"),
    (&["بدائل", "alternative"], "البدائل المتاحة"),
];

const PROCEDURE_HEADINGS: HeadingTable = &[
    (&["خطوات", "steps"], "الخطوات التفصيلية"),
    (&["متطلبات", "requirement", "شروط"], "المتطلبات والشروط"),
    (&["تحديات", "مشاكل", "challenge", "issue"], "التحديات والمشاكل المحتملة"),
];

const GENERIC_HEADINGS: HeadingTable = &[
    (&["اتصال", "phone", "contact"], "معلومات الاتصال"),
    (&["متطلبات", "requirements"], "المتطلبات"),
    (&["مواصفات", "specifications", "features"], "المواصفات والميزات"),
];

fn section_heading(category: Category) -> &'static str {
    match category {
        Category::Vehicle => "## معلومات السيارة",
        Category::Supplier => "## معلومات المورد",
        Category::Product => "## تفاصيل المنتج",
        Category::Procedure => "## تفاصيل الإجراء",
        Category::Software => "## معلومات البرنامج/النظام",
        Category::Equipment => "## تفاصيل المعدة/الجهاز",
        Category::Location => "## معلومات الموقع/المكان",
        Category::Person => "## معلومات الشخص/جهة الاتصال",
        Category::Electrical => "## تفاصيل المشكلة الكهربائية",
        Category::Incident => "## تفاصيل الحادث",
        Category::General => "## معلومات إضافية",
    }
}

fn heading_table(category: Category) -> HeadingTable {
    match category {
        Category::Vehicle => VEHICLE_HEADINGS,
        Category::Supplier => SUPPLIER_HEADINGS,
        Category::Product => PRODUCT_HEADINGS,
        Category::Procedure => PROCEDURE_HEADINGS,
        _ => GENERIC_HEADINGS,
    }
}

fn subsection_heading(category: Category, question: &str) -> String {
    let lowered = question.to_lowercase();
    heading_table(category)
        .iter()
        .find(|(keywords, _)| contains_any(&lowered, keywords))
        .map(|(_, heading)| heading.to_string())
        .unwrap_or_else(|| question.trim().to_string())
}

/// First sentence of `line`, cut to the title length with an ellipsis.
fn short_title(line: &str) -> String {
    let sentence = line.split('.').next().unwrap_or(line).trim();
    let mut title: String = sentence.chars().take(TITLE_CHARS).collect();
    title.push_str("...");
    title
}

/// Deterministic enhancement: trim, fix common misspellings and give
/// untitled text a `##` title.
pub fn enhance_fallback(text: &str) -> String {
    let corrected = correct_words(text.trim());
    let mut lines = corrected.lines();
    let first = lines.next().unwrap_or("").trim();
    let single_line = lines.next().is_none();

    if single_line || first.chars().count() > TITLE_CHARS {
        let sentence = first.split('.').next().unwrap_or(first).trim();
        let title = if sentence.chars().count() > TITLE_CHARS {
            short_title(sentence)
        } else {
            sentence.to_string()
        };
        if !title.is_empty() {
            return format!("## {}\n\n{}", title, corrected);
        }
    }
    corrected
}

/// Deterministic document: title, contribution body, one category section
/// with a subsection per answered turn, closing notes. A leading markdown
/// heading becomes the title instead of being repeated in the body.
pub fn compile_fallback(text: &str, turns: &[Turn]) -> String {
    let text = text.trim();
    let (first_line, rest) = text.split_once('\n').unwrap_or((text, ""));
    let first_line = first_line.trim();

    let (title, body) = match first_line.strip_prefix('#') {
        Some(heading) => (heading.trim_start_matches('#').trim().to_string(), rest.trim()),
        None if first_line.chars().count() > TITLE_CHARS => (short_title(first_line), text),
        None => (first_line.to_string(), text),
    };

    let mut doc = format!("# {}\n\n", title);
    if !body.is_empty() {
        doc.push_str(body);
        doc.push_str("\n\n");
    }

    let category = classify(body);
    doc.push_str(section_heading(category));
    doc.push_str("\n\n");

    for turn in turns.iter().filter(|t| !t.answer.trim().is_empty()) {
        doc.push_str("### ");
        doc.push_str(&subsection_heading(category, &turn.question));
        doc.push('\n');
        doc.push_str(turn.answer.trim());
        doc.push_str("\n\n");
    }

    doc.push_str(CLOSING_SECTION);
    doc
}

/// Append `tag` unless present or the list is full.
fn push_tag(tags: &mut Vec<String>, tag: &str) -> bool {
    if tags.len() < MAX_TAGS && !tags.iter().any(|t| t == tag) {
        tags.push(tag.to_string());
        true
    } else {
        false
    }
}

/// Keyword-table tags for `document`: 1..=5 unique tags.
pub fn tags_fallback(document: &str) -> Vec<String> {
    let lowered = document.to_lowercase();
    let mut tags: Vec<String> = Vec::new();

    for (base, related) in TAG_TABLE {
        let hit = if *base == "ورد" {
            FLOWER_RE.is_match(&lowered)
        } else {
            lowered.contains(base)
        };
        if !hit {
            continue;
        }
        push_tag(&mut tags, base);
        for tag in related.iter() {
            if push_tag(&mut tags, tag) {
                break;
            }
        }
    }

    if FLOWER_RE.is_match(&lowered) {
        for tag in FLOWER_TAGS {
            push_tag(&mut tags, tag);
        }
    }

    if tags.is_empty() {
        tags.push(DEFAULT_TAG.to_string());
    }
    tags
}

/// Tags out of a structured reply: a JSON array or `{"tags": [...]}`.
/// Trimmed, deduplicated and capped. `None` when nothing usable remains.
pub fn tags_from_reply(reply: &Value) -> Option<Vec<String>> {
    let items = match reply {
        Value::Array(items) => items,
        Value::Object(map) => map.get("tags")?.as_array()?,
        _ => return None,
    };

    let mut tags: Vec<String> = Vec::new();
    for tag in items.iter().filter_map(Value::as_str).map(str::trim) {
        if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
        if tags.len() == MAX_TAGS {
            break;
        }
    }
    (!tags.is_empty()).then_some(tags)
}

fn non_empty(text: String) -> Result<String, CollaboratorError> {
    if text.trim().is_empty() {
        Err(CollaboratorError::Malformed("empty document".into()))
    } else {
        Ok(text.trim().to_string())
    }
}

impl Collector {
    /// Polished version of freshly submitted text.
    pub async fn enhance(&self, text: &str) -> String {
        let input = format!(
            "Please process and enhance the following knowledge contribution:\n\n{}",
            text
        );
        match self
            .ask(ENHANCE_PROMPT, &[ChatMessage::user(input)])
            .await
            .and_then(non_empty)
        {
            Ok(enhanced) => enhanced,
            Err(e) => {
                warn!("Enhancement falling back to local corrections: {}", e);
                enhance_fallback(text)
            }
        }
    }

    /// One cohesive document from the contribution text and the follow-up
    /// turns.
    pub async fn compile(&self, text: &str, turns: &[Turn]) -> String {
        let mut input = format!(
            "Please integrate this original knowledge contribution and the follow-up Q&A into a comprehensive knowledge entry:\n\nOriginal contribution:\n{}\n",
            text
        );
        for (i, turn) in turns.iter().enumerate() {
            input.push_str(&format!(
                "\n\nQuestion {n}: {}\nAnswer {n}: {}",
                turn.question,
                turn.answer,
                n = i + 1
            ));
        }

        match self
            .ask(COMPILE_PROMPT, &[ChatMessage::user(input)])
            .await
            .and_then(non_empty)
        {
            Ok(document) => document,
            Err(e) => {
                warn!("Compilation falling back to template document: {}", e);
                compile_fallback(text, turns)
            }
        }
    }

    /// 1..=5 tags for a compiled document.
    pub async fn extract_tags(&self, document: &str) -> Vec<String> {
        match self.ask_structured(TAGS_PROMPT, document).await {
            Ok(reply) => match tags_from_reply(&reply) {
                Some(tags) => {
                    debug!("Collaborator produced {} tags", tags.len());
                    tags
                }
                None => {
                    warn!("Tag reply had no usable tags, using keyword table");
                    tags_fallback(document)
                }
            },
            Err(e) => {
                warn!("Tag extraction falling back to keyword table: {}", e);
                tags_fallback(document)
            }
        }
    }
}
