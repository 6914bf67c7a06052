//! Follow-up question generation.
//!
//! The model is asked first. On any collaborator failure a question is drawn
//! from the category pool of the draft's content, skipping candidates too
//! close to anything already asked.

use kmp_chat::{ChatMessage, CollaboratorError};
use kmp_text::{are_similar, classify, Category};
use tracing::warn;

use crate::collector::Collector;
use crate::draft::KnowledgeDraft;
use crate::phrasing::{choose, PhrasingStrategy};

const SYSTEM_PROMPT: &str = "أنت مساعد ذكي داخل منصة إدارة معرفة، هدفك هو التحاور بشكل طبيعي مع الموظفين لجمع معلومات مهمة حول الموضوع المطروح. \
يجب أن يكون سؤالك التالي طبيعياً وغير متكرر، ومحدداً بحسب نوع المعلومات (مشكلة كهربائية، حادث، منتج، إجراء، موظف، مورد...)، \
ومركّزاً على تفاصيل ضرورية غير موجودة في النص. \
للحوادث والمشاكل: المخاطر والإجراءات المتخذة والوقت والحل والتبليغ. \
للمنتجات والخدمات: المواصفات والاستخدام والتكلفة والبدائل. \
للإجراءات: الخطوات والمتطلبات والمسؤولون والمدة. \
للأشخاص والجهات: بيانات الاتصال والدور والمسؤوليات. \
اطرح سؤالاً واحداً فقط.";

const FINAL_INSTRUCTION: &str = "بناءً على المحادثة السابقة، ما هو السؤال الأكثر ملاءمة الآن للحصول على معلومات قيّمة غير متوفرة بعد؟ قدم سؤالاً واحداً فقط.";

/// Used whenever the category is undetermined or its pool is used up.
pub const GENERIC_QUESTIONS: &[&str] = &[
    "هل يمكنك تقديم المزيد من التفاصيل أو المعلومات حول هذا الموضوع؟",
    "هل هناك أي جهات اتصال أو موارد إضافية متعلقة بهذا الأمر؟",
    "هل هناك أي إجراءات أو خطوات محددة يجب اتباعها في هذه الحالة؟",
    "هل هناك آثار جانبية أو تأثيرات على أقسام أو مناطق أخرى؟",
    "هل هناك معلومات أخرى مهمة يجب مشاركتها حول هذا الموضوع؟",
];

/// Question pool for a category. `General` maps to the generic pool.
pub fn category_questions(category: Category) -> &'static [&'static str] {
    match category {
        Category::Electrical => &[
            "هل يمكنك تحديد المكان الدقيق للمشكلة الكهربائية وتأثيرها على المرافق الأخرى؟",
            "هل تم عزل التيار الكهربائي عن المنطقة المتضررة؟",
            "هل هناك أي إصابات أو أضرار نتجت عن هذه المشكلة؟",
            "هل تم إبلاغ مسؤول الصيانة أو قسم السلامة بالمشكلة؟",
            "ما هي الخطوات الوقائية التي ستتخذ لمنع تكرار هذه المشكلة مستقبلاً؟",
            "هل هناك أجزاء أخرى من المبنى متأثرة بهذا العطل؟",
        ],
        Category::Incident => &[
            "هل نتج عن هذا الحادث أي إصابات أو أضرار، وما هي الخطوات التي تم اتخاذها؟",
            "هل تم توثيق الحادث وإبلاغ الجهات المعنية؟",
            "هل تم تفعيل نظام إنذار الحريق وإخلاء المبنى وفقاً لإجراءات السلامة؟",
            "ما هو السبب المحتمل لما حدث؟",
            "هل تم تقييم الأضرار المادية الناتجة؟",
            "ما هي الإجراءات التي يمكن اتخاذها لمنع وقوع حوادث مماثلة مستقبلاً؟",
        ],
        Category::Product => &[
            "ما هي المواصفات الكاملة لهذا المنتج (الأبعاد، الوزن، المميزات)؟",
            "ما هي استخدامات هذا المنتج الرئيسية والفرعية؟",
            "ما هو سعر المنتج وهل هناك بدائل له في حال عدم توفره؟",
            "أين يتوفر في المخزون ومن المسؤول عن طلبه؟",
        ],
        Category::Procedure => &[
            "ما هي الخطوات التفصيلية لهذا الإجراء بترتيب التنفيذ؟",
            "هل هناك متطلبات أو شروط مسبقة يجب توفرها قبل البدء؟",
            "هل هناك تحديات أو مشاكل شائعة قد تواجه الموظفين أثناء التنفيذ وكيفية التعامل معها؟",
            "ما هي المدة المتوقعة والموارد اللازمة لإتمامه؟",
        ],
        Category::Location => &[
            "ما هو العنوان الدقيق لهذا المكان وكيفية الوصول إليه؟",
            "هل هناك تصاريح خاصة أو متطلبات أمنية للدخول؟",
            "ما هي المرافق المتوفرة هناك؟",
            "هل هناك أوقات محددة للعمل أو الزيارة؟",
            "من المسؤول عن هذا الموقع وكيف يمكن التواصل معه؟",
        ],
        Category::Person => &[
            "ما هي معلومات الاتصال المباشرة بهذا الشخص (هاتف، بريد إلكتروني)؟",
            "ما هو دوره الرئيسي ومسؤولياته وفي أي قسم يعمل؟",
            "ما هي ساعات عمله أو مواعيد تواجده؟",
            "هل هناك بديل له في حالة عدم تواجده؟",
            "هل يملك صلاحيات خاصة أو خبرات محددة يمكن الاستفادة منها؟",
        ],
        Category::Vehicle => &[
            "ما هي المواصفات الدقيقة للسيارة (المحرك، السعة، إلخ)؟",
            "ما هي الحالة الفنية للسيارة وعدد الكيلومترات المقطوعة؟",
            "هل هناك رقم تواصل مع مالك السيارة أو المسؤول عنها؟",
            "ما هي الحمولة القصوى التي تستطيع نقلها؟",
        ],
        Category::Supplier => &[
            "ما هي معلومات الاتصال بهذا المورد؟ (رقم الهاتف، البريد الإلكتروني، العنوان)",
            "ما هي أوقات العمل وهل يقدم خدمة التوصيل؟",
            "ما هي أبرز المنتجات أو الخدمات التي يقدمها وهل هناك حد أدنى للطلب؟",
            "كيف كانت تجربة التعامل معه من حيث الجودة والالتزام بالمواعيد؟",
        ],
        Category::Equipment => &[
            "متى بدأ هذا العطل في الظهور؟",
            "هل تمت محاولة إصلاح العطل من قبل؟",
            "هل العطل يؤثر على سير العمل اليومي؟",
            "من هو المسؤول عن متابعة الصيانة والإصلاح؟",
            "ما هي القطع أو المواد المطلوبة للإصلاح؟",
            "ما هي المواصفات الفنية التفصيلية لهذه المعدة ومتطلبات تشغيلها؟",
        ],
        Category::Software => &[
            "ما هي متطلبات النظام اللازمة لتشغيل هذا البرنامج وإجراءات التثبيت؟",
            "هل هناك دليل استخدام أو فيديوهات تدريبية متاحة للموظفين الجدد؟",
            "من هو المسؤول عن الدعم الفني وكيفية التواصل معه عند وجود مشكلة؟",
            "ما هي الأقسام التي تستخدم هذا النظام حالياً؟",
        ],
        Category::General => GENERIC_QUESTIONS,
    }
}

/// Strip the quoting models like to wrap a single question in.
fn clean_question(reply: String) -> Result<String, CollaboratorError> {
    let question = reply
        .trim()
        .trim_matches(|c| matches!(c, '"' | '\'' | '«' | '»' | '“' | '”'))
        .trim();
    if question.is_empty() {
        return Err(CollaboratorError::Malformed("empty question".into()));
    }
    Ok(question.to_string())
}

/// Deterministic question for `draft`. Never empty.
pub fn fallback_question(
    draft: &KnowledgeDraft,
    threshold: f64,
    phrasing: &dyn PhrasingStrategy,
) -> String {
    let category = classify(&draft.context_text());
    let asked: Vec<&str> = draft.questions().collect();
    let unasked = |pool: &[&'static str]| -> Vec<&'static str> {
        pool.iter()
            .copied()
            .filter(|candidate| !asked.iter().any(|q| are_similar(candidate, q, threshold)))
            .collect()
    };

    let mut candidates = unasked(category_questions(category));
    if candidates.is_empty() && category != Category::General {
        candidates = unasked(GENERIC_QUESTIONS);
    }
    if candidates.is_empty() {
        candidates = GENERIC_QUESTIONS.to_vec();
    }

    choose(phrasing, &candidates).to_string()
}

impl Collector {
    /// Next follow-up question for `draft`. Never empty.
    pub async fn next_question(&self, draft: &KnowledgeDraft) -> String {
        let mut turns = vec![ChatMessage::user(format!(
            "المستخدم شارك المعلومات التالية: {}",
            draft.normalized_text
        ))];
        for turn in draft.answered_turns() {
            turns.push(ChatMessage::assistant(turn.question.as_str()));
            turns.push(ChatMessage::user(turn.answer.as_str()));
        }
        turns.push(ChatMessage::user(FINAL_INSTRUCTION));

        match self.ask(SYSTEM_PROMPT, &turns).await.and_then(clean_question) {
            Ok(question) => question,
            Err(e) => {
                warn!("Question generation falling back to templates: {}", e);
                fallback_question(draft, self.config().similarity_threshold, self.phrasing())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::{Author, Turn};
    use crate::phrasing::Rotating;
    use kmp_core::config::DEFAULT_SIMILARITY_THRESHOLD;

    fn draft(text: &str) -> KnowledgeDraft {
        KnowledgeDraft::new(text.into(), text.into(), Author::default())
    }

    #[test]
    fn test_pools_are_not_self_similar() {
        let categories = [
            Category::Electrical,
            Category::Incident,
            Category::Product,
            Category::Procedure,
            Category::Location,
            Category::Person,
            Category::Vehicle,
            Category::Supplier,
            Category::Equipment,
            Category::Software,
            Category::General,
        ];
        for category in categories {
            let pool = category_questions(category);
            for (i, a) in pool.iter().enumerate() {
                for b in &pool[i + 1..] {
                    assert!(
                        !are_similar(a, b, DEFAULT_SIMILARITY_THRESHOLD),
                        "{}: {} ~ {}",
                        category,
                        a,
                        b
                    );
                }
            }
        }
    }

    #[test]
    fn test_equipment_fallback() {
        let d = draft("يوجد عطل في المصعد");
        let q = fallback_question(&d, DEFAULT_SIMILARITY_THRESHOLD, &Rotating::new());
        assert!(category_questions(Category::Equipment).contains(&q.as_str()));
    }

    #[test]
    fn test_general_uses_generic_pool() {
        let d = draft("مرحبا بكم");
        let q = fallback_question(&d, DEFAULT_SIMILARITY_THRESHOLD, &Rotating::new());
        assert!(GENERIC_QUESTIONS.contains(&q.as_str()));
    }

    #[test]
    fn test_no_repeat_until_pool_exhausted() {
        let mut d = draft("يوجد عطل في المصعد");
        let rotating = Rotating::new();
        let pool = category_questions(Category::Equipment);

        for _ in 0..pool.len() {
            let q = fallback_question(&d, DEFAULT_SIMILARITY_THRESHOLD, &rotating);
            assert!(pool.contains(&q.as_str()));
            assert!(!d.questions().any(|asked| asked == q));
            d.turns.push(Turn {
                question: q,
                answer: String::new(),
            });
        }

        // Equipment pool used up: generic pool takes over.
        let q = fallback_question(&d, DEFAULT_SIMILARITY_THRESHOLD, &rotating);
        assert!(GENERIC_QUESTIONS.contains(&q.as_str()));
    }

    #[test]
    fn test_exhausted_generic_pool_still_answers() {
        let mut d = draft("مرحبا");
        for q in GENERIC_QUESTIONS {
            d.turns.push(Turn::pending(*q));
        }
        let q = fallback_question(&d, DEFAULT_SIMILARITY_THRESHOLD, &Rotating::new());
        assert!(!q.is_empty());
    }

    #[test]
    fn test_similar_question_is_skipped() {
        let mut d = draft("حدث تماس كهربائي في اللوحة");
        d.turns.push(Turn::pending("هل تم تحديد مصدر المشكلة الكهربائية؟"));
        let rotating = Rotating::new();
        // First electrical candidate is similar to the asked question.
        let q = fallback_question(&d, DEFAULT_SIMILARITY_THRESHOLD, &rotating);
        assert_ne!(q, category_questions(Category::Electrical)[0]);
    }

    #[test]
    fn test_clean_question() {
        assert_eq!(
            clean_question("  \"ما السبب؟\" ".into()).unwrap(),
            "ما السبب؟"
        );
        assert!(clean_question(" «» ".into()).is_err());
    }
}
