//! Deterministic pattern responder used when no provider is configured.
//!
//! Classifies the text as a greeting, question, help request, or thanks and
//! answers from a fixed set of replies per language. The reply is picked by
//! input length, so identical input always yields the identical reply.

use parley_types::inference::{InferenceError, InferenceRequest};
use parley_types::language::Language;

use super::backend::InferenceBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Greeting,
    Question,
    Help,
    Thanks,
}

/// Checked in order; the first category with a hit wins.
const EN_PATTERNS: &[(Category, &[&str])] = &[
    (
        Category::Greeting,
        &["hello", "hi", "hey", "good morning", "good afternoon", "good evening"],
    ),
    (
        Category::Question,
        &["what", "how", "why", "when", "where", "who", "?"],
    ),
    (Category::Help, &["help", "assist", "support", "guide"]),
    (Category::Thanks, &["thank", "thanks", "appreciate"]),
];

const SI_PATTERNS: &[(Category, &[&str])] = &[
    (
        Category::Greeting,
        &["හලෝ", "ආයුබෝවන්", "හායි", "සුභ උදෑසනක්", "සුභ දවසක්", "සුභ සන්ධ්‍යාවක්"],
    ),
    (
        Category::Question,
        &["මොකක්ද", "කොහොමද", "ඇයි", "කවදාද", "කොහේද", "කවුද", "?"],
    ),
    (Category::Help, &["උදව්", "සහාය", "මාර්ගෝපදේශ"]),
    (Category::Thanks, &["ස්තූති", "ස්තුතියි", "අගය කරනවා"]),
];

#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineResponder;

impl OfflineResponder {
    pub fn new() -> Self {
        Self
    }

    /// Produce the reply for `request` without any IO.
    pub fn respond(&self, request: &InferenceRequest) -> String {
        let input = request.text.trim();
        let category = classify(input, request.language);
        let replies = match request.language {
            Language::En => english_replies(category, input, request.web_search_enabled),
            Language::Si => sinhala_replies(category, input, request.web_search_enabled),
        };
        let index = input.chars().count() % replies.len();
        replies.into_iter().nth(index).unwrap_or_default()
    }
}

fn classify(input: &str, language: Language) -> Option<Category> {
    let lowered = input.to_lowercase();
    let words: Vec<&str> = lowered
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| c.is_ascii_punctuation()))
        .collect();

    let table = match language {
        Language::En => EN_PATTERNS,
        Language::Si => SI_PATTERNS,
    };

    table.iter().find_map(|(category, patterns)| {
        let hit = patterns.iter().any(|p| match language {
            // Whole-word match so "hi" does not fire inside "this".
            Language::En if p.chars().all(|c| c.is_ascii_alphabetic()) => {
                words.iter().any(|w| w == p)
            }
            _ => lowered.contains(p),
        });
        hit.then_some(*category)
    })
}

fn pick(web: bool, online: &str, offline: &str) -> String {
    let text = if web { online } else { offline };
    text.to_string()
}

fn english_replies(category: Option<Category>, input: &str, web: bool) -> Vec<String> {
    match category {
        Some(Category::Greeting) => vec![
            format!(
                "Hello! I'm here to help you with any questions you might have. {}",
                pick(
                    web,
                    "I have web search capabilities for the latest information.",
                    "I can assist you based on my training data."
                )
            ),
            format!(
                "Hi there! How can I assist you today? {}",
                pick(
                    web,
                    "I can search the web for current information if needed.",
                    "I'm ready to help with various topics."
                )
            ),
        ],
        Some(Category::Question) => vec![
            format!(
                "That's an interesting question about '{input}'. {} I can tell you that this topic often involves multiple perspectives and considerations.",
                pick(
                    web,
                    "While I can search for current information,",
                    "While I'm currently running in offline mode,"
                )
            ),
            format!(
                "Regarding '{input}', this is the kind of question that benefits from careful consideration. {} to give you a comprehensive answer.",
                pick(
                    web,
                    "I can search for the latest information",
                    "I can provide insights based on established knowledge"
                )
            ),
        ],
        Some(Category::Help) => vec![
            format!(
                "I'm here to help! {} I can still provide guidance and suggestions on most topics.",
                pick(
                    web,
                    "With web search capabilities,",
                    "While I'm currently in offline mode,"
                )
            ),
            format!(
                "Let me help you with that! {} but I can still provide useful information and guidance.",
                pick(
                    web,
                    "I'm operating with web search enabled,",
                    "I'm operating in offline mode,"
                )
            ),
        ],
        Some(Category::Thanks) => vec![
            "You're very welcome! I'm glad I could help.".to_string(),
            "Happy to assist! Feel free to ask if you have more questions.".to_string(),
        ],
        None => vec![
            format!(
                "I understand you're interested in '{input}'. {} I find this to be an engaging topic that often has multiple dimensions worth exploring.",
                pick(
                    web,
                    "With web search capabilities,",
                    "While I'm currently in offline mode,"
                )
            ),
            format!(
                "I see you're asking about '{input}'. This is an interesting area, and {} I can share that questions like yours often open up fascinating discussions about the topic.",
                pick(web, "with web search enabled,", "while I'm in offline mode,")
            ),
        ],
    }
}

fn sinhala_replies(category: Option<Category>, input: &str, web: bool) -> Vec<String> {
    match category {
        Some(Category::Greeting) => vec![
            format!(
                "ආයුබෝවන්! ඔබට ඇති ඕනෑම ප්‍රශ්නයකට උදව් කිරීමට මම මෙහි සිටිමි. {}",
                pick(
                    web,
                    "මට නවතම තොරතුරු සඳහා වෙබ් සෙවුම් හැකියාවන් ඇත.",
                    "මට මගේ පුහුණු දත්ත මත පදනම්ව ඔබට උදව් කළ හැකිය."
                )
            ),
            format!(
                "හලෝ! අද මට ඔබට කෙසේ උදව් කළ හැකිද? {}",
                pick(
                    web,
                    "අවශ්‍ය නම් මට වර්තමාන තොරතුරු සඳහා වෙබය සෙවිය හැකිය.",
                    "මම විවිධ විෂයන් සමඟ උදව් කිරීමට සූදානම්."
                )
            ),
        ],
        Some(Category::Question) => vec![
            format!(
                "'{input}' ගැන ඔබේ ප්‍රශ්නය සිත්ගන්නා සුළුයි. {} මෙම විෂය බොහෝ විට විවිධ දෘෂ්ටිකෝණ සහ සලකා බැලීම් ඇතුළත් කරයි.",
                pick(
                    web,
                    "මට වර්තමාන තොරතුරු සෙවිය හැකි අතර,",
                    "මම දැනට නොබැඳි ප්‍රකාරයේ ක්‍රියාත්මක වන අතර,"
                )
            ),
            format!(
                "ඔබ '{input}' ගැන ප්‍රශ්න කර ඇත. {} මෙය බොහෝ අය සිත්ගන්නා සුළු විෂයක් වන අතර, එය තේරුම් ගැනීමට සාමාන්‍යයෙන් ක්‍රම කිහිපයක් තිබේ.",
                pick(
                    web,
                    "වෙබ් සෙවුම් හැකියාවන් සමඟ,",
                    "තථ්‍ය කාලීන දත්ත නොමැතිව වුවද,"
                )
            ),
        ],
        Some(Category::Help) => vec![
            format!(
                "මම උදව් කිරීමට මෙහි සිටිමි! {} මට තවමත් බොහෝ විෂයන් පිළිබඳ මාර්ගෝපදේශ සහ යෝජනා ලබා දිය හැකිය.",
                pick(
                    web,
                    "වෙබ් සෙවුම් හැකියාවන් සමඟ,",
                    "මම දැනට නොබැඳි ප්‍රකාරයේ සිටින අතර,"
                )
            ),
            format!(
                "ඔබට උදව් කිරීමට මම සතුටු වෙමි! {} මට බොහෝ විෂයන් පිළිබඳ අවබෝධය සහ තොරතුරු ලබා දිය හැකිය.",
                pick(
                    web,
                    "අන්තර්ජාල ප්‍රවේශය සමඟ වුවද,",
                    "අන්තර්ජාල ප්‍රවේශයක් නොමැතිව වුවද,"
                )
            ),
        ],
        Some(Category::Thanks) => vec![
            "ඔබට ගොඩක් සාදරයෙන්! මට උදව් කිරීමට හැකි වීම ගැන සතුටුයි.".to_string(),
            "උදව් කිරීමට සතුටුයි! තවත් ප්‍රශ්න තිබේ නම් නිදහසේ අසන්න.".to_string(),
        ],
        None => vec![
            format!(
                "'{input}' ගැන ඔබ උනන්දු වන බව මට තේරෙනවා. {} මෙය ගවේෂණය කිරීමට වටින බහුවිධ මානයන් ඇති සිත්ගන්නා සුළු විෂයක් බව මට පෙනේ.",
                pick(
                    web,
                    "වෙබ් සෙවුම් හැකියාවන් සමඟ,",
                    "මම දැනට නොබැඳි ප්‍රකාරයේ සිටින අතර,"
                )
            ),
            format!(
                "ඔබ '{input}' ගැන අසන බව මට පෙනේ. මෙය සිත්ගන්නා සුළු ක්ෂේත්‍රයක් වන අතර, {} ඔබේ වැනි ප්‍රශ්න බොහෝ විට විෂය පිළිබඳ සිත්ගන්නා සුළු සාකච්ඡා විවෘත කරන බව මට කිව හැකිය.",
                pick(
                    web,
                    "වෙබ් සෙවුම සක්‍රීය කර ඇති අතර,",
                    "මම නොබැඳි ප්‍රකාරයේ සිටින අතර,"
                )
            ),
        ],
    }
}

impl InferenceBackend for OfflineResponder {
    fn name(&self) -> &str {
        "offline"
    }

    async fn generate(&self, request: &InferenceRequest) -> Result<String, InferenceError> {
        Ok(self.respond(request))
    }
}
