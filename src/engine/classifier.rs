//! Keyword and symbol rule tables behind a small classifier seam.
//!
//! The matching is deliberately ad hoc substring containment, not NLP; the
//! tables live here so scoring code stays free of literals and the rules can
//! be swapped or tested in isolation.

use crate::engine::types::{Emotion, LearningStyle};

/// Classifies free text into a category, or nothing when no rule matches.
pub trait TextClassifier {
    type Category;

    fn classify(&self, text: &str) -> Option<Self::Category>;
}

#[derive(Debug, Clone, Copy)]
pub struct KeywordSet {
    pub keywords: &'static [&'static str],
    pub symbols: &'static [&'static str],
}

impl KeywordSet {
    /// Weighted match sum: each keyword hit adds `keyword_weight`, each
    /// symbol hit the (larger) `symbol_weight`.
    pub fn score(&self, text_lower: &str, keyword_weight: f64, symbol_weight: f64) -> f64 {
        let mut score = 0.0;
        for keyword in self.keywords {
            if text_lower.contains(keyword) {
                score += keyword_weight;
            }
        }
        for symbol in self.symbols {
            if text_lower.contains(symbol) {
                score += symbol_weight;
            }
        }
        score
    }

    pub fn matches(&self, text_lower: &str) -> bool {
        self.keywords.iter().any(|k| text_lower.contains(k))
            || self.symbols.iter().any(|s| text_lower.contains(s))
    }
}

pub const fn emotion_keywords(emotion: Emotion) -> KeywordSet {
    match emotion {
        Emotion::Happy => KeywordSet {
            keywords: &["mutlu", "güzel", "iyi", "harika", "sevindim", "happy", "great", "nice"],
            symbols: &["😊", "😄", ":)", ":d"],
        },
        Emotion::Excited => KeywordSet {
            keywords: &["heyecan", "süper", "muhteşem", "bayıldım", "excited", "awesome", "wow"],
            symbols: &["🎉", "😍", "!!", "!?"],
        },
        Emotion::Neutral => KeywordSet {
            keywords: &["tamam", "peki", "evet", "ok", "okay"],
            symbols: &[],
        },
        Emotion::Confused => KeywordSet {
            keywords: &[
                "anlamadım", "karıştırdım", "emin değilim", "nasıl yani", "confused",
                "don't understand", "not sure",
            ],
            symbols: &["🤔", "😕", "??"],
        },
        Emotion::Frustrated => KeywordSet {
            keywords: &[
                "bıktım", "sinir", "yapamıyorum", "zor geliyor", "yoruldum", "frustrated",
                "can't do", "give up", "annoyed",
            ],
            symbols: &["😠", "😤", ":("],
        },
        Emotion::Bored => KeywordSet {
            keywords: &["sıkıldım", "sıkıcı", "boring", "bored"],
            symbols: &["😴", "🥱"],
        },
    }
}

/// Symbols treated as expressive for engagement scoring.
pub const EXPRESSIVE_SYMBOLS: &[&str] = &[
    "!", "😊", "😄", "😍", "🎉", "🤔", "😕", "😠", "😤", "😴", ":)", ":(", ":d",
];

pub fn has_expressive_symbol(text_lower: &str) -> bool {
    EXPRESSIVE_SYMBOLS.iter().any(|s| text_lower.contains(s))
}

/// Phrase markers that shift the comprehension score.
pub const HIGH_COMPREHENSION_MARKERS: KeywordSet = KeywordSet {
    keywords: &[
        "anladım", "çok kolay", "biliyorum", "tabii ki", "elbette", "got it", "i understand",
        "easy",
    ],
    symbols: &[],
};

pub const LOW_COMPREHENSION_MARKERS: KeywordSet = KeywordSet {
    keywords: &[
        "anlamadım", "bilmiyorum", "zor", "karışık", "emin değilim", "don't know",
        "don't understand", "hard",
    ],
    symbols: &[],
};

/// Classification of a dialogue reply against the phase script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyClass {
    /// Understood / ready markers; the lesson advances.
    Positive,
    /// Confusion markers; the conductor reteaches instead of advancing.
    Negative,
}

pub struct ReplyClassifier;

impl TextClassifier for ReplyClassifier {
    type Category = ReplyClass;

    fn classify(&self, text: &str) -> Option<ReplyClass> {
        let lower = text.to_lowercase();
        // Negative first: confusion markers win over an accidental positive
        // hit in the same reply ("evet ama anlamadım").
        if NEGATIVE_REPLY.matches(&lower) {
            return Some(ReplyClass::Negative);
        }
        if POSITIVE_REPLY.matches(&lower) {
            return Some(ReplyClass::Positive);
        }
        None
    }
}

pub const POSITIVE_REPLY: KeywordSet = KeywordSet {
    keywords: &[
        "anladım", "evet", "tamam", "hazırım", "devam", "olur", "yes", "ready", "got it", "okay",
    ],
    symbols: &["👍"],
};

pub const NEGATIVE_REPLY: KeywordSet = KeywordSet {
    keywords: &[
        "anlamadım", "anlayamadım", "hayır", "tekrar", "bir daha", "emin değilim",
        "again", "don't understand", "not sure",
    ],
    symbols: &["👎"],
};

pub const fn style_keywords(style: LearningStyle) -> KeywordSet {
    match style {
        LearningStyle::Visual => KeywordSet {
            keywords: &[
                "görsel", "resim", "şekil", "grafik", "video", "göster", "bak", "picture",
                "diagram", "see",
            ],
            symbols: &[],
        },
        LearningStyle::Auditory => KeywordSet {
            keywords: &[
                "dinle", "anlat", "söyle", "ses", "duydum", "konuş", "listen", "hear", "tell",
            ],
            symbols: &[],
        },
        LearningStyle::Kinesthetic => KeywordSet {
            keywords: &[
                "dene", "yap", "uygula", "pratik", "oyna", "deney", "try", "practice", "do it",
                "hands",
            ],
            symbols: &[],
        },
        LearningStyle::Reading => KeywordSet {
            keywords: &[
                "oku", "yaz", "not", "metin", "kitap", "örnek yaz", "read", "write", "text",
            ],
            symbols: &[],
        },
    }
}

/// Canned remediation suggestions keyed by substrings of the misconception's
/// common wording.
pub fn remediation_for(common_words: &[String]) -> String {
    let joined = common_words.join(" ").to_lowercase();
    if joined.contains("unutuyor") || joined.contains("unuttum") || joined.contains("forget") {
        "Tekrar sıklığını artır: aynı konuyu kısa aralıklarla yeniden sor.".to_string()
    } else if joined.contains("karıştır") || joined.contains("confus") {
        "Karşılaştırmalı örnekler ver: karıştırılan kavramları yan yana göster.".to_string()
    } else if joined.contains("işlem") || joined.contains("hesap") || joined.contains("calc") {
        "Adım adım çözüm iste: her işlemi tek tek kontrol ettir.".to_string()
    } else {
        "Temel kavramları yeniden anlat ve basit örneklerle pekiştir.".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_wins_over_positive_substring() {
        let classifier = ReplyClassifier;
        assert_eq!(classifier.classify("anlamadım"), Some(ReplyClass::Negative));
        assert_eq!(classifier.classify("Anladım!"), Some(ReplyClass::Positive));
    }

    #[test]
    fn unrecognized_reply_is_none() {
        let classifier = ReplyClassifier;
        assert_eq!(classifier.classify("kedim kayboldu"), None);
    }

    #[test]
    fn emotion_symbol_weighs_more_than_keyword() {
        let set = emotion_keywords(Emotion::Happy);
        let keyword_only = set.score("bugün çok mutlu hissediyorum", 2.0, 3.0);
        let symbol_only = set.score("😊", 2.0, 3.0);
        assert!(symbol_only > keyword_only);
    }

    #[test]
    fn remediation_substring_rules() {
        let forgot = vec!["unutuyorum".to_string()];
        assert!(remediation_for(&forgot).contains("Tekrar"));
        let mixed = vec!["karıştırıyorum".to_string()];
        assert!(remediation_for(&mixed).contains("Karşılaştırmalı"));
        let other = vec!["bilinmeyen".to_string()];
        assert!(remediation_for(&other).contains("Temel"));
    }
}
