//! The fixed lesson phase order and the per-phase dialogue script.
//!
//! Message templates are the deterministic local source; the conductor may
//! replace INTRODUCTION/EXPLANATION bodies with gateway text, but the
//! transition metadata here is authoritative either way.

use serde::{Deserialize, Serialize};

use crate::engine::curriculum::LessonPlan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LessonPhase {
    Greeting,
    Introduction,
    Explanation,
    Examples,
    Check,
    Quiz,
    Feedback,
    Complete,
}

impl LessonPhase {
    pub const ORDER: [LessonPhase; 8] = [
        LessonPhase::Greeting,
        LessonPhase::Introduction,
        LessonPhase::Explanation,
        LessonPhase::Examples,
        LessonPhase::Check,
        LessonPhase::Quiz,
        LessonPhase::Feedback,
        LessonPhase::Complete,
    ];

    pub fn index(&self) -> usize {
        Self::ORDER.iter().position(|p| p == self).unwrap_or(0)
    }

    pub fn next(&self) -> LessonPhase {
        let idx = self.index();
        *Self::ORDER.get(idx + 1).unwrap_or(&LessonPhase::Complete)
    }

    pub fn is_terminal(&self) -> bool {
        *self == LessonPhase::Complete
    }

    pub fn requires_response(&self) -> bool {
        !matches!(
            self,
            LessonPhase::Introduction | LessonPhase::Feedback | LessonPhase::Complete
        )
    }

    /// Delay before a no-reply phase moves on, driven by the embedding
    /// application's scheduler.
    pub fn auto_advance_delay_ms(&self) -> Option<u64> {
        match self {
            LessonPhase::Introduction => Some(4_000),
            LessonPhase::Feedback => Some(3_000),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::Introduction => "introduction",
            Self::Explanation => "explanation",
            Self::Examples => "examples",
            Self::Check => "check",
            Self::Quiz => "quiz",
            Self::Feedback => "feedback",
            Self::Complete => "complete",
        }
    }
}

/// Answer key plus the rationale quoted back on a wrong attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseQuestion {
    pub prompt: String,
    pub key: String,
    pub explanation: String,
}

pub fn question_for(phase: LessonPhase, plan: &LessonPlan) -> Option<PhaseQuestion> {
    match phase {
        LessonPhase::Check => Some(PhaseQuestion {
            prompt: format!(
                "Küçük bir kontrol: {} konusunda anlattığım ilk kural hangisiydi?\n\
                 a) Temel tanım\nb) İleri uygulama\nc) Hiçbiri\nCevabını harfle yaz.",
                plan.topic
            ),
            key: "a".to_string(),
            explanation: "Önce temel tanımla başladık; uygulamalar ondan sonra geldi."
                .to_string(),
        }),
        LessonPhase::Quiz => Some(PhaseQuestion {
            prompt: format!(
                "Quiz zamanı! {} ile ilgili örneklerden hangisi doğruydu?\n\
                 a) Birinci örnek yanlıştı\nb) İkinci örnek doğruydu\nc) İkisi de yanlıştı\n\
                 Cevabını harfle yaz.",
                plan.topic
            ),
            key: "b".to_string(),
            explanation: "İkinci örnek kuralı doğru uyguluyordu; birincisi kasıtlı hatalıydı."
                .to_string(),
        }),
        _ => None,
    }
}

/// Deterministic local template for a phase's message.
pub fn phase_message(phase: LessonPhase, plan: &LessonPlan, student_name: &str) -> String {
    match phase {
        LessonPhase::Greeting => format!(
            "Merhaba {student_name}! Bugün {} dersinde {} konusunu çalışacağız. Hazır mısın?",
            plan.subject, plan.topic
        ),
        LessonPhase::Introduction => format!(
            "Harika! {} konusu günlük hayatta çok işine yarayacak. Önce ne olduğuna \
             kısaca bakalım.",
            plan.topic
        ),
        LessonPhase::Explanation => format!(
            "{} şöyle çalışır: temel kuralı adım adım uyguluyoruz. Buraya kadar anladın mı?",
            plan.topic
        ),
        LessonPhase::Examples => "Şimdi iki örnek çözelim. Birinci örnekte kural bilerek \
             yanlış uygulanmış, ikincisinde doğru. Örnekleri inceledin mi, devam edelim mi?"
            .to_string(),
        LessonPhase::Check | LessonPhase::Quiz => question_for(phase, plan)
            .map(|q| q.prompt)
            .unwrap_or_default(),
        LessonPhase::Feedback => format!(
            "Bugün {} konusunda güzel ilerledin {student_name}. Sonucunu hesaplıyorum...",
            plan.topic
        ),
        LessonPhase::Complete => format!("{} dersimiz tamamlandı. Tebrikler {student_name}!", plan.topic),
    }
}

/// Simplified alternate explanation used by the reteach sub-branch.
pub fn reteach_message(plan: &LessonPlan) -> String {
    format!(
        "Sorun değil, daha basit anlatayım: {} aslında tek bir fikre dayanıyor. \
         Küçük bir örnekle düşün ve kuralı ona uygula. Şimdi daha net mi?",
        plan.topic
    )
}

/// Generic re-prompt when a reply matches no accepted pattern.
pub fn orientation_message(phase: LessonPhase, plan: &LessonPlan) -> String {
    match phase {
        LessonPhase::Check | LessonPhase::Quiz => {
            "Cevabını a, b veya c harflerinden biriyle yazar mısın?".to_string()
        }
        _ => format!(
            "Şu an {} konusundayız. Anladıysan \"anladım\", takıldıysan \"anlamadım\" \
             yazabilirsin.",
            plan.topic
        ),
    }
}
