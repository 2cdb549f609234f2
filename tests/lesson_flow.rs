//! End-to-end dialogue and analysis scenarios against the full engine.

use tutor_engine::engine::phases::LessonPhase;
use tutor_engine::engine::types::{Interaction, RecommendationKind};
use tutor_engine::engine::LessonPlan;
use tutor_engine::{TutorConfig, TutorEngine};

fn engine() -> TutorEngine {
    TutorEngine::in_memory(TutorConfig::default())
}

fn plan() -> LessonPlan {
    LessonPlan::new("kesirler", 3, "matematik")
}

#[tokio::test]
async fn full_lesson_reaches_complete_with_expected_score() {
    let engine = engine();
    let turn = engine.start_lesson("s1", "Ayşe", plan()).await.unwrap();
    assert_eq!(turn.phase, LessonPhase::Greeting);

    let turn = engine.lesson_reply("s1", "evet").await.unwrap();
    assert_eq!(turn.phase, LessonPhase::Introduction);
    assert!(turn.auto_advance_after_ms.is_some());

    let turn = engine.lesson_tick("s1").await.unwrap();
    assert_eq!(turn.phase, LessonPhase::Explanation);

    let turn = engine.lesson_reply("s1", "anladım").await.unwrap();
    assert_eq!(turn.phase, LessonPhase::Examples);

    let turn = engine.lesson_reply("s1", "evet devam").await.unwrap();
    assert_eq!(turn.phase, LessonPhase::Check);

    // One wrong CHECK answer, then the right one.
    let turn = engine.lesson_reply("s1", "c").await.unwrap();
    assert_eq!(turn.phase, LessonPhase::Check);
    let turn = engine.lesson_reply("s1", "a").await.unwrap();
    assert_eq!(turn.phase, LessonPhase::Quiz);

    // Quiz accepts the key regardless of case and whitespace.
    let turn = engine.lesson_reply("s1", " B ").await.unwrap();
    assert_eq!(turn.phase, LessonPhase::Feedback);

    let turn = engine.lesson_tick("s1").await.unwrap();
    assert_eq!(turn.phase, LessonPhase::Complete);
    let score = turn.final_score.expect("terminal turn carries the score");
    assert!((score - 200.0 / 3.0).abs() < 0.1);

    // The ephemeral session is gone once the lesson completes.
    assert!(engine.active_session("s1").await.is_none());
}

#[tokio::test]
async fn confusion_holds_explanation_until_confirmed() {
    let engine = engine();
    engine.start_lesson("s1", "Ayşe", plan()).await.unwrap();
    engine.lesson_reply("s1", "evet").await.unwrap();
    engine.lesson_tick("s1").await.unwrap();
    assert_eq!(
        engine.active_session("s1").await.unwrap().phase,
        LessonPhase::Explanation
    );

    engine.lesson_reply("s1", "anlamadım").await.unwrap();
    let session = engine.active_session("s1").await.unwrap();
    assert_eq!(session.phase, LessonPhase::Explanation);
    assert!(session.awaiting_reteach_confirmation);

    // Free text the script cannot classify never errors and never moves.
    engine.lesson_reply("s1", "dün maç vardı").await.unwrap();
    assert_eq!(
        engine.active_session("s1").await.unwrap().phase,
        LessonPhase::Explanation
    );

    engine.lesson_reply("s1", "anladım").await.unwrap();
    assert_eq!(
        engine.active_session("s1").await.unwrap().phase,
        LessonPhase::Examples
    );
}

#[tokio::test]
async fn reply_without_session_is_an_error() {
    let engine = engine();
    assert!(engine.lesson_reply("kimse", "merhaba").await.is_err());
}

#[tokio::test]
async fn slow_gateway_for_one_student_does_not_block_others() {
    // A server that accepts connections and never answers, so the gateway
    // call for student "a" stays in flight until its timeout.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((socket, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let _hold = socket;
                tokio::time::sleep(std::time::Duration::from_secs(30)).await;
            });
        }
    });

    let tmp = tempfile::tempdir().unwrap();
    let mut config = TutorConfig::default();
    config.persistence.data_dir = tmp.path().display().to_string();
    config.gateway.endpoint = format!("http://{addr}/v1/tutor");
    config.gateway.timeout_ms = 3_000;
    config.gateway.max_retries = 0;
    let engine = std::sync::Arc::new(TutorEngine::new(config));

    engine.start_lesson("a", "Ali", plan()).await.unwrap();
    engine.start_lesson("b", "Banu", plan()).await.unwrap();

    // GREETING -> INTRODUCTION asks the gateway for wording, so this turn
    // hangs on the unresponsive server until the timeout, then falls back.
    let stalled = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.lesson_reply("a", "evet").await })
    };
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    // While "a" is mid-turn, other students' calls must complete promptly.
    let started = std::time::Instant::now();
    assert!(engine.active_session("b").await.is_some());
    engine.start_lesson("c", "Can", plan()).await.unwrap();
    assert!(started.elapsed() < std::time::Duration::from_millis(1500));

    // The stalled turn still lands on the local template and advances.
    let turn = stalled.await.unwrap().unwrap();
    assert_eq!(turn.phase, LessonPhase::Introduction);
    assert!(engine.active_session("a").await.is_some());
}

#[tokio::test]
async fn mining_interval_floor_applies_per_interaction() {
    let mut config = TutorConfig::default();
    config.mining.mining_interval = 0;
    let engine = TutorEngine::in_memory(config);
    let outcome = engine
        .process_interaction(Interaction::new("s1", "merhaba"))
        .await
        .unwrap();
    // Interval 0 degrades to "every interaction" instead of a panic.
    assert!(outcome.patterns_refreshed);
}

#[tokio::test]
async fn sustained_frustration_surfaces_support_and_transition() {
    let engine = engine();

    for _ in 0..5 {
        let interaction = Interaction::new("s1", "harika çok güzel gidiyor 😊");
        engine.process_interaction(interaction).await.unwrap();
    }

    let mut last = None;
    for _ in 0..5 {
        let interaction = Interaction::new("s1", "bıktım artık yapamıyorum 😤");
        last = Some(engine.process_interaction(interaction).await.unwrap());
    }
    let outcome = last.unwrap();

    assert!(outcome
        .recommendations
        .iter()
        .any(|r| r.kind == RecommendationKind::EmotionalSupport));

    // The tenth interaction triggered a mining pass over the window.
    assert!(outcome.patterns_refreshed);
    let patterns = engine.patterns();
    assert!(patterns
        .emotional_transitions
        .transitions
        .keys()
        .any(|k| k.ends_with("_to_frustrated")));
}

#[tokio::test]
async fn scores_stay_in_bounds_across_arbitrary_input() {
    let engine = engine();
    let long = "uzun ".repeat(500);
    let messages = [
        "",
        "???",
        "😊😊😊😊😊😊😊😊",
        "anladım anlamadım zor kolay",
        long.as_str(),
    ];
    for (i, message) in messages.iter().enumerate() {
        let mut interaction = Interaction::new(format!("s{i}"), *message);
        interaction.response_time_seconds = Some(i as f64 * 100.0);
        interaction.hints_used = Some(i as i32 * 4);
        let outcome = engine.process_interaction(interaction).await.unwrap();
        let comprehension = outcome.analysis.comprehension.score;
        let engagement = outcome.analysis.engagement.score;
        assert!((0.0..=100.0).contains(&comprehension));
        assert!((0.0..=100.0).contains(&engagement));
    }
}

#[tokio::test]
async fn stale_sessions_are_discarded_profiles_kept() {
    let mut config = TutorConfig::default();
    config.session_max_idle_ms = 0;
    let engine = TutorEngine::in_memory(config);

    engine.start_lesson("s1", "Ayşe", plan()).await.unwrap();
    engine
        .process_interaction(Interaction::new("s1", "merhaba"))
        .await
        .unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let removed = engine.remove_stale_sessions().await;
    assert_eq!(removed, 1);
    assert!(engine.active_session("s1").await.is_none());
    assert_eq!(engine.profile("s1").await.interaction_count, 1);
}
