use quiz_core::model::{
    AnswerDraft, CategoryId, Difficulty, QuestionId, QuestionWithAnswers, SelectionScope, UserId,
    UserProfile, ValidatedQuestion,
};
use quiz_core::time::fixed_now;
use storage::repository::{
    AnswerSubmission, CategoryRepository, ChatHistoryRepository, ChatMessage, ChatRole,
    LearningRecord, ProgressRepository, QuestionRepository, StorageError, UserRepository,
};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn question(category_id: CategoryId, text: &str) -> ValidatedQuestion {
    ValidatedQuestion {
        category_id,
        text: text.into(),
        difficulty: Difficulty::Intermediate,
        explanation: Some(format!("why {text}")),
        answers: vec![
            AnswerDraft::new("right", true),
            AnswerDraft::new("wrong", false),
            AnswerDraft::new("also wrong", false),
        ],
    }
}

fn submission(user: UserId, q: &QuestionWithAnswers, correct: bool) -> AnswerSubmission {
    let answer = q.answers.iter().find(|a| a.is_correct == correct).unwrap();
    AnswerSubmission {
        user_id: user,
        question_id: q.id(),
        answer_id: answer.id,
        is_correct: correct,
        answered_at: fixed_now(),
    }
}

async fn register(repo: &SqliteRepository, id: u64) -> UserId {
    let user = UserId::new(id);
    repo.register_user(&UserProfile::new(user).with_username("learner"), fixed_now())
        .await
        .unwrap();
    user
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let repo = connect("memdb_migrate_twice").await;
    repo.migrate().await.expect("second migrate");
    assert!(repo.list_categories().await.unwrap().is_empty());
}

#[tokio::test]
async fn question_round_trips_with_answers() {
    let repo = connect("memdb_question_roundtrip").await;
    let category = repo
        .upsert_category_by_name("Grammar", fixed_now())
        .await
        .unwrap();
    let id = repo
        .insert_question(&question(category, "Q1"), fixed_now())
        .await
        .unwrap();

    let stored = repo.get_question(id).await.unwrap();
    assert_eq!(stored.question.text, "Q1");
    assert_eq!(stored.question.difficulty, Difficulty::Intermediate);
    assert_eq!(stored.answers.len(), 3);
    assert_eq!(stored.correct_answer().unwrap().text, "right");

    let mut edited = question(category, "Q1 edited");
    edited.answers = vec![AnswerDraft::new("no", false), AnswerDraft::new("yes", true)];
    edited.explanation = None;
    repo.replace_question(id, &edited).await.unwrap();

    let replaced = repo.get_question(id).await.unwrap();
    assert_eq!(replaced.question.text, "Q1 edited");
    assert_eq!(replaced.question.explanation, None);
    assert_eq!(replaced.answers.len(), 2);
    assert_eq!(replaced.correct_answer().unwrap().text, "yes");
}

#[tokio::test]
async fn inserting_into_missing_category_is_not_found() {
    let repo = connect("memdb_missing_category").await;
    let err = repo
        .insert_question(&question(CategoryId::new(99), "Q"), fixed_now())
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn upsert_existing_category_returns_same_id() {
    let repo = connect("memdb_category_upsert").await;
    let first = repo
        .upsert_category_by_name("Vocabulary", fixed_now())
        .await
        .unwrap();
    let again = repo
        .upsert_category_by_name("Vocabulary", fixed_now())
        .await
        .unwrap();
    assert_eq!(first, again);
    assert_eq!(repo.list_categories().await.unwrap().len(), 1);
}

#[tokio::test]
async fn empty_category_yields_no_question() {
    let repo = connect("memdb_empty_category").await;
    let user = register(&repo, 1).await;
    let category = repo
        .upsert_category_by_name("Empty", fixed_now())
        .await
        .unwrap();

    let inactive = repo
        .insert_question(&question(category, "hidden"), fixed_now())
        .await
        .unwrap();
    repo.set_question_active(inactive, false).await.unwrap();

    let picked = repo
        .random_question(user, &SelectionScope::CategoryUnseen(category))
        .await
        .unwrap();
    assert!(picked.is_none());
}

#[tokio::test]
async fn learning_answer_is_counted_once() {
    let repo = connect("memdb_learning_once").await;
    let user = register(&repo, 7).await;
    let category = repo
        .upsert_category_by_name("Grammar", fixed_now())
        .await
        .unwrap();
    let id = repo
        .insert_question(&question(category, "Q1"), fixed_now())
        .await
        .unwrap();
    let q1 = repo.get_question(id).await.unwrap();

    assert_eq!(
        repo.record_learning_answer(&submission(user, &q1, false))
            .await
            .unwrap(),
        LearningRecord::Counted
    );
    assert_eq!(
        repo.record_learning_answer(&submission(user, &q1, false))
            .await
            .unwrap(),
        LearningRecord::RepeatIgnored
    );
    assert_eq!(
        repo.record_learning_answer(&submission(user, &q1, true))
            .await
            .unwrap(),
        LearningRecord::RepeatRecorded
    );
    assert_eq!(
        repo.record_learning_answer(&submission(user, &q1, true))
            .await
            .unwrap(),
        LearningRecord::RepeatRecorded
    );

    let stored = repo.get_user(user).await.unwrap();
    assert_eq!(stored.total_questions, 1);
    assert_eq!(stored.correct_answers, 0);

    let aggregate = repo
        .progress_for_category(user, category)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(aggregate.questions_answered, 1);
    assert_eq!(aggregate.correct_answers, 0);

    let events = repo.answer_events(user).await.unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(events.iter().filter(|e| e.counted).count(), 1);

    assert!(repo.has_answered_correctly(user, q1.id()).await.unwrap());
    assert!(
        repo.random_question(user, &SelectionScope::CategoryUnseen(category))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn unregistered_user_cannot_record_answers() {
    let repo = connect("memdb_unregistered").await;
    let category = repo
        .upsert_category_by_name("Grammar", fixed_now())
        .await
        .unwrap();
    let id = repo
        .insert_question(&question(category, "Q1"), fixed_now())
        .await
        .unwrap();
    let q1 = repo.get_question(id).await.unwrap();

    let err = repo
        .record_learning_answer(&submission(UserId::new(404), &q1, true))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn review_pool_drains_with_exclusions() {
    let repo = connect("memdb_review_drain").await;
    let user = register(&repo, 3).await;
    let category = repo
        .upsert_category_by_name("Grammar", fixed_now())
        .await
        .unwrap();

    for text in ["Q1", "Q2", "Q3", "Q4", "Q5"] {
        repo.insert_question(&question(category, text), fixed_now())
            .await
            .unwrap();
    }
    let all = repo.list_questions(category).await.unwrap();
    let mut answered = Vec::new();
    for (index, q) in all.iter().enumerate() {
        if index % 2 == 0 {
            let full = repo.get_question(q.id).await.unwrap();
            repo.record_learning_answer(&submission(user, &full, index == 0))
                .await
                .unwrap();
            answered.push(q.id);
        }
    }
    assert_eq!(answered.len(), 3);

    let mut excluded: Vec<QuestionId> = Vec::new();
    for _ in 0..3 {
        let scope = SelectionScope::CategoryReview {
            category_id: category,
            excluded: excluded.clone(),
        };
        let picked = repo
            .random_question(user, &scope)
            .await
            .unwrap()
            .expect("review question");
        assert!(answered.contains(&picked.id()));
        assert!(!excluded.contains(&picked.id()));
        excluded.push(picked.id());
    }

    let scope = SelectionScope::CategoryReview {
        category_id: category,
        excluded,
    };
    assert!(repo.random_question(user, &scope).await.unwrap().is_none());
}

#[tokio::test]
async fn review_answers_leave_statistics_alone() {
    let repo = connect("memdb_review_isolation").await;
    let user = register(&repo, 5).await;
    let category = repo
        .upsert_category_by_name("Idioms", fixed_now())
        .await
        .unwrap();
    let id = repo
        .insert_question(&question(category, "Q"), fixed_now())
        .await
        .unwrap();
    let q = repo.get_question(id).await.unwrap();
    repo.record_learning_answer(&submission(user, &q, true))
        .await
        .unwrap();

    for correct in [true, false, false, true] {
        repo.record_review_answer(&submission(user, &q, correct))
            .await
            .unwrap();
    }

    let stored = repo.get_user(user).await.unwrap();
    assert_eq!((stored.total_questions, stored.correct_answers), (1, 1));
    let overall = repo.overall_progress(user).await.unwrap().unwrap();
    assert_eq!(overall.questions_answered, 1);
    assert_eq!(overall.accuracy, 100.0);
    assert_eq!(repo.answer_events(user).await.unwrap().len(), 5);
}

#[tokio::test]
async fn deleting_category_cascades_to_questions_and_progress() {
    let repo = connect("memdb_cascade").await;
    let user = register(&repo, 9).await;
    let category = repo
        .upsert_category_by_name("Doomed", fixed_now())
        .await
        .unwrap();
    let id = repo
        .insert_question(&question(category, "Q"), fixed_now())
        .await
        .unwrap();
    let q = repo.get_question(id).await.unwrap();
    repo.record_learning_answer(&submission(user, &q, true))
        .await
        .unwrap();

    repo.delete_category(category).await.unwrap();

    assert!(matches!(
        repo.get_question(id).await,
        Err(StorageError::NotFound)
    ));
    assert!(repo.answer_events(user).await.unwrap().is_empty());
    assert!(repo.overall_progress(user).await.unwrap().is_none());
    assert!(repo.progress_by_category(user).await.unwrap().is_empty());
    assert!(matches!(
        repo.delete_category(category).await,
        Err(StorageError::NotFound)
    ));
}

#[tokio::test]
async fn catalog_stats_count_active_questions_and_learners() {
    let repo = connect("memdb_catalog").await;
    let alice = register(&repo, 1).await;
    let bob = register(&repo, 2).await;
    let grammar = repo
        .upsert_category_by_name("Grammar", fixed_now())
        .await
        .unwrap();
    let hidden = repo
        .upsert_category_by_name("Hidden", fixed_now())
        .await
        .unwrap();
    repo.set_category_active(hidden, false).await.unwrap();

    let q1 = repo
        .insert_question(&question(grammar, "Q1"), fixed_now())
        .await
        .unwrap();
    let q2 = repo
        .insert_question(&question(grammar, "Q2"), fixed_now())
        .await
        .unwrap();
    repo.set_question_active(q2, false).await.unwrap();

    let full = repo.get_question(q1).await.unwrap();
    for user in [alice, bob] {
        repo.record_learning_answer(&submission(user, &full, true))
            .await
            .unwrap();
    }

    let stats = repo.category_catalog_stats().await.unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].name, "Grammar");
    assert_eq!(stats[0].active_questions, 1);
    assert_eq!(stats[0].learners, 2);
}

#[tokio::test]
async fn chat_history_is_trimmed_to_window() {
    let repo = connect("memdb_chat_window").await;
    let user = UserId::new(11);
    for i in 0..8 {
        let role = if i % 2 == 0 {
            ChatRole::User
        } else {
            ChatRole::Assistant
        };
        repo.append_message(user, &ChatMessage::new(role, format!("m{i}"), fixed_now()), 5)
            .await
            .unwrap();
    }

    let recent = repo.recent_messages(user, 10).await.unwrap();
    let texts: Vec<&str> = recent.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(texts, ["m3", "m4", "m5", "m6", "m7"]);
    assert_eq!(recent[0].role, ChatRole::Assistant);

    assert!(
        repo.recent_messages(UserId::new(12), 5)
            .await
            .unwrap()
            .is_empty()
    );
}

fn remove_db_files(path: &std::path::Path) {
    for suffix in ["", "-wal", "-shm"] {
        let mut file = path.as_os_str().to_owned();
        file.push(suffix);
        let _ = std::fs::remove_file(file);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_first_answers_count_once_per_question() {
    const QUESTIONS: usize = 20;
    const SUBMISSIONS_PER_QUESTION: usize = 6;

    let path = std::env::temp_dir().join(format!(
        "quiz_concurrent_first_answers_{}.sqlite3",
        std::process::id()
    ));
    remove_db_files(&path);
    let repo = SqliteRepository::connect(&format!("sqlite://{}", path.display()))
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let user = register(&repo, 11).await;
    let category = repo
        .upsert_category_by_name("Grammar", fixed_now())
        .await
        .unwrap();
    let mut questions = Vec::with_capacity(QUESTIONS);
    for n in 0..QUESTIONS {
        let id = repo
            .insert_question(&question(category, &format!("Q{n}")), fixed_now())
            .await
            .unwrap();
        questions.push(repo.get_question(id).await.unwrap());
    }

    let mut tasks = Vec::new();
    for q in &questions {
        for attempt in 0..SUBMISSIONS_PER_QUESTION {
            let repo = repo.clone();
            let answer = submission(user, q, attempt % 2 == 0);
            tasks.push(tokio::spawn(async move {
                repo.record_learning_answer(&answer).await
            }));
        }
    }

    let mut counted = 0;
    for task in tasks {
        if task.await.unwrap().unwrap() == LearningRecord::Counted {
            counted += 1;
        }
    }
    assert_eq!(counted, QUESTIONS);

    let stored = repo.get_user(user).await.unwrap();
    assert_eq!(stored.total_questions as usize, QUESTIONS);

    let aggregate = repo
        .progress_for_category(user, category)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(aggregate.questions_answered as usize, QUESTIONS);

    let events = repo.answer_events(user).await.unwrap();
    let counted_events: Vec<_> = events.iter().filter(|e| e.counted).collect();
    assert_eq!(counted_events.len(), QUESTIONS);
    for q in &questions {
        assert_eq!(
            counted_events
                .iter()
                .filter(|e| e.question_id == q.id())
                .count(),
            1
        );
    }
    let counted_correct = counted_events.iter().filter(|e| e.is_correct).count();
    assert_eq!(stored.correct_answers as usize, counted_correct);
    assert_eq!(aggregate.correct_answers as usize, counted_correct);

    repo.pool().close().await;
    remove_db_files(&path);
}
