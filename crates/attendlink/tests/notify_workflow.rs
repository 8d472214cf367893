//! End-to-end notification workflow against an in-memory database.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use attendlink::link::parse_link;
use attendlink::{
    ChannelOpener, Config, Error, Notifier, Outcome, Storage, StudentRecord, WeekNumber,
};

#[derive(Debug, Clone, Default)]
struct CapturingOpener {
    urls: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl ChannelOpener for CapturingOpener {
    async fn open(&self, url: &str) -> attendlink::Result<()> {
        self.urls.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

#[derive(Debug)]
struct BlockedOpener;

#[async_trait]
impl ChannelOpener for BlockedOpener {
    async fn open(&self, _url: &str) -> attendlink::Result<()> {
        Err(Error::channel_unavailable("no window handle"))
    }
}

const MARIA: &str = r#"{
    "id": "42",
    "name": "Maria Gomez",
    "guardianPhone": "0100 111 2222",
    "weeks": [
        {"attended": true, "lastAttendance": "2024-01-10", "homeworkStatus": true,
         "quizScore": "8/10", "comment": "Great job"}
    ]
}"#;

fn config() -> Config {
    let mut config = Config::default();
    config.signing.secret = Some("STD_".to_string());
    config
}

fn storage_with_maria() -> Arc<Storage> {
    let storage = Storage::open_in_memory().unwrap();
    for student in StudentRecord::parse_many(MARIA).unwrap() {
        storage.upsert_student(&student).unwrap();
    }
    Arc::new(storage)
}

fn is_lower_hex(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

#[tokio::test]
async fn maria_week_one_end_to_end() {
    let config = config();
    let storage = storage_with_maria();
    let opener = CapturingOpener::default();
    let notifier = Notifier::new(
        config.phone_validator(),
        config.composer().unwrap(),
        opener.clone(),
        Arc::clone(&storage),
    );

    let student = storage.get_student("42").unwrap().unwrap();
    let report = notifier.notify(&student, WeekNumber::FIRST, None).await;

    assert_eq!(report.outcome, Outcome::Sent);
    assert!(report.should_apply_local_update());
    assert_eq!(report.user_message(), "Message channel opened successfully!");

    let message = report.message.expect("message composed");
    for expected in [
        "Maria",
        "Week: 1",
        "Homework: Done",
        "Quiz Degree: 8/10",
        "Comment: Great job",
    ] {
        assert!(message.body.contains(expected), "missing {expected:?}");
    }

    // Capability link ends in id=42&sig=<64 hex>
    let (_, sig) = message.capability_url.split_once("id=42&sig=").unwrap();
    assert_eq!(sig.len(), 64);
    assert!(is_lower_hex(sig));

    // Normalized guardian number is the 12-digit international form
    let urls = opener.urls.lock().unwrap();
    assert_eq!(urls.len(), 1);
    assert!(urls[0].starts_with("https://wa.me/201001112222?text="));

    let state = storage.delivery_state("42", WeekNumber::FIRST).unwrap().unwrap();
    assert!(state.delivered);
}

#[test]
fn capability_link_round_trips_through_verification() {
    let links = config().link_builder().unwrap();
    for id in ["42", "1001", "student 7"] {
        let path = links.build_path(id).unwrap();
        let params = parse_link(&path).unwrap();
        assert!(links.signer().verify(&params.student_id, &params.signature));
        assert!(!links.signer().verify("other", &params.signature));
    }
}

#[tokio::test]
async fn blocked_channel_records_failure() {
    let config = config();
    let storage = storage_with_maria();
    storage.write_message_state("42", WeekNumber::FIRST, true).unwrap();

    let notifier = Notifier::new(
        config.phone_validator(),
        config.composer().unwrap(),
        BlockedOpener,
        Arc::clone(&storage),
    );
    let student = storage.get_student("42").unwrap().unwrap();
    let report = notifier.notify(&student, WeekNumber::FIRST, None).await;

    assert!(!report.outcome.is_sent());
    assert!(report.persistence.is_persisted());
    assert!(!report.should_apply_local_update());
    let state = storage.delivery_state("42", WeekNumber::FIRST).unwrap().unwrap();
    assert!(!state.delivered);
}

#[tokio::test]
async fn unknown_student_write_is_a_persistence_failure() {
    let config = config();
    let storage = Arc::new(Storage::open_in_memory().unwrap());
    let notifier = Notifier::new(
        config.phone_validator(),
        config.composer().unwrap(),
        CapturingOpener::default(),
        Arc::clone(&storage),
    );

    let mut ghost = StudentRecord::new("404", "Ghost Student");
    ghost.guardian_phone = Some("01012345678".to_string());
    let report = notifier.notify(&ghost, WeekNumber::FIRST, None).await;

    assert!(report.outcome.is_sent());
    assert!(!report.persistence.is_persisted());
    assert_eq!(report.user_message(), "Message sent but failed to update status");
}

#[test]
fn record_is_idempotent_and_last_write_wins() {
    let storage = storage_with_maria();

    storage.write_message_state("42", WeekNumber::FIRST, true).unwrap();
    storage.write_message_state("42", WeekNumber::FIRST, true).unwrap();
    assert!(storage.delivery_state("42", WeekNumber::FIRST).unwrap().unwrap().delivered);

    storage.write_message_state("42", WeekNumber::FIRST, false).unwrap();
    storage.write_message_state("42", WeekNumber::FIRST, true).unwrap();
    assert!(storage.delivery_state("42", WeekNumber::FIRST).unwrap().unwrap().delivered);

    // The rest of the week is untouched
    let student = storage.get_student("42").unwrap().unwrap();
    assert_eq!(student.weeks.len(), 1);
    assert_eq!(student.weeks[0].quiz_score.as_deref(), Some("8/10"));
}

#[tokio::test]
async fn missing_secret_records_failed_delivery() {
    let storage = storage_with_maria();
    storage.write_message_state("42", WeekNumber::FIRST, true).unwrap();
    let opener = CapturingOpener::default();
    let notifier = Notifier::from_config(&Config::default(), opener.clone(), Arc::clone(&storage));

    let student = storage.get_student("42").unwrap().unwrap();
    let report = notifier.notify(&student, WeekNumber::FIRST, None).await;

    assert!(!report.outcome.is_sent());
    assert_eq!(report.user_message(), "Could not generate the student link");
    assert!(report.persistence.is_persisted());
    assert!(opener.urls.lock().unwrap().is_empty());
    let state = storage.delivery_state("42", WeekNumber::FIRST).unwrap().unwrap();
    assert!(!state.delivered);
}

#[test]
fn oversized_week_is_rejected_before_storage() {
    let storage = storage_with_maria();
    assert!(WeekNumber::new(4_000_000_000).is_err());

    let last = WeekNumber::new(WeekNumber::MAX).unwrap();
    storage.write_message_state("42", last, true).unwrap();
    let student = storage.get_student("42").unwrap().unwrap();
    assert_eq!(student.weeks.len(), 52);
    assert!(student.week(last).unwrap().message_state);
}
