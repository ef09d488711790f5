//! crates/study_companion_core/src/keystore.rs
//!
//! The per-credential session keystore.
//!
//! All user data lives in process memory for the lifetime of the service,
//! partitioned by a namespace derived from the active credential. Every
//! accessor takes the namespace explicitly, so no call can observe data
//! belonging to a different credential.

use crate::domain::{ChatMessage, Subject, Test, TestResult};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Length of the hex fingerprint derived from a credential.
const FINGERPRINT_LEN: usize = 16;

/// Namespace key of the shared store used when no credential is set.
const ANONYMOUS: &str = "shared";

/// An error raised by a keystore mutation. These are validation failures
/// detected before any external call; the store is never left half-mutated.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Subject '{0}' already exists")]
    DuplicateSubject(String),
    #[error("No subject at index {0}")]
    SubjectIndexOutOfRange(usize),
    #[error("No question at index {0}")]
    QuestionIndexOutOfRange(usize),
    #[error("No test is currently active")]
    NoCurrentTest,
}

/// Which of the two independent chat transcripts to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatChannel {
    Homework,
    Definitions,
}

/// The isolation boundary for one user's data.
///
/// A credential maps to `user_<fingerprint>` where the fingerprint is the
/// first 16 hex characters of the SHA-256 digest of the trimmed token.
/// An absent or blank credential maps to a single shared namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace(String);

impl Namespace {
    /// The shared namespace used when no credential is configured.
    pub fn anonymous() -> Self {
        Namespace(ANONYMOUS.to_string())
    }

    /// Derives the namespace for a credential, falling back to the shared
    /// namespace when the credential is absent or blank.
    pub fn for_credential(credential: Option<&str>) -> Self {
        match credential.map(str::trim) {
            Some(token) if !token.is_empty() => {
                let digest = Sha256::digest(token.as_bytes());
                let hex: String = digest
                    .iter()
                    .map(|byte| format!("{:02x}", byte))
                    .collect();
                Namespace(format!("user_{}", &hex[..FINGERPRINT_LEN]))
            }
            _ => Namespace::anonymous(),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.0 == ANONYMOUS
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Everything a single namespace holds. The fields are explicit and typed
/// rather than a string-keyed mapping, and `Default` produces the
/// type-appropriate empty value for each of them.
#[derive(Debug, Clone, Default)]
pub struct UserData {
    pub subjects: Vec<Subject>,
    /// Subject name -> ordered syllabus topics. Kept in sync with
    /// `subjects` by the add/remove methods.
    pub syllabus: HashMap<String, Vec<String>>,
    pub study_routine: Option<String>,
    pub test_history: Vec<TestResult>,
    pub current_test: Option<Test>,
    /// Answer scratchpad for the current test: question index -> label.
    pub test_answers: HashMap<usize, String>,
    pub homework_chat: Vec<ChatMessage>,
    pub definitions_chat: Vec<ChatMessage>,
}

impl UserData {
    fn chat_mut(&mut self, channel: ChatChannel) -> &mut Vec<ChatMessage> {
        match channel {
            ChatChannel::Homework => &mut self.homework_chat,
            ChatChannel::Definitions => &mut self.definitions_chat,
        }
    }

    fn chat(&self, channel: ChatChannel) -> &Vec<ChatMessage> {
        match channel {
            ChatChannel::Homework => &self.homework_chat,
            ChatChannel::Definitions => &self.definitions_chat,
        }
    }
}

/// Process-lifetime keystore holding one [`UserData`] per namespace.
///
/// There is no eviction, expiry, or persistence: abandoned namespaces stay
/// resident until the process ends, matching the session model this store
/// replaces.
#[derive(Debug, Default)]
pub struct SessionStore {
    namespaces: RwLock<HashMap<Namespace, UserData>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Materializes default data for a namespace if it does not exist yet.
    ///
    /// Called whenever the active credential changes (or on first sight of
    /// a namespace) so that every subsequent read observes well-typed
    /// defaults. Idempotent; existing data is never touched.
    pub async fn ensure(&self, ns: &Namespace) {
        let mut namespaces = self.namespaces.write().await;
        namespaces.entry(ns.clone()).or_default();
    }

    /// Returns a cloned snapshot of the namespace's data. A namespace that
    /// was never written reads as all-defaults without being materialized.
    pub async fn snapshot(&self, ns: &Namespace) -> UserData {
        let namespaces = self.namespaces.read().await;
        namespaces.get(ns).cloned().unwrap_or_default()
    }

    // =========================================================================
    // Subjects & syllabus
    // =========================================================================

    /// Adds a subject, rejecting a case-insensitive duplicate name. The
    /// syllabus map entry is recorded in the same mutation.
    pub async fn add_subject(&self, ns: &Namespace, subject: Subject) -> Result<(), StoreError> {
        let mut namespaces = self.namespaces.write().await;
        let data = namespaces.entry(ns.clone()).or_default();

        let duplicate = data
            .subjects
            .iter()
            .any(|s| s.name.eq_ignore_ascii_case(&subject.name));
        if duplicate {
            return Err(StoreError::DuplicateSubject(subject.name));
        }

        data.syllabus
            .insert(subject.name.clone(), subject.syllabus.clone());
        data.subjects.push(subject);
        Ok(())
    }

    /// Removes the subject at `index` together with its syllabus entry.
    pub async fn remove_subject(
        &self,
        ns: &Namespace,
        index: usize,
    ) -> Result<Subject, StoreError> {
        let mut namespaces = self.namespaces.write().await;
        let data = namespaces.entry(ns.clone()).or_default();

        if index >= data.subjects.len() {
            return Err(StoreError::SubjectIndexOutOfRange(index));
        }
        let removed = data.subjects.remove(index);
        data.syllabus.remove(&removed.name);
        Ok(removed)
    }

    pub async fn subjects(&self, ns: &Namespace) -> Vec<Subject> {
        self.snapshot(ns).await.subjects
    }

    pub async fn syllabus_for(&self, ns: &Namespace, name: &str) -> Option<Vec<String>> {
        let namespaces = self.namespaces.read().await;
        namespaces.get(ns).and_then(|d| d.syllabus.get(name).cloned())
    }

    // =========================================================================
    // Study routine
    // =========================================================================

    pub async fn set_routine(&self, ns: &Namespace, routine: String) {
        let mut namespaces = self.namespaces.write().await;
        namespaces.entry(ns.clone()).or_default().study_routine = Some(routine);
    }

    pub async fn routine(&self, ns: &Namespace) -> Option<String> {
        self.snapshot(ns).await.study_routine
    }

    pub async fn clear_routine(&self, ns: &Namespace) {
        let mut namespaces = self.namespaces.write().await;
        namespaces.entry(ns.clone()).or_default().study_routine = None;
    }

    // =========================================================================
    // Tests
    // =========================================================================

    /// Installs a freshly generated test as the namespace's current test
    /// and clears the answer scratchpad.
    pub async fn install_test(&self, ns: &Namespace, test: Test) {
        let mut namespaces = self.namespaces.write().await;
        let data = namespaces.entry(ns.clone()).or_default();
        data.current_test = Some(test);
        data.test_answers.clear();
    }

    pub async fn current_test(&self, ns: &Namespace) -> Option<Test> {
        self.snapshot(ns).await.current_test
    }

    /// Records one answer in the scratchpad for the current test.
    pub async fn record_answer(
        &self,
        ns: &Namespace,
        question_index: usize,
        label: String,
    ) -> Result<(), StoreError> {
        let mut namespaces = self.namespaces.write().await;
        let data = namespaces.entry(ns.clone()).or_default();
        let test = data.current_test.as_ref().ok_or(StoreError::NoCurrentTest)?;
        if question_index >= test.questions.len() {
            return Err(StoreError::QuestionIndexOutOfRange(question_index));
        }
        data.test_answers.insert(question_index, label);
        Ok(())
    }

    /// Grades the current test against the scratchpad merged with
    /// `answers` (submitted answers win), appends exactly one result to
    /// the history, and clears the current test and scratchpad.
    pub async fn submit_test(
        &self,
        ns: &Namespace,
        answers: HashMap<usize, String>,
    ) -> Result<(Test, TestResult), StoreError> {
        let mut namespaces = self.namespaces.write().await;
        let data = namespaces.entry(ns.clone()).or_default();

        let test = data.current_test.take().ok_or(StoreError::NoCurrentTest)?;
        let mut merged = std::mem::take(&mut data.test_answers);
        merged.extend(answers);

        let result = test.grade(&merged);
        data.test_history.push(result.clone());
        Ok((test, result))
    }

    pub async fn test_history(&self, ns: &Namespace) -> Vec<TestResult> {
        self.snapshot(ns).await.test_history
    }

    // =========================================================================
    // Chat transcripts
    // =========================================================================

    pub async fn append_chat(&self, ns: &Namespace, channel: ChatChannel, message: ChatMessage) {
        let mut namespaces = self.namespaces.write().await;
        namespaces
            .entry(ns.clone())
            .or_default()
            .chat_mut(channel)
            .push(message);
    }

    pub async fn transcript(&self, ns: &Namespace, channel: ChatChannel) -> Vec<ChatMessage> {
        let namespaces = self.namespaces.read().await;
        namespaces
            .get(ns)
            .map(|d| d.chat(channel).clone())
            .unwrap_or_default()
    }

    pub async fn clear_chat(&self, ns: &Namespace, channel: ChatChannel) {
        let mut namespaces = self.namespaces.write().await;
        namespaces
            .entry(ns.clone())
            .or_default()
            .chat_mut(channel)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Difficulty, Priority, Question, TestDifficulty, TestType};
    use chrono::Utc;

    fn subject(name: &str) -> Subject {
        Subject {
            name: name.to_string(),
            syllabus: vec!["Topic 1".to_string(), "Topic 2".to_string()],
            difficulty: Difficulty::Medium,
            priority: Priority::High,
            hours_per_week: 5,
            added_date: Utc::now().date_naive(),
        }
    }

    fn ten_question_test() -> Test {
        let questions = (0..10)
            .map(|i| Question {
                question: format!("Q{}", i),
                options: vec![
                    "A. a".to_string(),
                    "B. b".to_string(),
                    "C. c".to_string(),
                    "D. d".to_string(),
                ],
                correct: "A".to_string(),
                explanation: "a is right".to_string(),
            })
            .collect();
        Test {
            subject: "Algebra".to_string(),
            test_type: TestType::Standard,
            difficulty: TestDifficulty::Medium,
            questions,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn fingerprints_are_stable_and_distinct() {
        let a = Namespace::for_credential(Some("key-one"));
        let b = Namespace::for_credential(Some("key-two"));
        let a_again = Namespace::for_credential(Some("  key-one  "));

        assert_ne!(a, b);
        assert_eq!(a, a_again, "whitespace must not change the namespace");
        assert!(a.as_str().starts_with("user_"));
        assert_eq!(a.as_str().len(), "user_".len() + 16);
    }

    #[test]
    fn blank_credential_maps_to_shared_namespace() {
        assert!(Namespace::for_credential(None).is_anonymous());
        assert!(Namespace::for_credential(Some("   ")).is_anonymous());
    }

    #[tokio::test]
    async fn namespaces_are_isolated() {
        let store = SessionStore::new();
        let ns1 = Namespace::for_credential(Some("alice"));
        let ns2 = Namespace::for_credential(Some("bob"));

        store.add_subject(&ns1, subject("Physics")).await.unwrap();
        store.set_routine(&ns1, "mornings".to_string()).await;

        assert!(store.subjects(&ns2).await.is_empty());
        assert!(store.routine(&ns2).await.is_none());
        assert!(store.syllabus_for(&ns2, "Physics").await.is_none());
    }

    #[tokio::test]
    async fn switching_credentials_and_back_restores_data() {
        let store = SessionStore::new();
        let ns1 = Namespace::for_credential(Some("alice"));
        let ns2 = Namespace::for_credential(Some("bob"));

        store.ensure(&ns1).await;
        store.add_subject(&ns1, subject("History")).await.unwrap();

        // Switch to a second credential: defaults materialize, nothing leaks.
        store.ensure(&ns2).await;
        assert!(store.subjects(&ns2).await.is_empty());
        store.add_subject(&ns2, subject("Chemistry")).await.unwrap();

        // Switch back: exactly the original data is visible.
        store.ensure(&ns1).await;
        let subjects = store.subjects(&ns1).await;
        assert_eq!(subjects.len(), 1);
        assert_eq!(subjects[0].name, "History");
    }

    #[tokio::test]
    async fn duplicate_subject_names_are_rejected_case_insensitively() {
        let store = SessionStore::new();
        let ns = Namespace::anonymous();

        store.add_subject(&ns, subject("Algebra")).await.unwrap();
        let err = store.add_subject(&ns, subject("algebra")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateSubject(_)));
        assert_eq!(store.subjects(&ns).await.len(), 1);
    }

    #[tokio::test]
    async fn removing_a_subject_removes_its_syllabus_entry() {
        let store = SessionStore::new();
        let ns = Namespace::anonymous();

        store.add_subject(&ns, subject("Biology")).await.unwrap();
        assert!(store.syllabus_for(&ns, "Biology").await.is_some());

        let removed = store.remove_subject(&ns, 0).await.unwrap();
        assert_eq!(removed.name, "Biology");
        assert!(store.syllabus_for(&ns, "Biology").await.is_none());
        assert!(store.subjects(&ns).await.is_empty());
    }

    #[tokio::test]
    async fn remove_subject_rejects_bad_index() {
        let store = SessionStore::new();
        let ns = Namespace::anonymous();
        let err = store.remove_subject(&ns, 3).await.unwrap_err();
        assert!(matches!(err, StoreError::SubjectIndexOutOfRange(3)));
    }

    #[tokio::test]
    async fn submit_grades_appends_history_and_clears_current_test() {
        let store = SessionStore::new();
        let ns = Namespace::for_credential(Some("student"));

        store.install_test(&ns, ten_question_test()).await;

        let mut answers = HashMap::new();
        for idx in 0..7 {
            answers.insert(idx, "A".to_string());
        }
        for idx in 7..10 {
            answers.insert(idx, "B".to_string());
        }

        let (_test, result) = store.submit_test(&ns, answers).await.unwrap();
        assert_eq!(result.correct, 7);
        assert_eq!(result.total, 10);
        assert!((result.score - 70.0).abs() < f64::EPSILON);

        assert!(store.current_test(&ns).await.is_none());
        let history = store.test_history(&ns).await;
        assert_eq!(history.len(), 1);
        assert!((history[0].score - 70.0).abs() < f64::EPSILON);

        // Scratchpad was cleared along with the test.
        let err = store.record_answer(&ns, 0, "A".to_string()).await.unwrap_err();
        assert!(matches!(err, StoreError::NoCurrentTest));
    }

    #[tokio::test]
    async fn submitted_answers_override_scratchpad() {
        let store = SessionStore::new();
        let ns = Namespace::anonymous();
        store.install_test(&ns, ten_question_test()).await;

        // Scratchpad says wrong answer for question 0; submission corrects it.
        store.record_answer(&ns, 0, "B".to_string()).await.unwrap();
        let mut answers = HashMap::new();
        answers.insert(0, "A".to_string());

        let (_, result) = store.submit_test(&ns, answers).await.unwrap();
        assert_eq!(result.correct, 1);
    }

    #[tokio::test]
    async fn submit_without_current_test_fails() {
        let store = SessionStore::new();
        let ns = Namespace::anonymous();
        let err = store.submit_test(&ns, HashMap::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::NoCurrentTest));
    }

    #[tokio::test]
    async fn chat_channels_are_independent() {
        let store = SessionStore::new();
        let ns = Namespace::anonymous();

        store
            .append_chat(&ns, ChatChannel::Homework, ChatMessage::user("help"))
            .await;
        store
            .append_chat(&ns, ChatChannel::Homework, ChatMessage::assistant("sure"))
            .await;

        assert_eq!(store.transcript(&ns, ChatChannel::Homework).await.len(), 2);
        assert!(store
            .transcript(&ns, ChatChannel::Definitions)
            .await
            .is_empty());

        store.clear_chat(&ns, ChatChannel::Homework).await;
        assert!(store.transcript(&ns, ChatChannel::Homework).await.is_empty());
    }
}
