//! Review loop controller
//!
//! One invocation handles the current batch of unprocessed bot comments on a
//! PR:
//! 1. Fetch comments, keep recognized reviewers not yet in the ledger
//! 2. Stop if nothing is new
//! 3. Ask the judge
//! 4. NeedsFix: send one consolidated message, then mark each comment
//! 5. NoIssues: mark each comment, send nothing
//! 6. JudgeUnavailable: mark nothing so the next run retries
//!
//! Marking happens per comment after the message is sent. A crash in between
//! can resend a fix request on the next run; it never drops a comment.

use crate::ledger::ProcessedLedger;
use crate::prompt::build_fix_message;
use jules_agent::{Judge, ReviewSource, SessionApi};
use jules_core::{Result, ReviewComment, Verdict};
use serde_json::Value;
use std::collections::HashSet;
use tracing::{info, warn};

/// What a review run did
#[derive(Debug, Clone, PartialEq)]
pub enum ReviewOutcome {
    /// Every bot comment was already processed
    NoNewComments,
    /// Fix request sent and comments marked
    FixRequested {
        comment_ids: Vec<u64>,
        response: Value,
    },
    /// Judge found nothing worth fixing; comments marked
    NoIssues { comment_ids: Vec<u64> },
    /// Judge could not be reached; comments left for the next run
    JudgeUnavailable { comment_ids: Vec<u64> },
}

impl ReviewOutcome {
    /// One-line human summary
    pub fn summary(&self) -> String {
        match self {
            Self::NoNewComments => "No new review comments found.".to_string(),
            Self::FixRequested { comment_ids, .. } => format!(
                "Changes are required: sent fix request covering {} comment(s).",
                comment_ids.len()
            ),
            Self::NoIssues { comment_ids } => format!(
                "No critical issues found in {} comment(s); marked as processed.",
                comment_ids.len()
            ),
            Self::JudgeUnavailable { comment_ids } => format!(
                "Triage model unavailable; {} comment(s) left for the next run.",
                comment_ids.len()
            ),
        }
    }

    pub fn fix_requested(&self) -> bool {
        matches!(self, Self::FixRequested { .. })
    }
}

/// Composes the session gateway, review source and judge
pub struct ReviewLoop<S, R, J> {
    sessions: S,
    reviews: R,
    judge: J,
    reviewers: Vec<String>,
}

fn normalize_login(login: &str) -> String {
    login.trim().trim_end_matches("[bot]").to_ascii_lowercase()
}

impl<S: SessionApi, R: ReviewSource, J: Judge> ReviewLoop<S, R, J> {
    /// Create a loop that triages `amazon-q-developer` comments
    pub fn new(sessions: S, reviews: R, judge: J) -> Self {
        Self {
            sessions,
            reviews,
            judge,
            reviewers: vec![normalize_login("amazon-q-developer")],
        }
    }

    /// Replace the recognized reviewer logins
    pub fn with_reviewers<I, T>(mut self, logins: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        self.reviewers = logins
            .into_iter()
            .map(|l| normalize_login(l.as_ref()))
            .collect();
        self
    }

    pub fn sessions(&self) -> &S {
        &self.sessions
    }

    /// Case-insensitive, ignoring a trailing `[bot]`
    pub fn is_recognized_reviewer(&self, login: &str) -> bool {
        let login = normalize_login(login);
        !login.is_empty() && self.reviewers.iter().any(|r| *r == login)
    }

    /// Bot comments on the PR that the ledger has not seen, in fetch order
    pub async fn new_comments(
        &self,
        ledger: &ProcessedLedger,
        pr_number: u64,
    ) -> Result<Vec<ReviewComment>> {
        let fetched = self.reviews.fetch_comments(pr_number).await?;
        let total = fetched.len();

        let mut seen = HashSet::new();
        let fresh: Vec<_> = fetched
            .into_iter()
            .filter(|c| self.is_recognized_reviewer(&c.author))
            .filter(|c| !ledger.is_processed(c.id))
            .filter(|c| seen.insert(c.id))
            .collect();

        info!(
            "PR #{}: {} comments fetched, {} new from recognized reviewers",
            pr_number,
            total,
            fresh.len()
        );
        Ok(fresh)
    }

    /// Run one pass of the feedback loop for `pr_number`
    pub async fn process_reviews(
        &self,
        ledger: &mut ProcessedLedger,
        pr_number: u64,
        session_id: &str,
    ) -> Result<ReviewOutcome> {
        let comments = self.new_comments(ledger, pr_number).await?;
        if comments.is_empty() {
            info!("No new review comments found.");
            return Ok(ReviewOutcome::NoNewComments);
        }

        let comment_ids: Vec<u64> = comments.iter().map(|c| c.id).collect();
        let verdict = self.judge.assess(&comments).await;
        info!("Triage verdict for PR #{}: {}", pr_number, verdict);

        match verdict {
            Verdict::NeedsFix => {
                let message = build_fix_message(&comments);
                info!("Sending fix request to session {}...", session_id);
                let response = self.sessions.send_message(session_id, &message).await?;

                Self::mark_all(ledger, &comment_ids).await?;
                Ok(ReviewOutcome::FixRequested {
                    comment_ids,
                    response,
                })
            }
            Verdict::NoIssues => {
                Self::mark_all(ledger, &comment_ids).await?;
                Ok(ReviewOutcome::NoIssues { comment_ids })
            }
            Verdict::JudgeUnavailable => {
                warn!(
                    "Triage judge unavailable; leaving {} comments unprocessed",
                    comment_ids.len()
                );
                Ok(ReviewOutcome::JudgeUnavailable { comment_ids })
            }
        }
    }

    async fn mark_all(ledger: &mut ProcessedLedger, comment_ids: &[u64]) -> Result<()> {
        for id in comment_ids {
            ledger.mark_processed(*id).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{review_comment, FixedJudge, MockSessions, StaticReviews};
    use jules_core::JulesError;
    use tempfile::{tempdir, TempDir};

    async fn empty_ledger() -> (TempDir, ProcessedLedger) {
        let dir = tempdir().unwrap();
        let ledger = ProcessedLedger::load(dir.path().join("ledger.json")).await;
        (dir, ledger)
    }

    fn sql_injection() -> Vec<ReviewComment> {
        vec![review_comment(
            1,
            "amazon-q-developer",
            "app/db.py",
            Some(12),
            "SQL injection risk",
        )]
    }

    #[tokio::test]
    async fn test_needs_fix_sends_once_and_marks() {
        let (_dir, mut ledger) = empty_ledger().await;
        let review = ReviewLoop::new(
            MockSessions::default(),
            StaticReviews::new(sql_injection()),
            FixedJudge::new(Verdict::NeedsFix),
        );

        let outcome = review.process_reviews(&mut ledger, 7, "s1").await.unwrap();

        assert!(outcome.fix_requested());
        let sent = review.sessions().sent_messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "s1");
        assert!(sent[0].1.contains("SQL injection risk"));
        assert_eq!(ledger.processed_comments().iter().copied().collect::<Vec<_>>(), vec![1]);
    }

    #[tokio::test]
    async fn test_no_issues_marks_without_message() {
        let (_dir, mut ledger) = empty_ledger().await;
        let review = ReviewLoop::new(
            MockSessions::default(),
            StaticReviews::new(sql_injection()),
            FixedJudge::new(Verdict::NoIssues),
        );

        let outcome = review.process_reviews(&mut ledger, 7, "s1").await.unwrap();

        assert_eq!(outcome, ReviewOutcome::NoIssues { comment_ids: vec![1] });
        assert!(review.sessions().sent_messages().is_empty());
        assert!(ledger.is_processed(1));
    }

    #[tokio::test]
    async fn test_judge_unavailable_leaves_ledger_unchanged() {
        let (_dir, mut ledger) = empty_ledger().await;
        ledger.mark_processed(99).await.unwrap();
        let before = ledger.state().clone();

        let review = ReviewLoop::new(
            MockSessions::default(),
            StaticReviews::new(sql_injection()),
            FixedJudge::new(Verdict::JudgeUnavailable),
        );

        let outcome = review.process_reviews(&mut ledger, 7, "s1").await.unwrap();

        assert_eq!(
            outcome,
            ReviewOutcome::JudgeUnavailable { comment_ids: vec![1] }
        );
        assert_eq!(ledger.state(), &before);
        assert!(review.sessions().sent_messages().is_empty());
    }

    #[tokio::test]
    async fn test_processed_comments_skip_judge() {
        let (_dir, mut ledger) = empty_ledger().await;
        ledger.mark_processed(1).await.unwrap();

        let review = ReviewLoop::new(
            MockSessions::default(),
            StaticReviews::new(sql_injection()),
            FixedJudge::new(Verdict::NeedsFix),
        );

        let outcome = review.process_reviews(&mut ledger, 7, "s1").await.unwrap();

        assert_eq!(outcome, ReviewOutcome::NoNewComments);
        assert_eq!(review.judge.calls(), 0);
        assert!(review.sessions().sent_messages().is_empty());
    }

    #[tokio::test]
    async fn test_second_run_is_idempotent() {
        let (_dir, mut ledger) = empty_ledger().await;
        let comments = vec![
            review_comment(1, "amazon-q-developer", "a.py", Some(1), "Hardcoded secret"),
            review_comment(2, "amazon-q-developer[bot]", "b.py", None, "Command injection"),
        ];
        let review = ReviewLoop::new(
            MockSessions::default(),
            StaticReviews::new(comments),
            FixedJudge::new(Verdict::NeedsFix),
        );

        let first = review.process_reviews(&mut ledger, 7, "s1").await.unwrap();
        let second = review.process_reviews(&mut ledger, 7, "s1").await.unwrap();

        assert!(first.fix_requested());
        assert_eq!(second, ReviewOutcome::NoNewComments);
        assert_eq!(review.sessions().sent_messages().len(), 1);
        assert_eq!(review.judge.calls(), 1);
        assert_eq!(ledger.processed_comments().len(), 2);
    }

    #[tokio::test]
    async fn test_message_covers_every_comment_in_order() {
        let (_dir, mut ledger) = empty_ledger().await;
        let comments = vec![
            review_comment(10, "amazon-q-developer", "z/last.py", Some(3), "First body"),
            review_comment(11, "amazon-q-developer", "a/first.py", None, "Second body"),
            review_comment(12, "amazon-q-developer", "m/mid.py", Some(8), "Third body"),
        ];
        let review = ReviewLoop::new(
            MockSessions::default(),
            StaticReviews::new(comments.clone()),
            FixedJudge::new(Verdict::NeedsFix),
        );

        review.process_reviews(&mut ledger, 7, "s1").await.unwrap();

        let sent = review.sessions().sent_messages();
        let message = &sent[0].1;
        let mut last = 0;
        for comment in &comments {
            assert_eq!(message.matches(comment.path.as_str()).count(), 1);
            assert_eq!(message.matches(comment.body.as_str()).count(), 1);
            let pos = message.find(comment.body.as_str()).unwrap();
            assert!(pos > last);
            last = pos;
        }
    }

    #[tokio::test]
    async fn test_filters_unrecognized_authors() {
        let (_dir, mut ledger) = empty_ledger().await;
        let comments = vec![
            review_comment(1, "octocat", "a.py", Some(1), "Looks fine"),
            review_comment(2, "Amazon-Q-Developer[bot]", "b.py", Some(2), "Race condition"),
            review_comment(3, "", "c.py", None, "ghost"),
        ];
        let review = ReviewLoop::new(
            MockSessions::default(),
            StaticReviews::new(comments),
            FixedJudge::new(Verdict::NoIssues),
        );

        let outcome = review.process_reviews(&mut ledger, 7, "s1").await.unwrap();

        assert_eq!(outcome, ReviewOutcome::NoIssues { comment_ids: vec![2] });
        assert!(!ledger.is_processed(1));
        assert!(!ledger.is_processed(3));
    }

    #[tokio::test]
    async fn test_custom_reviewers() {
        let review = ReviewLoop::new(
            MockSessions::default(),
            StaticReviews::new(vec![]),
            FixedJudge::new(Verdict::NoIssues),
        )
        .with_reviewers(["coderabbitai", "Copilot"]);

        assert!(review.is_recognized_reviewer("coderabbitai[bot]"));
        assert!(review.is_recognized_reviewer("copilot"));
        assert!(!review.is_recognized_reviewer("amazon-q-developer"));
    }

    #[tokio::test]
    async fn test_fetch_error_is_fatal() {
        let (_dir, mut ledger) = empty_ledger().await;
        let review = ReviewLoop::new(
            MockSessions::default(),
            StaticReviews::failing(JulesError::remote("GitHub API", 401, "Bad credentials")),
            FixedJudge::new(Verdict::NeedsFix),
        );

        let err = review.process_reviews(&mut ledger, 7, "s1").await.unwrap_err();

        assert_eq!(err.status(), Some(401));
        assert_eq!(review.judge.calls(), 0);
    }

    #[tokio::test]
    async fn test_send_failure_marks_nothing() {
        let (_dir, mut ledger) = empty_ledger().await;
        let review = ReviewLoop::new(
            MockSessions::failing_send(JulesError::remote("Jules API", 400, "not accepting")),
            StaticReviews::new(sql_injection()),
            FixedJudge::new(Verdict::NeedsFix),
        );

        let result = review.process_reviews(&mut ledger, 7, "s1").await;

        assert!(result.is_err());
        assert!(!ledger.is_processed(1));
    }
}
