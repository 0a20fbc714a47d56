//! Release module: hand released capsules to the notification sender.
//!
//! A capsule is due once its release date has passed and its recipients have
//! not been notified yet. The sweep opens each due capsule through the safe
//! projection, passes it to a [`ReleaseNotifier`] (the email sender lives
//! outside this crate), then marks it notified. Marking re-saves the record,
//! which leaves its untouched envelopes byte-for-byte as they were.

use chrono::{DateTime, Utc};

use crate::capsule::{self, Capsule, CapsuleView};
use crate::error::StoreError;
use crate::store::CapsuleStore;

/// Receives decrypted capsules at release time.
pub trait ReleaseNotifier {
    fn notify_creator(&self, capsule: &CapsuleView) -> anyhow::Result<()>;

    fn notify_recipient(&self, capsule: &CapsuleView, email: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Capsules found due and marked notified.
    pub released: usize,
    /// Notifications delivered (creator plus recipients).
    pub notified: usize,
    /// Notifications the sender reported as failed.
    pub failed_notifications: usize,
    /// Released capsules with at least one field that could not be opened.
    pub undecryptable: usize,
}

/// Capsules whose release date is at or before `now` and that have not been announced.
pub fn due_for_release<S: CapsuleStore + ?Sized>(
    store: &S,
    now: DateTime<Utc>,
) -> Result<Vec<Capsule>, StoreError> {
    Ok(store
        .list()?
        .into_iter()
        .filter(|c| c.is_released(now) && !c.notified_recipients)
        .collect())
}

/// Notify the creator and every recipient of each due capsule, then mark it notified.
///
/// A failing notification is counted and logged but does not stop the sweep.
/// A capsule whose content cannot be decrypted is still announced, with the
/// field marked unavailable. Store failures abort.
pub fn run_release_sweep<S, N>(
    store: &S,
    notifier: &N,
    now: DateTime<Utc>,
) -> Result<SweepReport, StoreError>
where
    S: CapsuleStore + ?Sized,
    N: ReleaseNotifier + ?Sized,
{
    let due = due_for_release(store, now)?;
    tracing::info!(count = due.len(), "released capsules to notify");

    let mut report = SweepReport::default();
    for mut record in due {
        let view = capsule::project(&record, store.key());
        if view.content_encrypted() || view.media_encrypted() {
            report.undecryptable += 1;
        }

        let mut deliver = |result: anyhow::Result<()>, audience: &str| match result {
            Ok(()) => report.notified += 1,
            Err(e) => {
                report.failed_notifications += 1;
                tracing::warn!(capsule_id = %view.id, audience, error = %e, "release notification failed");
            }
        };

        deliver(notifier.notify_creator(&view), "creator");
        for recipient in &view.recipients {
            deliver(notifier.notify_recipient(&view, &recipient.email), "recipient");
        }

        record.notified_recipients = true;
        store.save(record)?;
        report.released += 1;
        tracing::info!(capsule_id = %view.id, recipients = view.recipients.len(), "capsule released");
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capsule::FieldValue;
    use crate::crypto::CipherKey;
    use crate::store::MemoryStore;
    use chrono::{Duration, TimeZone};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(String, String, String)>>,
        fail_for: Option<String>,
    }

    impl ReleaseNotifier for RecordingNotifier {
        fn notify_creator(&self, capsule: &CapsuleView) -> anyhow::Result<()> {
            self.sent.lock().push((
                capsule.id.clone(),
                capsule.owner_email.clone(),
                capsule.content.display_text().to_string(),
            ));
            Ok(())
        }

        fn notify_recipient(&self, capsule: &CapsuleView, email: &str) -> anyhow::Result<()> {
            if self.fail_for.as_deref() == Some(email) {
                anyhow::bail!("mailbox unavailable");
            }
            self.sent.lock().push((
                capsule.id.clone(),
                email.to_string(),
                capsule.content.display_text().to_string(),
            ));
            Ok(())
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 1, 9, 0, 0).unwrap()
    }

    fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new(CipherKey::from_secret("release-key"));
        let past = Capsule::new("past", "t", "opened at last", "owner@example.com", now() - Duration::days(1))
            .with_recipients(&["A@Example.com", "b@example.com"]);
        let future = Capsule::new("future", "t", "not yet", "owner@example.com", now() + Duration::days(1));
        store.save(past).unwrap();
        store.save(future).unwrap();
        store
    }

    #[test]
    fn test_due_for_release_filters() {
        let store = seeded_store();
        let due = due_for_release(&store, now()).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, "past");
    }

    #[test]
    fn test_sweep_notifies_and_marks() {
        let store = seeded_store();
        let sealed_before = store.get("past").unwrap().unwrap().content;
        let notifier = RecordingNotifier::default();

        let report = run_release_sweep(&store, &notifier, now()).unwrap();
        assert_eq!(report.released, 1);
        assert_eq!(report.notified, 3);
        assert_eq!(report.failed_notifications, 0);

        let sent = notifier.sent.lock();
        assert!(sent.iter().all(|(_, _, text)| text == "opened at last"));
        assert!(sent.iter().any(|(_, email, _)| email == "a@example.com"));

        let after = store.get("past").unwrap().unwrap();
        assert!(after.notified_recipients);
        assert_eq!(after.content, sealed_before, "marking notified must not re-encrypt");
        drop(sent);

        // A second sweep finds nothing
        let again = run_release_sweep(&store, &notifier, now()).unwrap();
        assert_eq!(again, SweepReport::default());
    }

    #[test]
    fn test_sweep_counts_failures_and_continues() {
        let store = seeded_store();
        let notifier = RecordingNotifier {
            fail_for: Some("b@example.com".to_string()),
            ..Default::default()
        };
        let report = run_release_sweep(&store, &notifier, now()).unwrap();
        assert_eq!(report.notified, 2);
        assert_eq!(report.failed_notifications, 1);
        assert!(store.get("past").unwrap().unwrap().notified_recipients);
    }

    #[test]
    fn test_sweep_announces_undecryptable_capsule() {
        let store = seeded_store();
        let sealed = store.get("past").unwrap().unwrap();
        let foreign = MemoryStore::new(CipherKey::from_secret("some-other-key"));
        // Stored under one key, read under another
        let mut raw = sealed.clone();
        raw.notified_recipients = false;
        foreign.save(raw).unwrap();

        let notifier = RecordingNotifier::default();
        let report = run_release_sweep(&foreign, &notifier, now()).unwrap();
        assert_eq!(report.undecryptable, 1);
        assert_eq!(report.released, 1);
        let view = foreign.view("past").unwrap().unwrap();
        assert!(matches!(view.content, FieldValue::Unavailable(_)));
    }
}
