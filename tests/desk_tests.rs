// tests/desk_tests.rs
use capital_desk::{
    Account, Adapter, AnnouncementDraft, Caller, Desk, EntryFilter, Error, ExecutionPlan,
    MAX_REQUEST_AMOUNT, MemoryAdapter, NotificationKind, Operation, RequestFilter, RequestKind,
    RequestState, run_id_for,
    ledger::{EntryKind, LedgerEntry, Track},
};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

fn setup() -> (Desk, MemoryAdapter, Caller) {
    let adapter = MemoryAdapter::new();
    let desk = Desk::new(Box::new(adapter.clone()));
    let admin = Caller::admin(Uuid::now_v7());
    (desk, adapter, admin)
}

async fn investor(adapter: &MemoryAdapter, name: &str) -> Caller {
    let account = Account::new(name, &format!("{}@example.com", name));
    let id = account.id;
    adapter.upsert_account(account).await.unwrap();
    Caller::investor(id)
}

async fn enable_temporal(desk: &Desk, admin: &Caller) {
    desk.configure_temporal_module(admin, true, "Temporal Report", "")
        .await
        .unwrap();
}

/// Submit and approve a deposit so the account holds `amount` on `track`.
async fn fund(desk: &Desk, admin: &Caller, investor: &Caller, track: Track, amount: i64) {
    let request = desk
        .submit_request(investor, track, RequestKind::Deposit, Decimal::from(amount))
        .await
        .unwrap();
    desk.approve(admin, request.id).await.unwrap();
}

/// Write a deposit entry straight through the adapter, bypassing request limits.
async fn append_deposit(
    adapter: &MemoryAdapter,
    investor: &Caller,
    track: Track,
    amount: Decimal,
) {
    let entry =
        LedgerEntry::new(investor.id, track, EntryKind::Deposit, amount, "import").unwrap();
    let mut plan = ExecutionPlan::new();
    plan.add(Operation::AppendEntry { entry });
    adapter.execute_plan(&plan).await.unwrap();
}

// ==================== Requests ====================

#[tokio::test]
async fn test_approve_creates_entry_and_notification() {
    let (desk, adapter, admin) = setup();
    let alice = investor(&adapter, "alice").await;

    let request = desk
        .submit_request(&alice, Track::Primary, RequestKind::Deposit, Decimal::from(1500))
        .await
        .unwrap();
    assert_eq!(request.state, RequestState::Pending);

    let approved = desk.approve(&admin, request.id).await.unwrap();
    assert_eq!(approved.state, RequestState::Approved);
    assert_eq!(approved.resolved_by, Some(admin.id));

    let entries = desk.entries(&alice, alice.id, Track::Primary).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, EntryKind::Deposit);
    assert_eq!(entries[0].amount, Decimal::from(1500));

    let notifications = desk.notifications(&alice).await.unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, NotificationKind::Success);
    assert!(notifications[0].body.contains("$1,500.00"));

    let balance = desk.balance(&alice, alice.id, Track::Primary).await.unwrap();
    assert_eq!(balance.amount, Decimal::from(1500));
}

#[tokio::test]
async fn test_approve_twice_is_conflict() {
    let (desk, adapter, admin) = setup();
    let alice = investor(&adapter, "alice").await;

    let request = desk
        .submit_request(&alice, Track::Primary, RequestKind::Deposit, Decimal::from(100))
        .await
        .unwrap();
    desk.approve(&admin, request.id).await.unwrap();

    let second = desk.approve(&admin, request.id).await;
    assert!(matches!(second, Err(Error::Conflict(_))));
    assert!(second.unwrap_err().is_retryable());

    let entries = adapter
        .entries(EntryFilter::account(alice.id, Track::Primary))
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(desk.notifications(&alice).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_approvals_write_one_entry() {
    let (desk, adapter, admin) = setup();
    let alice = investor(&adapter, "alice").await;

    let request = desk
        .submit_request(&alice, Track::Primary, RequestKind::Deposit, Decimal::from(250))
        .await
        .unwrap();

    let first = desk.clone();
    let second = desk.clone();
    let (a, b) = tokio::join!(
        tokio::spawn(async move { first.approve(&admin, request.id).await }),
        tokio::spawn(async move { second.approve(&admin, request.id).await }),
    );
    let results = [a.unwrap(), b.unwrap()];

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .any(|r| matches!(r, Err(Error::Conflict(_))))
    );

    let entries = adapter
        .entries(EntryFilter::account(alice.id, Track::Primary))
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn test_reject_requires_reason() {
    let (desk, adapter, admin) = setup();
    let alice = investor(&adapter, "alice").await;

    let request = desk
        .submit_request(&alice, Track::Primary, RequestKind::Deposit, Decimal::from(100))
        .await
        .unwrap();

    let err = desk.reject(&admin, request.id, "   ").await;
    assert!(matches!(err, Err(Error::Validation(_))));

    let stored = adapter.fetch_request(request.id).await.unwrap().unwrap();
    assert_eq!(stored.state, RequestState::Pending);
    assert!(desk.notifications(&alice).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_reject_notifies_with_reason() {
    let (desk, adapter, admin) = setup();
    let alice = investor(&adapter, "alice").await;

    let request = desk
        .submit_request(&alice, Track::Primary, RequestKind::Deposit, Decimal::from(100))
        .await
        .unwrap();
    let rejected = desk
        .reject(&admin, request.id, " transfer not received ")
        .await
        .unwrap();

    assert_eq!(rejected.state, RequestState::Rejected);
    assert_eq!(
        rejected.rejection_reason.as_deref(),
        Some("transfer not received")
    );

    let notifications = desk.notifications(&alice).await.unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, NotificationKind::Error);
    assert!(notifications[0].body.ends_with("Reason: transfer not received"));

    let entries = desk.entries(&alice, alice.id, Track::Primary).await.unwrap();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn test_only_admins_resolve() {
    let (desk, adapter, _admin) = setup();
    let alice = investor(&adapter, "alice").await;

    let request = desk
        .submit_request(&alice, Track::Primary, RequestKind::Deposit, Decimal::from(100))
        .await
        .unwrap();

    assert!(matches!(
        desk.approve(&alice, request.id).await,
        Err(Error::Unauthorized(_))
    ));
    assert!(matches!(
        desk.reject(&alice, request.id, "no").await,
        Err(Error::Unauthorized(_))
    ));
}

#[tokio::test]
async fn test_withdraw_request_rules() {
    let (desk, adapter, admin) = setup();
    let alice = investor(&adapter, "alice").await;
    let bob = investor(&adapter, "bob").await;

    let pending = desk
        .submit_request(&alice, Track::Primary, RequestKind::Deposit, Decimal::from(100))
        .await
        .unwrap();

    let err = desk.withdraw_request(&bob, pending.id).await;
    assert!(matches!(err, Err(Error::Unauthorized(_))));
    assert!(adapter.fetch_request(pending.id).await.unwrap().is_some());

    desk.withdraw_request(&alice, pending.id).await.unwrap();
    assert!(adapter.fetch_request(pending.id).await.unwrap().is_none());

    let approved = desk
        .submit_request(&alice, Track::Primary, RequestKind::Deposit, Decimal::from(100))
        .await
        .unwrap();
    desk.approve(&admin, approved.id).await.unwrap();

    let err = desk.withdraw_request(&alice, approved.id).await;
    assert!(matches!(err, Err(Error::Conflict(_))));
    let stored = adapter.fetch_request(approved.id).await.unwrap().unwrap();
    assert_eq!(stored.state, RequestState::Approved);
}

#[tokio::test]
async fn test_one_pending_request_per_kind() {
    let (desk, adapter, _admin) = setup();
    let alice = investor(&adapter, "alice").await;

    desk.submit_request(&alice, Track::Primary, RequestKind::Deposit, Decimal::from(100))
        .await
        .unwrap();
    let duplicate = desk
        .submit_request(&alice, Track::Primary, RequestKind::Deposit, Decimal::from(200))
        .await;
    assert!(matches!(duplicate, Err(Error::Conflict(_))));

    let requests = desk
        .requests(&alice, RequestFilter::pending(Track::Primary))
        .await
        .unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].amount, Decimal::from(100));
}

#[tokio::test]
async fn test_submit_validation() {
    let (desk, adapter, admin) = setup();
    let alice = investor(&adapter, "alice").await;

    for bad in [
        Decimal::ZERO,
        Decimal::from(-5),
        Decimal::new(105, 1),
        MAX_REQUEST_AMOUNT + Decimal::ONE,
        Decimal::MAX,
    ] {
        let err = desk
            .submit_request(&alice, Track::Primary, RequestKind::Deposit, bad)
            .await;
        assert!(matches!(err, Err(Error::Validation(_))), "{}", bad);
    }

    fund(&desk, &admin, &alice, Track::Primary, 100).await;
    let err = desk
        .submit_request(&alice, Track::Primary, RequestKind::Withdrawal, Decimal::from(101))
        .await;
    assert!(matches!(err, Err(Error::Validation(_))));

    let ok = desk
        .submit_request(&alice, Track::Primary, RequestKind::Withdrawal, Decimal::from(100))
        .await
        .unwrap();
    desk.approve(&admin, ok.id).await.unwrap();
    let balance = desk.balance(&alice, alice.id, Track::Primary).await.unwrap();
    assert_eq!(balance.amount, Decimal::ZERO);
}

#[tokio::test]
async fn test_temporal_track_requires_active_module() {
    let (desk, adapter, admin) = setup();
    let alice = investor(&adapter, "alice").await;

    let err = desk
        .submit_request(&alice, Track::Temporal, RequestKind::Deposit, Decimal::from(100))
        .await;
    assert!(matches!(err, Err(Error::BusinessRule(_))));
    assert_eq!(
        desk.dashboard_tracks(&alice).await.unwrap(),
        vec![Track::Primary]
    );

    enable_temporal(&desk, &admin).await;
    desk.submit_request(&alice, Track::Temporal, RequestKind::Deposit, Decimal::from(100))
        .await
        .unwrap();
    assert_eq!(
        desk.dashboard_tracks(&alice).await.unwrap(),
        vec![Track::Primary, Track::Temporal]
    );
}

#[tokio::test]
async fn test_investors_only_list_their_own_requests() {
    let (desk, adapter, admin) = setup();
    let alice = investor(&adapter, "alice").await;
    let bob = investor(&adapter, "bob").await;

    desk.submit_request(&alice, Track::Primary, RequestKind::Deposit, Decimal::from(100))
        .await
        .unwrap();
    desk.submit_request(&bob, Track::Primary, RequestKind::Deposit, Decimal::from(300))
        .await
        .unwrap();

    let mine = desk
        .requests(&alice, RequestFilter::default().for_account(bob.id))
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].account, alice.id);

    let all = desk
        .pending_requests(&admin, Track::Primary)
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
    assert!(all[0].submitted_at >= all[1].submitted_at);
}

// ==================== Distribution ====================

#[tokio::test]
async fn test_distribute_equal_split() {
    let (desk, adapter, admin) = setup();
    enable_temporal(&desk, &admin).await;

    let mut investors = Vec::new();
    for name in ["alice", "bob", "carol"] {
        let caller = investor(&adapter, name).await;
        fund(&desk, &admin, &caller, Track::Temporal, 100).await;
        investors.push(caller);
    }

    let outcome = desk
        .distribute(&admin, Track::Temporal, Decimal::from(10), run_id_for("temporal-1"))
        .await
        .unwrap();
    assert!(!outcome.replayed);
    assert_eq!(outcome.run.total_payout, Decimal::from(30));
    assert_eq!(outcome.run.per_account, Decimal::from(10));
    assert_eq!(outcome.run.accounts.len(), 3);

    for caller in &investors {
        let entries = desk.entries(caller, caller.id, Track::Temporal).await.unwrap();
        let gains: Vec<_> = entries.iter().filter(|e| e.kind == EntryKind::Gain).collect();
        assert_eq!(gains.len(), 1);
        assert_eq!(gains[0].amount, Decimal::from(10));
        assert_eq!(gains[0].run_id, Some(outcome.run.id));

        let balance = desk.balance(caller, caller.id, Track::Temporal).await.unwrap();
        assert_eq!(balance.amount, Decimal::from(110));

        let notifications = desk.notifications(caller).await.unwrap();
        assert_eq!(notifications.len(), 2);
        assert_eq!(notifications[0].title, "Temporal Gain processed");
    }

    // the primary track is untouched
    let primary = adapter
        .entries(EntryFilter::track(Track::Primary))
        .await
        .unwrap();
    assert!(primary.is_empty());
}

#[tokio::test]
async fn test_distribute_without_entries_writes_nothing() {
    let (desk, adapter, admin) = setup();
    let alice = investor(&adapter, "alice").await;

    let err = desk
        .distribute(&admin, Track::Temporal, Decimal::from(10), Uuid::now_v7())
        .await;
    assert!(matches!(err, Err(Error::BusinessRule(_))));

    assert!(desk.distribution_runs(&admin, Track::Temporal).await.unwrap().is_empty());
    assert!(desk.notifications(&alice).await.unwrap().is_empty());
    assert!(
        adapter
            .entries(EntryFilter::default())
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_zero_principal_distribution_pays_zero_gains() {
    let (desk, adapter, admin) = setup();
    let alice = investor(&adapter, "alice").await;
    fund(&desk, &admin, &alice, Track::Primary, 100).await;
    let withdrawal = desk
        .submit_request(&alice, Track::Primary, RequestKind::Withdrawal, Decimal::from(100))
        .await
        .unwrap();
    desk.approve(&admin, withdrawal.id).await.unwrap();

    let outcome = desk
        .distribute(&admin, Track::Primary, Decimal::from(10), Uuid::now_v7())
        .await
        .unwrap();
    assert_eq!(outcome.run.principal, Decimal::ZERO);
    assert_eq!(outcome.run.per_account, Decimal::ZERO);
    assert_eq!(outcome.run.accounts, vec![alice.id]);

    let gains: Vec<_> = desk
        .entries(&alice, alice.id, Track::Primary)
        .await
        .unwrap()
        .into_iter()
        .filter(|e| e.kind == EntryKind::Gain)
        .collect();
    assert_eq!(gains.len(), 1);
    assert_eq!(gains[0].amount, Decimal::ZERO);

    let notifications = desk.notifications(&alice).await.unwrap();
    assert_eq!(notifications.len(), 3);
    assert_eq!(notifications[0].title, "Gain processed");
}

#[tokio::test]
async fn test_distribute_large_principal() {
    let (desk, adapter, admin) = setup();
    let alice = investor(&adapter, "alice").await;
    let principal = Decimal::from_i128_with_scale(10i128.pow(27), 0);
    append_deposit(&adapter, &alice, Track::Primary, principal).await;

    let outcome = desk
        .distribute(&admin, Track::Primary, Decimal::ONE_HUNDRED, Uuid::now_v7())
        .await
        .unwrap();
    assert_eq!(outcome.run.total_payout, principal);
    assert_eq!(outcome.run.per_account, principal);
}

#[tokio::test]
async fn test_unsummable_entries_fail_without_writes() {
    let (desk, adapter, admin) = setup();
    let alice = investor(&adapter, "alice").await;
    append_deposit(&adapter, &alice, Track::Primary, Decimal::MAX).await;
    append_deposit(&adapter, &alice, Track::Primary, Decimal::MAX).await;

    assert!(matches!(
        desk.balance(&alice, alice.id, Track::Primary).await,
        Err(Error::Storage(_))
    ));
    assert!(matches!(
        desk.breakdown(&alice, alice.id, Track::Primary).await,
        Err(Error::Storage(_))
    ));
    assert!(matches!(
        desk.track_summary(&admin, Track::Primary).await,
        Err(Error::Storage(_))
    ));
    assert!(matches!(desk.overview(&admin).await, Err(Error::Storage(_))));

    let err = desk
        .distribute(&admin, Track::Primary, Decimal::from(10), Uuid::now_v7())
        .await;
    assert!(matches!(err, Err(Error::Storage(_))));
    assert!(desk.distribution_runs(&admin, Track::Primary).await.unwrap().is_empty());
    assert!(desk.notifications(&alice).await.unwrap().is_empty());

    // the temporal track is unaffected
    assert_eq!(
        desk.balance(&alice, alice.id, Track::Temporal).await.unwrap().amount,
        Decimal::ZERO
    );
}

#[tokio::test]
async fn test_distribute_rejects_bad_percentage() {
    let (desk, adapter, admin) = setup();
    let alice = investor(&adapter, "alice").await;
    fund(&desk, &admin, &alice, Track::Primary, 100).await;

    for bad in [Decimal::ZERO, Decimal::from(150)] {
        let err = desk
            .distribute(&admin, Track::Primary, bad, Uuid::now_v7())
            .await;
        assert!(matches!(err, Err(Error::Validation(_))), "{}", bad);
    }

    let err = desk
        .distribute(&alice, Track::Primary, Decimal::from(5), Uuid::now_v7())
        .await;
    assert!(matches!(err, Err(Error::Unauthorized(_))));
}

#[tokio::test]
async fn test_replayed_run_writes_nothing() {
    let (desk, adapter, admin) = setup();
    let alice = investor(&adapter, "alice").await;
    fund(&desk, &admin, &alice, Track::Primary, 1000).await;

    let run_id = run_id_for("primary-2025-03");
    let first = desk
        .distribute(&admin, Track::Primary, Decimal::from(5), run_id)
        .await
        .unwrap();
    let replay = desk
        .distribute(&admin, Track::Primary, Decimal::from(5), run_id)
        .await
        .unwrap();

    assert!(replay.replayed);
    assert_eq!(replay.run, first.run);

    let balance = desk.balance(&alice, alice.id, Track::Primary).await.unwrap();
    assert_eq!(balance.amount, Decimal::from(1050));
    assert_eq!(desk.distribution_runs(&admin, Track::Primary).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_failed_distribution_leaves_no_partial_payout() {
    let (desk, adapter, admin) = setup();
    let alice = investor(&adapter, "alice").await;
    let bob = investor(&adapter, "bob").await;
    fund(&desk, &admin, &alice, Track::Primary, 100).await;
    fund(&desk, &admin, &bob, Track::Primary, 100).await;

    adapter.fail_next("notify");
    let run_id = Uuid::now_v7();
    let err = desk
        .distribute(&admin, Track::Primary, Decimal::from(10), run_id)
        .await;
    assert!(matches!(err, Err(Error::Storage(_))));

    let gains = adapter
        .entries(EntryFilter::track(Track::Primary))
        .await
        .unwrap()
        .into_iter()
        .filter(|e| e.kind == EntryKind::Gain)
        .count();
    assert_eq!(gains, 0);
    assert!(adapter.fetch_run(run_id).await.unwrap().is_none());

    // retrying with the same run id pays out exactly once
    let outcome = desk
        .distribute(&admin, Track::Primary, Decimal::from(10), run_id)
        .await
        .unwrap();
    assert!(!outcome.replayed);
    let balance = desk.balance(&bob, bob.id, Track::Primary).await.unwrap();
    assert_eq!(balance.amount, Decimal::from(110));
}

#[tokio::test]
async fn test_preview_distribution_reports_remainder() {
    let (desk, adapter, admin) = setup();
    for (name, amount) in [("alice", 50), ("bob", 25), ("carol", 25)] {
        let caller = investor(&adapter, name).await;
        fund(&desk, &admin, &caller, Track::Primary, amount).await;
    }

    let preview = desk
        .preview_distribution(&admin, Track::Primary, Decimal::ONE)
        .await
        .unwrap();
    assert_eq!(preview.per_account, Decimal::new(33, 2));
    assert_eq!(preview.remainder, Decimal::new(1, 2));
    assert!(desk.distribution_runs(&admin, Track::Primary).await.unwrap().is_empty());
}

// ==================== Notifications ====================

#[tokio::test]
async fn test_notification_read_and_dismiss() {
    let (desk, adapter, admin) = setup();
    let alice = investor(&adapter, "alice").await;
    let bob = investor(&adapter, "bob").await;
    fund(&desk, &admin, &alice, Track::Primary, 100).await;
    fund(&desk, &admin, &alice, Track::Primary, 200).await;

    assert_eq!(desk.unread_count(&alice).await.unwrap(), 2);
    let notifications = desk.notifications(&alice).await.unwrap();
    let newest = notifications[0].id;

    assert!(matches!(
        desk.mark_read(&bob, newest).await,
        Err(Error::Unauthorized(_))
    ));

    desk.mark_read(&alice, newest).await.unwrap();
    assert_eq!(desk.unread_count(&alice).await.unwrap(), 1);

    desk.dismiss(&alice, newest).await.unwrap();
    assert_eq!(desk.notifications(&alice).await.unwrap().len(), 1);
    assert!(matches!(
        desk.dismiss(&alice, newest).await,
        Err(Error::NotFound(_))
    ));
}

// ==================== Announcements ====================

#[tokio::test]
async fn test_broadcast_announcement_notifies_every_account() {
    let (desk, adapter, admin) = setup();
    let alice = investor(&adapter, "alice").await;
    let bob = investor(&adapter, "bob").await;

    let draft = AnnouncementDraft::new(
        "Maintenance",
        "Statements are unavailable on Friday",
        NotificationKind::Warning,
    )
    .broadcast();
    desk.create_announcement(&admin, draft).await.unwrap();

    for caller in [&alice, &bob] {
        let notifications = desk.notifications(caller).await.unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].title, "Maintenance");
        assert_eq!(notifications[0].kind, NotificationKind::Warning);
    }
}

#[tokio::test]
async fn test_investors_see_only_visible_announcements() {
    let (desk, adapter, admin) = setup();
    let alice = investor(&adapter, "alice").await;

    let live = desk
        .create_announcement(
            &admin,
            AnnouncementDraft::new("New fund", "Opens next month", NotificationKind::Info),
        )
        .await
        .unwrap();
    desk.create_announcement(
        &admin,
        AnnouncementDraft::new("Old", "Already over", NotificationKind::Info)
            .expiring_at(Utc::now() - Duration::hours(1)),
    )
    .await
    .unwrap();
    let hidden = desk
        .create_announcement(
            &admin,
            AnnouncementDraft::new("Draft", "Not yet", NotificationKind::Success),
        )
        .await
        .unwrap();
    desk.set_announcement_active(&admin, hidden.id, false)
        .await
        .unwrap();

    let visible = desk.announcements(&alice).await.unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].id, live.id);
    assert_eq!(desk.announcements(&admin).await.unwrap().len(), 3);

    assert!(matches!(
        desk.create_announcement(
            &alice,
            AnnouncementDraft::new("x", "y", NotificationKind::Info)
        )
        .await,
        Err(Error::Unauthorized(_))
    ));

    desk.delete_announcement(&admin, live.id).await.unwrap();
    assert!(desk.announcements(&alice).await.unwrap().is_empty());
    assert!(matches!(
        desk.delete_announcement(&admin, live.id).await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn test_update_announcement() {
    let (desk, _adapter, admin) = setup();

    let created = desk
        .create_announcement(
            &admin,
            AnnouncementDraft::new("Rates", "Draft text", NotificationKind::Info),
        )
        .await
        .unwrap();
    let updated = desk
        .update_announcement(
            &admin,
            created.id,
            AnnouncementDraft::new(" Rates ", "Final text", NotificationKind::Success),
        )
        .await
        .unwrap();

    assert_eq!(updated.title, "Rates");
    assert_eq!(updated.body, "Final text");
    assert_eq!(updated.kind, NotificationKind::Success);
    assert_eq!(updated.created_at, created.created_at);
}

// ==================== Temporal module ====================

#[tokio::test]
async fn test_temporal_module_configuration() {
    let (desk, adapter, admin) = setup();
    let alice = investor(&adapter, "alice").await;

    let module = desk.temporal_module().await.unwrap();
    assert!(!module.active);
    assert_eq!(module.title, "Temporal Report");

    let err = desk
        .configure_temporal_module(&admin, true, "  ", "")
        .await;
    assert!(matches!(err, Err(Error::Validation(_))));
    let err = desk
        .configure_temporal_module(&alice, true, "Side fund", "")
        .await;
    assert!(matches!(err, Err(Error::Unauthorized(_))));

    let saved = desk
        .configure_temporal_module(&admin, true, " Side fund ", "")
        .await
        .unwrap();
    assert_eq!(saved.title, "Side fund");
    assert_eq!(saved.description, capital_desk::DEFAULT_CONFIG_NOTE);
    assert_eq!(desk.temporal_module().await.unwrap(), saved);
}

// ==================== Read models ====================

#[tokio::test]
async fn test_read_models_respect_ownership() {
    let (desk, adapter, admin) = setup();
    let alice = investor(&adapter, "alice").await;
    let bob = investor(&adapter, "bob").await;
    fund(&desk, &admin, &alice, Track::Primary, 100).await;

    assert!(matches!(
        desk.balance(&bob, alice.id, Track::Primary).await,
        Err(Error::Unauthorized(_))
    ));
    assert!(matches!(
        desk.entries(&bob, alice.id, Track::Primary).await,
        Err(Error::Unauthorized(_))
    ));
    assert!(matches!(
        desk.track_summary(&bob, Track::Primary).await,
        Err(Error::Unauthorized(_))
    ));

    let balance = desk.balance(&admin, alice.id, Track::Primary).await.unwrap();
    assert_eq!(balance.amount, Decimal::from(100));
}

#[tokio::test]
async fn test_breakdown_and_monthly_gains() {
    let (desk, adapter, admin) = setup();
    let alice = investor(&adapter, "alice").await;

    let chart = desk
        .monthly_gains(&alice, alice.id, Track::Primary)
        .await
        .unwrap();
    assert_eq!(chart.len(), 1);
    assert_eq!(chart[0].total, Decimal::ZERO);

    fund(&desk, &admin, &alice, Track::Primary, 400).await;
    desk.distribute(&admin, Track::Primary, Decimal::from(25), Uuid::now_v7())
        .await
        .unwrap();

    let breakdown = desk
        .breakdown(&alice, alice.id, Track::Primary)
        .await
        .unwrap();
    assert_eq!(breakdown.deposits, Decimal::from(400));
    assert_eq!(breakdown.gains, Decimal::from(100));
    assert_eq!(breakdown.balance(), Decimal::from(500));

    let chart = desk
        .monthly_gains(&alice, alice.id, Track::Primary)
        .await
        .unwrap();
    assert_eq!(chart.len(), 1);
    assert_eq!(chart[0].total, Decimal::from(100));
}

#[tokio::test]
async fn test_track_summary_and_overview() {
    let (desk, adapter, admin) = setup();
    let alice = investor(&adapter, "alice").await;
    let bob = investor(&adapter, "bob").await;
    fund(&desk, &admin, &alice, Track::Primary, 300).await;
    fund(&desk, &admin, &bob, Track::Primary, 200).await;
    desk.submit_request(&bob, Track::Primary, RequestKind::Withdrawal, Decimal::from(50))
        .await
        .unwrap();
    desk.create_announcement(
        &admin,
        AnnouncementDraft::new("Hello", "Welcome aboard", NotificationKind::Info),
    )
    .await
    .unwrap();

    let summary = desk.track_summary(&admin, Track::Primary).await.unwrap();
    assert_eq!(summary.investors, 2);
    assert_eq!(summary.principal, Decimal::from(500));
    assert_eq!(summary.total_gains, Decimal::ZERO);

    let overview = desk.overview(&admin).await.unwrap();
    assert_eq!(overview.investors, 2);
    assert_eq!(overview.pending_requests, 1);
    assert_eq!(overview.active_announcements, 1);
    assert_eq!(overview.primary_principal, Decimal::from(500));

    assert!(matches!(
        desk.overview(&alice).await,
        Err(Error::Unauthorized(_))
    ));
}
