#[cfg(test)]
use capital_desk::{Account, Adapter, Caller, Desk, RequestKind, ledger::Track};
#[cfg(test)]
use rust_decimal::Decimal;

pub mod test_postgres;

#[cfg(test)]
pub(crate) async fn investor(adapter: &dyn Adapter, name: &str) -> Caller {
    let account = Account::new(name, &format!("{}@example.com", name));
    let id = account.id;
    adapter.upsert_account(account).await.unwrap();
    Caller::investor(id)
}

/// Submit and approve a deposit.
#[cfg(test)]
pub(crate) async fn fund(
    desk: &Desk,
    admin: &Caller,
    investor: &Caller,
    track: Track,
    amount: i64,
) {
    let request = desk
        .submit_request(investor, track, RequestKind::Deposit, Decimal::from(amount))
        .await
        .unwrap();
    desk.approve(admin, request.id).await.unwrap();
}
