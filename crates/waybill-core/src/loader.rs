//! The transactional loader.
//!
//! Maps a sequence of [`Order`]s onto the relational store inside one
//! transaction: per order, resolve-or-create the customer, insert the
//! purchase under a scoped identity override, then resolve-or-create each
//! line item's product and insert the link row. Commit happens once, after
//! the last order; any failure rolls the whole run back.

use crate::{
  error::LoadError,
  order::Order,
  store::{OrderStore, StoreTransaction},
};

// ─── Report ──────────────────────────────────────────────────────────────────

/// Counts of what a successful load wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
  pub orders:     usize,
  pub line_items: usize,
}

// ─── Internal failure carrier ────────────────────────────────────────────────

/// What went wrong before rollback was attempted.
enum Failure<E, S> {
  Source(E),
  Store(S),
}

impl<E, S> Failure<E, S>
where
  E: std::error::Error + 'static,
  S: std::error::Error + 'static,
{
  fn rolled_back(self) -> LoadError<E, S> {
    match self {
      Failure::Source(e) => LoadError::Source(e),
      Failure::Store(e) => LoadError::Store(e),
    }
  }

  fn rollback_failed(self, rollback: S) -> LoadError<E, S> {
    match self {
      Failure::Source(cause) => LoadError::RollbackAfterSource { cause, rollback },
      Failure::Store(cause) => LoadError::RollbackAfterStore { cause, rollback },
    }
  }
}

// ─── Loader ──────────────────────────────────────────────────────────────────

/// Load `orders` into `store` inside one transaction.
///
/// The transaction is opened before the first order and either committed
/// after the last one or rolled back on the first failure; a failing run
/// leaves the store unchanged. The order source may itself fail mid-stream
/// (a lazily-parsing reader); that aborts the run the same way a store
/// failure does.
pub fn load<S, I, E>(
  store: &mut S,
  orders: I,
) -> Result<LoadReport, LoadError<E, S::Error>>
where
  S: OrderStore,
  I: IntoIterator<Item = Result<Order, E>>,
  E: std::error::Error + Send + Sync + 'static,
{
  let tx = store.begin().map_err(LoadError::Store)?;
  let mut report = LoadReport::default();

  match import_all(&tx, orders, &mut report) {
    Ok(()) => {
      tx.commit().map_err(LoadError::Store)?;
      tracing::debug!(orders = report.orders, "transaction committed");
      Ok(report)
    }
    Err(failure) => Err(match tx.rollback() {
      Ok(()) => failure.rolled_back(),
      Err(rollback) => failure.rollback_failed(rollback),
    }),
  }
}

fn import_all<T, I, E>(
  tx: &T,
  orders: I,
  report: &mut LoadReport,
) -> Result<(), Failure<E, T::Error>>
where
  T: StoreTransaction,
  I: IntoIterator<Item = Result<Order, E>>,
{
  for order in orders {
    let order = order.map_err(Failure::Source)?;
    import_order(tx, &order).map_err(Failure::Store)?;
    tracing::debug!(
      order = order.id,
      items = order.line_items.len(),
      "order imported"
    );
    report.orders += 1;
    report.line_items += order.line_items.len();
  }
  Ok(())
}

fn import_order<T: StoreTransaction>(
  tx: &T,
  order: &Order,
) -> Result<(), T::Error> {
  let customer_id = tx.resolve_or_create_customer(&order.customer)?;

  // The purchase key comes from the source document, so the insert runs
  // under identity-override mode. The guard must not outlive this one
  // insert; dropping it releases the mode on every exit path.
  {
    let _identity_override = tx.identity_override()?;
    tx.insert_purchase(
      order.id,
      customer_id,
      &order.registration_date,
      order.total_cost,
    )?;
  }

  for item in &order.line_items {
    let product_id =
      tx.resolve_or_create_product(&item.product_name, item.unit_price)?;
    tx.insert_purchase_item(order.id, product_id, item.quantity, item.unit_price)?;
  }

  Ok(())
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::cell::RefCell;

  use rust_decimal::Decimal;
  use thiserror::Error;

  use super::*;
  use crate::order::{Customer, LineItem};

  // ── In-memory store ───────────────────────────────────────────────────────

  #[derive(Debug, Error, PartialEq, Eq)]
  enum MemError {
    #[error("injected failure on purchase {0}")]
    Injected(i64),
    #[error("duplicate purchase id {0}")]
    DuplicatePurchase(i64),
    #[error("explicit purchase ids require identity-override mode")]
    OverrideDisabled,
    #[error("rollback failed")]
    RollbackFailed,
  }

  #[derive(Debug, Error)]
  #[error("malformed record: {0}")]
  struct Malformed(&'static str);

  #[derive(Default)]
  struct MemState {
    customers:       Vec<(String, String)>,
    products:        Vec<(String, Decimal)>,
    purchases:       Vec<(i64, i64, String, Decimal)>,
    items:           Vec<(i64, i64, i64, Decimal)>,
    override_active: bool,
    commits:         usize,
    rollback_calls:  usize,
    // failure injection
    fail_purchase:   Option<i64>,
    fail_rollback:   bool,
  }

  #[derive(Default)]
  struct MemStore {
    state: RefCell<MemState>,
  }

  struct MemTx<'s> {
    state: &'s RefCell<MemState>,
  }

  struct MemOverride<'s> {
    state: &'s RefCell<MemState>,
  }

  impl Drop for MemOverride<'_> {
    fn drop(&mut self) {
      self.state.borrow_mut().override_active = false;
    }
  }

  impl OrderStore for MemStore {
    type Error = MemError;
    type Tx<'conn>
      = MemTx<'conn>
    where
      Self: 'conn;

    fn begin(&mut self) -> Result<MemTx<'_>, MemError> {
      Ok(MemTx { state: &self.state })
    }
  }

  impl StoreTransaction for MemTx<'_> {
    type Error = MemError;
    type IdentityOverride<'o>
      = MemOverride<'o>
    where
      Self: 'o;

    fn resolve_or_create_customer(
      &self,
      customer: &Customer,
    ) -> Result<i64, MemError> {
      let mut state = self.state.borrow_mut();
      let key = (customer.full_name.clone(), customer.email.clone());
      if let Some(pos) = state.customers.iter().position(|c| *c == key) {
        return Ok(pos as i64 + 1);
      }
      state.customers.push(key);
      Ok(state.customers.len() as i64)
    }

    fn resolve_or_create_product(
      &self,
      name: &str,
      start_price: Decimal,
    ) -> Result<i64, MemError> {
      let mut state = self.state.borrow_mut();
      let key = (name.to_string(), start_price);
      if let Some(pos) = state.products.iter().position(|p| *p == key) {
        return Ok(pos as i64 + 1);
      }
      state.products.push(key);
      Ok(state.products.len() as i64)
    }

    fn identity_override(&self) -> Result<MemOverride<'_>, MemError> {
      self.state.borrow_mut().override_active = true;
      Ok(MemOverride { state: self.state })
    }

    fn insert_purchase(
      &self,
      id: i64,
      customer_id: i64,
      purchase_date: &str,
      total_cost: Decimal,
    ) -> Result<(), MemError> {
      let mut state = self.state.borrow_mut();
      if !state.override_active {
        return Err(MemError::OverrideDisabled);
      }
      if state.fail_purchase == Some(id) {
        return Err(MemError::Injected(id));
      }
      if state.purchases.iter().any(|p| p.0 == id) {
        return Err(MemError::DuplicatePurchase(id));
      }
      state
        .purchases
        .push((id, customer_id, purchase_date.to_string(), total_cost));
      Ok(())
    }

    fn insert_purchase_item(
      &self,
      purchase_id: i64,
      product_id: i64,
      count: i64,
      price: Decimal,
    ) -> Result<(), MemError> {
      self
        .state
        .borrow_mut()
        .items
        .push((purchase_id, product_id, count, price));
      Ok(())
    }

    fn commit(self) -> Result<(), MemError> {
      self.state.borrow_mut().commits += 1;
      Ok(())
    }

    fn rollback(self) -> Result<(), MemError> {
      let mut state = self.state.borrow_mut();
      state.rollback_calls += 1;
      if state.fail_rollback {
        return Err(MemError::RollbackFailed);
      }
      state.customers.clear();
      state.products.clear();
      state.purchases.clear();
      state.items.clear();
      Ok(())
    }
  }

  // ── Fixtures ──────────────────────────────────────────────────────────────

  fn dec(s: &str) -> Decimal { s.parse().unwrap() }

  fn order(id: i64, email: &str, items: Vec<LineItem>) -> Order {
    Order {
      id,
      registration_date: "2024-01-01".into(),
      total_cost: dec("199.99"),
      customer: Customer {
        full_name: "Jane Doe".into(),
        email:     email.into(),
      },
      line_items: items,
    }
  }

  fn widget(price: &str, quantity: i64) -> LineItem {
    LineItem {
      product_name: "Widget".into(),
      unit_price:   dec(price),
      quantity,
    }
  }

  fn ok_orders(orders: Vec<Order>) -> Vec<Result<Order, Malformed>> {
    orders.into_iter().map(Ok).collect()
  }

  // ── Success path ──────────────────────────────────────────────────────────

  #[test]
  fn commits_once_and_never_rolls_back_on_success() {
    let mut store = MemStore::default();
    let orders = ok_orders(vec![
      order(1, "jane@x.com", vec![widget("49.99", 2)]),
      order(2, "jane@x.com", vec![widget("49.99", 1), widget("9.99", 3)]),
    ]);

    let report = load(&mut store, orders).unwrap();
    assert_eq!(report, LoadReport { orders: 2, line_items: 3 });

    let state = store.state.borrow();
    assert_eq!(state.commits, 1);
    assert_eq!(state.rollback_calls, 0);
    assert_eq!(state.purchases.len(), 2);
    assert_eq!(state.items.len(), 3);
  }

  #[test]
  fn same_natural_key_resolves_to_one_row() {
    let mut store = MemStore::default();
    let orders = ok_orders(vec![
      order(1, "jane@x.com", vec![widget("49.99", 1)]),
      order(2, "jane@x.com", vec![widget("49.99", 5)]),
    ]);

    load(&mut store, orders).unwrap();

    let state = store.state.borrow();
    assert_eq!(state.customers.len(), 1);
    assert_eq!(state.products.len(), 1);
    // both purchases reference the same resolved customer key
    assert!(state.purchases.iter().all(|p| p.1 == 1));
    // both link rows reference the same resolved product key
    assert!(state.items.iter().all(|i| i.1 == 1));
  }

  #[test]
  fn same_product_name_different_price_is_a_different_product() {
    let mut store = MemStore::default();
    let orders = ok_orders(vec![order(
      1,
      "jane@x.com",
      vec![widget("49.99", 1), widget("39.99", 1)],
    )]);

    load(&mut store, orders).unwrap();
    assert_eq!(store.state.borrow().products.len(), 2);
  }

  #[test]
  fn empty_order_inserts_purchase_without_items() {
    let mut store = MemStore::default();
    let report =
      load(&mut store, ok_orders(vec![order(7, "jane@x.com", vec![])]))
        .unwrap();

    assert_eq!(report, LoadReport { orders: 1, line_items: 0 });
    let state = store.state.borrow();
    assert_eq!(state.purchases.len(), 1);
    assert!(state.items.is_empty());
  }

  // ── Identity override ─────────────────────────────────────────────────────

  #[test]
  fn override_is_released_after_successful_load() {
    let mut store = MemStore::default();
    load(&mut store, ok_orders(vec![order(1, "jane@x.com", vec![])]))
      .unwrap();
    assert!(!store.state.borrow().override_active);
  }

  #[test]
  fn override_is_released_when_the_purchase_insert_fails() {
    let mut store = MemStore::default();
    store.state.borrow_mut().fail_purchase = Some(2);

    let orders = ok_orders(vec![
      order(1, "jane@x.com", vec![]),
      order(2, "jane@x.com", vec![]),
    ]);
    let err = load(&mut store, orders).unwrap_err();

    assert!(matches!(err, LoadError::Store(MemError::Injected(2))));
    assert!(!store.state.borrow().override_active);
  }

  // ── Failure and rollback ──────────────────────────────────────────────────

  #[test]
  fn store_failure_rolls_back_every_order() {
    let mut store = MemStore::default();
    let orders = ok_orders(vec![
      order(1, "jane@x.com", vec![widget("49.99", 1)]),
      order(1, "jane@x.com", vec![]), // duplicate purchase id
    ]);

    let err = load(&mut store, orders).unwrap_err();
    assert!(matches!(
      err,
      LoadError::Store(MemError::DuplicatePurchase(1))
    ));

    let state = store.state.borrow();
    assert_eq!(state.commits, 0);
    assert_eq!(state.rollback_calls, 1);
    assert!(state.purchases.is_empty());
    assert!(state.customers.is_empty());
    assert!(state.items.is_empty());
  }

  #[test]
  fn source_failure_rolls_back() {
    let mut store = MemStore::default();
    let orders = vec![
      Ok(order(1, "jane@x.com", vec![widget("49.99", 1)])),
      Err(Malformed("sum")),
    ];

    let err = load(&mut store, orders).unwrap_err();
    assert!(matches!(err, LoadError::Source(Malformed("sum"))));

    let state = store.state.borrow();
    assert_eq!(state.commits, 0);
    assert_eq!(state.rollback_calls, 1);
    assert!(state.purchases.is_empty());
  }

  #[test]
  fn rollback_failure_reports_both_errors() {
    let mut store = MemStore::default();
    {
      let mut state = store.state.borrow_mut();
      state.fail_purchase = Some(1);
      state.fail_rollback = true;
    }

    let err =
      load(&mut store, ok_orders(vec![order(1, "jane@x.com", vec![])]))
        .unwrap_err();

    let (cause, rollback) = match err {
      LoadError::RollbackAfterStore { cause, rollback } => (cause, rollback),
      other => panic!("expected RollbackAfterStore, got {other}"),
    };
    assert_eq!(cause, MemError::Injected(1));
    assert_eq!(rollback, MemError::RollbackFailed);

    // the rendered message carries both descriptions
    let rendered =
      LoadError::<Malformed, MemError>::RollbackAfterStore { cause, rollback }
        .to_string();
    assert!(rendered.contains("injected failure on purchase 1"));
    assert!(rendered.contains("rollback failed"));
  }

  #[test]
  fn rollback_failure_after_source_error_reports_both_errors() {
    let mut store = MemStore::default();
    store.state.borrow_mut().fail_rollback = true;

    let orders: Vec<Result<Order, Malformed>> = vec![Err(Malformed("no"))];
    let err = load(&mut store, orders).unwrap_err();

    let (cause, rollback) = match err {
      LoadError::RollbackAfterSource { cause, rollback } => (cause, rollback),
      other => panic!("expected RollbackAfterSource, got {other}"),
    };
    assert_eq!(cause.0, "no");
    assert_eq!(rollback, MemError::RollbackFailed);
  }
}
