//! Property-based checks of P1 (snapshot atomicity) and P5 (conservation)
//! over randomized transfer workloads, run single-threaded since proptest
//! shrinking needs a deterministic replay.

use proptest::prelude::*;

use babydb::core::types::{Key, Schema, Tuple};
use babydb::core::Config;
use babydb::engine::{Database, IndexKind};
use babydb::index::Index;

const NUM_KEYS: u64 = 8;
const TOTAL: i64 = 50;

fn new_bank() -> Database {
    let db = Database::new(Config::default());
    db.create_table("accounts", Schema::new(["key", "balance"]), 0).unwrap();
    db.create_index("accounts_pk", "accounts", "key", IndexKind::Art).unwrap();

    let seed = db.create_txn();
    let table = db.catalog().table("accounts").unwrap();
    for key in 0..NUM_KEYS {
        let row_id = table.rows().write().push(Tuple::new(vec![key as i64, TOTAL]));
        let mut guard = seed.transaction().lock();
        table.with_index(|_, idx| idx.as_index().insert(key, row_id, &mut *guard)).unwrap().unwrap();
    }
    assert!(seed.commit().unwrap());
    db
}

fn balance(db: &Database, key: Key) -> i64 {
    let txn = db.create_txn();
    let table = db.catalog().table("accounts").unwrap();
    let mut guard = txn.transaction().lock();
    let row_id = table.with_index(|_, idx| idx.as_index().lookup(key, &mut *guard)).unwrap();
    drop(guard);
    let value = table.rows().read().row(row_id).tuple.key_from_tuple(1) as i64;
    txn.commit().unwrap();
    value
}

fn sum_all(db: &Database) -> i64 {
    (0..NUM_KEYS).map(|k| balance(db, k)).sum()
}

/// Moves one unit from `from` to `to` if `from` has anything to give,
/// retrying under snapshot isolation until it either applies cleanly or
/// finds there's nothing to move.
fn transfer_one(db: &Database, from: Key, to: Key) {
    if from == to {
        return;
    }
    loop {
        let txn = db.create_txn();
        let table = db.catalog().table("accounts").unwrap();
        let (from_row, to_row) = {
            let mut guard = txn.transaction().lock();
            let f = table.with_index(|_, idx| idx.as_index().lookup(from, &mut *guard)).unwrap();
            let t = table.with_index(|_, idx| idx.as_index().lookup(to, &mut *guard)).unwrap();
            (f, t)
        };
        let (from_balance, to_balance) = {
            let rows = table.rows().read();
            (rows.row(from_row).tuple.key_from_tuple(1) as i64, rows.row(to_row).tuple.key_from_tuple(1) as i64)
        };
        if from_balance < 1 {
            txn.commit().unwrap();
            return;
        }
        let new_from = table.rows().write().push(Tuple::new(vec![from as i64, from_balance - 1]));
        let new_to = table.rows().write().push(Tuple::new(vec![to as i64, to_balance + 1]));
        {
            let mut guard = txn.transaction().lock();
            table.with_index(|_, idx| idx.as_index().insert_for_update(from, new_from, &mut *guard)).unwrap().unwrap();
            table.with_index(|_, idx| idx.as_index().insert_for_update(to, new_to, &mut *guard)).unwrap().unwrap();
        }
        if txn.commit().unwrap() {
            return;
        }
    }
}

proptest! {
    /// P5 conservation: any serial sequence of transfers leaves the total
    /// balance across all keys unchanged.
    #[test]
    fn total_balance_is_conserved(transfers in prop::collection::vec((0..NUM_KEYS, 0..NUM_KEYS), 0..200)) {
        let db = new_bank();
        let before = sum_all(&db);
        for (from, to) in transfers {
            transfer_one(&db, from, to);
        }
        prop_assert_eq!(sum_all(&db), before);
    }

    /// P1 snapshot atomicity: a transaction created before a transfer
    /// commits never observes a partial effect of it — either both sides
    /// of the pair are visible at their pre-transfer values, or both are
    /// visible at their post-transfer values, never a mix.
    #[test]
    fn reader_never_sees_a_partial_transfer(from in 0..NUM_KEYS, to in 0..NUM_KEYS) {
        prop_assume!(from != to);
        let db = new_bank();
        let reader = db.create_txn();
        transfer_one(&db, from, to);

        let table = db.catalog().table("accounts").unwrap();
        let mut guard = reader.transaction().lock();
        let from_row = table.with_index(|_, idx| idx.as_index().lookup(from, &mut *guard)).unwrap();
        let to_row = table.with_index(|_, idx| idx.as_index().lookup(to, &mut *guard)).unwrap();
        drop(guard);
        let rows = table.rows().read();
        let from_balance = rows.row(from_row).tuple.key_from_tuple(1) as i64;
        let to_balance = rows.row(to_row).tuple.key_from_tuple(1) as i64;
        drop(rows);
        reader.commit().unwrap();

        prop_assert_eq!(from_balance + to_balance, 2 * TOTAL);
    }
}
