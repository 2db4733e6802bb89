//! Minimal demonstration: generic logic over a bag of accounts, bound to
//! local data through the synchronous engine.

use bagpipe_eval::SyncMem;
use bagpipe_ir::input;

struct Account {
    name: String,
    total: f64,
}

fn main() {
    // Logic, written against unbound data.
    let accounts = input::<Account>();
    let sum = accounts.map(|a| a.total).reduce_all(|a, b| a + b);

    // Data, bound at the edge.
    let mem = SyncMem::new();
    mem.set(
        &accounts,
        vec![
            Account { name: "First Account".to_string(), total: 123.00 },
            Account { name: "Second Account".to_string(), total: 123.45 },
        ],
    );

    for name in mem.get(&accounts.map(|a| a.name.clone())).expect("accounts are bound") {
        println!("account: {name}");
    }
    let total = mem.get(&sum).expect("accounts are bound")[0];
    println!("total: {total:.2}");
}
