//! Property tests for the pool's size invariants.

use dynpool::*;
use proptest::prelude::*;
use std::cell::Cell;

struct Counter {
    created: Cell<u32>,
}

impl PoolFactory<u32> for Counter {
    fn create_new(&self) -> u32 {
        self.created.set(self.created.get() + 1);
        self.created.get()
    }
}

struct Gate {
    accept: Cell<bool>,
}

impl PoolHooks<u32> for Gate {
    fn on_revert(&self, _obj: &u32) -> bool {
        self.accept.get()
    }
}

#[derive(Debug, Clone)]
enum Op {
    Borrow,
    Revert { index: usize, accept: bool },
    Precache(usize),
    RevertAll,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Borrow),
        3 => (any::<usize>(), any::<bool>()).prop_map(|(index, accept)| Op::Revert { index, accept }),
        1 => (0usize..6).prop_map(Op::Precache),
        1 => Just(Op::RevertAll),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn size_never_exceeds_cap(max_size in 0usize..8, ops in prop::collection::vec(op(), 0..64)) {
        let pool = DynamicPool::new(
            max_size,
            Counter { created: Cell::new(0) },
            Gate { accept: Cell::new(true) },
        );
        let mut held: Vec<u32> = Vec::new();
        let mut leaked = 0u32;

        for op in ops {
            match op {
                Op::Borrow => {
                    let before = pool.stats();
                    match pool.borrow() {
                        Ok(obj) => {
                            prop_assert!(!held.contains(&obj));
                            held.push(obj);
                        }
                        Err(err) => {
                            prop_assert_eq!(err, PoolError::PoolExhausted { max_size });
                            prop_assert_eq!(before.free, 0);
                            prop_assert_eq!(pool.stats(), before);
                        }
                    }
                }
                Op::Revert { index, accept } => {
                    if held.is_empty() {
                        continue;
                    }
                    let obj = held.swap_remove(index % held.len());
                    pool.hooks().accept.set(accept);
                    prop_assert!(pool.revert(&obj).is_ok());
                    if !accept {
                        leaked += 1;
                    }
                }
                Op::Precache(amount) => {
                    let size = pool.size();
                    let created = pool.precache(amount);
                    prop_assert_eq!(created, amount.min(max_size - size));
                }
                Op::RevertAll => {
                    pool.hooks().accept.set(true);
                    prop_assert_eq!(pool.revert_all(), held.len());
                    held.clear();
                }
            }

            let stats = pool.stats();
            prop_assert_eq!(stats.borrowed + stats.free, pool.size());
            prop_assert_eq!(stats.borrowed, held.len());
            prop_assert!(pool.size() <= max_size);
            prop_assert_eq!(pool.factory().created.get(), pool.size() as u32 + leaked);
        }
    }
}
