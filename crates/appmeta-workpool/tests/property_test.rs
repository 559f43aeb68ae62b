// Every submitted item reaches exactly one worker exactly once

use appmeta_logger::{AsyncLogger, FatalAction, MemorySink};
use appmeta_store::{Keyed, Storage};
use appmeta_workpool::{DispatchMode, PoolConfig, WorkItem, WorkPool};
use futures::future::join_all;
use parking_lot::Mutex;
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct Ticket(String);

impl Keyed for Ticket {
    fn storage_key(&self) -> &str {
        &self.0
    }
}

/// Counts inserts per key instead of overwriting
#[derive(Default)]
struct CountingStorage {
    inserts: Mutex<HashMap<String, usize>>,
}

impl Storage<Ticket> for CountingStorage {
    fn insert(&self, key: String, _value: Ticket) {
        *self.inserts.lock().entry(key).or_default() += 1;
    }

    fn read(&self, key: &str) -> Option<Ticket> {
        self.inserts.lock().get(key).map(|_| Ticket(key.to_string()))
    }

    fn len(&self) -> usize {
        self.inserts.lock().len()
    }
}

fn dispatch_mode() -> impl Strategy<Value = DispatchMode> {
    prop_oneof![Just(DispatchMode::Racing), Just(DispatchMode::Ordered)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_each_item_is_stored_exactly_once(
        items in 1usize..60,
        workers in 1usize..5,
        queue_capacity in 1usize..8,
        producers in 1usize..4,
        mode in dispatch_mode(),
    ) {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();

        let inserts = runtime.block_on(async {
            let logger = AsyncLogger::builder()
                .sink(MemorySink::new())
                .on_fatal(FatalAction::callback(|_| {}))
                .start();
            let storage = Arc::new(CountingStorage::default());
            let config = PoolConfig {
                max_workers: workers,
                queue_capacity,
                dispatch_mode: mode,
                ..Default::default()
            };
            let pool = WorkPool::start(config, storage.clone(), logger.clone()).unwrap();

            // Producers submit disjoint slices of the item range concurrently.
            let submissions = (0..producers).map(|p| {
                let queue = pool.queue();
                async move {
                    let mut receipts = Vec::new();
                    for i in (p..items).step_by(producers) {
                        let item = WorkItem::new(Ticket(format!("ticket-{}", i)));
                        receipts.push(queue.submit_with_receipt(item).await.unwrap());
                    }
                    receipts
                }
            });
            let receipts: Vec<_> = join_all(submissions).await.into_iter().flatten().collect();
            for receipt in receipts {
                receipt.wait().await.unwrap();
            }

            let report = pool.shutdown().await;
            assert!(report.is_clean());
            logger.stop().await;

            let inserts = storage.inserts.lock().clone();
            inserts
        });

        prop_assert_eq!(inserts.len(), items);
        for i in 0..items {
            prop_assert_eq!(inserts.get(&format!("ticket-{}", i)).copied(), Some(1));
        }
    }
}
