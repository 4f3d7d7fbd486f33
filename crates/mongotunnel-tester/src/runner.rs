//! The smoke-test sequence: insert, query, drop

use tracing::info;

use mongotunnel_common::config::TesterConfig;

use crate::operation::{Operation, OperationSet};
use crate::person::Person;
use crate::store::{InsertReport, PeopleStore};
use crate::Result;

/// Number of times the sample document is inserted
pub const INSERT_REPETITIONS: usize = 2;

/// What a run did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub inserts: Vec<InsertReport>,
    pub found: Vec<Person>,
    pub dropped: bool,
}

/// Run the requested operations once, in the fixed order insert, query, drop.
///
/// The first store error aborts the run.
pub async fn run<S>(store: &S, ops: &OperationSet, config: &TesterConfig) -> Result<RunReport>
where
    S: PeopleStore + ?Sized,
{
    let mut report = RunReport::default();

    if ops.contains(Operation::Insert) {
        let person = Person::sample();
        info!("Inserting {}", person.to_document()?);

        for _ in 0..INSERT_REPETITIONS {
            let result = store.insert(&person).await?;
            println!("{}", result.count);
            info!(
                "Result count={} ids={:?}",
                result.count, result.inserted_ids
            );
            report.inserts.push(result);
        }
    }

    if ops.contains(Operation::Query) {
        let name = Person::sample().name;
        info!("Querying name={} limit={}", name, config.query_limit);

        let people = store.find_by_name(&name, config.query_limit).await?;
        for person in &people {
            info!("Found {:?}", person);
        }
        report.found = people;
    }

    if ops.contains(Operation::Drop) {
        info!("Dropping collection {}", config.collection);
        store.drop_collection().await?;
        report.dropped = true;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryPeopleStore;
    use crate::TesterError;
    use async_trait::async_trait;

    fn ops(list: &[Operation]) -> OperationSet {
        list.iter().copied().collect()
    }

    #[tokio::test]
    async fn test_no_operations_touch_nothing() {
        let store = MemoryPeopleStore::new();
        let report = run(&store, &OperationSet::default(), &TesterConfig::default())
            .await
            .unwrap();

        assert_eq!(report, RunReport::default());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_insert_writes_sample_twice() {
        let store = MemoryPeopleStore::new();
        let report = run(&store, &ops(&[Operation::Insert]), &TesterConfig::default())
            .await
            .unwrap();

        assert_eq!(report.inserts.len(), 2);
        assert!(report.inserts.iter().all(|insert| insert.count == 1));
        assert_eq!(store.len(), 2);
        assert!(report.found.is_empty());
        assert!(!report.dropped);
    }

    #[tokio::test]
    async fn test_insert_query_drop_in_order() {
        let store = MemoryPeopleStore::new();
        let ops = ops(&[Operation::Drop, Operation::Query, Operation::Insert]);
        let report = run(&store, &ops, &TesterConfig::default()).await.unwrap();

        // query ran after insert and before drop
        assert_eq!(report.found.len(), 2);
        assert!(report.found.iter().all(|person| person.name == "Steve"));
        assert!(report.dropped);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_query_limit_caps_results() {
        let store = MemoryPeopleStore::new();
        let config = TesterConfig {
            query_limit: 1,
            ..TesterConfig::default()
        };
        let report = run(&store, &ops(&[Operation::Insert, Operation::Query]), &config)
            .await
            .unwrap();
        assert_eq!(report.found.len(), 1);
    }

    #[tokio::test]
    async fn test_query_without_matches_succeeds() {
        let store = MemoryPeopleStore::new();
        let report = run(&store, &ops(&[Operation::Query]), &TesterConfig::default())
            .await
            .unwrap();
        assert!(report.found.is_empty());
    }

    struct FailingStore;

    #[async_trait]
    impl PeopleStore for FailingStore {
        async fn insert(&self, _person: &Person) -> Result<InsertReport> {
            Err(TesterError::Store("connection refused".to_string()))
        }

        async fn find_by_name(&self, _name: &str, _limit: i64) -> Result<Vec<Person>> {
            panic!("query must not run after a failed insert");
        }

        async fn drop_collection(&self) -> Result<()> {
            panic!("drop must not run after a failed insert");
        }
    }

    #[tokio::test]
    async fn test_store_error_aborts_run() {
        let ops = ops(&[Operation::Insert, Operation::Query, Operation::Drop]);
        let err = run(&FailingStore, &ops, &TesterConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TesterError::Store(_)));
    }
}
