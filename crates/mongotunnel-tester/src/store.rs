//! Where the smoke test reads and writes people

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, Bson};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection};
use parking_lot::Mutex;
use tracing::{debug, info};

use mongotunnel_common::config::TesterConfig;

use crate::person::Person;
use crate::Result;

/// Outcome of one single-document insert
#[derive(Debug, Clone, PartialEq)]
pub struct InsertReport {
    pub count: u64,
    pub inserted_ids: Vec<Bson>,
}

/// The three collection operations the smoke test needs
#[async_trait]
pub trait PeopleStore: Send + Sync {
    async fn insert(&self, person: &Person) -> Result<InsertReport>;

    /// At most `limit` people named `name`; `limit <= 0` means no cap
    async fn find_by_name(&self, name: &str, limit: i64) -> Result<Vec<Person>>;

    async fn drop_collection(&self) -> Result<()>;
}

/// Store backed by a real MongoDB collection
pub struct MongoPeopleStore {
    collection: Collection<Person>,
}

impl MongoPeopleStore {
    pub async fn connect(config: &TesterConfig) -> Result<Self> {
        info!(
            "Connecting to address={} database={}",
            config.address, config.database
        );

        let uri = format!("mongodb://{}/{}", config.address, config.database);
        let options = ClientOptions::parse(&uri).await?;
        let client = Client::with_options(options)?;

        info!("Using collection {}", config.collection);
        let collection = client
            .database(&config.database)
            .collection::<Person>(&config.collection);

        Ok(Self { collection })
    }
}

#[async_trait]
impl PeopleStore for MongoPeopleStore {
    async fn insert(&self, person: &Person) -> Result<InsertReport> {
        let result = self.collection.insert_one(person).await?;
        Ok(InsertReport {
            count: 1,
            inserted_ids: vec![result.inserted_id],
        })
    }

    async fn find_by_name(&self, name: &str, limit: i64) -> Result<Vec<Person>> {
        let mut cursor = self
            .collection
            .find(doc! { "name": name })
            .limit(limit.max(0))
            .await?;

        let mut people = Vec::new();
        while cursor.advance().await? {
            people.push(cursor.deserialize_current()?);
        }
        Ok(people)
    }

    async fn drop_collection(&self) -> Result<()> {
        self.collection.drop().await?;
        debug!("Dropped collection {}", self.collection.name());
        Ok(())
    }
}

/// In-process store with the same semantics, for exercising the runner without a server
#[derive(Default)]
pub struct MemoryPeopleStore {
    people: Mutex<Vec<Person>>,
}

impl MemoryPeopleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.people.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PeopleStore for MemoryPeopleStore {
    async fn insert(&self, person: &Person) -> Result<InsertReport> {
        let id = person.id.unwrap_or_else(ObjectId::new);
        self.people.lock().push(Person {
            id: Some(id),
            ..person.clone()
        });

        Ok(InsertReport {
            count: 1,
            inserted_ids: vec![Bson::ObjectId(id)],
        })
    }

    async fn find_by_name(&self, name: &str, limit: i64) -> Result<Vec<Person>> {
        let cap = usize::try_from(limit).ok().filter(|cap| *cap > 0).unwrap_or(usize::MAX);
        Ok(self
            .people
            .lock()
            .iter()
            .filter(|person| person.name == name)
            .take(cap)
            .cloned()
            .collect())
    }

    async fn drop_collection(&self) -> Result<()> {
        self.people.lock().clear();
        Ok(())
    }
}
