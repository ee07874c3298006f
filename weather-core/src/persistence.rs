//! Favorites and search history kept in a [`KeyValueStore`].
//!
//! Each operation has a `try_*` form that reports storage faults and a plain
//! form that logs the fault and falls back to an empty or no-op result. The
//! plain forms are what the state manager uses; faults never reach the user.

use chrono::Utc;
use serde::{Serialize, de::DeserializeOwned};

use crate::{CityId, FavoriteCity, SearchEntry, StorageError, storage::KeyValueStore};

pub const FAVORITES_KEY: &str = "weather_app_favorites";
pub const SEARCH_HISTORY_KEY: &str = "weather_app_search_history";
pub const MAX_HISTORY_ITEMS: usize = 5;

#[derive(Debug)]
pub struct Persistence {
    store: Box<dyn KeyValueStore>,
}

impl Persistence {
    pub fn new(store: impl KeyValueStore + 'static) -> Self {
        Self { store: Box::new(store) }
    }

    pub fn try_load_favorites(&self) -> Result<Vec<FavoriteCity>, StorageError> {
        self.read_list(FAVORITES_KEY)
    }

    pub fn load_favorites(&self) -> Vec<FavoriteCity> {
        absorb("read favorites", self.try_load_favorites(), Vec::new())
    }

    /// Overwrite the stored favorites wholesale.
    pub fn try_persist_favorites(&self, favorites: &[FavoriteCity]) -> Result<(), StorageError> {
        self.write_list(FAVORITES_KEY, favorites)
    }

    pub fn persist_favorites(&self, favorites: &[FavoriteCity]) {
        absorb("save favorites", self.try_persist_favorites(favorites), ());
    }

    /// `Ok(false)` without writing when a favorite with the same id exists.
    pub fn try_add_favorite(&self, city: FavoriteCity) -> Result<bool, StorageError> {
        let mut favorites = self.try_load_favorites()?;
        if favorites.iter().any(|fav| fav.id == city.id) {
            return Ok(false);
        }

        favorites.push(city);
        self.try_persist_favorites(&favorites)?;
        Ok(true)
    }

    /// Unparseable stored favorites are replaced by `[city]`; any other fault leaves
    /// storage untouched and yields `false`.
    pub fn add_favorite(&self, city: FavoriteCity) -> bool {
        match self.try_add_favorite(city.clone()) {
            Ok(added) => added,
            Err(StorageError::Serialization(err)) => {
                tracing::error!(%err, "stored favorites are unreadable, starting a new list");
                absorb("add favorite", self.try_persist_favorites(&[city]).map(|()| true), false)
            }
            Err(err) => absorb("add favorite", Err(err), false),
        }
    }

    pub fn try_remove_favorite(&self, city_id: CityId) -> Result<(), StorageError> {
        let mut favorites = self.try_load_favorites()?;
        favorites.retain(|fav| fav.id != city_id);
        self.try_persist_favorites(&favorites)
    }

    pub fn remove_favorite(&self, city_id: CityId) {
        absorb("remove favorite", self.try_remove_favorite(city_id), ());
    }

    pub fn is_favorite(&self, city_id: CityId) -> bool {
        self.load_favorites().iter().any(|fav| fav.id == city_id)
    }

    pub fn try_load_search_history(&self) -> Result<Vec<SearchEntry>, StorageError> {
        self.read_list(SEARCH_HISTORY_KEY)
    }

    pub fn load_search_history(&self) -> Vec<SearchEntry> {
        absorb("read search history", self.try_load_search_history(), Vec::new())
    }

    /// Move `city_name` to the front of the history, dropping any earlier entry
    /// with the same name (ignoring case) and anything past the cap.
    pub fn try_add_search_entry(&self, city_name: &str) -> Result<(), StorageError> {
        let history = with_search_entry(self.try_load_search_history()?, city_name);
        self.write_list(SEARCH_HISTORY_KEY, &history)
    }

    /// Unparseable stored history is replaced by the new entry alone.
    pub fn add_search_entry(&self, city_name: &str) {
        match self.try_add_search_entry(city_name) {
            Ok(()) => {}
            Err(StorageError::Serialization(err)) => {
                tracing::error!(%err, "stored search history is unreadable, starting a new one");
                let history = with_search_entry(Vec::new(), city_name);
                absorb("add search entry", self.write_list(SEARCH_HISTORY_KEY, &history), ());
            }
            Err(err) => absorb("add search entry", Err(err), ()),
        }
    }

    pub fn try_clear_search_history(&self) -> Result<(), StorageError> {
        self.store.remove(SEARCH_HISTORY_KEY)
    }

    pub fn clear_search_history(&self) {
        absorb("clear search history", self.try_clear_search_history(), ());
    }

    fn read_list<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, StorageError> {
        match self.store.get(key)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    fn write_list<T: Serialize>(&self, key: &str, items: &[T]) -> Result<(), StorageError> {
        let raw = serde_json::to_string(items)?;
        self.store.set(key, &raw)
    }
}

fn with_search_entry(mut history: Vec<SearchEntry>, city_name: &str) -> Vec<SearchEntry> {
    let needle = city_name.to_lowercase();

    history.retain(|entry| entry.city_name.to_lowercase() != needle);
    history.insert(
        0,
        SearchEntry {
            city_name: city_name.to_string(),
            timestamp: Utc::now().timestamp_millis(),
        },
    );
    history.truncate(MAX_HISTORY_ITEMS);
    history
}

fn absorb<T>(operation: &str, result: Result<T, StorageError>, fallback: T) -> T {
    result.unwrap_or_else(|err| {
        tracing::error!(%err, "failed to {operation}");
        fallback
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    /// Shares one in-memory map between the service and the test.
    #[derive(Debug, Clone, Default)]
    struct SharedStore(Arc<MemoryStore>);

    impl KeyValueStore for SharedStore {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.0.get(key)
        }
        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            self.0.set(key, value)
        }
        fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.0.remove(key)
        }
    }

    /// Every operation fails, like a store whose quota is exhausted.
    #[derive(Debug)]
    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable("broken".into()))
        }
        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("quota exceeded".into()))
        }
        fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("broken".into()))
        }
    }

    /// Reads fail (e.g. permission denied) while writes go through to `inner`.
    #[derive(Debug)]
    struct UnreadableStore {
        inner: SharedStore,
    }

    impl KeyValueStore for UnreadableStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable("permission denied".into()))
        }
        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            self.inner.set(key, value)
        }
        fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.inner.remove(key)
        }
    }

    fn city(id: CityId, name: &str) -> FavoriteCity {
        FavoriteCity {
            id,
            name: name.to_string(),
            country: "FR".to_string(),
            added_at: 1_700_000_000_000,
        }
    }

    #[test]
    fn add_favorite_rejects_duplicate_ids() {
        let persistence = Persistence::new(MemoryStore::new());

        assert!(persistence.add_favorite(city(1, "Paris")));
        assert!(!persistence.add_favorite(city(1, "Paris again")));

        let favorites = persistence.load_favorites();
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].name, "Paris");
    }

    #[test]
    fn favorites_keep_insertion_order() {
        let persistence = Persistence::new(MemoryStore::new());
        for (id, name) in [(3, "Lyon"), (1, "Paris"), (2, "Nice")] {
            assert!(persistence.add_favorite(city(id, name)));
        }

        let ids: Vec<_> = persistence.load_favorites().iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn remove_and_membership() {
        let persistence = Persistence::new(MemoryStore::new());
        persistence.add_favorite(city(1, "Paris"));
        persistence.add_favorite(city(2, "Nice"));

        assert!(persistence.is_favorite(2));
        persistence.remove_favorite(2);
        assert!(!persistence.is_favorite(2));
        assert!(persistence.is_favorite(1));

        persistence.remove_favorite(99);
        assert_eq!(persistence.load_favorites().len(), 1);
    }

    #[test]
    fn favorites_roundtrip_is_lossless() {
        let persistence = Persistence::new(MemoryStore::new());
        let favorites = vec![city(1, "Paris"), city(2, "Zürich"), city(3, "São Paulo")];

        persistence.try_persist_favorites(&favorites).expect("persist");
        assert_eq!(persistence.try_load_favorites().expect("load"), favorites);
    }

    #[test]
    fn history_roundtrip_is_lossless() {
        let store = SharedStore::default();
        let persistence = Persistence::new(store.clone());
        let history = vec![
            SearchEntry { city_name: "Oslo".into(), timestamp: 3 },
            SearchEntry { city_name: "Rome".into(), timestamp: 2 },
        ];
        store
            .set(SEARCH_HISTORY_KEY, &serde_json::to_string(&history).expect("json"))
            .expect("set");

        assert_eq!(persistence.try_load_search_history().expect("load"), history);
    }

    #[test]
    fn history_is_newest_first_deduplicated_and_capped() {
        let persistence = Persistence::new(MemoryStore::new());

        for name in ["Paris", "Lyon", "Nice", "paris", "Lille", "Nantes", "Brest", "LYON"] {
            persistence.add_search_entry(name);

            let history = persistence.load_search_history();
            assert!(history.len() <= MAX_HISTORY_ITEMS);

            let mut lowered: Vec<_> = history.iter().map(|e| e.city_name.to_lowercase()).collect();
            lowered.sort();
            lowered.dedup();
            assert_eq!(lowered.len(), history.len(), "no case-insensitive duplicates");

            assert_eq!(history[0].city_name, name);
            assert!(history.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
        }

        let names: Vec<_> =
            persistence.load_search_history().into_iter().map(|e| e.city_name).collect();
        assert_eq!(names, vec!["LYON", "Brest", "Nantes", "Lille", "paris"]);
    }

    #[test]
    fn clear_history_removes_key() {
        let store = SharedStore::default();
        let persistence = Persistence::new(store.clone());

        persistence.add_search_entry("Paris");
        persistence.clear_search_history();

        assert_eq!(store.get(SEARCH_HISTORY_KEY).expect("get"), None);
        assert!(persistence.load_search_history().is_empty());
    }

    #[test]
    fn corrupted_values_read_as_empty() {
        let store = SharedStore::default();
        store.set(FAVORITES_KEY, "{not json").expect("set");
        store.set(SEARCH_HISTORY_KEY, "42").expect("set");
        let persistence = Persistence::new(store);

        assert!(matches!(
            persistence.try_load_favorites(),
            Err(StorageError::Serialization(_))
        ));
        assert!(persistence.load_favorites().is_empty());
        assert!(persistence.load_search_history().is_empty());
    }

    #[test]
    fn corrupted_favorites_are_replaced_on_add() {
        let store = SharedStore::default();
        store.set(FAVORITES_KEY, "garbage").expect("set");
        let persistence = Persistence::new(store);

        assert!(persistence.add_favorite(city(5, "Metz")));
        assert_eq!(persistence.load_favorites(), vec![city(5, "Metz")]);
    }

    #[test]
    fn corrupted_history_is_replaced_on_add() {
        let store = SharedStore::default();
        store.set(SEARCH_HISTORY_KEY, "{oops").expect("set");
        let persistence = Persistence::new(store);

        assert!(matches!(
            persistence.try_add_search_entry("Metz"),
            Err(StorageError::Serialization(_))
        ));

        persistence.add_search_entry("Metz");
        let history = persistence.load_search_history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].city_name, "Metz");
    }

    #[test]
    fn read_faults_never_overwrite_stored_data() {
        let inner = SharedStore::default();
        Persistence::new(inner.clone())
            .try_persist_favorites(&[city(1, "Paris"), city(2, "Lyon")])
            .expect("seed favorites");
        Persistence::new(inner.clone()).try_add_search_entry("Paris").expect("seed history");

        let stored_favorites = inner.get(FAVORITES_KEY).expect("get");
        let stored_history = inner.get(SEARCH_HISTORY_KEY).expect("get");

        let persistence = Persistence::new(UnreadableStore { inner: inner.clone() });

        assert!(persistence.try_add_favorite(city(3, "Nice")).is_err());
        assert!(persistence.try_remove_favorite(99).is_err());
        assert!(persistence.try_add_search_entry("Nice").is_err());

        assert!(!persistence.add_favorite(city(3, "Nice")));
        persistence.remove_favorite(1);
        persistence.add_search_entry("Nice");

        assert_eq!(inner.get(FAVORITES_KEY).expect("get"), stored_favorites);
        assert_eq!(inner.get(SEARCH_HISTORY_KEY).expect("get"), stored_history);
    }

    #[test]
    fn broken_store_degrades_to_defaults() {
        let persistence = Persistence::new(BrokenStore);

        assert!(persistence.load_favorites().is_empty());
        assert!(persistence.load_search_history().is_empty());
        assert!(!persistence.add_favorite(city(1, "Paris")));
        assert!(!persistence.is_favorite(1));

        // None of these may panic or propagate.
        persistence.remove_favorite(1);
        persistence.add_search_entry("Paris");
        persistence.clear_search_history();
        persistence.persist_favorites(&[city(1, "Paris")]);

        assert!(persistence.try_add_favorite(city(1, "Paris")).is_err());
        assert!(persistence.try_clear_search_history().is_err());
    }
}
