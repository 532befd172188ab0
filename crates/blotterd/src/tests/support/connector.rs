//! Scripted database collaborators.
//!
//! [`ScriptedConnector`] either hands out a shared [`MemoryRecordStore`] or
//! fails with a configured message, recording every URI it was asked for.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::database::{
    AccountRecord, DatabaseConnector, DependencyConnectionError, GeofileRecord, RecordStore,
    StoreError,
};

/// Connector whose outcome is set by the test.
#[derive(Debug, Default)]
pub struct ScriptedConnector {
    store: Arc<MemoryRecordStore>,
    failure: Mutex<Option<String>>,
    attempts: Mutex<Vec<String>>,
}

impl ScriptedConnector {
    /// Makes every later connection attempt fail with `message`.
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.failure.lock().expect("connector mutex poisoned") = Some(message.into());
    }

    /// Store handed out on success.
    #[must_use]
    pub fn store(&self) -> Arc<MemoryRecordStore> {
        Arc::clone(&self.store)
    }

    /// URIs passed to [`DatabaseConnector::connect`].
    #[must_use]
    pub fn attempts(&self) -> Vec<String> {
        self.attempts
            .lock()
            .expect("connector mutex poisoned")
            .clone()
    }
}

#[async_trait]
impl DatabaseConnector for ScriptedConnector {
    async fn connect(&self, uri: &str) -> Result<Arc<dyn RecordStore>, DependencyConnectionError> {
        self.attempts
            .lock()
            .expect("connector mutex poisoned")
            .push(uri.to_owned());
        let failure = self.failure.lock().expect("connector mutex poisoned").clone();
        match failure {
            Some(message) => Err(DependencyConnectionError::connect(message)),
            None => Ok(self.store()),
        }
    }
}

/// In-memory [`RecordStore`] with per-operation failure injection.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    geofiles: Mutex<Vec<GeofileRecord>>,
    accounts: Mutex<Vec<AccountRecord>>,
    failing: Mutex<Vec<&'static str>>,
}

impl MemoryRecordStore {
    /// Makes `operation` fail from now on.
    pub fn fail_operation(&self, operation: &'static str) {
        self.failing
            .lock()
            .expect("store mutex poisoned")
            .push(operation);
    }

    /// Stored geofile records, in insertion order.
    #[must_use]
    pub fn geofiles(&self) -> Vec<GeofileRecord> {
        self.geofiles.lock().expect("store mutex poisoned").clone()
    }

    /// Stored accounts, in insertion order.
    #[must_use]
    pub fn accounts(&self) -> Vec<AccountRecord> {
        self.accounts.lock().expect("store mutex poisoned").clone()
    }

    fn check(&self, operation: &'static str) -> Result<(), StoreError> {
        if self
            .failing
            .lock()
            .expect("store mutex poisoned")
            .contains(&operation)
        {
            return Err(StoreError::new(operation, "scripted failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn list_geofiles(&self) -> Result<Vec<GeofileRecord>, StoreError> {
        self.check("list_geofiles")?;
        let mut records = self.geofiles();
        records.reverse();
        Ok(records)
    }

    async fn insert_geofile(&self, record: &GeofileRecord) -> Result<(), StoreError> {
        self.check("insert_geofile")?;
        self.geofiles
            .lock()
            .expect("store mutex poisoned")
            .push(record.clone());
        Ok(())
    }

    async fn seed_reference_geofiles(
        &self,
        records: &[GeofileRecord],
    ) -> Result<usize, StoreError> {
        self.check("seed_reference_geofiles")?;
        let mut geofiles = self.geofiles.lock().expect("store mutex poisoned");
        if geofiles.iter().any(|record| record.reference) {
            return Ok(0);
        }
        geofiles.extend_from_slice(records);
        Ok(records.len())
    }

    async fn ensure_account(&self, account: &AccountRecord) -> Result<bool, StoreError> {
        self.check("ensure_account")?;
        let mut accounts = self.accounts.lock().expect("store mutex poisoned");
        if accounts
            .iter()
            .any(|existing| existing.username == account.username)
        {
            return Ok(false);
        }
        accounts.push(account.clone());
        Ok(true)
    }
}
