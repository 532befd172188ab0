//! Test harness utilities for the service bootstrap suites.

mod connector;
mod groups;
mod reporter;
mod world;

pub use connector::{MemoryRecordStore, ScriptedConnector};
pub use groups::FailingRouteGroup;
pub use reporter::{LifecycleEvent, RecordingLifecycleReporter};
pub use world::{TEST_DATABASE_URI, TestWorld, multipart_body, test_config, world};
