//! Dispatch runtime for Ferry host objects.
//!
//! A host object is assembled once with a [`HostObjectBuilder`], then exposed
//! to an engine. Member access goes through the [`Registry`] (sync methods,
//! then async methods, then properties). Sync methods run inline on the engine
//! thread. Async methods copy their arguments into [`ferry_core::AsyncArgs`],
//! run on a [`WorkerExecutor`], and settle their promise back on the engine
//! thread through an [`EngineScheduler`].

pub mod args;
pub mod event_loop;
pub mod executor;
pub mod host;
pub mod panic_boundary;
pub mod registry;

pub use args::SyncArgs;
pub use event_loop::{job_queue, EngineJob, EngineScheduler, JobQueue, JobSender};
pub use executor::{Work, WorkerExecutor, WorkerPool};
pub use host::{HostModule, HostObject, HostObjectBuilder};
pub use registry::{AsyncHandler, Member, Registry};
