//! A realm with every provider installed, driven one command at a time.

use crate::config::FerryConfig;
use crate::error::CliError;
use ferry_core::Engine;
use ferry_engine::json::{from_json, to_json};
use ferry_engine::{Realm, Value};
use ferry_provider_fs::FsModule;
use ferry_provider_http::HttpModule;
use ferry_provider_platform::PlatformModule;
use ferry_runtime::{
    job_queue, EngineScheduler, HostModule, HostObjectBuilder, JobQueue, WorkerExecutor,
    WorkerPool,
};
use std::sync::Arc;
use std::time::Duration;

pub struct Session {
    realm: Realm,
    queue: JobQueue<Realm>,
    pool: Arc<WorkerPool>,
    timeout: Duration,
}

impl Session {
    pub fn new(config: &FerryConfig) -> Result<Self, CliError> {
        let pool = Arc::new(WorkerPool::new(config.workers.threads).map_err(CliError::Workers)?);
        let (sender, queue) = job_queue::<Realm>();
        let executor: Arc<dyn WorkerExecutor> = pool.clone();
        let scheduler: Arc<dyn EngineScheduler<Realm>> = Arc::new(sender);

        let fs = FsModule::new();
        let http = HttpModule::new(config.http.clone())?;
        let platform = PlatformModule::new();
        let modules: [&dyn HostModule<Realm>; 3] = [&fs, &http, &platform];

        let mut realm = Realm::new();
        for module in modules {
            let mut builder = HostObjectBuilder::for_module(module);
            builder.with_async(Arc::clone(&executor), Arc::clone(&scheduler));
            realm.install(builder.build()?);
        }
        tracing::debug!(
            engine = %realm.id(),
            workers = pool.worker_count(),
            "session ready"
        );

        Ok(Self {
            realm,
            queue,
            pool,
            timeout: config.call.timeout(),
        })
    }

    pub fn realm(&self) -> &Realm {
        &self.realm
    }

    pub fn worker_count(&self) -> usize {
        self.pool.worker_count()
    }

    fn lookup(&self, name: &str) -> Result<Value, CliError> {
        match self.realm.global(name) {
            Value::Undefined => Err(CliError::UnknownObject(name.to_string())),
            value => Ok(value),
        }
    }

    /// `object.member(...args)`, waiting for the promise when the member is
    /// async.
    pub fn call(&mut self, object: &str, member: &str, args: &[Value]) -> Result<Value, CliError> {
        let target = self.lookup(object)?;
        let result = self.realm.call_method(&target, member, args)?;
        Ok(self.realm.block_on(&self.queue, &result, self.timeout)?)
    }

    pub fn get(&mut self, object: &str, property: &str) -> Result<Value, CliError> {
        let target = self.lookup(object)?;
        Ok(self.realm.get_member(&target, property)?)
    }

    pub fn members(&self, object: &str) -> Result<Vec<String>, CliError> {
        match self.lookup(object)? {
            Value::Host(host) => Ok(host.member_names()),
            _ => Err(CliError::UnknownObject(object.to_string())),
        }
    }

    /// Names of the installed host objects.
    pub fn objects(&self) -> Vec<String> {
        self.realm.global_names().map(str::to_string).collect()
    }
}

/// Command line arguments are JSON when they parse as JSON, strings
/// otherwise.
pub fn parse_arg(raw: &str) -> Value {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(json) => from_json(&json),
        Err(_) => Value::string(raw),
    }
}

pub fn render(value: &Value) -> String {
    let json = to_json(value);
    serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arguments_prefer_json() {
        assert_eq!(parse_arg("42"), Value::Number(42.0));
        assert_eq!(parse_arg("true"), Value::Bool(true));
        assert_eq!(parse_arg("\"quoted\"").as_str(), Some("quoted"));
        assert_eq!(parse_arg("/tmp/plain path").as_str(), Some("/tmp/plain path"));
        assert_eq!(parse_arg("[1,2]").length(), Some(2));
    }

    #[test]
    fn render_pretty_prints() {
        assert_eq!(render(&Value::Number(3.0)), "3");
        assert_eq!(render(&Value::Undefined), "null");
        assert_eq!(render(&Value::string("x")), "\"x\"");
    }
}
