//! @acp:module "Context"
//! @acp:summary "Process-wide CLI context and the per-invocation execution context bootstrap"
//! @acp:domain cli
//! @acp:layer service

use std::rc::Rc;

use crate::error::{CliError, Result};
use crate::profiles::{FileStore, OpenStore, ProfileCatalog};
use crate::session::{Connector, DefaultConnector, Origin, Session};

/// Everything parser construction and commands need from the environment.
///
/// Built once at process start by [`CliContext::load`], which reads the
/// profile catalog so `--profile-name` choices and defaults are known before
/// any parser exists.
pub struct CliContext {
    catalog: ProfileCatalog,
    store: Rc<dyn OpenStore>,
    connector: Rc<dyn Connector>,
    stdout_tty: bool,
}

impl CliContext {
    pub fn load(
        store: Rc<dyn OpenStore>,
        connector: Rc<dyn Connector>,
        stdout_tty: bool,
    ) -> Result<Self> {
        let catalog = ProfileCatalog::load(store.as_ref())?;
        tracing::debug!(
            profiles = catalog.names().len(),
            default = catalog.default_name().unwrap_or("-"),
            "loaded profile catalog"
        );
        Ok(Self {
            catalog,
            store,
            connector,
            stdout_tty,
        })
    }

    /// Context for the binary: file store from the environment, real connector
    pub fn from_env(stdout_tty: bool) -> Result<Self> {
        Self::load(
            Rc::new(FileStore::from_env()),
            Rc::new(DefaultConnector),
            stdout_tty,
        )
    }

    pub fn profiles(&self) -> &ProfileCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &dyn OpenStore {
        self.store.as_ref()
    }

    pub fn stdout_is_tty(&self) -> bool {
        self.stdout_tty
    }

    /// @acp:summary "Resolve a profile into a fresh session and origin"
    ///
    /// The store is opened for the lookup only and released before the
    /// session is built.
    pub fn bootstrap(&self, profile_name: &str) -> Result<ExecutionContext> {
        let profile = {
            let store = self.store.open()?;
            store
                .get(profile_name)
                .cloned()
                .ok_or_else(|| CliError::ProfileNotFound(profile_name.to_string()))?
        };
        let session = self.connector.connect(&profile)?;
        tracing::info!(profile = %profile.name, api = %session.api_url(), "session established");
        Ok(ExecutionContext {
            origin: Origin::new(session),
        })
    }
}

/// Session and origin for a single command invocation
#[derive(Debug)]
pub struct ExecutionContext {
    origin: Origin,
}

impl ExecutionContext {
    pub fn session(&self) -> &Session {
        self.origin.session()
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }
}
